use anyhow::Result;
use comfy_table::{
    modifiers::UTF8_ROUND_CORNERS, presets::UTF8_FULL, Attribute, Cell, Table,
};

use rise_object::object::{BulkReconciler, VersionLister};

use super::Context;

/// List all versions and delete markers under `prefix`
pub async fn list(ctx: &Context, bucket: &str, prefix: Option<&str>) -> Result<()> {
    let (versions, error) = VersionLister::new(ctx.store.as_ref(), bucket, prefix)
        .collect()
        .await;

    if versions.is_empty() {
        println!("No object versions found in bucket '{}'", bucket);
    } else {
        let mut table = Table::new();
        table
            .load_preset(UTF8_FULL)
            .apply_modifier(UTF8_ROUND_CORNERS)
            .set_header(vec![
                Cell::new("KEY").add_attribute(Attribute::Bold),
                Cell::new("VERSION ID").add_attribute(Attribute::Bold),
                Cell::new("TYPE").add_attribute(Attribute::Bold),
            ]);

        for version in &versions {
            table.add_row(vec![
                Cell::new(&version.key),
                Cell::new(version.version_label()),
                Cell::new(if version.is_delete_marker {
                    "delete marker"
                } else {
                    "version"
                }),
            ]);
        }

        println!("{}", table);
    }

    // Entries gathered before a failed page are still shown
    match error {
        Some(err) => Err(err.into()),
        None => Ok(()),
    }
}

/// Delete every version and delete marker of `key`, or of all keys in `bucket`
pub async fn purge(
    ctx: &Context,
    bucket: &str,
    key: Option<&str>,
    force: bool,
    ignore_errors: bool,
) -> Result<()> {
    let result = BulkReconciler::new(ctx.store.as_ref(), bucket, key)
        .force(force)
        .ignore_errors(ignore_errors)
        .run()
        .await;

    let deleted = result.into_result()?;
    println!(
        "✓ Deleted {} version(s) from bucket '{}'",
        deleted, bucket
    );
    Ok(())
}
