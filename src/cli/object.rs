use anyhow::{Context as _, Result};
use comfy_table::{
    modifiers::UTF8_ROUND_CORNERS, presets::UTF8_FULL, Attribute, Cell, Table,
};
use std::path::Path;
use tracing::info;

use rise_object::object::model::ChecksumAlgorithm;
use rise_object::object::{parse_import_id, ObjectSpec, ObjectState};

use super::Context;

/// Load an object spec from a `.json` or `.toml` file
fn load_spec(path: &Path) -> Result<ObjectSpec> {
    let document = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read spec file {}", path.display()))?;

    let spec = if path.extension().is_some_and(|ext| ext == "json") {
        ObjectSpec::from_json(&document)?
    } else {
        toml::from_str(&document)
            .with_context(|| format!("Failed to parse spec file {}", path.display()))?
    };

    Ok(spec)
}

fn print_state(state: &ObjectState) -> Result<()> {
    let value = serde_json::to_value(state).context("Failed to serialize object state")?;

    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_header(vec![
            Cell::new("ATTRIBUTE").add_attribute(Attribute::Bold),
            Cell::new("VALUE").add_attribute(Attribute::Bold),
        ]);

    if let serde_json::Value::Object(fields) = value {
        for (name, field) in fields {
            let rendered = match field {
                serde_json::Value::String(s) if s.is_empty() => continue,
                serde_json::Value::String(s) => s,
                serde_json::Value::Object(map) if map.is_empty() => continue,
                serde_json::Value::Object(map) => {
                    let mut pairs: Vec<String> = map
                        .iter()
                        .map(|(k, v)| format!("{}={}", k, v.as_str().unwrap_or_default()))
                        .collect();
                    pairs.sort();
                    pairs.join("\n")
                }
                other => other.to_string(),
            };
            table.add_row(vec![Cell::new(name), Cell::new(rendered)]);
        }
    }

    println!("{}", table);
    Ok(())
}

/// Upload the object in `spec_path`; with `previous`, update it in place where possible
pub async fn apply(ctx: &Context, spec_path: &Path, previous: Option<&Path>) -> Result<()> {
    let spec = load_spec(spec_path)?;

    let state = match previous {
        Some(previous) => {
            let old = load_spec(previous)?;
            let planned = spec.plan_computed(&old);
            if planned.version_id {
                info!("Object content changed, a new version will be uploaded");
            }

            match ctx.resource.update(&old, &spec, &spec.key).await? {
                Some(state) => state,
                None => {
                    println!(
                        "Object '{}' in bucket '{}' no longer exists",
                        spec.key, spec.bucket
                    );
                    return Ok(());
                }
            }
        }
        None => ctx.resource.create(&spec).await?,
    };

    println!(
        "✓ Applied object '{}' to bucket '{}' (version: {})",
        state.key,
        state.bucket,
        if state.version_id.is_empty() {
            "none"
        } else {
            &state.version_id
        }
    );
    print_state(&state)
}

/// Show the state of an existing object
pub async fn show(ctx: &Context, id: &str, checksum_algorithm: Option<&str>) -> Result<()> {
    let import = parse_import_id(id)?;
    let mut spec = ObjectSpec::new(import.bucket, import.key);
    spec.checksum_algorithm = checksum_algorithm
        .map(|algorithm| algorithm.to_ascii_uppercase().parse::<ChecksumAlgorithm>())
        .transpose()?;

    let state = ctx
        .resource
        .read(&spec, &spec.key, true)
        .await?
        .context("Object not found")?;

    print_state(&state)
}

/// Delete the object described by `spec_path`
pub async fn delete(ctx: &Context, spec_path: &Path) -> Result<()> {
    let spec = load_spec(spec_path)?;

    let Some(state) = ctx.resource.read(&spec, &spec.key, false).await? else {
        println!(
            "Object '{}' in bucket '{}' does not exist, nothing to delete",
            spec.key, spec.bucket
        );
        return Ok(());
    };

    ctx.resource.delete(&spec, &state).await?;

    println!(
        "✓ Deleted object '{}' from bucket '{}'",
        spec.key, spec.bucket
    );
    Ok(())
}

/// Print a spec for an existing object that `apply --previous` can pick up
pub async fn import(ctx: &Context, id: &str) -> Result<()> {
    let (spec, state) = ctx.resource.import(id).await?;

    let document = toml::to_string_pretty(&spec).context("Failed to serialize object spec")?;
    println!("{}", document);

    info!(
        "Imported S3 Bucket ({}) Object ({}) Version ({})",
        state.bucket, state.key, state.version_id
    );
    Ok(())
}
