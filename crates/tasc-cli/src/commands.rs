//! Subcommand implementations.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result, bail};
use comfy_table::modifiers::UTF8_ROUND_CORNERS;
use comfy_table::presets::UTF8_FULL_CONDENSED;
use comfy_table::{ColumnConstraint, ContentArrangement, Table, Width};
use tasc_ops::{Engine, OperationManifest};
use tracing::{info, warn};

pub fn apply_table_style(table: &mut Table) {
    table
        .load_preset(UTF8_FULL_CONDENSED)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_width(120);
    if table.column_count() >= 4 {
        table.set_constraints(vec![
            ColumnConstraint::UpperBoundary(Width::Fixed(18)),
            ColumnConstraint::UpperBoundary(Width::Fixed(30)),
            ColumnConstraint::LowerBoundary(Width::Percentage(40)),
            ColumnConstraint::LowerBoundary(Width::Fixed(10)),
        ]);
    }
}

fn builtin_engine() -> Result<Engine> {
    Engine::builtin().context("register built-in domains and operations")
}

/// Table of registered domains.
pub fn domains_table(engine: &Engine) -> Table {
    let mut table = Table::new();
    table.set_header(vec!["Domain", "Description"]);
    apply_table_style(&mut table);
    for domain in engine.domains().domains() {
        table.add_row(vec![domain.name, domain.description]);
    }
    table
}

/// Table of operations, restricted to those callable from `domain`.
pub fn operations_table(engine: &Engine, domain: Option<&str>) -> Result<Table> {
    let operations = match domain {
        Some(domain) => {
            if !engine.domains().contains(domain) {
                bail!("unknown domain '{domain}'");
            }
            engine.operations().available(domain)
        }
        None => engine.operations().iter().collect(),
    };
    let mut table = Table::new();
    table.set_header(vec!["Domain", "Operation", "Signature", "Output"]);
    apply_table_style(&mut table);
    for op in operations {
        table.add_row(vec![
            op.domain().to_string(),
            op.name().to_string(),
            op.signature(),
            op.output().to_string(),
        ]);
    }
    Ok(table)
}

pub fn run_domains() -> Result<()> {
    let engine = builtin_engine()?;
    println!("{}", domains_table(&engine));
    Ok(())
}

pub fn run_operations(domain: Option<&str>) -> Result<()> {
    let engine = builtin_engine()?;
    println!("{}", operations_table(&engine, domain)?);
    Ok(())
}

/// Differences between the manifest at `path` and the live registry.
pub fn check_manifest(engine: &Engine, path: &Path) -> Result<Vec<String>> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("read manifest {}", path.display()))?;
    let committed = OperationManifest::from_json(&text)
        .with_context(|| format!("parse manifest {}", path.display()))?;
    Ok(engine.operations().manifest().drift(&committed))
}

/// Print, write or check the manifest; returns the process exit code.
pub fn run_manifest(output: Option<&Path>, check: Option<&Path>) -> Result<i32> {
    let engine = builtin_engine()?;
    if let Some(path) = check {
        let drift = check_manifest(&engine, path)?;
        if drift.is_empty() {
            info!(path = %path.display(), "manifest is up to date");
            println!("{} is up to date", path.display());
            return Ok(0);
        }
        for line in &drift {
            warn!(path = %path.display(), "{line}");
            println!("{line}");
        }
        return Ok(1);
    }

    let text = engine
        .operations()
        .manifest()
        .to_json_pretty()
        .context("serialize manifest")?;
    match output {
        Some(path) => {
            fs::write(path, text).with_context(|| format!("write manifest {}", path.display()))?;
            info!(path = %path.display(), "wrote manifest");
        }
        None => print!("{text}"),
    }
    Ok(0)
}
