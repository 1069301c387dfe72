use anyhow::Result;
use ezviewer_core::{paths, Registry};
use std::path::Path;

pub fn run_add(alias: &str, path: &Path) -> Result<()> {
    let tracked = Registry::open_default()?.add(alias, path)?;
    println!("Added {} -> {}", tracked.alias, tracked.path.display());
    Ok(())
}

pub fn run_update(alias: &str, path: &Path) -> Result<()> {
    let tracked = Registry::open_default()?.update(alias, path)?;
    println!("Updated {} -> {}", tracked.alias, tracked.path.display());
    Ok(())
}

pub fn run_remove(alias: &str) -> Result<()> {
    Registry::open_default()?.remove(alias)?;
    println!("Removed {}", alias);
    Ok(())
}

pub fn run_list() -> Result<()> {
    let logs = Registry::open_default()?.list()?;
    if logs.is_empty() {
        println!("No logs tracked");
        return Ok(());
    }
    let width = logs.keys().map(String::len).max().unwrap_or(0).max(15);
    for (alias, path) in &logs {
        println!("{:width$} {}", alias, path.display());
    }
    Ok(())
}

pub fn run_show_path() -> Result<()> {
    println!("Tracked logs file is at: {}", paths::registry_path()?.display());
    Ok(())
}

pub fn run_show_dir() -> Result<()> {
    println!("Tracked logs folder is at: {}", paths::app_dir()?.display());
    Ok(())
}
