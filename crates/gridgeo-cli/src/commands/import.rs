use std::path::Path;

use anyhow::{anyhow, Result};
use gridgeo_cli::cli::ImportCommands;
use gridgeo_io::{load_lines, load_substations, InMemoryGeoStore};
use tracing::info;

use crate::commands::AppContext;

pub fn handle(ctx: &AppContext, command: &ImportCommands) -> Result<()> {
    match command {
        ImportCommands::Substations { store, file } => {
            let path = require_store(ctx, store.as_deref())?;
            let service = ctx.service(InMemoryGeoStore::load(&path)?)?;
            let count = service.save_substations(&load_substations(file)?)?;
            service.store().save(&path)?;
            info!(count, store = %path.display(), "imported substation positions");
            println!("Imported {count} substation position(s) into {}", path.display());
        }
        ImportCommands::Lines { store, file } => {
            let path = require_store(ctx, store.as_deref())?;
            let service = ctx.service(InMemoryGeoStore::load(&path)?)?;
            let count = service.save_lines(&load_lines(file)?)?;
            service.store().save(&path)?;
            info!(count, store = %path.display(), "imported line paths");
            println!("Imported {count} line path(s) into {}", path.display());
        }
    }
    Ok(())
}

fn require_store(ctx: &AppContext, arg: Option<&Path>) -> Result<std::path::PathBuf> {
    ctx.store_path(arg)
        .ok_or_else(|| anyhow!("no store given: pass --store or set [data] store"))
}
