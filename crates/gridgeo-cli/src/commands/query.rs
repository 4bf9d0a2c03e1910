use std::io::{self, Write};

use anyhow::{Context, Result};
use gridgeo_cli::cli::QueryArgs;
use gridgeo_io::{write_json, InMemoryGeoStore};
use gridgeo_service::{GeoResponse, RequestPool};
use serde::Serialize;
use serde_json::Value;
use tracing::{info, warn};

use crate::commands::{parse_countries, AppContext};

#[derive(Debug, Clone, Copy)]
pub enum Target {
    Substations,
    Lines,
}

pub fn handle(ctx: &AppContext, target: Target, args: &QueryArgs) -> Result<()> {
    let network = ctx.network(args.network.as_deref())?;
    let store_path = ctx.store_path(args.store.as_deref());
    let store = match &store_path {
        Some(path) => InMemoryGeoStore::load(path)?,
        None => InMemoryGeoStore::new(),
    };
    let service = ctx.service(store)?;
    let pool = RequestPool::new(ctx.config.pool.worker_count())?;
    let countries = parse_countries(&args.countries)?;

    let items = pool.execute(|| -> Result<Value> {
        match (target, countries.is_empty()) {
            (Target::Substations, false) => {
                summarize(service.substations_by_countries(&network, &countries)?)
            }
            (Target::Substations, true) => {
                summarize(service.substations_by_ids(&network, &args.ids)?)
            }
            (Target::Lines, false) => summarize(service.lines_by_countries(&network, &countries)?),
            (Target::Lines, true) => summarize(service.lines_by_ids(&network, &args.ids)?),
        }
    })?;

    // newly ordered lines were written back during the request
    if let (Target::Lines, Some(path)) = (target, &store_path) {
        service.store().save(path)?;
    }

    match &args.out {
        Some(out) => {
            write_json(out, &items)?;
            info!(out = %out.display(), "result written");
        }
        None => {
            let json = serde_json::to_string_pretty(&items).context("serializing result")?;
            let mut stdout = io::stdout().lock();
            writeln!(stdout, "{json}")?;
        }
    }
    Ok(())
}

/// Log what the request dropped and keep only the items.
fn summarize<T: Serialize>(response: GeoResponse<T>) -> Result<Value> {
    for issue in &response.diagnostics.issues {
        warn!("{issue}");
    }
    info!(
        items = response.items.len(),
        accuracy = response.accuracy,
        "{}",
        response.diagnostics.summary()
    );
    serde_json::to_value(&response.items).context("serializing result")
}
