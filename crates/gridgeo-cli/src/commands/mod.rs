pub mod graph;
pub mod import;
pub mod query;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use gridgeo_core::{Country, GridNetwork};
use gridgeo_io::{load_network, InMemoryGeoStore};
use gridgeo_service::{GeoDataConfig, GeoDataService};

/// Configuration plus the directory its relative paths resolve against.
pub struct AppContext {
    pub config: GeoDataConfig,
    base_dir: Option<PathBuf>,
}

impl AppContext {
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            return Ok(Self {
                config: GeoDataConfig::default(),
                base_dir: None,
            });
        };
        let config = GeoDataConfig::load(path)
            .with_context(|| format!("loading config '{}'", path.display()))?;
        Ok(Self {
            config,
            base_dir: path.parent().map(Path::to_path_buf),
        })
    }

    fn resolve(&self, path: &Path) -> PathBuf {
        match &self.base_dir {
            Some(base) if path.is_relative() => base.join(path),
            _ => path.to_path_buf(),
        }
    }

    /// The network given on the command line, else `[data] network`.
    pub fn network(&self, arg: Option<&Path>) -> Result<GridNetwork> {
        let path = match arg {
            Some(path) => path.to_path_buf(),
            None => self
                .config
                .data
                .network
                .as_deref()
                .map(|p| self.resolve(p))
                .ok_or_else(|| anyhow!("no network given: pass --network or set [data] network"))?,
        };
        load_network(&path)
    }

    /// The store given on the command line, else `[data] store`.
    pub fn store_path(&self, arg: Option<&Path>) -> Option<PathBuf> {
        arg.map(Path::to_path_buf)
            .or_else(|| self.config.data.store.as_deref().map(|p| self.resolve(p)))
    }

    pub fn service(&self, store: InMemoryGeoStore) -> Result<GeoDataService<InMemoryGeoStore>> {
        let defaults = self
            .config
            .default_positions(self.base_dir.as_deref())
            .context("building default positions")?;
        Ok(GeoDataService::new(store, Arc::new(defaults), self.config.engine))
    }
}

pub fn parse_countries(codes: &[String]) -> Result<Vec<Country>> {
    codes
        .iter()
        .map(|code| Country::parse(code).map_err(anyhow::Error::from))
        .collect()
}
