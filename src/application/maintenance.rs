//! Catalog reinitialization.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use catalogd_api_types::InitializeResponse;
use tracing::info;

use crate::application::chairs::ChairService;
use crate::application::error::CatalogError;
use crate::application::estates::EstateService;
use crate::application::repos::{MaintenanceRepo, SqlScript};

pub const IMPLEMENTATION_LANGUAGE: &str = "rust";

#[derive(Clone)]
pub struct MaintenanceService {
    repo: Arc<dyn MaintenanceRepo>,
    scripts: Arc<[PathBuf]>,
    chairs: ChairService,
    estates: EstateService,
}

impl MaintenanceService {
    pub fn new(
        repo: Arc<dyn MaintenanceRepo>,
        scripts: Vec<PathBuf>,
        chairs: ChairService,
        estates: EstateService,
    ) -> Self {
        Self {
            repo,
            scripts: scripts.into(),
            chairs,
            estates,
        }
    }

    /// Reset the store from the configured scripts and rebuild every cache
    /// from it.
    ///
    /// Query tiers are flushed before the scripts run, so nothing computed
    /// against the old data is served while the reset is in progress.
    pub async fn initialize(&self) -> Result<InitializeResponse, CatalogError> {
        self.chairs.catalog().invalidate_queries();
        self.estates.catalog().invalidate_queries();

        let scripts = read_scripts(&self.scripts).await?;
        self.repo.reset(&scripts).await?;

        let estates = self.estates.catalog().reload().await?;
        let chairs = self.chairs.catalog().reload().await?;
        info!(
            scripts = scripts.len(),
            estates, chairs, "Catalog reinitialized"
        );

        Ok(InitializeResponse {
            language: IMPLEMENTATION_LANGUAGE.to_string(),
        })
    }

    /// Fill both entity caches from the store. Used once at startup.
    pub async fn preload(&self) -> Result<(usize, usize), CatalogError> {
        let estates = self.estates.catalog().reload().await?;
        let chairs = self.chairs.catalog().reload().await?;
        Ok((chairs, estates))
    }
}

async fn read_scripts(paths: &[PathBuf]) -> Result<Vec<SqlScript>, CatalogError> {
    let mut scripts = Vec::with_capacity(paths.len());
    for path in paths {
        let sql = tokio::fs::read_to_string(path).await.map_err(|err| {
            CatalogError::internal(format!("failed to read `{}`: {err}", path.display()))
        })?;
        scripts.push(SqlScript {
            name: script_name(path),
            sql,
        });
    }
    Ok(scripts)
}

fn script_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}
