use async_trait::async_trait;
use tracing::{info, warn};

use crate::application::repos::{MaintenanceRepo, RepoError, SqlScript};

use super::{PostgresRepositories, map_sqlx_error};

#[async_trait]
impl MaintenanceRepo for PostgresRepositories {
    async fn reset(&self, scripts: &[SqlScript]) -> Result<(), RepoError> {
        for script in scripts {
            if let Err(err) = sqlx::raw_sql(&script.sql).execute(self.pool()).await {
                warn!(script = %script.name, error = %err, "Initialization script failed");
                return Err(map_sqlx_error(err));
            }
            info!(script = %script.name, "Ran initialization script");
        }
        Ok(())
    }
}
