// ABOUTME: Main application orchestration for the trellis CLI
// ABOUTME: Coordinates logging setup, store selection, and command dispatch

use anyhow::{bail, Result};
use tracing::debug;

use super::{commands, Args};
use crate::api::Workflows;
use crate::logging;
use crate::store::StoreConfig;

pub struct App {
    config: StoreConfig,
}

impl App {
    pub fn new(config: StoreConfig) -> Self {
        Self { config }
    }

    /// Create the application from the process environment (`DB_TYPE`,
    /// `DB_DIR`, `DB_HOST`, `DB_PORT`).
    pub fn from_env() -> Self {
        Self::new(StoreConfig::from_env())
    }

    pub async fn run(&self, args: Args) -> Result<()> {
        logging::init_from(&args.log);
        debug!(config = ?self.config, "store configuration");

        let api = Workflows::init(self.config.clone()).await?;
        let result = self.dispatch(&api, args).await;
        api.close().await?;
        result
    }

    async fn dispatch(&self, api: &Workflows, args: Args) -> Result<()> {
        if let Some(id) = &args.delete {
            return commands::delete_instance(api, id).await;
        }
        if args.delete_all {
            return commands::delete_all(api).await;
        }
        if let Some(id) = &args.id {
            if let Some(tasks_path) = &args.tasks {
                return commands::resume_instance(api, id, tasks_path).await;
            }
            return commands::show_instance(api, id, args.rewind).await;
        }
        if args.tasks.is_some() {
            bail!("--tasks requires --id");
        }
        if let Some(file) = &args.file {
            return commands::run_definition(api, file).await;
        }

        bail!("nothing to do: pass --file, --id, --delete, or --deleteALL");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::StoreKind;

    #[test]
    fn test_app_uses_configured_store() {
        let app = App::new(StoreConfig::file("/tmp/trellis-test"));
        assert_eq!(app.config.kind, StoreKind::File);
    }
}
