//! Inspection lineage command-line host.
//!
//! Resolves and adjudicates inspection checklists stored in a local SQLite
//! database.

use anyhow::Result;
use clap::Parser;
use inspection_lineage::cli::{Cli, commands};
use inspection_lineage::config::ConfigLoader;
use inspection_lineage::db::Database;
use inspection_lineage::engine::Engine;
use inspection_lineage::error::EngineError;
use inspection_lineage::logging::{self, LogTarget};
use inspection_lineage::store::{EnvIdentity, IdentityProvider, SqliteStore, StaticIdentity};
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{debug, error};

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    logging::init(&LogTarget::parse(&cli.log), cli.verbose)?;

    // If explicit config path given, set it as env var for ConfigLoader to pick up
    // SAFETY: This is safe at program startup before any other threads are spawned
    if let Some(config_path) = &cli.config {
        unsafe {
            std::env::set_var("INSPECTION_LINEAGE_CONFIG_PATH", config_path);
        }
    }
    let mut loader = ConfigLoader::load()?;
    if let Some(path) = loader.config_path() {
        debug!(path = %path.display(), "Using config file");
    }

    let config = loader.config_mut();
    if let Some(db_path) = &cli.database {
        config.store.db_path = db_path.into();
    }

    let db = Arc::new(Database::open(&config.store.db_path)?);
    let store = Arc::new(SqliteStore::new(db));
    let identity: Arc<dyn IdentityProvider> = match cli.user {
        Some(ref user) => Arc::new(StaticIdentity::new(user.clone())),
        None => Arc::new(EnvIdentity),
    };
    let engine = Engine::new(store, identity, config.engine);

    match commands::execute(&engine, &cli.command, cli.format).await {
        Ok(output) => {
            println!("{}", output);
            Ok(ExitCode::SUCCESS)
        }
        Err(err) => {
            match err.downcast_ref::<EngineError>() {
                Some(engine_err) => {
                    error!(code = ?engine_err.code, error = %engine_err, "Command failed");
                    eprintln!("{}", engine_err.user_message());
                }
                None => {
                    error!(error = %err, "Command failed");
                    eprintln!("Error: {:#}", err);
                }
            }
            Ok(ExitCode::FAILURE)
        }
    }
}
