//! CLI command implementations

use std::path::Path;
use std::sync::Arc;

use crate::broker::ModuleRegistry;
use crate::engine::Engine;
use crate::http_server::{BrokerConfig, HttpServer};
use crate::modules::KeyvalModule;
use crate::store::{BrokerStore, FileStore, MemoryStore};

use super::args::{Cli, Command};
use super::errors::{CliError, CliResult};

/// Dispatch a parsed CLI invocation.
pub fn run_command(cli: Cli) -> CliResult<()> {
    match cli.command {
        Command::Serve { config } => serve(config.as_deref()),
        Command::CheckConfig { config } => check_config(&config),
    }
}

/// Boot the broker and serve until the process exits.
pub fn serve(config_path: Option<&Path>) -> CliResult<()> {
    let config = match config_path {
        Some(path) => BrokerConfig::load(path)
            .map_err(|e| CliError::Config(format!("{}: {}", path.display(), e)))?,
        None => BrokerConfig::default(),
    };

    let store: Arc<dyn BrokerStore> = match &config.data_dir {
        Some(dir) => Arc::new(FileStore::open(dir)?),
        None => Arc::new(MemoryStore::new()),
    };

    let mut registry = ModuleRegistry::new();
    registry.register(Arc::new(KeyvalModule::new()))?;

    let engine = Engine::new(store, Arc::new(registry));
    let server = HttpServer::new(config, engine.clone());

    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(async {
        // Resume operations a previous process left in flight before
        // accepting new requests against them.
        engine.recover()?;
        server.start().await?;
        Ok(())
    })
}

/// Parse and report on a configuration file without starting anything.
pub fn check_config(path: &Path) -> CliResult<()> {
    let config = BrokerConfig::load(path)
        .map_err(|e| CliError::Config(format!("{}: {}", path.display(), e)))?;
    println!("configuration ok: will bind {}", config.socket_addr());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_config_accepts_minimal_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broker.json");
        std::fs::write(&path, "{}").unwrap();
        assert!(check_config(&path).is_ok());
    }

    #[test]
    fn test_check_config_reports_missing_file() {
        let err = check_config(Path::new("/no/such/file.json")).unwrap_err();
        assert!(matches!(err, CliError::Config(_)));
    }
}
