use anyhow::{anyhow, Result};
use datdns::{Config, DynPersistentCache, FilePersistentCache, HttpTransport, ResolveOptions, Resolver};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const CONFIG_ENV: &str = "DATDNS_CONFIG";

#[tokio::main]
async fn main() -> Result<()> {
    tracing_init();

    let mut args = std::env::args();
    let program_name = args.next().unwrap_or("datdns".to_string());
    let names: Vec<String> = args.collect();
    if names.is_empty() {
        return Err(anyhow!("usage: {program_name} <name> [<name>...]"));
    }

    let config = Arc::new(config_init()?);
    let transport = Arc::new(HttpTransport::new(config.request_timeout)?);
    let mut resolver = Resolver::new(config.clone(), transport)?;
    if let Some(path) = &config.persistent_cache_path {
        let persistent: DynPersistentCache =
            Arc::new(RwLock::new(FilePersistentCache::try_from_file(path).await?));
        resolver = resolver.with_persistent_cache(persistent);
    }

    let mut failed = 0;
    for name in &names {
        match resolver.resolve_name(name, ResolveOptions::default()).await {
            Ok(key) => println!("{name} {key}"),
            Err(err) => {
                tracing::error!("failed to resolve \"{name}\": {err}");
                failed += 1;
            }
        }
    }

    resolver.finish_pending_writes().await;

    if failed > 0 {
        return Err(anyhow!("{failed} of {} names failed to resolve", names.len()));
    }
    Ok(())
}

fn tracing_init() {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "datdns=info".into()),
        )
        .init();
}

fn config_init() -> Result<Config> {
    match std::env::var(CONFIG_ENV) {
        Err(_) => Ok(Config::default()),
        Ok(config_file) => {
            let config = Config::try_from_file(&config_file)?;
            tracing::debug!("loaded config from {config_file}");
            Ok(config)
        }
    }
}
