//! assetcache - serve large static assets from a local TTL cache
//!
//! Wires the disk stores, the HTTP origin and the cache manager together and
//! delivers the activation and request hooks from the command line.

use std::io::{self, Write};
use std::sync::Arc;

use chrono::Utc;
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use assetcache::cache::{CacheManager, DiskContentStore, DiskMetadataStore, Interception};
use assetcache::cli::{self, Cli, CliError, Command, StartupConfig};
use assetcache::origin::{HttpOrigin, Origin};

/// Sets up logging on stderr so stdout stays free for response bodies.
///
/// `RUST_LOG` controls filtering; `LOG_FORMAT=json` switches to JSON lines.
fn init_logging() -> Result<(), Box<dyn std::error::Error>> {
    let env_filter = EnvFilter::from_default_env().add_directive("assetcache=info".parse()?);

    let builder = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(io::stderr);

    if std::env::var("LOG_FORMAT")
        .map(|v| v == "json")
        .unwrap_or(false)
    {
        builder.json().init();
    } else {
        builder.init();
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_logging()?;
    run(cli).await?;
    Ok(())
}

async fn run(cli: Cli) -> Result<(), CliError> {
    let startup = StartupConfig::from_cli(&cli)?;
    info!(
        cache_dir = %startup.cache_dir.display(),
        ttl_days = startup.cache.ttl.num_days(),
        whitelist = startup.cache.whitelist.len(),
        "Starting assetcache"
    );

    let origin = Arc::new(HttpOrigin::new(startup.cache.fetch_timeout)?);
    let manager = CacheManager::new(
        startup.cache,
        Arc::new(DiskContentStore::with_dir(&startup.cache_dir)),
        Arc::new(DiskMetadataStore::with_dir(&startup.cache_dir)),
        origin.clone(),
    );

    match cli.command {
        Command::Activate => {
            let report = manager.on_activate(Utc::now()).await;
            println!("{}", cli::format_sweep(&report));
        }
        Command::Get { url, output } => {
            manager.on_activate(Utc::now()).await;

            let payload = match manager.on_request(&url).await? {
                Interception::Served(served) => {
                    info!(url = %url, source = cli::describe_source(served.source), "Served");
                    served.payload
                }
                Interception::PassThrough => {
                    info!(url = %url, "Not whitelisted, fetching without cache");
                    origin.fetch(&url).await?
                }
            };

            match output {
                Some(path) => tokio::fs::write(&path, &payload.body).await?,
                None => {
                    let mut stdout = io::stdout().lock();
                    stdout.write_all(&payload.body)?;
                    stdout.flush()?;
                }
            }
        }
        Command::Warm => {
            manager.on_activate(Utc::now()).await;

            let mut failures = 0;
            for (url, result) in manager.warm(Utc::now()).await {
                match result {
                    Ok(source) => println!("{:<28} {}", cli::describe_source(source), url),
                    Err(e) => {
                        failures += 1;
                        println!("{:<28} {} ({})", "failed", url, e);
                    }
                }
            }
            if failures > 0 {
                return Err(CliError::IncompleteWarm(failures));
            }
        }
        Command::Status => {
            let now = Utc::now();
            for line in cli::format_status(&manager.status(now).await, now) {
                println!("{}", line);
            }
        }
    }

    Ok(())
}
