pub mod worker;

use std::sync::Arc;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use kwt_service::KeywordService;
use kwt_storage::{cache::RedisCache, db::Db};

#[derive(Debug, Parser)]
#[command(
	version = kwt_cli::VERSION,
	rename_all = "kebab",
	styles = kwt_cli::styles(),
)]
pub struct Args {
	#[command(flatten)]
	pub config: kwt_cli::ConfigArgs,
}

pub async fn run(args: Args) -> color_eyre::Result<()> {
	let config = kwt_config::load(&args.config.config)?;
	let filter =
		EnvFilter::try_new(&config.service.log_level).unwrap_or_else(|_| EnvFilter::new("info"));

	tracing_subscriber::fmt().with_env_filter(filter).init();

	let db = Db::connect(&config.storage.postgres).await?;

	db.ensure_schema().await?;

	let cache = RedisCache::connect(&config.storage.redis).await?;
	let state = worker::WorkerState {
		sweep_interval: std::time::Duration::from_secs(config.reconcile.sweep_interval_seconds),
		service: Arc::new(KeywordService::new(config, db, cache.clone())),
	};

	tokio::select! {
		_ = worker::run_worker(&state) => {},
		signal = tokio::signal::ctrl_c() => {
			if let Err(err) = signal {
				tracing::error!(error = %err, "Failed to listen for the shutdown signal.");
			}

			tracing::info!("Shutdown signal received.");
		},
	}

	drop(state);
	cache.shutdown().await;

	Ok(())
}
