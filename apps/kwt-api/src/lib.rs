pub mod routes;
pub mod state;

use std::net::SocketAddr;

use clap::Parser;
use color_eyre::eyre;
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

use crate::state::AppState;

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

	init_tracing(&config);

	let http_addr: SocketAddr = config.service.http_bind.parse()?;
	let admin_addr: SocketAddr = config.service.admin_bind.parse()?;

	if config.security.bind_localhost_only && !http_addr.ip().is_loopback() {
		return Err(eyre::eyre!(
			"http_bind must be a loopback address when bind_localhost_only is true."
		));
	}
	if !admin_addr.ip().is_loopback() {
		return Err(eyre::eyre!("admin_bind must be a loopback address."));
	}

	let (state, cache) = AppState::new(config).await?;
	let app = routes::router(state.clone());
	let admin_app = routes::admin_router(state.clone());

	match state.service.warm_popular_cache_if_empty().await {
		Ok(Some(report)) => tracing::info!(entries = report.entries, "Popular cache warmed."),
		Ok(None) => {},
		Err(err) => tracing::warn!(error = %err, "Popular cache warm-up failed."),
	}

	let http_listener = TcpListener::bind(http_addr).await?;

	tracing::info!(%http_addr, "HTTP server listening.");

	let http_server = axum::serve(http_listener, app).with_graceful_shutdown(shutdown_signal());
	let admin_listener = TcpListener::bind(admin_addr).await?;

	tracing::info!(%admin_addr, "Admin server listening.");

	let admin_server =
		axum::serve(admin_listener, admin_app).with_graceful_shutdown(shutdown_signal());
	let served = tokio::try_join!(http_server, admin_server);

	drop(state);
	cache.shutdown().await;
	served?;

	tracing::info!("Servers stopped.");

	Ok(())
}

fn init_tracing(config: &kwt_config::Config) {
	let filter =
		EnvFilter::try_new(&config.service.log_level).unwrap_or_else(|_| EnvFilter::new("info"));

	tracing_subscriber::fmt().with_env_filter(filter).init();
}

async fn shutdown_signal() {
	if let Err(err) = tokio::signal::ctrl_c().await {
		tracing::error!(error = %err, "Failed to listen for the shutdown signal.");

		std::future::pending::<()>().await;
	}

	tracing::info!("Shutdown signal received.");
}
