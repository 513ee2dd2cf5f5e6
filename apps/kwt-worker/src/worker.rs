use std::{sync::Arc, time::Duration};

use tokio::time::{self as tokio_time, MissedTickBehavior};

use kwt_service::{KeywordService, SweepReport, SweepRequest};

pub struct WorkerState {
	pub service: Arc<KeywordService>,
	pub sweep_interval: Duration,
}

/// Runs one maintenance pass: warms an empty popular cache, then merges duplicate aggregate rows.
///
/// Errors are logged and the pass continues. Returns the sweep report when the sweep ran.
pub async fn run_cycle(service: &KeywordService) -> Option<SweepReport> {
	match service.warm_popular_cache_if_empty().await {
		Ok(Some(report)) => {
			tracing::info!(entries = report.entries, "Popular cache warmed from aggregates.");
		},
		Ok(None) => {},
		Err(err) => tracing::error!(error = %err, "Popular cache warm-up failed."),
	}

	match service.reconcile_sweep(SweepRequest::default()).await {
		Ok(report) => {
			if report.keys_scanned > 0 {
				tracing::info!(
					keys_scanned = report.keys_scanned,
					rows_removed = report.rows_removed,
					failures = report.failures,
					"Reconcile sweep finished."
				);
			}

			Some(report)
		},
		Err(err) => {
			tracing::error!(error = %err, "Reconcile sweep failed.");

			None
		},
	}
}

/// Loops forever, one cycle per `sweep_interval`.
pub async fn run_worker(state: &WorkerState) {
	let mut interval = tokio_time::interval(state.sweep_interval);

	interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

	tracing::info!(interval_seconds = state.sweep_interval.as_secs(), "Worker started.");

	loop {
		interval.tick().await;

		run_cycle(&state.service).await;
	}
}
