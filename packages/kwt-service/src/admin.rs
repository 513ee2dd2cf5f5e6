use serde::{Deserialize, Serialize};

use crate::{Error, KeywordService, PopularityTracker, Result};
use kwt_domain::{
	KeywordPair,
	popularity::{self, PopularEntry},
};

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct RebuildRequest {
	pub window_days: Option<u32>,
	pub limit: Option<u32>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RebuildReport {
	pub entries: u64,
	pub window_days: u32,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct SweepRequest {
	pub window_days: Option<u32>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SweepReport {
	pub keys_scanned: u64,
	pub rows_removed: u64,
	pub failures: u64,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct PopularAggregateRequest {
	pub window_days: Option<u32>,
	pub limit: Option<u32>,
}

impl PopularityTracker {
	/// Replaces the ranked set with durable totals over the window.
	pub async fn rebuild_cache(
		&self,
		window_days: Option<u32>,
		limit: Option<u32>,
	) -> Result<RebuildReport> {
		let window_days = window_days.unwrap_or(self.aggregate_window_days);
		let totals = self.get_popular_aggregate(Some(window_days), limit).await?;
		let entries: Vec<(String, f64)> = totals
			.into_iter()
			.map(|entry| {
				let member =
					KeywordPair { term: entry.term, category: entry.category }.encode_member();

				(member, entry.count as f64)
			})
			.collect();

		self.cache.replace_scores(&self.cache_key, &entries).await?;

		tracing::info!(entries = entries.len(), window_days, "Popular cache rebuilt.");

		Ok(RebuildReport { entries: entries.len() as u64, window_days })
	}

	/// Rebuilds the ranked set only when it holds no members.
	pub async fn warm_cache_if_empty(&self) -> Result<Option<RebuildReport>> {
		if self.cache.ranked_len(&self.cache_key).await? > 0 {
			return Ok(None);
		}

		tracing::info!(key = %self.cache_key, "Popular cache is empty. Rebuilding from aggregates.");

		self.rebuild_cache(None, None).await.map(Some)
	}

	/// Merges duplicated keys since `today - window_days`, at most `sweep_key_limit` per call.
	///
	/// A failing key is logged and counted. It does not stop the sweep.
	pub async fn reconcile_sweep(&self, window_days: u32) -> Result<SweepReport> {
		if window_days == 0 {
			return Err(Error::invalid("window_days must be greater than zero."));
		}

		let since = popularity::window_start(self.today(), window_days);
		let mut session = self.store.open_session().await?;
		let keys = session.duplicate_keys(since, i64::from(self.sweep_key_limit)).await?;

		drop(session);

		if keys.len() >= self.sweep_key_limit as usize {
			tracing::warn!(
				key_limit = self.sweep_key_limit,
				"Reconcile sweep reached its key limit. Remaining duplicates wait for the next sweep."
			);
		}

		let mut report = SweepReport::default();

		for key in keys {
			report.keys_scanned += 1;

			match self.reconcile(&key.search_term, &key.search_category, key.search_date).await {
				Ok(removed) => report.rows_removed += removed,
				Err(err) => {
					report.failures += 1;

					tracing::error!(
						error = %err,
						term = %key.search_term,
						category = %key.search_category,
						date = %key.search_date,
						"Reconcile failed."
					);
				},
			}
		}

		Ok(report)
	}
}

impl KeywordService {
	pub async fn rebuild_popular_cache(&self, req: RebuildRequest) -> Result<RebuildReport> {
		self.popularity.rebuild_cache(req.window_days, req.limit).await
	}

	pub async fn warm_popular_cache_if_empty(&self) -> Result<Option<RebuildReport>> {
		if !self.cfg.reconcile.warm_cache_on_empty {
			return Ok(None);
		}

		self.popularity.warm_cache_if_empty().await
	}

	pub async fn reconcile_sweep(&self, req: SweepRequest) -> Result<SweepReport> {
		let window_days = req.window_days.unwrap_or(self.cfg.reconcile.sweep_window_days);

		self.popularity.reconcile_sweep(window_days).await
	}

	pub async fn popular_aggregate(
		&self,
		req: PopularAggregateRequest,
	) -> Result<Vec<PopularEntry>> {
		self.popularity.get_popular_aggregate(req.window_days, req.limit).await
	}
}
