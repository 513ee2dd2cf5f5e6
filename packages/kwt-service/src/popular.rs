use std::sync::Arc;

use time::{Date, OffsetDateTime};

use crate::{Error, KeywordCache, KeywordSession, KeywordStore, Result};
use kwt_config::Config;
use kwt_domain::{
	KeywordPair,
	popularity::{self, MergePlan, PopularEntry},
};

/// Ranked counter of keyword pairs.
///
/// Writes go to the per-day aggregate first and to the cache ranked set second. The two are not
/// transactional with each other. Reads come from the ranked set only.
pub struct PopularityTracker {
	pub(crate) store: Arc<dyn KeywordStore>,
	pub(crate) cache: Arc<dyn KeywordCache>,
	pub(crate) cache_key: String,
	pub(crate) utc_offset_hours: i8,
	pub(crate) default_limit: u32,
	pub(crate) max_limit: u32,
	pub(crate) aggregate_window_days: u32,
	pub(crate) aggregate_limit: u32,
	pub(crate) sweep_key_limit: u32,
}
impl PopularityTracker {
	pub fn new(cfg: &Config, store: Arc<dyn KeywordStore>, cache: Arc<dyn KeywordCache>) -> Self {
		Self {
			store,
			cache,
			cache_key: cfg.popular.cache_key.clone(),
			utc_offset_hours: cfg.tracking.utc_offset_hours,
			default_limit: cfg.popular.default_limit,
			max_limit: cfg.popular.max_limit,
			aggregate_window_days: cfg.popular.aggregate_window_days,
			aggregate_limit: cfg.popular.aggregate_limit,
			sweep_key_limit: cfg.reconcile.sweep_key_limit,
		}
	}

	/// The calendar day new aggregate rows are written under.
	pub fn today(&self) -> Date {
		popularity::tracking_day(OffsetDateTime::now_utc(), self.utc_offset_hours)
	}

	pub async fn record_search(&self, term: &str, category: &str) -> Result<()> {
		let pair = KeywordPair::parse(term, category)?;
		let today = self.today();
		let mut session = self.store.open_session().await?;

		merge_key(session.as_mut(), &pair, today, 1).await?;
		session.commit().await?;

		self.cache.incr_score(&self.cache_key, &pair.encode_member(), 1.0).await?;

		tracing::debug!(term = %pair.term, category = %pair.category, "Recorded search.");

		Ok(())
	}

	pub async fn get_popular(
		&self,
		category: Option<&str>,
		limit: Option<u32>,
	) -> Result<Vec<PopularEntry>> {
		let limit = limit.unwrap_or(self.default_limit);

		if limit == 0 || limit > self.max_limit {
			return Err(Error::invalid(format!(
				"limit must be between 1 and {}.",
				self.max_limit
			)));
		}

		let category = crate::category_filter(category);
		let scored = self.cache.range_by_score_desc(&self.cache_key).await?;
		let decoded = popularity::rank_popular(scored, category, limit as usize);

		for err in &decoded.malformed {
			tracing::warn!(error = %err, key = %self.cache_key, "Skipping malformed cache member.");
		}

		Ok(decoded.items)
	}

	/// Sums durable counts over the trailing window, highest total first.
	pub async fn get_popular_aggregate(
		&self,
		window_days: Option<u32>,
		limit: Option<u32>,
	) -> Result<Vec<PopularEntry>> {
		let window_days = window_days.unwrap_or(self.aggregate_window_days);
		let limit = limit.unwrap_or(self.aggregate_limit);

		if window_days == 0 {
			return Err(Error::invalid("window_days must be greater than zero."));
		}
		if limit == 0 {
			return Err(Error::invalid("limit must be greater than zero."));
		}

		let since = popularity::window_start(self.today(), window_days);
		let mut session = self.store.open_session().await?;
		let totals = session.popular_totals(since, i64::from(limit)).await?;

		Ok(totals
			.into_iter()
			.map(|total| PopularEntry {
				term: total.search_term,
				category: total.search_category,
				count: total.total_count,
			})
			.collect())
	}

	/// Collapses duplicate aggregate rows for one key. Returns how many rows were removed.
	pub async fn reconcile(&self, term: &str, category: &str, date: Date) -> Result<u64> {
		let pair = KeywordPair::parse(term, category)?;
		let mut session = self.store.open_session().await?;
		let removed = merge_key(session.as_mut(), &pair, date, 0).await?;

		session.commit().await?;

		if removed > 0 {
			tracing::info!(
				term = %pair.term,
				category = %pair.category,
				%date,
				removed,
				"Merged duplicate aggregate rows."
			);
		}

		Ok(removed)
	}
}

/// Applies `increment` to the single row for a key, merging duplicates into the lowest
/// identifier first.
///
/// Only counts of rows this call actually deleted are carried over, so concurrent mergers never
/// double count. Returns the number of rows deleted.
async fn merge_key(
	session: &mut dyn KeywordSession,
	pair: &KeywordPair,
	date: Date,
	increment: i64,
) -> Result<u64> {
	let rows = session.popular_rows(pair, date).await?;
	let search_ids: Vec<i64> = rows.iter().map(|row| row.search_id).collect();

	match popularity::plan_merge(&search_ids) {
		MergePlan::Empty => {
			if increment > 0 {
				session.insert_popular(pair, date, increment).await?;
			}

			Ok(0)
		},
		MergePlan::Single { search_id } => {
			if increment > 0 && !session.add_popular_count(search_id, increment).await? {
				session.insert_popular(pair, date, increment).await?;
			}

			Ok(0)
		},
		MergePlan::Merge { survivor, duplicates } => {
			let mut absorbed = 0_i64;
			let mut removed = 0_u64;

			for search_id in duplicates {
				if let Some(count) = session.delete_popular(search_id).await? {
					absorbed += count;
					removed += 1;
				}
			}

			let delta = increment + absorbed;

			if !session.add_popular_count(survivor, delta).await? && delta > 0 {
				tracing::warn!(
					term = %pair.term,
					category = %pair.category,
					survivor,
					"Merge survivor disappeared. Inserting a replacement row."
				);

				session.insert_popular(pair, date, delta).await?;
			}

			Ok(removed)
		},
	}
}
