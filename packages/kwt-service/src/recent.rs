use std::sync::Arc;

use time::OffsetDateTime;

use crate::{Error, KeywordCache, KeywordStore, Result};
use kwt_config::Config;
use kwt_domain::{KeywordPair, recency};

/// Per-session list of recent searches, backed by durable history for signed-in users.
pub struct RecencyTracker {
	store: Arc<dyn KeywordStore>,
	cache: Arc<dyn KeywordCache>,
	key_prefix: String,
	capacity: u32,
}
impl RecencyTracker {
	pub fn new(cfg: &Config, store: Arc<dyn KeywordStore>, cache: Arc<dyn KeywordCache>) -> Self {
		Self { store, cache, key_prefix: cfg.recent.key_prefix.clone(), capacity: cfg.recent.capacity }
	}

	pub fn list_key(&self, session_key: &str) -> String {
		format!("{}{}", self.key_prefix, session_key)
	}

	pub async fn record_recent(
		&self,
		session_key: &str,
		term: &str,
		category: &str,
		user_id: Option<&str>,
	) -> Result<()> {
		let session_key = parse_session_key(session_key)?;
		let pair = KeywordPair::parse(term, category)?;

		if let Some(user_id) = crate::signed_in(user_id) {
			if let Err(err) = self.append_history(user_id, &pair).await {
				tracing::warn!(
					error = %err,
					user_id,
					term = %pair.term,
					"Failed to append search history. Continuing with the cache list."
				);
			}
		}

		let key = self.list_key(session_key);

		self.cache.push_front(&key, &pair.encode_member()).await?;
		self.cache.trim(&key, 0, self.capacity as isize - 1).await?;

		Ok(())
	}

	/// Newest first, deduplicated by pair.
	///
	/// A short cache list is topped up from durable history when `user_id` is known. History is
	/// appended as stored, so a pair present in both sources can appear twice.
	pub async fn get_recent(
		&self,
		session_key: &str,
		user_id: Option<&str>,
		category: Option<&str>,
		limit: Option<u32>,
	) -> Result<Vec<KeywordPair>> {
		let session_key = parse_session_key(session_key)?;
		let category = crate::category_filter(category);
		let limit = limit.unwrap_or(self.capacity);

		if limit == 0 || limit > self.capacity {
			return Err(Error::invalid(format!("limit must be between 1 and {}.", self.capacity)));
		}

		let limit = limit as usize;
		let key = self.list_key(session_key);
		let members = self.cache.range(&key).await?;
		let decoded = recency::dedupe_recent(&members, category, limit);

		for err in &decoded.malformed {
			tracing::warn!(error = %err, %key, "Skipping malformed cache member.");
		}

		let missing = recency::backfill_len(decoded.items.len(), limit);
		let Some(user_id) = crate::signed_in(user_id).filter(|_| missing > 0) else {
			return Ok(decoded.items);
		};
		let mut session = self.store.open_session().await?;
		let history = session.recent_for_user(user_id, category, missing as i64).await?;
		let history = history
			.into_iter()
			.map(|row| KeywordPair { term: row.search_term, category: row.search_category })
			.collect();

		Ok(recency::append_backfill(decoded.items, history, limit))
	}

	async fn append_history(&self, user_id: &str, pair: &KeywordPair) -> Result<()> {
		let mut session = self.store.open_session().await?;

		session.append_recent(user_id, pair, OffsetDateTime::now_utc()).await?;
		session.commit().await
	}
}

fn parse_session_key(session_key: &str) -> Result<&str> {
	let session_key = session_key.trim();

	if session_key.is_empty() {
		return Err(Error::invalid("session_key must be non-empty."));
	}

	Ok(session_key)
}
