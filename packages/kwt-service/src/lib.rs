//! Keyword tracking core: a popularity tracker and a recency tracker over a durable store and a
//! cache, exposed through [`KeywordService`].

pub mod admin;
pub mod backends;
pub mod popular;
pub mod recent;

mod error;

use std::{future::Future, pin::Pin, sync::Arc};

use serde::{Deserialize, Serialize};
use time::{Date, OffsetDateTime};

pub use admin::{PopularAggregateRequest, RebuildReport, RebuildRequest, SweepReport, SweepRequest};
pub use error::{Error, Result};
pub use popular::PopularityTracker;
pub use recent::RecencyTracker;

use kwt_config::Config;
use kwt_domain::{KeywordPair, popularity::PopularEntry};
use kwt_storage::{
	cache::RedisCache,
	db::Db,
	models::{PopularKey, PopularSearch, PopularTotal, RecentSearch},
};

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Durable side of both trackers. Every logical operation opens its own session.
pub trait KeywordStore
where
	Self: Send + Sync,
{
	fn open_session(&self) -> BoxFuture<'_, Result<Box<dyn KeywordSession>>>;
}

/// A scoped unit of work. Dropping it without [`KeywordSession::commit`] discards its writes.
pub trait KeywordSession
where
	Self: Send,
{
	/// All aggregate rows for one key, lowest identifier first, locked until the session ends.
	fn popular_rows<'a>(
		&'a mut self,
		pair: &'a KeywordPair,
		date: Date,
	) -> BoxFuture<'a, Result<Vec<PopularSearch>>>;

	fn insert_popular<'a>(
		&'a mut self,
		pair: &'a KeywordPair,
		date: Date,
		count: i64,
	) -> BoxFuture<'a, Result<i64>>;

	/// Returns false when the row is gone.
	fn add_popular_count(&mut self, search_id: i64, delta: i64) -> BoxFuture<'_, Result<bool>>;

	/// Returns the removed row's count, or `None` when it was already deleted.
	fn delete_popular(&mut self, search_id: i64) -> BoxFuture<'_, Result<Option<i64>>>;

	fn popular_totals(
		&mut self,
		since: Date,
		limit: i64,
	) -> BoxFuture<'_, Result<Vec<PopularTotal>>>;

	fn duplicate_keys(&mut self, since: Date, limit: i64) -> BoxFuture<'_, Result<Vec<PopularKey>>>;

	fn append_recent<'a>(
		&'a mut self,
		user_id: &'a str,
		pair: &'a KeywordPair,
		searched_at: OffsetDateTime,
	) -> BoxFuture<'a, Result<()>>;

	fn recent_for_user<'a>(
		&'a mut self,
		user_id: &'a str,
		category: Option<&'a str>,
		limit: i64,
	) -> BoxFuture<'a, Result<Vec<RecentSearch>>>;

	fn commit(self: Box<Self>) -> BoxFuture<'static, Result<()>>;
}

/// Fast side of both trackers: one ranked set for popularity and one list per session.
pub trait KeywordCache
where
	Self: Send + Sync,
{
	fn incr_score<'a>(
		&'a self,
		key: &'a str,
		member: &'a str,
		delta: f64,
	) -> BoxFuture<'a, Result<f64>>;

	/// Highest score first.
	fn range_by_score_desc<'a>(
		&'a self,
		key: &'a str,
	) -> BoxFuture<'a, Result<Vec<(String, f64)>>>;

	fn ranked_len<'a>(&'a self, key: &'a str) -> BoxFuture<'a, Result<u64>>;

	/// Replaces the whole ranked set in one step.
	fn replace_scores<'a>(
		&'a self,
		key: &'a str,
		entries: &'a [(String, f64)],
	) -> BoxFuture<'a, Result<()>>;

	fn push_front<'a>(&'a self, key: &'a str, value: &'a str) -> BoxFuture<'a, Result<()>>;

	fn trim<'a>(&'a self, key: &'a str, start: isize, stop: isize) -> BoxFuture<'a, Result<()>>;

	/// The whole list, head first.
	fn range<'a>(&'a self, key: &'a str) -> BoxFuture<'a, Result<Vec<String>>>;
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct PopularSearchesRequest {
	pub category: Option<String>,
	pub limit: Option<u32>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct UpdatePopularRequest {
	pub term: String,
	pub category: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AddRecentRequest {
	pub term: String,
	pub category: String,
	pub session_key: String,
	pub user_id: Option<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RecentSearchesRequest {
	pub session_key: String,
	pub user_id: Option<String>,
	pub category: Option<String>,
	pub limit: Option<u32>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusResponse {
	pub status: String,
}
impl StatusResponse {
	pub fn success() -> Self {
		Self { status: "success".to_string() }
	}
}

pub struct KeywordService {
	pub cfg: Config,
	pub popularity: PopularityTracker,
	pub recency: RecencyTracker,
}
impl KeywordService {
	pub fn new(cfg: Config, db: Db, cache: RedisCache) -> Self {
		Self::with_backends(cfg, Arc::new(db), Arc::new(cache))
	}

	pub fn with_backends(
		cfg: Config,
		store: Arc<dyn KeywordStore>,
		cache: Arc<dyn KeywordCache>,
	) -> Self {
		let popularity = PopularityTracker::new(&cfg, store.clone(), cache.clone());
		let recency = RecencyTracker::new(&cfg, store, cache);

		Self { cfg, popularity, recency }
	}

	pub async fn get_popular_searches(
		&self,
		req: PopularSearchesRequest,
	) -> Result<Vec<PopularEntry>> {
		self.popularity.get_popular(req.category.as_deref(), req.limit).await
	}

	pub async fn update_popular_search(&self, req: UpdatePopularRequest) -> Result<StatusResponse> {
		self.popularity.record_search(&req.term, &req.category).await?;

		Ok(StatusResponse::success())
	}

	pub async fn add_recent_search(&self, req: AddRecentRequest) -> Result<StatusResponse> {
		self.recency
			.record_recent(&req.session_key, &req.term, &req.category, req.user_id.as_deref())
			.await?;

		Ok(StatusResponse::success())
	}

	pub async fn get_recent_searches(
		&self,
		req: RecentSearchesRequest,
	) -> Result<Vec<KeywordPair>> {
		self.recency
			.get_recent(&req.session_key, req.user_id.as_deref(), req.category.as_deref(), req.limit)
			.await
	}
}

/// Treats an absent or blank category as no filter. Stored categories are trimmed, so the filter
/// is too.
pub(crate) fn category_filter(category: Option<&str>) -> Option<&str> {
	category.map(str::trim).filter(|category| !category.is_empty())
}

/// Treats an absent or blank identifier as anonymous.
pub(crate) fn signed_in(user_id: Option<&str>) -> Option<&str> {
	user_id.map(str::trim).filter(|user_id| !user_id.is_empty())
}
