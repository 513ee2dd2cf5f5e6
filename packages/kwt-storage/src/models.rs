use time::{Date, OffsetDateTime};
use uuid::Uuid;

/// One per-day aggregate row. Several rows may briefly share a key under concurrent writers.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct PopularSearch {
	pub search_id: i64,
	pub search_term: String,
	pub search_category: String,
	pub search_date: Date,
	pub search_count: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct PopularTotal {
	pub search_term: String,
	pub search_category: String,
	pub total_count: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct PopularKey {
	pub search_term: String,
	pub search_category: String,
	pub search_date: Date,
	pub row_count: i64,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct RecentSearch {
	pub history_id: Uuid,
	pub user_id: String,
	pub search_term: String,
	pub search_category: String,
	pub searched_at: OffsetDateTime,
}
