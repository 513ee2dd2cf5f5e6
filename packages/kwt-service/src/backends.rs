//! Production implementations of the store and cache seams.

use sqlx::{Postgres, Transaction};
use time::{Date, OffsetDateTime};

use crate::{BoxFuture, Error, KeywordCache, KeywordSession, KeywordStore, Result};
use kwt_domain::KeywordPair;
use kwt_storage::{
	cache::RedisCache,
	db::Db,
	models::{PopularKey, PopularSearch, PopularTotal, RecentSearch},
	queries,
};

struct PgSession {
	tx: Transaction<'static, Postgres>,
}

impl KeywordStore for Db {
	fn open_session(&self) -> BoxFuture<'_, Result<Box<dyn KeywordSession>>> {
		Box::pin(async move {
			self.begin()
				.await
				.map(|tx| Box::new(PgSession { tx }) as Box<dyn KeywordSession>)
				.map_err(Error::from)
		})
	}
}

impl KeywordSession for PgSession {
	fn popular_rows<'a>(
		&'a mut self,
		pair: &'a KeywordPair,
		date: Date,
	) -> BoxFuture<'a, Result<Vec<PopularSearch>>> {
		Box::pin(async move {
			queries::select_popular_rows(&mut *self.tx, &pair.term, &pair.category, date)
				.await
				.map_err(Error::from)
		})
	}

	fn insert_popular<'a>(
		&'a mut self,
		pair: &'a KeywordPair,
		date: Date,
		count: i64,
	) -> BoxFuture<'a, Result<i64>> {
		Box::pin(async move {
			queries::insert_popular(&mut *self.tx, &pair.term, &pair.category, date, count)
				.await
				.map_err(Error::from)
		})
	}

	fn add_popular_count(&mut self, search_id: i64, delta: i64) -> BoxFuture<'_, Result<bool>> {
		Box::pin(async move {
			queries::add_popular_count(&mut *self.tx, search_id, delta).await.map_err(Error::from)
		})
	}

	fn delete_popular(&mut self, search_id: i64) -> BoxFuture<'_, Result<Option<i64>>> {
		Box::pin(async move {
			queries::delete_popular(&mut *self.tx, search_id).await.map_err(Error::from)
		})
	}

	fn popular_totals(
		&mut self,
		since: Date,
		limit: i64,
	) -> BoxFuture<'_, Result<Vec<PopularTotal>>> {
		Box::pin(async move {
			queries::sum_popular_since(&mut *self.tx, since, limit).await.map_err(Error::from)
		})
	}

	fn duplicate_keys(&mut self, since: Date, limit: i64) -> BoxFuture<'_, Result<Vec<PopularKey>>> {
		Box::pin(async move {
			queries::select_duplicate_keys(&mut *self.tx, since, limit).await.map_err(Error::from)
		})
	}

	fn append_recent<'a>(
		&'a mut self,
		user_id: &'a str,
		pair: &'a KeywordPair,
		searched_at: OffsetDateTime,
	) -> BoxFuture<'a, Result<()>> {
		Box::pin(async move {
			queries::insert_recent(
				&mut *self.tx,
				user_id,
				&pair.term,
				&pair.category,
				searched_at,
			)
			.await
			.map(|_| ())
			.map_err(Error::from)
		})
	}

	fn recent_for_user<'a>(
		&'a mut self,
		user_id: &'a str,
		category: Option<&'a str>,
		limit: i64,
	) -> BoxFuture<'a, Result<Vec<RecentSearch>>> {
		Box::pin(async move {
			queries::select_recent_for_user(&mut *self.tx, user_id, category, limit)
				.await
				.map_err(Error::from)
		})
	}

	fn commit(self: Box<Self>) -> BoxFuture<'static, Result<()>> {
		Box::pin(async move { self.tx.commit().await.map_err(Error::from) })
	}
}

impl KeywordCache for RedisCache {
	fn incr_score<'a>(
		&'a self,
		key: &'a str,
		member: &'a str,
		delta: f64,
	) -> BoxFuture<'a, Result<f64>> {
		Box::pin(async move {
			RedisCache::incr_score(self, key, member, delta).await.map_err(Error::from)
		})
	}

	fn range_by_score_desc<'a>(
		&'a self,
		key: &'a str,
	) -> BoxFuture<'a, Result<Vec<(String, f64)>>> {
		Box::pin(async move { RedisCache::range_by_score_desc(self, key).await.map_err(Error::from) })
	}

	fn ranked_len<'a>(&'a self, key: &'a str) -> BoxFuture<'a, Result<u64>> {
		Box::pin(async move { RedisCache::ranked_len(self, key).await.map_err(Error::from) })
	}

	fn replace_scores<'a>(
		&'a self,
		key: &'a str,
		entries: &'a [(String, f64)],
	) -> BoxFuture<'a, Result<()>> {
		Box::pin(async move {
			RedisCache::replace_scores(self, key, entries).await.map_err(Error::from)
		})
	}

	fn push_front<'a>(&'a self, key: &'a str, value: &'a str) -> BoxFuture<'a, Result<()>> {
		Box::pin(async move { RedisCache::push_front(self, key, value).await.map_err(Error::from) })
	}

	fn trim<'a>(&'a self, key: &'a str, start: isize, stop: isize) -> BoxFuture<'a, Result<()>> {
		Box::pin(async move { RedisCache::trim(self, key, start, stop).await.map_err(Error::from) })
	}

	fn range<'a>(&'a self, key: &'a str) -> BoxFuture<'a, Result<Vec<String>>> {
		Box::pin(async move { RedisCache::range(self, key).await.map_err(Error::from) })
	}
}
