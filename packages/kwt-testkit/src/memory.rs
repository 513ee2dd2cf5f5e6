//! In-process stand-ins for the Postgres store and the Redis cache.
//!
//! Writes from a session apply immediately and `commit` is a no-op. Reads of aggregate rows yield
//! to the runtime before returning so concurrent writers interleave the way they do against a
//! real database.

use std::{
	collections::{BTreeMap, HashMap, VecDeque},
	sync::{
		Arc, Mutex, MutexGuard,
		atomic::{AtomicBool, Ordering},
	},
};

use time::{Date, OffsetDateTime};
use uuid::Uuid;

use kwt_domain::KeywordPair;
use kwt_service::{BoxFuture, Error, KeywordCache, KeywordSession, KeywordStore, Result};
use kwt_storage::models::{PopularKey, PopularSearch, PopularTotal, RecentSearch};

#[derive(Default)]
struct StoreState {
	next_search_id: i64,
	popular: BTreeMap<i64, PopularSearch>,
	recent: Vec<RecentSearch>,
}
impl StoreState {
	fn insert_popular(&mut self, pair: &KeywordPair, date: Date, count: i64) -> i64 {
		self.next_search_id += 1;

		let search_id = self.next_search_id;

		self.popular.insert(
			search_id,
			PopularSearch {
				search_id,
				search_term: pair.term.clone(),
				search_category: pair.category.clone(),
				search_date: date,
				search_count: count,
			},
		);

		search_id
	}
}

#[derive(Clone, Default)]
pub struct MemoryStore {
	state: Arc<Mutex<StoreState>>,
	fail_history: Arc<AtomicBool>,
}
impl MemoryStore {
	pub fn new() -> Self {
		Self::default()
	}

	/// Makes every later history append fail with a storage error.
	pub fn fail_history_appends(&self, fail: bool) {
		self.fail_history.store(fail, Ordering::SeqCst);
	}

	/// Inserts an aggregate row directly, bypassing the merge logic.
	pub fn seed_popular(&self, term: &str, category: &str, date: Date, count: i64) -> i64 {
		let pair = KeywordPair { term: term.to_string(), category: category.to_string() };

		self.lock().insert_popular(&pair, date, count)
	}

	pub fn seed_history(&self, user_id: &str, term: &str, category: &str, at: OffsetDateTime) {
		self.lock().recent.push(RecentSearch {
			history_id: Uuid::new_v4(),
			user_id: user_id.to_string(),
			search_term: term.to_string(),
			search_category: category.to_string(),
			searched_at: at,
		});
	}

	/// Every aggregate row for a pair, lowest identifier first.
	pub fn popular_rows_for(&self, term: &str, category: &str) -> Vec<PopularSearch> {
		self.lock()
			.popular
			.values()
			.filter(|row| row.search_term == term && row.search_category == category)
			.cloned()
			.collect()
	}

	pub fn history_len(&self, user_id: &str) -> usize {
		self.lock().recent.iter().filter(|row| row.user_id == user_id).count()
	}

	fn lock(&self) -> MutexGuard<'_, StoreState> {
		self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
	}
}
impl KeywordStore for MemoryStore {
	fn open_session(&self) -> BoxFuture<'_, Result<Box<dyn KeywordSession>>> {
		let session: Box<dyn KeywordSession> = Box::new(MemorySession { store: self.clone() });

		Box::pin(async move { Ok(session) })
	}
}

struct MemorySession {
	store: MemoryStore,
}
impl KeywordSession for MemorySession {
	fn popular_rows<'a>(
		&'a mut self,
		pair: &'a KeywordPair,
		date: Date,
	) -> BoxFuture<'a, Result<Vec<PopularSearch>>> {
		Box::pin(async move {
			let rows: Vec<PopularSearch> = self
				.store
				.lock()
				.popular
				.values()
				.filter(|row| {
					row.search_term == pair.term
						&& row.search_category == pair.category
						&& row.search_date == date
				})
				.cloned()
				.collect();

			tokio::task::yield_now().await;

			Ok(rows)
		})
	}

	fn insert_popular<'a>(
		&'a mut self,
		pair: &'a KeywordPair,
		date: Date,
		count: i64,
	) -> BoxFuture<'a, Result<i64>> {
		let search_id = self.store.lock().insert_popular(pair, date, count);

		Box::pin(async move { Ok(search_id) })
	}

	fn add_popular_count(&mut self, search_id: i64, delta: i64) -> BoxFuture<'_, Result<bool>> {
		let updated = match self.store.lock().popular.get_mut(&search_id) {
			Some(row) => {
				row.search_count += delta;

				true
			},
			None => false,
		};

		Box::pin(async move { Ok(updated) })
	}

	fn delete_popular(&mut self, search_id: i64) -> BoxFuture<'_, Result<Option<i64>>> {
		let removed = self.store.lock().popular.remove(&search_id).map(|row| row.search_count);

		Box::pin(async move { Ok(removed) })
	}

	fn popular_totals(
		&mut self,
		since: Date,
		limit: i64,
	) -> BoxFuture<'_, Result<Vec<PopularTotal>>> {
		let mut sums: BTreeMap<(String, String), i64> = BTreeMap::new();

		for row in self.store.lock().popular.values().filter(|row| row.search_date >= since) {
			*sums.entry((row.search_term.clone(), row.search_category.clone())).or_default() +=
				row.search_count;
		}

		let mut totals: Vec<PopularTotal> = sums
			.into_iter()
			.map(|((search_term, search_category), total_count)| PopularTotal {
				search_term,
				search_category,
				total_count,
			})
			.collect();

		totals.sort_by(|a, b| b.total_count.cmp(&a.total_count));
		totals.truncate(usize::try_from(limit).unwrap_or(0));

		Box::pin(async move { Ok(totals) })
	}

	fn duplicate_keys(&mut self, since: Date, limit: i64) -> BoxFuture<'_, Result<Vec<PopularKey>>> {
		let mut counts: BTreeMap<(Date, String, String), i64> = BTreeMap::new();

		for row in self.store.lock().popular.values().filter(|row| row.search_date >= since) {
			*counts
				.entry((row.search_date, row.search_term.clone(), row.search_category.clone()))
				.or_default() += 1;
		}

		let keys: Vec<PopularKey> = counts
			.into_iter()
			.filter(|(_, row_count)| *row_count > 1)
			.take(usize::try_from(limit).unwrap_or(0))
			.map(|((search_date, search_term, search_category), row_count)| PopularKey {
				search_term,
				search_category,
				search_date,
				row_count,
			})
			.collect();

		Box::pin(async move { Ok(keys) })
	}

	fn append_recent<'a>(
		&'a mut self,
		user_id: &'a str,
		pair: &'a KeywordPair,
		searched_at: OffsetDateTime,
	) -> BoxFuture<'a, Result<()>> {
		let result = if self.store.fail_history.load(Ordering::SeqCst) {
			Err(Error::StorageUnavailable { message: "History table is unavailable.".to_string() })
		} else {
			self.store.seed_history(user_id, &pair.term, &pair.category, searched_at);

			Ok(())
		};

		Box::pin(async move { result })
	}

	fn recent_for_user<'a>(
		&'a mut self,
		user_id: &'a str,
		category: Option<&'a str>,
		limit: i64,
	) -> BoxFuture<'a, Result<Vec<RecentSearch>>> {
		let mut rows: Vec<RecentSearch> = self
			.store
			.lock()
			.recent
			.iter()
			.filter(|row| row.user_id == user_id)
			.filter(|row| category.map(|wanted| row.search_category == wanted).unwrap_or(true))
			.cloned()
			.collect();

		rows.sort_by(|a, b| b.searched_at.cmp(&a.searched_at));
		rows.truncate(usize::try_from(limit).unwrap_or(0));

		Box::pin(async move { Ok(rows) })
	}

	fn commit(self: Box<Self>) -> BoxFuture<'static, Result<()>> {
		Box::pin(async move { Ok(()) })
	}
}

#[derive(Default)]
struct CacheState {
	ranked: HashMap<String, HashMap<String, f64>>,
	lists: HashMap<String, VecDeque<String>>,
}

#[derive(Clone, Default)]
pub struct MemoryCache {
	state: Arc<Mutex<CacheState>>,
}
impl MemoryCache {
	pub fn new() -> Self {
		Self::default()
	}

	/// Writes a raw ranked-set member, encoded or not.
	pub fn seed_score(&self, key: &str, member: &str, score: f64) {
		self.lock().ranked.entry(key.to_string()).or_default().insert(member.to_string(), score);
	}

	/// Pushes a raw list value onto the head, encoded or not.
	pub fn seed_list(&self, key: &str, value: &str) {
		self.lock().lists.entry(key.to_string()).or_default().push_front(value.to_string());
	}

	pub fn list(&self, key: &str) -> Vec<String> {
		self.lock().lists.get(key).map(|list| list.iter().cloned().collect()).unwrap_or_default()
	}

	pub fn score(&self, key: &str, member: &str) -> Option<f64> {
		self.lock().ranked.get(key).and_then(|set| set.get(member).copied())
	}

	fn lock(&self) -> MutexGuard<'_, CacheState> {
		self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
	}
}
impl KeywordCache for MemoryCache {
	fn incr_score<'a>(
		&'a self,
		key: &'a str,
		member: &'a str,
		delta: f64,
	) -> BoxFuture<'a, Result<f64>> {
		let mut state = self.lock();
		let score = state.ranked.entry(key.to_string()).or_default().entry(member.to_string());
		let score = *score.and_modify(|score| *score += delta).or_insert(delta);

		drop(state);

		Box::pin(async move { Ok(score) })
	}

	fn range_by_score_desc<'a>(
		&'a self,
		key: &'a str,
	) -> BoxFuture<'a, Result<Vec<(String, f64)>>> {
		let mut members: Vec<(String, f64)> = self
			.lock()
			.ranked
			.get(key)
			.map(|set| set.iter().map(|(member, score)| (member.clone(), *score)).collect())
			.unwrap_or_default();

		// Matches ZREVRANGE: ties come back in reverse lexicographic member order.
		members.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| b.0.cmp(&a.0)));

		Box::pin(async move { Ok(members) })
	}

	fn ranked_len<'a>(&'a self, key: &'a str) -> BoxFuture<'a, Result<u64>> {
		let len = self.lock().ranked.get(key).map(|set| set.len() as u64).unwrap_or(0);

		Box::pin(async move { Ok(len) })
	}

	fn replace_scores<'a>(
		&'a self,
		key: &'a str,
		entries: &'a [(String, f64)],
	) -> BoxFuture<'a, Result<()>> {
		let set: HashMap<String, f64> = entries.iter().cloned().collect();
		let mut state = self.lock();

		if set.is_empty() {
			state.ranked.remove(key);
		} else {
			state.ranked.insert(key.to_string(), set);
		}

		drop(state);

		Box::pin(async move { Ok(()) })
	}

	fn push_front<'a>(&'a self, key: &'a str, value: &'a str) -> BoxFuture<'a, Result<()>> {
		self.seed_list(key, value);

		Box::pin(async move { Ok(()) })
	}

	fn trim<'a>(&'a self, key: &'a str, start: isize, stop: isize) -> BoxFuture<'a, Result<()>> {
		let mut state = self.lock();

		if let Some(list) = state.lists.get_mut(key) {
			let len = list.len() as isize;
			let resolve = |index: isize| if index < 0 { len + index } else { index };
			let start = resolve(start).max(0);
			let stop = resolve(stop).min(len - 1);

			if start > stop {
				list.clear();
			} else {
				list.truncate(stop as usize + 1);
				list.drain(..start as usize);
			}
		}

		drop(state);

		Box::pin(async move { Ok(()) })
	}

	fn range<'a>(&'a self, key: &'a str) -> BoxFuture<'a, Result<Vec<String>>> {
		let values = self.list(key);

		Box::pin(async move { Ok(values) })
	}
}
