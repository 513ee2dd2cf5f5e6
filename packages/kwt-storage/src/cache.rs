use std::time::Duration;

use redis::{
	AsyncCommands,
	aio::{ConnectionManager, ConnectionManagerConfig},
};

use crate::Result;

/// Process-wide Redis handle. Built once by the host at startup and released by
/// [`RedisCache::shutdown`]; clones share the same multiplexed connection.
#[derive(Clone)]
pub struct RedisCache {
	manager: ConnectionManager,
	key_prefix: String,
}
impl RedisCache {
	pub async fn connect(cfg: &kwt_config::Redis) -> Result<Self> {
		let timeout = Duration::from_millis(cfg.connect_timeout_ms);
		let client = redis::Client::open(cfg.url.as_str())?;
		let manager_cfg = ConnectionManagerConfig::new()
			.set_connection_timeout(timeout)
			.set_response_timeout(timeout);

		tracing::info!(key_prefix = %cfg.key_prefix, "Connecting to Redis.");

		let manager = match ConnectionManager::new_with_config(client, manager_cfg).await {
			Ok(manager) => manager,
			Err(err) => {
				tracing::error!(error = %err, "Redis connection failed.");

				return Err(err.into());
			},
		};
		let cache = Self { manager, key_prefix: cfg.key_prefix.clone() };

		cache.ping().await?;

		tracing::info!("Redis connection established.");

		Ok(cache)
	}

	pub fn key(&self, suffix: &str) -> String {
		format!("{}{}", self.key_prefix, suffix)
	}

	pub async fn ping(&self) -> Result<()> {
		let mut conn = self.manager.clone();
		let _: String = redis::cmd("PING").query_async(&mut conn).await?;

		Ok(())
	}

	pub async fn incr_score(&self, key: &str, member: &str, delta: f64) -> Result<f64> {
		let mut conn = self.manager.clone();
		let score: f64 = conn.zincr(self.key(key), member, delta).await?;

		Ok(score)
	}

	pub async fn range_by_score_desc(&self, key: &str) -> Result<Vec<(String, f64)>> {
		let mut conn = self.manager.clone();
		let members: Vec<(String, f64)> = conn.zrevrange_withscores(self.key(key), 0, -1).await?;

		Ok(members)
	}

	pub async fn ranked_len(&self, key: &str) -> Result<u64> {
		let mut conn = self.manager.clone();
		let len: u64 = conn.zcard(self.key(key)).await?;

		Ok(len)
	}

	/// Swaps the whole ranked set in one MULTI so readers never see it half rebuilt.
	pub async fn replace_scores(&self, key: &str, entries: &[(String, f64)]) -> Result<()> {
		let key = self.key(key);
		let mut conn = self.manager.clone();
		let mut pipe = redis::pipe();

		pipe.atomic().del(&key).ignore();

		for (member, score) in entries {
			pipe.zadd(&key, member, *score).ignore();
		}

		let _: () = pipe.query_async(&mut conn).await?;

		Ok(())
	}

	pub async fn push_front(&self, key: &str, value: &str) -> Result<()> {
		let mut conn = self.manager.clone();
		let _: () = conn.lpush(self.key(key), value).await?;

		Ok(())
	}

	pub async fn trim(&self, key: &str, start: isize, stop: isize) -> Result<()> {
		let mut conn = self.manager.clone();
		let _: () = conn.ltrim(self.key(key), start, stop).await?;

		Ok(())
	}

	pub async fn range(&self, key: &str) -> Result<Vec<String>> {
		let mut conn = self.manager.clone();
		let values: Vec<String> = conn.lrange(self.key(key), 0, -1).await?;

		Ok(values)
	}

	pub async fn shutdown(self) {
		tracing::info!("Closing Redis connection.");

		drop(self.manager);

		tracing::info!("Redis connection closed.");
	}
}

impl std::fmt::Debug for RedisCache {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("RedisCache").field("key_prefix", &self.key_prefix).finish_non_exhaustive()
	}
}
