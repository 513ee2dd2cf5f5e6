use std::sync::Arc;

use kwt_service::KeywordService;
use kwt_storage::{cache::RedisCache, db::Db};

#[derive(Clone)]
pub struct AppState {
	pub service: Arc<KeywordService>,
}
impl AppState {
	/// Connects both backends and bootstraps the schema.
	///
	/// The returned cache handle is owned by the host so it can be shut down after the servers
	/// stop.
	pub async fn new(config: kwt_config::Config) -> color_eyre::Result<(Self, RedisCache)> {
		let db = Db::connect(&config.storage.postgres).await?;

		db.ensure_schema().await?;

		let cache = RedisCache::connect(&config.storage.redis).await?;
		let service = KeywordService::new(config, db, cache.clone());

		Ok((Self::from_service(service), cache))
	}

	pub fn from_service(service: KeywordService) -> Self {
		Self { service: Arc::new(service) }
	}
}
