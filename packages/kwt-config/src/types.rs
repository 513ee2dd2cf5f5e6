use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct Config {
	pub service: Service,
	pub storage: Storage,
	#[serde(default)]
	pub popular: Popular,
	#[serde(default)]
	pub recent: Recent,
	#[serde(default)]
	pub tracking: Tracking,
	#[serde(default)]
	pub reconcile: Reconcile,
	pub security: Security,
}

#[derive(Debug, Deserialize)]
pub struct Service {
	pub http_bind: String,
	pub admin_bind: String,
	pub log_level: String,
}

#[derive(Debug, Deserialize)]
pub struct Storage {
	pub postgres: Postgres,
	pub redis: Redis,
}

#[derive(Debug, Deserialize)]
pub struct Postgres {
	pub dsn: String,
	pub pool_max_conns: u32,
}

#[derive(Debug, Deserialize)]
pub struct Redis {
	pub url: String,
	/// Prepended to every cache key, e.g. "prod:keywords:".
	#[serde(default)]
	pub key_prefix: String,
	#[serde(default = "default_connect_timeout_ms")]
	pub connect_timeout_ms: u64,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Popular {
	pub cache_key: String,
	pub default_limit: u32,
	pub max_limit: u32,
	pub aggregate_window_days: u32,
	pub aggregate_limit: u32,
}
impl Default for Popular {
	fn default() -> Self {
		Self {
			cache_key: "popular_searches".to_string(),
			default_limit: 10,
			max_limit: 100,
			aggregate_window_days: 30,
			aggregate_limit: 100,
		}
	}
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Recent {
	/// Session keys are appended to this prefix to form the list key.
	pub key_prefix: String,
	pub capacity: u32,
}
impl Default for Recent {
	fn default() -> Self {
		Self { key_prefix: "recent_searches:".to_string(), capacity: 20 }
	}
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Tracking {
	/// Offset applied to UTC when deciding which calendar day an aggregate row belongs to.
	pub utc_offset_hours: i8,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Reconcile {
	pub sweep_interval_seconds: u64,
	pub sweep_window_days: u32,
	/// Most duplicated keys merged by one sweep. The rest wait for the next one.
	pub sweep_key_limit: u32,
	pub warm_cache_on_empty: bool,
}
impl Default for Reconcile {
	fn default() -> Self {
		Self {
			sweep_interval_seconds: 300,
			sweep_window_days: 2,
			sweep_key_limit: 1_000,
			warm_cache_on_empty: true,
		}
	}
}

#[derive(Debug, Deserialize)]
pub struct Security {
	pub bind_localhost_only: bool,
}

fn default_connect_timeout_ms() -> u64 {
	2_000
}
