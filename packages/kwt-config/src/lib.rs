mod error;
mod types;

pub use error::{Error, Result};
pub use types::{
	Config, Popular, Postgres, Recent, Reconcile, Redis, Security, Service, Storage, Tracking,
};

use std::{fs, net::SocketAddr, path::Path};

const MAX_POPULAR_LIMIT: u32 = 1_000;
const MAX_UTC_OFFSET_HOURS: u8 = 23;

pub fn load(path: &Path) -> Result<Config> {
	let raw = fs::read_to_string(path)
		.map_err(|err| Error::ReadConfig { path: path.to_path_buf(), source: err })?;

	let mut cfg: Config = toml::from_str(&raw)
		.map_err(|err| Error::ParseConfig { path: path.to_path_buf(), source: err })?;

	normalize(&mut cfg);

	validate(&cfg)?;

	Ok(cfg)
}

pub fn validate(cfg: &Config) -> Result<()> {
	for (field, value) in [
		("service.http_bind", &cfg.service.http_bind),
		("service.admin_bind", &cfg.service.admin_bind),
		("storage.postgres.dsn", &cfg.storage.postgres.dsn),
		("storage.redis.url", &cfg.storage.redis.url),
		("popular.cache_key", &cfg.popular.cache_key),
		("recent.key_prefix", &cfg.recent.key_prefix),
	] {
		if value.trim().is_empty() {
			return Err(Error::Validation { field, requirement: "must be non-empty" });
		}
	}

	match cfg.service.admin_bind.parse::<SocketAddr>() {
		Ok(addr) if addr.ip().is_loopback() => {},
		Ok(_) => {
			return Err(Error::Validation {
				field: "service.admin_bind",
				requirement: "must be a loopback address",
			});
		},
		Err(_) => {
			return Err(Error::Validation {
				field: "service.admin_bind",
				requirement: "must be a socket address",
			});
		},
	}

	if cfg.service.http_bind.parse::<SocketAddr>().is_err() {
		return Err(Error::Validation {
			field: "service.http_bind",
			requirement: "must be a socket address",
		});
	}
	if cfg.storage.postgres.pool_max_conns == 0 {
		return Err(Error::Validation {
			field: "storage.postgres.pool_max_conns",
			requirement: "must be greater than zero",
		});
	}
	if cfg.storage.redis.connect_timeout_ms == 0 {
		return Err(Error::Validation {
			field: "storage.redis.connect_timeout_ms",
			requirement: "must be greater than zero",
		});
	}
	if cfg.popular.max_limit == 0 || cfg.popular.max_limit > MAX_POPULAR_LIMIT {
		return Err(Error::Validation {
			field: "popular.max_limit",
			requirement: "must be in the range 1-1000",
		});
	}
	if cfg.popular.default_limit == 0 || cfg.popular.default_limit > cfg.popular.max_limit {
		return Err(Error::Validation {
			field: "popular.default_limit",
			requirement: "must be between 1 and popular.max_limit",
		});
	}
	if cfg.popular.aggregate_window_days == 0 {
		return Err(Error::Validation {
			field: "popular.aggregate_window_days",
			requirement: "must be greater than zero",
		});
	}
	if cfg.popular.aggregate_limit == 0 {
		return Err(Error::Validation {
			field: "popular.aggregate_limit",
			requirement: "must be greater than zero",
		});
	}
	if cfg.recent.capacity == 0 {
		return Err(Error::Validation {
			field: "recent.capacity",
			requirement: "must be greater than zero",
		});
	}
	if cfg.tracking.utc_offset_hours.unsigned_abs() > MAX_UTC_OFFSET_HOURS {
		return Err(Error::Validation {
			field: "tracking.utc_offset_hours",
			requirement: "must be in the range -23 to 23",
		});
	}
	if cfg.reconcile.sweep_interval_seconds == 0 {
		return Err(Error::Validation {
			field: "reconcile.sweep_interval_seconds",
			requirement: "must be greater than zero",
		});
	}
	if cfg.reconcile.sweep_window_days == 0 {
		return Err(Error::Validation {
			field: "reconcile.sweep_window_days",
			requirement: "must be greater than zero",
		});
	}
	if cfg.reconcile.sweep_key_limit == 0 {
		return Err(Error::Validation {
			field: "reconcile.sweep_key_limit",
			requirement: "must be greater than zero",
		});
	}

	Ok(())
}

fn normalize(cfg: &mut Config) {
	cfg.service.log_level = cfg.service.log_level.trim().to_string();

	if cfg.service.log_level.is_empty() {
		cfg.service.log_level = "info".to_string();
	}

	cfg.popular.cache_key = cfg.popular.cache_key.trim().to_string();
	cfg.storage.redis.key_prefix = cfg.storage.redis.key_prefix.trim().to_string();
}
