use std::collections::HashSet;

use crate::keyword::{Decoded, KeywordPair};

/// Decodes a newest-first cache list, keeping the first occurrence of each pair.
pub fn dedupe_recent(
	members: &[String],
	category: Option<&str>,
	limit: usize,
) -> Decoded<KeywordPair> {
	let mut decoded = Decoded::default();
	let mut seen = HashSet::new();

	for member in members {
		if decoded.items.len() >= limit {
			break;
		}

		let pair = match KeywordPair::decode_member(member) {
			Ok(pair) => pair,
			Err(err) => {
				decoded.malformed.push(err);

				continue;
			},
		};

		if pair.in_category(category) && seen.insert(pair.clone()) {
			decoded.items.push(pair);
		}
	}

	decoded
}

/// How many history rows are needed to fill a result that currently holds `current` items.
pub fn backfill_len(current: usize, limit: usize) -> usize {
	limit.saturating_sub(current)
}

/// Appends history after the cache-derived items.
///
/// History is not checked against the cache-derived items, so a pair present in both sources
/// appears twice.
pub fn append_backfill(
	mut cached: Vec<KeywordPair>,
	history: Vec<KeywordPair>,
	limit: usize,
) -> Vec<KeywordPair> {
	cached.extend(history);
	cached.truncate(limit);

	cached
}
