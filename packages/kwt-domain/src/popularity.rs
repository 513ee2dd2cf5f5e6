use serde::{Deserialize, Serialize};
use time::{Date, Duration, OffsetDateTime, UtcOffset};

use crate::keyword::{Decoded, KeywordPair};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PopularEntry {
	pub term: String,
	pub category: String,
	pub count: i64,
}

/// What a durable write has to do with the rows currently stored for one key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MergePlan {
	Empty,
	Single { search_id: i64 },
	Merge { survivor: i64, duplicates: Vec<i64> },
}

/// Turns `(member, score)` pairs from the ranked set into entries, highest count first.
pub fn rank_popular(
	scored: Vec<(String, f64)>,
	category: Option<&str>,
	limit: usize,
) -> Decoded<PopularEntry> {
	let mut decoded = Decoded::default();

	for (member, score) in scored {
		let pair = match KeywordPair::decode_member(&member) {
			Ok(pair) => pair,
			Err(err) => {
				decoded.malformed.push(err);

				continue;
			},
		};

		if !pair.in_category(category) {
			continue;
		}

		decoded.items.push(PopularEntry {
			term: pair.term,
			category: pair.category,
			count: score_to_count(score),
		});
	}

	decoded.items.sort_by(|a, b| b.count.cmp(&a.count));
	decoded.items.truncate(limit);

	decoded
}

/// The survivor is always the lowest identifier, so concurrent reconcilers agree on it.
pub fn plan_merge(search_ids: &[i64]) -> MergePlan {
	let Some(survivor) = search_ids.iter().copied().min() else {
		return MergePlan::Empty;
	};

	if search_ids.len() == 1 {
		return MergePlan::Single { search_id: survivor };
	}

	let mut duplicates: Vec<i64> =
		search_ids.iter().copied().filter(|id| *id != survivor).collect();

	duplicates.sort_unstable();
	duplicates.dedup();

	if duplicates.is_empty() {
		return MergePlan::Single { search_id: survivor };
	}

	MergePlan::Merge { survivor, duplicates }
}

/// The calendar day an aggregate row written at `now` belongs to.
pub fn tracking_day(now: OffsetDateTime, utc_offset_hours: i8) -> Date {
	let offset = UtcOffset::from_hms(utc_offset_hours, 0, 0).unwrap_or(UtcOffset::UTC);

	now.to_offset(offset).date()
}

/// First day included in a window of `window_days` ending at `today`.
pub fn window_start(today: Date, window_days: u32) -> Date {
	today.checked_sub(Duration::days(i64::from(window_days))).unwrap_or(Date::MIN)
}

fn score_to_count(score: f64) -> i64 {
	if score.is_finite() && score > 0.0 { score.round() as i64 } else { 0 }
}
