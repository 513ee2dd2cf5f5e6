use sqlx::{Executor, Postgres, QueryBuilder};
use time::{Date, OffsetDateTime};
use uuid::Uuid;

use crate::{
	Result,
	models::{PopularKey, PopularSearch, PopularTotal, RecentSearch},
};

/// Every row stored for one key, lowest identifier first, locked for the rest of the session.
pub async fn select_popular_rows<'e, E>(
	executor: E,
	term: &str,
	category: &str,
	date: Date,
) -> Result<Vec<PopularSearch>>
where
	E: Executor<'e, Database = Postgres>,
{
	let rows = sqlx::query_as::<_, PopularSearch>(
		"\
SELECT search_id, search_term, search_category, search_date, search_count
FROM popular_searches
WHERE search_term = $1
	AND search_category = $2
	AND search_date = $3
ORDER BY search_id
FOR UPDATE",
	)
	.bind(term)
	.bind(category)
	.bind(date)
	.fetch_all(executor)
	.await?;

	Ok(rows)
}

pub async fn insert_popular<'e, E>(
	executor: E,
	term: &str,
	category: &str,
	date: Date,
	count: i64,
) -> Result<i64>
where
	E: Executor<'e, Database = Postgres>,
{
	if count < 0 {
		return Err(crate::Error::InvalidArgument(
			"search_count must be zero or greater.".to_string(),
		));
	}

	let search_id = sqlx::query_scalar::<_, i64>(
		"\
INSERT INTO popular_searches (search_term, search_category, search_date, search_count)
VALUES ($1, $2, $3, $4)
RETURNING search_id",
	)
	.bind(term)
	.bind(category)
	.bind(date)
	.bind(count)
	.fetch_one(executor)
	.await?;

	Ok(search_id)
}

/// Returns false when the row no longer exists.
pub async fn add_popular_count<'e, E>(executor: E, search_id: i64, delta: i64) -> Result<bool>
where
	E: Executor<'e, Database = Postgres>,
{
	let result = sqlx::query(
		"\
UPDATE popular_searches
SET search_count = search_count + $1,
	updated_at = now()
WHERE search_id = $2",
	)
	.bind(delta)
	.bind(search_id)
	.execute(executor)
	.await?;

	Ok(result.rows_affected() == 1)
}

/// Deletes one row and hands back the count it carried, or `None` if another writer got there
/// first.
pub async fn delete_popular<'e, E>(executor: E, search_id: i64) -> Result<Option<i64>>
where
	E: Executor<'e, Database = Postgres>,
{
	let count = sqlx::query_scalar::<_, i64>(
		"DELETE FROM popular_searches WHERE search_id = $1 RETURNING search_count",
	)
	.bind(search_id)
	.fetch_optional(executor)
	.await?;

	Ok(count)
}

pub async fn sum_popular_since<'e, E>(
	executor: E,
	since: Date,
	limit: i64,
) -> Result<Vec<PopularTotal>>
where
	E: Executor<'e, Database = Postgres>,
{
	let rows = sqlx::query_as::<_, PopularTotal>(
		"\
SELECT
	search_term,
	search_category,
	sum(search_count)::bigint AS total_count
FROM popular_searches
WHERE search_date >= $1
GROUP BY search_term, search_category
ORDER BY total_count DESC, search_term, search_category
LIMIT $2",
	)
	.bind(since)
	.bind(limit)
	.fetch_all(executor)
	.await?;

	Ok(rows)
}

/// Keys that currently have more than one row, oldest day first.
pub async fn select_duplicate_keys<'e, E>(
	executor: E,
	since: Date,
	limit: i64,
) -> Result<Vec<PopularKey>>
where
	E: Executor<'e, Database = Postgres>,
{
	let rows = sqlx::query_as::<_, PopularKey>(
		"\
SELECT
	search_term,
	search_category,
	search_date,
	count(*) AS row_count
FROM popular_searches
WHERE search_date >= $1
GROUP BY search_term, search_category, search_date
HAVING count(*) > 1
ORDER BY search_date, search_term, search_category
LIMIT $2",
	)
	.bind(since)
	.bind(limit)
	.fetch_all(executor)
	.await?;

	Ok(rows)
}

pub async fn insert_recent<'e, E>(
	executor: E,
	user_id: &str,
	term: &str,
	category: &str,
	searched_at: OffsetDateTime,
) -> Result<Uuid>
where
	E: Executor<'e, Database = Postgres>,
{
	let history_id = Uuid::new_v4();

	sqlx::query(
		"\
INSERT INTO recent_searches (history_id, user_id, search_term, search_category, searched_at)
VALUES ($1, $2, $3, $4, $5)",
	)
	.bind(history_id)
	.bind(user_id)
	.bind(term)
	.bind(category)
	.bind(searched_at)
	.execute(executor)
	.await?;

	Ok(history_id)
}

/// Newest first. Rows are returned as stored, duplicates included.
pub async fn select_recent_for_user<'e, E>(
	executor: E,
	user_id: &str,
	category: Option<&str>,
	limit: i64,
) -> Result<Vec<RecentSearch>>
where
	E: Executor<'e, Database = Postgres>,
{
	let mut builder = QueryBuilder::<Postgres>::new(
		"SELECT history_id, user_id, search_term, search_category, searched_at \
		 FROM recent_searches WHERE user_id = ",
	);

	builder.push_bind(user_id);

	if let Some(category) = category {
		builder.push(" AND search_category = ");
		builder.push_bind(category);
	}

	builder.push(" ORDER BY searched_at DESC, history_id LIMIT ");
	builder.push_bind(limit);

	let rows = builder.build_query_as::<RecentSearch>().fetch_all(executor).await?;

	Ok(rows)
}
