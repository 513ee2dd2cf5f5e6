use std::time::Instant;

use axum::{
	Json, Router,
	extract::{Query, Request, State},
	http::StatusCode,
	middleware::{self, Next},
	response::{IntoResponse, Response},
	routing::{get, post},
};
use serde::Serialize;

use crate::state::AppState;
use kwt_service::{
	AddRecentRequest, Error, PopularAggregateRequest, PopularSearchesRequest, RebuildReport,
	RebuildRequest, RecentSearchesRequest, StatusResponse, SweepReport, SweepRequest,
	UpdatePopularRequest,
};

pub fn router(state: AppState) -> Router {
	Router::new()
		.route("/health", get(health))
		.route("/keywords/get_popular_searches", get(get_popular_searches))
		.route("/keywords/update_popular_search", post(update_popular_search))
		.route("/keywords/add_recent_search", post(add_recent_search))
		.route("/keywords/get_recent_searches", get(get_recent_searches))
		.layer(middleware::from_fn(access_log))
		.with_state(state)
}

pub fn admin_router(state: AppState) -> Router {
	Router::new()
		.route("/v1/admin/rebuild_popular_cache", post(rebuild_popular_cache))
		.route("/v1/admin/reconcile", post(reconcile))
		.route("/v1/admin/popular_aggregate", get(popular_aggregate))
		.layer(middleware::from_fn(access_log))
		.with_state(state)
}

async fn health() -> StatusCode {
	StatusCode::OK
}

async fn get_popular_searches(
	State(state): State<AppState>,
	Query(query): Query<PopularSearchesRequest>,
) -> Result<Json<Vec<PopularItem>>, ApiError> {
	let entries = state.service.get_popular_searches(query).await?;
	let items = entries
		.into_iter()
		.map(|entry| PopularItem { term: entry.term, category: entry.category, count: entry.count })
		.collect();

	Ok(Json(items))
}

async fn update_popular_search(
	State(state): State<AppState>,
	Json(payload): Json<UpdatePopularRequest>,
) -> Result<Json<StatusResponse>, ApiError> {
	let response = state.service.update_popular_search(payload).await?;

	Ok(Json(response))
}

async fn add_recent_search(
	State(state): State<AppState>,
	Json(payload): Json<AddRecentRequest>,
) -> Result<Json<StatusResponse>, ApiError> {
	let response = state.service.add_recent_search(payload).await?;

	Ok(Json(response))
}

async fn get_recent_searches(
	State(state): State<AppState>,
	Query(query): Query<RecentSearchesRequest>,
) -> Result<Json<Vec<RecentItem>>, ApiError> {
	let pairs = state.service.get_recent_searches(query).await?;
	let items = pairs
		.into_iter()
		.map(|pair| RecentItem { term: pair.term, category: pair.category })
		.collect();

	Ok(Json(items))
}

async fn rebuild_popular_cache(
	State(state): State<AppState>,
	payload: Option<Json<RebuildRequest>>,
) -> Result<Json<RebuildReport>, ApiError> {
	let Json(payload) = payload.unwrap_or_default();
	let response = state.service.rebuild_popular_cache(payload).await?;

	Ok(Json(response))
}

async fn reconcile(
	State(state): State<AppState>,
	payload: Option<Json<SweepRequest>>,
) -> Result<Json<SweepReport>, ApiError> {
	let Json(payload) = payload.unwrap_or_default();
	let response = state.service.reconcile_sweep(payload).await?;

	Ok(Json(response))
}

async fn popular_aggregate(
	State(state): State<AppState>,
	Query(query): Query<PopularAggregateRequest>,
) -> Result<Json<Vec<PopularItem>>, ApiError> {
	let entries = state.service.popular_aggregate(query).await?;
	let items = entries
		.into_iter()
		.map(|entry| PopularItem { term: entry.term, category: entry.category, count: entry.count })
		.collect();

	Ok(Json(items))
}

async fn access_log(req: Request, next: Next) -> Response {
	let method = req.method().clone();
	let path = req.uri().path().to_string();
	let started = Instant::now();
	let response = next.run(req).await;

	tracing::info!(
		%method,
		%path,
		status = response.status().as_u16(),
		latency_ms = started.elapsed().as_millis() as u64,
		"Request handled."
	);

	response
}

#[derive(Debug, Serialize)]
struct PopularItem {
	term: String,
	category: String,
	count: i64,
}

#[derive(Debug, Serialize)]
struct RecentItem {
	term: String,
	category: String,
}

#[derive(Debug, Serialize)]
struct ErrorBody {
	error_code: String,
	message: String,
}

#[derive(Debug)]
pub struct ApiError {
	status: StatusCode,
	error_code: String,
	message: String,
}
impl ApiError {
	fn new(status: StatusCode, error_code: impl Into<String>, message: impl Into<String>) -> Self {
		Self { status, error_code: error_code.into(), message: message.into() }
	}
}

impl From<Error> for ApiError {
	fn from(err: Error) -> Self {
		match err {
			Error::InvalidRequest { message } =>
				ApiError::new(StatusCode::BAD_REQUEST, "invalid_request", message),
			Error::StorageUnavailable { message } => {
				tracing::error!(error = %message, "Storage request failed.");

				ApiError::new(
					StatusCode::SERVICE_UNAVAILABLE,
					"storage_unavailable",
					"Storage is temporarily unavailable.",
				)
			},
		}
	}
}

impl IntoResponse for ApiError {
	fn into_response(self) -> Response {
		let body = ErrorBody { error_code: self.error_code, message: self.message };

		(self.status, Json(body)).into_response()
	}
}
