use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, rejection::PathRejection, Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use serde_json::json;
use tracing::error;

use super::accounts::LoginRequest;
use super::domain::{BallotRequest, PollId};
use super::intake::CreatePollRequest;
use super::service::{PollService, PollServiceError};
use super::store::PollStore;

/// Envelope wrapping every response of the poll endpoints.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub error: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn ok(message: impl Into<String>, data: T) -> Self {
        Self {
            error: false,
            message: message.into(),
            data: Some(data),
        }
    }
}

impl ApiResponse<()> {
    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            error: true,
            message: message.into(),
            data: None,
        }
    }
}

/// Router exposing poll listing, creation, voting, reconciliation and login.
pub fn poll_router<S>(service: Arc<PollService<S>>) -> Router
where
    S: PollStore + 'static,
{
    Router::new()
        .route("/polls", get(list_handler::<S>).post(create_handler::<S>))
        .route("/poll/:id", get(get_handler::<S>))
        .route("/poll/:id/reconcile", post(reconcile_handler::<S>))
        .route("/vote", post(vote_handler::<S>))
        .route("/login", post(login_handler::<S>))
        .with_state(service)
}

/// Map a service failure onto its status category; storage details stay in the logs.
pub fn error_response(err: PollServiceError) -> Response {
    let status = match &err {
        PollServiceError::Validation(_) | PollServiceError::Admission(_) => {
            StatusCode::BAD_REQUEST
        }
        PollServiceError::NotFound(_) => StatusCode::NOT_FOUND,
        PollServiceError::Unauthorized => StatusCode::UNAUTHORIZED,
        PollServiceError::Contended => StatusCode::CONFLICT,
        PollServiceError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };

    let message = match &err {
        PollServiceError::Storage(source) => {
            error!(error = %source, "storage failure");
            "internal server error".to_string()
        }
        other => other.to_string(),
    };

    (status, Json(ApiResponse::failure(message))).into_response()
}

fn rejection_response(message: String) -> Response {
    (StatusCode::BAD_REQUEST, Json(ApiResponse::failure(message))).into_response()
}

pub(crate) async fn list_handler<S>(State(service): State<Arc<PollService<S>>>) -> Response
where
    S: PollStore + 'static,
{
    match service.list_polls() {
        Ok(polls) => (StatusCode::OK, Json(ApiResponse::ok("polls", polls))).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn get_handler<S>(
    State(service): State<Arc<PollService<S>>>,
    poll_id: Result<Path<i64>, PathRejection>,
) -> Response
where
    S: PollStore + 'static,
{
    let Ok(Path(poll_id)) = poll_id else {
        return rejection_response("invalid poll ID".to_string());
    };

    match service.get_poll(PollId(poll_id)) {
        Ok(view) => (StatusCode::OK, Json(ApiResponse::ok("poll", view))).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn create_handler<S>(
    State(service): State<Arc<PollService<S>>>,
    payload: Result<Json<CreatePollRequest>, JsonRejection>,
) -> Response
where
    S: PollStore + 'static,
{
    let Json(request) = match payload {
        Ok(payload) => payload,
        Err(rejection) => return rejection_response(rejection.body_text()),
    };

    match service.create_poll(request) {
        Ok(view) => (
            StatusCode::CREATED,
            Json(ApiResponse::ok("Poll created successfully", view)),
        )
            .into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn vote_handler<S>(
    State(service): State<Arc<PollService<S>>>,
    payload: Result<Json<BallotRequest>, JsonRejection>,
) -> Response
where
    S: PollStore + 'static,
{
    let Json(ballot) = match payload {
        Ok(payload) => payload,
        Err(rejection) => return rejection_response(rejection.body_text()),
    };

    match service.submit_vote(ballot) {
        Ok(receipt) => {
            let data = json!({
                "message": format!("Successfully voted for {} option(s)", receipt.votes.len()),
                "poll": receipt.poll,
                "votes_count": receipt.votes.len(),
                "new_votes": receipt.votes,
                "warnings": receipt.warnings,
            });
            (
                StatusCode::CREATED,
                Json(ApiResponse::ok("Vote cast successfully", data)),
            )
                .into_response()
        }
        Err(err) => error_response(err),
    }
}

pub(crate) async fn reconcile_handler<S>(
    State(service): State<Arc<PollService<S>>>,
    poll_id: Result<Path<i64>, PathRejection>,
) -> Response
where
    S: PollStore + 'static,
{
    let Ok(Path(poll_id)) = poll_id else {
        return rejection_response("invalid poll ID".to_string());
    };

    match service.reconcile(PollId(poll_id)) {
        Ok(reconciliation) => {
            let message = if reconciliation.is_clean() {
                "tallies consistent"
            } else {
                "tallies corrected"
            };
            (StatusCode::OK, Json(ApiResponse::ok(message, reconciliation))).into_response()
        }
        Err(err) => error_response(err),
    }
}

pub(crate) async fn login_handler<S>(
    State(service): State<Arc<PollService<S>>>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Response
where
    S: PollStore + 'static,
{
    let Json(request) = match payload {
        Ok(payload) => payload,
        Err(rejection) => return rejection_response(rejection.body_text()),
    };

    match service.login(request) {
        Ok(user) => (StatusCode::OK, Json(ApiResponse::ok("Login successful", user))).into_response(),
        Err(err) => error_response(err),
    }
}
