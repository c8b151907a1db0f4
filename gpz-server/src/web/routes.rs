//! HTTP route handlers.

use askama::Template;
use axum::{
    Form, Json, Router,
    extract::State,
    http::{HeaderMap, StatusCode, header},
    response::{Html, IntoResponse, Response},
    routing::{get, post},
};
use tower_http::trace::TraceLayer;
use tracing::{error, warn};

use crate::lookup::{AdminError, LookupError, NewFacility};

use super::dto::*;
use super::state::AppState;
use super::templates::*;

/// Header carrying the caller's identity, set by the authenticating proxy.
pub const USER_ID_HEADER: &str = "x-user-id";

/// Header carrying the admin token for catalog changes.
pub const ADMIN_TOKEN_HEADER: &str = "x-admin-token";

/// Create the application router.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(index_page))
        .route("/health", get(health))
        .route("/search", post(search_form))
        .route("/api/search", post(search_json))
        .route("/api/quota", get(quota))
        .route("/api/facilities", get(list_facilities).post(add_facility))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Health check endpoint.
async fn health() -> &'static str {
    "ok"
}

/// Index page with search form.
async fn index_page(State(state): State<AppState>) -> impl IntoResponse {
    let config = state.lookup.config();
    Html(
        IndexTemplate {
            monthly_limit: config.monthly_limit,
            result_limit: config.result_limit,
        }
        .render()
        .unwrap_or_else(|e| format!("Template error: {}", e)),
    )
}

/// Check if request accepts HTML.
fn accepts_html(headers: &HeaderMap) -> bool {
    headers
        .get(header::ACCEPT)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|accept| accept.contains("text/html"))
}

/// The caller's user id from [`USER_ID_HEADER`].
fn user_id(headers: &HeaderMap) -> Result<&str, AppError> {
    headers
        .get(USER_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .ok_or_else(|| AppError::Unauthorized {
            message: format!("missing {USER_ID_HEADER} header"),
        })
}

/// Check [`ADMIN_TOKEN_HEADER`] against the configured token.
fn require_admin(state: &AppState, headers: &HeaderMap) -> Result<(), AppError> {
    let Some(expected) = state.admin_token.as_deref() else {
        return Err(AppError::Unavailable {
            message: "facility registration is disabled".to_string(),
        });
    };

    let supplied = headers
        .get(ADMIN_TOKEN_HEADER)
        .and_then(|v| v.to_str().ok());
    if supplied != Some(expected) {
        return Err(AppError::Unauthorized {
            message: "invalid admin token".to_string(),
        });
    }
    Ok(())
}

/// Form search. Returns an HTML fragment or JSON based on the Accept header.
async fn search_form(
    State(state): State<AppState>,
    headers: HeaderMap,
    Form(req): Form<SearchRequest>,
) -> Result<Response, AppError> {
    let html = accepts_html(&headers);
    let result = run_search(&state, &headers, &req.address, html).await;

    match result {
        Err(e) if html => {
            let status = e.status();
            let page = MessageTemplate {
                message: e.message().to_string(),
            }
            .render()
            .map_err(|e| AppError::Internal {
                message: format!("Template error: {}", e),
            })?;
            Ok((status, Html(page)).into_response())
        }
        other => other,
    }
}

/// JSON search.
async fn search_json(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<SearchRequest>,
) -> Result<Response, AppError> {
    run_search(&state, &headers, &req.address, false).await
}

async fn run_search(
    state: &AppState,
    headers: &HeaderMap,
    address: &str,
    html: bool,
) -> Result<Response, AppError> {
    let user_id = user_id(headers)?;
    let outcome = state.lookup.lookup(user_id, address).await?;

    if html {
        let template = ResultsTemplate::from_outcome(address, &outcome);
        let html = template.render().map_err(|e| AppError::Internal {
            message: format!("Template error: {}", e),
        })?;

        Ok(Html(html).into_response())
    } else {
        Ok(Json(SearchResponse::from_outcome(&outcome)).into_response())
    }
}

/// The caller's allowance this month.
async fn quota(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<QuotaResponse>, AppError> {
    let user_id = user_id(&headers)?;
    let status = state.lookup.quota_status(user_id).await?;
    Ok(Json(status.into()))
}

/// List the catalog.
async fn list_facilities(State(state): State<AppState>) -> Json<FacilityListResponse> {
    let snapshot = state.lookup.catalog().snapshot().await;
    Json(FacilityListResponse::from_facilities(&snapshot))
}

/// Geocode and add a facility.
async fn add_facility(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(new): Json<NewFacility>,
) -> Result<(StatusCode, Json<FacilityRecord>), AppError> {
    require_admin(&state, &headers)?;
    let facility = state.lookup.register_facility(new).await?;
    Ok((
        StatusCode::CREATED,
        Json(FacilityRecord::from_facility(&facility)),
    ))
}

/// Application error type.
#[derive(Debug)]
pub enum AppError {
    BadRequest { message: String },
    Unauthorized { message: String },
    NotFound { message: String },
    TooManyRequests { message: String },
    Unavailable { message: String },
    Internal { message: String },
}

impl AppError {
    fn status(&self) -> StatusCode {
        match self {
            AppError::BadRequest { .. } => StatusCode::BAD_REQUEST,
            AppError::Unauthorized { .. } => StatusCode::UNAUTHORIZED,
            AppError::NotFound { .. } => StatusCode::NOT_FOUND,
            AppError::TooManyRequests { .. } => StatusCode::TOO_MANY_REQUESTS,
            AppError::Unavailable { .. } => StatusCode::SERVICE_UNAVAILABLE,
            AppError::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn message(&self) -> &str {
        match self {
            AppError::BadRequest { message }
            | AppError::Unauthorized { message }
            | AppError::NotFound { message }
            | AppError::TooManyRequests { message }
            | AppError::Unavailable { message }
            | AppError::Internal { message } => message,
        }
    }
}

impl From<LookupError> for AppError {
    fn from(e: LookupError) -> Self {
        let message = e.to_string();
        match e {
            LookupError::EmptyAddress => AppError::BadRequest { message },
            LookupError::AddressNotFound { .. } => AppError::NotFound { message },
            LookupError::QuotaExceeded { .. } => AppError::TooManyRequests { message },
            LookupError::Quota(_) => AppError::Internal { message },
        }
    }
}

impl From<AdminError> for AppError {
    fn from(e: AdminError) -> Self {
        let message = e.to_string();
        match e {
            AdminError::AddressNotFound { .. } | AdminError::Invalid(_) => {
                AppError::BadRequest { message }
            }
            AdminError::Catalog(_) => AppError::Internal { message },
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let status = self.status();
        let message = self.message().to_string();

        if status.is_server_error() {
            error!(%status, %message, "request failed");
        } else {
            warn!(%status, %message, "request rejected");
        }

        let body = Json(ErrorResponse { error: message });
        (status, body).into_response()
    }
}
