//! Web layer for the substation finder.
//!
//! Provides the search page and JSON endpoints for lookups, quota and the
//! facility catalog. Callers are identified by a header set upstream.

mod dto;
mod routes;
mod state;
pub mod templates;

pub use dto::*;
pub use routes::{ADMIN_TOKEN_HEADER, AppError, USER_ID_HEADER, create_router};
pub use state::AppState;
pub use templates::*;
