//! # logtriage-services
//!
//! HTTP transport for logtriage: an axum router over a shared
//! [`AppContext`](logtriage_core::AppContext).

pub mod api;
pub mod error;

pub use api::{ApiState, build_router};
pub use error::{ApiError, ApiResult};
