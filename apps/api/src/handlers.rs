use axum::Json;
use axum::extract::{Extension, Path, Query, State};
use axum::http::StatusCode;
use tenantgate_application::AuthContext;

use crate::error::ApiResult;
use crate::state::AppState;

pub mod access;
pub mod health;
pub mod permissions;
pub mod session;
pub mod team;
