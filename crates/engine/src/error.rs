use cartsync_core::validate::ValidationIssue;
use cartsync_core::CoreError;
use cartsync_storage::StorageError;
use thiserror::Error;

use crate::api::ApiError;

fn join_issues(issues: &[ValidationIssue]) -> String {
    issues
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("validation failed: {}", join_issues(.0))]
    Validation(Vec<ValidationIssue>),

    #[error("item not found in cart: {0}")]
    ItemNotFound(String),

    #[error("remote confirmation failed: {0}")]
    Remote(#[from] ApiError),

    #[error("offline")]
    Offline,

    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("core error: {0}")]
    Core(#[from] CoreError),
}
