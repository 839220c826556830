//! Maps a failed HTTP exchange onto `StoreError`.
//!
//! The service answers semantic failures (missing path, conflicts, ...) with
//! 409 and a JSON body whose `error_summary` is a slash separated tag chain
//! such as `path/not_found/..`. That summary is the only place the not-found
//! condition is visible, so the matching rule lives here and nowhere else.

use crate::core::wire::{ApiErrorBody, ENDPOINT_ERROR_STATUS};
use crate::utils::error::StoreError;
use reqwest::StatusCode;

const NOT_FOUND_MARKER: &str = "not_found";

pub fn classify_failure(
    op: &'static str,
    reference: &str,
    status: StatusCode,
    body: &[u8],
) -> StoreError {
    if status.as_u16() != ENDPOINT_ERROR_STATUS {
        return StoreError::HttpStatus {
            op,
            status: status.to_string(),
        };
    }

    let summary = match serde_json::from_slice::<ApiErrorBody>(body) {
        Ok(parsed) => parsed.error_summary,
        Err(_) => String::from_utf8_lossy(body).trim().to_string(),
    };

    if summary.contains(NOT_FOUND_MARKER) {
        StoreError::NotFound {
            op,
            reference: reference.to_string(),
        }
    } else {
        StoreError::RemoteRejected { op, summary }
    }
}
