use std::error::Error as StdError;

use axum::{http::StatusCode, response::Response};
use thiserror::Error;

use crate::application::reindex::{ReindexError, ReindexReport};
use crate::infra::error::InfraError;

/// Diagnostic chain attached to error responses so the response-logging
/// middleware can report the cause without leaking it to clients.
#[derive(Debug, Clone)]
pub struct ErrorReport {
    pub source: &'static str,
    pub status: StatusCode,
    pub messages: Vec<String>,
}

impl ErrorReport {
    pub fn from_error(source: &'static str, status: StatusCode, error: &dyn StdError) -> Self {
        let mut messages = Vec::new();
        messages.push(error.to_string());
        let mut current = error.source();
        while let Some(inner) = current {
            messages.push(inner.to_string());
            current = inner.source();
        }
        Self {
            source,
            status,
            messages,
        }
    }

    pub fn from_message(
        source: &'static str,
        status: StatusCode,
        message: impl Into<String>,
    ) -> Self {
        Self {
            source,
            status,
            messages: vec![message.into()],
        }
    }

    pub fn attach(self, response: &mut Response) {
        response.extensions_mut().insert(self);
    }
}

/// Top-level failure of a binary subcommand.
#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Infra(#[from] InfraError),
    #[error("reindex failed: {0}")]
    Reindex(#[from] ReindexError),
    #[error("{failed} of {total} posts could not be indexed")]
    IncompleteReindex { failed: u64, total: u64 },
    #[error("unexpected error: {0}")]
    Unexpected(String),
}

impl AppError {
    pub fn unexpected(message: impl Into<String>) -> Self {
        Self::Unexpected(message.into())
    }

    /// Fails when any post was skipped during a reindex run.
    pub fn check_reindex(report: &ReindexReport) -> Result<(), Self> {
        if report.failed > 0 {
            return Err(Self::IncompleteReindex {
                failed: report.failed,
                total: report.failed + report.indexed,
            });
        }
        Ok(())
    }
}
