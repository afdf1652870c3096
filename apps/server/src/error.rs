use std::io::Error as IoError;
use std::net::AddrParseError;

use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use serde_json::json;
use thiserror::Error;
use trustmesh::Error as DomainError;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("{0:#}")]
    Io(#[from] IoError),
    #[error("Address parsing error: {0}")]
    AddrParse(#[from] AddrParseError),
    #[error(transparent)]
    Domain(#[from] DomainError),
    #[error("missing or invalid X-Identity header")]
    MissingIdentity,
    #[error("{0}")]
    BadRequest(String),
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::MissingIdentity => StatusCode::UNAUTHORIZED,
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Domain(e) => domain_status(e),
            AppError::Io(_) | AppError::AddrParse(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(json!({
            "error": self.to_string(),
            "retryable": matches!(self, AppError::Domain(e) if e.is_retryable()),
        }))
    }
}

fn domain_status(error: &DomainError) -> StatusCode {
    match error {
        DomainError::InvalidDisclosureLevel(_)
        | DomainError::InvalidConnectionTier(_)
        | DomainError::UnknownField(_)
        | DomainError::InvalidFieldValue { .. }
        | DomainError::InvalidKeyFormat(_)
        | DomainError::MalformedEnvelope(_)
        | DomainError::UnsupportedVersion(_) => StatusCode::BAD_REQUEST,
        DomainError::NotOwner { .. } => StatusCode::FORBIDDEN,
        DomainError::ProfileNotFound(_)
        | DomainError::OpportunityNotFound(_)
        | DomainError::KeyNotFound(_)
        | DomainError::RecipientKeyMissing(_) => StatusCode::NOT_FOUND,
        DomainError::OpportunityClosed(_) | DomainError::CurrentKeyExists(_) => StatusCode::CONFLICT,
        DomainError::DirectoryUnavailable(_) | DomainError::MatchServiceUnavailable(_) => {
            StatusCode::SERVICE_UNAVAILABLE
        }
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}
