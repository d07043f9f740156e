use axum::{
    Json,
    http::{HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};
use serde::Serialize;

use crate::ledger::error::LedgerError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ReportPolicy {
    /// Expected business outcome, surfaced verbatim to the caller.
    Ignore,
    /// Infrastructure fault, logged with an opaque error id.
    Report,
}

/// API-level error with a stable public code.
///
/// Business-rule failures (expected outcomes like a lost redemption race) keep
/// their human-presentable message; infrastructure failures are reported
/// with an `x-error-id` and an opaque body.
#[derive(Debug, Clone)]
pub struct ApiError {
    status: StatusCode,
    public_code: &'static str,
    public_message: Option<String>,
    report_policy: ReportPolicy,
    report_summary: Option<String>,
}

impl ApiError {
    fn new(status: StatusCode, public_code: &'static str, message: impl Into<String>) -> Self {
        Self {
            status,
            public_code,
            public_message: Some(message.into()),
            report_policy: ReportPolicy::Ignore,
            report_summary: None,
        }
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        let msg = msg.into();
        tracing::error!("Internal error: {}", msg);
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            public_code: "INTERNAL_ERROR",
            public_message: None,
            report_policy: ReportPolicy::Report,
            report_summary: Some(msg),
        }
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        let msg = msg.into();
        tracing::warn!("Not found: {}", msg);
        Self::new(StatusCode::NOT_FOUND, "NOT_FOUND", msg)
    }

    pub fn bad_request(msg: impl Into<String>) -> Self {
        let msg = msg.into();
        tracing::warn!("Bad request: {}", msg);
        Self::new(StatusCode::BAD_REQUEST, "BAD_REQUEST", msg)
    }

    pub fn unauthorized(msg: impl Into<String>) -> Self {
        let msg = msg.into();
        tracing::warn!("Unauthorized: {}", msg);
        Self::new(StatusCode::UNAUTHORIZED, "UNAUTHORIZED", msg)
    }

    pub fn forbidden(msg: impl Into<String>) -> Self {
        let msg = msg.into();
        tracing::warn!("Forbidden: {}", msg);
        Self::new(StatusCode::FORBIDDEN, "FORBIDDEN", msg)
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        let msg = msg.into();
        tracing::warn!("Conflict: {}", msg);
        Self::new(StatusCode::CONFLICT, "CONFLICT", msg)
    }

    pub fn public_code(&self) -> &'static str {
        self.public_code
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        #[derive(Serialize)]
        struct ErrorEnvelope<'a> {
            error: ErrorBody<'a>,
        }

        #[derive(Serialize)]
        struct ErrorBody<'a> {
            code: &'a str,
            #[serde(skip_serializing_if = "Option::is_none")]
            id: Option<&'a str>,
            message: &'a str,
        }

        let public_message = self
            .public_message
            .as_deref()
            .unwrap_or_else(|| self.status.canonical_reason().unwrap_or("Error"));

        let error_id = match self.report_policy {
            ReportPolicy::Report => Some(bloom_types::create_id()),
            ReportPolicy::Ignore => None,
        };

        if let (Some(id), Some(summary)) = (error_id.as_deref(), self.report_summary.as_deref()) {
            tracing::error!(error_id = %id, code = self.public_code, "{}", summary);
        }

        let mut response = (
            self.status,
            Json(ErrorEnvelope {
                error: ErrorBody {
                    code: self.public_code,
                    id: error_id.as_deref(),
                    message: public_message,
                },
            }),
        )
            .into_response();

        if let Some(id) = error_id.as_deref()
            && let Ok(v) = HeaderValue::from_str(id)
        {
            response.headers_mut().insert("x-error-id", v);
        }

        response
    }
}

impl From<LedgerError> for ApiError {
    fn from(err: LedgerError) -> Self {
        let message = err.to_string();
        match err {
            LedgerError::NotFound(_) => Self::new(StatusCode::NOT_FOUND, "NOT_FOUND", message),
            LedgerError::AlreadyRedeemed => {
                Self::new(StatusCode::CONFLICT, "ALREADY_REDEEMED", message)
            }
            LedgerError::Expired => Self::new(StatusCode::GONE, "EXPIRED", message),
            LedgerError::AlreadyReferred => {
                Self::new(StatusCode::CONFLICT, "ALREADY_REFERRED", message)
            }
            LedgerError::InvalidOrder(_) => {
                Self::new(StatusCode::UNPROCESSABLE_ENTITY, "INVALID_ORDER", message)
            }
            LedgerError::InsufficientBalance { .. } => Self::new(
                StatusCode::UNPROCESSABLE_ENTITY,
                "INSUFFICIENT_BALANCE",
                message,
            ),
            LedgerError::InvalidAmount(_) => {
                Self::new(StatusCode::BAD_REQUEST, "INVALID_AMOUNT", message)
            }
            LedgerError::Generation(_) => {
                tracing::error!("Code generation failed: {}", message);
                Self {
                    status: StatusCode::INTERNAL_SERVER_ERROR,
                    public_code: "GENERATION_ERROR",
                    public_message: Some(message.clone()),
                    report_policy: ReportPolicy::Report,
                    report_summary: Some(message),
                }
            }
            LedgerError::Conflict => Self::new(StatusCode::CONFLICT, "CONFLICT", message),
            LedgerError::Database(db_err) => db_err.into(),
        }
    }
}

impl From<sea_orm::DbErr> for ApiError {
    fn from(err: sea_orm::DbErr) -> Self {
        tracing::error!("Database error: {:?}", err);
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            public_code: "DATABASE_ERROR",
            public_message: None,
            report_policy: ReportPolicy::Report,
            report_summary: Some(err.to_string()),
        }
    }
}

impl From<sea_orm::TransactionError<ApiError>> for ApiError {
    fn from(err: sea_orm::TransactionError<ApiError>) -> Self {
        match err {
            sea_orm::TransactionError::Connection(db_err) => db_err.into(),
            sea_orm::TransactionError::Transaction(api_err) => api_err,
        }
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(err: serde_json::Error) -> Self {
        Self::bad_request(format!("JSON error: {}", err))
    }
}

impl From<bloom_types::Error> for ApiError {
    fn from(err: bloom_types::Error) -> Self {
        Self::internal(format!("{:?}", err))
    }
}

impl std::error::Error for ApiError {}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.status, self.public_code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;

    #[test]
    fn test_business_errors_keep_stable_codes() {
        assert_eq!(
            ApiError::from(LedgerError::AlreadyRedeemed).public_code(),
            "ALREADY_REDEEMED"
        );
        assert_eq!(
            ApiError::from(LedgerError::AlreadyReferred).public_code(),
            "ALREADY_REFERRED"
        );
        assert_eq!(ApiError::from(LedgerError::Expired).public_code(), "EXPIRED");
        assert_eq!(
            ApiError::from(LedgerError::InsufficientBalance {
                available: Decimal::new(15000, 2),
                requested: Decimal::new(16000, 2),
            })
            .public_code(),
            "INSUFFICIENT_BALANCE"
        );
    }

    #[test]
    fn test_business_errors_are_not_reported() {
        let err = ApiError::from(LedgerError::Conflict);
        assert_eq!(err.report_policy, ReportPolicy::Ignore);
    }

    #[test]
    fn test_database_errors_are_reported_opaquely() {
        let err = ApiError::from(LedgerError::Database(sea_orm::DbErr::Custom(
            "connection reset".into(),
        )));
        assert_eq!(err.report_policy, ReportPolicy::Report);
        assert!(err.public_message.is_none());
    }
}
