use std::fmt;

#[derive(Debug)]
pub enum PlanningError {
    /// Operator input fails a precondition; nothing was mutated.
    Validation(String),
    /// Trips cannot form one group (date rules).
    Combination(String),
    Config(String),
    Http(reqwest::Error),
    ServiceUnavailable,
    InvalidResponse(String),
    Parse(String),
    Database(sea_orm::DbErr),
    /// Source data is inconsistent; the stop manifest wins.
    DataQuality(String),
}

impl fmt::Display for PlanningError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Validation(msg) => write!(f, "Validation error: {msg}"),
            Self::Combination(msg) => write!(f, "Combination error: {msg}"),
            Self::Config(msg) => write!(f, "Configuration error: {msg}"),
            Self::Http(e) => write!(f, "HTTP error: {e}"),
            Self::ServiceUnavailable => write!(f, "Service temporarily unavailable (503)"),
            Self::InvalidResponse(msg) => write!(f, "Invalid response: {msg}"),
            Self::Parse(msg) => write!(f, "Parse error: {msg}"),
            Self::Database(e) => write!(f, "Database error: {e}"),
            Self::DataQuality(msg) => write!(f, "Data quality issue: {msg}"),
        }
    }
}

impl std::error::Error for PlanningError {}

impl From<reqwest::Error> for PlanningError {
    fn from(e: reqwest::Error) -> Self {
        if e.status() == Some(reqwest::StatusCode::SERVICE_UNAVAILABLE) {
            Self::ServiceUnavailable
        } else {
            Self::Http(e)
        }
    }
}

impl From<sea_orm::DbErr> for PlanningError {
    fn from(e: sea_orm::DbErr) -> Self {
        Self::Database(e)
    }
}

pub type Result<T> = std::result::Result<T, PlanningError>;
