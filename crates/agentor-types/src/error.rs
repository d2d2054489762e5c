//! The stable error-code taxonomy carried by every task failure (§7).

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// A stable, matchable error code. Raw causes are mapped onto this set by
/// the Retry Engine's categorizer (`agentor_core::retry::categorize`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    FileNotFound,
    PermissionDenied,
    TooManyFiles,
    NoSpaceLeft,
    Timeout,
    NetworkError,
    ParseError,
    Conflict,
    ValidationError,
    Incompatible,
    Cancelled,
    QueueFull,
    Unknown,
}

impl ErrorCode {
    /// Error codes that are never retryable, regardless of configuration
    /// (§4.2: "non-retryable regardless of configuration").
    pub const ALWAYS_NON_RETRYABLE: [ErrorCode; 4] = [
        ErrorCode::PermissionDenied,
        ErrorCode::ParseError,
        ErrorCode::ValidationError,
        ErrorCode::FileNotFound,
    ];

    pub fn is_always_non_retryable(&self) -> bool {
        Self::ALWAYS_NON_RETRYABLE.contains(self)
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::FileNotFound => "FILE_NOT_FOUND",
            Self::PermissionDenied => "PERMISSION_DENIED",
            Self::TooManyFiles => "TOO_MANY_FILES",
            Self::NoSpaceLeft => "NO_SPACE_LEFT",
            Self::Timeout => "TIMEOUT",
            Self::NetworkError => "NETWORK_ERROR",
            Self::ParseError => "PARSE_ERROR",
            Self::Conflict => "CONFLICT",
            Self::ValidationError => "VALIDATION_ERROR",
            Self::Incompatible => "INCOMPATIBLE",
            Self::Cancelled => "CANCELLED",
            Self::QueueFull => "QUEUE_FULL",
            Self::Unknown => "UNKNOWN_ERROR",
        };
        f.write_str(s)
    }
}

impl FromStr for ErrorCode {
    type Err = ErrorCodeParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "FILE_NOT_FOUND" => Ok(Self::FileNotFound),
            "PERMISSION_DENIED" => Ok(Self::PermissionDenied),
            "TOO_MANY_FILES" => Ok(Self::TooManyFiles),
            "NO_SPACE_LEFT" => Ok(Self::NoSpaceLeft),
            "TIMEOUT" => Ok(Self::Timeout),
            "NETWORK_ERROR" => Ok(Self::NetworkError),
            "PARSE_ERROR" => Ok(Self::ParseError),
            "CONFLICT" => Ok(Self::Conflict),
            "VALIDATION_ERROR" => Ok(Self::ValidationError),
            "INCOMPATIBLE" => Ok(Self::Incompatible),
            "CANCELLED" => Ok(Self::Cancelled),
            "QUEUE_FULL" => Ok(Self::QueueFull),
            "UNKNOWN_ERROR" => Ok(Self::Unknown),
            other => Err(ErrorCodeParseError(other.to_owned())),
        }
    }
}

/// Error returned when parsing an invalid [`ErrorCode`] string.
#[derive(Debug, Clone)]
pub struct ErrorCodeParseError(pub String);

impl fmt::Display for ErrorCodeParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid error code: {:?}", self.0)
    }
}

impl std::error::Error for ErrorCodeParseError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_roundtrip() {
        let all = [
            ErrorCode::FileNotFound,
            ErrorCode::PermissionDenied,
            ErrorCode::TooManyFiles,
            ErrorCode::NoSpaceLeft,
            ErrorCode::Timeout,
            ErrorCode::NetworkError,
            ErrorCode::ParseError,
            ErrorCode::Conflict,
            ErrorCode::ValidationError,
            ErrorCode::Incompatible,
            ErrorCode::Cancelled,
            ErrorCode::QueueFull,
            ErrorCode::Unknown,
        ];
        for code in all {
            assert_eq!(code.to_string().parse::<ErrorCode>().unwrap(), code);
        }
    }

    #[test]
    fn always_non_retryable_set_is_exact() {
        for code in ErrorCode::ALWAYS_NON_RETRYABLE {
            assert!(code.is_always_non_retryable());
        }
        assert!(!ErrorCode::Timeout.is_always_non_retryable());
        assert!(!ErrorCode::Unknown.is_always_non_retryable());
    }
}
