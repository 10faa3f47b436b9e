use serde::{Deserialize, Serialize};
use std::fmt;

/// Outcome of a request, serialized as its integer wire value.
///
/// `Exists` and the `Missing*` codes are reserved for registry-style servers
/// that track anchors centrally. The peer protocol in this crate only emits
/// `Success`, `NoMatchesFound` and `Failed`, but decodes all of them.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "i32", into = "i32")]
pub enum ResultCode {
    #[default]
    Unknown,
    Success,
    NoMatchesFound,
    Exists,
    MissingInformation,
    MissingAnchor,
    MissingSharedCoordinate,
    MissingCoordinates,
    Failed,
}

impl ResultCode {
    pub fn as_i32(self) -> i32 {
        match self {
            ResultCode::Unknown => 0,
            ResultCode::Success => 1,
            ResultCode::NoMatchesFound => 2,
            ResultCode::Exists => 3,
            ResultCode::MissingInformation => 4,
            ResultCode::MissingAnchor => 5,
            ResultCode::MissingSharedCoordinate => 6,
            ResultCode::MissingCoordinates => 7,
            ResultCode::Failed => 100,
        }
    }

    pub fn is_success(self) -> bool {
        self == ResultCode::Success
    }
}

impl From<i32> for ResultCode {
    fn from(value: i32) -> Self {
        match value {
            1 => ResultCode::Success,
            2 => ResultCode::NoMatchesFound,
            3 => ResultCode::Exists,
            4 => ResultCode::MissingInformation,
            5 => ResultCode::MissingAnchor,
            6 => ResultCode::MissingSharedCoordinate,
            7 => ResultCode::MissingCoordinates,
            100 => ResultCode::Failed,
            _ => ResultCode::Unknown,
        }
    }
}

impl From<ResultCode> for i32 {
    fn from(code: ResultCode) -> Self {
        code.as_i32()
    }
}

impl fmt::Display for ResultCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResultCode::Unknown => write!(f, "UNKNOWN"),
            ResultCode::Success => write!(f, "SUCCESS"),
            ResultCode::NoMatchesFound => write!(f, "NO_MATCHES_FOUND"),
            ResultCode::Exists => write!(f, "EXISTS"),
            ResultCode::MissingInformation => write!(f, "MISSING_INFORMATION"),
            ResultCode::MissingAnchor => write!(f, "MISSING_ANCHOR"),
            ResultCode::MissingSharedCoordinate => write!(f, "MISSING_SHARED_COORDINATE"),
            ResultCode::MissingCoordinates => write!(f, "MISSING_COORDINATES"),
            ResultCode::Failed => write!(f, "FAILED"),
        }
    }
}
