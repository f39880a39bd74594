use std::fmt;

/// Every failure the service can surface.
///
/// Remote failures keep Appwrite's `message`, HTTP `code` and error `type`
/// so callers can branch on them (a `409` during provisioning means
/// "already exists", a `409` during a keyed upsert means "update instead").
#[derive(Debug, Clone, PartialEq)]
pub enum Error {
    /// Transport-level failure: DNS, TLS, connection reset, client timeout.
    Network(String),
    /// The backend answered with a non-success status.
    Remote {
        code: u16,
        kind: String,
        message: String,
    },
    NotFound(String),
    Conflict(String),
    /// A response or document did not have the expected shape.
    Decode(String),
    InvalidQuery(String),
    Validation(String),
    Unauthorized(String),
    Forbidden(String),
    /// The request's cancel token was tripped or its deadline passed.
    Cancelled,
    Config(String),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Build an error from an HTTP status and Appwrite's JSON error body.
    pub fn from_status(code: u16, kind: &str, message: &str) -> Self {
        match code {
            401 => Error::Unauthorized(message.to_string()),
            403 => Error::Forbidden(message.to_string()),
            404 => Error::NotFound(message.to_string()),
            409 => Error::Conflict(message.to_string()),
            _ => Error::Remote {
                code,
                kind: kind.to_string(),
                message: message.to_string(),
            },
        }
    }

    /// HTTP-ish status code, used by the `{ data, error }` envelope and
    /// by the routes when picking a response status.
    pub fn code(&self) -> u16 {
        match self {
            Error::Network(_) => 502,
            Error::Remote { code, .. } => *code,
            Error::NotFound(_) => 404,
            Error::Conflict(_) => 409,
            Error::Decode(_) => 502,
            Error::InvalidQuery(_) => 400,
            Error::Validation(_) => 422,
            Error::Unauthorized(_) => 401,
            Error::Forbidden(_) => 403,
            Error::Cancelled => 504,
            Error::Config(_) => 500,
        }
    }

    pub fn is_conflict(&self) -> bool {
        matches!(self, Error::Conflict(_)) || matches!(self, Error::Remote { code: 409, .. })
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFound(_)) || matches!(self, Error::Remote { code: 404, .. })
    }

    /// Short machine-readable tag for the envelope.
    pub fn kind(&self) -> &str {
        match self {
            Error::Network(_) => "network",
            Error::Remote { kind, .. } if !kind.is_empty() => kind,
            Error::Remote { .. } => "remote",
            Error::NotFound(_) => "not_found",
            Error::Conflict(_) => "conflict",
            Error::Decode(_) => "decode",
            Error::InvalidQuery(_) => "invalid_query",
            Error::Validation(_) => "validation",
            Error::Unauthorized(_) => "unauthorized",
            Error::Forbidden(_) => "forbidden",
            Error::Cancelled => "cancelled",
            Error::Config(_) => "config",
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Network(m) => write!(f, "network error: {}", m),
            Error::Remote { code, message, .. } => write!(f, "backend returned {}: {}", code, message),
            Error::NotFound(m) => write!(f, "not found: {}", m),
            Error::Conflict(m) => write!(f, "conflict: {}", m),
            Error::Decode(m) => write!(f, "decode error: {}", m),
            Error::InvalidQuery(m) => write!(f, "invalid query: {}", m),
            Error::Validation(m) => write!(f, "{}", m),
            Error::Unauthorized(m) => write!(f, "unauthorized: {}", m),
            Error::Forbidden(m) => write!(f, "forbidden: {}", m),
            Error::Cancelled => write!(f, "request cancelled"),
            Error::Config(m) => write!(f, "configuration error: {}", m),
        }
    }
}

impl std::error::Error for Error {}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Decode(e.to_string())
    }
}

impl From<reqwest::Error> for Error {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            Error::Decode(e.to_string())
        } else {
            Error::Network(e.to_string())
        }
    }
}
