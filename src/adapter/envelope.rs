use serde::Serialize;

use crate::error::Error;

/// The `{ data, error }` shape every API response uses. Exactly one of the
/// two fields is non-null.
#[derive(Debug, Serialize)]
pub struct Envelope<T: Serialize> {
    pub data: Option<T>,
    pub error: Option<ErrorBody>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ErrorBody {
    pub message: String,
    pub code: u16,
    #[serde(rename = "type")]
    pub kind: String,
}

impl From<&Error> for ErrorBody {
    fn from(e: &Error) -> Self {
        ErrorBody {
            message: e.to_string(),
            code: e.code(),
            kind: e.kind().to_string(),
        }
    }
}

impl<T: Serialize> Envelope<T> {
    pub fn ok(data: T) -> Self {
        Envelope {
            data: Some(data),
            error: None,
        }
    }

    pub fn err(e: &Error) -> Self {
        Envelope {
            data: None,
            error: Some(ErrorBody::from(e)),
        }
    }
}

impl<T: Serialize> From<Result<T, Error>> for Envelope<T> {
    fn from(r: Result<T, Error>) -> Self {
        match r {
            Ok(v) => Envelope::ok(v),
            Err(e) => Envelope::err(&e),
        }
    }
}
