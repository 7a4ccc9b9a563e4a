use std::fmt::{self, Debug, Display, Formatter};

use derive_more::Display;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// A set of errors that can occur while parsing a MIME message stream.
///
/// Every error aborts the parse of the current message only; parts that were finalized
/// before the error stay available on the [`Parser`](crate::Parser).
#[derive(Display)]
#[non_exhaustive]
pub enum Error {
    /// A header line, `Content-Type` value or parameter is malformed.
    #[display(fmt = "syntax error at byte {}: {}", position, reason)]
    Syntax {
        /// Absolute stream offset of the offending byte.
        position: u64,
        /// What was wrong.
        reason: String,
    },

    /// The input ended before something required was found.
    #[display(fmt = "unexpected end of input, expected {}", expected)]
    UnexpectedEof {
        /// What the parser was looking for.
        expected: String,
    },

    /// The message structure contradicts itself, e.g. a multipart part without a boundary.
    #[display(fmt = "structural violation: {}", _0)]
    StructuralViolation(String),

    /// Parts are nested deeper than the configured limit.
    #[display(fmt = "parts are nested deeper than the limit: {}", limit)]
    NestingTooDeep { limit: usize },

    /// The message has more parts than the configured limit.
    #[display(fmt = "message exceeded the maximum part count: {}", limit)]
    TooManyParts { limit: usize },

    /// A header block is larger than the configured limit.
    #[display(fmt = "header block exceeded the maximum size limit: {} bytes", limit)]
    HeaderSizeExceeded { limit: u64 },

    /// The value of a recognized header field can't be stored as a
    /// [`HeaderValue`](http::header::HeaderValue).
    #[display(fmt = "failed to decode value of header field '{}': {}", name, cause)]
    DecodeHeaderValue { name: String, cause: BoxError },

    /// The chunk producer failed.
    #[display(fmt = "stream read failed: {}", _0)]
    StreamReadFailed(BoxError),
}

impl Error {
    pub(crate) fn syntax<R: Into<String>>(position: u64, reason: R) -> Error {
        Error::Syntax {
            position,
            reason: reason.into(),
        }
    }

    pub(crate) fn eof<E: Into<String>>(expected: E) -> Error {
        Error::UnexpectedEof {
            expected: expected.into(),
        }
    }

    /// Whether the error was caused by the input ending too early.
    pub fn is_eof(&self) -> bool {
        matches!(self, Error::UnexpectedEof { .. })
    }
}

impl Debug for Error {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        Display::fmt(self, f)
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::DecodeHeaderValue { cause, .. } => Some(cause.as_ref()),
            Error::StreamReadFailed(err) => Some(err.as_ref()),
            _ => None,
        }
    }
}

impl PartialEq for Error {
    fn eq(&self, other: &Self) -> bool {
        self.to_string().eq(&other.to_string())
    }
}

impl Eq for Error {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        let err = Error::syntax(12, "missing '/' after super-type");
        assert_eq!(err.to_string(), "syntax error at byte 12: missing '/' after super-type");

        let err = Error::eof("header terminator");
        assert!(err.is_eof());
        assert_eq!(err.to_string(), "unexpected end of input, expected header terminator");

        let err = Error::StreamReadFailed("connection reset".into());
        assert!(!err.is_eof());
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn test_display_limits_and_structure() {
        assert_eq!(
            Error::StructuralViolation("empty multipart boundary".into()).to_string(),
            "structural violation: empty multipart boundary"
        );
        assert_eq!(
            Error::NestingTooDeep { limit: 8 }.to_string(),
            "parts are nested deeper than the limit: 8"
        );
        assert_eq!(
            Error::TooManyParts { limit: 3 }.to_string(),
            "message exceeded the maximum part count: 3"
        );
        assert_eq!(
            Error::HeaderSizeExceeded { limit: 16 }.to_string(),
            "header block exceeded the maximum size limit: 16 bytes"
        );

        let err = Error::DecodeHeaderValue {
            name: "content-type".into(),
            cause: "invalid byte".into(),
        };
        assert_eq!(err.to_string(), "failed to decode value of header field 'content-type': invalid byte");
        assert_eq!(format!("{:?}", err), err.to_string());
    }
}
