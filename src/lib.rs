//! A streaming MIME structure parser for mail servers.
//!
//! The parser walks a message byte by byte while it is still arriving: chunks are either
//! injected up front or pulled on demand from a [`ChunkSource`], so the whole message never
//! has to sit in memory. It recognizes header fields, `Content-Type` parameters, multipart
//! boundaries (even when split across chunks) and nested `message/rfc822` parts, and records
//! every part under a hierarchical part number (`"1"`, `"1.2"`, `"1.2.1"`, ...) together with
//! the span its body occupies in the stream.
//!
//! Transfer encodings and charsets are not decoded; only their declarations are parsed.
//!
//! # Examples
//!
//! ```
//! let data = "Content-Type: multipart/mixed; boundary=X-BOUNDARY\r\n\r\n\
//!             --X-BOUNDARY\r\nContent-Type: text/plain\r\n\r\nabcd\r\n--X-BOUNDARY--\r\n";
//!
//! let parts = mime_walker::parse(vec![&data[..20], &data[20..]]).unwrap();
//!
//! assert_eq!(parts.len(), 2);
//! let text = parts.get("1.1").unwrap();
//! assert_eq!(text.content_type().sub_type, "plain");
//! assert_eq!(text.body_of(data.as_bytes()), b"abcd");
//! ```
//!
//! Feeding a parser from another thread while SMTP `DATA` is still being received:
//!
//! ```
//! use mime_walker::{source, Parser};
//! use std::thread;
//!
//! let (feeder, handoff) = source::handoff();
//!
//! let session = thread::spawn(move || {
//!     for line in ["Subject: hi\r\n", "\r\n", "hello\r\n"].iter() {
//!         if !feeder.feed(*line) {
//!             break;
//!         }
//!     }
//!     feeder.finish();
//! });
//!
//! let mut parser = Parser::with_source(handoff);
//! let parts = parser.parse().unwrap();
//! assert_eq!(parts.root().unwrap().header().headers()["subject"], "hi");
//! session.join().unwrap();
//! ```

#![cfg_attr(nightly, feature(doc_cfg))]

pub use bytes;

pub use buffer::StreamBuffer;
pub use content_disposition::ContentDisposition;
pub use content_type::ContentType;
pub use error::Error;
pub use limits::Limits;
pub use parser::Parser;
pub use part::{BodySpan, Part, PartHeader, Parts};
pub use source::ChunkSource;
pub use state::Stage;

#[cfg(feature = "log")]
macro_rules! trace {
    ($($t:tt)*) => (::log::trace!($($t)*));
}

#[cfg(not(feature = "log"))]
macro_rules! trace {
    ($($t:tt)*) => {{
        if false {
            let _ = format_args!($($t)*);
        }
    }};
}

#[cfg(feature = "log")]
macro_rules! debug {
    ($($t:tt)*) => (::log::debug!($($t)*));
}

#[cfg(not(feature = "log"))]
macro_rules! debug {
    ($($t:tt)*) => {{
        if false {
            let _ = format_args!($($t)*);
        }
    }};
}

mod boundary;
mod buffer;
pub mod classify;
mod constants;
mod content_disposition;
mod content_type;
mod error;
mod helpers;
mod limits;
mod parser;
mod part;
mod scanner;
pub mod source;
mod state;

/// A Result type often returned from methods that can have `mime-walker` errors.
pub type Result<T> = std::result::Result<T, Error>;

/// Parses a complete message from already available chunks.
///
/// This is a shorthand for injecting `chunks` into a fresh [`Parser`] and calling
/// [`Parser::parse`].
pub fn parse<I, B>(chunks: I) -> crate::Result<Parts>
where
    I: IntoIterator<Item = B>,
    B: Into<bytes::Bytes>,
{
    let mut parser = Parser::new();
    parser.inject(chunks);
    parser.parse()?;
    Ok(parser.into_parts())
}

/// Parses a `Content-Type` header value to extract the multipart boundary.
pub fn parse_boundary<T: AsRef<str>>(content_type: T) -> crate::Result<String> {
    let ct = ContentType::parse(content_type.as_ref())?;

    if !ct.is_multipart() {
        return Err(Error::StructuralViolation(format!(
            "Content-Type {}/{} is not multipart",
            ct.super_type, ct.sub_type
        )));
    }

    match ct.boundary() {
        Some(boundary) if !boundary.is_empty() => Ok(boundary.to_owned()),
        _ => Err(Error::StructuralViolation("multipart boundary not found in Content-Type".into())),
    }
}
