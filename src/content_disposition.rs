use crate::StreamBuffer;
use std::collections::HashMap;

/// A leniently parsed `Content-Disposition` value such as `attachment; filename="a.gif"`.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct ContentDisposition {
    /// Lowercased disposition type, e.g. `inline` or `attachment`.
    pub kind: String,
    /// Parameters keyed by lowercased name; the first occurrence of a name wins.
    pub parameters: HashMap<String, String>,
}

impl ContentDisposition {
    /// Parses a raw header value, or returns `None` if it isn't well-formed.
    pub fn parse(value: &str) -> Option<ContentDisposition> {
        let mut buffer = StreamBuffer::new();
        buffer.inject(Some(value.as_bytes().to_vec()));

        match buffer.disposition() {
            Ok((kind, parameters)) => Some(ContentDisposition { kind, parameters }),
            Err(_err) => {
                trace!("ignoring malformed Content-Disposition {:?}: {}", value, _err);
                None
            }
        }
    }

    pub fn is_attachment(&self) -> bool {
        self.kind == "attachment"
    }

    pub fn is_inline(&self) -> bool {
        self.kind == "inline"
    }

    pub fn file_name(&self) -> Option<&str> {
        self.parameters.get("filename").map(String::as_str)
    }

    pub fn name(&self) -> Option<&str> {
        self.parameters.get("name").map(String::as_str)
    }
}
