use crate::constants;
use crate::StreamBuffer;
use std::collections::HashMap;
use std::fmt;

/// A parsed `Content-Type` value.
///
/// Types and parameter names are stored lowercased; parameter values are kept as written, with
/// quoting and escapes removed. When a parameter name repeats, the first occurrence wins.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct ContentType {
    /// Super-type, e.g. `text`.
    pub super_type: String,
    /// Sub-type, e.g. `plain`.
    pub sub_type: String,
    /// Parameters keyed by lowercased name.
    pub parameters: HashMap<String, String>,
}

impl ContentType {
    /// Creates a content type without parameters.
    pub fn new<T: Into<String>, U: Into<String>>(super_type: T, sub_type: U) -> Self {
        ContentType {
            super_type: super_type.into().to_ascii_lowercase(),
            sub_type: sub_type.into().to_ascii_lowercase(),
            parameters: HashMap::new(),
        }
    }

    /// `text/plain; charset=us-ascii`, the type of a part that declares none.
    pub fn text_plain() -> Self {
        let mut ct = ContentType::new("text", "plain");
        ct.parameters
            .insert(constants::CHARSET_PARAM.to_owned(), "us-ascii".to_owned());
        ct
    }

    /// `message/rfc822`, the type of a `multipart/digest` child that declares none.
    pub fn message_rfc822() -> Self {
        ContentType::new(constants::MESSAGE, constants::RFC822)
    }

    /// Parses a complete `Content-Type` header value.
    pub fn parse(value: &str) -> crate::Result<Self> {
        let mut buffer = StreamBuffer::new();
        buffer.inject(Some(value.as_bytes().to_vec()));
        buffer.content_type()
    }

    /// Looks up a parameter, ignoring the case of `name`.
    pub fn param(&self, name: &str) -> Option<&str> {
        match self.parameters.get(name) {
            Some(value) => Some(value.as_str()),
            None => self.parameters.get(&name.to_ascii_lowercase()).map(String::as_str),
        }
    }

    /// The `boundary` parameter.
    pub fn boundary(&self) -> Option<&str> {
        self.param(constants::BOUNDARY_PARAM)
    }

    /// The `charset` parameter.
    pub fn charset(&self) -> Option<&str> {
        self.param(constants::CHARSET_PARAM)
    }

    /// Whether the super-type is `multipart`.
    pub fn is_multipart(&self) -> bool {
        self.super_type == constants::MULTIPART
    }

    /// Whether this is `message/rfc822`.
    pub fn is_message_rfc822(&self) -> bool {
        self.super_type == constants::MESSAGE && self.sub_type == constants::RFC822
    }

    /// Whether this is `multipart/digest`.
    pub fn is_digest(&self) -> bool {
        self.is_multipart() && self.sub_type == constants::DIGEST
    }

    /// Converts to a [`mime::Mime`], if the `mime` crate accepts the rendering.
    pub fn to_mime(&self) -> Option<mime::Mime> {
        self.to_string().parse().ok()
    }

    pub(crate) fn insert_param(&mut self, name: String, value: String) {
        if self.parameters.contains_key(&name) {
            debug!("ignoring duplicate Content-Type parameter {:?}", name);
            return;
        }
        self.parameters.insert(name, value);
    }
}

impl Default for ContentType {
    fn default() -> Self {
        ContentType::text_plain()
    }
}

impl fmt::Display for ContentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.super_type, self.sub_type)?;

        let mut names: Vec<&String> = self.parameters.keys().collect();
        names.sort();

        for name in names {
            let value = &self.parameters[name];
            if !value.is_empty() && value.bytes().all(crate::classify::is_token) {
                write!(f, "; {}={}", name, value)?;
            } else {
                write!(f, "; {}=\"", name)?;
                for ch in value.chars() {
                    if ch == '"' || ch == '\\' {
                        write!(f, "\\")?;
                    }
                    write!(f, "{}", ch)?;
                }
                write!(f, "\"")?;
            }
        }

        Ok(())
    }
}
