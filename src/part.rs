use crate::content_disposition::ContentDisposition;
use crate::content_type::ContentType;
use http::header::HeaderMap;
use std::collections::HashMap;
use std::ops::Range;

/// Per-part metadata collected from a header block.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct PartHeader {
    content_type: ContentType,
    declared_content_type: bool,
    transfer_encoding: Option<String>,
    disposition: Option<String>,
    boundary: String,
    #[cfg_attr(feature = "serde", serde(serialize_with = "serialize_headers"))]
    headers: HeaderMap,
}

impl PartHeader {
    /// Creates an empty header whose content type defaults to `text/plain; charset=us-ascii`.
    pub fn new() -> Self {
        PartHeader::with_default(ContentType::text_plain())
    }

    /// Creates an empty header with the given default content type.
    pub fn with_default(content_type: ContentType) -> Self {
        PartHeader {
            content_type,
            declared_content_type: false,
            transfer_encoding: None,
            disposition: None,
            boundary: String::new(),
            headers: HeaderMap::new(),
        }
    }

    /// The declared content type, or the default one if none was declared.
    pub fn content_type(&self) -> &ContentType {
        &self.content_type
    }

    /// Whether a `Content-Type` field was present.
    pub fn has_declared_content_type(&self) -> bool {
        self.declared_content_type
    }

    /// The raw `Content-Transfer-Encoding` value. The body is never decoded.
    pub fn transfer_encoding(&self) -> Option<&str> {
        self.transfer_encoding.as_deref()
    }

    /// The raw `Content-Disposition` value.
    pub fn disposition(&self) -> Option<&str> {
        self.disposition.as_deref()
    }

    /// The `Content-Disposition` value, parsed leniently.
    pub fn content_disposition(&self) -> Option<ContentDisposition> {
        self.disposition.as_deref().and_then(ContentDisposition::parse)
    }

    /// The multipart boundary, empty unless the part is `multipart/*`.
    pub fn boundary(&self) -> &str {
        &self.boundary
    }

    /// Every field of the header block, with folded values unfolded.
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub(crate) fn headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.headers
    }

    pub(crate) fn set_content_type(&mut self, content_type: ContentType) {
        self.boundary = if content_type.is_multipart() {
            content_type.boundary().unwrap_or_default().to_owned()
        } else {
            String::new()
        };
        self.content_type = content_type;
        self.declared_content_type = true;
    }

    pub(crate) fn set_transfer_encoding(&mut self, value: String) {
        self.transfer_encoding = Some(value);
    }

    pub(crate) fn set_disposition(&mut self, value: String) {
        self.disposition = Some(value);
    }
}

impl Default for PartHeader {
    fn default() -> Self {
        PartHeader::new()
    }
}

#[cfg(feature = "serde")]
fn serialize_headers<S: serde::Serializer>(headers: &HeaderMap, serializer: S) -> Result<S::Ok, S::Error> {
    use serde::ser::SerializeSeq;

    let mut seq = serializer.serialize_seq(Some(headers.len()))?;
    for (name, value) in headers {
        seq.serialize_element(&(name.as_str(), String::from_utf8_lossy(value.as_bytes())))?;
    }
    seq.end()
}

/// Where a part's body lies in the logical stream, as absolute byte offsets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct BodySpan {
    pub start: u64,
    pub end: u64,
}

impl BodySpan {
    pub fn len(&self) -> u64 {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    /// The span as a range over a buffer holding the message from its first byte.
    pub fn range(&self) -> Range<usize> {
        self.start as usize..self.end as usize
    }
}

/// A completed part.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct Part {
    number: String,
    header: PartHeader,
    span: BodySpan,
    #[cfg_attr(feature = "serde", serde(skip))]
    complete: bool,
}

impl Part {
    pub(crate) fn new(number: String, header: PartHeader, start: u64) -> Self {
        Part {
            number,
            header,
            span: BodySpan { start, end: start },
            complete: false,
        }
    }

    /// The hierarchical part number, e.g. `1.2.1`.
    pub fn number(&self) -> &str {
        &self.number
    }

    /// How deeply the part is nested; the top-level part is at depth 1.
    pub fn depth(&self) -> usize {
        self.number.split('.').count()
    }

    pub fn header(&self) -> &PartHeader {
        &self.header
    }

    pub fn content_type(&self) -> &ContentType {
        self.header.content_type()
    }

    pub fn transfer_encoding(&self) -> Option<&str> {
        self.header.transfer_encoding()
    }

    pub fn disposition(&self) -> Option<&str> {
        self.header.disposition()
    }

    pub fn span(&self) -> BodySpan {
        self.span
    }

    /// The raw body, given the complete message the part was parsed from.
    ///
    /// # Panics
    ///
    /// Panics if `message` is shorter than the part's span.
    pub fn body_of<'a>(&self, message: &'a [u8]) -> &'a [u8] {
        &message[self.span.range()]
    }
}

/// Completed parts keyed by part number, in the order they were parsed.
///
/// Containers come before their children and siblings keep their order.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct Parts {
    parts: Vec<Part>,
    #[cfg_attr(feature = "serde", serde(skip))]
    index: HashMap<String, usize>,
}

impl Parts {
    pub fn new() -> Self {
        Parts::default()
    }

    pub fn get(&self, number: &str) -> Option<&Part> {
        self.index.get(number).map(|&idx| &self.parts[idx])
    }

    pub fn contains(&self, number: &str) -> bool {
        self.index.contains_key(number)
    }

    /// The top-level part, numbered `1`.
    pub fn root(&self) -> Option<&Part> {
        self.get(crate::constants::ROOT_PART_NUMBER)
    }

    pub fn len(&self) -> usize {
        self.parts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parts.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Part> {
        self.parts.iter()
    }

    /// Part numbers in parse order.
    pub fn numbers(&self) -> impl Iterator<Item = &str> {
        self.parts.iter().map(Part::number)
    }

    /// Renders the parts as JSON.
    #[cfg(feature = "json")]
    #[cfg_attr(nightly, doc(cfg(feature = "json")))]
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    /// Adds a part and returns its slot. A part number that is already taken keeps its first part.
    pub(crate) fn insert(&mut self, part: Part) -> Option<usize> {
        if self.index.contains_key(&part.number) {
            return None;
        }
        let idx = self.parts.len();
        self.index.insert(part.number.clone(), idx);
        self.parts.push(part);
        Some(idx)
    }

    pub(crate) fn finish(&mut self, idx: usize, end: u64) {
        if let Some(part) = self.parts.get_mut(idx) {
            part.span.end = end.max(part.span.start);
            part.complete = true;
        }
    }

    /// Drops parts whose end was never reached, keeping the order of the rest.
    pub(crate) fn retain_complete(&mut self) {
        self.parts.retain(|part| part.complete);
        self.index = self
            .parts
            .iter()
            .enumerate()
            .map(|(idx, part)| (part.number.clone(), idx))
            .collect();
    }
}

impl<'a> IntoIterator for &'a Parts {
    type Item = &'a Part;
    type IntoIter = std::slice::Iter<'a, Part>;

    fn into_iter(self) -> Self::IntoIter {
        self.parts.iter()
    }
}
