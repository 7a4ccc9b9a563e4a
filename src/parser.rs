use crate::buffer::StreamBuffer;
use crate::constants;
use crate::content_type::ContentType;
use crate::limits::Limits;
use crate::part::{Part, PartHeader, Parts};
use crate::source::{ChunkSource, Exhausted};
use crate::state::Stage;
use crate::Error;
use bytes::Bytes;

/// Walks the structure of a MIME message while its bytes arrive.
///
/// The parser reads the header of the top-level part, descends into `multipart/*` and
/// `message/rfc822` parts, and records every part it finishes in a [`Parts`] collection keyed by
/// hierarchical part number. Bodies are not kept in memory: each [`Part`] only records the
/// [`span`](Part::span) its body occupies in the stream.
///
/// Bytes come from injected chunks and, once those run out, from the parser's [`ChunkSource`],
/// which is asked for one chunk at a time and may block until it has one.
///
/// # Examples
///
/// ```
/// use mime_walker::{Parser, Stage};
///
/// let data = "Content-Type: multipart/alternative; boundary=b\r\n\r\n\
///             --b\r\nContent-Type: text/plain\r\n\r\nhi\r\n\
///             --b\r\nContent-Type: text/html\r\n\r\n<p>hi</p>\r\n--b--\r\n";
///
/// let mut parser = Parser::new();
/// parser.inject(data.as_bytes().chunks(7).map(|c| c.to_vec()));
///
/// let parts = parser.parse().unwrap();
/// let numbers: Vec<&str> = parts.numbers().collect();
/// assert_eq!(numbers, ["1", "1.1", "1.2"]);
/// assert_eq!(parts.get("1.2").unwrap().content_type().sub_type, "html");
/// assert_eq!(parser.stage(), Stage::Done);
/// ```
#[derive(Debug)]
pub struct Parser<S = Exhausted> {
    buffer: StreamBuffer<S>,
    parts: Parts,
    limits: Limits,
    stage: Stage,
}

/// How a part ended.
#[derive(Debug, Clone, Copy)]
struct PartEnd {
    /// Offset where the part's body stops.
    end: u64,
    /// Whether the delimiter that ended it was the closing one of its level.
    is_final: bool,
}

impl Parser<Exhausted> {
    /// Creates a parser that only reads injected chunks.
    pub fn new() -> Self {
        Parser::with_source(Exhausted)
    }

    /// Creates a parser that only reads injected chunks, with the given limits.
    pub fn with_limits(limits: Limits) -> Self {
        Parser::with_source_and_limits(Exhausted, limits)
    }
}

impl Default for Parser<Exhausted> {
    fn default() -> Self {
        Parser::new()
    }
}

impl<S: ChunkSource> Parser<S> {
    /// Creates a parser pulling chunks from `source`.
    pub fn with_source(source: S) -> Self {
        Parser::with_source_and_limits(source, Limits::default())
    }

    /// Creates a parser pulling chunks from `source`, with the given limits.
    pub fn with_source_and_limits(source: S, limits: Limits) -> Self {
        Parser {
            buffer: StreamBuffer::with_source(source),
            parts: Parts::new(),
            limits,
            stage: Stage::AwaitingHeader,
        }
    }

    /// Appends chunks to the stream; they are read before anything the source provides.
    pub fn inject<I, B>(&mut self, chunks: I)
    where
        I: IntoIterator<Item = B>,
        B: Into<Bytes>,
    {
        self.buffer.inject(chunks);
    }

    /// The byte at the read position, or `None` if no data is available.
    pub fn current_byte(&self) -> Option<u8> {
        self.buffer.current()
    }

    /// Moves the read position forward by one byte, pulling a chunk from the source if needed.
    pub fn advance(&mut self) -> crate::Result<()> {
        self.buffer.advance()
    }

    /// Absolute offset of the read position.
    pub fn position(&self) -> u64 {
        self.buffer.position()
    }

    /// Number of chunks read to their end so far.
    pub fn chunks_consumed(&self) -> usize {
        self.buffer.chunks_consumed()
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }

    /// The parts completed so far.
    ///
    /// After a failed [`parse`](Parser::parse) this holds the parts whose body end was reached
    /// before the error; containers still open at that point are left out.
    pub fn parts(&self) -> &Parts {
        &self.parts
    }

    pub fn into_parts(self) -> Parts {
        self.parts
    }

    /// Reads a super-type and the `/` after it. See [`StreamBuffer::mime_type`].
    pub fn mime_type(&mut self) -> crate::Result<String> {
        self.buffer.mime_type()
    }

    /// Reads a `Content-Type` value. See [`StreamBuffer::content_type`].
    pub fn content_type(&mut self) -> crate::Result<ContentType> {
        self.buffer.content_type()
    }

    /// Reads a header block within the configured header size limit. See
    /// [`StreamBuffer::header`].
    pub fn header(&mut self, header: &mut PartHeader) -> crate::Result<()> {
        self.buffer.header_with_limit(header, self.limits.max_header_size)
    }

    /// Consumes the stream through the next delimiter line. See [`StreamBuffer::boundary`].
    pub fn boundary(&mut self, boundary: &str) -> crate::Result<bool> {
        self.buffer.boundary(boundary)
    }

    /// Parses the whole message from the current position.
    ///
    /// The top-level part is numbered `1`. On error the stage becomes [`Stage::Failed`] and
    /// parsing stops; a parser can't be resumed or run twice.
    pub fn parse(&mut self) -> crate::Result<&Parts> {
        if self.stage.is_terminal() {
            return Err(Error::StructuralViolation("message was already parsed".into()));
        }

        let result = self
            .buffer
            .prime()
            .and_then(|_| self.mime(constants::ROOT_PART_NUMBER.to_owned(), None, ContentType::text_plain(), 1));

        match result {
            Ok(_) => {
                debug!(
                    "parsed {} parts from {} bytes in {} chunks",
                    self.parts.len(),
                    self.buffer.position(),
                    self.buffer.chunks_consumed()
                );
                self.stage = Stage::Done;
                Ok(&self.parts)
            }
            Err(err) => {
                debug!("parse failed at offset {}: {}", self.buffer.position(), err);
                self.parts.retain_complete();
                self.stage = Stage::Failed;
                Err(err)
            }
        }
    }

    /// Parses one part and everything nested in it.
    ///
    /// `enclosing` is the boundary of the multipart level the part belongs to, which ends its
    /// body; without one the body runs to the end of input.
    fn mime(
        &mut self,
        number: String,
        enclosing: Option<&str>,
        default: ContentType,
        depth: usize,
    ) -> crate::Result<PartEnd> {
        self.limits.check_depth(depth)?;
        self.limits.check_parts(self.parts.len() + 1)?;

        self.stage = if enclosing.is_some() {
            Stage::AwaitingPartHeader
        } else {
            Stage::AwaitingHeader
        };

        let mut header = PartHeader::with_default(default);
        self.header(&mut header)?;

        let content_type = header.content_type();
        if content_type.is_multipart() && header.boundary().is_empty() {
            return Err(Error::StructuralViolation(format!(
                "part {} is {}/{} without a boundary",
                number, content_type.super_type, content_type.sub_type
            )));
        }

        let is_rfc822 = content_type.is_message_rfc822();
        let child_default = if content_type.is_digest() {
            ContentType::message_rfc822()
        } else {
            ContentType::text_plain()
        };
        let boundary = header.boundary().to_owned();

        trace!("part {} is {}", number, content_type);

        let idx = self.add_part(header, number.clone())?;

        let ended = if !boundary.is_empty() {
            self.mime_msg(&number, &boundary, child_default, depth)?;
            self.stage = Stage::AwaitingBoundary;
            self.body(enclosing)?
        } else if is_rfc822 {
            self.mime(format!("{}.1", number), enclosing, ContentType::text_plain(), depth + 1)?
        } else {
            self.stage = if enclosing.is_some() {
                Stage::AwaitingPartBody
            } else {
                Stage::AwaitingBody
            };
            self.body(enclosing)?
        };

        self.parts.finish(idx, ended.end);

        Ok(ended)
    }

    /// Parses the children of multipart part `number` up to its closing delimiter.
    fn mime_msg(&mut self, number: &str, boundary: &str, child_default: ContentType, depth: usize) -> crate::Result<()> {
        self.stage = Stage::AwaitingFirstBoundary;

        if self.buffer.find_boundary(boundary)?.is_final {
            debug!("multipart part {} has no children", number);
            return Ok(());
        }

        let mut sibling = 0;
        loop {
            sibling += 1;

            let child = format!("{}.{}", number, sibling);
            let ended = self.mime(child, Some(boundary), child_default.clone(), depth + 1)?;

            if ended.is_final {
                return Ok(());
            }
        }
    }

    /// Skips a body up to the next delimiter of `enclosing`, or to the end of input.
    fn body(&mut self, enclosing: Option<&str>) -> crate::Result<PartEnd> {
        match enclosing {
            Some(boundary) => {
                let found = self.buffer.find_boundary(boundary)?;
                Ok(PartEnd {
                    end: found.body_end,
                    is_final: found.is_final,
                })
            }
            None => {
                self.buffer.drain()?;
                Ok(PartEnd {
                    end: self.buffer.position(),
                    is_final: true,
                })
            }
        }
    }

    fn add_part(&mut self, header: PartHeader, number: String) -> crate::Result<usize> {
        let part = Part::new(number, header, self.buffer.position());

        match self.parts.insert(part) {
            Some(idx) => Ok(idx),
            None => Err(Error::StructuralViolation("duplicate part number".into())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::IterSource;

    fn parse(data: &str) -> Parser {
        let mut parser = Parser::new();
        parser.inject(vec![data.to_owned()]);
        parser.parse().unwrap();
        parser
    }

    #[test]
    fn test_single_part() {
        let data = "Subject: hello\r\nContent-Transfer-Encoding: 7bit\r\n\r\nbody\r\n";
        let parser = parse(data);

        let root = parser.parts().root().unwrap();
        assert_eq!(parser.parts().len(), 1);
        assert_eq!(root.content_type(), &ContentType::text_plain());
        assert_eq!(root.transfer_encoding(), Some("7bit"));
        assert_eq!(root.body_of(data.as_bytes()), b"body\r\n");
        assert_eq!(parser.stage(), Stage::Done);
    }

    #[test]
    fn test_multipart() {
        let data = "Content-Type: multipart/mixed; boundary=X\r\n\r\npreamble\r\n\
                    --X\r\nContent-Type: text/plain\r\n\r\nabcd\r\n\
                    --X\r\n\r\nefgh\r\n\
                    --X--\r\nepilogue";
        let parser = parse(data);
        let parts = parser.parts();

        let numbers: Vec<&str> = parts.numbers().collect();
        assert_eq!(numbers, ["1", "1.1", "1.2"]);

        let root = parts.root().unwrap();
        assert_eq!(root.header().boundary(), "X");
        assert!(root.body_of(data.as_bytes()).starts_with(b"preamble"));
        assert!(root.body_of(data.as_bytes()).ends_with(b"epilogue"));

        assert_eq!(parts.get("1.1").unwrap().body_of(data.as_bytes()), b"abcd");

        let second = parts.get("1.2").unwrap();
        assert!(!second.header().has_declared_content_type());
        assert_eq!(second.content_type().charset(), Some("us-ascii"));
        assert_eq!(second.body_of(data.as_bytes()), b"efgh");
        assert_eq!(second.depth(), 2);
    }

    #[test]
    fn test_message_rfc822() {
        let data = "Content-Type: message/rfc822\n\nSubject: inner\nContent-Type: text/html\n\n<p>hi</p>\n";
        let parser = parse(data);
        let parts = parser.parts();

        assert!(parts.root().unwrap().content_type().is_message_rfc822());

        let inner = parts.get("1.1").unwrap();
        assert_eq!(inner.header().headers()["subject"], "inner");
        assert_eq!(inner.content_type().sub_type, "html");
        assert_eq!(inner.body_of(data.as_bytes()), b"<p>hi</p>\n");
        assert_eq!(parts.root().unwrap().span().end, inner.span().end);
    }

    #[test]
    fn test_digest_children_default_to_messages() {
        let data = "Content-Type: multipart/digest; boundary=d\n\n\
                    --d\n\nSubject: one\n\nfirst\n\
                    --d\nContent-Type: text/plain\n\nsecond\n\
                    --d--\n";
        let parser = parse(data);
        let parts = parser.parts();

        let numbers: Vec<&str> = parts.numbers().collect();
        assert_eq!(numbers, ["1", "1.1", "1.1.1", "1.2"]);

        let message = parts.get("1.1").unwrap();
        assert!(message.content_type().is_message_rfc822());
        assert!(!message.header().has_declared_content_type());
        assert_eq!(parts.get("1.1.1").unwrap().body_of(data.as_bytes()), b"first");
        assert_eq!(parts.get("1.2").unwrap().body_of(data.as_bytes()), b"second");
    }

    #[test]
    fn test_empty_multipart() {
        let data = "Content-Type: multipart/mixed; boundary=e\r\n\r\n--e--\r\n";
        let parser = parse(data);
        assert_eq!(parser.parts().len(), 1);
    }

    const NESTED: &str = "Content-Type: multipart/mixed; boundary=a\n\n\
                          --a\nContent-Type: multipart/mixed; boundary=b\n\n\
                          --b\n\nx\n--b--\n\
                          --a--\n";

    #[test]
    fn test_nesting_limit() {
        let mut parser = Parser::with_limits(Limits::new().max_depth(2));
        parser.inject(vec![NESTED]);

        assert_eq!(parser.parse().unwrap_err(), Error::NestingTooDeep { limit: 2 });
        assert_eq!(parser.stage(), Stage::Failed);
        assert!(parser.parts().is_empty());

        let mut parser = Parser::with_limits(Limits::new().max_depth(3));
        parser.inject(vec![NESTED]);
        assert_eq!(parser.parse().unwrap().len(), 3);
    }

    #[test]
    fn test_parts_limit() {
        let mut parser = Parser::with_limits(Limits::new().max_parts(2));
        parser.inject(vec![NESTED]);
        assert_eq!(parser.parse().unwrap_err(), Error::TooManyParts { limit: 2 });
    }

    #[test]
    fn test_header_size_limit() {
        let mut parser = Parser::with_limits(Limits::new().max_header_size(8));
        parser.inject(vec!["Subject: a long subject\n\nbody"]);
        assert_eq!(parser.parse().unwrap_err(), Error::HeaderSizeExceeded { limit: 8 });

        let mut parser = Parser::new();
        parser.inject(vec![format!("X-Padding: {}\n\nbody", "y".repeat(65 * 1024))]);
        assert_eq!(
            parser.parse().unwrap_err(),
            Error::HeaderSizeExceeded { limit: 64 * 1024 }
        );
    }

    #[test]
    fn test_multipart_without_boundary() {
        let mut parser = Parser::new();
        parser.inject(vec!["Content-Type: multipart/mixed\n\nbody"]);

        let err = parser.parse().unwrap_err();
        assert!(matches!(err, Error::StructuralViolation(_)));
        assert!(parser.parts().is_empty());
    }

    #[test]
    fn test_missing_boundary() {
        let mut parser = Parser::new();
        parser.inject(vec!["Content-Type: multipart/mixed; boundary=zz\n\nno delimiter\n"]);

        assert!(parser.parse().unwrap_err().is_eof());
        assert_eq!(parser.stage(), Stage::Failed);
        assert!(parser.parts().is_empty());
    }

    #[test]
    fn test_failure_keeps_finished_parts_only() {
        let data = "Content-Type: multipart/mixed; boundary=X\r\n\r\n\
                    --X\r\n\r\nfirst\r\n\
                    --X\r\n\r\nsecond";
        let mut parser = Parser::new();
        parser.inject(vec![data]);

        assert!(parser.parse().unwrap_err().is_eof());
        assert_eq!(parser.stage(), Stage::Failed);

        let parts = parser.parts();
        assert_eq!(parts.numbers().collect::<Vec<_>>(), vec!["1.1"]);
        assert_eq!(parts.get("1.1").unwrap().body_of(data.as_bytes()), b"first");
        assert!(parts.root().is_none());
        assert!(!parts.contains("1.2"));
    }

    #[test]
    fn test_parse_twice() {
        let mut parser = parse("\nbody");
        assert!(parser.parse().is_err());
        assert_eq!(parser.stage(), Stage::Done);
    }

    #[test]
    fn test_with_source() {
        let source = IterSource::new(vec!["Content-Type: text/", "html\r\n", "\r\n", "<b>"]);
        let mut parser = Parser::with_source(source);
        parser.inject(vec!["X-Mailer: test\r\n"]);

        let parts = parser.parse().unwrap();
        assert_eq!(parts.root().unwrap().content_type().sub_type, "html");
        assert_eq!(parser.position(), 46);
        assert_eq!(parser.chunks_consumed(), 5);
    }

    #[test]
    fn test_scanner_wrappers() {
        let mut parser = Parser::new();
        parser.inject(vec!["text/plain; a=b\r\n", "--x\r\n"]);

        assert_eq!(parser.stage(), Stage::AwaitingHeader);
        assert_eq!(parser.content_type().unwrap().param("a"), Some("b"));
        assert_eq!(parser.current_byte(), Some(b'-'));
        assert!(!parser.boundary("x").unwrap());
        assert_eq!(parser.current_byte(), None);
    }
}
