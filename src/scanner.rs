//! Scanners for header blocks and structured header values.
//!
//! Everything here reads through the [`StreamBuffer`] one byte at a time, so a token, quoted
//! string or comment split across any number of chunks is seen as if it were contiguous.
//!
//! A structured value ends at the end of input or at a line break that is not followed by
//! whitespace; that line break is consumed, leaving the buffer at the start of the next line.

use crate::classify;
use crate::constants::{self, CR, LF};
use crate::content_type::ContentType;
use crate::helpers;
use crate::part::PartHeader;
use crate::source::ChunkSource;
use crate::{Error, StreamBuffer};
use std::collections::HashMap;

impl<S: ChunkSource> StreamBuffer<S> {
    /// Consumes the super-type of a content type and the `/` after it.
    ///
    /// Returns the lowercased super-type.
    pub fn mime_type(&mut self) -> crate::Result<String> {
        self.prime()?;

        if self.skip_cfws()?.is_none() {
            return Err(self.missing("content type"));
        }

        let position = self.position();
        let super_type = self.token()?;
        if super_type.is_empty() {
            return Err(Error::syntax(position, "invalid super-type"));
        }

        match self.skip_cfws()? {
            Some(b'/') => self.advance()?,
            Some(_) => return Err(Error::syntax(self.position(), "expected '/' after the super-type")),
            None => return Err(self.missing("'/' after the super-type")),
        }

        Ok(super_type.to_ascii_lowercase())
    }

    /// Consumes a complete content type value: `super/sub` followed by its parameters.
    ///
    /// Comments, whitespace and folded line breaks are skipped wherever whitespace is allowed.
    /// Parameters are normally separated by `;`, but a missing separator is tolerated.
    pub fn content_type(&mut self) -> crate::Result<ContentType> {
        let super_type = self.mime_type()?;

        if self.skip_cfws()?.is_none() {
            return Err(self.missing("sub-type"));
        }

        let position = self.position();
        let sub_type = self.token()?;
        if sub_type.is_empty() {
            return Err(Error::syntax(position, "invalid sub-type"));
        }

        let mut content_type = ContentType::new(super_type, sub_type);
        for (name, value) in self.parameters()? {
            content_type.insert_param(name, value);
        }

        Ok(content_type)
    }

    /// Consumes a content disposition value: a disposition type followed by its parameters.
    pub(crate) fn disposition(&mut self) -> crate::Result<(String, HashMap<String, String>)> {
        self.prime()?;

        if self.skip_cfws()?.is_none() {
            return Err(self.missing("disposition type"));
        }

        let position = self.position();
        let kind = self.token()?;
        if kind.is_empty() {
            return Err(Error::syntax(position, "invalid disposition type"));
        }

        let mut parameters = HashMap::new();
        for (name, value) in self.parameters()? {
            parameters.entry(name).or_insert(value);
        }

        Ok((kind.to_ascii_lowercase(), parameters))
    }

    /// Reads a header block up to and including the blank line that ends it.
    ///
    /// `Content-Type`, `Content-Transfer-Encoding` and `Content-Disposition` are recognized
    /// regardless of case and stored on `header`; every field is also kept in its header map.
    /// Fields that can't be represented there are skipped. A block larger than 64 KiB fails
    /// with [`Error::HeaderSizeExceeded`].
    pub fn header(&mut self, header: &mut PartHeader) -> crate::Result<()> {
        self.header_with_limit(header, constants::DEFAULT_MAX_HEADER_SIZE)
    }

    pub(crate) fn header_with_limit(&mut self, header: &mut PartHeader, limit: u64) -> crate::Result<()> {
        self.prime()?;
        let start = self.position();

        loop {
            self.check_header_size(start, limit)?;

            match self.current() {
                None => return Err(Error::eof("blank line ending the header block")),
                Some(CR) => {
                    self.advance()?;
                    match self.current() {
                        Some(LF) => {
                            self.advance()?;
                            return Ok(());
                        }
                        None => return Err(Error::eof("blank line ending the header block")),
                        Some(_) => return Err(Error::syntax(self.position() - 1, "bare CR in header block")),
                    }
                }
                Some(LF) => {
                    self.advance()?;
                    return Ok(());
                }
                Some(b) if classify::is_wsp(b) => {
                    return Err(Error::syntax(
                        self.position(),
                        "header block starts with a continuation line",
                    ));
                }
                Some(_) => self.field(header, start, limit)?,
            }
        }
    }

    fn field(&mut self, header: &mut PartHeader, start: u64, limit: u64) -> crate::Result<()> {
        let position = self.position();

        let mut name = Vec::new();
        while let Some(b) = self.current() {
            if !classify::is_field_name(b) {
                break;
            }
            name.push(b);
            self.advance()?;
            self.check_header_size(start, limit)?;
        }

        // obsolete syntax allows whitespace before the colon
        while let Some(b) = self.current() {
            if !classify::is_wsp(b) {
                break;
            }
            self.advance()?;
        }

        match self.current() {
            Some(b':') if !name.is_empty() => self.advance()?,
            Some(_) => return Err(Error::syntax(position, "malformed header line")),
            None => return Err(Error::eof("':' after a header field name")),
        }

        name.make_ascii_lowercase();

        if name == constants::CONTENT_TYPE.as_bytes() {
            self.start_capture();
            let parsed = self.content_type();
            let raw = self.take_capture();
            let content_type = parsed?;
            self.check_header_size(start, limit)?;

            store(header, &name, &helpers::unfold(&raw), true)?;

            if header.has_declared_content_type() {
                debug!("ignoring repeated Content-Type {}", content_type);
            } else {
                header.set_content_type(content_type);
            }

            return Ok(());
        }

        let value = self.field_value(start, limit)?;

        if name == constants::CONTENT_TRANSFER_ENCODING.as_bytes() {
            store(header, &name, &value, true)?;
            if header.transfer_encoding().is_none() {
                header.set_transfer_encoding(String::from_utf8_lossy(&value).into_owned());
            }
        } else if name == constants::CONTENT_DISPOSITION.as_bytes() {
            store(header, &name, &value, true)?;
            if header.disposition().is_none() {
                header.set_disposition(String::from_utf8_lossy(&value).into_owned());
            }
        } else {
            store(header, &name, &value, false)?;
        }

        Ok(())
    }

    /// Reads an unstructured field value through its last folded line.
    fn field_value(&mut self, start: u64, limit: u64) -> crate::Result<Vec<u8>> {
        let mut value = Vec::new();

        loop {
            match self.current() {
                None => return Err(Error::eof("blank line ending the header block")),
                Some(LF) => {
                    self.advance()?;
                    match self.current() {
                        Some(b) if classify::is_wsp(b) => {}
                        _ => break,
                    }
                }
                Some(b) => {
                    value.push(b);
                    self.advance()?;
                }
            }

            self.check_header_size(start, limit)?;
        }

        Ok(helpers::unfold(&value))
    }

    /// Reads `;`-separated `name=value` pairs up to the end of the value.
    fn parameters(&mut self) -> crate::Result<Vec<(String, String)>> {
        let mut params = Vec::new();

        loop {
            match self.skip_cfws()? {
                None => return Ok(params),
                Some(b';') => self.advance()?,
                Some(b) if classify::is_token(b) => params.push(self.parameter()?),
                Some(b) => {
                    return Err(Error::syntax(
                        self.position(),
                        format!("unexpected {:?} in parameter list", b as char),
                    ));
                }
            }
        }
    }

    fn parameter(&mut self) -> crate::Result<(String, String)> {
        let name = self.token()?.to_ascii_lowercase();

        match self.skip_cfws()? {
            Some(b'=') => self.advance()?,
            Some(_) => {
                return Err(Error::syntax(
                    self.position(),
                    format!("expected '=' after parameter {:?}", name),
                ));
            }
            None => return Err(self.missing(format!("'=' after parameter {:?}", name))),
        }

        let value = match self.skip_cfws()? {
            Some(b'"') => self.quoted_string()?,
            Some(b) if classify::is_token(b) => self.token()?.into_bytes(),
            Some(_) => {
                return Err(Error::syntax(
                    self.position(),
                    format!("invalid value for parameter {:?}", name),
                ));
            }
            None => return Err(self.missing(format!("value of parameter {:?}", name))),
        };

        Ok((name, String::from_utf8_lossy(&value).into_owned()))
    }

    fn token(&mut self) -> crate::Result<String> {
        let mut token = String::new();

        while let Some(b) = self.current() {
            if !classify::is_token(b) {
                break;
            }
            token.push(b as char);
            self.advance()?;
        }

        Ok(token)
    }

    /// Reads a quoted string starting at its opening quote and returns its unescaped content.
    fn quoted_string(&mut self) -> crate::Result<Vec<u8>> {
        self.advance()?;

        let mut value = Vec::new();

        loop {
            match self.current() {
                None => return Err(Error::eof("'\"' closing a quoted string")),
                Some(b'"') => {
                    self.advance()?;
                    return Ok(value);
                }
                Some(b'\\') => {
                    self.advance()?;
                    match self.current() {
                        Some(b) => {
                            value.push(b);
                            self.advance()?;
                        }
                        None => return Err(Error::eof("'\"' closing a quoted string")),
                    }
                }
                Some(CR) => self.advance()?,
                Some(LF) => {
                    let position = self.position();
                    self.advance()?;
                    match self.current() {
                        Some(b) if classify::is_wsp(b) => {}
                        Some(_) => return Err(Error::syntax(position, "unterminated quoted string")),
                        None => return Err(Error::eof("'\"' closing a quoted string")),
                    }
                }
                Some(b) => {
                    value.push(b);
                    self.advance()?;
                }
            }
        }
    }

    /// Skips a comment starting at its opening parenthesis, including nested comments.
    fn comment(&mut self) -> crate::Result<()> {
        let mut depth = 0usize;

        loop {
            match self.current() {
                None => return Err(Error::eof("')' closing a comment")),
                Some(b'(') => {
                    depth += 1;
                    self.advance()?;
                }
                Some(b')') => {
                    depth -= 1;
                    self.advance()?;
                    if depth == 0 {
                        return Ok(());
                    }
                }
                Some(b'\\') => {
                    self.advance()?;
                    if self.current().is_none() {
                        return Err(Error::eof("')' closing a comment"));
                    }
                    self.advance()?;
                }
                Some(LF) => {
                    let position = self.position();
                    self.advance()?;
                    match self.current() {
                        Some(b) if classify::is_wsp(b) => {}
                        Some(_) => return Err(Error::syntax(position, "unterminated comment")),
                        None => return Err(Error::eof("')' closing a comment")),
                    }
                }
                Some(_) => self.advance()?,
            }
        }
    }

    /// Skips whitespace, folded line breaks and comments.
    ///
    /// Returns the next significant byte without consuming it, or `None` at the end of the value.
    fn skip_cfws(&mut self) -> crate::Result<Option<u8>> {
        loop {
            match self.current() {
                None => return Ok(None),
                Some(b'(') => self.comment()?,
                Some(LF) => {
                    self.advance()?;
                    match self.current() {
                        Some(b) if classify::is_wsp(b) => {}
                        _ => return Ok(None),
                    }
                }
                Some(b) if classify::is_wsp(b) || b == CR => self.advance()?,
                Some(b) => return Ok(Some(b)),
            }
        }
    }

    /// The error for a value that ended before `what`: end of input if nothing follows, a syntax
    /// error if the line simply ended.
    fn missing<W: Into<String>>(&self, what: W) -> Error {
        let what = what.into();
        if self.current().is_none() {
            Error::eof(what)
        } else {
            Error::syntax(self.position(), format!("missing {}", what))
        }
    }

    fn check_header_size(&self, start: u64, limit: u64) -> crate::Result<()> {
        if self.position() - start > limit {
            return Err(Error::HeaderSizeExceeded { limit });
        }
        Ok(())
    }
}

fn store(header: &mut PartHeader, name: &[u8], value: &[u8], required: bool) -> crate::Result<()> {
    match helpers::append_raw_header(header.headers_mut(), name, value) {
        Ok(()) => Ok(()),
        Err(cause) if required => Err(Error::DecodeHeaderValue {
            name: String::from_utf8_lossy(name).into_owned(),
            cause,
        }),
        Err(_cause) => {
            trace!(
                "skipping header field {:?}: {}",
                String::from_utf8_lossy(name),
                _cause
            );
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn buffer(chunks: Vec<&'static str>) -> StreamBuffer {
        let mut buffer = StreamBuffer::new();
        buffer.inject(chunks);
        buffer
    }

    #[test]
    fn test_mime_type() {
        let mut b = buffer(vec!["text/plain; charset=us-ascii"]);
        assert_eq!(b.mime_type().unwrap(), "text");
        assert_eq!(b.current(), Some(b'p'));

        let mut b = buffer(vec!["  (lead) Text /plain"]);
        assert_eq!(b.mime_type().unwrap(), "text");

        assert!(matches!(buffer(vec!["/plain"]).mime_type(), Err(Error::Syntax { .. })));
        assert!(matches!(buffer(vec!["text plain"]).mime_type(), Err(Error::Syntax { .. })));
        assert!(matches!(buffer(vec!["text"]).mime_type(), Err(Error::UnexpectedEof { .. })));
        assert!(matches!(buffer(vec![""]).mime_type(), Err(Error::UnexpectedEof { .. })));
    }

    #[test]
    fn test_content_type() {
        let ct = buffer(vec!["text/plain; charset=us-ascii"]).content_type().unwrap();
        assert_eq!(ct.super_type, "text");
        assert_eq!(ct.sub_type, "plain");
        assert_eq!(ct.parameters.len(), 1);
        assert_eq!(ct.parameters["charset"], "us-ascii");
    }

    #[test]
    fn test_content_type_quoted_params() {
        let ct = buffer(vec!["text/plain; charset=\"us-ascii\""]).content_type().unwrap();
        assert_eq!(ct.charset(), Some("us-ascii"));

        let ct = buffer(vec![
            "text/plain; charset=\"us-ascii\"  \tboundary=\"D7F------------D7FD5A0B8AB9C65CCDBFA872\"",
        ])
        .content_type()
        .unwrap();
        assert_eq!(ct.parameters.len(), 2);
        assert_eq!(ct.boundary(), Some("D7F------------D7FD5A0B8AB9C65CCDBFA872"));

        let ct = buffer(vec![
            "text/plain; charset=\"us-ascii\" (a comment) \tboundary=\"D7F------------D7FD5A0B8AB9C65CCDBFA872\"",
        ])
        .content_type()
        .unwrap();
        assert_eq!(ct.super_type, "text");
        assert_eq!(ct.sub_type, "plain");
        assert_eq!(ct.parameters.len(), 2);
        assert_eq!(ct.charset(), Some("us-ascii"));
        assert_eq!(ct.boundary(), Some("D7F------------D7FD5A0B8AB9C65CCDBFA872"));
    }

    #[test]
    fn test_content_type_split_across_chunks() {
        let ct = buffer(vec!["te", "xt/pl", "ain; bou", "ndary=\"ab", "\\\"c", "\"; (com", "(nested)", " ment) x=y"])
            .content_type()
            .unwrap();
        assert_eq!(ct.super_type, "text");
        assert_eq!(ct.boundary(), Some("ab\"c"));
        assert_eq!(ct.param("x"), Some("y"));
    }

    #[test]
    fn test_content_type_folded() {
        let mut b = buffer(vec!["multipart/mixed;\r\n\tboundary=\"x\r\n y\"\r\nNext: field"]);
        let ct = b.content_type().unwrap();
        assert_eq!(ct.boundary(), Some("x y"));
        assert_eq!(b.current(), Some(b'N'));
    }

    #[test]
    fn test_content_type_errors() {
        let err = buffer(vec!["text/plain; charset=\"us-ascii"]).content_type().unwrap_err();
        assert!(err.is_eof());

        let err = buffer(vec!["text/plain; charset=\"us-ascii\r\nX: y"]).content_type().unwrap_err();
        assert!(matches!(err, Error::Syntax { .. }));

        let err = buffer(vec!["text/plain (open comment"]).content_type().unwrap_err();
        assert!(err.is_eof());

        let err = buffer(vec!["text/plain; charset"]).content_type().unwrap_err();
        assert!(err.is_eof());

        let err = buffer(vec!["text/plain; charset\r\n\r\n"]).content_type().unwrap_err();
        assert!(matches!(err, Error::Syntax { .. }));

        let err = buffer(vec!["text/; charset=x"]).content_type().unwrap_err();
        assert!(matches!(err, Error::Syntax { .. }));

        let err = buffer(vec!["text/plain; =x"]).content_type().unwrap_err();
        assert!(matches!(err, Error::Syntax { .. }));

        let err = buffer(vec!["text/plain; a=@"]).content_type().unwrap_err();
        assert!(matches!(err, Error::Syntax { .. }));
    }

    #[test]
    fn test_trailing_semicolon() {
        let ct = buffer(vec!["text/plain;"]).content_type().unwrap();
        assert!(ct.parameters.is_empty());
    }

    const EMAIL_HEADER: &str = "From: Al Gore <vice-president@whitehouse.gov>
To: White House Transportation Coordinator <transport@whitehouse.gov>
Subject: [Fwd: Map of Argentina with Description]
MIME-Version: 1.0
DKIM-Signature: v=1; a=rsa-sha256; c=relaxed; s=ncr424; d=reliancegeneral.co.in;
 h=List-Unsubscribe:MIME-Version:From:To:Reply-To:Date:Subject:Content-Type:Content-Transfer-Encoding:Message-ID; i=prospects@prospects.reliancegeneral.co.in;
 bh=F4UQPGEkpmh54C7v3DL8mm2db1QhZU4gRHR1jDqffG8=;
 b=MVltcq6/I9b218a370fuNFLNinR9zQcdBSmzttFkZ7TvV2mOsGrzrwORT8PKYq4KNJNOLBahswXf
   GwaMjDKT/5TXzegdX/L3f/X4bMAEO1einn+nUkVGLK4zVQus+KGqm4oP7uVXjqp70PWXScyWWkbT
   1PGUwRfPd/HTJG5IUqs=
Content-Type: multipart/mixed;
 boundary=\"D7F------------D7FD5A0B8AB9C65CCDBFA872\"

This is a multi-part message in MIME format.
";

    #[test]
    fn test_email_header() {
        let mut b = buffer(vec![EMAIL_HEADER]);
        let mut header = PartHeader::new();
        b.header(&mut header).unwrap();

        assert_eq!(b.current(), Some(b'T'));
        assert_eq!(header.boundary(), "D7F------------D7FD5A0B8AB9C65CCDBFA872");
        assert_eq!(header.content_type().super_type, "multipart");
        assert_eq!(header.content_type().sub_type, "mixed");
        assert!(header.has_declared_content_type());

        let headers = header.headers();
        assert_eq!(headers["from"], "Al Gore <vice-president@whitehouse.gov>");
        assert_eq!(headers["subject"], "[Fwd: Map of Argentina with Description]");
        assert_eq!(
            headers["content-type"],
            "multipart/mixed; boundary=\"D7F------------D7FD5A0B8AB9C65CCDBFA872\""
        );
        let dkim = headers["dkim-signature"].to_str().unwrap();
        assert!(dkim.starts_with("v=1; a=rsa-sha256;"));
        assert!(dkim.ends_with("1PGUwRfPd/HTJG5IUqs="));
        assert!(!dkim.contains('\n'));
    }

    #[test]
    fn test_header_split_per_byte() {
        let mut b = StreamBuffer::new();
        b.inject(EMAIL_HEADER.as_bytes().chunks(1).map(|c| c.to_vec()));

        let mut header = PartHeader::new();
        b.header(&mut header).unwrap();
        assert_eq!(header.boundary(), "D7F------------D7FD5A0B8AB9C65CCDBFA872");
        assert_eq!(b.current(), Some(b'T'));
    }

    #[test]
    fn test_header_recognized_fields() {
        let mut b = buffer(vec![
            "content-transfer-encoding:  Base64 \r\n",
            "CONTENT-DISPOSITION: attachment;\r\n filename=\"a.gif\"\r\n",
            "Content-Type: image/gif\r\n",
            "Content-Type: text/html\r\n",
            "X-Weird@Name: skipped\r\n",
            "\r\n",
            "body",
        ]);
        let mut header = PartHeader::new();
        b.header(&mut header).unwrap();

        assert_eq!(header.transfer_encoding(), Some("Base64"));
        assert_eq!(header.disposition(), Some("attachment; filename=\"a.gif\""));
        assert_eq!(header.content_disposition().unwrap().file_name(), Some("a.gif"));
        assert_eq!(header.content_type().sub_type, "gif");
        assert_eq!(header.headers().get_all("content-type").iter().count(), 2);
        assert_eq!(header.headers().len(), 4);
        assert_eq!(b.current(), Some(b'b'));
    }

    #[test]
    fn test_header_default_content_type() {
        let mut b = buffer(vec!["Subject: hi\n\n"]);
        let mut header = PartHeader::new();
        b.header(&mut header).unwrap();

        assert!(!header.has_declared_content_type());
        assert_eq!(header.content_type(), &ContentType::text_plain());
        assert_eq!(header.boundary(), "");
        assert!(b.is_eof());
    }

    #[test]
    fn test_header_errors() {
        let mut header = PartHeader::new();

        let err = buffer(vec!["Subject: hi\r\n"]).header(&mut header).unwrap_err();
        assert!(err.is_eof());

        let err = buffer(vec!["Subject: hi"]).header(&mut header).unwrap_err();
        assert!(err.is_eof());

        let err = buffer(vec!["not a header line\r\n\r\n"]).header(&mut header).unwrap_err();
        assert!(matches!(err, Error::Syntax { position: 0, .. }));

        let err = buffer(vec![" folded: first\r\n\r\n"]).header(&mut header).unwrap_err();
        assert!(matches!(err, Error::Syntax { .. }));

        let err = buffer(vec![": no name\r\n\r\n"]).header(&mut header).unwrap_err();
        assert!(matches!(err, Error::Syntax { .. }));

        let err = buffer(vec!["Content-Type: text\r\n\r\n"]).header(&mut header).unwrap_err();
        assert!(matches!(err, Error::Syntax { .. }));
    }

    #[test]
    fn test_header_size_limit() {
        let mut header = PartHeader::new();
        let err = buffer(vec!["Subject: a rather long subject line\r\n\r\n"])
            .header_with_limit(&mut header, 16)
            .unwrap_err();
        assert_eq!(err, Error::HeaderSizeExceeded { limit: 16 });

        let mut header = PartHeader::new();
        buffer(vec!["Subject: short\r\n\r\n"])
            .header_with_limit(&mut header, 64)
            .unwrap();
    }

    #[test]
    fn test_header_size_default_limit() {
        let mut b = StreamBuffer::new();
        b.inject(vec![format!("Subject: {}\r\n\r\nbody", "x".repeat(70 * 1024))]);

        let err = b.header(&mut PartHeader::new()).unwrap_err();
        assert_eq!(err, Error::HeaderSizeExceeded { limit: 64 * 1024 });

        let mut b = StreamBuffer::new();
        b.inject(vec![format!("Subject: {}\r\n\r\nbody", "x".repeat(60 * 1024))]);
        b.header(&mut PartHeader::new()).unwrap();
        assert_eq!(b.current(), Some(b'b'));
    }

    #[test]
    fn test_disposition() {
        let (kind, params) = buffer(vec!["in1ine; fi1ename=\"map_of_Argentina.gif\""]).disposition().unwrap();
        assert_eq!(kind, "in1ine");
        assert_eq!(params["fi1ename"], "map_of_Argentina.gif");
    }
}
