use crate::classify;
use crate::constants::{self, CR, LF};
use crate::source::ChunkSource;
use crate::{Error, StreamBuffer};

/// A delimiter line found by [`StreamBuffer::find_boundary`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct BoundaryMatch {
    /// Whether it was the closing delimiter, `--boundary--`.
    pub(crate) is_final: bool,
    /// Where the preceding body ends: the line break in front of the delimiter, or the
    /// delimiter itself when it starts mid-line.
    pub(crate) body_end: u64,
}

impl<S: ChunkSource> StreamBuffer<S> {
    /// Consumes everything up to and including the next delimiter for `boundary`.
    ///
    /// A delimiter is `--` followed by the boundary, then either `--` for the closing delimiter
    /// or optional whitespace and a line break. It may start at any byte; a line break right in
    /// front of it belongs to the delimiter rather than to the body before it. Returns `true` if it was
    /// the closing delimiter (`--boundary--`), after which no sibling parts follow.
    pub fn boundary(&mut self, boundary: &str) -> crate::Result<bool> {
        self.find_boundary(boundary).map(|found| found.is_final)
    }

    pub(crate) fn find_boundary(&mut self, boundary: &str) -> crate::Result<BoundaryMatch> {
        if boundary.is_empty() {
            return Err(Error::StructuralViolation("empty multipart boundary".into()));
        }

        let target = constants::delimiter(boundary);
        let fallback = fallback_table(&target);

        self.prime()?;

        // offset of the last LF seen and where a body ending in front of it would end
        let mut line_break: Option<(u64, u64)> = None;
        let mut matched = 0;

        loop {
            let ch = match self.current() {
                Some(ch) => ch,
                None => return Err(Error::eof(format!("multipart boundary {:?}", boundary))),
            };

            if matched == 0 && ch != target[0] && ch != LF {
                self.skip_until_either(target[0], LF)?;
                continue;
            }

            if ch == LF {
                let position = self.position();
                let body_end = match self.previous() {
                    Some(CR) => position - 1,
                    _ => position,
                };
                line_break = Some((position, body_end));
            }

            while matched > 0 && ch != target[matched] {
                matched = fallback[matched - 1];
            }
            if ch == target[matched] {
                matched += 1;
            }

            self.advance()?;

            if matched == target.len() {
                let start = self.position() - target.len() as u64;
                let body_end = match line_break {
                    Some((lf, body_end)) if lf + 1 == start => body_end,
                    _ => start,
                };

                if let Some(is_final) = self.delimiter_tail(boundary)? {
                    trace!(
                        "found {} boundary {:?}, body ends at {}",
                        if is_final { "final" } else { "ordinary" },
                        boundary,
                        body_end
                    );
                    return Ok(BoundaryMatch { is_final, body_end });
                }

                matched = 0;
            }
        }
    }

    /// Reads what follows a matched `--boundary`.
    ///
    /// Returns `Some(true)` for a closing delimiter, whose line is consumed through its line
    /// break or to the end of input, `Some(false)` for an ordinary delimiter line, and `None` if
    /// the line only starts like a delimiter.
    fn delimiter_tail(&mut self, boundary: &str) -> crate::Result<Option<bool>> {
        if self.current() == Some(b'-') {
            self.advance()?;
            if self.current() != Some(b'-') {
                return Ok(None);
            }
            self.advance()?;

            self.skip_until(LF)?;
            if self.current() == Some(LF) {
                self.advance()?;
            }
            return Ok(Some(true));
        }

        // transport padding
        while let Some(b) = self.current() {
            if !classify::is_wsp(b) {
                break;
            }
            self.advance()?;
        }

        match self.current() {
            Some(CR) => {
                self.advance()?;
                match self.current() {
                    Some(LF) => {
                        self.advance()?;
                        Ok(Some(false))
                    }
                    None => Err(Error::eof(format!("line break after multipart boundary {:?}", boundary))),
                    Some(_) => Ok(None),
                }
            }
            Some(LF) => {
                self.advance()?;
                Ok(Some(false))
            }
            None => Err(Error::eof(format!("line break after multipart boundary {:?}", boundary))),
            Some(_) => Ok(None),
        }
    }
}

/// For each prefix length `i + 1` of `target`, the length of its longest proper prefix that is
/// also a suffix, so a failed match resumes without re-reading bytes.
fn fallback_table(target: &[u8]) -> Vec<usize> {
    let mut table = vec![0; target.len()];
    let mut len = 0;

    for i in 1..target.len() {
        while len > 0 && target[i] != target[len] {
            len = table[len - 1];
        }
        if target[i] == target[len] {
            len += 1;
        }
        table[i] = len;
    }

    table
}
