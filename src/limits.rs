use crate::constants;

/// Resource limits for a single parse, to keep hostile messages from exhausting the stack or
/// memory.
///
/// # Examples
///
/// ```
/// use mime_walker::{Limits, Parser};
///
/// let limits = Limits::new().max_depth(8).max_parts(100).max_header_size(64 * 1024);
/// let parser = Parser::with_limits(limits);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Limits {
    pub(crate) max_depth: usize,
    pub(crate) max_parts: usize,
    pub(crate) max_header_size: u64,
}

impl Limits {
    /// Creates the default limits: nesting depth of 64, unlimited parts and 64 KiB per header block.
    pub fn new() -> Limits {
        Limits::default()
    }

    /// Sets how deeply parts may nest; the top-level part is at depth 1.
    pub fn max_depth(mut self, limit: usize) -> Limits {
        self.max_depth = limit;
        self
    }

    /// Sets how many parts one message may have, counting every container.
    pub fn max_parts(mut self, limit: usize) -> Limits {
        self.max_parts = limit;
        self
    }

    /// Sets the size limit for one header block, in bytes.
    pub fn max_header_size(mut self, limit: u64) -> Limits {
        self.max_header_size = limit;
        self
    }

    pub(crate) fn check_depth(&self, depth: usize) -> crate::Result<()> {
        if depth > self.max_depth {
            return Err(crate::Error::NestingTooDeep { limit: self.max_depth });
        }
        Ok(())
    }

    pub(crate) fn check_parts(&self, count: usize) -> crate::Result<()> {
        if count > self.max_parts {
            return Err(crate::Error::TooManyParts { limit: self.max_parts });
        }
        Ok(())
    }
}

impl Default for Limits {
    fn default() -> Self {
        Limits {
            max_depth: constants::DEFAULT_MAX_DEPTH,
            max_parts: constants::DEFAULT_MAX_PARTS,
            max_header_size: constants::DEFAULT_MAX_HEADER_SIZE,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_checks() {
        let limits = Limits::new().max_depth(2).max_parts(3);

        assert!(limits.check_depth(2).is_ok());
        assert_eq!(limits.check_depth(3), Err(crate::Error::NestingTooDeep { limit: 2 }));
        assert!(limits.check_parts(3).is_ok());
        assert_eq!(limits.check_parts(4), Err(crate::Error::TooManyParts { limit: 3 }));
        assert_eq!(Limits::default().max_header_size, 64 * 1024);
    }
}
