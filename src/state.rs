/// Where the structural walker is within the part it is currently working on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    /// Reading a part's header block.
    AwaitingHeader,
    /// Reading the body of a single-part part.
    AwaitingBody,
    /// Skipping a multipart preamble up to the first delimiter.
    AwaitingFirstBoundary,
    /// Reading the header block of a multipart child.
    AwaitingPartHeader,
    /// Reading the body of a multipart child.
    AwaitingPartBody,
    /// Looking for the delimiter that ends a nested multipart child.
    AwaitingBoundary,
    /// The message was parsed completely.
    Done,
    /// Parsing stopped at the first error.
    Failed,
}

impl Stage {
    /// Whether the walker stopped, successfully or not.
    pub fn is_terminal(self) -> bool {
        matches!(self, Stage::Done | Stage::Failed)
    }
}
