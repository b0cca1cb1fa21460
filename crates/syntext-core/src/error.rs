use thiserror::Error;

/// Error kinds for categorizing compile errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Tagged block names a tag that is neither registered nor an HTML element
    UnknownTag,
    /// Block-level HTML opening tag without a matching closer
    UnmatchedHtmlTag,
    /// Two ids on one header line
    DuplicateId,
    /// Ragged table rows or a malformed alignment row
    InvalidTable,
    /// Nesting deeper than the block depth cap
    ExcessiveNesting,
}

/// A structural failure that aborts compilation.
///
/// Every variant carries the 1-based line of the normalized source where
/// the offending construct starts.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CompileError {
    #[error("line {line}: unknown tag '{tag}'")]
    UnknownTag { tag: String, line: u32 },

    #[error("line {line}: no matching closing tag for <{tag}>")]
    UnmatchedHtmlTag { tag: String, line: u32 },

    #[error("line {line}: duplicate id '#{id}' in block header")]
    DuplicateId { id: String, line: u32 },

    #[error("line {line}: invalid table: {reason}")]
    InvalidTable { reason: String, line: u32 },

    #[error("line {line}: nesting deeper than {depth} levels")]
    ExcessiveNesting { depth: usize, line: u32 },
}

impl CompileError {
    pub fn unknown_tag(tag: &str, line: u32) -> Self {
        Self::UnknownTag {
            tag: tag.to_string(),
            line,
        }
    }

    pub fn unmatched_html_tag(tag: &str, line: u32) -> Self {
        Self::UnmatchedHtmlTag {
            tag: tag.to_string(),
            line,
        }
    }

    pub fn duplicate_id(id: &str, line: u32) -> Self {
        Self::DuplicateId {
            id: id.to_string(),
            line,
        }
    }

    pub fn invalid_table(reason: impl Into<String>, line: u32) -> Self {
        Self::InvalidTable {
            reason: reason.into(),
            line,
        }
    }

    pub fn excessive_nesting(depth: usize, line: u32) -> Self {
        Self::ExcessiveNesting { depth, line }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::UnknownTag { .. } => ErrorKind::UnknownTag,
            Self::UnmatchedHtmlTag { .. } => ErrorKind::UnmatchedHtmlTag,
            Self::DuplicateId { .. } => ErrorKind::DuplicateId,
            Self::InvalidTable { .. } => ErrorKind::InvalidTable,
            Self::ExcessiveNesting { .. } => ErrorKind::ExcessiveNesting,
        }
    }

    /// Source line (1-based) where the error was detected.
    pub fn line(&self) -> u32 {
        match self {
            Self::UnknownTag { line, .. }
            | Self::UnmatchedHtmlTag { line, .. }
            | Self::DuplicateId { line, .. }
            | Self::InvalidTable { line, .. }
            | Self::ExcessiveNesting { line, .. } => *line,
        }
    }

    /// Shift the reported line, used when the body was compiled after
    /// front matter was stripped.
    pub fn offset_lines(mut self, by: u32) -> Self {
        match &mut self {
            Self::UnknownTag { line, .. }
            | Self::UnmatchedHtmlTag { line, .. }
            | Self::DuplicateId { line, .. }
            | Self::InvalidTable { line, .. }
            | Self::ExcessiveNesting { line, .. } => *line += by,
        }
        self
    }
}

pub type Result<T, E = CompileError> = std::result::Result<T, E>;
