//! Error types for 3MF package conversion
//!
//! Every error carries a stable code so front ends can categorize failures
//! without matching on message text.
//!
//! # Error Codes
//!
//! Error codes follow the pattern: `E<category><number>`
//!
//! Categories:
//! - **E1xxx**: I/O and archive errors
//! - **E2xxx**: XML parsing and model structure errors
//! - **E5xxx**: Front end collaborator errors (settings)
//!
//! ## Common Error Codes
//!
//! - `E1001`: I/O error reading or writing a file
//! - `E1002`: ZIP archive format error
//! - `E1003`: Missing required part in the package
//! - `E1004`: Invalid package descriptor
//! - `E1005`: Destination file could not be replaced atomically
//! - `E2001`: XML parsing error in a model part
//! - `E2002`: Unsupported or malformed character encoding
//! - `E2003`: Model part lacks the required `model`/`resources`/`build` shape
//! - `E2005`: XML writing error
//! - `E5001`: Settings could not be persisted

use std::io;
use thiserror::Error;

/// Result type for conversion operations
pub type Result<T> = std::result::Result<T, Error>;

/// Coarse classification of an [`Error`]
///
/// Front ends translate these into user-facing messages or exit codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// The container cannot be opened or a required descriptor part is absent
    Archive,
    /// A model part is not well-formed XML (or cannot be decoded)
    Parse,
    /// A model part lacks the minimum `model`/`resources`/`build` shape
    Structure,
    /// Filesystem read/write failure, including the atomic destination write
    Io,
}

/// Additional context for errors
///
/// Provides optional supplementary information to help with debugging:
/// - The package part where the error occurred
/// - Line and column numbers (when available from XML parsing)
/// - The raw byte offset reported by the XML reader
/// - Helpful hints for resolving common issues
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ErrorContext {
    /// The part where the error occurred (a path within the 3MF archive)
    pub file: Option<String>,

    /// Line number where the error occurred (1-based)
    pub line: Option<usize>,

    /// Column number where the error occurred (1-based, in characters)
    pub column: Option<usize>,

    /// Byte offset into the decoded document
    pub offset: Option<u64>,

    /// A helpful hint for resolving the error
    pub hint: Option<String>,
}

impl ErrorContext {
    /// Create a new empty error context
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an error context with just a hint
    pub fn with_hint(hint: impl Into<String>) -> Self {
        Self {
            hint: Some(hint.into()),
            ..Self::default()
        }
    }

    /// Set the part name
    pub fn file(mut self, file: impl Into<String>) -> Self {
        self.file = Some(file.into());
        self
    }

    /// Set the line number
    pub fn line(mut self, line: usize) -> Self {
        self.line = Some(line);
        self
    }

    /// Set the column number
    pub fn column(mut self, column: usize) -> Self {
        self.column = Some(column);
        self
    }

    /// Set the byte offset
    pub fn offset(mut self, offset: u64) -> Self {
        self.offset = Some(offset);
        self
    }

    /// Set the hint
    pub fn hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }
}

impl std::fmt::Display for ErrorContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut parts = Vec::new();

        if let Some(ref file) = self.file {
            parts.push(format!("File: {}", file));
        }

        if let (Some(line), Some(column)) = (self.line, self.column) {
            parts.push(format!("Location: line {}, column {}", line, column));
        } else if let Some(line) = self.line {
            parts.push(format!("Line: {}", line));
        } else if let Some(offset) = self.offset {
            parts.push(format!("Offset: byte {}", offset));
        }

        if let Some(ref hint) = self.hint {
            parts.push(format!("Hint: {}", hint));
        }

        if !parts.is_empty() {
            write!(f, "\n{}", parts.join("\n"))
        } else {
            Ok(())
        }
    }
}

/// Errors that can occur when converting 3MF packages
#[derive(Error, Debug)]
pub enum Error {
    /// IO error occurred while reading or writing a file
    ///
    /// **Error Code**: E1001
    ///
    /// **Common Causes**:
    /// - Source file not found
    /// - Insufficient permissions on the destination directory
    /// - Disk full while writing the temporary package
    #[error("[E1001] I/O error: {0}")]
    Io(#[from] io::Error),

    /// ZIP archive error
    ///
    /// **Error Code**: E1002
    ///
    /// **Common Causes**:
    /// - The source is not a ZIP container
    /// - Truncated or corrupted archive
    /// - Unsupported compression method
    #[error("[E1002] ZIP error: {0}")]
    Zip(#[from] zip::result::ZipError),

    /// Missing required part in the package
    ///
    /// **Error Code**: E1003
    ///
    /// **Common Causes**:
    /// - Archive was not produced by a 3MF writer
    /// - `[Content_Types].xml` or `_rels/.rels` was removed from the archive
    #[error("[E1003] Missing required part: {0}")]
    MissingPart(String),

    /// A package descriptor part could not be understood
    ///
    /// **Error Code**: E1004
    ///
    /// **Common Causes**:
    /// - `[Content_Types].xml` or a relationships part is not well-formed XML
    #[error("[E1004] Invalid package: {0}")]
    InvalidPackage(String),

    /// The finished package could not be moved onto the destination path
    ///
    /// **Error Code**: E1005
    ///
    /// The temporary file is removed and any existing destination file is
    /// left untouched.
    #[error("[E1005] Failed to replace destination '{path}': {source}")]
    Persist {
        /// Destination path
        path: String,
        /// Underlying I/O failure
        source: io::Error,
    },

    /// XML parsing error in a model part
    ///
    /// **Error Code**: E2001
    ///
    /// **Common Causes**:
    /// - Truncated model part
    /// - Unclosed or mismatched tags
    /// - Invalid characters in attribute values
    #[error("[E2001] XML parsing error: {message}{context}")]
    Parse {
        /// Description of the failure
        message: String,
        /// Part name and location
        context: ErrorContext,
    },

    /// The model part uses an encoding that cannot be decoded
    ///
    /// **Error Code**: E2002
    ///
    /// **Common Causes**:
    /// - Unknown `encoding` label in the XML declaration
    /// - Byte sequences that are invalid in the declared encoding
    #[error("[E2002] Encoding error: {message}{context}")]
    Encoding {
        /// Description of the failure
        message: String,
        /// Part name and location
        context: ErrorContext,
    },

    /// The model part lacks the minimum structure required by the format
    ///
    /// **Error Code**: E2003
    ///
    /// **Common Causes**:
    /// - Root element is not `model`
    /// - `resources` or `build` element missing
    #[error("[E2003] Invalid model structure: {message}{context}")]
    Structure {
        /// Description of the failure
        message: String,
        /// Part name and location
        context: ErrorContext,
    },

    /// XML writing error
    ///
    /// **Error Code**: E2005
    #[error("[E2005] XML writing error: {0}")]
    XmlWrite(String),

    /// Settings could not be serialized or written
    ///
    /// **Error Code**: E5001
    #[error("[E5001] Settings error: {0}")]
    Settings(String),
}

impl Error {
    /// Classify this error into the conversion error taxonomy
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Zip(_) | Error::MissingPart(_) | Error::InvalidPackage(_) => ErrorKind::Archive,
            Error::Parse { .. } | Error::Encoding { .. } => ErrorKind::Parse,
            Error::Structure { .. } => ErrorKind::Structure,
            Error::Io(_) | Error::Persist { .. } | Error::XmlWrite(_) | Error::Settings(_) => {
                ErrorKind::Io
            }
        }
    }

    /// Create a Parse error with location context
    pub fn parse(message: impl Into<String>, context: ErrorContext) -> Self {
        Error::Parse {
            message: message.into(),
            context,
        }
    }

    /// Create an Encoding error without location context
    pub fn encoding(message: impl Into<String>) -> Self {
        Error::Encoding {
            message: message.into(),
            context: ErrorContext::new(),
        }
    }

    /// Create a Structure error
    ///
    /// # Example
    /// ```ignore
    /// Error::structure("Document has no <build> element")
    /// ```
    pub fn structure(message: impl Into<String>) -> Self {
        Error::Structure {
            message: message.into(),
            context: ErrorContext::with_hint(
                "A model part needs a root <model> element with <resources> and <build> children",
            ),
        }
    }

    /// Create an XmlWrite error
    pub fn xml_write(message: String) -> Self {
        Error::XmlWrite(message)
    }

    /// Create an InvalidPackage error with context about which descriptor is invalid
    ///
    /// # Arguments
    /// * `part` - The descriptor part name (e.g. `_rels/.rels`)
    /// * `message` - Description of the error
    pub fn invalid_package(part: &str, message: &str) -> Self {
        Error::InvalidPackage(format!("{}: {}", part, message))
    }

    /// Attach the name of the package part being processed
    ///
    /// Only document-level errors carry a context; other variants are
    /// returned unchanged.
    pub fn in_part(mut self, part: &str) -> Self {
        if let Error::Parse { context, .. }
        | Error::Encoding { context, .. }
        | Error::Structure { context, .. } = &mut self
        {
            context.file = Some(part.to_string());
        }
        self
    }

    /// Context of a document-level error, if any
    pub fn context(&self) -> Option<&ErrorContext> {
        match self {
            Error::Parse { context, .. }
            | Error::Encoding { context, .. }
            | Error::Structure { context, .. } => Some(context),
            _ => None,
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Settings(err.to_string())
    }
}
