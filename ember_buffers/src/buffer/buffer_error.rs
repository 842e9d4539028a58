/// Buffer error taxonomy
///
/// A closed, flat set of failure kinds. Every fallible BufferManager
/// operation reports exactly one concrete kind; `None` is only the rest
/// state of a buffer's last error.

use std::fmt;
use bitflags::bitflags;
use crate::error::Error;

/// Result type for buffer operations
pub type BufferResult<T> = Result<T, BufferError>;

/// Kind of a buffer failure (bit values match the accumulated history flags)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(u16)]
pub enum BufferErrorKind {
    /// No error
    #[default]
    None = 0,
    /// The buffer object could not be constructed, or no longer exists
    Creation = 1 << 0,
    /// The object exists but memory could not be reserved or bound
    Allocation = 1 << 1,
    /// A transfer into or out of the buffer could not complete
    Copy = 1 << 2,
    /// The buffer kind is incompatible with the target slot
    Bind = 1 << 3,
    /// The buffer kind is unrecognized or unsuitable for the operation
    Type = 1 << 4,
}

impl BufferErrorKind {
    /// Every concrete failure kind
    pub const FAILURES: [BufferErrorKind; 5] = [
        BufferErrorKind::Creation,
        BufferErrorKind::Allocation,
        BufferErrorKind::Copy,
        BufferErrorKind::Bind,
        BufferErrorKind::Type,
    ];

    /// Raw bit value
    pub fn bits(&self) -> u16 {
        *self as u16
    }

    /// Whether this is the `None` rest state
    pub fn is_none(&self) -> bool {
        *self == BufferErrorKind::None
    }

    /// One-line human description, as shown in error reports
    pub fn description(&self) -> &'static str {
        match self {
            BufferErrorKind::None => "No buffer errors detected.",
            BufferErrorKind::Creation => "Failed to create buffer.",
            BufferErrorKind::Allocation => "Failed to allocate buffer memory.",
            BufferErrorKind::Copy => "Failed to copy buffer data.",
            BufferErrorKind::Bind => "Failed to bind buffer.",
            BufferErrorKind::Type => "Invalid buffer type for operation.",
        }
    }
}

bitflags! {
    /// Every failure kind a buffer has seen over its lifetime
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct BufferErrorFlags: u16 {
        const CREATION   = BufferErrorKind::Creation as u16;
        const ALLOCATION = BufferErrorKind::Allocation as u16;
        const COPY       = BufferErrorKind::Copy as u16;
        const BIND       = BufferErrorKind::Bind as u16;
        const TYPE       = BufferErrorKind::Type as u16;
    }
}

impl From<BufferErrorKind> for BufferErrorFlags {
    fn from(kind: BufferErrorKind) -> Self {
        BufferErrorFlags::from_bits_truncate(kind.bits())
    }
}

/// A failed buffer operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BufferError {
    kind: BufferErrorKind,
    message: String,
}

impl BufferError {
    /// Create a buffer error
    ///
    /// `kind` must be a concrete failure kind, never `None`.
    pub fn new(kind: BufferErrorKind, message: impl Into<String>) -> Self {
        debug_assert!(!kind.is_none(), "a buffer error needs a concrete kind");
        Self {
            kind,
            message: message.into(),
        }
    }

    /// Failure kind
    pub fn kind(&self) -> BufferErrorKind {
        self.kind
    }

    /// Detail message
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for BufferError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self.kind {
            BufferErrorKind::None => "Buffer error",
            BufferErrorKind::Creation => "Buffer creation error",
            BufferErrorKind::Allocation => "Buffer allocation error",
            BufferErrorKind::Copy => "Buffer copy error",
            BufferErrorKind::Bind => "Buffer bind error",
            BufferErrorKind::Type => "Buffer type error",
        };
        write!(f, "{}: {}", label, self.message)
    }
}

impl std::error::Error for BufferError {}

impl From<BufferError> for Error {
    fn from(error: BufferError) -> Self {
        Error::InvalidResource(error.to_string())
    }
}

#[cfg(test)]
#[path = "buffer_error_tests.rs"]
mod tests;
