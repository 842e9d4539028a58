/// A single GPU-backed buffer owned by the BufferManager.
///
/// Holds the device buffer exclusively; dropping the Buffer releases the
/// device object and its memory. Buffers are never cloned: other systems
/// refer to them through `BufferKey`.

use slotmap::new_key_type;
use crate::device::DeviceBuffer;
use crate::buffer::{BufferType, BufferErrorKind, BufferErrorFlags};

new_key_type! {
    /// Stable key for a Buffer within a BufferManager.
    ///
    /// Keys are cheap to copy and never resolve to a newer buffer once
    /// the original one has been destroyed.
    pub struct BufferKey;
}

/// GPU buffer with a fixed kind and capacity
pub struct Buffer {
    name: String,
    kind: BufferType,
    size: u64,
    handle: Box<dyn DeviceBuffer>,
    last_error: BufferErrorKind,
    error_history: BufferErrorFlags,
}

impl Buffer {
    pub(crate) fn new(name: String, kind: BufferType, handle: Box<dyn DeviceBuffer>) -> Self {
        Self {
            name,
            kind,
            size: handle.size(),
            handle,
            last_error: BufferErrorKind::None,
            error_history: BufferErrorFlags::empty(),
        }
    }

    /// Registry name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Kind chosen at creation
    pub fn kind(&self) -> BufferType {
        self.kind
    }

    /// Capacity in bytes
    pub fn size(&self) -> u64 {
        self.size
    }

    /// Failure kind of the most recent operation (`None` after a success)
    pub fn last_error(&self) -> BufferErrorKind {
        self.last_error
    }

    /// Every failure kind seen since creation
    pub fn error_history(&self) -> BufferErrorFlags {
        self.error_history
    }

    /// Whether any operation on this buffer has ever failed
    pub fn has_errors(&self) -> bool {
        !self.error_history.is_empty()
    }

    /// Human-readable error report, one line per failure kind seen
    pub fn error_report(&self) -> Vec<String> {
        if !self.has_errors() {
            return vec![format!("[{}] {}", self.name, BufferErrorKind::None.description())];
        }

        let mut lines = vec![format!("[{}] Buffer Errors:", self.name)];
        for kind in BufferErrorKind::FAILURES {
            if self.error_history.contains(BufferErrorFlags::from(kind)) {
                lines.push(format!("  - {}", kind.description()));
            }
        }
        lines
    }

    /// Device buffer backing this buffer (for backend command recording)
    pub fn device_buffer(&self) -> &dyn DeviceBuffer {
        self.handle.as_ref()
    }

    pub(crate) fn device_buffer_mut(&mut self) -> &mut dyn DeviceBuffer {
        self.handle.as_mut()
    }

    pub(crate) fn record_success(&mut self) {
        self.last_error = BufferErrorKind::None;
    }

    pub(crate) fn record_failure(&mut self, kind: BufferErrorKind) {
        self.last_error = kind;
        self.error_history |= BufferErrorFlags::from(kind);
    }
}

impl std::fmt::Debug for Buffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Buffer")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("size", &self.size)
            .field("device_id", &self.handle.id())
            .field("last_error", &self.last_error)
            .finish()
    }
}
