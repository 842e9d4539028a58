/*!
# Ember Buffers

Core types for GPU buffer management in the Ember engine.

This crate provides the platform-agnostic API for creating, uploading, binding
and destroying GPU buffers. Backend implementations (Vulkan) plug in through
the `GraphicsDevice` trait.

## Architecture

- **BufferManager**: Owns every buffer, hands out `BufferKey`s and reports
  failures through the `BufferErrorKind` taxonomy
- **BufferType**: Buffer kinds and their usage / memory lookup table
- **GraphicsDevice**: Factory trait for device buffer objects and their memory
- **DeviceBuffer**: Backend buffer resource trait
- **Engine**: Global singletons (graphics device, buffer manager, logger)
*/

// Internal modules
mod error;
mod engine;
pub mod log;
pub mod device;
pub mod buffer;

// Main ember namespace module
pub mod ember {
    // Error types
    pub use crate::error::{Error, Result};

    // Engine singleton
    pub use crate::engine::Engine;

    // Graphics device factory trait
    pub use crate::device::GraphicsDevice;

    // Logging sub-module (types only, macros live at the crate root)
    pub mod log {
        pub use crate::log::{Logger, LogEntry, LogSeverity, DefaultLogger};
    }

    // Device sub-module with the backend-facing types
    pub mod device {
        pub use crate::device::*;
    }

    // Buffer sub-module
    pub mod buffer {
        pub use crate::buffer::*;
    }
}
