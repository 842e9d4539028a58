/// GraphicsDevice trait - the device/resource-allocation collaborator

use crate::error::Result;
use crate::device::{DeviceBuffer, DeviceBufferDesc, BufferCopyRegion};

// ============================================================================
// Configuration
// ============================================================================

/// Severity filter for validation layer messages
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DebugSeverity {
    /// Only errors
    ErrorsOnly,
    /// Errors and warnings
    ErrorsAndWarnings,
    /// Everything including info and verbose
    All,
}

/// Graphics device configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Enable validation/debug layers
    pub enable_validation: bool,
    /// Application name
    pub app_name: String,
    /// Application version (major, minor, patch)
    pub app_version: (u32, u32, u32),
    /// Which validation messages reach the engine logger
    pub debug_severity: DebugSeverity,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            enable_validation: cfg!(debug_assertions),
            app_name: "Ember Application".to_string(),
            app_version: (1, 0, 0),
            debug_severity: DebugSeverity::ErrorsAndWarnings,
        }
    }
}

/// Graphics device statistics
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeviceStats {
    /// Buffer objects currently alive
    pub live_buffers: u32,
    /// Bytes of buffer memory currently reserved
    pub allocated_bytes: u64,
    /// Device-side copies submitted since creation
    pub copies_submitted: u64,
}

// ============================================================================
// GraphicsDevice trait
// ============================================================================

/// Main graphics device trait
///
/// Factory interface for GPU buffer objects and their memory.
/// Implemented by backend-specific devices (e.g., VulkanGraphicsDevice).
pub trait GraphicsDevice: Send + Sync {
    /// Construct a buffer object without backing memory
    ///
    /// Fails if the device rejects the descriptor.
    fn create_buffer(&mut self, desc: &DeviceBufferDesc) -> Result<Box<dyn DeviceBuffer>>;

    /// Reserve memory for a buffer object and bind it
    ///
    /// Fails if memory cannot be reserved or bound; the object stays unbacked.
    fn allocate_buffer_memory(&mut self, buffer: &mut dyn DeviceBuffer) -> Result<()>;

    /// Copy a byte range from `src` into `dst` on the device
    ///
    /// Blocks until the transfer has completed on the device.
    fn copy_buffer(
        &mut self,
        src: &dyn DeviceBuffer,
        dst: &dyn DeviceBuffer,
        region: BufferCopyRegion,
    ) -> Result<()>;

    /// Wait for all GPU operations to complete
    fn wait_idle(&self) -> Result<()>;

    /// Get statistics about the device
    fn stats(&self) -> DeviceStats;
}
