/// Device module - the graphics backend seam used by the buffer manager

// Module declarations
pub mod graphics_device;
pub mod device_buffer;

// Re-export everything from graphics_device.rs
pub use graphics_device::*;

// Re-export from other modules
pub use device_buffer::*;

// Mock graphics device for tests (no GPU required)
#[cfg(test)]
pub mod mock_graphics_device;
