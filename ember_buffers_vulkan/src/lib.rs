/*!
# Ember Buffers - Vulkan Backend

Vulkan implementation of the `GraphicsDevice` seam used by the buffer manager.

This crate creates a headless Vulkan device (no window, no swapchain) using
the Ash library for Vulkan bindings and gpu-allocator for memory management.
Device-local uploads are carried out as one-shot transfer submissions.

# Example

```no_run
use ember_buffers::ember::{Engine, device::Config, buffer::BufferType};
use ember_buffers_vulkan::VulkanGraphicsDevice;

# fn main() -> ember_buffers::ember::Result<()> {
Engine::initialize()?;
Engine::create_graphics_device(VulkanGraphicsDevice::new(Config::default())?)?;
Engine::create_buffer_manager()?;

let manager = Engine::buffer_manager()?;
let mut manager = manager.lock().unwrap();
let mesh = manager.create_buffer_with_data(BufferType::Vertex, "mesh", &[0u8; 64])?;
manager.destroy(mesh)?;
# drop(manager);
Engine::shutdown();
# Ok(())
# }
```
*/

mod vulkan_context;
mod vulkan_buffer;
mod vulkan_device;

#[cfg(feature = "vulkan-validation")]
mod vulkan_debug;

pub use vulkan_buffer::VulkanDeviceBuffer;
pub use vulkan_device::VulkanGraphicsDevice;

/// Backend types under the engine namespace
pub mod ember {
    pub use crate::vulkan_buffer::VulkanDeviceBuffer;
    pub use crate::vulkan_device::VulkanGraphicsDevice;
}
