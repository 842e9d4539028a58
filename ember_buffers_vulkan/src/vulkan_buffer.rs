/// Buffer - Vulkan implementation of DeviceBuffer trait

use ember_buffers::ember::{Result, Error};
use ember_buffers::ember::device::{DeviceBuffer, MemoryLocation};
use ember_buffers::engine_warn;
use ash::vk;
use ash::vk::Handle;
use gpu_allocator::vulkan::Allocation;
use std::sync::Arc;
use std::sync::atomic::Ordering;

use crate::vulkan_context::GpuContext;

/// Vulkan buffer implementation
///
/// Created unbacked by `VulkanGraphicsDevice::create_buffer`; memory is
/// attached by `allocate_buffer_memory`. Dropping it frees the allocation
/// and then destroys the buffer handle.
pub struct VulkanDeviceBuffer {
    /// Shared GPU context (device, allocator, counters)
    ctx: Arc<GpuContext>,
    /// Debug name forwarded to the allocator
    pub(crate) name: String,
    /// Vulkan buffer
    pub(crate) buffer: vk::Buffer,
    /// GPU memory allocation (None until memory is bound)
    pub(crate) allocation: Option<Allocation>,
    /// Buffer size
    pub(crate) size: u64,
    /// Requested memory location
    pub(crate) location: MemoryLocation,
}

impl VulkanDeviceBuffer {
    pub(crate) fn new(
        ctx: Arc<GpuContext>,
        name: String,
        buffer: vk::Buffer,
        size: u64,
        location: MemoryLocation,
    ) -> Self {
        ctx.live_buffers.fetch_add(1, Ordering::Relaxed);
        Self {
            ctx,
            name,
            buffer,
            allocation: None,
            size,
            location,
        }
    }

    fn check_range(&self, offset: u64, len: u64) -> Result<std::ops::Range<usize>> {
        match offset.checked_add(len) {
            Some(end) if end <= self.size => Ok(offset as usize..end as usize),
            _ => Err(Error::BackendError(format!(
                "Range {}+{} exceeds buffer '{}' of {} bytes", offset, len, self.name, self.size
            ))),
        }
    }

    fn not_mappable(&self) -> Error {
        Error::BackendError(format!("Buffer '{}' is not CPU-accessible", self.name))
    }
}

impl DeviceBuffer for VulkanDeviceBuffer {
    fn id(&self) -> u64 {
        self.buffer.as_raw()
    }

    fn size(&self) -> u64 {
        self.size
    }

    fn location(&self) -> MemoryLocation {
        self.location
    }

    fn is_allocated(&self) -> bool {
        self.allocation.is_some()
    }

    fn write(&mut self, offset: u64, data: &[u8]) -> Result<()> {
        let range = self.check_range(offset, data.len() as u64)?;
        let error = self.not_mappable();
        let mapped = self.allocation.as_mut()
            .and_then(|allocation| allocation.mapped_slice_mut())
            .ok_or(error)?;
        mapped[range].copy_from_slice(data);
        Ok(())
    }

    fn read(&self, offset: u64, len: u64) -> Result<Vec<u8>> {
        let range = self.check_range(offset, len)?;
        let mapped = self.allocation.as_ref()
            .and_then(|allocation| allocation.mapped_slice())
            .ok_or_else(|| self.not_mappable())?;
        Ok(mapped[range].to_vec())
    }
}

impl Drop for VulkanDeviceBuffer {
    fn drop(&mut self) {
        unsafe {
            // Free GPU memory
            if let Some(allocation) = self.allocation.take() {
                self.ctx.allocated_bytes.fetch_sub(self.size, Ordering::Relaxed);
                // Don't panic if lock fails - we still need to destroy the buffer
                match self.ctx.allocator.lock() {
                    Ok(mut allocator) => {
                        if allocator.free(allocation).is_err() {
                            engine_warn!("ember::vulkan", "Failed to free allocation of buffer '{}'", self.name);
                        }
                    }
                    Err(_) => {
                        engine_warn!("ember::vulkan", "Allocator lock poisoned, leaking memory of buffer '{}'", self.name);
                    }
                }
            }

            // Destroy buffer
            self.ctx.device.destroy_buffer(self.buffer, None);
            self.ctx.live_buffers.fetch_sub(1, Ordering::Relaxed);
        }
    }
}
