/// DeviceBuffer trait and device buffer descriptor

use bitflags::bitflags;
use crate::error::Result;

bitflags! {
    /// Pipeline usages a device buffer is created for
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct BufferUsageFlags: u32 {
        /// Bindable as a vertex input
        const VERTEX       = 1 << 0;
        /// Bindable as an index input
        const INDEX        = 1 << 1;
        /// Bindable as a uniform (constant) buffer
        const UNIFORM      = 1 << 2;
        /// Bindable as a storage buffer
        const STORAGE      = 1 << 3;
        /// Source of a device-side copy
        const TRANSFER_SRC = 1 << 4;
        /// Destination of a device-side copy
        const TRANSFER_DST = 1 << 5;
    }
}

/// Where the backing memory of a buffer lives
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MemoryLocation {
    /// Device-local memory, not mappable by the host
    GpuOnly,
    /// Host-visible, coherent memory (persistently mapped)
    CpuToGpu,
}

impl MemoryLocation {
    /// Whether the host can map and write this memory directly
    pub fn is_host_visible(&self) -> bool {
        matches!(self, MemoryLocation::CpuToGpu)
    }
}

/// Descriptor for creating a device buffer object
#[derive(Debug, Clone)]
pub struct DeviceBufferDesc {
    /// Debug name (forwarded to the allocator)
    pub name: String,
    /// Size in bytes
    pub size: u64,
    /// Usage flags the object is created with
    pub usage: BufferUsageFlags,
    /// Memory location requested when the object gets backed
    pub location: MemoryLocation,
}

/// Byte range of a device-side copy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BufferCopyRegion {
    /// Offset into the source buffer in bytes
    pub src_offset: u64,
    /// Offset into the destination buffer in bytes
    pub dst_offset: u64,
    /// Number of bytes to copy
    pub size: u64,
}

impl BufferCopyRegion {
    /// Whether the region fits inside buffers of the given sizes
    pub fn fits(&self, src_size: u64, dst_size: u64) -> bool {
        let src_end = self.src_offset.checked_add(self.size);
        let dst_end = self.dst_offset.checked_add(self.size);
        matches!((src_end, dst_end), (Some(s), Some(d)) if s <= src_size && d <= dst_size)
    }
}

/// Device buffer resource trait
///
/// Implemented by backend-specific buffer types (e.g., the Vulkan buffer).
/// A device buffer starts unbacked; `GraphicsDevice::allocate_buffer_memory`
/// reserves and binds its memory. The object and its memory are released
/// when the device buffer is dropped.
pub trait DeviceBuffer: Send + Sync {
    /// Backend identifier of the object (stable for its whole lifetime)
    fn id(&self) -> u64;

    /// Size in bytes
    fn size(&self) -> u64;

    /// Memory location requested at creation
    fn location(&self) -> MemoryLocation;

    /// Whether memory has been reserved and bound
    fn is_allocated(&self) -> bool;

    /// Write bytes through the host mapping
    ///
    /// # Arguments
    ///
    /// * `offset` - Offset into the buffer in bytes
    /// * `data` - Data to write
    fn write(&mut self, offset: u64, data: &[u8]) -> Result<()>;

    /// Read bytes back through the host mapping
    fn read(&self, offset: u64, len: u64) -> Result<Vec<u8>>;
}
