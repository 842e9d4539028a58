/// GpuContext - Shared GPU resources for all Vulkan buffers
///
/// Contains everything a buffer needs after creation:
/// - Device for Vulkan API calls
/// - Allocator for memory management
/// - Live object counters for device statistics

use ash::vk;
use gpu_allocator::vulkan::Allocator;
use std::mem::ManuallyDrop;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU32, AtomicU64};

/// Shared GPU context for all Vulkan buffers.
///
/// Shared (via `Arc`) by every buffer so each one can free its own
/// allocation and destroy its own handle on drop.
///
/// Device and instance destruction is handled by VulkanGraphicsDevice::drop(),
/// once it holds the only reference to this context.
pub struct GpuContext {
    /// Vulkan logical device
    pub device: ash::Device,

    /// GPU memory allocator
    /// Wrapped in ManuallyDrop so it is dropped BEFORE the device is destroyed
    pub allocator: ManuallyDrop<Mutex<Allocator>>,

    /// Queue used for transfer submissions
    pub graphics_queue: vk::Queue,

    /// Reusable command pool for one-shot transfer operations
    /// (created with TRANSIENT + RESET_COMMAND_BUFFER flags)
    pub upload_command_pool: Mutex<vk::CommandPool>,

    /// Buffer objects currently alive
    pub live_buffers: AtomicU32,

    /// Bytes of buffer memory currently allocated
    pub allocated_bytes: AtomicU64,
}

impl GpuContext {
    pub fn new(
        device: ash::Device,
        allocator: Allocator,
        graphics_queue: vk::Queue,
        upload_command_pool: vk::CommandPool,
    ) -> Self {
        Self {
            device,
            allocator: ManuallyDrop::new(Mutex::new(allocator)),
            graphics_queue,
            upload_command_pool: Mutex::new(upload_command_pool),
            live_buffers: AtomicU32::new(0),
            allocated_bytes: AtomicU64::new(0),
        }
    }
}
