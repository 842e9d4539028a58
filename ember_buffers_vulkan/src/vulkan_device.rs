/// VulkanGraphicsDevice - headless Vulkan implementation of GraphicsDevice trait

use ember_buffers::ember::{GraphicsDevice, Result, Error};
use ember_buffers::ember::device::{
    BufferCopyRegion, BufferUsageFlags, Config, DeviceBuffer, DeviceBufferDesc, DeviceStats,
    MemoryLocation,
};
use ember_buffers::{engine_debug, engine_info, engine_warn, engine_error, engine_bail, engine_err};
use ash::vk;
use gpu_allocator::vulkan::{Allocation, AllocationCreateDesc, AllocationScheme, Allocator, AllocatorCreateDesc};
use std::ffi::CString;
use std::mem::ManuallyDrop;
use std::sync::Arc;
use std::sync::atomic::Ordering;

use crate::vulkan_buffer::VulkanDeviceBuffer;
use crate::vulkan_context::GpuContext;

/// Vulkan device implementation
///
/// Owns the instance, the logical device and the allocator. No surface or
/// swapchain is created: buffers and transfers only need a queue.
pub struct VulkanGraphicsDevice {
    /// Vulkan entry (must outlive the instance)
    _entry: ash::Entry,
    /// Vulkan instance
    instance: ash::Instance,
    /// Physical device the logical device was created on
    physical_device: vk::PhysicalDevice,
    /// Validation messenger (only with the `vulkan-validation` feature)
    #[cfg(feature = "vulkan-validation")]
    debug_messenger: Option<crate::vulkan_debug::DebugMessenger>,
    /// Device-side copies submitted since creation
    copies_submitted: u64,
    /// Shared GPU context for all buffers
    gpu_context: Arc<GpuContext>,
}

impl VulkanGraphicsDevice {
    /// Create a new headless Vulkan device
    ///
    /// Picks the first physical device exposing a graphics queue.
    ///
    /// # Errors
    ///
    /// Returns `Error::InitializationFailed` if the Vulkan library, instance,
    /// device, allocator or command pool cannot be created.
    pub fn new(config: Config) -> Result<Self> {
        unsafe {
            // Create Vulkan Entry
            let entry = ash::Entry::load()
                .map_err(|e| {
                    engine_error!("ember::vulkan", "Failed to load Vulkan library: {:?}", e);
                    Error::InitializationFailed(format!("Failed to load Vulkan library: {:?}", e))
                })?;

            // Application Info
            let app_name = CString::new(config.app_name.clone())
                .map_err(|_| Error::InitializationFailed("Application name contains a NUL byte".to_string()))?;
            let (major, minor, patch) = config.app_version;
            let app_info = vk::ApplicationInfo::default()
                .application_name(&app_name)
                .application_version(vk::make_api_version(0, major, minor, patch))
                .engine_name(c"Ember")
                .engine_version(vk::make_api_version(0, 0, 1, 0))
                .api_version(vk::API_VERSION_1_3);

            let validation = Self::validation_enabled(&config);

            // Validation layer and debug utils extension
            #[allow(unused_mut)]
            let mut extension_names: Vec<*const std::os::raw::c_char> = Vec::new();
            #[allow(unused_mut)]
            let mut layer_names: Vec<*const std::os::raw::c_char> = Vec::new();
            #[cfg(feature = "vulkan-validation")]
            if validation {
                extension_names.push(ash::ext::debug_utils::NAME.as_ptr());
                layer_names.push(crate::vulkan_debug::VALIDATION_LAYER.as_ptr());
            }

            let create_info = vk::InstanceCreateInfo::default()
                .application_info(&app_info)
                .enabled_layer_names(&layer_names)
                .enabled_extension_names(&extension_names);

            let instance = entry
                .create_instance(&create_info, None)
                .map_err(|e| {
                    engine_error!("ember::vulkan", "Failed to create Vulkan instance: {:?}", e);
                    Error::InitializationFailed(format!("Failed to create instance: {:?}", e))
                })?;

            #[cfg(feature = "vulkan-validation")]
            let debug_messenger = if validation {
                Some(crate::vulkan_debug::DebugMessenger::new(&entry, &instance, config.debug_severity)?)
            } else {
                None
            };

            // Pick Physical Device with a graphics queue
            let physical_devices = instance
                .enumerate_physical_devices()
                .map_err(|e| {
                    engine_error!("ember::vulkan", "Failed to enumerate physical devices: {:?}", e);
                    Error::InitializationFailed(format!("Failed to enumerate physical devices: {:?}", e))
                })?;

            let (physical_device, graphics_family_index) = physical_devices
                .into_iter()
                .find_map(|physical_device| {
                    instance
                        .get_physical_device_queue_family_properties(physical_device)
                        .iter()
                        .position(|qf| qf.queue_flags.contains(vk::QueueFlags::GRAPHICS))
                        .map(|index| (physical_device, index as u32))
                })
                .ok_or_else(|| {
                    engine_error!("ember::vulkan", "No Vulkan-capable GPU with a graphics queue found");
                    Error::InitializationFailed("No Vulkan-capable GPU with a graphics queue found".to_string())
                })?;

            // Create Logical Device
            let queue_priorities = [1.0];
            let queue_create_infos = [
                vk::DeviceQueueCreateInfo::default()
                    .queue_family_index(graphics_family_index)
                    .queue_priorities(&queue_priorities),
            ];

            let device_create_info = vk::DeviceCreateInfo::default()
                .queue_create_infos(&queue_create_infos);

            let device = instance
                .create_device(physical_device, &device_create_info, None)
                .map_err(|e| {
                    engine_error!("ember::vulkan", "Failed to create logical device: {:?}", e);
                    Error::InitializationFailed(format!("Failed to create device: {:?}", e))
                })?;

            let graphics_queue = device.get_device_queue(graphics_family_index, 0);

            // Create GPU allocator
            let allocator = Allocator::new(&AllocatorCreateDesc {
                instance: instance.clone(),
                device: device.clone(),
                physical_device,
                debug_settings: Default::default(),
                buffer_device_address: false,
                allocation_sizes: Default::default(),
            })
            .map_err(|e| {
                engine_error!("ember::vulkan", "Failed to create GPU allocator: {:?}", e);
                Error::InitializationFailed(format!("Failed to create allocator: {:?}", e))
            })?;

            // Create upload command pool (TRANSIENT + RESET for reusable one-shot transfers)
            let upload_pool_create_info = vk::CommandPoolCreateInfo::default()
                .queue_family_index(graphics_family_index)
                .flags(vk::CommandPoolCreateFlags::TRANSIENT | vk::CommandPoolCreateFlags::RESET_COMMAND_BUFFER);

            let upload_command_pool = device.create_command_pool(&upload_pool_create_info, None)
                .map_err(|e| {
                    engine_error!("ember::vulkan", "Failed to create upload command pool: {:?}", e);
                    Error::InitializationFailed(format!("Failed to create upload command pool: {:?}", e))
                })?;

            let gpu_context = Arc::new(GpuContext::new(
                device,
                allocator,
                graphics_queue,
                upload_command_pool,
            ));

            let graphics_device = Self {
                _entry: entry,
                instance,
                physical_device,
                #[cfg(feature = "vulkan-validation")]
                debug_messenger,
                copies_submitted: 0,
                gpu_context,
            };

            engine_info!("ember::vulkan", "Vulkan device created on '{}' (queue family {}, validation {})",
                graphics_device.device_name(), graphics_family_index, validation);

            Ok(graphics_device)
        }
    }

    /// Whether validation layers will be enabled for `config`
    fn validation_enabled(config: &Config) -> bool {
        if config.enable_validation && !cfg!(feature = "vulkan-validation") {
            engine_warn!("ember::vulkan",
                "Validation requested but the vulkan-validation feature is disabled");
            return false;
        }
        config.enable_validation
    }

    /// Physical device properties (name, limits, ...)
    pub fn physical_device_properties(&self) -> vk::PhysicalDeviceProperties {
        unsafe { self.instance.get_physical_device_properties(self.physical_device) }
    }

    /// Name of the GPU the device was created on
    pub fn device_name(&self) -> String {
        self.physical_device_properties()
            .device_name_as_c_str()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    /// Record and submit a one-time buffer copy, then wait for the queue
    fn submit_copy(&self, src: vk::Buffer, dst: vk::Buffer, region: BufferCopyRegion) -> Result<()> {
        let ctx = &self.gpu_context;
        let pool = ctx.upload_command_pool.lock()
            .map_err(|_| engine_err!("ember::vulkan", "Upload command pool lock poisoned"))?;

        unsafe {
            let command_buffer_allocate_info = vk::CommandBufferAllocateInfo::default()
                .command_pool(*pool)
                .level(vk::CommandBufferLevel::PRIMARY)
                .command_buffer_count(1);

            let command_buffers = ctx.device.allocate_command_buffers(&command_buffer_allocate_info)
                .map_err(|e| engine_err!("ember::vulkan", "Failed to allocate copy command buffer: {:?}", e))?;
            let command_buffer = command_buffers[0];

            let result = self.record_and_submit_copy(command_buffer, src, dst, region);

            ctx.device.free_command_buffers(*pool, &command_buffers);
            result
        }
    }

    unsafe fn record_and_submit_copy(
        &self,
        command_buffer: vk::CommandBuffer,
        src: vk::Buffer,
        dst: vk::Buffer,
        region: BufferCopyRegion,
    ) -> Result<()> {
        let ctx = &self.gpu_context;

        let begin_info = vk::CommandBufferBeginInfo::default()
            .flags(vk::CommandBufferUsageFlags::ONE_TIME_SUBMIT);

        ctx.device.begin_command_buffer(command_buffer, &begin_info)
            .map_err(|e| engine_err!("ember::vulkan", "Failed to begin copy command buffer: {:?}", e))?;

        let copy_region = vk::BufferCopy {
            src_offset: region.src_offset,
            dst_offset: region.dst_offset,
            size: region.size,
        };
        ctx.device.cmd_copy_buffer(command_buffer, src, dst, &[copy_region]);

        ctx.device.end_command_buffer(command_buffer)
            .map_err(|e| engine_err!("ember::vulkan", "Failed to end copy command buffer: {:?}", e))?;

        let command_buffers_submit = [command_buffer];
        let submit_info = vk::SubmitInfo::default()
            .command_buffers(&command_buffers_submit);

        ctx.device.queue_submit(ctx.graphics_queue, &[submit_info], vk::Fence::null())
            .map_err(|e| engine_err!("ember::vulkan", "Failed to submit buffer copy: {:?}", e))?;

        ctx.device.queue_wait_idle(ctx.graphics_queue)
            .map_err(|e| engine_err!("ember::vulkan", "Failed to wait for buffer copy: {:?}", e))?;

        Ok(())
    }
}

// ===== CONVERSIONS =====

/// Convert engine usage flags to Vulkan buffer usage flags
pub(crate) fn usage_to_vk(usage: BufferUsageFlags) -> vk::BufferUsageFlags {
    let mut flags = vk::BufferUsageFlags::empty();
    if usage.contains(BufferUsageFlags::VERTEX) {
        flags |= vk::BufferUsageFlags::VERTEX_BUFFER;
    }
    if usage.contains(BufferUsageFlags::INDEX) {
        flags |= vk::BufferUsageFlags::INDEX_BUFFER;
    }
    if usage.contains(BufferUsageFlags::UNIFORM) {
        flags |= vk::BufferUsageFlags::UNIFORM_BUFFER;
    }
    if usage.contains(BufferUsageFlags::STORAGE) {
        flags |= vk::BufferUsageFlags::STORAGE_BUFFER;
    }
    if usage.contains(BufferUsageFlags::TRANSFER_SRC) {
        flags |= vk::BufferUsageFlags::TRANSFER_SRC;
    }
    if usage.contains(BufferUsageFlags::TRANSFER_DST) {
        flags |= vk::BufferUsageFlags::TRANSFER_DST;
    }
    flags
}

/// Convert engine memory location to gpu-allocator memory location
pub(crate) fn location_to_gpu_allocator(location: MemoryLocation) -> gpu_allocator::MemoryLocation {
    match location {
        MemoryLocation::GpuOnly => gpu_allocator::MemoryLocation::GpuOnly,
        MemoryLocation::CpuToGpu => gpu_allocator::MemoryLocation::CpuToGpu,
    }
}

/// Downcast a device buffer created by this backend
///
/// Every buffer handed to a VulkanGraphicsDevice was created by it.
fn as_vulkan(buffer: &dyn DeviceBuffer) -> &VulkanDeviceBuffer {
    unsafe { &*(buffer as *const dyn DeviceBuffer as *const VulkanDeviceBuffer) }
}

fn as_vulkan_mut(buffer: &mut dyn DeviceBuffer) -> &mut VulkanDeviceBuffer {
    unsafe { &mut *(buffer as *mut dyn DeviceBuffer as *mut VulkanDeviceBuffer) }
}

// ===== GRAPHICS DEVICE =====

impl GraphicsDevice for VulkanGraphicsDevice {
    fn create_buffer(&mut self, desc: &DeviceBufferDesc) -> Result<Box<dyn DeviceBuffer>> {
        if desc.size == 0 {
            engine_bail!("ember::vulkan", "Buffer '{}' requested with zero size", desc.name);
        }

        let buffer_create_info = vk::BufferCreateInfo::default()
            .size(desc.size)
            .usage(usage_to_vk(desc.usage))
            .sharing_mode(vk::SharingMode::EXCLUSIVE);

        let buffer = unsafe { self.gpu_context.device.create_buffer(&buffer_create_info, None) }
            .map_err(|e| engine_err!("ember::vulkan",
                "Failed to create buffer '{}' of size {} bytes: {:?}", desc.name, desc.size, e))?;

        engine_debug!("ember::vulkan", "Created buffer '{}' ({} bytes)", desc.name, desc.size);

        Ok(Box::new(VulkanDeviceBuffer::new(
            Arc::clone(&self.gpu_context),
            desc.name.clone(),
            buffer,
            desc.size,
            desc.location,
        )))
    }

    fn allocate_buffer_memory(&mut self, buffer: &mut dyn DeviceBuffer) -> Result<()> {
        let buffer = as_vulkan_mut(buffer);
        if buffer.allocation.is_some() {
            engine_bail!("ember::vulkan", "Buffer '{}' already has memory bound", buffer.name);
        }

        let ctx = &self.gpu_context;
        let requirements = unsafe { ctx.device.get_buffer_memory_requirements(buffer.buffer) };

        let allocation: Allocation = {
            let mut allocator = ctx.allocator.lock()
                .map_err(|_| engine_err!("ember::vulkan", "Allocator lock poisoned"))?;
            allocator.allocate(&AllocationCreateDesc {
                name: &buffer.name,
                requirements,
                location: location_to_gpu_allocator(buffer.location),
                linear: true,
                allocation_scheme: AllocationScheme::GpuAllocatorManaged,
            })
            .map_err(|_e| {
                let size_mb = requirements.size as f64 / (1024.0 * 1024.0);
                engine_error!("ember::vulkan", "Out of GPU memory for buffer '{}' (required: {:.2} MB)",
                    buffer.name, size_mb);
                Error::OutOfMemory
            })?
        };

        let bound = unsafe {
            ctx.device.bind_buffer_memory(buffer.buffer, allocation.memory(), allocation.offset())
        };
        if let Err(e) = bound {
            if let Ok(mut allocator) = ctx.allocator.lock() {
                allocator.free(allocation).ok();
            }
            engine_bail!("ember::vulkan", "Failed to bind memory of buffer '{}': {:?}", buffer.name, e);
        }

        ctx.allocated_bytes.fetch_add(buffer.size, Ordering::Relaxed);
        buffer.allocation = Some(allocation);
        Ok(())
    }

    fn copy_buffer(
        &mut self,
        src: &dyn DeviceBuffer,
        dst: &dyn DeviceBuffer,
        region: BufferCopyRegion,
    ) -> Result<()> {
        let src = as_vulkan(src);
        let dst = as_vulkan(dst);

        if !region.fits(src.size, dst.size) {
            engine_bail!("ember::vulkan", "Copy region {:?} out of range ('{}' {} bytes -> '{}' {} bytes)",
                region, src.name, src.size, dst.name, dst.size);
        }
        if src.allocation.is_none() || dst.allocation.is_none() {
            engine_bail!("ember::vulkan", "Copy from '{}' to '{}' needs memory bound on both buffers",
                src.name, dst.name);
        }

        self.submit_copy(src.buffer, dst.buffer, region)?;
        self.copies_submitted += 1;
        Ok(())
    }

    fn wait_idle(&self) -> Result<()> {
        unsafe {
            self.gpu_context.device.device_wait_idle()
                .map_err(|e| engine_err!("ember::vulkan", "Failed to wait for device idle: {:?}", e))
        }
    }

    fn stats(&self) -> DeviceStats {
        DeviceStats {
            live_buffers: self.gpu_context.live_buffers.load(Ordering::Relaxed),
            allocated_bytes: self.gpu_context.allocated_bytes.load(Ordering::Relaxed),
            copies_submitted: self.copies_submitted,
        }
    }
}

impl Drop for VulkanGraphicsDevice {
    fn drop(&mut self) {
        unsafe {
            // Wait for device to finish
            self.gpu_context.device.device_wait_idle().ok();

            // Buffers keep the context alive; tearing down under them would free live handles
            let Some(ctx) = Arc::get_mut(&mut self.gpu_context) else {
                engine_warn!("ember::vulkan",
                    "Vulkan device dropped while buffers are alive, leaking device and instance");
                return;
            };

            // 1. Destroy upload command pool
            if let Ok(pool) = ctx.upload_command_pool.get_mut() {
                if *pool != vk::CommandPool::null() {
                    ctx.device.destroy_command_pool(*pool, None);
                    *pool = vk::CommandPool::null();
                }
            }

            // 2. Drop allocator: free VkDeviceMemory pages BEFORE destroying device
            ManuallyDrop::drop(&mut ctx.allocator);

            // 3. Destroy debug messenger BEFORE device and instance
            #[cfg(feature = "vulkan-validation")]
            if let Some(messenger) = self.debug_messenger.take() {
                messenger.destroy();
            }

            // 4. Destroy device and instance
            ctx.device.destroy_device(None);
            self.instance.destroy_instance(None);
        }
    }
}

#[cfg(test)]
#[path = "vulkan_device_tests.rs"]
mod tests;
