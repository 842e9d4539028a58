/// Mock GraphicsDevice for unit tests (no GPU required)
///
/// Keeps buffer contents in host memory and tracks every creation, allocation
/// and release in a shared state that tests can inspect after the device has
/// been handed to a BufferManager. Failure injection through MockDeviceConfig
/// drives each device error path.

use std::sync::{Arc, Mutex};
use rustc_hash::FxHashMap;

use crate::device::{
    GraphicsDevice, DeviceBuffer, DeviceBufferDesc, DeviceStats, MemoryLocation,
    BufferCopyRegion,
};
use crate::error::{Error, Result};

// ============================================================================
// Mock configuration and shared state
// ============================================================================

/// Limits and failure switches of the mock device
#[derive(Debug, Clone)]
pub struct MockDeviceConfig {
    /// Largest buffer object the device accepts
    pub max_buffer_size: u64,
    /// Total memory the device can reserve
    pub memory_budget: u64,
    /// Host writes through the mapping fail
    pub fail_writes: bool,
    /// Device-side copies fail
    pub fail_copies: bool,
}

impl Default for MockDeviceConfig {
    fn default() -> Self {
        Self {
            max_buffer_size: 256 * 1024 * 1024,
            memory_budget: 1024 * 1024 * 1024,
            fail_writes: false,
            fail_copies: false,
        }
    }
}

/// State shared between the mock device and the buffers it created
#[derive(Debug, Default)]
pub struct MockDeviceState {
    pub config: MockDeviceConfig,
    pub live_buffers: u32,
    pub allocated_bytes: u64,
    pub copies_submitted: u64,
    /// Calls to `wait_idle`
    pub idle_waits: u64,
    /// Ids of released buffer objects, in release order
    pub released_ids: Vec<u64>,
    /// Debug name -> id of the most recent object created with that name
    pub names: FxHashMap<String, u64>,
    next_id: u64,
    contents: FxHashMap<u64, Vec<u8>>,
}

impl MockDeviceState {
    /// Contents of the most recent live object created under `name`
    pub fn contents_of(&self, name: &str) -> Option<Vec<u8>> {
        self.names.get(name).and_then(|id| self.contents.get(id)).cloned()
    }

    /// How many times the object `id` has been released
    pub fn release_count(&self, id: u64) -> usize {
        self.released_ids.iter().filter(|&&released| released == id).count()
    }
}

// ============================================================================
// Mock DeviceBuffer
// ============================================================================

#[derive(Debug)]
pub struct MockDeviceBuffer {
    id: u64,
    size: u64,
    location: MemoryLocation,
    allocated: bool,
    state: Arc<Mutex<MockDeviceState>>,
}

impl MockDeviceBuffer {
    fn check_mapping(&self, offset: u64, len: u64) -> Result<()> {
        if !self.allocated {
            return Err(Error::BackendError(format!("Buffer {} has no memory bound", self.id)));
        }
        if !self.location.is_host_visible() {
            return Err(Error::BackendError(format!("Buffer {} is not host-visible", self.id)));
        }
        if offset.checked_add(len).map_or(true, |end| end > self.size) {
            return Err(Error::BackendError(format!(
                "Range {}+{} exceeds buffer {} of {} bytes", offset, len, self.id, self.size
            )));
        }
        Ok(())
    }
}

impl DeviceBuffer for MockDeviceBuffer {
    fn id(&self) -> u64 {
        self.id
    }

    fn size(&self) -> u64 {
        self.size
    }

    fn location(&self) -> MemoryLocation {
        self.location
    }

    fn is_allocated(&self) -> bool {
        self.allocated
    }

    fn write(&mut self, offset: u64, data: &[u8]) -> Result<()> {
        self.check_mapping(offset, data.len() as u64)?;
        let mut state = self.state.lock().unwrap();
        if state.config.fail_writes {
            return Err(Error::BackendError("Failed to map buffer memory".to_string()));
        }
        let memory = state.contents.get_mut(&self.id)
            .ok_or_else(|| Error::BackendError(format!("Buffer {} has no contents", self.id)))?;
        let start = offset as usize;
        memory[start..start + data.len()].copy_from_slice(data);
        Ok(())
    }

    fn read(&self, offset: u64, len: u64) -> Result<Vec<u8>> {
        self.check_mapping(offset, len)?;
        let state = self.state.lock().unwrap();
        let memory = state.contents.get(&self.id)
            .ok_or_else(|| Error::BackendError(format!("Buffer {} has no contents", self.id)))?;
        let start = offset as usize;
        Ok(memory[start..start + len as usize].to_vec())
    }
}

impl Drop for MockDeviceBuffer {
    fn drop(&mut self) {
        if let Ok(mut state) = self.state.lock() {
            state.live_buffers -= 1;
            if self.allocated {
                state.allocated_bytes -= self.size;
            }
            state.contents.remove(&self.id);
            state.released_ids.push(self.id);
        }
    }
}

// ============================================================================
// Mock GraphicsDevice
// ============================================================================

/// Mock GraphicsDevice that keeps buffer memory on the host
#[derive(Debug)]
pub struct MockGraphicsDevice {
    state: Arc<Mutex<MockDeviceState>>,
}

impl MockGraphicsDevice {
    /// Create a mock device with default limits
    pub fn new() -> Self {
        Self::with_config(MockDeviceConfig::default())
    }

    /// Create a mock device with custom limits and failure switches
    pub fn with_config(config: MockDeviceConfig) -> Self {
        Self {
            state: Arc::new(Mutex::new(MockDeviceState {
                config,
                ..Default::default()
            })),
        }
    }

    /// Shared state handle (keep it before boxing the device)
    pub fn state(&self) -> Arc<Mutex<MockDeviceState>> {
        Arc::clone(&self.state)
    }
}

impl GraphicsDevice for MockGraphicsDevice {
    fn create_buffer(&mut self, desc: &DeviceBufferDesc) -> Result<Box<dyn DeviceBuffer>> {
        let mut state = self.state.lock().unwrap();
        if desc.size == 0 {
            return Err(Error::InvalidResource("Buffer size must be non-zero".to_string()));
        }
        if desc.usage.is_empty() {
            return Err(Error::InvalidResource("Buffer usage must not be empty".to_string()));
        }
        if desc.size > state.config.max_buffer_size {
            return Err(Error::BackendError(format!(
                "Buffer size {} exceeds device limit {}", desc.size, state.config.max_buffer_size
            )));
        }

        let id = state.next_id;
        state.next_id += 1;
        state.live_buffers += 1;
        state.names.insert(desc.name.clone(), id);

        Ok(Box::new(MockDeviceBuffer {
            id,
            size: desc.size,
            location: desc.location,
            allocated: false,
            state: Arc::clone(&self.state),
        }))
    }

    fn allocate_buffer_memory(&mut self, buffer: &mut dyn DeviceBuffer) -> Result<()> {
        // Downcast to mock type (every buffer passed here was created by this device)
        let mock_buffer = unsafe { &mut *(buffer as *mut dyn DeviceBuffer as *mut MockDeviceBuffer) };

        let mut state = self.state.lock().unwrap();
        if mock_buffer.allocated {
            return Err(Error::BackendError(format!("Buffer {} already has memory bound", mock_buffer.id)));
        }
        if state.allocated_bytes + mock_buffer.size > state.config.memory_budget {
            return Err(Error::OutOfMemory);
        }

        state.allocated_bytes += mock_buffer.size;
        state.contents.insert(mock_buffer.id, vec![0u8; mock_buffer.size as usize]);
        mock_buffer.allocated = true;
        Ok(())
    }

    fn copy_buffer(
        &mut self,
        src: &dyn DeviceBuffer,
        dst: &dyn DeviceBuffer,
        region: BufferCopyRegion,
    ) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        if state.config.fail_copies {
            return Err(Error::BackendError("Transfer queue rejected the copy".to_string()));
        }
        if !region.fits(src.size(), dst.size()) {
            return Err(Error::BackendError(format!("Copy region {:?} out of range", region)));
        }

        let src_start = region.src_offset as usize;
        let dst_start = region.dst_offset as usize;
        let len = region.size as usize;

        let data = state.contents.get(&src.id())
            .map(|memory| memory[src_start..src_start + len].to_vec())
            .ok_or_else(|| Error::BackendError(format!("Source buffer {} has no memory", src.id())))?;
        let target = state.contents.get_mut(&dst.id())
            .ok_or_else(|| Error::BackendError(format!("Destination buffer {} has no memory", dst.id())))?;
        target[dst_start..dst_start + len].copy_from_slice(&data);
        state.copies_submitted += 1;
        Ok(())
    }

    fn wait_idle(&self) -> Result<()> {
        self.state.lock().unwrap().idle_waits += 1;
        Ok(())
    }

    fn stats(&self) -> DeviceStats {
        let state = self.state.lock().unwrap();
        DeviceStats {
            live_buffers: state.live_buffers,
            allocated_bytes: state.allocated_bytes,
            copies_submitted: state.copies_submitted,
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
#[path = "mock_graphics_device_tests.rs"]
mod tests;
