/// Central buffer manager.
///
/// Owns every Buffer, hands out BufferKeys, and translates device failures
/// into the BufferErrorKind taxonomy. Each failed operation is logged, then
/// recorded on the buffer it targeted (when that buffer still exists).

use std::sync::{Arc, Mutex};
use bytemuck::Pod;
use rustc_hash::FxHashMap;
use slotmap::SlotMap;

use crate::device::{GraphicsDevice, DeviceBuffer, DeviceBufferDesc, BufferCopyRegion, BufferUsageFlags};
use crate::buffer::{
    Buffer, BufferKey, BufferType, BufferError, BufferErrorKind, BufferResult, BindSlot,
};
use crate::{engine_debug, engine_error, engine_info, engine_warn};

const SOURCE: &str = "ember::BufferManager";

pub struct BufferManager {
    device: Arc<Mutex<dyn GraphicsDevice>>,
    buffers: SlotMap<BufferKey, Buffer>,
    names: FxHashMap<String, BufferKey>,
    bindings: FxHashMap<BindSlot, BufferKey>,
}

impl BufferManager {
    /// Create an empty manager allocating through `device`
    pub fn new(device: Arc<Mutex<dyn GraphicsDevice>>) -> Self {
        Self {
            device,
            buffers: SlotMap::with_key(),
            names: FxHashMap::default(),
            bindings: FxHashMap::default(),
        }
    }

    /// Graphics device this manager allocates through
    pub fn graphics_device(&self) -> &Arc<Mutex<dyn GraphicsDevice>> {
        &self.device
    }

    // ===== CREATION =====

    /// Create a buffer of `kind` with `size` bytes of backing memory
    ///
    /// Creating under a name that is already registered releases the previous
    /// buffer; its key becomes stale.
    ///
    /// # Errors
    ///
    /// * `Creation` - zero size, or the device refused to construct the object
    /// * `Allocation` - memory could not be reserved or bound
    pub fn create_buffer(&mut self, kind: BufferType, name: &str, size: u64) -> BufferResult<BufferKey> {
        let result = self.try_create(kind, name, size);
        self.finish(&[], result)
    }

    /// Create a buffer from a raw kind discriminant
    ///
    /// An unrecognized discriminant fails with `Type`.
    pub fn create_buffer_raw(&mut self, raw_kind: u32, name: &str, size: u64) -> BufferResult<BufferKey> {
        match BufferType::try_from(raw_kind) {
            Ok(kind) => self.create_buffer(kind, name, size),
            Err(error) => self.finish(&[], Err(error)),
        }
    }

    /// Create a buffer sized to `data` and upload it
    ///
    /// An empty payload fails with `Creation`. The buffer is only registered
    /// once the upload succeeded: on failure it is released, a buffer already
    /// registered under `name` is kept, and the `Copy` error is returned.
    pub fn create_buffer_with_data(&mut self, kind: BufferType, name: &str, data: &[u8]) -> BufferResult<BufferKey> {
        let result = self.try_create_with_data(kind, name, data);
        self.finish(&[], result)
    }

    fn try_create(&mut self, kind: BufferType, name: &str, size: u64) -> BufferResult<BufferKey> {
        if size == 0 {
            return Err(BufferError::new(
                BufferErrorKind::Creation,
                format!("Buffer '{}' requested with zero size", name),
            ));
        }

        let handle = build_device_buffer(&self.device, kind, name, size)?;
        Ok(self.register(Buffer::new(name.to_string(), kind, handle)))
    }

    fn try_create_with_data(&mut self, kind: BufferType, name: &str, data: &[u8]) -> BufferResult<BufferKey> {
        if data.is_empty() {
            return Err(BufferError::new(
                BufferErrorKind::Creation,
                format!("Buffer '{}' requested with an empty payload", name),
            ));
        }

        let handle = build_device_buffer(&self.device, kind, name, data.len() as u64)?;
        let mut buffer = Buffer::new(name.to_string(), kind, handle);
        write_into(&self.device, &mut buffer, 0, data)?;
        Ok(self.register(buffer))
    }

    /// Insert a fully built buffer, replacing any buffer registered under its name
    fn register(&mut self, buffer: Buffer) -> BufferKey {
        if let Some(previous) = self.names.get(buffer.name()).copied() {
            engine_warn!(SOURCE, "Buffer '{}' already exists, replacing it", buffer.name());
            self.release(previous);
        }

        engine_debug!(SOURCE, "Created {:?} buffer '{}' ({} bytes)", buffer.kind(), buffer.name(), buffer.size());
        let name = buffer.name().to_string();
        let key = self.buffers.insert(buffer);
        self.names.insert(name, key);
        key
    }

    // ===== UPLOAD =====

    /// Upload `data` at the start of the buffer
    ///
    /// Device-local kinds go through a transient staging buffer.
    ///
    /// # Errors
    ///
    /// * `Creation` - the key no longer resolves to a buffer
    /// * `Copy` - `data` exceeds the capacity, or the transfer failed
    pub fn upload(&mut self, key: BufferKey, data: &[u8]) -> BufferResult<()> {
        self.write(key, 0, data)
    }

    /// Upload a slice of plain-old-data values
    pub fn upload_slice<T: Pod>(&mut self, key: BufferKey, data: &[T]) -> BufferResult<()> {
        self.write(key, 0, bytemuck::cast_slice(data))
    }

    /// Write `data` at `offset` bytes into the buffer
    pub fn write(&mut self, key: BufferKey, offset: u64, data: &[u8]) -> BufferResult<()> {
        let result = self.try_write(key, offset, data);
        self.finish(&[key], result)
    }

    fn try_write(&mut self, key: BufferKey, offset: u64, data: &[u8]) -> BufferResult<()> {
        let buffer = self.buffers.get_mut(key).ok_or_else(|| stale_key(key))?;

        let fits = offset
            .checked_add(data.len() as u64)
            .is_some_and(|end| end <= buffer.size());
        if !fits {
            return Err(BufferError::new(
                BufferErrorKind::Copy,
                format!(
                    "Write of {} bytes at offset {} exceeds buffer '{}' of {} bytes",
                    data.len(), offset, buffer.name(), buffer.size()
                ),
            ));
        }
        if data.is_empty() {
            return Ok(());
        }

        write_into(&self.device, buffer, offset, data)
    }

    // ===== TRANSFERS =====

    /// Copy `size` bytes from the start of `src` to the start of `dst` on the device
    ///
    /// # Errors
    ///
    /// * `Creation` - either key no longer resolves to a buffer
    /// * `Copy` - missing transfer usage, zero or out-of-range size, or the
    ///   device copy failed
    pub fn copy_buffer(&mut self, src: BufferKey, dst: BufferKey, size: u64) -> BufferResult<()> {
        let result = self.try_copy(src, dst, size);
        self.finish(&[src, dst], result)
    }

    fn try_copy(&self, src: BufferKey, dst: BufferKey, size: u64) -> BufferResult<()> {
        let source = self.buffers.get(src).ok_or_else(|| stale_key(src))?;
        let target = self.buffers.get(dst).ok_or_else(|| stale_key(dst))?;

        let copy_error = |message: String| BufferError::new(BufferErrorKind::Copy, message);

        if !source.kind().usage().contains(BufferUsageFlags::TRANSFER_SRC) {
            return Err(copy_error(format!(
                "{:?} buffer '{}' cannot be a copy source", source.kind(), source.name()
            )));
        }
        if !target.kind().usage().contains(BufferUsageFlags::TRANSFER_DST) {
            return Err(copy_error(format!(
                "{:?} buffer '{}' cannot be a copy destination", target.kind(), target.name()
            )));
        }

        let region = BufferCopyRegion { src_offset: 0, dst_offset: 0, size };
        if size == 0 || !region.fits(source.size(), target.size()) {
            return Err(copy_error(format!(
                "Copy of {} bytes from '{}' ({} bytes) to '{}' ({} bytes) is out of range",
                size, source.name(), source.size(), target.name(), target.size()
            )));
        }

        let mut device = self.device.lock()
            .map_err(|_| poisoned_device(BufferErrorKind::Copy))?;
        device.copy_buffer(source.device_buffer(), target.device_buffer(), region)
            .map_err(|e| copy_error(format!(
                "Device copy from '{}' to '{}' failed: {}", source.name(), target.name(), e
            )))
    }

    // ===== READBACK =====

    /// Read the whole buffer back to the host
    ///
    /// Only host-visible kinds can be read; device-local kinds fail with `Type`.
    pub fn read(&mut self, key: BufferKey) -> BufferResult<Vec<u8>> {
        let result = self.try_read(key);
        self.finish(&[key], result)
    }

    /// Read the whole buffer back as plain-old-data values
    ///
    /// Fails with `Type` if the capacity is not a whole number of `T`.
    pub fn read_as<T: Pod>(&mut self, key: BufferKey) -> BufferResult<Vec<T>> {
        let element_size = std::mem::size_of::<T>() as u64;
        let result = match self.buffers.get(key) {
            None => Err(stale_key(key)),
            Some(buffer) if element_size == 0 || buffer.size() % element_size != 0 => {
                Err(BufferError::new(
                    BufferErrorKind::Type,
                    format!(
                        "Buffer '{}' of {} bytes is not a whole number of {}-byte elements",
                        buffer.name(), buffer.size(), element_size
                    ),
                ))
            }
            Some(_) => Ok(()),
        };
        self.finish(&[key], result)?;

        let bytes = self.read(key)?;
        Ok(bytes
            .chunks_exact(element_size as usize)
            .map(bytemuck::pod_read_unaligned)
            .collect())
    }

    fn try_read(&self, key: BufferKey) -> BufferResult<Vec<u8>> {
        let buffer = self.buffers.get(key).ok_or_else(|| stale_key(key))?;

        if !buffer.kind().is_host_visible() {
            return Err(BufferError::new(
                BufferErrorKind::Type,
                format!("{:?} buffer '{}' is not host-visible", buffer.kind(), buffer.name()),
            ));
        }

        buffer.device_buffer().read(0, buffer.size()).map_err(|e| BufferError::new(
            BufferErrorKind::Copy,
            format!("Mapped read of '{}' failed: {}", buffer.name(), e),
        ))
    }

    // ===== BINDING =====

    /// Bind a buffer to a pass slot
    ///
    /// Fails with `Bind` when the buffer's kind lacks the usage the slot
    /// needs. A later bind on the same slot replaces the previous buffer.
    pub fn bind(&mut self, key: BufferKey, slot: BindSlot) -> BufferResult<()> {
        let result = match self.buffers.get(key) {
            None => Err(stale_key(key)),
            Some(buffer) if !slot.accepts(buffer.kind().usage()) => Err(BufferError::new(
                BufferErrorKind::Bind,
                format!("{:?} buffer '{}' cannot be bound to {:?}", buffer.kind(), buffer.name(), slot),
            )),
            Some(_) => {
                self.bindings.insert(slot, key);
                Ok(())
            }
        };
        self.finish(&[key], result)
    }

    /// Buffer currently bound to `slot`
    pub fn bound_buffer(&self, slot: BindSlot) -> Option<BufferKey> {
        self.bindings
            .get(&slot)
            .copied()
            .filter(|key| self.buffers.contains_key(*key))
    }

    // ===== DESTRUCTION =====

    /// Release a buffer and its device memory
    ///
    /// Destroying a key that no longer resolves fails with `Creation`.
    pub fn destroy(&mut self, key: BufferKey) -> BufferResult<()> {
        if self.release(key) {
            Ok(())
        } else {
            self.finish(&[], Err(stale_key(key)))
        }
    }

    /// Release the buffer registered under `name`
    pub fn remove_buffer_by_name(&mut self, name: &str) -> BufferResult<()> {
        match self.names.get(name).copied() {
            Some(key) => self.destroy(key),
            None => {
                let error = BufferError::new(
                    BufferErrorKind::Creation,
                    format!("No buffer named '{}'", name),
                );
                self.finish(&[], Err(error))
            }
        }
    }

    /// Release every buffer, returning how many were released
    ///
    /// Waits for the device to go idle first so no transfer still reads
    /// from a buffer being freed.
    pub fn cleanup(&mut self) -> usize {
        let count = self.buffers.len();
        if count > 0 {
            match self.device.lock() {
                Ok(device) => {
                    if let Err(e) = device.wait_idle() {
                        engine_warn!(SOURCE, "Device did not go idle before cleanup: {}", e);
                    }
                }
                Err(_) => engine_warn!(SOURCE, "Graphics device lock poisoned, releasing buffers without waiting"),
            }
        }
        self.bindings.clear();
        self.names.clear();
        self.buffers.clear();
        if count > 0 {
            engine_info!(SOURCE, "Released {} buffers", count);
        }
        count
    }

    fn release(&mut self, key: BufferKey) -> bool {
        let Some(buffer) = self.buffers.remove(key) else {
            return false;
        };
        if self.names.get(buffer.name()) == Some(&key) {
            self.names.remove(buffer.name());
        }
        self.bindings.retain(|_, bound| *bound != key);
        engine_debug!(SOURCE, "Destroyed {:?} buffer '{}'", buffer.kind(), buffer.name());
        true
    }

    // ===== ACCESSORS =====

    /// Get a buffer by key
    pub fn buffer(&self, key: BufferKey) -> Option<&Buffer> {
        self.buffers.get(key)
    }

    /// Get the key registered under `name`
    pub fn buffer_key(&self, name: &str) -> Option<BufferKey> {
        self.names.get(name).copied()
    }

    /// Get a buffer by name
    pub fn buffer_by_name(&self, name: &str) -> Option<&Buffer> {
        self.buffer_key(name).and_then(|key| self.buffers.get(key))
    }

    /// Number of live buffers
    pub fn len(&self) -> usize {
        self.buffers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffers.is_empty()
    }

    /// Keys of every live buffer
    pub fn keys(&self) -> impl Iterator<Item = BufferKey> + '_ {
        self.buffers.keys()
    }

    /// Combined capacity of every live buffer in bytes
    pub fn total_size(&self) -> u64 {
        self.buffers.values().map(Buffer::size).sum()
    }

    // ===== DIAGNOSTICS =====

    /// Log the error report of a buffer
    pub fn print_errors(&self, key: BufferKey) {
        let Some(buffer) = self.buffers.get(key) else {
            engine_warn!(SOURCE, "{}", stale_key(key).message());
            return;
        };
        for line in buffer.error_report() {
            if buffer.has_errors() {
                engine_warn!(SOURCE, "{}", line);
            } else {
                engine_info!(SOURCE, "{}", line);
            }
        }
    }

    /// Log a failure and record the outcome on the buffers involved
    fn finish<T>(&mut self, keys: &[BufferKey], result: BufferResult<T>) -> BufferResult<T> {
        match &result {
            Ok(_) => {
                for &key in keys {
                    if let Some(buffer) = self.buffers.get_mut(key) {
                        buffer.record_success();
                    }
                }
            }
            Err(error) => {
                engine_error!(SOURCE, "{}", error);
                for &key in keys {
                    if let Some(buffer) = self.buffers.get_mut(key) {
                        buffer.record_failure(error.kind());
                    }
                }
            }
        }
        result
    }
}

impl std::fmt::Debug for BufferManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BufferManager")
            .field("buffers", &self.buffers.len())
            .field("bindings", &self.bindings.len())
            .finish()
    }
}

// ===== HELPERS =====

fn stale_key(key: BufferKey) -> BufferError {
    BufferError::new(
        BufferErrorKind::Creation,
        format!("Buffer {:?} does not exist (destroyed or never created)", key),
    )
}

fn poisoned_device(kind: BufferErrorKind) -> BufferError {
    BufferError::new(kind, "Graphics device lock poisoned")
}

/// Construct a device buffer for `kind` and back it with memory
///
/// The unbacked object is dropped (released) if allocation fails.
fn build_device_buffer(
    device: &Arc<Mutex<dyn GraphicsDevice>>,
    kind: BufferType,
    name: &str,
    size: u64,
) -> BufferResult<Box<dyn DeviceBuffer>> {
    let info = kind.info();
    let desc = DeviceBufferDesc {
        name: name.to_string(),
        size,
        usage: info.usage,
        location: info.location,
    };

    let mut device = device.lock()
        .map_err(|_| poisoned_device(BufferErrorKind::Creation))?;

    let mut handle = device.create_buffer(&desc).map_err(|e| BufferError::new(
        BufferErrorKind::Creation,
        format!("Device refused {:?} buffer '{}' ({} bytes): {}", kind, name, size, e),
    ))?;

    device.allocate_buffer_memory(handle.as_mut()).map_err(|e| BufferError::new(
        BufferErrorKind::Allocation,
        format!("No memory for {:?} buffer '{}' ({} bytes): {}", kind, name, size, e),
    ))?;

    Ok(handle)
}

/// Write `data` into a buffer, directly when host-visible, staged otherwise
fn write_into(
    device: &Arc<Mutex<dyn GraphicsDevice>>,
    buffer: &mut Buffer,
    offset: u64,
    data: &[u8],
) -> BufferResult<()> {
    if buffer.kind().is_host_visible() {
        let name = buffer.name().to_string();
        buffer.device_buffer_mut().write(offset, data).map_err(|e| BufferError::new(
            BufferErrorKind::Copy,
            format!("Mapped write into '{}' failed: {}", name, e),
        ))
    } else {
        staged_write(device, buffer, offset, data)
    }
}

/// Upload into a device-local buffer through a transient staging buffer
fn staged_write(
    device: &Arc<Mutex<dyn GraphicsDevice>>,
    buffer: &Buffer,
    offset: u64,
    data: &[u8],
) -> BufferResult<()> {
    let info = buffer.kind().info();
    let staging_kind = info.staging.ok_or_else(|| BufferError::new(
        BufferErrorKind::Copy,
        format!("{:?} buffer '{}' has no staging path", buffer.kind(), buffer.name()),
    ))?;
    let staging_name = format!("{}{}", info.staging_prefix, buffer.name());

    let copy_error = |message: String| BufferError::new(BufferErrorKind::Copy, message);

    let mut staging = build_device_buffer(device, staging_kind, &staging_name, data.len() as u64)
        .map_err(|e| copy_error(format!("Staging buffer '{}' unavailable: {}", staging_name, e.message())))?;

    staging.write(0, data)
        .map_err(|e| copy_error(format!("Mapped write into '{}' failed: {}", staging_name, e)))?;

    let region = BufferCopyRegion { src_offset: 0, dst_offset: offset, size: data.len() as u64 };
    let mut device = device.lock()
        .map_err(|_| poisoned_device(BufferErrorKind::Copy))?;
    device.copy_buffer(staging.as_ref(), buffer.device_buffer(), region)
        .map_err(|e| copy_error(format!(
            "Device copy from '{}' to '{}' failed: {}", staging_name, buffer.name(), e
        )))
}

#[cfg(test)]
#[path = "buffer_manager_tests.rs"]
mod tests;
