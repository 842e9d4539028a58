/// Ember Engine - Singleton manager for engine subsystems
///
/// Holds the graphics device, the buffer manager and the logger as global
/// singletons behind RwLocks. The buffer manager always allocates through the
/// graphics device registered here, so it must be destroyed first.

use std::sync::{OnceLock, RwLock, Arc, Mutex};
use std::time::SystemTime;
use crate::device::GraphicsDevice;
use crate::buffer::BufferManager;
use crate::error::{Result, Error};
use crate::log::{Logger, LogEntry, LogSeverity, DefaultLogger};

// ===== INTERNAL STATE =====

/// Global engine state storage
static ENGINE_STATE: OnceLock<EngineState> = OnceLock::new();

/// Global logger (initialized with DefaultLogger)
static LOGGER: OnceLock<RwLock<Box<dyn Logger>>> = OnceLock::new();

/// Internal state structure holding all engine singletons
struct EngineState {
    /// Graphics device singleton (wrapped in Mutex for thread-safe mutable access)
    graphics_device: RwLock<Option<Arc<Mutex<dyn GraphicsDevice>>>>,
    /// Buffer manager singleton
    buffer_manager: RwLock<Option<Arc<Mutex<BufferManager>>>>,
}

impl EngineState {
    fn new() -> Self {
        Self {
            graphics_device: RwLock::new(None),
            buffer_manager: RwLock::new(None),
        }
    }
}

// ===== PUBLIC API =====

/// Main engine singleton manager
///
/// # Example
///
/// ```no_run
/// use ember_buffers::ember::Engine;
/// use ember_buffers::ember::buffer::{BufferType, BindSlot};
/// use ember_buffers_vulkan::ember::VulkanGraphicsDevice;
///
/// Engine::initialize()?;
/// Engine::create_graphics_device(VulkanGraphicsDevice::new(Default::default())?)?;
/// Engine::create_buffer_manager()?;
///
/// let manager = Engine::buffer_manager()?;
/// let mut manager = manager.lock().unwrap();
/// let camera = manager.create_buffer(BufferType::Uniform, "camera", 256)?;
/// manager.bind(camera, BindSlot::UNIFORM_0)?;
/// # drop(manager);
///
/// Engine::shutdown();
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
pub struct Engine;

impl Engine {
    /// Log an engine error before handing it back to the caller
    fn log_and_return_error(error: Error) -> Error {
        match &error {
            Error::InitializationFailed(msg) => {
                crate::engine_error!("ember::Engine", "Initialization failed: {}", msg);
            }
            Error::BackendError(msg) => {
                crate::engine_error!("ember::Engine", "Backend error: {}", msg);
            }
            _ => {
                crate::engine_error!("ember::Engine", "Engine error: {}", error);
            }
        }
        error
    }

    fn state() -> Result<&'static EngineState> {
        ENGINE_STATE.get()
            .ok_or_else(|| Self::log_and_return_error(
                Error::InitializationFailed("Engine not initialized. Call Engine::initialize() first.".to_string())
            ))
    }

    /// Initialize the engine
    ///
    /// Must be called once at application startup before creating any subsystem.
    /// Calling it again is harmless.
    pub fn initialize() -> Result<()> {
        ENGINE_STATE.get_or_init(EngineState::new);
        Ok(())
    }

    /// Shutdown the engine and destroy all singletons
    ///
    /// The buffer manager is cleared before the graphics device.
    pub fn shutdown() {
        if let Some(state) = ENGINE_STATE.get() {
            if let Ok(mut manager) = state.buffer_manager.write() {
                *manager = None;
            }
            if let Ok(mut device) = state.graphics_device.write() {
                *device = None;
            }
        }
    }

    // ===== GRAPHICS DEVICE API =====

    /// Create and register the graphics device singleton
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The engine is not initialized
    /// - A graphics device already exists
    /// - The device lock is poisoned
    pub fn create_graphics_device<D: GraphicsDevice + 'static>(device: D) -> Result<()> {
        let device: Arc<Mutex<dyn GraphicsDevice>> = Arc::new(Mutex::new(device));
        Self::register_graphics_device(device)?;

        crate::engine_info!("ember::Engine", "GraphicsDevice singleton created successfully");

        Ok(())
    }

    /// Register an already shared graphics device
    pub(crate) fn register_graphics_device(device: Arc<Mutex<dyn GraphicsDevice>>) -> Result<()> {
        let state = Self::state()?;

        let mut lock = state.graphics_device.write()
            .map_err(|_| Self::log_and_return_error(
                Error::BackendError("GraphicsDevice lock poisoned".to_string())
            ))?;

        if lock.is_some() {
            return Err(Self::log_and_return_error(
                Error::InitializationFailed("GraphicsDevice already exists. Call Engine::destroy_graphics_device() first.".to_string())
            ));
        }

        *lock = Some(device);
        Ok(())
    }

    /// Get the graphics device singleton
    pub fn graphics_device() -> Result<Arc<Mutex<dyn GraphicsDevice>>> {
        let state = Self::state()?;

        let lock = state.graphics_device.read()
            .map_err(|_| Self::log_and_return_error(
                Error::BackendError("GraphicsDevice lock poisoned".to_string())
            ))?;

        lock.clone()
            .ok_or_else(|| Self::log_and_return_error(
                Error::InitializationFailed("GraphicsDevice not created. Call Engine::create_graphics_device() first.".to_string())
            ))
    }

    /// Destroy the graphics device singleton
    ///
    /// Existing device references (including a live buffer manager's) stay
    /// valid until dropped.
    pub fn destroy_graphics_device() -> Result<()> {
        let state = Self::state()?;

        let mut lock = state.graphics_device.write()
            .map_err(|_| Self::log_and_return_error(
                Error::BackendError("GraphicsDevice lock poisoned".to_string())
            ))?;

        *lock = None;

        crate::engine_info!("ember::Engine", "GraphicsDevice singleton destroyed");

        Ok(())
    }

    // ===== BUFFER MANAGER API =====

    /// Create and register the buffer manager singleton
    ///
    /// The manager allocates through the registered graphics device.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The engine is not initialized
    /// - No graphics device has been created
    /// - A buffer manager already exists
    pub fn create_buffer_manager() -> Result<()> {
        let device = Self::graphics_device()?;
        let state = Self::state()?;

        let mut lock = state.buffer_manager.write()
            .map_err(|_| Self::log_and_return_error(
                Error::BackendError("BufferManager lock poisoned".to_string())
            ))?;

        if lock.is_some() {
            return Err(Self::log_and_return_error(
                Error::InitializationFailed("BufferManager already exists. Call Engine::destroy_buffer_manager() first.".to_string())
            ));
        }

        *lock = Some(Arc::new(Mutex::new(BufferManager::new(device))));

        crate::engine_info!("ember::Engine", "BufferManager singleton created successfully");

        Ok(())
    }

    /// Get the buffer manager singleton
    ///
    /// # Example
    ///
    /// ```no_run
    /// use ember_buffers::ember::Engine;
    ///
    /// let manager = Engine::buffer_manager()?;
    /// let manager = manager.lock().unwrap();
    /// println!("{} buffers alive", manager.len());
    /// # Ok::<(), ember_buffers::ember::Error>(())
    /// ```
    pub fn buffer_manager() -> Result<Arc<Mutex<BufferManager>>> {
        let state = Self::state()?;

        let lock = state.buffer_manager.read()
            .map_err(|_| Self::log_and_return_error(
                Error::BackendError("BufferManager lock poisoned".to_string())
            ))?;

        lock.clone()
            .ok_or_else(|| Self::log_and_return_error(
                Error::InitializationFailed("BufferManager not created. Call Engine::create_buffer_manager() first.".to_string())
            ))
    }

    /// Destroy the buffer manager singleton
    ///
    /// Its buffers are released once the last reference to the manager is dropped.
    pub fn destroy_buffer_manager() -> Result<()> {
        let state = Self::state()?;

        let mut lock = state.buffer_manager.write()
            .map_err(|_| Self::log_and_return_error(
                Error::BackendError("BufferManager lock poisoned".to_string())
            ))?;

        *lock = None;

        crate::engine_info!("ember::Engine", "BufferManager singleton destroyed");

        Ok(())
    }

    /// Reset all singletons for testing (only available in test builds)
    #[cfg(test)]
    pub fn reset_for_testing() {
        Self::shutdown();
    }

    // ===== LOGGING API =====

    /// Set a custom logger
    ///
    /// # Example
    ///
    /// ```no_run
    /// use ember_buffers::ember::{Engine, log::{Logger, LogEntry}};
    ///
    /// struct FileLogger;
    /// impl Logger for FileLogger {
    ///     fn log(&self, entry: &LogEntry) {
    ///         // Write to file...
    ///     }
    /// }
    ///
    /// Engine::set_logger(FileLogger);
    /// ```
    pub fn set_logger<L: Logger + 'static>(logger: L) {
        let logger_lock = LOGGER.get_or_init(|| RwLock::new(Box::new(DefaultLogger)));
        if let Ok(mut lock) = logger_lock.write() {
            *lock = Box::new(logger);
        }
    }

    /// Reset logger to default (DefaultLogger)
    pub fn reset_logger() {
        let logger_lock = LOGGER.get_or_init(|| RwLock::new(Box::new(DefaultLogger)));
        if let Ok(mut lock) = logger_lock.write() {
            *lock = Box::new(DefaultLogger);
        }
    }

    /// Log without source location (used by engine_info!, engine_warn!, ...)
    pub fn log(severity: LogSeverity, source: &str, message: String) {
        Self::dispatch(LogEntry {
            severity,
            timestamp: SystemTime::now(),
            source: source.to_string(),
            message,
            file: None,
            line: None,
        });
    }

    /// Log with file:line information (used by engine_error! and engine_err!)
    pub fn log_detailed(
        severity: LogSeverity,
        source: &str,
        message: String,
        file: &'static str,
        line: u32,
    ) {
        Self::dispatch(LogEntry {
            severity,
            timestamp: SystemTime::now(),
            source: source.to_string(),
            message,
            file: Some(file),
            line: Some(line),
        });
    }

    fn dispatch(entry: LogEntry) {
        let logger_lock = LOGGER.get_or_init(|| RwLock::new(Box::new(DefaultLogger)));
        if let Ok(lock) = logger_lock.read() {
            lock.log(&entry);
        }
    }
}

#[cfg(test)]
#[path = "engine_tests.rs"]
mod tests;
