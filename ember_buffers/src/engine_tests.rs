//! Unit tests for Engine singleton manager
//!
//! Tests initialization, graphics device and BufferManager singletons, and logging APIs.
//!
//! IMPORTANT: ENGINE_STATE is a global OnceLock shared across all tests.
//! All tests are marked with #[serial] to run sequentially and avoid RwLock poisoning.

use crate::ember::{Engine, Error};
use crate::ember::log::{Logger, LogEntry, LogSeverity};
use crate::buffer::BufferType;
use crate::device::mock_graphics_device::MockGraphicsDevice;
use std::sync::{Arc, Mutex};
use serial_test::serial;

// ============================================================================
// TEST HELPERS
// ============================================================================

/// Test logger that captures log entries for verification
struct TestLogger {
    entries: Arc<Mutex<Vec<(LogSeverity, String, String)>>>,
}

impl TestLogger {
    fn new() -> Self {
        Self {
            entries: Arc::new(Mutex::new(Vec::new())),
        }
    }

    fn entries(&self) -> Arc<Mutex<Vec<(LogSeverity, String, String)>>> {
        Arc::clone(&self.entries)
    }
}

impl Logger for TestLogger {
    fn log(&self, entry: &LogEntry) {
        let mut entries = self.entries.lock().unwrap();
        entries.push((entry.severity, entry.source.clone(), entry.message.clone()));
    }
}

/// Reset engine singletons before each test
///
/// ENGINE_STATE is a OnceLock, so once initialized it stays initialized.
fn setup() {
    Engine::reset_for_testing();
    let _ = Engine::initialize();
}

// ============================================================================
// INITIALIZATION AND SHUTDOWN TESTS
// ============================================================================

#[test]
#[serial]
fn test_engine_initialize_is_idempotent() {
    setup();
    Engine::initialize().unwrap();
    Engine::initialize().unwrap();

    assert!(Engine::create_graphics_device(MockGraphicsDevice::new()).is_ok());
}

#[test]
#[serial]
fn test_shutdown_clears_singletons_and_releases_buffers() {
    setup();
    let device = MockGraphicsDevice::new();
    let state = device.state();
    Engine::create_graphics_device(device).unwrap();
    Engine::create_buffer_manager().unwrap();

    {
        let manager = Engine::buffer_manager().unwrap();
        let mut manager = manager.lock().unwrap();
        manager.create_buffer(BufferType::Uniform, "camera", 256).unwrap();
        manager.create_buffer(BufferType::Vertex, "mesh", 1024).unwrap();
    }
    assert_eq!(state.lock().unwrap().live_buffers, 2);

    Engine::shutdown();

    assert!(Engine::buffer_manager().is_err());
    assert!(Engine::graphics_device().is_err());
    assert_eq!(state.lock().unwrap().live_buffers, 0);
}

// ============================================================================
// GRAPHICS DEVICE TESTS
// ============================================================================

#[test]
#[serial]
fn test_create_and_get_graphics_device() {
    setup();
    Engine::create_graphics_device(MockGraphicsDevice::new()).unwrap();

    let device = Engine::graphics_device().unwrap();
    assert_eq!(device.lock().unwrap().stats().live_buffers, 0);
}

#[test]
#[serial]
fn test_create_graphics_device_twice_fails() {
    setup();
    Engine::create_graphics_device(MockGraphicsDevice::new()).unwrap();

    let result = Engine::create_graphics_device(MockGraphicsDevice::new());
    assert!(matches!(result, Err(Error::InitializationFailed(_))));
}

#[test]
#[serial]
fn test_destroy_graphics_device() {
    setup();
    Engine::create_graphics_device(MockGraphicsDevice::new()).unwrap();

    Engine::destroy_graphics_device().unwrap();

    assert!(matches!(Engine::graphics_device(), Err(Error::InitializationFailed(_))));
    // A new device can be registered afterwards
    assert!(Engine::create_graphics_device(MockGraphicsDevice::new()).is_ok());
}

// ============================================================================
// BUFFER MANAGER TESTS
// ============================================================================

#[test]
#[serial]
fn test_buffer_manager_requires_graphics_device() {
    setup();

    let result = Engine::create_buffer_manager();
    assert!(matches!(result, Err(Error::InitializationFailed(_))));
}

#[test]
#[serial]
fn test_buffer_manager_uses_registered_device() {
    setup();
    let device = MockGraphicsDevice::new();
    let state = device.state();
    Engine::create_graphics_device(device).unwrap();
    Engine::create_buffer_manager().unwrap();

    let manager = Engine::buffer_manager().unwrap();
    let key = manager.lock().unwrap()
        .create_buffer(BufferType::Storage, "particles", 4096)
        .unwrap();

    assert!(manager.lock().unwrap().buffer(key).is_some());
    assert_eq!(state.lock().unwrap().allocated_bytes, 4096);
}

#[test]
#[serial]
fn test_create_buffer_manager_twice_fails() {
    setup();
    Engine::create_graphics_device(MockGraphicsDevice::new()).unwrap();
    Engine::create_buffer_manager().unwrap();

    let result = Engine::create_buffer_manager();
    assert!(matches!(result, Err(Error::InitializationFailed(_))));
}

#[test]
#[serial]
fn test_destroy_buffer_manager() {
    setup();
    Engine::create_graphics_device(MockGraphicsDevice::new()).unwrap();
    Engine::create_buffer_manager().unwrap();

    Engine::destroy_buffer_manager().unwrap();

    assert!(Engine::buffer_manager().is_err());
    assert!(Engine::graphics_device().is_ok());
}

// ============================================================================
// LOGGING TESTS
// ============================================================================

#[test]
#[serial]
fn test_set_logger_captures_buffer_failures() {
    setup();
    let logger = TestLogger::new();
    let entries = logger.entries();
    Engine::set_logger(logger);

    Engine::create_graphics_device(MockGraphicsDevice::new()).unwrap();
    Engine::create_buffer_manager().unwrap();
    let manager = Engine::buffer_manager().unwrap();
    let _ = manager.lock().unwrap().create_buffer(BufferType::Index, "empty", 0);

    Engine::reset_logger();

    let entries = entries.lock().unwrap();
    assert!(entries.iter().any(|(severity, source, message)| {
        *severity == LogSeverity::Error
            && source == "ember::BufferManager"
            && message.contains("zero size")
    }));
    assert!(entries.iter().any(|(severity, source, _)| {
        *severity == LogSeverity::Info && source == "ember::Engine"
    }));
}

#[test]
#[serial]
fn test_engine_errors_are_logged() {
    setup();
    let logger = TestLogger::new();
    let entries = logger.entries();
    Engine::set_logger(logger);

    let _ = Engine::buffer_manager();

    Engine::reset_logger();

    let entries = entries.lock().unwrap();
    assert!(entries.iter().any(|(severity, source, message)| {
        *severity == LogSeverity::Error
            && source == "ember::Engine"
            && message.contains("BufferManager not created")
    }));
}

#[test]
#[serial]
fn test_reset_logger_to_default() {
    setup();
    let logger = TestLogger::new();
    let entries = logger.entries();
    Engine::set_logger(logger);
    Engine::reset_logger();

    Engine::log(LogSeverity::Info, "ember::test", "after reset".to_string());

    assert!(entries.lock().unwrap().iter().all(|(_, _, message)| message != "after reset"));
}

#[test]
#[serial]
fn test_log_detailed_carries_location() {
    struct LocationLogger(Arc<Mutex<Option<(Option<&'static str>, Option<u32>)>>>);
    impl Logger for LocationLogger {
        fn log(&self, entry: &LogEntry) {
            if entry.source == "ember::test_location" {
                *self.0.lock().unwrap() = Some((entry.file, entry.line));
            }
        }
    }

    let captured = Arc::new(Mutex::new(None));
    Engine::set_logger(LocationLogger(Arc::clone(&captured)));
    Engine::log_detailed(LogSeverity::Error, "ember::test_location", "boom".to_string(), "device.rs", 7);
    Engine::reset_logger();

    assert_eq!(*captured.lock().unwrap(), Some((Some("device.rs"), Some(7))));
}
