//! Integration tests for the engine logging system
//!
//! Verifies that the engine_* macros and engine-level failures reach a
//! logger installed through Engine::set_logger.
//! No GPU required.
//!
//! Run with: cargo test --test logging_integration_tests

use ember_buffers::ember::Engine;
use ember_buffers::ember::log::{Logger, LogEntry, LogSeverity};
use ember_buffers::{engine_trace, engine_debug, engine_info, engine_warn, engine_error, engine_err, engine_bail};
use std::sync::{Arc, Mutex};
use serial_test::serial;

// ============================================================================
// CAPTURE LOGGER
// ============================================================================

/// Logger keeping every entry for later inspection
struct CaptureLogger {
    entries: Arc<Mutex<Vec<LogEntry>>>,
}

/// Install a capture logger and return the captured entries
fn capture() -> Arc<Mutex<Vec<LogEntry>>> {
    let entries = Arc::new(Mutex::new(Vec::new()));
    Engine::set_logger(CaptureLogger { entries: Arc::clone(&entries) });
    entries
}

impl Logger for CaptureLogger {
    fn log(&self, entry: &LogEntry) {
        self.entries.lock().unwrap().push(entry.clone());
    }
}

// ============================================================================
// MACRO ROUTING
// ============================================================================

#[test]
#[serial]
fn test_integration_macros_cover_every_severity() {
    let entries = capture();

    engine_trace!("ember::vulkan", "Recording copy {}", 1);
    engine_debug!("ember::BufferManager", "Created {:?} buffer '{}'", "Vertex", "mesh");
    engine_info!("ember::Engine", "BufferManager singleton created");
    engine_warn!("ember::BufferManager", "Buffer '{}' already exists, replacing it", "mesh");
    engine_error!("ember::vulkan", "Out of GPU memory for buffer '{}'", "mesh");

    Engine::reset_logger();

    let captured = entries.lock().unwrap();
    let severities: Vec<LogSeverity> = captured.iter().map(|e| e.severity).collect();
    assert_eq!(severities, vec![
        LogSeverity::Trace,
        LogSeverity::Debug,
        LogSeverity::Info,
        LogSeverity::Warn,
        LogSeverity::Error,
    ]);
    assert_eq!(captured[1].message, "Created \"Vertex\" buffer 'mesh'");
    assert_eq!(captured[3].source, "ember::BufferManager");

    // Only error entries carry a location
    assert!(captured[..4].iter().all(|e| e.file.is_none() && e.line.is_none()));
    assert!(captured[4].file.is_some_and(|file| file.ends_with("logging_integration_tests.rs")));
    assert!(captured[4].line.is_some());
}

#[test]
#[serial]
fn test_integration_error_helpers_log_and_build_errors() {
    fn submit(device_lost: bool) -> ember_buffers::ember::Result<()> {
        if device_lost {
            engine_bail!("ember::vulkan", "Failed to wait for buffer copy: {}", "DEVICE_LOST");
        }
        Ok(())
    }

    let entries = capture();

    let err = engine_err!("ember::vulkan", "Failed to submit buffer copy: {}", "DEVICE_LOST");
    let bailed = submit(true).unwrap_err();
    submit(false).unwrap();

    Engine::reset_logger();

    assert_eq!(err.to_string(), "Backend error: Failed to submit buffer copy: DEVICE_LOST");
    assert_eq!(bailed.to_string(), "Backend error: Failed to wait for buffer copy: DEVICE_LOST");

    let captured = entries.lock().unwrap();
    assert_eq!(captured.len(), 2);
    assert!(captured.iter().all(|e| e.severity == LogSeverity::Error && e.file.is_some()));
}

#[test]
#[serial]
fn test_integration_log_detailed_keeps_location() {
    let entries = capture();

    Engine::log_detailed(
        LogSeverity::Error,
        "ember::vulkan",
        "vkAllocateMemory failed".to_string(),
        "vulkan_device.rs",
        42,
    );

    Engine::reset_logger();

    let captured = entries.lock().unwrap();
    assert_eq!(captured.len(), 1);
    assert_eq!(captured[0].file, Some("vulkan_device.rs"));
    assert_eq!(captured[0].line, Some(42));
    assert!(captured[0].format_plain().ends_with("[ember::vulkan] vkAllocateMemory failed (vulkan_device.rs:42)"));
}

// ============================================================================
// ENGINE FAILURES
// ============================================================================

#[test]
#[serial]
fn test_integration_missing_subsystems_are_logged() {
    Engine::initialize().unwrap();
    Engine::shutdown();
    let entries = capture();

    assert!(Engine::buffer_manager().is_err());
    assert!(Engine::create_buffer_manager().is_err());

    Engine::reset_logger();

    let captured = entries.lock().unwrap();
    assert!(captured.iter().all(|e| e.severity == LogSeverity::Error && e.source == "ember::Engine"));
    assert!(captured.iter().any(|e| e.message.contains("BufferManager not created")));
    assert!(captured.iter().any(|e| e.message.contains("GraphicsDevice not created")));
}

#[test]
#[serial]
fn test_integration_logger_reset_stops_capture() {
    let entries = capture();

    engine_info!("ember::test", "Message 1");
    Engine::reset_logger();
    engine_info!("ember::test", "Message 2");

    let captured = entries.lock().unwrap();
    assert_eq!(captured.len(), 1);
    assert_eq!(captured[0].message, "Message 1");
}
