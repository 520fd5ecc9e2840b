// Motion Monitor Core - shake detection over device sensor streams
// Real-time classification with a lock-free ingestion pipeline

// Module declarations
pub mod config;
pub mod cue;
pub mod detection;
pub mod engine;
pub mod error;
pub mod fixtures;
pub mod http;
pub mod managers;
pub mod sensitivity;
pub mod sensor;
pub mod telemetry;

#[cfg(target_os = "android")]
pub mod bridge;

// Re-exports for convenience
pub use detection::ShakeEvent;
pub use engine::{EngineHandle, MonitorGuard};
pub use sensor::{SensorKind, SensorSample};

/// Initialize Android logging through logcat.
///
/// `log` macro records are bridged into the tracing subscriber, so both
/// macro families end up under the same tag.
#[cfg(target_os = "android")]
pub fn init_logging() {
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;

    match tracing_android::layer("MotionMonitor") {
        Ok(layer) => {
            // try_init also installs the log-record bridge; a second call
            // (the library can be reloaded) is a harmless no-op.
            let _ = tracing_subscriber::registry().with(layer).try_init();
        }
        Err(err) => eprintln!("[MotionMonitor] logcat layer unavailable: {err}"),
    }
}

/// Initialize desktop logging on stderr, keeping stdout free for the CLI's
/// JSON reports.
#[cfg(not(target_os = "android"))]
pub fn init_logging() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

/// JNI_OnLoad is called when the native library is loaded by the host app.
///
/// Context initialization happens later in `nativeInit`, once the host can
/// hand over an application context; here only logging and the lifecycle
/// marker are set up.
#[cfg(target_os = "android")]
#[no_mangle]
pub extern "system" fn JNI_OnLoad(
    _vm: jni::JavaVM,
    _reserved: *mut std::ffi::c_void,
) -> jni::sys::jint {
    init_logging();
    log::info!("[Lib] JNI_OnLoad");
    telemetry::hub().record_lifecycle(telemetry::LifecyclePhase::LibraryLoaded);

    jni::sys::JNI_VERSION_1_6
}

#[cfg(target_os = "android")]
#[no_mangle]
pub extern "system" fn JNI_OnUnload(_vm: jni::JavaVM, _reserved: *mut std::ffi::c_void) {
    log::info!("[Lib] JNI_OnUnload");
    telemetry::hub().record_lifecycle(telemetry::LifecyclePhase::LibraryUnloaded);
}
