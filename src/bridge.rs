// JNI bridge for the Android host app
// The Kotlin side owns SensorManager registration and forwards every sensor
// callback through nativePushSample; this module parks the queue producer
// where those callbacks can reach it and exposes the engine lifecycle.

#![allow(dead_code)] // Entry points are resolved by the JVM, not by Rust callers

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use jni::objects::{JClass, JObject};
use jni::sys::{jboolean, jfloat, jint, jlong, JNI_FALSE, JNI_TRUE};
use jni::JNIEnv;
use once_cell::sync::Lazy;
use rtrb::Producer;

use crate::engine::EngineHandle;
use crate::error::{log_sensor_error, ErrorCode, SensorErrorCodes};
use crate::sensor::{SensorKind, SensorSample};
use crate::telemetry;

// Sensor type constants mirrored from android.hardware.Sensor. Types the
// mapping does not cover are rejected at the bridge boundary.
const ANDROID_SENSOR_ACCELEROMETER: jint = 1;
const ANDROID_SENSOR_MAGNETIC_FIELD: jint = 2;
const ANDROID_SENSOR_GYROSCOPE: jint = 4;
const ANDROID_SENSOR_LIGHT: jint = 5;
const ANDROID_SENSOR_PROXIMITY: jint = 8;
const ANDROID_SENSOR_GRAVITY: jint = 9;

/// Global engine instance driven by the host app lifecycle.
///
/// The bridge is the only Android-side owner; everything else reaches the
/// engine through the handle's cloneable subscriptions.
static ENGINE: Lazy<EngineHandle> = Lazy::new(EngineHandle::new);

/// Queue producer parked by [crate::engine::AndroidBackend] while monitoring
/// is active, plus the sensor kinds the current config accepts.
struct SampleSink {
    producer: Producer<SensorSample>,
    enabled: Vec<SensorKind>,
}

static SINK: Lazy<Mutex<Option<SampleSink>>> = Lazy::new(|| Mutex::new(None));

// ndk-context panics if initialize_android_context runs twice, so the first
// nativeInit wins and later calls become no-ops.
static CONTEXT_READY: AtomicBool = AtomicBool::new(false);

fn engine() -> &'static EngineHandle {
    &ENGINE
}

pub(crate) fn install_sink(producer: Producer<SensorSample>, enabled: Vec<SensorKind>) {
    let mut slot = SINK.lock().unwrap_or_else(|err| err.into_inner());
    *slot = Some(SampleSink { producer, enabled });
}

pub(crate) fn clear_sink() {
    let mut slot = SINK.lock().unwrap_or_else(|err| err.into_inner());
    *slot = None;
}

/// Forward one host sample into the engine queue.
///
/// Returns false when monitoring is stopped, the kind is disabled in config,
/// or the queue is full. A full queue drops the newest sample and reports it
/// via telemetry; the push path never blocks a sensor callback.
fn push_sample(sample: SensorSample) -> bool {
    let mut slot = SINK.lock().unwrap_or_else(|err| err.into_inner());
    let Some(sink) = slot.as_mut() else {
        return false;
    };

    if !sink.enabled.contains(&sample.kind) {
        return false;
    }

    match sink.producer.push(sample) {
        Ok(()) => true,
        Err(_) => {
            telemetry::hub().record_dropped_sample("sample_queue");
            false
        }
    }
}

fn kind_from_android(sensor_type: jint) -> Option<SensorKind> {
    match sensor_type {
        ANDROID_SENSOR_ACCELEROMETER => Some(SensorKind::Accelerometer),
        ANDROID_SENSOR_MAGNETIC_FIELD => Some(SensorKind::MagneticField),
        ANDROID_SENSOR_GYROSCOPE => Some(SensorKind::Gyroscope),
        ANDROID_SENSOR_LIGHT => Some(SensorKind::Light),
        ANDROID_SENSOR_PROXIMITY => Some(SensorKind::Proximity),
        ANDROID_SENSOR_GRAVITY => Some(SensorKind::Gravity),
        _ => None,
    }
}

/// Register the JVM and application context with ndk-context so Oboe can
/// open the audio device.
///
/// Called once from the host Activity's onCreate with the application
/// context. Returns 0 on success or a sensor error code.
#[no_mangle]
pub extern "system" fn Java_com_example_sensorsexample_MotionMonitorBridge_nativeInit(
    env: JNIEnv,
    _class: JClass,
    context: JObject,
) -> jint {
    if CONTEXT_READY
        .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
        .is_err()
    {
        log::debug!("[Bridge] nativeInit called again, context already registered");
        return 0;
    }

    let vm = match env.get_java_vm() {
        Ok(vm) => vm,
        Err(err) => {
            log::error!("[Bridge] nativeInit failed to resolve the JavaVM: {err}");
            CONTEXT_READY.store(false, Ordering::SeqCst);
            return SensorErrorCodes::BACKEND_UNAVAILABLE;
        }
    };

    let global = match env.new_global_ref(&context) {
        Ok(global) => global,
        Err(err) => {
            log::error!("[Bridge] nativeInit failed to pin the app context: {err}");
            CONTEXT_READY.store(false, Ordering::SeqCst);
            return SensorErrorCodes::BACKEND_UNAVAILABLE;
        }
    };

    unsafe {
        ndk_context::initialize_android_context(
            vm.get_java_vm_pointer().cast(),
            global.as_obj().as_raw().cast(),
        );
    }
    // The raw pointer handed to ndk-context must outlive the process.
    std::mem::forget(global);

    telemetry::hub().record_lifecycle(telemetry::LifecyclePhase::ContextInitialized);
    log::info!("[Bridge] Android context registered");
    crate::http::spawn_if_enabled(engine());
    0
}

/// Start sensor monitoring. Returns 0 on success or a sensor error code.
#[no_mangle]
pub extern "system" fn Java_com_example_sensorsexample_MotionMonitorBridge_nativeStartMonitoring(
    _env: JNIEnv,
    _class: JClass,
) -> jint {
    match engine().start_monitoring() {
        Ok(()) => 0,
        Err(err) => {
            log_sensor_error(&err, "nativeStartMonitoring");
            err.code()
        }
    }
}

/// Stop sensor monitoring. Returns 0 on success or a sensor error code.
#[no_mangle]
pub extern "system" fn Java_com_example_sensorsexample_MotionMonitorBridge_nativeStopMonitoring(
    _env: JNIEnv,
    _class: JClass,
) -> jint {
    match engine().stop_monitoring() {
        Ok(()) => 0,
        Err(err) => {
            log_sensor_error(&err, "nativeStopMonitoring");
            err.code()
        }
    }
}

/// Push one sensor reading from a SensorEventListener callback.
///
/// `sensor_type` carries the android.hardware.Sensor type constant and
/// `t_ms` the event timestamp in milliseconds. Returns JNI_TRUE when the
/// sample was queued, JNI_FALSE when it was filtered or dropped.
#[no_mangle]
pub extern "system" fn Java_com_example_sensorsexample_MotionMonitorBridge_nativePushSample(
    _env: JNIEnv,
    _class: JClass,
    sensor_type: jint,
    x: jfloat,
    y: jfloat,
    z: jfloat,
    t_ms: jlong,
) -> jboolean {
    let Some(kind) = kind_from_android(sensor_type) else {
        return JNI_FALSE;
    };

    let sample = SensorSample::new(kind, [x, y, z], t_ms.max(0) as u64);
    if push_sample(sample) {
        JNI_TRUE
    } else {
        JNI_FALSE
    }
}

/// Map a slider position onto the detection threshold.
///
/// Values are clamped to the configured control range; the resulting
/// threshold is returned so the host can display it.
#[no_mangle]
pub extern "system" fn Java_com_example_sensorsexample_MotionMonitorBridge_nativeSetControlInput(
    _env: JNIEnv,
    _class: JClass,
    input: jint,
) -> jfloat {
    engine().set_control_input(input.max(0) as u32)
}
