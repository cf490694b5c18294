// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// JNI entry points for `org.hyperpolymath.diagnostic.DiagnosticBridge`.
//
// The Java side calls `nativeCreate` once per plugin instance and keeps the
// returned handle in a `long` field. Every other entry point takes that
// handle back; `nativeDestroy` releases it. There is no process-wide state,
// so several plugin instances (or web views) can coexist.

use std::sync::Arc;

use jni::JNIEnv;
use jni::objects::{JClass, JIntArray, JObject, JObjectArray, JString};
use jni::sys::{jint, jlong};
use tracing::{error, warn};

use diagnostic_bridge::android::{
    AndroidHost, JavaCallbackSink, JavascriptEventSink, decode_permission_result,
};
use diagnostic_bridge::traits::CompletionSink;
use diagnostic_core::DiagnosticConfig;
use diagnostic_core::error::{DiagnosticError, Result};
use diagnostic_core::types::RequestId;

use crate::dispatch::Diagnostic;
use crate::monitor::StateMonitor;

/// State owned by one Java `DiagnosticBridge` instance.
struct NativeHandle {
    diagnostic: Diagnostic,
    monitor: StateMonitor,
}

fn bridge_err(context: &str, e: jni::errors::Error) -> DiagnosticError {
    DiagnosticError::Bridge(format!("{context}: {e}"))
}

fn read_string(env: &mut JNIEnv<'_>, value: &JString<'_>) -> Result<String> {
    if value.is_null() {
        return Ok(String::new());
    }
    Ok(env
        .get_string(value)
        .map_err(|e| bridge_err("get_string", e))?
        .into())
}

fn parse_config(raw: &str) -> Result<DiagnosticConfig> {
    if raw.trim().is_empty() {
        return Ok(DiagnosticConfig::default());
    }
    Ok(serde_json::from_str(raw)?)
}

fn create(
    env: &mut JNIEnv<'_>,
    activity: &JObject<'_>,
    plugin: &JObject<'_>,
    config_json: &JString<'_>,
) -> Result<NativeHandle> {
    let config = parse_config(&read_string(env, config_json)?)?;

    let activity = env
        .new_global_ref(activity)
        .map_err(|e| bridge_err("new_global_ref(activity)", e))?;
    let plugin = env
        .new_global_ref(plugin)
        .map_err(|e| bridge_err("new_global_ref(plugin)", e))?;

    let host = AndroidHost::new(
        env.get_java_vm().map_err(|e| bridge_err("get_java_vm", e))?,
        activity,
    );
    let events = JavascriptEventSink::new(
        env.get_java_vm().map_err(|e| bridge_err("get_java_vm", e))?,
        plugin,
    );

    Ok(NativeHandle {
        diagnostic: Diagnostic::new(Arc::new(host), &config),
        monitor: StateMonitor::new(Arc::new(events), &config),
    })
}

/// Borrow the handle behind a `long` produced by `nativeCreate`.
///
/// # Safety
///
/// `handle` must be zero or a value returned by `nativeCreate` that has not
/// been passed to `nativeDestroy`.
unsafe fn handle_ref<'a>(handle: jlong) -> Option<&'a NativeHandle> {
    if handle == 0 {
        warn!("native call with a null diagnostic handle");
        return None;
    }
    // SAFETY: upheld by the caller; the pointer came from `Box::into_raw`.
    unsafe { (handle as *const NativeHandle).as_ref() }
}

#[unsafe(no_mangle)]
pub extern "system" fn Java_org_hyperpolymath_diagnostic_DiagnosticBridge_nativeCreate<'local>(
    mut env: JNIEnv<'local>,
    _class: JClass<'local>,
    activity: JObject<'local>,
    plugin: JObject<'local>,
    config_json: JString<'local>,
) -> jlong {
    match create(&mut env, &activity, &plugin, &config_json) {
        Ok(handle) => Box::into_raw(Box::new(handle)) as jlong,
        Err(e) => {
            error!(error = %e, "failed to create diagnostic handle");
            if let Err(throw) = env.throw_new("java/lang/IllegalStateException", e.to_string()) {
                error!(error = %throw, "could not raise IllegalStateException");
            }
            0
        }
    }
}

#[unsafe(no_mangle)]
pub extern "system" fn Java_org_hyperpolymath_diagnostic_DiagnosticBridge_nativeDestroy<'local>(
    _env: JNIEnv<'local>,
    _class: JClass<'local>,
    handle: jlong,
) {
    if handle == 0 {
        return;
    }
    // SAFETY: the Java side clears its field before calling this, so the
    // pointer is released exactly once.
    drop(unsafe { Box::from_raw(handle as *mut NativeHandle) });
}

#[unsafe(no_mangle)]
pub extern "system" fn Java_org_hyperpolymath_diagnostic_DiagnosticBridge_nativeExecute<'local>(
    mut env: JNIEnv<'local>,
    _class: JClass<'local>,
    handle: jlong,
    action: JString<'local>,
    args_json: JString<'local>,
    callback: JObject<'local>,
) {
    // SAFETY: see `handle_ref`.
    let Some(native) = (unsafe { handle_ref(handle) }) else {
        return;
    };

    let sink: Box<dyn CompletionSink> = match env
        .get_java_vm()
        .and_then(|vm| env.new_global_ref(&callback).map(|cb| (vm, cb)))
    {
        Ok((vm, callback)) => Box::new(JavaCallbackSink::new(vm, callback)),
        Err(e) => {
            error!(error = %e, "cannot retain plugin callback");
            return;
        }
    };

    let parsed = read_string(&mut env, &action).and_then(|action| {
        let raw = read_string(&mut env, &args_json)?;
        let args = if raw.trim().is_empty() {
            serde_json::Value::Array(Vec::new())
        } else {
            serde_json::from_str(&raw)?
        };
        Ok((action, args))
    });

    match parsed {
        Ok((action, args)) => native.diagnostic.execute(&action, &args, sink),
        Err(e) => {
            error!(error = %e, "malformed plugin call");
            sink.fail(e.to_string());
        }
    }
}

#[unsafe(no_mangle)]
pub extern "system" fn Java_org_hyperpolymath_diagnostic_DiagnosticBridge_nativeOnRequestPermissionsResult<
    'local,
>(
    mut env: JNIEnv<'local>,
    _class: JClass<'local>,
    handle: jlong,
    request_code: jint,
    permissions: JObjectArray<'local>,
    grant_results: JIntArray<'local>,
) {
    // SAFETY: see `handle_ref`.
    let Some(native) = (unsafe { handle_ref(handle) }) else {
        return;
    };
    let Ok(id) = u32::try_from(request_code) else {
        warn!(request_code, "ignoring permission result with negative request code");
        return;
    };
    match decode_permission_result(&mut env, &permissions, &grant_results) {
        Ok(outcomes) => native.diagnostic.deliver_outcomes(RequestId(id), &outcomes),
        Err(e) => error!(%request_code, error = %e, "could not decode permission result"),
    }
}

#[unsafe(no_mangle)]
pub extern "system" fn Java_org_hyperpolymath_diagnostic_DiagnosticBridge_nativeOnBluetoothStateChanged<
    'local,
>(
    _env: JNIEnv<'local>,
    _class: JClass<'local>,
    handle: jlong,
    state: jint,
) {
    // SAFETY: see `handle_ref`.
    if let Some(native) = unsafe { handle_ref(handle) } {
        native.monitor.on_bluetooth_state(state);
    }
}

#[unsafe(no_mangle)]
pub extern "system" fn Java_org_hyperpolymath_diagnostic_DiagnosticBridge_nativeOnNfcStateChanged<
    'local,
>(
    _env: JNIEnv<'local>,
    _class: JClass<'local>,
    handle: jlong,
    state: jint,
) {
    // SAFETY: see `handle_ref`.
    if let Some(native) = unsafe { handle_ref(handle) } {
        native.monitor.on_nfc_state(state);
    }
}

#[unsafe(no_mangle)]
pub extern "system" fn Java_org_hyperpolymath_diagnostic_DiagnosticBridge_nativeOnLocationModeChanged<
    'local,
>(
    _env: JNIEnv<'local>,
    _class: JClass<'local>,
    handle: jlong,
    mode: jint,
) {
    // SAFETY: see `handle_ref`.
    if let Some(native) = unsafe { handle_ref(handle) } {
        native.monitor.on_location_mode(mode);
    }
}
