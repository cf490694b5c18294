// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Android permission host via JNI.
//
// Requires the Android NDK and targets `aarch64-linux-android` or
// `armv7-linux-androideabi`. Permission checks and prompts go through the
// AndroidX compat helpers so they behave the same on every API level that
// has runtime permissions.
//
// ## Architecture notes
//
// `ActivityCompat.requestPermissions` only dispatches the system dialog. The
// outcome reaches the hosting Activity's `onRequestPermissionsResult`, which
// must forward it to the native side together with the request code (see
// `diagnostic_permissions::android`). `decode_permission_result` turns the
// Java arrays from that callback into plain Rust values.

#![cfg(target_os = "android")]

use jni::objects::{GlobalRef, JIntArray, JObject, JObjectArray, JString, JValue};
use jni::sys::jsize;
use jni::{JNIEnv, JavaVM};

use diagnostic_core::error::{DiagnosticError, Result};
use diagnostic_core::types::{Permission, RequestId, StateChange};

use crate::traits::*;

/// `PackageManager.PERMISSION_GRANTED`.
const PERMISSION_GRANTED: i32 = 0;

const CONTEXT_COMPAT: &str = "androidx/core/content/ContextCompat";
const ACTIVITY_COMPAT: &str = "androidx/core/app/ActivityCompat";

/// Convenience: map any `jni::errors::Error` into `DiagnosticError::Bridge`.
fn jni_err(context: &str, e: jni::errors::Error) -> DiagnosticError {
    DiagnosticError::Bridge(format!("{context}: {e}"))
}

// ---------------------------------------------------------------------------
// Host struct
// ---------------------------------------------------------------------------

/// Android implementation of the permission host.
///
/// Holds the VM and a global reference to the hosting Activity. Every call
/// attaches the current thread, since platform callbacks may arrive on any
/// thread.
pub struct AndroidHost {
    vm: JavaVM,
    activity: GlobalRef,
}

impl AndroidHost {
    /// Build a host from an explicit VM and Activity reference.
    ///
    /// This is the path used when the Java side creates the native handle.
    pub fn new(vm: JavaVM, activity: GlobalRef) -> Self {
        Self { vm, activity }
    }

    /// Build a host from the NDK glue's global context.
    ///
    /// `ndk_context::android_context()` is populated by `android_main` or
    /// `ANativeActivity_onCreate`.
    pub fn from_ndk_context() -> Result<Self> {
        let ctx = ndk_context::android_context();
        if ctx.context().is_null() {
            return Err(DiagnosticError::Bridge(
                "Android context is null, native activity not initialised".into(),
            ));
        }
        // SAFETY: `ctx.vm()` returns the `JavaVM*` set by the NDK glue code.
        // The pointer is guaranteed valid for the lifetime of the process.
        let vm = unsafe { JavaVM::from_raw(ctx.vm().cast()) }
            .map_err(|e| jni_err("JavaVM::from_raw", e))?;
        let activity = {
            let env = vm
                .attach_current_thread()
                .map_err(|e| jni_err("attach_current_thread", e))?;
            // SAFETY: the NDK guarantees this pointer is a valid global
            // jobject for the hosting Activity.
            let raw = unsafe { JObject::from_raw(ctx.context().cast()) };
            env.new_global_ref(raw)
                .map_err(|e| jni_err("new_global_ref(activity)", e))?
        };
        Ok(Self { vm, activity })
    }

    fn env(&self) -> Result<jni::AttachGuard<'_>> {
        self.vm
            .attach_current_thread()
            .map_err(|e| jni_err("failed to attach JNI thread", e))
    }
}

impl PermissionHost for AndroidHost {
    fn platform_name(&self) -> &str {
        "Android"
    }

    fn supports_runtime_permissions(&self) -> bool {
        true
    }
}

// ---------------------------------------------------------------------------
// PermissionQuery: ContextCompat.checkSelfPermission
// ---------------------------------------------------------------------------

impl PermissionQuery for AndroidHost {
    fn is_granted(&self, permission: Permission) -> Result<bool> {
        let mut env = self.env()?;
        let j_name: JString = env
            .new_string(permission.platform_name())
            .map_err(|e| jni_err("new_string(permission)", e))?;

        let result = env
            .call_static_method(
                CONTEXT_COMPAT,
                "checkSelfPermission",
                "(Landroid/content/Context;Ljava/lang/String;)I",
                &[
                    JValue::Object(self.activity.as_obj()),
                    JValue::Object(&j_name),
                ],
            )
            .map_err(|e| jni_err("ContextCompat.checkSelfPermission", e))?
            .i()
            .map_err(|e| jni_err("checkSelfPermission->i", e))?;

        tracing::trace!(permission = permission.platform_name(), result, "checkSelfPermission");
        Ok(result == PERMISSION_GRANTED)
    }
}

// ---------------------------------------------------------------------------
// RationaleSource: ActivityCompat.shouldShowRequestPermissionRationale
// ---------------------------------------------------------------------------

impl RationaleSource for AndroidHost {
    fn should_show_rationale(&self, permission: Permission) -> Result<bool> {
        let mut env = self.env()?;
        let j_name: JString = env
            .new_string(permission.platform_name())
            .map_err(|e| jni_err("new_string(permission)", e))?;

        env.call_static_method(
            ACTIVITY_COMPAT,
            "shouldShowRequestPermissionRationale",
            "(Landroid/app/Activity;Ljava/lang/String;)Z",
            &[
                JValue::Object(self.activity.as_obj()),
                JValue::Object(&j_name),
            ],
        )
        .map_err(|e| jni_err("ActivityCompat.shouldShowRequestPermissionRationale", e))?
        .z()
        .map_err(|e| jni_err("shouldShowRequestPermissionRationale->z", e))
    }
}

// ---------------------------------------------------------------------------
// PermissionPrompter: ActivityCompat.requestPermissions
// ---------------------------------------------------------------------------

impl PermissionPrompter for AndroidHost {
    fn prompt_for(&self, permissions: &[Permission], token: RequestId) -> Result<()> {
        let request_code = i32::try_from(token.0).map_err(|_| {
            DiagnosticError::Bridge(format!("request id {token} does not fit a requestCode"))
        })?;
        let mut env = self.env()?;

        tracing::info!(%token, count = permissions.len(), "Android: requesting permissions");

        let string_class = env
            .find_class("java/lang/String")
            .map_err(|e| jni_err("find_class(String)", e))?;
        let names = env
            .new_object_array(permissions.len() as jsize, &string_class, JObject::null())
            .map_err(|e| jni_err("new_object_array(permissions)", e))?;

        for (i, permission) in permissions.iter().enumerate() {
            let j_name: JString = env
                .new_string(permission.platform_name())
                .map_err(|e| jni_err("new_string(permission[i])", e))?;
            env.set_object_array_element(&names, i as jsize, j_name)
                .map_err(|e| jni_err("set_object_array_element", e))?;
        }

        env.call_static_method(
            ACTIVITY_COMPAT,
            "requestPermissions",
            "(Landroid/app/Activity;[Ljava/lang/String;I)V",
            &[
                JValue::Object(self.activity.as_obj()),
                JValue::Object(&names),
                JValue::Int(request_code),
            ],
        )
        .map_err(|e| jni_err("ActivityCompat.requestPermissions", e))?;

        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Result callback decoding
// ---------------------------------------------------------------------------

/// Convert the `String[] permissions` / `int[] grantResults` pair from
/// `onRequestPermissionsResult` into `(platform name, granted)` pairs.
///
/// If the arrays differ in length the extra entries are dropped.
pub fn decode_permission_result(
    env: &mut JNIEnv<'_>,
    permissions: &JObjectArray<'_>,
    grant_results: &JIntArray<'_>,
) -> Result<Vec<(String, bool)>> {
    let names_len = env
        .get_array_length(permissions)
        .map_err(|e| jni_err("get_array_length(permissions)", e))?;
    let grants_len = env
        .get_array_length(grant_results)
        .map_err(|e| jni_err("get_array_length(grantResults)", e))?;

    let mut grants = vec![0i32; grants_len.max(0) as usize];
    env.get_int_array_region(grant_results, 0, &mut grants)
        .map_err(|e| jni_err("get_int_array_region(grantResults)", e))?;

    let len = names_len.min(grants_len).max(0);
    let mut decoded = Vec::with_capacity(len as usize);
    for i in 0..len {
        let element = env
            .get_object_array_element(permissions, i)
            .map_err(|e| jni_err("get_object_array_element(permissions)", e))?;
        let name: String = env
            .get_string(&JString::from(element))
            .map_err(|e| jni_err("get_string(permission)", e))?
            .into();
        decoded.push((name, grants[i as usize] == PERMISSION_GRANTED));
    }
    Ok(decoded)
}

// ---------------------------------------------------------------------------
// EventSink: forwards state changes to the plugin's web view
// ---------------------------------------------------------------------------

/// Delivers state changes by calling `executeGlobalJavascript(String)` on
/// the Java plugin object, which evaluates the script on the UI thread.
pub struct JavascriptEventSink {
    vm: JavaVM,
    plugin: GlobalRef,
}

impl JavascriptEventSink {
    pub fn new(vm: JavaVM, plugin: GlobalRef) -> Self {
        Self { vm, plugin }
    }

    fn deliver(&self, script: &str) -> Result<()> {
        let mut env = self
            .vm
            .attach_current_thread()
            .map_err(|e| jni_err("failed to attach JNI thread", e))?;
        let j_script: JString = env
            .new_string(script)
            .map_err(|e| jni_err("new_string(script)", e))?;
        env.call_method(
            self.plugin.as_obj(),
            "executeGlobalJavascript",
            "(Ljava/lang/String;)V",
            &[JValue::Object(&j_script)],
        )
        .map_err(|e| jni_err("executeGlobalJavascript", e))?;
        Ok(())
    }
}

impl EventSink for JavascriptEventSink {
    fn emit(&self, change: &StateChange) {
        if let Err(e) = self.deliver(&change.to_script()) {
            tracing::error!(error = %e, "failed to deliver state change to web view");
        }
    }
}

// ---------------------------------------------------------------------------
// CompletionSink: replies to a Java callback object
// ---------------------------------------------------------------------------

/// Replies through a Java object exposing `resolve(String json)` and
/// `reject(String message)`, typically a thin wrapper around Cordova's
/// `CallbackContext`.
pub struct JavaCallbackSink {
    vm: JavaVM,
    callback: GlobalRef,
}

impl JavaCallbackSink {
    pub fn new(vm: JavaVM, callback: GlobalRef) -> Self {
        Self { vm, callback }
    }

    fn call(&self, method: &str, argument: &str) -> Result<()> {
        let mut env = self
            .vm
            .attach_current_thread()
            .map_err(|e| jni_err("failed to attach JNI thread", e))?;
        let j_argument: JString = env
            .new_string(argument)
            .map_err(|e| jni_err("new_string(reply)", e))?;
        env.call_method(
            self.callback.as_obj(),
            method,
            "(Ljava/lang/String;)V",
            &[JValue::Object(&j_argument)],
        )
        .map_err(|e| jni_err(method, e))?;
        Ok(())
    }
}

impl CompletionSink for JavaCallbackSink {
    fn succeed(self: Box<Self>, payload: serde_json::Value) {
        if let Err(e) = self.call("resolve", &payload.to_string()) {
            tracing::error!(error = %e, "failed to deliver plugin reply");
        }
    }

    fn fail(self: Box<Self>, message: String) {
        if let Err(e) = self.call("reject", &message) {
            tracing::error!(error = %e, "failed to deliver plugin error");
        }
    }
}
