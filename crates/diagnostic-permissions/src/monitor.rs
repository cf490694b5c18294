// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Hardware state change monitoring.
//
// The platform's broadcast receivers (Bluetooth adapter, NFC adapter,
// location providers) report raw integer codes. Each receiver holds an
// `Arc<StateMonitor>` handed to it at registration; the monitor maps the code
// to a named state and forwards it to the web view. NFC and location changes
// are forwarded only when they differ from the last state seen; the Bluetooth
// receiver forwards every broadcast.

use std::sync::{Arc, Mutex};

use tracing::{debug, info};

use diagnostic_bridge::traits::EventSink;
use diagnostic_core::DiagnosticConfig;
use diagnostic_core::types::{HardwareState, LocationMode, RadioState, StateChange};

/// Deduplicating forwarder for hardware state changes.
pub struct StateMonitor {
    sink: Arc<dyn EventSink>,
    enabled: bool,
    /// Last state seen per hardware kind.
    last: Mutex<Vec<HardwareState>>,
}

impl StateMonitor {
    pub fn new(sink: Arc<dyn EventSink>, config: &DiagnosticConfig) -> Self {
        Self {
            sink,
            enabled: config.notify_state_changes,
            last: Mutex::new(Vec::new()),
        }
    }

    /// `BluetoothAdapter.ACTION_STATE_CHANGED` with its `EXTRA_STATE` code.
    ///
    /// Every broadcast is forwarded, repeated states included.
    pub fn on_bluetooth_state(&self, code: i32) -> bool {
        let state = HardwareState::Bluetooth(RadioState::from_bluetooth_code(code));
        self.replace(state);
        self.forward(state)
    }

    /// `NfcAdapter.ACTION_ADAPTER_STATE_CHANGED` with its `EXTRA_ADAPTER_STATE` code.
    pub fn on_nfc_state(&self, code: i32) -> bool {
        self.observe(HardwareState::Nfc(RadioState::from_nfc_code(code)))
    }

    /// `LocationManager.PROVIDERS_CHANGED_ACTION`, with the current
    /// `Settings.Secure.LOCATION_MODE` value.
    pub fn on_location_mode(&self, code: i32) -> bool {
        self.observe(HardwareState::Location(LocationMode::from_settings_code(code)))
    }

    /// Remember a state without notifying, e.g. after an explicit query.
    pub fn record(&self, state: HardwareState) {
        self.replace(state);
    }

    /// Last known state of every kind seen so far.
    pub fn snapshot(&self) -> Vec<HardwareState> {
        self.last.lock().map(|l| l.clone()).unwrap_or_default()
    }

    /// Record `state` and emit it if it changed. Returns whether an event
    /// was emitted.
    pub fn observe(&self, state: HardwareState) -> bool {
        if !self.replace(state) {
            debug!(state = state.as_str(), "hardware state unchanged");
            return false;
        }
        self.forward(state)
    }

    fn forward(&self, state: HardwareState) -> bool {
        if !self.enabled {
            return false;
        }
        info!(handler = state.js_handler(), state = state.as_str(), "forwarding hardware state");
        self.sink.emit(&StateChange::new(state));
        true
    }

    /// Store `state`; returns true when it differs from the previous value.
    fn replace(&self, state: HardwareState) -> bool {
        let Ok(mut last) = self.last.lock() else {
            return false;
        };
        match last.iter_mut().find(|s| s.same_kind(&state)) {
            Some(previous) if *previous == state => false,
            Some(previous) => {
                *previous = state;
                true
            }
            None => {
                last.push(state);
                true
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Recorder(Mutex<Vec<StateChange>>);

    impl EventSink for Recorder {
        fn emit(&self, change: &StateChange) {
            self.0.lock().unwrap().push(change.clone());
        }
    }

    impl Recorder {
        fn scripts(&self) -> Vec<String> {
            self.0.lock().unwrap().iter().map(|c| c.to_script()).collect()
        }
    }

    fn monitor(enabled: bool) -> (Arc<Recorder>, StateMonitor) {
        let recorder = Arc::new(Recorder::default());
        let config = DiagnosticConfig {
            notify_state_changes: enabled,
            ..DiagnosticConfig::default()
        };
        (recorder.clone(), StateMonitor::new(recorder, &config))
    }

    #[test]
    fn emits_only_on_change() {
        let (recorder, monitor) = monitor(true);
        assert!(monitor.on_location_mode(3));
        assert!(!monitor.on_location_mode(3));
        assert!(monitor.on_location_mode(0));
        assert_eq!(
            recorder.scripts(),
            vec![
                "cordova.plugins.diagnostic._onLocationStateChange(\"high_accuracy\");",
                "cordova.plugins.diagnostic._onLocationStateChange(\"location_off\");",
            ]
        );
    }

    #[test]
    fn kinds_are_tracked_separately() {
        let (recorder, monitor) = monitor(true);
        assert!(monitor.on_location_mode(2));
        assert!(monitor.on_nfc_state(3));
        assert!(!monitor.on_location_mode(2));
        assert!(!monitor.on_nfc_state(3));
        assert_eq!(recorder.scripts().len(), 2);
        assert_eq!(monitor.snapshot().len(), 2);
    }

    #[test]
    fn bluetooth_forwards_every_broadcast() {
        let (recorder, monitor) = monitor(true);
        assert!(monitor.on_bluetooth_state(12));
        assert!(monitor.on_bluetooth_state(12));
        assert_eq!(
            recorder.scripts(),
            vec![
                "cordova.plugins.diagnostic._onBluetoothStateChange(\"powered_on\");",
                "cordova.plugins.diagnostic._onBluetoothStateChange(\"powered_on\");",
            ]
        );
        assert_eq!(
            monitor.snapshot(),
            vec![HardwareState::Bluetooth(RadioState::PoweredOn)]
        );
    }

    #[test]
    fn recorded_state_suppresses_first_event() {
        let (recorder, monitor) = monitor(true);
        monitor.record(HardwareState::Nfc(RadioState::PoweredOff));
        assert!(!monitor.on_nfc_state(1));
        assert!(monitor.on_nfc_state(2));
        assert_eq!(
            recorder.scripts(),
            vec!["cordova.plugins.diagnostic._onNFCStateChange(\"powering_on\");"]
        );
    }

    #[test]
    fn disabled_monitor_still_tracks() {
        let (recorder, monitor) = monitor(false);
        assert!(!monitor.on_bluetooth_state(10));
        assert!(recorder.scripts().is_empty());
        assert_eq!(
            monitor.snapshot(),
            vec![HardwareState::Bluetooth(RadioState::PoweredOff)]
        );
    }
}
