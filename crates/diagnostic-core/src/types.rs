// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Core domain types for the diagnostic bridge.

use std::collections::BTreeMap;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{DiagnosticError, Result};

/// Correlation token for one outstanding permission request.
///
/// Passed to the platform as the `requestCode` of the permission prompt and
/// handed back verbatim in the result callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RequestId(pub u32);

impl std::fmt::Display for RequestId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Runtime ("dangerous") permissions that must be granted by the user.
///
/// The serialized form is the short name used on the JavaScript side
/// (`CAMERA`); [`Permission::platform_name`] gives the Android manifest name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Permission {
    ReadCalendar,
    WriteCalendar,
    Camera,
    ReadContacts,
    WriteContacts,
    GetAccounts,
    AccessFineLocation,
    AccessCoarseLocation,
    RecordAudio,
    ReadPhoneState,
    CallPhone,
    AddVoicemail,
    UseSip,
    ProcessOutgoingCalls,
    SendSms,
    ReceiveSms,
    ReadSms,
    ReceiveWapPush,
    ReceiveMms,
    WriteExternalStorage,
    ReadCallLog,
    WriteCallLog,
    ReadExternalStorage,
    BodySensors,
}

impl Permission {
    /// Every recognised permission.
    pub const ALL: [Permission; 24] = [
        Self::ReadCalendar,
        Self::WriteCalendar,
        Self::Camera,
        Self::ReadContacts,
        Self::WriteContacts,
        Self::GetAccounts,
        Self::AccessFineLocation,
        Self::AccessCoarseLocation,
        Self::RecordAudio,
        Self::ReadPhoneState,
        Self::CallPhone,
        Self::AddVoicemail,
        Self::UseSip,
        Self::ProcessOutgoingCalls,
        Self::SendSms,
        Self::ReceiveSms,
        Self::ReadSms,
        Self::ReceiveWapPush,
        Self::ReceiveMms,
        Self::WriteExternalStorage,
        Self::ReadCallLog,
        Self::WriteCallLog,
        Self::ReadExternalStorage,
        Self::BodySensors,
    ];

    /// Short name used across the JavaScript boundary.
    pub fn name(&self) -> &'static str {
        match self {
            Self::ReadCalendar => "READ_CALENDAR",
            Self::WriteCalendar => "WRITE_CALENDAR",
            Self::Camera => "CAMERA",
            Self::ReadContacts => "READ_CONTACTS",
            Self::WriteContacts => "WRITE_CONTACTS",
            Self::GetAccounts => "GET_ACCOUNTS",
            Self::AccessFineLocation => "ACCESS_FINE_LOCATION",
            Self::AccessCoarseLocation => "ACCESS_COARSE_LOCATION",
            Self::RecordAudio => "RECORD_AUDIO",
            Self::ReadPhoneState => "READ_PHONE_STATE",
            Self::CallPhone => "CALL_PHONE",
            Self::AddVoicemail => "ADD_VOICEMAIL",
            Self::UseSip => "USE_SIP",
            Self::ProcessOutgoingCalls => "PROCESS_OUTGOING_CALLS",
            Self::SendSms => "SEND_SMS",
            Self::ReceiveSms => "RECEIVE_SMS",
            Self::ReadSms => "READ_SMS",
            Self::ReceiveWapPush => "RECEIVE_WAP_PUSH",
            Self::ReceiveMms => "RECEIVE_MMS",
            Self::WriteExternalStorage => "WRITE_EXTERNAL_STORAGE",
            Self::ReadCallLog => "READ_CALL_LOG",
            Self::WriteCallLog => "WRITE_CALL_LOG",
            Self::ReadExternalStorage => "READ_EXTERNAL_STORAGE",
            Self::BodySensors => "BODY_SENSORS",
        }
    }

    /// Fully-qualified Android manifest name (`android.permission.CAMERA`).
    pub fn platform_name(&self) -> &'static str {
        match self {
            Self::ReadCalendar => "android.permission.READ_CALENDAR",
            Self::WriteCalendar => "android.permission.WRITE_CALENDAR",
            Self::Camera => "android.permission.CAMERA",
            Self::ReadContacts => "android.permission.READ_CONTACTS",
            Self::WriteContacts => "android.permission.WRITE_CONTACTS",
            Self::GetAccounts => "android.permission.GET_ACCOUNTS",
            Self::AccessFineLocation => "android.permission.ACCESS_FINE_LOCATION",
            Self::AccessCoarseLocation => "android.permission.ACCESS_COARSE_LOCATION",
            Self::RecordAudio => "android.permission.RECORD_AUDIO",
            Self::ReadPhoneState => "android.permission.READ_PHONE_STATE",
            Self::CallPhone => "android.permission.CALL_PHONE",
            Self::AddVoicemail => "com.android.voicemail.permission.ADD_VOICEMAIL",
            Self::UseSip => "android.permission.USE_SIP",
            Self::ProcessOutgoingCalls => "android.permission.PROCESS_OUTGOING_CALLS",
            Self::SendSms => "android.permission.SEND_SMS",
            Self::ReceiveSms => "android.permission.RECEIVE_SMS",
            Self::ReadSms => "android.permission.READ_SMS",
            Self::ReceiveWapPush => "android.permission.RECEIVE_WAP_PUSH",
            Self::ReceiveMms => "android.permission.RECEIVE_MMS",
            Self::WriteExternalStorage => "android.permission.WRITE_EXTERNAL_STORAGE",
            Self::ReadCallLog => "android.permission.READ_CALL_LOG",
            Self::WriteCallLog => "android.permission.WRITE_CALL_LOG",
            Self::ReadExternalStorage => "android.permission.READ_EXTERNAL_STORAGE",
            Self::BodySensors => "android.permission.BODY_SENSORS",
        }
    }

    /// Look up a permission by either its short name or its platform name.
    ///
    /// The lookup is bidirectional so that names coming back from the OS
    /// (`android.permission.CAMERA`) and names coming from JavaScript
    /// (`CAMERA`) resolve to the same variant.
    pub fn lookup(name: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|p| p.name() == name || p.platform_name() == name)
    }

    /// Like [`Permission::lookup`], but fails with `UnknownPermission`.
    pub fn parse(name: &str) -> Result<Self> {
        Self::lookup(name).ok_or_else(|| DiagnosticError::UnknownPermission(name.to_string()))
    }
}

impl FromStr for Permission {
    type Err = DiagnosticError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl std::fmt::Display for Permission {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Authorisation status of a single permission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PermissionStatus {
    /// User authorised the permission.
    #[serde(rename = "GRANTED")]
    Granted,
    /// User denied the permission without choosing "never ask again".
    #[serde(rename = "DENIED")]
    Denied,
    /// Either the permission has never been requested, or the user denied it
    /// and chose "never ask again". The platform cannot tell these apart.
    #[serde(rename = "STATUS_NOT_REQUESTED_OR_DENIED_ALWAYS")]
    NotRequestedOrDeniedAlways,
}

impl PermissionStatus {
    /// Wire string sent to JavaScript.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Granted => "GRANTED",
            Self::Denied => "DENIED",
            Self::NotRequestedOrDeniedAlways => "STATUS_NOT_REQUESTED_OR_DENIED_ALWAYS",
        }
    }

    /// Derive the status of a permission that is not granted from the
    /// platform's rationale flag.
    pub fn from_denial(rationale_showable: bool) -> Self {
        if rationale_showable {
            Self::Denied
        } else {
            Self::NotRequestedOrDeniedAlways
        }
    }
}

/// Aggregated statuses keyed by permission.
pub type PermissionStatuses = BTreeMap<Permission, PermissionStatus>;

/// Power state of a radio (Bluetooth adapter or NFC adapter).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RadioState {
    Unknown,
    PoweredOn,
    PoweredOff,
    PoweringOn,
    PoweringOff,
}

impl RadioState {
    /// Map an `android.bluetooth.BluetoothAdapter` `STATE_*` code.
    pub fn from_bluetooth_code(code: i32) -> Self {
        match code {
            10 => Self::PoweredOff,
            11 => Self::PoweringOn,
            12 => Self::PoweredOn,
            13 => Self::PoweringOff,
            _ => Self::Unknown,
        }
    }

    /// Map an `android.nfc.NfcAdapter` `STATE_*` code.
    pub fn from_nfc_code(code: i32) -> Self {
        match code {
            1 => Self::PoweredOff,
            2 => Self::PoweringOn,
            3 => Self::PoweredOn,
            4 => Self::PoweringOff,
            _ => Self::Unknown,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Unknown => "unknown",
            Self::PoweredOn => "powered_on",
            Self::PoweredOff => "powered_off",
            Self::PoweringOn => "powering_on",
            Self::PoweringOff => "powering_off",
        }
    }
}

/// Device location mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LocationMode {
    #[serde(rename = "high_accuracy")]
    HighAccuracy,
    #[serde(rename = "device_only")]
    DeviceOnly,
    #[serde(rename = "battery_saving")]
    BatterySaving,
    #[serde(rename = "location_off")]
    Off,
    #[serde(rename = "unknown")]
    Unknown,
}

impl LocationMode {
    /// Map a `Settings.Secure.LOCATION_MODE_*` value.
    pub fn from_settings_code(code: i32) -> Self {
        match code {
            0 => Self::Off,
            1 => Self::DeviceOnly,
            2 => Self::BatterySaving,
            3 => Self::HighAccuracy,
            _ => Self::Unknown,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::HighAccuracy => "high_accuracy",
            Self::DeviceOnly => "device_only",
            Self::BatterySaving => "battery_saving",
            Self::Off => "location_off",
            Self::Unknown => "unknown",
        }
    }
}

/// A hardware state observed by one of the platform's change receivers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "state", rename_all = "snake_case")]
pub enum HardwareState {
    Bluetooth(RadioState),
    Nfc(RadioState),
    Location(LocationMode),
}

impl HardwareState {
    /// Wire string of the state value.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Bluetooth(s) | Self::Nfc(s) => s.as_str(),
            Self::Location(m) => m.as_str(),
        }
    }

    /// Name of the JavaScript handler notified about changes of this kind.
    pub fn js_handler(&self) -> &'static str {
        match self {
            Self::Bluetooth(_) => "_onBluetoothStateChange",
            Self::Nfc(_) => "_onNFCStateChange",
            Self::Location(_) => "_onLocationStateChange",
        }
    }

    /// Whether two states describe the same hardware.
    pub fn same_kind(&self, other: &HardwareState) -> bool {
        std::mem::discriminant(self) == std::mem::discriminant(other)
    }
}

/// Notification emitted when a hardware state changes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StateChange {
    pub state: HardwareState,
    pub observed_at: DateTime<Utc>,
}

impl StateChange {
    pub fn new(state: HardwareState) -> Self {
        Self {
            state,
            observed_at: Utc::now(),
        }
    }

    /// JavaScript statement that delivers this change to the web view.
    pub fn to_script(&self) -> String {
        format!(
            "cordova.plugins.diagnostic.{}(\"{}\");",
            self.state.js_handler(),
            self.state.as_str()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_is_bidirectional() {
        for p in Permission::ALL {
            assert_eq!(Permission::lookup(p.name()), Some(p));
            assert_eq!(Permission::lookup(p.platform_name()), Some(p));
        }
    }

    #[test]
    fn voicemail_uses_its_own_namespace() {
        assert_eq!(
            Permission::parse("com.android.voicemail.permission.ADD_VOICEMAIL").unwrap(),
            Permission::AddVoicemail
        );
        assert!(Permission::lookup("android.permission.ADD_VOICEMAIL").is_none());
    }

    #[test]
    fn unknown_permission_is_rejected() {
        let err = "FLY".parse::<Permission>().unwrap_err();
        assert!(matches!(err, DiagnosticError::UnknownPermission(name) if name == "FLY"));
    }

    #[test]
    fn serde_names_match_short_names() {
        for p in Permission::ALL {
            let json = serde_json::to_string(&p).unwrap();
            assert_eq!(json, format!("\"{}\"", p.name()));
        }
    }

    #[test]
    fn statuses_serialize_as_object() {
        let mut statuses = PermissionStatuses::new();
        statuses.insert(Permission::Camera, PermissionStatus::Granted);
        statuses.insert(Permission::RecordAudio, PermissionStatus::NotRequestedOrDeniedAlways);
        let value = serde_json::to_value(&statuses).unwrap();
        assert_eq!(value["CAMERA"], "GRANTED");
        assert_eq!(value["RECORD_AUDIO"], "STATUS_NOT_REQUESTED_OR_DENIED_ALWAYS");
    }

    #[test]
    fn denial_status_follows_rationale() {
        assert_eq!(PermissionStatus::from_denial(true), PermissionStatus::Denied);
        assert_eq!(
            PermissionStatus::from_denial(false),
            PermissionStatus::NotRequestedOrDeniedAlways
        );
    }

    #[test]
    fn radio_codes() {
        assert_eq!(RadioState::from_bluetooth_code(12), RadioState::PoweredOn);
        assert_eq!(RadioState::from_bluetooth_code(-1), RadioState::Unknown);
        assert_eq!(RadioState::from_nfc_code(1), RadioState::PoweredOff);
        assert_eq!(RadioState::from_nfc_code(4).as_str(), "powering_off");
    }

    #[test]
    fn location_script() {
        let change = StateChange::new(HardwareState::Location(LocationMode::from_settings_code(0)));
        assert_eq!(
            change.to_script(),
            "cordova.plugins.diagnostic._onLocationStateChange(\"location_off\");"
        );
    }
}
