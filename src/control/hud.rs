//! HUD-facing teleoperation state.
//!
//! The control link's listener is the only writer; the render thread and
//! the HUD read snapshots. Inbound JSON documents update only the fields
//! they carry.

use std::sync::Mutex;

use serde::Deserialize;

/// Copyable view of the HUD state.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HudSnapshot {
    /// Title of the last notification from the robot.
    pub notification_title: String,
    /// Body of the last notification.
    pub notification_message: String,
    /// Severity label of the last notification.
    pub notification_severity: String,
    /// Robot-reported teleoperation latency, µs.
    pub teleoperation_latency: i64,
    /// Robot-reported vehicle speed.
    pub vehicle_speed: f32,
    /// Robot-reported teleoperation state label.
    pub teleoperation_state: String,
}

/// Inbound teleoperation-state document.
///
/// Every field is optional; absent fields leave the previous HUD values
/// intact.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TeleoperationUpdate {
    /// Notification triple.
    pub notification: Option<NotificationUpdate>,
    /// Teleoperation state triple.
    pub teleoperation_state: Option<TeleoperationStateUpdate>,
}

/// Notification fields of an update.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NotificationUpdate {
    /// Notification title.
    pub title: Option<String>,
    /// Notification body.
    pub message: Option<String>,
    /// Severity label.
    pub severity: Option<String>,
}

/// Teleoperation fields of an update.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TeleoperationStateUpdate {
    /// Latency, µs.
    pub latency: Option<i64>,
    /// Vehicle speed.
    pub speed: Option<f32>,
    /// State label.
    pub state: Option<String>,
}

/// Shared HUD state.
#[derive(Debug, Default)]
pub struct HudState {
    inner: Mutex<HudSnapshot>,
}

impl HudState {
    /// Create empty state.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy the current values.
    #[must_use]
    pub fn snapshot(&self) -> HudSnapshot {
        self.inner.lock().expect("HUD state mutex poisoned").clone()
    }

    /// Fold an inbound update into the state.
    pub fn apply(&self, update: &TeleoperationUpdate) {
        let mut state = self.inner.lock().expect("HUD state mutex poisoned");

        if let Some(notification) = &update.notification {
            if let Some(title) = &notification.title {
                state.notification_title.clone_from(title);
            }
            if let Some(message) = &notification.message {
                state.notification_message.clone_from(message);
            }
            if let Some(severity) = &notification.severity {
                state.notification_severity.clone_from(severity);
            }
        }

        if let Some(teleop) = &update.teleoperation_state {
            if let Some(latency) = teleop.latency {
                state.teleoperation_latency = latency;
            }
            if let Some(speed) = teleop.speed {
                state.vehicle_speed = speed;
            }
            if let Some(label) = &teleop.state {
                state.teleoperation_state.clone_from(label);
            }
        }
    }
}
