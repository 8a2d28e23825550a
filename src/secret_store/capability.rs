use std::env;

use serde::Deserialize;
use serde::Serialize;

/// Outcome of a one-time check of whether a backend can serve calls.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum BackendCapability {
    Available,
    Unavailable(String),
}

impl BackendCapability {
    pub fn is_available(&self) -> bool {
        matches!(self, Self::Available)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, strum::Display)]
#[strum(serialize_all = "lowercase")]
pub enum HostOs {
    Linux,
    MacOs,
    Windows,
    Other,
}

/// What the host offers a native secret service.
///
/// On Linux the secret service is reached over the D-Bus session bus, which
/// only exists inside a desktop or login session. Headless hosts (SSH, CI,
/// containers) usually have neither a bus nor a display.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostEnvironment {
    pub os: HostOs,
    pub has_display: bool,
    pub has_session_bus: bool,
}

impl HostEnvironment {
    pub fn from_env() -> Self {
        let os = match env::consts::OS {
            "linux" => HostOs::Linux,
            "macos" => HostOs::MacOs,
            "windows" => HostOs::Windows,
            _ => HostOs::Other,
        };
        let is_set = |var: &str| env::var_os(var).is_some_and(|v| !v.is_empty());

        Self {
            os,
            has_display: is_set("DISPLAY") || is_set("WAYLAND_DISPLAY"),
            has_session_bus: is_set("DBUS_SESSION_BUS_ADDRESS"),
        }
    }

    /// A host without a native secret service, for tests and `--no-keychain`.
    pub fn headless() -> Self {
        Self {
            os: HostOs::Other,
            has_display: false,
            has_session_bus: false,
        }
    }

    /// Whether a native secret service can be expected, judged from the
    /// environment alone.
    pub fn native_capability(&self) -> BackendCapability {
        match self.os {
            HostOs::MacOs | HostOs::Windows => BackendCapability::Available,
            HostOs::Linux if self.has_session_bus || self.has_display => {
                BackendCapability::Available
            }
            HostOs::Linux => BackendCapability::Unavailable(
                "no D-Bus session bus or display in this login session".to_string(),
            ),
            HostOs::Other => {
                BackendCapability::Unavailable("no native secret service on this OS".to_string())
            }
        }
    }
}
