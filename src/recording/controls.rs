//! Enablement state of the start and stop controls.

/// Which of the two recording controls currently accepts input.
///
/// Derived from whether a capture session exists. Exactly one control is
/// enabled at any time: start while idle, stop while recording.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Controls {
    start_enabled: bool,
    stop_enabled: bool,
}

impl Controls {
    /// Initial state: start enabled, stop disabled.
    pub const fn idle() -> Self {
        Self {
            start_enabled: true,
            stop_enabled: false,
        }
    }

    /// State while a session is active: start disabled, stop enabled.
    pub const fn recording() -> Self {
        Self {
            start_enabled: false,
            stop_enabled: true,
        }
    }

    pub const fn for_session(active: bool) -> Self {
        if active {
            Self::recording()
        } else {
            Self::idle()
        }
    }

    pub fn start_enabled(&self) -> bool {
        self.start_enabled
    }

    pub fn stop_enabled(&self) -> bool {
        self.stop_enabled
    }
}

impl Default for Controls {
    fn default() -> Self {
        Self::idle()
    }
}
