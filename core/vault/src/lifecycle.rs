//! App lifecycle and focus signals forwarded by the host.

use serde::{Deserialize, Serialize};

/// Signal from the host application or window system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LifecycleEvent {
    /// App returned to the foreground.
    Foreground,
    /// App went to the background.
    Background,
    /// The vault screen lost focus (user navigated away).
    FocusLost,
    /// The vault screen regained focus.
    FocusGained,
}

impl LifecycleEvent {
    /// Whether the user has left the vault.
    pub fn is_leave(&self) -> bool {
        matches!(self, LifecycleEvent::Background | LifecycleEvent::FocusLost)
    }
}
