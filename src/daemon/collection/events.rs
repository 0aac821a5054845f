use serde::{Deserialize, Serialize};

/// Idle state as reported by the browser.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IdleState {
    Active,
    Idle,
    Locked,
}

/// A change in the browser that may affect which site is being timed.
///
/// Serialized with a `type` tag, for example `{"type":"tabActivated","url":"https://a.com/x"}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum BrowserEvent {
    /// The user switched to another tab.
    TabActivated { url: String },
    /// The active tab navigated somewhere else. Only sent for the active tab.
    TabUpdated { url: String },
    /// A browser window gained focus, with the url of its active tab, or every window lost focus.
    WindowFocusChanged { url: Option<String> },
    IdleStateChanged { state: IdleState },
}
