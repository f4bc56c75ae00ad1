use serde::{Deserialize, Serialize};

/// Which of an endpoint's window events are embedded in the aggregate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SelectionPolicy {
    /// Every event of the window.
    #[default]
    All,
    /// Only the earliest event.
    First,
    /// Only the latest event.
    Last,
    /// The earliest and the latest event, once if they are the same.
    Boundaries,
}

impl SelectionPolicy {
    pub const ALL: [SelectionPolicy; 4] = [
        SelectionPolicy::All,
        SelectionPolicy::First,
        SelectionPolicy::Last,
        SelectionPolicy::Boundaries,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SelectionPolicy::All => "ALL",
            SelectionPolicy::First => "FIRST",
            SelectionPolicy::Last => "LAST",
            SelectionPolicy::Boundaries => "BOUNDARIES",
        }
    }

    /// Parse the exact configuration token. Lowercase tokens are rejected.
    pub fn from_token(token: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|p| p.as_str() == token)
    }
}

impl std::fmt::Display for SelectionPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How a trigger cycle is started.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TriggerType {
    /// Automatic trigger once every endpoint is satisfied over the
    /// observation period.
    Window,
    /// No automatic evaluation; only explicit API calls trigger.
    None,
}

impl TriggerType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TriggerType::Window => "window",
            TriggerType::None => "none",
        }
    }

    pub fn from_token(token: &str) -> Option<Self> {
        match token {
            "window" => Some(TriggerType::Window),
            "none" => Some(TriggerType::None),
            _ => None,
        }
    }
}

impl std::fmt::Display for TriggerType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
