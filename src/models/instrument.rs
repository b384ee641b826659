use serde::{Deserialize, Serialize};
use std::fmt;

/// Instrument class; selects the upstream endpoint family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum InstrumentKind {
    #[default]
    #[serde(alias = "stock")]
    Equity,
    #[serde(alias = "etf")]
    Fund,
}

impl InstrumentKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            InstrumentKind::Equity => "equity",
            InstrumentKind::Fund => "fund",
        }
    }

    /// Accepts both the canonical names and the legacy `stock`/`etf` labels.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "equity" | "stock" => Some(InstrumentKind::Equity),
            "fund" | "etf" => Some(InstrumentKind::Fund),
            _ => None,
        }
    }
}

impl fmt::Display for InstrumentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A watched instrument. Created and deleted outside this crate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Instrument {
    pub code: String,
    pub display_name: String,
    pub kind: InstrumentKind,
    /// Owner whose notify target receives the alerts.
    #[serde(default = "default_user_id")]
    pub user_id: i64,
}

fn default_user_id() -> i64 {
    1
}

impl Instrument {
    pub fn new(code: impl Into<String>, display_name: impl Into<String>, kind: InstrumentKind) -> Self {
        Self {
            code: code.into(),
            display_name: display_name.into(),
            kind,
            user_id: default_user_id(),
        }
    }

    pub fn with_user(mut self, user_id: i64) -> Self {
        self.user_id = user_id;
        self
    }
}
