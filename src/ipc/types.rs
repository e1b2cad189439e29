use serde::Deserialize;

use crate::allocate::Allocation;
use crate::roster::Roster;

#[derive(Debug, Deserialize, Clone)]
pub struct Request {
    pub id: String,
    pub method: String,
    #[serde(default)]
    pub params: serde_json::Value,
}

/// Per-session state. One process owns exactly one of these, so concurrent
/// sessions (separate processes) are isolated by construction.
#[derive(Default)]
pub struct AppState {
    pub roster: Option<Roster>,
    pub allocation: Allocation,
}
