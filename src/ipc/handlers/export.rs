use crate::export::{write_workbook, DEFAULT_EXPORT_FILENAME};
use crate::ipc::error::{err, ok};
use crate::ipc::types::{AppState, Request};
use chrono::Utc;
use serde_json::json;
use std::path::PathBuf;

fn handle_write(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(roster) = state.roster.as_ref() else {
        return err(&req.id, "no_roster", "load a roster first", None);
    };

    let path = req
        .params
        .get("path")
        .and_then(|v| v.as_str())
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_EXPORT_FILENAME));

    match write_workbook(roster, state.allocation.rooms(), &path) {
        Ok(()) => ok(
            &req.id,
            json!({
                "path": path.to_string_lossy(),
                "roomCount": state.allocation.rooms().len(),
                "studentCount": state.allocation.allocated_count(),
                "generatedAt": Utc::now().to_rfc3339(),
            }),
        ),
        Err(e) => err(&req.id, "export_failed", format!("{e:#}"), None),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "export.write" => Some(handle_write(state, req)),
        _ => None,
    }
}
