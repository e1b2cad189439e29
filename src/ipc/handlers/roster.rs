use crate::ipc::error::{err, ok};
use crate::ipc::types::{AppState, Request};
use crate::roster::{load_roster, ColumnRules};
use serde_json::json;
use std::path::PathBuf;

fn parse_rules(params: &serde_json::Value) -> Result<ColumnRules, String> {
    let mut rules = ColumnRules::default();
    let Some(raw) = params.get("rules") else {
        return Ok(rules);
    };
    if raw.is_null() {
        return Ok(rules);
    }
    let Some(obj) = raw.as_object() else {
        return Err("rules must be an object".to_string());
    };

    if let Some(v) = obj.get("identifier") {
        rules.identifier = v
            .as_str()
            .ok_or("rules.identifier must be a string")?
            .to_string();
    }
    if let Some(v) = obj.get("name") {
        rules.name = v.as_str().ok_or("rules.name must be a string")?.to_string();
    }
    if let Some(v) = obj.get("extraTimeContains") {
        rules.extra_time_contains = v
            .as_str()
            .ok_or("rules.extraTimeContains must be a string")?
            .to_string();
    }
    if let Some(v) = obj.get("accommodations") {
        let arr = v.as_array().ok_or("rules.accommodations must be an array")?;
        let mut labels = Vec::with_capacity(arr.len());
        for item in arr {
            labels.push(
                item.as_str()
                    .ok_or("rules.accommodations entries must be strings")?
                    .to_string(),
            );
        }
        rules.accommodations = labels;
    }
    Ok(rules)
}

fn handle_load(state: &mut AppState, req: &Request) -> serde_json::Value {
    let path = req
        .params
        .get("path")
        .and_then(|v| v.as_str())
        .map(PathBuf::from);
    let Some(path) = path else {
        return err(&req.id, "bad_params", "missing params.path", None);
    };

    let rules = match parse_rules(&req.params) {
        Ok(r) => r,
        Err(msg) => return err(&req.id, "bad_params", msg, None),
    };

    match load_roster(&path, &rules) {
        Ok(roster) => {
            // Rooms slice the table they were created from; a fresh table
            // always starts with a fresh allocation.
            state.allocation.reset();
            let columns = roster.columns.clone();
            let count = roster.len();
            state.roster = Some(roster);
            ok(
                &req.id,
                json!({
                    "columns": columns,
                    "studentCount": count,
                }),
            )
        }
        Err(e) => err(&req.id, "parse_failed", format!("{e:#}"), None),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "roster.load" => Some(handle_load(state, req)),
        _ => None,
    }
}
