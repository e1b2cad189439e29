use crate::ipc::error::{err, ok};
use crate::ipc::types::{AppState, Request};
use serde_json::json;

fn handle_add(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(roster) = state.roster.as_ref() else {
        return err(&req.id, "no_roster", "load a roster first", None);
    };
    let total = roster.len();

    let name = match req.params.get("name").and_then(|v| v.as_str()) {
        Some(v) if !v.trim().is_empty() => v.trim().to_string(),
        Some(_) => return err(&req.id, "bad_params", "name must not be empty", None),
        None => return err(&req.id, "bad_params", "missing name", None),
    };

    // Input-layer bound: 1 <= count <= studentCount. The allocator still
    // re-validates the remaining capacity below. With an empty table the
    // upper bound is meaningless and the allocator reports the shortfall.
    let count = match req.params.get("count").and_then(|v| v.as_u64()) {
        Some(v) => v as usize,
        None => return err(&req.id, "bad_params", "count must be a positive integer", None),
    };
    if count < 1 || (total > 0 && count > total) {
        return err(
            &req.id,
            "bad_params",
            format!("count must be between 1 and {total}"),
            None,
        );
    }

    match state.allocation.add_room(&name, count, total) {
        Ok(room) => {
            let allocated = state.allocation.allocated_count();
            ok(
                &req.id,
                json!({
                    "room": room,
                    "allocatedCount": allocated,
                    "remainingCount": total - allocated,
                }),
            )
        }
        Err(e) => err(
            &req.id,
            "capacity_exceeded",
            e.to_string(),
            Some(json!({
                "requested": e.requested,
                "remaining": e.remaining,
            })),
        ),
    }
}

fn handle_reset(state: &mut AppState, req: &Request) -> serde_json::Value {
    state.allocation.reset();
    ok(&req.id, json!({ "allocatedCount": 0 }))
}

fn handle_list(state: &mut AppState, req: &Request) -> serde_json::Value {
    let total = state.roster.as_ref().map(|r| r.len()).unwrap_or(0);
    let allocated = state.allocation.allocated_count();
    ok(
        &req.id,
        json!({
            "rooms": state.allocation.rooms(),
            "allocatedCount": allocated,
            "totalCount": total,
            "complete": state.allocation.is_complete(total),
        }),
    )
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "rooms.add" => Some(handle_add(state, req)),
        "rooms.reset" => Some(handle_reset(state, req)),
        "rooms.list" => Some(handle_list(state, req)),
        _ => None,
    }
}
