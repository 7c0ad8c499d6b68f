use crate::ipc::error::{err, ok};
use crate::ipc::types::{AppState, Request};
use serde_json::json;
use tracing::warn;

fn handle_next(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(joke) = state.jokes.pick(&mut state.rng) else {
        warn!("no jokes available");
        return err(&req.id, "not_found", "no jokes available", None);
    };
    ok(
        &req.id,
        json!({
            "joke": joke,
            "builtin": !state.jokes.from_file(),
        }),
    )
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "jokes.next" => Some(handle_next(state, req)),
        _ => None,
    }
}
