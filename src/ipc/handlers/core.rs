use crate::ipc::error::{err, ok};
use crate::ipc::helpers::param_str;
use crate::ipc::types::{AppState, Request};
use crate::records::Schema;
use crate::store::{LoadSource, Roster};
use serde_json::json;
use std::path::PathBuf;
use tracing::info;

fn load_json(source: &LoadSource, count: usize) -> serde_json::Value {
    let mut out = json!({
        "source": source.as_str(),
        "count": count,
    });
    if let LoadSource::Fallback { reason } = source {
        out["warning"] = json!(reason);
    }
    out
}

fn handle_health(state: &mut AppState, req: &Request) -> serde_json::Value {
    ok(
        &req.id,
        json!({
            "version": env!("CARGO_PKG_VERSION"),
            "dataFile": state.roster.path().to_string_lossy(),
            "schema": state.roster.schema().as_str(),
            "count": state.roster.len(),
            "readOnly": state.roster.is_read_only(),
            "load": load_json(&state.last_load, state.roster.len()),
        }),
    )
}

fn handle_store_open(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(path) = param_str(&req.params, "path").map(PathBuf::from) else {
        return err(&req.id, "bad_params", "missing params.path", None);
    };
    let schema = match param_str(&req.params, "schema") {
        None => state.roster.schema(),
        Some(s) => match Schema::parse(s) {
            Some(v) => v,
            None => {
                return err(
                    &req.id,
                    "bad_params",
                    format!("unknown schema: {s}"),
                    None,
                )
            }
        },
    };

    let (roster, source) = Roster::open(path, schema);
    info!(path = %roster.path().display(), schema = schema.as_str(), "opened data file");
    state.roster = roster;
    state.last_load = source;
    ok(
        &req.id,
        json!({
            "dataFile": state.roster.path().to_string_lossy(),
            "schema": schema.as_str(),
            "load": load_json(&state.last_load, state.roster.len()),
        }),
    )
}

fn handle_store_reload(state: &mut AppState, req: &Request) -> serde_json::Value {
    state.last_load = state.roster.reload();
    ok(
        &req.id,
        json!({ "load": load_json(&state.last_load, state.roster.len()) }),
    )
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "health" => Some(handle_health(state, req)),
        "store.open" => Some(handle_store_open(state, req)),
        "store.reload" => Some(handle_store_reload(state, req)),
        _ => None,
    }
}
