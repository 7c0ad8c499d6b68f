use crate::calc;
use crate::ipc::error::ok;
use crate::ipc::helpers::student_json;
use crate::ipc::types::{AppState, Request};
use crate::records::StudentRecord;
use serde_json::json;

fn handle_class(state: &mut AppState, req: &Request) -> serde_json::Value {
    let records = state.roster.records();
    // Empty roster: stats come back null rather than as an error.
    ok(
        &req.id,
        json!({
            "exam": calc::class_average_and_stddev(records),
            "averagePercentage": calc::average_percentage(records),
        }),
    )
}

fn handle_extremes(state: &mut AppState, req: &Request) -> serde_json::Value {
    let records = state.roster.records();
    let view = |r: Option<&StudentRecord>| {
        r.map(|r| {
            json!({
                "student": student_json(r, &state.grading),
                "breakdown": calc::breakdown(r),
            })
        })
    };
    ok(
        &req.id,
        json!({
            "highest": view(calc::highest_overall(records)),
            "lowest": view(calc::lowest_overall(records)),
        }),
    )
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "stats.class" => Some(handle_class(state, req)),
        "stats.extremes" => Some(handle_extremes(state, req)),
        _ => None,
    }
}
