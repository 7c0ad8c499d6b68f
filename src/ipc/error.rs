use crate::store::StoreError;
use serde_json::json;

pub fn ok(id: &str, result: serde_json::Value) -> serde_json::Value {
    json!({
        "id": id,
        "ok": true,
        "result": result
    })
}

pub fn err(
    id: &str,
    code: &str,
    message: impl Into<String>,
    details: Option<serde_json::Value>,
) -> serde_json::Value {
    let mut error = json!({
        "code": code,
        "message": message.into(),
    });
    if let Some(d) = details {
        error["details"] = d;
    }
    json!({
        "id": id,
        "ok": false,
        "error": error,
    })
}

pub fn store_err(id: &str, e: &StoreError) -> serde_json::Value {
    match e {
        StoreError::DuplicateCode(code) => err(
            id,
            "duplicate_code",
            e.to_string(),
            Some(json!({ "code": code })),
        ),
        StoreError::NotFound(code) => {
            err(id, "not_found", e.to_string(), Some(json!({ "code": code })))
        }
        StoreError::Invalid(_) => err(id, "invalid_record", e.to_string(), None),
        StoreError::Write { path, .. } => err(
            id,
            "save_failed",
            e.to_string(),
            Some(json!({ "path": path.to_string_lossy() })),
        ),
        StoreError::ReadOnly { reason } => err(
            id,
            "load_failed",
            e.to_string(),
            Some(json!({ "reason": reason })),
        ),
        StoreError::Read { .. }
        | StoreError::BadCount(_)
        | StoreError::BadRecord { .. }
        | StoreError::RepeatedCode { .. } => err(id, "load_failed", e.to_string(), None),
    }
}
