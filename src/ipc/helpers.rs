use serde_json::{json, Value};

use crate::calc::{self, Grading};
use crate::records::{Schema, StudentCode, StudentRecord, COURSEWORK_ITEMS};

/// Optional whole number. Numeric strings are accepted since front-ends
/// often hand over raw text-field contents.
pub fn param_u32(params: &Value, key: &str) -> Result<Option<u32>, String> {
    match params.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Number(n)) => n
            .as_u64()
            .and_then(|v| u32::try_from(v).ok())
            .map(Some)
            .ok_or_else(|| format!("{key} must be a whole number")),
        Some(Value::String(s)) => s
            .trim()
            .parse::<u32>()
            .map(Some)
            .map_err(|_| format!("{key} must be a whole number")),
        Some(_) => Err(format!("{key} must be a whole number")),
    }
}

pub fn require_u32(params: &Value, key: &str) -> Result<u32, String> {
    param_u32(params, key)?.ok_or_else(|| format!("missing {key}"))
}

pub fn param_i64(params: &Value, key: &str) -> Result<i64, String> {
    match params.get(key) {
        Some(Value::Number(n)) => n
            .as_i64()
            .ok_or_else(|| format!("{key} must be a whole number")),
        Some(Value::String(s)) => s
            .trim()
            .parse::<i64>()
            .map_err(|_| format!("{key} must be a whole number")),
        None | Some(Value::Null) => Err(format!("missing {key}")),
        Some(_) => Err(format!("{key} must be a whole number")),
    }
}

pub fn param_str<'a>(params: &'a Value, key: &str) -> Option<&'a str> {
    params.get(key).and_then(|v| v.as_str())
}

pub fn param_code(params: &Value, key: &str, schema: Schema) -> Result<Option<StudentCode>, String> {
    match params.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Number(n)) => {
            let raw = n.to_string();
            schema.parse_code(&raw).map(Some).map_err(|e| e.to_string())
        }
        Some(Value::String(s)) => schema.parse_code(s).map(Some).map_err(|e| e.to_string()),
        Some(_) => Err(format!("{key} must be a string or number")),
    }
}

pub fn require_code(params: &Value, key: &str, schema: Schema) -> Result<StudentCode, String> {
    param_code(params, key, schema)?.ok_or_else(|| format!("missing {key}"))
}

pub fn param_course_marks(
    params: &Value,
    key: &str,
) -> Result<Option<[u32; COURSEWORK_ITEMS]>, String> {
    let v = match params.get(key) {
        None | Some(Value::Null) => return Ok(None),
        Some(v) => v,
    };
    let Some(items) = v.as_array() else {
        return Err(format!("{key} must be an array of {COURSEWORK_ITEMS} marks"));
    };
    if items.len() != COURSEWORK_ITEMS {
        return Err(format!("{key} must be an array of {COURSEWORK_ITEMS} marks"));
    }
    let mut out = [0u32; COURSEWORK_ITEMS];
    for (i, item) in items.iter().enumerate() {
        let wrapped = json!({ "mark": item });
        out[i] = require_u32(&wrapped, "mark").map_err(|_| format!("{key}[{i}] must be a whole number"))?;
    }
    Ok(Some(out))
}

pub fn student_json(record: &StudentRecord, grading: &Grading) -> Value {
    json!({
        "code": record.code(),
        "name": record.name(),
        "courseMarks": record.course_marks(),
        "examMark": record.exam_mark(),
        "stats": calc::stats_for(record, grading),
    })
}

pub fn students_json<'a, I>(records: I, grading: &Grading) -> Vec<Value>
where
    I: IntoIterator<Item = &'a StudentRecord>,
{
    records
        .into_iter()
        .map(|r| student_json(r, grading))
        .collect()
}
