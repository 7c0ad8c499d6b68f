use crate::calc::{self, Band};
use crate::ipc::error::{err, ok, store_err};
use crate::ipc::helpers::{
    param_code, param_course_marks, param_str, param_u32, require_code, require_u32,
    student_json, students_json,
};
use crate::ipc::types::{AppState, Request};
use crate::records::{Schema, StudentCode, StudentRecord};
use crate::store::{RecordUpdate, SortKey};
use serde_json::json;
use tracing::{info, warn};

fn handle_list(state: &mut AppState, req: &Request) -> serde_json::Value {
    let records = state.roster.records();
    ok(
        &req.id,
        json!({
            "students": students_json(records, &state.grading),
            "summary": {
                "count": records.len(),
                "averagePercentage": calc::average_percentage(records),
            }
        }),
    )
}

fn handle_get(state: &mut AppState, req: &Request) -> serde_json::Value {
    let code = match require_code(&req.params, "code", state.roster.schema()) {
        Ok(v) => v,
        Err(m) => return err(&req.id, "bad_params", m, None),
    };
    let Some(rec) = state.roster.find_by_code(&code) else {
        return err(
            &req.id,
            "not_found",
            format!("no student with code {code}"),
            None,
        );
    };
    ok(
        &req.id,
        json!({
            "student": student_json(rec, &state.grading),
            "breakdown": calc::breakdown(rec),
        }),
    )
}

fn handle_find(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(name) = param_str(&req.params, "name") else {
        return err(&req.id, "bad_params", "missing name", None);
    };
    let found = state.roster.find_by_name(name);
    ok(
        &req.id,
        json!({ "students": students_json(found, &state.grading) }),
    )
}

fn build_record(state: &AppState, req: &Request) -> Result<StudentRecord, serde_json::Value> {
    let bad = |m: String| err(&req.id, "bad_params", m, None);
    let schema = state.roster.schema();
    let Some(name) = param_str(&req.params, "name") else {
        return Err(bad("missing name".into()));
    };
    let exam = require_u32(&req.params, "examMark").map_err(bad)?;

    let built = match schema {
        Schema::Coursework => {
            let code = match require_code(&req.params, "code", schema).map_err(bad)? {
                StudentCode::Number(n) => n,
                StudentCode::Text(t) => return Err(bad(format!("bad code: {t}"))),
            };
            let Some(course) = param_course_marks(&req.params, "courseMarks").map_err(bad)? else {
                return Err(bad("missing courseMarks".into()));
            };
            StudentRecord::coursework(code, name, course, exam)
        }
        Schema::ExamOnly => {
            let code = require_code(&req.params, "code", schema).map_err(bad)?;
            let grade = state.grading.exam.grade_for(f64::from(exam));
            StudentRecord::exam_only(&code.to_string(), name, exam, grade)
        }
    };
    built.map_err(|e| err(&req.id, "invalid_record", e.to_string(), None))
}

fn handle_create(state: &mut AppState, req: &Request) -> serde_json::Value {
    let record = match build_record(state, req) {
        Ok(r) => r,
        Err(resp) => return resp,
    };
    let code = record.code().clone();
    if let Err(e) = state.roster.add(record) {
        warn!("add student {code} failed: {e}");
        return store_err(&req.id, &e);
    }
    info!(%code, "student added");
    let student = state
        .roster
        .find_by_code(&code)
        .map(|r| student_json(r, &state.grading));
    ok(&req.id, json!({ "student": student }))
}

fn parse_update(req: &Request, schema: Schema) -> Result<(StudentCode, RecordUpdate), String> {
    let code = require_code(&req.params, "code", schema)?;
    let changes = RecordUpdate {
        code: param_code(&req.params, "newCode", schema)?,
        name: param_str(&req.params, "name").map(str::to_string),
        course_marks: param_course_marks(&req.params, "courseMarks")?,
        exam_mark: param_u32(&req.params, "examMark")?,
    };
    Ok((code, changes))
}

fn handle_update(state: &mut AppState, req: &Request) -> serde_json::Value {
    let (code, changes) = match parse_update(req, state.roster.schema()) {
        Ok(v) => v,
        Err(m) => return err(&req.id, "bad_params", m, None),
    };

    match state.roster.update(&code, &changes, &state.grading) {
        Ok(rec) => {
            info!(%code, "student updated");
            ok(
                &req.id,
                json!({ "student": student_json(rec, &state.grading) }),
            )
        }
        Err(e) => {
            warn!("update student {code} failed: {e}");
            store_err(&req.id, &e)
        }
    }
}

fn handle_delete(state: &mut AppState, req: &Request) -> serde_json::Value {
    // `index` deletes by position in the current order; otherwise by `code`.
    let result = match param_u32(&req.params, "index") {
        Ok(Some(idx)) => state.roster.remove_at(idx as usize),
        Ok(None) => match require_code(&req.params, "code", state.roster.schema()) {
            Ok(code) => state.roster.delete_by_code(&code),
            Err(m) => return err(&req.id, "bad_params", m, None),
        },
        Err(m) => return err(&req.id, "bad_params", m, None),
    };
    match result {
        Ok(Some(removed)) => {
            info!(code = %removed.code(), "student deleted");
            ok(
                &req.id,
                json!({ "deleted": true, "student": student_json(&removed, &state.grading) }),
            )
        }
        Ok(None) => ok(&req.id, json!({ "deleted": false })),
        Err(e) => {
            warn!("delete student failed: {e}");
            store_err(&req.id, &e)
        }
    }
}

fn handle_sort(state: &mut AppState, req: &Request) -> serde_json::Value {
    let key_raw = param_str(&req.params, "key").unwrap_or("name");
    let Some(key) = SortKey::parse(key_raw) else {
        return err(
            &req.id,
            "bad_params",
            format!("unknown sort key: {key_raw}"),
            None,
        );
    };
    let ascending = req
        .params
        .get("ascending")
        .and_then(|v| v.as_bool())
        .unwrap_or(true);

    if let Err(e) = state.roster.sort(key, ascending) {
        return store_err(&req.id, &e);
    }
    ok(
        &req.id,
        json!({ "students": students_json(state.roster.records(), &state.grading) }),
    )
}

fn handle_filter(state: &mut AppState, req: &Request) -> serde_json::Value {
    let band_raw = param_str(&req.params, "band").unwrap_or("");
    let Some(band) = Band::parse(band_raw) else {
        return err(
            &req.id,
            "bad_params",
            "band must be \"top\" or \"failing\"",
            None,
        );
    };
    let matched = calc::filter_band(state.roster.records(), band, &state.grading);
    ok(
        &req.id,
        json!({ "students": students_json(matched, &state.grading) }),
    )
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "students.list" => Some(handle_list(state, req)),
        "students.get" => Some(handle_get(state, req)),
        "students.find" => Some(handle_find(state, req)),
        "students.create" => Some(handle_create(state, req)),
        "students.update" => Some(handle_update(state, req)),
        "students.delete" => Some(handle_delete(state, req)),
        "students.sort" => Some(handle_sort(state, req)),
        "students.filter" => Some(handle_filter(state, req)),
        _ => None,
    }
}
