use crate::ipc::error::{err, ok};
use crate::ipc::helpers::{param_i64, param_str};
use crate::ipc::types::{AppState, Request};
use crate::quiz::{Difficulty, QuizSession};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde_json::json;
use tracing::debug;
use uuid::Uuid;

fn session_json(id: &str, s: &QuizSession, state: &AppState) -> serde_json::Value {
    let finished = s.is_finished();
    json!({
        "sessionId": id,
        "difficulty": s.difficulty(),
        "questionNumber": s.question_number(),
        "totalQuestions": s.total_questions(),
        "score": s.score(),
        "maxScore": s.max_score(),
        "prompt": s.current().map(|q| q.prompt()),
        "finished": finished,
        "rank": finished.then(|| s.rank(&state.grading.exam)),
    })
}

fn handle_start(state: &mut AppState, req: &Request) -> serde_json::Value {
    let raw = param_str(&req.params, "difficulty").unwrap_or("");
    let Some(difficulty) = Difficulty::parse(raw) else {
        return err(
            &req.id,
            "bad_params",
            "difficulty must be easy, moderate or advanced",
            None,
        );
    };
    let session = QuizSession::new(
        difficulty,
        state.config.quiz_questions,
        StdRng::from_rng(&mut state.rng),
    );
    let id = Uuid::new_v4().to_string();
    let resp = session_json(&id, &session, state);
    debug!(session = %id, "quiz started");
    state.quizzes.insert(id, session);
    ok(&req.id, resp)
}

fn handle_answer(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(id) = param_str(&req.params, "sessionId").map(str::to_string) else {
        return err(&req.id, "bad_params", "missing sessionId", None);
    };
    let given = match param_i64(&req.params, "answer") {
        Ok(v) => v,
        Err(m) => return err(&req.id, "bad_params", m, None),
    };
    let Some(session) = state.quizzes.get_mut(&id) else {
        return err(&req.id, "no_session", format!("no quiz session {id}"), None);
    };
    let outcome = match session.answer(given) {
        Ok(o) => o,
        Err(e) => return err(&req.id, "bad_params", e.to_string(), None),
    };

    let Some(session) = state.quizzes.get(&id) else {
        return err(&req.id, "no_session", format!("no quiz session {id}"), None);
    };
    let mut resp = session_json(&id, session, state);
    resp["outcome"] = json!(outcome);
    if session.is_finished() {
        state.quizzes.remove(&id);
    }
    ok(&req.id, resp)
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "quiz.start" => Some(handle_start(state, req)),
        "quiz.answer" => Some(handle_answer(state, req)),
        _ => None,
    }
}
