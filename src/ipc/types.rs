use std::collections::HashMap;

use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::Deserialize;

use crate::calc::Grading;
use crate::config::Config;
use crate::jokes::JokeBook;
use crate::quiz::QuizSession;
use crate::store::{LoadSource, Roster};

#[derive(Debug, Deserialize, Clone)]
pub struct Request {
    pub id: String,
    pub method: String,
    #[serde(default)]
    pub params: serde_json::Value,
}

pub struct AppState {
    pub config: Config,
    pub grading: Grading,
    pub roster: Roster,
    pub last_load: LoadSource,
    pub jokes: JokeBook,
    pub quizzes: HashMap<String, QuizSession>,
    pub rng: StdRng,
}

impl AppState {
    pub fn new(config: Config) -> AppState {
        let (roster, last_load) = Roster::open(config.data_file.clone(), config.schema);
        let jokes = JokeBook::load(&config.jokes_file);
        AppState {
            grading: config.grading(),
            config,
            roster,
            last_load,
            jokes,
            quizzes: HashMap::new(),
            rng: StdRng::from_rng(&mut rand::rng()),
        }
    }
}
