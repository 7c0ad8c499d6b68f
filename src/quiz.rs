use crate::calc::GradeScale;
use rand::rngs::StdRng;
use rand::Rng;
use serde::Serialize;
use std::ops::RangeInclusive;
use thiserror::Error;

pub const DEFAULT_QUESTIONS: u32 = 10;
pub const FIRST_TRY_POINTS: u32 = 10;
pub const SECOND_TRY_POINTS: u32 = 5;
const MAX_ATTEMPTS: u32 = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Difficulty {
    Easy,
    Moderate,
    Advanced,
}

impl Difficulty {
    pub fn parse(s: &str) -> Option<Difficulty> {
        match s.trim().to_ascii_lowercase().as_str() {
            "easy" | "basic" | "1" => Some(Difficulty::Easy),
            "moderate" | "intermediate" | "2" => Some(Difficulty::Moderate),
            "advanced" | "expert" | "3" => Some(Difficulty::Advanced),
            _ => None,
        }
    }

    /// Operand range: single, double or triple digit.
    pub fn operands(self) -> RangeInclusive<i64> {
        match self {
            Difficulty::Easy => 1..=9,
            Difficulty::Moderate => 10..=99,
            Difficulty::Advanced => 100..=999,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Add,
    Subtract,
}

impl Operation {
    pub fn symbol(self) -> char {
        match self {
            Operation::Add => '+',
            Operation::Subtract => '-',
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Question {
    pub left: i64,
    pub right: i64,
    pub op: Operation,
}

impl Question {
    pub fn answer(&self) -> i64 {
        match self.op {
            Operation::Add => self.left + self.right,
            Operation::Subtract => self.left - self.right,
        }
    }

    pub fn prompt(&self) -> String {
        format!("{} {} {} = ?", self.left, self.op.symbol(), self.right)
    }

    fn random(difficulty: Difficulty, rng: &mut StdRng) -> Question {
        let left = rng.random_range(difficulty.operands());
        let right = rng.random_range(difficulty.operands());
        let op = if rng.random_bool(0.5) {
            Operation::Add
        } else {
            Operation::Subtract
        };
        Question { left, right, op }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum AnswerOutcome {
    Correct { points: u32 },
    TryAgain,
    /// Second miss: the question is over and scores nothing.
    Revealed { answer: i64 },
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum QuizError {
    #[error("the quiz is already finished")]
    Finished,
}

/// One run of the arithmetic drill.
pub struct QuizSession {
    difficulty: Difficulty,
    total_questions: u32,
    asked: u32,
    attempts: u32,
    score: u32,
    current: Option<Question>,
    rng: StdRng,
}

impl QuizSession {
    pub fn new(difficulty: Difficulty, total_questions: u32, mut rng: StdRng) -> Self {
        let current = (total_questions > 0).then(|| Question::random(difficulty, &mut rng));
        Self {
            difficulty,
            total_questions,
            asked: 0,
            attempts: 0,
            score: 0,
            current,
            rng,
        }
    }

    pub fn difficulty(&self) -> Difficulty {
        self.difficulty
    }

    pub fn score(&self) -> u32 {
        self.score
    }

    pub fn max_score(&self) -> u32 {
        self.total_questions * FIRST_TRY_POINTS
    }

    pub fn total_questions(&self) -> u32 {
        self.total_questions
    }

    /// 1-based number of the question on screen.
    pub fn question_number(&self) -> u32 {
        (self.asked + 1).min(self.total_questions)
    }

    pub fn current(&self) -> Option<&Question> {
        self.current.as_ref()
    }

    pub fn is_finished(&self) -> bool {
        self.current.is_none()
    }

    pub fn answer(&mut self, given: i64) -> Result<AnswerOutcome, QuizError> {
        let Some(q) = self.current else {
            return Err(QuizError::Finished);
        };
        self.attempts += 1;

        let outcome = if given == q.answer() {
            let points = if self.attempts == 1 {
                FIRST_TRY_POINTS
            } else {
                SECOND_TRY_POINTS
            };
            self.score += points;
            AnswerOutcome::Correct { points }
        } else if self.attempts < MAX_ATTEMPTS {
            return Ok(AnswerOutcome::TryAgain);
        } else {
            AnswerOutcome::Revealed { answer: q.answer() }
        };

        self.advance();
        Ok(outcome)
    }

    fn advance(&mut self) {
        self.asked += 1;
        self.attempts = 0;
        self.current = if self.asked < self.total_questions {
            Some(Question::random(self.difficulty, &mut self.rng))
        } else {
            None
        };
    }

    /// Letter rank on the share of the maximum score.
    pub fn rank(&self, scale: &GradeScale) -> String {
        let max = self.max_score();
        let pct = if max > 0 {
            100.0 * f64::from(self.score) / f64::from(max)
        } else {
            0.0
        };
        scale.grade_for(pct).to_string()
    }
}
