use crate::calc::{GradeScale, Grading};
use crate::quiz::DEFAULT_QUESTIONS;
use crate::records::Schema;
use anyhow::Context;
use serde::Deserialize;
use std::path::{Path, PathBuf};

pub const CONFIG_ENV: &str = "MARKSD_CONFIG";
pub const DATA_FILE_ENV: &str = "MARKSD_DATA_FILE";

/// Sidecar settings. Every field has a default, so an empty `{}` file (or no
/// file at all) is a valid configuration.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", default, deny_unknown_fields)]
pub struct Config {
    pub data_file: PathBuf,
    pub schema: Schema,
    pub coursework_grades: GradeScale,
    pub exam_grades: GradeScale,
    pub jokes_file: PathBuf,
    pub quiz_questions: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_file: PathBuf::from("studentMarks.txt"),
            schema: Schema::Coursework,
            coursework_grades: GradeScale::coursework(),
            exam_grades: GradeScale::exam(),
            jokes_file: PathBuf::from("randomJokes.txt"),
            quiz_questions: DEFAULT_QUESTIONS,
        }
    }
}

impl Config {
    pub fn from_json(text: &str) -> anyhow::Result<Config> {
        let cfg: Config = serde_json::from_str(text).context("invalid config json")?;
        if cfg.quiz_questions == 0 {
            anyhow::bail!("quizQuestions must be at least 1");
        }
        Ok(cfg)
    }

    pub fn from_file(path: &Path) -> anyhow::Result<Config> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config {}", path.to_string_lossy()))?;
        Config::from_json(&text)
            .with_context(|| format!("failed to load config {}", path.to_string_lossy()))
    }

    /// Resolve the effective config: an explicit path wins over
    /// `MARKSD_CONFIG`; `MARKSD_DATA_FILE` then overrides the data file.
    pub fn resolve(explicit: Option<PathBuf>) -> anyhow::Result<Config> {
        let path = explicit.or_else(|| std::env::var_os(CONFIG_ENV).map(PathBuf::from));
        let mut cfg = match path {
            Some(p) => Config::from_file(&p)?,
            None => Config::default(),
        };
        if let Some(data) = std::env::var_os(DATA_FILE_ENV) {
            cfg.data_file = PathBuf::from(data);
        }
        Ok(cfg)
    }

    pub fn grading(&self) -> Grading {
        Grading {
            coursework: self.coursework_grades.clone(),
            exam: self.exam_grades.clone(),
        }
    }
}

/// Pull `--config <path>` out of the process arguments.
pub fn config_arg<I>(args: I) -> anyhow::Result<Option<PathBuf>>
where
    I: IntoIterator<Item = String>,
{
    let mut it = args.into_iter();
    while let Some(a) = it.next() {
        if a == "--config" {
            let v = it.next().context("--config needs a path")?;
            return Ok(Some(PathBuf::from(v)));
        }
        if let Some(v) = a.strip_prefix("--config=") {
            return Ok(Some(PathBuf::from(v)));
        }
    }
    Ok(None)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_object_is_all_defaults() {
        assert_eq!(Config::from_json("{}").expect("config"), Config::default());
    }

    #[test]
    fn partial_config_overrides_named_fields() {
        let cfg = Config::from_json(
            r#"{
                "dataFile": "roster.txt",
                "schema": "examOnly",
                "examGrades": { "tiers": [{ "min": 75, "letter": "Distinction" }, { "min": 40, "letter": "Pass" }] }
            }"#,
        )
        .expect("config");
        assert_eq!(cfg.data_file, PathBuf::from("roster.txt"));
        assert_eq!(cfg.schema, Schema::ExamOnly);
        assert_eq!(cfg.exam_grades.grade_for(80.0), "Distinction");
        assert_eq!(cfg.exam_grades.grade_for(10.0), "F");
        assert_eq!(cfg.coursework_grades, GradeScale::coursework());
    }

    #[test]
    fn unknown_fields_and_zero_questions_are_rejected() {
        assert!(Config::from_json(r#"{ "colour": "blue" }"#).is_err());
        assert!(Config::from_json(r#"{ "quizQuestions": 0 }"#).is_err());
    }

    #[test]
    fn config_arg_accepts_both_spellings() {
        let args = |v: &[&str]| v.iter().map(|s| s.to_string()).collect::<Vec<_>>();
        assert_eq!(
            config_arg(args(&["marksd", "--config", "a.json"])).expect("arg"),
            Some(PathBuf::from("a.json"))
        );
        assert_eq!(
            config_arg(args(&["marksd", "--config=b.json"])).expect("arg"),
            Some(PathBuf::from("b.json"))
        );
        assert_eq!(config_arg(args(&["marksd"])).expect("arg"), None);
        assert!(config_arg(args(&["marksd", "--config"])).is_err());
    }
}
