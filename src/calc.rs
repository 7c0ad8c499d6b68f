use crate::records::{Marks, StudentRecord, COURSEWORK_MAX, EXAM_MAX, TOTAL_POSSIBLE};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// One rung of a grade ladder: values `>= min` earn `letter`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GradeTier {
    pub min: f64,
    pub letter: String,
}

impl GradeTier {
    fn new(min: f64, letter: &str) -> Self {
        Self {
            min,
            letter: letter.to_string(),
        }
    }
}

/// A cutoff ladder. Tier order doesn't matter; the highest cutoff the value
/// reaches wins, so a value exactly on a cutoff gets the higher tier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GradeScale {
    pub tiers: Vec<GradeTier>,
    #[serde(default = "default_fallback")]
    pub fallback: String,
}

fn default_fallback() -> String {
    "F".to_string()
}

impl GradeScale {
    /// Ladder applied to overall coursework+exam percentages.
    pub fn coursework() -> Self {
        Self {
            tiers: vec![
                GradeTier::new(70.0, "A"),
                GradeTier::new(60.0, "B"),
                GradeTier::new(50.0, "C"),
                GradeTier::new(40.0, "D"),
            ],
            fallback: default_fallback(),
        }
    }

    /// Ladder applied to raw exam marks (and quiz scores).
    pub fn exam() -> Self {
        Self {
            tiers: vec![
                GradeTier::new(90.0, "A+"),
                GradeTier::new(80.0, "A"),
                GradeTier::new(70.0, "B"),
                GradeTier::new(60.0, "C"),
                GradeTier::new(50.0, "D"),
            ],
            fallback: default_fallback(),
        }
    }

    pub fn grade_for(&self, value: f64) -> &str {
        self.tiers
            .iter()
            .filter(|t| value >= t.min)
            .max_by(|a, b| a.min.partial_cmp(&b.min).unwrap_or(Ordering::Equal))
            .map(|t| t.letter.as_str())
            .unwrap_or(self.fallback.as_str())
    }
}

/// Overall-percentage ladder and exam-mark ladder.
#[derive(Debug, Clone, PartialEq)]
pub struct Grading {
    pub coursework: GradeScale,
    pub exam: GradeScale,
}

impl Default for Grading {
    fn default() -> Self {
        Self {
            coursework: GradeScale::coursework(),
            exam: GradeScale::exam(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentStats {
    pub total_coursework: u32,
    pub exam_mark: u32,
    pub total: u32,
    pub total_possible: u32,
    pub percentage: f64,
    pub grade: String,
}

pub fn percentage(record: &StudentRecord) -> f64 {
    match record.marks() {
        Marks::Coursework { course, exam } => {
            let total: u32 = course.iter().sum::<u32>() + exam;
            100.0 * f64::from(total) / f64::from(TOTAL_POSSIBLE)
        }
        Marks::ExamOnly { exam, .. } => 100.0 * f64::from(*exam) / f64::from(EXAM_MAX),
    }
}

/// Derived totals for one record. Exam-only records keep their stored grade.
pub fn stats_for(record: &StudentRecord, grading: &Grading) -> StudentStats {
    let pct = percentage(record);
    match record.marks() {
        Marks::Coursework { course, exam } => {
            let total_coursework: u32 = course.iter().sum();
            StudentStats {
                total_coursework,
                exam_mark: *exam,
                total: total_coursework + exam,
                total_possible: TOTAL_POSSIBLE,
                percentage: pct,
                grade: grading.coursework.grade_for(pct).to_string(),
            }
        }
        Marks::ExamOnly { exam, grade } => StudentStats {
            total_coursework: 0,
            exam_mark: *exam,
            total: *exam,
            total_possible: EXAM_MAX,
            percentage: pct,
            grade: grade.clone(),
        },
    }
}

/// Coursework and exam as separate percentages of their own maxima.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Breakdown {
    pub coursework_max: u32,
    pub coursework_percent: Option<f64>,
    pub exam_max: u32,
    pub exam_percent: f64,
}

pub fn breakdown(record: &StudentRecord) -> Breakdown {
    let coursework_percent = record
        .course_marks()
        .map(|c| 100.0 * f64::from(c.iter().sum::<u32>()) / f64::from(COURSEWORK_MAX));
    Breakdown {
        coursework_max: COURSEWORK_MAX,
        coursework_percent,
        exam_max: EXAM_MAX,
        exam_percent: 100.0 * f64::from(record.exam_mark()) / f64::from(EXAM_MAX),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassStats {
    pub count: usize,
    pub mean: f64,
    pub std_dev: f64,
}

/// Mean and population standard deviation (divides by N).
pub fn mean_and_population_stddev(values: &[f64]) -> Option<(f64, f64)> {
    if values.is_empty() {
        return None;
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
    Some((mean, variance.sqrt()))
}

pub fn class_average_and_stddev(records: &[StudentRecord]) -> Option<ClassStats> {
    let marks: Vec<f64> = records.iter().map(|r| f64::from(r.exam_mark())).collect();
    let (mean, std_dev) = mean_and_population_stddev(&marks)?;
    Some(ClassStats {
        count: marks.len(),
        mean,
        std_dev,
    })
}

pub fn average_percentage(records: &[StudentRecord]) -> Option<f64> {
    if records.is_empty() {
        return None;
    }
    Some(records.iter().map(percentage).sum::<f64>() / records.len() as f64)
}

/// First record wins ties.
pub fn highest_overall(records: &[StudentRecord]) -> Option<&StudentRecord> {
    records.iter().fold(None, |best, r| match best {
        Some(b) if percentage(r) <= percentage(b) => Some(b),
        _ => Some(r),
    })
}

/// First record wins ties.
pub fn lowest_overall(records: &[StudentRecord]) -> Option<&StudentRecord> {
    records.iter().fold(None, |best, r| match best {
        Some(b) if percentage(r) >= percentage(b) => Some(b),
        _ => Some(r),
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Band {
    /// A+ or A.
    Top,
    /// F.
    Failing,
}

impl Band {
    pub fn parse(s: &str) -> Option<Band> {
        match s.trim().to_ascii_lowercase().as_str() {
            "top" => Some(Band::Top),
            "failing" | "fail" => Some(Band::Failing),
            _ => None,
        }
    }

    fn contains(self, grade: &str) -> bool {
        match self {
            Band::Top => grade == "A+" || grade == "A",
            Band::Failing => grade == "F",
        }
    }
}

pub fn filter_band<'a>(
    records: &'a [StudentRecord],
    band: Band,
    grading: &Grading,
) -> Vec<&'a StudentRecord> {
    records
        .iter()
        .filter(|r| band.contains(&stats_for(r, grading).grade))
        .collect()
}
