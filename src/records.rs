use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use thiserror::Error;

pub const COURSEWORK_ITEMS: usize = 3;
pub const COURSEWORK_ITEM_MAX: u32 = 20;
pub const COURSEWORK_MAX: u32 = COURSEWORK_ITEM_MAX * COURSEWORK_ITEMS as u32;
pub const EXAM_MAX: u32 = 100;
pub const TOTAL_POSSIBLE: u32 = COURSEWORK_MAX + EXAM_MAX;

/// Which of the two on-disk layouts a data file uses.
///
/// `Coursework`: `code,name,mark1,mark2,mark3,exam` with integer codes.
/// `ExamOnly`: `code,name,exam_mark,grade` with free-text codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Schema {
    #[default]
    Coursework,
    ExamOnly,
}

impl Schema {
    pub fn field_count(self) -> usize {
        match self {
            Schema::Coursework => 6,
            Schema::ExamOnly => 4,
        }
    }

    pub fn parse(s: &str) -> Option<Schema> {
        match s.trim().to_ascii_lowercase().as_str() {
            "coursework" => Some(Schema::Coursework),
            "examonly" | "exam_only" | "exam-only" | "exam" => Some(Schema::ExamOnly),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Schema::Coursework => "coursework",
            Schema::ExamOnly => "examOnly",
        }
    }

    /// Parse a user-supplied code in this schema's code space.
    pub fn parse_code(self, raw: &str) -> Result<StudentCode, RecordError> {
        let t = raw.trim();
        if t.is_empty() {
            return Err(RecordError::EmptyCode);
        }
        match self {
            Schema::Coursework => t
                .parse::<u32>()
                .map(StudentCode::Number)
                .map_err(|_| RecordError::NonNumericCode(t.to_string())),
            Schema::ExamOnly => {
                check_encodable("code", t)?;
                Ok(StudentCode::Text(t.to_string()))
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(untagged)]
pub enum StudentCode {
    Number(u32),
    Text(String),
}

impl Ord for StudentCode {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (StudentCode::Number(a), StudentCode::Number(b)) => a.cmp(b),
            (StudentCode::Text(a), StudentCode::Text(b)) => a.cmp(b),
            (StudentCode::Number(_), StudentCode::Text(_)) => Ordering::Less,
            (StudentCode::Text(_), StudentCode::Number(_)) => Ordering::Greater,
        }
    }
}

impl PartialOrd for StudentCode {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for StudentCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StudentCode::Number(n) => write!(f, "{n}"),
            StudentCode::Text(s) => f.write_str(s),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Marks {
    Coursework { course: [u32; COURSEWORK_ITEMS], exam: u32 },
    /// The console roster keeps the letter grade alongside the mark.
    ExamOnly { exam: u32, grade: String },
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RecordError {
    #[error("student name cannot be empty")]
    EmptyName,
    #[error("student code cannot be empty")]
    EmptyCode,
    #[error("grade cannot be empty")]
    EmptyGrade,
    #[error("{0} must not contain commas or line breaks")]
    Unencodable(&'static str),
    #[error("student code must be a whole number, got {0:?}")]
    NonNumericCode(String),
    #[error("{field} is not a whole number: {value:?}")]
    NotANumber { field: &'static str, value: String },
    #[error("coursework mark {0} is outside 0..={max}", max = COURSEWORK_ITEM_MAX)]
    CourseworkOutOfRange(u32),
    #[error("exam mark {0} is outside 0..={max}", max = EXAM_MAX)]
    ExamOutOfRange(u32),
    #[error("{0} records have no coursework marks")]
    SchemaMismatch(&'static str),
}

/// A validated student row. Fields are private so every record in memory has
/// passed the bounds and encoding checks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StudentRecord {
    code: StudentCode,
    name: String,
    marks: Marks,
}

impl StudentRecord {
    pub fn coursework(
        code: u32,
        name: &str,
        course: [u32; COURSEWORK_ITEMS],
        exam: u32,
    ) -> Result<Self, RecordError> {
        let name = clean_name(name)?;
        check_course_marks(&course)?;
        check_exam_mark(exam)?;
        Ok(Self {
            code: StudentCode::Number(code),
            name,
            marks: Marks::Coursework { course, exam },
        })
    }

    pub fn exam_only(code: &str, name: &str, exam: u32, grade: &str) -> Result<Self, RecordError> {
        let code = Schema::ExamOnly.parse_code(code)?;
        let name = clean_name(name)?;
        check_exam_mark(exam)?;
        let grade = clean_grade(grade)?;
        Ok(Self {
            code,
            name,
            marks: Marks::ExamOnly { exam, grade },
        })
    }

    pub fn code(&self) -> &StudentCode {
        &self.code
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn marks(&self) -> &Marks {
        &self.marks
    }

    pub fn schema(&self) -> Schema {
        match self.marks {
            Marks::Coursework { .. } => Schema::Coursework,
            Marks::ExamOnly { .. } => Schema::ExamOnly,
        }
    }

    pub fn exam_mark(&self) -> u32 {
        match &self.marks {
            Marks::Coursework { exam, .. } | Marks::ExamOnly { exam, .. } => *exam,
        }
    }

    pub fn course_marks(&self) -> Option<[u32; COURSEWORK_ITEMS]> {
        match &self.marks {
            Marks::Coursework { course, .. } => Some(*course),
            Marks::ExamOnly { .. } => None,
        }
    }

    /// Stored grade; only exam-only records carry one.
    pub fn stored_grade(&self) -> Option<&str> {
        match &self.marks {
            Marks::ExamOnly { grade, .. } => Some(grade),
            Marks::Coursework { .. } => None,
        }
    }

    pub fn set_name(&mut self, name: &str) -> Result<(), RecordError> {
        self.name = clean_name(name)?;
        Ok(())
    }

    /// The new code must belong to this record's schema.
    pub fn set_code(&mut self, code: StudentCode) -> Result<(), RecordError> {
        match (&code, self.schema()) {
            (StudentCode::Number(_), Schema::Coursework) => {}
            (StudentCode::Text(t), Schema::ExamOnly) => {
                if t.trim().is_empty() {
                    return Err(RecordError::EmptyCode);
                }
                check_encodable("code", t)?;
            }
            (StudentCode::Text(t), Schema::Coursework) => {
                return Err(RecordError::NonNumericCode(t.clone()))
            }
            (StudentCode::Number(n), Schema::ExamOnly) => {
                self.code = StudentCode::Text(n.to_string());
                return Ok(());
            }
        }
        self.code = code;
        Ok(())
    }

    pub fn set_course_marks(&mut self, marks: [u32; COURSEWORK_ITEMS]) -> Result<(), RecordError> {
        check_course_marks(&marks)?;
        match &mut self.marks {
            Marks::Coursework { course, .. } => {
                *course = marks;
                Ok(())
            }
            Marks::ExamOnly { .. } => Err(RecordError::SchemaMismatch("exam-only")),
        }
    }

    /// Exam-only records need the regraded letter for the new mark.
    pub fn set_exam_mark(&mut self, mark: u32, regrade: &str) -> Result<(), RecordError> {
        check_exam_mark(mark)?;
        match &mut self.marks {
            Marks::Coursework { exam, .. } => *exam = mark,
            Marks::ExamOnly { exam, grade } => {
                *grade = clean_grade(regrade)?;
                *exam = mark;
            }
        }
        Ok(())
    }

    /// Parse one data line.
    ///
    /// `Ok(None)` means the line is blank or short and should be skipped;
    /// `Err` means the line has enough fields but they don't hold a valid
    /// record. Fields past the schema's count are ignored.
    pub fn parse_line(line: &str, schema: Schema) -> Result<Option<Self>, RecordError> {
        let t = line.trim();
        if t.is_empty() {
            return Ok(None);
        }
        let parts: Vec<&str> = t.split(',').map(|p| p.trim()).collect();
        if parts.len() < schema.field_count() {
            return Ok(None);
        }

        let rec = match schema {
            Schema::Coursework => {
                let code = parts[0]
                    .parse::<u32>()
                    .map_err(|_| RecordError::NonNumericCode(parts[0].to_string()))?;
                let course = [
                    parse_mark("mark1", parts[2])?,
                    parse_mark("mark2", parts[3])?,
                    parse_mark("mark3", parts[4])?,
                ];
                let exam = parse_mark("exam", parts[5])?;
                StudentRecord::coursework(code, parts[1], course, exam)?
            }
            Schema::ExamOnly => {
                let exam = parse_mark("exam_mark", parts[2])?;
                StudentRecord::exam_only(parts[0], parts[1], exam, parts[3])?
            }
        };
        Ok(Some(rec))
    }

    pub fn to_line(&self) -> String {
        match &self.marks {
            Marks::Coursework { course, exam } => format!(
                "{},{},{},{},{},{}",
                self.code, self.name, course[0], course[1], course[2], exam
            ),
            Marks::ExamOnly { exam, grade } => {
                format!("{},{},{},{}", self.code, self.name, exam, grade)
            }
        }
    }
}

fn parse_mark(field: &'static str, raw: &str) -> Result<u32, RecordError> {
    raw.parse::<u32>().map_err(|_| RecordError::NotANumber {
        field,
        value: raw.to_string(),
    })
}

fn clean_name(name: &str) -> Result<String, RecordError> {
    let t = name.trim();
    if t.is_empty() {
        return Err(RecordError::EmptyName);
    }
    check_encodable("name", t)?;
    Ok(t.to_string())
}

fn clean_grade(grade: &str) -> Result<String, RecordError> {
    let t = grade.trim();
    if t.is_empty() {
        return Err(RecordError::EmptyGrade);
    }
    check_encodable("grade", t)?;
    Ok(t.to_string())
}

fn check_encodable(field: &'static str, v: &str) -> Result<(), RecordError> {
    if v.contains([',', '\n', '\r']) {
        return Err(RecordError::Unencodable(field));
    }
    Ok(())
}

fn check_course_marks(marks: &[u32; COURSEWORK_ITEMS]) -> Result<(), RecordError> {
    match marks.iter().find(|m| **m > COURSEWORK_ITEM_MAX) {
        Some(bad) => Err(RecordError::CourseworkOutOfRange(*bad)),
        None => Ok(()),
    }
}

fn check_exam_mark(exam: u32) -> Result<(), RecordError> {
    if exam > EXAM_MAX {
        return Err(RecordError::ExamOutOfRange(exam));
    }
    Ok(())
}
