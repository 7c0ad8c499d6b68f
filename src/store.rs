use crate::calc::{self, Grading};
use crate::records::{RecordError, Schema, StudentCode, StudentRecord, COURSEWORK_ITEMS};
use std::cmp::Ordering;
use std::collections::HashSet;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, error, info, warn};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to read {}: {source}", .path.display())]
    Read { path: PathBuf, source: io::Error },
    #[error("failed to write {}: {source}", .path.display())]
    Write { path: PathBuf, source: io::Error },
    #[error("bad record count line: {0:?}")]
    BadCount(String),
    #[error("line {line}: {source}")]
    BadRecord { line: usize, source: RecordError },
    #[error("student code {0} already exists")]
    DuplicateCode(StudentCode),
    #[error("line {line}: student code {code} appears more than once")]
    RepeatedCode { line: usize, code: StudentCode },
    #[error("roster is read-only until the data file loads cleanly: {reason}")]
    ReadOnly { reason: String },
    #[error("no student with code {0}")]
    NotFound(StudentCode),
    #[error(transparent)]
    Invalid(#[from] RecordError),
}

/// Where the records of a load came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadSource {
    File,
    /// No file on disk; sample data or an empty roster was substituted.
    Missing,
    /// The file could not be read or parsed; the fallback was substituted.
    Fallback { reason: String },
}

impl LoadSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            LoadSource::File => "file",
            LoadSource::Missing => "missing",
            LoadSource::Fallback { .. } => "fallback",
        }
    }
}

#[derive(Debug)]
pub struct LoadOutcome {
    pub records: Vec<StudentRecord>,
    pub source: LoadSource,
}

const SAMPLE_ROWS: [(u32, &str, [u32; COURSEWORK_ITEMS], u32); 5] = [
    (8439, "Jake Hobbs", [10, 11, 10], 43),
    (7562, "Sarah Smith", [15, 14, 16], 78),
    (9123, "Mike Johnson", [12, 13, 11], 65),
    (6347, "Emma Wilson", [18, 17, 19], 92),
    (5289, "Tom Brown", [8, 9, 7], 35),
];

/// Built-in roster used when a coursework file is missing or unreadable.
pub fn sample_records() -> Vec<StudentRecord> {
    SAMPLE_ROWS
        .iter()
        .filter_map(|(code, name, course, exam)| {
            StudentRecord::coursework(*code, name, *course, *exam).ok()
        })
        .collect()
}

fn fallback_records(schema: Schema) -> Vec<StudentRecord> {
    match schema {
        Schema::Coursework => sample_records(),
        Schema::ExamOnly => Vec::new(),
    }
}

/// Parse the text of a data file.
///
/// The first non-blank line is the record count and only that many following
/// lines are read. Exam-only rosters written by the console tool have no count
/// line; if the first line already looks like a record every line is read
/// instead. A code seen twice makes the whole file invalid.
pub fn parse_records(text: &str, schema: Schema) -> Result<Vec<StudentRecord>, StoreError> {
    let lines: Vec<&str> = text.lines().collect();
    let Some(first) = lines.iter().position(|l| !l.trim().is_empty()) else {
        return Ok(Vec::new());
    };

    let head = lines[first].trim();
    let (start, limit) = if schema == Schema::ExamOnly && head.contains(',') {
        (first, lines.len() - first)
    } else {
        let n = head
            .parse::<usize>()
            .map_err(|_| StoreError::BadCount(head.to_string()))?;
        (first + 1, n)
    };

    let mut out: Vec<StudentRecord> = Vec::new();
    let mut seen: HashSet<StudentCode> = HashSet::new();
    for (i, raw) in lines.iter().enumerate().skip(start).take(limit) {
        match StudentRecord::parse_line(raw, schema) {
            Ok(Some(rec)) => {
                if !seen.insert(rec.code().clone()) {
                    return Err(StoreError::RepeatedCode {
                        line: i + 1,
                        code: rec.code().clone(),
                    });
                }
                out.push(rec);
            }
            Ok(None) => {
                if !raw.trim().is_empty() {
                    debug!(line = i + 1, "skipping short record line");
                }
            }
            Err(source) => return Err(StoreError::BadRecord { line: i + 1, source }),
        }
    }
    Ok(out)
}

pub fn read_records(path: &Path, schema: Schema) -> Result<Vec<StudentRecord>, StoreError> {
    let bytes = std::fs::read(path).map_err(|source| StoreError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let text = String::from_utf8_lossy(&bytes);
    parse_records(&text, schema)
}

/// Read the roster, substituting the schema's fallback when the file is
/// missing or broken. A missing coursework file is seeded with sample data.
pub fn load(path: &Path, schema: Schema) -> LoadOutcome {
    match read_records(path, schema) {
        Ok(records) => {
            info!(path = %path.display(), count = records.len(), "loaded student records");
            LoadOutcome {
                records,
                source: LoadSource::File,
            }
        }
        Err(StoreError::Read { source, .. }) if source.kind() == io::ErrorKind::NotFound => {
            let records = fallback_records(schema);
            match schema {
                Schema::Coursework => {
                    warn!(path = %path.display(), "data file not found; creating sample data");
                    if let Err(e) = save(&records, path) {
                        error!("failed to write sample data: {e}");
                    }
                }
                Schema::ExamOnly => {
                    warn!(path = %path.display(), "data file not found; starting with an empty roster");
                }
            }
            LoadOutcome {
                records,
                source: LoadSource::Missing,
            }
        }
        Err(e) => {
            error!(path = %path.display(), "failed to load data: {e}");
            LoadOutcome {
                records: fallback_records(schema),
                source: LoadSource::Fallback {
                    reason: e.to_string(),
                },
            }
        }
    }
}

pub fn render_records(records: &[StudentRecord]) -> String {
    let mut out = format!("{}\n", records.len());
    for r in records {
        out.push_str(&r.to_line());
        out.push('\n');
    }
    out
}

/// Overwrite `path` with the count line and one line per record.
pub fn save(records: &[StudentRecord], path: &Path) -> Result<(), StoreError> {
    std::fs::write(path, render_records(records)).map_err(|source| StoreError::Write {
        path: path.to_path_buf(),
        source,
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortKey {
    Name,
    Code,
    Percentage,
    ExamMark,
}

impl SortKey {
    pub fn parse(s: &str) -> Option<SortKey> {
        match s.trim().to_ascii_lowercase().as_str() {
            "name" => Some(SortKey::Name),
            "code" => Some(SortKey::Code),
            "percentage" => Some(SortKey::Percentage),
            "exammark" | "exam_mark" | "exam" => Some(SortKey::ExamMark),
            _ => None,
        }
    }

    fn compare(self, a: &StudentRecord, b: &StudentRecord) -> Ordering {
        match self {
            SortKey::Name => a.name().to_lowercase().cmp(&b.name().to_lowercase()),
            SortKey::Code => a.code().cmp(b.code()),
            SortKey::Percentage => calc::percentage(a)
                .partial_cmp(&calc::percentage(b))
                .unwrap_or(Ordering::Equal),
            SortKey::ExamMark => a.exam_mark().cmp(&b.exam_mark()),
        }
    }
}

/// Field changes for one record; `None` leaves a field alone.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecordUpdate {
    pub code: Option<StudentCode>,
    pub name: Option<String>,
    pub course_marks: Option<[u32; COURSEWORK_ITEMS]>,
    pub exam_mark: Option<u32>,
}

/// The in-memory roster bound to its data file. Every mutation rewrites the
/// whole file.
///
/// After a fallback load the roster holds substitute data, so it refuses
/// mutations until a later open or reload reads the file cleanly.
pub struct Roster {
    path: PathBuf,
    schema: Schema,
    records: Vec<StudentRecord>,
    read_only: Option<String>,
}

fn read_only_reason(source: &LoadSource) -> Option<String> {
    match source {
        LoadSource::Fallback { reason } => Some(reason.clone()),
        LoadSource::File | LoadSource::Missing => None,
    }
}

impl Roster {
    pub fn open(path: PathBuf, schema: Schema) -> (Roster, LoadSource) {
        let outcome = load(&path, schema);
        let roster = Roster {
            path,
            schema,
            records: outcome.records,
            read_only: read_only_reason(&outcome.source),
        };
        (roster, outcome.source)
    }

    pub fn reload(&mut self) -> LoadSource {
        let outcome = load(&self.path, self.schema);
        self.records = outcome.records;
        self.read_only = read_only_reason(&outcome.source);
        outcome.source
    }

    pub fn is_read_only(&self) -> bool {
        self.read_only.is_some()
    }

    fn ensure_writable(&self) -> Result<(), StoreError> {
        match &self.read_only {
            Some(reason) => Err(StoreError::ReadOnly {
                reason: reason.clone(),
            }),
            None => Ok(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn schema(&self) -> Schema {
        self.schema
    }

    pub fn records(&self) -> &[StudentRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn save(&self) -> Result<(), StoreError> {
        save(&self.records, &self.path)
    }

    pub fn find_by_code(&self, code: &StudentCode) -> Option<&StudentRecord> {
        self.records.iter().find(|r| r.code() == code)
    }

    /// Case-insensitive; several students may share a name.
    pub fn find_by_name(&self, name: &str) -> Vec<&StudentRecord> {
        let needle = name.trim().to_lowercase();
        self.records
            .iter()
            .filter(|r| r.name().to_lowercase() == needle)
            .collect()
    }

    /// Append a record; on a failed save the record is taken back out.
    pub fn add(&mut self, record: StudentRecord) -> Result<(), StoreError> {
        self.ensure_writable()?;
        if record.schema() != self.schema {
            return Err(RecordError::SchemaMismatch(self.schema.as_str()).into());
        }
        if self.find_by_code(record.code()).is_some() {
            return Err(StoreError::DuplicateCode(record.code().clone()));
        }
        self.records.push(record);
        if let Err(e) = self.save() {
            self.records.pop();
            return Err(e);
        }
        Ok(())
    }

    /// `Ok(None)` when no record has `code`; the roster and file are untouched.
    /// On a failed save the record goes back where it was.
    pub fn delete_by_code(&mut self, code: &StudentCode) -> Result<Option<StudentRecord>, StoreError> {
        match self.records.iter().position(|r| r.code() == code) {
            Some(idx) => self.remove_at(idx),
            None => Ok(None),
        }
    }

    /// Positional delete; `Ok(None)` when `idx` is past the end.
    pub fn remove_at(&mut self, idx: usize) -> Result<Option<StudentRecord>, StoreError> {
        self.ensure_writable()?;
        if idx >= self.records.len() {
            return Ok(None);
        }
        let removed = self.records.remove(idx);
        if let Err(e) = self.save() {
            self.records.insert(idx, removed);
            return Err(e);
        }
        Ok(Some(removed))
    }

    /// Apply `changes` to the record with `code`.
    ///
    /// Validation happens on a copy, so a rejected update leaves the roster
    /// as it was. A failed save is reported but the in-memory edit stays.
    pub fn update(
        &mut self,
        code: &StudentCode,
        changes: &RecordUpdate,
        grading: &Grading,
    ) -> Result<&StudentRecord, StoreError> {
        self.ensure_writable()?;
        let Some(idx) = self.records.iter().position(|r| r.code() == code) else {
            return Err(StoreError::NotFound(code.clone()));
        };

        let mut next = self.records[idx].clone();
        if let Some(name) = &changes.name {
            next.set_name(name)?;
        }
        if let Some(marks) = changes.course_marks {
            next.set_course_marks(marks)?;
        }
        if let Some(exam) = changes.exam_mark {
            let grade = grading.exam.grade_for(f64::from(exam)).to_string();
            next.set_exam_mark(exam, &grade)?;
        }
        if let Some(new_code) = &changes.code {
            next.set_code(new_code.clone())?;
            let taken = self
                .records
                .iter()
                .enumerate()
                .any(|(i, r)| i != idx && r.code() == next.code());
            if taken {
                return Err(StoreError::DuplicateCode(next.code().clone()));
            }
        }

        self.records[idx] = next;
        self.save()?;
        Ok(&self.records[idx])
    }

    /// Stable sort, then persist the new order.
    pub fn sort(&mut self, key: SortKey, ascending: bool) -> Result<(), StoreError> {
        self.ensure_writable()?;
        if ascending {
            self.records.sort_by(|a, b| key.compare(a, b));
        } else {
            self.records.sort_by(|a, b| key.compare(b, a));
        }
        self.save()
    }
}
