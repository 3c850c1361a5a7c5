use crate::session::AnswerRecord;
use chrono::prelude::*;
use directories::ProjectDirs;
use std::fs::OpenOptions;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

pub const RESULT_HEADERS: [&str; 7] = [
    "question",
    "selected",
    "correct_answer",
    "correct",
    "seconds",
    "rationale",
    "eco_task",
];

/// One row per answered question, in answer order.
pub fn write_results<W: io::Write>(writer: W, answers: &[AnswerRecord]) -> csv::Result<()> {
    let mut wtr = csv::Writer::from_writer(writer);
    wtr.write_record(RESULT_HEADERS)?;
    for a in answers {
        let seconds = a.seconds.to_string();
        wtr.write_record([
            a.question.as_str(),
            a.selected.as_str(),
            a.correct_answer.as_str(),
            if a.is_correct { "true" } else { "false" },
            seconds.as_str(),
            a.rationale.as_deref().unwrap_or(""),
            a.category.as_deref().unwrap_or(""),
        ])?;
    }
    wtr.flush()?;
    Ok(())
}

/// Write the results spreadsheet into `dir` with a timestamped name and
/// return the path.
pub fn export_results(dir: &Path, answers: &[AnswerRecord]) -> io::Result<PathBuf> {
    let name = format!("exam_results_{}.csv", Local::now().format("%Y%m%d_%H%M%S"));
    let path = dir.join(name);
    let file = std::fs::File::create(&path)?;
    write_results(file, answers).map_err(io::Error::other)?;
    Ok(path)
}

/// Per-session summary row for the append-only log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSummary {
    pub candidate: Option<String>,
    pub questions: usize,
    pub answered: usize,
    pub correct: usize,
    pub total_secs: u64,
    pub used_secs: u64,
}

/// Append one finished session to the log, emitting the header when the
/// file is first created.
pub fn append_session_log(path: &Path, summary: &SessionSummary) -> io::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let needs_header = !path.exists();

    let mut log_file = OpenOptions::new().append(true).create(true).open(path)?;

    if needs_header {
        writeln!(
            log_file,
            "date,candidate,questions,answered,correct,total_secs,used_secs"
        )?;
    }

    writeln!(
        log_file,
        "{},{},{},{},{},{},{}",
        Local::now().format("%c"),
        summary.candidate.as_deref().unwrap_or(""),
        summary.questions,
        summary.answered,
        summary.correct,
        summary.total_secs,
        summary.used_secs,
    )?;

    Ok(())
}

/// Default location of the session log.
pub fn session_log_path() -> Option<PathBuf> {
    ProjectDirs::from("", "", "proctor").map(|pd| pd.config_dir().join("log.csv"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(index: usize, correct: bool, seconds: u64) -> AnswerRecord {
        AnswerRecord {
            index,
            question: format!("question {index}"),
            selected: "A. first".into(),
            correct_answer: if correct { "A" } else { "B" }.into(),
            is_correct: correct,
            seconds,
            rationale: Some("because".into()),
            category: Some("Planning".into()),
        }
    }

    #[test]
    fn writes_header_and_one_row_per_answer() {
        let answers = vec![record(0, true, 5), record(1, false, 10), record(2, true, 7)];
        let mut out = Vec::new();
        write_results(&mut out, &answers).unwrap();

        let text = String::from_utf8(out).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 4);
        assert_eq!(
            lines[0],
            "question,selected,correct_answer,correct,seconds,rationale,eco_task"
        );
        assert_eq!(lines[1], "question 0,A. first,A,true,5,because,Planning");
        assert_eq!(lines[2], "question 1,A. first,B,false,10,because,Planning");
    }

    #[test]
    fn empty_answer_set_is_just_the_header() {
        let mut out = Vec::new();
        write_results(&mut out, &[]).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert_eq!(text.lines().count(), 1);
    }

    #[test]
    fn quotes_fields_containing_commas() {
        let mut answer = record(0, true, 3);
        answer.question = "Budget is $10,000; what next?".into();
        let mut out = Vec::new();
        write_results(&mut out, &[answer]).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.contains(r#""Budget is $10,000; what next?""#));
    }

    #[test]
    fn missing_optionals_export_as_empty_fields() {
        let mut answer = record(0, true, 3);
        answer.rationale = None;
        answer.category = None;
        let mut out = Vec::new();
        write_results(&mut out, &[answer]).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.lines().nth(1).unwrap().ends_with(",3,,"));
    }

    #[test]
    fn export_results_names_file_by_timestamp() {
        let dir = tempfile::tempdir().unwrap();
        let path = export_results(dir.path(), &[record(0, true, 1)]).unwrap();
        let name = path.file_name().unwrap().to_string_lossy();
        assert!(name.starts_with("exam_results_"));
        assert!(name.ends_with(".csv"));
        assert!(path.exists());
    }

    #[test]
    fn session_log_header_written_exactly_once() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("log.csv");
        let summary = SessionSummary {
            candidate: Some("sam".into()),
            questions: 3,
            answered: 3,
            correct: 2,
            total_secs: 230,
            used_secs: 22,
        };

        append_session_log(&path, &summary).unwrap();
        append_session_log(&path, &summary).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("date,candidate"));
        assert!(lines[1].ends_with(",sam,3,3,2,230,22"));
        assert!(lines[2].ends_with(",sam,3,3,2,230,22"));
    }
}
