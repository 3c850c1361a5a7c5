pub mod config;
pub mod exam;
pub mod export;
pub mod history;
pub mod question;
pub mod runtime;
pub mod session;
pub mod source;
pub mod ui;
pub mod util;

use crate::config::{Config, ConfigStore, FileConfigStore};
use crate::exam::{ClockSignal, Exam, Stage};
use crate::export::SessionSummary;
use crate::history::{CategorySummary, HistoryDb};
use crate::runtime::{spawn_fetch, ExamEvent, ExamEventSource, TerminalEventSource};
use crate::session::SessionConfig;
use crate::source::QuestionSource;
use chrono::Local;
use clap::{error::ErrorKind, CommandFactory, Parser};
use crossterm::{
    event::{KeyCode, KeyEvent, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
    tty::IsTty,
};
use ratatui::{
    backend::{Backend, CrosstermBackend},
    Frame, Terminal,
};
use std::{
    error::Error,
    io::{self, stdin, Write},
    path::PathBuf,
    sync::mpsc::Sender,
};
use time_humanize::{Accuracy, HumanTime, Tense};

/// timed exam practice in the terminal
#[derive(Parser, Debug, Clone)]
#[clap(
    version,
    about,
    long_about = "A terminal exam timer that fetches a multiple-choice question set, runs a countdown with per-question timing, and exports the results as a CSV spreadsheet."
)]
pub struct Cli {
    /// number of questions to request
    #[clap(short = 'c', long)]
    count: Option<usize>,

    /// candidate name stamped on the session log
    #[clap(short = 'n', long)]
    name: Option<String>,

    /// total exam time in minutes (blank uses the 230m/180q pacing budget)
    #[clap(short = 'm', long)]
    minutes: Option<u64>,

    /// question source endpoint
    #[clap(short = 'u', long)]
    url: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormField {
    Count,
    Candidate,
    Minutes,
}

impl FormField {
    fn next(self) -> Self {
        match self {
            FormField::Count => FormField::Candidate,
            FormField::Candidate => FormField::Minutes,
            FormField::Minutes => FormField::Count,
        }
    }

    fn prev(self) -> Self {
        self.next().next()
    }
}

/// Text-entry state of the configuration screen. Survives a restart so a
/// fresh session can be submitted with unchanged inputs.
#[derive(Debug)]
pub struct SetupForm {
    pub count: String,
    pub candidate: String,
    pub minutes: String,
    pub focus: FormField,
}

impl SetupForm {
    fn field_mut(&mut self) -> &mut String {
        match self.focus {
            FormField::Count => &mut self.count,
            FormField::Candidate => &mut self.candidate,
            FormField::Minutes => &mut self.minutes,
        }
    }

    fn push_char(&mut self, c: char) {
        // numeric fields only take digits; the candidate field takes anything printable
        let numeric = matches!(self.focus, FormField::Count | FormField::Minutes);
        if !numeric || c.is_ascii_digit() {
            self.field_mut().push(c);
        }
    }
}

#[derive(Debug)]
pub struct App {
    pub exam: Exam,
    pub form: SetupForm,
    pub form_error: Option<String>,
    pub source_url: String,
    pub export_note: Option<String>,
    pub category_summary: Vec<CategorySummary>,
    pub last_practiced: Option<String>,
    store: FileConfigStore,
    finalized: bool,
}

impl App {
    pub fn new(cli: Cli, store: FileConfigStore) -> Self {
        let saved = store.load();
        let source_url = cli.url.clone().unwrap_or_else(|| saved.source_url.clone());
        let form = SetupForm {
            count: cli.count.unwrap_or(saved.count).to_string(),
            candidate: cli
                .name
                .clone()
                .or_else(|| saved.candidate.clone())
                .unwrap_or_default(),
            minutes: cli
                .minutes
                .or(saved.minutes)
                .map(|m| m.to_string())
                .unwrap_or_default(),
            focus: FormField::Count,
        };

        Self {
            exam: Exam::new(),
            form,
            form_error: None,
            source_url,
            export_note: None,
            category_summary: Vec::new(),
            last_practiced: None,
            store,
            finalized: false,
        }
    }

    /// Validate the form, hand the settings to the flow controller, and
    /// issue the outbound request. Validation failures stay on the form
    /// with a message.
    pub fn submit_form(&mut self, tx: Sender<ExamEvent>) {
        self.form_error = None;

        let count = match self.form.count.trim().parse::<usize>() {
            Ok(n) if n >= 1 => n,
            _ => {
                self.form_error = Some("enter a question count of at least 1".to_string());
                return;
            }
        };
        let minutes_override = match self.form.minutes.trim() {
            "" => None,
            raw => match raw.parse::<u64>() {
                Ok(m) if m >= 1 => Some(m),
                _ => {
                    self.form_error = Some("minutes must be a whole number of at least 1".to_string());
                    return;
                }
            },
        };
        let candidate = {
            let trimmed = self.form.candidate.trim();
            (!trimmed.is_empty()).then(|| trimmed.to_string())
        };

        self.exam.submit(SessionConfig {
            count,
            candidate: candidate.clone(),
            minutes_override,
        });
        if self.exam.stage != Stage::Fetching {
            return;
        }

        spawn_fetch(tx, QuestionSource::new(self.source_url.clone()), count);

        let _ = self.store.save(&Config {
            source_url: self.source_url.clone(),
            count,
            candidate,
            minutes: minutes_override,
        });
    }

    /// One-shot side effects of reaching `Finished`: append the session
    /// log and fold the answers into the category history.
    pub fn finalize_session(&mut self) {
        if self.finalized || self.exam.stage != Stage::Finished {
            return;
        }
        self.finalized = true;

        let summary = SessionSummary {
            candidate: self.exam.config.candidate.clone(),
            questions: self.exam.questions.len(),
            answered: self.exam.answers().len(),
            correct: self.exam.score(),
            total_secs: self.exam.session.total_secs,
            used_secs: self.exam.session.total_secs - self.exam.session.seconds_remaining,
        };
        if let Some(path) = export::session_log_path() {
            let _ = export::append_session_log(&path, &summary);
        }

        if let Ok(mut db) = HistoryDb::new() {
            self.last_practiced = db.last_recorded_at().ok().flatten().map(|at| {
                let secs = (Local::now() - at).num_seconds().max(0) as u64;
                HumanTime::from(std::time::Duration::from_secs(secs))
                    .to_text_en(Accuracy::Rough, Tense::Past)
            });
            let _ = db.record_answers(self.exam.answers());
            self.category_summary = db.category_summary().unwrap_or_default();
        }
    }

    pub fn export(&mut self) {
        let dir = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
        match export::export_results(&dir, self.exam.answers()) {
            Ok(path) => self.export_note = Some(format!("saved {}", path.display())),
            Err(err) => self.export_note = Some(format!("export failed: {err}")),
        }
    }

    /// Back to a blank session; the form keeps its text.
    pub fn reset(&mut self) {
        self.exam.restart();
        self.form_error = None;
        self.export_note = None;
        self.category_summary.clear();
        self.last_practiced = None;
        self.finalized = false;
    }
}

fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();

    if !stdin().is_tty() {
        let mut cmd = Cli::command();
        cmd.error(ErrorKind::Io, "stdin must be a tty").exit();
    }

    enable_raw_mode()?;

    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let mut app = App::new(cli, FileConfigStore::new());
    let result = start_tui(&mut terminal, &mut app);

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    result
}

fn start_tui<B: Backend>(terminal: &mut Terminal<B>, app: &mut App) -> Result<(), Box<dyn Error>> {
    let events = TerminalEventSource::new();
    let tx = events.sender();

    loop {
        terminal.draw(|f| ui(app, f))?;

        match events.recv()? {
            ExamEvent::Tick => {
                match app.exam.on_tick() {
                    ClockSignal::LowWater => ring_bell(),
                    ClockSignal::Expired => app.finalize_session(),
                    ClockSignal::None => {}
                }
            }
            ExamEvent::Resize => {}
            ExamEvent::Questions(result) => app.exam.on_questions(result),
            ExamEvent::Key(key) => {
                if !handle_key(app, &tx, key) {
                    break;
                }
            }
        }
    }

    Ok(())
}

fn handle_key(app: &mut App, tx: &Sender<ExamEvent>, key: KeyEvent) -> bool {
    if key.code == KeyCode::Esc {
        return false;
    }
    if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
        return false;
    }

    match app.exam.stage {
        Stage::Configuring => match key.code {
            KeyCode::Tab | KeyCode::Down => app.form.focus = app.form.focus.next(),
            KeyCode::BackTab | KeyCode::Up => app.form.focus = app.form.focus.prev(),
            KeyCode::Backspace => {
                let _ = app.form.field_mut().pop();
            }
            KeyCode::Enter => app.submit_form(tx.clone()),
            KeyCode::Char(c) => app.form.push_char(c),
            _ => {}
        },
        // nothing to do but wait; the request is not cancellable
        Stage::Fetching => {}
        Stage::Ready => {
            if matches!(key.code, KeyCode::Enter | KeyCode::Char(' ')) {
                app.exam.start();
            }
        }
        Stage::InProgress => match key.code {
            KeyCode::Up => app.exam.move_selection(-1),
            KeyCode::Down => app.exam.move_selection(1),
            KeyCode::Enter | KeyCode::Char('n') => {
                if app.exam.advance() && app.exam.has_finished() {
                    app.finalize_session();
                }
            }
            KeyCode::Char(c) => {
                if let Some(idx) = option_index(c) {
                    app.exam.select(idx);
                }
            }
            _ => {}
        },
        Stage::Finished => match key.code {
            KeyCode::Char('e') => app.export(),
            KeyCode::Char('r') => app.reset(),
            _ => {}
        },
    }

    true
}

/// a-j or 1-9 map onto option indices
fn option_index(c: char) -> Option<usize> {
    match c {
        'a'..='j' => Some(c as usize - 'a' as usize),
        '1'..='9' => Some(c as usize - '1' as usize),
        _ => None,
    }
}

fn ring_bell() {
    let mut stdout = io::stdout();
    let _ = stdout.write_all(b"\x07");
    let _ = stdout.flush();
}

fn ui(app: &App, f: &mut Frame) {
    f.render_widget(app, f.area());
}
