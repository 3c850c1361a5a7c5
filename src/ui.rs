use itertools::Itertools;
use ratatui::{
    buffer::Buffer,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Cell, Gauge, Paragraph, Row, Table, Widget, Wrap},
};
use unicode_width::UnicodeWidthStr;

use crate::exam::{Stage, ALERT_SECS};
use crate::util::{format_clock, format_secs, percentage};
use crate::{App, FormField};

const HORIZONTAL_MARGIN: u16 = 5;
const VERTICAL_MARGIN: u16 = 2;

impl Widget for &App {
    fn render(self, area: Rect, buf: &mut Buffer) {
        match self.exam.stage {
            Stage::Configuring => render_configuring(self, area, buf),
            Stage::Fetching => render_fetching(self, area, buf),
            Stage::Ready => render_ready(self, area, buf),
            Stage::InProgress => render_in_progress(self, area, buf),
            Stage::Finished => render_finished(self, area, buf),
        }
    }
}

fn centered_column(area: Rect, height: u16) -> Rect {
    let pad = area.height.saturating_sub(height) / 2;
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .horizontal_margin(HORIZONTAL_MARGIN)
        .constraints([
            Constraint::Length(pad),
            Constraint::Length(height),
            Constraint::Min(0),
        ])
        .split(area);
    chunks[1]
}

fn render_configuring(app: &App, area: Rect, buf: &mut Buffer) {
    let bold = Style::default().add_modifier(Modifier::BOLD);
    let dim = Style::default().add_modifier(Modifier::DIM);
    let focused = Style::default().fg(Color::Cyan).patch(bold);

    let field = |label: &str, value: &str, active: bool| {
        let style = if active { focused } else { Style::default() };
        let cursor = if active { "_" } else { "" };
        Line::from(vec![
            Span::styled(format!("{label:<20}"), dim),
            Span::styled(format!("{value}{cursor}"), style),
        ])
    };

    let mut lines = vec![
        Line::from(Span::styled("proctor", bold)).alignment(Alignment::Center),
        Line::from(""),
        field(
            "questions",
            &app.form.count,
            app.form.focus == FormField::Count,
        ),
        field(
            "candidate (optional)",
            &app.form.candidate,
            app.form.focus == FormField::Candidate,
        ),
        field(
            "minutes (optional)",
            &app.form.minutes,
            app.form.focus == FormField::Minutes,
        ),
        Line::from(""),
    ];

    if let Some(err) = app.form_error.as_ref().or(app.exam.last_error.as_ref()) {
        lines.push(Line::from(Span::styled(
            err.clone(),
            Style::default().fg(Color::Red),
        )));
    } else {
        lines.push(Line::from(Span::styled(
            "blank minutes uses the 230m/180q pacing budget",
            dim,
        )));
    }
    lines.push(Line::from(""));
    lines.push(Line::from(Span::styled(
        "(tab) next field (enter) fetch questions (esc) quit",
        dim.patch(Style::default().add_modifier(Modifier::ITALIC)),
    )));

    let height = lines.len() as u16;
    Paragraph::new(lines)
        .wrap(Wrap { trim: true })
        .render(centered_column(area, height), buf);
}

fn render_fetching(app: &App, area: Rect, buf: &mut Buffer) {
    let dim = Style::default().add_modifier(Modifier::DIM);
    let lines = vec![
        Line::from(Span::styled(
            format!(
                "contacting question source for {} questions...",
                app.exam.config.count
            ),
            Style::default().add_modifier(Modifier::BOLD),
        )),
        Line::from(""),
        Line::from(Span::styled(app.source_url.clone(), dim)),
    ];
    Paragraph::new(lines)
        .alignment(Alignment::Center)
        .render(centered_column(area, 3), buf);
}

fn render_ready(app: &App, area: Rect, buf: &mut Buffer) {
    let bold = Style::default().add_modifier(Modifier::BOLD);
    let dim = Style::default().add_modifier(Modifier::DIM);

    let categories = app
        .exam
        .questions
        .iter()
        .filter_map(|q| q.category.as_deref())
        .unique()
        .join(", ");

    let mut lines = vec![
        Line::from(Span::styled(
            format!("{} questions ready", app.exam.questions.len()),
            bold,
        )),
        Line::from(format!(
            "session time: {}",
            format_secs(app.exam.session.total_secs)
        )),
    ];
    if !categories.is_empty() {
        lines.push(Line::from(Span::styled(
            format!("covers: {categories}"),
            dim,
        )));
    }
    if let Some(candidate) = &app.exam.config.candidate {
        lines.push(Line::from(Span::styled(
            format!("candidate: {candidate}"),
            dim,
        )));
    }
    lines.push(Line::from(""));
    lines.push(Line::from(Span::styled(
        "(enter) start the clock (esc) quit",
        dim.patch(Style::default().add_modifier(Modifier::ITALIC)),
    )));

    let height = lines.len() as u16;
    Paragraph::new(lines)
        .alignment(Alignment::Center)
        .wrap(Wrap { trim: true })
        .render(centered_column(area, height), buf);
}

fn render_in_progress(app: &App, area: Rect, buf: &mut Buffer) {
    let bold = Style::default().add_modifier(Modifier::BOLD);
    let dim = Style::default().add_modifier(Modifier::DIM);

    let Some(question) = app.exam.current_question() else {
        return;
    };

    let inner_width = area.width.saturating_sub(HORIZONTAL_MARGIN * 2).max(1);
    let prompt_lines =
        ((question.prompt.width() as f64 / inner_width as f64).ceil() as u16).max(1) + 1;
    let option_lines = question.choices.len() as u16 + 1;

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .horizontal_margin(HORIZONTAL_MARGIN)
        .vertical_margin(VERTICAL_MARGIN)
        .constraints([
            Constraint::Length(3), // gauges
            Constraint::Length(2), // clock + counter
            Constraint::Length(prompt_lines),
            Constraint::Length(option_lines),
            Constraint::Min(0),
            Constraint::Length(1), // instructions
        ])
        .split(area);

    let gauges = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
        .split(chunks[0]);

    Gauge::default()
        .block(Block::default().borders(Borders::ALL).title("answered"))
        .gauge_style(Style::default().fg(Color::Green))
        .percent(percentage(app.exam.completion_ratio()) as u16)
        .render(gauges[0], buf);
    Gauge::default()
        .block(Block::default().borders(Borders::ALL).title("time used"))
        .gauge_style(Style::default().fg(Color::Red))
        .percent(percentage(app.exam.time_ratio()) as u16)
        .render(gauges[1], buf);

    let clock_style = if app.exam.session.seconds_remaining <= ALERT_SECS {
        Style::default().fg(Color::Red).patch(bold)
    } else {
        bold
    };
    let header = Line::from(vec![
        Span::styled(
            format_clock(app.exam.session.seconds_remaining),
            clock_style,
        ),
        Span::raw("   "),
        Span::styled(
            format!(
                "question {} / {}",
                app.exam.session.current + 1,
                app.exam.questions.len()
            ),
            dim,
        ),
        Span::raw("   "),
        Span::styled(
            format!("{} on this question", format_secs(app.exam.session.question_seconds)),
            dim,
        ),
    ]);
    Paragraph::new(header)
        .alignment(Alignment::Center)
        .render(chunks[1], buf);

    Paragraph::new(Span::styled(question.prompt.clone(), bold))
        .wrap(Wrap { trim: true })
        .render(chunks[2], buf);

    let options: Vec<Line> = question
        .choices
        .iter()
        .enumerate()
        .map(|(idx, choice)| {
            let selected = app.exam.session.selected == Some(idx);
            let style = if selected {
                Style::default().fg(Color::Cyan).patch(bold)
            } else {
                Style::default()
            };
            let marker = if selected { "> " } else { "  " };
            Line::from(Span::styled(
                format!("{marker}{}. {}", choice.label, choice.text),
                style,
            ))
        })
        .collect();
    Paragraph::new(options)
        .wrap(Wrap { trim: false })
        .render(chunks[3], buf);

    Paragraph::new(Span::styled(
        "(up/down or a-d) select (enter) next question (esc) quit",
        dim.patch(Style::default().add_modifier(Modifier::ITALIC)),
    ))
    .alignment(Alignment::Center)
    .render(chunks[5], buf);
}

fn render_finished(app: &App, area: Rect, buf: &mut Buffer) {
    let bold = Style::default().add_modifier(Modifier::BOLD);
    let dim = Style::default().add_modifier(Modifier::DIM);

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .horizontal_margin(HORIZONTAL_MARGIN)
        .vertical_margin(VERTICAL_MARGIN)
        .constraints([
            Constraint::Length(4), // headline
            Constraint::Min(5),    // per-question table
            Constraint::Length(6), // category history
            Constraint::Length(2), // export note / instructions
        ])
        .split(area);

    let answered = app.exam.answers().len();
    let missed = app
        .exam
        .answers()
        .iter()
        .filter(|a| !a.is_correct)
        .map(|a| (a.index + 1).to_string())
        .join(", ");

    let mut headline = vec![Line::from(Span::styled(
        format!("score {} / {}", app.exam.score(), app.exam.questions.len()),
        bold.patch(Style::default().fg(Color::Green)),
    ))];
    headline.push(Line::from(Span::styled(
        format!(
            "{} of {} answered, {} used of {}",
            answered,
            app.exam.questions.len(),
            format_secs(app.exam.session.total_secs - app.exam.session.seconds_remaining),
            format_secs(app.exam.session.total_secs),
        ),
        dim,
    )));
    if !missed.is_empty() {
        headline.push(Line::from(Span::styled(
            format!("missed: {missed}"),
            Style::default().fg(Color::Red),
        )));
    }
    Paragraph::new(headline)
        .alignment(Alignment::Center)
        .render(chunks[0], buf);

    let header = Row::new(vec![
        Cell::from("#"),
        Cell::from("time"),
        Cell::from("answer"),
        Cell::from("result"),
    ])
    .style(Style::default().fg(Color::Yellow).patch(bold));

    let rows: Vec<Row> = app
        .exam
        .answers()
        .iter()
        .map(|a| {
            let (result, style) = if a.is_correct {
                ("correct", Style::default().fg(Color::Green))
            } else {
                ("wrong", Style::default().fg(Color::Red))
            };
            Row::new(vec![
                Cell::from((a.index + 1).to_string()),
                Cell::from(format_secs(a.seconds)),
                Cell::from(a.selected.clone()),
                Cell::from(result).style(style),
            ])
        })
        .collect();

    Table::new(
        rows,
        &[
            Constraint::Length(4),
            Constraint::Length(10),
            Constraint::Min(20),
            Constraint::Length(8),
        ],
    )
    .header(header)
    .block(Block::default().borders(Borders::ALL).title("questions"))
    .render(chunks[1], buf);

    let mut history_lines: Vec<Line> = app
        .category_summary
        .iter()
        .take(3)
        .map(|c| {
            Line::from(Span::styled(
                format!(
                    "{}: {:.0}% missed, {:.0}s avg over {} attempts",
                    c.category, c.miss_rate, c.avg_seconds, c.attempts
                ),
                dim,
            ))
        })
        .collect();
    if let Some(ago) = &app.last_practiced {
        history_lines.push(Line::from(Span::styled(
            format!("previous practice {ago}"),
            dim,
        )));
    }
    if !history_lines.is_empty() {
        Paragraph::new(history_lines)
            .block(Block::default().borders(Borders::ALL).title("history"))
            .render(chunks[2], buf);
    }

    let footer = match &app.export_note {
        Some(note) => Line::from(Span::styled(note.clone(), Style::default().fg(Color::Green))),
        None => Line::from(Span::styled(
            "(e) export csv (r) new session (esc) quit",
            dim.patch(Style::default().add_modifier(Modifier::ITALIC)),
        )),
    };
    Paragraph::new(footer)
        .alignment(Alignment::Center)
        .render(chunks[3], buf);
}
