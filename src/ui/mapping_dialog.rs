use anyhow::Result;
use crossterm::event::{self, Event, KeyCode};
use tui::{
    backend::Backend,
    layout::{Constraint, Direction, Layout},
    style::{Color, Modifier, Style},
    text::{Span, Spans},
    widgets::{Block, Borders, List, ListItem, ListState, Paragraph},
    Frame,
};

use crate::catalog::Field;
use crate::import::PendingImport;
use crate::models::ColumnTarget;

pub enum MappingDialogAction {
    Cancel,
    /// One entry per header; `None` keeps the column under its own name
    Save(Vec<(String, Option<ColumnTarget>)>),
}

/// Choices offered for every header, in cycling order
fn choices() -> Vec<Option<ColumnTarget>> {
    let mut choices = vec![None, Some(ColumnTarget::Ignore)];
    choices.extend(Field::ALL.iter().map(|f| Some(ColumnTarget::Field(*f))));
    choices
}

fn choice_label(choice: Option<ColumnTarget>) -> &'static str {
    match choice {
        None => "(keep as is)",
        Some(ColumnTarget::Ignore) => "Ignore",
        Some(ColumnTarget::Field(field)) => field.as_str(),
    }
}

pub struct MappingDialogState {
    headers: Vec<String>,
    unknown: Vec<String>,
    selections: Vec<Option<ColumnTarget>>,
    row_count: usize,
    list_state: ListState,
    error: Option<String>,
}

impl MappingDialogState {
    pub fn new(pending: &PendingImport) -> Self {
        let headers = pending.headers().to_vec();
        let selections = headers.iter().map(|h| pending.selection(h)).collect();
        let mut list_state = ListState::default();
        if !headers.is_empty() {
            list_state.select(Some(0));
        }
        Self {
            headers,
            unknown: pending.unknown_headers().to_vec(),
            selections,
            row_count: pending.rows().len(),
            list_state,
            error: None,
        }
    }

    /// Keeps the dialog open with a message after a failed save.
    pub fn set_error(&mut self, message: impl Into<String>) {
        self.error = Some(message.into());
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn selection(&self, header: &str) -> Option<ColumnTarget> {
        self.headers
            .iter()
            .position(|h| h == header)
            .and_then(|i| self.selections[i])
    }

    pub fn next(&mut self) {
        if self.headers.is_empty() {
            return;
        }
        let i = match self.list_state.selected() {
            Some(i) if i + 1 < self.headers.len() => i + 1,
            _ => 0,
        };
        self.list_state.select(Some(i));
    }

    pub fn previous(&mut self) {
        if self.headers.is_empty() {
            return;
        }
        let i = match self.list_state.selected() {
            Some(0) | None => self.headers.len() - 1,
            Some(i) => i - 1,
        };
        self.list_state.select(Some(i));
    }

    fn cycle(&mut self, forward: bool) {
        let Some(row) = self.list_state.selected() else {
            return;
        };
        let options = choices();
        let current = options
            .iter()
            .position(|c| *c == self.selections[row])
            .unwrap_or(0);
        let next = if forward {
            (current + 1) % options.len()
        } else if current == 0 {
            options.len() - 1
        } else {
            current - 1
        };
        self.selections[row] = options[next];
    }

    pub fn handle_key(&mut self, key: KeyCode) -> Option<MappingDialogAction> {
        self.error = None;
        match key {
            KeyCode::Esc => return Some(MappingDialogAction::Cancel),
            KeyCode::Up => self.previous(),
            KeyCode::Down => self.next(),
            KeyCode::Left => self.cycle(false),
            KeyCode::Right | KeyCode::Char(' ') => self.cycle(true),
            KeyCode::Char('s') | KeyCode::Enter => {
                let entries = self
                    .headers
                    .iter()
                    .cloned()
                    .zip(self.selections.iter().copied())
                    .collect();
                return Some(MappingDialogAction::Save(entries));
            }
            _ => {}
        }
        None
    }
}

pub fn render_mapping_dialog<B: Backend>(f: &mut Frame<B>, state: &mut MappingDialogState) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .margin(2)
        .constraints(
            [
                Constraint::Length(3),
                Constraint::Min(5),
                Constraint::Length(3),
            ]
            .as_ref(),
        )
        .split(f.size());

    let title = Paragraph::new(format!(
        "Column mapping: {} rows waiting, match the spreadsheet columns to client fields",
        state.row_count
    ))
    .style(Style::default().fg(Color::Cyan))
    .block(Block::default().borders(Borders::ALL));
    f.render_widget(title, chunks[0]);

    let items: Vec<ListItem> = state
        .headers
        .iter()
        .zip(state.selections.iter())
        .map(|(header, choice)| {
            let header_style = if state.unknown.contains(header) {
                Style::default().fg(Color::Red)
            } else {
                Style::default()
            };
            ListItem::new(Spans::from(vec![
                Span::styled(format!("{header:<30}"), header_style),
                Span::raw(" -> "),
                Span::styled(choice_label(*choice), Style::default().add_modifier(Modifier::BOLD)),
            ]))
        })
        .collect();

    let list = List::new(items)
        .block(Block::default().borders(Borders::ALL).title("Columns"))
        .highlight_style(Style::default().bg(Color::Blue).fg(Color::White));
    f.render_stateful_widget(list, chunks[1], &mut state.list_state);

    let (help_text, help_style) = match &state.error {
        Some(error) => (
            format!("Error: {error} | S - Retry | Esc - Cancel import"),
            Style::default().fg(Color::Red),
        ),
        None => (
            "Up/Down - Column | Left/Right - Change field | S - Save mapping and import | Esc - Cancel import"
                .to_string(),
            Style::default().fg(Color::Gray),
        ),
    };
    let help = Paragraph::new(help_text)
        .style(help_style)
        .block(Block::default().borders(Borders::ALL));
    f.render_widget(help, chunks[2]);
}

pub fn handle_input(state: &mut MappingDialogState) -> Result<Option<MappingDialogAction>> {
    if let Event::Key(key) = event::read()? {
        return Ok(state.handle_key(key.code));
    }
    Ok(None)
}
