use anyhow::Result;
use crossterm::event::{self, Event, KeyCode};
use tui::{
    backend::Backend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Span, Spans},
    widgets::{Block, Borders, List, ListItem, Paragraph},
    Frame,
};

use crate::catalog::{Field, SUGGESTED_TAGS};
use crate::models::Client;

pub enum ClientWizardAction {
    Cancel,
    Save(Client),
}

/// Text fields shown by the form, followed by the tag row
const FORM_FIELDS: [Field; 10] = [
    Field::FirstName,
    Field::LastName,
    Field::Email,
    Field::Phone,
    Field::Company,
    Field::Address,
    Field::Province,
    Field::TaxId,
    Field::Dni,
    Field::Location,
];

const TAG_ROW: usize = FORM_FIELDS.len();

pub struct ClientWizardState {
    pub client: Client,
    pub current_row: usize,
    pub editing: bool,
    pub tag_cursor: usize,
    pub error: Option<String>,
    tag_palette: Vec<String>,
}

impl ClientWizardState {
    pub fn new() -> Self {
        Self::from_existing(Client::default())
    }

    pub fn from_existing(client: Client) -> Self {
        let mut tag_palette: Vec<String> = SUGGESTED_TAGS.iter().map(|t| t.to_string()).collect();
        for tag in &client.tags {
            if !tag_palette.contains(tag) {
                tag_palette.push(tag.clone());
            }
        }
        Self {
            client,
            current_row: 0,
            editing: false,
            tag_cursor: 0,
            error: None,
            tag_palette,
        }
    }

    pub fn current_field(&self) -> Option<Field> {
        FORM_FIELDS.get(self.current_row).copied()
    }

    pub fn toggle_editing(&mut self) {
        if self.current_field().is_some() {
            self.editing = !self.editing;
        }
    }

    pub fn next_field(&mut self) {
        self.current_row = (self.current_row + 1) % (TAG_ROW + 1);
    }

    pub fn previous_field(&mut self) {
        self.current_row = if self.current_row == 0 { TAG_ROW } else { self.current_row - 1 };
    }

    pub fn edit_current_field(&mut self, key: KeyCode) {
        if !self.editing {
            return;
        }
        let Some(value) = self.current_field().and_then(|f| self.client.field_mut(f)) else {
            return;
        };

        match key {
            KeyCode::Char(c) => {
                value.push(c);
            }
            KeyCode::Backspace => {
                value.pop();
            }
            _ => {}
        }
    }

    fn move_tag_cursor(&mut self, forward: bool) {
        let len = self.tag_palette.len();
        self.tag_cursor = match (forward, self.tag_cursor) {
            (true, c) if c + 1 >= len => 0,
            (true, c) => c + 1,
            (false, 0) => len.saturating_sub(1),
            (false, c) => c - 1,
        };
    }

    fn toggle_current_tag(&mut self) {
        if let Some(tag) = self.tag_palette.get(self.tag_cursor).cloned() {
            self.client.toggle_tag(&tag);
        }
    }

    /// Validates the form; on failure the error is kept for display.
    fn try_save(&mut self) -> Option<ClientWizardAction> {
        match self.client.validate() {
            Ok(()) => Some(ClientWizardAction::Save(self.client.clone())),
            Err(err) => {
                self.error = Some(err.to_string());
                None
            }
        }
    }

    pub fn handle_key(&mut self, key: KeyCode) -> Option<ClientWizardAction> {
        match key {
            KeyCode::Esc => {
                if self.editing {
                    self.toggle_editing();
                } else {
                    return Some(ClientWizardAction::Cancel);
                }
            }
            KeyCode::Enter => self.toggle_editing(),
            KeyCode::Up if !self.editing => self.previous_field(),
            KeyCode::Down | KeyCode::Tab if !self.editing => self.next_field(),
            KeyCode::Left if self.current_row == TAG_ROW => self.move_tag_cursor(false),
            KeyCode::Right if self.current_row == TAG_ROW => self.move_tag_cursor(true),
            KeyCode::Char(' ') if self.current_row == TAG_ROW => self.toggle_current_tag(),
            KeyCode::Char('s') if !self.editing => return self.try_save(),
            _ if self.editing => self.edit_current_field(key),
            _ => {}
        }
        None
    }
}

impl Default for ClientWizardState {
    fn default() -> Self {
        Self::new()
    }
}

pub fn render_client_wizard<B: Backend>(f: &mut Frame<B>, state: &mut ClientWizardState) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .margin(2)
        .constraints(
            [
                Constraint::Length(3),
                Constraint::Min(10),
                Constraint::Length(3),
            ]
            .as_ref(),
        )
        .split(f.size());

    // Title with appropriate text based on whether we're editing or creating
    let title_text = if state.client.is_new() {
        "New Client"
    } else {
        "Edit Client"
    };

    let title = Paragraph::new(title_text)
        .style(Style::default().fg(Color::Cyan))
        .block(Block::default().borders(Borders::ALL));
    f.render_widget(title, chunks[0]);

    render_form(f, state, chunks[1]);

    let help_text = match (&state.error, state.editing) {
        (Some(error), false) => format!("Error: {error}"),
        (_, true) => "Enter - Save field | Esc - Stop editing".to_string(),
        (None, false) => {
            "Enter - Edit field | Up/Down - Navigate | Left/Right + Space - Tags | S - Save client | Esc - Cancel"
                .to_string()
        }
    };
    let help_style = if state.error.is_some() && !state.editing {
        Style::default().fg(Color::Red)
    } else {
        Style::default().fg(Color::Gray)
    };

    let help = Paragraph::new(help_text)
        .style(help_style)
        .block(Block::default().borders(Borders::ALL));
    f.render_widget(help, chunks[2]);
}

fn render_form<B: Backend>(f: &mut Frame<B>, state: &ClientWizardState, area: Rect) {
    let mut items: Vec<ListItem> = FORM_FIELDS
        .iter()
        .enumerate()
        .map(|(i, field)| {
            let value = state.client.field(*field).unwrap_or_default();
            let label_style = if i == state.current_row {
                Style::default().fg(Color::Yellow)
            } else {
                Style::default()
            };
            let required = matches!(field, Field::FirstName | Field::Email);
            let label = format!("{}{}: ", field.label(), if required { " *" } else { "" });

            let content = if i == state.current_row && state.editing {
                Spans::from(vec![
                    Span::styled(label, label_style),
                    Span::styled(format!("{value}|"), Style::default().add_modifier(Modifier::BOLD)),
                ])
            } else {
                Spans::from(vec![Span::styled(label, label_style), Span::raw(value.to_string())])
            };
            ListItem::new(content)
        })
        .collect();

    let on_tags = state.current_row == TAG_ROW;
    let mut tag_spans = vec![Span::styled(
        "Tags: ",
        if on_tags { Style::default().fg(Color::Yellow) } else { Style::default() },
    )];
    for (i, tag) in state.tag_palette.iter().enumerate() {
        let mut style = if state.client.has_tag(tag) {
            Style::default().fg(Color::Black).bg(Color::Green)
        } else {
            Style::default()
        };
        if on_tags && i == state.tag_cursor {
            style = style.add_modifier(Modifier::UNDERLINED | Modifier::BOLD);
        }
        tag_spans.push(Span::styled(format!(" {tag} "), style));
        tag_spans.push(Span::raw(" "));
    }
    items.push(ListItem::new(Spans::from(tag_spans)));

    let form_list = List::new(items)
        .block(Block::default().borders(Borders::ALL).title("Client Details"));

    f.render_widget(form_list, area);
}

pub fn handle_input(state: &mut ClientWizardState) -> Result<Option<ClientWizardAction>> {
    if let Event::Key(key) = event::read()? {
        return Ok(state.handle_key(key.code));
    }

    Ok(None)
}
