use anyhow::Result;
use crossterm::event::{self, Event, KeyCode};
use tui::{
    backend::Backend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Span, Spans},
    widgets::{Block, Borders, Clear, List, ListItem, ListState, Paragraph, Wrap},
    Frame,
};
use uuid::Uuid;

use super::centered_rect;
use crate::models::Client;
use crate::query::{available_tags, filter_clients, toggle_selected};

/// Free-text prompts shown over the list
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Prompt {
    Note,
    ImportPath,
    ExportPath,
}

impl Prompt {
    fn title(self) -> &'static str {
        match self {
            Prompt::Note => "New note",
            Prompt::ImportPath => "Import spreadsheet (path)",
            Prompt::ExportPath => "Export to (path, .xlsx or .csv)",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Mode {
    Browse,
    Search,
    Tags { cursor: usize },
    ConfirmDelete,
    Prompt { kind: Prompt, buffer: String },
}

// Represents the state of the client list screen
pub struct ClientsState {
    clients: Vec<Client>,
    search: String,
    selected_tags: Vec<String>,
    list_state: ListState,
    mode: Mode,
    status: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientAction {
    Exit,
    NewClient,
    EditClient(Uuid),
    DeleteClient(Uuid),
    AddNote(Uuid, String),
    Import(String),
    Export(String),
    ClearMapping,
}

impl ClientsState {
    pub fn new(clients: Vec<Client>) -> Self {
        let mut state = Self {
            clients,
            search: String::new(),
            selected_tags: Vec::new(),
            list_state: ListState::default(),
            mode: Mode::Browse,
            status: None,
        };
        state.clamp_selection();
        state
    }

    /// Replaces the displayed collection, keeping search and tag filters
    pub fn set_clients(&mut self, clients: Vec<Client>) {
        self.clients = clients;
        self.clamp_selection();
    }

    pub fn set_status(&mut self, message: impl Into<String>) {
        self.status = Some(message.into());
    }

    pub fn search(&self) -> &str {
        &self.search
    }

    pub fn selected_tags(&self) -> &[String] {
        &self.selected_tags
    }

    pub fn visible(&self) -> Vec<&Client> {
        filter_clients(&self.clients, &self.search, &self.selected_tags)
    }

    pub fn selected_client(&self) -> Option<&Client> {
        let visible = self.visible();
        self.list_state.selected().and_then(|i| visible.get(i).copied())
    }

    pub fn selected_client_id(&self) -> Option<Uuid> {
        self.selected_client().map(|c| c.id)
    }

    pub fn next(&mut self) {
        let len = self.visible().len();
        if len == 0 {
            return;
        }
        let i = match self.list_state.selected() {
            Some(i) if i + 1 < len => i + 1,
            _ => 0,
        };
        self.list_state.select(Some(i));
    }

    pub fn previous(&mut self) {
        let len = self.visible().len();
        if len == 0 {
            return;
        }
        let i = match self.list_state.selected() {
            Some(0) | None => len - 1,
            Some(i) => i - 1,
        };
        self.list_state.select(Some(i));
    }

    fn clamp_selection(&mut self) {
        let len = self.visible().len();
        let selected = match self.list_state.selected() {
            _ if len == 0 => None,
            Some(i) if i >= len => Some(len - 1),
            Some(i) => Some(i),
            None => Some(0),
        };
        self.list_state.select(selected);
    }

    fn tag_palette(&self) -> Vec<String> {
        available_tags(&self.clients)
    }

    /// Applies one key press; returns an action for the caller to carry out.
    pub fn handle_key(&mut self, key: KeyCode) -> Option<ClientAction> {
        match self.mode.clone() {
            Mode::Browse => self.handle_browse_key(key),
            Mode::Search => {
                match key {
                    KeyCode::Esc | KeyCode::Enter => self.mode = Mode::Browse,
                    KeyCode::Backspace => {
                        self.search.pop();
                    }
                    KeyCode::Char(c) => self.search.push(c),
                    _ => {}
                }
                self.clamp_selection();
                None
            }
            Mode::Tags { cursor } => {
                let palette = self.tag_palette();
                match key {
                    KeyCode::Esc | KeyCode::Enter => self.mode = Mode::Browse,
                    KeyCode::Left => {
                        let cursor = if cursor == 0 { palette.len().saturating_sub(1) } else { cursor - 1 };
                        self.mode = Mode::Tags { cursor };
                    }
                    KeyCode::Right => {
                        let cursor = if cursor + 1 >= palette.len() { 0 } else { cursor + 1 };
                        self.mode = Mode::Tags { cursor };
                    }
                    KeyCode::Char(' ') => {
                        if let Some(tag) = palette.get(cursor) {
                            toggle_selected(&mut self.selected_tags, tag);
                        }
                    }
                    _ => {}
                }
                self.clamp_selection();
                None
            }
            Mode::ConfirmDelete => {
                self.mode = Mode::Browse;
                match key {
                    KeyCode::Char('y') => self.selected_client_id().map(ClientAction::DeleteClient),
                    _ => None,
                }
            }
            Mode::Prompt { kind, mut buffer } => match key {
                KeyCode::Esc => {
                    self.mode = Mode::Browse;
                    None
                }
                KeyCode::Enter => {
                    self.mode = Mode::Browse;
                    match kind {
                        Prompt::Note => self
                            .selected_client_id()
                            .map(|id| ClientAction::AddNote(id, buffer)),
                        Prompt::ImportPath => Some(ClientAction::Import(buffer)),
                        Prompt::ExportPath => Some(ClientAction::Export(buffer)),
                    }
                }
                KeyCode::Backspace => {
                    buffer.pop();
                    self.mode = Mode::Prompt { kind, buffer };
                    None
                }
                KeyCode::Char(c) => {
                    buffer.push(c);
                    self.mode = Mode::Prompt { kind, buffer };
                    None
                }
                _ => None,
            },
        }
    }

    fn handle_browse_key(&mut self, key: KeyCode) -> Option<ClientAction> {
        self.status = None;
        let has_selection = self.selected_client().is_some();
        match key {
            KeyCode::Char('q') | KeyCode::Esc => return Some(ClientAction::Exit),
            KeyCode::Char('/') => self.mode = Mode::Search,
            KeyCode::Char('t') => self.mode = Mode::Tags { cursor: 0 },
            KeyCode::Char('n') => return Some(ClientAction::NewClient),
            KeyCode::Char('e') | KeyCode::Enter => return self.selected_client_id().map(ClientAction::EditClient),
            KeyCode::Char('d') if has_selection => self.mode = Mode::ConfirmDelete,
            KeyCode::Char('a') if has_selection => {
                self.mode = Mode::Prompt { kind: Prompt::Note, buffer: String::new() }
            }
            KeyCode::Char('i') => {
                self.mode = Mode::Prompt { kind: Prompt::ImportPath, buffer: String::new() }
            }
            KeyCode::Char('x') if !self.clients.is_empty() => {
                self.mode = Mode::Prompt { kind: Prompt::ExportPath, buffer: "clientes.xlsx".into() }
            }
            KeyCode::Char('c') => return Some(ClientAction::ClearMapping),
            KeyCode::Down => self.next(),
            KeyCode::Up => self.previous(),
            _ => {}
        }
        None
    }
}

pub fn render_clients<B: Backend>(frame: &mut Frame<B>, state: &mut ClientsState) {
    let size = frame.size();

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Length(3),
            Constraint::Min(1),
            Constraint::Length(3),
        ].as_ref())
        .split(size);

    render_search_bar(frame, state, chunks[0]);
    render_tag_bar(frame, state, chunks[1]);

    let body = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(55), Constraint::Percentage(45)].as_ref())
        .split(chunks[2]);

    let visible = state.visible();
    let items: Vec<ListItem> = visible
        .iter()
        .map(|client| {
            let mut spans = vec![Span::raw(client.display_name())];
            if !client.email.is_empty() {
                spans.push(Span::styled(format!("  <{}>", client.email), Style::default().fg(Color::Gray)));
            }
            if !client.company.is_empty() {
                spans.push(Span::styled(format!("  {}", client.company), Style::default().fg(Color::Cyan)));
            }
            ListItem::new(Spans::from(spans))
        })
        .collect();
    let title = format!("Clients ({}/{})", visible.len(), state.clients.len());

    let details = detail_lines(state.selected_client());

    let clients_list = List::new(items)
        .block(Block::default().title(title).borders(Borders::ALL))
        .highlight_style(
            Style::default()
                .bg(Color::Blue)
                .fg(Color::White)
                .add_modifier(Modifier::BOLD),
        );
    frame.render_stateful_widget(clients_list, body[0], &mut state.list_state);

    let details = Paragraph::new(details)
        .block(Block::default().title("Details").borders(Borders::ALL))
        .wrap(Wrap { trim: false });
    frame.render_widget(details, body[1]);

    let footer = match &state.status {
        Some(message) => message.clone(),
        None => "</> Search | <T> Tags | <N> New | <E> Edit | <D> Delete | <A> Note | <I> Import | <X> Export | <C> Clear mapping | <Q> Quit".to_string(),
    };
    let buttons = Paragraph::new(footer)
        .block(Block::default().borders(Borders::TOP))
        .style(Style::default().fg(Color::White));
    frame.render_widget(buttons, chunks[3]);

    match &state.mode {
        Mode::ConfirmDelete => render_delete_confirmation(frame, size),
        Mode::Prompt { kind, buffer } => render_prompt(frame, size, *kind, buffer),
        _ => {}
    }
}

fn render_search_bar<B: Backend>(frame: &mut Frame<B>, state: &ClientsState, area: Rect) {
    let style = if state.mode == Mode::Search {
        Style::default().fg(Color::Yellow)
    } else {
        Style::default()
    };
    let cursor = if state.mode == Mode::Search { "|" } else { "" };
    let search = Paragraph::new(format!("{}{}", state.search, cursor))
        .style(style)
        .block(Block::default().title("Search").borders(Borders::ALL));
    frame.render_widget(search, area);
}

fn render_tag_bar<B: Backend>(frame: &mut Frame<B>, state: &ClientsState, area: Rect) {
    let cursor = match state.mode {
        Mode::Tags { cursor } => Some(cursor),
        _ => None,
    };
    let spans: Vec<Span> = state
        .tag_palette()
        .into_iter()
        .enumerate()
        .flat_map(|(i, tag)| {
            let mut style = if state.selected_tags.contains(&tag) {
                Style::default().fg(Color::Black).bg(Color::Green)
            } else {
                Style::default()
            };
            if cursor == Some(i) {
                style = style.add_modifier(Modifier::UNDERLINED | Modifier::BOLD);
            }
            [Span::styled(format!(" {tag} "), style), Span::raw(" ")]
        })
        .collect();
    let tags = Paragraph::new(Spans::from(spans))
        .block(Block::default().title("Tag filter").borders(Borders::ALL));
    frame.render_widget(tags, area);
}

fn detail_lines(client: Option<&Client>) -> Vec<Spans<'static>> {
    let Some(client) = client else {
        return vec![Spans::from("No client selected")];
    };

    let mut lines = Vec::new();
    for field in crate::catalog::Field::ALL {
        if let Some(value) = client.field(field).filter(|v| !v.is_empty()) {
            lines.push(Spans::from(vec![
                Span::styled(format!("{}: ", field.label()), Style::default().fg(Color::Yellow)),
                Span::raw(value.to_string()),
            ]));
        }
    }
    if !client.tags.is_empty() {
        lines.push(Spans::from(format!("Tags: {}", client.tags.join(", "))));
    }
    for (key, value) in &client.extra {
        lines.push(Spans::from(format!("{key}: {value}")));
    }
    if !client.notes.is_empty() {
        lines.push(Spans::from(""));
        lines.push(Spans::from(Span::styled("Notes", Style::default().add_modifier(Modifier::BOLD))));
        for note in &client.notes {
            let date = note.date.with_timezone(&chrono::Local).format("%d/%m/%Y %H:%M");
            lines.push(Spans::from(format!("{date}  {}", note.content)));
        }
    }
    lines
}

fn render_delete_confirmation<B: Backend>(frame: &mut Frame<B>, size: Rect) {
    let popup_area = centered_rect(50, 20, size);

    let popup = Paragraph::new(vec![
        Spans::from(""),
        Spans::from("Are you sure you want to delete this client?"),
        Spans::from(""),
        Spans::from("All of its notes will also be deleted."),
        Spans::from(""),
        Spans::from("<Y> Yes  <N> No"),
    ])
    .block(Block::default().title("Confirm Delete").borders(Borders::ALL))
    .style(Style::default().fg(Color::White).bg(Color::Black));

    frame.render_widget(Clear, popup_area);
    frame.render_widget(popup, popup_area);
}

fn render_prompt<B: Backend>(frame: &mut Frame<B>, size: Rect, kind: Prompt, buffer: &str) {
    let popup_area = centered_rect(60, 20, size);
    let popup = Paragraph::new(vec![
        Spans::from(""),
        Spans::from(format!("{buffer}|")),
        Spans::from(""),
        Spans::from("<Enter> Confirm  <Esc> Cancel"),
    ])
    .block(Block::default().title(kind.title()).borders(Borders::ALL))
    .style(Style::default().fg(Color::White).bg(Color::Black));

    frame.render_widget(Clear, popup_area);
    frame.render_widget(popup, popup_area);
}

pub fn handle_input(state: &mut ClientsState) -> Result<Option<ClientAction>> {
    if let Event::Key(key) = event::read()? {
        return Ok(state.handle_key(key.code));
    }
    Ok(None)
}
