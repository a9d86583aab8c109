use std::fs::OpenOptions;
use std::io::{self, IsTerminal};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use crossterm::{
    event::{DisableMouseCapture, EnableMouseCapture},
    execute,
    terminal::{self, EnterAlternateScreen, LeaveAlternateScreen},
};
use tracing::warn;
use tracing_subscriber::EnvFilter;
use tui::{
    backend::{Backend, CrosstermBackend},
    Terminal,
};
use uuid::Uuid;

use client_manager::analytics::summarize;
use client_manager::catalog::Field;
use client_manager::config::{self, Config};
use client_manager::db::{self, Database};
use client_manager::models::{Client, ColumnTarget};
use client_manager::query::filter_clients;
use client_manager::spreadsheet::{read_rows, write_export};
use client_manager::store::{ClientStore, ImportOutcome, LoadStatus};
use client_manager::ui::{
    client_wizard::{handle_input as handle_client_wizard_input, render_client_wizard, ClientWizardAction, ClientWizardState},
    clients::{handle_input as handle_clients_input, render_clients, ClientAction, ClientsState},
    mapping_dialog::{handle_input as handle_mapping_input, render_mapping_dialog, MappingDialogAction, MappingDialogState},
};

type Store = ClientStore<Database>;

/// Local client manager with spreadsheet import and export
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Overrides DATABASE_URL
    #[arg(long)]
    database_url: Option<String>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Open the interactive client list (default)
    Browse,
    /// Print clients matching a search term and tags
    List {
        #[arg(short, long, default_value = "")]
        search: String,
        /// Keep clients carrying any of these tags
        #[arg(short, long = "tag")]
        tags: Vec<String>,
    },
    /// Add a client
    Add(ClientFields),
    /// Change fields of a client
    Edit {
        /// Client id or a unique prefix of it
        id: String,
        #[command(flatten)]
        fields: ClientFields,
    },
    /// Delete a client and its notes
    Delete { id: String },
    /// Attach a note to a client
    Note { id: String, text: String },
    /// Import clients from a spreadsheet (.xlsx, .xls, .ods, .csv)
    Import {
        file: PathBuf,
        /// Column mapping for unknown headers, e.g. --map "Zona=location" or --map "Vendedor="
        #[arg(long = "map", value_name = "HEADER=FIELD")]
        mappings: Vec<String>,
        /// Ask for unknown headers in the column mapping dialog
        #[arg(short, long)]
        interactive: bool,
    },
    /// Export every client to a spreadsheet (.xlsx or .csv)
    Export { file: PathBuf },
    /// Forget the saved column mapping
    ClearMapping,
    /// Show counts per tag, location and month added
    Stats,
}

#[derive(Args, Debug, Default)]
struct ClientFields {
    #[arg(long)]
    first_name: Option<String>,
    #[arg(long)]
    last_name: Option<String>,
    #[arg(long)]
    email: Option<String>,
    #[arg(long)]
    phone: Option<String>,
    #[arg(long)]
    company: Option<String>,
    #[arg(long)]
    address: Option<String>,
    #[arg(long)]
    province: Option<String>,
    #[arg(long)]
    tax_id: Option<String>,
    #[arg(long)]
    dni: Option<String>,
    #[arg(long)]
    location: Option<String>,
    /// Toggle a tag on the client (repeatable)
    #[arg(long = "tag")]
    tags: Vec<String>,
}

impl ClientFields {
    fn apply(self, client: &mut Client) {
        let values = [
            (Field::FirstName, self.first_name),
            (Field::LastName, self.last_name),
            (Field::Email, self.email),
            (Field::Phone, self.phone),
            (Field::Company, self.company),
            (Field::Address, self.address),
            (Field::Province, self.province),
            (Field::TaxId, self.tax_id),
            (Field::Dni, self.dni),
            (Field::Location, self.location),
        ];
        for (field, value) in values {
            if let (Some(value), Some(slot)) = (value, client.field_mut(field)) {
                *slot = value;
            }
        }
        for tag in self.tags {
            client.toggle_tag(&tag);
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load configuration
    let mut config = config::init()?;
    if let Some(url) = cli.database_url {
        config.database_url = url;
    }
    init_logging(&config)?;

    let db = db::init(&config)
        .await
        .with_context(|| format!("could not open {}", config.database_url()))?;
    let mut store = ClientStore::new(db);
    if let LoadStatus::Recovered(parts) = store.load().await? {
        for part in parts {
            eprintln!("Warning: stored data was unreadable and has been reset ({part})");
        }
    }

    match cli.command.unwrap_or(Command::Browse) {
        Command::Browse => browse(&mut store).await?,
        Command::List { search, tags } => {
            for client in filter_clients(store.all(), &search, &tags) {
                print_client(client);
            }
        }
        Command::Add(fields) => {
            let mut client = Client::default();
            fields.apply(&mut client);
            let id = store.add(client).await?;
            println!("Client added: {id}");
        }
        Command::Edit { id, fields } => {
            let mut client = store.find_by_prefix(&id)?.clone();
            fields.apply(&mut client);
            store.update(client.id, client).await?;
            println!("Client updated");
        }
        Command::Delete { id } => {
            let id = store.find_by_prefix(&id)?.id;
            let removed = store.remove(id).await?;
            println!("Client deleted: {}", removed.display_name());
        }
        Command::Note { id, text } => {
            let id = store.find_by_prefix(&id)?.id;
            store.add_note(id, &text).await?;
            println!("Note added");
        }
        Command::Import { file, mappings, interactive } => {
            import_file(&mut store, &file, &mappings, interactive).await?;
        }
        Command::Export { file } => {
            if store.all().is_empty() {
                bail!("there are no clients to export");
            }
            write_export(&file, store.all())?;
            println!("Exported {} clients to {}", store.all().len(), file.display());
        }
        Command::ClearMapping => {
            store.clear_mapping().await?;
            println!("Saved column mapping cleared");
        }
        Command::Stats => print_stats(&store),
    }

    Ok(())
}

fn init_logging(config: &Config) -> Result<()> {
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&config.log_file)
        .with_context(|| format!("could not open log file {}", config.log_file))?;

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(&config.log_filter))
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .init();

    Ok(())
}

fn print_client(client: &Client) {
    let id = client.id.to_string();
    let mut line = format!("{}  {}", &id[..8], client.display_name());
    if !client.email.is_empty() {
        line.push_str(&format!(" <{}>", client.email));
    }
    if !client.company.is_empty() {
        line.push_str(&format!(" · {}", client.company));
    }
    if !client.tags.is_empty() {
        line.push_str(&format!(" [{}]", client.tags.join(", ")));
    }
    println!("{line}");
}

fn print_stats(store: &Store) {
    let summary = summarize(store.all());
    println!("Clients:      {}", summary.total);
    println!("With email:   {} ({}%)", summary.with_email, summary.email_percent());
    println!("With phone:   {} ({}%)", summary.with_phone, summary.phone_percent());
    println!("With company: {}", summary.with_company);
    println!("With notes:   {}", summary.with_notes);
    println!("\nBy tag:");
    for (tag, count) in &summary.by_tag {
        println!("  {tag}: {count}");
    }
    println!("\nBy location:");
    for (location, count) in &summary.by_location {
        println!("  {location}: {count}");
    }
    println!("\nBy month added:");
    for (month, count) in &summary.by_month {
        println!("  {month}: {count}");
    }
}

fn parse_mapping(entry: &str) -> Result<(String, ColumnTarget)> {
    let Some((header, field)) = entry.rsplit_once('=') else {
        bail!("mapping '{entry}' must look like HEADER=FIELD");
    };
    let target = ColumnTarget::try_from(field.trim().to_string())?;
    Ok((header.to_string(), target))
}

async fn import_file(store: &mut Store, file: &Path, mappings: &[String], interactive: bool) -> Result<()> {
    let rows = read_rows(file)?;
    let outcome = store.import_rows(rows).await?;

    let ImportOutcome::NeedsMapping { unknown } = outcome else {
        report_import(&outcome);
        return Ok(());
    };

    if interactive && io::stdout().is_terminal() {
        return run_tui(store, Screen::Mapping).await;
    }

    if mappings.is_empty() {
        store.cancel_import()?;
        bail!(
            "unknown columns: {}. Map them with --map \"HEADER=FIELD\" (FIELD empty to ignore) or use --interactive",
            unknown.join(", ")
        );
    }

    if let Some(pending) = store.pending_import_mut() {
        for entry in mappings {
            let (header, target) = parse_mapping(entry)?;
            pending.select(&header, target)?;
        }
    }
    let outcome = store.complete_import().await?;
    report_import(&outcome);
    Ok(())
}

fn import_summary(outcome: &ImportOutcome) -> String {
    match outcome {
        ImportOutcome::Imported { added, skipped: 0 } => format!("Imported {added} clients"),
        ImportOutcome::Imported { added, skipped } => {
            format!("Imported {added} clients ({skipped} blank rows skipped)")
        }
        ImportOutcome::NeedsMapping { unknown } => {
            format!("Waiting for a column mapping: {}", unknown.join(", "))
        }
    }
}

fn report_import(outcome: &ImportOutcome) {
    println!("{}", import_summary(outcome));
}

// Represents the current screen in the app
enum Screen {
    Clients,
    ClientWizard(Option<Uuid>), // Contains the id of the client being edited
    Mapping,
}

// Main application state
struct AppState<'a> {
    store: &'a mut Store,
    screen: Screen,
    clients_state: ClientsState,
    client_wizard_state: Option<ClientWizardState>,
    mapping_state: Option<MappingDialogState>,
}

async fn browse(store: &mut Store) -> Result<()> {
    run_tui(store, Screen::Clients).await
}

async fn run_tui(store: &mut Store, screen: Screen) -> Result<()> {
    // Setup terminal
    terminal::enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let clients_state = ClientsState::new(store.all().to_vec());
    let mapping_state = store.pending_import().map(MappingDialogState::new);
    let mut app_state = AppState {
        store,
        screen,
        clients_state,
        client_wizard_state: None,
        mapping_state,
    };

    let result = run_app(&mut terminal, &mut app_state).await;

    // Restore terminal
    terminal::disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen, DisableMouseCapture)?;
    terminal.show_cursor()?;

    result
}

async fn run_app<B: Backend>(terminal: &mut Terminal<B>, app_state: &mut AppState<'_>) -> Result<()> {
    loop {
        terminal.draw(|f| match app_state.screen {
            Screen::Clients => render_clients(f, &mut app_state.clients_state),
            Screen::ClientWizard(_) => {
                if let Some(state) = &mut app_state.client_wizard_state {
                    render_client_wizard(f, state);
                }
            }
            Screen::Mapping => {
                if let Some(state) = &mut app_state.mapping_state {
                    render_mapping_dialog(f, state);
                }
            }
        })?;

        let should_quit = match app_state.screen {
            Screen::Clients => handle_clients_screen(app_state).await?,
            Screen::ClientWizard(_) => handle_client_wizard_screen(app_state).await?,
            Screen::Mapping => handle_mapping_screen(app_state).await?,
        };

        if should_quit {
            break;
        }
    }

    Ok(())
}

fn refresh_clients(app_state: &mut AppState<'_>) {
    let clients = app_state.store.all().to_vec();
    app_state.clients_state.set_clients(clients);
    app_state.screen = Screen::Clients;
}

async fn handle_clients_screen(app_state: &mut AppState<'_>) -> Result<bool> {
    let Some(action) = handle_clients_input(&mut app_state.clients_state)? else {
        return Ok(false);
    };

    // Failures are shown in the status line rather than ending the session.
    let status = match action {
        ClientAction::Exit => return Ok(true),
        ClientAction::NewClient => {
            app_state.client_wizard_state = Some(ClientWizardState::new());
            app_state.screen = Screen::ClientWizard(None);
            return Ok(false);
        }
        ClientAction::EditClient(id) => {
            if let Some(client) = app_state.store.get(id) {
                app_state.client_wizard_state = Some(ClientWizardState::from_existing(client.clone()));
                app_state.screen = Screen::ClientWizard(Some(id));
            }
            return Ok(false);
        }
        ClientAction::DeleteClient(id) => match app_state.store.remove(id).await {
            Ok(client) => format!("Deleted {}", client.display_name()),
            Err(err) => format!("Error: {err}"),
        },
        ClientAction::AddNote(id, text) => match app_state.store.add_note(id, &text).await {
            Ok(_) => "Note added".to_string(),
            Err(err) => format!("Error: {err}"),
        },
        ClientAction::Import(path) => {
            let path = PathBuf::from(path.trim());
            let outcome = match read_rows(&path) {
                Ok(rows) => app_state.store.import_rows(rows).await,
                Err(err) => Err(err.into()),
            };
            match outcome {
                Ok(ImportOutcome::NeedsMapping { .. }) => {
                    app_state.mapping_state = app_state.store.pending_import().map(MappingDialogState::new);
                    app_state.screen = Screen::Mapping;
                    return Ok(false);
                }
                Ok(outcome) => import_summary(&outcome),
                Err(err) => format!("Import failed: {err}"),
            }
        }
        ClientAction::Export(path) => {
            let path = PathBuf::from(path.trim());
            match write_export(&path, app_state.store.all()) {
                Ok(()) => format!("Exported to {}", path.display()),
                Err(err) => format!("Export failed: {err}"),
            }
        }
        ClientAction::ClearMapping => match app_state.store.clear_mapping().await {
            Ok(()) => "Saved column mapping cleared".to_string(),
            Err(err) => format!("Error: {err}"),
        },
    };

    refresh_clients(app_state);
    app_state.clients_state.set_status(status);
    Ok(false)
}

async fn handle_client_wizard_screen(app_state: &mut AppState<'_>) -> Result<bool> {
    let Some(state) = &mut app_state.client_wizard_state else {
        app_state.screen = Screen::Clients;
        return Ok(false);
    };

    match handle_client_wizard_input(state)? {
        Some(ClientWizardAction::Cancel) => {
            app_state.client_wizard_state = None;
            refresh_clients(app_state);
        }
        Some(ClientWizardAction::Save(client)) => {
            let result = match app_state.screen {
                Screen::ClientWizard(Some(id)) => app_state.store.update(id, client).await.map(|_| "Client updated"),
                _ => app_state.store.add(client).await.map(|_| "Client added"),
            };
            match result {
                Ok(message) => {
                    app_state.client_wizard_state = None;
                    refresh_clients(app_state);
                    app_state.clients_state.set_status(message);
                }
                Err(err) => {
                    if let Some(state) = &mut app_state.client_wizard_state {
                        state.error = Some(err.to_string());
                    }
                }
            }
        }
        None => {}
    }

    Ok(false)
}

async fn handle_mapping_screen(app_state: &mut AppState<'_>) -> Result<bool> {
    let Some(state) = &mut app_state.mapping_state else {
        refresh_clients(app_state);
        return Ok(false);
    };

    let status = match handle_mapping_input(state)? {
        Some(MappingDialogAction::Cancel) => {
            if let Err(err) = app_state.store.cancel_import() {
                warn!(error = %err, "cancelled a mapping dialog without a pending import");
            }
            "Import cancelled".to_string()
        }
        Some(MappingDialogAction::Save(entries)) => {
            if let Some(pending) = app_state.store.pending_import_mut() {
                for (header, choice) in &entries {
                    match choice {
                        Some(target) => pending.select(header, *target)?,
                        None => pending.unselect(header)?,
                    }
                }
            }
            match app_state.store.complete_import().await {
                Ok(outcome) => import_summary(&outcome),
                Err(err) => {
                    // The batch is still pending; stay on the dialog so it can be retried or cancelled.
                    if let Some(state) = &mut app_state.mapping_state {
                        state.set_error(err.to_string());
                    }
                    return Ok(false);
                }
            }
        }
        None => return Ok(false),
    };

    app_state.mapping_state = None;
    refresh_clients(app_state);
    app_state.clients_state.set_status(status);
    Ok(false)
}
