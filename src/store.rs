//! The client collection and its synchronization with durable storage.

use std::sync::Arc;

use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::db::{Storage, CLIENTS_KEY, COLUMN_MAPPING_KEY};
use crate::error::{Error, Result};
use crate::identity::{Clock, IdGenerator, SystemClock, TimeOrderedIds};
use crate::import::{normalize_row, plan_import, ImportPlan, ImportRowError, PendingImport, RawRow};
use crate::models::{Client, ColumnMapping, Note};

/// How `ClientStore::load` found the persisted state
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadStatus {
    /// Nothing was stored yet
    Empty,
    Loaded(usize),
    /// Stored data could not be read; the listed parts were reset to empty.
    Recovered(Vec<String>),
}

/// Result of handing a parsed batch to the store
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImportOutcome {
    /// Clients appended, with the number of blank rows that were skipped
    Imported { added: usize, skipped: usize },
    /// The batch is held until `complete_import` or `cancel_import`
    NeedsMapping { unknown: Vec<String> },
}

/// In-memory client collection written through to a `Storage` on every change.
///
/// Mutations build the next collection, persist it, and only then replace
/// the in-memory state, so a failed write changes nothing.
pub struct ClientStore<S: Storage> {
    storage: S,
    ids: Arc<dyn IdGenerator>,
    clock: Arc<dyn Clock>,
    clients: Vec<Client>,
    mapping: ColumnMapping,
    pending: Option<PendingImport>,
}

impl<S: Storage> ClientStore<S> {
    pub fn new(storage: S) -> Self {
        Self::with_identity(storage, Arc::new(TimeOrderedIds), Arc::new(SystemClock))
    }

    pub fn with_identity(storage: S, ids: Arc<dyn IdGenerator>, clock: Arc<dyn Clock>) -> Self {
        Self {
            storage,
            ids,
            clock,
            clients: Vec::new(),
            mapping: ColumnMapping::new(),
            pending: None,
        }
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    /// Reads clients and the saved column mapping. Malformed data resets to empty.
    pub async fn load(&mut self) -> Result<LoadStatus> {
        let mut recovered = Vec::new();

        let clients_json = self.storage.get(CLIENTS_KEY).await?;
        self.clients = match clients_json.as_deref() {
            None => Vec::new(),
            Some(json) => match serde_json::from_str::<Vec<Client>>(json) {
                Ok(clients) => clients,
                Err(err) => {
                    warn!(error = %err, "stored clients are unreadable, starting empty");
                    recovered.push(format!("{CLIENTS_KEY}: {err}"));
                    Vec::new()
                }
            },
        };

        self.mapping = match self.storage.get(COLUMN_MAPPING_KEY).await? {
            None => ColumnMapping::new(),
            Some(json) => match serde_json::from_str(&json) {
                Ok(mapping) => mapping,
                Err(err) => {
                    warn!(error = %err, "stored column mapping is unreadable, starting empty");
                    recovered.push(format!("{COLUMN_MAPPING_KEY}: {err}"));
                    ColumnMapping::new()
                }
            },
        };

        self.pending = None;
        info!(clients = self.clients.len(), "client store loaded");

        Ok(if !recovered.is_empty() {
            LoadStatus::Recovered(recovered)
        } else if clients_json.is_none() {
            LoadStatus::Empty
        } else {
            LoadStatus::Loaded(self.clients.len())
        })
    }

    pub fn all(&self) -> &[Client] {
        &self.clients
    }

    pub fn get(&self, id: Uuid) -> Option<&Client> {
        self.clients.iter().find(|c| c.id == id)
    }

    /// Finds the single client whose id starts with `prefix`.
    pub fn find_by_prefix(&self, prefix: &str) -> Result<&Client> {
        let prefix = prefix.trim().to_ascii_lowercase();
        if prefix.is_empty() {
            return Err(Error::NoMatchingId(prefix));
        }
        let matches: Vec<&Client> = self
            .clients
            .iter()
            .filter(|c| c.id.to_string().starts_with(&prefix))
            .collect();
        match matches.as_slice() {
            [client] => Ok(*client),
            [] => Err(Error::NoMatchingId(prefix)),
            _ => Err(Error::AmbiguousId(prefix)),
        }
    }

    /// Validates and appends a new client under a freshly drawn id.
    pub async fn add(&mut self, mut client: Client) -> Result<Uuid> {
        client.validate()?;
        client.id = self.ids.next_id();
        let id = client.id;

        let mut next = self.clients.clone();
        next.push(client);
        self.commit(next).await?;

        debug!(%id, "client added");
        Ok(id)
    }

    /// Validates and replaces the client with `id`, keeping its position.
    pub async fn update(&mut self, id: Uuid, mut client: Client) -> Result<()> {
        client.validate()?;
        let index = self.index_of(id)?;
        client.id = id;

        let mut next = self.clients.clone();
        next[index] = client;
        self.commit(next).await?;

        debug!(%id, "client updated");
        Ok(())
    }

    /// Removes the client together with its notes
    pub async fn remove(&mut self, id: Uuid) -> Result<Client> {
        let index = self.index_of(id)?;

        let mut next = self.clients.clone();
        let removed = next.remove(index);
        self.commit(next).await?;

        debug!(%id, "client removed");
        Ok(removed)
    }

    /// Appends records as they are; the import path does not validate.
    pub async fn append_many(&mut self, records: Vec<Client>) -> Result<usize> {
        let count = records.len();
        if count == 0 {
            return Ok(0);
        }

        let mut next = self.clients.clone();
        next.extend(records);
        self.commit(next).await?;

        debug!(count, "clients appended");
        Ok(count)
    }

    pub async fn add_note(&mut self, id: Uuid, text: &str) -> Result<Uuid> {
        let content = text.trim();
        if content.is_empty() {
            return Err(Error::EmptyNote);
        }
        let index = self.index_of(id)?;
        let note = Note {
            id: self.ids.next_id(),
            content: content.to_string(),
            date: self.clock.now(),
        };
        let note_id = note.id;

        let mut next = self.clients.clone();
        next[index].notes.push(note);
        self.commit(next).await?;

        debug!(client = %id, note = %note_id, "note added");
        Ok(note_id)
    }

    /// Imports a parsed batch, or holds it back if some headers are unknown.
    pub async fn import_rows(&mut self, rows: Vec<RawRow>) -> Result<ImportOutcome> {
        if self.pending.is_some() {
            return Err(Error::ImportInProgress);
        }

        match plan_import(rows, &self.mapping) {
            ImportPlan::Ready(rows) => {
                let (clients, skipped) = self.normalize_all(&rows);
                let added = self.append_many(clients).await?;
                info!(added, skipped, "import finished");
                Ok(ImportOutcome::Imported { added, skipped })
            }
            ImportPlan::NeedsMapping(pending) => {
                let unknown = pending.unknown_headers().to_vec();
                info!(?unknown, rows = pending.rows().len(), "import waiting for column mapping");
                self.pending = Some(pending);
                Ok(ImportOutcome::NeedsMapping { unknown })
            }
        }
    }

    pub fn pending_import(&self) -> Option<&PendingImport> {
        self.pending.as_ref()
    }

    /// Where the caller adjusts selections before `complete_import`
    pub fn pending_import_mut(&mut self) -> Option<&mut PendingImport> {
        self.pending.as_mut()
    }

    /// Saves the pending selections into the column mapping and imports the held rows.
    ///
    /// If the clients cannot be written, the previously stored mapping is put
    /// back and the batch stays pending.
    pub async fn complete_import(&mut self) -> Result<ImportOutcome> {
        let pending = self.pending.take().ok_or(Error::NoPendingImport)?;
        let mapping = pending.merged_mapping(&self.mapping);
        let rows = pending.clone().resolve();

        let previous_raw = match self.storage.get(COLUMN_MAPPING_KEY).await {
            Ok(raw) => raw,
            Err(err) => {
                self.pending = Some(pending);
                return Err(err);
            }
        };

        if let Err(err) = self.save_mapping(&mapping).await {
            self.pending = Some(pending);
            return Err(err);
        }

        let (clients, skipped) = self.normalize_all(&rows);
        let added = match self.append_many(clients).await {
            Ok(added) => added,
            Err(err) => {
                self.restore_mapping(previous_raw.as_deref()).await;
                self.pending = Some(pending);
                return Err(err);
            }
        };
        self.mapping = mapping;

        info!(added, skipped, "mapped import finished");
        Ok(ImportOutcome::Imported { added, skipped })
    }

    /// Drops the pending batch without importing anything
    pub fn cancel_import(&mut self) -> Result<()> {
        self.pending.take().map(|_| ()).ok_or(Error::NoPendingImport)
    }

    pub fn mapping(&self) -> &ColumnMapping {
        &self.mapping
    }

    /// Forgets every saved column mapping entry
    pub async fn clear_mapping(&mut self) -> Result<()> {
        self.storage.remove(COLUMN_MAPPING_KEY).await?;
        self.mapping = ColumnMapping::new();
        info!("column mapping cleared");
        Ok(())
    }

    fn normalize_all(&self, rows: &[RawRow]) -> (Vec<Client>, usize) {
        let mut clients = Vec::with_capacity(rows.len());
        let mut skipped = 0;
        for (line, row) in rows.iter().enumerate() {
            match normalize_row(row, self.ids.as_ref(), self.clock.as_ref()) {
                Ok(client) => clients.push(client),
                Err(ImportRowError::Blank) => {
                    debug!(line, "skipping blank row");
                    skipped += 1;
                }
            }
        }
        (clients, skipped)
    }

    fn index_of(&self, id: Uuid) -> Result<usize> {
        self.clients
            .iter()
            .position(|c| c.id == id)
            .ok_or(Error::ClientNotFound(id))
    }

    async fn commit(&mut self, next: Vec<Client>) -> Result<()> {
        let json = serde_json::to_string(&next)?;
        self.storage.set(CLIENTS_KEY, &json).await?;
        self.clients = next;
        Ok(())
    }

    /// Writes back the raw mapping value read before a failed import.
    async fn restore_mapping(&self, raw: Option<&str>) {
        let restored = match raw {
            Some(raw) => self.storage.set(COLUMN_MAPPING_KEY, raw).await,
            None => self.storage.remove(COLUMN_MAPPING_KEY).await,
        };
        if let Err(err) = restored {
            warn!(error = %err, "could not restore the column mapping after a failed import");
        }
    }

    async fn save_mapping(&self, mapping: &ColumnMapping) -> Result<()> {
        let json = serde_json::to_string(mapping)?;
        self.storage.set(COLUMN_MAPPING_KEY, &json).await
    }
}
