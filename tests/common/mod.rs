#![allow(dead_code)]

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use chrono::{TimeZone, Utc};

use client_manager::db::{MemoryStorage, Storage};
use client_manager::identity::{FixedClock, SequentialIds};
use client_manager::import::RawRow;
use client_manager::models::Client;
use client_manager::{ClientStore, Error, Result};

/// Memory storage whose writes can be switched to fail
#[derive(Default)]
pub struct FlakyStorage {
    pub inner: MemoryStorage,
    failing: AtomicBool,
    writes: AtomicUsize,
    // 0 disables the single-write failure
    failing_write: AtomicUsize,
}

impl FlakyStorage {
    pub fn fail_writes(&self, fail: bool) {
        self.failing.store(fail, Ordering::SeqCst);
    }

    /// Fails only the `n`th write (set or remove) from now on, counting from 1.
    pub fn fail_nth_write(&self, n: usize) {
        self.writes.store(0, Ordering::SeqCst);
        self.failing_write.store(n, Ordering::SeqCst);
    }

    fn check(&self) -> Result<()> {
        let write = self.writes.fetch_add(1, Ordering::SeqCst) + 1;
        if self.failing.load(Ordering::SeqCst) || write == self.failing_write.load(Ordering::SeqCst) {
            return Err(Error::Storage(sqlx::Error::PoolClosed));
        }
        Ok(())
    }
}

#[async_trait]
impl Storage for FlakyStorage {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        self.inner.get(key).await
    }

    async fn set(&self, key: &str, value: &str) -> Result<()> {
        self.check()?;
        self.inner.set(key, value).await
    }

    async fn remove(&self, key: &str) -> Result<()> {
        self.check()?;
        self.inner.remove(key).await
    }
}

pub fn store_with<S: Storage>(storage: S) -> ClientStore<S> {
    let clock = FixedClock::new(Utc.with_ymd_and_hms(2024, 5, 20, 9, 30, 0).unwrap());
    ClientStore::with_identity(storage, Arc::new(SequentialIds::new()), Arc::new(clock))
}

pub fn memory_store() -> ClientStore<MemoryStorage> {
    store_with(MemoryStorage::new())
}

pub fn client(first_name: &str, email: &str) -> Client {
    Client {
        first_name: first_name.to_string(),
        email: email.to_string(),
        ..Client::default()
    }
}

pub fn row(cells: &[(&str, &str)]) -> RawRow {
    cells.iter().map(|(k, v)| (*k, *v)).collect()
}
