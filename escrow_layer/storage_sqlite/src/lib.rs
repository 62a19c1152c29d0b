// Copyright 2024 The Tari Project
// SPDX-License-Identifier: BSD-3-Clause
#[macro_use]
extern crate diesel;

mod models;
mod reader;
mod schema;
mod serialization;
mod writer;

use std::{
    fs::create_dir_all,
    path::Path,
    sync::{Arc, Mutex},
};

use diesel::{sql_query, Connection, RunQueryDsl, SqliteConnection};
use diesel_migrations::{embed_migrations, EmbeddedMigrations, MigrationHarness};
use tari_escrow_storage::{DealStore, StorageError};

use crate::{reader::ReadTransaction, writer::WriteTransaction};

#[derive(Clone)]
pub struct SqliteDealStore {
    // MUTEX: required to make Sync
    connection: Arc<Mutex<SqliteConnection>>,
}

impl SqliteDealStore {
    pub fn try_open<P: AsRef<Path>>(path: P) -> Result<Self, StorageError> {
        if let Some(parent) = path.as_ref().parent() {
            create_dir_all(parent).map_err(|e| StorageError::ConnectionError { reason: e.to_string() })?;
        }

        let database_url = path
            .as_ref()
            .to_str()
            .ok_or_else(|| StorageError::ConnectionError {
                reason: "database path is not valid utf-8".to_string(),
            })?
            .to_string();
        let mut connection = SqliteConnection::establish(&database_url)
            .map_err(|e| StorageError::ConnectionError { reason: e.to_string() })?;

        sql_query("PRAGMA foreign_keys = ON;")
            .execute(&mut connection)
            .map_err(|source| StorageError::general("set pragma", source))?;

        Ok(Self {
            connection: Arc::new(Mutex::new(connection)),
        })
    }

    pub fn run_migrations(&self) -> Result<(), StorageError> {
        let mut conn = self.connection.lock().unwrap();
        const MIGRATIONS: EmbeddedMigrations = embed_migrations!("./migrations");
        conn.run_pending_migrations(MIGRATIONS)
            .map_err(|source| StorageError::MigrationError {
                reason: source.to_string(),
            })?;
        Ok(())
    }
}

impl DealStore for SqliteDealStore {
    type ReadTransaction<'a> = ReadTransaction<'a>;
    type WriteTransaction<'a> = WriteTransaction<'a>;

    fn create_read_tx(&self) -> Result<Self::ReadTransaction<'_>, StorageError> {
        let mut lock = self.connection.lock().unwrap();
        sql_query("BEGIN")
            .execute(&mut *lock)
            .map_err(|e| StorageError::general("BEGIN transaction", e))?;
        Ok(ReadTransaction::new(lock))
    }

    fn create_write_tx(&self) -> Result<Self::WriteTransaction<'_>, StorageError> {
        let mut lock = self.connection.lock().unwrap();
        sql_query("BEGIN")
            .execute(&mut *lock)
            .map_err(|e| StorageError::general("BEGIN transaction", e))?;
        Ok(WriteTransaction::new(lock))
    }
}
