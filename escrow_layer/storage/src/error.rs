//   Copyright 2024 The Tari Project
//   SPDX-License-Identifier: BSD-3-Clause

use tari_escrow_common_types::optional::IsNotFoundError;

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("Could not connect to storage: {reason}")]
    ConnectionError { reason: String },
    #[error("Query error in operation {operation}: {details}")]
    QueryError {
        operation: &'static str,
        details: String,
    },
    #[error("Migration error: {reason}")]
    MigrationError { reason: String },
    #[error("[{operation}] {entity} not found with key {key}")]
    NotFound {
        operation: &'static str,
        entity: &'static str,
        key: String,
    },
    #[error("Failed to decode for operation {operation} on {item}: {details}")]
    DecodingError {
        operation: &'static str,
        item: &'static str,
        details: String,
    },
    #[error("Failed to encode for operation {operation} on {item}: {details}")]
    EncodingError {
        operation: &'static str,
        item: &'static str,
        details: String,
    },
    #[error("Data inconsistency: {details}")]
    DataInconsistency { details: String },
    #[error("General storage error for operation {operation}: {details}")]
    General {
        operation: &'static str,
        details: String,
    },
}

impl StorageError {
    pub fn general<E: std::fmt::Display>(operation: &'static str, e: E) -> Self {
        Self::General {
            operation,
            details: e.to_string(),
        }
    }

    pub fn query<E: std::fmt::Display>(operation: &'static str, e: E) -> Self {
        Self::QueryError {
            operation,
            details: e.to_string(),
        }
    }

    pub fn not_found(operation: &'static str, entity: &'static str, key: String) -> Self {
        Self::NotFound {
            operation,
            entity,
            key,
        }
    }
}

impl IsNotFoundError for StorageError {
    fn is_not_found_error(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}
