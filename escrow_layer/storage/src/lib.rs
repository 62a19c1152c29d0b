//   Copyright 2024 The Tari Project
//   SPDX-License-Identifier: BSD-3-Clause

pub mod models;

mod error;
mod store;

pub use error::StorageError;
pub use store::{DealStore, DealStoreReadTransaction, DealStoreWriteTransaction};
