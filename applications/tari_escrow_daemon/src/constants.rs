// Copyright 2024 The Tari Project
// SPDX-License-Identifier: BSD-3-Clause

pub const DEFAULT_ESCROWD_BASE_PATH: &str = "data/escrowd";
pub const DEFAULT_ESCROWD_CONFIG_PATH: &str = "data/escrowd/config.toml";
pub const DEFAULT_DATABASE_FILE: &str = "escrow.sqlite";
pub const DEFAULT_LISTEN_ADDRESS: &str = "127.0.0.1:9420";
