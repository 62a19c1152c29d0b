// Copyright 2024 The Tari Project
// SPDX-License-Identifier: BSD-3-Clause

use axum::Json;
use serde_json::{json, Value};

pub async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}
