//   Copyright 2024 The Tari Project
//   SPDX-License-Identifier: BSD-3-Clause

pub mod optional;

mod actor_id;
mod amount;
mod deal_id;
mod duration_hours;
mod request_id;

pub use actor_id::ActorId;
pub use amount::{Amount, Currency, InvalidCurrency};
pub use deal_id::{DealId, DealIdParseError};
pub use duration_hours::{DurationHours, InvalidDurationHours};
pub use request_id::RequestId;
