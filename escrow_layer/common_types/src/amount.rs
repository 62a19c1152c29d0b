//   Copyright 2024 The Tari Project
//   SPDX-License-Identifier: BSD-3-Clause

use std::{
    fmt::{Display, Formatter},
    str::FromStr,
};

use newtype_ops::newtype_ops;
use serde::{Deserialize, Serialize};

/// A settlement amount in the base units of its [Currency]. The unit is opaque
/// to the lifecycle logic; only the payment backend interprets it.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Amount(pub u64);

impl Amount {
    pub const fn zero() -> Self {
        Self(0)
    }

    pub fn as_u64(self) -> u64 {
        self.0
    }

    pub fn is_zero(self) -> bool {
        self.0 == 0
    }

    pub fn checked_sub(self, other: Amount) -> Option<Amount> {
        self.0.checked_sub(other.0).map(Amount)
    }

    pub fn saturating_add(self, other: Amount) -> Amount {
        Amount(self.0.saturating_add(other.0))
    }
}

impl From<u64> for Amount {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

impl Display for Amount {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

newtype_ops! { [Amount] {add sub} {:=} Self Self }
newtype_ops! { [Amount] {add sub} {:=} &Self &Self }
newtype_ops! { [Amount] {add sub} {:=} Self &Self }

/// The currency tag attached to an amount. Fiat-pegged deals settle in USDC,
/// on-chain deals settle in the native token.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Currency {
    Usdc,
    Sol,
}

impl Display for Currency {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Currency::Usdc => write!(f, "Usdc"),
            Currency::Sol => write!(f, "Sol"),
        }
    }
}

impl FromStr for Currency {
    type Err = InvalidCurrency;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Usdc" => Ok(Currency::Usdc),
            "Sol" => Ok(Currency::Sol),
            _ => Err(InvalidCurrency(s.to_string())),
        }
    }
}

#[derive(Debug, thiserror::Error)]
#[error("Invalid currency '{0}'")]
pub struct InvalidCurrency(pub String);
