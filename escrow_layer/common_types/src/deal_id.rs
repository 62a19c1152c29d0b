//   Copyright 2024 The Tari Project
//   SPDX-License-Identifier: BSD-3-Clause

use std::{
    fmt::{Display, Formatter},
    str::FromStr,
};

use rand::{rngs::OsRng, RngCore};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DealId([u8; 32]);

impl DealId {
    pub fn new(id: [u8; 32]) -> Self {
        Self(id)
    }

    pub fn new_random() -> Self {
        let mut id = [0u8; 32];
        OsRng.fill_bytes(&mut id);
        Self(id)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn into_array(self) -> [u8; 32] {
        self.0
    }

    pub fn from_hex(s: &str) -> Result<Self, DealIdParseError> {
        let bytes = hex::decode(s).map_err(|_| DealIdParseError)?;
        let id = <[u8; 32]>::try_from(bytes.as_slice()).map_err(|_| DealIdParseError)?;
        Ok(Self(id))
    }
}

impl Display for DealId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", hex::encode(self.0))
    }
}

impl FromStr for DealId {
    type Err = DealIdParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_hex(s)
    }
}

impl Serialize for DealId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for DealId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = <String as Deserialize>::deserialize(deserializer)?;
        Self::from_hex(&s).map_err(serde::de::Error::custom)
    }
}

#[derive(Debug, thiserror::Error)]
#[error("Invalid deal id: expected 32 bytes of hex")]
pub struct DealIdParseError;
