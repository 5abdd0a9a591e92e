use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicU32, Ordering};

use chrono::{DateTime, Utc};
use lazy_static::lazy_static;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use uuid::Uuid;

use crate::core::{RepositoryError, Result};
use crate::entity::key_value::{AsKeyValue, KeyValue};

const RANDOM_MAX: u64 = 0xFF_FFFF_FFFF;
const INCREMENT_MASK: u32 = 0xFF_FFFF;

lazy_static! {
    // Per-process random value occupying the middle five bytes, so ids from
    // different processes diverge even within the same second.
    static ref PROCESS_RANDOM: u64 = {
        let seed = Uuid::new_v4();
        let bytes = seed.as_bytes();
        (u64::from(bytes[0]) << 32)
            | (u64::from(bytes[1]) << 24)
            | (u64::from(bytes[2]) << 16)
            | (u64::from(bytes[3]) << 8)
            | u64::from(bytes[4])
    };
    static ref COUNTER: AtomicU32 = {
        let seed = Uuid::new_v4();
        let bytes = seed.as_bytes();
        let start = (u32::from(bytes[5]) << 16) | (u32::from(bytes[6]) << 8) | u32::from(bytes[7]);
        AtomicU32::new(start & INCREMENT_MASK)
    };
}

/// A 12-byte unique identifier that sorts chronologically.
///
/// Layout: 4-byte big-endian unsigned timestamp (seconds since the unix
/// epoch), 5-byte per-process random value, 3-byte incrementing counter.
/// The hex form is 24 lowercase characters and orders the same way the
/// bytes do.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ObjectId([u8; 12]);

impl ObjectId {
    /// Generates a new id stamped with the current time.
    pub fn generate() -> Self {
        Self::generate_with_timestamp(Utc::now().timestamp() as u32)
    }

    /// Generates a new id for the given creation time.
    pub fn generate_with_time(time: DateTime<Utc>) -> Self {
        Self::generate_with_timestamp(time.timestamp() as u32)
    }

    /// Generates a new id for the given unsigned epoch-seconds timestamp.
    pub fn generate_with_timestamp(timestamp: u32) -> Self {
        let increment = COUNTER.fetch_add(1, Ordering::Relaxed) & INCREMENT_MASK;
        // Inputs are masked into range, so create cannot fail here.
        match Self::create(timestamp, *PROCESS_RANDOM, increment) {
            Ok(id) => id,
            Err(_) => unreachable!("masked ObjectId components are always in range"),
        }
    }

    /// Builds an id from its raw components.
    ///
    /// `random` must fit in five bytes and `increment` in three.
    pub fn create(timestamp: u32, random: u64, increment: u32) -> Result<Self> {
        if random > RANDOM_MAX {
            return Err(RepositoryError::InvalidArgument(
                "ObjectId random component must fit in five bytes".to_string(),
            ));
        }
        if increment > INCREMENT_MASK {
            return Err(RepositoryError::InvalidArgument(
                "ObjectId increment component must fit in three bytes".to_string(),
            ));
        }

        let mut bytes = [0u8; 12];
        bytes[0..4].copy_from_slice(&timestamp.to_be_bytes());
        bytes[4] = (random >> 32) as u8;
        bytes[5] = (random >> 24) as u8;
        bytes[6] = (random >> 16) as u8;
        bytes[7] = (random >> 8) as u8;
        bytes[8] = random as u8;
        bytes[9] = (increment >> 16) as u8;
        bytes[10] = (increment >> 8) as u8;
        bytes[11] = increment as u8;
        Ok(Self(bytes))
    }

    /// Builds an id from its 12-byte representation.
    pub fn from_bytes(bytes: [u8; 12]) -> Self {
        Self(bytes)
    }

    /// Parses the 24-character hex representation.
    pub fn parse(value: &str) -> Result<Self> {
        if value.len() != 24 || !value.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(RepositoryError::InvalidArgument(format!(
                "'{value}' is not a valid 24 character hex ObjectId"
            )));
        }

        let mut bytes = [0u8; 12];
        for (index, chunk) in value.as_bytes().chunks(2).enumerate() {
            let pair = std::str::from_utf8(chunk)
                .map_err(|_| RepositoryError::InvalidArgument("invalid hex input".to_string()))?;
            bytes[index] = u8::from_str_radix(pair, 16)
                .map_err(|_| RepositoryError::InvalidArgument("invalid hex input".to_string()))?;
        }
        Ok(Self(bytes))
    }

    /// The raw 12-byte representation.
    pub fn bytes(&self) -> [u8; 12] {
        self.0
    }

    /// The embedded unsigned epoch-seconds timestamp.
    pub fn timestamp(&self) -> u32 {
        u32::from_be_bytes([self.0[0], self.0[1], self.0[2], self.0[3]])
    }

    /// The creation time derived from the embedded timestamp.
    pub fn creation_time(&self) -> DateTime<Utc> {
        DateTime::from_timestamp(i64::from(self.timestamp()), 0)
            .expect("u32 epoch seconds are always within range")
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for byte in &self.0 {
            write!(f, "{byte:02x}")?;
        }
        Ok(())
    }
}

impl fmt::Debug for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ObjectId({self})")
    }
}

impl FromStr for ObjectId {
    type Err = RepositoryError;

    fn from_str(value: &str) -> Result<Self> {
        Self::parse(value)
    }
}

impl AsKeyValue for ObjectId {
    fn as_key_value(&self) -> KeyValue {
        KeyValue::Text(self.to_string())
    }
}

impl Serialize for ObjectId {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for ObjectId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let value = String::deserialize(deserializer)?;
        Self::parse(&value).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn component_packing() {
        let id = ObjectId::create(0x0102_0304, 0x0005_0607_0809, 0x000a_0b0c).unwrap();
        assert_eq!(
            id.bytes(),
            [1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12],
        );
        assert_eq!(id.to_string(), "0102030405060708090a0b0c");
    }

    #[test]
    fn out_of_range_components_are_rejected() {
        assert!(ObjectId::create(1, RANDOM_MAX + 1, 1).is_err());
        assert!(ObjectId::create(1, 1, INCREMENT_MASK + 1).is_err());
        assert!(ObjectId::create(1, RANDOM_MAX, INCREMENT_MASK).is_ok());
    }

    #[test]
    fn generated_ids_increase() {
        let first = ObjectId::generate_with_timestamp(42);
        let second = ObjectId::generate_with_timestamp(42);
        assert!(first < second);
    }
}
