//! Deterministic benchmark payloads.
//!
//! The byte buffers are built once per process and shared read-only by every
//! put and every storm worker, so allocation of the payload itself never shows
//! up in a measurement. The encoded record is the exception: it is serialised
//! on every put because that cost is what the object scenarios measure.

use std::sync::{Arc, OnceLock};

use prost::Message;
use rand::rngs::StdRng;
use rand::{RngCore, SeedableRng};

use crate::cache::Value;
use crate::error::Result;

/// An immutable byte payload, cheap to clone into a cache.
pub type Blob = Arc<[u8]>;

pub const SMALL_LEN: usize = 1024;
pub const LARGE_LEN: usize = 1 << 20;

const SMALL_SEED: u64 = 0x1_0000;
const LARGE_SEED: u64 = 0x10_0000;

static SMALL: OnceLock<Blob> = OnceLock::new();
static LARGE: OnceLock<Blob> = OnceLock::new();

/// The shared 1 KiB payload.
pub fn small() -> Blob {
    SMALL.get_or_init(|| filled(SMALL_LEN, SMALL_SEED)).clone()
}

/// The shared 1 MiB payload.
pub fn large() -> Blob {
    LARGE.get_or_init(|| filled(LARGE_LEN, LARGE_SEED)).clone()
}

fn filled(len: usize, seed: u64) -> Blob {
    let mut bytes = vec![0u8; len];
    StdRng::seed_from_u64(seed).fill_bytes(&mut bytes);
    bytes.into()
}

/// A small user profile standing in for "real" cached objects.
#[derive(Clone, PartialEq, Message)]
pub struct UserInfo {
    #[prost(uint64, tag = "1")]
    pub uid: u64,
    #[prost(string, tag = "2")]
    pub name: String,
    #[prost(string, tag = "3")]
    pub email: String,
    #[prost(uint32, tag = "4")]
    pub age: u32,
    #[prost(string, repeated, tag = "5")]
    pub tags: Vec<String>,
    #[prost(int64, tag = "6")]
    pub created_at: i64,
}

pub fn encode_record(record: &UserInfo) -> Result<Blob> {
    let mut buf = Vec::with_capacity(record.encoded_len());
    record.encode(&mut buf)?;
    Ok(buf.into())
}

/// Produces the value stored under the `i`-th key of a workload.
pub trait PayloadSource: Sync {
    type Value: Value;

    fn produce(&self, i: u64) -> Result<Self::Value>;
}

/// The loop index itself, offset by one so no entry is zero.
#[derive(Debug, Clone, Copy, Default)]
pub struct Tiny;

impl PayloadSource for Tiny {
    type Value = u64;

    #[inline]
    fn produce(&self, i: u64) -> Result<u64> {
        Ok(i + 1)
    }
}

/// The same pre-built buffer for every key.
#[derive(Debug, Clone)]
pub struct Fixed(pub Blob);

impl PayloadSource for Fixed {
    type Value = Blob;

    #[inline]
    fn produce(&self, _: u64) -> Result<Blob> {
        Ok(self.0.clone())
    }
}

/// A default `UserInfo` stored as a struct, for backends that keep typed values.
#[derive(Debug, Clone, Copy, Default)]
pub struct Record;

impl PayloadSource for Record {
    type Value = UserInfo;

    fn produce(&self, _: u64) -> Result<UserInfo> {
        Ok(UserInfo::default())
    }
}

/// A default `UserInfo` serialised on every call.
#[derive(Debug, Clone, Copy, Default)]
pub struct EncodedRecord;

impl PayloadSource for EncodedRecord {
    type Value = Blob;

    fn produce(&self, _: u64) -> Result<Blob> {
        encode_record(&UserInfo::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_buffer_lengths_are_stable() {
        for _ in 0..3 {
            assert_eq!(small().len(), 1024);
            assert_eq!(large().len(), 1_048_576);
        }
    }

    #[test]
    fn test_buffers_are_shared_and_reproducible() {
        assert!(Arc::ptr_eq(&small(), &small()));
        assert_eq!(&small()[..], &filled(SMALL_LEN, SMALL_SEED)[..]);
        assert_ne!(&small()[..], &large()[..SMALL_LEN]);
    }

    #[test]
    fn test_tiny_is_index_plus_one() {
        assert_eq!(Tiny.produce(0).unwrap(), 1);
        assert_eq!(Tiny.produce(41).unwrap(), 42);
    }

    #[test]
    fn test_default_record_encodes_empty() {
        assert!(EncodedRecord.produce(0).unwrap().is_empty());
    }

    #[test]
    fn test_record_encoding_decodes_back() {
        let record = UserInfo {
            uid: 7,
            name: "ada".to_string(),
            email: "ada@example.com".to_string(),
            age: 36,
            tags: vec!["admin".to_string()],
            created_at: 1_700_000_000,
        };
        let bytes = encode_record(&record).unwrap();
        assert_eq!(bytes.len(), record.encoded_len());
        assert_eq!(UserInfo::decode(&bytes[..]).unwrap(), record);
    }
}
