//! SHA-256 fingerprint builder

use std::fmt;

use sha2::{Digest, Sha256};

use crate::value::SqlValue;

/// A 256-bit configuration fingerprint
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Fingerprint([u8; 32]);

impl Fingerprint {
    /// Raw digest bytes
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Lowercase hex encoding
    pub fn to_hex(&self) -> String {
        self.0.iter().map(|b| format!("{:02x}", b)).collect()
    }

    /// First 12 hex characters, for log lines
    pub fn short(&self) -> String {
        self.to_hex()[..12].to_string()
    }

    /// Fingerprint of an ordered combination of fingerprints
    pub fn combine(domain: &str, parts: &[Fingerprint]) -> Fingerprint {
        let mut builder = FingerprintBuilder::new(domain);
        for part in parts {
            builder.fingerprint(part);
        }
        builder.finish()
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl fmt::Debug for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Fingerprint({})", self.short())
    }
}

/// Incremental builder over a length-prefixed canonical encoding.
///
/// Every write is prefixed with its length so adjacent strings can never
/// collide by concatenation ("ab","c" vs "a","bc").
pub struct FingerprintBuilder {
    hasher: Sha256,
}

impl FingerprintBuilder {
    /// Start a fingerprint in the given domain
    pub fn new(domain: &str) -> Self {
        let mut builder = Self {
            hasher: Sha256::new(),
        };
        builder.str(domain);
        builder
    }

    /// Hash a string
    pub fn str(&mut self, s: &str) -> &mut Self {
        self.u64(s.len() as u64);
        self.hasher.update(s.as_bytes());
        self
    }

    /// Hash an optional string, distinguishing absent from empty
    pub fn opt_str(&mut self, s: Option<&str>) -> &mut Self {
        match s {
            Some(s) => {
                self.u8(1);
                self.str(s)
            }
            None => self.u8(0),
        }
    }

    /// Hash a byte
    pub fn u8(&mut self, v: u8) -> &mut Self {
        self.hasher.update([v]);
        self
    }

    /// Hash a u64 (big endian)
    pub fn u64(&mut self, v: u64) -> &mut Self {
        self.hasher.update(v.to_be_bytes());
        self
    }

    /// Hash a list of strings, preserving order
    pub fn list<'a>(&mut self, items: impl IntoIterator<Item = &'a str>) -> &mut Self {
        let items: Vec<&str> = items.into_iter().collect();
        self.u64(items.len() as u64);
        for item in items {
            self.str(item);
        }
        self
    }

    /// Hash a nested fingerprint
    pub fn fingerprint(&mut self, fp: &Fingerprint) -> &mut Self {
        self.hasher.update(fp.0);
        self
    }

    /// Hash a SQL value including its type tag
    pub fn value(&mut self, value: &SqlValue) -> &mut Self {
        self.u8(value.tag());
        match value {
            SqlValue::Null => self,
            SqlValue::Bool(b) => self.u8(u8::from(*b)),
            SqlValue::Int(i) => self.u64(*i as u64),
            SqlValue::Float(x) => self.u64(x.to_bits()),
            SqlValue::Text(s) => self.str(s),
            SqlValue::Bytes(b) => {
                self.u64(b.len() as u64);
                self.hasher.update(b);
                self
            }
            SqlValue::Timestamp(t) => {
                self.u64(t.timestamp() as u64);
                self.u64(u64::from(t.timestamp_subsec_nanos()))
            }
        }
    }

    /// Finish and return the fingerprint
    pub fn finish(self) -> Fingerprint {
        Fingerprint(self.hasher.finalize().into())
    }
}
