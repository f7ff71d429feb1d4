//! Session identifiers.

use rand::rngs::OsRng;
use rand::RngCore;

/// Number of random bytes behind an identifier.
const ID_BYTES: usize = 32;

/// Opaque session identifier handed to clients in the session cookie.
///
/// Generated from the operating system CSPRNG so identifiers cannot be
/// predicted or enumerated.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SessionId(String);

impl SessionId {
    /// Generate a fresh random identifier (256 bits, lowercase hex).
    pub fn generate() -> Self {
        let mut bytes = [0u8; ID_BYTES];
        OsRng.fill_bytes(&mut bytes);
        Self(hex::encode(bytes))
    }

    /// Accept a client-presented value only if it has the shape of an
    /// identifier this proxy issues.
    pub fn parse(value: &str) -> Option<Self> {
        let mut bytes = [0u8; ID_BYTES];
        hex::decode_to_slice(value, &mut bytes).ok()?;
        // Issued identifiers are lowercase; anything else was not ours.
        let canonical = hex::encode(bytes);
        (canonical == value).then_some(Self(canonical))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn generated_ids_are_unique_and_well_formed() {
        let ids: HashSet<_> = (0..1000).map(|_| SessionId::generate()).collect();
        assert_eq!(ids.len(), 1000);
        for id in &ids {
            assert_eq!(id.as_str().len(), 64);
            assert_eq!(SessionId::parse(id.as_str()).as_ref(), Some(id));
        }
    }

    #[test]
    fn rejects_foreign_values() {
        assert!(SessionId::parse("").is_none());
        assert!(SessionId::parse("12345").is_none());
        assert!(SessionId::parse(&"G".repeat(64)).is_none());
        assert!(SessionId::parse(&"A".repeat(64)).is_none());
        assert!(SessionId::parse(&"a".repeat(65)).is_none());
        assert!(SessionId::parse(&"0".repeat(64)).is_some());
    }
}
