use stateset_types::Digest;

/// Domain-separated BLAKE3 hasher.
///
/// Each hasher carries a domain tag (e.g. `"stateset-channel-state-v1"`)
/// that is prepended to every hash computation, so a channel state and a
/// settlement transaction with identical bytes never share a digest.
pub struct DomainHasher {
    domain: &'static str,
}

impl DomainHasher {
    /// Hasher for off-chain channel states (the message that gets signed).
    pub const CHANNEL_STATE: Self = Self {
        domain: "stateset-channel-state-v1",
    };
    /// Hasher for settlement transactions.
    pub const SETTLEMENT_TX: Self = Self {
        domain: "stateset-settlement-tx-v1",
    };

    /// Create a hasher with a custom domain tag.
    pub const fn new(domain: &'static str) -> Self {
        Self { domain }
    }

    /// Hash raw bytes with domain separation.
    pub fn hash(&self, data: &[u8]) -> Digest {
        self.hash_parts(&[data])
    }

    /// Hash a sequence of fields. Each field is length-prefixed so that
    /// `["ab", "c"]` and `["a", "bc"]` produce different digests.
    pub fn hash_parts(&self, parts: &[&[u8]]) -> Digest {
        let mut hasher = blake3::Hasher::new();
        hasher.update(self.domain.as_bytes());
        hasher.update(b":");
        for part in parts {
            hasher.update(&(part.len() as u64).to_be_bytes());
            hasher.update(part);
        }
        Digest::from_hash(*hasher.finalize().as_bytes())
    }

    /// The domain tag used by this hasher.
    pub fn domain(&self) -> &str {
        self.domain
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_is_deterministic() {
        let d1 = DomainHasher::CHANNEL_STATE.hash(b"hello world");
        let d2 = DomainHasher::CHANNEL_STATE.hash(b"hello world");
        assert_eq!(d1, d2);
    }

    #[test]
    fn different_domains_produce_different_hashes() {
        let state = DomainHasher::CHANNEL_STATE.hash(b"same content");
        let tx = DomainHasher::SETTLEMENT_TX.hash(b"same content");
        assert_ne!(state, tx);
    }

    #[test]
    fn field_boundaries_matter() {
        let a = DomainHasher::CHANNEL_STATE.hash_parts(&[&b"ab"[..], &b"c"[..]]);
        let b = DomainHasher::CHANNEL_STATE.hash_parts(&[&b"a"[..], &b"bc"[..]]);
        assert_ne!(a, b);
    }

    #[test]
    fn custom_domain() {
        let hasher = DomainHasher::new("my-custom-domain-v1");
        assert_eq!(hasher.domain(), "my-custom-domain-v1");
        assert_ne!(hasher.hash(b"data"), DomainHasher::CHANNEL_STATE.hash(b"data"));
    }

    #[test]
    fn domain_hash_differs_from_raw_digest() {
        assert_ne!(DomainHasher::CHANNEL_STATE.hash(b"x"), Digest::of(b"x"));
    }
}
