//! Note commitment and nullifier derivation
//!
//! Hook used by the private note subsystem to derive the commitment and the
//! nullifier of a note held by a contract. All inputs are 32-byte fields and
//! every hash is SHA-256 under a 4-byte domain tag:
//!
//! ```text
//! inner     = H(GEN_INNER_NOTE_HASH  || storage_slot || fields...)
//! siloed    = H(GEN_SILOED_NOTE_HASH || contract || inner)
//! unique    = H(GEN_UNIQUE_NOTE_HASH || nonce || siloed)
//! nullifier = H(GEN_NULLIFIER        || unique)
//! ```

use serde::{Deserialize, Serialize};
use slowgate_core::crypto::hash_domain;
use slowgate_core::{Address, Field, Result, SlowGateError};

/// Domain tag of the note hash over its contents
pub const GEN_INNER_NOTE_HASH: u32 = 1;
/// Domain tag of the note-hash nonce binding
pub const GEN_UNIQUE_NOTE_HASH: u32 = 3;
/// Domain tag of the contract-siloed note hash
pub const GEN_SILOED_NOTE_HASH: u32 = 4;
/// Domain tag of nullifiers
pub const GEN_NULLIFIER: u32 = 5;

/// Every intermediate hash of one note
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NoteHashes {
    /// Hash of the storage slot and note fields
    pub inner: Field,
    /// `inner` bound to the owning contract
    pub siloed: Field,
    /// `siloed` bound to the transaction nonce; the note commitment
    pub unique: Field,
    /// Nullifier spending the note
    pub nullifier: Field,
}

impl NoteHashes {
    /// `(commitment, nullifier)` as consumed by the note subsystem
    pub fn commitment_and_nullifier(&self) -> (Field, Field) {
        (self.unique, self.nullifier)
    }
}

/// Derive the hashes of a note with `fields` stored at `storage_slot` of
/// `contract`. Notes without fields are rejected.
pub fn compute_note_hash_and_nullifier(
    contract: &Address,
    nonce: &Field,
    storage_slot: &Field,
    fields: &[Field],
) -> Result<NoteHashes> {
    if fields.is_empty() {
        return Err(SlowGateError::invalid("note has no fields"));
    }

    let mut parts: Vec<&[u8]> = Vec::with_capacity(fields.len() + 1);
    parts.push(&storage_slot.as_bytes()[..]);
    parts.extend(fields.iter().map(|f| &f.as_bytes()[..]));
    let inner = Field::new(hash_domain(GEN_INNER_NOTE_HASH, &parts));

    let siloed = Field::new(hash_domain(
        GEN_SILOED_NOTE_HASH,
        &[&contract.0.as_bytes()[..], &inner.as_bytes()[..]],
    ));
    let unique = Field::new(hash_domain(
        GEN_UNIQUE_NOTE_HASH,
        &[&nonce.as_bytes()[..], &siloed.as_bytes()[..]],
    ));
    let nullifier = Field::new(hash_domain(GEN_NULLIFIER, &[&unique.as_bytes()[..]]));

    Ok(NoteHashes {
        inner,
        siloed,
        unique,
        nullifier,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use slowgate_core::crypto::hash;

    fn note(contract: &str, nonce: u64, slot: u64, fields: &[u64]) -> NoteHashes {
        let fields: Vec<Field> = fields.iter().copied().map(Field::from_u64).collect();
        compute_note_hash_and_nullifier(
            &Address::new_from_entropy(contract.as_bytes()),
            &Field::from_u64(nonce),
            &Field::from_u64(slot),
            &fields,
        )
        .unwrap()
    }

    #[test]
    fn test_inner_hash_layout() {
        let hashes = note("c", 1, 2, &[3, 4]);

        let mut preimage = GEN_INNER_NOTE_HASH.to_be_bytes().to_vec();
        for n in [2u64, 3, 4] {
            preimage.extend_from_slice(Field::from_u64(n).as_bytes());
        }
        assert_eq!(hashes.inner, Field::new(hash(&preimage)));

        let mut preimage = GEN_NULLIFIER.to_be_bytes().to_vec();
        preimage.extend_from_slice(hashes.unique.as_bytes());
        assert_eq!(hashes.nullifier, Field::new(hash(&preimage)));
    }

    #[test]
    fn test_each_input_is_bound() {
        let base = note("c", 1, 2, &[3]);
        assert_ne!(base.siloed, note("d", 1, 2, &[3]).siloed);
        assert_ne!(base.unique, note("c", 9, 2, &[3]).unique);
        assert_eq!(base.siloed, note("c", 9, 2, &[3]).siloed);
        assert_ne!(base.inner, note("c", 1, 7, &[3]).inner);
        assert_ne!(base.inner, note("c", 1, 2, &[3, 0]).inner);
    }

    #[test]
    fn test_commitment_pair() {
        let hashes = note("c", 1, 2, &[3]);
        assert_eq!(
            hashes.commitment_and_nullifier(),
            (hashes.unique, hashes.nullifier)
        );
    }

    #[test]
    fn test_empty_note_rejected() {
        assert_matches!(
            compute_note_hash_and_nullifier(&Address::ZERO, &Field::ZERO, &Field::ZERO, &[]),
            Err(SlowGateError::Invalid { .. })
        );
    }
}
