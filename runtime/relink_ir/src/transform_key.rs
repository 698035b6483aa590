//! Compact structural descriptors for memoized plan edits.
//!
//! A key is an edit-kind tag plus a short sequence of small integers
//! (positions, kind ordinals, counts, identity tokens). When every
//! component fits a byte and there are few enough of them, the key packs
//! into one machine word; otherwise it carries an explicit byte sequence.
//! Packing is decided canonically at construction, so two keys built from
//! equal components always choose the same representation and derived
//! equality is representation-independent.

use smallvec::SmallVec;

/// Edit-kind tag, one per plan-editor operation.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum TransformKind {
    BindArgument = 1,
    AddArgument = 2,
    DupArgument = 3,
    SpreadArguments = 4,
    FilterArgument = 5,
    FilterReturn = 6,
    CollectArguments = 7,
    CollectArgumentsToArray = 8,
    FoldArguments = 9,
    PermuteArguments = 10,
}

/// Maximum component count for the packed representation: one word holds
/// the kind tag, the component count, and six byte-sized components.
const PACKED_MAX_PARTS: usize = 6;

#[derive(Clone, PartialEq, Eq, Hash, Debug)]
enum Repr {
    /// kind in byte 0, count in byte 1, components in bytes 2..8.
    Packed(u64),
    /// kind byte followed by each component as 4 little-endian bytes.
    Bytes(SmallVec<[u8; 24]>),
}

/// A structural edit descriptor, usable as a cache key.
#[derive(Clone, PartialEq, Eq, Hash, Debug)]
pub struct TransformKey(Repr);

impl TransformKey {
    /// Build a key from an edit kind and its integer components.
    pub fn new(kind: TransformKind, parts: &[u32]) -> Self {
        let packable =
            parts.len() <= PACKED_MAX_PARTS && parts.iter().all(|&p| p <= u32::from(u8::MAX));
        if packable {
            let mut word = u64::from(kind as u8) | (parts.len() as u64) << 8;
            for (i, &p) in parts.iter().enumerate() {
                word |= u64::from(p as u8) << (16 + 8 * i);
            }
            Self(Repr::Packed(word))
        } else {
            let mut bytes = SmallVec::new();
            bytes.push(kind as u8);
            for &p in parts {
                bytes.extend_from_slice(&p.to_le_bytes());
            }
            Self(Repr::Bytes(bytes))
        }
    }

    /// The edit kind this key describes.
    pub fn kind(&self) -> TransformKind {
        let tag = match &self.0 {
            Repr::Packed(word) => (word & 0xFF) as u8,
            Repr::Bytes(bytes) => bytes[0],
        };
        match tag {
            1 => TransformKind::BindArgument,
            2 => TransformKind::AddArgument,
            3 => TransformKind::DupArgument,
            4 => TransformKind::SpreadArguments,
            5 => TransformKind::FilterArgument,
            6 => TransformKind::FilterReturn,
            7 => TransformKind::CollectArguments,
            8 => TransformKind::CollectArgumentsToArray,
            9 => TransformKind::FoldArguments,
            10 => TransformKind::PermuteArguments,
            _ => unreachable!("corrupt transform key tag"),
        }
    }

    /// True when the key fits the single-word representation.
    pub fn is_packed(&self) -> bool {
        matches!(self.0, Repr::Packed(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn small_components_pack() {
        let key = TransformKey::new(TransformKind::BindArgument, &[3, 1]);
        assert!(key.is_packed());
        assert_eq!(key.kind(), TransformKind::BindArgument);
    }

    #[test]
    fn equal_components_give_equal_keys() {
        let a = TransformKey::new(TransformKind::SpreadArguments, &[2, 1, 4]);
        let b = TransformKey::new(TransformKind::SpreadArguments, &[2, 1, 4]);
        assert_eq!(a, b);
    }

    #[test]
    fn distinct_kinds_or_components_differ() {
        let a = TransformKey::new(TransformKind::AddArgument, &[1, 0]);
        let b = TransformKey::new(TransformKind::DupArgument, &[1, 0]);
        let c = TransformKey::new(TransformKind::AddArgument, &[1, 1]);
        assert_ne!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn large_components_fall_back_to_bytes() {
        let key = TransformKey::new(TransformKind::CollectArguments, &[1, 0xDEAD_BEEF, 7]);
        assert!(!key.is_packed());
        assert_eq!(key.kind(), TransformKind::CollectArguments);
        let same = TransformKey::new(TransformKind::CollectArguments, &[1, 0xDEAD_BEEF, 7]);
        assert_eq!(key, same);
    }

    #[test]
    fn long_sequences_fall_back_to_bytes() {
        let key = TransformKey::new(TransformKind::PermuteArguments, &[1, 0, 1, 2, 3, 4, 5]);
        assert!(!key.is_packed());
        // Trailing zero components must still distinguish keys.
        let shorter = TransformKey::new(TransformKind::PermuteArguments, &[1, 0, 1, 2, 3, 4]);
        assert_ne!(key, shorter);
    }

    #[test]
    fn zero_component_is_distinguished_from_absence() {
        let with_zero = TransformKey::new(TransformKind::FilterReturn, &[5, 0]);
        let without = TransformKey::new(TransformKind::FilterReturn, &[5]);
        assert_ne!(with_zero, without);
    }
}
