//! Call signatures: an ordered parameter kind sequence plus a return kind.
//!
//! Two signatures that erase to the same sequence are structurally
//! equivalent and share one call-signature form in the registry. The slot
//! total is bounded because downstream physical calling sequences address
//! slots with a single byte.

use std::fmt;

use crate::error::SignatureError;
use crate::slot::{SlotKind, TypeKind};

/// Hard upper bound on a signature's parameter slot total.
///
/// Implementation-tuned constant; the bound itself (rejection with
/// [`SignatureError::ArityExceeded`]) is contractual, the value is not.
pub const MAX_SLOT_COUNT: u32 = 255;

/// An ordered sequence of parameter kinds plus one return kind.
///
/// Structural `Eq`/`Hash`; the form registry interns by value.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct CallSignature {
    params: Vec<TypeKind>,
    ret: TypeKind,
}

impl CallSignature {
    /// Build a signature, rejecting one whose slot total exceeds
    /// [`MAX_SLOT_COUNT`].
    pub fn new(params: Vec<TypeKind>, ret: TypeKind) -> Result<Self, SignatureError> {
        let slots: u32 = params.iter().map(|k| k.erased().slot_width()).sum();
        if slots > MAX_SLOT_COUNT {
            return Err(SignatureError::ArityExceeded {
                slots,
                max: MAX_SLOT_COUNT,
            });
        }
        Ok(Self { params, ret })
    }

    /// Signature built from already-erased slot kinds.
    pub fn erased_from(params: &[SlotKind], ret: SlotKind) -> Result<Self, SignatureError> {
        Self::new(
            params.iter().copied().map(TypeKind::canonical).collect(),
            TypeKind::canonical(ret),
        )
    }

    /// Number of logical parameters.
    #[inline]
    pub fn param_count(&self) -> usize {
        self.params.len()
    }

    /// Parameter kind at `i`.
    #[inline]
    pub fn param(&self, i: usize) -> TypeKind {
        self.params[i]
    }

    /// Parameter kinds in order.
    #[inline]
    pub fn params(&self) -> &[TypeKind] {
        &self.params
    }

    /// Return kind.
    #[inline]
    pub fn ret(&self) -> TypeKind {
        self.ret
    }

    /// Physical slots the parameters occupy (64-bit kinds count twice).
    pub fn param_slot_count(&self) -> u32 {
        self.params.iter().map(|k| k.erased().slot_width()).sum()
    }

    /// Physical slots the return value occupies.
    pub fn return_slot_count(&self) -> u32 {
        self.ret.erased().slot_width()
    }

    /// True when every kind is the canonical representative of its
    /// erasure, i.e. `self.erased() == *self`.
    pub fn is_erased(&self) -> bool {
        self.params.iter().all(|k| k.is_canonical()) && self.ret.is_canonical()
    }

    /// The erased signature. Idempotent: erasing twice equals erasing
    /// once.
    pub fn erased(&self) -> Self {
        Self {
            params: self
                .params
                .iter()
                .map(|k| TypeKind::canonical(k.erased()))
                .collect(),
            ret: TypeKind::canonical(self.ret.erased()),
        }
    }

    /// Erased parameter kinds in order.
    pub fn erased_params(&self) -> impl Iterator<Item = SlotKind> + '_ {
        self.params.iter().map(|k| k.erased())
    }
}

impl fmt::Display for CallSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("(")?;
        for (i, p) in self.params.iter().enumerate() {
            if i > 0 {
                f.write_str(",")?;
            }
            write!(f, "{p}")?;
        }
        write!(f, ")->{}", self.ret)
    }
}

impl fmt::Debug for CallSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CallSignature({self})")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn slot_counting_accounts_for_wide_kinds() {
        let sig = CallSignature::new(
            vec![TypeKind::Reference, TypeKind::I64, TypeKind::F64, TypeKind::Bool],
            TypeKind::I64,
        )
        .unwrap();
        assert_eq!(sig.param_count(), 4);
        assert_eq!(sig.param_slot_count(), 6);
        assert_eq!(sig.return_slot_count(), 2);
    }

    #[test]
    fn over_limit_signature_is_rejected() {
        let err = CallSignature::new(vec![TypeKind::I64; 128], TypeKind::Void).unwrap_err();
        assert_eq!(
            err,
            SignatureError::ArityExceeded {
                slots: 256,
                max: MAX_SLOT_COUNT
            }
        );
        // 127 longs and one int fit exactly.
        let mut params = vec![TypeKind::I64; 127];
        params.push(TypeKind::I32);
        assert!(CallSignature::new(params, TypeKind::Void).is_ok());
    }

    #[test]
    fn erasure_is_idempotent_and_detected() {
        let sig = CallSignature::new(
            vec![TypeKind::Bool, TypeKind::I16, TypeKind::Reference],
            TypeKind::I8,
        )
        .unwrap();
        assert!(!sig.is_erased());
        let erased = sig.erased();
        assert!(erased.is_erased());
        assert_eq!(erased.erased(), erased);
        assert_eq!(erased.params(), &[TypeKind::I32, TypeKind::I32, TypeKind::Reference]);
        assert_eq!(erased.ret(), TypeKind::I32);
    }

    #[test]
    fn display_form() {
        let sig = CallSignature::new(vec![TypeKind::Reference, TypeKind::I32], TypeKind::Void)
            .unwrap();
        assert_eq!(sig.to_string(), "(ref,i32)->void");
    }
}
