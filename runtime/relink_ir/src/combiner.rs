//! The combiner seam.
//!
//! The surrounding dispatch runtime resolves symbolic member references
//! and access rights out of scope, then hands the core already-validated
//! combiner references. Inside the core a combiner is only two things: a
//! call signature and an invocable behavior. Identity matters — two
//! combiners with equal signatures are still distinct, and transform keys
//! for combiner-carrying edits include the identity token.

use std::fmt;
use std::sync::Arc;

use crate::error::EvalError;
use crate::signature::CallSignature;
use crate::value::Value;

/// An already-resolved, invocable operation reference.
pub trait Combiner: Send + Sync {
    /// The combiner's call signature.
    fn signature(&self) -> &CallSignature;

    /// Apply the combiner to concrete argument values.
    fn invoke(&self, args: &[Value]) -> Result<Value, EvalError>;
}

/// A cloneable, identity-compared handle to a [`Combiner`].
#[derive(Clone)]
pub struct CombinerRef(Arc<dyn Combiner>);

impl CombinerRef {
    /// Wrap a combiner implementation.
    pub fn new(combiner: Arc<dyn Combiner>) -> Self {
        Self(combiner)
    }

    /// Adapt a closure with an explicit signature.
    pub fn from_fn<F>(signature: CallSignature, f: F) -> Self
    where
        F: Fn(&[Value]) -> Result<Value, EvalError> + Send + Sync + 'static,
    {
        Self(Arc::new(FnCombiner { signature, f }))
    }

    /// The combiner's call signature.
    pub fn signature(&self) -> &CallSignature {
        self.0.signature()
    }

    /// Apply the combiner.
    pub fn invoke(&self, args: &[Value]) -> Result<Value, EvalError> {
        self.0.invoke(args)
    }

    /// Stable identity token for this combiner reference, used in
    /// transform keys.
    pub fn token(&self) -> usize {
        Arc::as_ptr(&self.0) as *const () as usize
    }
}

impl PartialEq for CombinerRef {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl Eq for CombinerRef {}

impl fmt::Debug for CombinerRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CombinerRef({} @{:x})", self.signature(), self.token())
    }
}

struct FnCombiner<F> {
    signature: CallSignature,
    f: F,
}

impl<F> Combiner for FnCombiner<F>
where
    F: Fn(&[Value]) -> Result<Value, EvalError> + Send + Sync,
{
    fn signature(&self) -> &CallSignature {
        &self.signature
    }

    fn invoke(&self, args: &[Value]) -> Result<Value, EvalError> {
        if args.len() != self.signature.param_count() {
            return Err(EvalError::ArgCountMismatch {
                expected: self.signature.param_count(),
                found: args.len(),
            });
        }
        (self.f)(args)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::slot::TypeKind;
    use pretty_assertions::assert_eq;

    fn int_negate() -> CombinerRef {
        let sig = CallSignature::new(vec![TypeKind::I32], TypeKind::I32).unwrap();
        CombinerRef::from_fn(sig, |args| match args[0] {
            Value::Int(v) => Ok(Value::Int(-v)),
            ref other => Err(EvalError::KindMismatch {
                expected: crate::SlotKind::Int,
                found: other.kind(),
            }),
        })
    }

    #[test]
    fn identity_not_structure() {
        let a = int_negate();
        let b = int_negate();
        assert_eq!(a, a.clone());
        assert_ne!(a, b);
        assert_ne!(a.token(), b.token());
    }

    #[test]
    fn arg_count_is_checked() {
        let c = int_negate();
        assert_eq!(c.invoke(&[Value::Int(5)]), Ok(Value::Int(-5)));
        assert_eq!(
            c.invoke(&[]),
            Err(EvalError::ArgCountMismatch {
                expected: 1,
                found: 0
            })
        );
    }
}
