//! Runtime values for interpreting plans.
//!
//! One variant per erased slot kind. Reference payloads are opaque
//! `Arc<dyn Any>` so the core stays independent of what the embedding
//! runtime actually passes around; the two payloads the core itself
//! understands are [`CaptureRecord`] (bound-capture state carried at
//! position 0) and [`ArrayValue`] (spread/collect arrays).

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use crate::slot::SlotKind;

/// A single runtime value, tagged with its erased storage class.
#[derive(Clone)]
pub enum Value {
    /// A reference value; `None` is the null reference.
    Reference(Option<Arc<dyn Any + Send + Sync>>),
    Int(i32),
    Long(i64),
    Float(f32),
    Double(f64),
    Void,
}

impl Value {
    /// The erased kind of this value.
    #[inline]
    pub fn kind(&self) -> SlotKind {
        match self {
            Self::Reference(_) => SlotKind::Ref,
            Self::Int(_) => SlotKind::Int,
            Self::Long(_) => SlotKind::Long,
            Self::Float(_) => SlotKind::Float,
            Self::Double(_) => SlotKind::Double,
            Self::Void => SlotKind::Void,
        }
    }

    /// The zero/default value of a kind (null for references).
    pub fn zero(kind: SlotKind) -> Self {
        match kind {
            SlotKind::Ref => Self::Reference(None),
            SlotKind::Int => Self::Int(0),
            SlotKind::Long => Self::Long(0),
            SlotKind::Float => Self::Float(0.0),
            SlotKind::Double => Self::Double(0.0),
            SlotKind::Void => Self::Void,
        }
    }

    /// Wrap a payload as a non-null reference value.
    pub fn reference<T: Any + Send + Sync>(payload: T) -> Self {
        Self::Reference(Some(Arc::new(payload)))
    }

    /// Downcast a non-null reference payload.
    pub fn downcast_ref<T: Any + Send + Sync>(&self) -> Option<&T> {
        match self {
            Self::Reference(Some(arc)) => arc.downcast_ref::<T>(),
            _ => None,
        }
    }
}

impl PartialEq for Value {
    /// References compare by identity (both null, or same allocation);
    /// primitives compare by value.
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Reference(None), Self::Reference(None)) => true,
            (Self::Reference(Some(a)), Self::Reference(Some(b))) => Arc::ptr_eq(a, b),
            (Self::Int(a), Self::Int(b)) => a == b,
            (Self::Long(a), Self::Long(b)) => a == b,
            (Self::Float(a), Self::Float(b)) => a == b,
            (Self::Double(a), Self::Double(b)) => a == b,
            (Self::Void, Self::Void) => true,
            _ => false,
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Reference(None) => f.write_str("ref(null)"),
            Self::Reference(Some(arc)) => write!(f, "ref({:p})", Arc::as_ptr(arc)),
            Self::Int(v) => write!(f, "int({v})"),
            Self::Long(v) => write!(f, "long({v})"),
            Self::Float(v) => write!(f, "float({v})"),
            Self::Double(v) => write!(f, "double({v})"),
            Self::Void => f.write_str("void"),
        }
    }
}

/// The bound-capture payload carried by a plan's position 0.
///
/// Bind edits fold argument values into this record; the generated
/// accessor expressions read it back by index at call time.
#[derive(Debug, Clone, Default)]
pub struct CaptureRecord {
    values: Vec<Value>,
}

impl CaptureRecord {
    /// An empty record (the state every unbound plan starts from).
    pub fn empty() -> Self {
        Self::default()
    }

    /// A record holding the given captured values in bind order.
    pub fn new(values: Vec<Value>) -> Self {
        Self { values }
    }

    /// Number of captured values.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// True when nothing has been bound yet.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// The captured value at `index`.
    pub fn get(&self, index: usize) -> Option<&Value> {
        self.values.get(index)
    }

    /// A copy of this record with one more captured value appended.
    pub fn with(&self, value: Value) -> Self {
        let mut values = self.values.clone();
        values.push(value);
        Self { values }
    }
}

/// A homogeneous array payload, produced by collect-to-array and consumed
/// by spread element reads.
#[derive(Debug, Clone)]
pub struct ArrayValue {
    elem: SlotKind,
    values: Vec<Value>,
}

impl ArrayValue {
    /// Build an array, checking element kinds.
    pub fn new(elem: SlotKind, values: Vec<Value>) -> Result<Self, crate::error::EvalError> {
        for v in &values {
            if v.kind() != elem {
                return Err(crate::error::EvalError::KindMismatch {
                    expected: elem,
                    found: v.kind(),
                });
            }
        }
        Ok(Self { elem, values })
    }

    /// Element kind.
    pub fn elem(&self) -> SlotKind {
        self.elem
    }

    /// Element count.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// True for a zero-length array.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// The element at `index`.
    pub fn get(&self, index: usize) -> Option<&Value> {
        self.values.get(index)
    }
}
