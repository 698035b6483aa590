//! The lowering seam.
//!
//! Turning a plan into something directly executable is the embedding
//! runtime's business; the core only defines the seam and ships the
//! interpreter-backed fallback. A code-generating backend implements
//! [`Lowering`] and hands out its own [`EntryPoint`]s.

use std::fmt;
use std::sync::Arc;

use relink_ir::{EvalError, Value};
use relink_plan::{interpret, Plan};

/// An executable rendition of one plan.
pub trait EntryPoint: Send + Sync {
    /// The plan this entry point executes.
    fn plan(&self) -> &Arc<Plan>;

    /// Run the plan against concrete arguments.
    ///
    /// Must agree exactly with [`relink_plan::interpret`] on the same
    /// plan and arguments.
    fn invoke(&self, args: &[Value]) -> Result<Value, EvalError>;
}

impl fmt::Debug for dyn EntryPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EntryPoint({})", self.plan())
    }
}

/// A strategy for producing executable entry points from plans.
pub trait Lowering: Send + Sync {
    /// Lower `plan` into an executable form.
    fn compile_to_executable(&self, plan: &Arc<Plan>) -> Arc<dyn EntryPoint>;
}

/// The fallback strategy: every plan runs on the reference interpreter.
#[derive(Debug, Default, Clone, Copy)]
pub struct InterpreterLowering;

impl Lowering for InterpreterLowering {
    fn compile_to_executable(&self, plan: &Arc<Plan>) -> Arc<dyn EntryPoint> {
        Arc::new(InterpretedEntry {
            plan: Arc::clone(plan),
        })
    }
}

struct InterpretedEntry {
    plan: Arc<Plan>,
}

impl EntryPoint for InterpretedEntry {
    fn plan(&self) -> &Arc<Plan> {
        &self.plan
    }

    fn invoke(&self, args: &[Value]) -> Result<Value, EvalError> {
        interpret(&self.plan, args)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use relink_ir::SlotKind;
    use relink_plan::{Node, NodeIdx, Op};

    #[test]
    fn interpreted_entry_matches_the_interpreter() {
        let plan = Arc::new(
            Plan::new(
                2,
                0,
                vec![
                    Node::param(SlotKind::Ref),
                    Node::param(SlotKind::Int),
                    Node::expr(
                        SlotKind::Long,
                        Op::Convert { to: SlotKind::Long },
                        [NodeIdx::from_raw(1)],
                    ),
                ],
                Some(2),
            )
            .unwrap(),
        );
        let entry = InterpreterLowering.compile_to_executable(&plan);
        let args = [Value::Reference(None), Value::Int(3)];
        assert_eq!(entry.invoke(&args), interpret(&plan, &args));
        assert!(Arc::ptr_eq(entry.plan(), &plan));
    }
}
