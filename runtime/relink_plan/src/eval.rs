//! Reference interpreter over committed plans.
//!
//! This is the behavioral oracle behind every derived plan: a compiled or
//! lowered rendition must produce exactly what [`interpret`] produces for
//! the same plan and arguments. Evaluation is a single forward pass over
//! the node array; argument references always point at earlier positions,
//! so every operand is already computed when its consumer runs.

use relink_ir::{ArrayValue, CaptureRecord, EvalError, SlotKind, Value};

use crate::node::{Node, Op};
use crate::plan::Plan;

/// Evaluate `plan` against concrete argument values, one per parameter.
///
/// Argument kinds are checked strictly against the parameter kinds; the
/// result is [`Value::Void`] for result-less plans.
pub fn interpret(plan: &Plan, args: &[Value]) -> Result<Value, EvalError> {
    let arity = plan.arity();
    if args.len() != arity {
        return Err(EvalError::ArgCountMismatch {
            expected: arity,
            found: args.len(),
        });
    }
    for (pos, arg) in args.iter().enumerate() {
        let expected = plan.param_kind(pos);
        if arg.kind() != expected {
            return Err(EvalError::KindMismatch {
                expected,
                found: arg.kind(),
            });
        }
    }

    let mut values: Vec<Value> = Vec::with_capacity(plan.nodes().len());
    values.extend_from_slice(args);
    for i in arity..plan.nodes().len() {
        let value = match plan.node(i) {
            Node::Param { .. } => unreachable!("parameter past the arity prefix"),
            Node::Expr { kind, op, args } => {
                let v = eval_op(op, args.iter().map(|a| &values[a.index()]))?;
                if v.kind() != *kind {
                    return Err(EvalError::KindMismatch {
                        expected: *kind,
                        found: v.kind(),
                    });
                }
                v
            }
        };
        values.push(value);
    }

    Ok(match plan.result() {
        Some(r) => values[r].clone(),
        None => Value::Void,
    })
}

fn eval_op<'a>(
    op: &Op,
    mut args: impl Iterator<Item = &'a Value>,
) -> Result<Value, EvalError> {
    match op {
        Op::Invoke(combiner) => {
            let operands: Vec<Value> = args.cloned().collect();
            combiner.invoke(&operands)
        }
        Op::CaptureGet { index, kind } => {
            let record = args
                .next()
                .and_then(Value::downcast_ref::<CaptureRecord>)
                .ok_or(EvalError::NotACaptureRecord)?;
            let value = record.get(*index as usize).ok_or(EvalError::CaptureOutOfBounds {
                index: *index as usize,
                len: record.len(),
            })?;
            if value.kind() != *kind {
                return Err(EvalError::KindMismatch {
                    expected: *kind,
                    found: value.kind(),
                });
            }
            Ok(value.clone())
        }
        Op::ArrayLengthCheck { expected } => {
            let array = expect_array(args.next())?;
            if array.len() != *expected as usize {
                return Err(EvalError::SpreadLengthMismatch {
                    expected: *expected as usize,
                    found: array.len(),
                });
            }
            Ok(Value::Void)
        }
        Op::ArrayGet { index, elem } => {
            let array = expect_array(args.next())?;
            if array.elem() != *elem {
                return Err(EvalError::KindMismatch {
                    expected: *elem,
                    found: array.elem(),
                });
            }
            let value = array.get(*index as usize).ok_or(EvalError::ElementOutOfBounds {
                index: *index as usize,
                len: array.len(),
            })?;
            Ok(value.clone())
        }
        Op::NewArray { elem, len } => {
            let elements: Vec<Value> = args.cloned().collect();
            debug_assert_eq!(elements.len(), *len as usize);
            Ok(Value::reference(ArrayValue::new(*elem, elements)?))
        }
        Op::Convert { to } => convert(args.next(), *to),
        Op::ConstZero { kind } => Ok(Value::zero(*kind)),
    }
}

fn expect_array(value: Option<&Value>) -> Result<&ArrayValue, EvalError> {
    value
        .and_then(Value::downcast_ref::<ArrayValue>)
        .ok_or(EvalError::NotAnArray)
}

/// Widening/narrowing between the numeric storage classes, following the
/// usual two's-complement truncation and IEEE rounding rules. References
/// pass through unchanged; nothing converts to or from void.
fn convert(value: Option<&Value>, to: SlotKind) -> Result<Value, EvalError> {
    let value = value.ok_or(EvalError::ArgCountMismatch {
        expected: 1,
        found: 0,
    })?;
    if value.kind() == to {
        return Ok(value.clone());
    }
    let converted = match (value, to) {
        (Value::Int(v), SlotKind::Long) => Value::Long(i64::from(*v)),
        (Value::Int(v), SlotKind::Float) => Value::Float(*v as f32),
        (Value::Int(v), SlotKind::Double) => Value::Double(f64::from(*v)),
        (Value::Long(v), SlotKind::Int) => Value::Int(*v as i32),
        (Value::Long(v), SlotKind::Float) => Value::Float(*v as f32),
        (Value::Long(v), SlotKind::Double) => Value::Double(*v as f64),
        (Value::Float(v), SlotKind::Int) => Value::Int(*v as i32),
        (Value::Float(v), SlotKind::Long) => Value::Long(*v as i64),
        (Value::Float(v), SlotKind::Double) => Value::Double(f64::from(*v)),
        (Value::Double(v), SlotKind::Int) => Value::Int(*v as i32),
        (Value::Double(v), SlotKind::Long) => Value::Long(*v as i64),
        (Value::Double(v), SlotKind::Float) => Value::Float(*v as f32),
        _ => {
            return Err(EvalError::KindMismatch {
                expected: to,
                found: value.kind(),
            });
        }
    };
    Ok(converted)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use pretty_assertions::assert_eq;
    use relink_ir::SlotKind;

    use super::*;

    fn conv_plan() -> Plan {
        // (a0:ref, a1:int) => { t2 = conv[long](a1):long }; t2
        Plan::new(
            2,
            0,
            vec![
                Node::param(SlotKind::Ref),
                Node::param(SlotKind::Int),
                Node::expr(
                    SlotKind::Long,
                    Op::Convert { to: SlotKind::Long },
                    [crate::node::NodeIdx::from_raw(1)],
                ),
            ],
            Some(2),
        )
        .unwrap()
    }

    #[test]
    fn forward_pass_produces_the_result() {
        let plan = conv_plan();
        let out = interpret(&plan, &[Value::Reference(None), Value::Int(7)]).unwrap();
        assert_eq!(out, Value::Long(7));
    }

    #[test]
    fn argument_kinds_are_checked() {
        let plan = conv_plan();
        assert_eq!(
            interpret(&plan, &[Value::Reference(None), Value::Long(7)]),
            Err(EvalError::KindMismatch {
                expected: SlotKind::Int,
                found: SlotKind::Long
            })
        );
        assert_eq!(
            interpret(&plan, &[Value::Reference(None)]),
            Err(EvalError::ArgCountMismatch {
                expected: 2,
                found: 1
            })
        );
    }

    #[test]
    fn resultless_plans_return_void() {
        let plan = Plan::new(1, 0, vec![Node::param(SlotKind::Ref)], None).unwrap();
        assert_eq!(
            interpret(&plan, &[Value::Reference(None)]).unwrap(),
            Value::Void
        );
    }

    #[test]
    fn capture_reads_check_record_and_bounds() {
        let plan = Plan::new(
            1,
            1,
            vec![
                Node::param(SlotKind::Ref),
                Node::expr(
                    SlotKind::Int,
                    Op::CaptureGet {
                        index: 1,
                        kind: SlotKind::Int,
                    },
                    [crate::node::NodeIdx::from_raw(0)],
                ),
            ],
            Some(1),
        )
        .unwrap();

        assert_eq!(
            interpret(&plan, &[Value::Reference(None)]),
            Err(EvalError::NotACaptureRecord)
        );

        let short = Value::reference(CaptureRecord::new(vec![Value::Int(1)]));
        assert_eq!(
            interpret(&plan, &[short]),
            Err(EvalError::CaptureOutOfBounds { index: 1, len: 1 })
        );

        let record = Value::reference(CaptureRecord::new(vec![Value::Int(1), Value::Int(9)]));
        assert_eq!(interpret(&plan, &[record]).unwrap(), Value::Int(9));
    }

    #[test]
    fn length_check_rejects_wrong_arrays() {
        let plan = Plan::new(
            1,
            0,
            vec![
                Node::param(SlotKind::Ref),
                Node::expr(
                    SlotKind::Void,
                    Op::ArrayLengthCheck { expected: 2 },
                    [crate::node::NodeIdx::from_raw(0)],
                ),
            ],
            None,
        )
        .unwrap();

        let long = Value::reference(
            ArrayValue::new(SlotKind::Int, vec![Value::Int(1), Value::Int(2), Value::Int(3)])
                .unwrap(),
        );
        assert_eq!(
            interpret(&plan, &[long]),
            Err(EvalError::SpreadLengthMismatch {
                expected: 2,
                found: 3
            })
        );
        assert_eq!(
            interpret(&plan, &[Value::reference(42_u32)]),
            Err(EvalError::NotAnArray)
        );
    }

    #[test]
    fn narrowing_truncates_and_widening_is_exact() {
        assert_eq!(
            convert(Some(&Value::Long(i64::from(i32::MAX) + 1)), SlotKind::Int),
            Ok(Value::Int(i32::MIN))
        );
        assert_eq!(
            convert(Some(&Value::Int(-3)), SlotKind::Double),
            Ok(Value::Double(-3.0))
        );
        assert_eq!(
            convert(Some(&Value::Double(2.9)), SlotKind::Int),
            Ok(Value::Int(2))
        );
        let arc = Arc::new(5_u8);
        let r = Value::Reference(Some(arc));
        assert_eq!(convert(Some(&r), SlotKind::Ref), Ok(r.clone()));
        assert_eq!(
            convert(Some(&r), SlotKind::Void),
            Err(EvalError::KindMismatch {
                expected: SlotKind::Void,
                found: SlotKind::Ref
            })
        );
    }
}
