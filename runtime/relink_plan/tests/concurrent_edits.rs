//! Racing editors over one shared base plan must converge on identical
//! derived plans: whichever thread publishes a transform first wins, and
//! every later request observes that winner.

use std::sync::Arc;
use std::thread;

use relink_ir::{CallSignature, CombinerRef, EvalError, SlotKind, TypeKind, Value};
use relink_plan::{interpret, Node, NodeIdx, Op, Plan, PlanEditor};

fn add2() -> CombinerRef {
    let sig = CallSignature::new(vec![TypeKind::I32, TypeKind::I32], TypeKind::I32).unwrap();
    CombinerRef::from_fn(sig, |args| match (&args[0], &args[1]) {
        (Value::Int(a), Value::Int(b)) => Ok(Value::Int(a + b)),
        _ => Err(EvalError::Combiner {
            message: "non-int operands".into(),
        }),
    })
}

fn base_plan() -> Arc<Plan> {
    Arc::new(
        Plan::new(
            3,
            0,
            vec![
                Node::param(SlotKind::Ref),
                Node::param(SlotKind::Int),
                Node::param(SlotKind::Int),
                Node::expr(
                    SlotKind::Int,
                    Op::Invoke(add2()),
                    [NodeIdx::from_raw(1), NodeIdx::from_raw(2)],
                ),
            ],
            Some(3),
        )
        .unwrap(),
    )
}

#[test]
fn racing_threads_share_one_derived_plan() {
    let base = base_plan();

    let derived: Vec<Arc<Plan>> = thread::scope(|s| {
        let handles: Vec<_> = (0..50)
            .map(|_| {
                let editor = PlanEditor::new(Arc::clone(&base));
                s.spawn(move || editor.filter_argument(1, SlotKind::Long).unwrap())
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    let first = &derived[0];
    for plan in &derived[1..] {
        assert!(Arc::ptr_eq(first, plan));
    }
    assert_eq!(
        interpret(first, &[Value::Reference(None), Value::Long(4), Value::Int(5)]).unwrap(),
        Value::Int(9)
    );
}

#[test]
fn distinct_edits_race_through_the_cache_tiers() {
    let base = base_plan();

    // Enough distinct keys to push the embedded cache from its single
    // slot through the inline array and into the map tier while threads
    // publish concurrently.
    let all_edits = |editor: PlanEditor| -> Vec<Arc<Plan>> {
        let kinds = [
            SlotKind::Int,
            SlotKind::Long,
            SlotKind::Float,
            SlotKind::Double,
        ];
        let mut out = Vec::new();
        for pos in 1..=3 {
            for kind in kinds {
                out.push(editor.add_argument(pos, kind).unwrap());
            }
        }
        for pos in 1..=2 {
            for kind in kinds {
                out.push(editor.filter_argument(pos, kind).unwrap());
            }
        }
        for kind in kinds {
            out.push(editor.filter_return(kind, true).unwrap());
        }
        out
    };

    let per_thread: Vec<Vec<Arc<Plan>>> = thread::scope(|s| {
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let editor = PlanEditor::new(Arc::clone(&base));
                s.spawn(move || all_edits(editor))
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    let first = &per_thread[0];
    for other in &per_thread[1..] {
        for (a, b) in first.iter().zip(other) {
            assert!(Arc::ptr_eq(a, b));
        }
    }
}
