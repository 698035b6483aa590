use std::sync::Arc;
use std::thread;

use pretty_assertions::assert_eq;
use relink_ir::{CallSignature, SlotKind, TypeKind};
use relink_plan::{Node, Plan};

use crate::flags::FormFlags;
use crate::role::FormRole;

use super::FormRegistry;

fn sig(params: Vec<TypeKind>, ret: TypeKind) -> CallSignature {
    CallSignature::new(params, ret).unwrap()
}

fn trivial_plan(arity: usize) -> Arc<Plan> {
    let mut nodes = vec![Node::param(SlotKind::Ref)];
    nodes.extend((1..arity).map(|_| Node::param(SlotKind::Int)));
    Arc::new(Plan::new(arity as u32, 0, nodes, None).unwrap())
}

#[test]
fn form_lookup_is_idempotent() {
    let registry = FormRegistry::new();
    let s = sig(vec![TypeKind::Reference, TypeKind::I32], TypeKind::Void);

    let a = registry.form_for(&s);
    let b = registry.form_for(&s);
    assert!(Arc::ptr_eq(&a, &b));
    assert_eq!(registry.len(), 1);
    assert_eq!(a.signature(), &s);
    assert!(a.is_erased());
    assert!(a.flags().contains(FormFlags::IS_ERASED));
}

#[test]
fn non_erased_forms_delegate_to_their_erasure() {
    let registry = FormRegistry::new();
    let narrow = sig(vec![TypeKind::Bool, TypeKind::I16], TypeKind::I8);
    let wide = sig(vec![TypeKind::I32, TypeKind::I32], TypeKind::I32);

    let narrow_form = registry.form_for(&narrow);
    let erased_form = registry.form_for(&wide);
    assert!(!narrow_form.is_erased());
    assert!(Arc::ptr_eq(&narrow_form.erased_form(), &erased_form));
    assert_eq!(registry.len(), 2);

    // An adapter cached through the narrow form is observed through the
    // erased form, and vice versa.
    let plan = trivial_plan(3);
    let stored = narrow_form.caches().store_plan(FormRole::Invoker, Arc::clone(&plan));
    assert!(Arc::ptr_eq(&stored, &plan));
    let seen = erased_form.caches().plan_for(FormRole::Invoker).unwrap();
    assert!(Arc::ptr_eq(&seen, &plan));
}

#[test]
fn role_cache_first_writer_wins() {
    let registry = FormRegistry::new();
    let form = registry.form_for(&sig(vec![TypeKind::Reference], TypeKind::Void));

    let first = trivial_plan(1);
    let second = trivial_plan(1);
    let won = form.caches().store_plan(FormRole::Rebind, Arc::clone(&first));
    let lost = form.caches().store_plan(FormRole::Rebind, second);
    assert!(Arc::ptr_eq(&won, &first));
    assert!(Arc::ptr_eq(&lost, &first));
    assert!(form.caches().plan_for(FormRole::Delegate).is_none());
}

#[test]
fn narrow_signatures_share_uniform_tables() {
    let registry = FormRegistry::new();
    let ints = registry.form_for(&sig(vec![TypeKind::I32, TypeKind::I32], TypeKind::Void));
    let refs = registry.form_for(&sig(
        vec![TypeKind::Reference, TypeKind::Reference],
        TypeKind::Reference,
    ));
    let floats = registry.form_for(&sig(vec![TypeKind::F32, TypeKind::F32], TypeKind::F32));
    assert!(Arc::ptr_eq(ints.tables(), refs.tables()));
    assert!(Arc::ptr_eq(ints.tables(), floats.tables()));

    // A two-slot kind forces a dedicated table.
    let longs = registry.form_for(&sig(vec![TypeKind::I64, TypeKind::I32], TypeKind::Void));
    assert!(!Arc::ptr_eq(longs.tables(), ints.tables()));
    assert_eq!(longs.tables().slot_count(), 3);
}

#[test]
fn concurrent_first_use_converges_on_one_form() {
    let registry = FormRegistry::new();
    let s = sig(vec![TypeKind::Reference, TypeKind::I64], TypeKind::I64);

    let forms: Vec<_> = thread::scope(|scope| {
        let handles: Vec<_> = (0..16)
            .map(|_| scope.spawn(|| registry.form_for(&s)))
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    let first = &forms[0];
    for form in &forms[1..] {
        assert!(Arc::ptr_eq(first, form));
    }
    assert_eq!(registry.len(), 1);
}
