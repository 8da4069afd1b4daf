//! Property-based invariant tests for write propagation.
//!
//! Verifies structural guarantees of `ViewModel` writes over arbitrary write
//! sequences:
//!
//! 1. Rendered nodes never show a stale value after a write returns
//! 2. Reading computed properties never changes stored state or the document
//! 3. Writing the current value again leaves the document unchanged
//! 4. Each write renders every node of every refreshed dependent exactly once
//! 5. Direct and transitive propagation agree on first-level dependents
//! 6. A rejected write leaves state and document untouched

use std::rc::Rc;

use bindside::dom::memory::MemoryDocument;
use bindside::{
    BindConfig, BindError, NodeId, Propagation, ReadySignal, Resolve, Value, ViewModel,
    create_view_model_with_config,
};
use proptest::prelude::*;

// ── Helpers ──────────────────────────────────────────────────────────

/// `a`, `b` plain; `sum = a + b`; `label = "<sum>!"`; `sign` fails for
/// negative sums once declared.
struct Harness {
    doc: Rc<MemoryDocument>,
    vm: ViewModel,
    sum_node: NodeId,
    label_node: NodeId,
    a_node: NodeId,
}

fn harness(propagation: Propagation, guarded: bool) -> Harness {
    let doc = Rc::new(MemoryDocument::new());
    let root = doc.root_id();
    let a_node = doc.element(root, "input", &[("data-prop", "a")]);
    doc.element(root, "input", &[("data-prop", "b")]);
    let sum_node = doc.element(root, "span", &[("data-prop", "sum")]);
    let label_node = doc.element(root, "span", &[("data-prop", "label")]);
    doc.element(root, "span", &[("data-prop", "sign")]);

    let config = BindConfig::default().with_propagation(propagation);
    let vm = create_view_model_with_config(
        doc.clone(),
        &ReadySignal::already_fired(),
        None,
        config,
        |vm| {
            vm.prop("a")?;
            vm.prop("b")?;
            vm.computed("sum", |cx: &dyn Resolve| {
                Ok(Value::from(cx.number("a")? + cx.number("b")?))
            })?;
            vm.computed("label", |cx| Ok(Value::from(format!("{}!", cx.read("sum")?))))?;
            if guarded {
                vm.computed("sign", |cx| {
                    let total = cx.number("a")? + cx.number("b")?;
                    if total < 0.0 {
                        return Err(BindError::definition("negative total"));
                    }
                    Ok(Value::from(total > 0.0))
                })?;
            }
            Ok(())
        },
    )
    .expect("harness view model");
    Harness {
        doc,
        vm,
        sum_node,
        label_node,
        a_node,
    }
}

#[derive(Debug, Clone)]
enum Op {
    SetA(i32),
    SetB(i32),
    ReadSum,
    ReadLabel,
}

fn arb_op() -> impl Strategy<Value = Op> {
    prop_oneof![
        (-50i32..=50).prop_map(Op::SetA),
        (-50i32..=50).prop_map(Op::SetB),
        Just(Op::ReadSum),
        Just(Op::ReadLabel),
    ]
}

fn apply(h: &Harness, op: &Op) {
    match *op {
        Op::SetA(n) => h.vm.set("a", n).expect("write a"),
        Op::SetB(n) => h.vm.set("b", n).expect("write b"),
        Op::ReadSum => {
            h.vm.get("sum").expect("read sum");
        }
        Op::ReadLabel => {
            h.vm.get("label").expect("read label");
        }
    }
}

// ═════════════════════════════════════════════════════════════════════════
// 1. No stale reads
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn transitive_nodes_never_stale(ops in proptest::collection::vec(arb_op(), 1..40)) {
        let h = harness(Propagation::Transitive, false);
        for op in &ops {
            apply(&h, op);
            if matches!(op, Op::SetA(_) | Op::SetB(_)) {
                let sum = h.vm.get("sum").unwrap().to_string();
                let label = h.vm.get("label").unwrap().to_string();
                prop_assert_eq!(h.doc.content(h.sum_node), sum);
                prop_assert_eq!(h.doc.content(h.label_node), label);
            }
        }
    }
}

// ═════════════════════════════════════════════════════════════════════════
// 2. Computed reads are pure
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn computed_reads_do_not_mutate(a in -100i32..=100, b in -100i32..=100) {
        let h = harness(Propagation::Direct, false);
        h.vm.set("a", a).unwrap();
        h.vm.set("b", b).unwrap();
        let before_state = h.vm.snapshot().unwrap();
        let before_doc = h.doc.dump();
        for _ in 0..3 {
            prop_assert_eq!(h.vm.get("sum").unwrap(), Value::from(a + b));
            h.vm.get("label").unwrap();
        }
        prop_assert_eq!(h.vm.snapshot().unwrap(), before_state);
        prop_assert_eq!(h.doc.dump(), before_doc);
    }
}

// ═════════════════════════════════════════════════════════════════════════
// 3. Idempotent writes
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn repeated_write_is_idempotent(
        ops in proptest::collection::vec(arb_op(), 0..20),
        n in -50i32..=50,
    ) {
        let h = harness(Propagation::Transitive, false);
        for op in &ops {
            apply(&h, op);
        }
        h.vm.set("a", n).unwrap();
        let once = (h.vm.snapshot().unwrap(), h.doc.dump());
        h.vm.set("a", n).unwrap();
        let twice = (h.vm.snapshot().unwrap(), h.doc.dump());
        prop_assert_eq!(once, twice);
    }
}

// ═════════════════════════════════════════════════════════════════════════
// 4. Exactly-once rendering
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn each_write_renders_each_dependent_once(ops in proptest::collection::vec(arb_op(), 1..40)) {
        let h = harness(Propagation::Transitive, false);
        let mut writes = 0u32;
        let mut a_writes = 0u32;
        for op in &ops {
            apply(&h, op);
            match op {
                Op::SetA(_) => {
                    writes += 1;
                    a_writes += 1;
                }
                Op::SetB(_) => writes += 1,
                Op::ReadSum | Op::ReadLabel => {}
            }
            prop_assert_eq!(h.doc.write_count(h.sum_node), writes);
            prop_assert_eq!(h.doc.write_count(h.label_node), writes);
            prop_assert_eq!(h.doc.write_count(h.a_node), a_writes);
        }
    }
}

// ═════════════════════════════════════════════════════════════════════════
// 5. Direct vs transitive on first-level dependents
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn first_level_dependents_agree(ops in proptest::collection::vec(arb_op(), 1..30)) {
        let direct = harness(Propagation::Direct, false);
        let transitive = harness(Propagation::Transitive, false);
        for op in &ops {
            apply(&direct, op);
            apply(&transitive, op);
            prop_assert_eq!(
                direct.doc.content(direct.sum_node),
                transitive.doc.content(transitive.sum_node)
            );
        }
        // Direct propagation never reaches the second level.
        prop_assert_eq!(direct.doc.write_count(direct.label_node), 0);
    }
}

// ═════════════════════════════════════════════════════════════════════════
// 6. Rejected writes are atomic
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn failed_dependent_rolls_back(a in 0i32..=50, bad in -100i32..=-51) {
        let h = harness(Propagation::Direct, true);
        h.vm.set("a", a).unwrap();
        let state = h.vm.snapshot().unwrap();
        let doc = h.doc.dump();

        let err = h.vm.set("b", bad).unwrap_err();
        prop_assert_eq!(err, BindError::definition("negative total"));
        prop_assert_eq!(h.vm.snapshot().unwrap(), state);
        prop_assert_eq!(h.doc.dump(), doc);
    }
}
