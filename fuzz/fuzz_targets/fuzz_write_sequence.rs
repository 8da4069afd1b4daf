#![no_main]

use std::rc::Rc;

use arbitrary::Arbitrary;
use bindside::dom::memory::MemoryDocument;
use bindside::{
    BindConfig, Propagation, ReadySignal, Resolve, Value, create_view_model_with_config,
};
use libfuzzer_sys::fuzz_target;

#[derive(Arbitrary, Debug)]
enum Step {
    Set { slot: u8, text: String },
    Type { slot: u8, text: String },
    Read { slot: u8 },
}

const NAMES: [&str; 4] = ["a", "b", "joined", "shout"];

#[derive(Arbitrary, Debug)]
struct Input {
    transitive: bool,
    steps: Vec<Step>,
}

fuzz_target!(|input: Input| {
    let doc = Rc::new(MemoryDocument::new());
    let root = doc.root_id();
    let a = doc.element(root, "input", &[("data-prop", "a")]);
    let b = doc.element(root, "textarea", &[("data-prop", "b")]);
    let joined = doc.element(root, "span", &[("data-prop", "joined")]);
    let shout = doc.element(root, "span", &[("data-prop", "shout")]);

    let propagation = if input.transitive {
        Propagation::Transitive
    } else {
        Propagation::Direct
    };
    let config = BindConfig::default().with_propagation(propagation);
    let Ok(vm) = create_view_model_with_config(
        doc.clone(),
        &ReadySignal::already_fired(),
        None,
        config,
        |vm| {
            vm.prop("a")?;
            vm.prop("b")?;
            vm.computed("joined", |cx: &dyn Resolve| {
                Ok(Value::from(format!("{}/{}", cx.text("a")?, cx.text("b")?)))
            })?;
            vm.computed("shout", |cx: &dyn Resolve| {
                Ok(Value::from(cx.text("joined")?.to_uppercase()))
            })?;
            Ok(())
        },
    ) else {
        return;
    };

    let mut wrote = false;
    for step in input.steps.into_iter().take(64) {
        match step {
            Step::Set { slot, text } => {
                let name = NAMES[usize::from(slot) % NAMES.len()];
                let result = vm.set(name, text);
                assert_eq!(result.is_ok(), name == "a" || name == "b");
                wrote |= result.is_ok();
            }
            Step::Type { slot, text } => {
                let node = if slot % 2 == 0 { a } else { b };
                doc.change(node, &text);
                wrote = true;
            }
            Step::Read { slot } => {
                let name = NAMES[usize::from(slot) % NAMES.len()];
                assert!(vm.get(name).is_ok());
            }
        }
        if wrote {
            let expected = vm.get("joined").map(|v| v.to_string()).unwrap_or_default();
            assert_eq!(doc.content(joined), expected);
            if input.transitive {
                let expected = vm.get("shout").map(|v| v.to_string()).unwrap_or_default();
                assert_eq!(doc.content(shout), expected);
            }
        }
    }
});
