#![no_main]

use bindside::{BindError, parse_action_binding};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(text) = std::str::from_utf8(data) else {
        return;
    };
    // First line is the separator, the rest the attribute value.
    let (separator, raw) = text.split_once('\n').unwrap_or(("::", text));
    match parse_action_binding(raw, separator) {
        Ok(binding) => {
            assert!(!separator.is_empty());
            assert!(!binding.event.is_empty());
            assert!(!binding.action.is_empty());
            assert!(!binding.event.contains(separator));
            assert!(!binding.action.contains(separator));
            assert_eq!(raw.matches(separator).count(), 1);
        }
        Err(BindError::MalformedActionBinding { value, .. }) => assert_eq!(value, raw),
        Err(other) => panic!("unexpected error kind: {other:?}"),
    }
});
