#![no_main]

use bambu2prusa::{CORE_NAMESPACE, ModelDocument, rewrite};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(out) = rewrite(data) else {
        return;
    };
    // A readable input must stay readable, with the same objects
    if let Ok(before) = ModelDocument::parse(data) {
        let after = ModelDocument::parse(&out).expect("rewritten document does not parse");
        assert_eq!(after.namespace.as_deref(), Some(CORE_NAMESPACE));
        assert_eq!(after.objects.len(), before.objects.len());
        assert_eq!(after.triangle_count(), before.triangle_count());
        assert!(after.build_items.iter().all(|item| item.transform.is_some()));
    }
});
