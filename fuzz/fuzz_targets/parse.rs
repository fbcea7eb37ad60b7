#![no_main]
use libfuzzer_sys::fuzz_target;

use vetted::{array, coerce, enum_, int, literal, number, object, record, string, union, Schema};

fn schema() -> Schema {
    let node = object(vec![
        ("id", int().positive()),
        ("name", string().trim().min(1).max(32)),
        ("tags", array(enum_(["a", "b", "c"])).optional()),
        ("score", union(vec![number(), coerce::number()]).default(0)),
        ("kind", literal("node").prefault("node")),
    ]);
    record(string(), node).max(8)
}

fuzz_target!(|data: &[u8]| {
    // We're only interested in inputs that are valid JSON.
    if let Ok(instance) = serde_json::from_slice::<serde_json::Value>(data) {
        let _ = schema().parse(&instance);
    }
});
