// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>

#![allow(missing_docs)]
use std::env;
use std::fs;
use std::path::PathBuf;

/// Rule names whose canonical family ids are baked in at build time.
const RULES: &[(&str, &str)] = &[
    ("CLIP_RULE_FAMILY_ID", "censoring/clip"),
    ("ROUND_RULE_FAMILY_ID", "censoring/round"),
];

fn main() {
    // Generate canonical rule ids (domain-separated) for zero-CPU runtime.
    let out_dir = PathBuf::from(env::var("OUT_DIR").unwrap());
    let dest = out_dir.join("rule_ids.rs");

    let mut generated = String::new();
    for (const_name, rule_name) in RULES {
        // blake3("rule:" || name), same derivation as `make_rule_id`.
        let mut hasher = blake3::Hasher::new();
        hasher.update(b"rule:");
        hasher.update(rule_name.as_bytes());
        let bytes: [u8; 32] = hasher.finalize().into();
        generated.push_str(&format!(
            "/// Canonical family id for `rule:{rule_name}` (BLAKE3).\npub const {const_name}: [u8; 32] = {bytes:?};\n"
        ));
    }
    fs::write(dest, generated).expect("write rule_ids.rs");
    println!("cargo:rerun-if-changed=build.rs");
}
