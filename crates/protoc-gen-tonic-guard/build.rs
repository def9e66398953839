use std::path::{Path, PathBuf};
use std::process::Command;

const FIXTURES: &[&str] = &["role_based", "policy_based", "inherit_override", "no_rules"];

fn main() {
    let out_dir = PathBuf::from(std::env::var("OUT_DIR").expect("OUT_DIR not set"));
    let protoc = protoc_bin_vendored::protoc_bin_path().expect("failed to find bundled protoc");
    let well_known =
        protoc_bin_vendored::include_path().expect("failed to find bundled proto includes");

    println!("cargo:rerun-if-changed=../../proto/guard/v1/annotations.proto");
    println!("cargo:rerun-if-changed=testdata");

    // The embedded schema: guard annotations plus the protoc plugin protocol,
    // with imports, so the plugin can decode requests and resolve the rule
    // extensions dynamically.
    descriptor_set(
        &protoc,
        &["../../proto", well_known.to_str().expect("include path")],
        &[
            "guard/v1/annotations.proto",
            "google/protobuf/compiler/plugin.proto",
        ],
        &out_dir.join("guard_descriptor.bin"),
    );

    // Annotated fixture services for the generator tests.
    for fixture in FIXTURES {
        descriptor_set(
            &protoc,
            &[
                "testdata",
                "../../proto",
                well_known.to_str().expect("include path"),
            ],
            &[&format!("{fixture}.proto")],
            &out_dir.join(format!("{fixture}.bin")),
        );
    }
}

fn descriptor_set(protoc: &Path, includes: &[&str], files: &[&str], out: &Path) {
    let mut command = Command::new(protoc);
    for include in includes {
        command.arg(format!("-I{include}"));
    }
    command
        .arg("--include_imports")
        .arg(format!("--descriptor_set_out={}", out.display()))
        .args(files);

    let status = command.status().expect("failed to run protoc");
    assert!(status.success(), "protoc failed for {files:?}");
}
