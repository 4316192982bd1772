use std::env;
use std::path::Path;

// Payloads found under bin/ at build time are compiled into the launcher.
const PAYLOADS: &[(&str, &str)] = &[
    (
        "embedded_linux_payload",
        "bin/linux-amd64/datadog-serverless-compat",
    ),
    (
        "embedded_windows_payload",
        "bin/windows-amd64/datadog-serverless-compat.exe",
    ),
];

fn main() {
    let manifest_dir = env::var("CARGO_MANIFEST_DIR").unwrap_or_else(|_| ".".to_string());

    for (cfg, relative_path) in PAYLOADS {
        println!("cargo:rustc-check-cfg=cfg({})", cfg);
        println!("cargo:rerun-if-changed={}", relative_path);

        if Path::new(&manifest_dir).join(relative_path).is_file() {
            println!("cargo:rustc-cfg={}", cfg);
        }
    }

    println!("cargo:rerun-if-changed=build.rs");
}
