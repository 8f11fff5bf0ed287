use std::env;

fn main() {
    println!("cargo:rerun-if-changed=linker.ld");
    // Hosted builds link as a normal executable.
    if env::var("CARGO_CFG_TARGET_OS").as_deref() == Ok("none") {
        let manifest_dir = env::var("CARGO_MANIFEST_DIR").unwrap_or_else(|_| ".".into());
        println!("cargo:rustc-link-arg=-T{manifest_dir}/linker.ld");
    }
}
