use std::env;

fn main() {
    println!("cargo:rerun-if-changed=build.rs");

    if env::var_os("CARGO_FEATURE_SIMD").is_none() {
        return;
    }

    // The build script runs on the host, so look at the target triple
    // rather than `cfg!(target_arch)`.
    match env::var("CARGO_CFG_TARGET_ARCH").as_deref() {
        Ok("x86_64") => println!("cargo:rustc-cfg=simd_x86_64"),
        Ok("aarch64") => println!("cargo:rustc-cfg=simd_neon"),
        _ => {}
    }
}
