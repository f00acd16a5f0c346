// build.rs
//
// macOS only: when a built Syphon.framework is vendored under vendor/, this
// 1) compiles the Objective-C bridge (native/syphon_bridge.m) into a static lib,
// 2) links Syphon.framework plus the Apple frameworks it needs,
// 3) adds rpaths so dyld resolves @rpath/Syphon.framework for `cargo run` and app bundles,
// 4) copies the framework next to the built binary,
// 5) emits `--cfg has_syphon` so the Syphon backend is compiled in.
//
// Without the framework the build still succeeds and the Syphon backend reports itself
// unavailable at runtime.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

fn main() {
    if env::var("CARGO_CFG_TARGET_OS").as_deref() != Ok("macos") {
        return;
    }

    println!("cargo:rerun-if-changed=native/syphon_bridge.m");
    println!("cargo:rerun-if-changed=native/syphon_bridge.h");
    println!("cargo:rerun-if-changed=vendor/Syphon.framework");

    let manifest_dir = PathBuf::from(env::var("CARGO_MANIFEST_DIR").unwrap_or_else(|_| ".".into()));
    let vendor_dir = manifest_dir.join("vendor");
    let syphon_framework = vendor_dir.join("Syphon.framework");

    if !syphon_framework.exists() {
        println!(
            "cargo:warning=Syphon.framework not found at {}; building without the Syphon backend",
            syphon_framework.display()
        );
        return;
    }

    cc::Build::new()
        .file("native/syphon_bridge.m")
        .flag("-fobjc-arc")
        .flag("-ObjC")
        .include(syphon_framework.join("Headers"))
        .include(syphon_framework.join("Versions/A/Headers"))
        .flag(&format!("-F{}", vendor_dir.display()))
        .flag("-Wno-deprecated-declarations")
        .compile("syphon_bridge");

    println!("cargo:rustc-link-search=framework={}", vendor_dir.display());
    println!("cargo:rustc-link-lib=framework=Syphon");
    println!("cargo:rustc-link-lib=framework=Cocoa");
    println!("cargo:rustc-link-lib=framework=OpenGL");

    println!("cargo:rustc-link-arg=-Wl,-rpath,@executable_path");
    println!("cargo:rustc-link-arg=-Wl,-rpath,@executable_path/../Frameworks");

    let profile = env::var("PROFILE").unwrap_or_else(|_| "debug".into());
    let target_dir = env::var("CARGO_TARGET_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|_| manifest_dir.join("target"));
    let dest_dir = target_dir.join(&profile).join("Syphon.framework");

    if !dest_dir.exists() {
        if let Err(e) = copy_dir_recursive(&syphon_framework, &dest_dir) {
            println!(
                "cargo:warning=failed to copy Syphon.framework -> {}: {e}",
                dest_dir.display()
            );
        }
    }

    println!("cargo:rustc-cfg=has_syphon");
}

/// Framework bundles are directories with a Versions/ symlink layout.
fn copy_dir_recursive(src: &Path, dst: &Path) -> std::io::Result<()> {
    if dst.exists() {
        fs::remove_dir_all(dst)?;
    }
    fs::create_dir_all(dst)?;

    for entry in fs::read_dir(src)? {
        let entry = entry?;
        let file_type = entry.file_type()?;
        let from = entry.path();
        let to = dst.join(entry.file_name());

        if file_type.is_dir() {
            copy_dir_recursive(&from, &to)?;
        } else if file_type.is_file() {
            fs::copy(&from, &to)?;
        } else if file_type.is_symlink() {
            let target = fs::read_link(&from)?;
            #[cfg(unix)]
            std::os::unix::fs::symlink(target, &to)?;
        }
    }
    Ok(())
}
