// Build scripts signal errors by panicking; there is no caller to
// return Result to.  Cargo treats a non-zero exit as a build failure.
#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

//! Build script for the cardmerge binary crate.
//!
//! Compiles `crates/cardmerge-worker` with `wasm-pack` and exposes the
//! JS glue and WASM binary as `WORKER_JS_PATH` / `WORKER_WASM_PATH` so
//! `main.rs` can embed them.
//!
//! Native builds (tests, clippy) and builds without `wasm-pack` get
//! empty placeholder files instead; the app then composites on the
//! main thread.

use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::SystemTime;
use std::{env, fs};

fn main() {
    let out_dir = PathBuf::from(env::var("OUT_DIR").unwrap());
    let manifest_dir = PathBuf::from(env::var("CARGO_MANIFEST_DIR").unwrap());

    // Workspace root is two levels up from crates/cardmerge/.
    let workspace_root = manifest_dir
        .parent()
        .and_then(Path::parent)
        .expect("could not find workspace root");

    build_worker_wasm(workspace_root, &out_dir);
}

/// Build the worker module into `$OUT_DIR/worker-pkg`.
fn build_worker_wasm(workspace_root: &Path, out_dir: &Path) {
    let pkg_dir = out_dir.join("worker-pkg");
    let js_path = pkg_dir.join("cardmerge_worker.js");
    let wasm_path = pkg_dir.join("cardmerge_worker_bg.wasm");

    // The worker embeds the compositor, so both crates are inputs.
    let inputs = [
        workspace_root.join("crates/cardmerge-worker"),
        workspace_root.join("crates/cardmerge-core"),
    ];
    for crate_dir in &inputs {
        println!("cargo:rerun-if-changed={}", crate_dir.join("src").display());
        println!(
            "cargo:rerun-if-changed={}",
            crate_dir.join("Cargo.toml").display()
        );
    }
    println!("cargo:rustc-env=WORKER_JS_PATH={}", js_path.display());
    println!("cargo:rustc-env=WORKER_WASM_PATH={}", wasm_path.display());

    if env::var("CARGO_CFG_TARGET_ARCH").as_deref() != Ok("wasm32") {
        write_placeholder(&pkg_dir, &js_path, &wasm_path);
        return;
    }

    let up_to_date = fs::metadata(&wasm_path)
        .and_then(|m| m.modified())
        .is_ok_and(|built| {
            fs::metadata(&wasm_path).is_ok_and(|m| m.len() > 0)
                && js_path.exists()
                && !inputs.iter().any(|dir| is_any_newer_than(dir, built))
        });
    if up_to_date {
        return;
    }

    // Flags and wrappers injected for the host toolchain (coverage
    // instrumentation in particular) break the wasm32 sub-build.  A
    // separate target dir keeps the nested cargo off the outer lock.
    let status = Command::new("wasm-pack")
        .args([
            "build",
            &workspace_root.join("crates/cardmerge-worker").to_string_lossy(),
            "--target",
            "no-modules",
            "--no-typescript",
            "--out-dir",
            &pkg_dir.to_string_lossy(),
        ])
        .env("CARGO_TARGET_DIR", out_dir.join("worker-target"))
        .env_remove("RUSTFLAGS")
        .env_remove("CARGO_ENCODED_RUSTFLAGS")
        .env_remove("RUSTC_WRAPPER")
        .env_remove("RUSTC_WORKSPACE_WRAPPER")
        .status();

    match status {
        Ok(status) if status.success() && js_path.exists() && wasm_path.exists() => {}
        Ok(status) => {
            println!(
                "cargo:warning=`wasm-pack build` for cardmerge-worker exited with {status}; \
                 compositing will run on the main thread"
            );
            write_placeholder(&pkg_dir, &js_path, &wasm_path);
        }
        Err(e) => {
            println!(
                "cargo:warning=failed to run `wasm-pack build`: {e}; \
                 install it with `cargo install wasm-pack`. \
                 Compositing will run on the main thread"
            );
            write_placeholder(&pkg_dir, &js_path, &wasm_path);
        }
    }
}

/// Empty worker files, which the app treats as "no worker bundled".
fn write_placeholder(pkg_dir: &Path, js_path: &Path, wasm_path: &Path) {
    fs::create_dir_all(pkg_dir)
        .unwrap_or_else(|e| panic!("failed to create {}: {e}", pkg_dir.display()));
    fs::write(js_path, "").unwrap_or_else(|e| panic!("failed to write {}: {e}", js_path.display()));
    fs::write(wasm_path, b"")
        .unwrap_or_else(|e| panic!("failed to write {}: {e}", wasm_path.display()));
}

/// Check if any `.rs` or `.toml` file under `dir` is newer than
/// `reference`.
fn is_any_newer_than(dir: &Path, reference: SystemTime) -> bool {
    let Ok(entries) = fs::read_dir(dir) else {
        return false;
    };

    entries.flatten().any(|entry| {
        let path = entry.path();
        if path.is_dir() {
            is_any_newer_than(&path, reference)
        } else {
            path.extension().is_some_and(|ext| ext == "rs" || ext == "toml")
                && fs::metadata(&path)
                    .and_then(|m| m.modified())
                    .is_ok_and(|t| t > reference)
        }
    })
}
