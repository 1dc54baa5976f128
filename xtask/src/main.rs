//! Development automation tasks for the `RentKenya` workspace.
//!
//! Run with: `cargo xtask <command>`
//!
//! This is a CLI tool for developers, so `println!` and `eprintln!` are
//! intentionally used for user-facing output rather than structured logging.

#![allow(clippy::print_stdout, clippy::print_stderr)]

use std::ffi::OsStr;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use std::process::{Command, ExitCode};
use std::{env, fs};

use anyhow::{anyhow, Context};

mod features;

/// Crates that export TypeScript bindings under `ts-gen`
const BINDING_CRATES: &[&str] = &["domain", "api"];

/// Where the web client picks up generated types
const FRONTEND_TYPES_DIR: &str = "web/src/types/generated";

fn main() -> ExitCode {
    let task = env::args().nth(1);

    let result = match task.as_deref() {
        Some("ci") => run_ci(),
        Some("fmt") => run_fmt(),
        Some("clippy") => run_clippy(),
        Some("test") => run_test(),
        Some("deny") => run_deny(),
        Some("audit") => run_audit(),
        Some("codegen") => run_codegen(),
        Some("test-features") => features::test_feature_matrix(),
        Some("help") | None => {
            print_help();
            Ok(())
        }
        Some(unknown) => {
            eprintln!("Unknown task: {unknown}");
            eprintln!();
            print_help();
            Err(anyhow::anyhow!("Unknown task"))
        }
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Task failed: {e}");
            ExitCode::FAILURE
        }
    }
}

fn print_help() {
    println!("RentKenya Development Tasks");
    println!();
    println!("USAGE:");
    println!("    cargo xtask <TASK>");
    println!();
    println!("TASKS:");
    println!("    ci             Run all CI checks (fmt, clippy, features, test, deny, audit)");
    println!("    fmt            Check Rust code formatting");
    println!("    clippy         Run Clippy lints");
    println!("    test           Run all tests");
    println!("    codegen        Generate TypeScript types and sync them to the web client");
    println!("    test-features  Verify every crate feature combination compiles");
    println!("    deny           Check dependencies with cargo-deny");
    println!("    audit          Audit dependencies for security vulnerabilities");
    println!("    help           Show this help message");
}

/// Run all CI checks in sequence
fn run_ci() -> anyhow::Result<()> {
    println!("==> Running CI checks...\n");

    println!("==> Step 1/6: Checking Rust format...");
    run_fmt()?;

    println!("\n==> Step 2/6: Running Clippy...");
    run_clippy()?;

    println!("\n==> Step 3/6: Checking feature combinations...");
    features::test_feature_matrix()?;

    println!("\n==> Step 4/6: Running tests...");
    run_test()?;

    println!("\n==> Step 5/6: Checking dependencies...");
    run_deny()?;

    println!("\n==> Step 6/6: Auditing dependencies...");
    run_audit()?;

    println!("\n✓ All CI checks passed!");
    Ok(())
}

/// Run `cargo <args>`, failing with `message` on a non-zero exit
fn cargo(args: &[&str], message: &str) -> anyhow::Result<()> {
    let status = Command::new("cargo")
        .args(args)
        .status()
        .with_context(|| format!("Failed to spawn cargo {}", args.join(" ")))?;

    if status.success() {
        Ok(())
    } else {
        Err(anyhow!("{message}"))
    }
}

/// Run an installable cargo subcommand, explaining how to install it if absent
fn cargo_tool(tool: &str, args: &[&str], message: &str) -> anyhow::Result<()> {
    let installed = Command::new("cargo")
        .args([tool, "--version"])
        .output()
        .is_ok_and(|output| output.status.success());

    if !installed {
        eprintln!("cargo-{tool} is not installed.");
        eprintln!("Install it with: cargo install cargo-{tool}");
        anyhow::bail!("cargo-{tool} not found");
    }

    let mut full = vec![tool];
    full.extend_from_slice(args);
    cargo(&full, message)
}

fn run_fmt() -> anyhow::Result<()> {
    cargo(&["fmt", "--all", "--", "--check"], "Format check failed. Run 'cargo fmt --all' to fix.")
}

fn run_clippy() -> anyhow::Result<()> {
    cargo(
        &["clippy", "--workspace", "--all-targets", "--all-features", "--", "-D", "warnings"],
        "Clippy run failed. See output above.",
    )
}

fn run_test() -> anyhow::Result<()> {
    cargo(&["test", "--workspace", "--all-features"], "Tests failed")
}

fn run_deny() -> anyhow::Result<()> {
    cargo_tool("deny", &["check"], "cargo-deny found issues")
}

fn run_audit() -> anyhow::Result<()> {
    cargo_tool("audit", &[], "cargo-audit found vulnerabilities")
}

/// Generate TypeScript types from Rust and sync them to the web client
///
/// ts-rs writes one file per exported type into each crate's `bindings/`
/// directory while the crate's tests run.
fn run_codegen() -> anyhow::Result<()> {
    println!("==> Generating TypeScript types from Rust...\n");

    println!("Step 1/3: Running ts-gen tests to export bindings...");
    for package in ["rentkenya-domain", "rentkenya-app"] {
        cargo(
            &["test", "-p", package, "--features", "ts-gen", "--lib"],
            &format!("TypeScript export failed for {package}"),
        )?;
    }

    let frontend_types_dir = PathBuf::from(FRONTEND_TYPES_DIR);
    println!("\nStep 2/3: Syncing bindings to {}...", frontend_types_dir.display());

    let mut found = false;
    for crate_dir in BINDING_CRATES {
        let bindings_dir = PathBuf::from("crates").join(crate_dir).join("bindings");
        if !bindings_dir.exists() {
            continue;
        }
        found = true;
        let synced = sync_bindings(&bindings_dir, &frontend_types_dir)?;
        println!("  {}: synced {synced} files", bindings_dir.display());
    }

    if !found {
        anyhow::bail!("No bindings directory was produced. TypeScript generation may have failed.");
    }

    println!("\nStep 3/3: Generating index.ts...");
    generate_index_ts(&frontend_types_dir)?;

    println!("\n✓ TypeScript type generation complete!");
    println!("  Generated files: {}", frontend_types_dir.display());

    Ok(())
}

/// `.ts` files directly under `dir`, sorted by name
fn ts_files(dir: &Path) -> anyhow::Result<Vec<PathBuf>> {
    let mut files: Vec<PathBuf> = fs::read_dir(dir)
        .with_context(|| format!("Failed to read {}", dir.display()))?
        .filter_map(Result::ok)
        .map(|entry| entry.path())
        .filter(|path| path.extension().and_then(OsStr::to_str) == Some("ts"))
        .collect();
    files.sort();
    Ok(files)
}

/// Copy every binding in `src` into `dest`, returning how many were copied
fn sync_bindings(src: &Path, dest: &Path) -> anyhow::Result<usize> {
    fs::create_dir_all(dest).context("Failed to create frontend types directory")?;

    let files = ts_files(src)?;
    for path in &files {
        let file_name = path.file_name().ok_or_else(|| anyhow!("Invalid file name"))?;
        let target = dest.join(file_name);
        fs::copy(path, &target)
            .with_context(|| format!("Failed to copy {} to {}", path.display(), target.display()))?;
    }
    Ok(files.len())
}

/// Write `index.ts` re-exporting every generated type
fn generate_index_ts(types_dir: &Path) -> anyhow::Result<()> {
    let modules: Vec<String> = ts_files(types_dir)?
        .iter()
        .filter_map(|path| path.file_stem()?.to_str().map(str::to_string))
        .filter(|stem| stem != "index" && !stem.ends_with(".test"))
        .collect();

    let mut content = String::from(
        "// Generated by ts-rs via: cargo xtask codegen\n\
         // DO NOT EDIT MANUALLY - changes will be overwritten\n\n",
    );
    for module in &modules {
        let _ = writeln!(content, "export type {{ {module} }} from './{module}';");
    }

    let index_path = types_dir.join("index.ts");
    fs::write(&index_path, content)
        .with_context(|| format!("Failed to write {}", index_path.display()))?;

    println!("  Generated index.ts with {} exports", modules.len());
    Ok(())
}
