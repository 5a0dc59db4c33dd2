//! Version command implementation
//!
//! Besides the build, reports the planner defaults an app description
//! falls back to, so plans can be compared across releases.

use std::fmt::Write as _;

use crate::dex::{DexPolicy, DexStore, MergeMode};
use crate::enhancer::options::DEFAULT_R_DOT_JAVA_WEIGHT_FACTOR;
use crate::error::Result;

/// Run version command
pub fn run() -> Result<()> {
    print!("{}", report());
    Ok(())
}

fn report() -> String {
    let stores = [DexStore::Raw, DexStore::Jar, DexStore::Xzs]
        .iter()
        .map(|s| format!("{s} ({})", s.extension()))
        .collect::<Vec<_>>()
        .join(", ");
    let modes = [
        MergeMode::PreDexSplit,
        MergeMode::PreDexSingle,
        MergeMode::NonPreDexed,
    ]
    .map(|m| m.to_string())
    .join(", ");

    let mut out = String::new();
    let _ = writeln!(out, "dexgraph {}", env!("CARGO_PKG_VERSION"));
    let _ = writeln!(out);
    let _ = writeln!(out, "Build info:");
    let _ = writeln!(out, "  Minimum Rust version: {}", env!("CARGO_PKG_RUST_VERSION"));
    let _ = writeln!(out, "  Profile: {}", build_profile());
    let _ = writeln!(out);
    let _ = writeln!(out, "Planner defaults:");
    let _ = writeln!(out, "  Dex stores: {stores}");
    let _ = writeln!(out, "  Merge modes: {modes}");
    let _ = writeln!(out, "  Secondary dex weight limit: {}", DexPolicy::DEFAULT_WEIGHT_LIMIT);
    let _ = writeln!(
        out,
        "  Linear alloc hard limit: {}",
        DexPolicy::DEFAULT_LINEAR_ALLOC_HARD_LIMIT
    );
    let _ = writeln!(
        out,
        "  Resource code weight factor: {DEFAULT_R_DOT_JAVA_WEIGHT_FACTOR}"
    );
    out
}

fn build_profile() -> &'static str {
    if cfg!(debug_assertions) {
        "debug"
    } else {
        "release"
    }
}
