//! bgcut command-line tool
//!
//! Removes image backgrounds in folder, single-image and batch modes.

#[cfg(feature = "cli")]
use bgcut::cli;

#[cfg(feature = "cli")]
fn main() -> anyhow::Result<()> {
    cli::main()
}

#[cfg(not(feature = "cli"))]
fn main() {
    panic!("CLI feature not enabled. Please rebuild with --features cli");
}
