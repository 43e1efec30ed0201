use anyhow::Result;
use vergen::{vergen, Config};

fn main() -> Result<()> {
    // trigger recompilation when a new migration is added
    println!("cargo:rerun-if-changed=migrations");

    // Builds from outside a git checkout still work, just without a
    // version stamp.
    if vergen(Config::default()).is_err() {
        println!("cargo:warning=git metadata unavailable; skipping version info");
    }

    Ok(())
}
