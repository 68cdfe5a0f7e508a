pub mod check;
pub mod normalize;
pub mod replay;

pub use check::{check, CheckArgs};
pub use normalize::{normalize, NormalizeArgs};
pub use replay::{replay, ReplayArgs};

use anyhow::{Context, Result};
use std::io::Read;
use std::path::Path;

/// Read a file, or stdin when the path is `-`
pub(crate) fn read_input(path: &Path) -> Result<String> {
    if path == Path::new("-") {
        let mut source = String::new();
        std::io::stdin()
            .read_to_string(&mut source)
            .context("Failed to read stdin")?;
        return Ok(source);
    }
    std::fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))
}
