use anyhow::{Context, Result};
use std::io::{self, Write};
use std::path::Path;

use crate::codec;

/// Decodes a gzip artifact (tile or marker document) to stdout.
pub fn cmd_cat(file: &Path) -> Result<()> {
    let bytes = codec::read_gzip(file).with_context(|| format!("decode {}", file.display()))?;
    let mut out = io::stdout().lock();
    out.write_all(&bytes)?;
    out.flush()?;
    Ok(())
}
