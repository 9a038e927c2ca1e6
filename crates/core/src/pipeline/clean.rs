use std::fs::remove_dir_all;

use anyhow::{Context, Result};

use crate::context::Layout;

/// Remove build, output and release directories. Sources and hint parameters stay.
pub fn clean(layout: &Layout) -> Result<usize> {
    let mut removed = 0;

    for dir in [&layout.build, &layout.fonts_out, &layout.collections_out, &layout.release] {
        if dir.exists() {
            remove_dir_all(dir).with_context(|| format!("Failed to remove {}", dir.display()))?;
            println!("Removed {}", dir.display());
            removed += 1;
        } else {
            println!("Skipped {} (not found)", dir.display());
        }
    }

    println!("Cleaned {removed} directories");
    Ok(removed)
}
