//! Clean the public directory and snapshot

use anyhow::Result;
use std::fs;

use crate::snapshot::SNAPSHOT_FILE;
use crate::Folio;

/// Remove rendered output and the snapshot file
pub fn run(folio: &Folio) -> Result<()> {
    if folio.public_dir.exists() {
        fs::remove_dir_all(&folio.public_dir)?;
        tracing::info!("Deleted: {:?}", folio.public_dir);
    }

    let snapshot_path = folio.snapshot_dir.join(SNAPSHOT_FILE);
    if snapshot_path.exists() {
        fs::remove_file(&snapshot_path)?;
        tracing::info!("Deleted: {:?}", snapshot_path);
    }

    Ok(())
}
