//! Regenerate the snapshot artifact

use anyhow::Result;

use crate::Folio;

/// Rewrite `<snapshot_dir>/posts.json` from the posts directory
///
/// A failed write is logged, not returned.
pub fn run(folio: &Folio) -> Result<()> {
    let repo = folio.repository();
    if let Some(path) = repo.write_snapshot(&folio.snapshot_dir) {
        println!("Snapshot written to {}", path.display());
    }
    Ok(())
}
