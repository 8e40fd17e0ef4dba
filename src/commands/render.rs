//! Render posts to HTML fragments

use anyhow::Result;
use notify_debouncer_mini::{new_debouncer, notify::RecursiveMode};
use std::fs;
use std::time::Duration;

use crate::content::BatchReport;
use crate::Folio;

/// Render every post into `<public_dir>/posts/<id>.html`
///
/// Posts that fail to transform or to be written are logged, listed in the
/// report's `failed` ids and skipped.
pub fn run(folio: &Folio) -> Result<BatchReport> {
    let repo = folio.repository();
    let rendered = repo.render_all(folio.config.jobs);

    let out_dir = folio.public_dir.join("posts");
    fs::create_dir_all(&out_dir)?;

    let mut report = BatchReport {
        rendered: Vec::with_capacity(rendered.rendered.len()),
        failed: rendered.failed,
    };
    for post in rendered.rendered {
        let path = out_dir.join(format!("{}.html", post.id));
        let written = fs::write(&path, post.content_html.as_deref().unwrap_or_default());
        match written {
            Ok(()) => {
                tracing::debug!("Wrote {:?}", path);
                report.rendered.push(post);
            }
            Err(e) => {
                tracing::error!(post = %post.id, "Failed to write {:?}: {}", path, e);
                report.failed.push(post.id);
            }
        }
    }

    if !report.failed.is_empty() {
        tracing::warn!("Failed posts: {}", report.failed.join(", "));
    }
    Ok(report)
}

/// Re-render whenever the posts directory or config changes
pub async fn watch(folio: &Folio) -> Result<()> {
    let (tx, rx) = std::sync::mpsc::channel();

    // Coalesce bursts of editor writes into one rebuild
    let mut debouncer = new_debouncer(Duration::from_millis(500), tx)?;

    if folio.posts_dir.exists() {
        debouncer
            .watcher()
            .watch(&folio.posts_dir, RecursiveMode::Recursive)?;
        tracing::debug!("Watching: {:?}", folio.posts_dir);
    }

    let config_path = folio.base_dir.join("_config.yml");
    if config_path.exists() {
        debouncer
            .watcher()
            .watch(&config_path, RecursiveMode::NonRecursive)?;
        tracing::debug!("Watching: {:?}", config_path);
    }

    tracing::info!("Watching for changes. Press Ctrl+C to stop.");

    loop {
        match rx.recv() {
            Ok(Ok(events)) => {
                let relevant: Vec<_> = events
                    .iter()
                    .filter(|e| {
                        let path_str = e.path.to_string_lossy();
                        !path_str.contains(".git")
                            && !path_str.contains(".DS_Store")
                            && !path_str.ends_with('~')
                    })
                    .collect();

                if relevant.is_empty() {
                    continue;
                }

                for event in &relevant {
                    tracing::info!("File changed: {}", event.path.display());
                }

                // The config may have changed too
                let folio = match Folio::new(&folio.base_dir) {
                    Ok(folio) => folio,
                    Err(e) => {
                        tracing::error!("Failed to reload config: {}", e);
                        continue;
                    }
                };
                match run(&folio) {
                    Ok(report) => tracing::info!(
                        "Re-rendered {} posts ({} failed)",
                        report.rendered.len(),
                        report.failed.len()
                    ),
                    Err(e) => tracing::error!("Render failed: {}", e),
                }
            }
            Ok(Err(e)) => {
                tracing::error!("Watch error: {:?}", e);
            }
            Err(e) => {
                tracing::error!("Channel error: {:?}", e);
                break;
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_render_writes_fragments() {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join("_config.yml"),
            "posts_dir: posts\npublic_dir: out\njobs: 2\n",
        )
        .unwrap();
        fs::create_dir_all(dir.path().join("posts")).unwrap();
        fs::write(
            dir.path().join("posts/hello.md"),
            "---\ntitle: Hello\ndate: 2025-01-01\n---\n# Hello\n",
        )
        .unwrap();
        fs::write(dir.path().join("posts/draft.md"), "no front-matter\n").unwrap();

        let folio = Folio::new(dir.path()).unwrap();
        let report = run(&folio).unwrap();
        assert_eq!(report.rendered.len(), 1);

        let html = fs::read_to_string(dir.path().join("out/posts/hello.html")).unwrap();
        assert_eq!(html.trim(), "<h1>Hello</h1>");
        assert!(!dir.path().join("out/posts/draft.html").exists());
    }

    #[test]
    fn test_write_failure_does_not_stop_batch() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("_config.yml"), "posts_dir: posts\npublic_dir: out\n").unwrap();
        fs::create_dir_all(dir.path().join("posts")).unwrap();
        for (id, date) in [("a", "2025-01-01"), ("b", "2025-01-02"), ("c", "2025-01-03")] {
            fs::write(
                dir.path().join(format!("posts/{}.md", id)),
                format!("---\ndate: {}\n---\n{}\n", date, id),
            )
            .unwrap();
        }
        // A directory where b's fragment should go makes that write fail
        fs::create_dir_all(dir.path().join("out/posts/b.html")).unwrap();

        let folio = Folio::new(dir.path()).unwrap();
        let report = run(&folio).unwrap();

        assert_eq!(report.failed, vec!["b"]);
        assert_eq!(report.rendered.len(), 2);
        assert!(dir.path().join("out/posts/a.html").is_file());
        assert!(dir.path().join("out/posts/c.html").is_file());
    }
}
