//! Show one post, or the posts related to it

use anyhow::Result;

use crate::Folio;

/// Print the rendered HTML of a post
pub fn run(folio: &Folio, id: &str) -> Result<()> {
    let repo = folio.repository();
    let Some(post) = repo.get_by_id(id) else {
        anyhow::bail!("Post not found: {}", id);
    };

    if let Some(title) = &post.title {
        tracing::info!("{} ({})", title, post.date.format("%Y-%m-%d"));
    }
    println!("{}", post.content_html.unwrap_or_default());
    Ok(())
}

/// Print the posts related to `id`
pub fn related(folio: &Folio, id: &str) -> Result<()> {
    let repo = folio.repository();
    if !repo.all_ids().contains(&id) {
        anyhow::bail!("Post not found: {}", id);
    }

    let related = repo.related(id);
    println!("Related to {} ({}):", id, related.len());
    for post in related {
        println!(
            "  [{}] {} - {}",
            post.category_label(),
            post.id,
            post.title.as_deref().unwrap_or("(untitled)")
        );
    }
    Ok(())
}
