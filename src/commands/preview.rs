//! Preview a post the way a reader's browser would show it

use anyhow::Result;

use crate::enhance::{Document, Enhancer};
use crate::Folio;

/// Class of the article container the enhancer works inside
pub const ARTICLE_CLASS: &str = "art-text";

/// Render a post, enhance its code blocks and print the article markup
pub fn run(folio: &Folio, id: &str) -> Result<()> {
    let repo = folio.repository();
    let Some(post) = repo.get_by_id(id) else {
        anyhow::bail!("Post not found: {}", id);
    };

    let html = enhance_html(post.content_html.as_deref().unwrap_or_default());
    println!("{}", html);
    Ok(())
}

/// Mount `html` in an article container and enhance its code blocks
pub fn enhance_html(html: &str) -> String {
    let mut doc = Document::new();
    let root = doc.root();
    let article = doc.create_element("article");
    doc.set_attr(article, "class", ARTICLE_CLASS);
    doc.append_child(root, article);
    doc.append_html(article, html);

    let mut enhancer = Enhancer::new(doc);
    let count = enhancer.scan(article);
    tracing::debug!("Enhanced {} code blocks for preview", count);

    enhancer.document().outer_html(article)
}
