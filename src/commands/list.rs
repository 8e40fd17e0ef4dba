//! List posts

use anyhow::Result;

use crate::content::Post;
use crate::Folio;

/// Which posts to list
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Filter {
    All,
    Category(String),
    Tag(String),
    Author(String),
    Archive(String),
    Featured(Vec<String>),
}

/// Print one page of posts matching `filter`
pub fn run(folio: &Folio, filter: &Filter, page: usize, limit: Option<usize>) -> Result<()> {
    let repo = folio.repository();
    let limit = limit.unwrap_or(folio.config.per_page);

    let matched: Vec<&Post> = match filter {
        Filter::All => repo.list_all().iter().collect(),
        Filter::Category(slug) => repo.filter_by_category(slug),
        Filter::Tag(slug) => repo.filter_by_tag(slug),
        Filter::Author(slug) => repo.filter_by_author(slug),
        Filter::Archive(slug) => repo.filter_by_archive(slug),
        Filter::Featured(ids) => {
            let ids: Vec<&str> = ids.iter().map(String::as_str).collect();
            repo.featured(&ids)
        }
    };

    let items = page_of(&matched, limit, page);
    println!(
        "Posts ({} total, page {}, {} shown):",
        matched.len(),
        page,
        items.len()
    );
    for post in items {
        println!("{}", format_line(post));
    }

    Ok(())
}

/// Same slicing rule as `PostRepository::paginate`, over a filtered list
fn page_of<'a, T>(items: &'a [T], limit: usize, page: usize) -> &'a [T] {
    let start = page.saturating_sub(1).saturating_mul(limit);
    let end = page.saturating_mul(limit).min(items.len());
    if page == 0 || start >= end {
        &items[..0]
    } else {
        &items[start..end]
    }
}

fn format_line(post: &Post) -> String {
    let mut line = format!(
        "  {} - {} [{}]",
        post.date.format("%Y-%m-%d"),
        post.title.as_deref().unwrap_or("(untitled)"),
        post.id
    );
    if !post.categories.is_empty() {
        line.push_str(&format!(" ({})", post.categories.join(", ")));
    }
    line
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_of() {
        let items = [1, 2, 3, 4, 5];
        assert_eq!(page_of(&items, 2, 1), &[1, 2]);
        assert_eq!(page_of(&items, 2, 3), &[5]);
        assert!(page_of(&items, 2, 4).is_empty());
        assert!(page_of(&items, 2, 0).is_empty());
        assert!(page_of(&items, 0, 1).is_empty());
    }
}
