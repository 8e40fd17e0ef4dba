//! Content module - handles posts and markdown processing

mod frontmatter;
pub mod markdown;
mod post;
pub mod repository;

pub use frontmatter::FrontMatter;
pub use markdown::{MarkdownPipeline, PipelineError};
pub use post::{author_slug, label_slug, Post};
pub use repository::{BatchReport, ContentError, Paginated, PostRepository};
