//! Markdown file store with YAML front matter.
//!
//! Documents live as `*.md` files in a single flat directory. Each file is a
//! `---` delimited front matter block followed by a blank line and the body.

pub mod document;
pub mod error;
pub mod frontmatter;
pub mod store;

pub use document::{sanitize_id, MarkdownDocument, MARKDOWN_EXTENSION};
pub use error::{ErrorKind, StoreError};
pub use frontmatter::{Frontmatter, FrontmatterError};
pub use store::{DocumentUpdate, FileStore, NewDocument};
