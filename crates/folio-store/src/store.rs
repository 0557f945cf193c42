//! Directory-backed document store.

use std::io::ErrorKind as IoErrorKind;
use std::path::{Path, PathBuf};

use tokio::fs;
use tokio::io::AsyncWriteExt;

use crate::document::{id_from_path, is_valid_id, sanitize_id, MarkdownDocument, MARKDOWN_EXTENSION};
use crate::error::StoreError;
use crate::frontmatter::{render_document, Frontmatter, FrontmatterError};

/// Input for creating a document.
#[derive(Debug, Clone, Default)]
pub struct NewDocument {
    pub filename: Option<String>,
    pub content: Option<String>,
    pub frontmatter: Frontmatter,
}

/// Input for replacing a document.
#[derive(Debug, Clone, Default)]
pub struct DocumentUpdate {
    pub content: Option<String>,
    pub frontmatter: Frontmatter,
}

/// A flat directory of markdown files.
#[derive(Debug, Clone)]
pub struct FileStore {
    root: PathBuf,
}

impl FileStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Directory holding the documents.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path of the file backing `id`.
    pub fn path_for(&self, id: &str) -> PathBuf {
        self.root.join(format!("{}.{}", id, MARKDOWN_EXTENSION))
    }

    /// Read every markdown document, ordered by id.
    pub async fn list(&self) -> Result<Vec<MarkdownDocument>, StoreError> {
        let mut entries = fs::read_dir(&self.root)
            .await
            .map_err(|e| StoreError::io(&self.root, e))?;

        let mut ids = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| StoreError::io(&self.root, e))?
        {
            let path = entry.path();
            let Some(id) = id_from_path(&path) else {
                continue;
            };
            let file_type = entry
                .file_type()
                .await
                .map_err(|e| StoreError::io(&path, e))?;
            if file_type.is_dir() {
                continue;
            }
            ids.push(id);
        }
        ids.sort();

        let mut docs = Vec::with_capacity(ids.len());
        for id in ids {
            docs.push(self.read(&id).await?);
        }

        tracing::debug!("Listed {} markdown files from {}", docs.len(), self.root.display());
        Ok(docs)
    }

    /// Read a single document.
    pub async fn get(&self, id: &str) -> Result<MarkdownDocument, StoreError> {
        if !is_valid_id(id) {
            return Err(StoreError::NotFound(id.to_string()));
        }
        self.read(id).await
    }

    /// Create a new document. Fails if the sanitized id already exists.
    pub async fn create(&self, new: NewDocument) -> Result<MarkdownDocument, StoreError> {
        let filename = new
            .filename
            .filter(|f| !f.trim().is_empty())
            .ok_or(StoreError::MissingField("filename"))?;
        let content = new.content.ok_or(StoreError::MissingField("content"))?;

        let id = sanitize_id(&filename);
        if id.is_empty() {
            return Err(StoreError::InvalidName(filename));
        }

        let rendered = render(&new.frontmatter, &content)?;
        let path = self.path_for(&id);

        let mut file = match fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .await
        {
            Ok(file) => file,
            Err(e) if e.kind() == IoErrorKind::AlreadyExists => {
                return Err(StoreError::AlreadyExists(id));
            }
            Err(e) => return Err(StoreError::io(&path, e)),
        };
        let written = match file.write_all(rendered.as_bytes()).await {
            Ok(()) => file.flush().await,
            Err(e) => Err(e),
        };
        drop(file);

        let created = match written {
            Ok(()) => self.read(&id).await,
            Err(e) => Err(StoreError::io(&path, e)),
        };
        match created {
            Ok(doc) => {
                tracing::info!("Created markdown file: {}", path.display());
                Ok(doc)
            }
            Err(e) => {
                // Listing must never see a file it cannot parse.
                if let Err(remove) = fs::remove_file(&path).await {
                    tracing::warn!("Failed to remove {}: {}", path.display(), remove);
                }
                Err(e)
            }
        }
    }

    /// Replace a document's front matter and body. No merge with the old file.
    pub async fn update(
        &self,
        id: &str,
        update: DocumentUpdate,
    ) -> Result<MarkdownDocument, StoreError> {
        let content = update.content.ok_or(StoreError::MissingField("content"))?;
        if !is_valid_id(id) {
            return Err(StoreError::NotFound(id.to_string()));
        }

        let path = self.path_for(id);
        match fs::metadata(&path).await {
            Ok(meta) if meta.is_file() => {}
            Ok(_) => return Err(StoreError::NotFound(id.to_string())),
            Err(e) if e.kind() == IoErrorKind::NotFound => {
                return Err(StoreError::NotFound(id.to_string()));
            }
            Err(e) => return Err(StoreError::io(&path, e)),
        }

        let rendered = render(&update.frontmatter, &content)?;
        fs::write(&path, rendered)
            .await
            .map_err(|e| StoreError::io(&path, e))?;

        tracing::info!("Updated markdown file: {}", path.display());
        self.read(id).await
    }

    async fn read(&self, id: &str) -> Result<MarkdownDocument, StoreError> {
        let path = self.path_for(id);
        let source = match fs::read_to_string(&path).await {
            Ok(source) => source,
            Err(e) if e.kind() == IoErrorKind::NotFound => {
                return Err(StoreError::NotFound(id.to_string()));
            }
            Err(e) => return Err(StoreError::io(&path, e)),
        };

        MarkdownDocument::parse(id, &source)
            .map_err(|source| StoreError::Frontmatter { path, source })
    }
}

fn render(frontmatter: &Frontmatter, content: &str) -> Result<String, StoreError> {
    render_document(frontmatter, content).map_err(|e| match e {
        FrontmatterError::UnsupportedValue(_) => StoreError::UnsupportedValue(e),
        other => StoreError::Frontmatter {
            path: PathBuf::new(),
            source: other,
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use tempfile::tempdir;

    fn frontmatter(value: serde_json::Value) -> Frontmatter {
        value.as_object().cloned().unwrap()
    }

    fn new_doc(filename: &str, content: &str, fm: serde_json::Value) -> NewDocument {
        NewDocument {
            filename: Some(filename.to_string()),
            content: Some(content.to_string()),
            frontmatter: frontmatter(fm),
        }
    }

    #[tokio::test]
    async fn create_then_get_round_trips() {
        let temp = tempdir().unwrap();
        let store = FileStore::new(temp.path());

        let created = store
            .create(new_doc(
                "My Post!",
                "# Hi",
                json!({ "title": "Hi", "order": 2, "draft": false }),
            ))
            .await
            .unwrap();
        assert_eq!(created.id, "my-post-");

        let fetched = store.get("my-post-").await.unwrap();
        assert_eq!(fetched.content, "# Hi");
        assert_eq!(
            fetched.frontmatter,
            frontmatter(json!({ "title": "Hi", "order": 2, "draft": false }))
        );

        let on_disk = std::fs::read_to_string(temp.path().join("my-post-.md")).unwrap();
        assert_eq!(on_disk, "---\ntitle: Hi\norder: 2\ndraft: false\n---\n\n# Hi");
    }

    #[tokio::test]
    async fn create_conflict_leaves_existing_file() {
        let temp = tempdir().unwrap();
        let store = FileStore::new(temp.path());
        store
            .create(new_doc("post", "original", json!({ "title": "One" })))
            .await
            .unwrap();

        let err = store
            .create(new_doc("POST", "replacement", json!({})))
            .await
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Conflict);
        assert_eq!(store.get("post").await.unwrap().content, "original");
    }

    #[tokio::test]
    async fn create_requires_filename_and_content() {
        let temp = tempdir().unwrap();
        let store = FileStore::new(temp.path());

        let err = store
            .create(NewDocument {
                filename: Some("post".into()),
                content: None,
                frontmatter: Frontmatter::new(),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::MissingField("content")));

        let err = store
            .create(NewDocument {
                filename: Some("   ".into()),
                content: Some("body".into()),
                frontmatter: Frontmatter::new(),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::MissingField("filename")));

        assert_eq!(std::fs::read_dir(temp.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn create_rejects_list_values_without_writing() {
        let temp = tempdir().unwrap();
        let store = FileStore::new(temp.path());

        let err = store
            .create(new_doc("tags", "body", json!({ "tags": ["a", "b"] })))
            .await
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Validation);
        assert!(!temp.path().join("tags.md").exists());
    }

    #[tokio::test]
    async fn create_with_pasted_line_separator_keeps_listing_readable() {
        let temp = tempdir().unwrap();
        let store = FileStore::new(temp.path());

        let created = store
            .create(new_doc(
                "pasted",
                "body",
                json!({ "title": "Hello\u{2028}World", "note": "a\u{2029}b" }),
            ))
            .await
            .unwrap();
        assert_eq!(created.title(), Some("Hello\u{2028}World"));

        let docs = store.list().await.unwrap();
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].frontmatter["note"], json!("a\u{2029}b"));
    }

    #[tokio::test]
    async fn update_replaces_whole_file() {
        let temp = tempdir().unwrap();
        let store = FileStore::new(temp.path());
        store
            .create(new_doc(
                "post",
                "old body",
                json!({ "title": "Old", "author": "Ann" }),
            ))
            .await
            .unwrap();

        store
            .update(
                "post",
                DocumentUpdate {
                    content: Some("new body".into()),
                    frontmatter: frontmatter(json!({ "title": "New" })),
                },
            )
            .await
            .unwrap();

        let doc = store.get("post").await.unwrap();
        assert_eq!(doc.content, "new body");
        assert_eq!(doc.frontmatter, frontmatter(json!({ "title": "New" })));
    }

    #[tokio::test]
    async fn update_missing_file_is_not_found() {
        let temp = tempdir().unwrap();
        let store = FileStore::new(temp.path());

        let err = store
            .update(
                "ghost",
                DocumentUpdate {
                    content: Some("body".into()),
                    frontmatter: Frontmatter::new(),
                },
            )
            .await
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert!(!temp.path().join("ghost.md").exists());
    }

    #[tokio::test]
    async fn update_without_content_does_not_write() {
        let temp = tempdir().unwrap();
        let store = FileStore::new(temp.path());
        store
            .create(new_doc("post", "keep me", json!({})))
            .await
            .unwrap();

        let err = store
            .update("post", DocumentUpdate::default())
            .await
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Validation);
        assert_eq!(store.get("post").await.unwrap().content, "keep me");
    }

    #[tokio::test]
    async fn list_reads_visible_markdown_sorted() {
        let temp = tempdir().unwrap();
        std::fs::write(temp.path().join("b.md"), "---\ntitle: B\n---\n\nbee").unwrap();
        std::fs::write(temp.path().join("a.md"), "plain body").unwrap();
        std::fs::write(temp.path().join(".hidden.md"), "secret").unwrap();
        std::fs::write(temp.path().join("notes.txt"), "ignored").unwrap();
        std::fs::create_dir(temp.path().join("dir.md")).unwrap();

        let docs = FileStore::new(temp.path()).list().await.unwrap();

        let ids: Vec<_> = docs.iter().map(|d| d.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b"]);
        assert_eq!(docs[0].content, "plain body");
        assert_eq!(docs[1].title(), Some("B"));
    }

    #[tokio::test]
    async fn list_fails_on_missing_directory() {
        let temp = tempdir().unwrap();
        let store = FileStore::new(temp.path().join("missing"));

        let err = store.list().await.unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Io);
    }

    #[tokio::test]
    async fn get_rejects_traversal() {
        let temp = tempdir().unwrap();
        let inner = temp.path().join("store");
        std::fs::create_dir(&inner).unwrap();
        std::fs::write(temp.path().join("outside.md"), "nope").unwrap();

        let err = FileStore::new(&inner).get("../outside").await.unwrap_err();

        assert_eq!(err.kind(), ErrorKind::NotFound);
    }
}
