// SPDX-FileCopyrightText: 2026 Strata Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Reading the markdown knowledge tree.
//!
//! The file backend reads lazily through these helpers on every call. The
//! relational and vector backends import a whole [`KnowledgeTree`] once.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use strata_core::markdown::{self, ParsedDocument};
use strata_core::{CrossDomainRule, KnowledgeReference, StrataError};
use tracing::{debug, warn};

/// Name of the root document describing how context is loaded.
pub const LOADING_PROTOCOL_FILE: &str = "loading_protocol.md";

/// File stem of every domain's index.
pub const INDEX_FILE: &str = "index";

/// A parsed knowledge file together with its body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredDocument {
    pub reference: KnowledgeReference,
    pub declared_domain: Option<String>,
    pub cross_domain: Vec<CrossDomainRule>,
    /// Body text without front matter.
    pub body: String,
}

impl StoredDocument {
    pub fn from_text(domain: &str, file: &str, text: &str) -> Self {
        let ParsedDocument {
            reference,
            declared_domain,
            cross_domain,
        } = markdown::parse_document(domain, file, text);
        Self {
            reference,
            declared_domain,
            cross_domain,
            body: markdown::body(text).to_string(),
        }
    }
}

/// Every document of a context directory, loaded eagerly.
#[derive(Debug, Clone, Default)]
pub struct KnowledgeTree {
    /// Sorted by id.
    pub documents: Vec<StoredDocument>,
    pub loading_protocol: Option<String>,
}

/// Reject names that would escape the tree.
pub(crate) fn check_segment(name: &str, value: &str) -> Result<(), StrataError> {
    if value.is_empty()
        || value == "."
        || value == ".."
        || value.contains(['/', '\\', '\0'])
    {
        return Err(StrataError::InvalidKey(format!(
            "{name} `{value}` is not a valid path segment"
        )));
    }
    Ok(())
}

pub(crate) fn document_path(root: &Path, domain: &str, file: &str) -> Result<PathBuf, StrataError> {
    check_segment("domain", domain)?;
    check_segment("file", file)?;
    Ok(root.join(domain).join(format!("{file}.md")))
}

/// Read a file, mapping a missing file to `NotFound` for `id`.
pub(crate) async fn read_knowledge_file(path: &Path, id: &str) -> Result<String, StrataError> {
    match tokio::fs::read_to_string(path).await {
        Ok(text) => Ok(text),
        Err(e) if e.kind() == ErrorKind::NotFound => Err(StrataError::knowledge_not_found(id)),
        Err(e) => Err(StrataError::io(e)),
    }
}

/// Read and parse `{root}/{domain}/{file}.md`.
pub async fn read_document(
    root: &Path,
    domain: &str,
    file: &str,
) -> Result<StoredDocument, StrataError> {
    let path = document_path(root, domain, file)?;
    let text = read_knowledge_file(&path, &KnowledgeReference::make_id(domain, file)).await?;
    Ok(StoredDocument::from_text(domain, file, &text))
}

/// Domain directory names, sorted. Hidden directories are skipped.
pub async fn list_domains(root: &Path) -> Result<Vec<String>, StrataError> {
    let mut domains = Vec::new();
    let mut dir = match tokio::fs::read_dir(root).await {
        Ok(dir) => dir,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            warn!(path = %root.display(), "context directory does not exist");
            return Ok(domains);
        }
        Err(e) => return Err(StrataError::io(e)),
    };
    while let Some(entry) = dir.next_entry().await.map_err(StrataError::io)? {
        let name = entry.file_name().to_string_lossy().into_owned();
        if name.starts_with('.') {
            continue;
        }
        if entry.file_type().await.map_err(StrataError::io)?.is_dir() {
            domains.push(name);
        }
    }
    domains.sort();
    Ok(domains)
}

/// File stems of every `.md` file in a domain, sorted. `NotFound` if the
/// domain directory is missing.
pub async fn list_files(root: &Path, domain: &str) -> Result<Vec<String>, StrataError> {
    check_segment("domain", domain)?;
    let mut dir = match tokio::fs::read_dir(root.join(domain)).await {
        Ok(dir) => dir,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            return Err(StrataError::knowledge_not_found(domain));
        }
        Err(e) => return Err(StrataError::io(e)),
    };
    let mut files = Vec::new();
    while let Some(entry) = dir.next_entry().await.map_err(StrataError::io)? {
        let path = entry.path();
        if path.extension().and_then(|e| e.to_str()) != Some("md") {
            continue;
        }
        if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
            files.push(stem.to_string());
        }
    }
    files.sort();
    Ok(files)
}

/// Body of the loading protocol, if the tree has one.
pub async fn read_loading_protocol(root: &Path) -> Result<Option<String>, StrataError> {
    match tokio::fs::read_to_string(root.join(LOADING_PROTOCOL_FILE)).await {
        Ok(text) => Ok(Some(markdown::body(&text).to_string())),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
        Err(e) => Err(StrataError::io(e)),
    }
}

/// Load every document under `root`.
pub async fn scan_tree(root: &Path) -> Result<KnowledgeTree, StrataError> {
    let mut documents = Vec::new();
    for domain in list_domains(root).await? {
        for file in list_files(root, &domain).await? {
            documents.push(read_document(root, &domain, &file).await?);
        }
    }
    documents.sort_by(|a, b| a.reference.id.cmp(&b.reference.id));
    debug!(path = %root.display(), documents = documents.len(), "knowledge tree scanned");
    Ok(KnowledgeTree {
        documents,
        loading_protocol: read_loading_protocol(root).await?,
    })
}
