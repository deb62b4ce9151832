// SPDX-FileCopyrightText: 2026 Strata Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! File backend against the shared knowledge fixture.

use std::sync::Arc;

use strata_core::{
    ContextProvider, EntryStore, KnowledgeKind, LoadingStrategy, MemoryKey, PruneAction,
    Staleness, StrataError,
};
use strata_files::FileBackend;
use strata_memory::MemoryService;
use strata_prune::PruneEngine;
use strata_test_utils::fixtures::{knowledge_workspace, known_issues, numbered_sections, section};
use strata_test_utils::{clock, days_ago, today};

fn backend(dir: &tempfile::TempDir) -> FileBackend {
    FileBackend::with_dirs(dir.path().join("context"), dir.path().join("memory"), clock())
}

#[tokio::test]
async fn catalog_lists_every_domain() {
    let dir = knowledge_workspace().unwrap();
    let files = backend(&dir);
    let catalog = files.get_catalog(None).await.unwrap();
    let names: Vec<_> = catalog.domains.iter().map(|d| d.domain.as_str()).collect();
    assert_eq!(names, ["azure", "python", "security"]);
    let python = &catalog.domains[1];
    assert_eq!(python.title, "Python");
    assert_eq!(python.file_count, 4);
    assert_eq!(python.last_updated, Some(days_ago(10)));

    let one = files.get_catalog(Some("security")).await.unwrap();
    assert_eq!(one.domains.len(), 1);
}

#[tokio::test]
async fn domain_index_excludes_index_file() {
    let dir = knowledge_workspace().unwrap();
    let index = backend(&dir).get_domain_index("python").await.unwrap();
    assert_eq!(index.reference.kind, KnowledgeKind::Index);
    let files: Vec<_> = index.files.iter().map(|r| r.file.as_str()).collect();
    assert_eq!(files, ["detection", "django", "style", "testing"]);
    assert_eq!(index.cross_domain.len(), 3);
}

#[tokio::test]
async fn reference_metadata_without_body() {
    let dir = knowledge_workspace().unwrap();
    let files = backend(&dir);

    let style = files.get_reference("python", "style").await.unwrap();
    assert_eq!(style.loading_strategy, LoadingStrategy::Always);
    assert_eq!(style.sections, ["Formatting", "Naming"]);
    assert!(style.tags.contains("lint"));
    assert_eq!(style.staleness(today()), Staleness::Fresh);

    // Footer only: version and date come from the trailing block.
    let django = files.get_reference("python", "django").await.unwrap();
    assert_eq!(django.title, "Django guide");
    assert_eq!(django.version.as_deref(), Some("2.1"));
    assert_eq!(django.last_updated, Some(days_ago(45)));
    assert_eq!(django.staleness(today()), Staleness::Aging);

    // No metadata at all.
    let testing = files.get_reference("python", "testing").await.unwrap();
    assert_eq!(testing.last_updated, None);
    assert_eq!(testing.staleness(today()), Staleness::Stale);

    assert!(matches!(
        files.get_reference("python", "missing").await,
        Err(StrataError::NotFound { .. })
    ));
    assert!(matches!(
        files.get_reference("..", "passwd").await,
        Err(StrataError::InvalidKey(_))
    ));
}

#[tokio::test]
async fn materialize_strips_front_matter() {
    let dir = knowledge_workspace().unwrap();
    let files = backend(&dir);
    let auth = files.get_reference("security", "auth").await.unwrap();
    let body = files.materialize(&auth).await.unwrap();
    assert!(body.starts_with("# Authentication\n"));

    let tokens = files
        .materialize_sections(&auth, &["tokens".to_string()])
        .await
        .unwrap();
    assert_eq!(tokens, "## Tokens\nRotate signing keys.\n");
}

#[tokio::test]
async fn selection_operations() {
    let dir = knowledge_workspace().unwrap();
    let files = backend(&dir);

    let always = files.get_always_load_files("python").await.unwrap();
    assert_eq!(always.len(), 1);
    assert_eq!(always[0].reference.id, "python/style");

    let detection = files
        .detect_project_type("python", &["manage.py".into(), "requirements.txt".into()])
        .await
        .unwrap();
    assert_eq!(detection.names().into_iter().collect::<Vec<_>>(), ["django"]);

    let conditional = files
        .get_conditional_context("python", &detection)
        .await
        .unwrap();
    assert_eq!(conditional.len(), 1);
    assert_eq!(conditional[0].reference.id, "python/django");

    // Self-referential and dangling targets are skipped.
    let cross = files
        .get_cross_domain_context(
            "python",
            &["Authentication".into(), "testing".into(), "secrets".into()],
        )
        .await
        .unwrap();
    assert_eq!(cross.len(), 1);
    assert_eq!(cross[0].reference.id, "security/auth");
}

#[tokio::test]
async fn search_ranks_title_hits_first() {
    let dir = knowledge_workspace().unwrap();
    let files = backend(&dir);
    let hits = files.search("django", None).await.unwrap();
    assert_eq!(hits[0].reference.id, "python/django");
    assert!(hits.iter().all(|h| h.score > 0.0));

    let scoped = files.search("authentication", Some("python")).await.unwrap();
    assert!(scoped.iter().all(|h| h.reference.domain == "python"));
    assert!(files.search("kubernetes", None).await.unwrap().is_empty());
}

#[tokio::test]
async fn loading_protocol_is_served() {
    let dir = knowledge_workspace().unwrap();
    let protocol = backend(&dir).get_loading_protocol().await.unwrap();
    assert!(protocol.contains("Load always files."));
}

#[tokio::test]
async fn append_prunes_review_history_on_disk() {
    let dir = knowledge_workspace().unwrap();
    let store = Arc::new(backend(&dir));
    let svc = MemoryService::new(Arc::clone(&store), PruneEngine::default(), clock());
    let key = MemoryKey::shared("acme", "review_history");
    svc.create(key.clone(), numbered_sections("Reviews", "Review", 13))
        .await
        .unwrap();
    svc.append(&key.id(), &section("Review", 14)).await.unwrap();

    let main = tokio::fs::read_to_string(dir.path().join("memory/projects/acme/review_history.md"))
        .await
        .unwrap();
    assert!(main.starts_with("<!-- Last Updated: 2026-06-01 -->\n"));
    assert_eq!(main.matches("\n## Review ").count(), 11);

    let archive = svc
        .get("projects/acme/review_history_archive")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(archive.content.matches("## Review ").count(), 3);

    let history = store.prune_history(None).await.unwrap();
    assert_eq!(history.len(), 3);
    assert!(history.iter().all(|r| r.content_snapshot.is_some()));
}

#[tokio::test]
async fn git_tracked_removals_skip_snapshots() {
    let dir = knowledge_workspace().unwrap();
    let store = Arc::new(backend(&dir).with_git_tracked(true));
    let svc = MemoryService::new(store, PruneEngine::default(), clock());
    let key = MemoryKey::shared("acme", "known_issues");
    svc.create(key.clone(), known_issues()).await.unwrap();
    let outcome = svc.append(&key.id(), "").await.unwrap();
    let removed: Vec<_> = outcome
        .records
        .iter()
        .filter(|r| r.action == PruneAction::Removed)
        .collect();
    assert_eq!(removed.len(), 1);
    assert!(removed[0].content_snapshot.is_none());
}

#[tokio::test]
async fn created_date_survives_rewrites() {
    let dir = knowledge_workspace().unwrap();
    let store = Arc::new(backend(&dir));
    let key = MemoryKey::shared("acme", "notes");
    store
        .insert(strata_core::MemoryEntry::with_dates(
            key.clone(),
            "first\n",
            days_ago(100),
            Some(days_ago(100)),
            today(),
        ))
        .await
        .unwrap();
    let svc = MemoryService::new(Arc::clone(&store), PruneEngine::default(), clock());
    assert_eq!(svc.read(&key).await.unwrap().unwrap().staleness, Staleness::Stale);

    let updated = svc.update(&key.id(), "second\n").await.unwrap();
    assert_eq!(updated.staleness, Staleness::Fresh);
    let reread = store.fetch(&key.id()).await.unwrap().unwrap();
    assert_eq!(reread.created_at, days_ago(100));
    assert_eq!(reread.updated_at, Some(today()));
    assert_eq!(reread.content, "second\n");
}
