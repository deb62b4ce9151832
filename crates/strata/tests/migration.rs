// SPDX-FileCopyrightText: 2026 Strata Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Migration fidelity: files -> sqlite -> vector.

mod common;

use std::path::Path;

use strata::commands::migrate::migrate_backends;
use strata::{Backend, Session};
use strata_core::{
    BackendKind, ContextProvider, EntryStore, MemoryFilter, MemoryKey, PruneAction, Staleness,
    StrataError,
};
use strata_prune::PrunePolicy;
use strata_test_utils::fixtures::{knowledge_workspace, known_issues, numbered_sections, section};
use strata_test_utils::{clock, today};

use common::config_in;

/// Memory with an archive, a removal and an undated legacy file.
async fn seed_files(root: &Path) {
    let config = config_in(root, BackendKind::Files);
    let session = Session::open(&config, clock(), None).await.unwrap();
    let memory = session.memory();

    let reviews = MemoryKey::shared("acme", "review_history");
    memory
        .create(reviews.clone(), numbered_sections("Reviews", "Review", 12))
        .await
        .unwrap();
    memory.append(&reviews.id(), &section("Review", 13)).await.unwrap();
    memory
        .create(MemoryKey::shared("acme", "known_issues"), known_issues())
        .await
        .unwrap();
    memory.prune(&PrunePolicy::all()).await.unwrap();
    session.end().await.unwrap();

    let legacy = root.join("memory/projects/acme/legacy.md");
    std::fs::write(legacy, "Notes from before timestamps were kept.\n").unwrap();
}

#[tokio::test]
async fn files_to_sqlite_to_vector_is_lossless() {
    let dir = knowledge_workspace().unwrap();
    seed_files(dir.path()).await;
    let config = config_in(dir.path(), BackendKind::Files);
    let context = Path::new(&config.files.context_dir);

    let files = Backend::open(BackendKind::Files, &config, clock(), None).await.unwrap();
    let sqlite = Backend::open(BackendKind::Sqlite, &config, clock(), None).await.unwrap();
    let vector = Backend::open(BackendKind::Vector, &config, clock(), None).await.unwrap();

    let first = migrate_backends(&files, &sqlite, context).await.unwrap();
    assert!(first.is_faithful(), "{:?}", first.mismatches);
    assert_eq!(first.knowledge_files, 9);
    assert_eq!(first.memory.entries, 4);

    let second = migrate_backends(&sqlite, &vector, context).await.unwrap();
    assert!(second.is_faithful(), "{:?}", second.mismatches);
    assert_eq!(second.memory.records, first.memory.records);

    let legacy = vector.fetch("projects/acme/legacy").await.unwrap().unwrap();
    assert_eq!(legacy.updated_at, None);
    assert_eq!(legacy.staleness, Staleness::Stale);

    let original = files.list(&MemoryFilter::project("acme")).await.unwrap();
    let migrated = vector.list(&MemoryFilter::project("acme")).await.unwrap();
    assert_eq!(original, migrated);

    let history = vector.prune_history(None).await.unwrap();
    assert!(history.iter().any(|r| r.action == PruneAction::Archived));
    assert!(history.iter().any(|r| r.action == PruneAction::Removed));
    sqlite.close().await.unwrap();
}

#[tokio::test]
async fn materialized_knowledge_is_identical_everywhere() {
    let dir = knowledge_workspace().unwrap();
    let config = config_in(dir.path(), BackendKind::Files);
    let files = Backend::open(BackendKind::Files, &config, clock(), None).await.unwrap();
    let sqlite = Backend::open(BackendKind::Sqlite, &config, clock(), None).await.unwrap();
    migrate_backends(&files, &sqlite, Path::new(&config.files.context_dir))
        .await
        .unwrap();
    let vector = Backend::open(BackendKind::Vector, &config, clock(), None).await.unwrap();

    for backend in [&sqlite, &vector] {
        let reference = backend.get_reference("security", "auth").await.unwrap();
        assert_eq!(reference.staleness(today()), Staleness::Aging);
        assert_eq!(
            backend
                .materialize_sections(&reference, &["tokens".into()])
                .await
                .unwrap(),
            files
                .materialize_sections(&reference, &["tokens".into()])
                .await
                .unwrap()
        );
        assert_eq!(
            backend.get_loading_protocol().await.unwrap(),
            files.get_loading_protocol().await.unwrap()
        );
    }
}

#[tokio::test]
async fn edits_after_migration_are_reported() {
    let dir = knowledge_workspace().unwrap();
    let config = config_in(dir.path(), BackendKind::Files);
    let files = Backend::open(BackendKind::Files, &config, clock(), None).await.unwrap();
    let sqlite = Backend::open(BackendKind::Sqlite, &config, clock(), None).await.unwrap();
    migrate_backends(&files, &sqlite, Path::new(&config.files.context_dir))
        .await
        .unwrap();

    std::fs::write(
        dir.path().join("context/python/testing.md"),
        "# Testing with pytest\n\nParametrize everything.\n",
    )
    .unwrap();
    let target = Backend::open(BackendKind::Vector, &config, clock(), None).await.unwrap();
    let report = migrate_backends(&sqlite, &target, Path::new(&config.files.context_dir))
        .await
        .unwrap();
    assert!(report.mismatches.iter().any(|m| m == "python/testing: body differs"));
}

#[tokio::test]
async fn degenerate_targets_are_rejected() {
    let dir = knowledge_workspace().unwrap();
    let config = config_in(dir.path(), BackendKind::Files);
    let files = Backend::open(BackendKind::Files, &config, clock(), None).await.unwrap();
    let again = Backend::open(BackendKind::Files, &config, clock(), None).await.unwrap();
    assert!(matches!(
        migrate_backends(&files, &again, Path::new(&config.files.context_dir)).await,
        Err(StrataError::Config(_))
    ));
}
