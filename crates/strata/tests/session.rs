// SPDX-FileCopyrightText: 2026 Strata Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Sessions over every backend: caching, routing fallback and pruning.

mod common;

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use strata::commands::check::run_check;
use strata::commands::migrate::migrate_backends;
use strata::commands::prune::{render_prune, run_prune};
use strata::{Backend, Session};
use strata_config::RouteConfig;
use strata_core::{BackendAdapter, BackendKind, ContextProvider, EntryStore, MemoryKey, PruneAction, Staleness};
use strata_prune::{PrunePolicy, PruneScope};
use strata_router::RemoteSource;
use strata_test_utils::fixtures::{
    REMOTE_FUNCTIONS_BODY, knowledge_workspace, known_issues, numbered_sections, section,
};
use strata_test_utils::{MockRemote, RemoteBehavior, clock};

use common::config_in;

#[tokio::test]
async fn session_cache_is_fresh_per_session() {
    let dir = knowledge_workspace().unwrap();
    let config = config_in(dir.path(), BackendKind::Files);
    let session = Session::open(&config, clock(), None).await.unwrap();

    let first = session.knowledge().load("python", "style").await.unwrap();
    let again = session.knowledge().load("python", "style").await.unwrap();
    assert_eq!(first, again);
    assert_eq!(first.staleness, Staleness::Fresh);

    let path = dir.path().join("context/python/style.md");
    let edited = std::fs::read_to_string(&path).unwrap().replace("Use black.", "Use ruff.");
    std::fs::write(&path, edited).unwrap();

    let stats = session.end().await.unwrap();
    assert_eq!(stats.content.hits, 1);
    assert_eq!(stats.content.misses, 1);

    let next = Session::open(&config, clock(), None).await.unwrap();
    let reread = next.knowledge().load("python", "style").await.unwrap();
    assert!(reread.content.contains("Use ruff."));
}

#[tokio::test]
async fn cached_selection_over_sqlite() {
    let dir = knowledge_workspace().unwrap();
    let config = config_in(dir.path(), BackendKind::Sqlite);
    {
        let files = Backend::open(BackendKind::Files, &config, clock(), None).await.unwrap();
        let sqlite = Backend::open(BackendKind::Sqlite, &config, clock(), None).await.unwrap();
        migrate_backends(&files, &sqlite, Path::new(&config.files.context_dir))
            .await
            .unwrap();
        sqlite.close().await.unwrap();
    }

    let session = Session::open(&config, clock(), None).await.unwrap();
    let cache = session.knowledge();
    let detection = cache
        .detect_project_type("python", &["manage.py".into()])
        .await
        .unwrap();
    for _ in 0..3 {
        let conditional = cache.get_conditional_context("python", &detection).await.unwrap();
        assert_eq!(conditional.len(), 1);
        assert_eq!(conditional[0].reference.id, "python/django");
    }
    let stats = cache.stats().await;
    assert_eq!(stats.content.misses, 1);
    assert_eq!(stats.content.hits, 2);
    assert_eq!(stats.catalog.misses, 1);

    cache.invalidate(Some("python"), None).await.unwrap();
    cache.get_conditional_context("python", &detection).await.unwrap();
    assert_eq!(cache.stats().await.content.misses, 2);
    session.end().await.unwrap();
}

fn hybrid_config(root: &Path) -> strata_config::StrataConfig {
    let mut config = config_in(root, BackendKind::Hybrid);
    config.remote.timeout_ms = 50;
    config.remote.routes = vec![RouteConfig {
        domain: "azure".into(),
        file: "functions".into(),
        mode: "remote-preferred".into(),
    }];
    config
}

#[tokio::test]
async fn stalled_remote_falls_back_to_local() {
    let dir = knowledge_workspace().unwrap();
    let config = hybrid_config(dir.path());
    let remote = Arc::new(
        MockRemote::new()
            .with_doc("azure", "functions", REMOTE_FUNCTIONS_BODY)
            .with_behavior(RemoteBehavior::Stall(Duration::from_secs(5))),
    );
    let source: Arc<dyn RemoteSource> = remote.clone();
    let session = Session::open(&config, clock(), Some(source)).await.unwrap();
    assert_eq!(session.backend().kind(), BackendKind::Hybrid);

    let loaded = session.knowledge().load("azure", "functions").await.unwrap();
    assert!(loaded.content.contains("(curated)"));
    assert_eq!(remote.calls(), 1);

    remote.set_behavior(RemoteBehavior::Serve).await;
    let cached = session.knowledge().load("azure", "functions").await.unwrap();
    assert_eq!(cached, loaded);
    assert_eq!(remote.calls(), 1);

    session
        .knowledge()
        .invalidate(Some("azure"), Some("functions"))
        .await
        .unwrap();
    let live = session.knowledge().load("azure", "functions").await.unwrap();
    assert!(live.content.contains("(live)"));
    assert_eq!(remote.calls(), 2);
}

#[tokio::test]
async fn hybrid_memory_lives_in_the_local_tree() {
    let dir = knowledge_workspace().unwrap();
    let config = hybrid_config(dir.path());
    let remote: Arc<dyn RemoteSource> = Arc::new(MockRemote::new());
    let session = Session::open(&config, clock(), Some(remote)).await.unwrap();
    session
        .memory()
        .create(MemoryKey::shared("acme", "notes"), "# Notes\n")
        .await
        .unwrap();
    assert!(dir.path().join("memory/projects/acme/notes.md").exists());
}

#[tokio::test]
async fn pruning_counts_hold_on_every_backend() {
    for kind in [BackendKind::Files, BackendKind::Sqlite, BackendKind::Vector] {
        let dir = knowledge_workspace().unwrap();
        let config = config_in(dir.path(), kind);
        let session = Session::open(&config, clock(), None).await.unwrap();
        let memory = session.memory();

        let reviews = MemoryKey::shared("acme", "review_history");
        memory
            .create(reviews.clone(), numbered_sections("Reviews", "Review", 13))
            .await
            .unwrap();
        memory.append(&reviews.id(), &section("Review", 14)).await.unwrap();
        memory
            .create(MemoryKey::shared("acme", "known_issues"), known_issues())
            .await
            .unwrap();

        let main = memory.get(&reviews.id()).await.unwrap().unwrap();
        let archive = memory
            .get("projects/acme/review_history_archive")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(main.content.matches("## Review ").count(), 11, "{kind}");
        assert_eq!(archive.content.matches("## Review ").count(), 3, "{kind}");

        let policy = PrunePolicy {
            scope: PruneScope::Project("acme".into()),
            dry_run: true,
        };
        let preview = run_prune(&session, &policy).await.unwrap();
        assert!(render_prune(&preview).starts_with("strata prune (dry run)"));
        let issues = memory.get("projects/acme/known_issues").await.unwrap().unwrap();
        assert!(issues.content.contains("Flaky login test"), "{kind}");

        let report = run_prune(&session, &PrunePolicy { dry_run: false, ..policy }).await.unwrap();
        assert!(!report.is_noop(), "{kind}");
        let issues = memory.get("projects/acme/known_issues").await.unwrap().unwrap();
        assert!(!issues.content.contains("Flaky login test"), "{kind}");

        let history = session.backend().prune_history(None).await.unwrap();
        let archived = history.iter().filter(|r| r.action == PruneAction::Archived).count();
        let removed = history.iter().filter(|r| r.action == PruneAction::Removed).count();
        // three sections moved on append, one more by the explicit run
        assert_eq!((archived, removed), (4, 1), "{kind}");
        session.end().await.unwrap();
    }
}

#[tokio::test]
async fn check_reports_integrity_and_freshness() {
    let dir = knowledge_workspace().unwrap();
    let config = config_in(dir.path(), BackendKind::Files);
    let session = Session::open(&config, clock(), None).await.unwrap();
    let report = run_check(&session, Path::new(&config.files.context_dir), "python")
        .await
        .unwrap();

    assert!(report
        .issues
        .iter()
        .any(|i| i.message.contains("security/vault")));
    let django = report
        .freshness
        .iter()
        .find(|(id, _)| id == "python/django")
        .map(|(_, s)| *s);
    assert_eq!(django, Some(Staleness::Aging));
    assert!(report
        .freshness
        .contains(&("python/testing".to_string(), Staleness::Stale)));
}
