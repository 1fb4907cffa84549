mod common;

use common::*;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use vaultgraph::domain::{Balance, ChainEvent, EntityKind, TransferParams};
use vaultgraph::engine::ProjectionSettings;
use vaultgraph::orchestration::catch_up_all;
use vaultgraph::{
    init_db, EntityStore, EventPayload, FileEventSource, MockChainReader, Projector, Repository,
    StreamCursor, StreamRunner,
};

async fn setup_test_db() -> (Arc<Repository>, TempDir) {
    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir
        .path()
        .join("test.db")
        .to_string_lossy()
        .to_string();
    let pool = init_db(&db_path).await.expect("init_db failed");
    (Arc::new(Repository::new(pool)), temp_dir)
}

fn write_events(path: &Path, events: &[ChainEvent]) {
    let lines: Vec<String> = events
        .iter()
        .map(|e| serde_json::to_string(e).unwrap())
        .collect();
    std::fs::write(path, lines.join("\n") + "\n").unwrap();
}

fn runner(repo: Arc<Repository>, stream_id: &str, events_path: &Path) -> StreamRunner {
    let projector = Projector::new(
        repo,
        Arc::new(MockChainReader::new()),
        ProjectionSettings::default(),
    );
    StreamRunner::new(stream_id, Arc::new(FileEventSource::new(events_path)), projector)
        .with_batch_size(2)
        .with_retry(Duration::from_millis(1), Some(Duration::from_secs(5)))
}

fn vault_history() -> Vec<ChainEvent> {
    vec![
        event(FACTORY, 1, 0, deployed(VAULT)),
        event(VAULT, 2, 0, deposit(ALICE, 1000, 1000)),
        event(VAULT, 2, 1, deposit(BOB, 50, 50)),
        event(
            VAULT,
            3,
            0,
            EventPayload::Transfer(TransferParams {
                from: addr(ALICE),
                to: addr(BOB),
                value: amt(100),
            }),
        ),
        event(VAULT, 4, 0, withdraw(ALICE, 300, 300)),
    ]
}

async fn balance(repo: &Repository, owner: &str) -> Balance {
    let store: &dyn EntityStore = repo;
    store
        .load::<Balance>(&Balance::key(&addr(VAULT), &addr(owner)))
        .await
        .unwrap()
        .unwrap()
}

#[tokio::test]
async fn test_file_stream_into_sqlite() {
    let (repo, temp) = setup_test_db().await;
    let path = temp.path().join("base.jsonl");
    write_events(&path, &vault_history());

    let stats = runner(repo.clone(), "8453", &path)
        .run_until_idle()
        .await
        .unwrap();
    assert_eq!(stats.fetched, 5);
    assert_eq!(stats.applied, 5);

    let alice = balance(&repo, ALICE).await;
    assert_eq!(alice.balance, amt(700));
    assert_eq!(alice.shares, amt(600));
    assert_eq!(balance(&repo, BOB).await.shares, amt(150));

    let cursor = repo.load_cursor("8453").await.unwrap().unwrap();
    assert_eq!(cursor.last_block, Some(4));
    assert_eq!(cursor.last_log_index, Some(0));
    assert_eq!(repo.count_applied_events(CHAIN).await.unwrap(), 5);
}

#[tokio::test]
async fn test_restart_resumes_after_cursor() {
    let (repo, temp) = setup_test_db().await;
    let path = temp.path().join("base.jsonl");
    let history = vault_history();
    write_events(&path, &history[..3]);

    runner(repo.clone(), "8453", &path)
        .run_until_idle()
        .await
        .unwrap();

    // New events are appended while the process is down.
    write_events(&path, &history);
    let stats = runner(repo.clone(), "8453", &path)
        .run_until_idle()
        .await
        .unwrap();
    assert_eq!(stats.fetched, 2);
    assert_eq!(stats.applied, 2);
    assert_eq!(stats.duplicates, 0);

    assert_eq!(balance(&repo, ALICE).await.balance, amt(700));
}

#[tokio::test]
async fn test_rewound_cursor_replays_as_duplicates() {
    let (repo, temp) = setup_test_db().await;
    let path = temp.path().join("base.jsonl");
    write_events(&path, &vault_history());

    runner(repo.clone(), "8453", &path)
        .run_until_idle()
        .await
        .unwrap();
    let balances_before = repo.count_entities(EntityKind::Balance).await.unwrap();

    repo.store_cursor(&StreamCursor::new("8453")).await.unwrap();
    let stats = runner(repo.clone(), "8453", &path)
        .run_until_idle()
        .await
        .unwrap();
    assert_eq!(stats.fetched, 5);
    assert_eq!(stats.duplicates, 5);
    assert_eq!(stats.applied, 0);

    let alice = balance(&repo, ALICE).await;
    assert_eq!(alice.balance, amt(700));
    assert_eq!(alice.total_deposited, amt(1000));
    assert_eq!(
        repo.count_entities(EntityKind::Balance).await.unwrap(),
        balances_before
    );
}

#[tokio::test]
async fn test_missing_event_file_is_idle() {
    let (repo, temp) = setup_test_db().await;
    let stats = runner(repo.clone(), "8453", &temp.path().join("absent.jsonl"))
        .run_until_idle()
        .await
        .unwrap();
    assert_eq!(stats.fetched, 0);
    assert!(repo.load_cursor("8453").await.unwrap().is_none());
}

#[tokio::test]
async fn test_catch_up_all_runs_streams_concurrently() {
    let (repo, temp) = setup_test_db().await;

    let base_path = temp.path().join("base.jsonl");
    write_events(&base_path, &vault_history());

    let other_vault = "0xa000000000000000000000000000000000000002";
    let arb_path = temp.path().join("arb.jsonl");
    write_events(
        &arb_path,
        &[
            event_on(42161, FACTORY, 10, 100, 0, deployed(other_vault)),
            event_on(42161, other_vault, 11, 112, 0, deposit(ALICE, 9, 9)),
        ],
    );

    let runners = vec![
        runner(repo.clone(), "8453", &base_path),
        runner(repo.clone(), "42161", &arb_path),
    ];
    let stats = catch_up_all(&runners).await.unwrap();
    assert_eq!(stats[0].applied, 5);
    assert_eq!(stats[1].applied, 2);

    assert_eq!(repo.count_entities(EntityKind::Curator).await.unwrap(), 2);
    assert_eq!(repo.count_applied_events(42161).await.unwrap(), 2);

    let cursors = repo.list_cursors().await.unwrap();
    assert_eq!(cursors.len(), 2);
}
