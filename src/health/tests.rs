//! Unit tests for the health-check scheduler.

use super::*;
use crate::store::MemoryStore;
use bson::oid::ObjectId;
use chrono::Utc;

fn definition(name: &str, interval: i64) -> CheckDefinition {
    CheckDefinition {
        id: ObjectId::new(),
        name: name.to_string(),
        url: "http://127.0.0.1:9/".to_string(),
        method: "GET".to_string(),
        interval,
        status_code: 200,
        headers: HashMap::new(),
        expected_body: None,
        status: "active".to_string(),
        created_at: Utc::now(),
    }
}

fn seed(store: &MemoryStore, definitions: &[CheckDefinition]) {
    let documents = definitions
        .iter()
        .map(|d| bson::to_document(d).unwrap())
        .collect();
    store.set_documents(store::DEFINITIONS_COLLECTION, documents);
}

fn make_scheduler(store: Arc<MemoryStore>) -> Scheduler {
    Scheduler::with_client(
        store,
        SchedulerConfig::default(),
        reqwest::Client::new(),
    )
}

#[tokio::test]
async fn test_reconcile_loads_active_definitions() {
    let store = Arc::new(MemoryStore::new());
    let active = definition("api", 5);
    let mut inactive = definition("old", 5);
    inactive.status = "paused".to_string();
    seed(&store, &[active.clone(), inactive]);

    let scheduler = make_scheduler(store);
    scheduler.reconcile().await.unwrap();

    let entries = scheduler.entries.read().await;
    assert_eq!(entries.len(), 1);
    let entry = &entries[&active.id.to_hex()];
    assert_eq!(entry.countdown, 5);
    assert_eq!(entry.definition.name, "api");
}

#[tokio::test]
async fn test_reconcile_removes_departed_definitions() {
    let store = Arc::new(MemoryStore::new());
    let kept = definition("kept", 5);
    let dropped = definition("dropped", 5);
    seed(&store, &[kept.clone(), dropped.clone()]);

    let scheduler = make_scheduler(Arc::clone(&store));
    scheduler.reconcile().await.unwrap();
    assert_eq!(scheduler.active_count().await, 2);

    let mut deactivated = dropped;
    deactivated.status = "inactive".to_string();
    seed(&store, &[kept.clone(), deactivated]);
    scheduler.reconcile().await.unwrap();

    let entries = scheduler.entries.read().await;
    assert_eq!(entries.len(), 1);
    assert!(entries.contains_key(&kept.id.to_hex()));
}

#[tokio::test]
async fn test_reconcile_is_idempotent() {
    let store = Arc::new(MemoryStore::new());
    seed(&store, &[definition("a", 7), definition("b", 11)]);

    let scheduler = make_scheduler(store);
    scheduler.reconcile().await.unwrap();

    let before: Vec<(String, i64)> = {
        let entries = scheduler.entries.read().await;
        let mut snapshot: Vec<_> = entries
            .iter()
            .map(|(id, e)| (id.clone(), e.countdown))
            .collect();
        snapshot.sort();
        snapshot
    };

    scheduler.reconcile().await.unwrap();

    let after: Vec<(String, i64)> = {
        let entries = scheduler.entries.read().await;
        let mut snapshot: Vec<_> = entries
            .iter()
            .map(|(id, e)| (id.clone(), e.countdown))
            .collect();
        snapshot.sort();
        snapshot
    };

    assert_eq!(before, after);
}

#[tokio::test]
async fn test_reconcile_material_change_resets_countdown() {
    let store = Arc::new(MemoryStore::new());
    let mut def = definition("api", 5);
    seed(&store, &[def.clone()]);

    let scheduler = make_scheduler(Arc::clone(&store));
    scheduler.reconcile().await.unwrap();

    // Burn the countdown partway down.
    scheduler.tick().await;
    scheduler.tick().await;
    {
        let entries = scheduler.entries.read().await;
        assert_eq!(entries[&def.id.to_hex()].countdown, 3);
    }

    def.interval = 60;
    seed(&store, &[def.clone()]);
    scheduler.reconcile().await.unwrap();

    let entries = scheduler.entries.read().await;
    let entry = &entries[&def.id.to_hex()];
    assert_eq!(entry.countdown, 60);
    assert_eq!(entry.definition.interval, 60);
}

#[tokio::test]
async fn test_reconcile_silent_change_preserves_countdown() {
    let store = Arc::new(MemoryStore::new());
    let mut def = definition("api", 5);
    seed(&store, &[def.clone()]);

    let scheduler = make_scheduler(Arc::clone(&store));
    scheduler.reconcile().await.unwrap();
    scheduler.tick().await;

    def.headers
        .insert("authorization".to_string(), "token abc".to_string());
    def.expected_body = Some("ok".to_string());
    seed(&store, &[def.clone()]);
    scheduler.reconcile().await.unwrap();

    let entries = scheduler.entries.read().await;
    let entry = &entries[&def.id.to_hex()];
    assert_eq!(entry.countdown, 4);
    assert_eq!(entry.definition.expected_body.as_deref(), Some("ok"));
    assert_eq!(entry.definition.headers.len(), 1);
}

#[tokio::test]
async fn test_reconcile_store_failure_leaves_mirror_unchanged() {
    let store = Arc::new(MemoryStore::new());
    seed(&store, &[definition("api", 5)]);

    let scheduler = make_scheduler(Arc::clone(&store));
    scheduler.reconcile().await.unwrap();

    // A malformed document is skipped, not fatal; a missing one removes.
    store.set_documents(store::DEFINITIONS_COLLECTION, vec![bson::doc! {
        "status": "active",
        "garbage": true,
    }]);
    scheduler.reconcile().await.unwrap();
    assert_eq!(scheduler.active_count().await, 0);
}

#[tokio::test]
async fn test_tick_countdown_invariant() {
    let store = Arc::new(MemoryStore::new());
    seed(&store, &[definition("a", 1), definition("b", 3)]);

    let scheduler = make_scheduler(store);
    scheduler.reconcile().await.unwrap();

    for _ in 0..7 {
        scheduler.tick().await;
        let entries = scheduler.entries.read().await;
        for entry in entries.values() {
            assert!(entry.countdown >= 0);
            assert!(entry.countdown <= entry.definition.interval);
        }
    }
}

#[tokio::test]
async fn test_tick_fires_on_schedule() {
    let store = Arc::new(MemoryStore::new());
    let def = definition("every-three", 3);
    seed(&store, &[def.clone()]);

    let scheduler = make_scheduler(Arc::clone(&store));
    scheduler.reconcile().await.unwrap();

    // Two ticks: not yet due.
    scheduler.tick().await;
    scheduler.tick().await;
    tokio::time::sleep(std::time::Duration::from_millis(100)).await;
    assert!(store
        .documents(&store::check_log_collection("every-three"))
        .is_empty());

    // Third tick fires the probe; the unreachable target logs a transport
    // failure with status 0.
    scheduler.tick().await;
    tokio::time::sleep(std::time::Duration::from_millis(300)).await;

    let logs = store.documents(&store::check_log_collection("every-three"));
    assert_eq!(logs.len(), 1);
    assert_eq!(logs[0].get_i32("statusCode").unwrap(), 0);
    assert!(!logs[0].get_bool("success").unwrap());
    assert!(logs[0].get_str("error").is_ok());

    // Countdown reset after firing.
    let entries = scheduler.entries.read().await;
    assert_eq!(entries[&def.id.to_hex()].countdown, 3);
}
