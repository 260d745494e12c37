//! End-to-end scenarios against real nodes.
//!
//! Each test boots one or more full nodes (store, membership, replication,
//! optional persistence, HTTP server) on ephemeral ports and drives them
//! through the HTTP client, the same way an external caller would. Direct
//! handles to each node's local store let the tests observe replication and
//! forwarding effects without going through routing.

use cachegrid::api;
use cachegrid::cache::memory::LocalCache;
use cachegrid::cache::types::EvictionPolicy;
use cachegrid::client::CacheClient;
use cachegrid::membership::ring::HashRing;
use cachegrid::membership::service::{MembershipService, VIRTUAL_NODES};
use cachegrid::membership::types::NodeId;
use cachegrid::persistence::manager::PersistenceManager;
use cachegrid::replication::coordinator::ReplicationCoordinator;
use serde_json::json;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tempfile::tempdir;
use tokio::sync::watch;

struct TestNode {
    id: NodeId,
    address: String,
    cache: Arc<LocalCache>,
    membership: Arc<MembershipService>,
    persistence: Option<Arc<PersistenceManager>>,
    client: CacheClient,
    // Dropping the sender stops the node's background loops.
    _shutdown: watch::Sender<bool>,
}

async fn spawn_node(name: &str, replicas: usize, persistence_path: Option<PathBuf>) -> TestNode {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    let address = format!("http://127.0.0.1:{port}");

    let id = NodeId(name.to_string());
    let cache = Arc::new(LocalCache::new(EvictionPolicy::Lru, 100));
    let membership = MembershipService::new(id.clone(), address.clone(), Duration::from_secs(1));
    let replication = ReplicationCoordinator::new(cache.clone(), membership.clone(), replicas);

    let persistence = match persistence_path {
        Some(path) => {
            let manager = PersistenceManager::new(cache.clone(), path, Duration::from_secs(60));
            manager.start().await;
            Some(manager)
        }
        None => None,
    };

    let (shutdown, shutdown_rx) = watch::channel(false);
    membership.clone().start(shutdown_rx);

    let app = api::build_router(cache.clone(), membership.clone(), replication);
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    TestNode {
        id,
        client: CacheClient::new(&address),
        address,
        cache,
        membership,
        persistence,
        _shutdown: shutdown,
    }
}

// Boots `n` nodes and registers them with each other so every node starts
// from the same ring view.
async fn spawn_cluster(names: &[&str], replicas: usize) -> Vec<TestNode> {
    let mut nodes = Vec::new();
    for name in names {
        nodes.push(spawn_node(name, replicas, None).await);
    }
    for i in 0..nodes.len() {
        for j in 0..nodes.len() {
            if i != j {
                nodes[i]
                    .membership
                    .register(nodes[j].id.clone(), nodes[j].address.clone());
            }
        }
    }
    nodes
}

// A key whose primary, under the cluster's shared ring view, is `owner`.
fn key_owned_by(names: &[&str], owner: &str) -> String {
    let ring = HashRing::new(VIRTUAL_NODES);
    for name in names {
        ring.add(&NodeId(name.to_string()));
    }
    (0..10_000)
        .map(|i| format!("key-{i}"))
        .find(|key| ring.primary(key).unwrap() == NodeId(owner.to_string()))
        .expect("owner holds part of the keyspace")
}

#[tokio::test]
async fn single_node_ttl_expires_and_empties_the_store() {
    let node = spawn_node("n1", 2, None).await;

    node.client.set("a", json!("1"), 1).await.unwrap();
    assert_eq!(node.client.get("a").await.unwrap(), Some(json!("1")));

    tokio::time::sleep(Duration::from_millis(1_600)).await;
    assert_eq!(node.client.get("a").await.unwrap(), None);
    assert_eq!(node.cache.len(), 0);
}

#[tokio::test]
async fn missing_key_and_missing_parameter_status_codes() {
    let node = spawn_node("n1", 2, None).await;

    assert_eq!(node.client.get("never-set").await.unwrap(), None);

    // A raw request without the key parameter is a client error.
    let resp = reqwest::get(format!("{}/get", node.address)).await.unwrap();
    assert_eq!(resp.status(), reqwest::StatusCode::BAD_REQUEST);

    // Deletes are idempotent and always succeed.
    node.client.delete("never-set").await.unwrap();
}

#[tokio::test]
async fn writes_are_forwarded_to_the_key_owner() {
    let names = ["n1", "n2", "n3"];
    // No replicas: the key must live only where routing put it.
    let nodes = spawn_cluster(&names, 0).await;
    let key = key_owned_by(&names, "n2");
    let value = json!({"payload": 42});

    nodes[0].client.set(&key, value.clone(), 0).await.unwrap();

    // The write landed on the owner, not on the node that accepted it.
    assert_eq!(nodes[1].cache.get(&key), Some(value.clone()));
    assert_eq!(nodes[0].cache.get(&key), None);
    assert_eq!(nodes[2].cache.get(&key), None);

    // A read through a third node is forwarded to the same owner.
    assert_eq!(nodes[2].client.get(&key).await.unwrap(), Some(value));

    // And a forwarded delete removes it cluster-wide.
    nodes[2].client.delete(&key).await.unwrap();
    assert_eq!(nodes[0].client.get(&key).await.unwrap(), None);
    assert_eq!(nodes[1].cache.get(&key), None);
}

#[tokio::test]
async fn owner_writes_replicate_to_secondaries() {
    let names = ["n1", "n2", "n3"];
    let nodes = spawn_cluster(&names, 2).await;
    let key = key_owned_by(&names, "n2");
    let value = json!("replicated-value");

    nodes[1].client.set(&key, value.clone(), 0).await.unwrap();

    // Fan-out is asynchronous; give it a bounded moment.
    tokio::time::sleep(Duration::from_millis(500)).await;

    // With two replicas in a three-node cluster every node holds the key.
    for node in &nodes {
        assert_eq!(
            node.cache.get(&key),
            Some(value.clone()),
            "node {} is missing the replica",
            node.id
        );
    }

    // A delete at the owner retracts the key everywhere.
    nodes[1].client.delete(&key).await.unwrap();
    tokio::time::sleep(Duration::from_millis(500)).await;
    for node in &nodes {
        assert_eq!(node.cache.get(&key), None);
    }
}

#[tokio::test]
async fn snapshot_survives_a_node_generation() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("cache-shared.json");

    let first = spawn_node("p1", 2, Some(path.clone())).await;
    for i in 0..50 {
        first
            .client
            .set(&format!("key-{i}"), json!({"n": i}), 0)
            .await
            .unwrap();
    }
    first.client.set("doomed", json!("bye"), 1).await.unwrap();
    tokio::time::sleep(Duration::from_millis(1_200)).await;

    // Stopping the engine takes the final snapshot.
    first.persistence.as_ref().unwrap().stop().await;

    let second = spawn_node("p2", 2, Some(path)).await;
    assert_eq!(second.cache.len(), 50);
    assert_eq!(second.cache.get("key-0"), Some(json!({"n": 0})));
    assert_eq!(second.cache.get("key-49"), Some(json!({"n": 49})));
    assert_eq!(second.cache.get("doomed"), None);
}

#[tokio::test]
async fn registration_over_http_updates_the_node_list() {
    let node = spawn_node("n1", 2, None).await;

    node.client
        .register("external", "http://127.0.0.1:1")
        .await
        .unwrap();

    let nodes = node.client.nodes().await.unwrap();
    assert_eq!(nodes.len(), 2);
    assert!(nodes.iter().any(|info| info.id == "external"));
    assert!(nodes.iter().any(|info| info.id == "n1"));
}
