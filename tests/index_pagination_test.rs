// Cursor pagination and change-notification behavior of the in-memory
// index, exercised through the public API.

use std::sync::Arc;

use parking_lot::Mutex;
use serde_json::json;

use toolscout::index::{ChangeKind, Index, InMemoryIndex};
use toolscout::model::{SchemaValue, Tool, ToolBackend};
use toolscout::{BackendKind, DiscoveryError};

fn tool(name: &str, namespace: &str) -> Tool {
    Tool::new(
        name,
        format!("{name} tool"),
        SchemaValue::new(json!({"type": "object", "properties": {}})),
    )
    .with_namespace(namespace)
}

#[tokio::test]
async fn search_page_partitions_whole_result_set() {
    let idx = InMemoryIndex::default();
    for name in ["alpha", "beta", "gamma", "delta", "epsilon"] {
        idx.register_tool(tool(name, "ns"), ToolBackend::local(name)).unwrap();
    }

    let (page1, cursor1) = idx.search_page("", 2, None).await.unwrap();
    assert_eq!(page1.len(), 2);
    let cursor1 = cursor1.expect("cursor after first page");

    let (page2, cursor2) = idx.search_page("", 2, Some(&cursor1)).await.unwrap();
    assert_eq!(page2.len(), 2);
    let cursor2 = cursor2.expect("cursor after second page");

    let (page3, cursor3) = idx.search_page("", 2, Some(&cursor2)).await.unwrap();
    assert_eq!(page3.len(), 1);
    assert!(cursor3.is_none());

    // The pages partition the id-ordered corpus without overlap.
    let mut all_ids: Vec<String> = page1
        .iter()
        .chain(page2.iter())
        .chain(page3.iter())
        .map(|s| s.id.clone())
        .collect();
    let collected = all_ids.clone();
    all_ids.sort();
    all_ids.dedup();
    assert_eq!(all_ids.len(), 5);
    assert_eq!(collected, all_ids, "pages arrive in id order");
}

#[tokio::test]
async fn write_between_pages_invalidates_cursor() {
    let idx = InMemoryIndex::default();
    for name in ["alpha", "beta", "gamma", "delta", "epsilon"] {
        idx.register_tool(tool(name, "ns"), ToolBackend::local(name)).unwrap();
    }

    let (_, cursor) = idx.search_page("", 2, None).await.unwrap();
    let (_, cursor2) = idx.search_page("", 2, Some(&cursor.unwrap())).await.unwrap();
    let cursor2 = cursor2.expect("cursor after second page");

    idx.register_tool(tool("zeta", "ns"), ToolBackend::local("zeta")).unwrap();

    let err = idx.search_page("", 2, Some(&cursor2)).await.unwrap_err();
    assert!(matches!(err, DiscoveryError::InvalidCursor { .. }));
}

#[tokio::test]
async fn unregister_invalidates_cursor_too() {
    let idx = InMemoryIndex::default();
    idx.register_tool(tool("alpha", "ns"), ToolBackend::local("alpha")).unwrap();
    idx.register_tool(tool("beta", "ns"), ToolBackend::local("beta")).unwrap();

    let (_, cursor) = idx.search_page("", 1, None).await.unwrap();
    let cursor = cursor.unwrap();

    idx.unregister_backend("ns:alpha", BackendKind::Local, "alpha").unwrap();

    let err = idx.search_page("", 1, Some(&cursor)).await.unwrap_err();
    assert!(matches!(err, DiscoveryError::InvalidCursor { .. }));
}

#[tokio::test]
async fn refresh_invalidates_cursor_without_content_change() {
    let idx = InMemoryIndex::default();
    idx.register_tool(tool("alpha", "ns"), ToolBackend::local("alpha")).unwrap();
    idx.register_tool(tool("beta", "ns"), ToolBackend::local("beta")).unwrap();

    let (_, cursor) = idx.search_page("", 1, None).await.unwrap();
    idx.refresh();

    let err = idx.search_page("", 1, Some(&cursor.unwrap())).await.unwrap_err();
    assert!(matches!(err, DiscoveryError::InvalidCursor { .. }));
}

#[test]
fn listener_sees_full_write_history_in_order() {
    let idx = InMemoryIndex::default();
    let events: Arc<Mutex<Vec<(ChangeKind, String, u64)>>> = Arc::new(Mutex::new(Vec::new()));
    let sink = events.clone();
    idx.on_change(Arc::new(move |event| {
        sink.lock().push((event.kind, event.tool_id.clone(), event.version));
    }));

    idx.register_tool(tool("one", "ns"), ToolBackend::mcp("s1")).unwrap();
    idx.register_tool(tool("one", "ns"), ToolBackend::mcp("s2")).unwrap();
    idx.unregister_backend("ns:one", BackendKind::Mcp, "s1").unwrap();
    idx.unregister_backend("ns:one", BackendKind::Mcp, "s2").unwrap();

    let events = events.lock();
    let kinds: Vec<ChangeKind> = events.iter().map(|(k, _, _)| *k).collect();
    assert_eq!(
        kinds,
        vec![
            ChangeKind::Registered,
            ChangeKind::Updated,
            ChangeKind::BackendRemoved,
            ChangeKind::ToolRemoved,
        ]
    );

    // Versions strictly increase in delivery order.
    let versions: Vec<u64> = events.iter().map(|(_, _, v)| *v).collect();
    assert!(versions.windows(2).all(|w| w[0] < w[1]));
}

#[test]
fn listener_can_unsubscribe_itself_during_callback() {
    let idx = Arc::new(InMemoryIndex::default());
    let count = Arc::new(Mutex::new(0usize));

    let id_slot: Arc<Mutex<Option<toolscout::index::ListenerId>>> = Arc::new(Mutex::new(None));
    let sink = count.clone();
    let self_idx = idx.clone();
    let self_slot = id_slot.clone();
    let id = idx.on_change(Arc::new(move |_| {
        *sink.lock() += 1;
        if let Some(id) = self_slot.lock().take() {
            self_idx.unsubscribe(id);
        }
    }));
    *id_slot.lock() = Some(id);

    idx.register_tool(tool("one", "ns"), ToolBackend::local("h1")).unwrap();
    idx.register_tool(tool("two", "ns"), ToolBackend::local("h2")).unwrap();

    // Second registration fires after self-unsubscribe.
    assert_eq!(*count.lock(), 1);
}

#[tokio::test]
async fn namespaces_page_and_search_page_share_cursor_discipline() {
    let idx = InMemoryIndex::default();
    for (name, ns) in [("a", "ns1"), ("b", "ns2"), ("c", "ns3")] {
        idx.register_tool(tool(name, ns), ToolBackend::local(name)).unwrap();
    }

    let (namespaces, cursor) = idx.list_namespaces_page(2, None).unwrap();
    assert_eq!(namespaces, vec!["ns1", "ns2"]);
    let (rest, end) = idx.list_namespaces_page(2, cursor.as_deref()).unwrap();
    assert_eq!(rest, vec!["ns3"]);
    assert!(end.is_none());

    let err = idx.list_namespaces_page(2, Some("garbage!!")).unwrap_err();
    assert!(matches!(err, DiscoveryError::InvalidCursor { .. }));
}
