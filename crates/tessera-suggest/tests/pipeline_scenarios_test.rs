//! End-to-end behavior of the suggestion pipeline over an in-memory store.

use std::sync::Arc;

use tessera_core::{
    ClusterKeyKind, CompletionProvider, Item, ItemFilter, ItemStore, NewBoard, NewItem,
    META_GENERATED_BY,
};
use tessera_db::MemoryStore;
use tessera_inference::mock::{MockProvider, MockReply};
use tessera_suggest::{
    accept_cluster, accept_connection, create_synthesis_item, suggest_clusters,
    suggest_connections, synthesis_sources, BubbleSource, ConnectionCommit, DismissalWindow,
    StarterConfig, StarterGenerator, SuggestConfig, ConnectionSuggester, SynthesisGenerator,
};

fn note(title: &str, body: &str, tags: &[&str]) -> NewItem {
    NewItem {
        title: title.to_string(),
        body: body.to_string(),
        tags: tags.iter().map(|t| t.to_string()).collect(),
        ..Default::default()
    }
}

async fn all_items(store: &MemoryStore) -> Vec<Item> {
    store.fetch_items(ItemFilter::default()).await.unwrap()
}

#[tokio::test]
async fn test_three_of_five_share_a_tag_yields_one_cluster() {
    let store = MemoryStore::new();
    store.create_item(note("Meditations", "marcus aurelius", &["philosophy"])).await.unwrap();
    store.create_item(note("Enchiridion", "epictetus handbook", &["philosophy"])).await.unwrap();
    store.create_item(note("Letters", "seneca correspondence", &["philosophy"])).await.unwrap();
    store.create_item(note("Groceries", "milk eggs", &[])).await.unwrap();
    store.create_item(note("Bike repair", "chain lube", &[])).await.unwrap();

    let unassigned = store.fetch_unassigned_items().await.unwrap();
    let clusters = suggest_clusters(&unassigned);

    assert_eq!(clusters.len(), 1);
    assert_eq!(clusters[0].key, "philosophy");
    assert_eq!(clusters[0].kind, ClusterKeyKind::Tag);
    assert_eq!(clusters[0].member_ids.len(), 3);
}

#[tokio::test]
async fn test_accepting_cluster_keeps_other_memberships() {
    let store = MemoryStore::new();
    let reading = store
        .create_board(NewBoard {
            name: "Reading".to_string(),
            ..Default::default()
        })
        .await
        .unwrap();
    let mut ids = Vec::new();
    for title in ["Meditations", "Enchiridion", "Letters"] {
        ids.push(store.create_item(note(title, "", &["philosophy"])).await.unwrap().id);
    }
    let unassigned = store.fetch_unassigned_items().await.unwrap();
    let suggestion = suggest_clusters(&unassigned).remove(0);

    // One member gets filed elsewhere after the suggestion was computed.
    store.add_items_to_board(reading.id, &ids[..1]).await.unwrap();

    let commit = accept_cluster(&store, &suggestion, NewBoard::default())
        .await
        .unwrap();
    assert_eq!(commit.board.name, "Philosophy");
    assert_eq!(commit.added, 3);

    let first = store.fetch_item(ids[0]).await.unwrap();
    assert!(first.board_ids.contains(&reading.id));
    assert!(first.board_ids.contains(&commit.board.id));
    assert!(store.fetch_unassigned_items().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_accepted_connection_is_never_suggested_again() {
    let store = MemoryStore::new();
    let a = store
        .create_item(note("Raft", "consensus leader election log replication", &[]))
        .await
        .unwrap();
    let b = store
        .create_item(note("Raft again", "consensus leader election log replication", &[]))
        .await
        .unwrap();

    let pool = all_items(&store).await;
    let query = pool.iter().find(|i| i.id == a.id).unwrap();
    let before = suggest_connections(query, &pool, 5);
    assert_eq!(before.len(), 1);
    assert_eq!(before[0].item.id, b.id);

    let commit = accept_connection(&store, a.id, b.id, Some(before[0].reason.as_str()))
        .await
        .unwrap();
    assert!(matches!(commit, ConnectionCommit::Created(_)));

    // Accepting the reverse pair races into the existing edge.
    let again = accept_connection(&store, b.id, a.id, None).await.unwrap();
    assert_eq!(again, ConnectionCommit::AlreadyConnected);

    let pool = all_items(&store).await;
    for item in &pool {
        assert!(suggest_connections(item, &pool, 5).is_empty());
    }
}

#[tokio::test]
async fn test_dismissed_pair_is_hidden_both_ways() {
    let a = Item::new("Raft", "consensus leader election");
    let b = Item::new("Raft two", "consensus leader election");
    let pool = vec![a.clone(), b.clone()];
    let suggester = ConnectionSuggester::new(SuggestConfig::default());

    let mut dismissals = DismissalWindow::default();
    dismissals.dismiss(b.id, a.id);

    assert!(suggester.suggest(&a, &pool, 5, Some(&dismissals)).is_empty());
    assert!(suggester.suggest(&b, &pool, 5, Some(&dismissals)).is_empty());
    assert_eq!(suggester.suggest(&a, &pool, 5, None).len(), 1);
}

#[tokio::test]
async fn test_two_item_synthesis_without_provider_is_local() {
    let store = MemoryStore::new();
    store.create_item(note("Raft", "leader election", &["consensus"])).await.unwrap();
    store.create_item(note("Paxos", "proposers and acceptors", &["consensus"])).await.unwrap();
    let items = all_items(&store).await;

    let generator = SynthesisGenerator::new(None, StarterConfig::default());
    let result = generator.generate(&items, "Consensus").await.unwrap();
    assert!(!result.is_llm_generated);
    assert_eq!(result.source_item_ids.len(), 2);

    let saved = create_synthesis_item(&store, &result, "Consensus synthesis", None)
        .await
        .unwrap();
    assert_eq!(saved.body, result.markdown);
    assert_eq!(saved.metadata.get(META_GENERATED_BY).map(String::as_str), Some("local"));
    assert_eq!(synthesis_sources(&saved), result.source_item_ids);
}

#[tokio::test]
async fn test_synthesis_item_lands_on_board() {
    let store = MemoryStore::new();
    let board = store
        .create_board(NewBoard {
            name: "Summaries".to_string(),
            ..Default::default()
        })
        .await
        .unwrap();
    let items = vec![Item::new("a", "x"), Item::new("b", "y")];
    let provider: Arc<dyn CompletionProvider> =
        Arc::new(MockProvider::new().with_fixed_response("# Both\n\nShort."));
    let result = SynthesisGenerator::new(Some(provider), StarterConfig::default())
        .generate(&items, "")
        .await
        .unwrap();
    assert!(result.is_llm_generated);

    let saved = create_synthesis_item(&store, &result, "", Some(board.id))
        .await
        .unwrap();
    assert_eq!(saved.title, "Synthesis");
    assert!(saved.board_ids.contains(&board.id));
    assert_eq!(saved.metadata.get(META_GENERATED_BY).map(String::as_str), Some("llm"));
}

#[tokio::test(start_paused = true)]
async fn test_refresh_race_keeps_second_result() {
    let slow = r#"[{"prompt": "From the first refresh?", "label": "First"}]"#;
    let fast = r#"[{"prompt": "From the second refresh?", "label": "Second"}]"#;
    let provider = MockProvider::new()
        .with_reply(MockReply::text(slow).after_ms(500))
        .with_reply(MockReply::text(fast).after_ms(10));
    let starters = StarterGenerator::new(Some(Arc::new(provider)), StarterConfig::default());
    let items = vec![Item::new("Journal", "today")];

    let (first, second) = tokio::join!(starters.refresh(&items), starters.refresh(&items));

    assert!(first.generation < second.generation);
    assert!(second.committed);
    assert!(!first.committed);
    let bubbles = starters.bubbles(None, 10).await;
    assert_eq!(bubbles.len(), 1);
    assert_eq!(bubbles[0].label, "Second");
}

#[tokio::test(start_paused = true)]
async fn test_provider_timeout_falls_back_to_single_bubble() {
    let provider = MockProvider::new().with_reply(
        MockReply::text(r#"[{"prompt": "Too late?", "label": "Late"}]"#).after_ms(60_000),
    );
    let config = StarterConfig::default().with_deadline(std::time::Duration::from_secs(1));
    let starters = StarterGenerator::new(Some(Arc::new(provider)), config);

    let outcome = starters.refresh(&[Item::new("Journal", "")]).await;
    assert_eq!(outcome.source, BubbleSource::Fallback);
    assert_eq!(starters.bubbles(None, 10).await.len(), 1);
}

#[tokio::test]
async fn test_bubbles_never_exceed_three() {
    let reply: String = format!(
        "[{}]",
        (0..5)
            .map(|n| format!(r#"{{"prompt": "Question {}?", "label": "L{}"}}"#, n, n))
            .collect::<Vec<_>>()
            .join(",")
    );
    let starters = StarterGenerator::new(
        Some(Arc::new(MockProvider::new().with_fixed_response(reply))),
        StarterConfig::default(),
    );
    starters.refresh(&[Item::new("n", "")]).await;
    assert_eq!(starters.bubbles(None, 10).await.len(), 3);
    assert_eq!(starters.bubbles(None, 2).await.len(), 2);
}
