//! Cross-module checks for the tokenizer and the Jaccard scorer as the
//! suggesters use them: scoring whole items rather than raw token lists.

use tessera_core::{jaccard, tokenize, Item, TokenSet};

#[test]
fn test_item_texts_score_on_shared_vocabulary() {
    let a = Item::new("Raft consensus", "Leader election and the replicated log");
    let b = Item::new("Paxos consensus", "Proposers, acceptors and the replicated log");
    let c = Item::new("Sourdough starter", "Feeding schedule for a rye levain");

    let (ta, tb, tc) = (tokenize(&a.text()), tokenize(&b.text()), tokenize(&c.text()));

    let ab = jaccard(&ta, &tb);
    let ac = jaccard(&ta, &tc);
    assert!(ab > 0.1, "related notes should clear the floor, got {ab}");
    assert_eq!(ac, 0.0);
}

#[test]
fn test_scenario_token_sets() {
    let a: TokenSet = ["raft", "consensus", "log"].into_iter().collect();
    let b: TokenSet = ["raft", "paxos", "log"].into_iter().collect();
    assert_eq!(jaccard(&a, &b), 2.0 / 4.0);
    assert_eq!(jaccard(&b, &a), 2.0 / 4.0);
}

#[test]
fn test_title_only_items_tokenize() {
    let item = Item::new("The Quick, quick FOX jumps.", "");
    let tokens = tokenize(&item.text());
    let expected: TokenSet = ["quick", "fox", "jumps"].into_iter().collect();
    assert_eq!(tokens, expected);
}
