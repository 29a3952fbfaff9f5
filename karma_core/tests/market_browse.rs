//! Market browse tests: only items still on offer are listed, newest first.

use karma_core::db::InMemoryStore;
use karma_core::items::{ItemFilter, ListingManager, NewListing};
use karma_core::trade::TradeManager;
use karma_core::valuation::{Condition, ValuationEngine};
use karma_core::wallet::WalletManager;
use std::sync::Arc;

fn listing(title: &str, category: &str, condition: Condition) -> NewListing {
    NewListing {
        title: title.to_string(),
        description: None,
        category: category.to_string(),
        condition,
        brand: None,
        images: vec![],
        location: None,
    }
}

#[tokio::test]
async fn test_browse_lists_only_available_items_newest_first() {
    let store = InMemoryStore::new();
    let seller = store.add_account("seller").await;
    let buyer = store.add_account("buyer").await;
    let shared = Arc::new(store.clone());
    let listings = ListingManager::new(shared.clone(), ValuationEngine::fixed(0));
    let trades = TradeManager::new(shared.clone());
    WalletManager::new(shared)
        .add(buyer, 10_000, "welcome")
        .await
        .unwrap();

    let sold = listings
        .list_item(seller, listing("Road bike", "sports", Condition::Good))
        .await
        .unwrap();
    let pending = listings
        .list_item(seller, listing("Tennis racket", "sports", Condition::New))
        .await
        .unwrap();
    let removed = listings
        .list_item(seller, listing("Football", "sports", Condition::Fair))
        .await
        .unwrap();
    let older = listings
        .list_item(seller, listing("Yoga mat", "sports", Condition::LikeNew))
        .await
        .unwrap();
    let newer = listings
        .list_item(seller, listing("Running shoes", "shoes", Condition::Good))
        .await
        .unwrap();

    let receipt = trades.request_trade(buyer, sold.id).await.unwrap();
    trades.release_escrow(buyer, receipt.escrow.id).await.unwrap();
    trades.request_trade(buyer, pending.id).await.unwrap();
    listings.remove_item(seller, removed.id).await.unwrap();

    let all = listings.browse(ItemFilter::default(), None).await.unwrap();
    let ids: Vec<_> = all.iter().map(|item| item.id).collect();
    assert_eq!(ids, vec![newer.id, older.id]);

    let sports = ItemFilter {
        category: Some("Sports".to_string()),
        ..ItemFilter::default()
    };
    let sports = listings.browse(sports, None).await.unwrap();
    assert_eq!(sports.len(), 1);
    assert_eq!(sports[0].id, older.id);

    // Refunded items return to the market
    let again = trades.request_trade(buyer, older.id).await.unwrap();
    assert_eq!(
        listings.browse(ItemFilter::default(), None).await.unwrap().len(),
        1
    );
    trades.refund_escrow(buyer, again.escrow.id).await.unwrap();
    let search = ItemFilter {
        search: Some("YOGA".to_string()),
        ..ItemFilter::default()
    };
    let found = listings.browse(search, None).await.unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].id, older.id);
}
