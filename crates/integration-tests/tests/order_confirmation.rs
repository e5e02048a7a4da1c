//! Integration tests for reading placed orders back.

#![allow(clippy::unwrap_used)]

use bloom_core::{OrderId, UserId};
use bloom_integration_tests::{Shop, Shopper, money};
use bloom_storefront::db::FailPoint;
use bloom_storefront::services::{CheckoutOutcome, ConfirmationError, ShippingAddress};

async fn place_order(shop: &Shop, shopper: &Shopper) -> CheckoutOutcome {
    let serum = shop.product("SER-001", "24.99").await;
    let mask = shop.product("MSK-001", "27.00").await;
    shop.fill_cart(shopper, &[(serum, 1), (mask, 1)]).await;
    shop.checkout
        .commit(shop.request(shopper).await)
        .await
        .unwrap()
}

#[tokio::test]
async fn test_owner_sees_order_items_and_address() {
    let shop = Shop::new();
    let shopper = shop.shopper(1).await;
    let outcome = place_order(&shop, &shopper).await;

    let confirmation = shop
        .confirmation
        .read(outcome.order_id, Some(shopper.user))
        .await
        .unwrap();

    assert_eq!(confirmation.order.order_number, outcome.order_number);
    assert_eq!(confirmation.order.subtotal, money("51.99"));
    assert_eq!(confirmation.items.len(), 2);
    assert!(
        confirmation
            .items
            .iter()
            .all(|item| item.product_name.is_some())
    );
    assert_eq!(
        confirmation.shipping_address,
        ShippingAddress::Available(shopper.address.clone())
    );
    assert_eq!(
        confirmation.order.billing_address_id,
        Some(shopper.address.id)
    );
}

#[tokio::test]
async fn test_other_shopper_gets_not_found() {
    let shop = Shop::new();
    let alice = shop.shopper(1).await;
    let outcome = place_order(&shop, &alice).await;

    let err = shop
        .confirmation
        .read(outcome.order_id, Some(UserId::new(2)))
        .await
        .unwrap_err();

    assert!(matches!(err, ConfirmationError::NotFound));
}

#[tokio::test]
async fn test_signed_out_read_rejected() {
    let shop = Shop::new();
    let shopper = shop.shopper(1).await;
    let outcome = place_order(&shop, &shopper).await;

    let err = shop
        .confirmation
        .read(outcome.order_id, None)
        .await
        .unwrap_err();
    assert!(matches!(err, ConfirmationError::Unauthenticated));
}

#[tokio::test]
async fn test_unknown_order_not_found() {
    let shop = Shop::new();
    let shopper = shop.shopper(1).await;

    let err = shop
        .confirmation
        .read(OrderId::new(404), Some(shopper.user))
        .await
        .unwrap_err();
    assert!(matches!(err, ConfirmationError::NotFound));
}

#[tokio::test]
async fn test_deleted_address_degrades_to_unavailable() {
    let shop = Shop::new();
    let shopper = shop.shopper(1).await;
    let outcome = place_order(&shop, &shopper).await;
    assert!(shop.store.remove_address(shopper.address.id).await);

    let confirmation = shop
        .confirmation
        .read(outcome.order_id, Some(shopper.user))
        .await
        .unwrap();

    assert_eq!(confirmation.shipping_address, ShippingAddress::Unavailable);
    assert!(confirmation.shipping_address.as_address().is_none());
    assert_eq!(confirmation.items.len(), 2);
}

#[tokio::test]
async fn test_address_lookup_failure_degrades_to_unavailable() {
    let shop = Shop::new();
    let shopper = shop.shopper(1).await;
    let outcome = place_order(&shop, &shopper).await;
    shop.store.fail_on(FailPoint::GetAddress).await;

    let confirmation = shop
        .confirmation
        .read(outcome.order_id, Some(shopper.user))
        .await
        .unwrap();
    assert_eq!(confirmation.shipping_address, ShippingAddress::Unavailable);
}

#[tokio::test]
async fn test_item_lookup_failure_is_an_error() {
    let shop = Shop::new();
    let shopper = shop.shopper(1).await;
    let outcome = place_order(&shop, &shopper).await;
    shop.store.fail_on(FailPoint::GetOrderItems).await;

    let err = shop
        .confirmation
        .read(outcome.order_id, Some(shopper.user))
        .await
        .unwrap_err();
    assert!(matches!(err, ConfirmationError::Repository(_)));
}

#[tokio::test]
async fn test_history_lists_only_own_orders_newest_first() {
    let shop = Shop::new();
    let alice = shop.shopper(1).await;
    let bob = shop.shopper(2).await;
    let first = place_order(&shop, &alice).await;
    let second = place_order(&shop, &alice).await;
    place_order(&shop, &bob).await;

    let history = shop.confirmation.history(Some(alice.user)).await.unwrap();
    let ids: Vec<OrderId> = history.iter().map(|o| o.id).collect();

    assert_eq!(ids, vec![second.order_id, first.order_id]);
    assert!(matches!(
        shop.confirmation.history(None).await,
        Err(ConfirmationError::Unauthenticated)
    ));
}
