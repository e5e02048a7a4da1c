//! In-process store.
//!
//! Implements the same store traits as [`PgCheckoutStore`](super::PgCheckoutStore)
//! over tables held in memory, mirroring the database constraints that the
//! checkout relies on (unique order numbers, unique idempotency keys per
//! owner, cascading item deletes, `ON DELETE SET NULL` address references).
//! Individual operations can be made to fail with [`FailPoint`]s.

use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use bloom_core::{
    AddressId, CartLineId, IdempotencyKey, Money, OrderId, OrderItemId, OrderStatus, ProductId,
    UserId,
};

use super::RepositoryError;
use crate::models::cart::merged_quantity;
use crate::models::{
    Address, AddressInput, CartLine, MAX_LINE_QUANTITY, NewOrder, NewOrderItem, Order,
    OrderItemDetail, Product,
};
use crate::services::checkout::CheckoutStore;
use crate::services::order_admin::OrderAdminStore;

/// Store operation that can be forced to fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailPoint {
    InsertOrder,
    InsertOrderItems,
    DeleteOrder,
    DeleteCartLines,
    GetOrder,
    GetOrderItems,
    GetAddress,
    UpdateStatus,
}

#[derive(Debug, Clone)]
struct StoredCartLine {
    id: CartLineId,
    owner: UserId,
    product_id: ProductId,
    quantity: u32,
}

#[derive(Debug, Clone)]
struct StoredOrderItem {
    id: OrderItemId,
    order_id: OrderId,
    item: NewOrderItem,
}

#[derive(Debug, Default)]
struct Tables {
    products: BTreeMap<ProductId, Product>,
    cart_lines: Vec<StoredCartLine>,
    addresses: BTreeMap<AddressId, Address>,
    orders: BTreeMap<OrderId, Order>,
    order_items: Vec<StoredOrderItem>,
    fail_points: HashSet<FailPoint>,
    last_id: i32,
}

impl Tables {
    const fn next_id(&mut self) -> i32 {
        self.last_id += 1;
        self.last_id
    }

    fn check(&self, point: FailPoint) -> Result<(), RepositoryError> {
        if self.fail_points.contains(&point) {
            return Err(RepositoryError::Unavailable(format!(
                "injected failure at {point:?}"
            )));
        }
        Ok(())
    }
}

/// Shared in-memory tables. Clones see the same data.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    tables: Arc<RwLock<Tables>>,
    calls: Arc<AtomicUsize>,
    writes: Arc<AtomicUsize>,
}

impl MemoryStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn record_call(&self) {
        self.calls.fetch_add(1, Ordering::SeqCst);
    }

    fn record_write(&self) {
        self.writes.fetch_add(1, Ordering::SeqCst);
    }

    /// Number of store trait calls made so far.
    #[must_use]
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Number of successful writes made through the store traits.
    #[must_use]
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    /// Make `point` fail for the rest of the store's life.
    pub async fn fail_on(&self, point: FailPoint) {
        self.tables.write().await.fail_points.insert(point);
    }

    /// Add an active catalog product.
    pub async fn add_product(&self, sku: &str, name: &str, price: Money) -> ProductId {
        let mut tables = self.tables.write().await;
        let id = ProductId::new(tables.next_id());
        tables.products.insert(
            id,
            Product {
                id,
                sku: sku.to_owned(),
                name: name.to_owned(),
                brand: "Bloom".to_owned(),
                category: String::new(),
                price,
                image_url: None,
                is_active: true,
            },
        );
        id
    }

    /// Change a product's live price.
    pub async fn set_product_price(&self, id: ProductId, price: Money) {
        if let Some(product) = self.tables.write().await.products.get_mut(&id) {
            product.price = price;
        }
    }

    /// Save an address. A default address replaces the owner's previous one.
    pub async fn add_address(&self, owner: UserId, input: &AddressInput) -> Address {
        let mut tables = self.tables.write().await;
        if input.is_default {
            for address in tables.addresses.values_mut() {
                if address.user_id == owner {
                    address.is_default = false;
                }
            }
        }
        let id = AddressId::new(tables.next_id());
        let address = Address {
            id,
            user_id: owner,
            address_type: input.address_type,
            label: input.label.clone(),
            street: input.street.clone(),
            city: input.city.clone(),
            state: input.state.clone(),
            postal_code: input.postal_code.clone(),
            country: input.country.clone(),
            is_default: input.is_default,
            created_at: Utc::now(),
        };
        tables.addresses.insert(id, address.clone());
        address
    }

    /// Delete an address, nulling out order references to it.
    pub async fn remove_address(&self, id: AddressId) -> bool {
        let mut tables = self.tables.write().await;
        let removed = tables.addresses.remove(&id).is_some();
        for order in tables.orders.values_mut() {
            if order.shipping_address_id == Some(id) {
                order.shipping_address_id = None;
            }
            if order.billing_address_id == Some(id) {
                order.billing_address_id = None;
            }
        }
        removed
    }

    /// Put a product in an owner's cart, merging with an existing line.
    pub async fn add_cart_line(
        &self,
        owner: UserId,
        product_id: ProductId,
        quantity: u32,
    ) -> CartLineId {
        let mut tables = self.tables.write().await;
        if let Some(line) = tables
            .cart_lines
            .iter_mut()
            .find(|l| l.owner == owner && l.product_id == product_id)
        {
            line.quantity = merged_quantity(line.quantity, quantity);
            return line.id;
        }
        let id = CartLineId::new(tables.next_id());
        tables.cart_lines.push(StoredCartLine {
            id,
            owner,
            product_id,
            quantity: quantity.clamp(1, MAX_LINE_QUANTITY),
        });
        id
    }

    /// An owner's cart with live product prices, newest line first.
    pub async fn cart_lines(&self, owner: UserId) -> Vec<CartLine> {
        let tables = self.tables.read().await;
        tables
            .cart_lines
            .iter()
            .rev()
            .filter(|l| l.owner == owner)
            .filter_map(|l| {
                let product = tables.products.get(&l.product_id)?;
                product.is_active.then(|| CartLine {
                    id: l.id,
                    product_id: l.product_id,
                    quantity: l.quantity,
                    unit_price: product.price,
                    product_name: product.name.clone(),
                    image_url: product.image_url.clone(),
                    brand: Some(product.brand.clone()).filter(|b| !b.is_empty()),
                })
            })
            .collect()
    }

    /// Number of stored orders.
    pub async fn order_count(&self) -> usize {
        self.tables.read().await.orders.len()
    }

    /// Number of stored order items across all orders.
    pub async fn order_item_count(&self) -> usize {
        self.tables.read().await.order_items.len()
    }

    /// An owner's orders, oldest first.
    pub async fn orders_for(&self, owner: UserId) -> Vec<Order> {
        self.tables
            .read()
            .await
            .orders
            .values()
            .filter(|o| o.user_id == owner)
            .cloned()
            .collect()
    }
}

fn newest_first(orders: &mut [Order]) {
    orders.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
}

#[async_trait]
impl CheckoutStore for MemoryStore {
    async fn insert_order(&self, order: &NewOrder) -> Result<OrderId, RepositoryError> {
        self.record_call();
        let mut tables = self.tables.write().await;
        tables.check(FailPoint::InsertOrder)?;

        if tables
            .orders
            .values()
            .any(|o| o.order_number == order.order_number)
        {
            return Err(RepositoryError::Conflict(
                "orders_order_number_uniq".to_owned(),
            ));
        }
        if let Some(key) = &order.idempotency_key
            && tables
                .orders
                .values()
                .any(|o| o.user_id == order.user_id && o.idempotency_key.as_ref() == Some(key))
        {
            return Err(RepositoryError::Conflict(
                "orders_idempotency_key_uniq".to_owned(),
            ));
        }

        let id = OrderId::new(tables.next_id());
        let now = Utc::now();
        tables.orders.insert(
            id,
            Order {
                id,
                user_id: order.user_id,
                order_number: order.order_number.clone(),
                subtotal: order.subtotal,
                shipping_amount: order.shipping_amount,
                tax_amount: order.tax_amount,
                total_amount: order.total_amount,
                status: order.status,
                shipping_address_id: Some(order.shipping_address_id),
                billing_address_id: Some(order.billing_address_id),
                idempotency_key: order.idempotency_key.clone(),
                created_at: now,
                updated_at: now,
            },
        );
        self.record_write();
        Ok(id)
    }

    async fn insert_order_items(
        &self,
        order_id: OrderId,
        items: &[NewOrderItem],
    ) -> Result<(), RepositoryError> {
        self.record_call();
        let mut tables = self.tables.write().await;
        tables.check(FailPoint::InsertOrderItems)?;

        if !tables.orders.contains_key(&order_id) {
            return Err(RepositoryError::NotFound);
        }
        for item in items {
            let id = OrderItemId::new(tables.next_id());
            tables.order_items.push(StoredOrderItem {
                id,
                order_id,
                item: item.clone(),
            });
        }
        self.record_write();
        Ok(())
    }

    async fn delete_order(&self, order_id: OrderId) -> Result<(), RepositoryError> {
        self.record_call();
        let mut tables = self.tables.write().await;
        tables.check(FailPoint::DeleteOrder)?;

        if tables.orders.remove(&order_id).is_none() {
            return Err(RepositoryError::NotFound);
        }
        tables.order_items.retain(|i| i.order_id != order_id);
        self.record_write();
        Ok(())
    }

    async fn delete_cart_lines(&self, owner: UserId) -> Result<(), RepositoryError> {
        self.record_call();
        let mut tables = self.tables.write().await;
        tables.check(FailPoint::DeleteCartLines)?;

        tables.cart_lines.retain(|l| l.owner != owner);
        self.record_write();
        Ok(())
    }

    async fn get_order(&self, id: OrderId, owner: UserId) -> Result<Option<Order>, RepositoryError> {
        self.record_call();
        let tables = self.tables.read().await;
        tables.check(FailPoint::GetOrder)?;

        Ok(tables
            .orders
            .get(&id)
            .filter(|o| o.user_id == owner)
            .cloned())
    }

    async fn get_order_items(
        &self,
        order_id: OrderId,
    ) -> Result<Vec<OrderItemDetail>, RepositoryError> {
        self.record_call();
        let tables = self.tables.read().await;
        tables.check(FailPoint::GetOrderItems)?;

        Ok(tables
            .order_items
            .iter()
            .filter(|stored| stored.order_id == order_id)
            .map(|stored| {
                let product = tables.products.get(&stored.item.product_id);
                OrderItemDetail {
                    id: stored.id,
                    order_id: stored.order_id,
                    product_id: stored.item.product_id,
                    quantity: stored.item.quantity,
                    price_at_purchase: stored.item.price_at_purchase,
                    total_price: stored.item.total_price,
                    product_name: product.map(|p| p.name.clone()),
                    image_url: product.and_then(|p| p.image_url.clone()),
                    brand: product.map(|p| p.brand.clone()),
                }
            })
            .collect())
    }

    async fn get_address(&self, id: AddressId) -> Result<Option<Address>, RepositoryError> {
        self.record_call();
        let tables = self.tables.read().await;
        tables.check(FailPoint::GetAddress)?;

        Ok(tables.addresses.get(&id).cloned())
    }

    async fn find_order_by_idempotency_key(
        &self,
        owner: UserId,
        key: &IdempotencyKey,
        since: DateTime<Utc>,
    ) -> Result<Option<Order>, RepositoryError> {
        self.record_call();
        let tables = self.tables.read().await;
        tables.check(FailPoint::GetOrder)?;

        Ok(tables
            .orders
            .values()
            .find(|o| {
                o.user_id == owner
                    && o.idempotency_key.as_ref() == Some(key)
                    && o.created_at >= since
            })
            .cloned())
    }

    async fn list_orders(&self, owner: UserId) -> Result<Vec<Order>, RepositoryError> {
        self.record_call();
        let tables = self.tables.read().await;
        tables.check(FailPoint::GetOrder)?;

        let mut orders: Vec<Order> = tables
            .orders
            .values()
            .filter(|o| o.user_id == owner)
            .cloned()
            .collect();
        newest_first(&mut orders);
        Ok(orders)
    }
}

#[async_trait]
impl OrderAdminStore for MemoryStore {
    async fn get_order_by_id(&self, id: OrderId) -> Result<Option<Order>, RepositoryError> {
        self.record_call();
        let tables = self.tables.read().await;
        tables.check(FailPoint::GetOrder)?;

        Ok(tables.orders.get(&id).cloned())
    }

    async fn update_status(
        &self,
        id: OrderId,
        from: OrderStatus,
        to: OrderStatus,
    ) -> Result<bool, RepositoryError> {
        self.record_call();
        let mut tables = self.tables.write().await;
        tables.check(FailPoint::UpdateStatus)?;

        match tables.orders.get_mut(&id) {
            Some(order) if order.status == from => {
                order.status = to;
                order.updated_at = Utc::now();
                self.record_write();
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn list_orders_by_status(
        &self,
        status: Option<OrderStatus>,
        limit: i64,
    ) -> Result<Vec<Order>, RepositoryError> {
        self.record_call();
        let tables = self.tables.read().await;
        tables.check(FailPoint::GetOrder)?;

        let mut orders: Vec<Order> = tables
            .orders
            .values()
            .filter(|o| status.is_none_or(|s| o.status == s))
            .cloned()
            .collect();
        newest_first(&mut orders);
        orders.truncate(usize::try_from(limit).unwrap_or(0));
        Ok(orders)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use bloom_core::{AddressType, CartTotals, OrderNumber, PricingPolicy};

    use super::*;
    use crate::services::checkout::PlaceOrderError;

    fn new_order(owner: UserId, suffix: u16, key: Option<&str>) -> NewOrder {
        let totals = CartTotals::compute(
            &[(Money::from_cents(1500), 2_u32)],
            &PricingPolicy::default(),
        );
        NewOrder::pending(
            owner,
            OrderNumber::generate(Utc::now(), suffix),
            &totals,
            AddressId::new(1),
            key.map(|k| IdempotencyKey::parse(k).unwrap()),
        )
    }

    #[tokio::test]
    async fn test_duplicate_order_number_conflicts() {
        let store = MemoryStore::new();
        let order = new_order(UserId::new(1), 3, None);
        store.insert_order(&order).await.unwrap();

        let result = store.insert_order(&order).await;

        assert!(matches!(result, Err(RepositoryError::Conflict(c)) if c == "orders_order_number_uniq"));
    }

    #[tokio::test]
    async fn test_idempotency_key_unique_per_owner() {
        let store = MemoryStore::new();
        store
            .insert_order(&new_order(UserId::new(1), 1, Some("k1")))
            .await
            .unwrap();

        let same_owner = store
            .insert_order(&new_order(UserId::new(1), 2, Some("k1")))
            .await;
        let other_owner = store
            .insert_order(&new_order(UserId::new(2), 3, Some("k1")))
            .await;

        assert!(matches!(same_owner, Err(RepositoryError::Conflict(_))));
        assert!(other_owner.is_ok());
    }

    #[tokio::test]
    async fn test_place_order_compensates_on_item_failure() {
        let store = MemoryStore::new();
        store.fail_on(FailPoint::InsertOrderItems).await;

        let result = store
            .place_order(&new_order(UserId::new(1), 1, None), &[])
            .await;

        assert!(matches!(result, Err(PlaceOrderError::ItemsInsert(_))));
        assert_eq!(store.order_count().await, 0);
    }

    #[tokio::test]
    async fn test_removed_address_is_unlinked_from_orders() {
        let store = MemoryStore::new();
        let owner = UserId::new(1);
        let address = store
            .add_address(
                owner,
                &AddressInput {
                    address_type: AddressType::Home,
                    label: "Home".to_owned(),
                    street: "1 Fern St".to_owned(),
                    city: "Salem".to_owned(),
                    state: "OR".to_owned(),
                    postal_code: "97301".to_owned(),
                    country: "US".to_owned(),
                    is_default: true,
                },
            )
            .await;
        let mut order = new_order(owner, 1, None);
        order.shipping_address_id = address.id;
        order.billing_address_id = address.id;
        let id = store.insert_order(&order).await.unwrap();

        assert!(store.remove_address(address.id).await);

        let stored = store.get_order(id, owner).await.unwrap().unwrap();
        assert_eq!(stored.shipping_address_id, None);
        assert_eq!(stored.billing_address_id, None);
    }

    #[tokio::test]
    async fn test_cart_lines_merge_and_skip_inactive() {
        let store = MemoryStore::new();
        let owner = UserId::new(1);
        let toner = store
            .add_product("TON-1", "Rose Toner", Money::from_cents(1800))
            .await;
        store.add_cart_line(owner, toner, 1).await;
        store.add_cart_line(owner, toner, 2).await;

        let lines = store.cart_lines(owner).await;
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].quantity, 3);

        store.tables.write().await.products.get_mut(&toner).unwrap().is_active = false;
        assert!(store.cart_lines(owner).await.is_empty());
    }

    #[tokio::test]
    async fn test_repeated_adds_stop_at_line_maximum() {
        let store = MemoryStore::new();
        let owner = UserId::new(1);
        let mask = store
            .add_product("MSK-1", "Clay Mask", Money::from_cents(2400))
            .await;
        for _ in 0..3 {
            store.add_cart_line(owner, mask, 40).await;
        }

        let lines = store.cart_lines(owner).await;
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].quantity, MAX_LINE_QUANTITY);
    }
}
