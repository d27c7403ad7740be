use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use chrono::TimeDelta;
use rust_decimal::Decimal;
use tracing::{debug, error, info, instrument, warn};

use cedar_tech_core::{CustomerInfo, PaymentMethod, Product, ProductId, Variant, VariantId};

use crate::cart::{Cart, LineItem};
use crate::clock::Clock;
use crate::error::{CartError, Result, StockShortage, StoreError, TotalsOverflow};
use crate::order::{OrderConfirmation, OrderSnapshot};
use crate::shipping::compute_shipping;
use crate::store::{KeyValueStoreBox, OrderStoreBox, ProductCatalogRef};

/// Local storage key holding the serialized cart.
pub const CART_STORAGE_KEY: &str = "cedar_cart";

/// Minutes an untouched cart survives between visits.
pub const DEFAULT_CART_TTL_MINUTES: i64 = 30;

/// Result of a cart mutation.
#[must_use]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CartChange {
    /// The cart changed and was saved.
    Updated,
    /// Nothing to do (non-positive quantity, unknown line).
    Unchanged,
    /// Refused because of stock. The cart is untouched.
    Declined(StockShortage),
    /// Refused because the new totals would not fit in a `Decimal`. The cart
    /// is untouched.
    Overflow,
}

impl CartChange {
    #[must_use]
    pub const fn is_updated(&self) -> bool {
        matches!(self, Self::Updated)
    }

    /// Convert into a `Result` so a declined change can be propagated with `?`.
    ///
    /// # Errors
    ///
    /// Returns `CartError::InsufficientStock` for a declined change and
    /// `CartError::TotalsOverflow` for an overflowing one.
    pub fn into_result(self) -> Result<bool> {
        match self {
            Self::Updated => Ok(true),
            Self::Unchanged => Ok(false),
            Self::Declined(shortage) => Err(shortage.into()),
            Self::Overflow => Err(TotalsOverflow.into()),
        }
    }
}

/// What `load` found in local storage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOutcome {
    /// Nothing stored; started with an empty cart.
    Fresh,
    /// A recent cart was restored.
    Restored { items: usize },
    /// The stored cart was too old and has been deleted.
    Expired,
    /// The stored cart could not be parsed and has been deleted.
    Corrupt,
    /// Local storage could not be read; started empty without touching it.
    Unreadable,
    /// `load` had already run; nothing changed.
    AlreadyLoaded,
}

/// Shared "order submission in flight" flag.
///
/// Clone it before calling [`CartEngine::create_order`] to disable the
/// checkout button while the write is outstanding.
#[derive(Debug, Clone, Default)]
pub struct LoadingFlag(Arc<AtomicBool>);

impl LoadingFlag {
    #[must_use]
    pub fn is_loading(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    fn begin(&self) -> LoadingGuard {
        self.0.store(true, Ordering::SeqCst);
        LoadingGuard(self.clone())
    }
}

/// Clears the loading flag when dropped, even if the submission future is.
struct LoadingGuard(LoadingFlag);

impl Drop for LoadingGuard {
    fn drop(&mut self) {
        self.0.0.store(false, Ordering::SeqCst);
    }
}

/// Owns the shopper's cart and everything that changes it.
///
/// The engine starts out not ready: mutations are applied in memory but not
/// saved until [`CartEngine::load`] has restored whatever was stored, so an
/// early save can never overwrite the previous visit's cart.
pub struct CartEngine {
    cart: Cart,
    ready: bool,
    ttl: TimeDelta,
    loading: LoadingFlag,
    local_store: KeyValueStoreBox,
    order_store: OrderStoreBox,
    catalog: ProductCatalogRef,
    clock: Arc<dyn Clock>,
}

impl CartEngine {
    /// Creates a new `CartEngine` with an empty, unsaved cart.
    ///
    /// # Arguments
    ///
    /// * `local_store` - Durable storage on the shopper's device.
    /// * `order_store` - Collection receiving submitted orders.
    /// * `catalog` - Product lookup used for stock checks.
    /// * `clock` - Time source for timestamps and expiry.
    pub fn new(
        local_store: KeyValueStoreBox,
        order_store: OrderStoreBox,
        catalog: ProductCatalogRef,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            cart: Cart::empty(clock.now()),
            ready: false,
            ttl: TimeDelta::minutes(DEFAULT_CART_TTL_MINUTES),
            loading: LoadingFlag::default(),
            local_store,
            order_store,
            catalog,
            clock,
        }
    }

    /// Override how long a stored cart stays valid.
    #[must_use]
    pub fn with_cart_ttl(mut self, ttl: TimeDelta) -> Self {
        self.ttl = ttl;
        self
    }

    #[must_use]
    pub const fn cart(&self) -> &Cart {
        &self.cart
    }

    /// Whether `load` has run and changes are being saved.
    #[must_use]
    pub const fn is_ready(&self) -> bool {
        self.ready
    }

    /// Whether an order submission is in flight.
    #[must_use]
    pub fn is_loading(&self) -> bool {
        self.loading.is_loading()
    }

    /// Handle for observing [`CartEngine::is_loading`] from elsewhere.
    #[must_use]
    pub fn loading_flag(&self) -> LoadingFlag {
        self.loading.clone()
    }

    #[must_use]
    pub const fn cart_ttl(&self) -> TimeDelta {
        self.ttl
    }

    /// Restore the cart from local storage.
    ///
    /// A cart younger than the TTL is restored with its totals recomputed.
    /// An expired or unparsable one is deleted and replaced by an empty cart.
    /// Only the first call has any effect.
    #[instrument(skip(self))]
    pub fn load(&mut self) -> LoadOutcome {
        if self.ready {
            debug!("cart already loaded");
            return LoadOutcome::AlreadyLoaded;
        }

        let now = self.clock.now();
        let outcome = match self.read_stored_cart() {
            Ok(None) => {
                self.cart = Cart::empty(now);
                LoadOutcome::Fresh
            }
            Ok(Some(stored)) if stored.is_expired(now, self.ttl) => {
                info!(
                    last_touched_at = %stored.last_touched_at(),
                    "stored cart expired, starting fresh"
                );
                self.discard_stored_cart();
                self.cart = Cart::empty(now);
                LoadOutcome::Expired
            }
            Ok(Some(mut stored)) => {
                if let Err(e) = stored.normalize() {
                    warn!(error = %e, "discarding stored cart with untotalable amounts");
                    self.discard_stored_cart();
                    self.cart = Cart::empty(now);
                    LoadOutcome::Corrupt
                } else {
                    let items = stored.items().len();
                    debug!(items, "restored cart");
                    self.cart = stored;
                    LoadOutcome::Restored { items }
                }
            }
            Err(StoreError::Corrupt(reason)) => {
                warn!(%reason, "discarding unreadable stored cart");
                self.discard_stored_cart();
                self.cart = Cart::empty(now);
                LoadOutcome::Corrupt
            }
            Err(e) => {
                warn!(error = %e, "local storage unavailable, starting with an empty cart");
                self.cart = Cart::empty(now);
                LoadOutcome::Unreadable
            }
        };

        self.ready = true;
        outcome
    }

    /// Add `quantity` units of `product` (optionally a specific `variant`).
    ///
    /// Merges into an existing line with the same identity. A non-positive
    /// quantity does nothing. Declined if the resulting line quantity would
    /// exceed the product's stock, and refused with `CartChange::Overflow` if
    /// the new totals would not fit.
    #[instrument(
        skip(self, product, variant),
        fields(product_id = %product.id, variant_id = ?variant.map(|v| &v.id))
    )]
    pub fn add_item(
        &mut self,
        product: &Product,
        quantity: i64,
        variant: Option<&Variant>,
    ) -> CartChange {
        if quantity <= 0 {
            return CartChange::Unchanged;
        }

        let variant_id = variant.map(|v| &v.id);
        let existing = self
            .cart
            .line(&product.id, variant_id)
            .map_or(0, |line| u64::from(line.quantity));
        let requested = existing.saturating_add(quantity.unsigned_abs());

        let new_quantity = match u32::try_from(requested) {
            Ok(q) if q <= product.stock => q,
            _ => {
                debug!(requested, available = product.stock, "add declined");
                return CartChange::Declined(StockShortage {
                    product_id: product.id.clone(),
                    product_title: product.title.clone(),
                    requested,
                    available: product.stock,
                });
            }
        };

        let mut next = self.cart.clone();
        match next.line_mut(&product.id, variant_id) {
            Some(line) => line.set_quantity(new_quantity),
            None => match LineItem::new(product, variant, new_quantity) {
                Ok(item) => next.push(item),
                Err(e) => {
                    warn!(error = %e, "add declined");
                    return CartChange::Overflow;
                }
            },
        }
        self.commit(next)
    }

    /// Remove the line with the given identity.
    #[instrument(skip(self))]
    pub fn remove_item(&mut self, product_id: &ProductId, variant_id: Option<&VariantId>) -> CartChange {
        let mut next = self.cart.clone();
        if !next.remove(product_id, variant_id) {
            return CartChange::Unchanged;
        }
        self.commit(next)
    }

    /// Set a line's quantity. Zero or less removes the line.
    ///
    /// Stock is checked against the catalog's current record. A product that
    /// is no longer in the catalog is not stock-limited.
    #[instrument(skip(self))]
    pub fn update_quantity(
        &mut self,
        product_id: &ProductId,
        new_quantity: i64,
        variant_id: Option<&VariantId>,
    ) -> CartChange {
        if new_quantity <= 0 {
            return self.remove_item(product_id, variant_id);
        }

        let Some(title) = self
            .cart
            .line(product_id, variant_id)
            .map(|line| line.product_title.clone())
        else {
            return CartChange::Unchanged;
        };

        let product = self.catalog.product(product_id);
        if product.is_none() {
            warn!("product missing from catalog, stock not enforced");
        }
        let available = product.map_or(u32::MAX, |p| p.stock);
        let requested = new_quantity.unsigned_abs();

        let quantity = match u32::try_from(requested) {
            Ok(q) if q <= available => q,
            _ => {
                debug!(requested, available, "update declined");
                return CartChange::Declined(StockShortage {
                    product_id: product_id.clone(),
                    product_title: title,
                    requested,
                    available,
                });
            }
        };

        let mut next = self.cart.clone();
        if let Some(line) = next.line_mut(product_id, variant_id) {
            line.set_quantity(quantity);
        }
        self.commit(next)
    }

    /// Empty the cart.
    #[instrument(skip(self))]
    pub fn clear(&mut self) -> CartChange {
        self.cart = Cart::empty(self.clock.now());
        self.persist();
        CartChange::Updated
    }

    /// Quote shipping to `city` while browsing and fold it into the total.
    ///
    /// The quote is dropped again by the next item change.
    #[instrument(skip(self))]
    pub fn recalculate_shipping(&mut self, city: &str) -> Decimal {
        let fee = compute_shipping(self.cart.subtotal(), city);
        if let Err(e) = self.cart.set_shipping_fee(fee) {
            warn!(error = %e, "shipping quote not applied");
            return self.cart.shipping_fee();
        }
        self.persist();
        fee
    }

    /// Submit the cart as an order.
    ///
    /// Shipping is recomputed from `customer.city`. On success the cart is
    /// cleared; on failure it is left exactly as it was so the shopper can
    /// retry.
    ///
    /// # Errors
    ///
    /// Returns `CartError::EmptyCart` without touching the order store if the
    /// cart has no items, `CartError::TotalsOverflow` if the order total does
    /// not fit, and `CartError::OrderPersistence` if the insert fails.
    #[instrument(skip(self, customer), fields(city = %customer.city))]
    pub async fn create_order(
        &mut self,
        customer: CustomerInfo,
        payment_method: PaymentMethod,
    ) -> Result<OrderConfirmation> {
        if self.cart.is_empty() {
            return Err(CartError::EmptyCart);
        }

        let snapshot = OrderSnapshot::new(&self.cart, customer, payment_method, self.clock.now())?;
        let order_number = snapshot.order_number.clone();
        let total = snapshot.total;
        let estimated_delivery_date = snapshot.estimated_delivery_date;

        let inserted = {
            let _guard = self.loading.begin();
            self.order_store.insert(snapshot).await
        };
        let order_id = inserted.map_err(|e| {
            error!(error = %e, %order_number, "failed to save order");
            CartError::OrderPersistence(e)
        })?;

        info!(%order_id, %order_number, %total, "order placed");
        let _ = self.clear();

        Ok(OrderConfirmation {
            order_id,
            order_number,
            total,
            estimated_delivery_date,
        })
    }

    /// Recompute totals of `next` and, if they fit, make it the cart and save.
    fn commit(&mut self, mut next: Cart) -> CartChange {
        if let Err(e) = next.recalculate() {
            warn!(error = %e, "change declined");
            return CartChange::Overflow;
        }
        self.cart = next;
        self.persist();
        CartChange::Updated
    }

    /// Stamp the cart and write it to local storage.
    ///
    /// Failures are logged, never returned: the in-memory cart stays
    /// authoritative and the next change overwrites the stored copy anyway.
    fn persist(&mut self) {
        self.cart.touch(self.clock.now());
        if !self.ready {
            debug!("cart not loaded yet, skipping save");
            return;
        }

        let saved = serde_json::to_string(&self.cart)
            .map_err(StoreError::from)
            .and_then(|json| self.local_store.set(CART_STORAGE_KEY, &json));
        if let Err(e) = saved {
            warn!(error = %e, "failed to save cart");
        }
    }

    fn read_stored_cart(&self) -> std::result::Result<Option<Cart>, StoreError> {
        let Some(raw) = self.local_store.get(CART_STORAGE_KEY)? else {
            return Ok(None);
        };
        serde_json::from_str(&raw)
            .map(Some)
            .map_err(|e| StoreError::Corrupt(e.to_string()))
    }

    fn discard_stored_cart(&self) {
        if let Err(e) = self.local_store.remove(CART_STORAGE_KEY) {
            warn!(error = %e, "failed to delete stored cart");
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::store::{
        KeyValueStore, MemoryCatalog, MemoryKeyValueStore, MemoryOrderStore, OrderStore,
    };
    use async_trait::async_trait;
    use cedar_tech_core::OrderId;
    use chrono::{DateTime, Utc};
    use rust_decimal_macros::dec;
    use tokio::sync::Notify;

    struct Fixture {
        engine: CartEngine,
        local: MemoryKeyValueStore,
        orders: MemoryOrderStore,
        catalog: MemoryCatalog,
        clock: ManualClock,
    }

    fn start() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2026-03-01T10:00:00Z")
            .unwrap()
            .with_timezone(&Utc)
    }

    fn laptop() -> Product {
        Product {
            id: ProductId::new("laptop"),
            slug: "thinkpad-t14".to_string(),
            title: "ThinkPad T14".to_string(),
            images: vec!["t14.jpg".to_string()],
            thumbnail: None,
            price: dec!(40),
            sale_price: None,
            stock: 5,
            variants: vec![Variant {
                id: VariantId::new("32gb"),
                name: "32GB".to_string(),
                price: dec!(55),
            }],
        }
    }

    fn mouse() -> Product {
        Product {
            id: ProductId::new("mouse"),
            slug: "mx-mouse".to_string(),
            title: "MX Mouse".to_string(),
            images: Vec::new(),
            thumbnail: Some("mouse.png".to_string()),
            price: dec!(12.50),
            sale_price: Some(dec!(9.99)),
            stock: 2,
            variants: Vec::new(),
        }
    }

    /// Priced so that two units no longer fit in a `Decimal`.
    fn bulk_order() -> Product {
        Product {
            id: ProductId::new("bulk"),
            slug: "bulk".to_string(),
            title: "Datacenter Bulk Order".to_string(),
            images: Vec::new(),
            thumbnail: None,
            price: "50000000000000000000000000000".parse().unwrap(),
            sale_price: None,
            stock: 10,
            variants: Vec::new(),
        }
    }

    fn customer(city: &str) -> CustomerInfo {
        CustomerInfo {
            full_name: "Maya Khoury".to_string(),
            email: "maya@example.com".to_string(),
            phone: "03 111 222".to_string(),
            address: "Rue Gouraud".to_string(),
            city: city.to_string(),
            notes: None,
        }
    }

    fn fixture() -> Fixture {
        let local = MemoryKeyValueStore::new();
        let orders = MemoryOrderStore::new();
        let catalog = MemoryCatalog::with_products([laptop(), mouse()]);
        let clock = ManualClock::new(start());
        let engine = CartEngine::new(
            Box::new(local.clone()),
            Box::new(orders.clone()),
            Arc::new(catalog.clone()),
            Arc::new(clock.clone()),
        );
        Fixture {
            engine,
            local,
            orders,
            catalog,
            clock,
        }
    }

    /// Order store whose insert waits until the test releases it.
    #[derive(Default)]
    struct GatedOrderStore {
        entered: Arc<Notify>,
        release: Arc<Notify>,
    }

    #[async_trait]
    impl OrderStore for GatedOrderStore {
        async fn insert(&self, _order: OrderSnapshot) -> std::result::Result<OrderId, StoreError> {
            self.entered.notify_one();
            self.release.notified().await;
            Ok(OrderId::new("gated-order"))
        }
    }

    fn gated_engine() -> (CartEngine, Arc<Notify>, Arc<Notify>) {
        let store = GatedOrderStore::default();
        let (entered, release) = (store.entered.clone(), store.release.clone());
        let mut engine = CartEngine::new(
            Box::new(MemoryKeyValueStore::new()),
            Box::new(store),
            Arc::new(MemoryCatalog::with_products([laptop()])),
            Arc::new(ManualClock::new(start())),
        );
        assert_eq!(engine.load(), LoadOutcome::Fresh);
        (engine, entered, release)
    }

    fn loaded() -> Fixture {
        let mut f = fixture();
        assert_eq!(f.engine.load(), LoadOutcome::Fresh);
        f
    }

    fn stored_cart(local: &MemoryKeyValueStore) -> Option<Cart> {
        local
            .get(CART_STORAGE_KEY)
            .unwrap()
            .map(|raw| serde_json::from_str(&raw).unwrap())
    }

    fn assert_totals_consistent(cart: &Cart) {
        let sum: Decimal = cart.items().iter().map(|i| i.total_price).sum();
        assert_eq!(cart.subtotal(), sum);
        assert_eq!(cart.total(), cart.subtotal() + cart.shipping_fee());
        for item in cart.items() {
            assert_eq!(item.total_price, item.unit_price * Decimal::from(item.quantity));
        }
    }

    #[test]
    fn test_add_merges_same_identity() {
        let mut f = loaded();

        assert!(f.engine.add_item(&laptop(), 2, None).is_updated());
        assert!(f.engine.add_item(&laptop(), 3, None).is_updated());

        let cart = f.engine.cart();
        assert_eq!(cart.items().len(), 1);
        assert_eq!(cart.items()[0].quantity, 5);
        assert_eq!(cart.subtotal(), dec!(200));
        assert_totals_consistent(cart);
    }

    #[test]
    fn test_variants_are_separate_lines() {
        let mut f = loaded();
        let product = laptop();
        let variant = product.variants[0].clone();

        assert!(f.engine.add_item(&product, 1, None).is_updated());
        assert!(f.engine.add_item(&product, 1, Some(&variant)).is_updated());

        let cart = f.engine.cart();
        assert_eq!(cart.items().len(), 2);
        assert_eq!(cart.items()[1].unit_price, dec!(55));
        assert_eq!(cart.subtotal(), dec!(95));
    }

    #[test]
    fn test_sale_price_used_without_variant() {
        let mut f = loaded();
        assert!(f.engine.add_item(&mouse(), 2, None).is_updated());
        assert_eq!(f.engine.cart().subtotal(), dec!(19.98));
        assert_eq!(f.engine.cart().items()[0].unit_price_display, "$9.99");
    }

    #[test]
    fn test_non_positive_add_is_noop() {
        let mut f = loaded();
        assert_eq!(f.engine.add_item(&laptop(), 0, None), CartChange::Unchanged);
        assert_eq!(f.engine.add_item(&laptop(), -3, None), CartChange::Unchanged);
        assert!(f.engine.cart().is_empty());
        assert!(stored_cart(&f.local).is_none());
    }

    #[test]
    fn test_add_over_stock_declined_and_unchanged() {
        let mut f = loaded();
        assert!(f.engine.add_item(&laptop(), 4, None).is_updated());
        let before = f.engine.cart().clone();
        f.clock.advance(TimeDelta::minutes(1));

        let change = f.engine.add_item(&laptop(), 2, None);

        let CartChange::Declined(shortage) = change else {
            panic!("expected a declined change");
        };
        assert_eq!(shortage.available, 5);
        assert_eq!(shortage.requested, 6);
        assert_eq!(shortage.to_string(), "Only 5 available");
        assert_eq!(f.engine.cart(), &before);
        assert_eq!(stored_cart(&f.local).unwrap(), before);
    }

    #[test]
    fn test_new_line_over_stock_declined() {
        let mut f = loaded();
        let change = f.engine.add_item(&mouse(), 3, None);
        assert!(matches!(change, CartChange::Declined(_)));
        assert!(f.engine.cart().is_empty());
        assert!(matches!(
            change.into_result(),
            Err(CartError::InsufficientStock(_))
        ));
    }

    #[test]
    fn test_add_overflowing_totals_refused() {
        let mut f = loaded();
        assert!(f.engine.add_item(&bulk_order(), 1, None).is_updated());
        let before = f.engine.cart().clone();

        assert_eq!(f.engine.add_item(&bulk_order(), 1, None), CartChange::Overflow);
        assert_eq!(f.engine.cart(), &before);
        assert_eq!(stored_cart(&f.local).unwrap(), before);

        let mut twin = bulk_order();
        twin.id = ProductId::new("bulk-2");
        assert_eq!(f.engine.add_item(&twin, 1, None), CartChange::Overflow);
        assert_eq!(f.engine.cart(), &before);

        assert!(matches!(
            f.engine.add_item(&bulk_order(), 1, None).into_result(),
            Err(CartError::TotalsOverflow(_))
        ));
    }

    #[test]
    fn test_new_line_overflowing_totals_refused() {
        let mut f = loaded();
        assert_eq!(f.engine.add_item(&bulk_order(), 2, None), CartChange::Overflow);
        assert!(f.engine.cart().is_empty());
        assert!(stored_cart(&f.local).is_none());
    }

    #[test]
    fn test_update_overflowing_totals_refused() {
        let mut f = loaded();
        f.catalog.upsert(bulk_order());
        let _ = f.engine.add_item(&bulk_order(), 1, None);
        let before = f.engine.cart().clone();

        let change = f
            .engine
            .update_quantity(&ProductId::new("bulk"), 2, None);

        assert_eq!(change, CartChange::Overflow);
        assert_eq!(f.engine.cart(), &before);
        assert_eq!(stored_cart(&f.local).unwrap(), before);
    }

    #[test]
    fn test_remove_item() {
        let mut f = loaded();
        let _ = f.engine.add_item(&laptop(), 1, None);
        let _ = f.engine.add_item(&mouse(), 1, None);

        assert!(f.engine.remove_item(&ProductId::new("laptop"), None).is_updated());
        assert_eq!(
            f.engine.remove_item(&ProductId::new("laptop"), None),
            CartChange::Unchanged
        );

        let cart = f.engine.cart();
        assert_eq!(cart.items().len(), 1);
        assert_eq!(cart.subtotal(), dec!(9.99));
        assert_eq!(stored_cart(&f.local).unwrap(), *cart);
    }

    #[test]
    fn test_update_to_zero_equals_remove() {
        let mut a = loaded();
        let mut b = loaded();
        for f in [&mut a, &mut b] {
            let _ = f.engine.add_item(&laptop(), 2, None);
            let _ = f.engine.add_item(&mouse(), 1, None);
        }

        assert!(a.engine.update_quantity(&ProductId::new("laptop"), 0, None).is_updated());
        assert!(b.engine.remove_item(&ProductId::new("laptop"), None).is_updated());

        assert_eq!(a.engine.cart(), b.engine.cart());
    }

    #[test]
    fn test_update_checks_current_catalog_stock() {
        let mut f = loaded();
        let _ = f.engine.add_item(&laptop(), 1, None);

        assert!(f.engine.update_quantity(&ProductId::new("laptop"), 5, None).is_updated());
        assert_eq!(f.engine.cart().subtotal(), dec!(200));

        let mut restocked = laptop();
        restocked.stock = 3;
        f.catalog.upsert(restocked);

        let change = f.engine.update_quantity(&ProductId::new("laptop"), 4, None);
        assert!(matches!(change, CartChange::Declined(ref s) if s.available == 3));
        assert_eq!(f.engine.cart().items()[0].quantity, 5);
    }

    #[test]
    fn test_update_unknown_line_is_noop() {
        let mut f = loaded();
        assert_eq!(
            f.engine.update_quantity(&ProductId::new("laptop"), 2, None),
            CartChange::Unchanged
        );
    }

    #[test]
    fn test_update_product_missing_from_catalog_not_limited() {
        let mut f = loaded();
        let discontinued = Product {
            id: ProductId::new("legacy"),
            stock: 1,
            ..mouse()
        };
        let _ = f.engine.add_item(&discontinued, 1, None);

        assert!(f.engine.update_quantity(&ProductId::new("legacy"), 4, None).is_updated());
        assert_eq!(f.engine.cart().item_count(), 4);
    }

    #[test]
    fn test_subtotal_invariant_over_sequence() {
        let mut f = loaded();
        let product = laptop();
        let variant = product.variants[0].clone();
        let laptop_id = ProductId::new("laptop");
        let mouse_id = ProductId::new("mouse");

        let _ = f.engine.add_item(&product, 1, None);
        assert_totals_consistent(f.engine.cart());
        let _ = f.engine.add_item(&mouse(), 2, None);
        assert_totals_consistent(f.engine.cart());
        let _ = f.engine.add_item(&product, 2, Some(&variant));
        assert_totals_consistent(f.engine.cart());
        let _ = f.engine.update_quantity(&laptop_id, 4, Some(&variant.id));
        assert_totals_consistent(f.engine.cart());
        let _ = f.engine.update_quantity(&mouse_id, 9, None);
        assert_totals_consistent(f.engine.cart());
        let _ = f.engine.remove_item(&laptop_id, None);
        assert_totals_consistent(f.engine.cart());

        assert_eq!(f.engine.cart().subtotal(), dec!(239.98));
    }

    #[test]
    fn test_mutations_before_load_are_not_saved() {
        let mut f = fixture();
        let _ = f.engine.add_item(&laptop(), 1, None);
        assert!(stored_cart(&f.local).is_none());
        assert!(!f.engine.is_ready());

        f.engine.load();
        let _ = f.engine.add_item(&laptop(), 1, None);
        assert!(stored_cart(&f.local).is_some());
    }

    #[test]
    fn test_load_restores_recent_cart() {
        let mut first = loaded();
        let _ = first.engine.add_item(&laptop(), 2, None);
        first.clock.advance(TimeDelta::minutes(29));

        let mut second = CartEngine::new(
            Box::new(first.local.clone()),
            Box::new(MemoryOrderStore::new()),
            Arc::new(first.catalog.clone()),
            Arc::new(first.clock.clone()),
        );
        assert_eq!(second.load(), LoadOutcome::Restored { items: 1 });
        assert_eq!(second.cart().subtotal(), dec!(80));
        assert_eq!(second.load(), LoadOutcome::AlreadyLoaded);
    }

    #[test]
    fn test_load_discards_expired_cart() {
        let mut first = loaded();
        let _ = first.engine.add_item(&laptop(), 2, None);
        first.clock.advance(TimeDelta::minutes(31));

        let mut second = CartEngine::new(
            Box::new(first.local.clone()),
            Box::new(MemoryOrderStore::new()),
            Arc::new(first.catalog.clone()),
            Arc::new(first.clock.clone()),
        );
        assert_eq!(second.load(), LoadOutcome::Expired);
        assert!(second.cart().is_empty());
        assert_eq!(second.cart().last_touched_at(), start() + TimeDelta::minutes(31));
        assert!(stored_cart(&first.local).is_none());
    }

    #[test]
    fn test_custom_ttl() {
        let mut first = loaded();
        let _ = first.engine.add_item(&laptop(), 1, None);
        first.clock.advance(TimeDelta::minutes(10));

        let mut second = CartEngine::new(
            Box::new(first.local.clone()),
            Box::new(MemoryOrderStore::new()),
            Arc::new(first.catalog.clone()),
            Arc::new(first.clock.clone()),
        )
        .with_cart_ttl(TimeDelta::minutes(5));
        assert_eq!(second.load(), LoadOutcome::Expired);
    }

    #[test]
    fn test_load_discards_corrupt_cart() {
        let mut f = fixture();
        f.local.set(CART_STORAGE_KEY, "{\"items\": [oops").unwrap();

        assert_eq!(f.engine.load(), LoadOutcome::Corrupt);
        assert!(f.engine.cart().is_empty());
        assert!(f.local.get(CART_STORAGE_KEY).unwrap().is_none());
    }

    #[test]
    fn test_load_discards_cart_that_cannot_be_totalled() {
        let mut f = fixture();
        let raw = format!(
            r#"{{"items":[{{"product_id":"bulk","product_slug":"bulk","product_title":"Bulk","quantity":2,"unit_price":"79228162514264337593543950335"}}],"last_touched_at":"{}"}}"#,
            start().to_rfc3339()
        );
        f.local.set(CART_STORAGE_KEY, &raw).unwrap();

        assert_eq!(f.engine.load(), LoadOutcome::Corrupt);
        assert!(f.engine.cart().is_empty());
        assert_eq!(f.engine.cart().subtotal(), Decimal::ZERO);
        assert!(f.local.get(CART_STORAGE_KEY).unwrap().is_none());
        assert!(f.engine.is_ready());
    }

    #[test]
    fn test_load_backfills_display_price() {
        let mut f = fixture();
        let raw = format!(
            r#"{{"items":[{{"product_id":"mouse","product_slug":"mx-mouse","product_title":"MX Mouse","quantity":3,"unit_price":"9.99"}}],"last_touched_at":"{}"}}"#,
            start().to_rfc3339()
        );
        f.local.set(CART_STORAGE_KEY, &raw).unwrap();

        assert_eq!(f.engine.load(), LoadOutcome::Restored { items: 1 });
        let item = &f.engine.cart().items()[0];
        assert_eq!(item.unit_price_display, "$9.99");
        assert_eq!(item.total_price, dec!(29.97));
        assert_eq!(f.engine.cart().subtotal(), dec!(29.97));
    }

    #[test]
    fn test_mutation_stamps_timestamp() {
        let mut f = loaded();
        f.clock.advance(TimeDelta::minutes(7));
        let _ = f.engine.add_item(&laptop(), 1, None);

        let expected = start() + TimeDelta::minutes(7);
        assert_eq!(f.engine.cart().last_touched_at(), expected);
        assert_eq!(stored_cart(&f.local).unwrap().last_touched_at(), expected);
    }

    #[test]
    fn test_browsing_shipping_quote_reset_by_mutation() {
        let mut f = loaded();
        let _ = f.engine.add_item(&mouse(), 1, None);

        assert_eq!(f.engine.cart().shipping_fee(), Decimal::ZERO);
        assert_eq!(f.engine.recalculate_shipping("Tripoli"), dec!(8));
        assert_eq!(f.engine.cart().total(), dec!(17.99));

        let _ = f.engine.add_item(&mouse(), 1, None);
        assert_eq!(f.engine.cart().shipping_fee(), Decimal::ZERO);
        assert_eq!(f.engine.cart().total(), f.engine.cart().subtotal());
    }

    #[test]
    fn test_clear() {
        let mut f = loaded();
        let _ = f.engine.add_item(&laptop(), 1, None);
        f.clock.advance(TimeDelta::minutes(2));

        assert!(f.engine.clear().is_updated());
        assert!(f.engine.cart().is_empty());
        assert_eq!(f.engine.cart().last_touched_at(), start() + TimeDelta::minutes(2));
        assert!(stored_cart(&f.local).unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_create_order_on_empty_cart() {
        let mut f = loaded();
        let result = f
            .engine
            .create_order(customer("Beirut"), PaymentMethod::Whish)
            .await;

        assert!(matches!(result, Err(CartError::EmptyCart)));
        assert!(f.orders.orders().await.is_empty());
    }

    #[tokio::test]
    async fn test_create_order_success_clears_cart() {
        let mut f = loaded();
        let _ = f.engine.add_item(&laptop(), 1, None);
        f.clock.advance(TimeDelta::minutes(3));

        let confirmation = f
            .engine
            .create_order(customer("Tripoli"), PaymentMethod::CashOnDelivery)
            .await
            .unwrap();

        assert_eq!(confirmation.total, dec!(48));
        let now = start() + TimeDelta::minutes(3);
        assert_eq!(confirmation.estimated_delivery_date, now + TimeDelta::days(5));

        let orders = f.orders.orders().await;
        assert_eq!(orders.len(), 1);
        let (id, order) = &orders[0];
        assert_eq!(id, &confirmation.order_id);
        assert_eq!(order.order_number, confirmation.order_number);
        assert_eq!(order.shipping_fee, dec!(8));
        assert_eq!(order.items.len(), 1);

        assert!(f.engine.cart().is_empty());
        assert_eq!(f.engine.cart().last_touched_at(), now);
        assert!(stored_cart(&f.local).unwrap().is_empty());
        assert!(!f.engine.is_loading());
    }

    #[tokio::test]
    async fn test_create_order_failure_keeps_cart() {
        let mut f = loaded();
        let _ = f.engine.add_item(&mouse(), 2, None);
        let before = f.engine.cart().clone();
        f.orders.set_failing(true);

        let result = f
            .engine
            .create_order(customer("Saida"), PaymentMethod::Whish)
            .await;

        assert!(matches!(result, Err(CartError::OrderPersistence(_))));
        assert_eq!(f.engine.cart(), &before);
        assert_eq!(stored_cart(&f.local).unwrap(), before);
        assert!(!f.engine.is_loading());

        f.orders.set_failing(false);
        let confirmation = f
            .engine
            .create_order(customer("Saida"), PaymentMethod::Whish)
            .await
            .unwrap();
        assert_eq!(confirmation.total, dec!(27.98));
    }

    #[tokio::test]
    async fn test_loading_flag_set_while_insert_pending() {
        let (mut engine, entered, release) = gated_engine();
        let _ = engine.add_item(&laptop(), 1, None);
        let flag = engine.loading_flag();
        assert!(!flag.is_loading());

        let mut order = Box::pin(engine.create_order(customer("Beirut"), PaymentMethod::Whish));
        tokio::select! {
            _ = &mut order => panic!("insert completed before it was released"),
            () = entered.notified() => {}
        }
        assert!(flag.is_loading());

        release.notify_one();
        let confirmation = order.await.unwrap();
        assert!(!flag.is_loading());
        assert_eq!(confirmation.order_id.as_str(), "gated-order");
        assert!(engine.cart().is_empty());
    }

    #[tokio::test]
    async fn test_loading_flag_cleared_when_submission_dropped() {
        let (mut engine, entered, _release) = gated_engine();
        let _ = engine.add_item(&laptop(), 2, None);
        let flag = engine.loading_flag();

        let mut order = Box::pin(engine.create_order(customer("Beirut"), PaymentMethod::Whish));
        tokio::select! {
            _ = &mut order => panic!("insert completed before it was released"),
            () = entered.notified() => {}
        }
        assert!(flag.is_loading());

        drop(order);
        assert!(!flag.is_loading());
        assert!(!engine.is_loading());
        assert_eq!(engine.cart().item_count(), 2);
    }
}
