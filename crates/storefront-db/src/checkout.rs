//! # Checkout
//!
//! Places an order as one all-or-nothing transaction.
//!
//! ## Transaction Steps
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  place_order(request)                                                   │
//! │    validate_order_request (core)  ── no side effects yet                │
//! │    │                                                                    │
//! │    ▼  BEGIN                                                             │
//! │    1. reserve order code          (first write → holds the write lock)  │
//! │    2. price every line            catalog::fetch_for_order              │
//! │       └── stock < qty?            → InsufficientStock                   │
//! │    3. discount                    find_by_code + evaluate (core)        │
//! │       └── rejected?               → DiscountInvalid                     │
//! │    4. shipping + totals           ShippingPolicy / OrderTotals (core)   │
//! │    5. customer                    reconcile, or the signed-in id        │
//! │    6. take stock                  conditional UPDATE per line           │
//! │    7. insert order + items                                              │
//! │    8. claim discount slot         conditional UPDATE + usage row        │
//! │    9. customer aggregates                                               │
//! │    ▼  COMMIT ──► observer.on_order_placed                               │
//! │                                                                         │
//! │  Any error drops the transaction: SQLite rolls every step back.         │
//! │  Only an order-code collision is retried, up to code_retry_limit.       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::sync::Arc;

use chrono::{DateTime, Utc};
use storefront_core::discount::evaluate;
use storefront_core::order_code::local_date;
use storefront_core::pricing::{self, OrderTotals, PricedLine, ShippingPolicy};
use storefront_core::validation::{validate_order_request, ValidatedOrderRequest};
use storefront_core::{
    Discount, DiscountRejection, Money, Order, OrderRequest, OrderStatus, PaymentStatus,
    PlacedOrder, ValidationError, DEFAULT_ORDER_CODE_PREFIX,
};
use tracing::{debug, info, warn};

use crate::error::{CheckoutError, ConflictKind, DbError};
use crate::pool::Database;
use crate::repository::customer::{self, Contact};
use crate::repository::{catalog, discount, generate_id, inventory, order, order_code};

// =============================================================================
// Settings
// =============================================================================

/// Store policy the checkout applies.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckoutSettings {
    pub order_code_prefix: String,
    pub shipping: ShippingPolicy,
    pub utc_offset_minutes: i32,
    /// Reruns after an order-code collision before giving up.
    pub code_retry_limit: u32,
}

impl Default for CheckoutSettings {
    fn default() -> Self {
        CheckoutSettings {
            order_code_prefix: DEFAULT_ORDER_CODE_PREFIX.to_string(),
            shipping: ShippingPolicy::default(),
            utc_offset_minutes: 0,
            code_retry_limit: 3,
        }
    }
}

// =============================================================================
// Observer
// =============================================================================

/// Told about every order after it has been committed.
///
/// Implementations must not fail the checkout; the order already exists.
pub trait OrderObserver: Send + Sync {
    fn on_order_placed(&self, placed: &PlacedOrder);
}

/// Logs placed orders.
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingObserver;

impl OrderObserver for LoggingObserver {
    fn on_order_placed(&self, placed: &PlacedOrder) {
        info!(
            order_code = %placed.order.order_code,
            customer_id = placed.order.customer_id.as_deref().unwrap_or("-"),
            total = %placed.order.total(),
            items = placed.items.len(),
            customer_created = placed.customer_created,
            "Order placed"
        );
    }
}

// =============================================================================
// CheckoutService
// =============================================================================

/// Places orders against a shared [`Database`].
///
/// Clone it freely; clones share the pool and the observer.
#[derive(Clone)]
pub struct CheckoutService {
    db: Database,
    settings: CheckoutSettings,
    observer: Arc<dyn OrderObserver>,
}

impl std::fmt::Debug for CheckoutService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CheckoutService")
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}

/// A discount that passed evaluation for this order.
struct AppliedDiscount {
    discount: Discount,
    amount: Money,
}

impl CheckoutService {
    pub fn new(db: Database, settings: CheckoutSettings) -> Self {
        CheckoutService {
            db,
            settings,
            observer: Arc::new(LoggingObserver),
        }
    }

    /// Replaces the default logging observer.
    pub fn with_observer(mut self, observer: Arc<dyn OrderObserver>) -> Self {
        self.observer = observer;
        self
    }

    pub fn settings(&self) -> &CheckoutSettings {
        &self.settings
    }

    /// Places an order now.
    pub async fn place_order(&self, request: OrderRequest) -> Result<PlacedOrder, CheckoutError> {
        self.place_order_at(request, Utc::now()).await
    }

    /// Places an order as of `now` (which decides the code's day and the
    /// discount validity window).
    pub async fn place_order_at(
        &self,
        request: OrderRequest,
        now: DateTime<Utc>,
    ) -> Result<PlacedOrder, CheckoutError> {
        let request = validate_order_request(&request).map_err(|err| {
            warn!(error = %err, "Order request rejected");
            CheckoutError::from(err)
        })?;

        let mut retries = 0;
        loop {
            match self.try_place(&request, now).await {
                Ok(placed) => {
                    self.observer.on_order_placed(&placed);
                    return Ok(placed);
                }
                Err(CheckoutError::ConcurrencyConflict {
                    kind: ConflictKind::OrderCode,
                }) if retries < self.settings.code_retry_limit => {
                    retries += 1;
                    warn!(attempt = retries, "Order code collision, retrying checkout");
                }
                Err(err) => {
                    warn!(kind = err.kind(), error = %err, "Checkout failed");
                    return Err(err);
                }
            }
        }
    }

    /// One attempt. Returning early drops `tx`, which rolls everything back.
    async fn try_place(
        &self,
        request: &ValidatedOrderRequest,
        now: DateTime<Utc>,
    ) -> Result<PlacedOrder, CheckoutError> {
        let mut tx = self.db.begin().await?;

        // 1. Order code. Being the first write, this is also where the
        //    transaction waits for concurrent checkouts to finish.
        let today = local_date(now, self.settings.utc_offset_minutes)?;
        let order_code =
            order_code::next_code(&mut tx, &self.settings.order_code_prefix, today).await?;

        // 2. Price lines against the current catalog.
        let mut lines = Vec::with_capacity(request.lines.len());
        for line in &request.lines {
            let entry = catalog::fetch_for_order(&mut *tx, &line.product_id)
                .await?
                .filter(|entry| entry.is_active)
                .ok_or_else(|| CheckoutError::ProductNotFound {
                    product_id: line.product_id.clone(),
                })?;

            if line.quantity > entry.stock {
                return Err(CheckoutError::InsufficientStock {
                    product_id: entry.product_id,
                    name: entry.name,
                    available: entry.stock,
                    requested: line.quantity,
                });
            }

            lines.push(PricedLine::new(
                entry.product_id,
                entry.category_id,
                entry.name,
                entry.price,
                line.quantity,
            )?);
        }
        let subtotal = pricing::subtotal(&lines)?;

        // 3. Discount.
        let applied = match &request.discount_code {
            Some(code) => {
                let discount = discount::find_by_code(&mut tx, code)
                    .await?
                    .ok_or_else(|| CheckoutError::DiscountInvalid {
                        code: code.clone(),
                        reason: DiscountRejection::NotFound,
                    })?;
                let amount = evaluate(&discount, subtotal, &lines, now).map_err(|reason| {
                    CheckoutError::DiscountInvalid {
                        code: code.clone(),
                        reason,
                    }
                })?;
                debug!(code = %code, amount = %amount, "Discount applies");
                Some(AppliedDiscount { discount, amount })
            }
            None => None,
        };

        // 4. Totals.
        let shipping = self.settings.shipping.shipping_for(subtotal);
        let totals = OrderTotals::compute(
            subtotal,
            applied.as_ref().map_or(Money::zero(), |a| a.amount),
            shipping,
        );

        // 5. Customer.
        let (customer_id, customer_created, is_guest) = match &request.customer_id {
            Some(id) => {
                if customer::find_by_id(&mut *tx, id).await?.is_none() {
                    return Err(ValidationError::InvalidFormat {
                        field: "customer_id".to_string(),
                        reason: "no such customer".to_string(),
                    }
                    .into());
                }
                (id.clone(), false, false)
            }
            None => {
                let contact = Contact {
                    name: &request.customer_name,
                    email: &request.customer_email,
                    phone: &request.customer_phone,
                };
                let reconciled = customer::reconcile(&mut tx, contact, now).await?;
                (reconciled.customer_id, reconciled.created, true)
            }
        };

        // 6. Stock. Re-checked by the UPDATE itself.
        for line in &lines {
            if !inventory::decrement_stock(&mut *tx, &line.product_id, line.quantity, now).await? {
                let available = inventory::available(&mut *tx, &line.product_id)
                    .await?
                    .unwrap_or(0);
                return Err(CheckoutError::InsufficientStock {
                    product_id: line.product_id.clone(),
                    name: line.name.clone(),
                    available,
                    requested: line.quantity,
                });
            }
        }

        // 7. Order and items.
        let order = Order {
            id: generate_id(),
            order_code,
            status: OrderStatus::Pending,
            payment_status: PaymentStatus::Pending,
            payment_method: request.payment_method,
            subtotal_cents: totals.subtotal.cents(),
            discount_cents: totals.discount.cents(),
            shipping_cents: totals.shipping.cents(),
            total_cents: totals.total.cents(),
            discount_code: applied.as_ref().map(|a| a.discount.code.clone()),
            customer_id: Some(customer_id.clone()),
            customer_name: request.customer_name.clone(),
            customer_phone: request.customer_phone.clone(),
            customer_email: request.customer_email.clone(),
            shipping_address: request.shipping_address.clone(),
            notes: request.notes.clone(),
            is_guest,
            created_at: now,
            updated_at: now,
            confirmed_at: None,
            shipped_at: None,
            delivered_at: None,
            cancelled_at: None,
        };
        order::insert_order(&mut *tx, &order)
            .await
            .map_err(order_code_collision)?;

        let mut items = Vec::with_capacity(lines.len());
        for line in &lines {
            let item = order::new_item(
                &order.id,
                &line.product_id,
                &line.name,
                line.unit_price.cents(),
                line.quantity,
                now,
            );
            order::insert_item(&mut *tx, &item).await?;
            items.push(item);
        }

        // 8. Discount slot.
        if let Some(applied) = &applied {
            let claimed = discount::claim_usage(&mut *tx, &applied.discount.id, now)
                .await
                .map_err(usage_conflict)?;
            if !claimed {
                return Err(CheckoutError::ConcurrencyConflict {
                    kind: ConflictKind::DiscountUsage,
                });
            }
            discount::record_usage(&mut *tx, &applied.discount.id, &customer_id, &order.id, now)
                .await?;
        }

        // 9. Customer aggregates.
        customer::record_order(&mut *tx, &customer_id, totals.total, now).await?;

        tx.commit().await?;

        Ok(PlacedOrder {
            order,
            items,
            customer_created,
        })
    }
}

fn order_code_collision(err: DbError) -> CheckoutError {
    if err.is_unique_violation_on("orders.order_code") {
        CheckoutError::ConcurrencyConflict {
            kind: ConflictKind::OrderCode,
        }
    } else {
        err.into()
    }
}

fn usage_conflict(err: DbError) -> CheckoutError {
    match err {
        DbError::CheckViolation { .. } => CheckoutError::ConcurrencyConflict {
            kind: ConflictKind::DiscountUsage,
        },
        other => other.into(),
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::test_support;
    use chrono::Duration;
    use std::sync::Mutex;
    use storefront_core::{DiscountType, OrderLineRequest, PaymentMethod, Product};

    struct Recorder(Mutex<Vec<String>>);

    impl OrderObserver for Recorder {
        fn on_order_placed(&self, placed: &PlacedOrder) {
            self.0.lock().unwrap().push(placed.order.order_code.clone());
        }
    }

    fn now() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2024-03-15T10:00:00Z")
            .unwrap()
            .with_timezone(&Utc)
    }

    fn request(lines: &[(&Product, i64)], code: Option<&str>) -> OrderRequest {
        OrderRequest {
            customer_name: "Lan Nguyen".to_string(),
            customer_phone: "0900000000".to_string(),
            customer_email: "a@x.com".to_string(),
            shipping_address: "12 Le Loi, District 1".to_string(),
            payment_method: PaymentMethod::Cod,
            discount_code: code.map(str::to_string),
            notes: None,
            customer_id: None,
            items: lines
                .iter()
                .map(|(product, quantity)| OrderLineRequest {
                    product_id: product.id.clone(),
                    quantity: *quantity,
                })
                .collect(),
        }
    }

    async fn setup(products: &[Product]) -> (Database, CheckoutService) {
        let db = test_support::database().await;
        for product in products {
            db.products().insert(product).await.unwrap();
        }
        let service = CheckoutService::new(db.clone(), CheckoutSettings::default());
        (db, service)
    }

    async fn stock_of(db: &Database, product: &Product) -> i64 {
        db.products().get_by_id(&product.id).await.unwrap().unwrap().stock
    }

    #[tokio::test]
    async fn test_save10_scenario() {
        let jacket = test_support::product("JKT-1", 60000, 5);
        let (db, service) = setup(&[jacket.clone()]).await;

        let mut save10 = test_support::discount("SAVE10", DiscountType::Percentage, 10, now());
        save10.max_discount_cents = 5000;
        db.discounts().insert(&save10).await.unwrap();

        let placed = service
            .place_order_at(request(&[(&jacket, 1)], Some("save10")), now())
            .await
            .unwrap();

        let order = &placed.order;
        assert_eq!(order.order_code, "ORD-150324001");
        assert_eq!(order.subtotal_cents, 60000);
        assert_eq!(order.discount_cents, 5000);
        assert_eq!(order.shipping_cents, 0);
        assert_eq!(order.total_cents, 55000);
        assert_eq!(order.discount_code.as_deref(), Some("SAVE10"));
        assert!(placed.customer_created);
        assert!(order.is_guest);

        assert_eq!(stock_of(&db, &jacket).await, 4);
        let discount = db.discounts().get_by_code("SAVE10").await.unwrap().unwrap();
        assert_eq!(discount.used_count, 1);
        let usages = db.discounts().list_usages(&discount.id).await.unwrap();
        assert_eq!(usages.len(), 1);
        assert_eq!(usages[0].order_id, order.id);

        let customer = db.customers().find_by_email("a@x.com").await.unwrap().unwrap();
        assert_eq!(customer.total_orders, 1);
        assert_eq!(customer.total_spent_cents, 55000);
    }

    #[tokio::test]
    async fn test_shipping_fee_below_threshold() {
        let tee = test_support::product("TEE-1", 12000, 10);
        let (db, service) = setup(&[tee.clone()]).await;

        let placed = service
            .place_order_at(request(&[(&tee, 2)], None), now())
            .await
            .unwrap();

        assert_eq!(placed.order.subtotal_cents, 24000);
        assert_eq!(placed.order.shipping_cents, 3000);
        assert_eq!(placed.order.total_cents, 27000);
        assert_eq!(placed.items[0].unit_price_cents, 12000);

        let stored = db.orders().get_by_id(&placed.order.id).await.unwrap().unwrap();
        assert!(stored.totals_are_consistent());
        assert_eq!(db.orders().get_items(&stored.id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_expired_code_leaves_nothing_behind() {
        let jacket = test_support::product("JKT-1", 60000, 5);
        let (db, service) = setup(&[jacket.clone()]).await;

        let mut expired = test_support::discount("OLD", DiscountType::Fixed, 1000, now());
        expired.starts_at = now() - Duration::days(30);
        expired.ends_at = now() - Duration::days(1);
        db.discounts().insert(&expired).await.unwrap();

        let err = service
            .place_order_at(request(&[(&jacket, 1)], Some("OLD")), now())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            CheckoutError::DiscountInvalid {
                reason: DiscountRejection::Expired { .. },
                ..
            }
        ));

        assert_eq!(db.orders().count().await.unwrap(), 0);
        assert_eq!(db.customers().count().await.unwrap(), 0);
        assert_eq!(stock_of(&db, &jacket).await, 5);

        // The rolled-back attempt did not burn a code.
        let placed = service
            .place_order_at(request(&[(&jacket, 1)], None), now())
            .await
            .unwrap();
        assert_eq!(placed.order.order_code, "ORD-150324001");
    }

    #[tokio::test]
    async fn test_unknown_discount_code() {
        let tee = test_support::product("TEE-1", 1000, 1);
        let (_db, service) = setup(&[tee.clone()]).await;

        let err = service
            .place_order_at(request(&[(&tee, 1)], Some("NOPE")), now())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            CheckoutError::DiscountInvalid {
                reason: DiscountRejection::NotFound,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_insufficient_stock_names_product_and_rolls_back() {
        let tee = test_support::product("TEE-1", 1000, 5);
        let cap = test_support::product("CAP-1", 1500, 1);
        let (db, service) = setup(&[tee.clone(), cap.clone()]).await;

        let err = service
            .place_order_at(request(&[(&tee, 2), (&cap, 2)], None), now())
            .await
            .unwrap_err();
        match err {
            CheckoutError::InsufficientStock {
                product_id,
                available,
                requested,
                ..
            } => {
                assert_eq!(product_id, cap.id);
                assert_eq!(available, 1);
                assert_eq!(requested, 2);
            }
            other => panic!("unexpected error: {other}"),
        }

        assert_eq!(stock_of(&db, &tee).await, 5);
        assert_eq!(db.orders().count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_inactive_or_missing_product() {
        let tee = test_support::product("TEE-1", 1000, 5);
        let (db, service) = setup(&[tee.clone()]).await;
        db.products().soft_delete(&tee.id).await.unwrap();

        let err = service
            .place_order_at(request(&[(&tee, 1)], None), now())
            .await
            .unwrap_err();
        assert!(matches!(err, CheckoutError::ProductNotFound { .. }));

        let ghost = test_support::product("GHOST", 1000, 5);
        let err = service
            .place_order_at(request(&[(&ghost, 1)], None), now())
            .await
            .unwrap_err();
        assert!(matches!(err, CheckoutError::ProductNotFound { .. }));
    }

    #[tokio::test]
    async fn test_validation_happens_first() {
        let tee = test_support::product("TEE-1", 1000, 5);
        let (db, service) = setup(&[tee.clone()]).await;

        let mut bad = request(&[(&tee, 1)], None);
        bad.customer_email = "not-an-email".to_string();
        let err = service.place_order_at(bad, now()).await.unwrap_err();
        assert!(matches!(err, CheckoutError::Validation(_)));
        assert!(!err.is_retryable());

        let empty = request(&[], None);
        assert!(matches!(
            service.place_order_at(empty, now()).await,
            Err(CheckoutError::Validation(_))
        ));
        assert_eq!(db.orders().count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_usage_limit_exhausted() {
        let tee = test_support::product("TEE-1", 1000, 5);
        let (db, service) = setup(&[tee.clone()]).await;

        let mut once = test_support::discount("ONCE", DiscountType::Fixed, 200, now());
        once.usage_limit = 1;
        db.discounts().insert(&once).await.unwrap();

        service
            .place_order_at(request(&[(&tee, 1)], Some("ONCE")), now())
            .await
            .unwrap();
        let err = service
            .place_order_at(request(&[(&tee, 1)], Some("ONCE")), now())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            CheckoutError::DiscountInvalid {
                reason: DiscountRejection::UsageLimitReached { limit: 1 },
                ..
            }
        ));
        assert_eq!(stock_of(&db, &tee).await, 4);
    }

    #[tokio::test]
    async fn test_scoped_discount_not_applicable() {
        let tee = test_support::product("TEE-1", 1000, 5);
        let cap = test_support::product("CAP-1", 1500, 5);
        let (db, service) = setup(&[tee.clone(), cap.clone()]).await;

        let mut caps_only = test_support::discount("CAPS", DiscountType::Percentage, 20, now());
        caps_only.scope.product_ids = vec![cap.id.clone()];
        db.discounts().insert(&caps_only).await.unwrap();

        let err = service
            .place_order_at(request(&[(&tee, 1)], Some("CAPS")), now())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            CheckoutError::DiscountInvalid {
                reason: DiscountRejection::NotApplicable,
                ..
            }
        ));

        let placed = service
            .place_order_at(request(&[(&tee, 1), (&cap, 1)], Some("CAPS")), now())
            .await
            .unwrap();
        // 20% of the whole 25.00 subtotal
        assert_eq!(placed.order.discount_cents, 500);
    }

    #[tokio::test]
    async fn test_repeat_guest_reuses_customer_and_codes_increase() {
        let tee = test_support::product("TEE-1", 1000, 5);
        let (db, service) = setup(&[tee.clone()]).await;
        let recorder = Arc::new(Recorder(Mutex::new(Vec::new())));
        let service = service.with_observer(recorder.clone());

        let first = service
            .place_order_at(request(&[(&tee, 1)], None), now())
            .await
            .unwrap();
        let mut again = request(&[(&tee, 1)], None);
        again.customer_email = " A@X.COM ".to_string();
        let second = service.place_order_at(again, now()).await.unwrap();

        assert!(first.customer_created);
        assert!(!second.customer_created);
        assert_eq!(first.order.customer_id, second.order.customer_id);
        assert_eq!(db.customers().count().await.unwrap(), 1);
        assert_eq!(
            *recorder.0.lock().unwrap(),
            vec!["ORD-150324001".to_string(), "ORD-150324002".to_string()]
        );

        let history = db
            .orders()
            .list_for_customer(first.order.customer_id.as_deref().unwrap(), 10)
            .await
            .unwrap();
        assert_eq!(history.len(), 2);
    }

    #[tokio::test]
    async fn test_conflicting_contact_details() {
        let tee = test_support::product("TEE-1", 1000, 5);
        let (_db, service) = setup(&[tee.clone()]).await;

        service
            .place_order_at(request(&[(&tee, 1)], None), now())
            .await
            .unwrap();
        let mut other = request(&[(&tee, 1)], None);
        other.customer_email = "b@x.com".to_string();
        other.customer_phone = "0911111111".to_string();
        service.place_order_at(other, now()).await.unwrap();

        let mut mixed = request(&[(&tee, 1)], None);
        mixed.customer_phone = "0911111111".to_string();
        let err = service.place_order_at(mixed, now()).await.unwrap_err();
        assert!(matches!(err, CheckoutError::CustomerConflict { .. }));
    }

    #[tokio::test]
    async fn test_signed_in_customer() {
        let tee = test_support::product("TEE-1", 1000, 5);
        let (db, service) = setup(&[tee.clone()]).await;

        let guest = service
            .place_order_at(request(&[(&tee, 1)], None), now())
            .await
            .unwrap();
        let customer_id = guest.order.customer_id.clone().unwrap();

        let mut signed_in = request(&[(&tee, 1)], None);
        signed_in.customer_id = Some(customer_id.clone());
        let placed = service.place_order_at(signed_in, now()).await.unwrap();
        assert!(!placed.order.is_guest);
        assert_eq!(placed.order.customer_id.as_deref(), Some(customer_id.as_str()));

        let mut unknown = request(&[(&tee, 1)], None);
        unknown.customer_id = Some(generate_id());
        assert!(matches!(
            service.place_order_at(unknown, now()).await,
            Err(CheckoutError::Validation(_))
        ));
        assert_eq!(stock_of(&db, &tee).await, 3);
    }

    #[tokio::test]
    async fn test_code_skips_order_inserted_outside_checkout() {
        let tee = test_support::product("TEE-1", 1000, 5);
        let (db, service) = setup(&[tee.clone()]).await;

        let first = service
            .place_order_at(request(&[(&tee, 1)], None), now())
            .await
            .unwrap();
        assert_eq!(first.order.order_code, "ORD-150324001");

        sqlx::query(
            r#"
            INSERT INTO orders (
                id, order_code, payment_method, subtotal_cents, total_cents,
                customer_name, customer_phone, customer_email, shipping_address,
                created_at, updated_at
            ) VALUES (?1, 'ORD-150324002', 'cod', 0, 0, 'n', 'p', 'e', 'a', ?2, ?2)
            "#,
        )
        .bind(generate_id())
        .bind(now())
        .execute(db.pool())
        .await
        .unwrap();

        let next = service
            .place_order_at(request(&[(&tee, 1)], None), now())
            .await
            .unwrap();
        assert_eq!(next.order.order_code, "ORD-150324003");
        assert_eq!(stock_of(&db, &tee).await, 3);
    }

    #[tokio::test]
    async fn test_line_total_overflow_is_rejected() {
        let tee = test_support::product("TEE-1", 1000, 50);
        let (db, service) = setup(&[tee.clone()]).await;
        // Stored outside the catalog validators, which cap prices.
        sqlx::query("UPDATE products SET price_cents = ?1 WHERE id = ?2")
            .bind(i64::MAX / 10)
            .bind(&tee.id)
            .execute(db.pool())
            .await
            .unwrap();

        let err = service
            .place_order_at(request(&[(&tee, 20)], None), now())
            .await
            .unwrap_err();
        assert!(matches!(err, CheckoutError::Validation(_)), "unexpected error: {err}");
        assert_eq!(stock_of(&db, &tee).await, 50);
        assert_eq!(db.orders().count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_code_day_follows_utc_offset() {
        let tee = test_support::product("TEE-1", 1000, 5);
        let (db, _) = setup(&[tee.clone()]).await;
        let settings = CheckoutSettings {
            order_code_prefix: "WEB".to_string(),
            utc_offset_minutes: 15 * 60,
            ..CheckoutSettings::default()
        };
        let service = CheckoutService::new(db, settings);

        let placed = service
            .place_order_at(request(&[(&tee, 1)], None), now())
            .await
            .unwrap();
        assert_eq!(placed.order.order_code, "WEB-160324001");
    }
}
