//! Cart mutation coordinator
//!
//! Serializes mutations per line item and keeps the stored cart consistent
//! with catalog truth. A mutation runs as: acquire the `(session, product)`
//! guard, fetch fresh product info from the gateway, then apply the
//! aggregate operation on the stored cart under its map entry lock. The
//! gateway is never consulted while the lock is held, and the cart is never
//! replaced from a stale copy, so a concurrent mutation to another line item
//! of the same cart cannot be overwritten. If any step fails the stored cart
//! is left exactly as it was; no optimistic update is ever applied.
//!
//! Concurrent mutations to the same line item are rejected, not queued:
//! reject-if-busy keeps behavior predictable and avoids stale-quantity races.
//! Mutations to different line items proceed independently.

use std::collections::HashMap;

use dashmap::DashSet;
use tracing::debug;

use super::aggregate;
use super::models::{Cart, CartIssue, CartValidation, CartView};
use crate::catalog::{GatewayError, ProductInfo};
use crate::error::EngineError;
use crate::state::{AppState, SessionId};

/// One cart mutation, as requested by the caller.
#[derive(Debug)]
pub enum CartOp {
    Add { product_id: u64, quantity: u32 },
    SetQuantity { product_id: u64, quantity: u32 },
    Remove { product_id: u64 },
    Clear,
}

/// Applies one mutation for a shopper session and returns the authoritative
/// snapshot that replaces any state the caller holds.
pub async fn mutate(
    state: &AppState,
    session_id: &str,
    op: CartOp,
) -> Result<CartView, EngineError> {
    debug!(session = session_id, ?op, "cart mutation");
    match op {
        CartOp::Add {
            product_id,
            quantity,
        } => {
            // Local validation first; an invalid quantity never reaches the
            // gateway.
            if quantity < 1 {
                return Err(EngineError::InvalidQuantity(
                    "quantity must be at least 1".into(),
                ));
            }
            let _guard = MutationGuard::acquire(&state.in_flight, session_id, product_id)?;
            let info = state.catalog.product_info(product_id).await?;

            apply(state, session_id, |cart| cart.add_item(&info, quantity))
        }
        // Setting a quantity to zero is a removal, never a zero-quantity row.
        CartOp::SetQuantity {
            product_id,
            quantity: 0,
        }
        | CartOp::Remove { product_id } => remove(state, session_id, product_id).await,
        CartOp::SetQuantity {
            product_id,
            quantity,
        } => {
            let _guard = MutationGuard::acquire(&state.in_flight, session_id, product_id)?;
            let info = state.catalog.product_info(product_id).await?;

            apply(state, session_id, |cart| cart.set_quantity(&info, quantity))
        }
        CartOp::Clear => {
            // Wholesale removal; the per-item guard does not apply.
            state.carts.remove(session_id);
            Ok(CartView::empty(session_id))
        }
    }
}

/// Removal path. Removing an item that is already absent is a success, and
/// a transport failure on the catalog ping is retried exactly once, the
/// single deliberate exception to "no automatic retry", justified by the
/// idempotent-delete semantics of the operation.
async fn remove(
    state: &AppState,
    session_id: &str,
    product_id: u64,
) -> Result<CartView, EngineError> {
    let _guard = MutationGuard::acquire(&state.in_flight, session_id, product_id)?;

    let present = state
        .carts
        .get(session_id)
        .is_some_and(|c| c.item(product_id).is_some());
    if !present {
        let view = state
            .carts
            .get(session_id)
            .map(|c| CartView::from_cart(session_id, &c))
            .unwrap_or_else(|| CartView::empty(session_id));
        return Ok(view);
    }

    match state.catalog.product_info(product_id).await {
        Ok(_) | Err(GatewayError::ProductMissing(_)) => {}
        Err(GatewayError::Unavailable(_)) => {
            debug!(product_id, "retrying idempotent remove once");
            match state.catalog.product_info(product_id).await {
                Ok(_) | Err(GatewayError::ProductMissing(_)) => {}
                Err(e) => return Err(e.into()),
            }
        }
    }

    apply(state, session_id, |cart| {
        cart.remove_item(product_id);
        Ok(())
    })
}

/// Revalidates every line against fresh catalog truth, reconciling prices
/// and availability into the stored cart. Used by `GET /cart/validate` and
/// as the mandatory pre-submission check.
pub async fn validate(state: &AppState, session_id: &str) -> Result<CartValidation, EngineError> {
    // Fetch all product truth first; the reconciliation below runs under
    // the entry lock and must not await.
    let product_ids: Vec<u64> = state
        .carts
        .get(session_id)
        .map(|c| c.items.iter().map(|i| i.product_id).collect())
        .unwrap_or_default();

    let mut fresh: HashMap<u64, Option<ProductInfo>> = HashMap::new();
    for product_id in product_ids {
        match state.catalog.product_info(product_id).await {
            Ok(info) => {
                fresh.insert(product_id, Some(info));
            }
            Err(GatewayError::ProductMissing(id)) => {
                fresh.insert(id, None);
            }
            Err(e) => return Err(e.into()),
        }
    }

    let mut issues = Vec::new();
    if let Some(mut cart) = state.carts.get_mut(session_id) {
        for line in &mut cart.items {
            match fresh.get(&line.product_id) {
                Some(Some(info)) => {
                    if line.effective_unit_price() != info.effective_unit_price() {
                        issues.push(CartIssue {
                            product_id: line.product_id,
                            issue: "price has changed".into(),
                        });
                    }
                    aggregate::refresh_line(line, info);
                    if !info.in_stock {
                        issues.push(CartIssue {
                            product_id: line.product_id,
                            issue: "currently unavailable".into(),
                        });
                    } else if info.max_quantity.is_some_and(|max| line.quantity > max) {
                        issues.push(CartIssue {
                            product_id: line.product_id,
                            issue: "quantity exceeds the purchase limit".into(),
                        });
                    }
                }
                Some(None) => {
                    line.is_available = false;
                    issues.push(CartIssue {
                        product_id: line.product_id,
                        issue: "no longer in the catalog".into(),
                    });
                }
                // Added after the snapshot was taken; the next validation
                // pass will cover it.
                None => {}
            }
        }
    }

    Ok(CartValidation {
        valid: issues.is_empty(),
        issues,
    })
}

/// Runs one aggregate operation on the stored cart under its map entry
/// lock, creating the cart lazily. Holding the lock for the whole
/// read-modify-write keeps a concurrent mutation to another line item from
/// being overwritten; the closure must not block or await.
fn apply<F>(state: &AppState, session_id: &str, op: F) -> Result<CartView, EngineError>
where
    F: FnOnce(&mut Cart) -> Result<(), EngineError>,
{
    let mut entry = state.carts.entry(session_id.to_string()).or_default();
    match op(entry.value_mut()) {
        Ok(()) => Ok(CartView::from_cart(session_id, entry.value())),
        Err(e) => {
            let lazily_created = entry.value().is_empty();
            drop(entry);
            if lazily_created {
                state.carts.remove_if(session_id, |_, cart| cart.is_empty());
            }
            Err(e)
        }
    }
}

/// RAII guard for the at-most-one-in-flight-mutation-per-line-item rule.
struct MutationGuard<'a> {
    in_flight: &'a DashSet<(SessionId, u64)>,
    key: (SessionId, u64),
}

impl<'a> MutationGuard<'a> {
    fn acquire(
        in_flight: &'a DashSet<(SessionId, u64)>,
        session_id: &str,
        product_id: u64,
    ) -> Result<Self, EngineError> {
        let key = (session_id.to_string(), product_id);
        if in_flight.insert(key.clone()) {
            Ok(Self { in_flight, key })
        } else {
            Err(EngineError::MutationInProgress)
        }
    }
}

impl Drop for MutationGuard<'_> {
    fn drop(&mut self) {
        self.in_flight.remove(&self.key);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{InMemoryCatalog, PricingAvailabilityGateway, ProductInfo};
    use async_trait::async_trait;
    use rust_decimal_macros::dec;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use tokio::sync::Notify;
    use tokio::time::{sleep, Duration};

    fn seeded_catalog() -> InMemoryCatalog {
        let catalog = InMemoryCatalog::new();
        catalog.insert(ProductInfo {
            id: 1,
            name: "kettlebell".into(),
            unit_price: dec!(35.00),
            discount_price: None,
            in_stock: true,
            max_quantity: Some(4),
        });
        catalog.insert(ProductInfo {
            id: 2,
            name: "jump rope".into(),
            unit_price: dec!(12.00),
            discount_price: None,
            in_stock: true,
            max_quantity: None,
        });
        catalog
    }

    /// Blocks calls for one product until released; other products pass.
    struct SlowGateway {
        gate: Arc<Notify>,
        blocked_product: u64,
        inner: InMemoryCatalog,
    }

    #[async_trait]
    impl PricingAvailabilityGateway for SlowGateway {
        async fn product_info(&self, product_id: u64) -> Result<ProductInfo, GatewayError> {
            if product_id == self.blocked_product {
                self.gate.notified().await;
            }
            self.inner.product_info(product_id).await
        }
    }

    /// Fails the first `failures` calls with a transport error.
    struct FlakyGateway {
        remaining_failures: AtomicUsize,
        calls: AtomicUsize,
        inner: InMemoryCatalog,
    }

    #[async_trait]
    impl PricingAvailabilityGateway for FlakyGateway {
        async fn product_info(&self, product_id: u64) -> Result<ProductInfo, GatewayError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self
                .remaining_failures
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
                .is_ok()
            {
                return Err(GatewayError::Unavailable("connection reset".into()));
            }
            self.inner.product_info(product_id).await
        }
    }

    fn add(product_id: u64, quantity: u32) -> CartOp {
        CartOp::Add {
            product_id,
            quantity,
        }
    }

    #[tokio::test]
    async fn add_and_set_quantity_round_trip() {
        let state = AppState::new(Arc::new(seeded_catalog()));

        let view = mutate(&state, "s1", add(1, 2)).await.unwrap();
        assert_eq!(view.items.len(), 1);
        assert_eq!(view.totals.subtotal, dec!(70.00));

        let view = mutate(
            &state,
            "s1",
            CartOp::SetQuantity {
                product_id: 1,
                quantity: 3,
            },
        )
        .await
        .unwrap();
        assert_eq!(view.items[0].quantity, 3);
    }

    #[tokio::test]
    async fn same_item_mutations_are_rejected_while_in_flight() {
        let gate = Arc::new(Notify::new());
        let state = Arc::new(AppState::new(Arc::new(SlowGateway {
            gate: gate.clone(),
            blocked_product: 1,
            inner: seeded_catalog(),
        })));

        let background = state.clone();
        let first = tokio::spawn(async move { mutate(&background, "s1", add(1, 1)).await });
        sleep(Duration::from_millis(20)).await;

        // Second mutation on the same product: rejected, never queued.
        let err = mutate(&state, "s1", add(1, 1)).await.unwrap_err();
        assert!(matches!(err, EngineError::MutationInProgress));

        // A different product is independent and goes through.
        mutate(&state, "s1", add(2, 1)).await.unwrap();

        gate.notify_one();
        first.await.unwrap().unwrap();

        // Guard released; the same product can be mutated again.
        gate.notify_one();
        let view = mutate(&state, "s1", add(1, 1)).await.unwrap();
        let line = view.items.iter().find(|i| i.product_id == 1).unwrap();
        assert_eq!(line.quantity, 2);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_mutations_to_different_products_both_land() {
        let state = Arc::new(AppState::new(Arc::new(seeded_catalog())));

        for round in 0..500 {
            let session = format!("s-{round}");

            let (a, b) = (state.clone(), state.clone());
            let (sa, sb) = (session.clone(), session.clone());
            let first = tokio::spawn(async move { mutate(&a, &sa, add(1, 1)).await });
            let second = tokio::spawn(async move { mutate(&b, &sb, add(2, 1)).await });
            first.await.unwrap().unwrap();
            second.await.unwrap().unwrap();

            let cart = state.carts.get(session.as_str()).unwrap();
            assert_eq!(
                cart.items.len(),
                2,
                "round {round}: an accepted add was lost; cart = {:?}",
                cart.items
            );
        }
    }

    #[tokio::test]
    async fn gateway_failure_leaves_cart_unchanged() {
        let state = AppState::new(Arc::new(FlakyGateway {
            remaining_failures: AtomicUsize::new(usize::MAX),
            calls: AtomicUsize::new(0),
            inner: seeded_catalog(),
        }));

        let err = mutate(&state, "s1", add(1, 1)).await.unwrap_err();
        assert!(matches!(err, EngineError::Gateway(_)));
        assert!(state.carts.get("s1").is_none());
    }

    #[tokio::test]
    async fn rejected_add_does_not_leave_an_empty_cart_behind() {
        let state = AppState::new(Arc::new(seeded_catalog()));

        // Product 1 is capped at 4; the rejection must not materialize a
        // lazily created cart for the session.
        let err = mutate(&state, "s1", add(1, 9)).await.unwrap_err();
        assert!(matches!(err, EngineError::InvalidQuantity(_)));
        assert!(state.carts.get("s1").is_none());
    }

    #[tokio::test]
    async fn remove_retries_once_on_transport_failure() {
        let gateway = Arc::new(FlakyGateway {
            remaining_failures: AtomicUsize::new(1),
            calls: AtomicUsize::new(0),
            inner: seeded_catalog(),
        });
        let state = AppState::new(gateway.clone());

        // Seed a cart directly; the flaky first call is reserved for remove.
        let mut cart = Cart::new();
        cart.add_item(&seeded_catalog().product_info(1).await.unwrap(), 1)
            .unwrap();
        state.carts.insert("s1".into(), cart);

        let view = mutate(&state, "s1", CartOp::Remove { product_id: 1 })
            .await
            .unwrap();
        assert!(view.items.is_empty());
        assert_eq!(gateway.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn removing_an_absent_item_is_a_success_without_gateway_traffic() {
        let gateway = Arc::new(FlakyGateway {
            remaining_failures: AtomicUsize::new(usize::MAX),
            calls: AtomicUsize::new(0),
            inner: seeded_catalog(),
        });
        let state = AppState::new(gateway.clone());

        let view = mutate(&state, "s1", CartOp::Remove { product_id: 42 })
            .await
            .unwrap();
        assert!(view.items.is_empty());
        assert_eq!(gateway.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn set_quantity_zero_removes() {
        let state = AppState::new(Arc::new(seeded_catalog()));
        mutate(&state, "s1", add(1, 2)).await.unwrap();

        let view = mutate(
            &state,
            "s1",
            CartOp::SetQuantity {
                product_id: 1,
                quantity: 0,
            },
        )
        .await
        .unwrap();
        assert!(view.items.is_empty());
    }

    #[tokio::test]
    async fn validate_reports_drift_and_reconciles() {
        let catalog = Arc::new(seeded_catalog());
        let state = AppState::new(catalog.clone());
        mutate(&state, "s1", add(1, 2)).await.unwrap();

        catalog.set_in_stock(1, false);
        catalog.set_unit_price(1, dec!(40.00));

        let result = validate(&state, "s1").await.unwrap();
        assert!(!result.valid);
        assert_eq!(result.issues.len(), 2); // price drift + unavailable

        // Reconciliation pulled the fresh price into the stored cart.
        let cart = state.carts.get("s1").unwrap();
        assert_eq!(cart.items[0].unit_price, dec!(40.00));
        assert!(!cart.items[0].is_available);
    }

    #[tokio::test]
    async fn clear_drops_the_cart() {
        let state = AppState::new(Arc::new(seeded_catalog()));
        mutate(&state, "s1", add(1, 1)).await.unwrap();

        let view = mutate(&state, "s1", CartOp::Clear).await.unwrap();
        assert!(view.items.is_empty());
        assert!(state.carts.get("s1").is_none());
    }
}
