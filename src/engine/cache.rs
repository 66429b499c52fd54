//! In-memory order cache with single-writer discipline.
//!
//! The cache owns every [`Order`] record exclusively. The connection
//! supervisor is the only writer; readers get cloned snapshots and never
//! observe a partially-applied bulk replace.

use std::collections::HashMap;

use parking_lot::RwLock;

use crate::domain::{DealMetrics, LedgerEvent, Order, OrderId, OrderStatus};

/// The cache transition produced by applying one ledger event.
///
/// Carries the post-transition order so the caller can attach metrics and
/// publish without re-reading the cache.
#[derive(Debug, Clone)]
pub enum CacheChange {
    Created(Order),
    Filled(Order),
    Canceled(Order),
    Removed(OrderId),
    Retried { old_id: OrderId, order: Order },
}

/// Authoritative in-memory mapping of order id to order record.
pub struct OrderCache {
    orders: RwLock<HashMap<OrderId, Order>>,
}

impl OrderCache {
    #[must_use]
    pub fn new() -> Self {
        Self {
            orders: RwLock::new(HashMap::new()),
        }
    }

    /// Atomically discard the prior snapshot and install a new one.
    ///
    /// Readers see either the old snapshot or the new one, never a mix.
    pub fn replace_all(&self, orders: Vec<Order>) {
        let map: HashMap<OrderId, Order> = orders.into_iter().map(|o| (o.id, o)).collect();
        *self.orders.write() = map;
    }

    /// Apply one ledger event as a pure cache transition.
    ///
    /// Unknown ids and stale transitions resolve as no-ops (`None`):
    /// duplicate creations are ignored, and fill/cancel events only apply to
    /// orders that are still active. `Disconnected` is not a cache event.
    pub fn apply(&self, event: LedgerEvent) -> Option<CacheChange> {
        let mut orders = self.orders.write();
        match event {
            LedgerEvent::Created(record) => {
                let id = OrderId::new(record.id);
                if orders.contains_key(&id) {
                    return None;
                }
                let order = Order::from_record(record, OrderStatus::Active);
                orders.insert(id, order.clone());
                Some(CacheChange::Created(order))
            }
            LedgerEvent::Filled(id) => {
                let order = orders.get_mut(&id)?;
                if order.status != OrderStatus::Active {
                    return None;
                }
                order.status = OrderStatus::Filled;
                Some(CacheChange::Filled(order.clone()))
            }
            LedgerEvent::Canceled(id) => {
                let order = orders.get_mut(&id)?;
                if order.status != OrderStatus::Active {
                    return None;
                }
                order.status = OrderStatus::Canceled;
                Some(CacheChange::Canceled(order.clone()))
            }
            LedgerEvent::CleanedUp(id) => {
                orders.remove(&id)?;
                Some(CacheChange::Removed(id))
            }
            LedgerEvent::Retried {
                old_id,
                new_id,
                retry_count,
                created_at,
            } => {
                let old = orders.remove(&old_id)?;
                let order = old.reissued(new_id, retry_count, created_at);
                orders.insert(new_id, order.clone());
                Some(CacheChange::Retried { old_id, order })
            }
            LedgerEvent::Disconnected { .. } => None,
        }
    }

    /// Look up a single order.
    #[must_use]
    pub fn get(&self, id: OrderId) -> Option<Order> {
        self.orders.read().get(&id).cloned()
    }

    /// Snapshot of all orders, optionally filtered by status, in id order.
    #[must_use]
    pub fn list(&self, filter: Option<OrderStatus>) -> Vec<Order> {
        let orders = self.orders.read();
        let mut result: Vec<Order> = orders
            .values()
            .filter(|o| filter.map_or(true, |s| o.status == s))
            .cloned()
            .collect();
        result.sort_by_key(|o| o.id);
        result
    }

    /// Bulk delete, for consumers confirming several cleanups in one ledger
    /// transaction. Returns how many entries were actually removed.
    pub fn remove(&self, ids: &[OrderId]) -> usize {
        let mut orders = self.orders.write();
        ids.iter().filter(|id| orders.remove(id).is_some()).count()
    }

    /// Attach freshly computed deal metrics to one order.
    pub fn set_deal_metrics(&self, id: OrderId, metrics: DealMetrics) -> bool {
        match self.orders.write().get_mut(&id) {
            Some(order) => {
                order.deal_metrics = Some(metrics);
                true
            }
            None => false,
        }
    }

    /// Recompute the metrics attachment for every order under one write
    /// lock. Returns the number of orders touched.
    pub fn recompute_metrics<F>(&self, compute: F) -> usize
    where
        F: Fn(&Order) -> Option<DealMetrics>,
    {
        let mut orders = self.orders.write();
        let mut touched = 0;
        for order in orders.values_mut() {
            if let Some(metrics) = compute(order) {
                order.deal_metrics = Some(metrics);
                touched += 1;
            }
        }
        touched
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.orders.read().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for OrderCache {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Address, RawOrderRecord, TokenId};

    fn record(id: u64) -> RawOrderRecord {
        RawOrderRecord {
            id,
            maker: Address::new("0xmaker1"),
            taker: Address::zero(),
            sell_token: TokenId::new("0xsell"),
            buy_token: TokenId::new("0xbuy"),
            sell_amount: 100,
            buy_amount: 200,
            created_at: 1_000,
            status_code: 0,
            retry_count: 0,
            creation_fee: 1,
        }
    }

    fn cache_with(ids: &[u64]) -> OrderCache {
        let cache = OrderCache::new();
        for &id in ids {
            cache.apply(LedgerEvent::Created(record(id)));
        }
        cache
    }

    #[test]
    fn created_inserts_active_order() {
        let cache = cache_with(&[7]);
        let order = cache.get(OrderId::new(7)).unwrap();
        assert_eq!(order.status, OrderStatus::Active);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn duplicate_creation_is_idempotent() {
        let cache = cache_with(&[7]);
        let before = cache.list(None);
        assert!(cache.apply(LedgerEvent::Created(record(7))).is_none());
        assert_eq!(cache.list(None), before);
    }

    #[test]
    fn fill_transitions_active_order() {
        let cache = cache_with(&[3]);
        let change = cache.apply(LedgerEvent::Filled(OrderId::new(3)));
        assert!(matches!(change, Some(CacheChange::Filled(_))));
        assert_eq!(
            cache.get(OrderId::new(3)).unwrap().status,
            OrderStatus::Filled
        );
    }

    #[test]
    fn fill_of_unknown_order_is_noop() {
        let cache = cache_with(&[]);
        assert!(cache.apply(LedgerEvent::Filled(OrderId::new(9))).is_none());
    }

    #[test]
    fn late_fill_on_canceled_order_is_rejected() {
        let cache = cache_with(&[7]);
        cache.apply(LedgerEvent::Canceled(OrderId::new(7)));
        // Malformed/late fill must not reverse the terminal status.
        assert!(cache.apply(LedgerEvent::Filled(OrderId::new(7))).is_none());
        assert_eq!(
            cache.get(OrderId::new(7)).unwrap().status,
            OrderStatus::Canceled
        );
    }

    #[test]
    fn cleanup_removes_entry_entirely() {
        let cache = cache_with(&[1, 2]);
        let change = cache.apply(LedgerEvent::CleanedUp(OrderId::new(1)));
        assert!(matches!(change, Some(CacheChange::Removed(id)) if id == OrderId::new(1)));
        assert!(cache.get(OrderId::new(1)).is_none());
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn retry_swaps_ids_atomically() {
        let cache = cache_with(&[3]);
        let change = cache.apply(LedgerEvent::Retried {
            old_id: OrderId::new(3),
            new_id: OrderId::new(9),
            retry_count: 1,
            created_at: 2_000,
        });
        assert!(matches!(change, Some(CacheChange::Retried { .. })));
        assert!(cache.get(OrderId::new(3)).is_none());

        let reissued = cache.get(OrderId::new(9)).unwrap();
        assert_eq!(reissued.retry_count, 1);
        assert_eq!(reissued.created_at, 2_000);
        assert_eq!(reissued.maker, Address::new("0xmaker1"));
        assert_eq!(reissued.sell_amount, 100);
        assert_eq!(reissued.buy_amount, 200);
    }

    #[test]
    fn retry_of_unknown_order_is_noop() {
        let cache = cache_with(&[]);
        let change = cache.apply(LedgerEvent::Retried {
            old_id: OrderId::new(3),
            new_id: OrderId::new(9),
            retry_count: 1,
            created_at: 2_000,
        });
        assert!(change.is_none());
        assert!(cache.is_empty());
    }

    #[test]
    fn replace_all_swaps_the_snapshot() {
        let cache = cache_with(&[1, 2, 3]);
        let fresh = vec![
            Order::from_record(record(10), OrderStatus::Active),
            Order::from_record(record(11), OrderStatus::Filled),
        ];
        cache.replace_all(fresh);

        assert_eq!(cache.len(), 2);
        assert!(cache.get(OrderId::new(1)).is_none());
        assert!(cache.get(OrderId::new(10)).is_some());
    }

    #[test]
    fn list_filters_by_status_in_id_order() {
        let cache = cache_with(&[5, 1, 3]);
        cache.apply(LedgerEvent::Filled(OrderId::new(3)));

        let all: Vec<u64> = cache.list(None).iter().map(|o| o.id.value()).collect();
        assert_eq!(all, vec![1, 3, 5]);

        let active: Vec<u64> = cache
            .list(Some(OrderStatus::Active))
            .iter()
            .map(|o| o.id.value())
            .collect();
        assert_eq!(active, vec![1, 5]);
    }

    #[test]
    fn bulk_remove_counts_hits_only() {
        let cache = cache_with(&[1, 2]);
        let removed = cache.remove(&[OrderId::new(1), OrderId::new(7)]);
        assert_eq!(removed, 1);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn status_stays_within_known_states_under_event_mix() {
        let cache = cache_with(&[0, 1, 2]);
        let events = vec![
            LedgerEvent::Filled(OrderId::new(0)),
            LedgerEvent::Canceled(OrderId::new(0)),
            LedgerEvent::CleanedUp(OrderId::new(1)),
            LedgerEvent::Filled(OrderId::new(1)),
            LedgerEvent::Retried {
                old_id: OrderId::new(2),
                new_id: OrderId::new(5),
                retry_count: 1,
                created_at: 3_000,
            },
            LedgerEvent::Canceled(OrderId::new(2)),
        ];
        for event in events {
            cache.apply(event);
        }

        // Removed ids never reappear.
        assert!(cache.get(OrderId::new(1)).is_none());
        assert!(cache.get(OrderId::new(2)).is_none());
        // The first terminal transition wins.
        assert_eq!(
            cache.get(OrderId::new(0)).unwrap().status,
            OrderStatus::Filled
        );
        assert_eq!(
            cache.get(OrderId::new(5)).unwrap().status,
            OrderStatus::Active
        );
    }
}
