//! Order line reconciliation.
//!
//! Both order creation and line-set updates go through [`reconcile`]: the
//! previous lines are discarded wholesale, the requested lines become the
//! new set, and the total is recomputed from the current catalog prices.
//! Backends call it inside their unit of work, after fetching prices with an
//! explicit lookup on the requested product ids.

use std::collections::{BTreeMap, HashMap};

use common::{Money, OrderId, ProductId};

use crate::{LineRequest, OrderLine, Result, StoreError};

/// Outcome of replacing an order's line set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reconciliation {
    /// The new line set, one line per product, ordered by product id.
    pub lines: Vec<OrderLine>,
    /// Sum of `price * quantity` over lines whose product exists.
    pub total: Money,
    /// Lines whose product was not found and were priced at zero.
    pub unpriced: Vec<ProductId>,
}

/// Distinct product ids referenced by a request, in ascending order.
///
/// This is the set a backend must price before calling [`reconcile`].
pub fn requested_product_ids(requested: &[LineRequest]) -> Vec<ProductId> {
    let mut ids: Vec<ProductId> = requested.iter().map(|line| line.product_id).collect();
    ids.sort_unstable();
    ids.dedup();
    ids
}

/// Builds the new line set for `order_id` and prices it.
///
/// A product requested more than once keeps only its last quantity. A
/// product missing from `prices` still gets its line but contributes zero.
///
/// Fails with [`StoreError::AmountOverflow`] when a line amount or the total
/// leaves the money range; nothing is written in that case.
pub fn reconcile(
    order_id: OrderId,
    requested: &[LineRequest],
    prices: &HashMap<ProductId, Money>,
) -> Result<Reconciliation> {
    let mut collapsed: BTreeMap<ProductId, u32> = BTreeMap::new();
    for line in requested {
        collapsed.insert(line.product_id, line.quantity);
    }

    let overflow = || StoreError::AmountOverflow { order_id };
    let mut total = Money::zero();
    let mut unpriced = Vec::new();
    let mut lines = Vec::with_capacity(collapsed.len());
    for (product_id, quantity) in collapsed {
        match prices.get(&product_id) {
            Some(price) => {
                let amount = price.checked_multiply(quantity).ok_or_else(overflow)?;
                total = total.checked_add(amount).ok_or_else(overflow)?;
            }
            None => unpriced.push(product_id),
        }
        lines.push(OrderLine {
            order_id,
            product_id,
            quantity,
        });
    }

    if !unpriced.is_empty() {
        metrics::counter!("order_lines_unpriced_total").increment(unpriced.len() as u64);
        tracing::warn!(%order_id, ?unpriced, "order lines reference unknown products, priced at zero");
    }

    Ok(Reconciliation {
        lines,
        total,
        unpriced,
    })
}
