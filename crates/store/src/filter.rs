use chrono::{DateTime, NaiveDate, NaiveTime, TimeDelta, Utc};
use common::{OrderStatus, UserId};

use crate::Order;

/// Filter for listing orders.
///
/// All supplied criteria must match. The date criterion matches every order
/// placed during that UTC calendar day, not an exact timestamp.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OrderFilter {
    /// Filter by client.
    pub client_id: Option<UserId>,

    /// Filter by the calendar day the order was placed.
    pub date: Option<NaiveDate>,

    /// Filter by status.
    pub status: Option<OrderStatus>,
}

impl OrderFilter {
    /// Creates a filter that matches every order.
    pub fn new() -> Self {
        Self::default()
    }

    /// Filters by client.
    pub fn client_id(mut self, client_id: UserId) -> Self {
        self.client_id = Some(client_id);
        self
    }

    /// Filters by placement day.
    pub fn date(mut self, date: NaiveDate) -> Self {
        self.date = Some(date);
        self
    }

    /// Filters by status.
    pub fn status(mut self, status: OrderStatus) -> Self {
        self.status = Some(status);
        self
    }

    /// Returns `[start, end)` of the filtered day, if a date is set.
    ///
    /// `end` is `None` only for the last representable day.
    pub fn day_bounds(&self) -> Option<(DateTime<Utc>, Option<DateTime<Utc>>)> {
        self.date.map(|date| {
            let start = date.and_time(NaiveTime::MIN).and_utc();
            let end = start.checked_add_signed(TimeDelta::days(1));
            (start, end)
        })
    }

    /// Checks an order against every supplied criterion.
    pub fn matches(&self, order: &Order) -> bool {
        if let Some(client_id) = self.client_id
            && order.client_id != client_id
        {
            return false;
        }
        if let Some(status) = self.status
            && order.status != status
        {
            return false;
        }
        if let Some((start, end)) = self.day_bounds() {
            if order.date_placed < start {
                return false;
            }
            if let Some(end) = end
                && order.date_placed >= end
            {
                return false;
            }
        }
        true
    }
}
