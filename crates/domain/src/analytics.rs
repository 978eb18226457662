//! Sales reporting over successfully paid orders.

use std::cmp::Reverse;
use std::collections::{BTreeMap, HashMap};

use chrono::NaiveDate;
use common::{BranchId, Money, ProductId};
use serde::Serialize;
use store::{DateRange, Order, Store};

use crate::error::Result;

/// Number of rows the ranking reports return unless told otherwise.
pub const DEFAULT_REPORT_LIMIT: usize = 10;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SalesSummary {
    pub total_sales: Money,
    pub total_orders: u64,
    pub average_order_value: Money,
    pub revenue_by_date: Vec<DailyRevenue>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyRevenue {
    pub date: NaiveDate,
    pub revenue: Money,
    pub orders: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductSales {
    pub product_id: ProductId,
    pub product_name: String,
    pub total_quantity: u64,
    pub total_revenue: Money,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BranchPerformance {
    pub branch_id: BranchId,
    pub branch_name: String,
    pub total_orders: u64,
    pub total_revenue: Money,
}

fn summarize(orders: &[Order]) -> SalesSummary {
    let total_sales: Money = orders.iter().map(|o| o.total_amount).sum();
    let total_orders = orders.len() as u64;
    let average_order_value = if total_orders == 0 {
        Money::zero()
    } else {
        Money::from_amount(total_sales.amount() / total_orders as i64)
    };

    let mut daily: BTreeMap<NaiveDate, (Money, u64)> = BTreeMap::new();
    for order in orders {
        let entry = daily
            .entry(order.created_at.date_naive())
            .or_insert((Money::zero(), 0));
        entry.0 += order.total_amount;
        entry.1 += 1;
    }

    SalesSummary {
        total_sales,
        total_orders,
        average_order_value,
        revenue_by_date: daily
            .into_iter()
            .map(|(date, (revenue, orders))| DailyRevenue {
                date,
                revenue,
                orders,
            })
            .collect(),
    }
}

fn rank_products(orders: &[Order], limit: usize) -> Vec<ProductSales> {
    let mut totals: HashMap<ProductId, ProductSales> = HashMap::new();
    for line in orders.iter().flat_map(|o| &o.items) {
        let entry = totals.entry(line.product_id).or_insert_with(|| ProductSales {
            product_id: line.product_id,
            product_name: line.name.clone(),
            total_quantity: 0,
            total_revenue: Money::zero(),
        });
        entry.total_quantity += u64::from(line.quantity);
        entry.total_revenue += line.total_price();
    }

    let mut ranked: Vec<_> = totals.into_values().collect();
    ranked.sort_by_key(|p| (Reverse(p.total_quantity), Reverse(p.total_revenue), p.product_id));
    ranked.truncate(limit);
    ranked
}

fn rank_branches(orders: &[Order], limit: usize) -> Vec<BranchPerformance> {
    let mut totals: HashMap<BranchId, BranchPerformance> = HashMap::new();
    for order in orders {
        let entry = totals
            .entry(order.branch_id)
            .or_insert_with(|| BranchPerformance {
                branch_id: order.branch_id,
                branch_name: order.branch_name.clone(),
                total_orders: 0,
                total_revenue: Money::zero(),
            });
        entry.total_orders += 1;
        entry.total_revenue += order.total_amount;
    }

    let mut ranked: Vec<_> = totals.into_values().collect();
    ranked.sort_by_key(|b| (Reverse(b.total_revenue), Reverse(b.total_orders), b.branch_id));
    ranked.truncate(limit);
    ranked
}

/// Reports for the admin dashboard.
pub struct AnalyticsService<S: Store> {
    store: S,
}

impl<S: Store> AnalyticsService<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    #[tracing::instrument(skip(self))]
    pub async fn sales(&self, range: DateRange) -> Result<SalesSummary> {
        let orders = self.store.successful_orders(range).await?;
        Ok(summarize(&orders))
    }

    /// Best sellers by quantity.
    #[tracing::instrument(skip(self))]
    pub async fn top_products(
        &self,
        range: DateRange,
        limit: Option<usize>,
    ) -> Result<Vec<ProductSales>> {
        let orders = self.store.successful_orders(range).await?;
        Ok(rank_products(&orders, limit.unwrap_or(DEFAULT_REPORT_LIMIT)))
    }

    /// Branches by revenue.
    #[tracing::instrument(skip(self))]
    pub async fn branch_performance(
        &self,
        range: DateRange,
        limit: Option<usize>,
    ) -> Result<Vec<BranchPerformance>> {
        let orders = self.store.successful_orders(range).await?;
        Ok(rank_branches(&orders, limit.unwrap_or(DEFAULT_REPORT_LIMIT)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use common::{OrderId, UserId};
    use store::{OrderLine, OrderStatus, PaymentDetails, PaymentMethod, PaymentStatus};

    fn line(product_id: ProductId, name: &str, price: i64, quantity: u32) -> OrderLine {
        OrderLine {
            product_id,
            name: name.into(),
            unit_price: Money::from_amount(price),
            quantity,
        }
    }

    fn order(branch: (BranchId, &str), day: u32, items: Vec<OrderLine>) -> Order {
        let created = Utc.with_ymd_and_hms(2024, 3, day, 9, 30, 0).unwrap();
        Order {
            id: OrderId::new(),
            order_number: format!("ORDER-{day}-{}", items.len()),
            user_id: UserId::new(),
            branch_id: branch.0,
            branch_name: branch.1.into(),
            total_amount: items.iter().map(OrderLine::total_price).sum(),
            items,
            status: OrderStatus::Processing,
            payment_method: PaymentMethod::Cash,
            payment_status: PaymentStatus::Success,
            payment_details: PaymentDetails::default(),
            created_at: created,
            updated_at: created,
        }
    }

    #[test]
    fn empty_summary_has_zero_average() {
        let summary = summarize(&[]);
        assert_eq!(summary.total_orders, 0);
        assert_eq!(summary.total_sales, Money::zero());
        assert_eq!(summary.average_order_value, Money::zero());
        assert!(summary.revenue_by_date.is_empty());
    }

    #[test]
    fn summary_buckets_revenue_by_day() {
        let branch = (BranchId::new(), "Monas");
        let latte = ProductId::new();
        let orders = vec![
            order(branch, 1, vec![line(latte, "Latte", 30_000, 2)]),
            order(branch, 1, vec![line(latte, "Latte", 30_000, 1)]),
            order(branch, 2, vec![line(latte, "Latte", 30_000, 3)]),
        ];

        let summary = summarize(&orders);
        assert_eq!(summary.total_sales, Money::from_amount(180_000));
        assert_eq!(summary.total_orders, 3);
        assert_eq!(summary.average_order_value, Money::from_amount(60_000));
        assert_eq!(summary.revenue_by_date.len(), 2);
        assert_eq!(summary.revenue_by_date[0].revenue, Money::from_amount(90_000));
        assert_eq!(summary.revenue_by_date[0].orders, 2);
        assert_eq!(summary.revenue_by_date[1].date.to_string(), "2024-03-02");
    }

    #[test]
    fn products_rank_by_quantity() {
        let branch = (BranchId::new(), "Monas");
        let latte = ProductId::new();
        let croissant = ProductId::new();
        let orders = vec![
            order(
                branch,
                1,
                vec![line(latte, "Latte", 30_000, 1), line(croissant, "Croissant", 25_000, 4)],
            ),
            order(branch, 2, vec![line(latte, "Latte", 30_000, 2)]),
        ];

        let ranked = rank_products(&orders, 10);
        assert_eq!(ranked[0].product_name, "Croissant");
        assert_eq!(ranked[0].total_quantity, 4);
        assert_eq!(ranked[1].total_revenue, Money::from_amount(90_000));

        assert_eq!(rank_products(&orders, 1).len(), 1);
    }

    #[test]
    fn branches_rank_by_revenue() {
        let monas = (BranchId::new(), "Monas");
        let braga = (BranchId::new(), "Braga");
        let latte = ProductId::new();
        let orders = vec![
            order(monas, 1, vec![line(latte, "Latte", 30_000, 1)]),
            order(monas, 1, vec![line(latte, "Latte", 30_000, 1)]),
            order(braga, 1, vec![line(latte, "Latte", 30_000, 5)]),
        ];

        let ranked = rank_branches(&orders, 10);
        assert_eq!(ranked[0].branch_name, "Braga");
        assert_eq!(ranked[0].total_orders, 1);
        assert_eq!(ranked[1].total_orders, 2);
        assert_eq!(ranked[1].total_revenue, Money::from_amount(60_000));
    }
}
