use crate::models::{MetricSeries, RankedEntry};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Order {
    Largest,
    Smallest,
}

/// The `n` entities with the largest or smallest values. Ties keep series
/// order; asking for more than the series holds returns all of it.
pub fn select(series: &MetricSeries, n: usize, order: Order) -> Vec<RankedEntry> {
    let mut ranked: Vec<&(_, f64)> = series.entries().iter().collect();
    // sort_by is stable
    ranked.sort_by(|a, b| match order {
        Order::Largest => b.1.total_cmp(&a.1),
        Order::Smallest => a.1.total_cmp(&b.1),
    });

    ranked
        .into_iter()
        .take(n)
        .map(|(key, value)| RankedEntry {
            entity: key.to_string(),
            value: *value,
        })
        .collect()
}

pub fn top_n(series: &MetricSeries, n: usize) -> Vec<RankedEntry> {
    select(series, n, Order::Largest)
}

pub fn bottom_n(series: &MetricSeries, n: usize) -> Vec<RankedEntry> {
    select(series, n, Order::Smallest)
}
