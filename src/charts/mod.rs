//! Dashboard aggregation: turns the current work-order set into chart-ready
//! `(label, value)` series. Nothing here is persisted; series are recomputed
//! on demand from whatever record set the caller supplies.

use std::collections::HashMap;

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::domain::{TechnicalArea, WorkOrder};
use crate::ingest::sgz::normalizer::fold_text;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartPoint {
    pub label: String,
    pub value: f64,
}

/// A named `(label, value)` collection for one grouping dimension.
#[derive(Debug, Clone, Serialize)]
pub struct ChartSeries {
    pub name: &'static str,
    pub points: Vec<ChartPoint>,
}

impl ChartSeries {
    pub fn total(&self) -> f64 {
        self.points.iter().map(|point| point.value).sum()
    }
}

/// The full set of series the dashboards render.
#[derive(Debug, Clone, Serialize)]
pub struct DashboardCharts {
    pub by_status: ChartSeries,
    pub by_technical_area: ChartSeries,
    pub top_companies: ChartSeries,
    pub by_district: ChartSeries,
    pub avg_days_open_by_status: ChartSeries,
    pub opened_by_month: ChartSeries,
}

/// Optional record filters, ANDed: a record must satisfy every active one.
///
/// Status, company, and district values are accent/case folded on both sides
/// before comparison, the same folding ingestion applies to status codes, so
/// `"Concluída"` matches the stored `CONCLUIDA`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct WorkOrderFilter {
    #[serde(default)]
    pub statuses: Option<Vec<String>>,
    #[serde(default)]
    pub technical_areas: Option<Vec<Option<TechnicalArea>>>,
    #[serde(default)]
    pub companies: Option<Vec<String>>,
    #[serde(default)]
    pub districts: Option<Vec<String>>,
    #[serde(default)]
    pub opened_from: Option<NaiveDate>,
    #[serde(default)]
    pub opened_to: Option<NaiveDate>,
}

impl WorkOrderFilter {
    pub fn matches(&self, order: &WorkOrder) -> bool {
        if let Some(statuses) = &self.statuses {
            let status = fold_text(&order.status);
            if !statuses.iter().any(|candidate| fold_text(candidate) == status) {
                return false;
            }
        }

        if let Some(areas) = &self.technical_areas {
            if !areas.contains(&order.technical_area) {
                return false;
            }
        }

        if let Some(companies) = &self.companies {
            let matched = match &order.company {
                Some(company) => {
                    let company = fold_text(company);
                    companies.iter().any(|candidate| fold_text(candidate) == company)
                }
                None => false,
            };
            if !matched {
                return false;
            }
        }

        if let Some(districts) = &self.districts {
            let district = fold_text(&order.district);
            if !districts
                .iter()
                .any(|candidate| fold_text(candidate) == district)
            {
                return false;
            }
        }

        let opened = order.opened_at.date();
        if let Some(from) = self.opened_from {
            if opened < from {
                return false;
            }
        }
        if let Some(to) = self.opened_to {
            if opened > to {
                return false;
            }
        }

        true
    }
}

/// Counter that remembers the order labels were first seen in, so series keep
/// encounter order instead of hash order.
#[derive(Debug, Default)]
struct OrderedCounter {
    labels: Vec<String>,
    values: HashMap<String, f64>,
}

impl OrderedCounter {
    fn add(&mut self, label: &str, amount: f64) {
        match self.values.get_mut(label) {
            Some(value) => *value += amount,
            None => {
                self.labels.push(label.to_string());
                self.values.insert(label.to_string(), amount);
            }
        }
    }

    fn into_series(self, name: &'static str) -> ChartSeries {
        let points = self
            .labels
            .into_iter()
            .map(|label| {
                let value = self.values[&label];
                ChartPoint { label, value }
            })
            .collect();
        ChartSeries { name, points }
    }
}

/// Build every dashboard series from the given record set in one pass.
///
/// Empty input (or input the filter removes entirely) yields well-formed
/// empty series so a "no data" state renders without special cases.
pub fn build_dashboard(
    orders: &[WorkOrder],
    filter: &WorkOrderFilter,
    top_companies: usize,
) -> DashboardCharts {
    let mut by_status = OrderedCounter::default();
    let mut by_area = OrderedCounter::default();
    let mut completed_by_company = OrderedCounter::default();
    let mut by_district = OrderedCounter::default();
    let mut by_month = OrderedCounter::default();
    let mut days_sum: HashMap<String, f64> = HashMap::new();
    let mut days_count: HashMap<String, usize> = HashMap::new();
    let mut status_order: Vec<String> = Vec::new();

    for order in orders.iter().filter(|order| filter.matches(order)) {
        by_status.add(&order.status, 1.0);

        let area_label = match order.technical_area {
            Some(area) => area.label(),
            None => TechnicalArea::UNCLASSIFIED_LABEL,
        };
        by_area.add(area_label, 1.0);

        if order.is_completed() {
            if let Some(company) = &order.company {
                completed_by_company.add(company, 1.0);
            }
        }

        by_district.add(&order.district, 1.0);

        by_month.add(
            &format!("{:04}-{:02}", order.opened_at.year(), order.opened_at.month()),
            1.0,
        );

        if !days_sum.contains_key(&order.status) {
            status_order.push(order.status.clone());
        }
        *days_sum.entry(order.status.clone()).or_insert(0.0) += order.days_open as f64;
        *days_count.entry(order.status.clone()).or_insert(0) += 1;
    }

    // Averages are a final division pass over accumulated sums and counts.
    let avg_points = status_order
        .into_iter()
        .map(|status| {
            let sum = days_sum[&status];
            let count = days_count[&status] as f64;
            ChartPoint {
                label: status,
                value: sum / count,
            }
        })
        .collect();

    // Completed-count ranking, descending; the stable sort keeps ties in
    // first-encounter order.
    let mut company_points = completed_by_company
        .into_series("top_companies_by_completed")
        .points;
    company_points.sort_by(|a, b| b.value.partial_cmp(&a.value).unwrap_or(std::cmp::Ordering::Equal));
    company_points.truncate(top_companies);

    // Month buckets read chronologically, not in encounter order.
    let mut month_series = by_month.into_series("opened_by_month");
    month_series.points.sort_by(|a, b| a.label.cmp(&b.label));

    DashboardCharts {
        by_status: by_status.into_series("count_by_status"),
        by_technical_area: by_area.into_series("count_by_technical_area"),
        top_companies: ChartSeries {
            name: "top_companies_by_completed",
            points: company_points,
        },
        by_district: by_district.into_series("count_by_district"),
        avg_days_open_by_status: ChartSeries {
            name: "avg_days_open_by_status",
            points: avg_points,
        },
        opened_by_month: month_series,
    }
}
