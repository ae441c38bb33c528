//! Chart model for the metrics browser.
//!
//! Turns a standardized, timestamped table plus the current selections into
//! the list of charts to draw. Nothing here touches the terminal; `ui`
//! renders the `ChartSpec`s produced by [`MetricsDashboard::charts`].

use anyhow::Context;
use chrono::NaiveDateTime;
use tracing::warn;

use crate::error::{Result, TableError};
use crate::standardize::ColumnMap;
use crate::table::DataTable;
use crate::taxonomy::MetricTaxonomy;

/// Inclusive time interval.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeRange {
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
}

impl TimeRange {
    pub fn new(start: NaiveDateTime, end: NaiveDateTime) -> Self {
        Self { start, end }
    }
}

/// Which of the two display columns a chart is placed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChartColumn {
    Left,
    Right,
}

impl ChartColumn {
    fn toggle(self) -> Self {
        match self {
            Self::Left => Self::Right,
            Self::Right => Self::Left,
        }
    }
}

/// One line on a chart. `x` is seconds since the Unix epoch.
#[derive(Debug, Clone, PartialEq)]
pub struct Series {
    pub metric: String,
    pub label: String,
    pub points: Vec<(f64, f64)>,
}

/// A chart for one taxonomy subgroup.
#[derive(Debug, Clone, PartialEq)]
pub struct ChartSpec {
    /// Comma-joined names of the metrics present; empty if none are.
    pub title: String,
    pub column: ChartColumn,
    pub series: Vec<Series>,
}

impl ChartSpec {
    /// Bounds over every point as `([x_min, x_max], [y_min, y_max])`.
    pub fn bounds(&self) -> Option<([f64; 2], [f64; 2])> {
        let mut points = self.series.iter().flat_map(|s| s.points.iter());
        let first = points.next()?;
        let init = ([first.0, first.0], [first.1, first.1]);

        Some(points.fold(init, |([x0, x1], [y0, y1]), (x, y)| {
            ([x0.min(*x), x1.max(*x)], [y0.min(*y), y1.max(*y)])
        }))
    }
}

/// The metrics browser over one standardized dataset.
pub struct MetricsDashboard {
    table: DataTable,
    timestamp_column: String,
    taxonomy: MetricTaxonomy,
    column_map: ColumnMap,
    /// Distinct timestamps in ascending order; the range selector's stops.
    stops: Vec<NaiveDateTime>,
}

impl MetricsDashboard {
    /// Builds the dashboard. `table` must already be standardized and carry a
    /// parsed `timestamp_column`.
    pub fn new(
        table: DataTable,
        timestamp_column: &str,
        taxonomy: MetricTaxonomy,
        column_map: ColumnMap,
    ) -> Result<Self> {
        let mut stops = table
            .timestamps(timestamp_column)
            .context("Dashboard data needs a timestamp column")?
            .to_vec();
        stops.sort_unstable();
        stops.dedup();

        Ok(Self {
            table,
            timestamp_column: timestamp_column.to_string(),
            taxonomy,
            column_map,
            stops,
        })
    }

    pub fn taxonomy(&self) -> &MetricTaxonomy {
        &self.taxonomy
    }

    pub fn table(&self) -> &DataTable {
        &self.table
    }

    /// Distinct timestamps, ascending.
    pub fn time_stops(&self) -> &[NaiveDateTime] {
        &self.stops
    }

    /// The dataset's full time range, or `None` when it has no rows.
    pub fn full_range(&self) -> Option<TimeRange> {
        let start = self.stops.first()?;
        let end = self.stops.last()?;
        Some(TimeRange::new(*start, *end))
    }

    /// Rows whose timestamp falls within `range`.
    pub fn filtered(&self, range: &TimeRange) -> std::result::Result<DataTable, TableError> {
        self.table
            .filter_time_range(&self.timestamp_column, range.start, range.end)
    }

    /// Metrics of `category` that are present but hold non-numeric values.
    pub fn unplottable(&self, category: &str) -> Vec<String> {
        let Some(category) = self.taxonomy.category(category) else {
            return Vec::new();
        };
        category
            .subgroups
            .iter()
            .flatten()
            .filter(|m| self.table.has_column(m) && self.table.numeric(m).is_err())
            .cloned()
            .collect()
    }

    /// Charts for `category` over `range`, in taxonomy order, alternating
    /// between the left and right column. Unknown categories yield no charts.
    /// Non-numeric metrics are left out of their chart.
    pub fn charts(&self, category: &str, range: &TimeRange) -> Result<Vec<ChartSpec>> {
        let Some(category) = self.taxonomy.category(category) else {
            return Ok(Vec::new());
        };

        let filtered = self.filtered(range)?;
        let xs: Vec<f64> = filtered
            .timestamps(&self.timestamp_column)?
            .iter()
            .map(|ts| ts.and_utc().timestamp() as f64)
            .collect();

        let mut charts = Vec::with_capacity(category.subgroups.len());
        let mut column = ChartColumn::Left;

        for subgroup in &category.subgroups {
            let mut series = Vec::new();
            for metric in subgroup.iter().filter(|m| filtered.has_column(m)) {
                let values = match filtered.numeric(metric) {
                    Ok(values) => values,
                    Err(e) => {
                        warn!("Skipping metric '{}': {}", metric, e);
                        continue;
                    }
                };

                let points = xs
                    .iter()
                    .zip(values)
                    .filter(|(_, y)| y.is_finite())
                    .map(|(x, y)| (*x, *y))
                    .collect();

                series.push(Series {
                    metric: metric.clone(),
                    label: format!("{} ({})", metric, self.column_map.unit_for(metric)),
                    points,
                });
            }

            let title = series
                .iter()
                .map(|s| s.metric.as_str())
                .collect::<Vec<_>>()
                .join(", ");

            charts.push(ChartSpec {
                title,
                column,
                series,
            });
            column = column.toggle();
        }

        Ok(charts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::parse_timestamp;

    const RAW: &str = "\
timestamp,ifInOctets11,ifOutOctets11
2024-03-01 12:00:00,100,50
2024-03-01 12:05:00,200,75
2024-03-01 12:10:00,300,
";

    fn dashboard() -> MetricsDashboard {
        let map = ColumnMap::snmp();
        let mut table = DataTable::from_reader(RAW.as_bytes(), Some("timestamp")).unwrap();
        map.standardize(&mut table);
        MetricsDashboard::new(table, "timestamp", MetricTaxonomy::snmp(), map).unwrap()
    }

    fn ts(s: &str) -> NaiveDateTime {
        parse_timestamp(s).unwrap()
    }

    #[test]
    fn test_network_scenario() {
        let dash = dashboard();
        assert_eq!(dash.table().column_names(), ["timestamp", "RxBytes", "TxBytes"]);

        let range = dash.full_range().unwrap();
        let charts = dash.charts("Network", &range).unwrap();

        assert_eq!(charts.len(), 4);
        assert_eq!(charts[0].title, "RxBytes, TxBytes");
        let labels: Vec<_> = charts[0].series.iter().map(|s| s.label.as_str()).collect();
        assert_eq!(labels, ["RxBytes (bps)", "TxBytes (bps)"]);

        assert_eq!(charts[0].series[0].points.len(), 3);
        // NaN cell is not plotted
        assert_eq!(charts[0].series[1].points.len(), 2);
    }

    #[test]
    fn test_absent_subgroups_render_empty() {
        let dash = dashboard();
        let range = dash.full_range().unwrap();
        let charts = dash.charts("Network", &range).unwrap();

        for chart in &charts[1..] {
            assert_eq!(chart.title, "");
            assert!(chart.series.is_empty());
            assert!(chart.bounds().is_none());
        }
    }

    #[test]
    fn test_charts_alternate_columns() {
        let dash = dashboard();
        let range = dash.full_range().unwrap();
        let columns: Vec<_> = dash
            .charts("TCP", &range)
            .unwrap()
            .iter()
            .map(|c| c.column)
            .collect();

        assert_eq!(
            columns,
            [
                ChartColumn::Left,
                ChartColumn::Right,
                ChartColumn::Left,
                ChartColumn::Right,
                ChartColumn::Left
            ]
        );
    }

    #[test]
    fn test_sub_range_is_inclusive() {
        let dash = dashboard();
        let range = TimeRange::new(ts("2024-03-01 12:05:00"), ts("2024-03-01 12:10:00"));

        assert_eq!(dash.filtered(&range).unwrap().num_rows(), 2);

        let charts = dash.charts("Network", &range).unwrap();
        let xs: Vec<f64> = charts[0].series[0].points.iter().map(|p| p.0).collect();
        assert_eq!(
            xs,
            [
                ts("2024-03-01 12:05:00").and_utc().timestamp() as f64,
                ts("2024-03-01 12:10:00").and_utc().timestamp() as f64
            ]
        );
    }

    #[test]
    fn test_full_range_keeps_all_rows() {
        let dash = dashboard();
        let range = dash.full_range().unwrap();
        assert_eq!(dash.filtered(&range).unwrap().num_rows(), 3);
        assert_eq!(dash.time_stops().len(), 3);
    }

    #[test]
    fn test_chart_bounds() {
        let dash = dashboard();
        let range = dash.full_range().unwrap();
        let charts = dash.charts("Network", &range).unwrap();

        let ([x0, x1], [y0, y1]) = charts[0].bounds().unwrap();
        assert_eq!(x1 - x0, 600.0);
        assert_eq!(y0, 50.0);
        assert_eq!(y1, 300.0);
    }

    #[test]
    fn test_text_metric_is_skipped() {
        let raw = "\
timestamp,ifInOctets11,ifOutOctets11,ifInDiscards11,ifoutDiscards11
2024-03-01 12:00:00,100,50,n/a,1
2024-03-01 12:05:00,200,75,n/a,2
";
        let map = ColumnMap::snmp();
        let mut table = DataTable::from_reader(raw.as_bytes(), Some("timestamp")).unwrap();
        map.standardize(&mut table);
        let dash = MetricsDashboard::new(table, "timestamp", MetricTaxonomy::snmp(), map).unwrap();

        let range = dash.full_range().unwrap();
        let charts = dash.charts("Network", &range).unwrap();

        assert_eq!(charts[0].title, "RxBytes, TxBytes");
        assert_eq!(charts[1].title, "TxDiscards");
        assert_eq!(charts[1].series[0].points.len(), 2);
        assert_eq!(dash.unplottable("Network"), ["RxDiscards"]);
        assert!(dash.unplottable("TCP").is_empty());
    }

    #[test]
    fn test_unknown_category_has_no_charts() {
        let dash = dashboard();
        let range = dash.full_range().unwrap();
        assert!(dash.charts("BGP", &range).unwrap().is_empty());
    }

    #[test]
    fn test_requires_timestamp_column() {
        let table = DataTable::from_reader(RAW.as_bytes(), None).unwrap();
        let result = MetricsDashboard::new(table, "timestamp", MetricTaxonomy::snmp(), ColumnMap::snmp());
        assert!(result.is_err());
    }
}
