// Dashboard aggregation - pivot, funnel steps and headline metrics
use std::collections::{BTreeMap, BTreeSet};

use chrono::NaiveDate;

use super::error::AnalyticsError;
use super::funnel::{FunnelRow, Stage};

/// Date-by-stage count table; missing cells read as zero.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PivotTable {
    cells: BTreeMap<NaiveDate, BTreeMap<Stage, u64>>,
}

impl PivotTable {
    /// Groups rows by date then stage. Duplicate (date, stage) pairs from
    /// overlapping buckets sum into one cell.
    pub fn from_rows(rows: &[FunnelRow]) -> Self {
        let mut cells: BTreeMap<NaiveDate, BTreeMap<Stage, u64>> = BTreeMap::new();
        for row in rows {
            *cells
                .entry(row.date)
                .or_default()
                .entry(row.stage)
                .or_insert(0) += row.count;
        }
        Self { cells }
    }

    pub fn count(&self, date: NaiveDate, stage: Stage) -> u64 {
        self.cells
            .get(&date)
            .and_then(|by_stage| by_stage.get(&stage))
            .copied()
            .unwrap_or(0)
    }

    /// Column sum across all dates; 0 for a stage with no rows.
    pub fn stage_total(&self, stage: Stage) -> u64 {
        self.cells
            .values()
            .filter_map(|by_stage| by_stage.get(&stage))
            .sum()
    }

    pub fn dates(&self) -> impl Iterator<Item = NaiveDate> + '_ {
        self.cells.keys().copied()
    }
}

/// One adjacent pair of the funnel sequence with its conversion ratio.
#[derive(Debug, Clone, PartialEq)]
pub struct FunnelStep {
    pub from: Stage,
    pub to: Stage,
    pub from_total: u64,
    pub to_total: u64,
    pub conversion_rate: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Metrics {
    pub total_applied: u64,
    pub total_approved: u64,
    pub total_realized: u64,
    pub realization_rate: f64,
}

impl Metrics {
    fn from_pivot(pivot: &PivotTable) -> Self {
        let total_applied = pivot.stage_total(Stage::Applied);
        let total_realized = pivot.stage_total(Stage::Realized);
        Self {
            total_applied,
            total_approved: pivot.stage_total(Stage::Approved),
            total_realized,
            realization_rate: ratio(total_realized, total_applied),
        }
    }
}

/// Chart series for one stage, points in row order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageSeries {
    pub stage: Stage,
    pub points: Vec<SeriesPoint>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SeriesPoint {
    pub date: NaiveDate,
    pub count: u64,
}

/// Everything the presentation layer consumes for one render.
#[derive(Debug, Clone)]
pub struct FunnelDashboard {
    pub series: Vec<StageSeries>,
    pub pivot: PivotTable,
    pub steps: Vec<FunnelStep>,
    pub metrics: Metrics,
}

/// Pivots the flattened rows and derives conversion steps and metrics.
/// Rows outside `selected` and "Sign Up" placeholder rows are dropped first;
/// an empty table after filtering is the explicit no-data condition.
pub fn aggregate(
    rows: Vec<FunnelRow>,
    selected: &BTreeSet<Stage>,
) -> Result<FunnelDashboard, AnalyticsError> {
    let rows: Vec<FunnelRow> = rows
        .into_iter()
        .filter(|row| selected.contains(&row.stage) && row.stage != Stage::SignUp)
        .collect();
    if rows.is_empty() {
        return Err(AnalyticsError::NoData);
    }

    let pivot = PivotTable::from_rows(&rows);
    let steps = funnel_steps(&pivot);
    let metrics = Metrics::from_pivot(&pivot);
    let series = stage_series(&rows);

    Ok(FunnelDashboard {
        series,
        pivot,
        steps,
        metrics,
    })
}

fn funnel_steps(pivot: &PivotTable) -> Vec<FunnelStep> {
    Stage::FUNNEL
        .windows(2)
        .map(|pair| {
            let (from, to) = (pair[0], pair[1]);
            let from_total = pivot.stage_total(from);
            let to_total = pivot.stage_total(to);
            FunnelStep {
                from,
                to,
                from_total,
                to_total,
                conversion_rate: ratio(to_total, from_total),
            }
        })
        .collect()
}

/// Groups rows into one series per stage, preserving row order.
fn stage_series(rows: &[FunnelRow]) -> Vec<StageSeries> {
    let mut series: Vec<StageSeries> = Vec::new();
    for row in rows {
        let point = SeriesPoint {
            date: row.date,
            count: row.count,
        };
        match series.iter_mut().find(|entry| entry.stage == row.stage) {
            Some(entry) => entry.points.push(point),
            None => series.push(StageSeries {
                stage: row.stage,
                points: vec![point],
            }),
        }
    }
    series
}

fn ratio(numerator: u64, denominator: u64) -> f64 {
    if denominator == 0 {
        0.0
    } else {
        numerator as f64 / denominator as f64
    }
}

/// Renders a 0..1 ratio as a percentage with one decimal place.
pub fn format_percent(ratio: f64) -> String {
    format!("{:.1}%", ratio * 100.0)
}
