use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use chrono::{Datelike, NaiveDate};

use super::model::{Dimension, EventRecord};

// Every count below is of distinct event ids: one event may have several
// rows (one per human factor, say) and must still count once per cell.

/// Distinct events per combination of `dims`, sorted by key.
///
/// Rows with a missing value in any of `dims` are skipped.
pub fn count_combinations<'a, I>(events: I, dims: &[Dimension]) -> Vec<(Vec<String>, usize)>
where
    I: IntoIterator<Item = &'a EventRecord>,
{
    let mut groups: BTreeMap<Vec<&'a str>, BTreeSet<&'a str>> = BTreeMap::new();
    for ev in events {
        let key: Option<Vec<&str>> = dims.iter().map(|d| ev.category(*d)).collect();
        if let Some(key) = key {
            groups.entry(key).or_default().insert(ev.id.as_str());
        }
    }
    groups
        .into_iter()
        .map(|(key, ids)| (key.into_iter().map(str::to_string).collect(), ids.len()))
        .collect()
}

/// Distinct events per value of a single dimension.
pub fn count_by<'a, I>(events: I, dim: Dimension) -> Vec<(String, usize)>
where
    I: IntoIterator<Item = &'a EventRecord>,
{
    count_combinations(events, &[dim])
        .into_iter()
        .filter_map(|(mut key, n)| key.pop().map(|k| (k, n)))
        .collect()
}

// ---------------------------------------------------------------------------
// PivotTable – heatmap matrix
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PivotTable {
    pub row_dim: Option<Dimension>,
    pub col_dim: Option<Dimension>,
    pub rows: Vec<String>,
    pub cols: Vec<String>,
    /// `counts[r][c]`, zero-filled.
    pub counts: Vec<Vec<usize>>,
}

impl PivotTable {
    pub fn get(&self, row: &str, col: &str) -> usize {
        let r = self.rows.iter().position(|x| x == row);
        let c = self.cols.iter().position(|x| x == col);
        match (r, c) {
            (Some(r), Some(c)) => self.counts[r][c],
            _ => 0,
        }
    }

    pub fn max(&self) -> usize {
        self.counts.iter().flatten().copied().max().unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty() || self.cols.is_empty()
    }

    fn row_totals(&self) -> Vec<usize> {
        self.counts.iter().map(|r| r.iter().sum()).collect()
    }

    fn col_totals(&self) -> Vec<usize> {
        (0..self.cols.len())
            .map(|c| self.counts.iter().map(|r| r[c]).sum())
            .collect()
    }

    /// Keep the `n` rows and `n` columns with the largest totals, largest
    /// first. Ties keep their sorted order.
    pub fn top(&self, n: usize) -> PivotTable {
        let rows = top_indices(&self.row_totals(), n);
        let cols = top_indices(&self.col_totals(), n);
        PivotTable {
            row_dim: self.row_dim,
            col_dim: self.col_dim,
            rows: rows.iter().map(|&r| self.rows[r].clone()).collect(),
            cols: cols.iter().map(|&c| self.cols[c].clone()).collect(),
            counts: rows
                .iter()
                .map(|&r| cols.iter().map(|&c| self.counts[r][c]).collect())
                .collect(),
        }
    }
}

fn top_indices(totals: &[usize], n: usize) -> Vec<usize> {
    let mut idx: Vec<usize> = (0..totals.len()).collect();
    idx.sort_by(|a, b| totals[*b].cmp(&totals[*a]));
    idx.truncate(n);
    idx
}

/// Distinct events per (row, column) value pair.
pub fn pivot<'a, I>(events: I, row_dim: Dimension, col_dim: Dimension) -> PivotTable
where
    I: IntoIterator<Item = &'a EventRecord>,
{
    let combos = count_combinations(events, &[row_dim, col_dim]);
    let rows: Vec<String> = combos
        .iter()
        .map(|(k, _)| k[0].clone())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();
    let cols: Vec<String> = combos
        .iter()
        .map(|(k, _)| k[1].clone())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();

    let mut counts = vec![vec![0usize; cols.len()]; rows.len()];
    for (key, n) in &combos {
        // Both positions exist: rows/cols were built from the same keys.
        if let (Ok(r), Ok(c)) = (rows.binary_search(&key[0]), cols.binary_search(&key[1])) {
            counts[r][c] = *n;
        }
    }

    PivotTable {
        row_dim: Some(row_dim),
        col_dim: Some(col_dim),
        rows,
        cols,
        counts,
    }
}

// ---------------------------------------------------------------------------
// Monthly trend
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct YearMonth {
    pub year: i32,
    pub month: u32,
}

impl From<NaiveDate> for YearMonth {
    fn from(d: NaiveDate) -> Self {
        Self {
            year: d.year(),
            month: d.month(),
        }
    }
}

impl fmt::Display for YearMonth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

/// Series label for events without an event type.
pub const UNTYPED: &str = "(untyped)";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TrendTable {
    /// Every month that has at least one dated event, ascending.
    pub months: Vec<YearMonth>,
    /// Event type → count per entry of `months`.
    pub series: BTreeMap<String, Vec<usize>>,
}

/// Distinct events per month and event type. Each event counts once, by
/// the date and type of its first row; an event whose first row is
/// undated is left out even if a later row carries a date.
pub fn monthly_trend<'a, I>(events: I) -> TrendTable
where
    I: IntoIterator<Item = &'a EventRecord>,
{
    let mut seen = BTreeSet::new();
    let mut cells: BTreeMap<(YearMonth, String), usize> = BTreeMap::new();
    for ev in events {
        if !seen.insert(ev.id.as_str()) {
            continue;
        }
        let Some(date) = ev.occurred else { continue };
        let kind = ev.event_type.clone().unwrap_or_else(|| UNTYPED.to_string());
        *cells.entry((YearMonth::from(date), kind)).or_default() += 1;
    }

    let months: Vec<YearMonth> = cells
        .keys()
        .map(|(m, _)| *m)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();
    let mut series: BTreeMap<String, Vec<usize>> = BTreeMap::new();
    for ((month, kind), n) in cells {
        let slot = months.binary_search(&month).unwrap_or_default();
        series.entry(kind).or_insert_with(|| vec![0; months.len()])[slot] = n;
    }
    TrendTable { months, series }
}

// ---------------------------------------------------------------------------
// Top tasks per risk area
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RiskAreaTasks {
    pub risk_area: String,
    /// (task, distinct events), largest first.
    pub tasks: Vec<(String, usize)>,
}

/// Risk areas ranked by how many distinct tasks they group (at most
/// `risk_limit`), each with its `task_limit` busiest tasks.
pub fn top_tasks_by_risk<'a, I>(events: I, risk_limit: usize, task_limit: usize) -> Vec<RiskAreaTasks>
where
    I: IntoIterator<Item = &'a EventRecord>,
{
    let mut by_risk: BTreeMap<String, Vec<(String, usize)>> = BTreeMap::new();
    for (mut key, n) in count_combinations(events, &[Dimension::RiskArea, Dimension::Task]) {
        let task = key.pop().unwrap_or_default();
        let risk = key.pop().unwrap_or_default();
        by_risk.entry(risk).or_default().push((task, n));
    }

    let mut ranked: Vec<(String, Vec<(String, usize)>)> = by_risk.into_iter().collect();
    // Stable sort: equal task counts stay alphabetical.
    ranked.sort_by(|a, b| b.1.len().cmp(&a.1.len()));
    ranked.truncate(risk_limit);

    ranked
        .into_iter()
        .map(|(risk_area, mut tasks)| {
            tasks.sort_by(|a, b| b.1.cmp(&a.1));
            tasks.truncate(task_limit);
            RiskAreaTasks { risk_area, tasks }
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Summary
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Summary {
    pub rows: usize,
    pub unique_events: usize,
    pub first_date: Option<NaiveDate>,
    pub last_date: Option<NaiveDate>,
    /// Row count per event type, largest first.
    pub event_types: Vec<(String, usize)>,
}

pub fn summarize<'a, I>(events: I) -> Summary
where
    I: IntoIterator<Item = &'a EventRecord>,
{
    let mut summary = Summary::default();
    let mut ids = BTreeSet::new();
    let mut types: BTreeMap<&str, usize> = BTreeMap::new();
    for ev in events {
        summary.rows += 1;
        ids.insert(ev.id.as_str());
        if let Some(d) = ev.occurred {
            summary.first_date = Some(summary.first_date.map_or(d, |f| f.min(d)));
            summary.last_date = Some(summary.last_date.map_or(d, |l| l.max(d)));
        }
        if let Some(t) = ev.event_type.as_deref() {
            *types.entry(t).or_default() += 1;
        }
    }
    summary.unique_events = ids.len();
    summary.event_types = types.into_iter().map(|(t, n)| (t.to_string(), n)).collect();
    summary.event_types.sort_by(|a, b| b.1.cmp(&a.1));
    summary
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn ev(id: &str, loc: &str, risk: &str) -> EventRecord {
        EventRecord::new(id, "")
            .with_category(Dimension::Location, loc)
            .with_category(Dimension::RiskArea, risk)
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn repeated_rows_count_once() {
        let events = vec![ev("1", "L", "R"), ev("1", "L", "R"), ev("2", "L", "R")];
        assert_eq!(count_by(&events, Dimension::Location), vec![("L".to_string(), 2)]);
    }

    #[test]
    fn three_way_combinations() {
        let events = vec![
            ev("1", "L", "R").with_category(Dimension::Task, "Lifting"),
            ev("2", "L", "R").with_category(Dimension::Task, "Lifting"),
            ev("3", "L", "R"),
        ];
        let combos = count_combinations(&events, &[Dimension::Location, Dimension::RiskArea, Dimension::Task]);
        assert_eq!(
            combos,
            vec![(vec!["L".to_string(), "R".to_string(), "Lifting".to_string()], 2)]
        );
    }

    #[test]
    fn pivot_is_zero_filled() {
        let events = vec![ev("1", "A", "X"), ev("2", "B", "Y"), ev("3", "A", "Y")];
        let p = pivot(&events, Dimension::Location, Dimension::RiskArea);
        assert_eq!(p.rows, vec!["A", "B"]);
        assert_eq!(p.cols, vec!["X", "Y"]);
        assert_eq!(p.counts, vec![vec![1, 1], vec![0, 1]]);
        assert_eq!(p.get("B", "X"), 0);
        assert_eq!(p.max(), 1);
    }

    #[test]
    fn top_keeps_heaviest_rows_and_columns() {
        let events = vec![
            ev("1", "A", "X"),
            ev("2", "B", "Y"),
            ev("3", "B", "Y"),
            ev("4", "C", "Y"),
        ];
        let p = pivot(&events, Dimension::Location, Dimension::RiskArea).top(1);
        assert_eq!(p.rows, vec!["B"]);
        assert_eq!(p.cols, vec!["Y"]);
        assert_eq!(p.counts, vec![vec![2]]);
    }

    #[test]
    fn trend_skips_undated_and_counts_each_event_once() {
        let events = vec![
            EventRecord::new("1", "").with_date(date(2023, 1, 5)).with_category(Dimension::EventType, "Near Miss"),
            EventRecord::new("1", "").with_date(date(2023, 1, 5)).with_category(Dimension::EventType, "Near Miss"),
            EventRecord::new("2", "").with_date(date(2023, 3, 1)).with_category(Dimension::EventType, "Incident"),
            EventRecord::new("3", "").with_category(Dimension::EventType, "Incident"),
            EventRecord::new("4", "").with_date(date(2023, 3, 9)),
        ];
        let t = monthly_trend(&events);
        assert_eq!(
            t.months,
            vec![YearMonth { year: 2023, month: 1 }, YearMonth { year: 2023, month: 3 }]
        );
        assert_eq!(t.series["Near Miss"], vec![1, 0]);
        assert_eq!(t.series["Incident"], vec![0, 1]);
        assert_eq!(t.series[UNTYPED], vec![0, 1]);
        assert_eq!(t.months[0].to_string(), "2023-01");
    }

    #[test]
    fn trend_uses_the_first_row_of_each_event() {
        let events = vec![
            EventRecord::new("1", "").with_category(Dimension::EventType, "Incident"),
            EventRecord::new("1", "").with_date(date(2023, 2, 1)).with_category(Dimension::EventType, "Incident"),
            EventRecord::new("2", "").with_date(date(2023, 4, 2)).with_category(Dimension::EventType, "Near Miss"),
            EventRecord::new("2", "").with_date(date(2023, 5, 2)).with_category(Dimension::EventType, "Near Miss"),
        ];
        let t = monthly_trend(&events);
        assert_eq!(t.months, vec![YearMonth { year: 2023, month: 4 }]);
        assert_eq!(t.series.len(), 1);
        assert_eq!(t.series["Near Miss"], vec![1]);
    }

    #[test]
    fn top_tasks_are_ranked_within_each_risk_area() {
        let t = |id: &str, risk: &str, task: &str| {
            EventRecord::new(id, "")
                .with_category(Dimension::RiskArea, risk)
                .with_category(Dimension::Task, task)
        };
        let events = vec![
            t("1", "Lifting", "Crane op"),
            t("2", "Lifting", "Crane op"),
            t("3", "Lifting", "Rigging"),
            t("4", "Chemicals", "Sampling"),
        ];
        let ranked = top_tasks_by_risk(&events, 12, 1);
        assert_eq!(ranked.len(), 2);
        assert_eq!(ranked[0].risk_area, "Lifting");
        assert_eq!(ranked[0].tasks, vec![("Crane op".to_string(), 2)]);
        assert_eq!(ranked[1].risk_area, "Chemicals");
    }

    #[test]
    fn summary_reports_range_and_types() {
        let events = vec![
            EventRecord::new("1", "").with_date(date(2022, 5, 1)).with_category(Dimension::EventType, "Incident"),
            EventRecord::new("1", "").with_category(Dimension::EventType, "Incident"),
            EventRecord::new("2", "").with_date(date(2021, 2, 3)).with_category(Dimension::EventType, "Near Miss"),
        ];
        let s = summarize(&events);
        assert_eq!(s.rows, 3);
        assert_eq!(s.unique_events, 2);
        assert_eq!(s.first_date, Some(date(2021, 2, 3)));
        assert_eq!(s.last_date, Some(date(2022, 5, 1)));
        assert_eq!(s.event_types[0], ("Incident".to_string(), 2));
    }
}
