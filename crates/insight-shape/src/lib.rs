//! Turns a query result into chart-ready series.
//!
//! Everything here is a pure function of the record slice it is handed; a
//! new result set means a new [`DashboardView`].

use insight_protocol::{FilterField, Record};
use serde::Serialize;

mod aggregate;

pub use aggregate::{
    category_counts, grouped_average, top_n, CategoryCounts, GroupAverages, SeriesPoint,
    ZeroMetric,
};

pub const TOP_SECTORS: usize = 10;
pub const TOP_COUNTRIES: usize = 10;
pub const TOP_REGIONS: usize = 8;
pub const TOP_PESTLES: usize = 6;
pub const TOP_TOPICS: usize = 5;

pub const YEAR_FIELD: FilterField = FilterField::EndYear;
pub const INTENSITY_METRIC: &str = "intensity";

/// The charts a dashboard renders.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChartKind {
    Sectors,
    Regions,
    IntensityByYear,
    Pestles,
    Countries,
    Topics,
}

impl ChartKind {
    pub const ALL: [ChartKind; 6] = [
        ChartKind::Sectors,
        ChartKind::Regions,
        ChartKind::IntensityByYear,
        ChartKind::Pestles,
        ChartKind::Countries,
        ChartKind::Topics,
    ];

    pub fn title(self) -> &'static str {
        match self {
            ChartKind::Sectors => "Number of Projects by Sector",
            ChartKind::Regions => "Records by Region",
            ChartKind::IntensityByYear => "Average Intensity over Years",
            ChartKind::Pestles => "PESTLE Analysis",
            ChartKind::Countries => "Top Countries",
            ChartKind::Topics => "Top Topics",
        }
    }

    /// Category field and ranking limit for the count charts.
    pub fn ranking(self) -> Option<(FilterField, usize)> {
        match self {
            ChartKind::Sectors => Some((FilterField::Sector, TOP_SECTORS)),
            ChartKind::Regions => Some((FilterField::Region, TOP_REGIONS)),
            ChartKind::Pestles => Some((FilterField::Pestle, TOP_PESTLES)),
            ChartKind::Countries => Some((FilterField::Country, TOP_COUNTRIES)),
            ChartKind::Topics => Some((FilterField::Topic, TOP_TOPICS)),
            ChartKind::IntensityByYear => None,
        }
    }
}

/// A chart's data, or the explicit signal that there is nothing to draw.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", content = "points", rename_all = "snake_case")]
pub enum ChartSeries<T> {
    NoData,
    Ready(Vec<SeriesPoint<T>>),
}

impl<T> ChartSeries<T> {
    fn from_points(points: Vec<SeriesPoint<T>>) -> Self {
        if points.is_empty() {
            ChartSeries::NoData
        } else {
            ChartSeries::Ready(points)
        }
    }

    pub fn is_no_data(&self) -> bool {
        matches!(self, ChartSeries::NoData)
    }

    pub fn points(&self) -> &[SeriesPoint<T>] {
        match self {
            ChartSeries::NoData => &[],
            ChartSeries::Ready(points) => points,
        }
    }
}

/// Ranked counts for one field, limited to `n`.
pub fn ranked_series(records: &[Record], field: FilterField, n: usize) -> ChartSeries<u64> {
    ChartSeries::from_points(top_n(&category_counts(records, field.as_str()), n))
}

/// Mean intensity per end year, years in string order.
pub fn year_series(records: &[Record], zeros: ZeroMetric) -> ChartSeries<f64> {
    ChartSeries::from_points(
        grouped_average(records, YEAR_FIELD.as_str(), INTENSITY_METRIC, zeros).sorted_by_label(),
    )
}

/// Every chart of the dashboard, derived from one result set.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DashboardView {
    pub record_count: usize,
    pub sectors: ChartSeries<u64>,
    pub regions: ChartSeries<u64>,
    pub intensity_by_year: ChartSeries<f64>,
    pub pestles: ChartSeries<u64>,
    pub countries: ChartSeries<u64>,
    pub topics: ChartSeries<u64>,
}

impl DashboardView {
    pub fn from_records(records: &[Record], zeros: ZeroMetric) -> Self {
        Self {
            record_count: records.len(),
            sectors: ranked_series(records, FilterField::Sector, TOP_SECTORS),
            regions: ranked_series(records, FilterField::Region, TOP_REGIONS),
            intensity_by_year: year_series(records, zeros),
            pestles: ranked_series(records, FilterField::Pestle, TOP_PESTLES),
            countries: ranked_series(records, FilterField::Country, TOP_COUNTRIES),
            topics: ranked_series(records, FilterField::Topic, TOP_TOPICS),
        }
    }

    /// Count chart by kind; `None` for the year series.
    pub fn counts(&self, kind: ChartKind) -> Option<&ChartSeries<u64>> {
        match kind {
            ChartKind::Sectors => Some(&self.sectors),
            ChartKind::Regions => Some(&self.regions),
            ChartKind::Pestles => Some(&self.pestles),
            ChartKind::Countries => Some(&self.countries),
            ChartKind::Topics => Some(&self.topics),
            ChartKind::IntensityByYear => None,
        }
    }

    /// True when no chart has anything to draw.
    pub fn is_no_data(&self) -> bool {
        self.sectors.is_no_data()
            && self.regions.is_no_data()
            && self.intensity_by_year.is_no_data()
            && self.pestles.is_no_data()
            && self.countries.is_no_data()
            && self.topics.is_no_data()
    }
}
