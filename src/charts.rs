// 📈 Chart Builders - Plotly figure JSON
// Each builder is a pure function: table in, one Figure out.
//
// Figures serialize (serde) to the JSON shape Plotly.js expects:
//   { "data": [trace, ...], "layout": { ... } }
// Builders aggregate (group-by month or segment) before building traces.

use crate::generators::{CustomerRecord, FinancialRecord, Segment, SyntheticDataset};
use serde::Serialize;
use std::collections::BTreeMap;
use thiserror::Error;

// ============================================================================
// ERRORS
// ============================================================================

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ChartError {
    #[error("{chart}: input table is empty")]
    EmptyInput { chart: &'static str },

    #[error("{chart}: malformed data: {detail}")]
    DataShape { chart: &'static str, detail: String },

    #[error("unknown chart id: {0}")]
    UnknownChart(String),
}

// ============================================================================
// FIGURE MODEL
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Figure {
    pub data: Vec<Trace>,
    pub layout: Layout,
}

impl Figure {
    pub fn trace_count(&self) -> usize {
        self.data.len()
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TraceKind {
    #[default]
    Scatter,
    Bar,
    Pie,
}

/// Axis data: category labels (months, segments) or plain numbers
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Series {
    Labels(Vec<String>),
    Numbers(Vec<f64>),
}

impl Series {
    pub fn len(&self) -> usize {
        match self {
            Series::Labels(v) => v.len(),
            Series::Numbers(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Trace {
    #[serde(rename = "type")]
    pub kind: TraceKind,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub mode: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub x: Option<Series>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub y: Option<Series>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub labels: Option<Vec<String>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub values: Option<Vec<f64>>,

    /// "y2" puts the trace on the secondary axis
    #[serde(skip_serializing_if = "Option::is_none")]
    pub yaxis: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub line: Option<LineStyle>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub marker: Option<Marker>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub textposition: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub textinfo: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LineStyle {
    pub color: String,
    pub width: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum MarkerColor {
    Single(String),
    Scale(Vec<f64>),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Marker {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<MarkerColor>,

    /// Per-slice colors (pie traces)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub colors: Option<Vec<String>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<Vec<f64>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub sizemode: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub sizeref: Option<f64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub colorscale: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub showscale: Option<bool>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub colorbar: Option<ColorBar>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ColorBar {
    pub title: Title,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Title {
    pub text: String,
}

impl Title {
    pub fn new(text: &str) -> Self {
        Title { text: text.to_string() }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Axis {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<Title>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub side: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub overlaying: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub gridcolor: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub zerolinecolor: Option<String>,
}

impl Axis {
    pub fn titled(text: &str) -> Self {
        Axis {
            title: Some(Title::new(text)),
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Layout {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<Title>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub xaxis: Option<Axis>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub yaxis: Option<Axis>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub yaxis2: Option<Axis>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub hovermode: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub plot_bgcolor: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub paper_bgcolor: Option<String>,
}

const GRID_COLOR: &str = "#EBF0F8";

impl Layout {
    pub fn titled(text: &str) -> Self {
        Layout {
            title: Some(Title::new(text)),
            ..Default::default()
        }
    }

    /// White background with light grid lines on every axis present
    pub fn white_theme(mut self) -> Self {
        self.plot_bgcolor = Some("white".to_string());
        self.paper_bgcolor = Some("white".to_string());

        let xaxis = self.xaxis.take().unwrap_or_default();
        let yaxis = self.yaxis.take().unwrap_or_default();
        self.xaxis = Some(with_grid(xaxis));
        self.yaxis = Some(with_grid(yaxis));
        self
    }
}

fn with_grid(mut axis: Axis) -> Axis {
    axis.gridcolor = Some(GRID_COLOR.to_string());
    axis.zerolinecolor = Some(GRID_COLOR.to_string());
    axis
}

// ============================================================================
// CHART REGISTRY
// ============================================================================

/// The four dashboard graphs, keyed by their placeholder id on the page
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChartKind {
    RevenueTrend,
    CustomerSegments,
    ChurnAnalysis,
    FinancialMetrics,
}

impl ChartKind {
    pub const ALL: [ChartKind; 4] = [
        ChartKind::RevenueTrend,
        ChartKind::CustomerSegments,
        ChartKind::ChurnAnalysis,
        ChartKind::FinancialMetrics,
    ];

    pub fn id(&self) -> &'static str {
        match self {
            ChartKind::RevenueTrend => "revenue-trend",
            ChartKind::CustomerSegments => "customer-segments",
            ChartKind::ChurnAnalysis => "churn-analysis",
            ChartKind::FinancialMetrics => "financial-metrics",
        }
    }

    pub fn from_id(id: &str) -> Result<Self, ChartError> {
        ChartKind::ALL
            .into_iter()
            .find(|kind| kind.id() == id)
            .ok_or_else(|| ChartError::UnknownChart(id.to_string()))
    }

    pub fn build(&self, dataset: &SyntheticDataset) -> Result<Figure, ChartError> {
        match self {
            ChartKind::RevenueTrend => revenue_trend(&dataset.financials),
            ChartKind::CustomerSegments => customer_segments(&dataset.customers),
            ChartKind::ChurnAnalysis => churn_analysis(&dataset.customers),
            ChartKind::FinancialMetrics => financial_metrics(&dataset.financials),
        }
    }
}

// ============================================================================
// AGGREGATION
// ============================================================================

#[derive(Debug, Default, Clone, PartialEq)]
struct MonthTotals {
    revenue: f64,
    profit: f64,
    active_users: f64,
    days: usize,
    new_signups: u64,
}

fn check_financials(chart: &'static str, rows: &[FinancialRecord]) -> Result<(), ChartError> {
    if rows.is_empty() {
        return Err(ChartError::EmptyInput { chart });
    }

    if let Some(row) = rows.iter().find(|r| {
        !(r.revenue.is_finite() && r.profit.is_finite() && r.active_users.is_finite())
    }) {
        return Err(ChartError::DataShape {
            chart,
            detail: format!("non-finite value on {}", row.date),
        });
    }

    Ok(())
}

fn check_customers(chart: &'static str, rows: &[CustomerRecord]) -> Result<(), ChartError> {
    if rows.is_empty() {
        return Err(ChartError::EmptyInput { chart });
    }

    if let Some(row) = rows.iter().find(|r| {
        !(r.monthly_charges.is_finite()
            && r.tenure_months.is_finite()
            && r.total_charges.is_finite()
            && r.churn_probability.is_finite())
    }) {
        return Err(ChartError::DataShape {
            chart,
            detail: format!("non-finite value for customer {}", row.customer_id),
        });
    }

    Ok(())
}

/// Group daily rows by "YYYY-MM" (BTreeMap keeps months in order)
fn by_month(rows: &[FinancialRecord]) -> BTreeMap<String, MonthTotals> {
    let mut months: BTreeMap<String, MonthTotals> = BTreeMap::new();

    for row in rows {
        let entry = months.entry(row.month()).or_default();
        entry.revenue += row.revenue;
        entry.profit += row.profit;
        entry.active_users += row.active_users;
        entry.days += 1;
        entry.new_signups += row.new_signups;
    }

    months
}

// ============================================================================
// BUILDERS
// ============================================================================

pub fn revenue_trend(rows: &[FinancialRecord]) -> Result<Figure, ChartError> {
    check_financials("revenue-trend", rows)?;
    let months = by_month(rows);

    let labels: Vec<String> = months.keys().cloned().collect();
    let revenue: Vec<f64> = months.values().map(|m| m.revenue / 1000.0).collect();
    let profit: Vec<f64> = months.values().map(|m| m.profit / 1000.0).collect();

    let line_trace = |name: &str, values: Vec<f64>, color: &str| Trace {
        kind: TraceKind::Scatter,
        name: Some(name.to_string()),
        mode: Some("lines+markers".to_string()),
        x: Some(Series::Labels(labels.clone())),
        y: Some(Series::Numbers(values)),
        line: Some(LineStyle {
            color: color.to_string(),
            width: 3.0,
        }),
        ..Default::default()
    };

    let layout = Layout {
        xaxis: Some(Axis::titled("Month")),
        yaxis: Some(Axis::titled("Amount (€K)")),
        hovermode: Some("x unified".to_string()),
        ..Layout::titled("📈 Monthly Revenue & Profit Trend (€K)")
    };

    Ok(Figure {
        data: vec![
            line_trace("Revenue", revenue, "#3498db"),
            line_trace("Profit", profit, "#27ae60"),
        ],
        layout: layout.white_theme(),
    })
}

pub fn customer_segments(rows: &[CustomerRecord]) -> Result<Figure, ChartError> {
    check_customers("customer-segments", rows)?;

    let mut counts: BTreeMap<&'static str, (usize, Segment)> = BTreeMap::new();
    for row in rows {
        counts.entry(row.segment.label()).or_insert((0, row.segment)).0 += 1;
    }

    let labels: Vec<String> = counts.keys().map(|l| l.to_string()).collect();
    let values: Vec<f64> = counts.values().map(|(n, _)| *n as f64).collect();
    let colors: Vec<String> = counts.values().map(|(_, s)| s.color().to_string()).collect();

    let trace = Trace {
        kind: TraceKind::Pie,
        labels: Some(labels),
        values: Some(values),
        marker: Some(Marker {
            colors: Some(colors),
            ..Default::default()
        }),
        textposition: Some("inside".to_string()),
        textinfo: Some("percent+label".to_string()),
        ..Default::default()
    };

    Ok(Figure {
        data: vec![trace],
        layout: Layout::titled("🎯 Customer Distribution by Segment"),
    })
}

/// Largest bubble diameter in pixels
const MAX_BUBBLE_SIZE: f64 = 20.0;

pub fn churn_analysis(rows: &[CustomerRecord]) -> Result<Figure, ChartError> {
    check_customers("churn-analysis", rows)?;

    // Bubble area follows total charges; negative totals have no area
    let sizes: Vec<f64> = rows.iter().map(|r| r.total_charges.max(0.0)).collect();
    let largest = sizes.iter().cloned().fold(0.0_f64, f64::max);
    let sizeref = if largest > 0.0 {
        2.0 * largest / (MAX_BUBBLE_SIZE * MAX_BUBBLE_SIZE)
    } else {
        1.0
    };

    let trace = Trace {
        kind: TraceKind::Scatter,
        mode: Some("markers".to_string()),
        x: Some(Series::Numbers(rows.iter().map(|r| r.tenure_months).collect())),
        y: Some(Series::Numbers(rows.iter().map(|r| r.monthly_charges).collect())),
        marker: Some(Marker {
            color: Some(MarkerColor::Scale(
                rows.iter().map(|r| r.churn_probability).collect(),
            )),
            size: Some(sizes),
            sizemode: Some("area".to_string()),
            sizeref: Some(sizeref),
            colorscale: Some("Reds".to_string()),
            showscale: Some(true),
            colorbar: Some(ColorBar {
                title: Title::new("Churn Risk"),
            }),
            ..Default::default()
        }),
        ..Default::default()
    };

    let layout = Layout {
        xaxis: Some(Axis::titled("Tenure (Months)")),
        yaxis: Some(Axis::titled("Monthly Charges (€)")),
        ..Layout::titled("🚨 Churn Risk Analysis")
    };

    Ok(Figure {
        data: vec![trace],
        layout: layout.white_theme(),
    })
}

pub fn financial_metrics(rows: &[FinancialRecord]) -> Result<Figure, ChartError> {
    check_financials("financial-metrics", rows)?;
    let months = by_month(rows);

    let labels: Vec<String> = months.keys().cloned().collect();
    let signups: Vec<f64> = months.values().map(|m| m.new_signups as f64).collect();
    let mean_users: Vec<f64> = months
        .values()
        .map(|m| m.active_users / m.days as f64)
        .collect();

    let bars = Trace {
        kind: TraceKind::Bar,
        name: Some("New Signups".to_string()),
        x: Some(Series::Labels(labels.clone())),
        y: Some(Series::Numbers(signups)),
        marker: Some(Marker {
            color: Some(MarkerColor::Single("#9b59b6".to_string())),
            ..Default::default()
        }),
        ..Default::default()
    };

    let users = Trace {
        kind: TraceKind::Scatter,
        name: Some("Active Users".to_string()),
        mode: Some("lines+markers".to_string()),
        x: Some(Series::Labels(labels)),
        y: Some(Series::Numbers(mean_users)),
        yaxis: Some("y2".to_string()),
        line: Some(LineStyle {
            color: "#e67e22".to_string(),
            width: 3.0,
        }),
        ..Default::default()
    };

    let layout = Layout {
        xaxis: Some(Axis::titled("Month")),
        yaxis: Some(Axis {
            side: Some("left".to_string()),
            ..Axis::titled("New Signups")
        }),
        yaxis2: Some(Axis {
            side: Some("right".to_string()),
            overlaying: Some("y".to_string()),
            ..Axis::titled("Active Users")
        }),
        ..Layout::titled("👥 User Acquisition & Retention Metrics")
    };

    Ok(Figure {
        data: vec![bars, users],
        layout: layout.white_theme(),
    })
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn sample_financials() -> Vec<FinancialRecord> {
        vec![
            FinancialRecord::new(day(2024, 1, 1), 1000.0, 400.0, 100.0, 5),
            FinancialRecord::new(day(2024, 1, 2), 2000.0, 600.0, 200.0, 7),
            FinancialRecord::new(day(2024, 2, 1), 3000.0, 1000.0, 300.0, 11),
        ]
    }

    fn customer(id: u32, segment: Segment, total: f64, churn: f64) -> CustomerRecord {
        CustomerRecord {
            customer_id: id,
            monthly_charges: 60.0 + id as f64,
            tenure_months: 10.0 * id as f64,
            total_charges: total,
            churn_probability: churn,
            segment,
            acquisition_date: day(2020, 1, id),
        }
    }

    fn sample_customers() -> Vec<CustomerRecord> {
        vec![
            customer(1, Segment::Budget, 800.0, 0.1),
            customer(2, Segment::Budget, 1600.0, 0.8),
            customer(3, Segment::Premium, -50.0, 0.3),
            customer(4, Segment::Enterprise, 3200.0, 0.05),
        ]
    }

    fn numbers(series: &Option<Series>) -> Vec<f64> {
        match series {
            Some(Series::Numbers(v)) => v.clone(),
            other => panic!("expected numbers, got {:?}", other),
        }
    }

    #[test]
    fn test_revenue_trend_has_two_series() {
        let fig = revenue_trend(&sample_financials()).unwrap();
        assert_eq!(fig.trace_count(), 2);
        assert_eq!(fig.data[0].name.as_deref(), Some("Revenue"));
        assert_eq!(fig.data[1].name.as_deref(), Some("Profit"));

        // January: 3000 revenue, 2000 profit; February: 3000 / 2000
        assert_eq!(numbers(&fig.data[0].y), vec![3.0, 3.0]);
        assert_eq!(numbers(&fig.data[1].y), vec![2.0, 2.0]);
        assert_eq!(
            fig.data[0].x,
            Some(Series::Labels(vec!["2024-01".to_string(), "2024-02".to_string()]))
        );
        assert_eq!(fig.layout.hovermode.as_deref(), Some("x unified"));
    }

    #[test]
    fn test_customer_segments_counts() {
        let fig = customer_segments(&sample_customers()).unwrap();
        assert_eq!(fig.trace_count(), 1);

        let pie = &fig.data[0];
        assert_eq!(pie.kind, TraceKind::Pie);
        assert_eq!(
            pie.labels,
            Some(vec!["Budget".to_string(), "Enterprise".to_string(), "Premium".to_string()])
        );
        assert_eq!(pie.values, Some(vec![2.0, 1.0, 1.0]));
        let colors = pie.marker.as_ref().unwrap().colors.clone().unwrap();
        assert_eq!(colors[1], Segment::Enterprise.color());
    }

    #[test]
    fn test_churn_analysis_encodes_size_and_color() {
        let rows = sample_customers();
        let fig = churn_analysis(&rows).unwrap();
        assert_eq!(fig.trace_count(), 1);

        let marker = fig.data[0].marker.as_ref().unwrap();
        assert_eq!(marker.size.as_ref().unwrap(), &vec![800.0, 1600.0, 0.0, 3200.0]);
        assert_eq!(
            marker.color,
            Some(MarkerColor::Scale(vec![0.1, 0.8, 0.3, 0.05]))
        );
        assert_eq!(marker.sizeref, Some(2.0 * 3200.0 / 400.0));
        assert_eq!(numbers(&fig.data[0].x).len(), rows.len());
    }

    #[test]
    fn test_financial_metrics_dual_axis() {
        let fig = financial_metrics(&sample_financials()).unwrap();
        assert_eq!(fig.trace_count(), 2);
        assert_eq!(fig.data[0].kind, TraceKind::Bar);
        assert_eq!(fig.data[1].yaxis.as_deref(), Some("y2"));

        assert_eq!(numbers(&fig.data[0].y), vec![12.0, 11.0]);
        assert_eq!(numbers(&fig.data[1].y), vec![150.0, 300.0]);
        assert_eq!(
            fig.layout.yaxis2.as_ref().unwrap().overlaying.as_deref(),
            Some("y")
        );
    }

    #[test]
    fn test_empty_input_is_data_shape_error() {
        assert_eq!(
            revenue_trend(&[]),
            Err(ChartError::EmptyInput { chart: "revenue-trend" })
        );
        assert!(customer_segments(&[]).is_err());
        assert!(churn_analysis(&[]).is_err());
        assert!(financial_metrics(&[]).is_err());
    }

    #[test]
    fn test_non_finite_value_rejected() {
        let mut rows = sample_customers();
        rows[2].monthly_charges = f64::NAN;
        match churn_analysis(&rows) {
            Err(ChartError::DataShape { chart, .. }) => assert_eq!(chart, "churn-analysis"),
            other => panic!("expected data shape error, got {:?}", other),
        }
    }

    #[test]
    fn test_figure_json_shape() {
        let fig = financial_metrics(&sample_financials()).unwrap();
        let json: serde_json::Value = serde_json::from_str(&fig.to_json().unwrap()).unwrap();

        assert_eq!(json["data"][0]["type"], "bar");
        assert_eq!(json["data"][1]["type"], "scatter");
        assert_eq!(json["data"][1]["yaxis"], "y2");
        assert_eq!(json["layout"]["yaxis2"]["side"], "right");
        assert_eq!(json["layout"]["plot_bgcolor"], "white");
        // Unset options are omitted entirely
        assert!(json["data"][0].get("labels").is_none());
    }

    #[test]
    fn test_chart_kind_lookup() {
        for kind in ChartKind::ALL {
            assert_eq!(ChartKind::from_id(kind.id()), Ok(kind));
        }
        assert_eq!(
            ChartKind::from_id("nope"),
            Err(ChartError::UnknownChart("nope".to_string()))
        );
    }

    #[test]
    fn test_builds_every_chart_from_generated_data() {
        let dataset = SyntheticDataset::generate(&crate::config::GeneratorConfig::default()).unwrap();
        let expected = [2, 1, 1, 2];

        for (kind, traces) in ChartKind::ALL.iter().zip(expected) {
            let fig = kind.build(&dataset).unwrap();
            assert_eq!(fig.trace_count(), traces, "{}", kind.id());
        }

        let trend = revenue_trend(&dataset.financials).unwrap();
        assert_eq!(trend.data[0].x.as_ref().unwrap().len(), 12);
    }
}
