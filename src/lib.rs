// BI Analytics Demo - Core Library
// Synthetic dashboard data, Plotly chart builders and SQL analytics queries,
// shared by the report CLI and the dashboard server.

pub mod config;
pub mod logging;
pub mod generators;
pub mod charts;
pub mod dashboard;
pub mod db;
pub mod queries;
pub mod report;

// Re-export commonly used types
pub use config::{DashboardConfig, GeneratorConfig};
pub use generators::{
    CustomerRecord, FinancialRecord, Segment, SyntheticDataset,
    generate_customers, generate_financials,
};
pub use charts::{
    ChartError, ChartKind, Figure, Trace, TraceKind,
    revenue_trend, customer_segments, churn_analysis, financial_metrics,
};
pub use dashboard::{KpiCard, HighRiskRow, kpi_cards, high_risk_rows, render_page};
pub use db::{
    Customer, UsageMetric, FinancialTransaction,
    setup_database, create_sample_database, count_rows,
};
pub use queries::{AnalyticsQueries, AnalyticsQuery, QueryResult, format_value};
pub use report::run_demo;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
