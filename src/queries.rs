// 🔍 Query Library - BI analytics queries over the sample database
// Five fixed SQL statements. All business logic (growth rates, segment
// thresholds, risk scoring) lives in the SQL text itself. The only bound value
// is `:as_of`, the reference date that recency windows and tenure count from.
//
// Money columns are REAL, and growth math multiplies by 100.0 before dividing,
// so month-over-month percentages never fall into integer division.

use crate::db;
use anyhow::{Context, Result};
use chrono::{NaiveDate, Utc};
use rusqlite::types::Value;
use rusqlite::Connection;
use std::fmt;

// ============================================================================
// SQL
// ============================================================================

/// Monthly subscription revenue with tier split and month-over-month growth
pub const REVENUE_DASHBOARD_SQL: &str = "
SELECT
    strftime('%Y-%m', f.date) AS month,
    COUNT(DISTINCT f.customer_id) AS active_customers,
    SUM(f.amount) AS total_revenue,
    AVG(f.amount) AS avg_transaction_value,
    SUM(CASE WHEN c.subscription_tier = 'Enterprise' THEN f.amount ELSE 0 END) AS enterprise_revenue,
    SUM(CASE WHEN c.subscription_tier = 'Professional' THEN f.amount ELSE 0 END) AS professional_revenue,
    SUM(CASE WHEN c.subscription_tier = 'Basic' THEN f.amount ELSE 0 END) AS basic_revenue,
    -- Previous month via window function over the grouped rows
    LAG(SUM(f.amount)) OVER (ORDER BY strftime('%Y-%m', f.date)) AS prev_month_revenue,
    ROUND(
        (SUM(f.amount) - LAG(SUM(f.amount)) OVER (ORDER BY strftime('%Y-%m', f.date))) * 100.0
        / LAG(SUM(f.amount)) OVER (ORDER BY strftime('%Y-%m', f.date)), 2
    ) AS revenue_growth_percent
FROM financial_data f
JOIN customers c ON f.customer_id = c.customer_id
WHERE f.transaction_type = 'subscription'
GROUP BY strftime('%Y-%m', f.date)
ORDER BY month DESC
";

/// Value segment x lifecycle stage for active customers
///
/// Usage and revenue are aggregated separately before the join so that the
/// daily usage rows do not multiply the lifetime value.
pub const CUSTOMER_SEGMENTATION_SQL: &str = "
WITH usage_summary AS (
    SELECT
        customer_id,
        AVG(contacts_captured) AS avg_contacts_per_day,
        AVG(api_calls) AS avg_api_calls_per_day
    FROM usage_metrics
    GROUP BY customer_id
),
revenue_summary AS (
    SELECT customer_id, SUM(amount) AS total_lifetime_value
    FROM financial_data
    GROUP BY customer_id
),
customer_metrics AS (
    SELECT
        c.customer_id,
        c.company_name,
        c.industry,
        c.subscription_tier,
        c.monthly_revenue,
        JULIANDAY(:as_of) - JULIANDAY(c.signup_date) AS tenure_days,
        u.avg_contacts_per_day,
        u.avg_api_calls_per_day,
        r.total_lifetime_value
    FROM customers c
    LEFT JOIN usage_summary u ON c.customer_id = u.customer_id
    LEFT JOIN revenue_summary r ON c.customer_id = r.customer_id
    WHERE c.is_active = 1
),
customer_segments AS (
    SELECT *,
        CASE
            WHEN total_lifetime_value > 1000 AND avg_contacts_per_day > 100 THEN 'High Value'
            WHEN total_lifetime_value > 500 OR avg_contacts_per_day > 50 THEN 'Medium Value'
            ELSE 'Low Value'
        END AS value_segment,
        CASE
            WHEN tenure_days < 30 THEN 'New Customer'
            WHEN tenure_days < 180 THEN 'Growing'
            ELSE 'Established'
        END AS lifecycle_stage
    FROM customer_metrics
)
SELECT
    value_segment,
    lifecycle_stage,
    COUNT(*) AS customer_count,
    AVG(monthly_revenue) AS avg_monthly_revenue,
    AVG(total_lifetime_value) AS avg_ltv,
    AVG(avg_contacts_per_day) AS avg_usage,
    ROUND(COUNT(*) * 100.0 / SUM(COUNT(*)) OVER (), 2) AS segment_percentage
FROM customer_segments
GROUP BY value_segment, lifecycle_stage
ORDER BY avg_ltv DESC
";

/// Last-30-day load profile per weekday (capacity planning)
pub const USAGE_OPTIMIZATION_SQL: &str = "
WITH daily_usage AS (
    SELECT
        date,
        strftime('%w', date) AS day_of_week,
        SUM(contacts_captured) AS total_contacts,
        SUM(api_calls) AS total_api_calls,
        SUM(storage_used_mb) AS total_storage_mb,
        COUNT(DISTINCT customer_id) AS active_customers
    FROM usage_metrics
    WHERE date >= date(:as_of, '-30 days')
    GROUP BY date
),
usage_stats AS (
    SELECT
        day_of_week,
        AVG(total_contacts) AS avg_contacts,
        AVG(total_api_calls) AS avg_api_calls,
        AVG(total_storage_mb) AS avg_storage_mb,
        AVG(active_customers) AS avg_active_customers,
        MAX(total_api_calls) AS peak_api_calls,
        MIN(total_api_calls) AS min_api_calls
    FROM daily_usage
    GROUP BY day_of_week
)
SELECT
    CASE day_of_week
        WHEN '0' THEN 'Sunday'
        WHEN '1' THEN 'Monday'
        WHEN '2' THEN 'Tuesday'
        WHEN '3' THEN 'Wednesday'
        WHEN '4' THEN 'Thursday'
        WHEN '5' THEN 'Friday'
        WHEN '6' THEN 'Saturday'
    END AS weekday,
    ROUND(avg_contacts, 2) AS avg_contacts_captured,
    ROUND(avg_api_calls, 2) AS avg_api_calls,
    ROUND(avg_storage_mb, 2) AS avg_storage_usage_mb,
    ROUND(avg_active_customers, 2) AS avg_active_customers,
    peak_api_calls,
    min_api_calls,
    ROUND((peak_api_calls / avg_api_calls - 1) * 100, 1) AS peak_vs_avg_percent,
    ROUND((peak_api_calls - min_api_calls) / avg_api_calls * 100, 1) AS load_variability_percent
FROM usage_stats
ORDER BY day_of_week
";

/// Rule-based churn score from recency, volume and frequency of usage
pub const CHURN_RISK_SQL: &str = "
WITH customer_activity AS (
    SELECT
        c.customer_id,
        c.company_name,
        c.monthly_revenue,
        c.subscription_tier,
        JULIANDAY(:as_of) - JULIANDAY(c.signup_date) AS tenure_days,
        COALESCE(AVG(u.contacts_captured), 0) AS avg_daily_contacts,
        COALESCE(AVG(u.api_calls), 0) AS avg_daily_api_calls,
        COUNT(u.date) AS active_days_last_30,
        MAX(u.date) AS last_activity_date,
        JULIANDAY(:as_of) - JULIANDAY(MAX(u.date)) AS days_since_last_activity
    FROM customers c
    LEFT JOIN usage_metrics u ON c.customer_id = u.customer_id
        AND u.date >= date(:as_of, '-30 days')
    WHERE c.is_active = 1
    GROUP BY c.customer_id
),
churn_risk_scores AS (
    SELECT *,
        CASE
            WHEN days_since_last_activity > 14 THEN 3
            WHEN days_since_last_activity > 7 THEN 2
            ELSE 0
        END +
        CASE
            WHEN avg_daily_contacts < 10 THEN 2
            WHEN avg_daily_contacts < 25 THEN 1
            ELSE 0
        END +
        CASE
            WHEN active_days_last_30 < 10 THEN 2
            WHEN active_days_last_30 < 20 THEN 1
            ELSE 0
        END AS risk_score
    FROM customer_activity
)
SELECT
    customer_id,
    company_name,
    subscription_tier,
    monthly_revenue,
    ROUND(tenure_days, 0) AS tenure_days,
    ROUND(avg_daily_contacts, 1) AS avg_daily_contacts,
    active_days_last_30,
    days_since_last_activity,
    risk_score,
    CASE
        WHEN risk_score >= 5 THEN 'Critical Risk'
        WHEN risk_score >= 3 THEN 'High Risk'
        WHEN risk_score >= 2 THEN 'Medium Risk'
        ELSE 'Low Risk'
    END AS risk_category,
    ROUND(monthly_revenue * 12, 2) AS annual_revenue_at_risk
FROM churn_risk_scores
WHERE risk_score >= 2
ORDER BY risk_score DESC, monthly_revenue DESC
";

/// Executive KPIs: revenue mix, ARPU and growth versus the previous month
pub const FINANCIAL_KPI_SQL: &str = "
WITH monthly_metrics AS (
    SELECT
        strftime('%Y-%m', f.date) AS month,
        SUM(CASE WHEN f.transaction_type = 'subscription' THEN f.amount ELSE 0 END) AS subscription_revenue,
        SUM(CASE WHEN f.transaction_type = 'setup_fee' THEN f.amount ELSE 0 END) AS setup_fees,
        SUM(CASE WHEN f.transaction_type = 'overage' THEN f.amount ELSE 0 END) AS overage_revenue,
        COUNT(DISTINCT CASE WHEN f.transaction_type = 'subscription' THEN f.customer_id END) AS paying_customers,
        COUNT(DISTINCT c.customer_id) AS total_customers
    FROM financial_data f
    JOIN customers c ON f.customer_id = c.customer_id
    GROUP BY strftime('%Y-%m', f.date)
),
growth_metrics AS (
    SELECT
        month,
        subscription_revenue,
        setup_fees,
        overage_revenue,
        (subscription_revenue + setup_fees + overage_revenue) AS total_revenue,
        paying_customers,
        total_customers,
        LAG(subscription_revenue) OVER (ORDER BY month) AS prev_month_subscription,
        LAG(paying_customers) OVER (ORDER BY month) AS prev_month_customers,
        LAG(subscription_revenue + setup_fees + overage_revenue) OVER (ORDER BY month) AS prev_month_total_revenue
    FROM monthly_metrics
)
SELECT
    month,
    ROUND(subscription_revenue, 2) AS subscription_revenue,
    ROUND(setup_fees, 2) AS setup_fees,
    ROUND(overage_revenue, 2) AS overage_revenue,
    ROUND(total_revenue, 2) AS total_revenue,
    paying_customers,
    total_customers,
    ROUND(subscription_revenue / NULLIF(paying_customers, 0), 2) AS arpu,
    ROUND(
        CASE
            WHEN prev_month_subscription > 0
            THEN (subscription_revenue - prev_month_subscription) * 100.0 / prev_month_subscription
            ELSE NULL
        END, 1
    ) AS revenue_growth_percent,
    ROUND(
        CASE
            WHEN prev_month_customers > 0
            THEN (paying_customers - prev_month_customers) * 100.0 / CAST(prev_month_customers AS FLOAT)
            ELSE NULL
        END, 1
    ) AS customer_growth_percent,
    ROUND(setup_fees * 100.0 / NULLIF(total_revenue, 0), 1) AS setup_fee_percentage,
    ROUND(overage_revenue * 100.0 / NULLIF(total_revenue, 0), 1) AS overage_percentage
FROM growth_metrics
WHERE prev_month_subscription IS NOT NULL
ORDER BY month DESC
";

// ============================================================================
// QUERY CATALOG
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnalyticsQuery {
    RevenueDashboard,
    CustomerSegmentation,
    UsageOptimization,
    ChurnRisk,
    FinancialKpi,
}

impl AnalyticsQuery {
    pub const ALL: [AnalyticsQuery; 5] = [
        AnalyticsQuery::RevenueDashboard,
        AnalyticsQuery::CustomerSegmentation,
        AnalyticsQuery::UsageOptimization,
        AnalyticsQuery::ChurnRisk,
        AnalyticsQuery::FinancialKpi,
    ];

    pub fn title(&self) -> &'static str {
        match self {
            AnalyticsQuery::RevenueDashboard => "REVENUE DASHBOARD QUERY",
            AnalyticsQuery::CustomerSegmentation => "CUSTOMER SEGMENTATION QUERY",
            AnalyticsQuery::UsageOptimization => "USAGE OPTIMIZATION QUERY",
            AnalyticsQuery::ChurnRisk => "CHURN RISK ANALYSIS QUERY",
            AnalyticsQuery::FinancialKpi => "FINANCIAL KPI DASHBOARD QUERY",
        }
    }

    pub fn purpose(&self) -> &'static str {
        match self {
            AnalyticsQuery::RevenueDashboard => "Monthly revenue analysis with growth calculations",
            AnalyticsQuery::CustomerSegmentation => "Multi-dimensional customer analysis using CTEs",
            AnalyticsQuery::UsageOptimization => "System performance analysis for infrastructure planning",
            AnalyticsQuery::ChurnRisk => "Multi-factor risk scoring for customer retention",
            AnalyticsQuery::FinancialKpi => "Executive-level financial metrics with growth analysis",
        }
    }

    pub fn insight(&self) -> &'static str {
        match self {
            AnalyticsQuery::RevenueDashboard => "Window functions for period-over-period comparisons",
            AnalyticsQuery::CustomerSegmentation => "Combining behavioral and financial metrics for segmentation",
            AnalyticsQuery::UsageOptimization => "Peak vs average analysis for capacity planning",
            AnalyticsQuery::ChurnRisk => "Combining multiple behavioral signals into actionable scores",
            AnalyticsQuery::FinancialKpi => "Revenue mix analysis and growth rate calculations",
        }
    }

    pub fn sql(&self) -> &'static str {
        match self {
            AnalyticsQuery::RevenueDashboard => REVENUE_DASHBOARD_SQL,
            AnalyticsQuery::CustomerSegmentation => CUSTOMER_SEGMENTATION_SQL,
            AnalyticsQuery::UsageOptimization => USAGE_OPTIMIZATION_SQL,
            AnalyticsQuery::ChurnRisk => CHURN_RISK_SQL,
            AnalyticsQuery::FinancialKpi => FINANCIAL_KPI_SQL,
        }
    }
}

// ============================================================================
// QUERY RESULT
// ============================================================================

/// Column names plus raw SQLite values, in result order
#[derive(Debug, Clone, PartialEq)]
pub struct QueryResult {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Value>>,
}

impl QueryResult {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    pub fn value(&self, row: usize, column: &str) -> Option<&Value> {
        let col = self.column_index(column)?;
        self.rows.get(row)?.get(col)
    }

    /// Numeric cell as f64 (integers widen); None for NULL or text
    pub fn f64(&self, row: usize, column: &str) -> Option<f64> {
        match self.value(row, column)? {
            Value::Integer(i) => Some(*i as f64),
            Value::Real(r) => Some(*r),
            _ => None,
        }
    }

    pub fn i64(&self, row: usize, column: &str) -> Option<i64> {
        match self.value(row, column)? {
            Value::Integer(i) => Some(*i),
            _ => None,
        }
    }

    pub fn text(&self, row: usize, column: &str) -> Option<&str> {
        match self.value(row, column)? {
            Value::Text(s) => Some(s.as_str()),
            _ => None,
        }
    }

    pub fn is_null(&self, row: usize, column: &str) -> bool {
        matches!(self.value(row, column), Some(Value::Null))
    }

    /// First `n` rows
    pub fn head(&self, n: usize) -> QueryResult {
        QueryResult {
            columns: self.columns.clone(),
            rows: self.rows.iter().take(n).cloned().collect(),
        }
    }
}

/// Render one cell for console output
pub fn format_value(value: &Value) -> String {
    match value {
        Value::Null => "NULL".to_string(),
        Value::Integer(i) => i.to_string(),
        Value::Real(r) => {
            let text = format!("{:.4}", r);
            let trimmed = text.trim_end_matches('0');
            if trimmed.ends_with('.') {
                format!("{}0", trimmed)
            } else {
                trimmed.to_string()
            }
        }
        Value::Text(s) => s.clone(),
        Value::Blob(b) => format!("<{} bytes>", b.len()),
    }
}

impl fmt::Display for QueryResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.rows.is_empty() {
            writeln!(f, "Empty result")?;
            return write!(f, "Columns: [{}]", self.columns.join(", "));
        }

        let cells: Vec<Vec<String>> = self
            .rows
            .iter()
            .map(|row| row.iter().map(format_value).collect())
            .collect();

        let index_width = (self.rows.len() - 1).to_string().len();
        let widths: Vec<usize> = self
            .columns
            .iter()
            .enumerate()
            .map(|(i, name)| {
                cells
                    .iter()
                    .map(|row| row[i].chars().count())
                    .chain(std::iter::once(name.chars().count()))
                    .max()
                    .unwrap_or(0)
            })
            .collect();

        write!(f, "{:>w$}", "", w = index_width)?;
        for (name, width) in self.columns.iter().zip(&widths) {
            write!(f, "  {:>w$}", name, w = *width)?;
        }

        for (i, row) in cells.iter().enumerate() {
            writeln!(f)?;
            write!(f, "{:<w$}", i, w = index_width)?;
            for (cell, width) in row.iter().zip(&widths) {
                write!(f, "  {:>w$}", cell, w = *width)?;
            }
        }

        Ok(())
    }
}

// ============================================================================
// ANALYTICS QUERIES
// ============================================================================

/// Seed for the sample database
pub const SAMPLE_SEED: u64 = 42;

pub struct AnalyticsQueries {
    conn: Connection,
    as_of: NaiveDate,
}

impl AnalyticsQueries {
    /// Sample database dated relative to today (UTC)
    pub fn new() -> Result<Self> {
        Self::with_sample_data(SAMPLE_SEED, Utc::now().date_naive())
    }

    /// Sample data and query windows share the same reference date
    pub fn with_sample_data(seed: u64, today: NaiveDate) -> Result<Self> {
        let conn = db::create_sample_database(seed, today)?;
        Ok(AnalyticsQueries { conn, as_of: today })
    }

    /// Wrap an existing connection (e.g. a hand-built fixture), dated today
    pub fn from_connection(conn: Connection) -> Self {
        AnalyticsQueries {
            conn,
            as_of: Utc::now().date_naive(),
        }
    }

    /// Pin the reference date used by `:as_of`
    pub fn as_of(mut self, date: NaiveDate) -> Self {
        self.as_of = date;
        self
    }

    pub fn reference_date(&self) -> NaiveDate {
        self.as_of
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    /// Run any read-only statement and collect every row.
    /// A `:as_of` parameter, if the statement has one, is bound to the reference date.
    pub fn run(&self, sql: &str) -> Result<QueryResult> {
        let mut stmt = self.conn.prepare(sql).context("Failed to prepare query")?;

        let columns: Vec<String> = stmt.column_names().iter().map(|c| c.to_string()).collect();
        let width = columns.len();

        if let Some(index) = stmt.parameter_index(":as_of")? {
            stmt.raw_bind_parameter(index, self.as_of.format(db::DATE_FORMAT).to_string())?;
        }

        let mut rows = Vec::new();
        let mut cursor = stmt.raw_query();
        while let Some(row) = cursor.next()? {
            let values = (0..width)
                .map(|i| row.get::<_, Value>(i))
                .collect::<rusqlite::Result<Vec<Value>>>()?;
            rows.push(values);
        }

        Ok(QueryResult { columns, rows })
    }

    pub fn execute(&self, query: AnalyticsQuery) -> Result<QueryResult> {
        tracing::debug!(query = query.title(), "running analytics query");
        self.run(query.sql())
            .with_context(|| format!("{} failed", query.title()))
    }

    pub fn revenue_dashboard(&self) -> Result<QueryResult> {
        self.execute(AnalyticsQuery::RevenueDashboard)
    }

    pub fn customer_segmentation(&self) -> Result<QueryResult> {
        self.execute(AnalyticsQuery::CustomerSegmentation)
    }

    pub fn usage_optimization(&self) -> Result<QueryResult> {
        self.execute(AnalyticsQuery::UsageOptimization)
    }

    pub fn churn_risk_analysis(&self) -> Result<QueryResult> {
        self.execute(AnalyticsQuery::ChurnRisk)
    }

    pub fn financial_kpi_dashboard(&self) -> Result<QueryResult> {
        self.execute(AnalyticsQuery::FinancialKpi)
    }
}

// ============================================================================
// TESTS
// ============================================================================
