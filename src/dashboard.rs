// 📊 Dashboard Page - KPI cards, high-risk table, page rendering
// The page is static apart from the four chart placeholders, which the
// load script fills once through the figure endpoint.

use crate::charts::ChartKind;
use crate::config::DashboardConfig;
use crate::generators::{CustomerRecord, SyntheticDataset};

const PAGE_TEMPLATE: &str = include_str!("../web/dashboard.html");

/// Rows shown in the high-risk table
pub const HIGH_RISK_LIMIT: usize = 10;

/// Churn probability above which a table row is highlighted
pub const HIGHLIGHT_THRESHOLD: f64 = 0.7;

// ============================================================================
// KPI CARDS
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct KpiCard {
    pub value: String,
    pub label: &'static str,
    pub color: &'static str,
}

fn mean(values: impl Iterator<Item = f64>) -> f64 {
    let (sum, count) = values.fold((0.0, 0usize), |(s, n), v| (s + v, n + 1));
    if count == 0 {
        0.0
    } else {
        sum / count as f64
    }
}

pub fn kpi_cards(dataset: &SyntheticDataset) -> Vec<KpiCard> {
    let total_revenue: f64 = dataset.financials.iter().map(|r| r.revenue).sum();
    let avg_churn = mean(dataset.customers.iter().map(|c| c.churn_probability));
    let avg_monthly = mean(dataset.customers.iter().map(|c| c.monthly_charges));

    vec![
        KpiCard {
            value: format!("€{:.1}M", total_revenue / 1_000_000.0),
            label: "Total Revenue",
            color: "#27ae60",
        },
        KpiCard {
            value: format_percent(avg_churn),
            label: "Avg Churn Risk",
            color: "#e74c3c",
        },
        KpiCard {
            value: format_thousands(dataset.customers.len() as f64),
            label: "Active Customers",
            color: "#3498db",
        },
        KpiCard {
            value: format!("€{:.0}", avg_monthly),
            label: "Avg Monthly Revenue",
            color: "#9b59b6",
        },
    ]
}

// ============================================================================
// HIGH-RISK TABLE
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct HighRiskRow {
    pub customer_id: u32,
    pub monthly_charges: String,
    pub tenure_months: String,
    pub churn_risk: String,
    pub segment: &'static str,
    pub highlighted: bool,
}

/// Customers with the largest churn probability, highest first
pub fn high_risk_customers(customers: &[CustomerRecord], limit: usize) -> Vec<&CustomerRecord> {
    let mut ranked: Vec<&CustomerRecord> = customers.iter().collect();
    ranked.sort_by(|a, b| b.churn_probability.total_cmp(&a.churn_probability));
    ranked.truncate(limit);
    ranked
}

pub fn high_risk_rows(customers: &[CustomerRecord]) -> Vec<HighRiskRow> {
    high_risk_customers(customers, HIGH_RISK_LIMIT)
        .into_iter()
        .map(|c| HighRiskRow {
            customer_id: c.customer_id,
            monthly_charges: format_euros(c.monthly_charges),
            tenure_months: format!("{:.1}", c.tenure_months),
            churn_risk: format_percent(c.churn_probability),
            segment: c.segment.label(),
            highlighted: c.churn_probability > HIGHLIGHT_THRESHOLD,
        })
        .collect()
}

// ============================================================================
// FORMATTING
// ============================================================================

/// Round to a whole number and group digits with commas ("12,345")
pub fn format_thousands(value: f64) -> String {
    let rounded = value.round();
    let digits = format!("{:.0}", rounded.abs());

    let mut grouped = String::new();
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    if rounded < 0.0 {
        format!("-{}", grouped)
    } else {
        grouped
    }
}

/// Whole euros with grouped digits, sign ahead of the symbol ("−€1,234")
pub fn format_euros(value: f64) -> String {
    let grouped = format_thousands(value);
    match grouped.strip_prefix('-') {
        Some(magnitude) => format!("−€{}", magnitude),
        None => format!("€{}", grouped),
    }
}

/// Fraction as a percentage with one decimal (0.1234 -> "12.3%")
pub fn format_percent(fraction: f64) -> String {
    format!("{:.1}%", fraction * 100.0)
}

pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(ch),
        }
    }
    out
}

// ============================================================================
// PAGE
// ============================================================================

fn render_kpi_cards(cards: &[KpiCard]) -> String {
    cards
        .iter()
        .map(|card| {
            format!(
                "        <div class=\"kpi-card\">\n            <h3 style=\"color: {}\">{}</h3>\n            <p>{}</p>\n        </div>",
                card.color,
                escape_html(&card.value),
                escape_html(card.label)
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn render_high_risk_rows(rows: &[HighRiskRow]) -> String {
    rows.iter()
        .map(|row| {
            let class = if row.highlighted { " class=\"high-risk\"" } else { "" };
            format!(
                "                <tr{}><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td></tr>",
                class,
                row.customer_id,
                escape_html(&row.monthly_charges),
                row.tenure_months,
                row.churn_risk,
                row.segment
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Render the full dashboard page for a generated dataset
pub fn render_page(config: &DashboardConfig, dataset: &SyntheticDataset) -> String {
    let chart_ids = ChartKind::ALL
        .iter()
        .map(|kind| format!("\"{}\"", kind.id()))
        .collect::<Vec<_>>()
        .join(", ");

    PAGE_TEMPLATE
        .replace("{{title}}", &escape_html(&config.title))
        .replace("{{kpi_cards}}", &render_kpi_cards(&kpi_cards(dataset)))
        .replace("{{high_risk_rows}}", &render_high_risk_rows(&high_risk_rows(&dataset.customers)))
        .replace("{{chart_ids}}", &format!("[{}]", chart_ids))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generators::{FinancialRecord, Segment};
    use chrono::NaiveDate;

    fn customer(id: u32, churn: f64) -> CustomerRecord {
        CustomerRecord {
            customer_id: id,
            monthly_charges: 1234.4,
            tenure_months: 12.345,
            total_charges: 1500.0,
            churn_probability: churn,
            segment: Segment::Premium,
            acquisition_date: NaiveDate::from_ymd_opt(2020, 1, 1).unwrap(),
        }
    }

    fn small_dataset() -> SyntheticDataset {
        let day = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        SyntheticDataset {
            customers: vec![customer(1, 0.2), customer(2, 0.4)],
            financials: vec![
                FinancialRecord::new(day, 1_500_000.0, 10.0, 1.0, 1),
                FinancialRecord::new(day, 1_000_000.0, 10.0, 1.0, 1),
            ],
        }
    }

    #[test]
    fn test_format_thousands() {
        assert_eq!(format_thousands(0.0), "0");
        assert_eq!(format_thousands(999.0), "999");
        assert_eq!(format_thousands(1000.0), "1,000");
        assert_eq!(format_thousands(1234567.6), "1,234,568");
        assert_eq!(format_thousands(-4321.0), "-4,321");
    }

    #[test]
    fn test_format_euros_sign_before_symbol() {
        assert_eq!(format_euros(1234.4), "€1,234");
        assert_eq!(format_euros(-12.4), "−€12");
        assert_eq!(format_euros(-4321.0), "−€4,321");
        assert_eq!(format_euros(-0.3), "€0");

        let mut refunded = customer(1, 0.9);
        refunded.monthly_charges = -12.4;
        assert_eq!(high_risk_rows(&[refunded])[0].monthly_charges, "−€12");
    }

    #[test]
    fn test_format_percent() {
        assert_eq!(format_percent(0.1234), "12.3%");
        assert_eq!(format_percent(1.0), "100.0%");
    }

    #[test]
    fn test_kpi_cards() {
        let cards = kpi_cards(&small_dataset());
        assert_eq!(cards.len(), 4);
        assert_eq!(cards[0].value, "€2.5M");
        assert_eq!(cards[1].value, "30.0%");
        assert_eq!(cards[2].value, "2");
        assert_eq!(cards[3].value, "€1234");
    }

    #[test]
    fn test_kpi_cards_empty_dataset() {
        let dataset = SyntheticDataset {
            customers: vec![],
            financials: vec![],
        };
        let cards = kpi_cards(&dataset);
        assert_eq!(cards[1].value, "0.0%");
        assert_eq!(cards[3].value, "€0");
    }

    #[test]
    fn test_high_risk_top_ten_descending() {
        let customers: Vec<CustomerRecord> = (1..=15)
            .map(|id| customer(id, id as f64 / 20.0))
            .collect();

        let rows = high_risk_rows(&customers);
        assert_eq!(rows.len(), HIGH_RISK_LIMIT);
        assert_eq!(rows[0].customer_id, 15);
        assert_eq!(rows[9].customer_id, 6);
        assert_eq!(rows[0].churn_risk, "75.0%");
        assert_eq!(rows[0].monthly_charges, "€1,234");
        assert_eq!(rows[0].tenure_months, "12.3");

        // Only 15/20 exceeds 0.7; 14/20 sits exactly on the threshold
        let highlighted: Vec<u32> = rows.iter().filter(|r| r.highlighted).map(|r| r.customer_id).collect();
        assert_eq!(highlighted, vec![15]);
    }

    #[test]
    fn test_render_page_fills_placeholders() {
        let config = DashboardConfig::default();
        let html = render_page(&config, &small_dataset());

        assert!(!html.contains("{{"));
        assert!(html.contains("<title>Customer Analytics Dashboard - Interactive BI Demo</title>"));
        assert!(html.contains("€2.5M"));
        assert!(html.contains("\"revenue-trend\", \"customer-segments\", \"churn-analysis\", \"financial-metrics\""));
        for kind in ChartKind::ALL {
            assert!(html.contains(&format!("<div id=\"{}\"", kind.id())));
        }
    }

    #[test]
    fn test_escape_html() {
        assert_eq!(escape_html("<a href='x'>&</a>"), "&lt;a href=&#39;x&#39;&gt;&amp;&lt;/a&gt;");
    }
}
