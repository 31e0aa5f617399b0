// 🎲 Data Generators - Seeded synthetic business data
// Customer table + daily financial table for the dashboard.
//
// Every column is drawn from a seeded StdRng so the same config always
// produces the same dataset. Seasonal components are sine waves with a
// 365-day period layered on top of the random noise.

use crate::config::GeneratorConfig;
use anyhow::{Context, Result};
use chrono::{Datelike, Days, NaiveDate};
use rand::distributions::WeightedIndex;
use rand::rngs::StdRng;
use rand::SeedableRng;
use rand_distr::{Beta, Distribution, Exp, Normal, Poisson};
use serde::Serialize;
use std::f64::consts::PI;

// ============================================================================
// SEGMENT
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum Segment {
    Budget,
    Premium,
    Enterprise,
}

impl Segment {
    pub const ALL: [Segment; 3] = [Segment::Budget, Segment::Premium, Segment::Enterprise];

    pub fn label(&self) -> &'static str {
        match self {
            Segment::Budget => "Budget",
            Segment::Premium => "Premium",
            Segment::Enterprise => "Enterprise",
        }
    }

    /// Share of customers drawn into this segment
    pub fn weight(&self) -> f64 {
        match self {
            Segment::Budget => 0.5,
            Segment::Premium => 0.3,
            Segment::Enterprise => 0.2,
        }
    }

    /// Chart color used for this segment
    pub fn color(&self) -> &'static str {
        match self {
            Segment::Budget => "#e74c3c",
            Segment::Premium => "#f39c12",
            Segment::Enterprise => "#27ae60",
        }
    }
}

// ============================================================================
// RECORDS
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CustomerRecord {
    pub customer_id: u32,
    pub monthly_charges: f64,
    pub tenure_months: f64,
    pub total_charges: f64,
    /// Simulated cancellation risk, always within [0, 1]
    pub churn_probability: f64,
    pub segment: Segment,
    pub acquisition_date: NaiveDate,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FinancialRecord {
    pub date: NaiveDate,
    pub revenue: f64,
    pub costs: f64,
    pub active_users: f64,
    pub new_signups: u64,
    pub profit: f64,
}

impl FinancialRecord {
    /// Build a daily record; profit is always revenue - costs
    pub fn new(date: NaiveDate, revenue: f64, costs: f64, active_users: f64, new_signups: u64) -> Self {
        FinancialRecord {
            date,
            revenue,
            costs,
            active_users,
            new_signups,
            profit: revenue - costs,
        }
    }

    /// Month key ("YYYY-MM") used for group-by
    pub fn month(&self) -> String {
        self.date.format("%Y-%m").to_string()
    }
}

// ============================================================================
// GENERATION
// ============================================================================

/// Start of the customer acquisition sequence (one customer per day)
const ACQUISITION_START: (i32, u32, u32) = (2020, 1, 1);

fn seasonal(day_index: usize) -> f64 {
    (day_index as f64 * 2.0 * PI / 365.0).sin()
}

pub fn generate_customers(config: &GeneratorConfig) -> Result<Vec<CustomerRecord>> {
    let mut rng = StdRng::seed_from_u64(config.seed);
    let n = config.customers;

    let charges = Normal::new(65.0, 20.0).context("invalid monthly charges distribution")?;
    let tenure = Exp::new(1.0 / 24.0).context("invalid tenure distribution")?;
    let totals = Normal::new(1500.0, 800.0).context("invalid total charges distribution")?;
    let churn = Beta::new(2.0, 8.0).context("invalid churn distribution")?;
    let segments = WeightedIndex::new(Segment::ALL.iter().map(|s| s.weight()))
        .context("invalid segment weights")?;

    // Column-wise draws, one full column at a time
    let monthly_charges: Vec<f64> = (0..n).map(|_| charges.sample(&mut rng)).collect();
    let tenure_months: Vec<f64> = (0..n).map(|_| tenure.sample(&mut rng)).collect();
    let total_charges: Vec<f64> = (0..n).map(|_| totals.sample(&mut rng)).collect();
    let churn_probability: Vec<f64> = (0..n).map(|_| churn.sample(&mut rng)).collect();
    let segment: Vec<Segment> = (0..n)
        .map(|_| Segment::ALL[segments.sample(&mut rng)])
        .collect();

    let (y, m, d) = ACQUISITION_START;
    let start = NaiveDate::from_ymd_opt(y, m, d).context("invalid acquisition start date")?;

    let mut customers = Vec::with_capacity(n);
    for i in 0..n {
        let acquisition_date = start
            .checked_add_days(Days::new(i as u64))
            .context("acquisition date out of range")?;

        customers.push(CustomerRecord {
            customer_id: (i + 1) as u32,
            monthly_charges: monthly_charges[i],
            tenure_months: tenure_months[i],
            total_charges: total_charges[i],
            churn_probability: churn_probability[i].clamp(0.0, 1.0),
            segment: segment[i],
            acquisition_date,
        });
    }

    Ok(customers)
}

pub fn generate_financials(config: &GeneratorConfig) -> Result<Vec<FinancialRecord>> {
    // Separate stream from the customer table
    let mut rng = StdRng::seed_from_u64(config.seed.wrapping_add(1));

    let year = config.financial_year;
    let first = NaiveDate::from_ymd_opt(year, 1, 1)
        .with_context(|| format!("invalid financial year: {}", year))?;
    let dates: Vec<NaiveDate> = first.iter_days().take_while(|d| d.year() == year).collect();
    let n = dates.len();

    let revenue = Normal::new(50_000.0, 10_000.0).context("invalid revenue distribution")?;
    let costs = Normal::new(30_000.0, 5_000.0).context("invalid cost distribution")?;
    let users = Poisson::new(8_000.0).context("invalid active users distribution")?;
    let signups = Poisson::new(150.0).context("invalid signup distribution")?;

    let revenue_col: Vec<f64> = (0..n)
        .map(|i| revenue.sample(&mut rng) + seasonal(i) * 5_000.0)
        .collect();
    let cost_col: Vec<f64> = (0..n).map(|_| costs.sample(&mut rng)).collect();
    let users_col: Vec<f64> = (0..n)
        .map(|i| {
            let base: f64 = users.sample(&mut rng);
            base + seasonal(i) * 1_000.0
        })
        .collect();
    let signup_col: Vec<u64> = (0..n)
        .map(|_| {
            let count: f64 = signups.sample(&mut rng);
            count as u64
        })
        .collect();

    Ok(dates
        .into_iter()
        .enumerate()
        .map(|(i, date)| FinancialRecord::new(date, revenue_col[i], cost_col[i], users_col[i], signup_col[i]))
        .collect())
}

// ============================================================================
// DATASET
// ============================================================================

/// Both dashboard tables, generated once at startup and only read afterwards
#[derive(Debug, Clone)]
pub struct SyntheticDataset {
    pub customers: Vec<CustomerRecord>,
    pub financials: Vec<FinancialRecord>,
}

impl SyntheticDataset {
    pub fn generate(config: &GeneratorConfig) -> Result<Self> {
        let customers = generate_customers(config)?;
        let financials = generate_financials(config)?;

        tracing::debug!(
            seed = config.seed,
            customers = customers.len(),
            days = financials.len(),
            "synthetic dataset generated"
        );

        Ok(SyntheticDataset { customers, financials })
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_customer_row_count() {
        let customers = generate_customers(&GeneratorConfig::default()).unwrap();
        assert_eq!(customers.len(), 1000);
        assert_eq!(customers[0].customer_id, 1);
        assert_eq!(customers[999].customer_id, 1000);
    }

    #[test]
    fn test_churn_probability_in_unit_interval() {
        let customers = generate_customers(&GeneratorConfig::default()).unwrap();
        assert!(customers
            .iter()
            .all(|c| (0.0..=1.0).contains(&c.churn_probability)));
    }

    #[test]
    fn test_churn_is_right_skewed() {
        // Beta(2, 8) has mean 0.2
        let customers = generate_customers(&GeneratorConfig::default()).unwrap();
        let mean = customers.iter().map(|c| c.churn_probability).sum::<f64>() / customers.len() as f64;
        assert!((0.15..0.25).contains(&mean), "mean churn was {}", mean);
    }

    #[test]
    fn test_acquisition_dates_are_consecutive_days() {
        let customers = generate_customers(&GeneratorConfig::default()).unwrap();
        assert_eq!(customers[0].acquisition_date, NaiveDate::from_ymd_opt(2020, 1, 1).unwrap());
        assert_eq!(customers[31].acquisition_date, NaiveDate::from_ymd_opt(2020, 2, 1).unwrap());
    }

    #[test]
    fn test_every_segment_is_drawn() {
        let customers = generate_customers(&GeneratorConfig::default()).unwrap();
        for segment in Segment::ALL {
            let count = customers.iter().filter(|c| c.segment == segment).count();
            let share = count as f64 / customers.len() as f64;
            assert!((share - segment.weight()).abs() < 0.06, "{:?} share {}", segment, share);
        }
    }

    #[test]
    fn test_same_seed_same_data() {
        let a = SyntheticDataset::generate(&GeneratorConfig::default()).unwrap();
        let b = SyntheticDataset::generate(&GeneratorConfig::default()).unwrap();
        assert_eq!(a.customers, b.customers);
        assert_eq!(a.financials, b.financials);

        let c = generate_customers(&GeneratorConfig::with_seed(43)).unwrap();
        assert_ne!(a.customers, c);
    }

    #[test]
    fn test_financial_year_covers_every_day() {
        let financials = generate_financials(&GeneratorConfig::default()).unwrap();
        // 2024 is a leap year
        assert_eq!(financials.len(), 366);
        assert_eq!(financials[0].date, NaiveDate::from_ymd_opt(2024, 1, 1).unwrap());
        assert_eq!(financials[365].date, NaiveDate::from_ymd_opt(2024, 12, 31).unwrap());
        assert_eq!(financials[45].month(), "2024-02");
    }

    #[test]
    fn test_profit_is_revenue_minus_costs() {
        let financials = generate_financials(&GeneratorConfig::default()).unwrap();
        for row in &financials {
            assert_eq!(row.profit, row.revenue - row.costs);
        }
    }

    #[test]
    fn test_invalid_year_is_an_error() {
        let config = GeneratorConfig {
            financial_year: i32::MAX,
            ..Default::default()
        };
        assert!(generate_financials(&config).is_err());
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(32))]

        #[test]
        fn prop_customer_table_shape(seed in any::<u64>(), customers in 0usize..200) {
            let config = GeneratorConfig { seed, customers, financial_year: 2024 };
            let rows = generate_customers(&config).unwrap();
            prop_assert_eq!(rows.len(), customers);
            for row in &rows {
                prop_assert!(row.churn_probability >= 0.0 && row.churn_probability <= 1.0);
                prop_assert!(row.tenure_months >= 0.0);
            }
        }

        #[test]
        fn prop_profit_identity(seed in any::<u64>()) {
            let rows = generate_financials(&GeneratorConfig::with_seed(seed)).unwrap();
            for row in &rows {
                prop_assert_eq!(row.profit, row.revenue - row.costs);
            }
        }
    }
}
