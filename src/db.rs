use anyhow::{Context, Result};
use chrono::{Days, NaiveDate};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::{Distribution, Normal, Poisson};
use rusqlite::{params, Connection};

/// Date format used for every DATE column (ISO, sorts lexically)
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Customer account (one row of `customers`)
#[derive(Debug, Clone, PartialEq)]
pub struct Customer {
    pub customer_id: i64,
    pub company_name: String,
    pub industry: String,
    pub signup_date: NaiveDate,
    pub subscription_tier: String,
    pub monthly_revenue: f64,
    pub is_active: bool,
    pub country: String,
}

impl Customer {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        customer_id: i64,
        company_name: &str,
        industry: &str,
        signup_date: NaiveDate,
        subscription_tier: &str,
        monthly_revenue: f64,
        is_active: bool,
        country: &str,
    ) -> Self {
        Customer {
            customer_id,
            company_name: company_name.to_string(),
            industry: industry.to_string(),
            signup_date,
            subscription_tier: subscription_tier.to_string(),
            monthly_revenue,
            is_active,
            country: country.to_string(),
        }
    }
}

/// Daily product usage for one customer (one row of `usage_metrics`)
#[derive(Debug, Clone, PartialEq)]
pub struct UsageMetric {
    pub metric_id: i64,
    pub customer_id: i64,
    pub date: NaiveDate,
    pub contacts_captured: i64,
    pub api_calls: i64,
    pub storage_used_mb: f64,
}

/// Billing event (one row of `financial_data`)
#[derive(Debug, Clone, PartialEq)]
pub struct FinancialTransaction {
    pub transaction_id: i64,
    pub customer_id: i64,
    pub date: NaiveDate,
    pub amount: f64,
    /// subscription, setup_fee or overage
    pub transaction_type: String,
    pub currency: String,
}

pub fn setup_database(conn: &Connection) -> Result<()> {
    // ==========================================================================
    // Customers
    // ==========================================================================
    conn.execute(
        "CREATE TABLE IF NOT EXISTS customers (
            customer_id INTEGER PRIMARY KEY,
            company_name TEXT,
            industry TEXT,
            signup_date DATE,
            subscription_tier TEXT,
            monthly_revenue REAL,
            is_active BOOLEAN,
            country TEXT
        )",
        [],
    )?;

    // ==========================================================================
    // Usage metrics (daily, per customer)
    // ==========================================================================
    conn.execute(
        "CREATE TABLE IF NOT EXISTS usage_metrics (
            metric_id INTEGER PRIMARY KEY,
            customer_id INTEGER,
            date DATE,
            contacts_captured INTEGER,
            api_calls INTEGER,
            storage_used_mb REAL,
            FOREIGN KEY (customer_id) REFERENCES customers (customer_id)
        )",
        [],
    )?;

    // ==========================================================================
    // Financial transactions
    // ==========================================================================
    conn.execute(
        "CREATE TABLE IF NOT EXISTS financial_data (
            transaction_id INTEGER PRIMARY KEY,
            customer_id INTEGER,
            date DATE,
            amount REAL,
            transaction_type TEXT,
            currency TEXT,
            FOREIGN KEY (customer_id) REFERENCES customers (customer_id)
        )",
        [],
    )?;

    // ==========================================================================
    // Indexes
    // ==========================================================================
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_usage_customer_date ON usage_metrics(customer_id, date)",
        [],
    )?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_financial_customer ON financial_data(customer_id)",
        [],
    )?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_financial_date ON financial_data(date)",
        [],
    )?;

    Ok(())
}

pub fn insert_customers(conn: &Connection, customers: &[Customer]) -> Result<usize> {
    let mut stmt = conn.prepare(
        "INSERT INTO customers (
            customer_id, company_name, industry, signup_date,
            subscription_tier, monthly_revenue, is_active, country
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
    )?;

    for c in customers {
        stmt.execute(params![
            c.customer_id,
            c.company_name,
            c.industry,
            c.signup_date.format(DATE_FORMAT).to_string(),
            c.subscription_tier,
            c.monthly_revenue,
            c.is_active,
            c.country,
        ])
        .with_context(|| format!("Failed to insert customer {}", c.customer_id))?;
    }

    Ok(customers.len())
}

pub fn insert_usage_metrics(conn: &Connection, metrics: &[UsageMetric]) -> Result<usize> {
    let mut stmt = conn.prepare(
        "INSERT INTO usage_metrics (
            metric_id, customer_id, date, contacts_captured, api_calls, storage_used_mb
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
    )?;

    for m in metrics {
        stmt.execute(params![
            m.metric_id,
            m.customer_id,
            m.date.format(DATE_FORMAT).to_string(),
            m.contacts_captured,
            m.api_calls,
            m.storage_used_mb,
        ])
        .with_context(|| format!("Failed to insert usage metric {}", m.metric_id))?;
    }

    Ok(metrics.len())
}

pub fn insert_financial_transactions(conn: &Connection, transactions: &[FinancialTransaction]) -> Result<usize> {
    let mut stmt = conn.prepare(
        "INSERT INTO financial_data (
            transaction_id, customer_id, date, amount, transaction_type, currency
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
    )?;

    for t in transactions {
        stmt.execute(params![
            t.transaction_id,
            t.customer_id,
            t.date.format(DATE_FORMAT).to_string(),
            t.amount,
            t.transaction_type,
            t.currency,
        ])
        .with_context(|| format!("Failed to insert transaction {}", t.transaction_id))?;
    }

    Ok(transactions.len())
}

pub fn count_rows(conn: &Connection, table: &str) -> Result<i64> {
    // Table names cannot be bound as parameters
    let allowed = ["customers", "usage_metrics", "financial_data"];
    if !allowed.contains(&table) {
        anyhow::bail!("Unknown table: {}", table);
    }

    let count: i64 = conn.query_row(&format!("SELECT COUNT(*) FROM {}", table), [], |row| row.get(0))?;

    Ok(count)
}

// ============================================================================
// Sample data
// ============================================================================

/// Days of usage history generated per customer
pub const USAGE_HISTORY_DAYS: u64 = 30;

/// Months of subscription billing generated per customer
pub const BILLING_MONTHS: u64 = 6;

/// Customer whose usage is generated to look like a churn risk
const DECLINING_CUSTOMER_ID: i64 = 4;

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap_or(NaiveDate::MIN)
}

pub fn sample_customers() -> Vec<Customer> {
    vec![
        Customer::new(1, "TechCorp GmbH", "Technology", date(2023, 1, 15), "Enterprise", 299.99, true, "Germany"),
        Customer::new(2, "StartupXYZ", "Startup", date(2023, 3, 20), "Professional", 99.99, true, "Germany"),
        Customer::new(3, "BigCorp AG", "Manufacturing", date(2022, 6, 10), "Enterprise", 499.99, true, "Germany"),
        Customer::new(4, "SmallBiz Ltd", "Retail", date(2023, 8, 5), "Basic", 29.99, false, "Austria"),
    ]
}

fn days_before(today: NaiveDate, days: u64) -> Result<NaiveDate> {
    today
        .checked_sub_days(Days::new(days))
        .with_context(|| format!("{} days before {} is out of range", days, today))
}

pub fn sample_usage(customers: &[Customer], today: NaiveDate, rng: &mut StdRng) -> Result<Vec<UsageMetric>> {
    let busy_contacts = Poisson::new(50.0).context("invalid contacts distribution")?;
    let busy_calls = Poisson::new(200.0).context("invalid api calls distribution")?;
    let quiet_contacts = Poisson::new(10.0).context("invalid contacts distribution")?;
    let quiet_calls = Poisson::new(50.0).context("invalid api calls distribution")?;
    let storage = Normal::new(1000.0, 200.0).context("invalid storage distribution")?;

    let mut metrics = Vec::new();

    for customer in customers {
        for day in 0..USAGE_HISTORY_DAYS {
            let (contacts, api_calls): (f64, f64) = if customer.customer_id == DECLINING_CUSTOMER_ID {
                // Active only in the most recent 20 days
                if day < 20 {
                    (quiet_contacts.sample(rng), quiet_calls.sample(rng))
                } else {
                    (0.0, 0.0)
                }
            } else {
                (busy_contacts.sample(rng), busy_calls.sample(rng))
            };

            metrics.push(UsageMetric {
                metric_id: metrics.len() as i64 + 1,
                customer_id: customer.customer_id,
                date: days_before(today, day)?,
                contacts_captured: contacts as i64,
                api_calls: api_calls as i64,
                storage_used_mb: storage.sample(rng),
            });
        }
    }

    Ok(metrics)
}

pub fn sample_transactions(
    customers: &[Customer],
    today: NaiveDate,
    rng: &mut StdRng,
) -> Result<Vec<FinancialTransaction>> {
    let mut transactions: Vec<FinancialTransaction> = Vec::new();

    let mut push = |customer_id: i64, date: NaiveDate, amount: f64, kind: &str| {
        let transaction_id = transactions.len() as i64 + 1;
        transactions.push(FinancialTransaction {
            transaction_id,
            customer_id,
            date,
            amount,
            transaction_type: kind.to_string(),
            currency: "EUR".to_string(),
        });
    };

    for customer in customers {
        for month_offset in 0..BILLING_MONTHS {
            let billed_on = days_before(today, 30 * month_offset)?;

            push(customer.customer_id, billed_on, customer.monthly_revenue, "subscription");

            // Setup fee: half of one month, on the most recent billing date
            if month_offset == 0 {
                push(customer.customer_id, billed_on, customer.monthly_revenue * 0.5, "setup_fee");
            }

            // 30% chance of an overage charge each month
            if rng.gen::<f64>() > 0.7 {
                push(customer.customer_id, billed_on, rng.gen_range(10.0..50.0), "overage");
            }
        }
    }

    Ok(transactions)
}

/// Build the in-memory sample database used by the query demo
pub fn create_sample_database(seed: u64, today: NaiveDate) -> Result<Connection> {
    let conn = Connection::open_in_memory().context("Failed to open in-memory database")?;
    setup_database(&conn)?;

    let mut rng = StdRng::seed_from_u64(seed);
    let customers = sample_customers();
    let usage = sample_usage(&customers, today, &mut rng)?;
    let transactions = sample_transactions(&customers, today, &mut rng)?;

    insert_customers(&conn, &customers)?;
    insert_usage_metrics(&conn, &usage)?;
    insert_financial_transactions(&conn, &transactions)?;

    tracing::debug!(
        customers = customers.len(),
        usage_rows = usage.len(),
        transactions = transactions.len(),
        "sample database ready"
    );

    Ok(conn)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 6, 15).unwrap()
    }

    #[test]
    fn test_setup_is_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        setup_database(&conn).unwrap();
        setup_database(&conn).unwrap();

        assert_eq!(count_rows(&conn, "customers").unwrap(), 0);
    }

    #[test]
    fn test_sample_database_row_counts() {
        let conn = create_sample_database(42, today()).unwrap();

        assert_eq!(count_rows(&conn, "customers").unwrap(), 4);
        assert_eq!(count_rows(&conn, "usage_metrics").unwrap(), 4 * 30);

        // 24 subscriptions + 4 setup fees + random overages
        let financial = count_rows(&conn, "financial_data").unwrap();
        assert!((28..=52).contains(&financial), "got {} transactions", financial);
    }

    #[test]
    fn test_declining_customer_goes_quiet() {
        let customers = sample_customers();
        let mut rng = StdRng::seed_from_u64(42);
        let usage = sample_usage(&customers, today(), &mut rng).unwrap();

        let old_days: Vec<&UsageMetric> = usage
            .iter()
            .filter(|m| m.customer_id == 4 && m.date < days_before(today(), 19).unwrap())
            .collect();
        assert_eq!(old_days.len(), 10);
        assert!(old_days.iter().all(|m| m.contacts_captured == 0 && m.api_calls == 0));
    }

    #[test]
    fn test_subscription_schedule() {
        let customers = sample_customers();
        let mut rng = StdRng::seed_from_u64(7);
        let transactions = sample_transactions(&customers, today(), &mut rng).unwrap();

        let subscriptions: Vec<&FinancialTransaction> = transactions
            .iter()
            .filter(|t| t.customer_id == 3 && t.transaction_type == "subscription")
            .collect();
        assert_eq!(subscriptions.len(), 6);
        assert!(subscriptions.iter().all(|t| t.amount == 499.99));
        assert_eq!(subscriptions[5].date, NaiveDate::from_ymd_opt(2025, 1, 16).unwrap());

        let setup: Vec<&FinancialTransaction> = transactions
            .iter()
            .filter(|t| t.transaction_type == "setup_fee")
            .collect();
        assert_eq!(setup.len(), 4);
        assert_eq!(setup[0].amount, 299.99 * 0.5);
        assert_eq!(setup[0].date, today());

        for overage in transactions.iter().filter(|t| t.transaction_type == "overage") {
            assert!((10.0..50.0).contains(&overage.amount));
        }

        // Ids are sequential from 1
        for (i, t) in transactions.iter().enumerate() {
            assert_eq!(t.transaction_id, i as i64 + 1);
        }
    }

    #[test]
    fn test_dates_stored_as_iso_text() {
        let conn = Connection::open_in_memory().unwrap();
        setup_database(&conn).unwrap();
        insert_customers(&conn, &sample_customers()[..1]).unwrap();

        let signup: String = conn
            .query_row("SELECT signup_date FROM customers WHERE customer_id = 1", [], |row| row.get(0))
            .unwrap();
        assert_eq!(signup, "2023-01-15");
    }

    #[test]
    fn test_count_rows_rejects_unknown_table() {
        let conn = Connection::open_in_memory().unwrap();
        assert!(count_rows(&conn, "sqlite_master; DROP TABLE x").is_err());
    }
}
