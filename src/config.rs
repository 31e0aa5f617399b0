// ⚙️ Configuration - Generator and dashboard settings
// Defaults reproduce the demo exactly; the dashboard address can be overridden
// through DASHBOARD_HOST / DASHBOARD_PORT.

use std::env;

// ============================================================================
// GENERATOR CONFIG
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct GeneratorConfig {
    /// Seed for every random draw (same seed = same dataset)
    pub seed: u64,

    /// Number of synthetic customers
    pub customers: usize,

    /// Calendar year covered by the daily financial table
    pub financial_year: i32,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        GeneratorConfig {
            seed: 42,
            customers: 1000,
            financial_year: 2024,
        }
    }
}

impl GeneratorConfig {
    pub fn with_seed(seed: u64) -> Self {
        GeneratorConfig {
            seed,
            ..Default::default()
        }
    }
}

// ============================================================================
// DASHBOARD CONFIG
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct DashboardConfig {
    pub host: String,
    pub port: u16,
    pub title: String,
    pub generator: GeneratorConfig,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        DashboardConfig {
            host: "127.0.0.1".to_string(),
            port: 8050,
            title: "Customer Analytics Dashboard - Interactive BI Demo".to_string(),
            generator: GeneratorConfig::default(),
        }
    }
}

impl DashboardConfig {
    /// Defaults, with DASHBOARD_HOST / DASHBOARD_PORT applied when set
    pub fn from_env() -> Self {
        let mut config = DashboardConfig::default();

        if let Ok(host) = env::var("DASHBOARD_HOST") {
            if !host.trim().is_empty() {
                config.host = host.trim().to_string();
            }
        }

        if let Ok(port) = env::var("DASHBOARD_PORT") {
            match port.trim().parse::<u16>() {
                Ok(port) => config.port = port,
                Err(_) => tracing::warn!(value = %port, "ignoring invalid DASHBOARD_PORT"),
            }
        }

        config
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn url(&self) -> String {
        format!("http://{}", self.bind_addr())
    }
}
