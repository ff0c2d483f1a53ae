//! Application configuration loaded from environment variables.

use std::str::FromStr;

use booking::BookingPolicy;
use chrono::Duration;
use domain::TaxRate;

const MAX_CUTOFF_HOURS: i64 = 10 * 366 * 24;
const MAX_DUE_DAYS: i64 = 10 * 366;

/// Output format of the log subscriber.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// Human readable lines.
    #[default]
    Pretty,
    /// One JSON object per line.
    Json,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "pretty" | "text" => Ok(LogFormat::Pretty),
            "json" => Ok(LogFormat::Json),
            other => Err(format!("unknown log format: {other}")),
        }
    }
}

/// Server configuration with sensible defaults.
///
/// Reads from environment variables:
/// - `HOST`: bind address (default `0.0.0.0`)
/// - `PORT`: listen port (default `3000`)
/// - `RUST_LOG`: tracing filter directive (default `info`)
/// - `LOG_FORMAT`: `pretty` or `json` (default `pretty`)
/// - `DATABASE_URL`: PostgreSQL connection string; unset keeps data in memory
/// - `DATABASE_MAX_CONNECTIONS`: pool size (default `10`)
/// - `TAX_RATE_BPS`: VAT in basis points (default `1900`)
/// - `CANCELLATION_CUTOFF_HOURS`: hours before the event when cancelling closes (default `0`)
/// - `INVOICE_DUE_DAYS`: payment term of issued invoices (unset: no due date)
///
/// Values that fail to parse or fall outside their range fall back to their
/// defaults. Periods are capped at ten years.
#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub log_level: String,
    pub log_format: LogFormat,
    pub database_url: Option<String>,
    pub database_max_connections: u32,
    pub tax_rate_bps: u32,
    pub cancellation_cutoff_hours: i64,
    pub invoice_due_days: Option<i64>,
}

impl Config {
    /// Loads configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds configuration from an arbitrary key lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        Self {
            host: lookup("HOST").unwrap_or(defaults.host),
            port: parsed(&lookup, "PORT").unwrap_or(defaults.port),
            log_level: lookup("RUST_LOG").unwrap_or(defaults.log_level),
            log_format: lookup("LOG_FORMAT")
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.log_format),
            database_url: lookup("DATABASE_URL").filter(|url| !url.is_empty()),
            database_max_connections: parsed(&lookup, "DATABASE_MAX_CONNECTIONS")
                .unwrap_or(defaults.database_max_connections),
            tax_rate_bps: parsed(&lookup, "TAX_RATE_BPS").unwrap_or(defaults.tax_rate_bps),
            cancellation_cutoff_hours: parsed(&lookup, "CANCELLATION_CUTOFF_HOURS")
                .filter(|h: &i64| (0..=MAX_CUTOFF_HOURS).contains(h))
                .unwrap_or(defaults.cancellation_cutoff_hours),
            invoice_due_days: parsed(&lookup, "INVOICE_DUE_DAYS")
                .filter(|d: &i64| (1..=MAX_DUE_DAYS).contains(d)),
        }
    }

    /// Returns the `"host:port"` bind address string.
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Business settings handed to the booking services.
    pub fn policy(&self) -> BookingPolicy {
        BookingPolicy::default()
            .with_tax_rate(TaxRate::from_basis_points(self.tax_rate_bps))
            .with_cancellation_cutoff(Duration::hours(self.cancellation_cutoff_hours))
            .with_invoice_due(self.invoice_due_days.map(Duration::days))
    }
}

/// Looks up `key` and parses it, treating unparsable values as unset.
fn parsed<T: FromStr>(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Option<T> {
    lookup(key).and_then(|v| v.trim().parse().ok())
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            database_url: None,
            database_max_connections: 10,
            tax_rate_bps: TaxRate::STANDARD.basis_points(),
            cancellation_cutoff_hours: 0,
            invoice_due_days: None,
        }
    }
}
