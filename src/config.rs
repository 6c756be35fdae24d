use crate::calculator::SectorRules;
use crate::error::{AppError, Result};
use crate::types::Sector;

pub const TOKENINFO_URL: &str = "https://oauth2.googleapis.com/tokeninfo";

/// CORS relay prepended to the price page URL.
pub const PRICE_PROXY_URL: &str = "https://corsproxy.io/?";

/// Company detail page; `{symbol}` is replaced with the stock name.
pub const PRICE_PAGE_URL: &str = "https://merolagani.com/CompanyDetail.aspx?symbol={symbol}";

/// Element holding the last traded price on the company detail page.
pub const PRICE_SELECTOR: &str = "#ctl00_ContentPlaceHolder1_CompanyDetail1_lblMarketPrice";

/// Maximum price lookups in flight at once during a listing fan-out.
pub const PRICE_LOOKUP_CONCURRENCY: usize = 4;

/// Timeout applied to every outbound HTTP request (seconds).
pub const HTTP_TIMEOUT_SECS: u64 = 10;

/// File name offered for the workbook export.
pub const EXPORT_FILE_NAME: &str = "Stock_List_By_Sector.xlsx";

pub const EXPORT_CSV_FILE_NAME: &str = "Stock_List_By_Sector.csv";

#[derive(Debug, Clone)]
pub struct Config {
    pub log_level: String,
    pub db_path: String,
    pub api_port: u16,
    /// Origins allowed by CORS (ALLOWED_ORIGINS, comma-separated). Empty = any.
    pub allowed_origins: Vec<String>,
    /// Emails permitted to create, edit and delete (ALLOWED_OPERATORS, comma-separated).
    pub allowed_operators: Vec<String>,
    pub tokeninfo_url: String,
    /// Expected `aud` claim of operator ID tokens (OAUTH_CLIENT_ID). Unchecked when unset.
    pub oauth_client_id: Option<String>,
    pub price_proxy_url: String,
    pub price_page_url: String,
    pub price_selector: String,
    pub price_lookup_concurrency: usize,
    pub http_timeout_secs: u64,
    /// Reject warnings (promoter above total, zero total) as well as errors.
    pub strict_validation: bool,
    /// Sectors without listed-date tracking (EXEMPT_SECTORS). Deployment-time only.
    pub sector_rules: SectorRules,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            log_level: std::env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            db_path: std::env::var("DB_PATH").unwrap_or_else(|_| "stocklist.db".to_string()),
            api_port: std::env::var("API_PORT")
                .unwrap_or_else(|_| "3000".to_string())
                .parse::<u16>()
                .map_err(|_| AppError::Config("API_PORT must be a valid port number".to_string()))?,
            allowed_origins: split_list(&std::env::var("ALLOWED_ORIGINS").unwrap_or_default()),
            allowed_operators: split_list(&std::env::var("ALLOWED_OPERATORS").unwrap_or_default()),
            tokeninfo_url: std::env::var("TOKENINFO_URL")
                .unwrap_or_else(|_| TOKENINFO_URL.to_string()),
            oauth_client_id: std::env::var("OAUTH_CLIENT_ID")
                .ok()
                .filter(|s| !s.trim().is_empty()),
            price_proxy_url: std::env::var("PRICE_PROXY_URL")
                .unwrap_or_else(|_| PRICE_PROXY_URL.to_string()),
            price_page_url: std::env::var("PRICE_PAGE_URL")
                .unwrap_or_else(|_| PRICE_PAGE_URL.to_string()),
            price_selector: std::env::var("PRICE_SELECTOR")
                .unwrap_or_else(|_| PRICE_SELECTOR.to_string()),
            price_lookup_concurrency: std::env::var("PRICE_LOOKUP_CONCURRENCY")
                .unwrap_or_else(|_| PRICE_LOOKUP_CONCURRENCY.to_string())
                .parse::<usize>()
                .map(|n| n.max(1))
                .unwrap_or(PRICE_LOOKUP_CONCURRENCY),
            http_timeout_secs: std::env::var("HTTP_TIMEOUT_SECS")
                .unwrap_or_else(|_| HTTP_TIMEOUT_SECS.to_string())
                .parse::<u64>()
                .unwrap_or(HTTP_TIMEOUT_SECS),
            strict_validation: std::env::var("STRICT_VALIDATION")
                .map(|v| v == "true" || v == "1")
                .unwrap_or(false),
            sector_rules: match std::env::var("EXEMPT_SECTORS") {
                Ok(raw) if !raw.trim().is_empty() => parse_sector_rules(&raw)?,
                _ => SectorRules::default(),
            },
        })
    }

    /// Defaults suitable for tests: in-memory database, no operators.
    pub fn for_tests() -> Self {
        Self {
            log_level: "debug".to_string(),
            db_path: ":memory:".to_string(),
            api_port: 0,
            allowed_origins: Vec::new(),
            allowed_operators: Vec::new(),
            tokeninfo_url: TOKENINFO_URL.to_string(),
            oauth_client_id: None,
            price_proxy_url: String::new(),
            price_page_url: PRICE_PAGE_URL.to_string(),
            price_selector: PRICE_SELECTOR.to_string(),
            price_lookup_concurrency: PRICE_LOOKUP_CONCURRENCY,
            http_timeout_secs: 2,
            strict_validation: false,
            sector_rules: SectorRules::default(),
        }
    }
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

fn parse_sector_rules(raw: &str) -> Result<SectorRules> {
    let exempt = split_list(raw)
        .iter()
        .map(|s| s.parse::<Sector>().map_err(AppError::Config))
        .collect::<Result<Vec<_>>>()?;
    Ok(SectorRules::with_exempt(&exempt))
}
