use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures_util::stream::{self, StreamExt};
use scraper::{Html, Selector};
use tracing::{debug, warn};

use crate::api::latency::LatencyStats;
use crate::config::Config;
use crate::error::{AppError, Result};
use crate::types::PriceQuote;

/// Scrapes the last traded price for a symbol from the company detail page,
/// reached through a CORS relay.
#[derive(Clone)]
pub struct PriceLookup {
    client: reqwest::Client,
    proxy_url: String,
    page_url: String,
    selector: Selector,
    concurrency: usize,
    latency: Arc<LatencyStats>,
}

impl PriceLookup {
    pub fn new(cfg: &Config, latency: Arc<LatencyStats>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(cfg.http_timeout_secs))
            .build()?;
        let selector = Selector::parse(&cfg.price_selector).map_err(|e| {
            AppError::Config(format!("PRICE_SELECTOR {:?} is invalid: {e}", cfg.price_selector))
        })?;
        Ok(Self {
            client,
            proxy_url: cfg.price_proxy_url.clone(),
            page_url: cfg.price_page_url.clone(),
            selector,
            concurrency: cfg.price_lookup_concurrency.max(1),
            latency,
        })
    }

    /// `{proxy}{page}` with the percent-encoded symbol substituted for `{symbol}`.
    pub fn url_for(&self, symbol: &str) -> String {
        let page = self.page_url.replace("{symbol}", &urlencoding::encode(symbol));
        format!("{}{}", self.proxy_url, page)
    }

    /// Look up one symbol. Never fails: a missing or empty price element is
    /// `NotAvailable`, any transport or status failure is `Error`.
    pub async fn lookup(&self, symbol: &str) -> PriceQuote {
        let started = Instant::now();
        let quote = match self.fetch_page(symbol).await {
            Ok(body) => match extract_price(&body, &self.selector) {
                Some(price) => PriceQuote::Price(price),
                None => {
                    debug!(symbol, "price element missing or empty");
                    PriceQuote::NotAvailable
                }
            },
            Err(e) => {
                warn!(symbol, "price lookup failed: {e}");
                PriceQuote::Error
            }
        };
        self.latency.record(started.elapsed());
        quote
    }

    /// Fan out one lookup per distinct symbol and join them into a keyed map.
    /// Each lookup fails independently; at most `concurrency` run at once.
    pub async fn lookup_all<'a, I>(&self, symbols: I) -> HashMap<String, PriceQuote>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut distinct: Vec<String> = symbols.into_iter().map(str::to_string).collect();
        distinct.sort_unstable();
        distinct.dedup();

        stream::iter(distinct)
            .map(|symbol| async move {
                let quote = self.lookup(&symbol).await;
                (symbol, quote)
            })
            .buffer_unordered(self.concurrency)
            .collect()
            .await
    }

    async fn fetch_page(&self, symbol: &str) -> Result<String> {
        let resp = self.client.get(self.url_for(symbol)).send().await?;
        let resp = resp.error_for_status()?;
        Ok(resp.text().await?)
    }
}

/// Trimmed text content of the first element matching `selector`, if non-empty.
pub fn extract_price(html: &str, selector: &Selector) -> Option<String> {
    let document = Html::parse_document(html);
    let text: String = document.select(selector).next()?.text().collect();
    let text = text.trim();
    if text.is_empty() {
        None
    } else {
        Some(text.to_string())
    }
}

#[cfg(test)]
mod tests {
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;
    use crate::config::PRICE_SELECTOR;

    fn page(price: &str) -> String {
        format!(
            r#"<html><body><div><span id="ctl00_ContentPlaceHolder1_CompanyDetail1_lblMarketPrice">{price}</span></div></body></html>"#
        )
    }

    fn lookup_for(server: &MockServer) -> PriceLookup {
        let mut cfg = Config::for_tests();
        cfg.price_proxy_url = String::new();
        cfg.price_page_url = format!("{}/CompanyDetail.aspx?symbol={{symbol}}", server.uri());
        PriceLookup::new(&cfg, Arc::new(LatencyStats::new().unwrap())).unwrap()
    }

    #[test]
    fn extracts_trimmed_price() {
        let selector = Selector::parse(PRICE_SELECTOR).unwrap();
        assert_eq!(extract_price(&page("  1,234.50 \n"), &selector), Some("1,234.50".to_string()));
    }

    #[test]
    fn missing_or_blank_element_is_none() {
        let selector = Selector::parse(PRICE_SELECTOR).unwrap();
        assert_eq!(extract_price("<html><body>nothing</body></html>", &selector), None);
        assert_eq!(extract_price(&page("   "), &selector), None);
    }

    #[test]
    fn url_prepends_proxy() {
        let mut cfg = Config::for_tests();
        cfg.price_proxy_url = "https://relay.example/?".to_string();
        let lookup = PriceLookup::new(&cfg, Arc::new(LatencyStats::new().unwrap())).unwrap();
        assert_eq!(
            lookup.url_for("NABIL"),
            "https://relay.example/?https://merolagani.com/CompanyDetail.aspx?symbol=NABIL"
        );
    }

    #[test]
    fn url_encodes_reserved_characters() {
        let mut cfg = Config::for_tests();
        cfg.price_proxy_url = String::new();
        let lookup = PriceLookup::new(&cfg, Arc::new(LatencyStats::new().unwrap())).unwrap();
        assert_eq!(
            lookup.url_for("A&B C"),
            "https://merolagani.com/CompanyDetail.aspx?symbol=A%26B%20C"
        );
    }

    #[tokio::test]
    async fn symbol_with_ampersand_hits_its_own_page() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/CompanyDetail.aspx"))
            .and(query_param("symbol", "A&B"))
            .respond_with(ResponseTemplate::new(200).set_body_string(page("77")))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/CompanyDetail.aspx"))
            .and(query_param("symbol", "A"))
            .respond_with(ResponseTemplate::new(200).set_body_string(page("999")))
            .mount(&server)
            .await;

        let lookup = lookup_for(&server);
        assert_eq!(lookup.lookup("A&B").await, PriceQuote::Price("77".to_string()));
    }

    #[test]
    fn invalid_selector_is_a_config_error() {
        let mut cfg = Config::for_tests();
        cfg.price_selector = "##".to_string();
        assert!(matches!(
            PriceLookup::new(&cfg, Arc::new(LatencyStats::new().unwrap())),
            Err(AppError::Config(_))
        ));
    }

    #[tokio::test]
    async fn one_failure_does_not_block_the_batch() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/CompanyDetail.aspx"))
            .and(query_param("symbol", "NABIL"))
            .respond_with(ResponseTemplate::new(200).set_body_string(page("512.00")))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/CompanyDetail.aspx"))
            .and(query_param("symbol", "BROKEN"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/CompanyDetail.aspx"))
            .and(query_param("symbol", "EMPTY"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html></html>"))
            .mount(&server)
            .await;

        let lookup = lookup_for(&server);
        let quotes = lookup.lookup_all(["NABIL", "BROKEN", "EMPTY", "NABIL"]).await;

        assert_eq!(quotes.len(), 3);
        assert_eq!(quotes["NABIL"], PriceQuote::Price("512.00".to_string()));
        assert_eq!(quotes["BROKEN"], PriceQuote::Error);
        assert_eq!(quotes["EMPTY"], PriceQuote::NotAvailable);
        assert_eq!(lookup.latency.len(), 3);
    }
}
