use std::collections::HashMap;
use std::path::PathBuf;
use std::time::{Duration, Instant};

use reqwest::{Method, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;

use stocklist::calculator::SectorRules;
use stocklist::config::{EXPORT_CSV_FILE_NAME, EXPORT_FILE_NAME};
use stocklist::listing::{build_tables, export, ListingState, SectorFilter, SectorTable};
use stocklist::types::{PriceQuote, Sector, StockInput, StockRecord};

use crate::form::StockForm;

const TOAST_TTL: Duration = Duration::from_secs(3);

// ---------------------------------------------------------------------------
// API response types (mirror routes.rs shapes)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize, Default)]
pub struct ListingResponse {
    pub stocks: Vec<StockRecord>,
    #[serde(default)]
    pub prices: HashMap<String, PriceQuote>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SectorInfo {
    pub sector: Sector,
    pub requires_listed_date: bool,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct SessionResponse {
    pub signed_in: bool,
    pub operator: bool,
    pub identity: Option<SessionIdentity>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SessionIdentity {
    pub email: String,
}

#[derive(Debug, Clone, Deserialize)]
struct StockResponse {
    message: String,
    stock: StockRecord,
}

#[derive(Debug, Clone, Deserialize)]
struct MessageResponse {
    message: String,
}

#[derive(Debug, Clone, Deserialize)]
struct ErrorResponse {
    message: String,
}

// ---------------------------------------------------------------------------
// App state
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub enum ConnectionStatus {
    Connected,
    Error(String),
    Connecting,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum View {
    Listing,
    Entry,
    Edit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToastKind {
    Success,
    Error,
}

#[derive(Debug, Clone)]
pub struct Toast {
    pub kind: ToastKind,
    pub text: String,
    shown_at: Instant,
}

/// Edit view: an id prompt, then the loaded record's form.
#[derive(Debug, Clone, Default)]
pub struct EditState {
    pub id_input: String,
    pub loaded_id: Option<String>,
    pub form: StockForm,
}

impl EditState {
    pub fn reset(&mut self) {
        *self = EditState::default();
    }
}

pub struct App {
    pub base_url: String,
    pub token: Option<String>,
    pub export_dir: PathBuf,
    pub status: ConnectionStatus,
    pub view: View,
    pub stocks: Vec<StockRecord>,
    pub prices: HashMap<String, PriceQuote>,
    pub rules: SectorRules,
    pub listing: ListingState,
    pub session: SessionResponse,
    pub entry: StockForm,
    pub edit: EditState,
    pub confirm_delete: bool,
    pub toast: Option<Toast>,
    /// First sector table shown; scrolls the listing.
    pub scroll: usize,
}

impl App {
    pub fn new(base_url: String, token: Option<String>, export_dir: PathBuf) -> Self {
        Self {
            base_url,
            token,
            export_dir,
            status: ConnectionStatus::Connecting,
            view: View::Listing,
            stocks: Vec::new(),
            prices: HashMap::new(),
            rules: SectorRules::default(),
            listing: ListingState::default(),
            session: SessionResponse::default(),
            entry: StockForm::default(),
            edit: EditState::default(),
            confirm_delete: false,
            toast: None,
            scroll: 0,
        }
    }

    // --- toasts ---

    pub fn notify(&mut self, kind: ToastKind, text: impl Into<String>) {
        self.toast = Some(Toast {
            kind,
            text: text.into(),
            shown_at: Instant::now(),
        });
    }

    pub fn expire_toast(&mut self) {
        if self.toast.as_ref().is_some_and(|t| t.shown_at.elapsed() >= TOAST_TTL) {
            self.toast = None;
        }
    }

    // --- listing ---

    /// Sector tables for the current sort and filter.
    pub fn tables(&self) -> Vec<SectorTable> {
        build_tables(&self.listing.apply(&self.stocks, &self.rules), &self.prices)
    }

    /// Filter choices: `All`, then the sectors present in the data.
    pub fn filter_options(&self) -> Vec<SectorFilter> {
        let mut out = vec![SectorFilter::All];
        for s in &self.stocks {
            let f = SectorFilter::Only(s.sector);
            if !out.contains(&f) {
                out.push(f);
            }
        }
        out
    }

    pub fn cycle_filter(&mut self) {
        let options = self.filter_options();
        let pos = options.iter().position(|f| *f == self.listing.filter).unwrap_or(0);
        self.listing.set_filter(options[(pos + 1) % options.len()]);
        self.scroll = 0;
    }

    /// Write the sorted, unfiltered set to `EXPORT_DIR`.
    pub fn export(&mut self, csv: bool) {
        let view = ListingState {
            filter: SectorFilter::All,
            ..self.listing
        };
        let tables = build_tables(&view.apply(&self.stocks, &self.rules), &self.prices);
        let (name, bytes) = if csv {
            (EXPORT_CSV_FILE_NAME, export::to_csv_bytes(&tables))
        } else {
            (EXPORT_FILE_NAME, export::to_xlsx_bytes(&tables))
        };
        let path = self.export_dir.join(name);
        let written = bytes.and_then(|b| std::fs::write(&path, b).map_err(Into::into));
        match written {
            Ok(()) => self.notify(ToastKind::Success, format!("Exported {}", path.display())),
            Err(e) => self.notify(ToastKind::Error, format!("Export failed: {e}")),
        }
    }

    // --- requests ---

    fn request(&self, client: &reqwest::Client, method: Method, path: &str) -> RequestBuilder {
        let req = client.request(method, format!("{}{}", self.base_url, path));
        match &self.token {
            Some(t) => req.bearer_auth(t),
            None => req,
        }
    }

    /// Reload records, prices, sector rules and the session.
    pub async fn refresh(&mut self, client: &reqwest::Client) {
        let (listing_res, sectors_res, session_res) = tokio::join!(
            self.request(client, Method::GET, "/api/stocks").send(),
            self.request(client, Method::GET, "/api/sectors").send(),
            self.request(client, Method::GET, "/api/session").send(),
        );

        let listing = match listing_res {
            Ok(resp) => read_json::<ListingResponse>(resp).await,
            Err(e) => Err(e.to_string()),
        };
        match listing {
            Ok(l) => {
                self.stocks = l.stocks;
                self.prices = l.prices;
                self.status = ConnectionStatus::Connected;
            }
            Err(e) => {
                self.status = ConnectionStatus::Error(e);
                return;
            }
        }

        if let Ok(resp) = sectors_res {
            if let Ok(infos) = read_json::<Vec<SectorInfo>>(resp).await {
                let exempt: Vec<Sector> = infos
                    .iter()
                    .filter(|i| !i.requires_listed_date)
                    .map(|i| i.sector)
                    .collect();
                self.rules = SectorRules::with_exempt(&exempt);
            }
        }
        if let Ok(resp) = session_res {
            if let Ok(session) = read_json::<SessionResponse>(resp).await {
                self.session = session;
            }
        }
    }

    /// Open a gated view, or stay on the listing if the session is not an operator.
    pub fn open(&mut self, view: View) {
        if view != View::Listing && !self.session.operator {
            let msg = if self.session.signed_in {
                "Signed-in account is not an operator"
            } else {
                "Sign in required (set STOCKLIST_ID_TOKEN)"
            };
            self.notify(ToastKind::Error, msg);
            self.view = View::Listing;
            return;
        }
        self.view = view;
    }

    pub fn sign_out(&mut self) {
        self.token = None;
        self.session = SessionResponse::default();
        self.view = View::Listing;
        self.notify(ToastKind::Success, "Signed out");
    }

    pub async fn submit_entry(&mut self, client: &reqwest::Client) {
        let input = match self.entry.to_input(&self.rules) {
            Ok(i) => i,
            Err(msg) => return self.notify(ToastKind::Error, msg),
        };
        match self.send_input(client, Method::POST, "/api/stocks", &input).await {
            Ok(msg) => {
                self.notify(ToastKind::Success, msg);
                self.entry = StockForm::default();
                self.refresh(client).await;
            }
            Err(msg) => self.notify(ToastKind::Error, msg),
        }
    }

    pub async fn fetch_for_edit(&mut self, client: &reqwest::Client) {
        let id = self.edit.id_input.trim().to_string();
        if id.is_empty() {
            return self.notify(ToastKind::Error, "Please provide a stock ID");
        }
        let path = format!("/api/stocks/{id}");
        let result = match self.request(client, Method::GET, &path).send().await {
            Ok(resp) => read_json::<StockResponse>(resp).await,
            Err(e) => Err(e.to_string()),
        };
        match result {
            Ok(r) => {
                self.edit.form = StockForm::from_record(&r.stock);
                self.edit.loaded_id = Some(id);
                self.notify(ToastKind::Success, r.message);
            }
            Err(msg) => self.notify(ToastKind::Error, msg),
        }
    }

    pub async fn submit_edit(&mut self, client: &reqwest::Client) {
        let Some(id) = self.edit.loaded_id.clone() else {
            return;
        };
        let input = match self.edit.form.to_input(&self.rules) {
            Ok(i) => i,
            Err(msg) => return self.notify(ToastKind::Error, msg),
        };
        let path = format!("/api/stocks/{id}");
        match self.send_input(client, Method::PUT, &path, &input).await {
            Ok(msg) => {
                self.notify(ToastKind::Success, msg);
                self.edit.reset();
                self.refresh(client).await;
            }
            Err(msg) => self.notify(ToastKind::Error, msg),
        }
    }

    /// Runs after the operator confirms the modal.
    pub async fn delete_loaded(&mut self, client: &reqwest::Client) {
        self.confirm_delete = false;
        let Some(id) = self.edit.loaded_id.clone() else {
            return;
        };
        let path = format!("/api/stocks/{id}");
        let result = match self.request(client, Method::DELETE, &path).send().await {
            Ok(resp) => read_json::<MessageResponse>(resp).await.map(|r| r.message),
            Err(e) => Err(e.to_string()),
        };
        match result {
            Ok(msg) => {
                self.notify(ToastKind::Success, msg);
                self.edit.reset();
                self.refresh(client).await;
            }
            Err(msg) => self.notify(ToastKind::Error, msg),
        }
    }

    async fn send_input(
        &self,
        client: &reqwest::Client,
        method: Method,
        path: &str,
        input: &StockInput,
    ) -> Result<String, String> {
        let resp = self
            .request(client, method, path)
            .json(input)
            .send()
            .await
            .map_err(|e| e.to_string())?;
        read_json::<StockResponse>(resp).await.map(|r| r.message)
    }
}

/// Decode a success body, or turn an error body into its message.
async fn read_json<T: DeserializeOwned>(resp: reqwest::Response) -> Result<T, String> {
    let status = resp.status();
    if status.is_success() {
        return resp.json::<T>().await.map_err(|e| format!("parse error: {e}"));
    }
    match resp.json::<ErrorResponse>().await {
        Ok(body) => Err(body.message),
        Err(_) if status == StatusCode::UNAUTHORIZED => Err("Sign in required".to_string()),
        Err(_) => Err(format!("request failed: {status}")),
    }
}

// ---------------------------------------------------------------------------
// Formatting helpers
// ---------------------------------------------------------------------------

pub fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let head: String = s.chars().take(max.saturating_sub(1)).collect();
        format!("{head}…")
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;
    use stocklist::calculator::build_record;

    use super::*;

    fn stock(name: &str, sector: Sector) -> StockRecord {
        let input = StockInput {
            name: name.into(),
            sector,
            listed_date: NaiveDate::from_ymd_opt(2021, 3, 1),
            total_listed_shares: 1000,
            promoter_share: 500,
            book_value: 100.0,
            eps: 1.0,
            remark: String::new(),
        };
        build_record(name.to_lowercase(), input, &SectorRules::default())
    }

    fn app() -> App {
        App::new("http://localhost:0".into(), None, PathBuf::from("."))
    }

    #[test]
    fn filter_cycles_through_present_sectors_and_back_to_all() {
        let mut app = app();
        app.stocks = vec![
            stock("A", Sector::HydroPower),
            stock("B", Sector::Finance),
            stock("C", Sector::HydroPower),
        ];
        app.cycle_filter();
        assert_eq!(app.listing.filter, SectorFilter::Only(Sector::HydroPower));
        app.cycle_filter();
        assert_eq!(app.listing.filter, SectorFilter::Only(Sector::Finance));
        app.cycle_filter();
        assert_eq!(app.listing.filter, SectorFilter::All);
    }

    #[test]
    fn gated_views_stay_on_listing_without_operator_session() {
        let mut app = app();
        app.open(View::Entry);
        assert_eq!(app.view, View::Listing);
        assert_eq!(app.toast.as_ref().map(|t| t.kind), Some(ToastKind::Error));

        app.session = SessionResponse {
            signed_in: true,
            operator: true,
            identity: None,
        };
        app.open(View::Edit);
        assert_eq!(app.view, View::Edit);
    }

    #[test]
    fn export_writes_workbook_to_export_dir() {
        let dir = std::env::temp_dir().join(format!("stocklist-tui-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let mut app = App::new("http://localhost:0".into(), None, dir.clone());
        app.stocks = vec![stock("A", Sector::HydroPower)];

        app.export(true);
        let csv = std::fs::read_to_string(dir.join(EXPORT_CSV_FILE_NAME)).unwrap();
        assert!(csv.starts_with("Sector,Id,S.N.,Name"));
        assert_eq!(app.toast.as_ref().map(|t| t.kind), Some(ToastKind::Success));

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn truncate_counts_chars() {
        assert_eq!(truncate("Hydro Power", 20), "Hydro Power");
        assert_eq!(truncate("Manufacturing", 6), "Manuf…");
    }
}
