//! Listing view model: sort, sector filter, grouping and the display rows
//! shared by the API, the exports and the terminal client.

pub mod export;
pub mod format;

use std::cmp::Ordering;
use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::calculator::SectorRules;
use crate::listing::format::{format_iso_date, format_locale_date, format_number_nepal};
use crate::types::{PriceQuote, Sector, StockRecord};

// ---------------------------------------------------------------------------
// Sort / filter state
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortKey {
    Name,
    TotalListedShares,
    PublicShare,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

impl SortOrder {
    pub fn flipped(self) -> Self {
        match self {
            SortOrder::Asc => SortOrder::Desc,
            SortOrder::Desc => SortOrder::Asc,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SectorFilter {
    #[default]
    All,
    Only(Sector),
}

impl SectorFilter {
    pub fn matches(&self, sector: Sector) -> bool {
        match self {
            SectorFilter::All => true,
            SectorFilter::Only(s) => *s == sector,
        }
    }

    /// Parse a query value: `All` (any case) or empty means no filtering.
    pub fn parse(raw: &str) -> Result<Self, String> {
        let raw = raw.trim();
        if raw.is_empty() || raw.eq_ignore_ascii_case("all") {
            Ok(SectorFilter::All)
        } else {
            raw.parse().map(SectorFilter::Only)
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            SectorFilter::All => "All",
            SectorFilter::Only(s) => s.as_str(),
        }
    }
}

/// Sort and filter selection of one listing view. Starts unsorted and
/// unfiltered; persists until changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ListingState {
    pub sort: Option<(SortKey, SortOrder)>,
    pub filter: SectorFilter,
}

impl ListingState {
    /// Re-selecting the active key flips direction; a new key starts ascending.
    pub fn select_sort(&mut self, key: SortKey) {
        self.sort = match self.sort {
            Some((active, order)) if active == key => Some((key, order.flipped())),
            _ => Some((key, SortOrder::Asc)),
        };
    }

    pub fn set_filter(&mut self, filter: SectorFilter) {
        self.filter = filter;
    }

    pub fn order_for(&self, key: SortKey) -> Option<SortOrder> {
        match self.sort {
            Some((active, order)) if active == key => Some(order),
            _ => None,
        }
    }

    /// Records in display order, before filtering.
    pub fn sorted<'a>(&self, records: &'a [StockRecord]) -> Vec<&'a StockRecord> {
        let mut out: Vec<&StockRecord> = records.iter().collect();
        if let Some((key, order)) = self.sort {
            sort_records(&mut out, key, order);
        }
        out
    }

    /// Sorted, filtered and grouped by sector.
    pub fn apply<'a>(&self, records: &'a [StockRecord], rules: &SectorRules) -> Vec<SectorGroup<'a>> {
        let visible = self
            .sorted(records)
            .into_iter()
            .filter(|r| self.filter.matches(r.sector));
        group_by_sector(visible, rules)
    }
}

/// Stable sort by `key`. Names compare case-insensitively first, with
/// lowercase ahead of uppercase on ties.
pub fn sort_records(records: &mut [&StockRecord], key: SortKey, order: SortOrder) {
    records.sort_by(|a, b| {
        let ord = match key {
            SortKey::Name => locale_cmp(&a.name, &b.name),
            SortKey::TotalListedShares => a.total_listed_shares.cmp(&b.total_listed_shares),
            SortKey::PublicShare => {
                public_share(a).cmp(&public_share(b))
            }
        };
        match order {
            SortOrder::Asc => ord,
            SortOrder::Desc => ord.reverse(),
        }
    });
}

fn public_share(record: &StockRecord) -> i64 {
    record.total_listed_shares.saturating_sub(record.promoter_share)
}

/// Case-insensitive comparison on lowercased code points, lowercase first on
/// ties. There is no collation table: accented and other non-ASCII letters
/// order by code point, after `z`.
pub fn locale_cmp(a: &str, b: &str) -> Ordering {
    a.to_lowercase()
        .cmp(&b.to_lowercase())
        .then_with(|| b.cmp(a))
}

// ---------------------------------------------------------------------------
// Grouping
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct SectorGroup<'a> {
    pub sector: Sector,
    /// Whether the listed-date and lock-in columns are shown for this sector.
    pub show_listed_date: bool,
    pub records: Vec<&'a StockRecord>,
}

/// Group in order of each sector's first appearance, keeping record order
/// within a group.
pub fn group_by_sector<'a, I>(records: I, rules: &SectorRules) -> Vec<SectorGroup<'a>>
where
    I: IntoIterator<Item = &'a StockRecord>,
{
    let mut groups: Vec<SectorGroup<'a>> = Vec::new();
    for record in records {
        match groups.iter_mut().find(|g| g.sector == record.sector) {
            Some(group) => group.records.push(record),
            None => groups.push(SectorGroup {
                sector: record.sector,
                show_listed_date: rules.requires_listed_date(record.sector),
                records: vec![record],
            }),
        }
    }
    groups
}

// ---------------------------------------------------------------------------
// Display rows
// ---------------------------------------------------------------------------

/// One table row, already formatted for display.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListingRow {
    pub sn: usize,
    pub id: String,
    pub name: String,
    pub listed_date: Option<String>,
    pub lock_in_period: Option<String>,
    pub total_listed_shares: String,
    pub promoter_share: String,
    pub public_share: String,
    pub promoter_public_percent: String,
    pub book_value: String,
    pub eps: String,
    pub ltp: String,
    pub remark: String,
}

impl ListingRow {
    pub fn new(sn: usize, record: &StockRecord, ltp: Option<&PriceQuote>) -> Self {
        Self {
            sn,
            id: record.id.clone(),
            name: record.name.clone(),
            listed_date: record.listed_date.map(format_iso_date),
            lock_in_period: record.lock_in_period.map(format_locale_date),
            total_listed_shares: format_number_nepal(record.total_listed_shares),
            promoter_share: format_number_nepal(record.promoter_share),
            public_share: format_number_nepal(public_share(record)),
            promoter_public_percent: record.promoter_public_percent.to_string(),
            book_value: record.book_value.to_string(),
            eps: record.eps.to_string(),
            ltp: ltp.map_or("N/A", |q| q.display()).to_string(),
            remark: record.remark.clone(),
        }
    }

    /// Cell values in the same order as [`columns`].
    pub fn cells(&self, show_listed_date: bool) -> Vec<String> {
        let mut cells = vec![self.id.clone(), self.sn.to_string(), self.name.clone()];
        if show_listed_date {
            cells.push(self.listed_date.clone().unwrap_or_default());
            cells.push(self.lock_in_period.clone().unwrap_or_default());
        }
        cells.extend([
            self.total_listed_shares.clone(),
            self.promoter_share.clone(),
            self.public_share.clone(),
            self.promoter_public_percent.clone(),
            self.book_value.clone(),
            self.eps.clone(),
            self.ltp.clone(),
            self.remark.clone(),
        ]);
        cells
    }
}

/// Column headers of a sector table.
pub fn columns(show_listed_date: bool) -> Vec<&'static str> {
    let mut cols = vec!["Id", "S.N.", "Name"];
    if show_listed_date {
        cols.extend(["Listed Date", "Lock-in Period"]);
    }
    cols.extend([
        "Total Listed Shares",
        "Promoter Share",
        "Public Share",
        "% of Promoter & Public",
        "Book Value Per Share",
        "EPS",
        "LTP",
        "Remarks",
    ]);
    cols
}

/// A sector table ready for rendering or export.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SectorTable {
    pub sector: Sector,
    pub show_listed_date: bool,
    pub rows: Vec<ListingRow>,
}

impl SectorTable {
    pub fn columns(&self) -> Vec<&'static str> {
        columns(self.show_listed_date)
    }
}

/// Turn groups into numbered display tables, filling LTP from `prices`
/// (keyed by stock name; `N/A` when absent).
pub fn build_tables(groups: &[SectorGroup<'_>], prices: &HashMap<String, PriceQuote>) -> Vec<SectorTable> {
    groups
        .iter()
        .map(|g| SectorTable {
            sector: g.sector,
            show_listed_date: g.show_listed_date,
            rows: g
                .records
                .iter()
                .enumerate()
                .map(|(i, r)| ListingRow::new(i + 1, r, prices.get(&r.name)))
                .collect(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;
    use crate::calculator::build_record;
    use crate::types::StockInput;

    fn rec(name: &str, sector: Sector, total: i64, promoter: i64) -> StockRecord {
        let input = StockInput {
            name: name.to_string(),
            sector,
            listed_date: NaiveDate::from_ymd_opt(2020, 1, 15),
            total_listed_shares: total,
            promoter_share: promoter,
            book_value: 100.0,
            eps: 5.0,
            remark: String::new(),
        };
        build_record(format!("id-{name}"), input, &SectorRules::default())
    }

    fn names(rs: &[&StockRecord]) -> Vec<String> {
        rs.iter().map(|r| r.name.clone()).collect()
    }

    #[test]
    fn name_sort_is_case_insensitive_and_toggles() {
        let records = vec![
            rec("Zeta", Sector::Trading, 1, 0),
            rec("Alpha", Sector::Trading, 1, 0),
            rec("mid", Sector::Trading, 1, 0),
        ];
        let mut state = ListingState::default();

        state.select_sort(SortKey::Name);
        assert_eq!(names(&state.sorted(&records)), vec!["Alpha", "mid", "Zeta"]);

        state.select_sort(SortKey::Name);
        assert_eq!(state.order_for(SortKey::Name), Some(SortOrder::Desc));
        assert_eq!(names(&state.sorted(&records)), vec!["Zeta", "mid", "Alpha"]);
    }

    #[test]
    fn new_key_resets_to_ascending() {
        let mut state = ListingState::default();
        state.select_sort(SortKey::Name);
        state.select_sort(SortKey::Name);
        state.select_sort(SortKey::TotalListedShares);
        assert_eq!(state.sort, Some((SortKey::TotalListedShares, SortOrder::Asc)));
        assert_eq!(state.order_for(SortKey::Name), None);
    }

    #[test]
    fn numeric_sorts() {
        let records = vec![
            rec("A", Sector::Trading, 300, 250), // public 50
            rec("B", Sector::Trading, 100, 0),   // public 100
            rec("C", Sector::Trading, 200, 190), // public 10
        ];
        let mut state = ListingState::default();
        state.select_sort(SortKey::TotalListedShares);
        assert_eq!(names(&state.sorted(&records)), vec!["B", "C", "A"]);

        state.select_sort(SortKey::PublicShare);
        assert_eq!(names(&state.sorted(&records)), vec!["C", "A", "B"]);
        state.select_sort(SortKey::PublicShare);
        assert_eq!(names(&state.sorted(&records)), vec!["B", "A", "C"]);
    }

    #[test]
    fn lowercase_wins_ties() {
        assert_eq!(locale_cmp("a", "A"), Ordering::Less);
        assert_eq!(locale_cmp("abc", "ABD"), Ordering::Less);
    }

    #[test]
    fn non_ascii_names_order_by_code_point() {
        assert_eq!(locale_cmp("Éverest", "Zenith"), Ordering::Greater);
    }

    #[test]
    fn public_share_sort_survives_extreme_counts() {
        let records = vec![
            rec("Low", Sector::Others, i64::MIN, 1),
            rec("High", Sector::Others, i64::MAX, -1),
            rec("Mid", Sector::Others, 10, 4),
        ];
        let mut state = ListingState::default();
        state.select_sort(SortKey::PublicShare);
        assert_eq!(names(&state.sorted(&records)), vec!["Low", "Mid", "High"]);
        let row = ListingRow::new(1, &records[1], None);
        assert_eq!(row.public_share, format_number_nepal(i64::MAX));
    }

    #[test]
    fn unsorted_keeps_store_order() {
        let records = vec![rec("Z", Sector::Trading, 1, 0), rec("A", Sector::Trading, 1, 0)];
        assert_eq!(names(&ListingState::default().sorted(&records)), vec!["Z", "A"]);
    }

    #[test]
    fn groups_follow_first_appearance() {
        let records = vec![
            rec("H1", Sector::HydroPower, 1, 0),
            rec("B1", Sector::CommercialBanks, 1, 0),
            rec("H2", Sector::HydroPower, 1, 0),
        ];
        let groups = ListingState::default().apply(&records, &SectorRules::default());
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].sector, Sector::HydroPower);
        assert!(groups[0].show_listed_date);
        assert_eq!(names(&groups[0].records), vec!["H1", "H2"]);
        assert_eq!(groups[1].sector, Sector::CommercialBanks);
        assert!(!groups[1].show_listed_date);
    }

    #[test]
    fn filter_selects_one_sector_and_all_restores() {
        let records = vec![
            rec("H1", Sector::HydroPower, 1, 0),
            rec("B1", Sector::CommercialBanks, 1, 0),
            rec("H2", Sector::HydroPower, 1, 0),
        ];
        let rules = SectorRules::default();
        let mut state = ListingState::default();
        let unfiltered: Vec<_> = state.apply(&records, &rules).iter().map(|g| g.records.len()).collect();

        state.set_filter(SectorFilter::Only(Sector::CommercialBanks));
        let groups = state.apply(&records, &rules);
        assert_eq!(groups.len(), 1);
        assert!(groups[0].records.iter().all(|r| r.sector == Sector::CommercialBanks));

        state.set_filter(SectorFilter::All);
        let restored: Vec<_> = state.apply(&records, &rules).iter().map(|g| g.records.len()).collect();
        assert_eq!(restored, unfiltered);
    }

    #[test]
    fn filter_parses_all_and_sector_names() {
        assert_eq!(SectorFilter::parse("All"), Ok(SectorFilter::All));
        assert_eq!(SectorFilter::parse(""), Ok(SectorFilter::All));
        assert_eq!(
            SectorFilter::parse("Hydro Power"),
            Ok(SectorFilter::Only(Sector::HydroPower))
        );
        assert!(SectorFilter::parse("Crypto").is_err());
    }

    #[test]
    fn rows_fill_ltp_and_hide_date_columns_for_exempt_sectors() {
        let records = vec![
            rec("NABIL", Sector::CommercialBanks, 1_000_000, 510_000),
            rec("UPPER", Sector::HydroPower, 1000, 600),
        ];
        let rules = SectorRules::default();
        let groups = ListingState::default().apply(&records, &rules);
        let mut prices = HashMap::new();
        prices.insert("UPPER".to_string(), PriceQuote::Price("250".to_string()));
        let tables = build_tables(&groups, &prices);

        let bank = &tables[0];
        assert_eq!(bank.columns().len(), bank.rows[0].cells(false).len());
        assert!(!bank.columns().contains(&"Listed Date"));
        assert_eq!(bank.rows[0].ltp, "N/A");
        assert_eq!(bank.rows[0].total_listed_shares, "10,00,000");

        let hydro = &tables[1];
        assert_eq!(hydro.columns().len(), hydro.rows[0].cells(true).len());
        assert_eq!(hydro.rows[0].ltp, "250");
        assert_eq!(hydro.rows[0].lock_in_period.as_deref(), Some("1/15/2023"));
        assert_eq!(hydro.rows[0].promoter_public_percent, "60.00%, 40.00%");
        assert_eq!(hydro.rows[0].sn, 1);
    }
}
