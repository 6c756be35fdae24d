use chrono::NaiveDate;

use stocklist::calculator::{derive, SectorRules};
use stocklist::listing::format::{format_locale_date, format_number_nepal};
use stocklist::types::{Sector, StockInput, StockRecord};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    Name,
    Sector,
    ListedDate,
    TotalListedShares,
    PromoterShare,
    BookValue,
    Eps,
    Remark,
}

impl Field {
    const ORDER: [Field; 8] = [
        Field::Name,
        Field::Sector,
        Field::ListedDate,
        Field::TotalListedShares,
        Field::PromoterShare,
        Field::BookValue,
        Field::Eps,
        Field::Remark,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Field::Name => "Name",
            Field::Sector => "Sector",
            Field::ListedDate => "Listed Date (YYYY-MM-DD)",
            Field::TotalListedShares => "Total Listed Shares",
            Field::PromoterShare => "Promoter Share",
            Field::BookValue => "Book Value Per Share",
            Field::Eps => "EPS",
            Field::Remark => "Remarks",
        }
    }
}

/// Text state of the entry/edit form. Everything is kept as typed; numbers
/// are parsed on preview and submit.
#[derive(Debug, Clone)]
pub struct StockForm {
    pub name: String,
    pub sector: Option<Sector>,
    pub listed_date: String,
    pub total_listed_shares: String,
    pub promoter_share: String,
    pub book_value: String,
    pub eps: String,
    pub remark: String,
    pub focus: Field,
}

impl Default for StockForm {
    fn default() -> Self {
        Self {
            name: String::new(),
            sector: None,
            listed_date: String::new(),
            total_listed_shares: String::new(),
            promoter_share: String::new(),
            book_value: String::new(),
            eps: String::new(),
            remark: String::new(),
            focus: Field::Name,
        }
    }
}

/// Derived values shown under the form while typing.
#[derive(Debug, Clone, PartialEq)]
pub struct Preview {
    pub public_share: String,
    pub promoter_public_percent: String,
    pub lock_in_period: Option<String>,
}

impl StockForm {
    pub fn from_record(record: &StockRecord) -> Self {
        Self {
            name: record.name.clone(),
            sector: Some(record.sector),
            listed_date: record.listed_date.map(|d| d.to_string()).unwrap_or_default(),
            total_listed_shares: record.total_listed_shares.to_string(),
            promoter_share: record.promoter_share.to_string(),
            book_value: record.book_value.to_string(),
            eps: record.eps.to_string(),
            remark: record.remark.clone(),
            focus: Field::Name,
        }
    }

    /// Fields currently shown. The listed date is hidden for exempt sectors.
    pub fn visible_fields(&self, rules: &SectorRules) -> Vec<Field> {
        let show_date = self.sector.is_some_and(|s| rules.requires_listed_date(s));
        Field::ORDER
            .into_iter()
            .filter(|f| *f != Field::ListedDate || show_date)
            .collect()
    }

    pub fn focus_next(&mut self, rules: &SectorRules) {
        self.move_focus(rules, 1);
    }

    pub fn focus_prev(&mut self, rules: &SectorRules) {
        self.move_focus(rules, -1);
    }

    fn move_focus(&mut self, rules: &SectorRules, step: isize) {
        let fields = self.visible_fields(rules);
        let pos = fields.iter().position(|f| *f == self.focus).unwrap_or(0) as isize;
        let n = fields.len() as isize;
        self.focus = fields[((pos + step).rem_euclid(n)) as usize];
    }

    pub fn cycle_sector(&mut self, forward: bool) {
        self.sector = Some(match (self.sector, forward) {
            (None, true) => Sector::ALL[0],
            (None, false) => Sector::ALL[Sector::ALL.len() - 1],
            (Some(s), true) => s.next(),
            (Some(s), false) => s.prev(),
        });
    }

    pub fn value(&self, field: Field) -> String {
        match field {
            Field::Sector => self
                .sector
                .map_or("< Select Sector >".to_string(), |s| format!("< {s} >")),
            _ => self.text(field).cloned().unwrap_or_default(),
        }
    }

    fn text(&self, field: Field) -> Option<&String> {
        match field {
            Field::Name => Some(&self.name),
            Field::Sector => None,
            Field::ListedDate => Some(&self.listed_date),
            Field::TotalListedShares => Some(&self.total_listed_shares),
            Field::PromoterShare => Some(&self.promoter_share),
            Field::BookValue => Some(&self.book_value),
            Field::Eps => Some(&self.eps),
            Field::Remark => Some(&self.remark),
        }
    }

    fn text_mut(&mut self, field: Field) -> Option<&mut String> {
        match field {
            Field::Name => Some(&mut self.name),
            Field::Sector => None,
            Field::ListedDate => Some(&mut self.listed_date),
            Field::TotalListedShares => Some(&mut self.total_listed_shares),
            Field::PromoterShare => Some(&mut self.promoter_share),
            Field::BookValue => Some(&mut self.book_value),
            Field::Eps => Some(&mut self.eps),
            Field::Remark => Some(&mut self.remark),
        }
    }

    pub fn push_char(&mut self, c: char) {
        if let Some(text) = self.text_mut(self.focus) {
            text.push(c);
        }
    }

    pub fn backspace(&mut self) {
        if let Some(text) = self.text_mut(self.focus) {
            text.pop();
        }
    }

    /// Live derived values, once the sector and both share counts parse.
    pub fn preview(&self, rules: &SectorRules) -> Option<Preview> {
        let sector = self.sector?;
        let total = parse_int(&self.total_listed_shares)?;
        let promoter = parse_int(&self.promoter_share)?;
        let listed = NaiveDate::parse_from_str(self.listed_date.trim(), "%Y-%m-%d").ok();
        let derived = derive(total, promoter, sector, listed, rules);
        Some(Preview {
            public_share: format_number_nepal(derived.public_share),
            promoter_public_percent: derived.promoter_public_percent.to_string(),
            lock_in_period: derived.lock_in_period.map(format_locale_date),
        })
    }

    /// Parse into the payload sent to the server. The message names the
    /// first field that could not be read.
    pub fn to_input(&self, rules: &SectorRules) -> Result<StockInput, String> {
        let sector = self.sector.ok_or("Please select a sector")?;
        let listed_date = if rules.requires_listed_date(sector) {
            let raw = self.listed_date.trim();
            if raw.is_empty() {
                None
            } else {
                Some(
                    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
                        .map_err(|_| format!("Listed Date {raw:?} is not YYYY-MM-DD"))?,
                )
            }
        } else {
            None
        };
        Ok(StockInput {
            name: self.name.trim().to_string(),
            sector,
            listed_date,
            total_listed_shares: parse_int(&self.total_listed_shares)
                .ok_or("Total Listed Shares must be a whole number")?,
            promoter_share: parse_int(&self.promoter_share)
                .ok_or("Promoter Share must be a whole number")?,
            book_value: parse_float(&self.book_value)
                .ok_or("Book Value Per Share must be a number")?,
            eps: parse_float(&self.eps).ok_or("EPS must be a number")?,
            remark: self.remark.clone(),
        })
    }
}

/// Leading-integer parse: optional sign then digits, trailing text ignored.
/// `None` when no digits lead.
pub fn parse_int(raw: &str) -> Option<i64> {
    let s = raw.trim_start();
    let (sign, rest) = match s.as_bytes().first() {
        Some(b'-') => (-1, &s[1..]),
        Some(b'+') => (1, &s[1..]),
        _ => (1, s),
    };
    let digits: String = rest.chars().take_while(|c| c.is_ascii_digit()).collect();
    if digits.is_empty() {
        return None;
    }
    digits.parse::<i64>().ok().map(|n| sign * n)
}

/// Leading-decimal parse, like [`parse_int`] but accepting one `.` and an exponent.
pub fn parse_float(raw: &str) -> Option<f64> {
    let s = raw.trim_start();
    let mut end = 0;
    let mut seen_digit = false;
    let mut seen_dot = false;
    let bytes = s.as_bytes();
    if matches!(bytes.first(), Some(b'-' | b'+')) {
        end = 1;
    }
    while end < bytes.len() {
        match bytes[end] {
            b'0'..=b'9' => seen_digit = true,
            b'.' if !seen_dot => seen_dot = true,
            _ => break,
        }
        end += 1;
    }
    if !seen_digit {
        return None;
    }
    // Optional exponent, only taken when complete.
    if matches!(bytes.get(end), Some(b'e' | b'E')) {
        let mut exp_end = end + 1;
        if matches!(bytes.get(exp_end), Some(b'-' | b'+')) {
            exp_end += 1;
        }
        let exp_digits = bytes[exp_end.min(bytes.len())..]
            .iter()
            .take_while(|b| b.is_ascii_digit())
            .count();
        if exp_digits > 0 {
            end = exp_end + exp_digits;
        }
    }
    s[..end].parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_int_takes_leading_digits() {
        assert_eq!(parse_int("1000"), Some(1000));
        assert_eq!(parse_int("  42abc"), Some(42));
        assert_eq!(parse_int("-7"), Some(-7));
        assert_eq!(parse_int("12.9"), Some(12));
        assert_eq!(parse_int(""), None);
        assert_eq!(parse_int("abc"), None);
        assert_eq!(parse_int("-"), None);
    }

    #[test]
    fn parse_float_takes_leading_decimal() {
        assert_eq!(parse_float("100.5"), Some(100.5));
        assert_eq!(parse_float("5.5x"), Some(5.5));
        assert_eq!(parse_float(".5"), Some(0.5));
        assert_eq!(parse_float("-2"), Some(-2.0));
        assert_eq!(parse_float("1e3"), Some(1000.0));
        assert_eq!(parse_float("1e"), Some(1.0));
        assert_eq!(parse_float("."), None);
        assert_eq!(parse_float(""), None);
    }

    #[test]
    fn listed_date_hidden_for_exempt_sectors() {
        let rules = SectorRules::default();
        let mut form = StockForm::default();
        assert!(!form.visible_fields(&rules).contains(&Field::ListedDate));

        form.sector = Some(Sector::HydroPower);
        assert!(form.visible_fields(&rules).contains(&Field::ListedDate));

        form.sector = Some(Sector::CommercialBanks);
        assert!(!form.visible_fields(&rules).contains(&Field::ListedDate));
    }

    #[test]
    fn focus_skips_hidden_date_and_wraps() {
        let rules = SectorRules::default();
        let mut form = StockForm {
            sector: Some(Sector::Finance),
            focus: Field::Sector,
            ..StockForm::default()
        };
        form.focus_next(&rules);
        assert_eq!(form.focus, Field::TotalListedShares);

        form.focus = Field::Remark;
        form.focus_next(&rules);
        assert_eq!(form.focus, Field::Name);
        form.focus_prev(&rules);
        assert_eq!(form.focus, Field::Remark);
    }

    #[test]
    fn preview_updates_from_typed_values() {
        let rules = SectorRules::default();
        let mut form = StockForm {
            sector: Some(Sector::HydroPower),
            listed_date: "2020-01-15".into(),
            total_listed_shares: "1000".into(),
            ..StockForm::default()
        };
        assert_eq!(form.preview(&rules), None);

        form.promoter_share = "600".into();
        let preview = form.preview(&rules).unwrap();
        assert_eq!(preview.public_share, "400");
        assert_eq!(preview.promoter_public_percent, "60.00%, 40.00%");
        assert_eq!(preview.lock_in_period.as_deref(), Some("1/15/2023"));
    }

    #[test]
    fn to_input_drops_date_for_exempt_sector() {
        let rules = SectorRules::default();
        let form = StockForm {
            name: " NABIL ".into(),
            sector: Some(Sector::CommercialBanks),
            listed_date: "2020-01-15".into(),
            total_listed_shares: "1000".into(),
            promoter_share: "510".into(),
            book_value: "250.5".into(),
            eps: "30".into(),
            ..StockForm::default()
        };
        let input = form.to_input(&rules).unwrap();
        assert_eq!(input.name, "NABIL");
        assert_eq!(input.listed_date, None);
        assert_eq!(input.promoter_share, 510);
        assert_eq!(input.book_value, 250.5);
    }

    #[test]
    fn to_input_reports_unreadable_fields() {
        let rules = SectorRules::default();
        let mut form = StockForm::default();
        assert_eq!(form.to_input(&rules).unwrap_err(), "Please select a sector");

        form.sector = Some(Sector::Trading);
        form.listed_date = "15/01/2020".into();
        assert!(form.to_input(&rules).unwrap_err().contains("YYYY-MM-DD"));

        form.listed_date = "2020-01-15".into();
        form.total_listed_shares = "lots".into();
        assert_eq!(
            form.to_input(&rules).unwrap_err(),
            "Total Listed Shares must be a whole number"
        );
    }

    #[test]
    fn from_record_round_trips_to_same_input() {
        let rules = SectorRules::default();
        let input = StockInput {
            name: "UPPER".into(),
            sector: Sector::HydroPower,
            listed_date: NaiveDate::from_ymd_opt(2019, 6, 1),
            total_listed_shares: 2_000_000,
            promoter_share: 1_400_000,
            book_value: 112.25,
            eps: -3.5,
            remark: "watch".into(),
        };
        let record = stocklist::calculator::build_record("abc".into(), input.clone(), &rules);
        assert_eq!(StockForm::from_record(&record).to_input(&rules).unwrap(), input);
    }
}
