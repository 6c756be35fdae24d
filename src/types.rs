use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Sector
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Sector {
    #[serde(rename = "Commercial Banks")]
    CommercialBanks,
    #[serde(rename = "Development Banks")]
    DevelopmentBanks,
    #[serde(rename = "Finance")]
    Finance,
    #[serde(rename = "Microfinance")]
    Microfinance,
    #[serde(rename = "Life Insurance")]
    LifeInsurance,
    #[serde(rename = "Non Life Insurance")]
    NonLifeInsurance,
    #[serde(rename = "Hydro Power")]
    HydroPower,
    #[serde(rename = "Manufacturing And Processing")]
    ManufacturingAndProcessing,
    #[serde(rename = "Hotels And Tourism")]
    HotelsAndTourism,
    #[serde(rename = "Trading")]
    Trading,
    #[serde(rename = "Investment")]
    Investment,
    #[serde(rename = "Others")]
    Others,
}

impl Sector {
    pub const ALL: [Sector; 12] = [
        Sector::CommercialBanks,
        Sector::DevelopmentBanks,
        Sector::Finance,
        Sector::Microfinance,
        Sector::LifeInsurance,
        Sector::NonLifeInsurance,
        Sector::HydroPower,
        Sector::ManufacturingAndProcessing,
        Sector::HotelsAndTourism,
        Sector::Trading,
        Sector::Investment,
        Sector::Others,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Sector::CommercialBanks => "Commercial Banks",
            Sector::DevelopmentBanks => "Development Banks",
            Sector::Finance => "Finance",
            Sector::Microfinance => "Microfinance",
            Sector::LifeInsurance => "Life Insurance",
            Sector::NonLifeInsurance => "Non Life Insurance",
            Sector::HydroPower => "Hydro Power",
            Sector::ManufacturingAndProcessing => "Manufacturing And Processing",
            Sector::HotelsAndTourism => "Hotels And Tourism",
            Sector::Trading => "Trading",
            Sector::Investment => "Investment",
            Sector::Others => "Others",
        }
    }

    /// Next sector in declaration order, wrapping around. Used by form pickers.
    pub fn next(self) -> Sector {
        let idx = Sector::ALL.iter().position(|s| *s == self).unwrap_or(0);
        Sector::ALL[(idx + 1) % Sector::ALL.len()]
    }

    pub fn prev(self) -> Sector {
        let idx = Sector::ALL.iter().position(|s| *s == self).unwrap_or(0);
        Sector::ALL[(idx + Sector::ALL.len() - 1) % Sector::ALL.len()]
    }
}

impl std::fmt::Display for Sector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for Sector {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        Sector::ALL
            .iter()
            .copied()
            .find(|sector| sector.as_str().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| format!("unknown sector: {wanted}"))
    }
}

// ---------------------------------------------------------------------------
// Operator input
// ---------------------------------------------------------------------------

/// Fields an operator enters on the entry and edit forms. Derived fields are
/// never part of the input; they are recomputed on every write.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StockInput {
    pub name: String,
    pub sector: Sector,
    #[serde(default)]
    pub listed_date: Option<NaiveDate>,
    pub total_listed_shares: i64,
    pub promoter_share: i64,
    pub book_value: f64,
    pub eps: f64,
    #[serde(default)]
    pub remark: String,
}

// ---------------------------------------------------------------------------
// Derived fields
// ---------------------------------------------------------------------------

/// Promoter and public ownership as two fixed-point percentage strings,
/// e.g. `("60.00", "40.00")`. Strings rather than floats because the
/// degenerate cases render as `NaN` / `Infinity`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PromoterPublicPercent {
    pub promoter: String,
    pub public: String,
}

impl std::fmt::Display for PromoterPublicPercent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}%, {}%", self.promoter, self.public)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DerivedFields {
    pub public_share: i64,
    pub promoter_public_percent: PromoterPublicPercent,
    pub lock_in_period: Option<NaiveDate>,
}

// ---------------------------------------------------------------------------
// Stored record
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StockRecord {
    pub id: String,
    pub name: String,
    pub sector: Sector,
    pub listed_date: Option<NaiveDate>,
    pub total_listed_shares: i64,
    pub promoter_share: i64,
    pub public_share: i64,
    pub promoter_public_percent: PromoterPublicPercent,
    pub lock_in_period: Option<NaiveDate>,
    pub book_value: f64,
    pub eps: f64,
    pub remark: String,
}

impl StockRecord {
    /// Assemble a record from operator input and the fields derived from it.
    pub fn from_parts(id: String, input: StockInput, derived: DerivedFields) -> Self {
        Self {
            id,
            name: input.name,
            sector: input.sector,
            listed_date: input.listed_date,
            total_listed_shares: input.total_listed_shares,
            promoter_share: input.promoter_share,
            public_share: derived.public_share,
            promoter_public_percent: derived.promoter_public_percent,
            lock_in_period: derived.lock_in_period,
            book_value: input.book_value,
            eps: input.eps,
            remark: input.remark,
        }
    }

    /// The operator-entered subset, as loaded into the edit form.
    pub fn to_input(&self) -> StockInput {
        StockInput {
            name: self.name.clone(),
            sector: self.sector,
            listed_date: self.listed_date,
            total_listed_shares: self.total_listed_shares,
            promoter_share: self.promoter_share,
            book_value: self.book_value,
            eps: self.eps,
            remark: self.remark.clone(),
        }
    }
}

// ---------------------------------------------------------------------------
// Live price
// ---------------------------------------------------------------------------

/// Outcome of one live-price lookup. Lookups never fail the caller; a missing
/// element or a transport error both degrade to a placeholder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", content = "value", rename_all = "snake_case")]
pub enum PriceQuote {
    Price(String),
    NotAvailable,
    Error,
}

impl PriceQuote {
    pub fn display(&self) -> &str {
        match self {
            PriceQuote::Price(p) => p.as_str(),
            PriceQuote::NotAvailable => "N/A",
            PriceQuote::Error => "Error",
        }
    }
}

impl std::fmt::Display for PriceQuote {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sector_round_trips_through_display_name() {
        for sector in Sector::ALL {
            let parsed: Sector = sector.to_string().parse().unwrap();
            assert_eq!(parsed, sector);
        }
    }

    #[test]
    fn sector_serializes_as_display_name() {
        let json = serde_json::to_string(&Sector::NonLifeInsurance).unwrap();
        assert_eq!(json, "\"Non Life Insurance\"");
    }

    #[test]
    fn sector_picker_wraps() {
        assert_eq!(Sector::Others.next(), Sector::CommercialBanks);
        assert_eq!(Sector::CommercialBanks.prev(), Sector::Others);
    }

    #[test]
    fn percent_pair_display() {
        let pct = PromoterPublicPercent {
            promoter: "60.00".to_string(),
            public: "40.00".to_string(),
        };
        assert_eq!(pct.to_string(), "60.00%, 40.00%");
    }

    #[test]
    fn price_placeholders() {
        assert_eq!(PriceQuote::NotAvailable.display(), "N/A");
        assert_eq!(PriceQuote::Error.display(), "Error");
        assert_eq!(PriceQuote::Price("512.00".into()).display(), "512.00");
    }
}
