use std::collections::BTreeMap;

use serde::Serialize;

use crate::types::Sector;

/// Sectors for which listing-date and lock-in tracking does not apply.
pub const DEFAULT_EXEMPT_SECTORS: [Sector; 6] = [
    Sector::CommercialBanks,
    Sector::DevelopmentBanks,
    Sector::Finance,
    Sector::Microfinance,
    Sector::LifeInsurance,
    Sector::NonLifeInsurance,
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SectorRule {
    pub requires_listed_date: bool,
}

/// Immutable sector → rule table. Built once at startup and shared; gates the
/// listed-date and lock-in fields on forms, listing columns and the calculator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SectorRules {
    rules: BTreeMap<Sector, SectorRule>,
}

impl SectorRules {
    /// Build a table where every sector in `exempt` skips listed-date
    /// tracking and every other sector requires it.
    pub fn with_exempt(exempt: &[Sector]) -> Self {
        let rules = Sector::ALL
            .iter()
            .map(|s| {
                (
                    *s,
                    SectorRule {
                        requires_listed_date: !exempt.contains(s),
                    },
                )
            })
            .collect();
        Self { rules }
    }

    pub fn rule(&self, sector: Sector) -> SectorRule {
        self.rules
            .get(&sector)
            .copied()
            .unwrap_or(SectorRule { requires_listed_date: true })
    }

    pub fn requires_listed_date(&self, sector: Sector) -> bool {
        self.rule(sector).requires_listed_date
    }

    pub fn is_exempt(&self, sector: Sector) -> bool {
        !self.requires_listed_date(sector)
    }

    pub fn iter(&self) -> impl Iterator<Item = (Sector, SectorRule)> + '_ {
        self.rules.iter().map(|(s, r)| (*s, *r))
    }
}

impl Default for SectorRules {
    fn default() -> Self {
        Self::with_exempt(&DEFAULT_EXEMPT_SECTORS)
    }
}
