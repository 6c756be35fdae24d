pub mod derived;
pub mod rules;
pub mod validation;

pub use derived::{derive, lock_in_date, to_fixed_2};
pub use rules::{SectorRule, SectorRules};
pub use validation::{validate, Severity, ValidationIssue, ValidationReport};

use crate::types::{StockInput, StockRecord};

/// Normalise operator input and build the record to persist: listed dates are
/// dropped for exempt sectors, then every derived field is recomputed.
pub fn build_record(id: String, mut input: StockInput, rules: &SectorRules) -> StockRecord {
    if rules.is_exempt(input.sector) {
        input.listed_date = None;
    }
    let derived = derive(
        input.total_listed_shares,
        input.promoter_share,
        input.sector,
        input.listed_date,
        rules,
    );
    StockRecord::from_parts(id, input, derived)
}
