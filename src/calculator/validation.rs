use serde::Serialize;

use crate::calculator::rules::SectorRules;
use crate::types::StockInput;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Rejected on every write.
    Error,
    /// Accepted unless strict validation is on.
    Warning,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationIssue {
    pub field: &'static str,
    pub severity: Severity,
    pub message: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ValidationReport {
    pub issues: Vec<ValidationIssue>,
}

impl ValidationReport {
    fn push(&mut self, field: &'static str, severity: Severity, message: impl Into<String>) {
        self.issues.push(ValidationIssue {
            field,
            severity,
            message: message.into(),
        });
    }

    pub fn errors(&self) -> impl Iterator<Item = &ValidationIssue> {
        self.issues.iter().filter(|i| i.severity == Severity::Error)
    }

    pub fn warnings(&self) -> impl Iterator<Item = &ValidationIssue> {
        self.issues.iter().filter(|i| i.severity == Severity::Warning)
    }

    pub fn is_clean(&self) -> bool {
        self.issues.is_empty()
    }

    /// Whether a write carrying this report may proceed.
    pub fn accepts(&self, strict: bool) -> bool {
        if strict {
            self.issues.is_empty()
        } else {
            self.errors().next().is_none()
        }
    }

    pub fn summary(&self) -> String {
        self.issues
            .iter()
            .map(|i| format!("{}: {}", i.field, i.message))
            .collect::<Vec<_>>()
            .join("; ")
    }
}

/// Check operator input before it reaches the store. Shared by the create and
/// the update path.
///
/// Out-of-range share counts (promoter above total, zero total) are reported
/// as warnings so the permissive behaviour stays available; the caller decides
/// with [`ValidationReport::accepts`].
pub fn validate(input: &StockInput, rules: &SectorRules) -> ValidationReport {
    let mut report = ValidationReport::default();

    if input.name.trim().is_empty() {
        report.push("name", Severity::Error, "name is required");
    }

    if rules.requires_listed_date(input.sector) && input.listed_date.is_none() {
        report.push(
            "listed_date",
            Severity::Error,
            format!("listed date is required for {}", input.sector),
        );
    }

    if input.total_listed_shares < 0 {
        report.push("total_listed_shares", Severity::Error, "must not be negative");
    }
    if input.promoter_share < 0 {
        report.push("promoter_share", Severity::Error, "must not be negative");
    }
    if !input.book_value.is_finite() {
        report.push("book_value", Severity::Error, "must be a number");
    }
    if !input.eps.is_finite() {
        report.push("eps", Severity::Error, "must be a number");
    }

    if input.total_listed_shares == 0 {
        report.push(
            "total_listed_shares",
            Severity::Warning,
            "zero total listed shares makes the ownership split undefined",
        );
    }
    if input.promoter_share > input.total_listed_shares {
        report.push(
            "promoter_share",
            Severity::Warning,
            format!(
                "promoter share {} exceeds total listed shares {}",
                input.promoter_share, input.total_listed_shares
            ),
        );
    }

    report
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;
    use crate::types::Sector;

    fn input(sector: Sector, listed: Option<NaiveDate>, total: i64, promoter: i64) -> StockInput {
        StockInput {
            name: "NABIL".to_string(),
            sector,
            listed_date: listed,
            total_listed_shares: total,
            promoter_share: promoter,
            book_value: 210.5,
            eps: 18.2,
            remark: String::new(),
        }
    }

    #[test]
    fn clean_input_has_no_issues() {
        let d = NaiveDate::from_ymd_opt(2020, 1, 15);
        let report = validate(&input(Sector::HydroPower, d, 1000, 600), &SectorRules::default());
        assert!(report.is_clean());
        assert!(report.accepts(true));
    }

    #[test]
    fn exempt_sector_needs_no_listed_date() {
        let report = validate(
            &input(Sector::CommercialBanks, None, 1000, 510),
            &SectorRules::default(),
        );
        assert!(report.is_clean());
    }

    #[test]
    fn missing_listed_date_is_an_error() {
        let report = validate(&input(Sector::HydroPower, None, 1000, 600), &SectorRules::default());
        let errors: Vec<_> = report.errors().collect();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].field, "listed_date");
        assert!(!report.accepts(false));
    }

    #[test]
    fn promoter_above_total_is_only_a_warning() {
        let report = validate(
            &input(Sector::Finance, None, 100, 150),
            &SectorRules::default(),
        );
        assert_eq!(report.warnings().count(), 1);
        assert!(report.accepts(false));
        assert!(!report.accepts(true));
    }

    #[test]
    fn zero_total_is_flagged() {
        let report = validate(&input(Sector::Finance, None, 0, 0), &SectorRules::default());
        assert_eq!(report.warnings().next().map(|w| w.field), Some("total_listed_shares"));
    }

    #[test]
    fn blank_name_and_negative_counts_are_errors() {
        let mut bad = input(Sector::Finance, None, -1, -2);
        bad.name = "   ".to_string();
        let report = validate(&bad, &SectorRules::default());
        let fields: Vec<_> = report.errors().map(|e| e.field).collect();
        assert_eq!(fields, vec!["name", "total_listed_shares", "promoter_share"]);
    }
}
