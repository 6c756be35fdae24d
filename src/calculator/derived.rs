use chrono::{Datelike, NaiveDate};

use crate::calculator::rules::SectorRules;
use crate::types::{DerivedFields, PromoterPublicPercent, Sector};

/// Years a promoter's shares stay locked after listing.
pub const LOCK_IN_YEARS: i32 = 3;

/// Compute public share, the promoter/public split and the lock-in date.
///
/// Pure and deterministic: the live form preview and the submit path both call
/// this, so identical inputs always persist identical derived fields.
/// Nothing is clamped: `promoter_share > total_listed_shares` yields a negative
/// public share, and a zero total yields `NaN`/`Infinity` percentages.
/// Public share saturates at the `i64` bounds instead of overflowing.
pub fn derive(
    total_listed_shares: i64,
    promoter_share: i64,
    sector: Sector,
    listed_date: Option<NaiveDate>,
    rules: &SectorRules,
) -> DerivedFields {
    let public_share = total_listed_shares.saturating_sub(promoter_share);

    let lock_in_period = if rules.is_exempt(sector) {
        None
    } else {
        listed_date.map(lock_in_date)
    };

    DerivedFields {
        public_share,
        promoter_public_percent: promoter_public_percent(total_listed_shares, promoter_share),
        lock_in_period,
    }
}

pub fn promoter_public_percent(total_listed_shares: i64, promoter_share: i64) -> PromoterPublicPercent {
    let raw = promoter_share as f64 / total_listed_shares as f64 * 100.0;
    let promoter = to_fixed_2(raw);
    // Public share is taken from the already-rounded promoter figure.
    let promoter_rounded: f64 = promoter.parse().unwrap_or(raw);
    let public = to_fixed_2(100.0 - promoter_rounded);
    PromoterPublicPercent { promoter, public }
}

/// Listed date with the year advanced by [`LOCK_IN_YEARS`]; month and day are
/// kept. 29 February on a non-leap target year overflows to 1 March.
pub fn lock_in_date(listed: NaiveDate) -> NaiveDate {
    let year = listed.year() + LOCK_IN_YEARS;
    listed
        .with_year(year)
        .or_else(|| NaiveDate::from_ymd_opt(year, 3, 1))
        .unwrap_or(listed)
}

/// Two-decimal fixed-point rendering with round-half-away-from-zero on the
/// exact binary value. Non-finite values render as `NaN`, `Infinity` and
/// `-Infinity`.
pub fn to_fixed_2(x: f64) -> String {
    if x.is_nan() {
        return "NaN".to_string();
    }
    if x.is_infinite() {
        return if x > 0.0 { "Infinity" } else { "-Infinity" }.to_string();
    }

    let magnitude = x.abs();
    // Exact ties at the third decimal are odd multiples of 1/8; the std
    // formatter breaks those to even, so nudge them up.
    let eighths = magnitude * 8.0;
    let exact_tie = eighths.fract() == 0.0 && eighths % 2.0 == 1.0;
    let magnitude = if exact_tie { magnitude + 0.001 } else { magnitude };

    let body = format!("{magnitude:.2}");
    if x < 0.0 {
        format!("-{body}")
    } else {
        body
    }
}
