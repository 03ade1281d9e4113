//! Provider contract-symbol encoding.
//!
//! NSE option symbols come in two layouts depending on the contract cycle:
//!
//! - monthly (last Thursday of the month): `NSE:NIFTY26FEB25000CE`
//!   — two-digit year, three-letter month, strike, side suffix.
//! - weekly (every other Thursday): `NSE:NIFTY2621225000CE`
//!   — two-digit year, one-char month code (`1`-`9` for Jan–Sep, `O`/`N`/`D`
//!   for Oct–Dec), two-digit day, strike, side suffix.
//!
//! The provider matches symbols literally. A wrong encoding does not error —
//! the quote lookup just comes back empty — so both layouts are pinned by
//! tests against known expiries.

use std::fmt;

use chrono::{Datelike, NaiveDate};

use crate::expiry::is_monthly_expiry;
use crate::underlying::Underlying;

/// Option side, encoded as the `CE`/`PE` symbol suffix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OptionType {
    Call,
    Put,
}

impl OptionType {
    pub fn suffix(&self) -> &'static str {
        match self {
            OptionType::Call => "CE",
            OptionType::Put => "PE",
        }
    }
}

impl fmt::Display for OptionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.suffix())
    }
}

const MONTH_NAMES: [&str; 12] = [
    "JAN", "FEB", "MAR", "APR", "MAY", "JUN", "JUL", "AUG", "SEP", "OCT", "NOV", "DEC",
];

const WEEKLY_MONTH_CODES: [&str; 12] =
    ["1", "2", "3", "4", "5", "6", "7", "8", "9", "O", "N", "D"];

/// Encode the provider symbol for one contract.
pub fn contract_symbol(
    underlying: Underlying,
    expiry: NaiveDate,
    strike: f64,
    option_type: OptionType,
) -> String {
    let root = underlying.contract_root();
    let yy = expiry.year() % 100;
    let strike = strike as i64;
    let month = expiry.month0() as usize;

    if is_monthly_expiry(expiry) {
        format!(
            "NSE:{}{:02}{}{}{}",
            root,
            yy,
            MONTH_NAMES[month],
            strike,
            option_type.suffix()
        )
    } else {
        format!(
            "NSE:{}{:02}{}{:02}{}{}",
            root,
            yy,
            WEEKLY_MONTH_CODES[month],
            expiry.day(),
            strike,
            option_type.suffix()
        )
    }
}
