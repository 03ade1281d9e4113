use std::fmt;
use std::str::FromStr;

use chrono::Weekday;

/// Index underlyings the pipeline captures option chains for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Underlying {
    Nifty,
    BankNifty,
}

impl Underlying {
    /// All supported underlyings, in capture order.
    pub const ALL: [Underlying; 2] = [Underlying::Nifty, Underlying::BankNifty];

    /// Provider symbol for spot quotes on the index itself.
    pub fn spot_symbol(&self) -> &'static str {
        match self {
            Underlying::Nifty => "NSE:NIFTY50-INDEX",
            Underlying::BankNifty => "NSE:NIFTYBANK-INDEX",
        }
    }

    /// Root embedded in option contract symbols.
    pub fn contract_root(&self) -> &'static str {
        match self {
            Underlying::Nifty => "NIFTY",
            Underlying::BankNifty => "BANKNIFTY",
        }
    }

    /// Exchange strike spacing for this index.
    pub fn strike_step(&self) -> f64 {
        match self {
            Underlying::Nifty => 50.0,
            Underlying::BankNifty => 100.0,
        }
    }

    /// Weekly options on both indices currently expire on Thursday.
    pub fn expiry_weekday(&self) -> Weekday {
        Weekday::Thu
    }
}

impl fmt::Display for Underlying {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.contract_root())
    }
}

impl FromStr for Underlying {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "NIFTY" => Ok(Underlying::Nifty),
            "BANKNIFTY" => Ok(Underlying::BankNifty),
            other => Err(anyhow::anyhow!("Unknown underlying: {}", other)),
        }
    }
}
