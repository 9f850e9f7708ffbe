use std::{fmt, str::FromStr};

use bigdecimal::{num_bigint::BigInt, BigDecimal, Zero};
use serde::{Deserialize, Serialize};

use crate::{error::Error, helpers::serde_bigint};

/// Exact on-chain quantity: `numeric * 10^-exp` of `currency`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Amount {
    pub text: String,
    #[serde(with = "serde_bigint")]
    pub numeric: BigInt,
    pub exp: i32,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub currency: String,
}

impl Amount {
    pub fn new(text: &str, numeric: BigInt, exp: i32, currency: &str) -> Self {
        Amount {
            text: text.to_owned(),
            numeric,
            exp,
            currency: currency.to_owned(),
        }
    }

    /// Parses a coin amount whose value is given separately from its denom.
    pub fn from_coin(amount: &str, denom: &str) -> Result<Self, Error> {
        let (numeric, exp) = parse_numeric(amount)?;
        Ok(Amount::new(amount, numeric, exp, denom))
    }

    /// Parses an `sdk.Dec` wire value. Integers on the wire are scaled by
    /// 10^18, while the textual form already carries its decimal point.
    pub fn from_dec(amount: &str, denom: &str) -> Result<Self, Error> {
        if amount.contains('.') {
            return Amount::from_coin(amount, denom);
        }
        let (numeric, _) = parse_numeric(amount)?;
        Ok(Amount::new(amount, numeric, DEC_PRECISION, denom))
    }

    pub fn is_zero(&self) -> bool {
        self.numeric.is_zero()
    }

    pub fn to_decimal(&self) -> BigDecimal {
        BigDecimal::new(self.numeric.clone(), i64::from(self.exp))
    }
}

impl FromStr for Amount {
    type Err = Error;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let (value, currency) = split_currency(raw);
        let (numeric, exp) = parse_numeric(value)?;
        Ok(Amount::new(raw, numeric, exp, currency))
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.to_decimal(), self.currency)
    }
}

pub const DEC_PRECISION: i32 = 18;

/// Parses a comma separated coin list such as `"10uatom,5ibc/27A6"`.
/// A comma only separates coins when the string carries denoms; in a bare
/// number it is a decimal separator.
pub fn parse_coins(raw: &str) -> Result<Vec<Amount>, Error> {
    if !raw.chars().any(|c| c.is_ascii_alphabetic()) {
        return Ok(vec![raw.parse()?]);
    }

    raw.split(',')
        .map(str::trim)
        .filter(|coin| !coin.is_empty())
        .map(Amount::from_str)
        .collect()
}

fn is_numeric_char(c: char) -> bool {
    c.is_ascii_digit() || matches!(c, '.' | ',' | '-') || c.is_whitespace()
}

fn split_currency(raw: &str) -> (&str, &str) {
    let split = raw.find(|c: char| !is_numeric_char(c));

    match split {
        Some(index) if index > 0 => {
            let (value, currency) = raw.split_at(index);
            if currency.starts_with(|c: char| c.is_ascii_alphabetic()) {
                (value, currency)
            } else {
                (raw, "")
            }
        },
        _ => (raw, ""),
    }
}

fn parse_numeric(value: &str) -> Result<(BigInt, i32), Error> {
    let value = value.trim().replace(',', ".");
    if value.is_empty() {
        return Err(Error::MalformedAmount(String::from("empty value")));
    }

    let parts: Vec<&str> = value.split('.').collect();
    let (digits, exp) = match parts.as_slice() {
        [integer] => (integer.to_string(), 0),
        [integer, fraction] => {
            (format!("{}{}", integer, fraction), fraction.len())
        },
        _ => {
            return Err(Error::MalformedAmount(format!(
                "more than one decimal point in {}",
                value
            )))
        },
    };

    let numeric = BigInt::from_str(&digits)
        .map_err(|e| Error::MalformedAmount(format!("{}: {}", value, e)))?;
    let exp = i32::try_from(exp)?;

    Ok((numeric, exp))
}
