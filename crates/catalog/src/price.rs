use core::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use storefront_core::{DomainError, DomainResult, ValueObject};

/// Product price, stored in the smallest currency unit (cents).
///
/// On the wire a price is a plain decimal number (`200.0`, `14.99`). Decimal
/// strings (`"14.99"`) are accepted on input as well.
///
/// Every store keeps cents in a signed 64-bit column, so a price never
/// exceeds [`Price::MAX_CENTS`]. Numbers pass through `f64`, which is only
/// exact up to 2^53, so numeric input above [`Price::MAX_EXACT_CENTS`] must be
/// sent as a decimal string.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Price {
    cents: u64,
}

impl ValueObject for Price {}

impl Price {
    pub const MAX_CENTS: u64 = i64::MAX as u64;
    pub const MAX_EXACT_CENTS: u64 = 1 << 53;

    pub fn from_cents(cents: u64) -> DomainResult<Self> {
        if cents > Self::MAX_CENTS {
            return Err(DomainError::validation("price is too large"));
        }
        Ok(Self { cents })
    }

    pub const fn cents(self) -> u64 {
        self.cents
    }

    /// Build a price from a decimal amount (e.g. `14.99`).
    pub fn from_decimal(amount: f64) -> DomainResult<Self> {
        if !amount.is_finite() {
            return Err(DomainError::validation("price must be a finite number"));
        }
        if amount < 0.0 {
            return Err(DomainError::validation("price cannot be negative"));
        }

        let scaled = amount * 100.0;
        let cents = scaled.round();
        if (scaled - cents).abs() > 1e-6 {
            return Err(DomainError::validation(
                "price cannot have more than two decimal places",
            ));
        }
        if cents > Self::MAX_EXACT_CENTS as f64 {
            return Err(DomainError::validation(
                "price is too large to send as a number, send it as a decimal string",
            ));
        }

        Self::from_cents(cents as u64)
    }

    pub fn as_decimal(self) -> f64 {
        self.cents as f64 / 100.0
    }
}

impl core::fmt::Display for Price {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}.{:02}", self.cents / 100, self.cents % 100)
    }
}

impl FromStr for Price {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let (whole, frac) = match s.split_once('.') {
            Some((w, f)) => (w, f),
            None => (s, ""),
        };

        let digits_only = |p: &str| p.chars().all(|c| c.is_ascii_digit());
        if whole.is_empty() || !digits_only(whole) || !digits_only(frac) {
            return Err(DomainError::validation(format!("invalid price: {s:?}")));
        }
        if frac.len() > 2 {
            return Err(DomainError::validation(
                "price cannot have more than two decimal places",
            ));
        }

        let whole: u64 = whole
            .parse()
            .map_err(|_| DomainError::validation("price is too large"))?;
        let frac: u64 = match frac.len() {
            0 => 0,
            1 => frac.parse::<u64>().unwrap_or(0) * 10,
            _ => frac.parse::<u64>().unwrap_or(0),
        };

        whole
            .checked_mul(100)
            .and_then(|c| c.checked_add(frac))
            .ok_or_else(|| DomainError::validation("price is too large"))
            .and_then(Price::from_cents)
    }
}

impl Serialize for Price {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(self.as_decimal())
    }
}

impl<'de> Deserialize<'de> for Price {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Number(f64),
            Text(String),
        }

        let parsed = match Raw::deserialize(deserializer)? {
            Raw::Number(n) => Price::from_decimal(n),
            Raw::Text(s) => s.parse(),
        };
        parsed.map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decimal_amounts_round_trip_through_cents() {
        let price = Price::from_decimal(14.99).unwrap();
        assert_eq!(price.cents(), 1499);
        assert_eq!(price.to_string(), "14.99");
        assert_eq!(Price::from_decimal(200.0).unwrap().cents(), 20000);
    }

    #[test]
    fn rejects_negative_and_fractional_cents() {
        assert!(Price::from_decimal(-1.0).is_err());
        assert!(Price::from_decimal(1.234).is_err());
        assert!(Price::from_decimal(f64::NAN).is_err());
    }

    #[test]
    fn parses_decimal_strings() {
        assert_eq!("22.5".parse::<Price>().unwrap().cents(), 2250);
        assert_eq!("7".parse::<Price>().unwrap().cents(), 700);
        assert!("7.999".parse::<Price>().is_err());
        assert!("-7".parse::<Price>().is_err());
        assert!("abc".parse::<Price>().is_err());
    }

    #[test]
    fn cents_are_bounded_by_the_signed_column() {
        assert_eq!(Price::from_cents(Price::MAX_CENTS).unwrap().cents(), i64::MAX as u64);
        assert!(Price::from_cents(Price::MAX_CENTS + 1).is_err());

        let max = "92233720368547758.07".parse::<Price>().unwrap();
        assert_eq!(max.cents(), Price::MAX_CENTS);
        assert!("92233720368547758.08".parse::<Price>().is_err());
        assert!("184467440737095516.15".parse::<Price>().is_err());
    }

    #[test]
    fn numbers_beyond_exact_f64_range_are_rejected() {
        assert_eq!(
            Price::from_decimal(90_071_992_547_409.0).unwrap().cents(),
            9_007_199_254_740_900
        );
        assert!(Price::from_decimal(90_071_992_547_410.0).is_err());
        assert!(serde_json::from_str::<Price>("1e17").is_err());
        assert!(serde_json::from_str::<Price>("92233720368547758.07").is_err());

        // The same amount is fine as a string.
        let exact: Price = serde_json::from_str("\"92233720368547758.07\"").unwrap();
        assert_eq!(exact.cents(), Price::MAX_CENTS);
    }

    #[test]
    fn json_accepts_numbers_and_strings() {
        let a: Price = serde_json::from_str("29.99").unwrap();
        let b: Price = serde_json::from_str("\"29.99\"").unwrap();
        assert_eq!(a, b);
        assert_eq!(serde_json::to_string(&a).unwrap(), "29.99");
    }
}
