//! Core types: Symbol, Cents

use std::fmt;

/// Ticker symbol stored inline (max 8 ASCII bytes), normalized to uppercase.
///
/// `Symbol` is `Copy`, so it can be used freely as a map key without
/// allocation. Allowed characters are `A-Z`, `0-9`, `.`, `-` and `/`
/// (class shares such as `BRK.B`).
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Symbol {
    bytes: [u8; Symbol::MAX_LEN],
    len: u8,
}

impl Symbol {
    /// Maximum symbol length in bytes.
    pub const MAX_LEN: usize = 8;

    /// Create a symbol, panicking on invalid input.
    ///
    /// # Panics
    ///
    /// Panics if `s` is empty, longer than [`Symbol::MAX_LEN`], or contains
    /// characters outside the allowed set. Use [`Symbol::try_new`] for
    /// untrusted input.
    #[track_caller]
    pub fn new(s: &str) -> Self {
        match Self::try_new(s) {
            Some(sym) => sym,
            None => panic!("invalid symbol: {s:?}"),
        }
    }

    /// Create a symbol, returning `None` on invalid input.
    ///
    /// Surrounding whitespace is trimmed and lowercase letters are uppercased.
    pub fn try_new(s: &str) -> Option<Self> {
        let s = s.trim();
        if s.is_empty() || s.len() > Self::MAX_LEN {
            return None;
        }

        let mut bytes = [0u8; Self::MAX_LEN];
        for (slot, b) in bytes.iter_mut().zip(s.bytes()) {
            let b = b.to_ascii_uppercase();
            if !(b.is_ascii_uppercase() || b.is_ascii_digit() || matches!(b, b'.' | b'-' | b'/')) {
                return None;
            }
            *slot = b;
        }

        Some(Self {
            bytes,
            len: s.len() as u8,
        })
    }

    /// The symbol as a string slice.
    pub fn as_str(&self) -> &str {
        // Only ASCII bytes are ever stored.
        std::str::from_utf8(&self.bytes[..self.len as usize]).unwrap_or_default()
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl fmt::Debug for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Symbol({})", self.as_str())
    }
}

impl std::str::FromStr for Symbol {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::try_new(s).ok_or_else(|| format!("invalid symbol: {s:?}"))
    }
}

#[cfg(feature = "serde")]
impl serde::Serialize for Symbol {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

#[cfg(feature = "serde")]
impl<'de> serde::Deserialize<'de> for Symbol {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Symbol::try_new(&s).ok_or_else(|| serde::de::Error::custom(format!("invalid symbol: {s:?}")))
    }
}

/// Money in cents.
///
/// `Cents(10050)` represents $100.50. Fixed-point keeps dollar targets and
/// the one-cent rebalance tolerance exact.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Cents(pub i64);

impl Cents {
    /// Convert a dollar amount to cents, rounding to the nearest cent.
    pub fn from_dollars(dollars: f64) -> Self {
        Cents((dollars * 100.0).round() as i64)
    }

    /// The amount in dollars.
    pub fn dollars(self) -> f64 {
        self.0 as f64 / 100.0
    }
}

impl fmt::Display for Cents {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let dollars = self.0 / 100;
        let cents = (self.0 % 100).abs();
        let s = if self.0 < 0 {
            format!("-${}.{:02}", dollars.abs(), cents)
        } else {
            format!("${}.{:02}", dollars, cents)
        };
        f.pad(&s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn symbol_normalizes_case() {
        assert_eq!(Symbol::new("aapl"), Symbol::new("AAPL"));
        assert_eq!(Symbol::new(" msft ").as_str(), "MSFT");
    }

    #[test]
    fn symbol_accepts_class_shares() {
        assert_eq!(Symbol::new("BRK.B").as_str(), "BRK.B");
    }

    #[test]
    fn symbol_rejects_bad_input() {
        assert!(Symbol::try_new("").is_none());
        assert!(Symbol::try_new("TOOLONGNAME").is_none());
        assert!(Symbol::try_new("A B").is_none());
        assert!(Symbol::try_new("Ω").is_none());
    }

    #[test]
    fn symbol_ordering_is_lexical() {
        assert!(Symbol::new("AAA") < Symbol::new("BBB"));
        assert!(Symbol::new("AA") < Symbol::new("AAA"));
    }

    #[test]
    fn symbol_display_pads() {
        assert_eq!(format!("{:6}|", Symbol::new("SPY")), "SPY   |");
    }

    #[test]
    fn cents_display() {
        assert_eq!(format!("{}", Cents(10050)), "$100.50");
        assert_eq!(format!("{}", Cents(100)), "$1.00");
        assert_eq!(format!("{}", Cents(5)), "$0.05");
        assert_eq!(format!("{}", Cents(-250)), "-$2.50");
    }

    #[test]
    fn cents_from_dollars_rounds() {
        assert_eq!(Cents::from_dollars(123.456), Cents(12346));
        assert_eq!(Cents::from_dollars(0.004), Cents(0));
        assert_eq!(Cents(12345).dollars(), 123.45);
    }
}
