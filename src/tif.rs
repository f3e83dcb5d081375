//! Time-in-force: how long a submitted order stays working at the broker

use std::fmt;

/// Time-in-force for orders placed during a rebalance.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum TimeInForce {
    /// Good-for-day: expires at the end of the trading session.
    #[default]
    GFD,

    /// Good-til-cancelled: stays working until filled or cancelled.
    GTC,

    /// Immediate-or-cancel: fill what's available now, cancel the remainder.
    IOC,

    /// At-the-opening: only executes in the opening auction.
    OPG,
}

impl TimeInForce {
    /// Lowercase wire name used by brokerage APIs.
    pub fn as_str(self) -> &'static str {
        match self {
            TimeInForce::GFD => "gfd",
            TimeInForce::GTC => "gtc",
            TimeInForce::IOC => "ioc",
            TimeInForce::OPG => "opg",
        }
    }

    /// Returns true if the order may outlive the current session.
    #[inline]
    pub fn persists(self) -> bool {
        matches!(self, TimeInForce::GTC)
    }
}

impl fmt::Display for TimeInForce {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TimeInForce::GFD => write!(f, "GFD"),
            TimeInForce::GTC => write!(f, "GTC"),
            TimeInForce::IOC => write!(f, "IOC"),
            TimeInForce::OPG => write!(f, "OPG"),
        }
    }
}
