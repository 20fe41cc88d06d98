// 1.0: all the primitives live here. ids, prices, ratios, timestamps.
// each is a newtype so the compiler catches type mixups between a collateral
// price and an lltv, or a market id and an account id.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct MarketId(pub u32);

// AccountId(0) is the null identity. it can never receive funds or own a position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct AccountId(pub u64);

impl AccountId {
    pub const NULL: AccountId = AccountId(0);

    pub fn is_null(&self) -> bool {
        *self == Self::NULL
    }
}

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct AssetId(pub u32);

// 1.1: oracle price of one base unit of an asset in a common numeraire.
// zero is a valid price (worthless asset), negative is not.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct OraclePrice(Decimal);

impl OraclePrice {
    #[must_use]
    pub fn new(value: Decimal) -> Option<Self> {
        if value >= Decimal::ZERO {
            Some(Self(value))
        } else {
            None
        }
    }

    pub fn new_unchecked(value: Decimal) -> Self {
        debug_assert!(value >= Decimal::ZERO);
        Self(value)
    }

    pub fn zero() -> Self {
        Self(Decimal::ZERO)
    }

    pub fn value(&self) -> Decimal {
        self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }
}

impl fmt::Display for OraclePrice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Scale of the 18-decimal fixed-point representation used on the wire.
pub const WAD: u128 = 1_000_000_000_000_000_000;

// 1.2: liquidation loan-to-value. fraction of collateral value that may be borrowed.
// must be in (0, 1].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Lltv(Decimal);

impl Lltv {
    #[must_use]
    pub fn new(value: Decimal) -> Option<Self> {
        if value > Decimal::ZERO && value <= Decimal::ONE {
            Some(Self(value))
        } else {
            None
        }
    }

    /// Builds an LLTV from its 1e18-scaled fixed-point form (0.8 = 8e17).
    #[must_use]
    pub fn from_wad(wad: u128) -> Option<Self> {
        let raw = Decimal::try_from_i128_with_scale(i128::try_from(wad).ok()?, 18).ok()?;
        Self::new(raw.normalize())
    }

    pub fn value(&self) -> Decimal {
        self.0
    }

    pub fn to_wad(&self) -> u128 {
        // lltv <= 1, so the scaled value always fits
        (self.0 * dec!(1_000_000_000_000_000_000))
            .trunc()
            .to_u128()
            .unwrap_or(0)
    }
}

impl fmt::Display for Lltv {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}%", self.0 * dec!(100))
    }
}

// 1.3: millisecond timestamp.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Timestamp(pub i64);

impl Timestamp {
    pub fn now() -> Self {
        Self(chrono::Utc::now().timestamp_millis())
    }

    pub fn from_millis(ms: i64) -> Self {
        Self(ms)
    }

    pub fn as_millis(&self) -> i64 {
        self.0
    }
}
