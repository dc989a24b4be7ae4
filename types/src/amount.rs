//! Fixed-point asset amounts.
//!
//! Amounts are represented as raw integer units (u128) together with the
//! asset's precision and NAI (numerical asset identifier). On the wire the
//! raw value is a decimal string, matching the `{amount, precision, nai}`
//! legacy-free JSON form accepted by the node API.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

use crate::error::TypesError;

/// NAI of the liquid base asset.
pub const STEEM_NAI: &str = "@@000000021";
/// NAI of vesting shares.
pub const VESTS_NAI: &str = "@@000000037";

pub const STEEM_PRECISION: u8 = 3;
/// Largest precision whose scale `10^precision` fits in a `u128`.
pub const MAX_PRECISION: u8 = 38;
pub const VESTS_PRECISION: u8 = 6;

/// A quantity of one asset, in raw units.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Amount {
    #[serde(
        serialize_with = "serialize_raw",
        deserialize_with = "deserialize_raw"
    )]
    pub amount: u128,
    #[serde(deserialize_with = "deserialize_precision")]
    pub precision: u8,
    pub nai: String,
}

impl Amount {
    pub fn new(amount: u128, precision: u8, nai: impl Into<String>) -> Self {
        Self {
            amount,
            precision,
            nai: nai.into(),
        }
    }

    /// An amount of the base asset.
    pub fn steem(raw: u128) -> Self {
        Self::new(raw, STEEM_PRECISION, STEEM_NAI)
    }

    pub fn vests(raw: u128) -> Self {
        Self::new(raw, VESTS_PRECISION, VESTS_NAI)
    }

    pub fn raw(&self) -> u128 {
        self.amount
    }

    pub fn is_zero(&self) -> bool {
        self.amount == 0
    }

    pub fn is_steem(&self) -> bool {
        self.nai == STEEM_NAI && self.precision == STEEM_PRECISION
    }

    pub fn is_vests(&self) -> bool {
        self.nai == VESTS_NAI && self.precision == VESTS_PRECISION
    }

    /// Whether both amounts denote the same asset at the same precision.
    pub fn is_compatible(&self, other: &Self) -> bool {
        self.nai == other.nai && self.precision == other.precision
    }

    pub fn ensure_compatible(&self, other: &Self) -> Result<(), TypesError> {
        if self.is_compatible(other) {
            Ok(())
        } else {
            Err(TypesError::AmountMismatch {
                left: self.asset_label(),
                right: other.asset_label(),
            })
        }
    }

    pub fn checked_add(&self, other: &Self) -> Result<Self, TypesError> {
        self.ensure_compatible(other)?;
        let amount = self
            .amount
            .checked_add(other.amount)
            .ok_or(TypesError::AmountOverflow)?;
        Ok(Self {
            amount,
            precision: self.precision,
            nai: self.nai.clone(),
        })
    }

    fn asset_label(&self) -> String {
        format!("{}/{}", self.nai, self.precision)
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let Some(scale) = 10u128.checked_pow(u32::from(self.precision)) else {
            return write!(f, "{} {}/{}", self.amount, self.nai, self.precision);
        };
        if self.precision == 0 {
            write!(f, "{} {}", self.amount, self.nai)
        } else {
            write!(
                f,
                "{}.{:0width$} {}",
                self.amount / scale,
                self.amount % scale,
                self.nai,
                width = usize::from(self.precision)
            )
        }
    }
}

fn serialize_raw<S: Serializer>(value: &u128, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&value.to_string())
}

fn deserialize_precision<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u8, D::Error> {
    let precision = u8::deserialize(deserializer)?;
    if precision > MAX_PRECISION {
        return Err(serde::de::Error::custom(format!(
            "precision {precision} exceeds {MAX_PRECISION}"
        )));
    }
    Ok(precision)
}

fn deserialize_raw<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u128, D::Error> {
    struct RawVisitor;

    impl<'de> serde::de::Visitor<'de> for RawVisitor {
        type Value = u128;

        fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
            write!(f, "a non-negative integer amount as a decimal string")
        }

        fn visit_str<E: serde::de::Error>(self, v: &str) -> Result<Self::Value, E> {
            if v.is_empty() || !v.bytes().all(|b| b.is_ascii_digit()) {
                return Err(E::invalid_value(serde::de::Unexpected::Str(v), &self));
            }
            v.parse::<u128>().map_err(E::custom)
        }

        fn visit_u64<E: serde::de::Error>(self, v: u64) -> Result<Self::Value, E> {
            Ok(u128::from(v))
        }
    }

    deserializer.deserialize_any(RawVisitor)
}
