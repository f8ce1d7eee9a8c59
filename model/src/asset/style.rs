use crate::AssetError;
use parse_display::Display;
use serde_with::{DeserializeFromStr, SerializeDisplay};
use std::str::FromStr;
use strum_macros::{EnumIter, FromRepr};

/// How a continuous future decides to move to the next contract.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Display, SerializeDisplay, DeserializeFromStr, FromRepr, EnumIter)]
#[display(style = "lowercase")]
#[repr(u8)]
pub enum RollStyle {
    Calendar = 0,
    Volume = 1,
}

impl RollStyle {
    pub fn id(&self) -> u8 {
        *self as u8
    }
}

impl FromStr for RollStyle {
    type Err = AssetError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "calendar" => Ok(Self::Calendar),
            "volume" => Ok(Self::Volume),
            _ => Err(AssetError::invalid(format!("Invalid roll style: {s}"))),
        }
    }
}

/// Price adjustment applied across rolls of a continuous future.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, SerializeDisplay, DeserializeFromStr, FromRepr, EnumIter)]
#[repr(u8)]
pub enum AdjustmentStyle {
    None = 0,
    /// `div`
    Multiplicative = 1,
    /// `add`
    Additive = 2,
}

impl AdjustmentStyle {
    pub fn id(&self) -> u8 {
        *self as u8
    }
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Multiplicative => "div",
            Self::Additive => "add",
        }
    }
}

impl std::fmt::Display for AdjustmentStyle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AdjustmentStyle {
    type Err = AssetError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "" | "none" => Ok(Self::None),
            "div" => Ok(Self::Multiplicative),
            "add" => Ok(Self::Additive),
            _ => Err(AssetError::invalid(format!(
                "Invalid adjustment style {s:?}, expected one of none, div, add"
            ))),
        }
    }
}
