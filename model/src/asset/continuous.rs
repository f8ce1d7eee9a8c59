use crate::core::Time;
use crate::{encode_continuous_future_sid, AdjustmentStyle, AssetError, ExchangeInfo, RollStyle, Sid};
use serde::{Deserialize, Serialize};

/// Rolling position across the ordered contracts of one root symbol.
///
/// Never persisted. Its sid is derived from the other fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContinuousFuture {
    pub sid: Sid,
    pub root_symbol: String,
    pub offset: u8,
    pub roll_style: RollStyle,
    pub adjustment: AdjustmentStyle,
    pub start_date: Time,
    pub end_date: Time,
    pub exchange: ExchangeInfo,
}

impl ContinuousFuture {
    pub fn new(
        root_symbol: &str,
        offset: i64,
        roll_style: RollStyle,
        adjustment: AdjustmentStyle,
        start_date: Time,
        end_date: Time,
        exchange: ExchangeInfo,
    ) -> Result<Self, AssetError> {
        let sid = encode_continuous_future_sid(root_symbol, offset, roll_style, adjustment)?;
        Ok(Self {
            sid,
            root_symbol: root_symbol.to_string(),
            // range checked by the encoder
            offset: offset as u8,
            roll_style,
            adjustment,
            start_date,
            end_date,
            exchange,
        })
    }
    /// Same definition with a different adjustment.
    pub fn with_adjustment(&self, adjustment: AdjustmentStyle) -> Self {
        let mut this = self.clone();
        this.adjustment = adjustment;
        this.sid = sid_with_adjustment(self.sid, adjustment);
        this
    }
    pub fn symbol(&self) -> &str {
        &self.root_symbol
    }
}

fn sid_with_adjustment(sid: Sid, adjustment: AdjustmentStyle) -> Sid {
    let mut bytes = sid.to_be_bytes();
    bytes[5] = adjustment.id();
    u64::from_be_bytes(bytes)
}
