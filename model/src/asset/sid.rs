//! Synthetic sids for continuous futures.
//!
//! A continuous future never lives in the asset db, its sid is packed from the
//! parameters that define it:
//!
//! ```text
//! byte   0     1        2        3       4         5           6    7
//!      [tag][root[0]][root[1]][offset][roll id][adjust id][0x00][0x00]
//! ```
//!
//! The eight bytes are read big-endian into a `u64`. The tag byte is never zero,
//! so persisted sids must keep their high byte clear.

use crate::{AdjustmentStyle, AssetError, RollStyle};

pub type Sid = u64;

/// Tag byte of every continuous future sid.
pub const CONTINUOUS_FUTURE_TAG: u8 = 1;

const TAG_SHIFT: u32 = 56;

/// Packs a continuous future definition into its sid.
pub fn encode_continuous_future_sid(
    root_symbol: &str,
    offset: i64,
    roll_style: RollStyle,
    adjustment: AdjustmentStyle,
) -> Result<Sid, AssetError> {
    let root = root_symbol.as_bytes();
    if root.len() != 2 || !root.iter().all(u8::is_ascii_alphabetic) {
        return Err(AssetError::invalid(format!(
            "root symbol must be exactly 2 ascii letters, got {root_symbol:?}"
        )));
    }
    let offset = u8::try_from(offset)
        .map_err(|_| AssetError::invalid(format!("offset must fit in one byte (0..=255), got {offset}")))?;
    let bytes = [
        CONTINUOUS_FUTURE_TAG,
        root[0],
        root[1],
        offset,
        roll_style.id(),
        adjustment.id(),
        0,
        0,
    ];
    Ok(u64::from_be_bytes(bytes))
}

/// True when the sid carries a tag in its reserved high byte.
pub fn is_tagged_sid(sid: Sid) -> bool {
    sid >> TAG_SHIFT != 0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layout() -> Result<(), AssetError> {
        let sid = encode_continuous_future_sid("CL", 0, RollStyle::Calendar, AdjustmentStyle::None)?;
        assert_eq!(sid, u64::from_be_bytes([1, b'C', b'L', 0, 0, 0, 0, 0]));
        assert_eq!(sid, 0x01_43_4C_00_00_00_00_00);
        assert!(is_tagged_sid(sid));
        Ok(())
    }

    #[test]
    fn test_stable_and_distinct() -> Result<(), AssetError> {
        let base = encode_continuous_future_sid("CL", 1, RollStyle::Volume, AdjustmentStyle::Additive)?;
        assert_eq!(
            base,
            encode_continuous_future_sid("CL", 1, RollStyle::Volume, AdjustmentStyle::Additive)?
        );
        let variants = [
            encode_continuous_future_sid("FV", 1, RollStyle::Volume, AdjustmentStyle::Additive)?,
            encode_continuous_future_sid("CL", 2, RollStyle::Volume, AdjustmentStyle::Additive)?,
            encode_continuous_future_sid("CL", 1, RollStyle::Calendar, AdjustmentStyle::Additive)?,
            encode_continuous_future_sid("CL", 1, RollStyle::Volume, AdjustmentStyle::Multiplicative)?,
        ];
        for v in variants {
            assert_ne!(base, v);
        }
        Ok(())
    }

    #[test]
    fn test_rejects_bad_input() {
        for root in ["C", "CLX", "C1", ""] {
            assert!(matches!(
                encode_continuous_future_sid(root, 0, RollStyle::Calendar, AdjustmentStyle::None),
                Err(AssetError::InvalidArgument(_))
            ));
        }
        for offset in [-1, 256] {
            assert!(encode_continuous_future_sid("CL", offset, RollStyle::Calendar, AdjustmentStyle::None).is_err());
        }
        assert!(encode_continuous_future_sid("CL", 255, RollStyle::Calendar, AdjustmentStyle::None).is_ok());
    }

    #[test]
    fn test_real_sids_untagged() {
        assert!(!is_tagged_sid(0));
        assert!(!is_tagged_sid((1 << 56) - 1));
        assert!(is_tagged_sid(1 << 56));
    }
}
