use crate::constants::TOKEN_DECIMALS;
use crate::error::{ChipstakeError, ChipstakeResult};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Raw token units (wei) paired with their decimal scale, for display and
/// parsing at the edges. The ledger itself works on raw `u128`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TokenAmount {
    pub raw: u128,
    pub decimals: u8,
}

impl Default for TokenAmount {
    fn default() -> Self {
        Self::zero(TOKEN_DECIMALS)
    }
}

impl TokenAmount {
    pub fn from_raw(raw: u128, decimals: u8) -> Self {
        Self { raw, decimals }
    }

    pub fn wei(raw: u128) -> Self {
        Self::from_raw(raw, TOKEN_DECIMALS)
    }

    pub fn from_decimal(s: &str, decimals: u8) -> ChipstakeResult<Self> {
        let parts: Vec<&str> = s.trim().split('.').collect();
        if parts.len() > 2 || parts[0].is_empty() {
            return Err(ChipstakeError::InvalidAmount(format!("invalid decimal format: {}", s)));
        }

        let whole: u128 = parts[0]
            .parse()
            .map_err(|_| ChipstakeError::InvalidAmount(format!("invalid number: {}", s)))?;

        let frac = if parts.len() == 2 {
            let frac_str = parts[1];
            if frac_str.len() > decimals as usize {
                return Err(ChipstakeError::InvalidAmount("too many decimal places".into()));
            }
            let padded = format!("{:0<width$}", frac_str, width = decimals as usize);
            padded
                .parse::<u128>()
                .map_err(|_| ChipstakeError::InvalidAmount("invalid fraction".into()))?
        } else {
            0
        };

        let multiplier = 10u128.pow(decimals as u32);
        let raw = whole
            .checked_mul(multiplier)
            .and_then(|w| w.checked_add(frac))
            .ok_or_else(|| ChipstakeError::InvalidAmount("amount overflow".into()))?;

        Ok(Self { raw, decimals })
    }

    pub fn tokens(amount: &str) -> ChipstakeResult<Self> {
        Self::from_decimal(amount, TOKEN_DECIMALS)
    }

    pub fn to_decimal(&self) -> String {
        let multiplier = 10u128.pow(self.decimals as u32);
        let whole = self.raw / multiplier;
        let frac = self.raw % multiplier;

        if frac == 0 {
            whole.to_string()
        } else {
            let frac_str = format!("{:0>width$}", frac, width = self.decimals as usize);
            format!("{}.{}", whole, frac_str.trim_end_matches('0'))
        }
    }

    pub fn zero(decimals: u8) -> Self {
        Self { raw: 0, decimals }
    }

    pub fn is_zero(&self) -> bool {
        self.raw == 0
    }
}

impl fmt::Display for TokenAmount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_decimal())
    }
}
