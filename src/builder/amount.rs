use std::str::FromStr;

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;

use crate::error::TxError;

/// Wei per ether.
const WEI_DECIMALS: u32 = 18;

/// Parses an operator-entered ETH amount. Must be a plain decimal > 0.
pub fn parse_eth(input: &str) -> Result<Decimal, TxError> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(TxError::ZeroAmount);
    }

    let value =
        Decimal::from_str(trimmed).map_err(|_| TxError::InvalidAmount(trimmed.to_string()))?;

    if value.is_sign_negative() && !value.is_zero() {
        return Err(TxError::InvalidAmount(trimmed.to_string()));
    }
    if value.is_zero() {
        return Err(TxError::ZeroAmount);
    }
    Ok(value)
}

/// Exact ETH -> wei conversion. Fails on sub-wei precision or overflow.
pub fn to_wei(eth: Decimal) -> Result<u128, TxError> {
    let normalized = eth.normalize();
    if normalized.scale() > WEI_DECIMALS {
        return Err(TxError::InvalidAmount(normalized.to_string()));
    }

    let mut wei = normalized;
    for _ in 0..WEI_DECIMALS {
        wei = wei
            .checked_mul(Decimal::TEN)
            .ok_or_else(|| TxError::InvalidAmount(normalized.to_string()))?;
    }

    wei.to_u128()
        .ok_or_else(|| TxError::InvalidAmount(normalized.to_string()))
}

/// Canonical text form stored in records: no trailing zeros.
pub fn format_eth(eth: Decimal) -> String {
    eth.normalize().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_plain_decimals() {
        assert_eq!(parse_eth(" 1.5 ").unwrap(), Decimal::new(15, 1));
        assert_eq!(parse_eth("0"), Err(TxError::ZeroAmount));
        assert_eq!(parse_eth(""), Err(TxError::ZeroAmount));
        assert!(matches!(parse_eth("abc"), Err(TxError::InvalidAmount(_))));
        assert!(matches!(parse_eth("-1"), Err(TxError::InvalidAmount(_))));
    }

    #[test]
    fn converts_to_wei_exactly() {
        assert_eq!(to_wei(Decimal::ONE).unwrap(), 1_000_000_000_000_000_000);
        assert_eq!(to_wei(Decimal::new(12, 1)).unwrap(), 1_200_000_000_000_000_000);
        assert_eq!(to_wei(Decimal::new(1, 18)).unwrap(), 1);
    }

    #[test]
    fn rejects_sub_wei_precision() {
        assert!(matches!(
            to_wei(Decimal::new(1, 19)),
            Err(TxError::InvalidAmount(_))
        ));
    }

    #[test]
    fn formats_without_trailing_zeros() {
        assert_eq!(format_eth(Decimal::new(1200, 3)), "1.2");
        assert_eq!(format_eth(Decimal::new(20, 1)), "2");
    }
}
