use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use thiserror::Error;

/// SOL 与 lamports 之间的精度（1 SOL = 10^9 lamports）。
pub const SOL_DECIMALS: u8 = 9;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum AmountError {
    #[error("金额必须大于 0: {0}")]
    NotPositive(Decimal),
    #[error("金额 {amount} 超出 {decimals} 位小数精度")]
    TooPrecise { amount: Decimal, decimals: u8 },
    #[error("金额 {amount} 按 {decimals} 位小数换算后超出 u64 范围")]
    Overflow { amount: Decimal, decimals: u8 },
}

/// 将人类可读数量换算为最小单位（`amount * 10^decimals`）。
pub fn to_base_units(amount: Decimal, decimals: u8) -> Result<u64, AmountError> {
    if amount <= Decimal::ZERO {
        return Err(AmountError::NotPositive(amount));
    }
    let overflow = || AmountError::Overflow { amount, decimals };
    let factor = 10u64
        .checked_pow(u32::from(decimals))
        .ok_or_else(overflow)?;
    let scaled = amount
        .checked_mul(Decimal::from(factor))
        .ok_or_else(overflow)?;
    if !scaled.fract().is_zero() {
        return Err(AmountError::TooPrecise { amount, decimals });
    }
    scaled.to_u64().ok_or_else(overflow)
}

/// 将最小单位换算为人类可读数量，去除尾随 0。
pub fn from_base_units(base_units: u64, decimals: u8) -> Decimal {
    Decimal::try_from_i128_with_scale(i128::from(base_units), u32::from(decimals))
        .map(|value| value.normalize())
        .unwrap_or(Decimal::MAX)
}

pub fn sol_to_lamports(sol: Decimal) -> Result<u64, AmountError> {
    to_base_units(sol, SOL_DECIMALS)
}

pub fn lamports_to_sol(lamports: u64) -> Decimal {
    from_base_units(lamports, SOL_DECIMALS)
}
