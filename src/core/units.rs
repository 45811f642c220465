//! Balance formatting: smallest-unit hex quantity -> 4-digit decimal string

/// Fractional digits shown for balances
pub const DISPLAY_DECIMALS: u32 = 4;

/// Balance shown when nothing is known (or the fetch failed).
pub const ZERO_BALANCE: &str = "0";

/// Parse an RPC quantity (`0x`-prefixed hex) into an integer.
pub fn parse_quantity(raw: &str) -> Option<u128> {
    let hex = raw.trim().strip_prefix("0x")?;
    if hex.is_empty() {
        return Some(0);
    }
    u128::from_str_radix(hex, 16).ok()
}

/// Format `amount` smallest units with `decimals` decimals, rounded half-up
/// to four fractional digits.
pub fn format_units(amount: u128, decimals: u8) -> Option<String> {
    let decimals = u32::from(decimals);
    let scaled = if decimals >= DISPLAY_DECIMALS {
        let divisor = 10u128.checked_pow(decimals - DISPLAY_DECIMALS)?;
        let (q, r) = (amount / divisor, amount % divisor);
        // r >= divisor - r avoids overflowing r * 2
        if divisor > 1 && r >= divisor - r { q + 1 } else { q }
    } else {
        amount.checked_mul(10u128.checked_pow(DISPLAY_DECIMALS - decimals)?)?
    };
    let unit = 10u128.pow(DISPLAY_DECIMALS);
    Some(format!("{}.{:04}", scaled / unit, scaled % unit))
}

/// `eth_getBalance` result -> display string.
pub fn format_balance(raw: &str, decimals: u8) -> Option<String> {
    format_units(parse_quantity(raw)?, decimals)
}
