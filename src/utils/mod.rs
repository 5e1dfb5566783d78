//! Formatting helpers for tables and reports
//!
//! Amounts are shown in US conventions: `,` between thousands and `.` before
//! the cents.

use rust_decimal::Decimal;

/// Currency symbol options for formatting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CurrencySymbol {
    /// Include "$ " prefix
    Usd,
    /// No currency symbol (quantities, unit prices)
    None,
}

/// Core formatting function with full control over output.
///
/// Rounds to two decimals, groups thousands with `,` and right-aligns to
/// `width` (0 for no padding). The sign goes after the symbol.
///
/// # Examples
/// ```
/// use finmetrics::utils::{format_amount_with_width, CurrencySymbol};
/// use rust_decimal_macros::dec;
///
/// assert_eq!(
///     format_amount_with_width(dec!(1234.56), 0, CurrencySymbol::Usd),
///     "$ 1,234.56"
/// );
/// assert_eq!(
///     format_amount_with_width(dec!(1234), 12, CurrencySymbol::None),
///     "    1,234.00"
/// );
/// ```
pub fn format_amount_with_width(value: Decimal, width: usize, symbol: CurrencySymbol) -> String {
    let rounded = value.round_dp(2);
    let formatted = format!("{:.2}", rounded.abs());
    let (integer_part, decimal_part) = formatted.split_once('.').unwrap_or((formatted.as_str(), "00"));

    let digits: Vec<char> = integer_part.chars().collect();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.iter().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(*c);
    }

    let sign = if rounded.is_sign_negative() && !rounded.is_zero() {
        "-"
    } else {
        ""
    };
    let prefix = match symbol {
        CurrencySymbol::Usd => "$ ",
        CurrencySymbol::None => "",
    };

    let result = format!("{}{}{}.{}", prefix, sign, grouped, decimal_part);
    if width > 0 && result.len() < width {
        format!("{:>width$}", result, width = width)
    } else {
        result
    }
}

/// `$ 1,234.56`
///
/// # Examples
/// ```
/// use finmetrics::utils::format_amount;
/// use rust_decimal_macros::dec;
///
/// assert_eq!(format_amount(dec!(-500)), "$ -500.00");
/// ```
pub fn format_amount(value: Decimal) -> String {
    format_amount_with_width(value, 0, CurrencySymbol::Usd)
}

/// `$ 1,234.56` right-aligned to `width`
pub fn format_amount_aligned(value: Decimal, width: usize) -> String {
    format_amount_with_width(value, width, CurrencySymbol::Usd)
}

/// `1,234.56`
pub fn format_number(value: Decimal) -> String {
    format_amount_with_width(value, 0, CurrencySymbol::None)
}
