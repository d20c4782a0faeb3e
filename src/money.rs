use rust_decimal::Decimal;

/// Currency symbol for display, falling back to the code itself
pub fn currency_symbol(code: &str) -> &str {
    match code.to_ascii_uppercase().as_str() {
        "NGN" => "\u{20A6}",
        "USD" => "$",
        "GBP" => "\u{00A3}",
        "EUR" => "\u{20AC}",
        _ => code,
    }
}

/// Format an amount with its currency and thousands separators, e.g. `₦12,500.00`
pub fn display_amount(currency: &str, amount: Decimal) -> String {
    let rounded = amount.round_dp(2);
    let sign = if rounded.is_sign_negative() && !rounded.is_zero() {
        "-"
    } else {
        ""
    };
    let formatted = format!("{:.2}", rounded.abs());
    let (whole, frac) = formatted.split_once('.').unwrap_or((&formatted, "00"));
    format!(
        "{sign}{}{}.{frac}",
        currency_symbol(currency),
        group_thousands(whole)
    )
}

fn group_thousands(digits: &str) -> String {
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

/// Compact decimal display without trailing zeros (e.g. multipliers)
pub fn format_factor(value: Decimal) -> String {
    value.normalize().to_string()
}
