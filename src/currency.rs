use crate::config::{CurrencyConfig, DigitGrouping};
use rust_decimal::Decimal;

/// Renders an amount with the configured symbol and digit grouping, e.g.
/// `₹2,50,000` or `$250,000.50`. Fractions are kept to two places and
/// dropped when zero.
pub fn format_amount(amount: Decimal, currency: &CurrencyConfig) -> String {
    let rounded = amount.round_dp(2).normalize();
    let text = rounded.abs().to_string();
    let (whole, fraction) = match text.split_once('.') {
        Some((whole, fraction)) => (whole, Some(fraction)),
        None => (text.as_str(), None),
    };

    let mut rendered = String::new();
    if rounded.is_sign_negative() && !rounded.is_zero() {
        rendered.push('-');
    }
    rendered.push_str(&currency.symbol);
    rendered.push_str(&group_digits(whole, currency.grouping));
    if let Some(fraction) = fraction {
        rendered.push('.');
        rendered.push_str(fraction);
        if fraction.len() == 1 {
            rendered.push('0');
        }
    }
    rendered
}

fn group_digits(digits: &str, grouping: DigitGrouping) -> String {
    if digits.len() <= 3 {
        return digits.to_string();
    }
    let (head, tail) = digits.split_at(digits.len() - 3);
    let head_group = match grouping {
        DigitGrouping::Indian => 2,
        DigitGrouping::Western => 3,
    };

    let mut groups = Vec::new();
    let mut end = head.len();
    while end > 0 {
        let start = end.saturating_sub(head_group);
        groups.push(&head[start..end]);
        end = start;
    }
    groups.reverse();
    groups.push(tail);
    groups.join(",")
}
