//! Currency display formatting.

/// Format an amount as rupees with en-IN digit grouping and two decimal
/// places, e.g. `₹1,23,456.78`.
///
/// Indian grouping puts a separator after the last three integer digits and
/// then after every two.
pub fn format_inr(amount: f64) -> String {
    let negative = amount < 0.0;
    let fixed = format!("{:.2}", amount.abs());
    let (integer, decimals) = fixed
        .split_once('.')
        .unwrap_or((fixed.as_str(), "00"));

    let grouped = group_indian(integer);
    let sign = if negative { "-" } else { "" };

    format!("{sign}₹{grouped}.{decimals}")
}

/// Group the integer digits as `..,XX,XX,XXX`.
fn group_indian(digits: &str) -> String {
    if digits.len() <= 3 {
        return digits.to_owned();
    }

    let (head, tail) = digits.split_at(digits.len() - 3);
    let mut groups = Vec::new();
    let mut end = head.len();

    while end > 2 {
        groups.push(&head[end - 2..end]);
        end -= 2;
    }
    groups.push(&head[..end]);
    groups.reverse();

    format!("{},{}", groups.join(","), tail)
}
