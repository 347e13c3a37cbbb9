// Date expression parsing for target/milestone dates

use chrono::{Duration, Local, NaiveDate};
use anyhow::Result;

/// Parse a date expression and return a calendar date.
///
/// Plan scheduling is pure calendar-day arithmetic, so expressions resolve
/// to a `NaiveDate` rather than a timestamp. Supported forms:
/// - Absolute: `2025-03-31`
/// - Relative: `today`, `tomorrow`
/// - Offsets: `+30d` (30 days from today)
pub fn parse_date_expr(expr: &str) -> Result<NaiveDate> {
    if let Ok(date) = NaiveDate::parse_from_str(expr, "%Y-%m-%d") {
        return Ok(date);
    }

    let today = Local::now().date_naive();
    match expr {
        "today" => Ok(today),
        "tomorrow" => Ok(today + Duration::days(1)),
        _ => {
            // Offset form: +Nd
            if let Some(days_str) = expr.strip_prefix('+').and_then(|s| s.strip_suffix('d')) {
                if let Ok(days) = days_str.parse::<i64>() {
                    return Ok(today + Duration::days(days));
                }
            }
            anyhow::bail!(
                "Unsupported date expression: '{}'. Use YYYY-MM-DD, today, tomorrow, or +Nd.",
                expr
            )
        }
    }
}
