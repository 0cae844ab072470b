use anyhow::{Context, anyhow};
use chrono::{Days, NaiveDate};
use regex::Regex;
use tracing::trace;

/// Parse a due-date expression against `today`.
///
/// Accepted: `YYYY-MM-DD`, `today`, `tomorrow`, relative `+Nd`/`-Nd`, and
/// `none` or an empty string to clear the date.
pub fn parse_due_expr(raw: &str, today: NaiveDate) -> anyhow::Result<Option<NaiveDate>> {
    let trimmed = raw.trim();
    if trimmed.is_empty() || trimmed.eq_ignore_ascii_case("none") {
        return Ok(None);
    }

    let lowered = trimmed.to_ascii_lowercase();
    if lowered == "today" {
        return Ok(Some(today));
    }
    if lowered == "tomorrow" {
        return today
            .checked_add_days(Days::new(1))
            .map(Some)
            .ok_or_else(|| anyhow!("date out of range: tomorrow"));
    }

    let rel_re =
        Regex::new(r"^(?P<sign>[+-])(?P<num>\d+)d$").context("building relative date pattern")?;
    if let Some(caps) = rel_re.captures(&lowered) {
        let num: u64 = caps["num"]
            .parse()
            .with_context(|| format!("relative day count in {trimmed}"))?;
        let resolved = if &caps["sign"] == "+" {
            today.checked_add_days(Days::new(num))
        } else {
            today.checked_sub_days(Days::new(num))
        };
        trace!(expr = %trimmed, ?resolved, "resolved relative due date");
        return resolved
            .map(Some)
            .ok_or_else(|| anyhow!("date out of range: {trimmed}"));
    }

    NaiveDate::parse_from_str(trimmed, "%Y-%m-%d").map(Some).with_context(|| {
        format!("invalid due date: {trimmed} (expected YYYY-MM-DD, today, tomorrow, +Nd or none)")
    })
}

pub fn format_due(due: Option<NaiveDate>) -> String {
    due.map(|date| date.format("%Y-%m-%d").to_string()).unwrap_or_default()
}
