//! Monotonic-second timestamps, timezone-aware formatting, and parsing of
//! relative time expressions ("in 5 minutes", "tomorrow").

use chrono::{DateTime, TimeZone, Utc};
use chrono_tz::Tz;

use crate::error::{Result, SeeleError};

/// Current Unix timestamp in whole seconds.
pub fn now_secs() -> i64 {
    Utc::now().timestamp()
}

/// Render a Unix timestamp in the given IANA timezone as `YYYY-MM-DD HH:MM:SS`.
pub fn timestamp_to_str(ts: i64, tz_name: &str) -> String {
    let tz: Tz = tz_name.parse().unwrap_or(chrono_tz::Asia::Shanghai);
    let dt = Utc
        .timestamp_opt(ts, 0)
        .single()
        .unwrap_or_else(Utc::now)
        .with_timezone(&tz);
    dt.format("%Y-%m-%d %H:%M:%S").to_string()
}

/// Parse a relative or absolute time expression into a Unix timestamp.
///
/// Accepted forms: bare integer seconds, RFC 3339 datetime,
/// `Ns|Nm|Nh|Nd|Nw` duration shorthand, `in N <unit>` phrases, and the
/// literals `tomorrow` / `next week`.
pub fn parse_time_expression(input: &str, tz_name: &str, now: i64) -> Result<i64> {
    let trimmed = input.trim();

    if let Ok(secs) = trimmed.parse::<i64>() {
        return Ok(secs);
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
        return Ok(dt.timestamp());
    }

    let lower = trimmed.to_lowercase();
    if lower == "tomorrow" {
        return Ok(next_day_at_hour(now, tz_name, 1, 9));
    }
    if lower == "next week" {
        return Ok(next_day_at_hour(now, tz_name, 7, 9));
    }

    if let Some(rest) = lower.strip_prefix("in ") {
        return parse_in_phrase(rest, now);
    }

    if let Some(secs) = parse_suffix_duration(&lower) {
        return Ok(now + secs);
    }

    Err(SeeleError::InvalidTimeExpression(input.to_string()))
}

fn next_day_at_hour(now: i64, tz_name: &str, days: i64, hour: u32) -> i64 {
    let tz: Tz = tz_name.parse().unwrap_or(chrono_tz::Asia::Shanghai);
    let local_now = Utc
        .timestamp_opt(now, 0)
        .single()
        .unwrap_or_else(Utc::now)
        .with_timezone(&tz);
    let target_date = local_now.date_naive() + chrono::Duration::days(days);
    let target_naive = target_date.and_hms_opt(hour, 0, 0).unwrap();
    tz.from_local_datetime(&target_naive)
        .single()
        .map(|dt| dt.timestamp())
        .unwrap_or(now + days * 86_400)
}

fn parse_in_phrase(rest: &str, now: i64) -> Result<i64> {
    let parts: Vec<&str> = rest.split_whitespace().collect();
    if parts.len() != 2 {
        return Err(SeeleError::InvalidTimeExpression(rest.to_string()));
    }
    let count: i64 = parts[0]
        .parse()
        .map_err(|_| SeeleError::InvalidTimeExpression(rest.to_string()))?;
    let unit_secs = match parts[1].trim_end_matches('s') {
        "second" => 1,
        "minute" => 60,
        "hour" => 3600,
        "day" => 86_400,
        "week" => 604_800,
        _ => return Err(SeeleError::InvalidTimeExpression(rest.to_string())),
    };
    Ok(now + count * unit_secs)
}

fn parse_suffix_duration(s: &str) -> Option<i64> {
    if s.len() < 2 {
        return None;
    }
    let (num_part, unit) = s.split_at(s.len() - 1);
    let count: i64 = num_part.parse().ok()?;
    let unit_secs = match unit {
        "s" => 1,
        "m" => 60,
        "h" => 3600,
        "d" => 86_400,
        "w" => 604_800,
        _ => return None,
    };
    Some(count * unit_secs)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_bare_integer() {
        assert_eq!(parse_time_expression("1700000000", "UTC", 0).unwrap(), 1700000000);
    }

    #[test]
    fn parses_suffix_duration() {
        let now = 1_000_000;
        assert_eq!(parse_time_expression("5m", "UTC", now).unwrap(), now + 300);
        assert_eq!(parse_time_expression("2h", "UTC", now).unwrap(), now + 7200);
    }

    #[test]
    fn parses_in_phrase() {
        let now = 1_000_000;
        assert_eq!(
            parse_time_expression("in 5 minutes", "UTC", now).unwrap(),
            now + 300
        );
    }

    #[test]
    fn rejects_garbage() {
        assert!(parse_time_expression("whenever", "UTC", 0).is_err());
    }

    #[test]
    fn timestamp_round_trips_format() {
        let s = timestamp_to_str(1_700_000_000, "UTC");
        assert!(s.starts_with("2023-11-"));
    }
}
