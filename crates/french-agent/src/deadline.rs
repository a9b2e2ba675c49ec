//! Deadline resolution and natural-language formatting.
//!
//! Task deadlines are stored as the coarse phrases the extractor produced
//! ("Today", "tonight", "2025-08-01", "3:30 PM"). This module is the single
//! place they are resolved against a clock: once for display wording and
//! once for the reminder/overdue scans.

use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveTime, Timelike, Utc, Weekday};
use regex::Regex;
use std::sync::OnceLock;

/// Named time-of-day anchors.
const MORNING: (u32, u32) = (9, 0);
const AFTERNOON: (u32, u32) = (14, 0);
const EVENING: (u32, u32) = (21, 0);
const NOON: (u32, u32) = (12, 0);

fn twelve_hour_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^(\d{1,2})(?::(\d{2}))?\s*([AaPp])\.?\s*[Mm]\.?$").unwrap())
}

/// Resolve a date phrase to a calendar date. Weekday names resolve to the
/// next occurrence at or after today (same-day allowed). Returns `None` for
/// unrecognized phrases, which callers pass through unchanged.
fn resolve_date(phrase: &str, now: DateTime<Utc>) -> Option<NaiveDate> {
    let today = now.date_naive();
    match phrase.to_lowercase().as_str() {
        "today" => Some(today),
        "tomorrow" => Some(today + Duration::days(1)),
        name => {
            if let Some(target) = weekday_from_name(name) {
                let days_until = (target.num_days_from_monday() as i64
                    - today.weekday().num_days_from_monday() as i64)
                    .rem_euclid(7);
                return Some(today + Duration::days(days_until));
            }
            NaiveDate::parse_from_str(phrase, "%Y-%m-%d").ok()
        }
    }
}

fn weekday_from_name(name: &str) -> Option<Weekday> {
    match name {
        "monday" => Some(Weekday::Mon),
        "tuesday" => Some(Weekday::Tue),
        "wednesday" => Some(Weekday::Wed),
        "thursday" => Some(Weekday::Thu),
        "friday" => Some(Weekday::Fri),
        "saturday" => Some(Weekday::Sat),
        "sunday" => Some(Weekday::Sun),
        _ => None,
    }
}

/// Resolve a time phrase. The second element is true when the time rolls
/// forward a day (midnight of "Today" means the start of tomorrow).
fn resolve_time(phrase: &str, date_phrase_is_today: bool) -> Option<(NaiveTime, bool)> {
    let at = |(h, m): (u32, u32)| NaiveTime::from_hms_opt(h, m, 0);

    match phrase.to_lowercase().as_str() {
        "morning" => at(MORNING).map(|t| (t, false)),
        "afternoon" => at(AFTERNOON).map(|t| (t, false)),
        "evening" | "tonight" => at(EVENING).map(|t| (t, false)),
        "noon" => at(NOON).map(|t| (t, false)),
        "midnight" => at((0, 0)).map(|t| (t, date_phrase_is_today)),
        _ => {
            if let Ok(t) = NaiveTime::parse_from_str(phrase, "%H:%M") {
                return Some((t, false));
            }
            let caps = twelve_hour_re().captures(phrase.trim())?;
            let hour: u32 = caps[1].parse().ok()?;
            if !(1..=12).contains(&hour) {
                return None;
            }
            let minute: u32 = caps
                .get(2)
                .map(|m| m.as_str().parse().ok())
                .unwrap_or(Some(0))?;
            let pm = caps[3].eq_ignore_ascii_case("p");
            let hour24 = match (hour, pm) {
                (12, false) => 0,
                (12, true) => 12,
                (h, false) => h,
                (h, true) => h + 12,
            };
            NaiveTime::from_hms_opt(hour24, minute, 0).map(|t| (t, false))
        }
    }
}

/// Resolve a (date-phrase, time-phrase) pair to a concrete instant.
///
/// Returns `None` when the date phrase is unrecognized. An unparseable time
/// phrase leaves the date-only anchor (start of day).
pub fn resolve_due(due_date: &str, due_time: &str, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
    let date = resolve_date(due_date, now)?;
    let is_today_phrase = due_date.eq_ignore_ascii_case("today");

    let (time, roll_forward) = resolve_time(due_time, is_today_phrase)
        .unwrap_or((NaiveTime::from_hms_opt(0, 0, 0).unwrap(), false));

    let date = if roll_forward { date + Duration::days(1) } else { date };
    Some(date.and_time(time).and_utc())
}

/// Format a deadline as natural language relative to `now`.
///
/// "Today" / "Tomorrow" / "this Friday" / "next Friday" / literal ISO date,
/// with the time appended as "at h:mm AM/PM" when it resolved. Unrecognized
/// date phrases pass through unchanged (best effort).
pub fn format_deadline(due_date: &str, due_time: &str, now: DateTime<Utc>) -> String {
    let time_absent =
        due_time.eq_ignore_ascii_case("unknown") || due_time.eq_ignore_ascii_case("none");

    let Some(date) = resolve_date(due_date, now) else {
        // Pass-through fallback for phrases like "Next weekend".
        if time_absent {
            return due_date.trim().to_string();
        }
        return format!("{} {}", due_date.trim(), due_time.trim());
    };

    let is_today_phrase = due_date.eq_ignore_ascii_case("today");
    let resolved_time = if time_absent {
        None
    } else {
        resolve_time(due_time, is_today_phrase)
    };

    let (time, roll_forward) =
        resolved_time.unwrap_or((NaiveTime::from_hms_opt(0, 0, 0).unwrap(), false));
    let date = if roll_forward { date + Duration::days(1) } else { date };
    let resolved = date.and_time(time).and_utc();

    let days_diff = (date - now.date_naive()).num_days();
    let date_part = match days_diff {
        0 => "Today".to_string(),
        1 => "Tomorrow".to_string(),
        2..=7 => {
            // A deadline exactly one week out lands on today's weekday; call
            // it "next X" once today's instance of that time has passed.
            // A time equal to now counts as not yet past.
            if resolved.weekday() == now.weekday() && resolved.time() < now.time() {
                format!("next {}", weekday_name(resolved.weekday()))
            } else {
                format!("this {}", weekday_name(resolved.weekday()))
            }
        }
        8..=14 => format!("next {}", weekday_name(resolved.weekday())),
        _ => date.format("%Y-%m-%d").to_string(),
    };

    match resolved_time {
        Some((t, _)) => format!("{} at {}", date_part, format_time_12h(t)),
        None => date_part,
    }
}

fn weekday_name(weekday: Weekday) -> &'static str {
    match weekday {
        Weekday::Mon => "Monday",
        Weekday::Tue => "Tuesday",
        Weekday::Wed => "Wednesday",
        Weekday::Thu => "Thursday",
        Weekday::Fri => "Friday",
        Weekday::Sat => "Saturday",
        Weekday::Sun => "Sunday",
    }
}

fn format_time_12h(time: NaiveTime) -> String {
    let (pm, hour) = time.hour12();
    format!(
        "{}:{:02} {}",
        hour,
        time.minute(),
        if pm { "PM" } else { "AM" }
    )
}
