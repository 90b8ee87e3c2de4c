use chrono::{DateTime, TimeZone};

pub const LABEL_MAX_CHARS: usize = 20;
const LABEL_KEEP_CHARS: usize = 17;
const ELLIPSIS: &str = "...";

/// Shown instead of a completion rate when there are no tasks.
pub const NO_TASKS_PLACEHOLDER: &str = "No tasks yet";
pub const NOT_AVAILABLE: &str = "N/A";

/// Shortens chart axis labels; full task views keep the whole title.
pub fn truncate_label(label: &str) -> String {
    if label.chars().count() > LABEL_MAX_CHARS {
        let head: String = label.chars().take(LABEL_KEEP_CHARS).collect();
        format!("{head}{ELLIPSIS}")
    } else {
        label.to_string()
    }
}

/// Distance between `then` and `now` in words, e.g. "3 days ago" or "in about 2 hours".
pub fn relative_time<Tz: TimeZone, Tz2: TimeZone>(then: &DateTime<Tz>, now: &DateTime<Tz2>) -> String {
    let seconds = now.timestamp() - then.timestamp();
    let words = distance_in_words(seconds.unsigned_abs());
    if seconds >= 0 {
        format!("{words} ago")
    } else {
        format!("in {words}")
    }
}

fn distance_in_words(seconds: u64) -> String {
    const MINUTES_IN_DAY: u64 = 1_440;
    const MINUTES_IN_MONTH: u64 = 43_200;
    const MINUTES_IN_TWO_MONTHS: u64 = 86_400;

    let minutes = (seconds + 30) / 60;

    if seconds < 30 {
        return "less than a minute".to_string();
    }
    if minutes < 2 {
        return "1 minute".to_string();
    }
    if minutes < 45 {
        return format!("{minutes} minutes");
    }
    if minutes < 90 {
        return "about 1 hour".to_string();
    }
    if minutes < MINUTES_IN_DAY {
        let hours = (minutes + 30) / 60;
        return format!("about {hours} hours");
    }
    if minutes < 2_520 {
        return "1 day".to_string();
    }
    if minutes < MINUTES_IN_MONTH {
        let days = (minutes + MINUTES_IN_DAY / 2) / MINUTES_IN_DAY;
        return format!("{days} days");
    }
    if minutes < MINUTES_IN_TWO_MONTHS {
        let months = (minutes + MINUTES_IN_MONTH / 2) / MINUTES_IN_MONTH;
        return plural("about", months, "month");
    }

    let months = minutes / MINUTES_IN_MONTH;
    if months < 12 {
        return format!("{months} months");
    }

    let years = months / 12;
    match months % 12 {
        0..=2 => plural("about", years, "year"),
        3..=8 => plural("over", years, "year"),
        _ => plural("almost", years + 1, "year"),
    }
}

fn plural(prefix: &str, count: u64, unit: &str) -> String {
    if count == 1 {
        format!("{prefix} 1 {unit}")
    } else {
        format!("{prefix} {count} {unit}s")
    }
}

/// Due-date text such as "Jan 5, 2025 at 3:00 PM".
pub fn format_due<Tz: TimeZone>(due: &DateTime<Tz>) -> String
where
    Tz::Offset: std::fmt::Display,
{
    due.format("%b %-d, %Y at %-I:%M %p").to_string()
}

/// Minutes as hours with one decimal, e.g. 90 -> "1.5".
pub fn minutes_to_hours(minutes: u64) -> String {
    format!("{:.1}", minutes as f64 / 60.0)
}

/// Whole-number completion percentage, or `None` when there is nothing to divide by.
pub fn completion_rate(completed: usize, total: usize) -> Option<u32> {
    if total == 0 {
        return None;
    }
    Some(((completed as f64 / total as f64) * 100.0).round() as u32)
}

pub fn format_completion_rate(completed: usize, total: usize) -> String {
    match completion_rate(completed, total) {
        Some(rate) => format!("{rate}%"),
        None => NO_TASKS_PLACEHOLDER.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone, Utc};

    use super::*;

    #[test]
    fn truncates_long_labels_to_twenty_chars() {
        let title = "abcdefghijklmnopqrstuvwxy";
        assert_eq!(title.chars().count(), 25);
        let label = truncate_label(title);
        assert_eq!(label, "abcdefghijklmnopq...");
        assert_eq!(label.chars().count(), 20);
    }

    #[test]
    fn keeps_short_labels() {
        assert_eq!(truncate_label("fifteen chars!!"), "fifteen chars!!");
        assert_eq!(truncate_label("exactly twenty chars"), "exactly twenty chars");
    }

    #[test]
    fn truncation_counts_characters_not_bytes() {
        let title = "ñññññññññññññññññññññ";
        assert_eq!(truncate_label(title), format!("{}...", "ñ".repeat(17)));
    }

    #[test]
    fn relative_time_in_words() {
        let now = Utc.with_ymd_and_hms(2026, 5, 10, 12, 0, 0).unwrap();
        assert_eq!(relative_time(&(now - Duration::seconds(10)), &now), "less than a minute ago");
        assert_eq!(relative_time(&(now - Duration::minutes(5)), &now), "5 minutes ago");
        assert_eq!(relative_time(&(now - Duration::hours(3)), &now), "about 3 hours ago");
        assert_eq!(relative_time(&(now - Duration::days(1)), &now), "1 day ago");
        assert_eq!(relative_time(&(now - Duration::days(3)), &now), "3 days ago");
        assert_eq!(relative_time(&(now - Duration::days(40)), &now), "about 1 month ago");
        assert_eq!(relative_time(&(now - Duration::days(400)), &now), "about 1 year ago");
        assert_eq!(relative_time(&(now + Duration::hours(2)), &now), "in about 2 hours");
    }

    #[test]
    fn due_dates_use_fixed_pattern() {
        let due = Utc.with_ymd_and_hms(2025, 1, 5, 15, 0, 0).unwrap();
        assert_eq!(format_due(&due), "Jan 5, 2025 at 3:00 PM");

        let morning = chrono_tz::UTC.with_ymd_and_hms(2025, 11, 20, 9, 5, 0).unwrap();
        assert_eq!(format_due(&morning), "Nov 20, 2025 at 9:05 AM");
    }

    #[test]
    fn converts_minutes_to_hours() {
        assert_eq!(minutes_to_hours(0), "0.0");
        assert_eq!(minutes_to_hours(90), "1.5");
        assert_eq!(minutes_to_hours(100), "1.7");
    }

    #[test]
    fn completion_rate_guards_zero_total() {
        assert_eq!(completion_rate(0, 0), None);
        assert_eq!(format_completion_rate(0, 0), NO_TASKS_PLACEHOLDER);
        assert_eq!(format_completion_rate(1, 3), "33%");
        assert_eq!(format_completion_rate(2, 3), "67%");
        assert_eq!(format_completion_rate(4, 4), "100%");
    }
}
