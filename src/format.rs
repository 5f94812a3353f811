use crate::expression::{SECONDS_PER_HOUR, SECONDS_PER_MINUTE};

pub const HOUR_LABEL: &str = "小时";
pub const MINUTE_LABEL: &str = "分钟";
pub const SECOND_LABEL: &str = "秒";

/// Render remaining seconds as e.g. `1小时1分钟1秒`.
///
/// Zero components are left out, but the seconds part is always written when
/// nothing else was, so the result is never empty.
pub fn format_remaining(seconds: u64) -> String {
    let hours = seconds / SECONDS_PER_HOUR;
    let minutes = (seconds % SECONDS_PER_HOUR) / SECONDS_PER_MINUTE;
    let remaining_seconds = seconds % SECONDS_PER_MINUTE;

    let mut out = String::new();
    if hours > 0 {
        out.push_str(&format!("{}{}", hours, HOUR_LABEL));
    }
    if minutes > 0 {
        out.push_str(&format!("{}{}", minutes, MINUTE_LABEL));
    }
    if remaining_seconds > 0 || out.is_empty() {
        out.push_str(&format!("{}{}", remaining_seconds, SECOND_LABEL));
    }
    out
}
