/// "3m 20s" for minute-scale durations, bare seconds below one minute.
pub fn format_secs(seconds: u64) -> String {
    let mins = seconds / 60;
    let secs = seconds % 60;
    if mins > 0 {
        format!("{mins}m {secs}s")
    } else {
        format!("{secs}s")
    }
}

/// "MM:SS" for the countdown display.
pub fn format_clock(seconds: u64) -> String {
    format!("{:02}:{:02}", seconds / 60, seconds % 60)
}

pub fn percentage(ratio: f64) -> f64 {
    (ratio * 1000.0).round() / 10.0
}
