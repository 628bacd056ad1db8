//! Utility functions for progress formatting

/// Format duration as human-readable string
pub fn format_duration(seconds: u64) -> String {
    if seconds < 60 {
        format!("{seconds}s")
    } else if seconds < 3600 {
        let minutes = seconds / 60;
        let remaining_seconds = seconds % 60;
        if remaining_seconds > 0 {
            format!("{minutes}m {remaining_seconds}s")
        } else {
            format!("{minutes}m")
        }
    } else {
        let hours = seconds / 3600;
        let minutes = (seconds % 3600) / 60;
        if minutes > 0 {
            format!("{hours}h {minutes}m")
        } else {
            format!("{hours}h")
        }
    }
}

/// Format a millisecond count, keeping sub-minute precision
pub fn format_elapsed_ms(millis: u64) -> String {
    if millis < 60_000 {
        format!("{:.2}s", millis as f64 / 1000.0)
    } else {
        format_duration(millis / 1000)
    }
}
