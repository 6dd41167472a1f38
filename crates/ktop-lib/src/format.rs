//! Human-readable formatting of resource values

use std::time::Duration;

const KI: i64 = 1024;
const MI: i64 = KI * 1024;
const GI: i64 = MI * 1024;

/// Millicores as cores (`1.5`) from one core up, else as `250m`
pub fn format_cpu(millicores: i64) -> String {
    if millicores >= 1000 {
        format!("{:.1}", millicores as f64 / 1000.0)
    } else {
        format!("{millicores}m")
    }
}

/// Bytes with a binary suffix
pub fn format_memory(bytes: i64) -> String {
    match bytes {
        b if b >= GI => format!("{:.1}Gi", b as f64 / GI as f64),
        b if b >= MI => format!("{:.0}Mi", b as f64 / MI as f64),
        b if b >= KI => format!("{:.0}Ki", b as f64 / KI as f64),
        b => format!("{b}B"),
    }
}

pub fn format_percent(percent: f64) -> String {
    format!("{percent:.1}%")
}

/// Coarse age: `<1s`, `42s`, `3m`, `2h`
pub fn format_age(age: Duration) -> String {
    let secs = age.as_secs();
    match secs {
        0 => "<1s".to_string(),
        1..=59 => format!("{secs}s"),
        60..=3599 => format!("{}m", secs / 60),
        _ => format!("{}h", secs / 3600),
    }
}

/// Shorten to `max` characters, ending in `...` when there is room for it
pub fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    if max <= 3 {
        return s.chars().take(max).collect();
    }
    let mut out: String = s.chars().take(max - 3).collect();
    out.push_str("...");
    out
}
