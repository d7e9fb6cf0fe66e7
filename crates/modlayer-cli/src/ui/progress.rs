//! Download progress formatting.

/// Human-readable byte count.
pub fn format_size(bytes: u64) -> String {
    let kb = bytes as f64 / 1024.0;
    let mb = kb / 1024.0;
    if mb >= 1024.0 {
        format!("{:.1} GB", mb / 1024.0)
    } else if kb >= 1024.0 {
        format!("{mb:.1} MB")
    } else if kb >= 1.0 {
        format!("{kb:.1} KB")
    } else {
        format!("{bytes} B")
    }
}

/// A fixed-width bar using ▓ (filled) and ░ (empty).
pub fn format_progress_bar(current: u64, total: u64, width: usize) -> String {
    let filled = if total > 0 {
        ((current as f64 / total as f64) * width as f64).round() as usize
    } else {
        0
    };
    let filled = filled.min(width);
    format!("{}{}", "▓".repeat(filled), "░".repeat(width - filled))
}

/// Bar, percentage and size. An unknown total shows the bytes received.
pub fn format_download_progress(current: u64, total: u64) -> String {
    if total == 0 {
        return format!("{}  {}", "░".repeat(24), format_size(current));
    }
    let pct = (current.saturating_mul(100) / total).min(100);
    let bar = format_progress_bar(current, total, 24);
    format!("{bar}  {pct:>3}%  {}", format_size(total))
}
