//! Human-readable byte counts.

const SI_UNITS: [&str; 6] = ["B", "kB", "MB", "GB", "TB", "PB"];
const BINARY_UNITS: [&str; 6] = ["B", "KiB", "MiB", "GiB", "TiB", "PiB"];

/// Format `bytes` with metric (`si`, powers of 1000) or binary units.
///
/// Values below one unit step are printed as whole bytes.
///
/// # Examples
///
/// ```
/// use updraft_client::format_bytes;
///
/// assert_eq!(format_bytes(1000, true, 0), "1 kB");
/// assert_eq!(format_bytes(1000, true, 2), "1.00 kB");
/// assert_eq!(format_bytes(1024, false, 0), "1 KiB");
/// ```
#[must_use]
pub fn format_bytes(bytes: u64, si: bool, decimals: usize) -> String {
    let (threshold, units) = if si {
        (1000_u64, &SI_UNITS)
    } else {
        (1024_u64, &BINARY_UNITS)
    };

    if bytes < threshold {
        return format!("{bytes} {}", units[0]);
    }

    let mut exponent = 0;
    let mut divisor = 1_u64;
    while exponent + 1 < units.len() && bytes / divisor >= threshold {
        divisor *= threshold;
        exponent += 1;
    }

    #[allow(clippy::cast_precision_loss)]
    let value = bytes as f64 / divisor as f64;
    format!("{value:.decimals$} {}", units[exponent])
}
