//! Utility functions and helpers.

pub mod http;

use chrono::NaiveDateTime;
use url::Url;

use crate::error::{AppError, Result};

/// Timestamp format printed by the source site ("01.01.2024, 10:00").
pub const SITE_DATE_FORMAT: &str = "%d.%m.%Y, %H:%M";

/// Output format of every catalog date.
pub const ISO_DATE_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

/// Resolve a potentially relative URL against a base URL.
pub fn resolve_url(base: &Url, href: &str) -> String {
    base.join(href)
        .map(|u| u.to_string())
        .unwrap_or_else(|_| href.to_string())
}

/// Resolve a URL string against a base URL string.
pub fn resolve(base_url: &str, href: &str) -> String {
    match Url::parse(base_url) {
        Ok(base) => resolve_url(&base, href),
        Err(_) => href.to_string(),
    }
}

/// Convert a site timestamp to `YYYY-MM-DDTHH:MM:SSZ`.
pub fn date_to_iso(date: &str) -> Result<String> {
    let parsed = NaiveDateTime::parse_from_str(date.trim(), SITE_DATE_FORMAT).map_err(|e| {
        AppError::validation(format!("Unrecognized page date '{date}': {e}"))
    })?;
    Ok(parsed.format(ISO_DATE_FORMAT).to_string())
}

/// Render a byte count as `x.xx GB`, `x.xx MB` or `N bytes`.
pub fn format_size(bytes: i64) -> String {
    const GIB: i64 = 1 << 30;
    const MIB: i64 = 1 << 20;

    if bytes >= GIB {
        format!("{:.2} GB", bytes as f64 / GIB as f64)
    } else if bytes >= MIB {
        format!("{:.2} MB", bytes as f64 / MIB as f64)
    } else {
        format!("{bytes} bytes")
    }
}
