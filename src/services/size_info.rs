// src/services/size_info.rs

//! Size label parsing ("Размер: 5.2 GB от xatab |").

use std::sync::LazyLock;

use regex::Regex;

/// Size placeholder used when the label does not match.
pub const UNKNOWN_SIZE: &str = "N/A";
/// Descriptor placeholder used when the label does not match.
pub const NO_INFO: &str = "NO_INFO";

static SIZE_PATTERN: LazyLock<Option<Regex>> = LazyLock::new(|| {
    Regex::new(
        r"Размер:\s*([\d.,]+\s*(?:GB|MB|ГБ|МБ|Gb|Mb|Гб|Мб|gb|mb|гб|мб|МВ|МB|Mб))\s*(.*?)(?:\s*\|)?\s*$",
    )
    .ok()
});

/// Size token and trailing descriptor of a download label.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SizeInfo {
    pub size: String,
    pub info: String,
}

impl SizeInfo {
    fn unknown() -> Self {
        Self {
            size: UNKNOWN_SIZE.to_string(),
            info: NO_INFO.to_string(),
        }
    }

    pub fn is_unknown_size(&self) -> bool {
        self.size == UNKNOWN_SIZE
    }
}

/// Parse a label; a label without a recognizable size yields the placeholders.
pub fn parse_size_info(label: &str) -> SizeInfo {
    let Some(pattern) = SIZE_PATTERN.as_ref() else {
        return SizeInfo::unknown();
    };

    match pattern.captures(label) {
        Some(caps) => SizeInfo {
            size: caps[1].to_string(),
            info: caps[2].trim().to_string(),
        },
        None => {
            log::debug!("No size found in label '{label}'");
            SizeInfo::unknown()
        }
    }
}
