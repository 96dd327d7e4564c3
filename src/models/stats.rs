//! Aggregate statistics for one crawl run.

use serde::{Deserialize, Serialize};

/// First line of the stats file, reused as a commit message by CI.
pub const STATS_HEADER: &str = "Update JSON file with latest torrent data";

/// Counters and per-URL lists accumulated while crawling.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct RunStatistics {
    /// Log lines of pages ingested for the first time
    pub added_games: Vec<String>,

    /// Log lines of pages re-ingested after a timestamp change
    pub updated_games: Vec<String>,

    /// Entries written to the catalog (cached and fresh)
    pub download_options: usize,

    pub no_download_options: usize,

    pub invalid_pages: usize,

    /// `"{index}. {url}"` of pages that could not be fetched
    pub error_connecting: Vec<String>,

    /// `"{index}. {url}"` of pages that failed while being processed
    pub error_processing: Vec<String>,
}

impl RunStatistics {
    /// Render the statistics as display lines, one section per field.
    pub fn render(&self) -> Vec<String> {
        let mut lines = Vec::new();
        push_list(&mut lines, "Added Games", &self.added_games);
        push_list(&mut lines, "Updated Games", &self.updated_games);
        lines.push(format!("Download Options: {}", self.download_options));
        lines.push(format!("No Download Options: {}", self.no_download_options));
        lines.push(format!("Invalid Pages: {}", self.invalid_pages));
        push_list(&mut lines, "Error Connecting", &self.error_connecting);
        push_list(&mut lines, "Error Processing", &self.error_processing);
        lines
    }

    /// Contents of the stats file: header line followed by the rendered stats.
    pub fn to_report(&self) -> String {
        let mut report = String::from(STATS_HEADER);
        report.push('\n');
        for line in self.render() {
            report.push_str(&line);
            report.push('\n');
        }
        report
    }

    /// Pages that hit any error.
    pub fn error_count(&self) -> usize {
        self.error_connecting.len() + self.error_processing.len()
    }
}

fn push_list(lines: &mut Vec<String>, name: &str, items: &[String]) {
    lines.push(format!("{name}: {}", items.len()));
    lines.extend(items.iter().map(|item| format!(" - {item}")));
}
