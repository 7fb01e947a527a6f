//! rq-report: Report sink for research-query
//!
//! Persists research results as `.docx` documents, reads them back, and
//! renders results as plain text for the terminal.

pub mod docx;
pub mod error;
pub mod text;

use chrono::{DateTime, TimeZone};

pub use docx::{read_docx_paragraphs, read_docx_report, save_docx, save_new_docx, ReportDocument};
pub use error::{ReportError, Result};
pub use text::format_text;

/// Timestamp format written into documents and notes.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// File name for a report generated at `now`: `report_YYYYmmdd_HHMMSS.docx`.
pub fn report_filename<Tz: TimeZone>(now: &DateTime<Tz>) -> String
where
    Tz::Offset: std::fmt::Display,
{
    numbered_report_filename(now, 1)
}

/// `report_filename` with a `_N` suffix for the N-th report of the same second.
pub fn numbered_report_filename<Tz: TimeZone>(now: &DateTime<Tz>, n: u32) -> String
where
    Tz::Offset: std::fmt::Display,
{
    let stamp = now.format("%Y%m%d_%H%M%S");
    if n <= 1 {
        format!("report_{}.docx", stamp)
    } else {
        format!("report_{}_{}.docx", stamp, n)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn test_report_filename() {
        let now = Utc.with_ymd_and_hms(2024, 3, 9, 7, 5, 1).unwrap();
        assert_eq!(report_filename(&now), "report_20240309_070501.docx");
        assert_eq!(
            numbered_report_filename(&now, 3),
            "report_20240309_070501_3.docx"
        );
    }
}
