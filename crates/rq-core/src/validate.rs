//! Structural quality gate for research reports.

use std::collections::HashSet;

use crate::report::{ResearchResponse, ResearchResult};

/// Tool name a report must list in `tools_used`.
pub const ENCYCLOPEDIA_TOOL: &str = "wikipedia";

/// Minimum whitespace-delimited words in a report.
pub const MIN_WORDS: usize = 500;

/// Minimum distinct (trimmed, case-folded, non-empty) sources.
pub const MIN_DISTINCT_SOURCES: usize = 3;

/// Correction sent back to the agent when a structured report fails.
pub const QUALITY_CORRECTION: &str = "Please use the wikipedia tool at least once and include a \
Wikipedia source in the sources list. Rewrite the report as a cohesive narrative without raw \
snippets, ellipses, or URLs in the report. Expand the report to at least 500 words with section \
headings and multiple paragraphs, and include at least three distinct sources.";

/// Correction sent back when the agent answered with free text.
pub const STRUCTURED_CORRECTION: &str = "Respond with a single JSON object with the fields \
\"topic\", \"report\", \"sources\" and \"tools_used\", and nothing else.";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationVerdict {
    pub passed: bool,
    /// Instruction for the next attempt; empty when passed.
    pub correction: String,
}

impl ValidationVerdict {
    fn pass() -> Self {
        Self {
            passed: true,
            correction: String::new(),
        }
    }

    fn fail(correction: impl Into<String>) -> Self {
        Self {
            passed: false,
            correction: correction.into(),
        }
    }
}

/// The four facts a verdict is derived from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReportChecks {
    pub uses_encyclopedia: bool,
    pub word_count: usize,
    pub distinct_source_count: usize,
    pub looks_like_raw_snippet: bool,
}

impl ReportChecks {
    pub fn of(response: &ResearchResponse) -> Self {
        let uses_encyclopedia = response
            .tools_used
            .iter()
            .any(|tool| tool.trim().eq_ignore_ascii_case(ENCYCLOPEDIA_TOOL));

        let distinct_source_count = response
            .sources
            .iter()
            .map(|source| source.trim().to_lowercase())
            .filter(|source| !source.is_empty())
            .collect::<HashSet<_>>()
            .len();

        // Plain substring search: "http" also matches inside ordinary words.
        let looks_like_raw_snippet =
            response.report.contains("...") || response.report.contains("http");

        Self {
            uses_encyclopedia,
            word_count: response.report.split_whitespace().count(),
            distinct_source_count,
            looks_like_raw_snippet,
        }
    }

    pub fn passed(&self) -> bool {
        self.uses_encyclopedia
            && !self.looks_like_raw_snippet
            && self.word_count >= MIN_WORDS
            && self.distinct_source_count >= MIN_DISTINCT_SOURCES
    }
}

/// Decide whether `result` meets the report quality bar.
pub fn validate(result: &ResearchResult) -> ValidationVerdict {
    match result {
        ResearchResult::Structured(response) => {
            if ReportChecks::of(response).passed() {
                ValidationVerdict::pass()
            } else {
                ValidationVerdict::fail(QUALITY_CORRECTION)
            }
        }
        ResearchResult::Unstructured(_) => {
            ValidationVerdict::fail(format!("{} {}", STRUCTURED_CORRECTION, QUALITY_CORRECTION))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn words(n: usize) -> String {
        vec!["word"; n].join(" ")
    }

    fn passing() -> ResearchResponse {
        ResearchResponse {
            topic: "Rust".to_string(),
            report: words(MIN_WORDS),
            sources: vec![
                "Wikipedia: Rust (programming language)".to_string(),
                "The Rust Book".to_string(),
                "Rustonomicon".to_string(),
            ],
            tools_used: vec!["Wikipedia".to_string(), "web_search".to_string()],
        }
    }

    fn check(response: ResearchResponse) -> ValidationVerdict {
        validate(&ResearchResult::Structured(response))
    }

    #[test]
    fn test_passing_report() {
        let verdict = check(passing());
        assert!(verdict.passed);
        assert!(verdict.correction.is_empty());
    }

    #[test]
    fn test_encyclopedia_match_is_trimmed_and_case_insensitive() {
        let mut response = passing();
        response.tools_used = vec!["  WIKIPEDIA ".to_string()];
        assert!(check(response).passed);
    }

    #[test]
    fn test_missing_encyclopedia_fails() {
        let mut response = passing();
        response.tools_used = vec!["web_search".to_string(), "wikipedia_search".to_string()];
        let verdict = check(response);
        assert!(!verdict.passed);
        assert_eq!(verdict.correction, QUALITY_CORRECTION);
    }

    #[test]
    fn test_short_report_fails() {
        let mut response = passing();
        response.report = words(MIN_WORDS - 1);
        assert!(!check(response).passed);
    }

    #[test]
    fn test_too_few_sources_fails() {
        let mut response = passing();
        response.sources.pop();
        assert!(!check(response).passed);
    }

    #[test]
    fn test_ellipsis_fails() {
        let mut response = passing();
        response.report.push_str(" and so on...");
        assert!(!check(response).passed);
    }

    #[test]
    fn test_url_in_report_fails_regardless_of_length() {
        let mut response = passing();
        response.report = format!("{} See https://example.com", words(2 * MIN_WORDS));
        let checks = ReportChecks::of(&response);
        assert!(checks.looks_like_raw_snippet);
        assert!(!check(response).passed);
    }

    #[test]
    fn test_http_substring_false_positive() {
        let mut response = passing();
        response.report.push_str(" httpd");
        assert!(ReportChecks::of(&response).looks_like_raw_snippet);
    }

    #[test]
    fn test_http_match_is_case_sensitive() {
        let mut response = passing();
        response.report.push_str(" HTTP");
        assert!(!ReportChecks::of(&response).looks_like_raw_snippet);
        assert!(check(response).passed);
    }

    #[test]
    fn test_sources_dedup() {
        let mut response = passing();
        response.sources = vec![
            "Wikipedia: Topic".to_string(),
            "wikipedia: topic ".to_string(),
            "Journal X".to_string(),
        ];
        assert_eq!(ReportChecks::of(&response).distinct_source_count, 2);
        assert!(!check(response).passed);
    }

    #[test]
    fn test_empty_sources_ignored() {
        let mut response = passing();
        response.sources = vec![
            "A".to_string(),
            "B".to_string(),
            "   ".to_string(),
            String::new(),
        ];
        assert_eq!(ReportChecks::of(&response).distinct_source_count, 2);
    }

    #[test]
    fn test_word_count_uses_any_whitespace() {
        let mut response = passing();
        response.report = "one\ttwo\nthree   four".to_string();
        assert_eq!(ReportChecks::of(&response).word_count, 4);
    }

    #[test]
    fn test_unstructured_always_fails() {
        let verdict = validate(&ResearchResult::Unstructured(words(1000)));
        assert!(!verdict.passed);
        assert!(verdict.correction.starts_with(STRUCTURED_CORRECTION));
    }
}
