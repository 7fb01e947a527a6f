use rq_core::ResearchResult;

/// Plain-text rendering of a research result for terminal output.
pub fn format_text(result: &ResearchResult) -> String {
    match result {
        ResearchResult::Structured(response) => format!(
            "Topic: {}\nReport: {}\nSources:\n{}\nTools Used:\n{}\n",
            response.topic,
            response.report,
            bullets(&response.sources),
            bullets(&response.tools_used),
        ),
        ResearchResult::Unstructured(text) => text.clone(),
    }
}

fn bullets(items: &[String]) -> String {
    let mut out = String::from("- ");
    out.push_str(&items.join("\n- "));
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use rq_core::ResearchResponse;

    #[test]
    fn test_format_structured() {
        let result = ResearchResult::Structured(ResearchResponse {
            topic: "Rust".into(),
            report: "A language.".into(),
            sources: vec!["Wikipedia: Rust".into(), "The Rust Book".into()],
            tools_used: vec!["wikipedia".into()],
        });

        assert_eq!(
            format_text(&result),
            "Topic: Rust\nReport: A language.\nSources:\n- Wikipedia: Rust\n- The Rust Book\nTools Used:\n- wikipedia\n"
        );
    }

    #[test]
    fn test_format_unstructured() {
        let result = ResearchResult::Unstructured("raw answer".into());
        assert_eq!(format_text(&result), "raw answer");
    }
}
