use once_cell::sync::Lazy;
use regex::Regex;

/// Maximum length of a summary derived from the first paragraph.
const SUMMARY_TRUNCATE_CHARS: usize = 200;

/// Summary used when nothing can be extracted from the final answer.
const DEFAULT_SUMMARY: &str = "Task completed";

/// Structured signal extracted from a task's final free-text answer.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtractedFindings {
    /// Discoveries listed under a discovery-flavored heading.
    pub discoveries: Vec<String>,
    /// Decisions listed under a decision-flavored heading.
    pub decisions: Vec<String>,
    /// Items to forward to dependent tasks.
    pub pass_to_next: Vec<String>,
    /// One-line summary of the task.
    pub summary: String,
}

/// Strategy for extracting structured findings from model prose.
///
/// Extraction is inherently heuristic; keeping it behind a trait lets
/// it be swapped or hardened without touching the executor's control
/// flow.
pub trait FindingsExtractor: Send + Sync {
    /// Extracts findings from the final answer text.
    fn extract(&self, text: &str) -> ExtractedFindings;
}

/// Section a heading switches the scanner into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
    Discoveries,
    Decisions,
    PassToNext,
    Summary,
    None,
}

/// Markdown-style headings: `## Title`, `**Title**`, or `Title:`.
static HEADING: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\s*(?:#{1,6}\s+(.+?)\s*|\*\*(.+?)\*\*\s*:?\s*|([A-Za-z][A-Za-z /-]{0,40}):\s*)$")
        .unwrap_or_else(|error| {
            panic!("invalid heading pattern: {error}");
        })
});

/// Bullet lines: `-`, `*`, or a bullet glyph.
static BULLET: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\s*[-*\u{2022}]\s+(.+)$").unwrap_or_else(|error| {
        panic!("invalid bullet pattern: {error}");
    })
});

/// Default heading/bullet extraction strategy.
///
/// Headings switch the active section; bullet lines inside a section
/// are collected as entries; any unrecognized heading resets to no
/// active section. Summary sections also accept plain prose lines.
#[derive(Default)]
pub struct HeadingExtractor;

impl FindingsExtractor for HeadingExtractor {
    fn extract(&self, text: &str) -> ExtractedFindings {
        let mut findings = ExtractedFindings::default();
        let mut section = Section::None;
        let mut summary_lines: Vec<String> = Vec::new();

        for line in text.lines() {
            if let Some(heading) = heading_text(line) {
                section = classify_heading(&heading);
                continue;
            }

            if let Some(capture) = BULLET.captures(line) {
                let Some(entry) = capture.get(1) else {
                    continue;
                };
                let entry = entry.as_str().trim().to_owned();
                match section {
                    Section::Discoveries => findings.discoveries.push(entry),
                    Section::Decisions => findings.decisions.push(entry),
                    Section::PassToNext => findings.pass_to_next.push(entry),
                    Section::Summary => summary_lines.push(entry),
                    Section::None => {}
                }
                continue;
            }

            if section == Section::Summary && !line.trim().is_empty() {
                summary_lines.push(line.trim().to_owned());
            }
        }

        findings.summary = if summary_lines.is_empty() {
            first_paragraph_summary(text)
        } else {
            summary_lines.join(" ")
        };
        findings
    }
}

/// Returns the heading text when the line is heading-shaped.
fn heading_text(line: &str) -> Option<String> {
    let capture = HEADING.captures(line)?;
    capture
        .get(1)
        .or_else(|| capture.get(2))
        .or_else(|| capture.get(3))
        .map(|inner| inner.as_str().trim().to_owned())
}

fn classify_heading(heading: &str) -> Section {
    let lowered = heading.to_lowercase();
    if lowered.contains("discover") || lowered.contains("finding") || lowered.contains("learned") {
        Section::Discoveries
    } else if lowered.contains("decision")
        || lowered.contains("chose")
        || lowered.contains("decided")
    {
        Section::Decisions
    } else if lowered.contains("pass")
        || lowered.contains("next")
        || lowered.contains("subsequent")
        || lowered.contains("future")
    {
        Section::PassToNext
    } else if lowered.contains("summary")
        || lowered.contains("accomplished")
        || lowered.contains("completed")
    {
        Section::Summary
    } else {
        Section::None
    }
}

/// First paragraph of the text, truncated, as a summary of last resort.
fn first_paragraph_summary(text: &str) -> String {
    let paragraph = text
        .split("\n\n")
        .map(str::trim)
        .find(|candidate| !candidate.is_empty())
        .unwrap_or("");

    if paragraph.is_empty() {
        return DEFAULT_SUMMARY.to_owned();
    }

    let flattened = paragraph.split_whitespace().collect::<Vec<_>>().join(" ");
    if flattened.chars().count() > SUMMARY_TRUNCATE_CHARS {
        flattened.chars().take(SUMMARY_TRUNCATE_CHARS).collect()
    } else {
        flattened
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sectioned_answer() {
        let text = "\
## Summary
Renamed the module and updated call sites.

## Discoveries
- the parser re-exports its AST
- two call sites were stale

## Decisions
- kept the old name as a deprecated alias

## Pass to next
- update the docs to match
";
        let findings = HeadingExtractor.extract(text);
        assert_eq!(
            findings.summary,
            "Renamed the module and updated call sites."
        );
        assert_eq!(findings.discoveries.len(), 2);
        assert_eq!(
            findings.decisions,
            vec!["kept the old name as a deprecated alias"]
        );
        assert_eq!(findings.pass_to_next, vec!["update the docs to match"]);
    }

    #[test]
    fn test_unrecognized_heading_resets_section() {
        let text = "\
## Discoveries
- real discovery

## Appendix
- not a discovery
";
        let findings = HeadingExtractor.extract(text);
        assert_eq!(findings.discoveries, vec!["real discovery"]);
        assert!(findings.decisions.is_empty());
        assert!(findings.pass_to_next.is_empty());
    }

    #[test]
    fn test_bold_and_colon_headings() {
        let text = "\
**What I learned**
- bold headings work

Decided:
- colon headings work
";
        let findings = HeadingExtractor.extract(text);
        assert_eq!(findings.discoveries, vec!["bold headings work"]);
        assert_eq!(findings.decisions, vec!["colon headings work"]);
    }

    #[test]
    fn test_summary_falls_back_to_first_paragraph() {
        let text = "The fix turned out to be a one-liner in the lexer.\n\nMore detail here.";
        let findings = HeadingExtractor.extract(text);
        assert_eq!(
            findings.summary,
            "The fix turned out to be a one-liner in the lexer."
        );
    }

    #[test]
    fn test_summary_fallback_truncates_long_paragraphs() {
        let long_paragraph = "word ".repeat(100);
        let findings = HeadingExtractor.extract(&long_paragraph);
        assert_eq!(findings.summary.chars().count(), 200);
    }

    #[test]
    fn test_empty_answer_defaults() {
        let findings = HeadingExtractor.extract("");
        assert_eq!(findings.summary, "Task completed");
        assert!(findings.discoveries.is_empty());
    }

    #[test]
    fn test_bullets_without_section_are_ignored() {
        let text = "- stray bullet\n- another stray";
        let findings = HeadingExtractor.extract(text);
        assert!(findings.discoveries.is_empty());
        assert!(findings.decisions.is_empty());
        // The stray bullets still inform the fallback summary.
        assert_eq!(findings.summary, "- stray bullet - another stray");
    }
}
