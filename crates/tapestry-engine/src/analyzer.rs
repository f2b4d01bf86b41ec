use std::fmt;

use once_cell::sync::Lazy;
use regex::Regex;

/// Classification of a user request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskType {
    /// The user is asking a question.
    Question,
    /// The user wants new code or features.
    Implementation,
    /// The user wants something fixed.
    Debugging,
    /// The user wants existing code restructured.
    Refactoring,
    /// The user wants information gathered.
    Research,
    /// Anything else.
    Other,
}

impl fmt::Display for TaskType {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Question => "question",
            Self::Implementation => "implementation",
            Self::Debugging => "debugging",
            Self::Refactoring => "refactoring",
            Self::Research => "research",
            Self::Other => "other",
        };
        write!(formatter, "{label}")
    }
}

/// Result of analyzing a free-text request.
#[derive(Debug, Clone)]
pub struct QueryAnalysis {
    /// Classified task type.
    pub task_type: TaskType,
    /// Literal context hints (paths, identifiers) in first-appearance
    /// order, duplicates suppressed.
    pub required_context: Vec<String>,
}

/// Paths with a directory separator, e.g. `src/lib.rs`.
static SLASH_PATH: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"[A-Za-z0-9_.-]+(?:/[A-Za-z0-9_.-]+)+").unwrap_or_else(|error| {
        panic!("invalid slash-path pattern: {error}");
    })
});

/// Bare file names with a recognizable extension.
static FILE_NAME: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b[A-Za-z0-9_-]+\.(?:rs|toml|md|json|yaml|yml|txt|py|js|ts|sh|lock|cfg)\b")
        .unwrap_or_else(|error| {
            panic!("invalid file-name pattern: {error}");
        })
});

/// Backtick-quoted tokens, the way users paste paths and symbols.
static BACKTICKED: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"`([^`\n]+)`").unwrap_or_else(|error| {
        panic!("invalid backtick pattern: {error}");
    })
});

/// Identifier-shaped tokens: `snake_case` names and `path::segments`.
static IDENTIFIER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b[A-Za-z][A-Za-z0-9]*(?:(?:::|_)[A-Za-z0-9]+)+\b").unwrap_or_else(|error| {
        panic!("invalid identifier pattern: {error}");
    })
});

const QUESTION_KEYWORDS: [&str; 8] = [
    "how ", "what ", "why ", "when ", "where ", "which ", "explain", "?",
];
const DEBUGGING_KEYWORDS: [&str; 8] = [
    "fix", "bug", "error", "crash", "broken", "fails", "panic", "debug",
];
const REFACTORING_KEYWORDS: [&str; 6] = [
    "refactor",
    "restructure",
    "clean up",
    "simplify",
    "extract",
    "rename",
];
const IMPLEMENTATION_KEYWORDS: [&str; 6] = ["implement", "add", "create", "build", "write", "new"];
const RESEARCH_KEYWORDS: [&str; 6] = [
    "research",
    "investigate",
    "explore",
    "compare",
    "look into",
    "find out",
];

/// Classifies free-text requests and extracts literal context hints.
///
/// Pure and synchronous; classification runs on a lower-cased, trimmed
/// copy while extraction runs over the raw query.
#[derive(Default)]
pub struct QueryAnalyzer;

impl QueryAnalyzer {
    /// Analyzes a request.
    ///
    /// Task-type resolution uses a fixed priority (question > debugging
    /// > refactoring > implementation > research > other) because a
    /// query can match several keyword sets at once; "how do I fix"
    /// must classify as a question every time.
    pub fn analyze(query: &str) -> QueryAnalysis {
        let lowered = query.trim().to_lowercase();

        let task_type = if matches_any(&lowered, &QUESTION_KEYWORDS) {
            TaskType::Question
        } else if matches_any(&lowered, &DEBUGGING_KEYWORDS) {
            TaskType::Debugging
        } else if matches_any(&lowered, &REFACTORING_KEYWORDS) {
            TaskType::Refactoring
        } else if matches_any(&lowered, &IMPLEMENTATION_KEYWORDS) {
            TaskType::Implementation
        } else if matches_any(&lowered, &RESEARCH_KEYWORDS) {
            TaskType::Research
        } else {
            TaskType::Other
        };

        QueryAnalysis {
            task_type,
            required_context: extract_context(query),
        }
    }
}

fn matches_any(lowered: &str, keywords: &[&str]) -> bool {
    keywords.iter().any(|keyword| lowered.contains(keyword))
}

/// Runs the path-shaped patterns then the identifier pattern, keeping
/// the first appearance of each distinct match.
fn extract_context(query: &str) -> Vec<String> {
    let mut matches = Vec::new();

    for capture in SLASH_PATH.find_iter(query) {
        push_unique(&mut matches, capture.as_str());
    }
    for capture in FILE_NAME.find_iter(query) {
        push_unique(&mut matches, capture.as_str());
    }
    for capture in BACKTICKED.captures_iter(query) {
        if let Some(inner) = capture.get(1) {
            push_unique(&mut matches, inner.as_str().trim());
        }
    }
    for capture in IDENTIFIER.find_iter(query) {
        push_unique(&mut matches, capture.as_str());
    }

    matches
}

fn push_unique(matches: &mut Vec<String>, candidate: &str) {
    if !candidate.is_empty() && !matches.iter().any(|existing| existing == candidate) {
        matches.push(candidate.to_owned());
    }
}
