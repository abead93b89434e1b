//! Keyword classifier for student utterances.
//!
//! Rules are checked in order and the first match wins:
//! 1. Metacognitive: an interrogative ("cómo"/"how") plus a reflective term.
//! 2. Technical: a tool, program, or technique term.
//! 3. Organizational: a dividing, organizing, or distributing term.
//! 4. Otherwise Creative.
//!
//! Matching is case-insensitive and diacritic-sensitive: "como" is not "cómo".

use std::sync::LazyLock;

use regex::Regex;

use mentor_core::types::Category;

// =============================================================================
// Compiled keyword sets (compiled once, shared read-only across sessions)
// =============================================================================

struct CategoryPatterns {
    interrogative: Vec<Regex>,
    reflective: Vec<Regex>,
    technical: Vec<Regex>,
    organizational: Vec<Regex>,
}

static PATTERNS: LazyLock<CategoryPatterns> = LazyLock::new(|| {
    let mk = |pats: &[&str]| -> Vec<Regex> {
        pats.iter()
            .map(|p| Regex::new(p).expect("Invalid category regex"))
            .collect()
    };

    CategoryPatterns {
        interrogative: mk(&[r"(?i)\bcómo\b", r"(?i)\bhow\b"]),
        reflective: mk(&[
            r"(?i)\bs(?:ie|e)nt\w*",
            r"(?i)\bpi?ens\w*",
            r"(?i)\baprend\w*",
            r"(?i)\bfe(?:el|lt)\w*",
            r"(?i)\bth(?:ink|ought)\w*",
            r"(?i)\blearn\w*",
        ]),
        technical: mk(&[
            r"(?i)\bherramienta\w*",
            r"(?i)\bprogram\w*",
            r"(?i)\btécnica\w*",
            r"(?i)\btool\w*",
            r"(?i)\btechnique\w*",
        ]),
        organizational: mk(&[
            r"(?i)\bdivid\w*",
            r"(?i)\borgani[zs]\w*",
            r"(?i)\bdistribu\w*",
        ]),
    }
});

fn any_match(patterns: &[Regex], text: &str) -> bool {
    patterns.iter().any(|re| re.is_match(text))
}

/// Classify a student utterance into its pedagogical category.
pub fn classify(text: &str) -> Category {
    let pats = &*PATTERNS;

    if any_match(&pats.interrogative, text) && any_match(&pats.reflective, text) {
        return Category::Metacognitive;
    }
    if any_match(&pats.technical, text) {
        return Category::Technical;
    }
    if any_match(&pats.organizational, text) {
        return Category::Organizational;
    }
    Category::Creative
}
