//! Answer presentation for the CLI and web UI.

use pulldown_cmark::{html, CowStr, Event, Options, Parser, Tag};

use crate::models::DocumentChunk;

pub const RESPONSE_HEADING: &str = "### 🌿 Ayurvedic Insights";

pub const RESPONSE_NOTE: &str = "**Note:** These remedies are complementary. \
Consult a healthcare provider for persistent issues.";

/// Wrap a model answer in the Ayurvedic insights layout (markdown).
pub fn format_response(result: &str) -> String {
    format!(
        "{}\n\n{}\n\n---\n{}\n",
        RESPONSE_HEADING,
        result.trim(),
        RESPONSE_NOTE
    )
}

/// One line per source passage: `- <source> (<id>)`.
pub fn format_sources(sources: &[DocumentChunk]) -> String {
    sources
        .iter()
        .map(|c| format!("- {} ({})", c.source, c.id))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Render markdown to HTML for the web UI.
///
/// Raw HTML in the source is shown as text, and links or images with a
/// scheme other than `http`, `https` or `mailto` lose their target.
pub fn render_markdown(markdown: &str) -> String {
    let parser = Parser::new_ext(markdown, Options::ENABLE_STRIKETHROUGH | Options::ENABLE_TABLES)
        .map(|event| match event {
            Event::Html(raw) => Event::Text(raw),
            Event::Start(Tag::Link(kind, dest, title)) => {
                Event::Start(Tag::Link(kind, safe_url(dest), title))
            }
            Event::Start(Tag::Image(kind, dest, title)) => {
                Event::Start(Tag::Image(kind, safe_url(dest), title))
            }
            other => other,
        });

    let mut out = String::with_capacity(markdown.len() * 3 / 2);
    html::push_html(&mut out, parser);
    out
}

fn safe_url(dest: CowStr<'_>) -> CowStr<'_> {
    let lower = dest.trim().to_ascii_lowercase();
    let scheme = lower.split_once(':').map(|(s, _)| s);
    match scheme {
        // No scheme, or a colon after a path/query/fragment start: relative.
        None => dest,
        Some(s) if s.contains(|c: char| matches!(c, '/' | '?' | '#')) => dest,
        Some("http" | "https" | "mailto") => dest,
        Some(_) => CowStr::Borrowed("#"),
    }
}

/// Escape text for inclusion in HTML element content or attribute values.
pub fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}
