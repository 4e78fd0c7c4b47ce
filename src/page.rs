//! Page text extraction.
//!
//! The classifier consumes visible page text, not markup. This module walks
//! parsed HTML, skips invisible subtrees, and produces a single
//! whitespace-normalized string — the equivalent of reading
//! `document.body.innerText` and collapsing whitespace runs.

use scraper::{ElementRef, Html, Node};

use crate::classify;

/// Tags whose subtrees carry no visible text.
const SKIP_CHILDREN: &[&str] = &["script", "style", "noscript", "svg", "head"];

/// Extract the visible text of an HTML document, whitespace-normalized.
pub fn extract_text(html: &str) -> String {
    let document = Html::parse_document(html);
    let mut buf = String::new();
    collect_text(document.root_element(), &mut buf);
    classify::normalize(&buf)
}

/// Classify an HTML document by its extracted text.
pub fn classify_page(html: &str) -> &'static str {
    classify::classify(&extract_text(html))
}

fn collect_text(el: ElementRef<'_>, buf: &mut String) {
    let tag = el.value().name.local.as_ref();
    if SKIP_CHILDREN.contains(&tag) {
        return;
    }

    for child_ref in el.children() {
        match child_ref.value() {
            Node::Element(_) => {
                if let Some(child_el) = ElementRef::wrap(child_ref) {
                    collect_text(child_el, buf);
                }
            }
            Node::Text(t) => {
                let s = t.text.to_string();
                if !s.trim().is_empty() {
                    if !buf.is_empty() {
                        buf.push(' ');
                    }
                    buf.push_str(s.trim());
                }
            }
            _ => {}
        }
    }
}
