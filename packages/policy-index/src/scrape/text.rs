//! Main-text extraction from policy HTML.

use scraper::{ElementRef, Html, Node, Selector};

/// Elements whose text never counts as document content.
const SKIPPED_TAGS: &[&str] = &[
    "script", "style", "noscript", "header", "footer", "svg", "meta", "nav", "aside", "form",
];

/// Lines this short are navigation crumbs, buttons and the like.
const MIN_LINE_CHARS: usize = 30;

/// Extract readable document text from HTML.
///
/// Picks `main`, then `article`, then `body`, ignores boilerplate elements and
/// keeps only trimmed lines longer than 30 characters. Returns an empty string
/// when the document has no container.
pub fn extract_main_text(html: &str) -> String {
    let document = Html::parse_document(html);

    let Some(container) = ["main", "article", "body"]
        .iter()
        .filter_map(|tag| Selector::parse(tag).ok())
        .find_map(|selector| {
            document
                .select(&selector)
                .find(|el| !has_skipped_ancestor(el))
        })
    else {
        return String::new();
    };

    let mut pieces = Vec::new();
    collect_text(container, &mut pieces);

    pieces
        .join("\n")
        .lines()
        .map(str::trim)
        .filter(|line| line.chars().count() > MIN_LINE_CHARS)
        .collect::<Vec<_>>()
        .join("\n")
}

fn is_skipped(element: &ElementRef<'_>) -> bool {
    SKIPPED_TAGS.contains(&element.value().name())
}

fn has_skipped_ancestor(element: &ElementRef<'_>) -> bool {
    element
        .ancestors()
        .filter_map(ElementRef::wrap)
        .any(|ancestor| is_skipped(&ancestor))
}

fn collect_text<'a>(element: ElementRef<'a>, out: &mut Vec<&'a str>) {
    for child in element.children() {
        match child.value() {
            Node::Text(text) => out.push(&**text),
            Node::Element(_) => {
                if let Some(child) = ElementRef::wrap(child) {
                    if !is_skipped(&child) {
                        collect_text(child, out);
                    }
                }
            }
            _ => {}
        }
    }
}
