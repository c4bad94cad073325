//! Visible text of a markup fragment

use scraper::node::Node;
use scraper::ElementRef;

/// Text under `element`, skipping script/style/noscript, whitespace collapsed
pub fn visible_text(element: ElementRef<'_>) -> String {
    let mut parts = Vec::new();

    for node_ref in element.descendants() {
        if let Node::Text(text_node) = node_ref.value() {
            let in_excluded = node_ref.ancestors().any(|ancestor| {
                ancestor
                    .value()
                    .as_element()
                    .map(|el| matches!(el.name(), "script" | "style" | "noscript"))
                    .unwrap_or(false)
            });

            if !in_excluded {
                let trimmed = text_node.trim();
                if !trimmed.is_empty() {
                    parts.push(trimmed);
                }
            }
        }
    }

    normalize_whitespace(&parts.join(" "))
}

/// Collapse runs of whitespace to single spaces
pub fn normalize_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use scraper::Html;

    #[test]
    fn test_visible_text_skips_scripts() {
        let html = Html::parse_fragment(
            r#"<div><script>var x = 1;</script><span>1,234</span><span>Following</span>
            <style>.x { color: red; }</style><p>Joined   March 2020</p></div>"#,
        );
        let text = visible_text(html.root_element());
        assert_eq!(text, "1,234 Following Joined March 2020");
    }

    #[test]
    fn test_normalize_whitespace() {
        assert_eq!(normalize_whitespace("  hello   world \n\t test "), "hello world test");
    }
}
