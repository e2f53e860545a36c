//! Markup serialization of live trees
//!
//! Renders any [`LiveTree`] subtree to an HTML string, the way a browser's
//! `innerHTML`/`outerHTML` would. Used by the parser to capture the raw
//! content of `style` elements, and by tests to inspect live trees.

use crate::live::{LiveNode, LiveTree, Namespace};

/// Render the children of `node`.
pub fn inner_html<T: LiveTree + ?Sized>(tree: &T, node: T::Node) -> String {
    let mut output = String::new();
    let raw = matches!(tree.view(node), Some(LiveNode::Element { tag, .. }) if is_raw_text_element(tag));
    render_children(tree, node, raw, &mut output);
    output
}

/// Render `node` itself.
pub fn outer_html<T: LiveTree + ?Sized>(tree: &T, node: T::Node) -> String {
    let mut output = String::new();
    render_node(tree, node, false, &mut output);
    output
}

fn render_children<T: LiveTree + ?Sized>(tree: &T, node: T::Node, raw: bool, output: &mut String) {
    for child in tree.child_nodes(node) {
        render_node(tree, child, raw, output);
    }
}

/// Render a node to HTML.
fn render_node<T: LiveTree + ?Sized>(tree: &T, node: T::Node, raw: bool, output: &mut String) {
    let Some(view) = tree.view(node) else {
        return;
    };
    match view {
        LiveNode::Element { tag, ns, attrs } => {
            output.push('<');
            output.push_str(tag);
            render_attrs(attrs, output);

            // Void elements
            if ns == Namespace::Html && is_void_element(tag) {
                output.push_str(" />");
                return;
            }

            output.push('>');
            render_children(tree, node, is_raw_text_element(tag), output);
            output.push_str("</");
            output.push_str(tag);
            output.push('>');
        }
        LiveNode::Text(text) if raw => output.push_str(text),
        LiveNode::Text(text) => output.push_str(&escape_html(text)),
        LiveNode::Fragment => render_children(tree, node, raw, output),
        LiveNode::Comment(text) => {
            output.push_str("<!--");
            output.push_str(text);
            output.push_str("-->");
        }
    }
}

/// Render attributes to HTML.
fn render_attrs(attrs: &[(String, String)], output: &mut String) {
    for (name, value) in attrs {
        output.push(' ');
        output.push_str(name);
        output.push_str("=\"");
        output.push_str(&escape_attr(value));
        output.push('"');
    }
}

/// Escape HTML special characters.
fn escape_html(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => result.push_str("&amp;"),
            '<' => result.push_str("&lt;"),
            '>' => result.push_str("&gt;"),
            _ => result.push(c),
        }
    }
    result
}

/// Escape attribute value special characters.
fn escape_attr(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => result.push_str("&amp;"),
            '"' => result.push_str("&quot;"),
            '<' => result.push_str("&lt;"),
            '>' => result.push_str("&gt;"),
            _ => result.push(c),
        }
    }
    result
}

/// Elements whose text content is emitted without escaping.
fn is_raw_text_element(tag: &str) -> bool {
    matches!(tag, "style" | "script")
}

/// Check if element is a void element (self-closing).
fn is_void_element(tag: &str) -> bool {
    matches!(
        tag,
        "area"
            | "base"
            | "br"
            | "col"
            | "embed"
            | "hr"
            | "img"
            | "input"
            | "link"
            | "meta"
            | "param"
            | "source"
            | "track"
            | "wbr"
    )
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::live::Dom;

    #[test]
    fn test_escape_html() {
        assert_eq!(escape_html("<script>"), "&lt;script&gt;");
        assert_eq!(escape_html("a & b"), "a &amp; b");
        assert_eq!(escape_attr("{\"a\":1}"), "{&quot;a&quot;:1}");
    }

    #[test]
    fn test_raw_text_and_void_elements() {
        let mut dom = Dom::new("div");
        let root = dom.root();
        let style = dom.create_element("style");
        let css = dom.create_text(".a > .b { color: red }");
        dom.append_child(style, css).unwrap();
        dom.append_child(root, style).unwrap();
        let br = dom.create_element("br");
        dom.append_child(root, br).unwrap();
        let comment = dom.create_comment(" note ");
        dom.append_child(root, comment).unwrap();

        assert_eq!(inner_html(&dom, style), ".a > .b { color: red }");
        assert_eq!(
            inner_html(&dom, root),
            "<style>.a > .b { color: red }</style><br /><!-- note -->"
        );
    }

    #[test]
    fn test_svg_is_never_void() {
        let mut dom = Dom::new("div");
        let svg = dom.create_element_ns(Namespace::Svg, "link");
        assert_eq!(outer_html(&dom, svg), "<link></link>");
    }
}
