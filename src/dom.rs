//! Navigation helpers over [`roxmltree`] element trees.
//!
//! The parser needs only a handful of primitives from the document model:
//! attribute access, element children filtered by expanded name, text
//! content and the nearest `<xs:schema>` ancestor.

use crate::error::XsdError;
use crate::xstypes::XS_NAMESPACE;
use roxmltree::Node;

/// Whether `node` is an element named `local` in the XML Schema namespace.
pub fn is_xs_element(node: Node, local: &str) -> bool {
    node.is_element()
        && node.tag_name().name() == local
        && node.tag_name().namespace() == Some(XS_NAMESPACE)
}

/// Direct element children of `node`, in document order.
pub fn element_children<'a, 'input: 'a>(
    node: Node<'a, 'input>,
) -> impl Iterator<Item = Node<'a, 'input>> {
    node.children().filter(|c| c.is_element())
}

/// Direct children named `local` in the XML Schema namespace.
pub fn xs_children<'a, 'input: 'a>(
    node: Node<'a, 'input>,
    local: &'a str,
) -> impl Iterator<Item = Node<'a, 'input>> + 'a {
    element_children(node).filter(move |c| is_xs_element(*c, local))
}

pub fn first_xs_child<'a, 'input: 'a>(
    node: Node<'a, 'input>,
    local: &'a str,
) -> Option<Node<'a, 'input>> {
    xs_children(node, local).next()
}

pub fn required_attribute<'a>(
    node: Node<'a, '_>,
    attribute: &'static str,
) -> Result<&'a str, XsdError> {
    node.attribute(attribute)
        .ok_or_else(|| XsdError::missing_attribute(node, attribute))
}

/// Parses an `xs:boolean`-valued attribute, with `default` for an absent one.
pub fn boolean_attribute(
    node: Node,
    attribute: &'static str,
    default: bool,
) -> Result<bool, XsdError> {
    match node.attribute(attribute) {
        None => Ok(default),
        Some("true") | Some("1") => Ok(true),
        Some("false") | Some("0") => Ok(false),
        Some(other) => Err(XsdError::InvalidAttributeValue {
            element: node.tag_name().name().to_string(),
            attribute,
            value: other.to_string(),
        }),
    }
}

/// The nearest `<xs:schema>` ancestor of `node` (or `node` itself).
/// Used to locate `targetNamespace` and the schema-wide defaults from
/// arbitrarily deep within the document.
pub fn enclosing_schema<'a, 'input: 'a>(node: Node<'a, 'input>) -> Option<Node<'a, 'input>> {
    node.ancestors().find(|a| is_xs_element(*a, "schema"))
}

/// Concatenated text content of an element's descendants.
pub fn text_content(node: Node) -> String {
    let mut out = String::new();
    for descendant in node.descendants() {
        if let Some(text) = descendant.text() {
            out.push_str(text);
        }
    }
    out
}
