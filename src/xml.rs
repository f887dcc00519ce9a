//! Shared helpers for the control plane's XML documents.
//!
//! The schema is versioned external state; parsing is strict. A missing
//! element is a malformed-output error naming the command that produced
//! the document, never a silent default.

use roxmltree::{Document, Node};

use crate::{AppError, Result};

/// Parse `raw` as an XML document, attributing failures to `argv`.
pub(crate) fn parse_document<'input>(
    raw: &'input str,
    argv: &[String],
) -> Result<Document<'input>> {
    Document::parse(raw).map_err(|err| {
        AppError::MalformedOutput(format!("bad XML from `{}`: {err}", argv.join(" ")))
    })
}

/// First child element of `node` named `name`, or a malformed-output error.
pub(crate) fn required_child<'a, 'input>(
    node: Node<'a, 'input>,
    name: &str,
    argv: &[String],
) -> Result<Node<'a, 'input>> {
    node.children()
        .find(|child| child.has_tag_name(name))
        .ok_or_else(|| {
            AppError::MalformedOutput(format!(
                "missing <{name}> under <{}> in output of `{}`",
                node.tag_name().name(),
                argv.join(" ")
            ))
        })
}

/// Trimmed text of the required child element `name`.
///
/// The element must exist; an empty element yields an empty string.
pub(crate) fn required_text(node: Node<'_, '_>, name: &str, argv: &[String]) -> Result<String> {
    let child = required_child(node, name, argv)?;
    Ok(child.text().unwrap_or_default().trim().to_owned())
}

/// All child elements of `node` named `name`, in document order.
pub(crate) fn children<'a, 'input>(
    node: Node<'a, 'input>,
    name: &'a str,
) -> impl Iterator<Item = Node<'a, 'input>> {
    node.children().filter(move |child| child.has_tag_name(name))
}
