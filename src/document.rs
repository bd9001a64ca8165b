//! Parsed HTML document.
//!
//! html5ever builds an `RcDom`, which is `Rc`-based and cannot cross task
//! boundaries. We walk it once and copy the parts we need (elements and
//! text) into a flat arena that is `Send + Sync` and can live in the cache.

use crate::error::{PlaylistError, Result};
use html5ever::parse_document;
use html5ever::tendril::TendrilSink;
use markup5ever_rcdom::{Handle, NodeData as RcNodeData, RcDom};
use sha1::{Digest, Sha1};
use tracing::debug;

/// Index of a node inside a [`Document`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct NodeId(usize);

impl NodeId {
    pub const ROOT: NodeId = NodeId(0);
}

#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    Root,
    Element {
        name: String,
    },
    Text(String),
}

#[derive(Debug, Clone)]
struct Node {
    kind: NodeKind,
    children: Vec<NodeId>,
}

/// Immutable document tree.
#[derive(Debug)]
pub struct Document {
    nodes: Vec<Node>,
    digest: String,
}

impl Document {
    /// Parse HTML text into a document.
    ///
    /// # Errors
    /// Returns [`PlaylistError::Parse`] if the html5ever reader fails.
    pub fn parse(html: &str) -> Result<Self> {
        let dom = parse_document(RcDom::default(), Default::default())
            .from_utf8()
            .read_from(&mut html.as_bytes())
            .map_err(|e| PlaylistError::Parse(format!("Failed to read HTML: {}", e)))?;

        let mut document = Document {
            nodes: vec![Node {
                kind: NodeKind::Root,
                children: Vec::new(),
            }],
            digest: hex::encode(Sha1::digest(html.as_bytes())),
        };
        document.convert(&dom.document, NodeId::ROOT);

        debug!("Parsed document with {} nodes", document.nodes.len());
        Ok(document)
    }

    /// Copy an RcDom subtree below `parent`. Walks with an explicit stack
    /// so nesting depth is bounded by the heap, not the thread stack.
    fn convert(&mut self, handle: &Handle, parent: NodeId) {
        let mut stack: Vec<(Handle, NodeId)> = vec![(handle.clone(), parent)];
        while let Some((handle, parent)) = stack.pop() {
            let kind = match &handle.data {
                RcNodeData::Document => None,
                RcNodeData::Text { contents } => {
                    Some(NodeKind::Text(contents.borrow().to_string()))
                }
                RcNodeData::Element { name, .. } => Some(NodeKind::Element {
                    name: name.local.to_string(),
                }),
                // Doctype, comments and processing instructions carry no content we read
                _ => continue,
            };

            let id = match kind {
                Some(kind) => self.push(kind, parent),
                None => parent,
            };
            // Reversed so children pop in document order
            for child in handle.children.borrow().iter().rev() {
                stack.push((child.clone(), id));
            }
        }
    }

    fn push(&mut self, kind: NodeKind, parent: NodeId) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(Node {
            kind,
            children: Vec::new(),
        });
        self.nodes[parent.0].children.push(id);
        id
    }

    /// Lowercase hex SHA-1 of the source text this document was parsed from.
    pub fn digest(&self) -> &str {
        &self.digest
    }

    pub fn kind(&self, id: NodeId) -> &NodeKind {
        &self.nodes[id.0].kind
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.nodes[id.0].children
    }

    /// Local element name, or `None` for text and the root.
    pub fn element_name(&self, id: NodeId) -> Option<&str> {
        match self.kind(id) {
            NodeKind::Element { name, .. } => Some(name),
            _ => None,
        }
    }

    /// All nodes in document (pre-)order, starting at `from`.
    pub fn descendants(&self, from: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack = vec![from];
        while let Some(id) = stack.pop() {
            out.push(id);
            stack.extend(self.children(id).iter().rev().copied());
        }
        out
    }

    /// Select elements by a path whose first step may sit anywhere in the
    /// tree and whose following steps are direct children, i.e. the XPath
    /// `//first/second/...`. Results are in document order.
    pub fn select_path(&self, path: &[&str]) -> Vec<NodeId> {
        let Some((first, rest)) = path.split_first() else {
            return Vec::new();
        };

        let mut current: Vec<NodeId> = self
            .descendants(NodeId::ROOT)
            .into_iter()
            .filter(|&id| self.element_name(id) == Some(*first))
            .collect();

        for step in rest {
            current = current
                .into_iter()
                .flat_map(|id| self.children(id).iter().copied())
                .filter(|&id| self.element_name(id) == Some(*step))
                .collect();
        }
        current
    }

    /// Concatenated text of every text node below `id`.
    pub fn inner_text(&self, id: NodeId) -> String {
        self.descendants(id)
            .into_iter()
            .filter_map(|node| match self.kind(node) {
                NodeKind::Text(text) => Some(text.as_str()),
                _ => None,
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = r#"<!DOCTYPE html>
<html><head><title>Playlist</title></head>
<body>
  <h1>Heute</h1>
  <blockquote>
    <ol>
      <li>Abba - Waterloo (3:45)</li>
      <li><b>Queen</b> - Bohemian Rhapsody (5:55)</li>
    </ol>
  </blockquote>
  <div><blockquote><ol><li>nested, not direct</li></ol></blockquote></div>
</body></html>"#;

    #[test]
    fn parses_elements_and_text() {
        let doc = Document::parse(PAGE).unwrap();
        let titles = doc.select_path(&["title"]);
        assert_eq!(titles.len(), 1);
        assert_eq!(doc.inner_text(titles[0]), "Playlist");
    }

    #[test]
    fn select_path_follows_direct_children_only() {
        let doc = Document::parse(PAGE).unwrap();
        let items = doc.select_path(&["body", "blockquote", "ol", "li"]);

        assert_eq!(items.len(), 2);
        assert_eq!(doc.inner_text(items[0]), "Abba - Waterloo (3:45)");
        assert_eq!(
            doc.inner_text(items[1]),
            "Queen - Bohemian Rhapsody (5:55)"
        );
    }

    #[test]
    fn select_path_empty_path_selects_nothing() {
        let doc = Document::parse(PAGE).unwrap();
        assert!(doc.select_path(&[]).is_empty());
    }

    #[test]
    fn digest_depends_on_source() {
        let a = Document::parse("<p>a</p>").unwrap();
        let b = Document::parse("<p>b</p>").unwrap();
        let a2 = Document::parse("<p>a</p>").unwrap();

        assert_ne!(a.digest(), b.digest());
        assert_eq!(a.digest(), a2.digest());
        assert_eq!(a.digest().len(), 40);
    }

    #[test]
    fn html5ever_repairs_broken_markup() {
        // Unclosed tags still yield a body with list items
        let doc = Document::parse("<body><blockquote><ol><li>one<li>two").unwrap();
        let items = doc.select_path(&["body", "blockquote", "ol", "li"]);
        assert_eq!(items.len(), 2);
    }

    #[test]
    fn deep_nesting_does_not_overflow_stack() {
        const DEPTH: usize = 100_000;
        let mut html = String::from(
            "<html><body><blockquote><ol><li>Abba - Waterloo (3:45)</li></ol></blockquote>",
        );
        html.push_str(&"<span>".repeat(DEPTH));
        html.push_str("deep");

        // Small stack, as on a tokio worker
        let handle = std::thread::Builder::new()
            .stack_size(2 * 1024 * 1024)
            .spawn(move || {
                let doc = Document::parse(&html).unwrap();
                let items = doc.select_path(&["body", "blockquote", "ol", "li"]);
                let spans = doc.select_path(&["span"]).len();
                (doc.inner_text(items[0]), spans)
            })
            .unwrap();

        let (first, spans) = handle.join().expect("parse thread panicked");
        assert_eq!(first, "Abba - Waterloo (3:45)");
        assert_eq!(spans, DEPTH);
    }

    #[test]
    fn children_keep_document_order() {
        let doc =
            Document::parse("<html><body><ol><li>a</li><li>b</li><li>c</li></ol></body></html>")
                .unwrap();
        let ol = doc.select_path(&["body", "ol"])[0];
        let texts: Vec<String> = doc
            .children(ol)
            .iter()
            .map(|&li| doc.inner_text(li))
            .collect();
        assert_eq!(texts, vec!["a", "b", "c"]);
    }

    #[test]
    fn document_is_send_and_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Document>();
    }
}
