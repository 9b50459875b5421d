use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, bail};
use quick_xml::escape::{escape, partial_escape};
use tracing::{info, warn};

use crate::record::{PublicationRecord, YearBuckets};

const INDENT: &str = "  ";

/// A small markup tree, serialized with two-space indentation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    Element {
        name: &'static str,
        attrs: Vec<(&'static str, String)>,
        children: Vec<Node>,
    },
    /// Self-closing tag such as `<br />`.
    Void(&'static str),
    Text(String),
}

impl Node {
    pub fn element(name: &'static str) -> Self {
        Node::Element {
            name,
            attrs: Vec::new(),
            children: Vec::new(),
        }
    }

    pub fn text(s: impl Into<String>) -> Self {
        Node::Text(s.into())
    }

    pub fn attr(mut self, key: &'static str, value: impl Into<String>) -> Self {
        if let Node::Element { attrs, .. } = &mut self {
            attrs.push((key, value.into()));
        }
        self
    }

    pub fn child(mut self, node: Node) -> Self {
        if let Node::Element { children, .. } = &mut self {
            children.push(node);
        }
        self
    }

    pub fn children(self, nodes: impl IntoIterator<Item = Node>) -> Self {
        nodes.into_iter().fold(self, Node::child)
    }

    /// Serialize the tree. Elements that contain only elements put each child on
    /// its own line; elements holding text are written on one line so the text
    /// is not padded with whitespace.
    pub fn to_markup(&self) -> String {
        let mut out = String::new();
        self.write_block(&mut out, 0);
        out
    }

    fn write_block(&self, out: &mut String, depth: usize) {
        match self {
            Node::Element { name, attrs, children } if !children.is_empty() => {
                if children.iter().any(|c| matches!(c, Node::Text(_))) {
                    self.write_inline(out);
                    return;
                }
                open_tag(out, name, attrs);
                for child in children {
                    out.push('\n');
                    out.push_str(&INDENT.repeat(depth + 1));
                    child.write_block(out, depth + 1);
                }
                out.push('\n');
                out.push_str(&INDENT.repeat(depth));
                out.push_str("</");
                out.push_str(name);
                out.push('>');
            }
            _ => self.write_inline(out),
        }
    }

    fn write_inline(&self, out: &mut String) {
        match self {
            Node::Element { name, attrs, children } => {
                open_tag(out, name, attrs);
                for child in children {
                    child.write_inline(out);
                }
                out.push_str("</");
                out.push_str(name);
                out.push('>');
            }
            Node::Void(name) => {
                out.push('<');
                out.push_str(name);
                out.push_str(" />");
            }
            Node::Text(text) => out.push_str(&partial_escape(text.as_str())),
        }
    }
}

fn open_tag(out: &mut String, name: &str, attrs: &[(&'static str, String)]) {
    out.push('<');
    out.push_str(name);
    for (key, value) in attrs {
        out.push(' ');
        out.push_str(key);
        out.push_str("=\"");
        out.push_str(&escape(value.as_str()));
        out.push('"');
    }
    out.push('>');
}

/// One list item: linked title, authors, citation line.
fn record_item(record: &PublicationRecord) -> Node {
    let link = Node::element("a")
        .attr("href", record.url.as_str())
        .attr("target", "_blank")
        .child(Node::text(record.title.as_str()));
    Node::element("li").child(
        Node::element("p")
            .child(link)
            .child(Node::Void("br"))
            .child(Node::text(record.authors.as_str()))
            .child(Node::Void("br"))
            .child(Node::text(record.citation())),
    )
}

/// The `<ul>` fragment for one year's records, in the order given.
pub fn render_bucket(records: &[PublicationRecord]) -> String {
    Node::element("ul")
        .children(records.iter().map(record_item))
        .to_markup()
}

pub fn year_file(dir: &Path, year: i32) -> PathBuf {
    dir.join(format!("pubs_{year}.html"))
}

/// Write one file per bucket, replacing whatever was there. Stops at the first
/// failure; files written before it are left in place.
pub fn write_buckets(dir: &Path, buckets: &YearBuckets) -> anyhow::Result<Vec<PathBuf>> {
    if !dir.is_dir() {
        bail!("output directory {} does not exist", dir.display());
    }
    if buckets.is_empty() {
        warn!("no publications after the cutoff, nothing to write");
    }
    let mut written = Vec::with_capacity(buckets.len());
    for (year, records) in buckets.iter() {
        let path = year_file(dir, year);
        fs::write(&path, render_bucket(records))
            .with_context(|| format!("failed to write {}", path.display()))?;
        info!(path = %path.display(), records = records.len(), "wrote year page");
        written.push(path);
    }
    Ok(written)
}
