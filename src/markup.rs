use std::collections::HashSet;

use html5ever::{parse_document, tendril::TendrilSink};
use markup5ever_rcdom::{Handle, NodeData, RcDom};
use url::Url;

/// Upper bound on the links offered for a page.
pub const MAX_LINKS: usize = 5;

/// Resolves the anchors of `body` against `base_url` and keeps the first
/// [`MAX_LINKS`] distinct results, in document order.
pub fn extract_links(body: &str, base_url: &str) -> Vec<String> {
    let Ok(base) = Url::parse(base_url) else {
        tracing::debug!("Not extracting links, base url {base_url} does not parse");
        return Vec::new();
    };
    let dom = parse(body);
    let mut seen = HashSet::new();
    let mut links = Vec::with_capacity(MAX_LINKS);
    for href in Elements::new(&dom.document).filter_map(|node| anchor_href(&node)) {
        let Ok(url) = base.join(&href) else {
            continue;
        };
        let url = String::from(url);
        if seen.insert(url.clone()) {
            links.push(url);
            if links.len() == MAX_LINKS {
                break;
            }
        }
    }
    links
}

/// Text of the first `<title>` element, trimmed. `None` when there is no
/// title or it only holds whitespace.
pub fn extract_title(body: &str) -> Option<String> {
    let dom = parse(body);
    let title = Elements::new(&dom.document).find(|node| is_element(node, "title"))?;
    let mut text = String::new();
    for child in title.children.borrow().iter() {
        if let NodeData::Text { contents } = &child.data {
            text.push_str(&contents.borrow());
        }
    }
    let text = text.trim();
    if text.is_empty() {
        return None;
    }
    Some(text.to_string())
}

fn parse(body: &str) -> RcDom {
    parse_document(RcDom::default(), Default::default()).one(body)
}

fn is_element(node: &Handle, tag: &str) -> bool {
    matches!(&node.data, NodeData::Element { name, .. } if &*name.local == tag)
}

fn anchor_href(node: &Handle) -> Option<String> {
    if !is_element(node, "a") {
        return None;
    }
    let NodeData::Element { attrs, .. } = &node.data else {
        return None;
    };
    let attrs = attrs.borrow();
    let href = attrs.iter().find(|attr| &*attr.name.local == "href")?;
    if href.value.trim().is_empty() {
        return None;
    }
    Some(String::from(&*href.value))
}

/// Pre-order walk over a parsed tree, which is document order.
struct Elements {
    stack: Vec<Handle>,
}

impl Elements {
    fn new(root: &Handle) -> Self {
        Self {
            stack: Vec::from([root.clone()]),
        }
    }
}

impl Iterator for Elements {
    type Item = Handle;

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.stack.pop()?;
        self.stack
            .extend(node.children.borrow().iter().rev().cloned());
        Some(node)
    }
}
