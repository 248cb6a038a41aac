//! Offset arithmetic over the inline content of a text block.
//!
//! A text block's children are text leaves, voids and inline elements whose
//! own children are text leaves. Offsets are UTF-8 byte offsets into the
//! concatenated text of every leaf, in document order.

use crate::core::{ElementNode, Marks, Node, Point, TextNode, VoidNode, clamp_to_char_boundary};

pub(crate) struct Leaf<'a> {
    /// Path of the leaf relative to its block: `[ix]` or `[inline_ix, ix]`.
    pub rel: Vec<usize>,
    pub node: &'a TextNode,
    pub start: usize,
}

impl Leaf<'_> {
    pub fn end(&self) -> usize {
        self.start + self.node.text.len()
    }
}

pub(crate) fn leaves(children: &[Node]) -> Vec<Leaf<'_>> {
    let mut out = Vec::new();
    let mut cursor = 0usize;
    for (ix, node) in children.iter().enumerate() {
        match node {
            Node::Text(t) => {
                out.push(Leaf {
                    rel: vec![ix],
                    node: t,
                    start: cursor,
                });
                cursor += t.text.len();
            }
            Node::Element(el) => {
                for (child_ix, child) in el.children.iter().enumerate() {
                    if let Node::Text(t) = child {
                        out.push(Leaf {
                            rel: vec![ix, child_ix],
                            node: t,
                            start: cursor,
                        });
                        cursor += t.text.len();
                    }
                }
            }
            Node::Void(_) => {}
        }
    }
    out
}

pub(crate) fn inline_text(children: &[Node]) -> String {
    leaves(children)
        .into_iter()
        .map(|leaf| leaf.node.text.as_str())
        .collect()
}

pub(crate) fn inline_len(children: &[Node]) -> usize {
    leaves(children).last().map(Leaf::end).unwrap_or(0)
}

pub(crate) fn offset_of(children: &[Node], rel: &[usize], offset: usize) -> Option<usize> {
    leaves(children)
        .into_iter()
        .find(|leaf| leaf.rel == rel)
        .map(|leaf| leaf.start + clamp_to_char_boundary(&leaf.node.text, offset))
}

/// Which leaf a block offset sitting on a leaf boundary resolves to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Affinity {
    /// The leaf ending at the offset.
    Backward,
    /// The leaf starting at the offset.
    Forward,
}

pub(crate) fn point_at(
    block_path: &[usize],
    children: &[Node],
    offset: usize,
    affinity: Affinity,
) -> Point {
    let leaves = leaves(children);
    let total = leaves.last().map(Leaf::end).unwrap_or(0);
    let offset = offset.min(total);

    let found = match affinity {
        Affinity::Backward => leaves.iter().find(|leaf| offset <= leaf.end()),
        Affinity::Forward => leaves
            .iter()
            .find(|leaf| offset < leaf.end())
            .or_else(|| leaves.last()),
    };

    let mut path = block_path.to_vec();
    match found {
        Some(leaf) => {
            path.extend_from_slice(&leaf.rel);
            let local = clamp_to_char_boundary(&leaf.node.text, offset - leaf.start);
            Point::new(path, local)
        }
        None => {
            path.push(0);
            Point::new(path, 0)
        }
    }
}

#[derive(Debug, Clone)]
pub(crate) enum Segment {
    Text {
        text: String,
        marks: Marks,
        /// Index into `Inlines::links` of the inline element holding this text.
        link: Option<usize>,
    },
    Void(VoidNode),
}

/// Flat, editable form of a block's inline content.
#[derive(Debug, Clone, Default)]
pub(crate) struct Inlines {
    pub segments: Vec<Segment>,
    links: Vec<ElementNode>,
}

impl Inlines {
    pub fn from_children(children: &[Node]) -> Self {
        let mut out = Self::default();
        for node in children {
            match node {
                Node::Text(t) => out.segments.push(Segment::Text {
                    text: t.text.clone(),
                    marks: t.marks.clone(),
                    link: None,
                }),
                Node::Element(el) => {
                    let id = out.add_link(ElementNode {
                        kind: el.kind.clone(),
                        attrs: el.attrs.clone(),
                        children: Vec::new(),
                    });
                    for child in &el.children {
                        if let Node::Text(t) = child {
                            out.segments.push(Segment::Text {
                                text: t.text.clone(),
                                marks: t.marks.clone(),
                                link: Some(id),
                            });
                        }
                    }
                }
                Node::Void(v) => out.segments.push(Segment::Void(v.clone())),
            }
        }
        out
    }

    pub fn add_link(&mut self, shell: ElementNode) -> usize {
        self.links.push(shell);
        self.links.len() - 1
    }

    /// Ensures a segment boundary at `offset` and returns the number of
    /// segments starting before it.
    pub fn split_at(&mut self, offset: usize) -> usize {
        let mut cursor = 0usize;
        for ix in 0..self.segments.len() {
            if cursor >= offset {
                return ix;
            }
            let Segment::Text { text, marks, link } = &self.segments[ix] else {
                continue;
            };
            let end = cursor + text.len();
            if offset < end {
                let at = clamp_to_char_boundary(text, offset - cursor);
                let right = Segment::Text {
                    text: text[at..].to_string(),
                    marks: marks.clone(),
                    link: *link,
                };
                if let Segment::Text { text, .. } = &mut self.segments[ix] {
                    text.truncate(at);
                }
                self.segments.insert(ix + 1, right);
                return ix + 1;
            }
            cursor = end;
        }
        self.segments.len()
    }

    pub fn split_off(&mut self, at: usize) -> Inlines {
        Inlines {
            segments: self.segments.split_off(at),
            links: self.links.clone(),
        }
    }

    pub fn append(&mut self, mut other: Inlines) {
        let base = self.links.len();
        for segment in &mut other.segments {
            if let Segment::Text { link: Some(id), .. } = segment {
                *id += base;
            }
        }
        self.links.append(&mut other.links);
        self.segments.append(&mut other.segments);
    }

    /// Number of text segments in `segments[..end]`.
    pub fn text_count(&self, end: usize) -> usize {
        self.segments[..end]
            .iter()
            .filter(|s| matches!(s, Segment::Text { .. }))
            .count()
    }

    /// Marks and inline membership of the text the caret at segment boundary
    /// `ix` continues.
    pub fn context_at(&self, ix: usize) -> (Marks, Option<usize>) {
        let before = self.segments[..ix].iter().rev();
        let after = self.segments[ix..].iter();
        before
            .chain(after)
            .find_map(|s| match s {
                Segment::Text { marks, link, .. } => Some((marks.clone(), *link)),
                Segment::Void(_) => None,
            })
            .unwrap_or_default()
    }

    pub fn into_children(self) -> Vec<Node> {
        fn close(out: &mut Vec<Node>, links: &[ElementNode], open: Option<(usize, Vec<Node>)>) {
            let Some((id, children)) = open else {
                return;
            };
            let mut el = links[id].clone();
            el.children = children;
            out.push(Node::Element(el));
        }

        let Inlines { segments, links } = self;
        let mut out: Vec<Node> = Vec::new();
        let mut open: Option<(usize, Vec<Node>)> = None;

        for segment in segments {
            match segment {
                Segment::Text {
                    text,
                    marks,
                    link: Some(id),
                } => {
                    let continues = matches!(&open, Some((open_id, _)) if *open_id == id);
                    if !continues {
                        close(&mut out, &links, open.take());
                        open = Some((id, Vec::new()));
                    }
                    if let Some((_, children)) = open.as_mut() {
                        children.push(Node::Text(TextNode { text, marks }));
                    }
                }
                Segment::Text {
                    text,
                    marks,
                    link: None,
                } => {
                    close(&mut out, &links, open.take());
                    out.push(Node::Text(TextNode { text, marks }));
                }
                Segment::Void(v) => {
                    close(&mut out, &links, open.take());
                    out.push(Node::Void(v));
                }
            }
        }
        close(&mut out, &links, open.take());

        if out.is_empty() {
            out.push(Node::Text(TextNode {
                text: String::new(),
                marks: Marks::default(),
            }));
        }
        out
    }
}
