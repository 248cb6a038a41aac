use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::ops::{Op, Path};
use crate::schema::{BlockType, IMAGE_KIND, InlineType, MarkType, link_attrs};

pub type Attrs = BTreeMap<String, serde_json::Value>;
pub type ElementKind = String;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Document {
    #[serde(default)]
    pub children: Vec<Node>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "node", rename_all = "snake_case")]
pub enum Node {
    Element(ElementNode),
    Text(TextNode),
    Void(VoidNode),
}

impl Node {
    pub fn paragraph(text: impl Into<String>) -> Self {
        Self::block(BlockType::Paragraph, text)
    }

    pub fn block(kind: BlockType, text: impl Into<String>) -> Self {
        Node::Element(ElementNode::new(kind.as_str(), vec![Node::text(text)]))
    }

    pub fn block_with(kind: BlockType, children: Vec<Node>) -> Self {
        Node::Element(ElementNode::new(kind.as_str(), children))
    }

    pub fn text(text: impl Into<String>) -> Self {
        Self::marked(text, Marks::default())
    }

    pub fn marked(text: impl Into<String>, marks: Marks) -> Self {
        Node::Text(TextNode {
            text: text.into(),
            marks,
        })
    }

    pub fn link(href: impl Into<String>, text: impl Into<String>) -> Self {
        Node::Element(ElementNode {
            kind: InlineType::Link.as_str().to_string(),
            attrs: link_attrs(href),
            children: vec![Node::text(text)],
        })
    }

    pub fn image(src: impl Into<String>) -> Self {
        let mut attrs = Attrs::default();
        attrs.insert("src".to_string(), serde_json::Value::String(src.into()));
        Node::Void(VoidNode {
            kind: IMAGE_KIND.to_string(),
            attrs,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ElementNode {
    pub kind: ElementKind,
    #[serde(default)]
    pub attrs: Attrs,
    #[serde(default)]
    pub children: Vec<Node>,
}

impl ElementNode {
    pub fn new(kind: impl Into<ElementKind>, children: Vec<Node>) -> Self {
        Self {
            kind: kind.into(),
            attrs: Attrs::default(),
            children,
        }
    }

    pub fn is(&self, kind: &str) -> bool {
        self.kind == kind
    }

    pub fn href(&self) -> Option<&str> {
        self.attrs.get("href").and_then(|v| v.as_str())
    }

    /// Concatenated text of the element's inline content.
    pub fn text(&self) -> String {
        crate::inline::inline_text(&self.children)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VoidNode {
    pub kind: ElementKind,
    #[serde(default)]
    pub attrs: Attrs,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextNode {
    pub text: String,
    #[serde(default)]
    pub marks: Marks,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Marks {
    #[serde(default)]
    pub bold: bool,
    #[serde(default)]
    pub italic: bool,
    #[serde(default)]
    pub underline: bool,
    #[serde(default)]
    pub strikethrough: bool,
    #[serde(default)]
    pub code: bool,
}

impl Marks {
    pub fn with(mut self, mark: MarkType) -> Self {
        self.set(mark, true);
        self
    }

    pub fn has(&self, mark: MarkType) -> bool {
        match mark {
            MarkType::Bold => self.bold,
            MarkType::Italic => self.italic,
            MarkType::Underline => self.underline,
            MarkType::Strikethrough => self.strikethrough,
            MarkType::Code => self.code,
        }
    }

    pub fn set(&mut self, mark: MarkType, value: bool) {
        let flag = match mark {
            MarkType::Bold => &mut self.bold,
            MarkType::Italic => &mut self.italic,
            MarkType::Underline => &mut self.underline,
            MarkType::Strikethrough => &mut self.strikethrough,
            MarkType::Code => &mut self.code,
        };
        *flag = value;
    }

    pub fn types(&self) -> impl Iterator<Item = MarkType> + '_ {
        MarkType::ALL.into_iter().filter(|mark| self.has(*mark))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Point {
    #[serde(default)]
    pub path: Path,
    pub offset: usize,
}

impl Point {
    pub fn new(path: Path, offset: usize) -> Self {
        Self { path, offset }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Selection {
    pub anchor: Point,
    pub focus: Point,
}

impl Selection {
    pub fn collapsed(point: Point) -> Self {
        Self {
            anchor: point.clone(),
            focus: point,
        }
    }

    pub fn range(anchor: Point, focus: Point) -> Self {
        Self { anchor, focus }
    }

    pub fn is_collapsed(&self) -> bool {
        self.anchor == self.focus
    }

    pub fn is_expanded(&self) -> bool {
        !self.is_collapsed()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorConfig {
    pub max_normalize_iterations: usize,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            max_normalize_iterations: 100,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ApplyError {
    #[error("Invalid path: {0}")]
    InvalidPath(#[from] PathError),
    #[error("Normalization did not converge after {0} iterations")]
    NormalizeDidNotConverge(usize),
}

#[derive(Debug, thiserror::Error)]
#[error("{0}")]
pub struct PathError(pub String);

pub(crate) fn apply_op_to(
    doc: &mut Document,
    selection: &mut Selection,
    op: Op,
) -> Result<(), ApplyError> {
    match op {
        Op::InsertText { path, offset, text } => {
            let text_node = node_text_mut(doc, &path)?;
            let offset = clamp_to_char_boundary(&text_node.text, offset);
            text_node.text.insert_str(offset, &text);
            transform_selection_insert_text(selection, &path, offset, text.len());
        }
        Op::InsertNode { path, node } => {
            insert_node(doc, &path, node)?;
            transform_selection_insert_node(selection, &path);
        }
        Op::RemoveNode { path } => {
            remove_node(doc, &path)?;
            transform_selection_remove_node(selection, &path);
        }
        Op::MergeNode { path } => {
            let position = merge_text_into_previous(doc, &path)?;
            transform_selection_merge_node(selection, &path, position);
        }
        Op::SetNodeKind { path, kind } => match node_mut(doc, &path)? {
            Node::Element(el) => el.kind = kind,
            Node::Void(v) => v.kind = kind,
            Node::Text(_) => return Err(PathError("Text has no kind".into()).into()),
        },
    }
    Ok(())
}

pub(crate) fn clamp_to_char_boundary(s: &str, mut ix: usize) -> usize {
    ix = ix.min(s.len());
    while ix > 0 && !s.is_char_boundary(ix) {
        ix -= 1;
    }
    ix
}

fn transform_selection_insert_text(
    selection: &mut Selection,
    path: &[usize],
    offset: usize,
    len: usize,
) {
    for point in [&mut selection.anchor, &mut selection.focus] {
        if point.path == path && point.offset >= offset {
            point.offset = point.offset.saturating_add(len);
        }
    }
}

fn transform_selection_insert_node(selection: &mut Selection, path: &[usize]) {
    let Some((index, parent_path)) = path.split_last() else {
        return;
    };

    for point in [&mut selection.anchor, &mut selection.focus] {
        if point.path.len() <= parent_path.len() || !point.path.starts_with(parent_path) {
            continue;
        }
        let depth = parent_path.len();
        if point.path[depth] >= *index {
            point.path[depth] += 1;
        }
    }
}

fn transform_selection_remove_node(selection: &mut Selection, path: &[usize]) {
    let Some((&index, parent_path)) = path.split_last() else {
        return;
    };

    for point in [&mut selection.anchor, &mut selection.focus] {
        if point.path.len() <= parent_path.len() || !point.path.starts_with(parent_path) {
            continue;
        }
        let depth = parent_path.len();
        let ix = point.path[depth];
        if ix > index {
            point.path[depth] = ix - 1;
        } else if ix == index {
            // Point was inside the removed subtree; selection normalization
            // resolves the truncated path to the nearest text leaf.
            point.path.truncate(depth + 1);
            point.path[depth] = index.saturating_sub(1);
            point.offset = 0;
        }
    }
}

fn transform_selection_merge_node(selection: &mut Selection, path: &[usize], position: usize) {
    let Some((&index, parent_path)) = path.split_last() else {
        return;
    };

    for point in [&mut selection.anchor, &mut selection.focus] {
        if point.path.len() <= parent_path.len() || !point.path.starts_with(parent_path) {
            continue;
        }
        let depth = parent_path.len();
        let ix = point.path[depth];
        if ix == index {
            point.path[depth] = index - 1;
            point.offset += position;
        } else if ix > index {
            point.path[depth] = ix - 1;
        }
    }
}

pub(crate) fn node_ref<'a>(doc: &'a Document, path: &[usize]) -> Option<&'a Node> {
    let (first, rest) = path.split_first()?;
    let mut node = doc.children.get(*first)?;
    for &ix in rest {
        node = match node {
            Node::Element(el) => el.children.get(ix)?,
            Node::Void(_) | Node::Text(_) => return None,
        };
    }
    Some(node)
}

pub(crate) fn element_ref<'a>(doc: &'a Document, path: &[usize]) -> Option<&'a ElementNode> {
    match node_ref(doc, path)? {
        Node::Element(el) => Some(el),
        Node::Text(_) | Node::Void(_) => None,
    }
}

/// Children of the element at `path`, or the document's top level for an empty path.
pub(crate) fn children_at<'a>(doc: &'a Document, path: &[usize]) -> Option<&'a [Node]> {
    if path.is_empty() {
        return Some(&doc.children);
    }
    element_ref(doc, path).map(|el| el.children.as_slice())
}

fn node_mut<'a>(doc: &'a mut Document, path: &[usize]) -> Result<&'a mut Node, PathError> {
    let (first, rest) = path
        .split_first()
        .ok_or_else(|| PathError("Empty path".into()))?;
    let len = doc.children.len();
    let mut node = doc
        .children
        .get_mut(*first)
        .ok_or_else(|| PathError(format!("Path out of bounds at depth 0: {first} >= {len}")))?;

    for (depth, &ix) in rest.iter().enumerate() {
        node = match node {
            Node::Element(el) => {
                let len = el.children.len();
                el.children.get_mut(ix).ok_or_else(|| {
                    PathError(format!(
                        "Path out of bounds at depth {}: {ix} >= {len}",
                        depth + 1
                    ))
                })?
            }
            Node::Void(_) | Node::Text(_) => {
                return Err(PathError(format!("Non-container node at depth {depth}")));
            }
        };
    }
    Ok(node)
}

fn node_text_mut<'a>(doc: &'a mut Document, path: &[usize]) -> Result<&'a mut TextNode, PathError> {
    match node_mut(doc, path)? {
        Node::Text(t) => Ok(t),
        _ => Err(PathError("Expected Text node".into())),
    }
}

fn children_mut<'a>(
    doc: &'a mut Document,
    parent_path: &[usize],
) -> Result<&'a mut Vec<Node>, PathError> {
    if parent_path.is_empty() {
        return Ok(&mut doc.children);
    }
    match node_mut(doc, parent_path)? {
        Node::Element(el) => Ok(&mut el.children),
        Node::Void(_) | Node::Text(_) => Err(PathError("Parent is not a container".into())),
    }
}

fn insert_node(doc: &mut Document, path: &[usize], node: Node) -> Result<(), PathError> {
    let (&index, parent_path) = path
        .split_last()
        .ok_or_else(|| PathError("Empty insert path".into()))?;

    let children = children_mut(doc, parent_path)?;
    if index > children.len() {
        return Err(PathError(format!(
            "Insert index out of bounds: {index} > {}",
            children.len()
        )));
    }
    children.insert(index, node);
    Ok(())
}

fn remove_node(doc: &mut Document, path: &[usize]) -> Result<Node, PathError> {
    let (&index, parent_path) = path
        .split_last()
        .ok_or_else(|| PathError("Empty remove path".into()))?;

    let children = children_mut(doc, parent_path)?;
    if index >= children.len() {
        return Err(PathError(format!(
            "Remove index out of bounds: {index} >= {}",
            children.len()
        )));
    }
    Ok(children.remove(index))
}

/// Appends the text leaf at `path` to its previous sibling and returns the
/// previous sibling's length before the merge.
fn merge_text_into_previous(doc: &mut Document, path: &[usize]) -> Result<usize, PathError> {
    let (&index, parent_path) = path
        .split_last()
        .ok_or_else(|| PathError("Empty merge path".into()))?;
    if index == 0 {
        return Err(PathError("Cannot merge the first child".into()));
    }

    let children = children_mut(doc, parent_path)?;
    match (children.get(index - 1), children.get(index)) {
        (Some(Node::Text(_)), Some(Node::Text(_))) => {}
        _ => return Err(PathError("Merge requires two adjacent text nodes".into())),
    }

    let Node::Text(right) = children.remove(index) else {
        return Err(PathError("Expected Text node".into()));
    };
    let Some(Node::Text(left)) = children.get_mut(index - 1) else {
        return Err(PathError("Expected Text node".into()));
    };
    let position = left.text.len();
    left.text.push_str(&right.text);
    Ok(position)
}
