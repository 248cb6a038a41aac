use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

use crate::core::{Document, ElementNode, Node, Point, Selection, element_ref, node_ref};
use crate::inline;
use crate::ops::Path;
use crate::plugin::{PluginRegistry, TextBlock, text_blocks_in_order};
use crate::schema::MarkType;
use crate::serde_value::MarkdownValue;
use crate::transform::{Transform, normalize};

/// An immutable editor snapshot. Every edit goes through [`EditorState::transform`]
/// and yields a new state; the old one is left untouched.
#[derive(Clone)]
pub struct EditorState {
    document: Document,
    selection: Selection,
    focused: bool,
    registry: Arc<PluginRegistry>,
}

impl EditorState {
    /// Builds a state from host-supplied content, normalizing the document
    /// against `registry` and snapping the selection onto text leaves.
    pub fn new(document: Document, selection: Selection, registry: Arc<PluginRegistry>) -> Self {
        let mut document = document;
        let mut selection = selection;
        if let Err(err) = normalize(&mut document, &mut selection, &registry) {
            tracing::warn!(error = %err, "initial document failed to normalize");
        }
        let selection = registry.normalize_selection(&document, &selection);

        Self {
            document,
            selection,
            focused: false,
            registry,
        }
    }

    pub fn empty(registry: Arc<PluginRegistry>) -> Self {
        Self::new(
            Document::default(),
            Selection::collapsed(Point::new(vec![0, 0], 0)),
            registry,
        )
    }

    /// Caret at the start of the first text leaf.
    pub fn from_document(document: Document, registry: Arc<PluginRegistry>) -> Self {
        Self::new(
            document,
            Selection::collapsed(Point::new(vec![0, 0], 0)),
            registry,
        )
    }

    pub fn from_value(value: MarkdownValue, registry: Arc<PluginRegistry>) -> Self {
        Self::from_document(value.into_document(), registry)
    }

    pub fn to_value(&self) -> MarkdownValue {
        MarkdownValue::from_document(self.document.clone())
    }

    pub(crate) fn from_parts(
        document: Document,
        selection: Selection,
        focused: bool,
        registry: Arc<PluginRegistry>,
    ) -> Self {
        Self {
            document,
            selection,
            focused,
            registry,
        }
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    pub fn registry(&self) -> &Arc<PluginRegistry> {
        &self.registry
    }

    pub fn is_focused(&self) -> bool {
        self.focused
    }

    pub fn is_blurred(&self) -> bool {
        !self.focused
    }

    pub fn is_collapsed(&self) -> bool {
        self.selection.is_collapsed()
    }

    pub fn is_expanded(&self) -> bool {
        !self.is_collapsed()
    }

    pub fn focus(&self) -> Self {
        Self {
            focused: true,
            ..self.clone()
        }
    }

    pub fn blur(&self) -> Self {
        Self {
            focused: false,
            ..self.clone()
        }
    }

    /// Moves the selection. Empty leaves that only the old caret held are
    /// dropped.
    pub fn with_selection(&self, selection: Selection) -> Self {
        Self {
            focused: self.focused,
            ..Self::new(self.document.clone(), selection, self.registry.clone())
        }
    }

    pub fn transform(&self) -> Transform {
        Transform::new(
            self.document.clone(),
            self.selection.clone(),
            self.focused,
            self.registry.clone(),
        )
    }

    pub fn text_blocks(&self) -> Vec<TextBlock<'_>> {
        text_blocks_in_order(&self.document, &self.registry)
    }

    /// Text blocks from the start block to the end block of the selection.
    pub fn blocks(&self) -> Vec<TextBlock<'_>> {
        let mut blocks = self.text_blocks();
        let Some((start, end)) = ordered_points(&blocks, &self.selection) else {
            return Vec::new();
        };
        blocks.truncate(end.0.block + 1);
        blocks.drain(..start.0.block);
        blocks
    }

    pub fn start_block(&self) -> Option<TextBlock<'_>> {
        self.blocks().into_iter().next()
    }

    pub fn end_block(&self) -> Option<TextBlock<'_>> {
        self.blocks().into_iter().last()
    }

    /// Offset of the selection start within the start block.
    pub fn start_offset(&self) -> usize {
        ordered_points(&self.text_blocks(), &self.selection)
            .map(|(start, _)| start.0.offset)
            .unwrap_or(0)
    }

    pub fn end_offset(&self) -> usize {
        ordered_points(&self.text_blocks(), &self.selection)
            .map(|(_, end)| end.0.offset)
            .unwrap_or(0)
    }

    pub fn marks(&self) -> BTreeSet<MarkType> {
        selection_marks(&self.document, &self.selection, &self.registry)
    }

    pub fn inlines(&self) -> Vec<(Path, &ElementNode)> {
        inlines_in_selection(&self.document, &self.selection, &self.registry)
    }

    /// Nearest ancestor element of the node at `path` matching `pred`.
    pub fn closest(
        &self,
        path: &[usize],
        pred: impl Fn(&ElementNode) -> bool,
    ) -> Option<(Path, &ElementNode)> {
        (1..path.len()).rev().find_map(|len| {
            let el = element_ref(&self.document, &path[..len])?;
            pred(el).then(|| (path[..len].to_vec(), el))
        })
    }
}

impl fmt::Debug for EditorState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EditorState")
            .field("document", &self.document)
            .field("selection", &self.selection)
            .field("focused", &self.focused)
            .finish_non_exhaustive()
    }
}

impl PartialEq for EditorState {
    fn eq(&self, other: &Self) -> bool {
        self.document == other.document
            && self.selection == other.selection
            && self.focused == other.focused
    }
}

/// A point as (text block ordinal, offset within the block's inline text).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub(crate) struct ResolvedPoint {
    pub block: usize,
    pub offset: usize,
}

pub(crate) fn resolve_point(blocks: &[TextBlock<'_>], point: &Point) -> Option<ResolvedPoint> {
    blocks.iter().enumerate().find_map(|(ix, block)| {
        let rel = point.path.strip_prefix(block.path.as_slice())?;
        let offset = inline::offset_of(&block.element.children, rel, point.offset)?;
        Some(ResolvedPoint { block: ix, offset })
    })
}

/// Selection endpoints in document order; ties keep the anchor first.
pub(crate) fn ordered_points<'s>(
    blocks: &[TextBlock<'_>],
    selection: &'s Selection,
) -> Option<((ResolvedPoint, &'s Point), (ResolvedPoint, &'s Point))> {
    let anchor = resolve_point(blocks, &selection.anchor)?;
    let focus = resolve_point(blocks, &selection.focus)?;
    if focus < anchor {
        Some(((focus, &selection.focus), (anchor, &selection.anchor)))
    } else {
        Some(((anchor, &selection.anchor), (focus, &selection.focus)))
    }
}

pub(crate) fn selection_marks(
    doc: &Document,
    selection: &Selection,
    registry: &PluginRegistry,
) -> BTreeSet<MarkType> {
    if selection.is_collapsed() {
        return match node_ref(doc, &selection.focus.path) {
            Some(Node::Text(t)) => t.marks.types().collect(),
            _ => BTreeSet::new(),
        };
    }

    let blocks = text_blocks_in_order(doc, registry);
    let Some(((start, _), (end, _))) = ordered_points(&blocks, selection) else {
        return BTreeSet::new();
    };

    let mut marks = BTreeSet::new();
    for (ix, block) in blocks.iter().enumerate().take(end.block + 1).skip(start.block) {
        let lo = if ix == start.block { start.offset } else { 0 };
        let hi = if ix == end.block { end.offset } else { block.len() };
        for leaf in inline::leaves(&block.element.children) {
            if leaf.start < hi && leaf.end() > lo {
                marks.extend(leaf.node.marks.types());
            }
        }
    }
    marks
}

/// Inline elements holding any text leaf from the start point's leaf through
/// the end point's leaf.
pub(crate) fn inlines_in_selection<'a>(
    doc: &'a Document,
    selection: &Selection,
    registry: &PluginRegistry,
) -> Vec<(Path, &'a ElementNode)> {
    let blocks = text_blocks_in_order(doc, registry);
    let Some(((start, start_point), (end, end_point))) = ordered_points(&blocks, selection)
    else {
        return Vec::new();
    };

    let mut leaf_paths: Vec<(Path, usize)> = Vec::new();
    for block in &blocks[start.block..=end.block] {
        for leaf in inline::leaves(&block.element.children) {
            let mut path = block.path.clone();
            path.extend_from_slice(&leaf.rel);
            leaf_paths.push((path, leaf.rel.len()));
        }
    }

    let first = leaf_paths
        .iter()
        .position(|(path, _)| *path == start_point.path)
        .unwrap_or(0);
    let last = leaf_paths
        .iter()
        .rposition(|(path, _)| *path == end_point.path)
        .unwrap_or(leaf_paths.len().saturating_sub(1));

    let mut out: Vec<(Path, &ElementNode)> = Vec::new();
    for (path, depth) in leaf_paths.get(first..=last).unwrap_or(&[]) {
        if *depth < 2 {
            continue;
        }
        let parent = &path[..path.len() - 1];
        if out.iter().any(|(seen, _)| seen.as_slice() == parent) {
            continue;
        }
        if let Some(el) = element_ref(doc, parent) {
            out.push((parent.to_vec(), el));
        }
    }
    out
}
