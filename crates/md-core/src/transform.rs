use std::sync::Arc;

use crate::core::{
    ApplyError, Attrs, Document, ElementNode, Node, Point, Selection, apply_op_to, children_at,
    element_ref,
};
use crate::inline::{self, Affinity, Inlines, Segment};
use crate::ops::{Op, Path, Transaction};
use crate::plugin::{PluginRegistry, text_blocks_in_order};
use crate::schema::{BlockType, InlineType, MarkType};
use crate::state::{
    EditorState, ResolvedPoint, inlines_in_selection, ordered_points, resolve_point,
    selection_marks,
};

#[derive(Debug, thiserror::Error)]
pub enum TransformError {
    #[error(transparent)]
    Apply(#[from] ApplyError),
    #[error("Selection does not resolve to a text block")]
    SelectionOutsideText,
}

/// Runs the registry's normalize passes until none reports work. Returns the
/// ops that were applied.
pub(crate) fn normalize(
    document: &mut Document,
    selection: &mut Selection,
    registry: &PluginRegistry,
) -> Result<Vec<Op>, ApplyError> {
    let max = registry.config().max_normalize_iterations;
    let mut applied = Vec::new();
    for _ in 0..max {
        let ops = registry.normalize(document, selection);
        if ops.is_empty() {
            return Ok(applied);
        }
        for op in ops {
            apply_op_to(document, selection, op.clone())?;
            applied.push(op);
        }
    }
    if registry.normalize(document, selection).is_empty() {
        return Ok(applied);
    }
    Err(ApplyError::NormalizeDidNotConverge(max))
}

/// A block-relative position that survives the block being moved.
#[derive(Debug, Clone)]
struct BlockPoint {
    block: usize,
    rel: Path,
    offset: usize,
}

/// Chained edit against a copy of an [`EditorState`]. Nothing is normalized
/// until [`Transform::apply`].
pub struct Transform {
    document: Document,
    selection: Selection,
    focused: bool,
    registry: Arc<PluginRegistry>,
    tx: Transaction,
}

impl Transform {
    pub(crate) fn new(
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
            tx: Transaction::default(),
        }
    }

    pub fn source(mut self, source: impl Into<String>) -> Self {
        self.tx = self.tx.source(source);
        self
    }

    pub fn transaction(&self) -> &Transaction {
        &self.tx
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    pub fn set_block(mut self, kind: BlockType) -> Result<Self, TransformError> {
        let (start, end) = self.range()?;
        for path in self.block_paths(start.block, end.block) {
            let current = element_ref(&self.document, &path).map(|el| el.kind.as_str());
            if current != Some(kind.as_str()) {
                self.push(Op::SetNodeKind {
                    path,
                    kind: kind.as_str().to_string(),
                })?;
            }
        }
        Ok(self)
    }

    /// Wraps the children of the selected blocks' common ancestor that hold
    /// those blocks in a new `kind` element.
    pub fn wrap_block(mut self, kind: BlockType) -> Result<Self, TransformError> {
        let (start, end) = self.range()?;
        let saved = self.capture()?;
        let paths = self.block_paths(start.block, end.block);
        let (Some(first), Some(last)) = (paths.first(), paths.last()) else {
            return Err(TransformError::SelectionOutsideText);
        };

        let mut depth = 0;
        while depth + 1 < first.len() && depth + 1 < last.len() && first[depth] == last[depth] {
            depth += 1;
        }
        let parent = first[..depth].to_vec();
        let (lo, hi) = (first[depth], last[depth]);

        let siblings = children_at(&self.document, &parent)
            .ok_or(TransformError::SelectionOutsideText)?;
        let wrapped: Vec<Node> = siblings
            .get(lo..=hi)
            .ok_or(TransformError::SelectionOutsideText)?
            .to_vec();

        for ix in (lo..=hi).rev() {
            self.push(Op::RemoveNode {
                path: child_path(&parent, ix),
            })?;
        }
        self.push(Op::InsertNode {
            path: child_path(&parent, lo),
            node: Node::Element(ElementNode::new(kind.as_str(), wrapped)),
        })?;

        self.restore(saved)?;
        Ok(self)
    }

    /// Lifts the selected blocks out of every `kind` ancestor, splitting the
    /// ancestor around them when it holds unselected children too.
    pub fn unwrap_block(mut self, kind: BlockType) -> Result<Self, TransformError> {
        let (start, end) = self.range()?;
        let saved = self.capture()?;

        loop {
            let paths = self.block_paths(start.block, end.block);
            let wrapper = paths
                .iter()
                .filter_map(|path| self.closest_kind(path, kind.as_str()))
                .max_by(|a, b| a.len().cmp(&b.len()).then_with(|| a.cmp(b)));
            let Some(wrapper_path) = wrapper else {
                break;
            };

            let Some(wrapper) = element_ref(&self.document, &wrapper_path).cloned() else {
                break;
            };
            let depth = wrapper_path.len();
            let selected: Vec<usize> = paths
                .iter()
                .filter(|path| path.len() > depth && path.starts_with(&wrapper_path))
                .map(|path| path[depth])
                .collect();
            let (Some(&lo), Some(&hi)) = (selected.iter().min(), selected.iter().max()) else {
                break;
            };

            let before = wrapper.children[..lo].to_vec();
            let middle = wrapper.children[lo..=hi].to_vec();
            let after = wrapper.children[hi + 1..].to_vec();

            let Some((&at, parent)) = wrapper_path.split_last() else {
                break;
            };
            let parent = parent.to_vec();
            self.push(Op::RemoveNode {
                path: wrapper_path.clone(),
            })?;

            let mut replacement = Vec::new();
            if !before.is_empty() {
                replacement.push(Node::Element(ElementNode {
                    children: before,
                    ..wrapper.clone()
                }));
            }
            replacement.extend(middle);
            if !after.is_empty() {
                replacement.push(Node::Element(ElementNode {
                    children: after,
                    ..wrapper
                }));
            }
            for (ix, node) in replacement.into_iter().enumerate() {
                self.push(Op::InsertNode {
                    path: child_path(&parent, at + ix),
                    node,
                })?;
            }
        }

        self.restore(saved)?;
        Ok(self)
    }

    pub fn wrap_inline(mut self, kind: InlineType, attrs: Attrs) -> Result<Self, TransformError> {
        if self.selection.is_collapsed() {
            return Ok(self);
        }
        let (start, end) = self.range()?;
        let paths = self.block_paths(start.block, end.block);

        for (ix, path) in paths.iter().enumerate() {
            let block = start.block + ix;
            let (lo, hi) = self.block_bounds(block, start, end, path);
            if lo >= hi {
                continue;
            }
            let mut inlines = self.inlines_of(path);
            let s = inlines.split_at(lo);
            let e = inlines.split_at(hi);
            let id = inlines.add_link(ElementNode {
                kind: kind.as_str().to_string(),
                attrs: attrs.clone(),
                children: Vec::new(),
            });
            for segment in &mut inlines.segments[s..e] {
                if let Segment::Text { link, .. } = segment {
                    *link = Some(id);
                }
            }
            self.replace_children(path, inlines.into_children())?;
        }

        self.selection = Selection::range(
            self.point_for(start, Affinity::Forward)?,
            self.point_for(end, Affinity::Backward)?,
        );
        Ok(self)
    }

    pub fn unwrap_inline(mut self, kind: InlineType) -> Result<Self, TransformError> {
        let (start, end) = self.range()?;
        let collapsed = self.selection.is_collapsed();

        let targets: Vec<Path> =
            inlines_in_selection(&self.document, &self.selection, &self.registry)
                .into_iter()
                .filter(|(_, el)| el.is(kind.as_str()))
                .map(|(path, _)| path)
                .collect();
        if targets.is_empty() {
            return Ok(self);
        }

        let mut by_block: Vec<(Path, Vec<usize>)> = Vec::new();
        for path in targets {
            let Some((&ix, block)) = path.split_last() else {
                continue;
            };
            match by_block.iter_mut().find(|(b, _)| b.as_slice() == block) {
                Some((_, ixs)) => ixs.push(ix),
                None => by_block.push((block.to_vec(), vec![ix])),
            }
        }

        for (block_path, ixs) in by_block {
            let Some(block) = element_ref(&self.document, &block_path) else {
                continue;
            };
            let mut children = Vec::with_capacity(block.children.len());
            for (ix, child) in block.children.iter().enumerate() {
                match child {
                    Node::Element(el) if ixs.contains(&ix) => {
                        children.extend(el.children.iter().cloned())
                    }
                    other => children.push(other.clone()),
                }
            }
            self.replace_children(&block_path, children)?;
        }

        self.restore_range(start, end, collapsed)?;
        Ok(self)
    }

    /// Removes `mark` when any selected text carries it, adds it otherwise. On
    /// a caret the toggled marks apply to the next text typed.
    pub fn toggle_mark(mut self, mark: MarkType) -> Result<Self, TransformError> {
        let active =
            selection_marks(&self.document, &self.selection, &self.registry).contains(&mark);
        let (start, end) = self.range()?;
        let paths = self.block_paths(start.block, end.block);

        if self.selection.is_collapsed() {
            let Some(path) = paths.first() else {
                return Err(TransformError::SelectionOutsideText);
            };
            let mut inlines = self.inlines_of(path);
            let at = inlines.split_at(start.offset);
            let (mut marks, link) = inlines.context_at(at);
            marks.set(mark, !active);
            inlines.segments.insert(
                at,
                Segment::Text {
                    text: String::new(),
                    marks,
                    link,
                },
            );
            let leaf_ix = inlines.text_count(at);
            let children = inlines.into_children();
            let rel = inline::leaves(&children)
                .get(leaf_ix)
                .map(|leaf| leaf.rel.clone())
                .ok_or(TransformError::SelectionOutsideText)?;
            self.replace_children(path, children)?;

            let mut caret = path.clone();
            caret.extend(rel);
            self.selection = Selection::collapsed(Point::new(caret, 0));
            return Ok(self);
        }

        for (ix, path) in paths.iter().enumerate() {
            let block = start.block + ix;
            let (lo, hi) = self.block_bounds(block, start, end, path);
            if lo >= hi {
                continue;
            }
            let mut inlines = self.inlines_of(path);
            let s = inlines.split_at(lo);
            let e = inlines.split_at(hi);
            for segment in &mut inlines.segments[s..e] {
                if let Segment::Text { marks, .. } = segment {
                    marks.set(mark, !active);
                }
            }
            self.replace_children(path, inlines.into_children())?;
        }

        self.restore_range(start, end, false)?;
        Ok(self)
    }

    /// Inserts at the focus, replacing an expanded selection.
    pub fn insert_text(mut self, text: &str) -> Result<Self, TransformError> {
        if self.selection.is_expanded() {
            self = self.delete()?;
        }
        if text.is_empty() {
            return Ok(self);
        }
        let focus = self.selection.focus.clone();
        self.push(Op::InsertText {
            path: focus.path,
            offset: focus.offset,
            text: text.to_string(),
        })?;
        Ok(self)
    }

    /// Deletes the selected content and collapses onto the start. Blocks
    /// fully inside the selection are removed; the end block's remaining text
    /// joins the start block.
    pub fn delete(mut self) -> Result<Self, TransformError> {
        if self.selection.is_collapsed() {
            return Ok(self);
        }
        let (start, end) = self.range()?;
        let paths = self.block_paths(start.block, end.block);
        let (Some(first), Some(last)) = (paths.first().cloned(), paths.last().cloned()) else {
            return Err(TransformError::SelectionOutsideText);
        };

        if start.block == end.block {
            let mut inlines = self.inlines_of(&first);
            let s = inlines.split_at(start.offset);
            let e = inlines.split_at(end.offset);
            inlines.segments.drain(s..e);
            self.replace_children(&first, inlines.into_children())?;
        } else {
            let mut head = self.inlines_of(&first);
            let s = head.split_at(start.offset);
            head.split_off(s);

            let mut tail = self.inlines_of(&last);
            let e = tail.split_at(end.offset);
            head.append(tail.split_off(e));

            for path in paths[1..].iter().rev() {
                self.push(Op::RemoveNode { path: path.clone() })?;
            }
            self.replace_children(&first, head.into_children())?;
        }

        let caret = self.point_for(start, Affinity::Backward)?;
        self.selection = Selection::collapsed(caret);
        Ok(self)
    }

    /// Moves the focus `n` bytes back within its block.
    pub fn extend_backward(mut self, n: usize) -> Result<Self, TransformError> {
        let blocks = text_blocks_in_order(&self.document, &self.registry);
        let focus = resolve_point(&blocks, &self.selection.focus)
            .ok_or(TransformError::SelectionOutsideText)?;
        drop(blocks);
        let target = ResolvedPoint {
            block: focus.block,
            offset: focus.offset.saturating_sub(n),
        };
        self.selection.focus = self.point_for(target, Affinity::Forward)?;
        Ok(self)
    }

    pub fn extend_to_start_of_block(mut self) -> Result<Self, TransformError> {
        let (start, _) = self.range()?;
        let target = ResolvedPoint {
            block: start.block,
            offset: 0,
        };
        self.selection.focus = self.point_for(target, Affinity::Forward)?;
        Ok(self)
    }

    /// Splits the focus block at the caret into two blocks of the same kind
    /// and moves the caret to the start of the second.
    pub fn split_block(mut self) -> Result<Self, TransformError> {
        if self.selection.is_expanded() {
            self = self.delete()?;
        }
        let (at, _) = self.range()?;
        let path = self
            .block_paths(at.block, at.block)
            .pop()
            .ok_or(TransformError::SelectionOutsideText)?;
        let block = element_ref(&self.document, &path)
            .cloned()
            .ok_or(TransformError::SelectionOutsideText)?;

        let mut head = Inlines::from_children(&block.children);
        let ix = head.split_at(at.offset);
        let tail = head.split_off(ix);

        self.replace_children(&path, head.into_children())?;
        let mut next = path.clone();
        if let Some(last) = next.last_mut() {
            *last += 1;
        }
        self.push(Op::InsertNode {
            path: next,
            node: Node::Element(ElementNode {
                children: tail.into_children(),
                ..block
            }),
        })?;

        let caret = self.point_for(
            ResolvedPoint {
                block: at.block + 1,
                offset: 0,
            },
            Affinity::Forward,
        )?;
        self.selection = Selection::collapsed(caret);
        Ok(self)
    }

    pub fn collapse_to_start(mut self) -> Result<Self, TransformError> {
        let start = self.ordered()?.0;
        self.selection = Selection::collapsed(start);
        Ok(self)
    }

    pub fn collapse_to_end(mut self) -> Result<Self, TransformError> {
        let end = self.ordered()?.1;
        self.selection = Selection::collapsed(end);
        Ok(self)
    }

    pub fn focus(mut self) -> Self {
        self.focused = true;
        self
    }

    pub fn blur(mut self) -> Self {
        self.focused = false;
        self
    }

    pub fn apply(mut self) -> Result<EditorState, TransformError> {
        let normalized = normalize(&mut self.document, &mut self.selection, &self.registry)?;
        self.tx.ops.extend(normalized);
        let selection = self
            .registry
            .normalize_selection(&self.document, &self.selection);

        tracing::debug!(
            source = self.tx.meta.source.as_deref().unwrap_or("unknown"),
            ops = self.tx.ops.len(),
            "applied transform"
        );

        Ok(EditorState::from_parts(
            self.document,
            selection,
            self.focused,
            self.registry,
        ))
    }

    fn push(&mut self, op: Op) -> Result<(), TransformError> {
        tracing::trace!(op = op.name(), path = ?op.path(), "push op");
        apply_op_to(&mut self.document, &mut self.selection, op.clone())?;
        self.tx.ops.push(op);
        Ok(())
    }

    fn range(&self) -> Result<(ResolvedPoint, ResolvedPoint), TransformError> {
        let blocks = text_blocks_in_order(&self.document, &self.registry);
        let ((start, _), (end, _)) = ordered_points(&blocks, &self.selection)
            .ok_or(TransformError::SelectionOutsideText)?;
        Ok((start, end))
    }

    fn ordered(&self) -> Result<(Point, Point), TransformError> {
        let blocks = text_blocks_in_order(&self.document, &self.registry);
        let ((_, start), (_, end)) = ordered_points(&blocks, &self.selection)
            .ok_or(TransformError::SelectionOutsideText)?;
        Ok((start.clone(), end.clone()))
    }

    fn block_paths(&self, first: usize, last: usize) -> Vec<Path> {
        text_blocks_in_order(&self.document, &self.registry)
            .into_iter()
            .skip(first)
            .take(last.saturating_sub(first).saturating_add(1))
            .map(|block| block.path)
            .collect()
    }

    fn block_bounds(
        &self,
        block: usize,
        start: ResolvedPoint,
        end: ResolvedPoint,
        path: &[usize],
    ) -> (usize, usize) {
        let lo = if block == start.block { start.offset } else { 0 };
        let hi = if block == end.block {
            end.offset
        } else {
            element_ref(&self.document, path)
                .map(|el| inline::inline_len(&el.children))
                .unwrap_or(0)
        };
        (lo, hi)
    }

    fn inlines_of(&self, path: &[usize]) -> Inlines {
        element_ref(&self.document, path)
            .map(|el| Inlines::from_children(&el.children))
            .unwrap_or_default()
    }

    fn closest_kind(&self, path: &[usize], kind: &str) -> Option<Path> {
        (1..path.len())
            .rev()
            .find(|&len| {
                element_ref(&self.document, &path[..len]).is_some_and(|el| el.is(kind))
            })
            .map(|len| path[..len].to_vec())
    }

    fn point_for(&self, at: ResolvedPoint, affinity: Affinity) -> Result<Point, TransformError> {
        let blocks = text_blocks_in_order(&self.document, &self.registry);
        let block = blocks
            .get(at.block)
            .ok_or(TransformError::SelectionOutsideText)?;
        Ok(inline::point_at(
            &block.path,
            &block.element.children,
            at.offset,
            affinity,
        ))
    }

    fn restore_range(
        &mut self,
        start: ResolvedPoint,
        end: ResolvedPoint,
        collapsed: bool,
    ) -> Result<(), TransformError> {
        self.selection = if collapsed {
            Selection::collapsed(self.point_for(start, Affinity::Backward)?)
        } else {
            Selection::range(
                self.point_for(start, Affinity::Forward)?,
                self.point_for(end, Affinity::Backward)?,
            )
        };
        Ok(())
    }

    fn capture(&self) -> Result<[BlockPoint; 2], TransformError> {
        let blocks = text_blocks_in_order(&self.document, &self.registry);
        let capture = |point: &Point| -> Result<BlockPoint, TransformError> {
            blocks
                .iter()
                .enumerate()
                .find_map(|(block, b)| {
                    let rel = point.path.strip_prefix(b.path.as_slice())?;
                    Some(BlockPoint {
                        block,
                        rel: rel.to_vec(),
                        offset: point.offset,
                    })
                })
                .ok_or(TransformError::SelectionOutsideText)
        };
        Ok([capture(&self.selection.anchor)?, capture(&self.selection.focus)?])
    }

    fn restore(&mut self, saved: [BlockPoint; 2]) -> Result<(), TransformError> {
        let paths = self.block_paths(0, usize::MAX);
        let [anchor, focus] = saved.map(|point| {
            paths.get(point.block).map(|path| {
                let mut full = path.clone();
                full.extend(point.rel);
                Point::new(full, point.offset)
            })
        });
        match (anchor, focus) {
            (Some(anchor), Some(focus)) => {
                self.selection = Selection::range(anchor, focus);
                Ok(())
            }
            _ => Err(TransformError::SelectionOutsideText),
        }
    }

    fn replace_children(
        &mut self,
        path: &[usize],
        children: Vec<Node>,
    ) -> Result<(), TransformError> {
        let existing = element_ref(&self.document, path)
            .map(|el| el.children.len())
            .ok_or(TransformError::SelectionOutsideText)?;
        for ix in (0..existing).rev() {
            self.push(Op::RemoveNode {
                path: child_path(path, ix),
            })?;
        }
        for (ix, node) in children.into_iter().enumerate() {
            self.push(Op::InsertNode {
                path: child_path(path, ix),
                node,
            })?;
        }
        Ok(())
    }
}

fn child_path(parent: &[usize], ix: usize) -> Path {
    let mut path = parent.to_vec();
    path.push(ix);
    path
}
