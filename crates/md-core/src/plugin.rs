use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::core::{Document, EditorConfig, ElementNode, Node, Point, Selection, node_ref};
use crate::key::KeyEvent;
use crate::ops::{Op, Path};
use crate::schema::{BlockType, IMAGE_KIND, InlineType};
use crate::state::EditorState;
use crate::transform::TransformError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum NodeRole {
    Block,
    Inline,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChildConstraint {
    None,
    BlockOnly,
    InlineOnly,
    Any,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeSpec {
    pub kind: String,
    pub role: NodeRole,
    pub is_void: bool,
    pub children: ChildConstraint,
}

pub trait NormalizePass: Send + Sync {
    fn id(&self) -> &'static str;
    fn run(&self, doc: &Document, registry: &PluginRegistry) -> Vec<Op>;

    /// Like [`NormalizePass::run`], for passes that must leave the leaves
    /// under the selection alone.
    fn run_at(
        &self,
        doc: &Document,
        selection: &Selection,
        registry: &PluginRegistry,
    ) -> Vec<Op> {
        let _ = selection;
        self.run(doc, registry)
    }
}

/// Consulted on key down before the editing surface applies its default
/// behaviour. `Ok(None)` lets the default proceed; `Ok(Some(state))`
/// suppresses it and commits `state`.
pub trait KeyHandler: Send + Sync {
    fn id(&self) -> &'static str;
    fn on_key_down(
        &self,
        event: &KeyEvent,
        state: &EditorState,
    ) -> Result<Option<EditorState>, TransformError>;
}

pub trait PlatePlugin: Send + Sync {
    fn id(&self) -> &'static str;
    fn node_specs(&self) -> Vec<NodeSpec> {
        Vec::new()
    }
    fn normalize_passes(&self) -> Vec<Box<dyn NormalizePass>> {
        Vec::new()
    }
    fn key_handlers(&self) -> Vec<Box<dyn KeyHandler>> {
        Vec::new()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("Duplicate node spec kind: {0}")]
    DuplicateNodeKind(String),
    #[error("Duplicate key handler id: {0}")]
    DuplicateKeyHandler(&'static str),
}

#[derive(Default)]
pub struct PluginRegistry {
    node_specs: HashMap<String, NodeSpec>,
    normalize_passes: Vec<Box<dyn NormalizePass>>,
    key_handlers: Vec<Box<dyn KeyHandler>>,
    config: EditorConfig,
}

pub fn core_plugins() -> Vec<Box<dyn PlatePlugin>> {
    vec![Box::new(SchemaPlugin), Box::new(CoreNormalizePlugin)]
}

impl PluginRegistry {
    pub fn new(
        plugins: impl IntoIterator<Item = Box<dyn PlatePlugin>>,
    ) -> Result<Self, RegistryError> {
        let mut registry = Self::default();
        for plugin in plugins {
            registry.register_plugin(plugin)?;
        }
        Ok(registry)
    }

    /// Schema and normalization, without any keyboard behaviour.
    pub fn core() -> Self {
        let mut registry = Self::default();
        for plugin in core_plugins() {
            for spec in plugin.node_specs() {
                registry.node_specs.insert(spec.kind.clone(), spec);
            }
            registry.normalize_passes.extend(plugin.normalize_passes());
        }
        registry
    }

    pub fn with_config(mut self, config: EditorConfig) -> Self {
        self.config = config;
        self
    }

    pub fn register_plugin(&mut self, plugin: Box<dyn PlatePlugin>) -> Result<(), RegistryError> {
        for spec in plugin.node_specs() {
            if self.node_specs.contains_key(&spec.kind) {
                return Err(RegistryError::DuplicateNodeKind(spec.kind));
            }
            self.node_specs.insert(spec.kind.clone(), spec);
        }

        self.normalize_passes.extend(plugin.normalize_passes());

        for handler in plugin.key_handlers() {
            if self.key_handlers.iter().any(|h| h.id() == handler.id()) {
                return Err(RegistryError::DuplicateKeyHandler(handler.id()));
            }
            self.key_handlers.push(handler);
        }

        tracing::trace!(plugin = plugin.id(), "registered plugin");
        Ok(())
    }

    pub fn config(&self) -> &EditorConfig {
        &self.config
    }

    pub fn spec(&self, kind: &str) -> Option<&NodeSpec> {
        self.node_specs.get(kind)
    }

    pub fn key_handlers(&self) -> &[Box<dyn KeyHandler>] {
        &self.key_handlers
    }

    /// Ops of the first pass that still finds something to fix. Passes are
    /// re-run by the caller until none does.
    pub fn normalize(&self, doc: &Document, selection: &Selection) -> Vec<Op> {
        for pass in &self.normalize_passes {
            let ops = pass.run_at(doc, selection, self);
            if !ops.is_empty() {
                tracing::trace!(pass = pass.id(), ops = ops.len(), "normalize pass");
                return ops;
            }
        }
        Vec::new()
    }

    pub fn normalize_selection(&self, doc: &Document, selection: &Selection) -> Selection {
        let fallback = first_text_point(doc).unwrap_or(Point {
            path: vec![0],
            offset: 0,
        });

        let anchor =
            normalize_point_to_existing_text(doc, &selection.anchor).unwrap_or_else(|| {
                normalize_point_to_existing_text(doc, &selection.focus)
                    .unwrap_or_else(|| fallback.clone())
            });
        let focus = normalize_point_to_existing_text(doc, &selection.focus)
            .unwrap_or_else(|| anchor.clone());

        Selection { anchor, focus }
    }

    fn child_constraint(&self, el: &ElementNode) -> ChildConstraint {
        self.spec(&el.kind)
            .map(|s| s.children.clone())
            .unwrap_or_else(|| {
                if el
                    .children
                    .iter()
                    .any(|n| matches!(n, Node::Text(_) | Node::Void(_)))
                {
                    ChildConstraint::InlineOnly
                } else {
                    ChildConstraint::Any
                }
            })
    }
}

fn first_text_point(doc: &Document) -> Option<Point> {
    let mut path = Vec::new();
    first_text_descendant(&doc.children, &mut path)
}

fn first_text_descendant(children: &[Node], path: &mut Vec<usize>) -> Option<Point> {
    for (ix, node) in children.iter().enumerate() {
        path.push(ix);
        match node {
            Node::Text(_) => {
                let point = Point {
                    path: path.clone(),
                    offset: 0,
                };
                path.pop();
                return Some(point);
            }
            Node::Element(el) => {
                if let Some(point) = first_text_descendant(&el.children, path) {
                    path.pop();
                    return Some(point);
                }
            }
            Node::Void(_) => {}
        }
        path.pop();
    }
    None
}

fn normalize_point_to_existing_text(doc: &Document, point: &Point) -> Option<Point> {
    if point.path.is_empty() || doc.children.is_empty() {
        return None;
    }

    let mut resolved_path: Vec<usize> = Vec::new();
    let mut children: &[Node] = &doc.children;

    for &wanted in &point.path {
        if children.is_empty() {
            break;
        }
        let ix = wanted.min(children.len() - 1);
        resolved_path.push(ix);
        match &children[ix] {
            Node::Text(t) => {
                return Some(Point {
                    path: resolved_path,
                    offset: point.offset.min(t.text.len()),
                });
            }
            Node::Element(el) => {
                children = &el.children;
            }
            Node::Void(_) => {
                break;
            }
        }
    }

    match node_ref(doc, &resolved_path)? {
        Node::Text(t) => Some(Point {
            path: resolved_path,
            offset: point.offset.min(t.text.len()),
        }),
        Node::Element(el) => first_text_descendant(&el.children, &mut resolved_path),
        Node::Void(_) => None,
    }
}

/// A block whose children are inline content.
#[derive(Debug, Clone)]
pub struct TextBlock<'a> {
    pub path: Path,
    pub element: &'a ElementNode,
}

impl TextBlock<'_> {
    pub fn kind(&self) -> &str {
        &self.element.kind
    }

    pub fn block_type(&self) -> Option<BlockType> {
        BlockType::from_kind(&self.element.kind)
    }

    pub fn text(&self) -> String {
        self.element.text()
    }

    pub fn len(&self) -> usize {
        crate::inline::inline_len(&self.element.children)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

pub fn element_is_text_block(el: &ElementNode, registry: &PluginRegistry) -> bool {
    match registry.spec(&el.kind) {
        Some(spec) => {
            spec.role == NodeRole::Block && spec.children == ChildConstraint::InlineOnly
        }
        None => el
            .children
            .iter()
            .any(|n| matches!(n, Node::Text(_) | Node::Void(_))),
    }
}

pub fn text_blocks_in_order<'a>(
    doc: &'a Document,
    registry: &PluginRegistry,
) -> Vec<TextBlock<'a>> {
    fn walk<'a>(
        nodes: &'a [Node],
        path: &mut Vec<usize>,
        registry: &PluginRegistry,
        out: &mut Vec<TextBlock<'a>>,
    ) {
        for (ix, node) in nodes.iter().enumerate() {
            let Node::Element(el) = node else {
                continue;
            };

            path.push(ix);

            if element_is_text_block(el, registry) {
                out.push(TextBlock {
                    path: path.clone(),
                    element: el,
                });
            } else {
                walk(&el.children, path, registry, out);
            }

            path.pop();
        }
    }

    let mut out = Vec::new();
    walk(&doc.children, &mut Vec::new(), registry, &mut out);
    out
}

struct SchemaPlugin;

impl PlatePlugin for SchemaPlugin {
    fn id(&self) -> &'static str {
        "core.schema"
    }

    fn node_specs(&self) -> Vec<NodeSpec> {
        let mut specs: Vec<NodeSpec> = BlockType::ALL
            .into_iter()
            .map(|block| NodeSpec {
                kind: block.as_str().to_string(),
                role: NodeRole::Block,
                is_void: false,
                children: if block.is_list_container() {
                    ChildConstraint::BlockOnly
                } else {
                    ChildConstraint::InlineOnly
                },
            })
            .collect();
        specs.push(NodeSpec {
            kind: InlineType::Link.as_str().to_string(),
            role: NodeRole::Inline,
            is_void: false,
            children: ChildConstraint::InlineOnly,
        });
        specs.push(NodeSpec {
            kind: IMAGE_KIND.to_string(),
            role: NodeRole::Block,
            is_void: true,
            children: ChildConstraint::None,
        });
        specs
    }
}

struct CoreNormalizePlugin;

impl PlatePlugin for CoreNormalizePlugin {
    fn id(&self) -> &'static str {
        "core.normalize"
    }

    fn normalize_passes(&self) -> Vec<Box<dyn NormalizePass>> {
        vec![
            Box::new(EnsureNonEmptyDocument),
            Box::new(RemoveEmptyContainers),
            Box::new(RemoveEmptyInlines),
            Box::new(EnsureTextBlockHasTextLeaf),
            Box::new(RemoveStrayEmptyLeaves),
            Box::new(MergeAdjacentTextLeaves),
        ]
    }
}

struct EnsureNonEmptyDocument;

impl NormalizePass for EnsureNonEmptyDocument {
    fn id(&self) -> &'static str {
        "core.ensure_non_empty_document"
    }

    fn run(&self, doc: &Document, _registry: &PluginRegistry) -> Vec<Op> {
        if doc.children.is_empty() {
            return vec![Op::InsertNode {
                path: vec![0],
                node: Node::paragraph(""),
            }];
        }
        Vec::new()
    }
}

/// List containers left without items by a delete or unwrap.
struct RemoveEmptyContainers;

impl NormalizePass for RemoveEmptyContainers {
    fn id(&self) -> &'static str {
        "core.remove_empty_containers"
    }

    fn run(&self, doc: &Document, registry: &PluginRegistry) -> Vec<Op> {
        fn walk(
            nodes: &[Node],
            path: &mut Vec<usize>,
            registry: &PluginRegistry,
            out: &mut Vec<Path>,
        ) {
            for (ix, node) in nodes.iter().enumerate() {
                let Node::Element(el) = node else {
                    continue;
                };
                path.push(ix);
                match registry.child_constraint(el) {
                    ChildConstraint::BlockOnly if el.children.is_empty() => out.push(path.clone()),
                    ChildConstraint::InlineOnly => {}
                    _ => walk(&el.children, path, registry, out),
                }
                path.pop();
            }
        }

        let mut empty = Vec::new();
        walk(&doc.children, &mut Vec::new(), registry, &mut empty);
        empty
            .into_iter()
            .rev()
            .map(|path| Op::RemoveNode { path })
            .collect()
    }
}

struct RemoveEmptyInlines;

impl NormalizePass for RemoveEmptyInlines {
    fn id(&self) -> &'static str {
        "core.remove_empty_inlines"
    }

    fn run(&self, doc: &Document, registry: &PluginRegistry) -> Vec<Op> {
        let mut ops = Vec::new();
        for block in text_blocks_in_order(doc, registry) {
            for (ix, child) in block.element.children.iter().enumerate().rev() {
                let Node::Element(inline) = child else {
                    continue;
                };
                if inline.text().is_empty() {
                    let mut path = block.path.clone();
                    path.push(ix);
                    ops.push(Op::RemoveNode { path });
                }
            }
        }
        // Blocks are independent; within a block removals run back to front.
        ops
    }
}

struct EnsureTextBlockHasTextLeaf;

impl NormalizePass for EnsureTextBlockHasTextLeaf {
    fn id(&self) -> &'static str {
        "core.ensure_text_block_has_text_leaf"
    }

    fn run(&self, doc: &Document, registry: &PluginRegistry) -> Vec<Op> {
        text_blocks_in_order(doc, registry)
            .into_iter()
            .filter(|block| {
                !block
                    .element
                    .children
                    .iter()
                    .any(|n| matches!(n, Node::Text(_)))
            })
            .map(|block| {
                let mut path = block.path;
                path.push(0);
                Op::InsertNode {
                    path,
                    node: Node::text(""),
                }
            })
            .collect()
    }
}

/// Empty text leaves the selection has moved away from, such as the one a
/// caret mark toggle leaves behind. Every block and inline keeps at least one
/// text leaf.
struct RemoveStrayEmptyLeaves;

impl RemoveStrayEmptyLeaves {
    fn strays_in(
        children: &[Node],
        path: &[usize],
        selection: Option<&Selection>,
        ops: &mut Vec<Op>,
    ) {
        let texts = children
            .iter()
            .filter(|n| matches!(n, Node::Text(_)))
            .count();
        let mut strays: Vec<Path> = children
            .iter()
            .enumerate()
            .filter_map(|(ix, node)| {
                let Node::Text(t) = node else {
                    return None;
                };
                if !t.text.is_empty() {
                    return None;
                }
                let mut leaf = path.to_vec();
                leaf.push(ix);
                let under_selection = selection
                    .is_some_and(|sel| sel.anchor.path == leaf || sel.focus.path == leaf);
                (!under_selection).then_some(leaf)
            })
            .collect();
        if strays.len() == texts {
            strays.pop();
        }
        ops.extend(strays.into_iter().rev().map(|path| Op::RemoveNode { path }));
    }

    fn collect(
        doc: &Document,
        selection: Option<&Selection>,
        registry: &PluginRegistry,
    ) -> Vec<Op> {
        let mut ops = Vec::new();
        for block in text_blocks_in_order(doc, registry) {
            // Removals inside inline elements keep the block's child indices.
            for (ix, child) in block.element.children.iter().enumerate() {
                if let Node::Element(inline) = child {
                    let mut inline_path = block.path.clone();
                    inline_path.push(ix);
                    Self::strays_in(&inline.children, &inline_path, selection, &mut ops);
                }
            }
            Self::strays_in(&block.element.children, &block.path, selection, &mut ops);
        }
        ops
    }
}

impl NormalizePass for RemoveStrayEmptyLeaves {
    fn id(&self) -> &'static str {
        "core.remove_stray_empty_leaves"
    }

    fn run(&self, doc: &Document, registry: &PluginRegistry) -> Vec<Op> {
        Self::collect(doc, None, registry)
    }

    fn run_at(
        &self,
        doc: &Document,
        selection: &Selection,
        registry: &PluginRegistry,
    ) -> Vec<Op> {
        Self::collect(doc, Some(selection), registry)
    }
}

struct MergeAdjacentTextLeaves;

impl NormalizePass for MergeAdjacentTextLeaves {
    fn id(&self) -> &'static str {
        "core.merge_adjacent_text_leaves"
    }

    fn run(&self, doc: &Document, registry: &PluginRegistry) -> Vec<Op> {
        fn merges_in(children: &[Node], path: &[usize], ops: &mut Vec<Op>) {
            for ix in (1..children.len()).rev() {
                let (Node::Text(left), Node::Text(right)) = (&children[ix - 1], &children[ix])
                else {
                    continue;
                };
                if left.marks == right.marks {
                    let mut merge_path = path.to_vec();
                    merge_path.push(ix);
                    ops.push(Op::MergeNode { path: merge_path });
                }
            }
        }

        let mut ops = Vec::new();
        for block in text_blocks_in_order(doc, registry) {
            // Merges inside inline elements leave the block's child indices
            // untouched, so they go first.
            for (ix, child) in block.element.children.iter().enumerate() {
                if let Node::Element(inline) = child {
                    let mut inline_path = block.path.clone();
                    inline_path.push(ix);
                    merges_in(&inline.children, &inline_path, &mut ops);
                }
            }
            merges_in(&block.element.children, &block.path, &mut ops);
        }
        ops
    }
}
