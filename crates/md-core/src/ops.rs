use serde::{Deserialize, Serialize};

use crate::core::{ElementKind, Node};

/// Child indices from the document root.
pub type Path = Vec<usize>;

/// Primitive document edit. Every structural transform lowers to these.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Op {
    /// Insert `text` at a byte offset of the text leaf at `path`.
    InsertText {
        #[serde(default)]
        path: Path,
        offset: usize,
        text: String,
    },
    InsertNode {
        #[serde(default)]
        path: Path,
        node: Node,
    },
    RemoveNode {
        #[serde(default)]
        path: Path,
    },
    /// Merge the text leaf at `path` into its previous sibling.
    MergeNode {
        #[serde(default)]
        path: Path,
    },
    /// Retag the element or void at `path`, keeping its children.
    SetNodeKind {
        #[serde(default)]
        path: Path,
        kind: ElementKind,
    },
}

impl Op {
    pub fn path(&self) -> &Path {
        match self {
            Op::InsertText { path, .. }
            | Op::InsertNode { path, .. }
            | Op::RemoveNode { path }
            | Op::MergeNode { path }
            | Op::SetNodeKind { path, .. } => path,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Op::InsertText { .. } => "insert_text",
            Op::InsertNode { .. } => "insert_node",
            Op::RemoveNode { .. } => "remove_node",
            Op::MergeNode { .. } => "merge_node",
            Op::SetNodeKind { .. } => "set_node_kind",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TransactionMeta {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    #[serde(default)]
    pub ops: Vec<Op>,
    #[serde(default)]
    pub meta: TransactionMeta,
}

impl Transaction {
    pub fn new(ops: Vec<Op>) -> Self {
        Self {
            ops,
            meta: TransactionMeta::default(),
        }
    }

    pub fn source(mut self, source: impl Into<String>) -> Self {
        self.meta.source = Some(source.into());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }
}
