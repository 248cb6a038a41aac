use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::core::Attrs;

/// Block type every block falls back to when a formatting rule is undone.
pub const DEFAULT_BLOCK: BlockType = BlockType::Paragraph;

pub const IMAGE_KIND: &str = "image";

#[derive(Debug, thiserror::Error)]
#[error("Unknown {category} kind: {kind}")]
pub struct UnknownKindError {
    category: &'static str,
    kind: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BlockType {
    Paragraph,
    HeadingOne,
    HeadingTwo,
    HeadingThree,
    HeadingFour,
    BlockQuote,
    CodeBlock,
    BulletedList,
    NumberedList,
    ListItem,
}

impl BlockType {
    pub const ALL: [BlockType; 10] = [
        BlockType::Paragraph,
        BlockType::HeadingOne,
        BlockType::HeadingTwo,
        BlockType::HeadingThree,
        BlockType::HeadingFour,
        BlockType::BlockQuote,
        BlockType::CodeBlock,
        BlockType::BulletedList,
        BlockType::NumberedList,
        BlockType::ListItem,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Paragraph => "paragraph",
            Self::HeadingOne => "heading-one",
            Self::HeadingTwo => "heading-two",
            Self::HeadingThree => "heading-three",
            Self::HeadingFour => "heading-four",
            Self::BlockQuote => "block-quote",
            Self::CodeBlock => "code-block",
            Self::BulletedList => "bulleted-list",
            Self::NumberedList => "numbered-list",
            Self::ListItem => "list-item",
        }
    }

    pub fn from_kind(kind: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|block| block.as_str() == kind)
    }

    /// Containers wrap list items; every other block type holds inline content.
    pub fn is_list_container(self) -> bool {
        matches!(self, Self::BulletedList | Self::NumberedList)
    }

    pub fn is_heading(self) -> bool {
        matches!(
            self,
            Self::HeadingOne | Self::HeadingTwo | Self::HeadingThree | Self::HeadingFour
        )
    }

    /// The list container of the opposite style, if this is a container.
    pub fn other_list(self) -> Option<Self> {
        match self {
            Self::BulletedList => Some(Self::NumberedList),
            Self::NumberedList => Some(Self::BulletedList),
            _ => None,
        }
    }
}

impl fmt::Display for BlockType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BlockType {
    type Err = UnknownKindError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_kind(s).ok_or_else(|| UnknownKindError {
            category: "block",
            kind: s.to_string(),
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MarkType {
    Bold,
    Italic,
    Underline,
    Strikethrough,
    Code,
}

impl MarkType {
    pub const ALL: [MarkType; 5] = [
        MarkType::Bold,
        MarkType::Italic,
        MarkType::Underline,
        MarkType::Strikethrough,
        MarkType::Code,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Bold => "bold",
            Self::Italic => "italic",
            Self::Underline => "underline",
            Self::Strikethrough => "strikethrough",
            Self::Code => "code",
        }
    }
}

impl fmt::Display for MarkType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MarkType {
    type Err = UnknownKindError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|mark| mark.as_str() == s)
            .ok_or_else(|| UnknownKindError {
                category: "mark",
                kind: s.to_string(),
            })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InlineType {
    Link,
}

impl InlineType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Link => "link",
        }
    }
}

impl fmt::Display for InlineType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

pub fn link_attrs(href: impl Into<String>) -> Attrs {
    let mut attrs = Attrs::new();
    attrs.insert("href".to_string(), Value::String(href.into()));
    attrs
}

/// Resolves the text typed between the start of a block and the caret into the
/// block type it stands for when followed by a space.
pub fn markdown_type(chars: &str) -> Option<BlockType> {
    match chars {
        "*" | "-" | "1." => Some(BlockType::ListItem),
        ">" => Some(BlockType::BlockQuote),
        "#" => Some(BlockType::HeadingOne),
        "##" => Some(BlockType::HeadingTwo),
        "###" => Some(BlockType::HeadingThree),
        "####" => Some(BlockType::HeadingFour),
        "   " => Some(BlockType::CodeBlock),
        _ => None,
    }
}

pub fn list_container_for(chars: &str) -> BlockType {
    if chars == "1." {
        BlockType::NumberedList
    } else {
        BlockType::BulletedList
    }
}
