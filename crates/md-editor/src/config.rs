use plate_md_core::{BlockType, MarkType};
use serde::{Deserialize, Serialize};

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid toolbar config: {0}")]
    Json(#[from] serde_json::Error),
    #[error("{0} cannot have a toolbar button")]
    UnsupportedBlock(BlockType),
}

/// Which buttons the floating menu shows, in display order within each group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawToolbarConfig")]
pub struct ToolbarConfig {
    pub marks: Vec<MarkType>,
    pub link: bool,
    pub blocks: Vec<BlockType>,
}

impl Default for ToolbarConfig {
    fn default() -> Self {
        Self {
            marks: MarkType::ALL.to_vec(),
            link: true,
            blocks: vec![
                BlockType::BlockQuote,
                BlockType::HeadingOne,
                BlockType::HeadingTwo,
                BlockType::BulletedList,
                BlockType::NumberedList,
                BlockType::CodeBlock,
            ],
        }
    }
}

impl ToolbarConfig {
    pub fn from_json_str(s: &str) -> Result<Self, ConfigError> {
        let raw: RawToolbarConfig = serde_json::from_str(s)?;
        Self::try_from(raw)
    }

    /// List items are only reachable through their containers.
    pub fn validate(&self) -> Result<(), ConfigError> {
        match self.blocks.iter().find(|b| **b == BlockType::ListItem) {
            Some(block) => Err(ConfigError::UnsupportedBlock(*block)),
            None => Ok(()),
        }
    }
}

/// Unchecked wire form; every deserialized config goes through `validate`.
#[derive(Deserialize)]
#[serde(default)]
struct RawToolbarConfig {
    marks: Vec<MarkType>,
    link: bool,
    blocks: Vec<BlockType>,
}

impl Default for RawToolbarConfig {
    fn default() -> Self {
        let ToolbarConfig {
            marks,
            link,
            blocks,
        } = ToolbarConfig::default();
        Self {
            marks,
            link,
            blocks,
        }
    }
}

impl TryFrom<RawToolbarConfig> for ToolbarConfig {
    type Error = ConfigError;

    fn try_from(raw: RawToolbarConfig) -> Result<Self, Self::Error> {
        let config = Self {
            marks: raw.marks,
            link: raw.link,
            blocks: raw.blocks,
        };
        config.validate()?;
        Ok(config)
    }
}
