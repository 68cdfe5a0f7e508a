use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::errors::EditorResult;
use crate::input_rules::RuleToggles;
use crate::suggestion::{MentionItem, SuggestionConfig};
use crate::upload::DEFAULT_IMAGE_TYPES;

/// Editor configuration, as read from JSON
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EditorConfig {
    /// Initial markup
    pub content: String,

    pub editable: bool,

    /// Shown by the host while the document is empty
    pub placeholder: Option<String>,

    /// Undo levels kept (0 = unlimited)
    pub max_undo_levels: usize,

    pub suggestion: SuggestionConfig,

    /// Initial mention list
    pub mentions: Vec<MentionItem>,

    pub input_rules: RuleToggles,

    /// MIME types accepted by the upload hook
    pub allowed_image_types: Vec<String>,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            content: String::new(),
            editable: true,
            placeholder: None,
            max_undo_levels: 100,
            suggestion: SuggestionConfig::default(),
            mentions: Vec::new(),
            input_rules: RuleToggles::default(),
            allowed_image_types: DEFAULT_IMAGE_TYPES.iter().map(|t| t.to_string()).collect(),
        }
    }
}

impl EditorConfig {
    pub fn from_json(json: &str) -> EditorResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Load config from a JSON file
    pub fn load(path: impl AsRef<Path>) -> EditorResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&content)
    }
}
