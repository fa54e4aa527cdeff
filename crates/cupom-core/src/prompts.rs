//! Prompt library for the generative model
//!
//! Prompts are loaded with a two-layer resolution:
//! 1. Check for override in data dir (~/.local/share/cupom/prompts/overrides/)
//! 2. Fall back to embedded defaults (compiled into binary)
//!
//! Prompt files carry YAML frontmatter and `# System` / `# User` sections.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::warn;

use crate::error::{Error, Result};

/// Embedded default prompts (compiled into binary)
mod defaults {
    pub const EXTRACT_RECEIPT: &str = include_str!("../../../prompts/extract_receipt.md");
    pub const GENERATE_INSIGHTS: &str = include_str!("../../../prompts/generate_insights.md");
}

/// Known prompt IDs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PromptId {
    /// Vision prompt: receipt image to JSON
    ExtractReceipt,
    /// Narrative prompt: monthly summary to insights
    GenerateInsights,
}

impl PromptId {
    /// Get the string identifier for this prompt
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ExtractReceipt => "extract_receipt",
            Self::GenerateInsights => "generate_insights",
        }
    }

    /// Get all known prompt IDs
    pub fn all() -> &'static [PromptId] {
        &[Self::ExtractReceipt, Self::GenerateInsights]
    }

    fn default_content(&self) -> &'static str {
        match self {
            Self::ExtractReceipt => defaults::EXTRACT_RECEIPT,
            Self::GenerateInsights => defaults::GENERATE_INSIGHTS,
        }
    }
}

impl std::str::FromStr for PromptId {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        PromptId::all()
            .iter()
            .copied()
            .find(|id| id.as_str() == s)
            .ok_or_else(|| format!("Unknown prompt ID: {}", s))
    }
}

/// Output the prompt asks the model for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ResponseFormat {
    /// JSON only (sets the model's JSON response mode)
    Json,
    #[default]
    Text,
}

impl ResponseFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Json => "json",
            Self::Text => "text",
        }
    }
}

/// Prompt frontmatter metadata
#[derive(Debug, Clone, Deserialize)]
pub struct PromptMetadata {
    /// Unique identifier
    pub id: String,
    /// Version number for tracking changes
    pub version: u32,
    #[serde(default)]
    pub response_format: ResponseFormat,
}

/// A loaded prompt with metadata and content
#[derive(Debug, Clone)]
pub struct Prompt {
    pub metadata: PromptMetadata,
    /// The prompt content (system + user sections)
    pub content: String,
    /// Whether this came from an override file
    pub is_override: bool,
    pub override_path: Option<PathBuf>,
}

impl Prompt {
    /// Get the system section of the prompt
    pub fn system_section(&self) -> Option<&str> {
        extract_section(&self.content, "# System")
    }

    /// Get the user section of the prompt
    pub fn user_section(&self) -> Option<&str> {
        extract_section(&self.content, "# User")
    }

    /// System section, or an empty string when the prompt has none
    pub fn render_system(&self, vars: &HashMap<&str, &str>) -> String {
        render(self.system_section().unwrap_or_default(), vars)
    }

    /// User section with `{{var}}` placeholders replaced
    ///
    /// Prompts without a `# User` header render their whole body.
    pub fn render_user(&self, vars: &HashMap<&str, &str>) -> String {
        render(self.user_section().unwrap_or(&self.content), vars)
    }

    pub fn wants_json(&self) -> bool {
        self.metadata.response_format == ResponseFormat::Json
    }
}

/// Prompt library, loaded once at startup
#[derive(Debug, Clone)]
pub struct PromptLibrary {
    override_dir: Option<PathBuf>,
    prompts: HashMap<PromptId, Prompt>,
}

impl PromptLibrary {
    /// Load prompts using the default override directory
    pub fn new() -> Result<Self> {
        Self::load(default_prompts_dir())
    }

    /// Load prompts with a custom override directory
    pub fn with_override_dir(path: PathBuf) -> Result<Self> {
        Self::load(Some(path))
    }

    /// Embedded prompts only
    pub fn embedded_only() -> Result<Self> {
        Self::load(None)
    }

    fn load(override_dir: Option<PathBuf>) -> Result<Self> {
        let mut prompts = HashMap::new();
        for &id in PromptId::all() {
            prompts.insert(id, load_prompt(id, override_dir.as_deref())?);
        }
        Ok(Self {
            override_dir,
            prompts,
        })
    }

    /// Get a loaded prompt
    pub fn get(&self, id: PromptId) -> Result<&Prompt> {
        self.prompts
            .get(&id)
            .ok_or_else(|| Error::InvalidData(format!("Prompt not loaded: {}", id.as_str())))
    }

    /// List all prompts with their override status
    pub fn list(&self) -> Vec<PromptInfo> {
        PromptId::all()
            .iter()
            .filter_map(|id| self.prompts.get(id).map(|p| (id, p)))
            .map(|(id, prompt)| PromptInfo {
                id: id.as_str().to_string(),
                version: prompt.metadata.version,
                response_format: prompt.metadata.response_format,
                has_override: prompt.is_override,
                override_path: prompt.override_path.clone(),
            })
            .collect()
    }

    /// Get the override directory path
    pub fn override_dir(&self) -> Option<&PathBuf> {
        self.override_dir.as_ref()
    }
}

/// Information about a prompt for listing
#[derive(Debug, Clone)]
pub struct PromptInfo {
    pub id: String,
    pub version: u32,
    pub response_format: ResponseFormat,
    pub has_override: bool,
    pub override_path: Option<PathBuf>,
}

/// Default prompts override directory
pub fn default_prompts_dir() -> Option<PathBuf> {
    dirs::data_local_dir().map(|d| d.join("cupom").join("prompts").join("overrides"))
}

fn load_prompt(id: PromptId, override_dir: Option<&Path>) -> Result<Prompt> {
    let (default_metadata, default_body) = parse_prompt(id.default_content())?;

    if let Some(dir) = override_dir {
        let override_path = dir.join(format!("{}.md", id.as_str()));
        if override_path.exists() {
            match read_override(&override_path) {
                Ok((mut metadata, body)) => {
                    // Overrides change wording only; the response format is fixed per prompt
                    if metadata.response_format != default_metadata.response_format {
                        warn!(
                            path = %override_path.display(),
                            "Ignoring response_format in prompt override"
                        );
                        metadata.response_format = default_metadata.response_format;
                    }
                    return Ok(Prompt {
                        metadata,
                        content: body,
                        is_override: true,
                        override_path: Some(override_path),
                    });
                }
                Err(e) => {
                    warn!(
                        path = %override_path.display(),
                        error = %e,
                        "Invalid prompt override, using embedded default"
                    );
                }
            }
        }
    }

    Ok(Prompt {
        metadata: default_metadata,
        content: default_body,
        is_override: false,
        override_path: None,
    })
}

fn read_override(path: &Path) -> Result<(PromptMetadata, String)> {
    let content = fs::read_to_string(path)
        .map_err(|e| Error::InvalidData(format!("Failed to read prompt override: {}", e)))?;
    parse_prompt(&content)
}

/// Parse a prompt file into metadata and body
fn parse_prompt(content: &str) -> Result<(PromptMetadata, String)> {
    let content = content.trim();

    if !content.starts_with("---") {
        return Err(Error::InvalidData(
            "Prompt must start with YAML frontmatter (---)".into(),
        ));
    }

    let rest = &content[3..];
    let end = rest.find("---").ok_or_else(|| {
        Error::InvalidData("Prompt frontmatter not closed (missing second ---)".into())
    })?;

    let frontmatter = rest[..end].trim();
    let body = rest[end + 3..].trim();

    let metadata: PromptMetadata = serde_yaml::from_str(frontmatter)
        .map_err(|e| Error::InvalidData(format!("Invalid prompt frontmatter: {}", e)))?;

    Ok((metadata, body.to_string()))
}

/// Extract a section from the prompt content
fn extract_section<'a>(content: &'a str, header: &str) -> Option<&'a str> {
    let start = content.find(header)?;
    let after_header = &content[start + header.len()..];

    // Find the next header or end of content
    let end = after_header.find("\n# ").unwrap_or(after_header.len());

    Some(after_header[..end].trim())
}

fn render(template: &str, vars: &HashMap<&str, &str>) -> String {
    let mut result = template.to_string();
    for (key, value) in vars {
        let pattern = format!("{{{{{}}}}}", key);
        result = result.replace(&pattern, value);
    }
    result
}
