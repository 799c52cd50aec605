//! Builds the instruction text handed to an external LLM to draft a prompt.

use super::Composer;
use crate::error::ShelfError;
use crate::models::{Direction, PromptEntry};
use crate::preferences::Language;
use std::collections::HashMap;

pub const AVAILABLE_PROMPTS_PLACEHOLDER: &str = "${availablePrompts}";
pub const USER_DEMAND_PLACEHOLDER: &str = "${userDemand}";

const LORA_SECTION_HEADER: &str = "\n【已选择的Lora】\n";

const BUILTIN_ZH: &str = "你是一名 Stable Diffusion 提示词专家。请根据用户需求，从下列可用提示词中挑选并组合，输出一段英文正向提示词和一段英文负向提示词，用逗号分隔标签。\n\n【可用提示词】\n${availablePrompts}\n\n【用户需求】\n${userDemand}\n\n请按以下格式输出：\n正向提示词：...\n负向提示词：...";

const BUILTIN_EN: &str = "You are a Stable Diffusion prompt expert. Based on the user's request, pick and combine entries from the available prompts below and output one English positive prompt and one English negative prompt, with tags separated by commas.\n\n[Available prompts]\n${availablePrompts}\n\n[User request]\n${userDemand}\n\nAnswer in this format:\nPositive prompt: ...\nNegative prompt: ...";

/// Per-language request templates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LlmTemplates {
    templates: HashMap<String, String>,
}

impl Default for LlmTemplates {
    fn default() -> Self {
        Self::builtin()
    }
}

impl LlmTemplates {
    /// Templates shipped with promptshelf.
    pub fn builtin() -> Self {
        let templates = [
            (Language::Zh.as_str(), BUILTIN_ZH),
            (Language::En.as_str(), BUILTIN_EN),
        ]
        .into_iter()
        .map(|(lang, template)| (lang.to_string(), template.to_string()))
        .collect();
        Self { templates }
    }

    /// Parse a JSON object mapping language codes to templates.
    ///
    /// # Errors
    /// Returns [`ShelfError::Serialization`] for malformed JSON.
    pub fn from_json(raw: &str) -> Result<Self, ShelfError> {
        let templates: HashMap<String, String> = serde_json::from_str(raw)?;
        Ok(Self { templates })
    }

    /// Template for `language`, falling back to Chinese.
    pub fn template(&self, language: Language) -> Option<&str> {
        self.templates
            .get(language.as_str())
            .or_else(|| self.templates.get(Language::Zh.as_str()))
            .map(String::as_str)
    }

    /// Fill the template for `language`.
    ///
    /// The prompt catalogue lists the prompts currently in `composer`, or
    /// every entry of `prompts` when the composer holds none, followed by the
    /// enabled Lora tags.
    ///
    /// # Errors
    /// Returns [`ShelfError::InvalidInput`] when `demand` is blank or no
    /// template exists.
    pub fn build(
        &self,
        language: Language,
        composer: &Composer,
        prompts: &[PromptEntry],
        demand: &str,
    ) -> Result<String, ShelfError> {
        let demand = demand.trim();
        if demand.is_empty() {
            return Err(ShelfError::InvalidInput(
                "describe what the prompt should depict".to_string(),
            ));
        }
        let template = self.template(language).ok_or_else(|| {
            ShelfError::InvalidInput(format!("no LLM template for {}", language.as_str()))
        })?;
        let catalogue = available_prompts(composer, prompts);
        Ok(template
            .replacen(AVAILABLE_PROMPTS_PLACEHOLDER, &catalogue, 1)
            .replacen(USER_DEMAND_PLACEHOLDER, demand, 1))
    }
}

fn prompt_line(entry: &PromptEntry) -> String {
    match entry.direction {
        Direction::Unspecified => format!("- {} ({}): {}", entry.name, entry.kind, entry.text),
        direction => format!(
            "- {} ({}, {}): {}",
            entry.name,
            entry.kind,
            direction.label(),
            entry.text
        ),
    }
}

/// Catalogue section substituted for the available-prompts placeholder.
pub fn available_prompts(composer: &Composer, prompts: &[PromptEntry]) -> String {
    let in_use = composer.prompt_indices();
    let mut catalogue = prompts
        .iter()
        .enumerate()
        .filter(|(index, _)| in_use.is_empty() || in_use.contains(index))
        .map(|(_, entry)| prompt_line(entry))
        .collect::<Vec<_>>()
        .join("\n");

    let loras = composer
        .enabled_loras()
        .map(|tag| {
            if tag.trigger_words.is_empty() {
                format!("- {}", tag.name)
            } else {
                format!("- {}: {}", tag.name, tag.trigger_words.join(", "))
            }
        })
        .collect::<Vec<_>>();
    if !loras.is_empty() {
        catalogue.push_str(LORA_SECTION_HEADER);
        catalogue.push_str(&loras.join("\n"));
    }
    catalogue
}
