//! Prompt Template Rendering
//!
//! Templates are plain text with `{name}` placeholders, loaded once at startup
//! and handed to the renderer as a map keyed by template name. Rendering is
//! pure: the same template and variables always produce the same prompt.

use std::collections::HashMap;

/// The template names every deployment must provide.
pub const TEMPLATE_NAMES: [&str; 5] = [
    "initial_curriculum",
    "materials",
    "feedback",
    "feedback_summary",
    "next_material",
];

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum PromptError {
    #[error("unknown prompt template: '{0}'")]
    TemplateNotFound(String),
    #[error("template '{template}' references '{{{variable}}}' but no value was supplied")]
    MissingVariable { template: String, variable: String },
}

/// A value that can be substituted into a template placeholder.
#[derive(Debug, Clone, PartialEq)]
pub enum TemplateValue {
    Text(String),
    Number(i64),
    /// Rendered as the items joined with `", "`.
    List(Vec<String>),
}

impl TemplateValue {
    fn to_text(&self) -> String {
        match self {
            TemplateValue::Text(text) => text.clone(),
            TemplateValue::Number(number) => number.to_string(),
            TemplateValue::List(items) => items.join(", "),
        }
    }
}

/// Renders named prompt templates by substituting `{placeholder}` variables.
#[derive(Debug, Clone)]
pub struct PromptRenderer {
    templates: HashMap<String, String>,
}

impl PromptRenderer {
    pub fn new(templates: HashMap<String, String>) -> Self {
        Self { templates }
    }

    /// Renders `name` with the supplied variables.
    ///
    /// Every placeholder in the template must have a binding; extra bindings
    /// are ignored. Placeholders are checked before substitution so braces
    /// inside substituted values are never misread as placeholders.
    pub fn render(
        &self,
        name: &str,
        vars: &HashMap<&str, TemplateValue>,
    ) -> Result<String, PromptError> {
        let template = self
            .templates
            .get(name)
            .ok_or_else(|| PromptError::TemplateNotFound(name.to_string()))?;

        for placeholder in placeholders(template) {
            if !vars.contains_key(placeholder.as_str()) {
                return Err(PromptError::MissingVariable {
                    template: name.to_string(),
                    variable: placeholder,
                });
            }
        }

        let mut rendered = template.clone();
        for (key, value) in vars {
            rendered = rendered.replace(&format!("{{{key}}}"), &value.to_text());
        }
        Ok(rendered)
    }
}

/// Collects the `{identifier}` placeholders appearing in a template.
fn placeholders(template: &str) -> Vec<String> {
    let mut found = Vec::new();
    let mut rest = template;
    while let Some(open) = rest.find('{') {
        rest = &rest[open + 1..];
        if let Some(close) = rest.find('}') {
            let candidate = &rest[..close];
            if !candidate.is_empty()
                && candidate
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || c == '_')
                && !found.contains(&candidate.to_string())
            {
                found.push(candidate.to_string());
            }
            rest = &rest[close + 1..];
        } else {
            break;
        }
    }
    found
}
