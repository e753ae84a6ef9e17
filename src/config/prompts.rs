//! Prompt templates for medrag.
//!
//! The RAG prompt can be customized by placing a `rag.toml` file in the
//! custom prompts directory.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

/// Collection of all prompt templates.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
#[derive(Default)]
pub struct Prompts {
    pub rag: RagPrompts,
    /// Custom variables from config, available in all prompts.
    #[serde(skip)]
    pub variables: HashMap<String, String>,
}

/// Prompts for RAG response generation.
///
/// `user` receives `{{query}}` and `{{context}}`. `system` is sent as a
/// separate system message when non-empty.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RagPrompts {
    pub system: String,
    pub user: String,
}

impl Default for RagPrompts {
    fn default() -> Self {
        Self {
            system: String::new(),
            user: r#"You are a helpful medical AI assistant.
Answer the user query using the following retrieved context.
You should ask for more symptoms if you feel information is insufficient, but do this at most 3 times.
You should tell the possible disease and its cure on separate lines so that it is user friendly.

User query: {{query}}

Context:
{{context}}
"#
            .to_string(),
        }
    }
}

impl Prompts {
    /// Load prompts from the default location, with optional custom directory and variables.
    pub fn load(
        custom_dir: Option<&str>,
        custom_variables: Option<&HashMap<String, String>>,
    ) -> crate::error::Result<Self> {
        let mut prompts = Prompts::default();

        if let Some(vars) = custom_variables {
            prompts.variables = vars.clone();
        }

        if let Some(dir) = custom_dir {
            let custom_path = PathBuf::from(shellexpand::tilde(dir).to_string());

            let rag_path = custom_path.join("rag.toml");
            if rag_path.exists() {
                let content = std::fs::read_to_string(&rag_path)?;
                prompts.rag = toml::from_str(&content)?;
            }
        }

        Ok(prompts)
    }

    /// Render a prompt template with the given variables.
    ///
    /// Substitution is single-pass, so a value containing `{{name}}` is
    /// never expanded again.
    pub fn render(template: &str, vars: &HashMap<String, String>) -> String {
        let mut result = String::with_capacity(template.len());
        let mut rest = template;

        while let Some(start) = rest.find("{{") {
            result.push_str(&rest[..start]);
            let after = &rest[start + 2..];
            match after.find("}}") {
                Some(end) => {
                    let key = after[..end].trim();
                    match vars.get(key) {
                        Some(value) => result.push_str(value),
                        None => result.push_str(&rest[start..start + 2 + end + 2]),
                    }
                    rest = &after[end + 2..];
                }
                None => {
                    result.push_str(&rest[start..]);
                    rest = "";
                }
            }
        }
        result.push_str(rest);
        result
    }

    /// Render a prompt template with both provided variables and custom config variables.
    /// Provided variables take precedence over custom config variables.
    pub fn render_with_custom(&self, template: &str, vars: &HashMap<String, String>) -> String {
        let mut merged = self.variables.clone();
        for (key, value) in vars {
            merged.insert(key.clone(), value.clone());
        }
        Self::render(template, &merged)
    }

    /// Render the RAG user prompt for a query and its context block.
    pub fn render_rag(&self, query: &str, context: &str) -> String {
        let mut vars = HashMap::new();
        vars.insert("query".to_string(), query.to_string());
        vars.insert("context".to_string(), context.to_string());
        self.render_with_custom(&self.rag.user, &vars)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_prompts() {
        let prompts = Prompts::default();
        assert!(prompts.rag.user.contains("{{query}}"));
        assert!(prompts.rag.user.contains("{{context}}"));
        assert!(prompts.rag.system.is_empty());
    }

    #[test]
    fn test_render_template() {
        let template = "Hello {{name}}, you have {{count}} messages.";
        let mut vars = HashMap::new();
        vars.insert("name".to_string(), "Alice".to_string());
        vars.insert("count".to_string(), "5".to_string());

        let result = Prompts::render(template, &vars);
        assert_eq!(result, "Hello Alice, you have 5 messages.");
    }

    #[test]
    fn test_render_leaves_unknown_and_does_not_reexpand() {
        let mut vars = HashMap::new();
        vars.insert("query".to_string(), "what is {{context}}?".to_string());
        vars.insert("context".to_string(), "CTX".to_string());

        let result = Prompts::render("Q: {{query}} C: {{context}} X: {{missing}} {{", &vars);
        assert_eq!(result, "Q: what is {{context}}? C: CTX X: {{missing}} {{");
    }

    #[test]
    fn test_render_rag_uses_custom_variables() {
        let mut prompts = Prompts::default();
        prompts.rag.user = "[{{clinic}}] {{query}} | {{context}}".to_string();
        prompts.variables.insert("clinic".to_string(), "Night desk".to_string());
        prompts.variables.insert("query".to_string(), "shadowed".to_string());

        let rendered = prompts.render_rag("fever", "flu symptoms");
        assert_eq!(rendered, "[Night desk] fever | flu symptoms");
    }

    #[test]
    fn test_load_custom_rag_prompt() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("rag.toml"),
            "system = \"Be brief.\"\nuser = \"{{query}}\\n{{context}}\"\n",
        )
        .unwrap();

        let prompts = Prompts::load(dir.path().to_str(), None).unwrap();
        assert_eq!(prompts.rag.system, "Be brief.");
        assert_eq!(prompts.rag.user, "{{query}}\n{{context}}");
    }
}
