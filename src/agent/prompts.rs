//! Prompt templates and user-profile loading

use crate::error::{Error, Result};
use handlebars::Handlebars;
use serde::Serialize;
use std::path::Path;
use tracing::warn;

/// Sentinel injected when no profile file exists
pub const NO_PROFILE_SENTINEL: &str = "No user profile available.";

/// A prompt template using Handlebars syntax
pub struct PromptTemplate {
    /// Template name
    name: String,
    /// Handlebars registry
    registry: Handlebars<'static>,
}

impl PromptTemplate {
    /// Create a new prompt template
    pub fn new(name: impl Into<String>, template: &str) -> Result<Self> {
        let name = name.into();
        let mut registry = Handlebars::new();

        registry
            .register_template_string(&name, template)
            .map_err(|e| Error::Internal(format!("Invalid template: {}", e)))?;

        Ok(PromptTemplate { name, registry })
    }

    /// Render the template with given data
    pub fn render<T: Serialize>(&self, data: &T) -> Result<String> {
        self.registry
            .render(&self.name, data)
            .map_err(|e| Error::Internal(format!("Template render error: {}", e)))
    }
}

/// System prompt for the history agent. The privacy and tool-usage policy
/// lives here, not in the tool code: the tools stay safe to call under any
/// policy.
const SYSTEM_PROMPT_TEMPLATE: &str = "\
You analyze the user's web browsing history and answer questions about it.
Basic context about the user: {{{profile}}}

RULES:
1. ALWAYS call 'search_history' FIRST.
2. Examine document dates ONLY for temporal questions (\"latest\", \"when\", \"recent\"), \
and never state the exact day - only month and year.
3. Answer with the required JSON schema: a single 'answer' field.
4. ONLY call 'get_links' if the user explicitly asks for links, sources, domains, or websites.
5. DO NOT make anything up. If the context does not contain an answer, say so.
6. DO NOT reveal personal specifics - no company names, people's names, or exact dates. \
Keep job-search details generic.
7. SUMMARIZE briefly and generally to protect the user's privacy.

EXAMPLE TEMPORAL REASONING:
DOC 1 (DATE: 2024-05-15): Niacinamide Serum
DOC 2 (DATE: 2024-11-20): Air purifier filter
Q: \"Latest amazon search?\" -> Answer: \"The most recent amazon search was in November \
for air purifier filters.\"";

#[derive(Serialize)]
struct SystemPromptData<'a> {
    profile: &'a str,
}

/// Render the system prompt with the user profile injected
pub fn build_system_prompt(profile: &str) -> Result<String> {
    let template = PromptTemplate::new("system", SYSTEM_PROMPT_TEMPLATE)?;
    template.render(&SystemPromptData { profile })
}

/// Load the user profile text, substituting the sentinel when the file is
/// missing or unreadable. Absence is never fatal.
pub fn load_profile(path: impl AsRef<Path>) -> String {
    let path = path.as_ref();
    match std::fs::read_to_string(path) {
        Ok(content) => content.trim().to_string(),
        Err(e) => {
            warn!("Could not load profile from {}: {}", path.display(), e);
            NO_PROFILE_SENTINEL.to_string()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_system_prompt_injects_profile() {
        let prompt = build_system_prompt("Enjoys skincare and air quality gadgets.").unwrap();
        assert!(prompt.contains("Enjoys skincare and air quality gadgets."));
        assert!(prompt.contains("search_history"));
        assert!(prompt.contains("get_links"));
    }

    #[test]
    fn test_load_profile_missing_file_uses_sentinel() {
        let profile = load_profile("/nonexistent/profile.txt");
        assert_eq!(profile, NO_PROFILE_SENTINEL);
    }

    #[test]
    fn test_load_profile_reads_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "Researcher interested in Rust.").unwrap();

        let profile = load_profile(file.path());
        assert_eq!(profile, "Researcher interested in Rust.");
    }

    #[test]
    fn test_template_render() {
        let template = PromptTemplate::new("greet", "Hello {{name}}").unwrap();

        #[derive(Serialize)]
        struct Data {
            name: String,
        }

        let rendered = template.render(&Data { name: "world".into() }).unwrap();
        assert_eq!(rendered, "Hello world");
    }
}
