//! Prompt templates and the summarization chain built on top of them.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use relnotes_llm::{LlmError, LlmProvider, Message};
use tracing::{debug, warn};

use crate::error::{Result, SummarizeError};

pub const RELEASE_NOTES_PLACEHOLDER: &str = "{release-notes}";
pub const SUMMARY_EXAMPLE_PLACEHOLDER: &str = "{summary-example}";
pub const CORRELATED_INFO_PLACEHOLDER: &str = "{correlated_info}";

pub const SUMMARIZE_TEMPLATE_FILE: &str = "summarize_prompt_template.txt";
pub const EXAMPLE_SUMMARY_FILE: &str = "example_summary.txt";
pub const PROJECT_TEMPLATE_FILE: &str = "summarize_project_prompt_template.txt";
pub const REDUCE_TEMPLATE_FILE: &str = "reduce_prompt_template.txt";

const DEFAULT_SUMMARIZE_TEMPLATE: &str = "\
You are writing release notes for end users.
Summarize the release information below as concise markdown. Group items by
feature area, call out breaking changes first and omit internal-only details.

Example of the expected style:
{summary-example}

Release information:
{release-notes}
";

const DEFAULT_PROJECT_TEMPLATE: &str = "\
Summarize, per project, what changed in this release. Use one markdown
section per project with a short bullet list of user-visible changes.

{correlated_info}
";

const DEFAULT_REDUCE_TEMPLATE: &str = "\
The text below was assembled from partial summaries of one release.
Rewrite it as a single coherent markdown document: keep every distinct
change, merge duplicates and remove repeated introductions.

{release-notes}
";

/// A prompt with one input placeholder.
#[derive(Debug, Clone)]
pub struct PromptTemplate {
    text: String,
    placeholder: &'static str,
}

impl PromptTemplate {
    pub fn new(text: impl Into<String>, placeholder: &'static str) -> Self {
        let text = text.into();
        if !text.contains(placeholder) {
            warn!(placeholder, "prompt template has no input placeholder, input will be appended");
        }
        Self { text, placeholder }
    }

    /// Fill `{summary-example}` with a reference summary.
    pub fn with_example(mut self, example: &str) -> Self {
        self.text = self
            .text
            .replace(SUMMARY_EXAMPLE_PLACEHOLDER, &format!("\n{example}"));
        self
    }

    pub fn render(&self, input: &str) -> String {
        if self.text.contains(self.placeholder) {
            self.text.replace(self.placeholder, &format!("\n{input}"))
        } else {
            format!("{}\n\n{}", self.text.trim_end(), input)
        }
    }

    /// The template text without its input, used to size the prompt overhead.
    pub fn overhead(&self) -> String {
        self.text.replace(self.placeholder, "")
    }
}

/// The set of templates a run uses, loaded from the config directory.
#[derive(Debug, Clone)]
pub struct PromptTemplates {
    pub summarize: PromptTemplate,
    pub project: PromptTemplate,
    pub reduce: PromptTemplate,
}

impl PromptTemplates {
    pub fn builtin() -> Self {
        Self {
            summarize: PromptTemplate::new(DEFAULT_SUMMARIZE_TEMPLATE, RELEASE_NOTES_PLACEHOLDER)
                .with_example(""),
            project: PromptTemplate::new(DEFAULT_PROJECT_TEMPLATE, CORRELATED_INFO_PLACEHOLDER),
            reduce: PromptTemplate::new(DEFAULT_REDUCE_TEMPLATE, RELEASE_NOTES_PLACEHOLDER),
        }
    }

    /// Missing files fall back to the built-in defaults.
    pub fn load(config_dir: &Path) -> Result<Self> {
        let example = read_optional(config_dir, EXAMPLE_SUMMARY_FILE)?.unwrap_or_default();
        let summarize = read_optional(config_dir, SUMMARIZE_TEMPLATE_FILE)?
            .unwrap_or_else(|| DEFAULT_SUMMARIZE_TEMPLATE.to_string());
        let project = read_optional(config_dir, PROJECT_TEMPLATE_FILE)?
            .unwrap_or_else(|| DEFAULT_PROJECT_TEMPLATE.to_string());
        let reduce = read_optional(config_dir, REDUCE_TEMPLATE_FILE)?
            .unwrap_or_else(|| DEFAULT_REDUCE_TEMPLATE.to_string());

        Ok(Self {
            summarize: PromptTemplate::new(summarize, RELEASE_NOTES_PLACEHOLDER).with_example(&example),
            project: PromptTemplate::new(project, CORRELATED_INFO_PLACEHOLDER),
            reduce: PromptTemplate::new(reduce, RELEASE_NOTES_PLACEHOLDER),
        })
    }
}

fn read_optional(dir: &Path, name: &str) -> Result<Option<String>> {
    let path = dir.join(name);
    match std::fs::read_to_string(&path) {
        Ok(text) => {
            debug!(path = %path.display(), "loaded prompt file");
            Ok(Some(text))
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            warn!(path = %path.display(), "prompt file missing, using built-in default");
            Ok(None)
        }
        Err(e) => Err(SummarizeError::io(path, e)),
    }
}

// ── Summarization chain ───────────────────────────────────────

/// The summarization callable: content in, summary out. May be slow, may be
/// rate limited, may fail.
#[async_trait]
pub trait SummaryChain: Send + Sync {
    async fn invoke(&self, content: &str) -> std::result::Result<String, LlmError>;
}

/// Renders a template around the content and sends it to an LLM provider.
pub struct LlmSummaryChain {
    provider: Arc<dyn LlmProvider>,
    template: PromptTemplate,
    temperature: f32,
    max_tokens: u32,
}

impl LlmSummaryChain {
    pub fn new(
        provider: Arc<dyn LlmProvider>,
        template: PromptTemplate,
        temperature: f32,
        max_tokens: u32,
    ) -> Self {
        Self { provider, template, temperature, max_tokens }
    }

    pub fn template(&self) -> &PromptTemplate {
        &self.template
    }
}

#[async_trait]
impl SummaryChain for LlmSummaryChain {
    async fn invoke(&self, content: &str) -> std::result::Result<String, LlmError> {
        let prompt = self.template.render(content);
        let response = self
            .provider
            .complete(vec![Message::user(prompt)], self.temperature, self.max_tokens)
            .await?;
        Ok(response.trim().to_string())
    }
}
