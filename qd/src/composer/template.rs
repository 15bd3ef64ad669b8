//! Instruction template
//!
//! Renders the composer state into the single natural-language instruction
//! sent to the generator. The embedded template is compiled into the binary;
//! a custom one can be supplied through config.

use eyre::{Result, eyre};
use handlebars::Handlebars;
use serde::Serialize;
use tracing::{debug, warn};

/// Default instruction template
pub const EMBEDDED_INSTRUCTION: &str = include_str!("../../prompts/instruction.pmt");

const EMBEDDED_NAME: &str = "embedded";
const CUSTOM_NAME: &str = "custom";

/// Values available to the template
#[derive(Debug, Clone, Serialize)]
pub struct InstructionContext {
    /// What the poem is about
    pub subject: String,
    /// Requested number of verses
    pub line_count: Option<u8>,
    /// Topic, only when it is not already the subject
    pub topic: Option<String>,
    /// Poetic style
    pub style: Option<String>,
}

/// Compiled instruction template with embedded fallback
#[derive(Debug, Clone)]
pub struct InstructionTemplate {
    registry: Handlebars<'static>,
    has_custom: bool,
}

impl Default for InstructionTemplate {
    fn default() -> Self {
        Self::embedded()
    }
}

impl InstructionTemplate {
    /// Template using only the embedded default
    pub fn embedded() -> Self {
        let mut registry = Handlebars::new();
        registry.register_escape_fn(handlebars::no_escape);
        if let Err(e) = registry.register_template_string(EMBEDDED_NAME, EMBEDDED_INSTRUCTION) {
            warn!(error = %e, "InstructionTemplate::embedded: embedded template failed to compile");
        }
        Self {
            registry,
            has_custom: false,
        }
    }

    /// Template with a custom source, validated up front
    pub fn with_custom(source: &str) -> Result<Self> {
        debug!(len = source.len(), "InstructionTemplate::with_custom: called");
        let mut template = Self::embedded();
        template
            .registry
            .register_template_string(CUSTOM_NAME, source)
            .map_err(|e| eyre!("Invalid instruction template: {}", e))?;
        template.has_custom = true;
        Ok(template)
    }

    /// Render the instruction; never fails
    pub fn render(&self, ctx: &InstructionContext) -> String {
        if self.has_custom {
            match self.registry.render(CUSTOM_NAME, ctx) {
                Ok(text) => return text.trim().to_string(),
                Err(e) => warn!(error = %e, "render: custom template failed, using embedded"),
            }
        }

        match self.registry.render(EMBEDDED_NAME, ctx) {
            Ok(text) => text.trim().to_string(),
            Err(e) => {
                warn!(error = %e, "render: embedded template failed, using plain instruction");
                format!("اكتب شعر موزون مقفي عن \"{}\"", ctx.subject)
            }
        }
    }
}
