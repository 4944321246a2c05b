//! Chat-side integration: recognising image requests and rendering replies.
//!
//! The host calls [`StableDiffusionCat::fast_reply`] for every user message.
//! Messages that end in the trigger character are answered inline with the
//! generated image; everything else is left to the host's normal flow.

use crate::{
    config::{GeneratorConfig, PluginSettings, SettingsProvider},
    error::{GenerationError, Result},
    models::Credentials,
    wizmodel::ImageRequestHandler,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;

pub const TRIGGER: char = '*';

pub const MISSING_API_KEY_NOTICE: &str = "Missing API key. Please enter your Wizmodel API key in the Stable Diffusion Cat plugin settings! You can get your free API key from this website: https://www.wizmodel.com/models/keyPanel";

pub const FAILURE_REPLY: &str = "No image was generated!";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HookDirective {
    PassThrough,
    Generate { prompt: String },
}

/// Decides what to do with an incoming chat message.
///
/// A single trailing `*` is stripped and the remaining prompt is trimmed of
/// surrounding whitespace, so `"a cat *"` asks for `"a cat"`. A message that is
/// blank once stripped is passed through.
pub fn intercept(text: &str) -> HookDirective {
    match text.strip_suffix(TRIGGER) {
        Some(prompt) if !prompt.trim().is_empty() => HookDirective::Generate {
            prompt: prompt.trim().to_string(),
        },
        _ => HookDirective::PassThrough,
    }
}

pub fn progress_notice(prompt: &str) -> String {
    format!("Generating image based on the prompt {} ...", prompt)
}

pub fn render_success(prompt: &str, path: &Path) -> String {
    format!(
        "<p><b>{}</b></p><img src=\"{}\">",
        escape_html(prompt),
        escape_html(&path.display().to_string())
    )
}

pub fn render_failure() -> String {
    FAILURE_REPLY.to_string()
}

fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageKind {
    /// A complete chat message.
    Chat,
    /// A streamed fragment shown while the reply is being produced.
    ChatToken,
}

/// Outbound channel to the chat the message came from.
pub trait ChatSink: Send + Sync {
    fn send(&self, content: &str, kind: MessageKind);
}

pub struct StableDiffusionCat {
    settings: Arc<dyn SettingsProvider>,
    handler: ImageRequestHandler,
}

impl StableDiffusionCat {
    pub fn new(settings: Arc<dyn SettingsProvider>, config: GeneratorConfig) -> Result<Self> {
        let handler = ImageRequestHandler::new(config)?;
        Ok(Self::with_handler(settings, handler))
    }

    pub fn with_handler(settings: Arc<dyn SettingsProvider>, handler: ImageRequestHandler) -> Self {
        Self { settings, handler }
    }

    pub fn handler(&self) -> &ImageRequestHandler {
        &self.handler
    }

    /// Returns `None` when the message is not an image request, otherwise the
    /// reply that replaces the agent's answer.
    pub async fn fast_reply(&self, message: &str, sink: &dyn ChatSink) -> Option<String> {
        let prompt = match intercept(message) {
            HookDirective::PassThrough => return None,
            HookDirective::Generate { prompt } => prompt,
        };

        log::info!("Generating image based on the prompt {}", prompt);
        sink.send(&progress_notice(&prompt), MessageKind::ChatToken);

        match self.generate(&prompt).await {
            Ok(path) => Some(render_success(&prompt, &path)),
            Err(e) => {
                if let GenerationError::MissingCredentials = e {
                    sink.send(MISSING_API_KEY_NOTICE, MessageKind::Chat);
                }
                // details stay in the log
                if e.is_configuration() {
                    log::warn!("Image generation skipped: {}", e);
                } else {
                    log::error!("Image generation failed: {}", e);
                }
                Some(render_failure())
            }
        }
    }

    async fn generate(&self, prompt: &str) -> Result<PathBuf> {
        let provider = self.settings.as_ref();

        // a missing key is reported before any other setting is looked at
        let api_key = PluginSettings::load_api_key(provider)?
            .ok_or(GenerationError::MissingCredentials)?;
        let steps = PluginSettings::load_steps(provider)?;

        self.handler
            .generate(prompt, steps, &Credentials::new(api_key))
            .await
    }
}
