//! Chat plugin that turns messages ending in `*` into Stable Diffusion images.
//!
//! The prompt goes to the Wizmodel txt2img API, the returned image is written
//! under `<assets_root>/stable-diffusion-cat/`, and the chat gets an HTML reply
//! pointing at the file.

pub mod config;
pub mod error;
pub mod hook;
pub mod logger;
pub mod models;
pub mod storage;
pub mod wizmodel;

pub use config::{
    settings_schema, EnvSettings, GeneratorConfig, PluginSettings, SettingsProvider,
    StaticSettings,
};
pub use error::{GenerationError, Result};
pub use hook::{intercept, ChatSink, HookDirective, MessageKind, StableDiffusionCat};
pub use models::{Credentials, GeneratedImage, GenerationRequest};
pub use storage::ImageStore;
pub use wizmodel::{ImageRequestHandler, Txt2ImgClient};
