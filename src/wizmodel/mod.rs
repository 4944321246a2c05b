pub mod txt2img_client;

use crate::{
    config::GeneratorConfig,
    error::{GenerationError, Result},
    models::{Credentials, GenerationRequest},
    storage::ImageStore,
};
use std::path::PathBuf;

pub use txt2img_client::Txt2ImgClient;

/// Turns a prompt into a JPEG on disk: validate, call txt2img, decode, persist.
#[derive(Clone)]
pub struct ImageRequestHandler {
    client: Txt2ImgClient,
    store: ImageStore,
    default_steps: u32,
}

impl ImageRequestHandler {
    pub fn new(config: GeneratorConfig) -> Result<Self> {
        let client = Txt2ImgClient::new(&config)?;
        let store = ImageStore::new(&config.assets_root);

        Ok(Self::from_parts(client, store, config.default_steps))
    }

    pub fn from_parts(client: Txt2ImgClient, store: ImageStore, default_steps: u32) -> Self {
        Self {
            client,
            store,
            default_steps,
        }
    }

    pub fn client(&self) -> &Txt2ImgClient {
        &self.client
    }

    pub fn store(&self) -> &ImageStore {
        &self.store
    }

    pub fn default_steps(&self) -> u32 {
        self.default_steps
    }

    /// `steps` is the configured step count; unset or < 1 falls back to the
    /// handler's default. Nothing touches the network or the disk unless the
    /// credentials and prompt are usable.
    pub async fn generate(
        &self,
        prompt: &str,
        steps: Option<i64>,
        credentials: &Credentials,
    ) -> Result<PathBuf> {
        if credentials.is_empty() {
            log::warn!("No API key configured, skipping image generation");
            return Err(GenerationError::MissingCredentials);
        }

        let request = GenerationRequest::new(prompt, steps, self.default_steps)?;
        let encoded = self.client.txt2img(&request, credentials).await?;

        let image = ImageStore::decode(&encoded)?;
        let path = self.store.persist(&image)?;

        log::info!(
            "Image generation successful. Image saved as: {}",
            path.display()
        );
        Ok(path)
    }
}
