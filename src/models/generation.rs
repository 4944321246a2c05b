use crate::error::{GenerationError, Result};
use serde::{Deserialize, Serialize};

/// Body of a txt2img call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GenerationRequest {
    pub prompt: String,
    pub steps: u32,
}

impl GenerationRequest {
    /// Builds a request, falling back to `default_steps` when the configured
    /// step count is unset or below 1.
    pub fn new(prompt: &str, configured_steps: Option<i64>, default_steps: u32) -> Result<Self> {
        if prompt.trim().is_empty() {
            return Err(GenerationError::EmptyPrompt);
        }

        Ok(Self {
            prompt: prompt.to_string(),
            steps: resolve_steps(configured_steps, default_steps),
        })
    }
}

pub fn resolve_steps(configured: Option<i64>, default_steps: u32) -> u32 {
    match configured {
        Some(steps) if steps >= 1 => u32::try_from(steps).unwrap_or(u32::MAX),
        _ => default_steps,
    }
}

#[derive(Debug, Deserialize)]
pub struct Txt2ImgResponse {
    pub images: Vec<String>,
}

/// A decoded image ready to be written to disk.
#[derive(Debug, Clone)]
pub struct GeneratedImage {
    pub binary_data: Vec<u8>,
    pub format: image::ImageFormat,
    pub pixels: image::DynamicImage,
}
