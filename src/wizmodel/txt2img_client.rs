use crate::{
    config::GeneratorConfig,
    error::{GenerationError, Result},
    logger,
    models::{Credentials, GenerationRequest, Txt2ImgResponse},
};
use reqwest::{
    header::{AUTHORIZATION, CONTENT_TYPE},
    Client,
};

const MAX_ERROR_BODY: usize = 200;

#[derive(Clone)]
pub struct Txt2ImgClient {
    client: Client,
    endpoint: String,
}

impl Txt2ImgClient {
    pub fn new(config: &GeneratorConfig) -> Result<Self> {
        let mut builder = Client::builder();
        if let Some(timeout) = config.request_timeout {
            builder = builder.timeout(timeout);
        }

        let client = builder.build().map_err(|e| {
            GenerationError::ConfigError(format!("Failed to build HTTP client: {}", e))
        })?;

        Ok(Self {
            client,
            endpoint: config.endpoint.clone(),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Runs one txt2img call and returns the base64 payload of the first image.
    pub async fn txt2img(
        &self,
        request: &GenerationRequest,
        credentials: &Credentials,
    ) -> Result<String> {
        log::info!(
            "Requesting image from {} ({} steps)",
            self.endpoint,
            request.steps
        );
        log::debug!("txt2img prompt: {}", request.prompt);

        let _timer = logger::timer("txt2img request");

        let response = self
            .client
            .post(&self.endpoint)
            .header(CONTENT_TYPE, "application/json")
            .header(AUTHORIZATION, credentials.bearer())
            .json(request)
            .send()
            .await
            .map_err(|e| GenerationError::RequestFailed(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            let error_text: String = error_text.chars().take(MAX_ERROR_BODY).collect();
            return Err(GenerationError::RequestFailed(format!(
                "{}: {}",
                status, error_text
            )));
        }

        let body = response
            .text()
            .await
            .map_err(|e| GenerationError::RequestFailed(e.to_string()))?;

        let parsed: Txt2ImgResponse = serde_json::from_str(&body)
            .map_err(|e| GenerationError::MalformedResponse(e.to_string()))?;

        parsed
            .images
            .into_iter()
            .next()
            .ok_or_else(|| GenerationError::MalformedResponse("No images generated".into()))
    }
}
