use std::fmt;

/// API key for the txt2img service.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Credentials {
    api_key: String,
}

impl Credentials {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
        }
    }

    pub fn api_key(&self) -> &str {
        &self.api_key
    }

    pub fn is_empty(&self) -> bool {
        self.api_key.trim().is_empty()
    }

    pub fn bearer(&self) -> String {
        format!("Bearer {}", self.api_key)
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("api_key", &format!("<{} chars>", self.api_key.len()))
            .finish()
    }
}
