//! AI tech advisor.
//!
//! Relays a shopper's question to a generative-text backend with a fixed persona and
//! sampling temperature. [`TechAdvisor::get_advice`] never fails: any backend error is
//! logged and replaced with [`FALLBACK_REPLY`].

pub mod config;
pub mod gemini;
pub mod session;

use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

pub use config::AdvisorConfig;
pub use gemini::GeminiClient;
pub use session::{ChatMessage, ChatRole, ChatSession, ChatTicket};

pub const SYSTEM_INSTRUCTION: &str = "You are the ZM Computers AI Advisor. You specialize in wholesale computer hardware, \
enterprise workstation deployments, and high-end gaming laptops. Provide concise, professional, and knowledgeable \
advice for bulk purchasers and tech enthusiasts. Use a sophisticated tone.";

pub const TEMPERATURE: f32 = 0.7;

pub const FALLBACK_REPLY: &str = "I'm sorry, I'm having trouble connecting to my database. Please contact our \
wholesale team directly for immediate assistance.";

pub const GREETING: &str = "Welcome to ZM Computers. I am your AI Tech Advisor. How can I assist with your \
wholesale requirements today?";

#[derive(Debug, Error)]
pub enum AdvisorError {
    #[error("config parse failed: {0}")]
    ConfigParse(String),

    #[error("missing API key: env var {var} not set")]
    MissingApiKey { var: String },

    #[error("API request failed: {0}")]
    ApiRequest(String),

    #[error("API response error: status {status}")]
    ApiResponse { status: u16, body: String },

    #[error("API response parse failed: {0}")]
    ApiParse(String),

    #[error("prompt blocked: {0}")]
    Blocked(String),

    #[error("API returned no text")]
    EmptyResponse,

    #[error("HTTP client build failed: {0}")]
    HttpClientBuild(String),
}

/// A text-completion service the advisor can ask.
#[async_trait]
pub trait AdviceBackend: Send + Sync {
    async fn generate(&self, system: &str, prompt: &str, temperature: f32) -> Result<String, AdvisorError>;
}

/// Stands in when no backend could be configured; every call fails with the setup error.
struct Unavailable(String);

#[async_trait]
impl AdviceBackend for Unavailable {
    async fn generate(&self, _system: &str, _prompt: &str, _temperature: f32) -> Result<String, AdvisorError> {
        Err(AdvisorError::ConfigParse(self.0.clone()))
    }
}

#[derive(Clone)]
pub struct TechAdvisor {
    backend: Arc<dyn AdviceBackend>,
}

impl TechAdvisor {
    pub fn new(backend: Arc<dyn AdviceBackend>) -> Self { Self { backend } }

    /// Gemini-backed advisor from the environment. A missing key or bad setting is
    /// logged once here and every later question gets the fallback reply.
    pub fn from_env() -> Self {
        match AdvisorConfig::from_env().and_then(GeminiClient::new) {
            Ok(client) => {
                tracing::info!(model = client.model(), "tech advisor ready");
                Self::new(Arc::new(client))
            }
            Err(e) => {
                tracing::warn!(error = %e, "tech advisor unavailable, replies will use the fallback");
                Self::new(Arc::new(Unavailable(e.to_string())))
            }
        }
    }

    pub async fn get_advice(&self, prompt: &str) -> String {
        match self.backend.generate(SYSTEM_INSTRUCTION, prompt, TEMPERATURE).await {
            Ok(text) => text,
            Err(e) => {
                tracing::error!(error = %e, "advisor request failed");
                FALLBACK_REPLY.to_string()
            }
        }
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use std::sync::Mutex;

    /// Replays canned outcomes and records what it was asked.
    #[derive(Default)]
    pub struct ScriptedBackend {
        replies: Mutex<Vec<Result<String, AdvisorError>>>,
        pub seen: Mutex<Vec<(String, String, f32)>>,
    }

    impl ScriptedBackend {
        pub fn replying(replies: Vec<Result<String, AdvisorError>>) -> Arc<Self> {
            Arc::new(Self { replies: Mutex::new(replies.into_iter().rev().collect()), seen: Mutex::default() })
        }
    }

    #[async_trait]
    impl AdviceBackend for ScriptedBackend {
        async fn generate(&self, system: &str, prompt: &str, temperature: f32) -> Result<String, AdvisorError> {
            self.seen.lock().unwrap().push((system.to_string(), prompt.to_string(), temperature));
            self.replies.lock().unwrap().pop().unwrap_or(Err(AdvisorError::EmptyResponse))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::testing::ScriptedBackend;
    use super::*;

    #[tokio::test]
    async fn returns_backend_text() {
        let backend = ScriptedBackend::replying(vec![Ok("Go with the Titan node.".into())]);
        let advisor = TechAdvisor::new(backend.clone());
        assert_eq!(advisor.get_advice("Server for a render farm?").await, "Go with the Titan node.");

        let seen = backend.seen.lock().unwrap();
        assert_eq!(seen[0].0, SYSTEM_INSTRUCTION);
        assert_eq!(seen[0].1, "Server for a render farm?");
        assert!((seen[0].2 - TEMPERATURE).abs() < f32::EPSILON);
    }

    #[tokio::test]
    async fn failures_become_fallback() {
        let backend = ScriptedBackend::replying(vec![
            Err(AdvisorError::ApiRequest("connection reset".into())),
            Err(AdvisorError::ApiResponse { status: 429, body: "quota".into() }),
            Err(AdvisorError::ApiParse("expected value".into())),
        ]);
        let advisor = TechAdvisor::new(backend);
        for _ in 0..3 {
            assert_eq!(advisor.get_advice("hello").await, FALLBACK_REPLY);
        }
    }

    #[tokio::test]
    async fn unavailable_backend_uses_fallback() {
        let advisor = TechAdvisor::new(Arc::new(Unavailable("no key".into())));
        assert_eq!(advisor.get_advice("hello").await, FALLBACK_REPLY);
    }
}
