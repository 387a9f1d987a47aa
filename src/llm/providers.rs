use super::{
    ApiErrorEnvelope, GenerateContentRequest, GenerateContentResponse, LLMError, LLM,
};
use crate::config::LLMConfig;
use async_trait::async_trait;
use serde_json::json;
use tracing::{debug, warn};
use url::Url;

/// Gemini provider implementation
pub struct GeminiProvider {
    endpoint_base: String,
    client: reqwest::Client,
}

impl GeminiProvider {
    pub fn new(config: &LLMConfig) -> Result<Self, LLMError> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = config.timeout() {
            builder = builder.timeout(timeout);
        }
        let client = builder.build()?;

        Ok(Self {
            endpoint_base: config.endpoint_base.trim_end_matches('/').to_string(),
            client,
        })
    }

    /// `{base}/models/{model}:generateContent?key={api_key}`
    pub fn endpoint_url(&self, model: &str, api_key: &str) -> Result<Url, LLMError> {
        let raw = format!("{}/models/{}:generateContent", self.endpoint_base, model);
        let mut url = Url::parse(&raw).map_err(|e| LLMError::InvalidEndpoint(e.to_string()))?;
        url.query_pairs_mut().append_pair("key", api_key);
        Ok(url)
    }

    async fn post(&self, url: Url, body: &serde_json::Value) -> Result<reqwest::Response, LLMError> {
        // The URL carries the key, so only the path goes to the log.
        debug!("POST {}", url.path());
        let response = self.client.post(url).json(body).send().await?;
        Ok(response)
    }
}

#[async_trait]
impl LLM for GeminiProvider {
    async fn generate_content(
        &self,
        model: &str,
        api_key: &str,
        request: &GenerateContentRequest,
    ) -> Result<GenerateContentResponse, LLMError> {
        let url = self.endpoint_url(model, api_key)?;
        let body = serde_json::to_value(request).map_err(|e| LLMError::Decode(e.to_string()))?;

        debug!("Sending request to Gemini API (model {})", model);
        let response = self.post(url, &body).await?;

        if !response.status().is_success() {
            let status = response.status();
            let envelope: ApiErrorEnvelope = response.json().await.unwrap_or_else(|e| {
                warn!("Unreadable error envelope from Gemini API: {}", e);
                ApiErrorEnvelope::default()
            });
            return Err(LLMError::Api {
                status: status.as_u16(),
                message: envelope.message(),
            });
        }

        let text = response.text().await?;
        serde_json::from_str(&text).map_err(|e| LLMError::Decode(e.to_string()))
    }

    async fn relay(
        &self,
        model: &str,
        api_key: &str,
        contents: serde_json::Value,
    ) -> Result<serde_json::Value, LLMError> {
        let url = self.endpoint_url(model, api_key)?;
        let response = self.post(url, &json!({ "contents": contents })).await?;

        let status = response.status();
        if !status.is_success() {
            debug!("Gemini API answered {}, relaying body as-is", status);
        }

        let text = response.text().await?;
        serde_json::from_str(&text).map_err(|e| LLMError::Decode(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn provider(base: &str) -> GeminiProvider {
        let config = LLMConfig {
            endpoint_base: base.to_string(),
            ..LLMConfig::default()
        };
        GeminiProvider::new(&config).unwrap()
    }

    #[test]
    fn test_endpoint_url_template() {
        let url = provider("https://generativelanguage.googleapis.com/v1beta")
            .endpoint_url("gemini-1.5-flash", "abc123")
            .unwrap();
        assert_eq!(
            url.as_str(),
            "https://generativelanguage.googleapis.com/v1beta/models/gemini-1.5-flash:generateContent?key=abc123"
        );
    }

    #[test]
    fn test_endpoint_url_trailing_slash_and_escaping() {
        let url = provider("http://127.0.0.1:9999/v1beta/")
            .endpoint_url("m", "a&b=c")
            .unwrap();
        assert_eq!(url.path(), "/v1beta/models/m:generateContent");
        let key: Vec<_> = url.query_pairs().collect();
        assert_eq!(key.len(), 1);
        assert_eq!(key[0].0, "key");
        assert_eq!(key[0].1, "a&b=c");
    }

    #[test]
    fn test_invalid_endpoint_base() {
        let err = provider("not a url").endpoint_url("m", "k").unwrap_err();
        assert!(matches!(err, LLMError::InvalidEndpoint(_)));
    }

    #[tokio::test]
    async fn test_transport_error_hides_key() {
        // Bind and drop to get a port nobody listens on
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let provider = provider(&format!("http://{}/v1beta", addr));
        let err = provider
            .relay("m", "SECRET-KEY-123", serde_json::json!([]))
            .await
            .unwrap_err();

        assert!(matches!(err, LLMError::Transport(_)));
        assert!(!err.to_string().contains("SECRET-KEY-123"));
        assert!(!format!("{:?}", err).contains("SECRET-KEY-123"));
    }
}
