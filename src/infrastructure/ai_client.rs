use std::time::Duration;

use reqwest_middleware::ClientWithMiddleware;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::infrastructure::core::http_client_factory::HttpClientFactory;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AiAnalysis {
    pub confidence: f64,
    pub final_decision: String,
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default)]
    pub bull_consensus: Option<f64>,
    #[serde(default)]
    pub bear_consensus: Option<f64>,
}

impl AiAnalysis {
    /// The neutral fallback the contract specifies: any AI failure resolves
    /// to this rather than propagating an error to the caller.
    pub fn neutral() -> Self {
        Self {
            confidence: 0.5,
            final_decision: "HOLD".to_string(),
            summary: None,
            bull_consensus: None,
            bear_consensus: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BiasJudgement {
    pub bias_detected: bool,
    #[serde(default)]
    pub bias_type: Option<String>,
    pub confidence: f64,
}

impl BiasJudgement {
    pub fn neutral() -> Self {
        Self {
            bias_detected: false,
            bias_type: None,
            confidence: 0.5,
        }
    }
}

/// Client for the external AI enrichment collaborator. Every call degrades
/// to a neutral default on any failure rather than propagating an error;
/// engines depending on AI output must treat the default as a normal input,
/// not a special case.
pub struct AiClient {
    client: ClientWithMiddleware,
    base_url: String,
    enabled: bool,
    timeout: Duration,
}

impl AiClient {
    pub fn new(base_url: impl Into<String>, enabled: bool, timeout_seconds: u64) -> Self {
        Self {
            client: HttpClientFactory::create_client(),
            base_url: base_url.into(),
            enabled,
            timeout: Duration::from_secs(timeout_seconds),
        }
    }

    pub async fn analyze(&self, symbol: &str, market_data: serde_json::Value) -> AiAnalysis {
        if !self.enabled {
            return AiAnalysis::neutral();
        }
        self.try_call(
            "/ai/analyze",
            serde_json::json!({ "symbol": symbol, "market_data": market_data }),
        )
        .await
        .unwrap_or_else(AiAnalysis::neutral)
    }

    pub async fn judge_bias(&self, symbol: &str, context: serde_json::Value) -> BiasJudgement {
        if !self.enabled {
            return BiasJudgement::neutral();
        }
        self.try_call(
            "/ai/judge/bias",
            serde_json::json!({ "symbol": symbol, "context": context }),
        )
        .await
        .unwrap_or_else(BiasJudgement::neutral)
    }

    pub async fn health(&self) -> bool {
        if !self.enabled {
            return false;
        }
        let url = format!("{}/health", self.base_url);
        matches!(
            self.client.get(&url).timeout(self.timeout).send().await,
            Ok(resp) if resp.status().is_success()
        )
    }

    /// Degrade-to-default helper: any transport error, non-2xx status, or
    /// malformed body becomes `None` rather than an `AppError`.
    async fn try_call<T: for<'de> Deserialize<'de>>(
        &self,
        path: &str,
        body: serde_json::Value,
    ) -> Option<T> {
        let url = format!("{}{path}", self.base_url);
        let response = match self
            .client
            .post(&url)
            .timeout(self.timeout)
            .json(&body)
            .send()
            .await
        {
            Ok(r) => r,
            Err(e) => {
                warn!(path, error = %e, "ai client: request failed, degrading to default");
                return None;
            }
        };

        if !response.status().is_success() {
            warn!(path, status = %response.status(), "ai client: non-success status, degrading to default");
            return None;
        }

        match response.json::<T>().await {
            Ok(value) => Some(value),
            Err(e) => {
                warn!(path, error = %e, "ai client: malformed response, degrading to default");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn neutral_analysis_matches_contract_default() {
        let n = AiAnalysis::neutral();
        assert_eq!(n.confidence, 0.5);
        assert_eq!(n.final_decision, "HOLD");
    }

    #[tokio::test]
    async fn disabled_client_never_makes_a_request() {
        let client = AiClient::new("http://127.0.0.1:1", false, 1);
        let result = client.analyze("BTC", serde_json::json!({})).await;
        assert_eq!(result.final_decision, "HOLD");
    }
}
