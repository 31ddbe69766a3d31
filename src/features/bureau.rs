//! Credit bureau pulls. Without an API key the provider is simulated:
//! the same applicant details always produce the same score, so demo
//! environments behave repeatably. With a key but no endpoint a fixed
//! stub score is returned; with both, the configured provider is called
//! and any failure falls back to the stub.

use crate::config::AppConfig;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

const STUB_SCORE: u32 = 720;

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct BureauRequest {
    #[serde(default)]
    pub pan: Option<String>,
    #[serde(default)]
    pub aadhar: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub dob: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct BureauReport {
    pub enabled: bool,
    pub ok: bool,
    pub score: Option<u32>,
    pub provider: Option<String>,
    pub message: String,
}

impl BureauReport {
    fn scored(score: u32, provider: &str, message: &str) -> Self {
        Self {
            enabled: true,
            ok: true,
            score: Some(score),
            provider: Some(provider.to_string()),
            message: message.to_string(),
        }
    }
}

/// Deterministic score in 300..=900 derived from the normalized applicant
/// details. Aadhaar spacing and name casing do not change the score.
fn simulated_score(request: &BureauRequest) -> u32 {
    let aadhar: String = request
        .aadhar
        .as_deref()
        .unwrap_or("")
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect();
    let name = request.name.as_deref().unwrap_or("").trim().to_lowercase();
    let pan = request.pan.as_deref().unwrap_or("").trim().to_uppercase();
    let dob = request.dob.as_deref().unwrap_or("").trim();

    let seed = format!("{}|{}|{}|{}", aadhar, name, pan, dob);
    let digest = Uuid::new_v5(&Uuid::NAMESPACE_OID, seed.as_bytes());
    let mut x = 0u64;
    for byte in &digest.as_bytes()[..8] {
        x = (x << 8) | u64::from(*byte);
    }
    300 + (x % 601) as u32
}

async fn live_pull(
    url: &str,
    api_key: &str,
    request: &BureauRequest,
) -> Result<Option<u32>, reqwest::Error> {
    let response = reqwest::Client::new()
        .post(url)
        .bearer_auth(api_key)
        .json(request)
        .send()
        .await?
        .error_for_status()?;
    let body: serde_json::Value = response.json().await?;
    Ok(body.get("score").and_then(|v| v.as_u64()).map(|s| s as u32))
}

pub async fn pull(config: &AppConfig, request: &BureauRequest) -> BureauReport {
    if !config.bureau_enabled {
        return BureauReport {
            enabled: false,
            ok: true,
            score: None,
            provider: None,
            message: "Credit bureau integration is disabled.".to_string(),
        };
    }

    let Some(api_key) = config.bureau_api_key.as_deref() else {
        return BureauReport::scored(
            simulated_score(request),
            "simulated",
            "Simulated bureau score.",
        );
    };

    let Some(url) = config.bureau_url.as_deref() else {
        return BureauReport::scored(STUB_SCORE, "stub", "Stub bureau score.");
    };

    match live_pull(url, api_key, request).await {
        Ok(Some(score)) => BureauReport::scored(score, "live", "Bureau report fetched."),
        Ok(None) => {
            tracing::warn!(url, "bureau response carried no score; stub used");
            BureauReport::scored(STUB_SCORE, "stub", "Provider returned no score.")
        }
        Err(err) => {
            tracing::warn!(url, error = %err, "bureau pull failed; stub used");
            BureauReport::scored(STUB_SCORE, "stub", "Provider unreachable.")
        }
    }
}
