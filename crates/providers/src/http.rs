//! HTTP plumbing shared by the adapters.

use serde::de::DeserializeOwned;
use tracing::warn;
use zabbot_core::error::ProviderError;

/// Send a prepared request and decode a successful JSON body.
///
/// Status mapping: 401/403 authentication, 429 rate limit, any other non-2xx
/// an API error carrying the response body.
pub(crate) async fn send_json<T: DeserializeOwned>(
    provider: &str,
    request: reqwest::RequestBuilder,
) -> Result<T, ProviderError> {
    let response = request.send().await.map_err(|e| {
        if e.is_timeout() {
            ProviderError::Timeout(e.to_string())
        } else {
            ProviderError::Network(e.to_string())
        }
    })?;

    let status = response.status().as_u16();
    let retry_after = response
        .headers()
        .get(reqwest::header::RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse::<u64>().ok());

    if status == 429 {
        return Err(ProviderError::RateLimited {
            retry_after_secs: retry_after.unwrap_or(5),
        });
    }

    let body = response
        .text()
        .await
        .map_err(|e| ProviderError::Network(e.to_string()))?;

    if status == 401 || status == 403 {
        return Err(ProviderError::AuthenticationFailed(format!(
            "{provider} rejected the credentials: {}",
            error_message(&body)
        )));
    }
    if !(200..300).contains(&status) {
        warn!(provider, status, body = %body, "Provider API error");
        return Err(ProviderError::ApiError {
            status_code: status,
            message: error_message(&body),
        });
    }

    serde_json::from_str(&body).map_err(|e| {
        ProviderError::InvalidResponse(format!("failed to parse {provider} response: {e}"))
    })
}

/// Pull a readable message out of an error body, falling back to the raw text.
fn error_message(body: &str) -> String {
    let Ok(value) = serde_json::from_str::<serde_json::Value>(body) else {
        return body.trim().to_string();
    };
    value["error"]["message"]
        .as_str()
        .or_else(|| value["message"].as_str())
        .or_else(|| value["Message"].as_str())
        .map(String::from)
        .unwrap_or_else(|| body.trim().to_string())
}
