//! On-demand translation through a remote endpoint
//!
//! The endpoint is a single POST route taking `{"text", "targetLanguage"}`
//! and answering `{"translatedText"}`. Requests run on a dedicated thread so
//! the UI never blocks on the network.

use std::time::Duration;

use flume::{Receiver, Sender};
use serde::{Deserialize, Serialize};

use crate::doc::RequestId;
use crate::settings;

/// Environment override for the endpoint configured in settings
pub const ENDPOINT_ENV_VAR: &str = "HOJEAR_TRANSLATE_URL";

/// Target languages offered in the translation overlay
pub const LANGUAGES: [&str; 12] = [
    "Spanish",
    "French",
    "German",
    "Italian",
    "Portuguese",
    "Russian",
    "Japanese",
    "Chinese",
    "Korean",
    "Arabic",
    "Hindi",
    "English",
];

#[derive(Debug, thiserror::Error)]
pub enum TranslateError {
    #[error("no translation endpoint configured")]
    MissingEndpoint,
    #[error("network error: {0}")]
    Network(String),
    #[error("invalid response: {0}")]
    InvalidResponse(String),
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct TranslateRequest<'a> {
    text: &'a str,
    target_language: &'a str,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TranslateResponse {
    translated_text: String,
}

/// Resolve the endpoint, env var first, then settings
#[must_use]
pub fn configured_endpoint() -> Option<String> {
    std::env::var(ENDPOINT_ENV_VAR)
        .ok()
        .filter(|url| !url.is_empty())
        .or_else(settings::get_translate_endpoint)
}

/// Translate `text` synchronously. Called from the translator thread.
pub fn translate(
    endpoint: &str,
    text: &str,
    target_language: &str,
) -> Result<String, TranslateError> {
    let payload = serde_json::to_string(&TranslateRequest {
        text,
        target_language,
    })
    .map_err(|e| TranslateError::InvalidResponse(format!("request encoding: {e}")))?;

    let agent = ureq::AgentBuilder::new()
        .timeout(Duration::from_secs(30))
        .build();

    let resp = agent
        .post(endpoint)
        .set("Content-Type", "application/json")
        .send_string(&payload)
        .map_err(|e| TranslateError::Network(e.to_string()))?;

    let body = resp
        .into_string()
        .map_err(|e| TranslateError::InvalidResponse(e.to_string()))?;

    let parsed: TranslateResponse = serde_json::from_str(&body)
        .map_err(|e| TranslateError::InvalidResponse(e.to_string()))?;

    Ok(parsed.translated_text)
}

#[derive(Debug)]
pub struct TranslateJob {
    pub id: RequestId,
    pub text: String,
    pub target_language: String,
}

#[derive(Debug)]
pub struct TranslateOutcome {
    pub id: RequestId,
    pub result: Result<String, TranslateError>,
}

/// Handle to the translator thread
pub struct Translator {
    job_tx: Sender<TranslateJob>,
    outcome_rx: Receiver<TranslateOutcome>,
}

impl Translator {
    #[must_use]
    pub fn spawn() -> Self {
        let (job_tx, job_rx) = flume::unbounded::<TranslateJob>();
        let (outcome_tx, outcome_rx) = flume::unbounded();

        std::thread::spawn(move || {
            for job in job_rx {
                let result = match configured_endpoint() {
                    Some(endpoint) => translate(&endpoint, &job.text, &job.target_language),
                    None => Err(TranslateError::MissingEndpoint),
                };

                let outcome = TranslateOutcome { id: job.id, result };
                if outcome_tx.send(outcome).is_err() {
                    break;
                }
            }
        });

        Self { job_tx, outcome_rx }
    }

    pub fn request(&self, id: RequestId, text: String, target_language: String) {
        let _ = self.job_tx.send(TranslateJob {
            id,
            text,
            target_language,
        });
    }

    /// Poll one finished job, non-blocking
    pub fn poll(&self) -> Option<TranslateOutcome> {
        self.outcome_rx.try_recv().ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    fn request_wire_shape_is_camel_case() {
        let value = serde_json::to_value(TranslateRequest {
            text: "hola",
            target_language: "English",
        })
        .unwrap();

        assert_eq!(
            value,
            serde_json::json!({"text": "hola", "targetLanguage": "English"})
        );
    }

    #[test]
    fn response_parses_translated_text() {
        let parsed: TranslateResponse =
            serde_json::from_str(r#"{"translatedText": "hello"}"#).unwrap();
        assert_eq!(parsed.translated_text, "hello");

        let bad = serde_json::from_str::<TranslateResponse>(r#"{"text": "hello"}"#);
        assert!(bad.is_err());
    }

    #[test]
    #[serial]
    fn env_var_overrides_settings_endpoint() {
        unsafe { std::env::set_var(ENDPOINT_ENV_VAR, "http://localhost:9999/translate") };
        assert_eq!(
            configured_endpoint().as_deref(),
            Some("http://localhost:9999/translate")
        );

        unsafe { std::env::remove_var(ENDPOINT_ENV_VAR) };
    }

    #[test]
    #[serial]
    fn empty_env_var_is_ignored() {
        unsafe { std::env::set_var(ENDPOINT_ENV_VAR, "") };
        crate::settings::set_ephemeral(true);
        crate::settings::set_translate_endpoint(Some("http://from-settings/t".to_string()));

        assert_eq!(
            configured_endpoint().as_deref(),
            Some("http://from-settings/t")
        );

        crate::settings::set_translate_endpoint(None);
        unsafe { std::env::remove_var(ENDPOINT_ENV_VAR) };
    }

    #[test]
    fn error_messages_are_user_facing() {
        assert_eq!(
            TranslateError::MissingEndpoint.to_string(),
            "no translation endpoint configured"
        );
        assert!(
            TranslateError::Network("connection refused".into())
                .to_string()
                .contains("connection refused")
        );
    }
}
