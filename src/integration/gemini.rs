use std::env;

use async_trait::async_trait;
use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::reply::{self, model::Role, model::Turn};

const DEFAULT_MODEL: &str = "gemini-2.0-flash";
const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

type Result<T> = std::result::Result<T, Error>;

#[derive(Clone, Debug)]
pub struct Config {
    api_key: Option<String>,
    model: String,
    base_url: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_key: None,
            model: DEFAULT_MODEL.into(),
            base_url: DEFAULT_BASE_URL.into(),
        }
    }
}

impl Config {
    pub fn env() -> Option<Self> {
        match env::var("GEMINI_API_KEY") {
            Ok(key) if !key.trim().is_empty() => Some(Self {
                api_key: Some(key),
                model: env::var("GEMINI_MODEL").unwrap_or(DEFAULT_MODEL.into()),
                base_url: env::var("GEMINI_BASE_URL").unwrap_or(DEFAULT_BASE_URL.into()),
            }),
            _ => {
                warn!("GEMINI_API_KEY is not configured, auto-replies will fail");
                None
            }
        }
    }

    pub fn api_key(&self) -> Option<&str> {
        self.api_key.as_deref()
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn endpoint(&self) -> Result<url::Url> {
        let key = self.api_key.as_deref().ok_or(Error::MissingApiKey)?;
        let mut url = url::Url::parse(&format!(
            "{}/models/{}:generateContent",
            self.base_url.trim_end_matches('/'),
            self.model
        ))?;
        url.query_pairs_mut().append_pair("key", key);
        Ok(url)
    }
}

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("gemini api key is not configured")]
    MissingApiKey,
    #[error("gemini responded with {0}: {1}")]
    Status(u16, String),
    #[error("gemini returned no text")]
    EmptyResponse,

    #[error(transparent)]
    _Url(#[from] url::ParseError),
    #[error(transparent)]
    _Reqwest(#[from] reqwest::Error),
    #[error(transparent)]
    _ParseJson(#[from] serde_json::Error),
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest<'a> {
    system_instruction: Content<'a>,
    contents: Vec<Content<'a>>,
}

#[derive(Serialize, Debug)]
struct Content<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<&'static str>,
    parts: [Part<'a>; 1],
}

#[derive(Serialize, Debug)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Deserialize, Debug)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize, Debug)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Deserialize, Debug)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Deserialize, Debug)]
struct CandidatePart {
    text: Option<String>,
}

impl<'a> Content<'a> {
    fn new(role: Option<&'static str>, text: &'a str) -> Self {
        Self {
            role,
            parts: [Part { text }],
        }
    }
}

const fn role_name(role: &Role) -> &'static str {
    match role {
        Role::User => "user",
        Role::Persona => "model",
    }
}

fn build_request<'a>(instruction: &'a str, history: &'a [Turn], prompt: &'a str) -> GenerateRequest<'a> {
    let mut contents = history
        .iter()
        .map(|t| Content::new(Some(role_name(&t.role)), &t.text))
        .collect::<Vec<_>>();
    contents.push(Content::new(Some("user"), prompt));

    GenerateRequest {
        system_instruction: Content::new(None, instruction),
        contents,
    }
}

fn extract_text(body: &str) -> Result<String> {
    let response = serde_json::from_str::<GenerateResponse>(body)?;

    response
        .candidates
        .into_iter()
        .filter_map(|c| c.content)
        .flat_map(|c| c.parts)
        .filter_map(|p| p.text)
        .map(|t| t.trim().to_owned())
        .find(|t| !t.is_empty())
        .ok_or(Error::EmptyResponse)
}

#[derive(Clone)]
pub struct GeminiGenerator {
    cfg: Config,
    http: reqwest::Client,
}

impl GeminiGenerator {
    pub fn new(cfg: Config, http: reqwest::Client) -> Self {
        Self { cfg, http }
    }

    async fn generate_content(
        &self,
        instruction: &str,
        history: &[Turn],
        prompt: &str,
    ) -> Result<String> {
        let url = self.cfg.endpoint()?;
        let request = build_request(instruction, history, prompt);
        debug!("requesting reply from model '{}'", self.cfg.model());

        let response = self.http.post(url).json(&request).send().await?;
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            return Err(Error::Status(status.as_u16(), body));
        }

        extract_text(&body)
    }
}

#[async_trait]
impl reply::ReplyGenerator for GeminiGenerator {
    async fn generate(
        &self,
        instruction: &str,
        history: &[Turn],
        prompt: &str,
    ) -> reply::Result<String> {
        let text = self.generate_content(instruction, history, prompt).await?;
        Ok(text)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn should_serialize_request_in_gemini_shape() {
        let history = vec![Turn::new(Role::User, "yo"), Turn::new(Role::Persona, "sup")];

        let actual = serde_json::to_value(build_request("be chill", &history, "hi")).unwrap();

        assert_eq!(
            actual,
            serde_json::json!({
                "systemInstruction": {"parts": [{"text": "be chill"}]},
                "contents": [
                    {"role": "user", "parts": [{"text": "yo"}]},
                    {"role": "model", "parts": [{"text": "sup"}]},
                    {"role": "user", "parts": [{"text": "hi"}]}
                ]
            })
        );
    }

    #[test]
    fn should_extract_first_text_part() {
        let body = r#"{"candidates":[{"content":{"role":"model","parts":[{"text":" hey there \n"}]}}]}"#;

        assert_eq!(extract_text(body).unwrap(), "hey there");
    }

    #[test]
    fn should_fail_on_empty_candidates() {
        let body = r#"{"candidates":[]}"#;

        assert!(matches!(extract_text(body), Err(Error::EmptyResponse)));
    }

    #[test]
    fn should_fail_on_malformed_body() {
        assert!(matches!(extract_text("<html>"), Err(Error::_ParseJson(_))));
    }

    #[test]
    fn should_require_api_key() {
        let cfg = Config::default();

        assert!(matches!(cfg.endpoint(), Err(Error::MissingApiKey)));
    }

    #[test]
    fn should_build_endpoint_with_key() {
        let cfg = Config {
            api_key: Some("secret".into()),
            ..Config::default()
        };

        let url = cfg.endpoint().unwrap();

        assert_eq!(
            url.as_str(),
            "https://generativelanguage.googleapis.com/v1beta/models/gemini-2.0-flash:generateContent?key=secret"
        );
    }
}
