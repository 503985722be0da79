use crate::traits::Recognizer;
use crate::{SourceDocument, SourceError};
use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;
use url::Url;

#[derive(Debug, Clone, PartialEq)]
pub struct PageText {
    pub number: u32,
    pub text: String,
}

#[derive(Debug, Clone, Serialize)]
struct OcrRequest {
    pdf_base64: String,
    source_path: String,
    page: u32,
}

#[derive(Debug, Clone, Deserialize)]
struct OcrResponse {
    pages: Option<Vec<OcrPage>>,
    text: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct OcrPage {
    #[serde(default)]
    page: Option<u32>,
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Clone)]
pub struct OcrEndpointConfig {
    pub endpoint: Url,
    pub api_key: Option<String>,
    pub timeout: Duration,
}

impl OcrEndpointConfig {
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(120);

    pub fn new(endpoint: &str, api_key: Option<&str>) -> Result<Self, SourceError> {
        let endpoint = Url::parse(endpoint.trim())?;
        let api_key = api_key
            .map(str::trim)
            .filter(|key| !key.is_empty())
            .map(str::to_string);

        Ok(Self {
            endpoint,
            api_key,
            timeout: Self::DEFAULT_TIMEOUT,
        })
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// Page recognition through an HTTP OCR service.
///
/// The service receives the whole PDF base64-encoded plus the 1-based page
/// wanted, and answers with either `{"pages": [{"page", "text"}]}` or a single
/// form-feed separated `{"text"}`.
pub struct HttpRecognizer {
    client: Client,
    config: OcrEndpointConfig,
}

impl HttpRecognizer {
    pub fn new(config: OcrEndpointConfig) -> Result<Self, SourceError> {
        let client = Client::builder().timeout(config.timeout).build()?;
        Ok(Self { client, config })
    }
}

#[async_trait]
impl Recognizer for HttpRecognizer {
    async fn recognize(
        &self,
        document: &SourceDocument,
        page_index: usize,
    ) -> Result<String, SourceError> {
        let page = u32::try_from(page_index + 1).map_err(|_| {
            SourceError::InvalidArgument(format!("page index {page_index} is too large"))
        })?;
        let pdf = tokio::fs::read(&document.path).await?;
        let payload = OcrRequest {
            pdf_base64: STANDARD.encode(pdf),
            source_path: document.path.to_string_lossy().to_string(),
            page,
        };

        let mut request = self
            .client
            .post(self.config.endpoint.clone())
            .header("content-type", "application/json")
            .json(&payload);
        if let Some(api_key) = &self.config.api_key {
            request = request.bearer_auth(api_key);
        }

        debug!(document = %document.file_name, page, "ocr request");
        let response = request.send().await?;
        if !response.status().is_success() {
            return Err(SourceError::OcrFailed(format!(
                "OCR request to {} returned {}",
                self.config.endpoint,
                response.status()
            )));
        }

        let payload: OcrResponse = response.json().await?;
        let pages = payload_to_pages(&payload, &document.file_name)?;
        select_page(pages, page).ok_or_else(|| {
            SourceError::OcrFailed(format!(
                "OCR response for {} has no text for page {page}",
                document.file_name
            ))
        })
    }
}

/// The requested page, or the only page when the service answered with just
/// the one it was asked for.
fn select_page(pages: Vec<PageText>, wanted: u32) -> Option<String> {
    if pages.len() == 1 {
        return pages.into_iter().next().map(|page| page.text);
    }
    pages
        .into_iter()
        .find(|page| page.number == wanted)
        .map(|page| page.text)
}

fn payload_to_pages(payload: &OcrResponse, source: &str) -> Result<Vec<PageText>, SourceError> {
    if let Some(listed) = &payload.pages {
        let listed = listed
            .iter()
            .filter_map(|page| {
                let text = page.text.as_deref().map(str::trim).unwrap_or_default();
                if text.is_empty() {
                    None
                } else {
                    Some(PageText {
                        number: page.page.unwrap_or(1),
                        text: text.to_string(),
                    })
                }
            })
            .collect::<Vec<_>>();

        if !listed.is_empty() {
            return Ok(listed);
        }
    }

    if let Some(raw_text) = &payload.text {
        let pages = raw_text
            .split('\u{000c}')
            .enumerate()
            .filter_map(|(index, chunk)| {
                let text = chunk.trim();
                if text.is_empty() {
                    None
                } else {
                    Some(PageText {
                        number: (index + 1) as u32,
                        text: text.to_string(),
                    })
                }
            })
            .collect::<Vec<_>>();

        if !pages.is_empty() {
            return Ok(pages);
        }
    }

    Err(SourceError::OcrFailed(format!(
        "OCR response was empty for {source}"
    )))
}
