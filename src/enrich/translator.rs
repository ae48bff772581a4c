use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::EnrichmentError;
use crate::model::{QuestionTranslation, Translations};

const SERVICE: &str = "translator";

/// Batch translation: many inputs, many target languages, one call.
pub trait Translator {
    /// Results are positionally aligned with `texts`.
    async fn translate(
        &self,
        texts: &[&str],
        to: &[String],
    ) -> Result<Vec<TranslationResult>, EnrichmentError>;
}

#[derive(Serialize)]
struct TranslateInput<'a> {
    text: &'a str,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TranslationResult {
    pub translations: Vec<TranslatedText>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TranslatedText {
    pub to: String,
    pub text: String,
}

/// Translator REST endpoint (subscription key + region headers).
pub struct HttpTranslator {
    client: Client,
    endpoint: String,
    key: String,
    region: String,
}

impl HttpTranslator {
    pub fn new(
        client: Client,
        endpoint: impl Into<String>,
        key: impl Into<String>,
        region: impl Into<String>,
    ) -> Self {
        Self {
            client,
            endpoint: endpoint.into(),
            key: key.into(),
            region: region.into(),
        }
    }

    fn request_url(&self, to: &[String]) -> Result<url::Url, EnrichmentError> {
        let mut url = url::Url::parse(&self.endpoint).map_err(|e| EnrichmentError::Malformed {
            service: SERVICE,
            reason: format!("bad endpoint {}: {e}", self.endpoint),
        })?;
        {
            let mut query = url.query_pairs_mut();
            for lang in to {
                query.append_pair("to", lang);
            }
        }
        Ok(url)
    }
}

impl Translator for HttpTranslator {
    async fn translate(
        &self,
        texts: &[&str],
        to: &[String],
    ) -> Result<Vec<TranslationResult>, EnrichmentError> {
        info!("Translating text from de to {}", to.join(", "));
        let url = self.request_url(to)?;
        let body: Vec<TranslateInput<'_>> = texts.iter().map(|&text| TranslateInput { text }).collect();

        let response = self
            .client
            .post(url)
            .header("Ocp-Apim-Subscription-Key", &self.key)
            .header("Ocp-Apim-Subscription-Region", &self.region)
            .json(&body)
            .send()
            .await
            .map_err(|source| EnrichmentError::Transport {
                service: SERVICE,
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(EnrichmentError::Status {
                service: SERVICE,
                status: status.as_u16(),
            });
        }

        response.json().await.map_err(|e| EnrichmentError::Malformed {
            service: SERVICE,
            reason: e.to_string(),
        })
    }
}

/// Inputs sent per question: question, a, b, c, d, context.
pub const FIELD_COUNT: usize = 6;

/// Regroup positional results into one translation per language. A language
/// missing from an input's result becomes an empty string.
pub fn rebuild(
    results: &[TranslationResult],
    languages: &[String],
) -> Result<Translations, EnrichmentError> {
    if results.len() != FIELD_COUNT {
        return Err(EnrichmentError::Misaligned {
            sent: FIELD_COUNT,
            got: results.len(),
        });
    }

    let pick = |index: usize, lang: &str| -> String {
        results[index]
            .translations
            .iter()
            .find(|t| t.to == lang)
            .map(|t| t.text.clone())
            .unwrap_or_default()
    };

    Ok(languages
        .iter()
        .map(|lang| {
            let translation = QuestionTranslation {
                question: pick(0, lang),
                a: pick(1, lang),
                b: pick(2, lang),
                c: pick(3, lang),
                d: pick(4, lang),
                context: pick(5, lang),
            };
            (lang.clone(), translation)
        })
        .collect())
}
