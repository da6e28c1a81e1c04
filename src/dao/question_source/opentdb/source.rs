use std::sync::Arc;

use futures::future::BoxFuture;
use reqwest::Client;

use crate::dao::question_source::{
    QuestionFilters, QuestionSource, SourceBatch, SourceError, SourceResult,
};

use super::{config::OpenTdbConfig, models::OpenTdbResponse};

#[derive(Clone)]
pub struct OpenTdbSource {
    client: Client,
    api_url: Arc<str>,
}

impl OpenTdbSource {
    /// Build the HTTP client used to query Open Trivia DB.
    pub fn new(config: OpenTdbConfig) -> SourceResult<Self> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|source| SourceError::ClientBuilder { source })?;

        Ok(Self {
            client,
            api_url: Arc::<str>::from(config.api_url),
        })
    }

    async fn fetch_batch(&self, amount: u32, filters: QuestionFilters) -> SourceResult<SourceBatch> {
        let url = self.api_url.to_string();
        let response = self
            .client
            .get(&url)
            .query(&query_params(amount, &filters))
            .send()
            .await
            .map_err(|source| SourceError::Request {
                url: url.clone(),
                source,
            })?;

        if !response.status().is_success() {
            return Err(SourceError::HttpStatus {
                url,
                status: response.status(),
            });
        }

        let payload = response
            .json::<OpenTdbResponse>()
            .await
            .map_err(|source| SourceError::Decode {
                url: url.clone(),
                source,
            })?;

        let status_code = payload
            .response_code
            .ok_or(SourceError::MissingResponseCode { url })?;

        Ok(SourceBatch {
            status_code,
            records: payload.into_records(),
        })
    }
}

impl QuestionSource for OpenTdbSource {
    fn fetch(
        &self,
        amount: u32,
        filters: QuestionFilters,
    ) -> BoxFuture<'static, SourceResult<SourceBatch>> {
        let source = self.clone();
        Box::pin(async move { source.fetch_batch(amount, filters).await })
    }
}

/// Query string for `api.php`; blank filters are left out.
fn query_params(amount: u32, filters: &QuestionFilters) -> Vec<(&'static str, String)> {
    let mut params = vec![("amount", amount.max(1).to_string())];
    let optional = [
        ("category", &filters.category),
        ("difficulty", &filters.difficulty),
        ("type", &filters.question_type),
        ("encode", &filters.encode),
    ];
    params.extend(
        optional
            .into_iter()
            .filter(|(_, value)| !value.trim().is_empty())
            .map(|(key, value)| (key, value.trim().to_string())),
    );
    params
}
