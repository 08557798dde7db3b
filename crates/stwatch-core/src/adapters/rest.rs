use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;

use super::fields::{lookup, text};
use crate::exchange_source::{ExchangeSource, InstrumentBatch, SourceError};
use crate::http_client::{HttpClient, HttpRequest};
use crate::pagination::{Page, PageFetcher, PaginationDriver};
use crate::profile::ExchangeProfile;
use crate::{ExchangeId, InstrumentDescriptor};

/// Public REST listing endpoint driven entirely by an [`ExchangeProfile`].
#[derive(Clone)]
pub struct RestExchangeSource {
    profile: ExchangeProfile,
    http_client: Arc<dyn HttpClient>,
}

impl RestExchangeSource {
    pub fn new(profile: ExchangeProfile, http_client: Arc<dyn HttpClient>) -> Self {
        Self {
            profile,
            http_client,
        }
    }

    pub fn profile(&self) -> &ExchangeProfile {
        &self.profile
    }

    fn request(&self, cursor: Option<&str>) -> HttpRequest {
        let mut request =
            HttpRequest::get(&self.profile.url).with_timeout_ms(self.profile.timeout_ms);
        for (name, value) in &self.profile.query {
            request = request.with_query(name, value);
        }
        for (name, value) in &self.profile.headers {
            request = request.with_header(name, value);
        }
        if let (Some(cursor), Some(pagination)) = (cursor, &self.profile.pagination) {
            request = request.with_query(&pagination.cursor_param, cursor);
        }
        request
    }

    async fn fetch_one(
        &self,
        cursor: Option<&str>,
    ) -> Result<Page<InstrumentDescriptor>, SourceError> {
        let exchange = self.profile.exchange;
        let response = self
            .http_client
            .execute(self.request(cursor))
            .await
            .map_err(|error| {
                SourceError::transport(format!("{exchange} transport error: {}", error.message()))
            })?;

        if !response.is_success() {
            return Err(SourceError::transport(format!(
                "{exchange} upstream returned status {}",
                response.status
            )));
        }

        let body: Value = serde_json::from_str(&response.body).map_err(|error| {
            SourceError::parse(format!("{exchange} response is not valid JSON: {error}"))
        })?;

        let entries = self.profile.response.entries(exchange, &body)?;
        let mut items = Vec::with_capacity(entries.len());
        for entry in entries {
            match self.profile.fields.descriptor(entry) {
                Some(descriptor) => items.push(descriptor),
                None => tracing::debug!(%exchange, "skipping non-object listing entry"),
            }
        }

        let next_cursor = self
            .profile
            .pagination
            .as_ref()
            .and_then(|pagination| lookup(&body, &pagination.cursor_path))
            .and_then(text);

        Ok(Page { items, next_cursor })
    }
}

impl PageFetcher<InstrumentDescriptor> for RestExchangeSource {
    fn fetch_page<'a>(
        &'a self,
        cursor: Option<&'a str>,
    ) -> Pin<Box<dyn Future<Output = Result<Page<InstrumentDescriptor>, SourceError>> + Send + 'a>>
    {
        Box::pin(self.fetch_one(cursor))
    }
}

impl ExchangeSource for RestExchangeSource {
    fn id(&self) -> ExchangeId {
        self.profile.exchange
    }

    fn fetch_instruments<'a>(
        &'a self,
    ) -> Pin<Box<dyn Future<Output = Result<InstrumentBatch, SourceError>> + Send + 'a>> {
        Box::pin(async move {
            let exchange = self.profile.exchange;
            if self.profile.request_delay_ms > 0 {
                tokio::time::sleep(Duration::from_millis(self.profile.request_delay_ms)).await;
            }

            let batch = match &self.profile.pagination {
                Some(pagination) => {
                    let driver = PaginationDriver::new(
                        exchange,
                        Duration::from_millis(pagination.page_delay_ms),
                    );
                    let walked = driver.collect(self).await?;
                    InstrumentBatch {
                        descriptors: walked.items,
                        pages: walked.pages,
                        warnings: walked
                            .anomaly
                            .map(|anomaly| vec![anomaly.to_string()])
                            .unwrap_or_default(),
                    }
                }
                None => {
                    let page = self.fetch_one(None).await?;
                    InstrumentBatch {
                        descriptors: page.items,
                        pages: 1,
                        warnings: Vec::new(),
                    }
                }
            };

            tracing::info!(
                %exchange,
                instruments = batch.descriptors.len(),
                pages = batch.pages,
                "fetched listing"
            );
            Ok(batch)
        })
    }
}
