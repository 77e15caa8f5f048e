use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;

use barometer_core::config::DecorationConfig;
use barometer_core::ports::{DecorationError, DecorationSource};

const API_KEY_HEADER: &str = "X-TheySaidSo-Api-Secret";

/// Quote-of-the-day feed used to decorate replies.
#[derive(Debug)]
pub struct QuoteFeed {
    client: Client,
    url: String,
    api_key: Option<SecretString>,
}

impl QuoteFeed {
    pub fn new(
        url: impl Into<String>,
        api_key: Option<SecretString>,
        timeout: Duration,
    ) -> Result<Self, reqwest::Error> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self { client, url: url.into(), api_key })
    }

    pub fn from_config(config: &DecorationConfig) -> Result<Self, reqwest::Error> {
        Self::new(
            config.feed_url.clone(),
            config.api_key.clone(),
            Duration::from_secs(config.timeout_secs),
        )
    }
}

#[async_trait]
impl DecorationSource for QuoteFeed {
    async fn fetch(&self) -> Result<String, DecorationError> {
        let mut request = self.client.get(&self.url).header("Accept", "application/json");
        if let Some(api_key) = &self.api_key {
            request = request.header(API_KEY_HEADER, api_key.expose_secret());
        }

        let response =
            request.send().await.map_err(|error| DecorationError::Transport(error.to_string()))?;
        let status = response.status();
        if !status.is_success() {
            return Err(DecorationError::Status(status.as_u16()));
        }

        let payload: QuoteOfTheDay =
            response.json().await.map_err(|error| DecorationError::Payload(error.to_string()))?;
        payload.render().ok_or_else(|| DecorationError::Payload("no quote in feed".to_string()))
    }
}

#[derive(Debug, Deserialize)]
struct QuoteOfTheDay {
    contents: QuoteContents,
}

#[derive(Debug, Deserialize)]
struct QuoteContents {
    #[serde(default)]
    quotes: Vec<QuoteEntry>,
}

#[derive(Debug, Deserialize)]
struct QuoteEntry {
    quote: String,
    #[serde(default)]
    author: Option<String>,
}

impl QuoteOfTheDay {
    fn render(&self) -> Option<String> {
        let entry = self.contents.quotes.first()?;
        let quote = entry.quote.trim();
        if quote.is_empty() {
            return None;
        }

        match entry.author.as_deref().map(str::trim).filter(|author| !author.is_empty()) {
            Some(author) => Some(format!("{quote} - {author}")),
            None => Some(quote.to_string()),
        }
    }
}
