//! Client for the gateway's cookie-gated admin API.

use reqwest::header::COOKIE;
use reqwest::{Client, RequestBuilder, Response};
use serde::Serialize;
use serde_json::Value;

pub type Error = Box<dyn std::error::Error + Send + Sync>;

pub struct AdminClient {
    client: Client,
    base_url: String,
    cookie_key: String,
    cookie_value: String,
}

impl AdminClient {
    /// `base_url` is the gateway root, e.g. `http://localhost:8080`.
    pub fn new(base_url: &str, cookie_key: &str, cookie_value: &str) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            cookie_key: cookie_key.to_string(),
            cookie_value: cookie_value.to_string(),
        }
    }

    fn authed(&self, builder: RequestBuilder) -> RequestBuilder {
        builder.header(COOKIE, format!("{}={}", self.cookie_key, self.cookie_value))
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// The gateway's active configuration.
    pub async fn get_config(&self) -> Result<Value, Error> {
        let resp = self
            .authed(self.client.get(self.url("/admin/api/config")))
            .send()
            .await?;
        read_json(resp).await
    }

    /// Replace the gateway's configuration. `config` must be complete.
    pub async fn update_config<C: Serialize + ?Sized>(&self, config: &C) -> Result<Value, Error> {
        let resp = self
            .authed(self.client.post(self.url("/admin/api/config")))
            .json(config)
            .send()
            .await?;
        read_json(resp).await
    }

    /// Up to `limit` most recent request log records, newest first.
    pub async fn logs(&self, limit: usize) -> Result<Vec<Value>, Error> {
        let resp = self
            .authed(self.client.get(self.url("/admin/api/logs")))
            .query(&[("limit", limit)])
            .send()
            .await?;
        let value = read_json(resp).await?;
        Ok(serde_json::from_value(value)?)
    }
}

async fn read_json(resp: Response) -> Result<Value, Error> {
    let status = resp.status();
    let text = resp.text().await?;

    if !status.is_success() {
        return Err(format!("Gateway returned error status {}: {}", status, text).into());
    }

    Ok(serde_json::from_str(&text)?)
}
