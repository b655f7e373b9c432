use crate::error::{Error, Result};
use reqwest::{Client, RequestBuilder, Response, header};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::{debug, warn};

/// Thin reqwest wrapper shared by the backend and AI clients.
///
/// Requests are sent exactly once. Non-2xx statuses become [`Error::Api`]
/// with the response body attached; transport failures become [`Error::Http`].
#[derive(Clone)]
pub struct HttpClient {
    client: Client,
}

impl HttpClient {
    pub fn new(user_agent: &str, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(user_agent)
            .build()
            .map_err(|e| Error::http(e.to_string()))?;

        Ok(Self { client })
    }

    pub async fn get_json<T: DeserializeOwned>(
        &self,
        url: &str,
        query: &[(&str, String)],
        headers: &[(&str, &str)],
    ) -> Result<T> {
        let req = with_headers(self.client.get(url).query(query), headers);
        let body = self.send(req).await?;
        parse_json(&body)
    }

    pub async fn post_json<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        url: &str,
        body: &B,
        headers: &[(&str, &str)],
    ) -> Result<T> {
        let req = with_headers(self.client.post(url).json(body), headers);
        let body = self.send(req).await?;
        parse_json(&body)
    }

    pub async fn post_json_raw(
        &self,
        url: &str,
        body: &str,
        headers: &[(&str, &str)],
    ) -> Result<String> {
        let req = self
            .client
            .post(url)
            .header(header::CONTENT_TYPE, "application/json")
            .body(body.to_string());
        self.send(with_headers(req, headers)).await
    }

    async fn send(&self, req: RequestBuilder) -> Result<String> {
        match req.send().await {
            Ok(resp) => handle_response(resp).await,
            Err(e) => {
                if e.is_timeout() {
                    warn!("request timed out");
                }
                Err(Error::http(e.to_string()))
            }
        }
    }
}

fn with_headers(mut req: RequestBuilder, headers: &[(&str, &str)]) -> RequestBuilder {
    for (k, v) in headers {
        req = req.header(*k, *v);
    }
    req
}

async fn handle_response(resp: Response) -> Result<String> {
    let status = resp.status();
    let url = resp.url().to_string();
    debug!(status = status.as_u16(), %url, "response received");

    if status.is_success() {
        return resp.text().await.map_err(|e| Error::http(e.to_string()));
    }

    let body = resp.text().await.unwrap_or_default();
    warn!(status = status.as_u16(), body = %body, "HTTP error");
    Err(Error::api_with_status(
        extract_domain(&url),
        body,
        status.as_u16(),
    ))
}

/// Empty bodies (204, bare 200) parse as JSON `null`.
fn parse_json<T: DeserializeOwned>(body: &str) -> Result<T> {
    let body = if body.trim().is_empty() { "null" } else { body };
    serde_json::from_str(body).map_err(|e| Error::parse(format!("JSON parse: {e}")))
}

fn extract_domain(url: &str) -> String {
    url.split("//")
        .nth(1)
        .and_then(|s| s.split('/').next())
        .unwrap_or("unknown")
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;

    #[test]
    fn domain_from_url() {
        assert_eq!(
            extract_domain("http://localhost:3001/internal/products?search=x"),
            "localhost:3001"
        );
        assert_eq!(extract_domain("not a url"), "unknown");
    }

    #[test]
    fn empty_body_is_null() {
        let v: Value = parse_json("  ").unwrap();
        assert!(v.is_null());
    }

    #[test]
    fn invalid_body_is_parse_error() {
        let r: Result<Value> = parse_json("<html>");
        assert!(matches!(r, Err(Error::Parse(_))));
    }
}
