//! API client for communicating with the prediction server

use anyhow::{Context, Result};
use reqwest::{Client, Response, StatusCode};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::collections::BTreeMap;
use url::Url;

/// API client for the prediction server
pub struct ApiClient {
    client: Client,
    base_url: Url,
}

impl ApiClient {
    /// Create a new API client
    pub fn new(base_url: &str) -> Result<Self> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .context("Failed to create HTTP client")?;

        let base_url = Url::parse(base_url).context("Invalid API URL")?;

        Ok(Self { client, base_url })
    }

    fn url(&self, path: &str) -> Result<Url> {
        self.base_url.join(path).context("Invalid path")
    }

    /// Make a GET request
    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let response = self
            .client
            .get(self.url(path)?)
            .send()
            .await
            .context("Failed to send request")?;

        let response = ensure_success(response).await?;
        response.json().await.context("Failed to parse response")
    }

    /// GET a raw body; `None` on 404
    pub async fn get_bytes(&self, path: &str) -> Result<Option<Vec<u8>>> {
        let response = self
            .client
            .get(self.url(path)?)
            .send()
            .await
            .context("Failed to send request")?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }

        let response = ensure_success(response).await?;
        let bytes = response.bytes().await.context("Failed to read response")?;
        Ok(Some(bytes.to_vec()))
    }

    /// Make a POST request with JSON body
    pub async fn post<T: DeserializeOwned, B: Serialize>(&self, path: &str, body: &B) -> Result<T> {
        let response = self
            .client
            .post(self.url(path)?)
            .json(body)
            .send()
            .await
            .context("Failed to send request")?;

        let response = ensure_success(response).await?;
        response.json().await.context("Failed to parse response")
    }

    /// Make a DELETE request
    pub async fn delete(&self, path: &str) -> Result<()> {
        let response = self
            .client
            .delete(self.url(path)?)
            .send()
            .await
            .context("Failed to send request")?;

        ensure_success(response).await?;
        Ok(())
    }

    /// Submit inputs to a session; 422 is a regular outcome, not an error
    pub async fn predict(&self, session_id: &str, inputs: &BTreeMap<String, String>) -> Result<PredictReply> {
        let path = format!("api/v1/sessions/{}/predict", session_id);
        let response = self
            .client
            .post(self.url(&path)?)
            .json(&PredictRequest { inputs })
            .send()
            .await
            .context("Failed to send request")?;

        if response.status() == StatusCode::UNPROCESSABLE_ENTITY {
            let body = response.json().await.context("Failed to parse response")?;
            return Ok(PredictReply::Incomplete(body));
        }

        let response = ensure_success(response).await?;
        let body = response.json().await.context("Failed to parse response")?;
        Ok(PredictReply::Predicted(body))
    }
}

async fn ensure_success(response: Response) -> Result<Response> {
    if response.status().is_success() {
        return Ok(response);
    }

    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    match serde_json::from_str::<ErrorResponse>(&body) {
        Ok(err) => anyhow::bail!("API error ({}): {}", status, err.error),
        Err(_) => anyhow::bail!("API error ({}): {}", status, body),
    }
}

// API response types

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Choice {
    pub label: String,
    pub value: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeatureSpec {
    pub name: String,
    pub description: String,
    pub range_hint: String,
    pub kind: String,
    #[serde(default)]
    pub choices: Vec<Choice>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeatureCatalog {
    pub features: Vec<FeatureSpec>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionCreated {
    pub session_id: String,
}

#[derive(Debug, Serialize)]
struct PredictRequest<'a> {
    inputs: &'a BTreeMap<String, String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InputEcho {
    pub name: String,
    pub value: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PredictResponse {
    pub label: String,
    pub probability_positive: f64,
    pub probability_negative: f64,
    pub probability: f64,
    pub distribution: [f64; 2],
    pub headline: String,
    pub probability_text: String,
    pub recommendation: String,
    pub disclaimer: String,
    pub inputs: Vec<InputEcho>,
    pub model_version: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldErrorView {
    pub field: String,
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IncompleteResponse {
    pub message: String,
    pub missing: Vec<String>,
    #[serde(default)]
    pub field_errors: Vec<FieldErrorView>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum PredictReply {
    Predicted(PredictResponse),
    Incomplete(IncompleteResponse),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryRecord {
    pub label: String,
    pub probability_positive: f64,
    pub probability_negative: f64,
    pub features: Vec<(String, f64)>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryLog {
    pub header: Vec<String>,
    pub records: Vec<HistoryRecord>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_get_parses_catalog() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/api/v1/features")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                r#"{"features":[{"name":"AMH(ng/mL)","description":"Anti-Mullerian Hormone","range_hint":"0.1 - 20","kind":"numeric","choices":[]}]}"#,
            )
            .create_async()
            .await;

        let client = ApiClient::new(&server.url()).unwrap();
        let catalog: FeatureCatalog = client.get("api/v1/features").await.unwrap();

        mock.assert_async().await;
        assert_eq!(catalog.features.len(), 1);
        assert_eq!(catalog.features[0].name, "AMH(ng/mL)");
    }

    #[tokio::test]
    async fn test_predict_treats_422_as_incomplete() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/api/v1/sessions/abc/predict")
            .with_status(422)
            .with_header("content-type", "application/json")
            .with_body(
                r#"{"status":"incomplete","message":"Harap isi semua data sebelum melakukan prediksi.","missing":["LH(mIU/mL)"],"field_errors":[]}"#,
            )
            .create_async()
            .await;

        let client = ApiClient::new(&server.url()).unwrap();
        let reply = client.predict("abc", &BTreeMap::new()).await.unwrap();

        match reply {
            PredictReply::Incomplete(body) => assert_eq!(body.missing, vec!["LH(mIU/mL)"]),
            other => panic!("expected Incomplete, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_get_bytes_returns_none_on_404() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/api/v1/history/export")
            .with_status(404)
            .with_body(r#"{"error":"Belum ada riwayat prediksi yang tersimpan.","code":"not_found"}"#)
            .create_async()
            .await;

        let client = ApiClient::new(&server.url()).unwrap();
        assert!(client.get_bytes("api/v1/history/export").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_server_error_surfaces_message() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/api/v1/history")
            .with_status(409)
            .with_body(r#"{"error":"history file columns do not match","code":"history_schema_mismatch"}"#)
            .create_async()
            .await;

        let client = ApiClient::new(&server.url()).unwrap();
        let err = client.get::<HistoryLog>("api/v1/history").await.unwrap_err();
        assert!(err.to_string().contains("history file columns do not match"));
    }

    #[test]
    fn test_invalid_url_is_rejected() {
        assert!(ApiClient::new("not a url").is_err());
    }
}
