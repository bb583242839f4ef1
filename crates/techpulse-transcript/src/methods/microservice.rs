//! Fallback method 1 (§4.9): a dedicated transcript micro-service, queried
//! with a plain HTTP GET. Its JSON body is expected to already carry the
//! `HH:MM:SS [Speaker]: text` format in its `transcript` field.

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;

use crate::error::{Result, TranscriptError};
use crate::method::TranscriptMethod;

#[derive(Debug, Deserialize)]
struct MicroserviceResponse {
    transcript: String,
}

pub struct MicroserviceMethod {
    client: Client,
    base_url: String,
}

impl MicroserviceMethod {
    pub fn new(client: Client, base_url: String) -> Self {
        Self { client, base_url }
    }
}

#[async_trait]
impl TranscriptMethod for MicroserviceMethod {
    fn name(&self) -> &'static str {
        "transcript-microservice"
    }

    async fn fetch(&self, video_id: &str) -> Result<Option<String>> {
        let response = self
            .client
            .get(format!("{}/transcript", self.base_url))
            .query(&[("videoId", video_id)])
            .send()
            .await?;

        match response.status() {
            StatusCode::OK => {
                let body: MicroserviceResponse = response.json().await?;
                if body.transcript.trim().is_empty() {
                    Ok(None)
                } else {
                    Ok(Some(body.transcript))
                }
            }
            StatusCode::NOT_FOUND => Ok(None),
            StatusCode::FORBIDDEN => Err(TranscriptError::AccessBlocked(
                "transcript microservice returned 403".to_string(),
            )),
            status => Err(TranscriptError::Upstream { status: status.as_u16() }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn returns_the_transcript_field_on_success() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/transcript"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "transcript": "00:00:00 [Alice]: hello"
            })))
            .mount(&server)
            .await;

        let m = MicroserviceMethod::new(Client::new(), server.uri());
        let result = m.fetch("v1").await.unwrap();
        assert_eq!(result.as_deref(), Some("00:00:00 [Alice]: hello"));
    }

    #[tokio::test]
    async fn not_found_advances_to_the_next_method() {
        let server = MockServer::start().await;
        Mock::given(method("GET")).and(path("/transcript")).respond_with(ResponseTemplate::new(404)).mount(&server).await;

        let m = MicroserviceMethod::new(Client::new(), server.uri());
        assert_eq!(m.fetch("v1").await.unwrap(), None);
    }

    #[tokio::test]
    async fn forbidden_short_circuits() {
        let server = MockServer::start().await;
        Mock::given(method("GET")).and(path("/transcript")).respond_with(ResponseTemplate::new(403)).mount(&server).await;

        let m = MicroserviceMethod::new(Client::new(), server.uri());
        let err = m.fetch("v1").await.unwrap_err();
        assert!(matches!(err, TranscriptError::AccessBlocked(_)));
    }
}
