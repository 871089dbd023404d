//! HTTP client for the render API's worker endpoints.

use std::path::Path;
use std::time::Duration;

use cloudrender_core::envelope::JobKey;
use cloudrender_core::naming::encode_status_segment;
use cloudrender_core::status::JobState;
use futures::StreamExt;
use serde::Deserialize;
use tokio::io::AsyncWriteExt;

/// Multipart field carrying the rendered result.
const UPLOAD_FIELD: &str = "uploadfile";

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// A job handed out by `GET /request`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Assignment {
    pub format: String,
    pub resolution: String,
    pub download_link: String,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "status")]
enum PullReply {
    #[serde(rename = "OK")]
    Ok(Assignment),
    Empty,
}

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// The HTTP request itself failed (network, DNS, TLS, etc.).
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The API returned a non-2xx status code.
    #[error("render API error ({status}): {body}")]
    Status { status: u16, body: String },

    #[error("file I/O failed: {0}")]
    Io(#[from] std::io::Error),
}

/// Client for one render API instance.
#[derive(Debug, Clone)]
pub struct RenderApi {
    client: reqwest::Client,
    api_url: String,
}

impl RenderApi {
    pub fn new(api_url: impl Into<String>) -> Result<Self, ApiError> {
        let client = reqwest::Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .build()?;
        Ok(Self::with_client(client, api_url))
    }

    pub fn with_client(client: reqwest::Client, api_url: impl Into<String>) -> Self {
        Self {
            client,
            api_url: api_url.into().trim_end_matches('/').to_string(),
        }
    }

    /// `GET /request`. `None` when both queues are empty.
    pub async fn request_job(&self) -> Result<Option<Assignment>, ApiError> {
        let response = self
            .client
            .get(format!("{}/request", self.api_url))
            .send()
            .await?;
        let reply: PullReply = ensure_success(response).await?.json().await?;

        Ok(match reply {
            PullReply::Ok(assignment) => Some(assignment),
            PullReply::Empty => None,
        })
    }

    /// Stream the artifact at `link` into `dest`.
    pub async fn download(&self, link: &str, dest: &Path) -> Result<u64, ApiError> {
        let response = ensure_success(self.client.get(link).send().await?).await?;

        let mut file = tokio::fs::File::create(dest).await?;
        let mut stream = response.bytes_stream();
        let mut written = 0u64;
        while let Some(chunk) = stream.next().await {
            let chunk = chunk?;
            file.write_all(&chunk).await?;
            written += chunk.len() as u64;
        }
        file.flush().await?;

        Ok(written)
    }

    /// `PUT /{owner_id}/blend/update/{stored_name}/{status}`.
    pub async fn update_status(&self, key: &JobKey, state: JobState) -> Result<(), ApiError> {
        let url = format!(
            "{}/{}/blend/update/{}/{}",
            self.api_url,
            key.owner_id,
            key.stored_name,
            encode_status_segment(state.name())
        );
        ensure_success(self.client.put(url).send().await?).await?;
        Ok(())
    }

    /// `POST /{owner_id}/image/upload/{stored_name}` with the result as
    /// multipart `uploadfile`. Returns the result's download link.
    pub async fn upload_result(&self, key: &JobKey, result: &Path) -> Result<String, ApiError> {
        #[derive(Deserialize)]
        struct Recorded {
            download_link: String,
        }

        let file_name = result
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "result".to_string());
        let bytes = tokio::fs::read(result).await?;
        let form = reqwest::multipart::Form::new().part(
            UPLOAD_FIELD,
            reqwest::multipart::Part::bytes(bytes).file_name(file_name),
        );

        let url = format!(
            "{}/{}/image/upload/{}",
            self.api_url, key.owner_id, key.stored_name
        );
        let response = self.client.post(url).multipart(form).send().await?;
        let recorded: Recorded = ensure_success(response).await?.json().await?;
        Ok(recorded.download_link)
    }
}

async fn ensure_success(response: reqwest::Response) -> Result<reqwest::Response, ApiError> {
    let status = response.status();
    if !status.is_success() {
        let body = response
            .text()
            .await
            .unwrap_or_else(|_| "<unreadable body>".to_string());
        return Err(ApiError::Status {
            status: status.as_u16(),
            body,
        });
    }
    Ok(response)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pull_reply_decodes_both_shapes() {
        let ok: PullReply = serde_json::from_str(
            r#"{"status":"OK","format":"png","resolution":"1920x1080","download_link":"http://h/7/blend/download/1.blend"}"#,
        )
        .unwrap();
        match ok {
            PullReply::Ok(assignment) => assert_eq!(assignment.format, "png"),
            PullReply::Empty => panic!("expected an assignment"),
        }

        let empty: PullReply = serde_json::from_str(r#"{"status":"Empty"}"#).unwrap();
        assert!(matches!(empty, PullReply::Empty));
    }

    #[test]
    fn trailing_slash_is_trimmed() {
        let api = RenderApi::with_client(reqwest::Client::new(), "http://render.local/");
        assert_eq!(api.api_url, "http://render.local");
    }
}
