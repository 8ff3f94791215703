use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use tracing::debug;

use super::ApiClient;
use crate::upload::{AssetStore, AuthToken, SelectedFile, UploadError, UploadedAsset};
use crate::wire::{IMAGES_FIELD, UploadResponse};

const UPLOAD_PATH: &str = "/api/admin/products/upload-images";

#[derive(Debug, Clone)]
pub struct HttpAssetStore {
    client: ApiClient,
}

impl HttpAssetStore {
    pub fn new(client: ApiClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl AssetStore for HttpAssetStore {
    async fn upload(
        &self,
        files: &[SelectedFile],
        token: &AuthToken,
    ) -> Result<Vec<UploadedAsset>, UploadError> {
        let mut form = Form::new();
        for file in files {
            let part = Part::stream_with_length(file.bytes().clone(), file.size())
                .file_name(file.name().to_string())
                .mime_str(file.mime())
                .map_err(|e| UploadError::Transport(e.to_string()))?;
            form = form.part(IMAGES_FIELD, part);
        }

        debug!(files = files.len(), "uploading image batch");
        let response = self
            .client
            .http
            .post(self.client.url(UPLOAD_PATH))
            .bearer_auth(token.as_str())
            .multipart(form)
            .send()
            .await
            .map_err(|e| UploadError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(UploadError::Status(status.as_u16()));
        }

        let body: UploadResponse = response
            .json()
            .await
            .map_err(|e| UploadError::MalformedResponse(e.to_string()))?;
        if !body.success {
            return Err(UploadError::MalformedResponse("success flag not set".into()));
        }

        Ok(body.files.into_iter().map(UploadedAsset::new).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ClientConfig;
    use mockito::{Matcher, Server};
    use std::time::Duration;

    fn store(url: String) -> HttpAssetStore {
        let config = ClientConfig {
            api_url: url,
            timeout: Duration::from_secs(5),
        };
        HttpAssetStore::new(ApiClient::new(&config).unwrap())
    }

    #[tokio::test]
    async fn posts_every_file_under_one_field_with_bearer_token() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", UPLOAD_PATH)
            .match_header("authorization", "Bearer s3cret")
            .match_header("content-type", Matcher::Regex("^multipart/form-data".into()))
            .match_body(Matcher::AllOf(vec![
                Matcher::Regex(r#"name="images"; filename="a.png""#.into()),
                Matcher::Regex(r#"name="images"; filename="b.jpg""#.into()),
            ]))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"success":true,"files":["https://cdn/a.png","https://cdn/b.jpg"]}"#)
            .create_async()
            .await;

        let files = vec![
            SelectedFile::new("a.png", "image/png", b"aaaa".to_vec()),
            SelectedFile::new("b.jpg", "image/jpeg", b"bbbb".to_vec()),
        ];
        let assets = store(server.url())
            .upload(&files, &AuthToken::new("s3cret"))
            .await
            .unwrap();

        assert_eq!(
            assets,
            vec![
                UploadedAsset::new("https://cdn/a.png"),
                UploadedAsset::new("https://cdn/b.jpg")
            ]
        );
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn error_status_is_reported() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("POST", UPLOAD_PATH)
            .with_status(500)
            .create_async()
            .await;

        let files = vec![SelectedFile::new("a.png", "image/png", b"a".to_vec())];
        let err = store(server.url())
            .upload(&files, &AuthToken::new("t"))
            .await
            .unwrap_err();

        assert_eq!(err, UploadError::Status(500));
    }

    #[tokio::test]
    async fn unreadable_body_is_malformed() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("POST", UPLOAD_PATH)
            .with_status(200)
            .with_body("<html>")
            .create_async()
            .await;

        let files = vec![SelectedFile::new("a.png", "image/png", b"a".to_vec())];
        let err = store(server.url())
            .upload(&files, &AuthToken::new("t"))
            .await
            .unwrap_err();

        assert!(matches!(err, UploadError::MalformedResponse(_)));
    }

    #[tokio::test]
    async fn unreachable_store_is_a_transport_error() {
        let files = vec![SelectedFile::new("a.png", "image/png", b"a".to_vec())];
        let err = store("http://127.0.0.1:1".into())
            .upload(&files, &AuthToken::new("t"))
            .await
            .unwrap_err();

        assert!(matches!(err, UploadError::Transport(_)));
    }
}
