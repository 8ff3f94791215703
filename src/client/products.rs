use async_trait::async_trait;
use reqwest::{RequestBuilder, Response};
use serde::de::DeserializeOwned;

use super::ApiClient;
use crate::catalog::{Product, ProductApi, ProductApiError, ProductDraft, ProductId};
use crate::upload::AuthToken;
use crate::wire::Envelope;

#[derive(Debug, Clone)]
pub struct HttpProductApi {
    client: ApiClient,
}

impl HttpProductApi {
    pub fn new(client: ApiClient) -> Self {
        Self { client }
    }

    async fn send<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
        token: &AuthToken,
    ) -> Result<Option<T>, ProductApiError> {
        let response = request
            .bearer_auth(token.as_str())
            .send()
            .await
            .map_err(|e| ProductApiError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(rejection(status.as_u16(), response).await);
        }

        let envelope: Envelope<T> = response
            .json()
            .await
            .map_err(|e| ProductApiError::Transport(e.to_string()))?;
        if !envelope.success {
            return Err(ProductApiError::Rejected(envelope.message.unwrap_or_default()));
        }
        Ok(envelope.data)
    }

    async fn send_for<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
        token: &AuthToken,
    ) -> Result<T, ProductApiError> {
        self.send(request, token)
            .await?
            .ok_or_else(|| ProductApiError::Rejected("response carried no data".into()))
    }
}

/// Prefers the server's own message over the bare status code.
async fn rejection(status: u16, response: Response) -> ProductApiError {
    match response.json::<Envelope<serde_json::Value>>().await {
        Ok(Envelope {
            message: Some(message),
            ..
        }) => ProductApiError::Rejected(message),
        _ => ProductApiError::Status(status),
    }
}

#[async_trait]
impl ProductApi for HttpProductApi {
    async fn list(&self, token: &AuthToken) -> Result<Vec<Product>, ProductApiError> {
        let request = self.client.http.get(self.client.url("/api/admin/products/get"));
        self.send_for(request, token).await
    }

    async fn create(&self, draft: &ProductDraft, token: &AuthToken) -> Result<Product, ProductApiError> {
        let request = self
            .client
            .http
            .post(self.client.url("/api/admin/products/add"))
            .json(draft);
        self.send_for(request, token).await
    }

    async fn update(
        &self,
        id: ProductId,
        draft: &ProductDraft,
        token: &AuthToken,
    ) -> Result<Product, ProductApiError> {
        let request = self
            .client
            .http
            .put(self.client.url(&format!("/api/admin/products/edit/{id}")))
            .json(draft);
        self.send_for(request, token).await
    }

    async fn delete(&self, id: ProductId, token: &AuthToken) -> Result<(), ProductApiError> {
        let request = self
            .client
            .http
            .delete(self.client.url(&format!("/api/admin/products/delete/{id}")));
        self.send::<serde_json::Value>(request, token).await.map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ClientConfig;
    use mockito::{Matcher, Server};
    use serde_json::json;
    use std::time::Duration;
    use uuid::Uuid;

    fn api(url: String) -> HttpProductApi {
        let config = ClientConfig {
            api_url: url,
            timeout: Duration::from_secs(5),
        };
        HttpProductApi::new(ApiClient::new(&config).unwrap())
    }

    fn draft() -> ProductDraft {
        ProductDraft {
            image: Some("https://cdn/a.png".into()),
            title: "Cap".into(),
            description: "Wool cap".into(),
            category: "accessories".into(),
            brand: "puma".into(),
            price: 20.0,
            sale_price: 15.0,
            total_stock: 3,
        }
    }

    fn product_json(id: Uuid) -> serde_json::Value {
        json!({
            "id": id,
            "image": "https://cdn/a.png",
            "title": "Cap",
            "description": "Wool cap",
            "category": "accessories",
            "brand": "puma",
            "price": 20.0,
            "salePrice": 15.0,
            "totalStock": 3
        })
    }

    #[tokio::test]
    async fn create_sends_camel_case_draft() {
        let mut server = Server::new_async().await;
        let id = Uuid::new_v4();
        let mock = server
            .mock("POST", "/api/admin/products/add")
            .match_header("authorization", "Bearer t")
            .match_body(Matcher::PartialJson(json!({ "salePrice": 15.0, "totalStock": 3 })))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(json!({ "success": true, "data": product_json(id) }).to_string())
            .create_async()
            .await;

        let product = api(server.url()).create(&draft(), &AuthToken::new("t")).await.unwrap();

        assert_eq!(product.id, id);
        assert_eq!(product.total_stock, 3);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn server_message_is_surfaced() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("POST", "/api/admin/products/add")
            .with_status(400)
            .with_header("content-type", "application/json")
            .with_body(r#"{"success":false,"message":"product image is required"}"#)
            .create_async()
            .await;

        let err = api(server.url()).create(&draft(), &AuthToken::new("t")).await.unwrap_err();

        assert_eq!(err, ProductApiError::Rejected("product image is required".into()));
    }

    #[tokio::test]
    async fn delete_and_list() {
        let mut server = Server::new_async().await;
        let id = Uuid::new_v4();
        let delete = server
            .mock("DELETE", format!("/api/admin/products/delete/{id}").as_str())
            .with_status(200)
            .with_body(r#"{"success":true}"#)
            .create_async()
            .await;
        let list = server
            .mock("GET", "/api/admin/products/get")
            .with_status(200)
            .with_body(json!({ "success": true, "data": [product_json(id)] }).to_string())
            .create_async()
            .await;

        let api = api(server.url());
        api.delete(id, &AuthToken::new("t")).await.unwrap();
        let products = api.list(&AuthToken::new("t")).await.unwrap();

        assert_eq!(products.len(), 1);
        delete.assert_async().await;
        list.assert_async().await;
    }

    #[tokio::test]
    async fn bare_status_without_body() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("GET", "/api/admin/products/get")
            .with_status(401)
            .create_async()
            .await;

        let err = api(server.url()).list(&AuthToken::new("t")).await.unwrap_err();
        assert_eq!(err, ProductApiError::Status(401));
    }
}
