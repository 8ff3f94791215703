//! Runs the admin client against a real server on a local port.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use shoploop::catalog::ProductCatalog;
use shoploop::client::{ApiClient, HttpAssetStore, HttpProductApi};
use shoploop::config::ClientConfig;
use shoploop::editor::{PRODUCT_ADDED_MESSAGE, ProductEditor};
use shoploop::server::{self, ServerSettings};
use shoploop::storage::InMemoryStorage;
use shoploop::upload::{
    AuthToken, Notification, NotificationSink, SelectedFile, UPLOAD_FAILURE_MESSAGE,
    UploadOutcome,
};

const TOKEN: &str = "e2e-token";

#[derive(Default)]
struct Recorder(Mutex<Vec<Notification>>);

impl NotificationSink for Recorder {
    fn notify(&self, notification: Notification) {
        self.0.lock().unwrap().push(notification);
    }
}

async fn serve() -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let base = format!("http://{}", listener.local_addr().unwrap());
    let app = server::router(
        Arc::new(InMemoryStorage::new()),
        ProductCatalog::new(),
        ServerSettings {
            auth_token: TOKEN.into(),
            public_url: base.clone(),
            upload_body_limit: 64 * 1024 * 1024,
        },
    );
    tokio::spawn(async move { axum::serve(listener, app).await.unwrap() });
    base
}

fn editor(base: &str, token: &str) -> (ProductEditor, Arc<Recorder>) {
    let client = ApiClient::new(&ClientConfig {
        api_url: base.to_string(),
        timeout: Duration::from_secs(10),
    })
    .unwrap();
    let sink = Arc::new(Recorder::default());
    let editor = ProductEditor::new(
        Arc::new(HttpAssetStore::new(client.clone())),
        Arc::new(HttpProductApi::new(client)),
        sink.clone(),
        Arc::new(AuthToken::new(token)),
    );
    (editor, sink)
}

#[tokio::test]
async fn upload_image_then_create_product() {
    let base = serve().await;
    let (editor, sink) = editor(&base, TOKEN);

    editor.open_create().await;
    editor
        .update_form(|f| {
            f.title = "Linen shirt".into();
            f.description = "Relaxed fit".into();
            f.category = "men".into();
            f.brand = "h&m".into();
            f.price = "35".into();
            f.sale_price = "29.99".into();
            f.total_stock = "15".into();
        })
        .await;

    let upload = editor
        .uploads()
        .pick(vec![SelectedFile::new("shirt.png", "image/png", b"fake png".to_vec())])
        .await
        .upload
        .unwrap();
    assert_eq!(upload.finished().await, UploadOutcome::Applied { assets: 1 });

    let hosted = editor.uploads().snapshot().await.uploaded[0].url().to_string();
    assert!(hosted.starts_with(&format!("{base}/file/")));
    let served = reqwest::get(&hosted).await.unwrap();
    assert_eq!(served.headers()["content-type"], "image/png");
    assert_eq!(served.bytes().await.unwrap().as_ref(), b"fake png");

    let product = editor.submit().await.unwrap();
    assert_eq!(product.image, hosted);

    let listed = editor.refresh().await.unwrap();
    assert_eq!(listed, vec![product]);
    assert_eq!(
        sink.0.lock().unwrap().last().unwrap().message,
        PRODUCT_ADDED_MESSAGE
    );
}

#[tokio::test]
async fn wrong_token_fails_the_upload() {
    let base = serve().await;
    let (editor, sink) = editor(&base, "not-the-token");
    editor.open_create().await;

    let upload = editor
        .uploads()
        .pick(vec![SelectedFile::new("a.jpg", "image/jpeg", b"jpg".to_vec())])
        .await
        .upload
        .unwrap();

    assert_eq!(upload.finished().await, UploadOutcome::Failed);
    let snap = editor.uploads().snapshot().await;
    assert!(snap.error);
    assert!(snap.uploaded.is_empty());
    assert_eq!(
        sink.0.lock().unwrap().last().unwrap().message,
        UPLOAD_FAILURE_MESSAGE
    );
}
