//! Process-wide defaults. Kept in its own test binary since the layer is shared.

use armature_fetch::*;
use armature_fetch_testing::{MockReply, MockTransport};

#[tokio::test]
async fn test_global_defaults_snapshot_isolation() {
    let transport = MockTransport::always(MockReply::status(200));
    let client = Client::builder()
        .transport(transport.clone())
        .defaults(RequestConfig::new().base_url("https://api.example"))
        .build()
        .unwrap();

    Client::set_global_defaults(RequestConfig::new().max_body_length(1024));
    assert_eq!(Client::global_defaults().max_body_length, Some(1024));

    client
        .interceptors()
        .request
        .register_fn(|config: RequestConfig| async move {
            Client::set_global_defaults(RequestConfig::new().max_body_length(2048));
            Ok(config)
        });

    let first = client.get("/first", None).await.unwrap();
    assert_eq!(first.config.max_body_length, Some(1024));

    let second = client.get("/second", None).await.unwrap();
    assert_eq!(second.config.max_body_length, Some(2048));

    let child = client.create();
    let third = child.get("/third", None).await.unwrap();
    assert_eq!(third.config.max_body_length, Some(2048));

    global_defaults().reset();
    assert_eq!(Client::global_defaults().max_body_length, None);
}
