use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use crate::source_models_dev::{LoadOutcome, ModelsDevHttpSource, EMBEDDED_SNAPSHOT};
use crate::starmap_catalog::store::Catalog;
use crate::starmap_source::{Source, SourceConfig, SyncContext};

fn ctx() -> SyncContext {
    SyncContext::new(CancellationToken::new(), Duration::from_secs(5))
}

fn config(cache_dir: PathBuf) -> SourceConfig {
    let mut config = SourceConfig::new(Arc::new(Catalog::empty()));
    config.cache_dir = Some(cache_dir);
    config
}

fn cache_file(dir: &std::path::Path) -> PathBuf {
    dir.join("models.dev").join("api.json")
}

async fn mount_ok(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/api.json"))
        .respond_with(
            ResponseTemplate::new(200).set_body_raw(EMBEDDED_SNAPSHOT, "application/json"),
        )
        .mount(server)
        .await;
}

async fn mount_failure(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/api.json"))
        .respond_with(ResponseTemplate::new(500))
        .mount(server)
        .await;
}

#[tokio::test]
async fn network_success_populates_the_cache() {
    let server = MockServer::start().await;
    mount_ok(&server).await;
    let temp = tempfile::tempdir().unwrap();

    let mut source =
        ModelsDevHttpSource::new().with_endpoint(format!("{}/api.json", server.uri()));
    source.configure(&config(temp.path().to_path_buf())).unwrap();

    let models = source.fetch_models(&ctx(), "openai").await.unwrap();
    assert!(!models.is_empty());
    assert_eq!(source.load_outcome(), Some(LoadOutcome::Network));
    assert!(cache_file(temp.path()).exists());
}

#[tokio::test]
async fn fresh_cache_short_circuits_the_network() {
    let server = MockServer::start().await;
    mount_failure(&server).await;
    let temp = tempfile::tempdir().unwrap();
    let cache = cache_file(temp.path());
    std::fs::create_dir_all(cache.parent().unwrap()).unwrap();
    std::fs::write(&cache, EMBEDDED_SNAPSHOT).unwrap();

    let mut source =
        ModelsDevHttpSource::new().with_endpoint(format!("{}/api.json", server.uri()));
    source.configure(&config(temp.path().to_path_buf())).unwrap();

    let provider = source
        .fetch_provider(&ctx(), "anthropic")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(provider.name, "Anthropic");
    assert_eq!(source.load_outcome(), Some(LoadOutcome::FreshCache));
}

#[tokio::test]
async fn network_failure_falls_back_to_stale_cache_without_touching_it() {
    let server = MockServer::start().await;
    mount_failure(&server).await;
    let temp = tempfile::tempdir().unwrap();
    let cache = cache_file(temp.path());
    std::fs::create_dir_all(cache.parent().unwrap()).unwrap();
    std::fs::write(&cache, EMBEDDED_SNAPSHOT).unwrap();
    let mtime_before = std::fs::metadata(&cache).unwrap().modified().unwrap();

    // Zero TTL makes the just-written cache count as stale.
    let mut source = ModelsDevHttpSource::new()
        .with_endpoint(format!("{}/api.json", server.uri()))
        .with_ttl(Duration::ZERO);
    source.configure(&config(temp.path().to_path_buf())).unwrap();

    let models = source.fetch_models(&ctx(), "google").await.unwrap();
    assert!(!models.is_empty());
    assert_eq!(source.load_outcome(), Some(LoadOutcome::StaleCache));
    assert!(source.is_available());

    let mtime_after = std::fs::metadata(&cache).unwrap().modified().unwrap();
    assert_eq!(mtime_before, mtime_after);
}

#[tokio::test]
async fn network_failure_without_cache_uses_the_embedded_snapshot() {
    let server = MockServer::start().await;
    mount_failure(&server).await;
    let temp = tempfile::tempdir().unwrap();

    let mut source =
        ModelsDevHttpSource::new().with_endpoint(format!("{}/api.json", server.uri()));
    source.configure(&config(temp.path().to_path_buf())).unwrap();

    let models = source.fetch_models(&ctx(), "openai").await.unwrap();
    assert!(!models.is_empty());
    assert_eq!(source.load_outcome(), Some(LoadOutcome::EmbeddedFallback));
    assert!(source.is_available());
}

#[tokio::test]
async fn undersized_payload_is_rejected() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api.json"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(
            r#"{"openai": {"id": "openai", "name": "OpenAI"}}"#,
            "application/json",
        ))
        .mount(&server)
        .await;
    let temp = tempfile::tempdir().unwrap();

    let mut source =
        ModelsDevHttpSource::new().with_endpoint(format!("{}/api.json", server.uri()));
    source.configure(&config(temp.path().to_path_buf())).unwrap();

    source.fetch_models(&ctx(), "openai").await.unwrap();
    // The tiny payload fails validation, so the ladder lands on the
    // embedded snapshot and nothing is cached.
    assert_eq!(source.load_outcome(), Some(LoadOutcome::EmbeddedFallback));
    assert!(!cache_file(temp.path()).exists());
}

#[tokio::test]
async fn provider_records_convert_to_catalog_shape() {
    let temp = tempfile::tempdir().unwrap();
    let cache = cache_file(temp.path());
    std::fs::create_dir_all(cache.parent().unwrap()).unwrap();
    std::fs::write(&cache, EMBEDDED_SNAPSHOT).unwrap();

    let mut source = ModelsDevHttpSource::new();
    source.configure(&config(temp.path().to_path_buf())).unwrap();

    let provider = source
        .fetch_provider(&ctx(), "deepseek")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(provider.id, "deepseek");
    assert!(provider.icon_url.unwrap().contains("deepseek"));

    let models = source.fetch_models(&ctx(), "deepseek").await.unwrap();
    assert_eq!(models.len(), 1);
    let model = &models[0];
    assert_eq!(model.name, "DeepSeek V3");
    assert!(model.metadata.as_ref().unwrap().open_weights);
    assert!(model
        .pricing
        .as_ref()
        .unwrap()
        .tokens
        .as_ref()
        .unwrap()
        .cache_read
        .is_some());
}

#[tokio::test]
async fn unknown_provider_is_absence_not_error() {
    let temp = tempfile::tempdir().unwrap();
    let cache = cache_file(temp.path());
    std::fs::create_dir_all(cache.parent().unwrap()).unwrap();
    std::fs::write(&cache, EMBEDDED_SNAPSHOT).unwrap();

    let mut source = ModelsDevHttpSource::new();
    source.configure(&config(temp.path().to_path_buf())).unwrap();

    assert!(source
        .fetch_provider(&ctx(), "definitely-not-real")
        .await
        .unwrap()
        .is_none());
    assert!(source
        .fetch_models(&ctx(), "definitely-not-real")
        .await
        .unwrap()
        .is_empty());
}
