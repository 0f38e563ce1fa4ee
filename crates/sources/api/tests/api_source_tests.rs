use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use crate::source_api::ProviderApiSource;
use crate::starmap_catalog::store::Catalog;
use crate::starmap_core::error::Error;
use crate::starmap_source::{Source, SourceConfig, SyncContext};
use crate::starmap_types::{CatalogEndpoint, EndpointType, Provider, ProviderCatalogConfig};

fn catalog_with_endpoint(provider_id: &str, url: &str, kind: EndpointType) -> Catalog {
    let mut provider = Provider::new(provider_id, provider_id);
    provider.catalog = Some(ProviderCatalogConfig {
        endpoint: Some(CatalogEndpoint {
            url: url.to_string(),
            kind,
            auth_required: false,
        }),
        ..Default::default()
    });
    let providers: BTreeMap<String, Provider> =
        [(provider.id.clone(), provider)].into_iter().collect();
    Catalog::new(providers, BTreeMap::new(), Default::default())
}

fn configured_source(catalog: Catalog) -> ProviderApiSource {
    let mut source = ProviderApiSource::new();
    source
        .configure(&SourceConfig::new(Arc::new(catalog)))
        .unwrap();
    source
}

fn ctx() -> SyncContext {
    SyncContext::new(CancellationToken::new(), Duration::from_secs(5))
}

#[tokio::test]
async fn fetches_openai_compatible_listing() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/models"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(
            r#"{"object":"list","data":[
                {"id":"gpt-4o","object":"model","created":1715558400,"owned_by":"openai"},
                {"id":"gpt-4o-mini","object":"model","created":1721260800,"owned_by":"openai"}
            ]}"#,
            "application/json",
        ))
        .mount(&server)
        .await;

    let catalog = catalog_with_endpoint(
        "openai",
        &format!("{}/v1/models", server.uri()),
        EndpointType::OpenaiCompatible,
    );
    let source = configured_source(catalog);

    let models = source.fetch_models(&ctx(), "openai").await.unwrap();
    assert_eq!(models.len(), 2);
    assert_eq!(models[0].id, "gpt-4o");
}

#[tokio::test]
async fn server_error_is_a_sync_error_naming_the_provider() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/models"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let catalog = catalog_with_endpoint(
        "broken",
        &format!("{}/v1/models", server.uri()),
        EndpointType::OpenaiCompatible,
    );
    let source = configured_source(catalog);

    let err = source.fetch_models(&ctx(), "broken").await.unwrap_err();
    match err {
        Error::Sync {
            source, provider, ..
        } => {
            assert_eq!(source, "provider-api");
            assert_eq!(provider.as_deref(), Some("broken"));
        }
        other => panic!("expected sync error, got {other:?}"),
    }
}

#[tokio::test]
async fn unknown_provider_is_absence_not_error() {
    let catalog = Catalog::empty();
    let source = configured_source(catalog);
    let models = source.fetch_models(&ctx(), "nope").await.unwrap();
    assert!(models.is_empty());
}

#[tokio::test]
async fn anthropic_listing_follows_pages() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/models"))
        .and(wiremock::matchers::query_param("after_id", "a"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(
            r#"{"data":[{"type":"model","id":"b","display_name":"B"}],"has_more":false,"last_id":"b"}"#,
            "application/json",
        ))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v1/models"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(
            r#"{"data":[{"type":"model","id":"a","display_name":"A"}],"has_more":true,"last_id":"a"}"#,
            "application/json",
        ))
        .mount(&server)
        .await;

    let catalog = catalog_with_endpoint(
        "anthropic",
        &format!("{}/v1/models", server.uri()),
        EndpointType::AnthropicNative,
    );
    let source = configured_source(catalog);

    let models = source.fetch_models(&ctx(), "anthropic").await.unwrap();
    let ids: Vec<&str> = models.iter().map(|m| m.id.as_str()).collect();
    assert_eq!(ids, vec!["a", "b"]);
}

#[tokio::test]
async fn canceled_context_short_circuits() {
    let catalog = catalog_with_endpoint(
        "openai",
        "https://unreachable.invalid/v1/models",
        EndpointType::OpenaiCompatible,
    );
    let source = configured_source(catalog);

    let cancel = CancellationToken::new();
    cancel.cancel();
    let ctx = SyncContext::new(cancel, Duration::from_secs(5));

    let err = source.fetch_models(&ctx, "openai").await.unwrap_err();
    assert!(matches!(err, Error::Canceled));
}

#[tokio::test]
async fn raw_response_reports_stats_and_parses_symmetrically() {
    let server = MockServer::start().await;
    let payload = r#"{"object":"list","data":[{"id":"m1","object":"model","owned_by":"openai"}]}"#;
    Mock::given(method("GET"))
        .and(path("/v1/models"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(payload, "application/json"))
        .mount(&server)
        .await;

    let catalog = catalog_with_endpoint(
        "openai",
        &format!("{}/v1/models", server.uri()),
        EndpointType::OpenaiCompatible,
    );
    let source = configured_source(catalog.clone());

    let (body, stats) = source
        .fetch_raw_response(&ctx(), "openai", None)
        .await
        .unwrap();
    assert_eq!(stats.status, 200);
    assert_eq!(stats.bytes, payload.len());
    assert_eq!(stats.content_type.as_deref(), Some("application/json"));

    let provider = catalog.provider("openai").unwrap();
    let models = source.parse_raw_models(&provider, &body).unwrap();
    assert_eq!(models.len(), 1);
    assert_eq!(models[0].id, "m1");

    // Raw parsing dispatches per endpoint type exactly like fetch_models;
    // the google dialect parses its own raw payloads too.
    let gcatalog = catalog_with_endpoint(
        "google",
        "https://example.invalid/v1beta/models",
        EndpointType::GoogleCloud,
    );
    let gsource = configured_source(gcatalog.clone());
    let gprovider = gcatalog.provider("google").unwrap();
    let gmodels = gsource
        .parse_raw_models(&gprovider, br#"{"models":[{"name":"models/gemini-2.0-flash"}]}"#)
        .unwrap();
    assert_eq!(gmodels[0].id, "gemini-2.0-flash");
}
