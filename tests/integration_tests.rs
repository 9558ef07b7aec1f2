//! Integration tests using mock HTTP server
//!
//! Tests the full end-to-end flow: config → token → resolution → records

use knowledge_centre::config::ClientConfig;
use knowledge_centre::query::DataverseClient;
use knowledge_centre::{Error, TokenProvider};
use serde_json::json;
use std::sync::Arc;
use tempfile::TempDir;
use wiremock::matchers::{body_string_contains, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const GUID: &str = "5b0c3f5e-1d2a-4c3b-9a8e-7f6d5c4b3a21";

fn bearer_config(server: &MockServer, store: Option<&TempDir>) -> ClientConfig {
    let mut config = ClientConfig::new(server.uri());
    config.access_token = Some("test-token".to_string());
    config.mapping_store = store.map(|dir| dir.path().join("mappings.json"));
    config
}

async fn request_count(server: &MockServer) -> usize {
    server.received_requests().await.unwrap_or_default().len()
}

// ============================================================================
// Authentication
// ============================================================================

#[tokio::test]
async fn test_client_credentials_token_is_sent_and_reused() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/tenant-1/oauth2/v2.0/token"))
        .and(body_string_contains("grant_type=client_credentials"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "app-token",
            "token_type": "Bearer",
            "expires_in": 3600
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/api/data/v9.2/accounts"))
        .and(header("Authorization", "Bearer app-token"))
        .and(header("OData-Version", "4.0"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "value": [{ "name": "Contoso" }]
        })))
        .expect(2)
        .mount(&mock_server)
        .await;

    let mut config = ClientConfig::new(mock_server.uri());
    config.authority = Some(mock_server.uri());
    config.tenant_id = Some("tenant-1".to_string());
    config.client_id = Some("client-1".to_string());
    config.client_secret = Some("secret".to_string());

    let client = DataverseClient::connect(&config).await.unwrap();

    let first = client.try_get_entity_records("accounts", 10).await.unwrap();
    let second = client.try_get_entity_records("accounts", 10).await.unwrap();
    assert_eq!(first, second);
    assert_eq!(first[0]["name"], "Contoso");
}

#[tokio::test]
async fn test_missing_credentials_fail_before_any_request() {
    let mock_server = MockServer::start().await;
    let config = ClientConfig::new(mock_server.uri());

    let client = DataverseClient::connect(&config).await.unwrap();
    let err = client.try_get_entity_records("accounts", 1).await.unwrap_err();

    assert!(matches!(err, Error::NoAccount));
    assert!(client.get_entity_records("accounts", 1).await.is_empty());
    assert_eq!(request_count(&mock_server).await, 0);
}

#[tokio::test]
async fn test_explicit_token_provider() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/data/v9.2/$metadata"))
        .and(header("Authorization", "Bearer injected"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            r#"<edmx:Edmx xmlns:edmx="http://docs.oasis-open.org/odata/ns/edmx"><edmx:DataServices><Schema Namespace="ns">
                <EntityType Name="account"><Key><PropertyRef Name="accountid"/></Key>
                  <Property Name="accountid" Type="Edm.Guid"/><Property Name="name" Type="Edm.String"/>
                </EntityType>
                <EntityContainer Name="c"><EntitySet Name="accounts" EntityType="ns.account"/></EntityContainer>
              </Schema></edmx:DataServices></edmx:Edmx>"#,
        ))
        .mount(&mock_server)
        .await;

    let config = ClientConfig::new(mock_server.uri());
    let tokens = Arc::new(TokenProvider::new(Arc::new(
        knowledge_centre::auth::StaticTokenSource::new("injected"),
    )));
    let client = DataverseClient::connect_with_tokens(&config, tokens)
        .await
        .unwrap();

    let metadata = client.get_metadata_for("Accounts").await.unwrap();
    assert_eq!(metadata.entity_set, "accounts");
    assert_eq!(metadata.key_name, "accountid");
    assert_eq!(metadata.display_name.as_deref(), Some("name"));
}

// ============================================================================
// Resolution and persistence
// ============================================================================

#[tokio::test]
async fn test_resolution_persists_across_clients() {
    let mock_server = MockServer::start().await;
    let store_dir = TempDir::new().unwrap();

    Mock::given(method("GET"))
        .and(path(
            "/api/data/v9.2/EntityDefinitions(LogicalName='e365_knowledgearticle')",
        ))
        .and(query_param("$select", "EntitySetName"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "EntitySetName": "e365_knowledgearticles"
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let config = bearer_config(&mock_server, Some(&store_dir));

    let first = DataverseClient::connect(&config).await.unwrap();
    assert_eq!(
        first
            .resolve_entity_set("e365_knowledgearticle")
            .await
            .unwrap(),
        "e365_knowledgearticles"
    );

    let persisted: serde_json::Value = serde_json::from_str(
        &std::fs::read_to_string(store_dir.path().join("mappings.json")).unwrap(),
    )
    .unwrap();
    assert_eq!(
        persisted["kc:entitySetMap"],
        json!([["e365_knowledgearticle", "e365_knowledgearticles"]])
    );

    let before = request_count(&mock_server).await;
    let second = DataverseClient::connect(&config).await.unwrap();
    assert_eq!(
        second
            .resolve_entity_set("E365_KnowledgeArticle")
            .await
            .unwrap(),
        "e365_knowledgearticles"
    );
    assert_eq!(request_count(&mock_server).await, before);
}

#[tokio::test]
async fn test_casing_fallback_end_to_end() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/data/v9.2/contacts"))
        .and(query_param("$top", "2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "value": [{ "fullname": "Ada" }, { "fullname": "Grace" }]
        })))
        .mount(&mock_server)
        .await;

    let client = DataverseClient::connect(&bearer_config(&mock_server, None))
        .await
        .unwrap();
    let records = client.get_entity_records("Contacts", 2).await;

    assert_eq!(records.len(), 2);
    assert_eq!(records[1]["fullname"], "Grace");
}

// ============================================================================
// Writes and domain helpers
// ============================================================================

#[tokio::test]
async fn test_create_record_resolves_entity_then_posts() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/data/v9.2/EntityDefinitions(LogicalName='contact')"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "EntitySetName": "contacts"
        })))
        .mount(&mock_server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/data/v9.2/contacts"))
        .respond_with(ResponseTemplate::new(204).insert_header(
            "OData-EntityId",
            format!("{}/api/data/v9.2/contacts({GUID})", mock_server.uri()).as_str(),
        ))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = DataverseClient::connect(&bearer_config(&mock_server, None))
        .await
        .unwrap();
    let id = client
        .create_entity_record("contact", &json!({ "fullname": "Ada" }))
        .await
        .unwrap();

    assert_eq!(id.as_deref(), Some(GUID));
}

#[tokio::test]
async fn test_ui_settings_default_when_entry_missing() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/data/v9.2/EntityDefinitions(LogicalName='e365_appconfig')"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "EntitySetName": "e365_appconfigs"
        })))
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/data/v9.2/e365_appconfigs"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "value": [{ "name": "site:title", "value": "Hub" }]
        })))
        .mount(&mock_server)
        .await;

    let client = DataverseClient::connect(&bearer_config(&mock_server, None))
        .await
        .unwrap();

    let settings = client.ui_settings().await.unwrap();
    assert_eq!(settings, knowledge_centre::UiSettings::default());

    let item = client.find_app_config_item("SITE:TITLE").await.unwrap().unwrap();
    assert_eq!(item.value, "Hub");
}
