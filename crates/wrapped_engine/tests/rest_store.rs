use pretty_assertions::assert_eq;
use serde_json::json;
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};
use wrapped_engine::{
    CreateError, JobStore, NewJob, RecordStatus, RestJobStore, RestSettings, StoreError,
};

const TABLE_PATH: &str = "/rest/v1/wrapped_requests";

fn store_for(server: &MockServer) -> RestJobStore {
    RestJobStore::new(&RestSettings::new(server.uri(), "anon-key")).unwrap()
}

fn row(id: u64, status: &str) -> serde_json::Value {
    json!({
        "id": id,
        "wallet_address": "W1",
        "status": status,
        "created_at": "2025-12-01T10:00:00Z"
    })
}

#[tokio::test]
async fn read_latest_filters_orders_and_limits() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(TABLE_PATH))
        .and(query_param("wallet_address", "eq.W1"))
        .and(query_param("order", "created_at.desc"))
        .and(query_param("limit", "1"))
        .and(header("apikey", "anon-key"))
        .and(header("authorization", "Bearer anon-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([row(7, "processing")])))
        .expect(1)
        .mount(&server)
        .await;

    let record = store_for(&server).read_latest("W1").await.unwrap().unwrap();

    assert_eq!(record.id, "7");
    assert_eq!(record.status, RecordStatus::Processing);
}

#[tokio::test]
async fn read_by_id_decodes_legacy_payload_and_empty_result() {
    let server = MockServer::start().await;
    let mut done = row(7, "completed");
    done["stats_json"] = json!({ "persona": "whale" });
    Mock::given(method("GET"))
        .and(path(TABLE_PATH))
        .and(query_param("id", "eq.7"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([done])))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(TABLE_PATH))
        .and(query_param("id", "eq.8"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;

    let store = store_for(&server);
    let record = store.read_by_id("7").await.unwrap().unwrap();
    assert_eq!(record.result, Some(json!({ "persona": "whale" })));
    assert!(record.ensure_well_formed().is_ok());

    assert_eq!(store.read_by_id("8").await.unwrap(), None);
}

#[tokio::test]
async fn create_posts_row_and_returns_representation() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(TABLE_PATH))
        .and(header("prefer", "return=representation"))
        .and(body_json(json!([{
            "wallet_address": "W1",
            "status": "pending",
            "created_at": "2025-12-01T10:00:00Z"
        }])))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!([row(11, "pending")])))
        .expect(1)
        .mount(&server)
        .await;

    let job = NewJob {
        wallet_address: "W1".into(),
        status: RecordStatus::Pending,
        tx_signature: None,
        created_at: "2025-12-01T10:00:00Z".parse().unwrap(),
    };
    let record = store_for(&server).create(job).await.unwrap();

    assert_eq!(record.id, "11");
    assert_eq!(record.status, RecordStatus::Pending);
}

#[tokio::test]
async fn create_maps_uniqueness_violation_to_conflict() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(TABLE_PATH))
        .respond_with(ResponseTemplate::new(409).set_body_string(
            r#"{"message":"duplicate key value violates unique constraint"}"#,
        ))
        .mount(&server)
        .await;

    let job = NewJob {
        wallet_address: "W1".into(),
        status: RecordStatus::Pending,
        tx_signature: None,
        created_at: chrono::Utc::now(),
    };
    let err = store_for(&server).create(job).await.unwrap_err();

    assert!(err.is_conflict());
}

#[tokio::test]
async fn server_errors_stay_transport_errors() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(TABLE_PATH))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .mount(&server)
        .await;

    let job = NewJob {
        wallet_address: "W1".into(),
        status: RecordStatus::Pending,
        tx_signature: None,
        created_at: chrono::Utc::now(),
    };
    let err = store_for(&server).create(job).await.unwrap_err();

    assert_eq!(
        err,
        CreateError::Store(StoreError::Http {
            status: 500,
            message: "boom".into()
        })
    );
}

#[tokio::test]
async fn delete_counts_returned_rows() {
    let server = MockServer::start().await;
    Mock::given(method("DELETE"))
        .and(path(TABLE_PATH))
        .and(query_param("wallet_address", "eq.W1"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!([row(1, "completed"), row(2, "failed")])),
        )
        .expect(1)
        .mount(&server)
        .await;

    assert_eq!(store_for(&server).delete_by_wallet("W1").await.unwrap(), 2);
}

#[tokio::test]
async fn subscribe_is_unsupported() {
    let server = MockServer::start().await;
    let err = store_for(&server).subscribe("W1").await.err();
    assert_eq!(err, Some(StoreError::SubscriptionUnsupported));
}

#[test]
fn invalid_base_url_is_a_config_error() {
    let err = RestJobStore::new(&RestSettings::new("not a url", "key")).unwrap_err();
    assert!(matches!(err, StoreError::Config(_)));
}

#[tokio::test]
async fn base_url_path_prefix_is_kept() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/proxy/rest/v1/wrapped_requests"))
        .and(query_param("id", "eq.7"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([row(7, "pending")])))
        .expect(1)
        .mount(&server)
        .await;

    let settings = RestSettings::new(format!("{}/proxy", server.uri()), "anon-key");
    let record = RestJobStore::new(&settings)
        .unwrap()
        .read_by_id("7")
        .await
        .unwrap();

    assert_eq!(record.map(|record| record.id), Some("7".to_string()));
}
