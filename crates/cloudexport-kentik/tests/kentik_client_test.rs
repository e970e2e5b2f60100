//! KentikClient against a mock Kentik API

use cloudexport::{
    ActionType, ApiError, AwsProperties, CancellationToken, CloudExport, CloudExportApi,
    CloudExportError, ExportState, ExportType, FlatTree, ProviderProperties, RetryPolicy,
};
use cloudexport_config::{AuthToken, ResolvedConfig};
use cloudexport_kentik::{CloudExportProvider, EXPORTS_PATH, KentikClient};
use serde_json::{Value, json};
use std::time::Duration;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn config(server: &MockServer) -> ResolvedConfig {
    ResolvedConfig {
        api_url: server.uri(),
        email: "joe.doe@email.com".to_string(),
        token: AuthToken::new("dummy-token"),
        retry: RetryPolicy {
            max_attempts: 3,
            min_delay: Duration::from_millis(10),
            max_delay: Duration::from_millis(40),
        },
        log_payloads: true,
    }
}

fn client(server: &MockServer) -> KentikClient {
    KentikClient::new(&config(server)).unwrap()
}

fn export_path(id: &str) -> String {
    format!("{}/{}", EXPORTS_PATH, id)
}

fn aws_json(id: &str, name: &str) -> Value {
    json!({
        "id": id,
        "type": "CLOUD_EXPORT_TYPE_KENTIK_MANAGED",
        "enabled": true,
        "name": name,
        "description": "terraform aws cloud export",
        "planId": "11467",
        "cloudProvider": "aws",
        "aws": {
            "bucket": "terraform-aws-bucket",
            "iamRoleArn": "arn:aws:iam::003740049406:role/trafficTerraformIngestRole",
            "region": "us-east-2",
            "deleteAfterRead": false,
            "multipleBuckets": false
        },
        "currentStatus": {
            "status": "OK",
            "errorMessage": "No errors",
            "flowFound": true,
            "apiAccess": true,
            "storageAccountAccess": true
        }
    })
}

fn aws_export(name: &str) -> CloudExport {
    CloudExport {
        id: String::new(),
        export_type: ExportType::KentikManaged,
        enabled: true,
        name: name.to_string(),
        description: "terraform aws cloud export".to_string(),
        plan_id: "11467".to_string(),
        properties: ProviderProperties::Aws(AwsProperties {
            bucket: "terraform-aws-bucket".to_string(),
            iam_role_arn: "arn:aws:iam::003740049406:role/trafficTerraformIngestRole"
                .to_string(),
            region: "us-east-2".to_string(),
            delete_after_read: false,
            multiple_buckets: false,
        }),
        bgp: None,
        current_status: None,
    }
}

#[tokio::test]
async fn test_get_sends_auth_headers() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(export_path("1")))
        .and(header("X-CH-Auth-Email", "joe.doe@email.com"))
        .and(header("X-CH-Auth-API-Token", "dummy-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "export": aws_json("1", "test_terraform_aws_export")
        })))
        .expect(1)
        .mount(&server)
        .await;

    let export = client(&server).get("1").await.unwrap();
    assert_eq!(export.id, "1");
    assert_eq!(export.name, "test_terraform_aws_export");
    assert_eq!(export.current_status.unwrap().status, "OK");
}

#[tokio::test]
async fn test_create_posts_export_without_status() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(EXPORTS_PATH))
        .and(body_partial_json(json!({
            "export": {
                "name": "resource_test_aws",
                "planId": "11467",
                "cloudProvider": "aws",
                "aws": {"iamRoleArn": "arn:aws:iam::003740049406:role/trafficTerraformIngestRole"}
            }
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "export": aws_json("5", "resource_test_aws")
        })))
        .expect(1)
        .mount(&server)
        .await;

    let mut export = aws_export("resource_test_aws");
    export.current_status = Some(Default::default());
    let created = client(&server).create(&export).await.unwrap();
    assert_eq!(created.id, "5");

    let requests = server.received_requests().await.unwrap();
    let body: Value = serde_json::from_slice(&requests[0].body).unwrap();
    assert!(body["export"].get("currentStatus").is_none());
    assert!(body["export"].get("azure").is_none());
}

#[tokio::test]
async fn test_get_missing_export_is_not_found() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(export_path("42")))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({
            "code": 5,
            "message": "cloud export 42 not found"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let err = client(&server).get("42").await.unwrap_err();
    match err {
        ApiError::NotFound(message) => assert!(message.contains("cloud export 42 not found")),
        other => panic!("expected not found, got {other:?}"),
    }
}

#[tokio::test]
async fn test_create_500_is_conflict_and_not_retried() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(EXPORTS_PATH))
        .respond_with(ResponseTemplate::new(500).set_body_json(json!({
            "code": 2,
            "message": "name already taken"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let err = client(&server)
        .create(&aws_export("test_terraform_aws_export"))
        .await
        .unwrap_err();
    assert!(matches!(err, ApiError::Conflict(_)));
}

#[tokio::test]
async fn test_update_500_is_fatal() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path(export_path("1")))
        .respond_with(ResponseTemplate::new(500))
        .expect(1)
        .mount(&server)
        .await;

    let err = client(&server)
        .update("1", &aws_export("x"))
        .await
        .unwrap_err();
    assert!(matches!(err, ApiError::Transport { attempts: 1, .. }));
}

#[tokio::test]
async fn test_retryable_status_is_retried() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(export_path("1")))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(2)
        .expect(2)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(export_path("1")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "export": aws_json("1", "test_terraform_aws_export")
        })))
        .expect(1)
        .mount(&server)
        .await;

    let export = client(&server).get("1").await.unwrap();
    assert_eq!(export.id, "1");
}

#[tokio::test]
async fn test_retries_exhausted() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(EXPORTS_PATH))
        .respond_with(ResponseTemplate::new(429).set_body_string("slow down"))
        .expect(3)
        .mount(&server)
        .await;

    let err = client(&server).list().await.unwrap_err();
    match err {
        ApiError::Transport { message, attempts } => {
            assert_eq!(attempts, 3);
            assert!(message.contains("slow down"));
        }
        other => panic!("expected transport error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_list_skips_undecodable_exports() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(EXPORTS_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "exports": [
                aws_json("1", "first"),
                {"id": "2", "cloudProvider": "gce"},
                aws_json("3", "third")
            ],
            "invalidExportsCount": 1
        })))
        .mount(&server)
        .await;

    let exports = client(&server).list().await.unwrap();
    let ids: Vec<_> = exports.iter().map(|e| e.id.as_str()).collect();
    assert_eq!(ids, ["1", "3"]);
}

#[tokio::test]
async fn test_delete() {
    let server = MockServer::start().await;
    Mock::given(method("DELETE"))
        .and(path(export_path("1")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path(export_path("2")))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let client = client(&server);
    client.delete("1").await.unwrap();
    assert!(matches!(
        client.delete("2").await,
        Err(ApiError::NotFound(_))
    ));
}

#[tokio::test]
async fn test_controller_create_reads_back() -> anyhow::Result<()> {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(EXPORTS_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "export": aws_json("5", "resource_test_aws")
        })))
        .expect(1)
        .mount(&server)
        .await;
    let mut normalized = aws_json("5", "resource_test_aws");
    normalized["aws"]["region"] = json!("US-EAST-2");
    Mock::given(method("GET"))
        .and(path(export_path("5")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "export": normalized })))
        .expect(2)
        .mount(&server)
        .await;

    let provider = CloudExportProvider::with_config(config(&server))?;
    let controller = provider.controller();
    let cancel = CancellationToken::new();

    let desired = FlatTree::new()
        .with("type", "CLOUD_EXPORT_TYPE_KENTIK_MANAGED")
        .with("enabled", true)
        .with("name", "resource_test_aws")
        .with("description", "terraform aws cloud export")
        .with("plan_id", "11467")
        .with("cloud_provider", "aws")
        .with_block(
            "aws",
            FlatTree::new()
                .with("bucket", "terraform-aws-bucket")
                .with("iam_role_arn", "arn:aws:iam::003740049406:role/trafficTerraformIngestRole")
                .with("region", "us-east-2")
                .with("delete_after_read", false)
                .with("multiple_buckets", false),
        );

    let mut state = ExportState::absent();
    controller.create(&mut state, &desired, &cancel).await?;
    assert_eq!(state.id, "5");
    let aws = state.attributes.block("aws").expect("aws block");
    assert_eq!(aws.string("region"), Some("US-EAST-2"));

    // server-side normalization shows up as drift on the next reconcile plan
    controller.read(&mut state, &cancel).await?;
    assert_eq!(cloudexport::plan(&state, Some(&desired))?, ActionType::Update);
    Ok(())
}

#[tokio::test]
async fn test_controller_item_not_found() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(export_path("404")))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let provider = CloudExportProvider::with_config(config(&server)).unwrap();
    let err = provider
        .controller()
        .read_item("404", &CancellationToken::new())
        .await
        .unwrap_err();
    assert!(matches!(err, CloudExportError::NotFound { .. }));
    assert!(err.to_string().contains("404"));
}
