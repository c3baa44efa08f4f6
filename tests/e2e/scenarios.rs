//! E2E scenarios: healthy deployment, empty registry, endpoint not ready,
//! missing endpoint and unreachable service.

use super::fake_sagemaker::{Deployment, EndpointReply, FakeSageMaker, CONTAINER_CREDENTIALS_PATH};
use super::helpers::{closed_port_url, run_smoke, run_smoke_with, TEST_ENDPOINT, TEST_GROUP};

#[test]
fn test_all_checks_pass() {
    let server = FakeSageMaker::start(Deployment::healthy());

    let run = run_smoke(&server.url);

    assert_eq!(run.status, Some(0), "stdout:\n{}\nstderr:\n{}", run.stdout, run.stderr);

    let registered = run.position("✅ Model registered: arn:aws:sagemaker").unwrap();
    let deployed = run
        .position("✅ Endpoint demo-endpoint is deployed and InService.")
        .unwrap();
    let inferred = run
        .position(r#"✅ Inference response: {"predicted_quantity": 57.8}"#)
        .unwrap();
    let banner = run.position("🎉 All tests passed successfully!").unwrap();
    assert!(registered < deployed && deployed < inferred && inferred < banner);

    assert!(run.position("Running Model Registration Test...").unwrap() < registered);
    assert!(run.position("Running Deployment Test...").unwrap() < deployed);
    assert!(run.position("Running Inference Test...").unwrap() < inferred);

    assert_eq!(
        server.operations(),
        vec!["ListModelPackages", "DescribeEndpoint", "InvokeEndpoint"]
    );
}

#[test]
fn test_requests_are_shaped_and_signed() {
    let server = FakeSageMaker::start(Deployment::healthy());

    let run = run_smoke(&server.url);
    assert_eq!(run.status, Some(0), "stdout:\n{}", run.stdout);

    let requests = server.requests();
    assert_eq!(requests.len(), 3);

    let list = &requests[0];
    assert_eq!(list.method, "POST");
    assert_eq!(list.header("content-type"), Some("application/x-amz-json-1.1"));
    let body = list.json_body();
    assert_eq!(body["ModelPackageGroupName"], TEST_GROUP);
    assert_eq!(body["SortBy"], "CreationTime");
    assert_eq!(body["SortOrder"], "Descending");
    assert_eq!(body["MaxResults"], 1);

    let describe = &requests[1];
    assert_eq!(describe.json_body()["EndpointName"], TEST_ENDPOINT);

    let invoke = &requests[2];
    assert_eq!(invoke.path, format!("/endpoints/{TEST_ENDPOINT}/invocations"));
    assert_eq!(invoke.header("content-type"), Some("application/json"));
    let payload = invoke.json_body();
    assert_eq!(payload["price"].as_f64(), Some(24.92));
    assert_eq!(payload["quantity_sold"].as_u64(), Some(58));
    assert_eq!(payload["is_holiday"].as_bool(), Some(true));

    for request in &requests {
        let auth = request.header("authorization").unwrap();
        assert!(
            auth.starts_with("AWS4-HMAC-SHA256 Credential=AKIDTEST/"),
            "{auth}"
        );
        assert!(auth.contains("/us-east-1/sagemaker/aws4_request"), "{auth}");
        assert!(request.header("x-amz-date").is_some());
        assert!(request.header("amz-sdk-invocation-id").is_some());
    }
}

#[test]
fn test_empty_registry_fails_before_deployment() {
    let server = FakeSageMaker::start(Deployment {
        packages: Vec::new(),
        ..Deployment::healthy()
    });

    let run = run_smoke(&server.url);

    assert_eq!(run.status, Some(1));
    assert!(run
        .stdout
        .contains("❌ Test failed: No models found in package group!"));
    assert!(run.position("Running Deployment Test...").is_none());
    assert!(run.position("Running Inference Test...").is_none());
    assert_eq!(server.operations(), vec!["ListModelPackages"]);
}

#[test]
fn test_endpoint_creating_fails_before_inference() {
    let server = FakeSageMaker::start(Deployment {
        endpoint: EndpointReply::Status("Creating".to_string()),
        ..Deployment::healthy()
    });

    let run = run_smoke(&server.url);

    assert_eq!(run.status, Some(1));
    assert!(run.stdout.contains(
        "❌ Test failed: Endpoint demo-endpoint not ready. Current status: Creating"
    ));
    assert!(run.position("Running Inference Test...").is_none());
    assert_eq!(
        server.operations(),
        vec!["ListModelPackages", "DescribeEndpoint"]
    );
}

#[test]
fn test_missing_endpoint_is_unexpected_error() {
    let server = FakeSageMaker::start(Deployment {
        endpoint: EndpointReply::NotFound,
        ..Deployment::healthy()
    });

    let run = run_smoke(&server.url);

    assert_eq!(run.status, Some(1));
    let line = run.position("❌ Unexpected error:").map(|i| run.lines()[i].to_string());
    let line = line.expect("unexpected-error line");
    assert!(line.contains("ValidationException"), "{line}");
    assert!(line.contains("Could not find endpoint"), "{line}");
    assert!(!run.stdout.contains("Test failed"));
}

#[test]
fn test_unreachable_service_is_unexpected_error() {
    let run = run_smoke(&closed_port_url());

    assert_eq!(run.status, Some(1));
    assert!(run.stdout.contains("Running Model Registration Test..."));
    assert!(run.stdout.contains("❌ Unexpected error: ListModelPackages"));
    assert!(run.position("Running Deployment Test...").is_none());
}

#[test]
fn test_missing_credentials_is_unexpected_error() {
    let server = FakeSageMaker::start(Deployment::healthy());

    let run = run_smoke_with(&server.url, |cmd| {
        cmd.env_remove("AWS_ACCESS_KEY_ID")
            .env_remove("AWS_SECRET_ACCESS_KEY");
    });

    assert_eq!(run.status, Some(1));
    let header = run.position("Running Model Registration Test...").unwrap();
    let error = run
        .position("❌ Unexpected error: Unable to locate AWS credentials")
        .unwrap();
    assert!(header < error);
    assert!(run.position("Running Deployment Test...").is_none());
    assert!(server.requests().is_empty());
}

#[test]
fn test_container_credentials_sign_requests() {
    let server = FakeSageMaker::start(Deployment::healthy());
    let credentials_uri = format!("{}{CONTAINER_CREDENTIALS_PATH}task-1", server.url);

    let run = run_smoke_with(&server.url, |cmd| {
        cmd.env_remove("AWS_ACCESS_KEY_ID")
            .env_remove("AWS_SECRET_ACCESS_KEY")
            .env("AWS_CONTAINER_CREDENTIALS_FULL_URI", &credentials_uri)
            .env("AWS_CONTAINER_AUTHORIZATION_TOKEN", "task-auth-token");
    });

    assert_eq!(run.status, Some(0), "stdout:\n{}\nstderr:\n{}", run.stdout, run.stderr);
    assert_eq!(
        server.operations(),
        vec![
            "ContainerCredentials",
            "ListModelPackages",
            "DescribeEndpoint",
            "InvokeEndpoint"
        ]
    );

    let requests = server.requests();
    assert_eq!(requests[0].header("authorization"), Some("task-auth-token"));
    for request in &requests[1..] {
        let auth = request.header("authorization").unwrap();
        assert!(auth.contains("Credential=ASIACONTAINER/"), "{auth}");
        assert_eq!(
            request.header("x-amz-security-token"),
            Some("container-session-token")
        );
    }
}

#[test]
fn test_flags_override_environment() {
    let server = FakeSageMaker::start(Deployment::healthy());

    let run = run_smoke_with(&server.url, |cmd| {
        cmd.args(["--model-package-group", "other-group", "--endpoint", "prod-endpoint"]);
    });

    assert_eq!(run.status, Some(0), "stdout:\n{}", run.stdout);
    assert!(run
        .stdout
        .contains("✅ Endpoint prod-endpoint is deployed and InService."));

    let requests = server.requests();
    assert_eq!(requests[0].json_body()["ModelPackageGroupName"], "other-group");
    assert_eq!(requests[2].path, "/endpoints/prod-endpoint/invocations");
}

#[test]
fn test_default_targets_when_unset() {
    let server = FakeSageMaker::start(Deployment::healthy());

    let run = run_smoke_with(&server.url, |cmd| {
        cmd.env_remove("MODEL_PACKAGE_GROUP_NAME")
            .env_remove("ENDPOINT_NAME");
    });

    assert_eq!(run.status, Some(0), "stdout:\n{}", run.stdout);
    let requests = server.requests();
    assert_eq!(
        requests[0].json_body()["ModelPackageGroupName"],
        "anjali-mlops-demo"
    );
    assert_eq!(
        requests[1].json_body()["EndpointName"],
        "anjali-mlops-demo-staging"
    );
}

#[test]
fn test_unknown_flag_exits_one() {
    let run = run_smoke_with(&closed_port_url(), |cmd| {
        cmd.arg("--no-such-flag");
    });

    assert_eq!(run.status, Some(1));
    assert!(run.stderr.contains("--no-such-flag"), "{}", run.stderr);
    assert!(run.position("Running Model Registration Test...").is_none());
}
