//! Minimal HTTP/1.1 fake of the SageMaker APIs used by the smoke test.
//!
//! Routes on `X-Amz-Target` for the control plane, on the
//! `/endpoints/<name>/invocations` path for the runtime and on
//! `/v2/credentials/...` for the container credentials endpoint. Every
//! request is recorded before it is answered.

use std::collections::HashMap;
use std::io::{BufRead, BufReader, Read, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::{Arc, Mutex};
use std::thread;

use serde_json::json;

/// Path prefix served as the container credentials endpoint.
pub const CONTAINER_CREDENTIALS_PATH: &str = "/v2/credentials/";

/// How the fake endpoint should look to DescribeEndpoint.
#[derive(Debug, Clone)]
pub enum EndpointReply {
    Status(String),
    NotFound,
}

/// Canned state of the fake deployment.
#[derive(Debug, Clone)]
pub struct Deployment {
    /// (arn, creation time in epoch seconds), in the order returned.
    pub packages: Vec<(String, f64)>,
    pub endpoint: EndpointReply,
    pub inference_body: String,
}

impl Deployment {
    pub fn healthy() -> Self {
        Self {
            packages: vec![(
                "arn:aws:sagemaker:us-east-1:123456789012:model-package/demo-group/4".to_string(),
                1_700_000_400.5,
            )],
            endpoint: EndpointReply::Status("InService".to_string()),
            inference_body: r#"{"predicted_quantity": 57.8}"#.to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: String,
    pub path: String,
    pub headers: HashMap<String, String>,
    pub body: Vec<u8>,
}

impl RecordedRequest {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(&name.to_ascii_lowercase()).map(String::as_str)
    }

    /// `X-Amz-Target` for control-plane calls, `InvokeEndpoint` for runtime.
    pub fn operation(&self) -> String {
        if self.path.ends_with("/invocations") {
            return "InvokeEndpoint".to_string();
        }
        if self.path.starts_with(CONTAINER_CREDENTIALS_PATH) {
            return "ContainerCredentials".to_string();
        }
        self.header("x-amz-target")
            .and_then(|t| t.strip_prefix("SageMaker."))
            .unwrap_or("Unknown")
            .to_string()
    }

    pub fn json_body(&self) -> serde_json::Value {
        serde_json::from_slice(&self.body).expect("request body should be JSON")
    }
}

pub struct FakeSageMaker {
    pub url: String,
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
}

impl FakeSageMaker {
    pub fn start(deployment: Deployment) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").expect("Failed to bind fake server");
        let addr = listener.local_addr().expect("Fake server has no address");
        let requests = Arc::new(Mutex::new(Vec::new()));
        let recorded = Arc::clone(&requests);

        thread::spawn(move || {
            for stream in listener.incoming() {
                let Ok(stream) = stream else { continue };
                if let Some(request) = read_request(&stream) {
                    let response = route(&request, &deployment);
                    recorded.lock().unwrap().push(request);
                    let _ = (&stream).write_all(&response);
                }
            }
        });

        Self {
            url: format!("http://{addr}"),
            requests,
        }
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn operations(&self) -> Vec<String> {
        self.requests().iter().map(RecordedRequest::operation).collect()
    }
}

fn read_request(stream: &TcpStream) -> Option<RecordedRequest> {
    let mut reader = BufReader::new(stream);

    let mut request_line = String::new();
    reader.read_line(&mut request_line).ok()?;
    let mut parts = request_line.split_whitespace();
    let method = parts.next()?.to_string();
    let path = parts.next()?.to_string();

    let mut headers = HashMap::new();
    loop {
        let mut line = String::new();
        reader.read_line(&mut line).ok()?;
        let line = line.trim_end();
        if line.is_empty() {
            break;
        }
        if let Some((name, value)) = line.split_once(':') {
            headers.insert(name.trim().to_ascii_lowercase(), value.trim().to_string());
        }
    }

    let length = headers
        .get("content-length")
        .and_then(|v| v.parse::<usize>().ok())
        .unwrap_or(0);
    let mut body = vec![0u8; length];
    reader.read_exact(&mut body).ok()?;

    Some(RecordedRequest {
        method,
        path,
        headers,
        body,
    })
}

fn route(request: &RecordedRequest, deployment: &Deployment) -> Vec<u8> {
    match request.operation().as_str() {
        "ListModelPackages" => {
            let summaries: Vec<_> = deployment
                .packages
                .iter()
                .map(|(arn, created)| {
                    json!({
                        "ModelPackageArn": arn,
                        "ModelPackageGroupName": "demo-group",
                        "CreationTime": created,
                        "ModelPackageStatus": "Completed",
                        "ModelApprovalStatus": "Approved"
                    })
                })
                .collect();
            let body = json!({ "ModelPackageSummaryList": summaries });
            http_response(200, "application/x-amz-json-1.1", &[], body.to_string().as_bytes())
        }
        "DescribeEndpoint" => {
            let name = request.json_body()["EndpointName"]
                .as_str()
                .unwrap_or_default()
                .to_string();
            match &deployment.endpoint {
                EndpointReply::Status(status) => {
                    let body = json!({
                        "EndpointName": name,
                        "EndpointArn": format!("arn:aws:sagemaker:us-east-1:123456789012:endpoint/{name}"),
                        "EndpointStatus": status,
                        "CreationTime": 1_700_000_000.0
                    });
                    http_response(200, "application/x-amz-json-1.1", &[], body.to_string().as_bytes())
                }
                EndpointReply::NotFound => {
                    let body = json!({
                        "__type": "com.amazonaws.sagemaker#ValidationException",
                        "message": format!("Could not find endpoint \"{name}\".")
                    });
                    http_response(400, "application/x-amz-json-1.1", &[], body.to_string().as_bytes())
                }
            }
        }
        "ContainerCredentials" => {
            let body = json!({
                "AccessKeyId": "ASIACONTAINER",
                "SecretAccessKey": "container-secret",
                "Token": "container-session-token",
                "Expiration": "2030-01-01T00:00:00Z"
            });
            http_response(200, "application/json", &[], body.to_string().as_bytes())
        }
        "InvokeEndpoint" => http_response(
            200,
            "application/json",
            &[("X-Amzn-Invoked-Production-Variant", "AllTraffic")],
            deployment.inference_body.as_bytes(),
        ),
        _ => http_response(404, "text/plain", &[], b"unknown operation"),
    }
}

fn http_response(status: u16, content_type: &str, extra: &[(&str, &str)], body: &[u8]) -> Vec<u8> {
    let reason = match status {
        200 => "OK",
        400 => "Bad Request",
        404 => "Not Found",
        _ => "Error",
    };
    let mut head = format!(
        "HTTP/1.1 {status} {reason}\r\nContent-Type: {content_type}\r\nContent-Length: {}\r\nConnection: close\r\n",
        body.len()
    );
    for (name, value) in extra {
        head.push_str(&format!("{name}: {value}\r\n"));
    }
    head.push_str("\r\n");

    let mut response = head.into_bytes();
    response.extend_from_slice(body);
    response
}
