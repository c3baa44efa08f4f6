//! STS `AssumeRole` (AWS query protocol, XML response).

use anyhow::{Context, Result};
use chrono::Utc;
use reqwest::blocking::Client;
use reqwest::Url;
use std::sync::Arc;
use tracing::debug;

use super::profile_chain::AssumeRole;
use super::Credentials;
use crate::aws::http::{extract_tag_value, SignedTransport};
use crate::aws::sigv4::uri_encode;

const SIGNING_NAME: &str = "sts";
const API_VERSION: &str = "2011-06-15";
const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded; charset=utf-8";

pub(crate) fn assume_role(
    client: Client,
    endpoint: &Url,
    region: &str,
    base: Credentials,
    role: &AssumeRole,
) -> Result<Credentials> {
    let session_name = role
        .session_name
        .clone()
        .unwrap_or_else(|| format!("mlops-smoke-{}", Utc::now().timestamp_millis()));
    debug!(role_arn = %role.role_arn, %session_name, "assuming role");

    let transport = SignedTransport::with_client(client, Arc::new(base), region, SIGNING_NAME);
    let response = transport
        .post(
            "AssumeRole",
            endpoint,
            &[("content-type", FORM_CONTENT_TYPE)],
            request_body(role, &session_name).into_bytes(),
        )
        .with_context(|| format!("Failed to assume role {}", role.role_arn))?;

    let text = String::from_utf8(response.body).context("AssumeRole response is not UTF-8")?;
    parse_response(&text).with_context(|| format!("Failed to assume role {}", role.role_arn))
}

fn request_body(role: &AssumeRole, session_name: &str) -> String {
    let mut params = vec![
        ("Action", "AssumeRole".to_string()),
        ("Version", API_VERSION.to_string()),
        ("RoleArn", role.role_arn.clone()),
        ("RoleSessionName", session_name.to_string()),
    ];
    if let Some(external_id) = &role.external_id {
        params.push(("ExternalId", external_id.clone()));
    }
    if let Some(duration) = role.duration_seconds {
        params.push(("DurationSeconds", duration.to_string()));
    }

    params
        .iter()
        .map(|(name, value)| format!("{name}={}", uri_encode(value)))
        .collect::<Vec<_>>()
        .join("&")
}

fn parse_response(xml: &str) -> Result<Credentials> {
    let credentials =
        extract_tag_value(xml, "Credentials").context("AssumeRole response has no Credentials")?;
    let key = extract_tag_value(credentials, "AccessKeyId").context("AssumeRole response has no AccessKeyId")?;
    let secret = extract_tag_value(credentials, "SecretAccessKey")
        .context("AssumeRole response has no SecretAccessKey")?;
    let token = extract_tag_value(credentials, "SessionToken").map(str::to_string);
    Ok(Credentials::new(key, secret, token))
}

#[cfg(test)]
pub(crate) const SAMPLE_RESPONSE: &str = r#"<AssumeRoleResponse xmlns="https://sts.amazonaws.com/doc/2011-06-15/">
  <AssumeRoleResult>
    <AssumedRoleUser>
      <AssumedRoleId>AROA3XFRBF535PLBIFPI4:ci</AssumedRoleId>
      <Arn>arn:aws:sts::123456789012:assumed-role/deploy/ci</Arn>
    </AssumedRoleUser>
    <Credentials>
      <AccessKeyId>ASIAROLE</AccessKeyId>
      <SecretAccessKey>role-secret</SecretAccessKey>
      <SessionToken>role-token</SessionToken>
      <Expiration>2030-01-01T00:00:00Z</Expiration>
    </Credentials>
  </AssumeRoleResult>
</AssumeRoleResponse>"#;
