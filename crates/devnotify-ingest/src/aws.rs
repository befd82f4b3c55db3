//! AWS probe adapter: STS identity check to validate credentials, plus a
//! per-service reachability probe (S3, EC2, Lambda) selected by the
//! integration config's `serviceType`.
//!
//! Requests are signed with SigV4 directly; the probe needs exactly three
//! read-only calls, not an SDK.

use std::time::Duration;

use chrono::Utc;
use devnotify_common::types::AwsConfig;
use hmac::{Hmac, Mac};
use serde::Serialize;
use serde_json::Value;
use sha2::{Digest, Sha256};

use crate::error::{IngestError, Result};
use crate::payload::AwsProbeResultPayload;

type HmacSha256 = Hmac<Sha256>;

const STS_VERSION: &str = "2011-06-15";
const EC2_VERSION: &str = "2016-11-15";

#[derive(Debug, Clone, Serialize)]
pub struct AwsIdentity {
    pub account_id: String,
    pub user_id: String,
    pub arn: String,
}

#[derive(Debug)]
pub struct AwsProber {
    http: reqwest::Client,
    config: AwsConfig,
    timeout: Duration,
}

impl AwsProber {
    pub fn new(http: reqwest::Client, config: AwsConfig, timeout: Duration) -> Result<Self> {
        if config.access_key_id.is_empty() || config.secret_access_key.is_empty() {
            return Err(IngestError::Validation(
                "accessKeyId and secretAccessKey are required".to_string(),
            ));
        }
        if config.region.is_empty() {
            return Err(IngestError::Validation("region is required".to_string()));
        }
        Ok(Self {
            http,
            config,
            timeout,
        })
    }

    /// AWS Signature Version 4
    fn sign_v4(
        &self,
        method: &str,
        service: &str,
        host: &str,
        uri: &str,
        query: &str,
        payload: &str,
        amz_date: &str,
    ) -> Result<(String, String)> {
        let date = &amz_date[..8];
        let hashed_payload = format!("{:x}", Sha256::digest(payload.as_bytes()));

        // Step 1: Build canonical request
        let canonical_headers = format!(
            "host:{host}\nx-amz-content-sha256:{hashed_payload}\nx-amz-date:{amz_date}\n"
        );
        let signed_headers = "host;x-amz-content-sha256;x-amz-date";
        let canonical_request = format!(
            "{method}\n{uri}\n{query}\n{canonical_headers}\n{signed_headers}\n{hashed_payload}"
        );
        let hashed_canonical_request =
            format!("{:x}", Sha256::digest(canonical_request.as_bytes()));

        // Step 2: Build string to sign
        let credential_scope = format!("{date}/{}/{service}/aws4_request", self.config.region);
        let string_to_sign = format!(
            "AWS4-HMAC-SHA256\n{amz_date}\n{credential_scope}\n{hashed_canonical_request}"
        );

        // Step 3: Calculate signature
        let secret_date = hmac_sha256(
            format!("AWS4{}", self.config.secret_access_key).as_bytes(),
            date.as_bytes(),
        )?;
        let secret_region = hmac_sha256(&secret_date, self.config.region.as_bytes())?;
        let secret_service = hmac_sha256(&secret_region, service.as_bytes())?;
        let secret_signing = hmac_sha256(&secret_service, b"aws4_request")?;
        let signature = hex::encode(hmac_sha256(&secret_signing, string_to_sign.as_bytes())?);

        // Step 4: Build authorization header
        let authorization = format!(
            "AWS4-HMAC-SHA256 Credential={}/{credential_scope}, SignedHeaders={signed_headers}, Signature={signature}",
            self.config.access_key_id
        );

        Ok((authorization, hashed_payload))
    }

    async fn call_api(
        &self,
        method: &str,
        service: &str,
        uri: &str,
        query: &str,
        payload: &str,
    ) -> Result<String> {
        let host = format!("{service}.{}.amazonaws.com", self.config.region);
        let amz_date = Utc::now().format("%Y%m%dT%H%M%SZ").to_string();
        let (authorization, hashed_payload) =
            self.sign_v4(method, service, &host, uri, query, payload, &amz_date)?;

        let mut url = format!("https://{host}{uri}");
        if !query.is_empty() {
            url.push('?');
            url.push_str(query);
        }
        let request = match method {
            "GET" => self.http.get(&url),
            _ => self
                .http
                .post(&url)
                .header("Content-Type", "application/x-www-form-urlencoded")
                .body(payload.to_string()),
        };
        let response = request
            .header("Host", host)
            .header("X-Amz-Date", amz_date)
            .header("X-Amz-Content-Sha256", hashed_payload)
            .header("Authorization", authorization)
            .header("Accept", "application/json")
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| IngestError::from_reqwest(service, e))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| IngestError::from_reqwest(service, e))?;
        if !status.is_success() {
            return Err(IngestError::Upstream {
                service: format!("aws {service}"),
                message: extract_error_message(&body, status.as_u16()),
            });
        }
        Ok(body)
    }

    /// STS `GetCallerIdentity`: the cheapest possible credential check.
    pub async fn validate_credentials(&self) -> Result<AwsIdentity> {
        let payload = format!("Action=GetCallerIdentity&Version={STS_VERSION}");
        let body = self.call_api("POST", "sts", "/", "", &payload).await?;
        let json: Value = serde_json::from_str(&body)?;
        let result = &json["GetCallerIdentityResponse"]["GetCallerIdentityResult"];
        Ok(AwsIdentity {
            account_id: result["Account"].as_str().unwrap_or_default().to_string(),
            user_id: result["UserId"].as_str().unwrap_or_default().to_string(),
            arn: result["Arn"].as_str().unwrap_or_default().to_string(),
        })
    }

    /// One read-only call against the configured `serviceType`, returning a
    /// confirmation string on success. An unknown service type is an
    /// explicit error, never a silent no-op.
    pub async fn probe_service(&self) -> Result<String> {
        match self.config.service_type.as_str() {
            "s3" => {
                self.call_api("GET", "s3", "/", "", "").await?;
                Ok("S3 access confirmed".to_string())
            }
            "ec2" => {
                let payload =
                    format!("Action=DescribeInstances&MaxResults=5&Version={EC2_VERSION}");
                self.call_api("POST", "ec2", "/", "", &payload).await?;
                Ok("EC2 access confirmed".to_string())
            }
            "lambda" => {
                self.call_api("GET", "lambda", "/2015-03-31/functions/", "MaxItems=1", "")
                    .await?;
                Ok("Lambda access confirmed".to_string())
            }
            other => Err(IngestError::UnsupportedService(other.to_string())),
        }
    }

    /// Run the service probe and fold the outcome into a payload for the
    /// normalizer. Transport and upstream failures become a failed probe
    /// carrying the literal error text; an unsupported service type still
    /// propagates as an error.
    pub async fn run_probe(&self) -> Result<AwsProbeResultPayload> {
        match self.probe_service().await {
            Ok(message) => Ok(AwsProbeResultPayload {
                service_type: self.config.service_type.clone(),
                region: self.config.region.clone(),
                success: true,
                message: Some(message),
                error: None,
            }),
            Err(err @ IngestError::UnsupportedService(_)) => Err(err),
            Err(err) => {
                let error = match err {
                    IngestError::Upstream { message, .. } => message,
                    other => other.to_string(),
                };
                Ok(AwsProbeResultPayload {
                    service_type: self.config.service_type.clone(),
                    region: self.config.region.clone(),
                    success: false,
                    message: None,
                    error: Some(error),
                })
            }
        }
    }
}

/// Pull the most specific error text out of an AWS error body. STS and
/// Lambda answer JSON when asked; EC2 always answers XML.
fn extract_error_message(body: &str, status: u16) -> String {
    if let Ok(json) = serde_json::from_str::<Value>(body) {
        let error = json.get("Error").unwrap_or(&json);
        let code = error.get("Code").and_then(Value::as_str);
        let message = error
            .get("Message")
            .or_else(|| error.get("message"))
            .and_then(Value::as_str);
        match (code, message) {
            (Some(code), Some(message)) => return format!("{code}: {message}"),
            (Some(code), None) => return code.to_string(),
            (None, Some(message)) => return message.to_string(),
            (None, None) => {}
        }
    }
    if let Some(code) = between(body, "<Code>", "</Code>") {
        return match between(body, "<Message>", "</Message>") {
            Some(message) => format!("{code}: {message}"),
            None => code.to_string(),
        };
    }
    if body.is_empty() {
        format!("HTTP {status}")
    } else {
        body.to_string()
    }
}

fn between<'a>(haystack: &'a str, open: &str, close: &str) -> Option<&'a str> {
    let start = haystack.find(open)? + open.len();
    let end = haystack[start..].find(close)? + start;
    Some(&haystack[start..end])
}

fn hmac_sha256(key: &[u8], data: &[u8]) -> Result<Vec<u8>> {
    let mut mac = HmacSha256::new_from_slice(key)
        .map_err(|e| IngestError::Signing(e.to_string()))?;
    mac.update(data);
    Ok(mac.finalize().into_bytes().to_vec())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(service_type: &str) -> AwsConfig {
        AwsConfig {
            access_key_id: "AKIAEXAMPLE".to_string(),
            secret_access_key: "secret".to_string(),
            region: "us-east-1".to_string(),
            service_type: service_type.to_string(),
            bucket_name: None,
            cluster_name: None,
        }
    }

    #[test]
    fn should_reject_missing_credentials() {
        let mut cfg = config("s3");
        cfg.access_key_id = String::new();
        let err =
            AwsProber::new(reqwest::Client::new(), cfg, Duration::from_secs(5)).unwrap_err();
        assert!(matches!(err, IngestError::Validation(_)));
    }

    #[tokio::test]
    async fn should_reject_unsupported_service_type() {
        let prober =
            AwsProber::new(reqwest::Client::new(), config("dynamodb"), Duration::from_secs(5))
                .unwrap();
        let err = prober.probe_service().await.unwrap_err();
        assert!(matches!(err, IngestError::UnsupportedService(_)));
        assert!(err.to_string().contains("dynamodb"));

        // run_probe must propagate it too, not fold it into a failed payload
        let err = prober.run_probe().await.unwrap_err();
        assert!(matches!(err, IngestError::UnsupportedService(_)));
    }

    #[test]
    fn should_extract_json_error_code_and_message() {
        let body = r#"{"Error":{"Code":"InvalidClientTokenId","Message":"The security token included in the request is invalid."},"RequestId":"r1"}"#;
        let msg = extract_error_message(body, 403);
        assert!(msg.contains("InvalidClientTokenId"));
        assert!(msg.contains("security token"));
    }

    #[test]
    fn should_extract_xml_error_code() {
        let body = "<Response><Errors><Error><Code>UnauthorizedOperation</Code><Message>You are not authorized.</Message></Error></Errors></Response>";
        let msg = extract_error_message(body, 403);
        assert_eq!(msg, "UnauthorizedOperation: You are not authorized.");
    }

    #[test]
    fn should_fall_back_to_status_on_empty_body() {
        assert_eq!(extract_error_message("", 500), "HTTP 500");
    }

    #[test]
    fn should_produce_stable_signature_components() {
        let prober =
            AwsProber::new(reqwest::Client::new(), config("s3"), Duration::from_secs(5)).unwrap();
        let (authorization, hashed_payload) = prober
            .sign_v4("GET", "s3", "s3.us-east-1.amazonaws.com", "/", "", "", "20240101T000000Z")
            .unwrap();
        assert!(authorization.starts_with("AWS4-HMAC-SHA256 Credential=AKIAEXAMPLE/20240101/us-east-1/s3/aws4_request"));
        assert!(authorization.contains("SignedHeaders=host;x-amz-content-sha256;x-amz-date"));
        // SHA-256 of the empty string
        assert_eq!(
            hashed_payload,
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
        // Same inputs, same signature
        let (again, _) = prober
            .sign_v4("GET", "s3", "s3.us-east-1.amazonaws.com", "/", "", "", "20240101T000000Z")
            .unwrap();
        assert_eq!(authorization, again);
    }
}
