//! Executes `HttpRequest` values against the network.
//!
//! # Design
//! `Transport` is the I/O seam. It returns whatever status the server sent;
//! only a missing response is an error. `UreqTransport` is the production
//! implementation. Any `Fn(&HttpRequest) -> Result<HttpResponse, ApiError>`
//! is also a transport, which is how tests stand in for the server.
//!
//! TLS: with a client certificate configured the agent presents it and
//! verifies the server. Without one, server verification is disabled, since
//! the Local REST API serves a self-signed certificate on loopback.

use ureq::tls::{ClientCert, PemItem, PrivateKey, TlsConfig};
use ureq::{Agent, RequestBuilder};
use url::Url;

use crate::config::{ClientCertPaths, ClientConfig};
use crate::error::ApiError;
use crate::http::{HttpMethod, HttpRequest, HttpResponse};

pub trait Transport {
    fn execute(&self, request: &HttpRequest) -> Result<HttpResponse, ApiError>;
}

impl<F> Transport for F
where
    F: Fn(&HttpRequest) -> Result<HttpResponse, ApiError>,
{
    fn execute(&self, request: &HttpRequest) -> Result<HttpResponse, ApiError> {
        self(request)
    }
}

/// Blocking transport backed by a `ureq` agent.
///
/// Status codes are returned as data (`http_status_as_error(false)`), so
/// 4xx/5xx reach the parsers instead of surfacing as transport errors.
#[derive(Clone)]
pub struct UreqTransport {
    agent: Agent,
}

impl UreqTransport {
    pub fn new(config: &ClientConfig) -> Result<Self, ApiError> {
        let tls = tls_config(config.client_cert.as_ref())?;
        let agent = Agent::config_builder()
            .http_status_as_error(false)
            .tls_config(tls)
            .build()
            .new_agent();
        Ok(Self { agent })
    }
}

impl Transport for UreqTransport {
    fn execute(&self, request: &HttpRequest) -> Result<HttpResponse, ApiError> {
        // Url::parse percent-encodes characters that cannot appear in a URI,
        // such as spaces in note paths.
        let url = Url::parse(&request.path)
            .map_err(|e| ApiError::InvalidConfig(format!("invalid request URL {:?}: {e}", request.path)))?;
        let url = url.as_str();
        let headers = &request.headers;

        let result = match (request.method, request.body.as_deref()) {
            (HttpMethod::Get, _) => with_headers(self.agent.get(url), headers).call(),
            (HttpMethod::Delete, _) => with_headers(self.agent.delete(url), headers).call(),
            (HttpMethod::Post, Some(body)) => {
                with_headers(self.agent.post(url), headers).send(body.as_bytes())
            }
            (HttpMethod::Post, None) => with_headers(self.agent.post(url), headers).send_empty(),
            (HttpMethod::Put, Some(body)) => {
                with_headers(self.agent.put(url), headers).send(body.as_bytes())
            }
            (HttpMethod::Put, None) => with_headers(self.agent.put(url), headers).send_empty(),
            (HttpMethod::Patch, Some(body)) => {
                with_headers(self.agent.patch(url), headers).send(body.as_bytes())
            }
            (HttpMethod::Patch, None) => with_headers(self.agent.patch(url), headers).send_empty(),
        };
        let mut response = result.map_err(|e| ApiError::Transport(e.to_string()))?;

        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|value| (name.as_str().to_string(), value.to_string()))
            })
            .collect();
        // Notes have no size cap; ureq's default read limit is 10 MiB.
        let body = response
            .body_mut()
            .with_config()
            .limit(u64::MAX)
            .read_to_string()
            .map_err(|e| ApiError::Transport(e.to_string()))?;

        Ok(HttpResponse {
            status,
            headers,
            body,
        })
    }
}

fn with_headers<B>(mut builder: RequestBuilder<B>, headers: &[(String, String)]) -> RequestBuilder<B> {
    for (name, value) in headers {
        builder = builder.header(name.as_str(), value.as_str());
    }
    builder
}

fn tls_config(client_cert: Option<&ClientCertPaths>) -> Result<TlsConfig, ApiError> {
    let Some(paths) = client_cert else {
        return Ok(TlsConfig::builder().disable_verification(true).build());
    };

    let cert_pem = std::fs::read(&paths.cert_path).map_err(|e| {
        ApiError::InvalidConfig(format!("reading {}: {e}", paths.cert_path.display()))
    })?;
    let key_pem = std::fs::read(&paths.key_path).map_err(|e| {
        ApiError::InvalidConfig(format!("reading {}: {e}", paths.key_path.display()))
    })?;

    let mut chain = Vec::new();
    for item in ureq::tls::parse_pem(&cert_pem) {
        match item {
            Ok(PemItem::Certificate(cert)) => chain.push(cert.to_owned()),
            Ok(_) => {}
            Err(e) => {
                return Err(ApiError::InvalidConfig(format!(
                    "parsing {}: {e}",
                    paths.cert_path.display()
                )))
            }
        }
    }
    if chain.is_empty() {
        return Err(ApiError::InvalidConfig(format!(
            "no certificate found in {}",
            paths.cert_path.display()
        )));
    }

    let key = PrivateKey::from_pem(&key_pem).map_err(|e| {
        ApiError::InvalidConfig(format!("parsing {}: {e}", paths.key_path.display()))
    })?;

    Ok(TlsConfig::builder()
        .client_cert(Some(ClientCert::new_with_certs(&chain, key.to_owned())))
        .build())
}
