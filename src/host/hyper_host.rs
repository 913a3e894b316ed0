// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0
use std::{env, sync::Arc, thread, time::Duration};

use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper::{
    header::{CONTENT_TYPE, USER_AGENT},
    HeaderMap, Method, Request, Uri,
};
use hyper_util::{client::legacy::Client, rt::TokioExecutor};
use once_cell::sync::Lazy;
use rustls::{crypto::ring, ClientConfig, RootCertStore};
use tracing::trace;
use webpki_roots::TLS_SERVER_ROOTS;

use super::{HostError, HostHeaderValue, HostHttp, HostRequest, HostResponse};
use crate::{environment, VERSION};

const DEFAULT_TIMEOUT_SECS: u64 = 30;

static TLS_CONFIG: Lazy<Result<ClientConfig, rustls::Error>> = Lazy::new(|| {
    let mut root_certificates = RootCertStore::empty();

    for cert in TLS_SERVER_ROOTS.iter().cloned() {
        root_certificates.roots.push(cert)
    }

    Ok(
        ClientConfig::builder_with_provider(Arc::new(ring::default_provider()))
            .with_safe_default_protocol_versions()?
            .with_root_certificates(root_certificates)
            .with_no_client_auth(),
    )
});

/// Blocking host primitive on top of hyper.
///
/// Every call runs on its own thread with a current-thread runtime, so it
/// can be invoked from inside an async JavaScript turn. Redirects are not
/// followed.
#[derive(Clone, Debug)]
pub struct HyperHost {
    timeout: Duration,
    user_agent: String,
}

impl Default for HyperHost {
    fn default() -> Self {
        Self::new(
            Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            format!("fetch-ponyfill/{VERSION}"),
        )
    }
}

impl HyperHost {
    pub fn new(timeout: Duration, user_agent: String) -> Self {
        Self {
            timeout,
            user_agent,
        }
    }

    pub fn from_env() -> Self {
        let timeout = env::var(environment::ENV_FETCH_PONYFILL_HTTP_TIMEOUT)
            .ok()
            .and_then(|timeout| timeout.parse::<u64>().ok())
            .unwrap_or(DEFAULT_TIMEOUT_SECS);
        let user_agent = env::var(environment::ENV_FETCH_PONYFILL_USER_AGENT)
            .unwrap_or_else(|_| format!("fetch-ponyfill/{VERSION}"));
        Self::new(Duration::from_secs(timeout), user_agent)
    }

    fn build_request(&self, url: &str, request: &HostRequest) -> Result<Request<Full<Bytes>>, HostError> {
        let uri: Uri = url
            .parse()
            .map_err(|err| HostError::InvalidUrl(format!("{url}: {err}")))?;
        let method = Method::from_bytes(request.method.to_ascii_uppercase().as_bytes())
            .map_err(|err| HostError::Request(err.to_string()))?;

        let mut builder = Request::builder()
            .method(method)
            .uri(uri)
            .header(USER_AGENT, self.user_agent.as_str());
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        let has_content_type = request
            .headers
            .iter()
            .any(|(name, _)| name.eq_ignore_ascii_case(CONTENT_TYPE.as_str()));
        if let (Some(content_type), false) = (&request.content_type, has_content_type) {
            builder = builder.header(CONTENT_TYPE, content_type.as_str());
        }

        let body = request
            .payload
            .clone()
            .map(|payload| payload.into_bytes())
            .unwrap_or_default();
        builder
            .body(Full::new(Bytes::from(body)))
            .map_err(|err| HostError::Request(err.to_string()))
    }

    async fn send(
        &self,
        request: Request<Full<Bytes>>,
        tls_config: ClientConfig,
    ) -> Result<(u16, HeaderMap, Bytes), HostError> {
        let https = hyper_rustls::HttpsConnectorBuilder::new()
            .with_tls_config(tls_config)
            .https_or_http()
            .enable_http1()
            .build();
        let client: Client<_, Full<Bytes>> = Client::builder(TokioExecutor::new()).build(https);

        let exchange = async {
            let response = client
                .request(request)
                .await
                .map_err(|err| HostError::Request(err.to_string()))?;
            let (parts, body) = response.into_parts();
            let bytes = body
                .collect()
                .await
                .map_err(|err| HostError::Request(err.to_string()))?
                .to_bytes();
            Ok((parts.status.as_u16(), parts.headers, bytes))
        };

        tokio::time::timeout(self.timeout, exchange)
            .await
            .map_err(|_| {
                HostError::Request(format!("timed out after {}s", self.timeout.as_secs()))
            })?
    }
}

impl HostHttp for HyperHost {
    fn fetch(&self, url: &str, request: &HostRequest) -> Result<HostResponse, HostError> {
        let tls_config = TLS_CONFIG
            .as_ref()
            .map_err(|err| HostError::Request(err.to_string()))?
            .clone();
        let http_request = self.build_request(url, request)?;

        trace!("{} {}", request.method, url);
        let exchange = thread::scope(|scope| {
            scope
                .spawn(|| -> Result<_, HostError> {
                    let runtime = tokio::runtime::Builder::new_current_thread()
                        .enable_all()
                        .build()?;
                    runtime.block_on(self.send(http_request, tls_config))
                })
                .join()
        });
        let (code, headers, body) =
            exchange.map_err(|_| HostError::Request("request thread panicked".into()))??;
        trace!("{} {} -> {} ({} bytes)", request.method, url, code, body.len());

        if !request.mute_exceptions && code >= 400 {
            return Err(HostError::Status {
                code,
                url: url.to_string(),
            });
        }

        Ok(HostResponse {
            code,
            headers: group_headers(&headers),
            body: body.to_vec(),
        })
    }
}

fn group_headers(headers: &HeaderMap) -> Vec<(String, HostHeaderValue)> {
    headers
        .keys()
        .map(|name| {
            let mut values: Vec<String> = headers
                .get_all(name)
                .iter()
                .map(|value| String::from_utf8_lossy(value.as_bytes()).into_owned())
                .collect();
            let value = if values.len() == 1 {
                HostHeaderValue::Single(values.remove(0))
            } else {
                HostHeaderValue::Multiple(values)
            };
            (name.as_str().to_string(), value)
        })
        .collect()
}
