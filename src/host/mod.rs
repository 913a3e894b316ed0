// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0
//! The synchronous "fetch one URL, get one response" primitive the ponyfill
//! is layered on.
use std::{io, sync::Arc};

use rquickjs::JsLifetime;

mod hyper_host;

pub use self::hyper_host::HyperHost;

#[derive(Clone, Debug, PartialEq)]
pub enum HostPayload {
    Text(String),
    Bytes(Vec<u8>),
}

impl HostPayload {
    pub fn into_bytes(self) -> Vec<u8> {
        match self {
            HostPayload::Text(text) => text.into_bytes(),
            HostPayload::Bytes(bytes) => bytes,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct HostRequest {
    pub method: String,
    pub headers: Vec<(String, String)>,
    pub content_type: Option<String>,
    pub payload: Option<HostPayload>,
    /// When false, a status >= 400 is reported as [`HostError::Status`].
    pub mute_exceptions: bool,
}

#[derive(Clone, Debug, PartialEq)]
pub enum HostHeaderValue {
    Single(String),
    Multiple(Vec<String>),
}

#[derive(Clone, Debug, PartialEq)]
pub struct HostResponse {
    pub code: u16,
    pub headers: Vec<(String, HostHeaderValue)>,
    pub body: Vec<u8>,
}

impl HostResponse {
    pub fn new(code: u16) -> Self {
        Self {
            code,
            headers: Vec::new(),
            body: Vec::new(),
        }
    }

    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.headers
            .push((name.to_string(), HostHeaderValue::Single(value.to_string())));
        self
    }

    pub fn with_body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = body.into();
        self
    }
}

#[derive(Debug, thiserror::Error)]
pub enum HostError {
    #[error("Request failed: {0}")]
    Request(String),
    #[error("Request failed for {url} returned code {code}")]
    Status { code: u16, url: String },
    #[error("Invalid argument: {0}")]
    InvalidUrl(String),
    #[error(transparent)]
    Runtime(#[from] io::Error),
}

pub trait HostHttp: Send + Sync {
    /// Performs one request and blocks until the whole response is available.
    fn fetch(&self, url: &str, request: &HostRequest) -> Result<HostResponse, HostError>;
}

/// Host stored in context userdata for the module loader.
#[derive(Clone)]
pub struct HostHandle(pub Arc<dyn HostHttp>);

unsafe impl<'js> JsLifetime<'js> for HostHandle {
    type Changed<'to> = HostHandle;
}
