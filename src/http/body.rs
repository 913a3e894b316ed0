// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0
use rquickjs::{
    class::{Trace, Tracer},
    ArrayBuffer, Class, Ctx, Exception, Object, Result, Value,
};

use super::{
    blob::{blob_bytes, blob_text, is_platform_blob, new_blob_object, Blob},
    headers::Headers,
    url_search_params::URLSearchParams,
};
use crate::{
    host::HostPayload,
    utils::{
        class::get_class,
        object::{copy_buffer_bytes, is_truthy, latin1_decode, object_to_string},
        result::ResultExt,
    },
};

pub const MIME_TYPE_TEXT: &str = "text/plain;charset=UTF-8";
pub const MIME_TYPE_FORM_URLENCODED: &str = "application/x-www-form-urlencoded;charset=UTF-8";

const ALREADY_READ: &str = "Already read";

#[derive(Clone)]
pub enum BodyData<'js> {
    Empty,
    Text(String),
    Blob(Object<'js>),
    Bytes(Vec<u8>),
}

/// Payload shared by `Request` and `Response`, readable once.
pub struct Body<'js> {
    data: BodyData<'js>,
    used: bool,
    headers: Class<'js, Headers>,
}

impl<'js> Trace<'js> for Body<'js> {
    fn trace<'a>(&self, tracer: Tracer<'a, 'js>) {
        if let BodyData::Blob(blob) = &self.data {
            blob.trace(tracer);
        }
        self.headers.trace(tracer);
    }
}

impl<'js> Body<'js> {
    /// Classifies a caller supplied body by its runtime shape.
    pub fn from_init(
        ctx: &Ctx<'js>,
        init: Option<Value<'js>>,
        headers: Class<'js, Headers>,
    ) -> Result<Self> {
        let init = match init {
            Some(init) if is_truthy(ctx, &init)? => init,
            _ => return Ok(Self::from_data(BodyData::Empty, headers)),
        };

        let data = if let Some(text) = init.as_string() {
            BodyData::Text(text.to_string()?)
        } else if is_platform_blob(ctx, &init)? {
            BodyData::Blob(init.into_object().or_throw(ctx)?)
        } else if let Some(params) = get_class::<URLSearchParams>(&init)? {
            let text = params.borrow().to_query_string();
            set_default_content_type(&headers, MIME_TYPE_FORM_URLENCODED);
            BodyData::Text(text)
        } else if let Some(bytes) = copy_buffer_bytes(ctx, &init)? {
            BodyData::Bytes(bytes)
        } else {
            BodyData::Text(object_to_string(ctx, init)?)
        };

        Ok(Self::from_data(data, headers))
    }

    /// Wraps already classified data. Text bodies get a default content type.
    pub fn from_data(data: BodyData<'js>, headers: Class<'js, Headers>) -> Self {
        if let BodyData::Text(_) = data {
            set_default_content_type(&headers, MIME_TYPE_TEXT);
        }
        Self {
            data,
            used: false,
            headers,
        }
    }

    pub fn headers(&self) -> Class<'js, Headers> {
        self.headers.clone()
    }

    pub fn used(&self) -> bool {
        self.used
    }

    pub fn is_empty(&self) -> bool {
        matches!(self.data, BodyData::Empty)
    }

    pub fn data(&self) -> &BodyData<'js> {
        &self.data
    }

    /// Hands the payload to a new owner and marks this body consumed.
    pub fn take_data(&mut self) -> BodyData<'js> {
        self.used = true;
        self.data.clone()
    }

    pub fn content_type(&self) -> Option<String> {
        self.headers
            .borrow()
            .get_value("content-type")
            .filter(|value| !value.is_empty())
            .map(str::to_string)
    }

    pub fn text(&mut self, ctx: &Ctx<'js>) -> Result<String> {
        self.check_unused(ctx)?;
        if self.is_empty() {
            return Ok(String::new());
        }
        self.used = true;
        match &self.data {
            BodyData::Empty => Ok(String::new()),
            BodyData::Text(text) => Ok(text.clone()),
            BodyData::Bytes(bytes) => Ok(latin1_decode(bytes)),
            BodyData::Blob(blob) => blob_text(blob),
        }
    }

    pub fn json(&mut self, ctx: &Ctx<'js>) -> Result<Value<'js>> {
        let text = self.text(ctx)?;
        ctx.json_parse(text)
    }

    pub fn array_buffer(&mut self, ctx: &Ctx<'js>) -> Result<ArrayBuffer<'js>> {
        self.consume(ctx)?;
        let bytes = match &self.data {
            BodyData::Empty => Vec::new(),
            BodyData::Text(text) => text.as_bytes().to_vec(),
            BodyData::Bytes(bytes) => bytes.clone(),
            BodyData::Blob(blob) => blob_bytes(blob)?,
        };
        ArrayBuffer::new(ctx.clone(), bytes)
    }

    pub fn blob(&mut self, ctx: &Ctx<'js>) -> Result<Object<'js>> {
        self.consume(ctx)?;
        let bytes = match &self.data {
            BodyData::Blob(blob) => return Ok(blob.clone()),
            BodyData::Empty => Vec::new(),
            BodyData::Text(text) => text.as_bytes().to_vec(),
            BodyData::Bytes(bytes) => bytes.clone(),
        };
        new_blob_object(ctx, Blob::new_with(bytes, self.content_type(), None))
    }

    /// The payload as handed to the host primitive.
    pub fn host_payload(&self) -> Result<Option<HostPayload>> {
        Ok(match &self.data {
            BodyData::Empty => None,
            BodyData::Text(text) => Some(HostPayload::Text(text.clone())),
            BodyData::Bytes(bytes) => Some(HostPayload::Bytes(bytes.clone())),
            BodyData::Blob(blob) => Some(HostPayload::Bytes(blob_bytes(blob)?)),
        })
    }

    fn check_unused(&self, ctx: &Ctx<'js>) -> Result<()> {
        if self.used {
            return Err(Exception::throw_type(ctx, ALREADY_READ));
        }
        Ok(())
    }

    fn consume(&mut self, ctx: &Ctx<'js>) -> Result<()> {
        self.check_unused(ctx)?;
        self.used = true;
        Ok(())
    }
}

pub fn already_read<'js>(ctx: &Ctx<'js>) -> rquickjs::Error {
    Exception::throw_type(ctx, ALREADY_READ)
}

fn set_default_content_type(headers: &Class<'_, Headers>, content_type: &str) {
    let mut headers = headers.borrow_mut();
    let missing = headers
        .get_value("content-type")
        .map(str::is_empty)
        .unwrap_or(true);
    if missing {
        headers.set_value("content-type", content_type.to_string());
    }
}
