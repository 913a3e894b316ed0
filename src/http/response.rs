// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0
use std::collections::HashMap;

use once_cell::sync::Lazy;
use rquickjs::{
    atom::PredefinedAtom,
    class::{Trace, Tracer},
    function::Opt,
    Class, Coerced, Ctx, Exception, FromJs, IntoJs, JsLifetime, Object, Promise, Result,
    Undefined, Value,
};

use super::{
    blob::copy_blob,
    body::{Body, BodyData},
    headers::Headers,
};
use crate::utils::{object::get_defined, promise::promise_resolved_with};

static STATUS_TEXTS: Lazy<HashMap<u16, &'static str>> = Lazy::new(|| {
    let mut map = HashMap::new();
    map.insert(100, "Continue");
    map.insert(101, "Switching Protocols");
    map.insert(102, "Processing");
    map.insert(103, "Early Hints");
    map.insert(200, "OK");
    map.insert(201, "Created");
    map.insert(202, "Accepted");
    map.insert(203, "Non-Authoritative Information");
    map.insert(204, "No Content");
    map.insert(205, "Reset Content");
    map.insert(206, "Partial Content");
    map.insert(207, "Multi-Status");
    map.insert(208, "Already Reported");
    map.insert(226, "IM Used");
    map.insert(300, "Multiple Choices");
    map.insert(301, "Moved Permanently");
    map.insert(302, "Found");
    map.insert(303, "See Other");
    map.insert(304, "Not Modified");
    map.insert(305, "Use Proxy");
    map.insert(307, "Temporary Redirect");
    map.insert(308, "Permanent Redirect");
    map.insert(400, "Bad Request");
    map.insert(401, "Unauthorized");
    map.insert(402, "Payment Required");
    map.insert(403, "Forbidden");
    map.insert(404, "Not Found");
    map.insert(405, "Method Not Allowed");
    map.insert(406, "Not Acceptable");
    map.insert(407, "Proxy Authentication Required");
    map.insert(408, "Request Timeout");
    map.insert(409, "Conflict");
    map.insert(410, "Gone");
    map.insert(411, "Length Required");
    map.insert(412, "Precondition Failed");
    map.insert(413, "Payload Too Large");
    map.insert(414, "URI Too Long");
    map.insert(415, "Unsupported Media Type");
    map.insert(416, "Range Not Satisfiable");
    map.insert(417, "Expectation Failed");
    map.insert(418, "I'm a teapot");
    map.insert(421, "Misdirected Request");
    map.insert(422, "Unprocessable Content");
    map.insert(423, "Locked");
    map.insert(424, "Failed Dependency");
    map.insert(425, "Too Early");
    map.insert(426, "Upgrade Required");
    map.insert(428, "Precondition Required");
    map.insert(429, "Too Many Requests");
    map.insert(431, "Request Header Fields Too Large");
    map.insert(451, "Unavailable For Legal Reasons");
    map.insert(500, "Internal Server Error");
    map.insert(501, "Not Implemented");
    map.insert(502, "Bad Gateway");
    map.insert(503, "Service Unavailable");
    map.insert(504, "Gateway Timeout");
    map.insert(505, "HTTP Version Not Supported");
    map.insert(506, "Variant Also Negotiates");
    map.insert(507, "Insufficient Storage");
    map.insert(508, "Loop Detected");
    map.insert(510, "Not Extended");
    map.insert(511, "Network Authentication Required");

    map
});

const REDIRECT_STATUSES: [u16; 5] = [301, 302, 303, 307, 308];

// The reported status is always 0, whatever was passed in.
const STATUS_OUT_OF_RANGE: &str =
    "Failed to construct 'Response': The status provided (0) is outside the range [200, 599].";

/// Reason phrase for a status code, empty when unknown.
pub fn status_text(code: u16) -> &'static str {
    STATUS_TEXTS.get(&code).copied().unwrap_or_default()
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum ResponseKind {
    Default,
    Error,
}

impl ResponseKind {
    fn as_str(&self) -> &'static str {
        match self {
            ResponseKind::Default => "default",
            ResponseKind::Error => "error",
        }
    }
}

#[rquickjs::class]
pub struct Response<'js> {
    body: Body<'js>,
    status: u16,
    status_text: String,
    kind: ResponseKind,
    url: String,
}

unsafe impl<'js> JsLifetime<'js> for Response<'js> {
    type Changed<'to> = Response<'to>;
}

impl<'js> Trace<'js> for Response<'js> {
    fn trace<'a>(&self, tracer: Tracer<'a, 'js>) {
        self.body.trace(tracer);
    }
}

#[rquickjs::methods(rename_all = "camelCase")]
impl<'js> Response<'js> {
    #[qjs(constructor)]
    pub fn new(ctx: Ctx<'js>, body: Opt<Value<'js>>, init: Opt<Value<'js>>) -> Result<Self> {
        let init = init.0.and_then(|init| init.into_object());
        let option = |key: &str| -> Result<Option<Value<'js>>> {
            match &init {
                Some(init) => get_defined(init, key),
                None => Ok(None),
            }
        };

        let headers = match option("headers")? {
            Some(headers) => Headers::new(ctx.clone(), Opt(Some(headers)))?,
            None => Headers::default(),
        };
        let headers = Class::instance(ctx.clone(), headers)?;
        let body = Body::from_init(&ctx, body.0, headers)?;

        let status = match &init {
            Some(init) => {
                let status: Value = init.get("status")?;
                if status.is_undefined() {
                    200
                } else {
                    validate_status(&ctx, Coerced::<f64>::from_js(&ctx, status)?.0)?
                }
            },
            None => 200,
        };
        let status_text = match option("statusText")? {
            Some(text) => Coerced::<String>::from_js(&ctx, text)?.0,
            None => String::new(),
        };

        Ok(Self {
            body,
            status,
            status_text,
            kind: ResponseKind::Default,
            url: String::new(),
        })
    }

    #[qjs(get)]
    pub fn status(&self) -> u16 {
        self.status
    }

    #[qjs(get)]
    pub fn status_text(&self) -> String {
        self.status_text.clone()
    }

    #[qjs(get)]
    pub fn ok(&self) -> bool {
        (200..300).contains(&self.status)
    }

    #[qjs(get, rename = "type")]
    pub fn response_type(&self) -> &'static str {
        self.kind.as_str()
    }

    #[qjs(get)]
    pub fn url(&self) -> String {
        self.url.clone()
    }

    #[qjs(get)]
    pub fn headers(&self) -> Class<'js, Headers> {
        self.body.headers()
    }

    #[qjs(get)]
    pub fn body_used(&self) -> bool {
        self.body.used()
    }

    #[qjs(get)]
    pub fn body(&self) -> Undefined {
        Undefined
    }

    pub fn text(&mut self, ctx: Ctx<'js>) -> Result<Promise<'js>> {
        let text = self.body.text(&ctx).and_then(|text| text.into_js(&ctx));
        promise_resolved_with(&ctx, text)
    }

    pub fn json(&mut self, ctx: Ctx<'js>) -> Result<Promise<'js>> {
        let json = self.body.json(&ctx);
        promise_resolved_with(&ctx, json)
    }

    pub fn array_buffer(&mut self, ctx: Ctx<'js>) -> Result<Promise<'js>> {
        let buffer = self.body.array_buffer(&ctx).map(|buffer| buffer.into_value());
        promise_resolved_with(&ctx, buffer)
    }

    pub fn blob(&mut self, ctx: Ctx<'js>) -> Result<Promise<'js>> {
        let blob = self.body.blob(&ctx).map(Object::into_value);
        promise_resolved_with(&ctx, blob)
    }

    pub fn clone(&self, ctx: Ctx<'js>) -> Result<Self> {
        let data = match self.body.data() {
            BodyData::Blob(blob) => BodyData::Blob(copy_blob(&ctx, blob)?),
            data => data.clone(),
        };
        let headers = Class::instance(ctx, self.body.headers().borrow().clone())?;
        Ok(Self {
            body: Body::from_data(data, headers),
            status: self.status,
            status_text: self.status_text.clone(),
            kind: self.kind,
            url: self.url.clone(),
        })
    }

    #[qjs(static)]
    pub fn error(ctx: Ctx<'js>) -> Result<Self> {
        let headers = Class::instance(ctx, Headers::default())?;
        Ok(Self {
            body: Body::from_data(BodyData::Empty, headers),
            status: 0,
            status_text: String::new(),
            kind: ResponseKind::Error,
            url: String::new(),
        })
    }

    #[qjs(static)]
    pub fn redirect(ctx: Ctx<'js>, url: Coerced<String>, status: Opt<Value<'js>>) -> Result<Self> {
        let status = status
            .0
            .and_then(|status| status.as_number())
            .filter(|status| REDIRECT_STATUSES.iter().any(|code| f64::from(*code) == *status))
            .ok_or_else(|| Exception::throw_range(&ctx, "Invalid status code"))?;

        let mut headers = Headers::default();
        headers.set_value("location", url.0);
        let headers = Class::instance(ctx, headers)?;
        Ok(Self {
            body: Body::from_data(BodyData::Empty, headers),
            status: status as u16,
            status_text: String::new(),
            kind: ResponseKind::Default,
            url: String::new(),
        })
    }

    #[qjs(get, rename = PredefinedAtom::SymbolToStringTag)]
    pub fn to_string_tag(&self) -> &'static str {
        stringify!(Response)
    }
}

impl<'js> Response<'js> {
    /// Builds a response from a completed host call.
    pub fn from_host(
        ctx: &Ctx<'js>,
        body: BodyData<'js>,
        headers: Headers,
        status: u16,
        url: String,
    ) -> Result<Self> {
        let status = validate_status(ctx, f64::from(status))?;
        let headers = Class::instance(ctx.clone(), headers)?;
        Ok(Self {
            body: Body::from_data(body, headers),
            status,
            status_text: status_text(status).to_string(),
            kind: ResponseKind::Default,
            url,
        })
    }
}

fn validate_status(ctx: &Ctx<'_>, status: f64) -> Result<u16> {
    if !(200.0..=599.0).contains(&status) || status.fract() != 0.0 {
        return Err(Exception::throw_range(ctx, STATUS_OUT_OF_RANGE));
    }
    Ok(status as u16)
}

#[cfg(test)]
mod tests {
    use rquickjs::{CatchResultExt, Promise};

    use super::*;
    use crate::test_utils::{test_async_with, test_sync_with, MockHost};

    #[test]
    fn status_text_lookup() {
        assert_eq!(status_text(200), "OK");
        assert_eq!(status_text(404), "Not Found");
        assert_eq!(status_text(299), "");
    }

    #[tokio::test]
    async fn status_range() {
        test_sync_with(|ctx| {
            crate::install(&ctx, MockHost::new())?;
            let result = ctx
                .eval::<String, _>(
                    r#"
                const errors = [];
                for (const status of [999, 199, 0, NaN, 204.5]) {
                    try { new Response(null, { status }); } catch (e) { errors.push(`${e.name}: ${e.message}`); }
                }
                const noContent = new Response(null, { status: 204 });
                const defaults = new Response();
                const failed = new Response("x", { status: 500, statusText: "Boom" });
                [
                    errors.length,
                    errors[0],
                    noContent.status,
                    noContent.ok,
                    defaults.status,
                    defaults.statusText === "",
                    defaults.type,
                    failed.ok,
                    failed.statusText,
                ].join("|")
            "#,
                )
                .catch(&ctx)
                .unwrap();
            assert_eq!(
                result,
                "5|RangeError: Failed to construct 'Response': The status provided (0) is outside the range [200, 599].|204|true|200|true|default|false|Boom"
            );
            Ok(())
        })
        .await
    }

    #[tokio::test]
    async fn static_constructors() {
        test_sync_with(|ctx| {
            crate::install(&ctx, MockHost::new())?;
            let result = ctx
                .eval::<String, _>(
                    r#"
                const error = Response.error();
                const redirect = Response.redirect("https://h/next", 307);
                const errors = [];
                for (const status of [200, "301", undefined]) {
                    try { Response.redirect("https://h/", status); } catch (e) { errors.push(`${e.name}: ${e.message}`); }
                }
                [
                    error.status,
                    error.ok,
                    error.type,
                    redirect.status,
                    redirect.headers.get("location"),
                    errors.join(","),
                ].join("|")
            "#,
                )
                .catch(&ctx)
                .unwrap();
            assert_eq!(
                result,
                "0|false|error|307|https://h/next|RangeError: Invalid status code,RangeError: Invalid status code,RangeError: Invalid status code"
            );
            Ok(())
        })
        .await
    }

    #[tokio::test]
    async fn clone_is_independent() {
        test_async_with(|ctx| {
            Box::pin(async move {
                crate::install(&ctx, MockHost::new()).unwrap();
                let promise: Promise = ctx
                    .eval(
                        r#"
                (async () => {
                    const blob = new Blob("blob body", "text/plain");
                    const response = new Response(blob, { status: 201, statusText: "Made", headers: { a: "1" } });
                    const copy = response.clone();
                    copy.headers.set("a", "2");
                    const copiedBlob = await copy.blob();
                    const errorCopy = Response.error().clone();
                    return [
                        await response.text(),
                        copiedBlob !== blob,
                        copiedBlob.getDataAsString(),
                        copy.status,
                        copy.statusText,
                        response.headers.get("a"),
                        copy.headers.get("a"),
                        errorCopy.type,
                    ].join("|");
                })()
            "#,
                    )
                    .catch(&ctx)
                    .unwrap();
                let result: String = promise.into_future().await.catch(&ctx).unwrap();
                assert_eq!(result, "blob body|true|blob body|201|Made|1|2|error");
            })
        })
        .await;
    }
}
