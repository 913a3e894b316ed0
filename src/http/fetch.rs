// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0
use std::{sync::Arc, time::Instant};

use rquickjs::{function::Opt, Class, Ctx, Function, Promise, Result, Value};
use tracing::trace;

use super::{
    blob::{new_blob_object, Blob},
    body::BodyData,
    headers::Headers,
    request::Request,
    response::Response,
};
use crate::{
    exceptions::AbortError,
    host::{HostHeaderValue, HostHttp, HostRequest},
    utils::{promise::promise_resolved_with, result::ResultExt},
};

/// Creates the `fetch` function bound to `host`.
pub fn create<'js>(ctx: &Ctx<'js>, host: Arc<dyn HostHttp>) -> Result<Function<'js>> {
    let fetch = Function::new(
        ctx.clone(),
        move |ctx: Ctx<'js>, input: Value<'js>, init: Opt<Value<'js>>| -> Result<Promise<'js>> {
            let response = fetch_once(&ctx, host.as_ref(), input, init);
            promise_resolved_with(&ctx, response)
        },
    )?
    .with_name("fetch")?;
    fetch.set("polyfill", true)?;

    Ok(fetch)
}

/// Builds the request, performs the single host call and wraps the result.
fn fetch_once<'js>(
    ctx: &Ctx<'js>,
    host: &dyn HostHttp,
    input: Value<'js>,
    init: Opt<Value<'js>>,
) -> Result<Value<'js>> {
    let request = Request::new(ctx.clone(), input, init)?;
    let url = request.href();

    if request.is_aborted() {
        trace!("fetch {} aborted before dispatch", url);
        return Err(ctx.throw(AbortError::new_value(ctx, "Aborted")?));
    }

    let body = request.body_ref();
    let host_request = HostRequest {
        method: request.method_name().to_lowercase(),
        headers: body
            .headers()
            .borrow()
            .iter()
            .map(|(name, value)| (name.to_string(), value.to_string()))
            .collect(),
        content_type: body.content_type(),
        payload: body.host_payload()?,
        mute_exceptions: false,
    };

    let start = Instant::now();
    trace!("fetch {} {}", host_request.method, url);
    let host_response = host.fetch(&url, &host_request).or_throw(ctx)?;
    trace!(
        "fetch {} {} -> {} in {:?}",
        host_request.method,
        url,
        host_response.code,
        start.elapsed()
    );

    let mut headers = Headers::default();
    for (name, value) in &host_response.headers {
        let appended = match value {
            HostHeaderValue::Single(value) => headers.try_append(name, value),
            HostHeaderValue::Multiple(values) => values
                .iter()
                .try_for_each(|value| headers.try_append(name, value)),
        };
        appended.map_err_type(ctx)?;
    }

    let content_type = headers.get_value("content-type").map(str::to_string);
    let blob = new_blob_object(ctx, Blob::new_with(host_response.body, content_type, None))?;
    let response = Response::from_host(
        ctx,
        BodyData::Blob(blob),
        headers,
        host_response.code,
        url,
    )?;

    Ok(Class::instance(ctx.clone(), response)?.into_value())
}

#[cfg(test)]
mod tests {
    use rquickjs::{CatchResultExt, Promise};

    use crate::{
        host::{HostError, HostHeaderValue, HostPayload, HostResponse},
        test_utils::{test_async_with, MockHost},
    };

    #[tokio::test]
    async fn not_found_response() {
        let host = MockHost::new();
        host.respond(
            HostResponse::new(404)
                .with_header("Content-Type", "application/json")
                .with_body(r#"{"e":1}"#),
        );
        let recorder = host.clone();

        test_async_with(move |ctx| {
            Box::pin(async move {
                crate::install(&ctx, host).unwrap();
                let promise: Promise = ctx
                    .eval(
                        r#"
                (async () => {
                    const response = await fetch("https://api.example.com/items/1");
                    const body = await response.json();
                    return [
                        response.status,
                        response.ok,
                        response.statusText,
                        response.url,
                        response.type,
                        response.headers.get("content-type"),
                        JSON.stringify(body),
                    ].join("|");
                })()
            "#,
                    )
                    .catch(&ctx)
                    .unwrap();
                let result: String = promise.into_future().await.catch(&ctx).unwrap();
                assert_eq!(
                    result,
                    r#"404|false|Not Found|https://api.example.com/items/1|default|application/json|{"e":1}"#
                );
            })
        })
        .await;

        let calls = recorder.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].0, "https://api.example.com/items/1");
        assert_eq!(calls[0].1.method, "get");
        assert!(!calls[0].1.mute_exceptions);
        assert_eq!(calls[0].1.payload, None);
    }

    #[tokio::test]
    async fn aborted_signal_skips_host() {
        let host = MockHost::new();
        let recorder = host.clone();

        test_async_with(move |ctx| {
            Box::pin(async move {
                crate::install(&ctx, host).unwrap();
                let promise: Promise = ctx
                    .eval(
                        r#"
                (async () => {
                    const controller = new AbortController();
                    controller.abort();
                    try {
                        await fetch("https://h/", { signal: controller.signal });
                        return "resolved";
                    } catch (e) {
                        return [e instanceof AbortError, e.name, e.message].join("|");
                    }
                })()
            "#,
                    )
                    .catch(&ctx)
                    .unwrap();
                let result: String = promise.into_future().await.catch(&ctx).unwrap();
                assert_eq!(result, "true|AbortError|Aborted");
            })
        })
        .await;

        assert!(recorder.calls().is_empty());
    }

    #[tokio::test]
    async fn translates_request_for_host() {
        let host = MockHost::new();
        let recorder = host.clone();

        test_async_with(move |ctx| {
            Box::pin(async move {
                crate::install(&ctx, host).unwrap();
                let promise: Promise = ctx
                    .eval(
                        r#"
                (async () => {
                    const text = await fetch("https://h/text", {
                        method: "POST",
                        body: "hello",
                        headers: { "X-Trace": "1" },
                    });
                    await fetch(new Request("https://h/bytes", { method: "PUT", body: new Uint8Array([1, 2, 255]) }));
                    await fetch("https://h/form", { method: "post", body: new URLSearchParams({ a: "b c" }) });
                    return text.status;
                })()
            "#,
                    )
                    .catch(&ctx)
                    .unwrap();
                let status: u16 = promise.into_future().await.catch(&ctx).unwrap();
                assert_eq!(status, 200);
            })
        })
        .await;

        let calls = recorder.calls();
        assert_eq!(calls.len(), 3);

        let (url, text) = &calls[0];
        assert_eq!(url, "https://h/text");
        assert_eq!(text.method, "post");
        assert_eq!(
            text.headers,
            vec![
                ("x-trace".to_string(), "1".to_string()),
                ("content-type".to_string(), "text/plain;charset=UTF-8".to_string()),
            ]
        );
        assert_eq!(text.content_type.as_deref(), Some("text/plain;charset=UTF-8"));
        assert_eq!(text.payload, Some(HostPayload::Text("hello".into())));

        let (_, bytes) = &calls[1];
        assert_eq!(bytes.method, "put");
        assert_eq!(bytes.content_type, None);
        assert_eq!(bytes.payload, Some(HostPayload::Bytes(vec![1, 2, 255])));

        let (_, form) = &calls[2];
        assert_eq!(
            form.content_type.as_deref(),
            Some("application/x-www-form-urlencoded;charset=UTF-8")
        );
        assert_eq!(form.payload, Some(HostPayload::Text("a=b%20c".into())));
    }

    #[tokio::test]
    async fn repeated_response_headers_are_joined() {
        let host = MockHost::new();
        let mut response = HostResponse::new(200).with_body("ok");
        response.headers.push((
            "Set-Cookie".into(),
            HostHeaderValue::Multiple(vec!["a=1".into(), "b=2".into()]),
        ));
        host.respond(response);

        test_async_with(move |ctx| {
            Box::pin(async move {
                crate::install(&ctx, host).unwrap();
                let promise: Promise = ctx
                    .eval(
                        r#"
                (async () => {
                    const response = await fetch("https://h/");
                    const blob = await response.clone().blob();
                    return [response.headers.get("set-cookie"), await response.text(), String(blob)].join("|");
                })()
            "#,
                    )
                    .catch(&ctx)
                    .unwrap();
                let result: String = promise.into_future().await.catch(&ctx).unwrap();
                assert_eq!(result, "a=1,b=2|ok|Blob");
            })
        })
        .await;
    }

    #[tokio::test]
    async fn malformed_header_pairs_reject() {
        let host = MockHost::new();
        let recorder = host.clone();

        test_async_with(move |ctx| {
            Box::pin(async move {
                crate::install(&ctx, host).unwrap();
                let promise: Promise = ctx
                    .eval(
                        r#"
                (async () => {
                    const outcomes = [];
                    for (const headers of [[1], [["a", "1", "2"]], [Symbol("h")]]) {
                        let pending;
                        try {
                            pending = fetch("https://h/", { headers });
                        } catch (e) {
                            outcomes.push("thrown");
                            continue;
                        }
                        try {
                            await pending;
                            outcomes.push("resolved");
                        } catch (e) {
                            outcomes.push(`rejected:${e.name}`);
                        }
                    }
                    const paired = await fetch("https://h/", { headers: ["ab"] });
                    outcomes.push(paired.status);
                    return outcomes.join("|");
                })()
            "#,
                    )
                    .catch(&ctx)
                    .unwrap();
                let result: String = promise.into_future().await.catch(&ctx).unwrap();
                assert_eq!(result, "rejected:TypeError|rejected:TypeError|rejected:TypeError|200");
            })
        })
        .await;

        let calls = recorder.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].1.headers, vec![("a".to_string(), "b".to_string())]);
    }

    #[tokio::test]
    async fn host_and_construction_errors_reject() {
        let host = MockHost::new();
        host.fail(HostError::Request("connection refused".into()));
        let recorder = host.clone();

        test_async_with(move |ctx| {
            Box::pin(async move {
                crate::install(&ctx, host).unwrap();
                let promise: Promise = ctx
                    .eval(
                        r#"
                (async () => {
                    const errors = [];
                    try { await fetch("https://h/"); } catch (e) { errors.push(e.message); }
                    try { await fetch("ftp://h/"); } catch (e) { errors.push(e.name); }
                    try { await fetch("https://h/", { body: "x" }); } catch (e) { errors.push(e.message); }
                    return [fetch.polyfill, errors.join(",")].join("|");
                })()
            "#,
                    )
                    .catch(&ctx)
                    .unwrap();
                let result: String = promise.into_future().await.catch(&ctx).unwrap();
                assert_eq!(
                    result,
                    "true|Request failed: connection refused,TypeError,Body not allowed for GET or HEAD requests"
                );
            })
        })
        .await;

        assert_eq!(recorder.calls().len(), 1);
    }
}
