// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0
use rquickjs::{
    atom::PredefinedAtom,
    class::{Trace, Tracer},
    function::Opt,
    methods, Class, Coerced, Ctx, Exception, FromJs, IntoJs, JsLifetime, Null, Object, Promise,
    Result, Undefined, Value,
};

use super::{
    body::{already_read, Body},
    headers::Headers,
    url::URL,
};
use crate::{
    abort::AbortSignal,
    utils::{
        class::get_class,
        object::{get_defined, is_truthy},
        promise::promise_resolved_with,
    },
};

/// Methods whose spelling is normalized to lower case.
const NORMALIZED_METHODS: [&str; 9] = [
    "connect", "delete", "get", "head", "options", "patch", "post", "put", "trace",
];

#[rquickjs::class]
pub struct Request<'js> {
    url: Class<'js, URL>,
    method: String,
    signal: Class<'js, AbortSignal<'js>>,
    body: Body<'js>,
}

unsafe impl<'js> JsLifetime<'js> for Request<'js> {
    type Changed<'to> = Request<'to>;
}

impl<'js> Trace<'js> for Request<'js> {
    fn trace<'a>(&self, tracer: Tracer<'a, 'js>) {
        self.url.trace(tracer);
        self.signal.trace(tracer);
        self.body.trace(tracer);
    }
}

#[methods(rename_all = "camelCase")]
impl<'js> Request<'js> {
    #[qjs(constructor)]
    pub fn new(ctx: Ctx<'js>, input: Value<'js>, init: Opt<Value<'js>>) -> Result<Self> {
        let init = init.0.and_then(|init| init.into_object());
        let option = |key: &str| -> Result<Option<Value<'js>>> {
            match &init {
                Some(init) => get_defined(init, key),
                None => Ok(None),
            }
        };
        let init_body = option("body")?;
        let init_method = option("method")?;
        let init_signal = option("signal")?;
        let init_headers = option("headers")?;

        let mut signal = match init_signal {
            Some(signal) => Some(
                get_class::<AbortSignal>(&signal)?.ok_or_else(|| {
                    Exception::throw_type(
                        &ctx,
                        "Failed to construct 'Request': member signal is not of type AbortSignal.",
                    )
                })?,
            ),
            None => None,
        };
        let mut method = match init_method {
            Some(method) => Some(Coerced::<String>::from_js(&ctx, method)?.0),
            None => None,
        };
        let mut headers = match init_headers {
            Some(init_headers) => Some(Headers::new(ctx.clone(), Opt(Some(init_headers)))?),
            None => None,
        };
        let has_init_body = match &init_body {
            Some(body) => is_truthy(&ctx, body)?,
            None => false,
        };

        let source = get_class::<Request>(&input)?;
        let url = match &source {
            Some(source) => {
                let source = source.borrow();
                if source.body.used() {
                    return Err(already_read(&ctx));
                }
                method.get_or_insert_with(|| source.method.clone());
                signal.get_or_insert_with(|| source.signal.clone());
                if headers.is_none() {
                    headers = Some(source.body.headers().borrow().clone());
                }
                source.url.clone()
            },
            None => Class::instance(ctx.clone(), URL::new(ctx.clone(), input, Opt(None))?)?,
        };

        let takes_source_body = !has_init_body
            && source
                .as_ref()
                .map(|source| !source.borrow().body.is_empty())
                .unwrap_or_default();

        let method = normalize_method(method.as_deref().unwrap_or("get"));
        if (method == "get" || method == "head") && (has_init_body || takes_source_body) {
            return Err(Exception::throw_type(
                &ctx,
                "Body not allowed for GET or HEAD requests",
            ));
        }

        let headers = Class::instance(ctx.clone(), headers.unwrap_or_default())?;
        let body = match source {
            Some(source) if takes_source_body => {
                let data = source.borrow_mut().body.take_data();
                Body::from_data(data, headers)
            },
            _ => Body::from_init(&ctx, init_body, headers)?,
        };

        let signal = match signal {
            Some(signal) => signal,
            None => Class::instance(ctx.clone(), AbortSignal::new())?,
        };

        Ok(Self {
            url,
            method,
            signal,
            body,
        })
    }

    #[qjs(get)]
    pub fn url(&self) -> Class<'js, URL> {
        self.url.clone()
    }

    #[qjs(get)]
    pub fn method(&self) -> String {
        self.method.clone()
    }

    #[qjs(get)]
    pub fn signal(&self) -> Class<'js, AbortSignal<'js>> {
        self.signal.clone()
    }

    #[qjs(get)]
    pub fn referrer(&self) -> Null {
        Null
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
        if self.body.used() {
            return Err(already_read(&ctx));
        }
        let headers = Class::instance(ctx, self.body.headers().borrow().clone())?;
        Ok(Self {
            url: self.url.clone(),
            method: self.method.clone(),
            signal: self.signal.clone(),
            body: Body::from_data(self.body.data().clone(), headers),
        })
    }

    #[qjs(get, rename = PredefinedAtom::SymbolToStringTag)]
    pub fn to_string_tag(&self) -> &'static str {
        stringify!(Request)
    }
}

impl<'js> Request<'js> {
    pub fn href(&self) -> String {
        self.url.borrow().as_href().to_string()
    }

    pub fn method_name(&self) -> &str {
        &self.method
    }

    pub fn is_aborted(&self) -> bool {
        self.signal.borrow().aborted()
    }

    pub fn body_ref(&self) -> &Body<'js> {
        &self.body
    }
}

/// Lower-cases well known methods and leaves custom ones untouched.
fn normalize_method(method: &str) -> String {
    let lower = method.to_ascii_lowercase();
    if NORMALIZED_METHODS.contains(&lower.as_str()) {
        return lower;
    }
    method.to_string()
}
