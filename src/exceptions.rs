// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0
use rquickjs::{atom::PredefinedAtom, function::Opt, Class, Coerced, Ctx, Object, Result, Value};

use crate::utils::{
    primordials::{BasePrimordials, Primordial},
    result::ResultExt,
};

/// Error raised when an operation is cancelled through an `AbortSignal`.
///
/// Its prototype chain continues into `Error.prototype`, so
/// `instanceof Error` holds for instances.
#[rquickjs::class]
#[derive(rquickjs::class::Trace, rquickjs::JsLifetime)]
pub struct AbortError {
    message: String,
    stack: String,
}

#[rquickjs::methods]
impl AbortError {
    #[qjs(constructor)]
    pub fn new<'js>(ctx: Ctx<'js>, message: Opt<Coerced<String>>) -> Result<Self> {
        let message = message.0.map(|m| m.0).unwrap_or_default();
        Self::with_message(&ctx, message)
    }

    #[qjs(get)]
    pub fn message(&self) -> String {
        self.message.clone()
    }

    #[qjs(get)]
    pub fn name(&self) -> &'static str {
        stringify!(AbortError)
    }

    #[qjs(get)]
    fn stack(&self) -> String {
        self.stack.clone()
    }

    #[qjs(rename = PredefinedAtom::ToString)]
    pub fn to_string(&self) -> String {
        if self.message.is_empty() {
            return self.name().to_string();
        }
        [self.name(), self.message.as_str()].join(": ")
    }
}

impl AbortError {
    pub fn with_message(ctx: &Ctx<'_>, message: String) -> Result<Self> {
        let constructor_error = BasePrimordials::get(ctx)?.constructor_error.clone();
        let error: Object = constructor_error.construct((message.clone(),))?;

        Ok(Self {
            message,
            stack: error.get::<_, String>(PredefinedAtom::Stack)?,
        })
    }

    pub fn new_value<'js>(ctx: &Ctx<'js>, message: &str) -> Result<Value<'js>> {
        let error = Self::with_message(ctx, message.into())?;
        Ok(Class::instance(ctx.clone(), error)?.into_value())
    }
}

pub fn init<'js>(ctx: &Ctx<'js>, exports: &Object<'js>) -> Result<()> {
    Class::<AbortError>::define(exports)?;

    let abort_error_proto = Class::<AbortError>::prototype(ctx)?.or_throw(ctx)?;
    let error_prototype = BasePrimordials::get(ctx)?.prototype_error.clone();
    abort_error_proto.set_prototype(Some(&error_prototype))?;

    Ok(())
}
