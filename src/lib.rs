// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0
#![allow(clippy::new_without_default)]
#![allow(clippy::inherent_to_string)]

pub mod abort;
pub mod environment;
pub mod exceptions;
pub mod host;
pub mod http;
pub mod minimal_tracer;
#[cfg(test)]
mod test_utils;
mod utils;
pub mod vm;

use std::sync::Arc;

use rquickjs::{
    module::{Declarations, Exports, ModuleDef},
    Ctx, Object, Result, Value,
};
use tracing::trace;

use crate::{
    host::{HostHandle, HostHttp, HyperHost},
    utils::{
        module::export_default,
        object::is_truthy,
        primordials::{BasePrimordials, Primordial},
    },
};

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Specifier under which [`FetchModule`] is registered.
pub const MODULE_NAME: &str = "fetch-ponyfill";

/// Bindings offered to the global object, in installation order.
pub const GLOBAL_NAMES: [&str; 10] = [
    "fetch",
    "Request",
    "Response",
    "Headers",
    "URL",
    "URLSearchParams",
    "AbortController",
    "AbortSignal",
    "AbortError",
    "Blob",
];

/// Builds a fresh exports object holding every binding in [`GLOBAL_NAMES`].
///
/// Nothing is written to the global object.
pub fn init<'js>(ctx: &Ctx<'js>, host: Arc<dyn HostHttp>) -> Result<Object<'js>> {
    BasePrimordials::init(ctx)?;

    let exports = Object::new(ctx.clone())?;
    abort::init(&exports)?;
    exceptions::init(ctx, &exports)?;
    http::init(ctx, &exports, host)?;

    Ok(exports)
}

/// Copies each binding from `exports` onto `target` unless `target` already
/// holds a truthy value under that name. Running it again is a no-op.
pub fn install_globals<'js>(ctx: &Ctx<'js>, target: &Object<'js>, exports: &Object<'js>) -> Result<()> {
    for name in GLOBAL_NAMES {
        let existing: Value = target.get(name)?;
        if is_truthy(ctx, &existing)? {
            trace!("Keeping existing global {}", name);
            continue;
        }
        let value: Value = exports.get(name)?;
        target.set(name, value)?;
        trace!("Installed global {}", name);
    }

    Ok(())
}

/// [`init`] followed by [`install_globals`] on the context's global object.
pub fn install<'js>(ctx: &Ctx<'js>, host: Arc<dyn HostHttp>) -> Result<Object<'js>> {
    let exports = init(ctx, host)?;
    install_globals(ctx, &ctx.globals(), &exports)?;
    Ok(exports)
}

/// The ponyfill as an importable module.
///
/// Uses the host stored as [`HostHandle`] userdata, or a [`HyperHost`]
/// configured from the environment when none was stored.
pub struct FetchModule;

impl ModuleDef for FetchModule {
    fn declare(declare: &Declarations) -> Result<()> {
        for name in GLOBAL_NAMES {
            declare.declare(name)?;
        }
        declare.declare("default")?;

        Ok(())
    }

    fn evaluate<'js>(ctx: &Ctx<'js>, exports: &Exports<'js>) -> Result<()> {
        let host = match ctx.userdata::<HostHandle>() {
            Some(handle) => handle.0.clone(),
            None => Arc::new(HyperHost::from_env()) as Arc<dyn HostHttp>,
        };
        let bindings = init(ctx, host)?;

        export_default(ctx, exports, |default| {
            for name in GLOBAL_NAMES {
                let value: Value = bindings.get(name)?;
                default.set(name, value)?;
            }
            Ok(())
        })
    }
}
