// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0
use rquickjs::{prelude::This, Ctx, Error, Function, Promise, Result, Value};

use super::primordials::{BasePrimordials, Primordial};

/// Settles a new promise with the outcome of work that already ran.
///
/// Any error becomes the rejection reason. Rust-side errors are thrown into
/// the context first so they surface as JavaScript exceptions.
pub fn promise_resolved_with<'js>(ctx: &Ctx<'js>, value: Result<Value<'js>>) -> Result<Promise<'js>> {
    let (constructor, resolve, reject) = {
        let primordials = BasePrimordials::get(ctx)?;
        (
            primordials.constructor_promise.clone(),
            primordials.function_promise_resolve.clone(),
            primordials.function_promise_reject.clone(),
        )
    };
    match value {
        Ok(value) => resolve.call((This(constructor), value)),
        Err(Error::Exception) => reject.call((This(constructor), ctx.catch())),
        Err(err) => {
            // `Error::throw` is crate-private in rquickjs; returning the error
            // from a native function makes rquickjs throw it the same way.
            let err = std::cell::Cell::new(Some(err));
            let thrower = Function::new(ctx.clone(), move || -> Result<()> {
                Err(err.take().unwrap_or(Error::Exception))
            })?;
            _ = thrower.call::<_, ()>(());
            reject.call((This(constructor), ctx.catch()))
        },
    }
}
