// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0
use rquickjs::{
    atom::PredefinedAtom, class::JsClass, prelude::This, Array, Class, Ctx, Function, Result,
    Value,
};

/// Classes iterable as `[key, value]` pairs.
pub trait IteratorDef<'js>
where
    Self: 'js + JsClass<'js> + Sized,
{
    fn js_entries(&self, ctx: Ctx<'js>) -> Result<Array<'js>>;

    fn js_iterator(&self, ctx: Ctx<'js>) -> Result<Value<'js>> {
        array_iterator(self.js_entries(ctx)?)
    }
}

/// Returns `array.values()`, a snapshot iterator over `array`.
pub fn array_iterator(array: Array<'_>) -> Result<Value<'_>> {
    let values_fn: Function = array.as_object().get(PredefinedAtom::Values)?;
    values_fn.call((This(array),))
}

#[inline(always)]
pub fn get_class<'js, C>(provided: &Value<'js>) -> Result<Option<Class<'js, C>>>
where
    C: JsClass<'js>,
{
    if provided
        .as_object()
        .map(|p| p.instance_of::<C>())
        .unwrap_or_default()
    {
        return Ok(Some(Class::<C>::from_value(provided)?));
    }
    Ok(None)
}
