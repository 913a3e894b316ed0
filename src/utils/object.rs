// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0
use rquickjs::{
    prelude::This, Array, ArrayBuffer, Coerced, Ctx, Exception, FromJs, IntoJs, Object, Result,
    Value,
};

use super::{
    primordials::{BasePrimordials, Primordial},
    result::ResultExt,
};

/// JavaScript `ToBoolean`.
pub fn is_truthy<'js>(ctx: &Ctx<'js>, value: &Value<'js>) -> Result<bool> {
    Ok(Coerced::<bool>::from_js(ctx, value.clone())?.0)
}

/// `Object.prototype.toString.call(value)`, e.g. `[object Object]`.
pub fn object_to_string<'js>(ctx: &Ctx<'js>, value: Value<'js>) -> Result<String> {
    let to_string = BasePrimordials::get(ctx)?.function_object_to_string.clone();
    to_string.call((This(value),))
}

pub fn is_array_buffer_view<'js>(ctx: &Ctx<'js>, value: &Value<'js>) -> Result<bool> {
    let is_view = BasePrimordials::get(ctx)?
        .function_array_buffer_is_view
        .clone();
    is_view.call((value.clone(),))
}

/// Copies the bytes of an `ArrayBuffer`, typed array or `DataView`.
///
/// Views only contribute the window they cover. Returns `None` for any
/// other value.
pub fn copy_buffer_bytes<'js>(ctx: &Ctx<'js>, value: &Value<'js>) -> Result<Option<Vec<u8>>> {
    let Some(obj) = value.as_object() else {
        return Ok(None);
    };

    if let Some(array_buffer) = ArrayBuffer::from_object(obj.clone()) {
        let bytes = array_buffer
            .as_bytes()
            .or_throw_type(ctx, "ArrayBuffer is detached")?;
        return Ok(Some(bytes.to_vec()));
    }

    if is_array_buffer_view(ctx, value)? {
        let array_buffer: ArrayBuffer = obj.get("buffer")?;
        let offset: usize = obj.get("byteOffset")?;
        let length: usize = obj.get("byteLength")?;
        let bytes = array_buffer
            .as_bytes()
            .or_throw_type(ctx, "ArrayBuffer is detached")?;
        let window = bytes
            .get(offset..offset + length)
            .or_throw_range(ctx, "View is out of bounds of its buffer")?;
        return Ok(Some(window.to_vec()));
    }

    Ok(None)
}

/// Reads an array of numbers as bytes. Signed values wrap, so `-1` is `0xff`.
pub fn bytes_from_array<'js>(array: &Array<'js>) -> Result<Vec<u8>> {
    let mut bytes = Vec::with_capacity(array.len());
    for value in array.iter::<f64>() {
        let value = value?;
        let byte = if value.is_finite() { value as i64 as u8 } else { 0 };
        bytes.push(byte);
    }
    Ok(bytes)
}

/// Accepts a string (UTF-8 encoded), a byte array, an `ArrayBuffer` or a view.
pub fn get_bytes<'js>(ctx: &Ctx<'js>, value: Value<'js>) -> Result<Vec<u8>> {
    if let Some(string) = value.as_string() {
        return Ok(string.to_string()?.into_bytes());
    }
    if let Some(array) = value.as_array() {
        return bytes_from_array(array);
    }
    if let Some(bytes) = copy_buffer_bytes(ctx, &value)? {
        return Ok(bytes);
    }
    Err(Exception::throw_type(
        ctx,
        "value must be a string, byte array, ArrayBuffer or ArrayBuffer view",
    ))
}

/// Maps every byte to the code point of the same value.
pub fn latin1_decode(bytes: &[u8]) -> String {
    bytes.iter().map(|&byte| byte as char).collect()
}

pub fn map_to_entries<'js, K, V, M>(ctx: &Ctx<'js>, map: M) -> Result<Array<'js>>
where
    M: IntoIterator<Item = (K, V)>,
    K: IntoJs<'js>,
    V: IntoJs<'js>,
{
    let array = Array::new(ctx.clone())?;
    for (idx, (key, value)) in map.into_iter().enumerate() {
        let entry = Array::new(ctx.clone())?;
        entry.set(0, key)?;
        entry.set(1, value)?;
        array.set(idx, entry)?;
    }

    Ok(array)
}

/// Returns `obj[key]` unless it is `undefined` or `null`.
pub fn get_defined<'js>(obj: &Object<'js>, key: &str) -> Result<Option<Value<'js>>> {
    let value: Value = obj.get(key)?;
    if value.is_undefined() || value.is_null() {
        return Ok(None);
    }
    Ok(Some(value))
}
