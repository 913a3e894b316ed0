// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0
use rquickjs::{
    atom::PredefinedAtom,
    methods,
    prelude::{Opt, This},
    Array, Class, Coerced, Ctx, Function, Result, Value,
};

use crate::utils::{
    class::{get_class, IteratorDef},
    object::{is_truthy, map_to_entries},
    result::ResultExt,
};

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum HeaderError {
    #[error("Invalid character in header field name: \"{0}\"")]
    InvalidName(String),
    #[error("Headers constructor: expected name/value pair to be length 2, found {0}")]
    PairLength(String),
}

/// Case-insensitive header collection. Names are stored lower-cased in
/// first-insertion order and repeated appends join values with `,`.
#[derive(Clone, Debug, Default)]
#[rquickjs::class]
#[derive(rquickjs::class::Trace, rquickjs::JsLifetime)]
pub struct Headers {
    #[qjs(skip_trace)]
    headers: Vec<(String, String)>,
}

#[methods(rename_all = "camelCase")]
impl Headers {
    #[qjs(constructor)]
    pub fn new<'js>(ctx: Ctx<'js>, init: Opt<Value<'js>>) -> Result<Self> {
        let mut headers = Self::default();
        let Some(init) = init.0 else {
            return Ok(headers);
        };
        if !is_truthy(&ctx, &init)? {
            return Ok(headers);
        }

        if let Some(other) = get_class::<Headers>(&init)? {
            return Ok(other.borrow().clone());
        }

        if let Some(array) = init.as_array() {
            for pair in array.iter::<Value>() {
                let (length, name, value) = pair_fields(&pair?)?;
                if length.as_number() != Some(2.0) {
                    let length: Coerced<String> = length.get()?;
                    return Err(HeaderError::PairLength(length.0)).map_err_type(&ctx);
                }
                let name: Coerced<String> = name.get()?;
                let value: Coerced<String> = value.get()?;
                headers.try_append(&name, &value).map_err_type(&ctx)?;
            }
        } else if let Some(obj) = init.as_object() {
            for key in obj.keys::<String>() {
                let key = key?;
                let value: Coerced<String> = obj.get(&key)?;
                headers.try_append(&key, &value).map_err_type(&ctx)?;
            }
        }

        Ok(headers)
    }

    pub fn append<'js>(&mut self, ctx: Ctx<'js>, name: Coerced<String>, value: Coerced<String>) -> Result<()> {
        self.try_append(&name, &value).map_err_type(&ctx)
    }

    pub fn get<'js>(&self, ctx: Ctx<'js>, name: Coerced<String>) -> Result<Option<String>> {
        let name = normalize_name(&name).map_err_type(&ctx)?;
        Ok(self.get_value(&name).map(str::to_string))
    }

    pub fn has<'js>(&self, ctx: Ctx<'js>, name: Coerced<String>) -> Result<bool> {
        let name = normalize_name(&name).map_err_type(&ctx)?;
        Ok(self.get_value(&name).is_some())
    }

    pub fn set<'js>(&mut self, ctx: Ctx<'js>, name: Coerced<String>, value: Coerced<String>) -> Result<()> {
        let name = normalize_name(&name).map_err_type(&ctx)?;
        self.set_value(&name, value.0);
        Ok(())
    }

    pub fn delete<'js>(&mut self, ctx: Ctx<'js>, name: Coerced<String>) -> Result<()> {
        let name = normalize_name(&name).map_err_type(&ctx)?;
        self.headers.retain(|(key, _)| *key != name);
        Ok(())
    }

    pub fn keys<'js>(&self, ctx: Ctx<'js>) -> Result<Value<'js>> {
        let keys = Array::new(ctx)?;
        for (idx, (key, _)) in self.headers.iter().enumerate() {
            keys.set(idx, key.as_str())?;
        }
        crate::utils::class::array_iterator(keys)
    }

    pub fn values<'js>(&self, ctx: Ctx<'js>) -> Result<Value<'js>> {
        let values = Array::new(ctx)?;
        for (idx, (_, value)) in self.headers.iter().enumerate() {
            values.set(idx, value.as_str())?;
        }
        crate::utils::class::array_iterator(values)
    }

    pub fn entries<'js>(&self, ctx: Ctx<'js>) -> Result<Value<'js>> {
        self.js_iterator(ctx)
    }

    #[qjs(rename = PredefinedAtom::SymbolIterator)]
    pub fn iterator<'js>(&self, ctx: Ctx<'js>) -> Result<Value<'js>> {
        self.js_iterator(ctx)
    }

    pub fn for_each<'js>(
        this: This<Class<'js, Self>>,
        ctx: Ctx<'js>,
        callback: Function<'js>,
        this_arg: Opt<Value<'js>>,
    ) -> Result<()> {
        let this_arg = this_arg
            .0
            .unwrap_or_else(|| Value::new_undefined(ctx.clone()));
        let headers = this.borrow().headers.clone();
        for (name, value) in headers {
            () = callback.call((This(this_arg.clone()), value, name, this.0.clone()))?;
        }
        Ok(())
    }

    #[qjs(get, rename = PredefinedAtom::SymbolToStringTag)]
    pub fn to_string_tag(&self) -> &'static str {
        stringify!(Headers)
    }
}

impl Headers {
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.headers
            .iter()
            .map(|(key, value)| (key.as_str(), value.as_str()))
    }

    /// Looks up an already lower-cased name.
    pub fn get_value(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    /// Replaces the value of an already lower-cased name, keeping its position.
    pub fn set_value(&mut self, name: &str, value: String) {
        match self.headers.iter_mut().find(|(key, _)| key == name) {
            Some((_, existing)) => *existing = value,
            None => self.headers.push((name.to_string(), value)),
        }
    }

    pub fn try_append(&mut self, name: &str, value: &str) -> std::result::Result<(), HeaderError> {
        let name = normalize_name(name)?;
        match self.headers.iter_mut().find(|(key, _)| *key == name) {
            Some((_, existing)) => {
                existing.push(',');
                existing.push_str(value);
            },
            None => self.headers.push((name, value.to_string())),
        }
        Ok(())
    }
}

impl<'js> IteratorDef<'js> for Headers {
    fn js_entries(&self, ctx: Ctx<'js>) -> Result<Array<'js>> {
        map_to_entries(&ctx, self.headers.clone())
    }
}

/// Reads `length`, `[0]` and `[1]` off a pair the way property access would,
/// so strings count as pairs of code units and other primitives have no length.
fn pair_fields<'js>(pair: &Value<'js>) -> Result<(Value<'js>, Value<'js>, Value<'js>)> {
    let ctx = pair.ctx();
    if let Some(obj) = pair.as_object() {
        return Ok((obj.get(PredefinedAtom::Length)?, obj.get(0u32)?, obj.get(1u32)?));
    }
    if let Some(string) = pair.as_string() {
        let units: Vec<u16> = string.to_string()?.encode_utf16().collect();
        let unit = |index: usize| -> Result<Value<'js>> {
            match units.get(index) {
                Some(unit) => {
                    let text = String::from_utf16_lossy(&[*unit]);
                    Ok(rquickjs::String::from_str(ctx.clone(), &text)?.into_value())
                },
                None => Ok(Value::new_undefined(ctx.clone())),
            }
        };
        let length = Value::new_int(ctx.clone(), units.len() as i32);
        return Ok((length, unit(0)?, unit(1)?));
    }
    let undefined = Value::new_undefined(ctx.clone());
    Ok((undefined.clone(), undefined.clone(), undefined))
}

fn is_token_char(ch: char) -> bool {
    ch.is_ascii_alphanumeric()
        || matches!(
            ch,
            '!' | '#' | '$' | '%' | '&' | '\'' | '*' | '+' | '-' | '.' | '^' | '_' | '`' | '|' | '~'
        )
}

fn normalize_name(name: &str) -> std::result::Result<String, HeaderError> {
    if name.is_empty() || !name.chars().all(is_token_char) {
        return Err(HeaderError::InvalidName(name.to_string()));
    }
    Ok(name.to_ascii_lowercase())
}
