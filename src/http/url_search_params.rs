// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0
use std::{cell::RefCell, rc::Rc};

use percent_encoding::{percent_decode_str, utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use rquickjs::{
    atom::PredefinedAtom,
    class::Trace,
    function::{Opt, This},
    Array, Class, Coerced, Ctx, FromJs, Function, Object, Result, Value,
};

use crate::utils::{
    class::get_class,
    primordials::{BasePrimordials, Primordial},
};

/// Characters `encodeURIComponent` leaves as-is.
const URI_COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

#[derive(Debug, thiserror::Error, PartialEq)]
#[error("URI malformed")]
pub struct MalformedUri;

type ParamList = Rc<RefCell<Vec<(String, Vec<String>)>>>;

/// Ordered multi-map of query parameters.
///
/// Keys keep their first-insertion order and values keep their order per
/// key, so `a=1&b=2&a=3` iterates as `a=1`, `a=3`, `b=2`.
#[derive(Clone, Default, Trace, rquickjs::JsLifetime)]
#[rquickjs::class]
pub struct URLSearchParams {
    #[qjs(skip_trace)]
    entries: ParamList,
}

#[rquickjs::methods(rename_all = "camelCase")]
impl<'js> URLSearchParams {
    #[qjs(constructor)]
    pub fn new(ctx: Ctx<'js>, init: Opt<Value<'js>>) -> Result<Self> {
        let params = Self::default();
        let Some(init) = init.0 else {
            return Ok(params);
        };

        if let Some(string) = init.as_string() {
            params.parse_query(&string.to_string()?).or_else(|err| throw_uri_error(&ctx, err))?;
        } else if let Some(other) = get_class::<URLSearchParams>(&init)? {
            for (key, value) in other.borrow().pairs() {
                params.push(key, value);
            }
        } else if let Some(array) = init.as_array() {
            for pair in array.iter::<Value>() {
                let pair = pair?;
                let (key, value) = match pair.as_object() {
                    Some(pair) => (pair.get::<_, Value>(0)?, pair.get::<_, Value>(1)?),
                    None => continue,
                };
                params.push(coerce(&ctx, key)?, coerce(&ctx, value)?);
            }
        } else if let Some(obj) = init.as_object() {
            for key in obj.keys::<String>() {
                let key = key?;
                let value: Value = obj.get(&key)?;
                params.push(key, coerce(&ctx, value)?);
            }
        }

        Ok(params)
    }

    #[qjs(get)]
    pub fn size(&self) -> usize {
        self.entries.borrow().iter().map(|(_, values)| values.len()).sum()
    }

    pub fn append(&self, name: Coerced<String>, value: Coerced<String>) {
        self.push(name.0, value.0);
    }

    pub fn delete(&self, name: Coerced<String>) {
        self.entries.borrow_mut().retain(|(key, _)| *key != name.0);
    }

    pub fn get(&self, name: Coerced<String>) -> Option<String> {
        self.entries
            .borrow()
            .iter()
            .find(|(key, _)| *key == name.0)
            .and_then(|(_, values)| values.first().cloned())
    }

    pub fn get_all(&self, name: Coerced<String>) -> Vec<String> {
        self.entries
            .borrow()
            .iter()
            .find(|(key, _)| *key == name.0)
            .map(|(_, values)| values.clone())
            .unwrap_or_default()
    }

    pub fn has(&self, name: Coerced<String>) -> bool {
        self.entries.borrow().iter().any(|(key, _)| *key == name.0)
    }

    pub fn set(&self, name: Coerced<String>, value: Coerced<String>) {
        let mut entries = self.entries.borrow_mut();
        match entries.iter_mut().find(|(key, _)| *key == name.0) {
            Some((_, values)) => *values = vec![value.0],
            None => entries.push((name.0, vec![value.0])),
        }
    }

    /// Orders keys with `String.prototype.localeCompare`. Values keep their
    /// relative order and equal keys stay where they were.
    pub fn sort(&self, ctx: Ctx<'js>) -> Result<()> {
        let locale_compare = BasePrimordials::get(&ctx)?
            .function_string_locale_compare
            .clone();
        let mut entries = self.entries.borrow().clone();

        // Insertion sort, since the comparison can fail.
        for index in 1..entries.len() {
            let mut current = index;
            while current > 0 {
                let order: f64 = locale_compare.call((
                    This(entries[current - 1].0.clone()),
                    entries[current].0.clone(),
                ))?;
                if order <= 0.0 {
                    break;
                }
                entries.swap(current - 1, current);
                current -= 1;
            }
        }

        *self.entries.borrow_mut() = entries;
        Ok(())
    }

    pub fn for_each(
        this: This<Class<'js, Self>>,
        ctx: Ctx<'js>,
        callback: Function<'js>,
        this_arg: Opt<Value<'js>>,
    ) -> Result<()> {
        let this_arg = this_arg
            .0
            .unwrap_or_else(|| Value::new_undefined(ctx.clone()));
        let pairs = this.borrow().pairs();
        for (key, value) in pairs {
            () = callback.call((This(this_arg.clone()), value, key, this.0.clone()))?;
        }
        Ok(())
    }

    pub fn keys(&self, ctx: Ctx<'js>) -> Result<Class<'js, URLSearchParamsIter>> {
        self.iter(ctx, IterKind::Keys)
    }

    pub fn values(&self, ctx: Ctx<'js>) -> Result<Class<'js, URLSearchParamsIter>> {
        self.iter(ctx, IterKind::Values)
    }

    pub fn entries(&self, ctx: Ctx<'js>) -> Result<Class<'js, URLSearchParamsIter>> {
        self.iter(ctx, IterKind::Entries)
    }

    #[qjs(rename = PredefinedAtom::SymbolIterator)]
    pub fn iterator(&self, ctx: Ctx<'js>) -> Result<Class<'js, URLSearchParamsIter>> {
        self.iter(ctx, IterKind::Entries)
    }

    #[qjs(rename = PredefinedAtom::ToString)]
    pub fn to_string(&self) -> String {
        self.to_query_string()
    }

    #[qjs(get, rename = PredefinedAtom::SymbolToStringTag)]
    pub fn to_string_tag(&self) -> &'static str {
        stringify!(URLSearchParams)
    }
}

impl URLSearchParams {
    pub fn from_query(query: &str) -> std::result::Result<Self, MalformedUri> {
        let params = Self::default();
        params.parse_query(query)?;
        Ok(params)
    }

    pub fn to_query_string(&self) -> String {
        self.pairs()
            .iter()
            .map(|(key, value)| {
                [
                    utf8_percent_encode(key, URI_COMPONENT).to_string(),
                    utf8_percent_encode(value, URI_COMPONENT).to_string(),
                ]
                .join("=")
            })
            .collect::<Vec<_>>()
            .join("&")
    }

    pub fn pairs(&self) -> Vec<(String, String)> {
        self.entries
            .borrow()
            .iter()
            .flat_map(|(key, values)| values.iter().map(move |value| (key.clone(), value.clone())))
            .collect()
    }

    fn push(&self, key: String, value: String) {
        let mut entries = self.entries.borrow_mut();
        match entries.iter_mut().find(|(k, _)| *k == key) {
            Some((_, values)) => values.push(value),
            None => entries.push((key, vec![value])),
        }
    }

    fn parse_query(&self, query: &str) -> std::result::Result<(), MalformedUri> {
        let query = query.strip_prefix('?').unwrap_or(query);
        if query.is_empty() {
            return Ok(());
        }
        for pair in query.split('&') {
            let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
            self.push(decode_component(key)?, decode_component(value)?);
        }
        Ok(())
    }

    fn iter<'js>(&self, ctx: Ctx<'js>, kind: IterKind) -> Result<Class<'js, URLSearchParamsIter>> {
        Class::instance(
            ctx,
            URLSearchParamsIter {
                entries: Rc::clone(&self.entries),
                kind,
                key_index: 0,
                value_index: 0,
            },
        )
    }
}

/// `decodeURIComponent` after turning `+` into a space.
pub fn decode_component(component: &str) -> std::result::Result<String, MalformedUri> {
    let component = component.replace('+', " ");
    let bytes = component.as_bytes();
    let mut idx = 0;
    while idx < bytes.len() {
        if bytes[idx] == b'%' {
            let escape = bytes.get(idx + 1..idx + 3).ok_or(MalformedUri)?;
            if !escape.iter().all(u8::is_ascii_hexdigit) {
                return Err(MalformedUri);
            }
            idx += 3;
        } else {
            idx += 1;
        }
    }
    percent_decode_str(&component)
        .decode_utf8()
        .map(|decoded| decoded.into_owned())
        .map_err(|_| MalformedUri)
}

fn coerce<'js>(ctx: &Ctx<'js>, value: Value<'js>) -> Result<String> {
    Ok(Coerced::<String>::from_js(ctx, value)?.0)
}

fn throw_uri_error<T>(ctx: &Ctx<'_>, err: MalformedUri) -> Result<T> {
    let constructor = BasePrimordials::get(ctx)?.constructor_uri_error.clone();
    let error: Value = constructor.construct((err.to_string(),))?;
    Err(ctx.throw(error))
}

#[derive(Clone, Copy)]
enum IterKind {
    Keys,
    Values,
    Entries,
}

/// Lazy iterator reading the live parameter list on every `next()`.
#[derive(Trace, rquickjs::JsLifetime)]
#[rquickjs::class]
pub struct URLSearchParamsIter {
    #[qjs(skip_trace)]
    entries: ParamList,
    #[qjs(skip_trace)]
    kind: IterKind,
    #[qjs(skip_trace)]
    key_index: usize,
    #[qjs(skip_trace)]
    value_index: usize,
}

#[rquickjs::methods]
impl<'js> URLSearchParamsIter {
    pub fn next(&mut self, ctx: Ctx<'js>) -> Result<Object<'js>> {
        let result = Object::new(ctx.clone())?;
        match self.advance() {
            Some((key, value)) => {
                match self.kind {
                    IterKind::Keys => result.set("value", key)?,
                    IterKind::Values => result.set("value", value)?,
                    IterKind::Entries => {
                        let entry = Array::new(ctx)?;
                        entry.set(0, key)?;
                        entry.set(1, value)?;
                        result.set("value", entry)?;
                    },
                }
                result.set("done", false)?;
            },
            None => {
                result.set("done", true)?;
            },
        }
        Ok(result)
    }

    #[qjs(rename = PredefinedAtom::SymbolIterator)]
    pub fn iterator(this: This<Class<'js, Self>>) -> Class<'js, Self> {
        this.0
    }
}

impl URLSearchParamsIter {
    fn advance(&mut self) -> Option<(String, String)> {
        let entries = self.entries.borrow();
        if let IterKind::Keys = self.kind {
            let (key, _) = entries.get(self.key_index)?;
            self.key_index += 1;
            return Some((key.clone(), String::new()));
        }
        loop {
            let (key, values) = entries.get(self.key_index)?;
            if let Some(value) = values.get(self.value_index) {
                self.value_index += 1;
                return Some((key.clone(), value.clone()));
            }
            self.key_index += 1;
            self.value_index = 0;
        }
    }
}
