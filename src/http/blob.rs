// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0
use rquickjs::{
    atom::PredefinedAtom,
    function::{Opt, This},
    Array, Class, Coerced, Ctx, FromJs, Function, Object, Result, Value,
};

use crate::utils::{
    class::get_class,
    object::{bytes_from_array, get_bytes, latin1_decode},
    result::ResultExt,
};

/// Methods a value must expose to be treated as a platform blob.
pub const BLOB_CAPABILITIES: [&str; 12] = [
    "copyBlob",
    "getAs",
    "getBytes",
    "getContentType",
    "getDataAsString",
    "getName",
    "isHostType",
    "setBytes",
    "setContentType",
    "setContentTypeFromExtension",
    "setDataFromString",
    "setName",
];

const EXTENSION_TYPES: &[(&str, &str)] = &[
    ("bin", "application/octet-stream"),
    ("css", "text/css"),
    ("csv", "text/csv"),
    ("gif", "image/gif"),
    ("htm", "text/html"),
    ("html", "text/html"),
    ("jpeg", "image/jpeg"),
    ("jpg", "image/jpeg"),
    ("js", "application/javascript"),
    ("json", "application/json"),
    ("pdf", "application/pdf"),
    ("png", "image/png"),
    ("svg", "image/svg+xml"),
    ("txt", "text/plain"),
    ("xml", "application/xml"),
    ("zip", "application/zip"),
];

/// The host's binary value: bytes plus an optional content type and name.
#[derive(Clone, Debug, Default)]
#[rquickjs::class]
#[derive(rquickjs::class::Trace, rquickjs::JsLifetime)]
pub struct Blob {
    #[qjs(skip_trace)]
    data: Vec<u8>,
    #[qjs(skip_trace)]
    content_type: Option<String>,
    #[qjs(skip_trace)]
    name: Option<String>,
}

#[rquickjs::methods(rename_all = "camelCase")]
impl<'js> Blob {
    #[qjs(constructor)]
    pub fn new(
        ctx: Ctx<'js>,
        data: Opt<Value<'js>>,
        content_type: Opt<Value<'js>>,
        name: Opt<Value<'js>>,
    ) -> Result<Self> {
        let data = match data.0 {
            Some(data) if !data.is_undefined() && !data.is_null() => get_bytes(&ctx, data)?,
            _ => Vec::new(),
        };
        Ok(Self {
            data,
            content_type: optional_string(&ctx, content_type.0)?,
            name: optional_string(&ctx, name.0)?,
        })
    }

    pub fn copy_blob(&self) -> Self {
        self.clone()
    }

    pub fn get_as(&self, content_type: Coerced<String>) -> Self {
        Self {
            content_type: Some(content_type.0),
            ..self.clone()
        }
    }

    /// Bytes as signed numbers in `-128..=127`.
    pub fn get_bytes(&self) -> Vec<i8> {
        self.data.iter().map(|&byte| byte as i8).collect()
    }

    pub fn get_content_type(&self) -> Option<String> {
        self.content_type.clone()
    }

    pub fn get_data_as_string(&self, charset: Opt<String>) -> String {
        match charset.0 {
            Some(charset) if is_latin1(&charset) => latin1_decode(&self.data),
            _ => String::from_utf8_lossy(&self.data).into_owned(),
        }
    }

    pub fn get_name(&self) -> Option<String> {
        self.name.clone()
    }

    pub fn is_host_type(&self) -> bool {
        false
    }

    pub fn set_bytes(
        ctx: Ctx<'js>,
        this: This<Class<'js, Self>>,
        bytes: Value<'js>,
    ) -> Result<Class<'js, Self>> {
        let bytes = get_bytes(&ctx, bytes)?;
        this.borrow_mut().data = bytes;
        Ok(this.0)
    }

    pub fn set_content_type(
        this: This<Class<'js, Self>>,
        content_type: Coerced<String>,
    ) -> Class<'js, Self> {
        this.borrow_mut().content_type = Some(content_type.0);
        this.0
    }

    pub fn set_content_type_from_extension(
        ctx: Ctx<'js>,
        this: This<Class<'js, Self>>,
    ) -> Result<Class<'js, Self>> {
        let content_type = {
            let blob = this.borrow();
            let name = blob.name.as_deref().unwrap_or_default();
            content_type_for_name(name)
                .or_throw_msg(&ctx, &format!("Unable to determine content type of \"{name}\""))?
        };
        this.borrow_mut().content_type = Some(content_type.to_string());
        Ok(this.0)
    }

    pub fn set_data_from_string(
        this: This<Class<'js, Self>>,
        data: Coerced<String>,
        charset: Opt<String>,
    ) -> Class<'js, Self> {
        let bytes = match charset.0 {
            Some(charset) if is_latin1(&charset) => latin1_encode(&data),
            _ => data.0.into_bytes(),
        };
        this.borrow_mut().data = bytes;
        this.0
    }

    pub fn set_name(this: This<Class<'js, Self>>, name: Coerced<String>) -> Class<'js, Self> {
        this.borrow_mut().name = Some(name.0);
        this.0
    }

    #[qjs(rename = PredefinedAtom::ToString)]
    pub fn to_string(&self) -> &'static str {
        stringify!(Blob)
    }
}

impl Blob {
    pub fn new_with(data: Vec<u8>, content_type: Option<String>, name: Option<String>) -> Self {
        Self {
            data,
            content_type,
            name,
        }
    }
}

/// Structural capability test for platform blobs.
///
/// Any object whose `toString()` is `"Blob"` and which exposes every
/// method in [`BLOB_CAPABILITIES`] qualifies, native or not.
pub fn is_platform_blob<'js>(ctx: &Ctx<'js>, value: &Value<'js>) -> Result<bool> {
    let Some(obj) = value.as_object() else {
        return Ok(false);
    };
    if obj.instance_of::<Blob>() {
        return Ok(true);
    }
    let to_string: Value = obj.get(PredefinedAtom::ToString)?;
    let Some(to_string) = to_string.as_function() else {
        return Ok(false);
    };
    let tag: Value = to_string.call((This(obj.clone()),))?;
    if Coerced::<String>::from_js(ctx, tag)?.0 != "Blob" {
        return Ok(false);
    }
    for capability in BLOB_CAPABILITIES {
        let method: Value = obj.get(capability)?;
        if !method.is_function() {
            return Ok(false);
        }
    }
    Ok(true)
}

fn call_blob<'js, T: FromJs<'js>>(blob: &Object<'js>, method: &str) -> Result<T> {
    let function: Function = blob.get(method)?;
    function.call((This(blob.clone()),))
}

/// Raw bytes of a platform blob.
pub fn blob_bytes<'js>(blob: &Object<'js>) -> Result<Vec<u8>> {
    if let Some(own) = get_class::<Blob>(&blob.clone().into_value())? {
        return Ok(own.borrow().data.clone());
    }
    let bytes: Array = call_blob(blob, "getBytes")?;
    bytes_from_array(&bytes)
}

pub fn blob_text<'js>(blob: &Object<'js>) -> Result<String> {
    call_blob(blob, "getDataAsString")
}

pub fn copy_blob<'js>(ctx: &Ctx<'js>, blob: &Object<'js>) -> Result<Object<'js>> {
    if let Some(own) = get_class::<Blob>(&blob.clone().into_value())? {
        let copy = own.borrow().copy_blob();
        return new_blob_object(ctx, copy);
    }
    call_blob(blob, "copyBlob")
}

pub fn new_blob_object<'js>(ctx: &Ctx<'js>, blob: Blob) -> Result<Object<'js>> {
    Class::instance(ctx.clone(), blob)?
        .into_value()
        .into_object()
        .or_throw(ctx)
}

fn optional_string<'js>(ctx: &Ctx<'js>, value: Option<Value<'js>>) -> Result<Option<String>> {
    match value {
        Some(value) if !value.is_undefined() && !value.is_null() => {
            Ok(Some(Coerced::<String>::from_js(ctx, value)?.0))
        },
        _ => Ok(None),
    }
}

fn is_latin1(charset: &str) -> bool {
    charset.eq_ignore_ascii_case("latin1") || charset.eq_ignore_ascii_case("iso-8859-1")
}

fn latin1_encode(data: &str) -> Vec<u8> {
    data.chars()
        .map(|ch| u8::try_from(u32::from(ch)).unwrap_or(b'?'))
        .collect()
}

fn content_type_for_name(name: &str) -> Option<&'static str> {
    let (_, extension) = name.rsplit_once('.')?;
    let extension = extension.to_ascii_lowercase();
    EXTENSION_TYPES
        .iter()
        .find(|(ext, _)| *ext == extension)
        .map(|(_, content_type)| *content_type)
}

#[cfg(test)]
mod tests {
    use rquickjs::CatchResultExt;

    use super::*;
    use crate::test_utils::{test_sync_with, MockHost};

    #[test]
    fn extension_lookup() {
        assert_eq!(content_type_for_name("report.PDF"), Some("application/pdf"));
        assert_eq!(content_type_for_name("a.tar.json"), Some("application/json"));
        assert_eq!(content_type_for_name("README"), None);
        assert_eq!(content_type_for_name("file.unknown"), None);
    }

    #[test]
    fn latin1_encoding_replaces_wide_chars() {
        assert_eq!(latin1_encode("a\u{e9}\u{2713}"), vec![b'a', 0xe9, b'?']);
    }

    #[tokio::test]
    async fn capabilities() {
        test_sync_with(|ctx| {
            crate::install(&ctx, MockHost::new())?;
            let result = ctx
                .eval::<String, _>(
                    r#"
                const blob = new Blob([104, 105, 255], "text/plain", "notes.txt");
                const copy = blob.copyBlob().setDataFromString("changed");
                const json = blob.getAs("application/json");
                const renamed = new Blob("x").setName("image.png").setContentTypeFromExtension();
                [
                    String(blob),
                    blob.getBytes().join(","),
                    blob.getContentType(),
                    blob.getName(),
                    blob.getDataAsString("latin1"),
                    copy.getDataAsString(),
                    json.getContentType(),
                    blob.getContentType(),
                    renamed.getContentType(),
                    blob.isHostType(),
                ].join("|")
            "#,
                )
                .catch(&ctx)
                .unwrap();
            assert_eq!(
                result,
                "Blob|104,105,-1|text/plain|notes.txt|hi\u{ff}|changed|application/json|text/plain|image/png|false"
            );
            Ok(())
        })
        .await
    }

    #[tokio::test]
    async fn unknown_extension_throws() {
        test_sync_with(|ctx| {
            crate::install(&ctx, MockHost::new())?;
            let result = ctx
                .eval::<String, _>(
                    r#"
                let message;
                try { new Blob("x", null, "data.xyz").setContentTypeFromExtension(); } catch (e) { message = e.message; }
                message
            "#,
                )
                .catch(&ctx)
                .unwrap();
            assert_eq!(result, "Unable to determine content type of \"data.xyz\"");
            Ok(())
        })
        .await
    }

    #[tokio::test]
    async fn structural_detection() {
        test_sync_with(|ctx| {
            crate::install(&ctx, MockHost::new())?;
            let native: Value = ctx.eval("new Blob('a')").catch(&ctx).unwrap();
            let foreign: Value = ctx
                .eval(
                    r#"
                const foreign = { toString: () => "Blob" };
                for (const name of ["copyBlob", "getAs", "getBytes", "getContentType", "getDataAsString", "getName",
                    "isHostType", "setBytes", "setContentType", "setContentTypeFromExtension", "setDataFromString", "setName"]) {
                    foreign[name] = () => foreign;
                }
                foreign
            "#,
                )
                .catch(&ctx)
                .unwrap();
            let partial: Value = ctx
                .eval(r#"({ toString: () => "Blob", getBytes: () => [] })"#)
                .catch(&ctx)
                .unwrap();
            let plain: Value = ctx.eval("({})").catch(&ctx).unwrap();

            assert!(is_platform_blob(&ctx, &native)?);
            assert!(is_platform_blob(&ctx, &foreign)?);
            assert!(!is_platform_blob(&ctx, &partial)?);
            assert!(!is_platform_blob(&ctx, &plain)?);
            Ok(())
        })
        .await
    }
}
