// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0
use rquickjs::{
    atom::PredefinedAtom, class::Trace, function::Opt, Class, Coerced, Ctx, FromJs, Result, Value,
};

use crate::utils::{class::get_class, object::is_truthy, result::ResultExt};

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum UrlError {
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),
    #[error("Invalid base URL: {0}")]
    InvalidBase(String),
}

/// Absolute `http:`/`https:` URL, immutable once built.
///
/// Only the grammar `protocol "//" hostname [":" port] [path] [query]
/// [fragment]` is accepted. Relative inputs are resolved lexically against a
/// base before matching.
#[derive(Clone, Debug, PartialEq, Trace, rquickjs::JsLifetime)]
#[rquickjs::class]
pub struct URL {
    #[qjs(skip_trace)]
    href: String,
    #[qjs(skip_trace)]
    protocol: String,
    #[qjs(skip_trace)]
    hostname: String,
    #[qjs(skip_trace)]
    port: String,
    #[qjs(skip_trace)]
    pathname: String,
    #[qjs(skip_trace)]
    search: String,
    #[qjs(skip_trace)]
    hash: String,
}

#[rquickjs::methods(rename_all = "camelCase")]
impl<'js> URL {
    #[qjs(constructor)]
    pub fn new(ctx: Ctx<'js>, input: Value<'js>, base: Opt<Value<'js>>) -> Result<Self> {
        let input = url_input_string(&ctx, input)?;
        let base = base_string(&ctx, base.0)?;
        Self::parse_with_base(&input, base.as_deref()).map_err_type(&ctx)
    }

    #[qjs(static, rename = "parse")]
    pub fn parse_static(
        ctx: Ctx<'js>,
        input: Value<'js>,
        base: Opt<Value<'js>>,
    ) -> Result<Value<'js>> {
        let input = url_input_string(&ctx, input)?;
        let base = base_string(&ctx, base.0)?;
        match Self::parse_with_base(&input, base.as_deref()) {
            Ok(url) => Ok(Class::instance(ctx, url)?.into_value()),
            Err(_) => Ok(Value::new_null(ctx)),
        }
    }

    #[qjs(static)]
    pub fn can_parse(ctx: Ctx<'js>, input: Value<'js>, base: Opt<Value<'js>>) -> Result<bool> {
        let input = url_input_string(&ctx, input)?;
        let base = base_string(&ctx, base.0)?;
        Ok(Self::parse_with_base(&input, base.as_deref()).is_ok())
    }

    #[qjs(get)]
    pub fn href(&self) -> String {
        self.href.clone()
    }

    #[qjs(get)]
    pub fn protocol(&self) -> String {
        self.protocol.clone()
    }

    #[qjs(get)]
    pub fn hostname(&self) -> String {
        self.hostname.clone()
    }

    #[qjs(get)]
    pub fn port(&self) -> String {
        self.port.clone()
    }

    #[qjs(get)]
    pub fn pathname(&self) -> String {
        self.pathname.clone()
    }

    #[qjs(get)]
    pub fn search(&self) -> String {
        self.search.clone()
    }

    #[qjs(get)]
    pub fn hash(&self) -> String {
        self.hash.clone()
    }

    #[qjs(get)]
    pub fn origin(&self) -> String {
        if self.port.is_empty() {
            [self.protocol.as_str(), "//", self.hostname.as_str()].concat()
        } else {
            [
                self.protocol.as_str(),
                "//",
                self.hostname.as_str(),
                ":",
                self.port.as_str(),
            ]
            .concat()
        }
    }

    #[qjs(rename = PredefinedAtom::ToString)]
    pub fn to_string(&self) -> String {
        self.href.clone()
    }

    #[qjs(rename = "toJSON")]
    pub fn to_json(&self) -> String {
        self.href.clone()
    }

    #[qjs(get, rename = PredefinedAtom::SymbolToStringTag)]
    pub fn to_string_tag(&self) -> &'static str {
        stringify!(URL)
    }
}

impl URL {
    pub fn parse_with_base(input: &str, base: Option<&str>) -> std::result::Result<Self, UrlError> {
        match base {
            Some(base) => {
                let resolved = resolve_relative(input, base)?;
                Self::parse(&resolved)
            },
            None => Self::parse(input),
        }
    }

    pub fn parse(href: &str) -> std::result::Result<Self, UrlError> {
        parse_href(href).ok_or_else(|| UrlError::InvalidUrl(href.to_string()))
    }

    pub fn as_href(&self) -> &str {
        &self.href
    }

    fn base_directory(&self) -> &str {
        match self.pathname.rfind('/') {
            Some(idx) => &self.pathname[..=idx],
            None => "/",
        }
    }
}

fn url_input_string<'js>(ctx: &Ctx<'js>, input: Value<'js>) -> Result<String> {
    if let Some(url) = get_class::<URL>(&input)? {
        return Ok(url.borrow().href.clone());
    }
    Ok(Coerced::<String>::from_js(ctx, input)?.0)
}

fn base_string<'js>(ctx: &Ctx<'js>, base: Option<Value<'js>>) -> Result<Option<String>> {
    match base {
        Some(base) if is_truthy(ctx, &base)? => Ok(Some(url_input_string(ctx, base)?)),
        _ => Ok(None),
    }
}

fn resolve_relative(input: &str, base: &str) -> std::result::Result<String, UrlError> {
    let base_url = URL::parse(base).map_err(|_| UrlError::InvalidBase(base.to_string()))?;
    let origin = base_url.origin();
    if input.starts_with('/') {
        return Ok([origin.as_str(), input].concat());
    }
    let path = [base_url.base_directory(), input].concat();
    Ok([origin.as_str(), &normalize_path(&path)].concat())
}

/// Collapses `.` and `..` segments of an absolute path. Query and fragment
/// are carried over untouched.
fn normalize_path(path: &str) -> String {
    let split_at = path.find(['?', '#']).unwrap_or(path.len());
    let (path, rest) = path.split_at(split_at);

    let mut segments: Vec<&str> = Vec::new();
    for segment in path.split('/') {
        match segment {
            ".." => {
                segments.pop();
            },
            "." | "" => {},
            segment => segments.push(segment),
        }
    }

    let last = path.rsplit('/').next().unwrap_or_default();
    let trailing_slash = !segments.is_empty() && matches!(last, "" | "." | "..");

    let mut normalized = String::with_capacity(path.len() + rest.len() + 1);
    normalized.push('/');
    normalized.push_str(&segments.join("/"));
    if trailing_slash {
        normalized.push('/');
    }
    normalized.push_str(rest);
    normalized
}

fn parse_href(href: &str) -> Option<URL> {
    let (protocol, rest) = if let Some(rest) = href.strip_prefix("https://") {
        ("https:", rest)
    } else if let Some(rest) = href.strip_prefix("http://") {
        ("http:", rest)
    } else {
        return None;
    };

    let host_end = rest.find(['/', ':', '?', '#']).unwrap_or(rest.len());
    let (hostname, mut rest) = rest.split_at(host_end);
    if hostname.is_empty() {
        return None;
    }

    let mut port = "";
    if let Some(after_colon) = rest.strip_prefix(':') {
        let digits_end = after_colon
            .find(|c: char| !c.is_ascii_digit())
            .unwrap_or(after_colon.len());
        if digits_end == 0 {
            return None;
        }
        port = &after_colon[..digits_end];
        rest = &after_colon[digits_end..];
    }

    let mut pathname = "/";
    if rest.starts_with('/') {
        let path_end = rest.find(['?', '#']).unwrap_or(rest.len());
        pathname = &rest[..path_end];
        rest = &rest[path_end..];
    }

    let mut search = "";
    if rest.starts_with('?') {
        let search_end = rest.find('#').unwrap_or(rest.len());
        search = &rest[..search_end];
        rest = &rest[search_end..];
    }

    let hash = rest;
    if !(hash.is_empty() || hash.starts_with('#')) {
        return None;
    }
    if hash.contains(['\n', '\r', '\u{2028}', '\u{2029}']) {
        return None;
    }

    Some(URL {
        href: href.to_string(),
        protocol: protocol.to_string(),
        hostname: hostname.to_string(),
        port: port.to_string(),
        pathname: pathname.to_string(),
        search: search.to_string(),
        hash: hash.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use rquickjs::CatchResultExt;

    use super::*;
    use crate::test_utils::{test_sync_with, MockHost};

    #[test]
    fn parses_components() {
        let url = URL::parse("https://example.com:8080/a/b?x=1#frag").unwrap();
        assert_eq!(url.protocol, "https:");
        assert_eq!(url.hostname, "example.com");
        assert_eq!(url.port, "8080");
        assert_eq!(url.pathname, "/a/b");
        assert_eq!(url.search, "?x=1");
        assert_eq!(url.hash, "#frag");
        assert_eq!(url.origin(), "https://example.com:8080");
    }

    #[test]
    fn pathname_defaults_to_root() {
        let url = URL::parse("http://h").unwrap();
        assert_eq!(url.pathname, "/");
        assert_eq!(url.port, "");
        assert_eq!(url.search, "");
        assert_eq!(url.origin(), "http://h");

        let url = URL::parse("http://h?q#f").unwrap();
        assert_eq!(url.pathname, "/");
        assert_eq!(url.search, "?q");
        assert_eq!(url.hash, "#f");
    }

    #[test]
    fn href_is_preserved() {
        for href in [
            "https://h/",
            "http://example.com:80/path/to?a=b&c=d#x",
            "https://h/a//b/./c",
            "http://h#only-hash",
        ] {
            assert_eq!(URL::parse(href).unwrap().href, href);
        }
    }

    #[test]
    fn rejects_outside_grammar() {
        for href in [
            "ftp://h/",
            "https:/h",
            "https://",
            "https://h:/",
            "https://h:80x/",
            "//h/",
            "HTTPS://h/",
            "https://h/#a\nb",
        ] {
            assert_eq!(
                URL::parse(href),
                Err(UrlError::InvalidUrl(href.to_string())),
                "{href}"
            );
        }
    }

    #[test]
    fn resolves_against_base() {
        let resolve = |input, base| URL::parse_with_base(input, Some(base)).unwrap().href;
        assert_eq!(resolve("/a/b", "https://h/x/y"), "https://h/a/b");
        assert_eq!(resolve("c", "https://h/x/y"), "https://h/x/c");
        assert_eq!(resolve("../c", "https://h/x/y/z"), "https://h/x/c");
        assert_eq!(resolve("./c/./d", "https://h:81/x/"), "https://h:81/x/c/d");
        assert_eq!(resolve("../../../c", "https://h/x/y"), "https://h/c");
        assert_eq!(resolve("c/?q=../a", "https://h/x/y"), "https://h/x/c/?q=../a");
        assert_eq!(resolve("c#f", "http://h/"), "http://h/c#f");
    }

    #[test]
    fn invalid_base_is_reported() {
        assert_eq!(
            URL::parse_with_base("a", Some("not a url")),
            Err(UrlError::InvalidBase("not a url".into()))
        );
        assert_eq!(
            UrlError::InvalidBase("x".into()).to_string(),
            "Invalid base URL: x"
        );
    }

    #[tokio::test]
    async fn url_class() {
        test_sync_with(|ctx| {
            crate::install(&ctx, MockHost::new())?;
            let result = ctx
                .eval::<String, _>(
                    r#"
                const url = new URL("c?x=1", "https://h:8443/x/y");
                const copy = new URL(url);
                [url.href, url.origin, url.port, url.pathname, url.search, String(copy), JSON.stringify({ url })].join("|")
            "#,
                )
                .catch(&ctx)
                .unwrap();
            assert_eq!(
                result,
                r#"https://h:8443/x/c?x=1|https://h:8443|8443|/x/c|?x=1|https://h:8443/x/c?x=1|{"url":"https://h:8443/x/c?x=1"}"#
            );
            Ok(())
        })
        .await
    }

    #[tokio::test]
    async fn url_errors() {
        test_sync_with(|ctx| {
            crate::install(&ctx, MockHost::new())?;
            let result = ctx
                .eval::<String, _>(
                    r#"
                const messages = [];
                try { new URL("nope"); } catch (e) { messages.push(`${e.name}: ${e.message}`); }
                try { new URL("a", "bad"); } catch (e) { messages.push(`${e.name}: ${e.message}`); }
                messages.push(URL.parse("nope") === null, URL.canParse("/a/b", "https://h/x/y"));
                messages.push(URL.parse("/a/b", "https://h/x/y").href);
                messages.join("|")
            "#,
                )
                .catch(&ctx)
                .unwrap();
            assert_eq!(
                result,
                "TypeError: Invalid URL: nope|TypeError: Invalid base URL: bad|true|true|https://h/a/b"
            );
            Ok(())
        })
        .await
    }
}
