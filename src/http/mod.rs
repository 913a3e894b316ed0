// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0
pub mod blob;
pub mod body;
pub mod fetch;
pub mod headers;
pub mod request;
pub mod response;
pub mod url;
pub mod url_search_params;

use std::sync::Arc;

use rquickjs::{Class, Ctx, Object, Result};

use crate::host::HostHttp;

use self::{
    blob::Blob, headers::Headers, request::Request, response::Response, url::URL,
    url_search_params::URLSearchParams,
};

pub fn init<'js>(ctx: &Ctx<'js>, exports: &Object<'js>, host: Arc<dyn HostHttp>) -> Result<()> {
    Class::<Headers>::define(exports)?;
    Class::<Request>::define(exports)?;
    Class::<Response>::define(exports)?;
    Class::<URL>::define(exports)?;
    Class::<URLSearchParams>::define(exports)?;
    Class::<Blob>::define(exports)?;

    exports.set("fetch", fetch::create(ctx, host)?)?;

    Ok(())
}
