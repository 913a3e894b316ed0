// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0
use rquickjs::{Class, Object, Result};

pub use self::{abort_controller::AbortController, abort_signal::AbortSignal};

mod abort_controller;
mod abort_signal;

pub fn init(exports: &Object<'_>) -> Result<()> {
    Class::<AbortController>::define(exports)?;
    Class::<AbortSignal>::define(exports)?;

    Ok(())
}
