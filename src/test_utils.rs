// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0
use std::{
    collections::VecDeque,
    sync::{Arc, Mutex},
};

use rquickjs::{
    async_with,
    loader::{BuiltinResolver, ModuleLoader},
    markers::ParallelSend,
    module::{Evaluated, ModuleDef},
    AsyncContext, AsyncRuntime, CatchResultExt, Ctx, Module, Result,
};

use crate::{
    host::{HostError, HostHttp, HostRequest, HostResponse},
    FetchModule, MODULE_NAME,
};

pub async fn given_runtime() -> (AsyncRuntime, AsyncContext) {
    let rt = AsyncRuntime::new().unwrap();
    rt.set_loader(
        (BuiltinResolver::default().with_module(MODULE_NAME),),
        (ModuleLoader::default().with_module(MODULE_NAME, FetchModule),),
    )
    .await;
    let ctx = AsyncContext::full(&rt).await.unwrap();

    (rt, ctx)
}

pub async fn test_async_with<F>(func: F)
where
    F: for<'js> FnOnce(Ctx<'js>) -> std::pin::Pin<Box<dyn std::future::Future<Output = ()> + 'js>>
        + Send,
{
    let (_rt, ctx) = given_runtime().await;

    async_with!(ctx => |ctx| {
        func(ctx).await
    })
    .await;
}

pub async fn test_sync_with<F>(func: F)
where
    F: for<'js> FnOnce(Ctx<'js>) -> Result<()> + ParallelSend,
{
    let (_rt, ctx) = given_runtime().await;

    ctx.with(|ctx| func(ctx.clone()).catch(&ctx).unwrap()).await;
}

pub async fn eval_module<'js, M>(ctx: Ctx<'js>, name: &str) -> Result<Module<'js, Evaluated>>
where
    M: ModuleDef,
{
    let (module, module_eval) = Module::evaluate_def::<M, _>(ctx, name)?;
    module_eval.into_future::<()>().await?;
    Ok(module)
}

/// Host double that replays queued outcomes and records every call.
///
/// With nothing queued it answers `200` with an empty body.
#[derive(Default)]
pub struct MockHost {
    outcomes: Mutex<VecDeque<std::result::Result<HostResponse, HostError>>>,
    calls: Mutex<Vec<(String, HostRequest)>>,
}

impl MockHost {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn respond(&self, response: HostResponse) {
        self.outcomes.lock().unwrap().push_back(Ok(response));
    }

    pub fn fail(&self, error: HostError) {
        self.outcomes.lock().unwrap().push_back(Err(error));
    }

    pub fn calls(&self) -> Vec<(String, HostRequest)> {
        self.calls.lock().unwrap().clone()
    }
}

impl HostHttp for MockHost {
    fn fetch(
        &self,
        url: &str,
        request: &HostRequest,
    ) -> std::result::Result<HostResponse, HostError> {
        self.calls
            .lock()
            .unwrap()
            .push((url.to_string(), request.clone()));
        self.outcomes
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(HostResponse::new(200)))
    }
}
