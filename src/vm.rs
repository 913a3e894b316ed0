// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0
use std::{
    path::Path,
    process::exit,
    result::Result as StdResult,
    sync::Arc,
};

use rquickjs::{
    loader::{BuiltinResolver, FileResolver, ModuleLoader, ScriptLoader},
    prelude::{Func, Rest},
    AsyncContext, AsyncRuntime, CatchResultExt, CaughtError, Coerced, Ctx, Error, Module, Object,
    Result, Value,
};
use tracing::trace;

use crate::{
    host::{HostHandle, HostHttp},
    FetchModule, MODULE_NAME,
};

pub struct Vm {
    pub runtime: AsyncRuntime,
    pub ctx: AsyncContext,
}

#[derive(Debug)]
pub struct ErrorDetails {
    pub msg: String,
    pub r#type: String,
    pub stack: String,
}

impl Vm {
    /// Creates a runtime with the ponyfill installed on the global object and
    /// importable as `fetch-ponyfill`.
    pub async fn new(host: Arc<dyn HostHttp>) -> StdResult<Self, Box<dyn std::error::Error + Send + Sync>> {
        let resolver = (
            BuiltinResolver::default().with_module(MODULE_NAME),
            FileResolver::default().with_path("."),
        );
        let loader = (
            ModuleLoader::default().with_module(MODULE_NAME, FetchModule),
            ScriptLoader::default().with_extension("mjs"),
        );

        let runtime = AsyncRuntime::new()?;
        runtime.set_max_stack_size(512 * 1024).await;
        runtime.set_loader(resolver, loader).await;
        let ctx = AsyncContext::full(&runtime).await?;
        ctx.with(|ctx| {
            let _ = ctx.store_userdata(HostHandle(host.clone()));
            crate::install(&ctx, host)?;
            init_console(&ctx)?;
            Ok::<_, Error>(())
        })
        .await?;

        trace!("Initialized VM");
        Ok(Vm { runtime, ctx })
    }

    pub async fn run_file(&self, filename: &Path) {
        let name = filename.to_string_lossy().to_string();
        self.run_module(name, None).await
    }

    pub async fn run_source(&self, source: String) {
        self.run_module(String::from("eval.mjs"), Some(source)).await
    }

    async fn run_module(&self, name: String, source: Option<String>) {
        Self::run_and_handle_exceptions(&self.ctx, move |ctx| {
            let promise = match source {
                Some(source) => Module::declare(ctx.clone(), name, source)?.eval()?.1,
                None => Module::import(&ctx, name)?,
            };
            let module_ctx = ctx.clone();
            ctx.spawn(async move {
                if let Err(err) = promise.into_future::<Value>().await.catch(&module_ctx) {
                    Self::print_error_and_exit(&module_ctx, err);
                }
            });
            Ok(())
        })
        .await;
    }

    pub async fn run_and_handle_exceptions<F>(ctx: &AsyncContext, f: F)
    where
        F: for<'js> FnOnce(Ctx<'js>) -> Result<()> + Send,
    {
        ctx.with(|ctx| {
            f(ctx.clone())
                .catch(&ctx)
                .unwrap_or_else(|err| Self::print_error_and_exit(&ctx, err));
        })
        .await;
    }

    pub fn print_error_and_exit<'js>(ctx: &Ctx<'js>, err: CaughtError<'js>) -> ! {
        let ErrorDetails { msg, .. } = Self::error_details(ctx, &err);
        eprintln!("{}", msg);
        exit(1)
    }

    pub fn error_details<'js>(ctx: &Ctx<'js>, err: &CaughtError<'js>) -> ErrorDetails {
        let (mut err_stack, mut err_type): (String, String) =
            (String::default(), String::from("Error"));
        let error_msg = match err {
            CaughtError::Error(err) => format!("Error: {:?}", &err),
            CaughtError::Exception(ex) => {
                let error_name = ex
                    .get::<_, Coerced<String>>("name")
                    .map(|name| name.0)
                    .unwrap_or_else(|_| String::from("Error"));

                let mut str = String::with_capacity(100);
                str.push_str(&error_name);
                str.push_str(": ");
                str.push_str(&ex.message().unwrap_or_default());
                str.push('\n');
                err_type = error_name;
                if let Some(stack) = ex.stack() {
                    str.push_str(&stack);
                    err_stack = stack;
                }
                str
            },
            CaughtError::Value(value) => {
                let log_msg = format_values(ctx, Rest(vec![value.clone()]))
                    .unwrap_or(String::from("{unknown value}"));
                format!("Error: {}", &log_msg)
            },
        };
        ErrorDetails {
            msg: error_msg,
            r#type: err_type,
            stack: err_stack,
        }
    }

    pub async fn idle(self) -> StdResult<(), Box<dyn std::error::Error + Sync + Send>> {
        self.runtime.idle().await;

        drop(self.ctx);
        drop(self.runtime);
        Ok(())
    }
}

fn format_values<'js>(ctx: &Ctx<'js>, args: Rest<Value<'js>>) -> Result<String> {
    let mut parts = Vec::with_capacity(args.0.len());
    for value in args.0 {
        let part = if value.is_object() && !value.is_function() {
            ctx.json_stringify(value.clone())?
                .map(|json| json.to_string())
                .transpose()?
                .unwrap_or_else(|| String::from("undefined"))
        } else {
            value.get::<Coerced<String>>()?.0
        };
        parts.push(part);
    }
    Ok(parts.join(" "))
}

fn log<'js>(ctx: Ctx<'js>, args: Rest<Value<'js>>) -> Result<()> {
    println!("{}", format_values(&ctx, args)?);
    Ok(())
}

fn log_error<'js>(ctx: Ctx<'js>, args: Rest<Value<'js>>) -> Result<()> {
    eprintln!("{}", format_values(&ctx, args)?);
    Ok(())
}

/// Scripts run by the CLI only get `console.log` and `console.error`.
fn init_console(ctx: &Ctx<'_>) -> Result<()> {
    let console = Object::new(ctx.clone())?;
    console.set("log", Func::from(log))?;
    console.set("error", Func::from(log_error))?;
    ctx.globals().set("console", console)?;
    Ok(())
}
