// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0
use rquickjs::{
    atom::PredefinedAtom,
    class::{Trace, Tracer},
    prelude::{Opt, This},
    Class, Ctx, Function, JsLifetime, Object, Result, Undefined, Value,
};

use crate::exceptions::AbortError;

const ABORT_EVENT: &str = "abort";
const DEFAULT_ABORT_MESSAGE: &str = "This operation was aborted";

/// Cancellation flag observed by `fetch` before the host call is issued.
#[derive(Clone)]
#[rquickjs::class]
pub struct AbortSignal<'js> {
    aborted: bool,
    reason: Option<Value<'js>>,
    on_abort: Option<Function<'js>>,
    listeners: Vec<Function<'js>>,
}

unsafe impl<'js> JsLifetime<'js> for AbortSignal<'js> {
    type Changed<'to> = AbortSignal<'to>;
}

impl<'js> Trace<'js> for AbortSignal<'js> {
    fn trace<'a>(&self, tracer: Tracer<'a, 'js>) {
        if let Some(reason) = &self.reason {
            tracer.mark(reason);
        }
        if let Some(on_abort) = &self.on_abort {
            on_abort.trace(tracer);
        }
        for listener in &self.listeners {
            listener.trace(tracer);
        }
    }
}

#[rquickjs::methods(rename_all = "camelCase")]
impl<'js> AbortSignal<'js> {
    #[qjs(constructor)]
    pub fn new() -> Self {
        Self {
            aborted: false,
            reason: None,
            on_abort: None,
            listeners: Vec::new(),
        }
    }

    #[qjs(get)]
    pub fn aborted(&self) -> bool {
        self.aborted
    }

    #[qjs(get)]
    pub fn reason(&self) -> Option<Value<'js>> {
        self.reason.clone()
    }

    #[qjs(get, rename = "onabort")]
    pub fn get_on_abort(&self) -> Option<Function<'js>> {
        self.on_abort.clone()
    }

    #[qjs(set, rename = "onabort")]
    pub fn set_on_abort(&mut self, listener: Option<Function<'js>>) {
        self.on_abort = listener;
    }

    pub fn add_event_listener(&mut self, event_type: String, listener: Option<Function<'js>>) {
        let Some(listener) = listener else {
            return;
        };
        if event_type != ABORT_EVENT {
            return;
        }
        if !self
            .listeners
            .iter()
            .any(|existing| existing.as_value() == listener.as_value())
        {
            self.listeners.push(listener);
        }
    }

    pub fn remove_event_listener(&mut self, event_type: String, listener: Option<Function<'js>>) {
        let Some(listener) = listener else {
            return;
        };
        if event_type != ABORT_EVENT {
            return;
        }
        self.listeners
            .retain(|existing| existing.as_value() != listener.as_value());
    }

    pub fn throw_if_aborted(&self, ctx: Ctx<'js>) -> Result<()> {
        if self.aborted {
            return Err(ctx.throw(
                self.reason
                    .clone()
                    .unwrap_or_else(|| Undefined.into_value(ctx.clone())),
            ));
        }
        Ok(())
    }

    #[qjs(static)]
    pub fn abort(ctx: Ctx<'js>, reason: Opt<Value<'js>>) -> Result<Class<'js, Self>> {
        let instance = Class::instance(ctx.clone(), Self::new())?;
        Self::send_aborted(instance.clone(), &ctx, reason.0)?;
        Ok(instance)
    }

    #[qjs(get, rename = PredefinedAtom::SymbolToStringTag)]
    pub fn to_string_tag(&self) -> &'static str {
        stringify!(AbortSignal)
    }
}

impl<'js> AbortSignal<'js> {
    /// Marks the signal aborted and runs `onabort` followed by the
    /// registered listeners. A no-op once the signal is aborted.
    pub fn send_aborted(
        this: Class<'js, Self>,
        ctx: &Ctx<'js>,
        reason: Option<Value<'js>>,
    ) -> Result<()> {
        let mut borrow = this.borrow_mut();
        if borrow.aborted {
            return Ok(());
        }
        let reason = match reason {
            Some(reason) if !reason.is_undefined() => reason,
            _ => AbortError::new_value(ctx, DEFAULT_ABORT_MESSAGE)?,
        };
        borrow.aborted = true;
        borrow.reason = Some(reason);
        let callbacks: Vec<Function<'js>> = borrow
            .on_abort
            .iter()
            .chain(borrow.listeners.iter())
            .cloned()
            .collect();
        drop(borrow);

        let event = Object::new(ctx.clone())?;
        event.set("type", ABORT_EVENT)?;
        event.set("target", this.clone())?;
        for callback in callbacks {
            () = callback.call((This(this.clone()), event.clone()))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use rquickjs::CatchResultExt;

    use crate::test_utils::{test_sync_with, MockHost};

    #[tokio::test]
    async fn static_abort_is_aborted() {
        test_sync_with(|ctx| {
            crate::install(&ctx, MockHost::new())?;
            let result = ctx
                .eval::<String, _>(
                    r#"
                const signal = AbortSignal.abort();
                const custom = AbortSignal.abort("stop");
                [signal.aborted, signal.reason instanceof AbortError, custom.reason].join("|")
            "#,
                )
                .catch(&ctx)
                .unwrap();
            assert_eq!(result, "true|true|stop");
            Ok(())
        })
        .await
    }

    #[tokio::test]
    async fn listeners_run_once() {
        test_sync_with(|ctx| {
            crate::install(&ctx, MockHost::new())?;
            let result = ctx
                .eval::<String, _>(
                    r#"
                const controller = new AbortController();
                const calls = [];
                const listener = (event) => calls.push(`listener:${event.type}`);
                controller.signal.onabort = () => calls.push("onabort");
                controller.signal.addEventListener("abort", listener);
                controller.signal.addEventListener("abort", listener);
                controller.abort();
                controller.abort();
                calls.join(",")
            "#,
                )
                .catch(&ctx)
                .unwrap();
            assert_eq!(result, "onabort,listener:abort");
            Ok(())
        })
        .await
    }

    #[tokio::test]
    async fn removed_listener_is_not_called() {
        test_sync_with(|ctx| {
            crate::install(&ctx, MockHost::new())?;
            let result = ctx
                .eval::<i32, _>(
                    r#"
                const controller = new AbortController();
                let count = 0;
                const listener = () => count++;
                controller.signal.addEventListener("abort", listener);
                controller.signal.removeEventListener("abort", listener);
                controller.abort();
                count
            "#,
                )
                .catch(&ctx)
                .unwrap();
            assert_eq!(result, 0);
            Ok(())
        })
        .await
    }

    #[tokio::test]
    async fn throw_if_aborted_throws_reason() {
        test_sync_with(|ctx| {
            crate::install(&ctx, MockHost::new())?;
            let result = ctx
                .eval::<String, _>(
                    r#"
                const controller = new AbortController();
                controller.signal.throwIfAborted();
                controller.abort("gone");
                let caught;
                try { controller.signal.throwIfAborted(); } catch (e) { caught = e; }
                caught
            "#,
                )
                .catch(&ctx)
                .unwrap();
            assert_eq!(result, "gone");
            Ok(())
        })
        .await
    }
}
