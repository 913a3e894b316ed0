// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0
use rquickjs::{
    atom::PredefinedAtom, function::Constructor, runtime::UserDataGuard, Ctx, Exception, Function,
    JsLifetime, Object, Result,
};

/// Built-ins captured before user code runs, so later reassignment of
/// globals by scripts does not change ponyfill behaviour.
#[derive(JsLifetime)]
pub struct BasePrimordials<'js> {
    // Constructors
    pub constructor_promise: Constructor<'js>,
    pub constructor_error: Constructor<'js>,
    pub constructor_uri_error: Constructor<'js>,

    // Prototypes
    pub prototype_error: Object<'js>,

    // Functions
    pub function_promise_resolve: Function<'js>,
    pub function_promise_reject: Function<'js>,
    pub function_object_to_string: Function<'js>,
    pub function_array_buffer_is_view: Function<'js>,
    pub function_string_locale_compare: Function<'js>,
}

pub trait Primordial<'js> {
    fn get<'a>(ctx: &'a Ctx<'js>) -> Result<UserDataGuard<'a, Self>>
    where
        Self: Sized + JsLifetime<'js>,
    {
        if let Some(primordials) = ctx.userdata::<Self>() {
            return Ok(primordials);
        }

        let primordials = Self::new(ctx)?;

        _ = ctx.store_userdata(primordials);
        ctx.userdata::<Self>()
            .ok_or_else(|| Exception::throw_internal(ctx, "Unable to store primordials"))
    }

    fn init(ctx: &Ctx<'js>) -> Result<()>
    where
        Self: Sized + JsLifetime<'js>,
    {
        let _ = Self::get(ctx)?;
        Ok(())
    }

    fn new(ctx: &Ctx<'js>) -> Result<Self>
    where
        Self: Sized;
}

impl<'js> Primordial<'js> for BasePrimordials<'js> {
    fn new(ctx: &Ctx<'js>) -> Result<Self> {
        let globals = ctx.globals();

        let constructor_promise: Constructor = globals.get(PredefinedAtom::Promise)?;
        let function_promise_resolve: Function = constructor_promise.get("resolve")?;
        let function_promise_reject: Function = constructor_promise.get("reject")?;

        let constructor_error: Constructor = globals.get(PredefinedAtom::Error)?;
        let prototype_error: Object = constructor_error.get(PredefinedAtom::Prototype)?;
        let constructor_uri_error: Constructor = globals.get("URIError")?;

        let constructor_object: Constructor = globals.get(PredefinedAtom::Object)?;
        let prototype_object: Object = constructor_object.get(PredefinedAtom::Prototype)?;
        let function_object_to_string: Function = prototype_object.get(PredefinedAtom::ToString)?;

        let constructor_array_buffer: Constructor = globals.get(PredefinedAtom::ArrayBuffer)?;
        let function_array_buffer_is_view: Function = constructor_array_buffer.get("isView")?;

        let constructor_string: Constructor = globals.get(PredefinedAtom::String)?;
        let prototype_string: Object = constructor_string.get(PredefinedAtom::Prototype)?;
        let function_string_locale_compare: Function = prototype_string.get("localeCompare")?;

        Ok(Self {
            constructor_promise,
            constructor_error,
            constructor_uri_error,
            prototype_error,
            function_promise_resolve,
            function_promise_reject,
            function_object_to_string,
            function_array_buffer_is_view,
            function_string_locale_compare,
        })
    }
}
