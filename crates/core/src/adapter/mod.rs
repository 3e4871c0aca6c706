use std::{
    cell::RefCell,
    collections::BTreeMap,
    fmt,
    future::Future,
};

use crate::{
    module::{public_export_name, ForeignModule, HeapRelay},
    value::ResultCallback,
    Arg, Result, Value, WasmPanelError,
};

/// Adapts every public export of a module to a single calling convention.
///
/// A wrapped call returns the export's direct value when it has one, falls
/// back to the shared result slot when it does not, and, when the last
/// argument is a callback, checks that the export fired it before returning.
/// The result slots live here rather than on the module so that nothing else
/// can observe or disturb them between calls.
pub struct WasmApi<M> {
    module: RefCell<M>,
    heap_result: RefCell<Option<Value>>,
    exports: BTreeMap<String, String>,
    in_flight: RefCell<Option<String>>,
}

/// How the result of one invocation reached the adapter.
#[derive(Debug, Clone, PartialEq)]
pub enum Delivery {
    /// The export returned a value directly.
    Immediate(Value),
    /// The export returned nothing, so the shared slot holds the result (or
    /// nothing at all).
    FromSlot,
    /// The caller supplied a callback which receives the result.
    Callback,
}

impl Delivery {
    fn resolve(function: &str, callback_supplied: bool, returned: Option<Value>) -> Self {
        match (callback_supplied, returned) {
            (true, Some(stray)) => {
                tracing::warn!(function, %stray, "callback-style export also returned a value; ignoring it");
                Self::Callback
            }
            (true, None) => Self::Callback,
            (false, Some(value)) => Self::Immediate(value),
            (false, None) => Self::FromSlot,
        }
    }
}

impl<M: ForeignModule> WasmApi<M> {
    /// Awaits the module produced by `factory` and wraps its exports.
    pub async fn load<F, Fut>(factory: F) -> Result<Self>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<M>>,
    {
        let module = factory().await?;
        Ok(Self::adapt(module))
    }

    /// Wraps the exports of an already-instantiated module.
    pub fn adapt(module: M) -> Self {
        let exports: BTreeMap<String, String> = module
            .member_names()
            .into_iter()
            .filter_map(|member| {
                public_export_name(&member).map(|name| (name.to_string(), member.clone()))
            })
            .collect();
        tracing::debug!(exports = exports.len(), "adapted module exports");

        Self {
            module: RefCell::new(module),
            heap_result: RefCell::new(None),
            exports,
            in_flight: RefCell::new(None),
        }
    }

    /// Wrapped export names, sorted.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.exports.keys().map(String::as_str)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.exports.contains_key(name)
    }

    /// Borrowed handle onto a single wrapped export.
    pub fn function(&self, name: &str) -> Result<WrappedFunction<'_, M>> {
        let (name, _) = self
            .exports
            .get_key_value(name)
            .ok_or_else(|| WasmPanelError::UnknownExport(name.to_string()))?;
        Ok(WrappedFunction { api: self, name })
    }

    /// Calls the wrapped export `name`.
    ///
    /// Returns `Ok(None)` for callback-style calls, whose result goes to the
    /// callback, and for slot-style calls that left the slot empty.
    pub fn call<'cb, I>(&self, name: &str, args: I) -> Result<Option<Value>>
    where
        I: IntoIterator<Item = Arg<'cb>>,
    {
        let raw = self
            .exports
            .get(name)
            .ok_or_else(|| WasmPanelError::UnknownExport(name.to_string()))?;
        let (values, callback) = split_trailing_callback(name, args)?;
        let _guard = self.enter(name)?;

        let callback_supplied = callback.is_some();
        let mut module = self.module.borrow_mut();
        let mut slot = self.heap_result.borrow_mut();
        let mut relay = HeapRelay::new(&mut *slot, callback);

        let returned = module.invoke(raw, &values, &mut relay)?;
        let undelivered = relay.callback_pending();
        drop(relay);

        let delivery = Delivery::resolve(name, callback_supplied, returned);
        tracing::debug!(function = name, ?delivery, "invocation finished");
        match delivery {
            Delivery::Callback if undelivered => Err(WasmPanelError::ProtocolViolation {
                function: name.to_string(),
            }),
            Delivery::Callback => Ok(None),
            Delivery::Immediate(value) => Ok(Some(value)),
            Delivery::FromSlot => Ok(slot.take()),
        }
    }

    /// Peeks at the shared result slot without consuming it.
    pub fn pending_heap_result(&self) -> Option<Value> {
        self.heap_result
            .try_borrow()
            .ok()
            .and_then(|slot| slot.clone())
    }

    pub fn into_module(self) -> M {
        self.module.into_inner()
    }

    fn enter(&self, function: &str) -> Result<InFlight<'_>> {
        let mut in_flight = self.in_flight.borrow_mut();
        if let Some(pending) = in_flight.as_ref() {
            return Err(WasmPanelError::Busy {
                function: function.to_string(),
                pending: pending.clone(),
            });
        }
        *in_flight = Some(function.to_string());
        Ok(InFlight {
            slot: &self.in_flight,
        })
    }
}

impl<M> fmt::Debug for WasmApi<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WasmApi")
            .field("exports", &self.exports.keys().collect::<Vec<_>>())
            .field(
                "in_flight",
                &self.in_flight.try_borrow().ok().and_then(|name| name.clone()),
            )
            .finish()
    }
}

/// A single export of a [`WasmApi`], callable by handle.
pub struct WrappedFunction<'api, M> {
    api: &'api WasmApi<M>,
    name: &'api str,
}

impl<'api, M: ForeignModule> WrappedFunction<'api, M> {
    pub fn name(&self) -> &str {
        self.name
    }

    pub fn call<'cb, I>(&self, args: I) -> Result<Option<Value>>
    where
        I: IntoIterator<Item = Arg<'cb>>,
    {
        self.api.call(self.name, args)
    }
}

/// Clears the in-flight marker when an invocation ends, error or not.
struct InFlight<'a> {
    slot: &'a RefCell<Option<String>>,
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        *self.slot.borrow_mut() = None;
    }
}

fn split_trailing_callback<'cb, I>(function: &str, args: I) -> Result<(Vec<Value>, Option<ResultCallback<'cb>>)>
where
    I: IntoIterator<Item = Arg<'cb>>,
{
    let mut args: Vec<Arg<'cb>> = args.into_iter().collect();
    let callback = match args.last() {
        Some(Arg::Callback(_)) => match args.pop() {
            Some(Arg::Callback(callback)) => Some(callback),
            _ => None,
        },
        _ => None,
    };

    let mut values = Vec::with_capacity(args.len());
    for (position, arg) in args.into_iter().enumerate() {
        match arg {
            Arg::Value(value) => values.push(value),
            Arg::Callback(_) => {
                return Err(WasmPanelError::CallbackNotTrailing {
                    function: function.to_string(),
                    position,
                })
            }
        }
    }
    Ok((values, callback))
}

#[cfg(test)]
mod tests {
    use std::cell::{Cell, RefCell};

    use super::*;
    use crate::HeapArray;

    #[derive(Default)]
    struct ScriptedModule {
        calls: usize,
    }

    impl ForeignModule for ScriptedModule {
        fn member_names(&self) -> Vec<String> {
            [
                "_direct", "_slot", "_empty", "_callback", "_silent", "_both", "_fails", "__internal",
                "memory", "HEAPF64",
            ]
            .iter()
            .map(|name| name.to_string())
            .collect()
        }

        fn invoke(&mut self, name: &str, args: &[Value], heap: &mut HeapRelay<'_, '_>) -> Result<Option<Value>> {
            self.calls += 1;
            let first = args.first().and_then(Value::as_f64).unwrap_or_default();
            match name {
                "_direct" => Ok(Some(Value::from(first + 1.0))),
                "_slot" => {
                    heap.set_result(vec![first, first * 2.0]);
                    Ok(None)
                }
                "_empty" | "_silent" => Ok(None),
                "_callback" => {
                    heap.deliver(args.iter().filter_map(Value::as_f64).sum::<f64>())?;
                    Ok(None)
                }
                "_both" => {
                    heap.set_result("kept");
                    Ok(Some(Value::from(true)))
                }
                "_fails" => Err(WasmPanelError::msg("boom")),
                other => Err(WasmPanelError::msg(format!("unexpected member {other}"))),
            }
        }
    }

    fn api() -> WasmApi<ScriptedModule> {
        WasmApi::adapt(ScriptedModule::default())
    }

    #[test]
    fn wraps_only_public_exports() {
        let api = api();
        let names: Vec<_> = api.names().collect();
        assert_eq!(names, vec!["both", "callback", "direct", "empty", "fails", "silent", "slot"]);
        assert!(!api.contains("_internal"));
        assert!(matches!(api.call("memory", Vec::<Arg>::new()), Err(WasmPanelError::UnknownExport(_))));
    }

    #[test]
    fn load_awaits_the_factory() {
        let api = pollster::block_on(WasmApi::load(|| async { Ok(ScriptedModule::default()) })).unwrap();
        assert!(api.contains("direct"));

        let failed = pollster::block_on(WasmApi::<ScriptedModule>::load(|| async {
            Err(WasmPanelError::msg("instantiation failed"))
        }));
        assert!(failed.is_err());
    }

    #[test]
    fn direct_return_leaves_slot_untouched() {
        let api = api();
        assert_eq!(api.call("direct", [Arg::from(41.0)]).unwrap(), Some(Value::from(42.0)));
        assert_eq!(api.call("both", Vec::<Arg>::new()).unwrap(), Some(Value::from(true)));
        assert_eq!(api.pending_heap_result(), Some(Value::from("kept")));
    }

    #[test]
    fn missing_return_reads_and_clears_slot() {
        let api = api();
        let result = api.call("slot", [Arg::from(3.0)]).unwrap();
        assert_eq!(result, Some(Value::Array(HeapArray::F64(vec![3.0, 6.0]))));
        assert_eq!(api.pending_heap_result(), None);

        assert_eq!(api.call("empty", Vec::<Arg>::new()).unwrap(), None);
    }

    #[test]
    fn callback_receives_result_exactly_once() {
        let api = api();
        let received = RefCell::new(Vec::new());
        let result = api
            .call(
                "callback",
                [
                    Arg::from(1.0),
                    Arg::from(2.0),
                    Arg::callback(|value| received.borrow_mut().push(value)),
                ],
            )
            .unwrap();

        assert_eq!(result, None);
        assert_eq!(received.into_inner(), vec![Value::from(3.0)]);
    }

    #[test]
    fn undelivered_callback_is_a_protocol_violation() {
        let api = api();
        let fired = Cell::new(false);
        let err = api
            .call("silent", [Arg::callback(|_| fired.set(true))])
            .unwrap_err();

        assert!(matches!(err, WasmPanelError::ProtocolViolation { ref function } if function == "silent"));
        assert!(!fired.get());
        assert!(api.call("direct", [Arg::from(0.0)]).is_ok());
    }

    #[test]
    fn callback_must_be_trailing() {
        let api = api();
        let err = api
            .call("direct", [Arg::callback(|_| {}), Arg::from(1.0)])
            .unwrap_err();
        assert!(matches!(err, WasmPanelError::CallbackNotTrailing { position: 0, .. }));
    }

    #[test]
    fn module_errors_pass_through() {
        let api = api();
        let err = api.call("fails", Vec::<Arg>::new()).unwrap_err();
        assert_eq!(err.to_string(), "boom");
        assert!(api.call("direct", [Arg::from(1.0)]).is_ok());
    }

    #[test]
    fn reentrant_calls_are_rejected() {
        let api = api();
        let nested = RefCell::new(None);
        api.call(
            "callback",
            [
                Arg::from(1.0),
                Arg::callback(|_| {
                    *nested.borrow_mut() = Some(api.call("direct", [Arg::from(1.0)]));
                }),
            ],
        )
        .unwrap();

        let nested = nested.into_inner().expect("callback should have run");
        assert!(matches!(nested, Err(WasmPanelError::Busy { ref pending, .. }) if pending == "callback"));
        assert_eq!(api.call("direct", [Arg::from(1.0)]).unwrap(), Some(Value::from(2.0)));
    }

    #[test]
    fn handles_call_through_the_api() {
        let api = api();
        let direct = api.function("direct").unwrap();
        assert_eq!(direct.name(), "direct");
        assert_eq!(direct.call([Arg::from(9.0)]).unwrap(), Some(Value::from(10.0)));
        assert!(api.function("missing").is_err());
        assert_eq!(api.into_module().calls, 1);
    }
}
