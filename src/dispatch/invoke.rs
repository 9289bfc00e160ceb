//! Calls through dispatch tables.

use orb_core::{
    CallContext, DispatchError, MethodSignature, NativeError, ObjectHandle, OrbError,
    QualifiedName, TypedException, Value,
};
use orb_registry::builtins;

use crate::Runtime;
use crate::exception::ExceptionMarshaller;

use super::{DispatchTable, Marshaller};

impl Runtime {
    /// Call slot `index` of `table` on `target`.
    ///
    /// `args` holds one value per declared parameter. `in` and `inout` values
    /// must conform to their declared types; `out` slots may hold anything and
    /// are overwritten. After a successful call every `out` and `inout` value
    /// is written back into `args`.
    ///
    /// The target and every object reachable from the input arguments hold an
    /// extra count for the duration of the call. A returned object handle, and
    /// any object written to an `out` slot, carries one count owned by the
    /// caller. When the call fails those counts are released before the error
    /// is returned.
    #[cfg_attr(feature = "profiling", profiling::function)]
    pub fn invoke(
        &self,
        table: &DispatchTable,
        target: ObjectHandle,
        index: usize,
        args: &mut [Value],
    ) -> Result<Value, OrbError> {
        table.ensure_valid()?;
        let slot = table.slot(index)?;
        let sig = &slot.signature;

        let _target_pin = self.heap.pin(target)?;
        let data = self.heap.get(target)?;
        if !data.supports(table.type_hash()) {
            return Err(DispatchError::InterfaceNotImplemented {
                interface: table.interface().to_string(),
            }
            .into());
        }
        if args.len() != sig.params.len() {
            return Err(DispatchError::ArityMismatch {
                method: sig.name.clone(),
                expected: sig.params.len(),
                actual: args.len(),
            }
            .into());
        }

        let (mut call_args, _arg_pins) = {
            let registry = self.registry.read();
            let marshaller = Marshaller::new(&registry, &self.heap);
            let mut call_args = Vec::with_capacity(args.len());
            for (i, (param, value)) in sig.params.iter().zip(args.iter()).enumerate() {
                if !param.direction.reads() {
                    call_args.push(marshaller.default_value(&param.ty));
                    continue;
                }
                if !marshaller.conforms(&param.ty, value) {
                    return Err(DispatchError::ArgumentMismatch {
                        method: sig.name.clone(),
                        index: i,
                        expected: param.ty.to_string(),
                        actual: value.type_name().to_string(),
                    }
                    .into());
                }
                call_args.push(value.clone());
            }
            let inputs = sig
                .params
                .iter()
                .zip(args.iter())
                .filter(|(p, _)| p.direction.reads())
                .map(|(_, v)| v);
            (call_args, marshaller.pin_objects(inputs)?)
        };

        log::trace!(
            "invoke {}.{} on object {}.{}",
            table.interface(),
            sig.name,
            target.index,
            target.generation
        );

        let native = data.class().find_method(&slot.declared_in, &sig.name).cloned();
        let mut ret = Value::Void;
        let outcome = ExceptionMarshaller::run(self.config.is_catch_panics(), || {
            let native = native.ok_or_else(|| {
                NativeError::NotImplemented(format!(
                    "{}.{} in {}",
                    slot.declared_in,
                    sig.name,
                    data.class().name()
                ))
            })?;
            let mut ctx = CallContext::for_method(target, &data, &mut call_args, &mut ret, &self.heap);
            native.call(&mut ctx)
        });
        if let Err(err) = outcome {
            self.release_produced(sig, args, &call_args, &ret);
            let exception = self.typed_exception(err);
            return Err(self.check_declared(&sig.name, &sig.raises, exception).into());
        }

        let mismatch = {
            let registry = self.registry.read();
            let marshaller = Marshaller::new(&registry, &self.heap);
            if !marshaller.conforms(&sig.return_type, &ret) {
                Some(DispatchError::ReturnMismatch {
                    method: sig.name.clone(),
                    expected: sig.return_type.to_string(),
                    actual: ret.type_name().to_string(),
                })
            } else {
                sig.params
                    .iter()
                    .zip(&call_args)
                    .find(|(param, value)| {
                        param.direction.writes() && !marshaller.conforms(&param.ty, value)
                    })
                    .map(|(param, value)| DispatchError::ReturnMismatch {
                        method: format!("{} (parameter {})", sig.name, param.name),
                        expected: param.ty.to_string(),
                        actual: value.type_name().to_string(),
                    })
            }
        };
        if let Some(err) = mismatch {
            self.release_produced(sig, args, &call_args, &ret);
            return Err(err.into());
        }

        for ((param, arg), value) in sig.params.iter().zip(args.iter_mut()).zip(call_args) {
            if param.direction.writes() {
                *arg = value;
            }
        }
        Ok(ret)
    }

    /// Release the counts a failed call handed back: every object in the
    /// return slot and every object an `out`/`inout` slot holds that the
    /// caller did not pass in.
    fn release_produced(
        &self,
        sig: &MethodSignature,
        args: &[Value],
        call_args: &[Value],
        ret: &Value,
    ) {
        let mut produced = ret.object_handles();
        for ((param, before), after) in sig.params.iter().zip(args).zip(call_args) {
            if !param.direction.writes() {
                continue;
            }
            let passed_in = if param.direction.reads() {
                before.object_handles()
            } else {
                Vec::new()
            };
            produced.extend(
                after
                    .object_handles()
                    .into_iter()
                    .filter(|h| !passed_in.iter().any(|p| p.same_object(h))),
            );
        }
        for handle in produced {
            if let Err(e) = self.heap.release(handle) {
                log::error!("releasing result of failed call to {}: {e}", sig.name);
            }
        }
    }

    /// Call a method by interface and name.
    pub fn invoke_by_name(
        &self,
        target: ObjectHandle,
        interface: &QualifiedName,
        method: &str,
        args: &mut [Value],
    ) -> Result<Value, OrbError> {
        let table = self.dispatch_table(interface)?;
        let index = table
            .index_of(method)
            .ok_or_else(|| DispatchError::UnknownMethod {
                interface: interface.to_string(),
                method: method.to_string(),
            })?;
        self.invoke(&table, target, index, args)
    }

    /// Under `strict_raises`, replace exceptions a method or constructor does
    /// not declare.
    ///
    /// Runtime errors (the fallback type and anything derived from
    /// `orb.RuntimeError`) may always cross.
    pub(crate) fn check_declared(
        &self,
        member: &str,
        raises: &[QualifiedName],
        exception: TypedException,
    ) -> TypedException {
        if !self.config.is_strict_raises() {
            return exception;
        }
        let registry = self.registry.read();
        let name = &exception.type_name;
        let fallback = self.config.fallback_exception_name();
        let allowed = raises
            .iter()
            .chain([fallback, &QualifiedName::from(builtins::RUNTIME_ERROR)])
            .any(|declared| registry.is_exception_subtype(name, declared));
        if allowed {
            return exception;
        }
        log::debug!("{member} does not declare {name}");
        self.exceptions
            .to_fallback(&registry, &self.heap, fallback, exception)
    }
}
