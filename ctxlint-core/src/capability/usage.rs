//! Records how tracked variables are used.
//!
//! Only bare identifiers are matched. A tracked variable stored into a map,
//! returned, or aliased through another name is not seen, which can hide a
//! problem but never invents one.
//!
//! Recognized forms:
//!
//! ```text
//! f(ctx)                    interface use: f's parameter type
//! ctx.Logger()              method use: "Logger"
//! ctx.(interface{ A; B })   interface use: the asserted type
//! T{Ctx: ctx} / T{ctx}      interface use: the field type
//! cache.Cache(fn, ...)      fn's first parameter is cached
//! cache.KeyParamsFxn(fn)    fn's first parameter is no longer tracked
//! ```

use crate::config::AnalyzerSettings;
use crate::error::{CtxlintError, CtxlintResult};
use crate::program::visit::{self, Visit};
use crate::program::{Expr, ExprKind, ObjectId, ObjectKind, Param, Program, Type, TypeId};

use super::tracker::Tracker;

/// Walks every file and marks uses of tracked variables.
///
/// Returns the number of uses recorded, or the first invariant violation.
pub fn mark_uses(
    program: &Program,
    settings: &AnalyzerSettings,
    tracker: &mut Tracker,
) -> CtxlintResult<usize> {
    let mut marker = UsageMarker {
        program,
        settings,
        tracker,
        marks: 0,
        error: None,
    };
    for file in &program.files {
        marker.visit_file(file);
        if let Some(err) = marker.error.take() {
            return Err(err);
        }
    }
    Ok(marker.marks)
}

struct UsageMarker<'a> {
    program: &'a Program,
    settings: &'a AnalyzerSettings,
    tracker: &'a mut Tracker,
    marks: usize,
    error: Option<CtxlintError>,
}

/// The object a callee expression refers to: `f`, `pkg.F`, `x.M`.
fn callee_object(fun: &Expr) -> Option<ObjectId> {
    match &fun.kind {
        ExprKind::Ident { ident } => ident.object(),
        ExprKind::Selector { sel, .. } => sel.object(),
        ExprKind::Paren { x } => callee_object(x),
        _ => None,
    }
}

impl UsageMarker<'_> {
    /// Records `ty` as an interface use of `value`, if it names a tracked
    /// variable.
    fn mark_interface(&mut self, value: &Expr, ty: TypeId) {
        let Some(obj) = value.as_ident().and_then(|i| i.object()) else {
            return;
        };
        if let Some(handle) = self.tracker.lookup(obj) {
            self.tracker.record_mut(handle).interface_uses.insert(ty);
            self.marks += 1;
        }
    }

    /// Parameters of the callee's signature, and whether it is variadic.
    ///
    /// `Ok(None)` for builtins, which have no signature.
    fn callee_signature(&self, fun: &Expr) -> CtxlintResult<Option<(&[Param], bool)>> {
        let Some(ty) = fun.ty else {
            let is_builtin = callee_object(fun)
                .map(|o| matches!(self.program.object(o).kind, ObjectKind::Builtin))
                .unwrap_or(false);
            if is_builtin {
                return Ok(None);
            }
            return Err(CtxlintError::invariant(
                "call expression whose callee has no type",
            ));
        };
        match self.program.ty(self.program.underlying(ty)) {
            Type::Signature {
                params, variadic, ..
            } => Ok(Some((params.as_slice(), *variadic))),
            _ => Err(CtxlintError::invariant(format!(
                "callee of type `{}` is not a function",
                self.program.type_string(ty, Some(self.program.package), false)
            ))),
        }
    }

    /// The parameter type argument `i` binds to.
    fn param_type(&self, params: &[Param], variadic: bool, spread: bool, i: usize) -> Option<TypeId> {
        let last = params.len().checked_sub(1)?;
        if variadic && !spread && i >= last {
            return match self.program.ty(params[last].ty) {
                Type::Slice { elem } => Some(*elem),
                _ => Some(params[last].ty),
            };
        }
        params.get(i).map(|p| p.ty)
    }

    fn mark_args(&mut self, fun: &Expr, args: &[Expr], spread: bool) -> CtxlintResult<()> {
        let Some((params, variadic)) = self.callee_signature(fun)? else {
            return Ok(());
        };
        let bindings: Vec<(usize, TypeId)> = (0..args.len())
            .filter_map(|i| self.param_type(params, variadic, spread, i).map(|ty| (i, ty)))
            .collect();
        for (i, ty) in bindings {
            self.mark_interface(&args[i], ty);
        }
        Ok(())
    }

    fn mark_receiver(&mut self, fun: &Expr) {
        let ExprKind::Selector { x, sel } = &fun.kind else {
            return;
        };
        let Some(obj) = x.as_ident().and_then(|i| i.object()) else {
            return;
        };
        if let Some(handle) = self.tracker.lookup(obj) {
            self.tracker
                .record_mut(handle)
                .method_uses
                .insert(sel.name.clone());
            self.marks += 1;
        }
    }

    /// The first parameter of the function passed as `args[0]`, when the
    /// callee is one of `names`.
    fn wrapped_context_param(&self, fun: &Expr, args: &[Expr], names: &[String]) -> Option<ObjectId> {
        let callee = callee_object(fun)?;
        let qualified = self.program.qualified_name(callee)?;
        if !names.iter().any(|n| *n == qualified) {
            return None;
        }
        let Type::Signature { params, .. } = self.program.ty(args.first()?.ty?) else {
            return None;
        };
        params.first()?.object
    }

    fn mark_cached(&mut self, fun: &Expr, args: &[Expr]) {
        let names = &self.settings.memoize_functions;
        let Some(param) = self.wrapped_context_param(fun, args, names) else {
            return;
        };
        if let Some(handle) = self.tracker.lookup(param) {
            tracing::trace!(variable = %self.program.object(param).name, "cached");
            self.tracker.record_mut(handle).cached = true;
        }
    }

    fn mark_key_params(&mut self, fun: &Expr, args: &[Expr]) {
        let names = &self.settings.key_param_functions;
        if let Some(param) = self.wrapped_context_param(fun, args, names) {
            if self.tracker.untrack(param) {
                tracing::trace!(variable = %self.program.object(param).name, "key-params function, untracked");
            }
        }
    }

    fn mark_composite(&mut self, lit: &Expr, elts: &[Expr]) {
        if elts.is_empty() {
            return;
        }
        let Some(ty) = lit.ty else {
            return;
        };
        // Map, slice and array literals are not followed.
        let Type::Struct { fields } = self.program.ty(self.program.underlying(ty)) else {
            return;
        };
        let fields: Vec<TypeId> = fields.iter().map(|f| f.ty).collect();

        for (i, elt) in elts.iter().enumerate() {
            match &elt.kind {
                ExprKind::KeyValue { key, value } => {
                    if let Some(field_ty) = key.ty {
                        self.mark_interface(value, field_ty);
                    }
                }
                _ => {
                    if let Some(&field_ty) = fields.get(i) {
                        self.mark_interface(elt, field_ty);
                    }
                }
            }
        }
    }
}

impl<'ast> Visit<'ast> for UsageMarker<'_> {
    fn visit_expr(&mut self, expr: &'ast Expr) {
        if self.error.is_some() {
            return;
        }
        match &expr.kind {
            ExprKind::TypeAssert { x, to: Some(to) } => {
                if let Some(ty) = to.ty {
                    self.mark_interface(x, ty);
                }
            }
            ExprKind::Call {
                fun,
                args,
                ellipsis,
            } => {
                if let Err(err) = self.mark_args(fun, args, *ellipsis) {
                    self.error = Some(err);
                    return;
                }
                self.mark_receiver(fun);
                self.mark_cached(fun, args);
                self.mark_key_params(fun, args);
            }
            ExprKind::CompositeLit { elts, .. } => self.mark_composite(expr, elts),
            _ => {}
        }
        visit::walk_expr(self, expr);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capability::collector::collect_tracked;
    use crate::program::{ProgramBuilder, Stmt};

    struct Fixture {
        b: ProgramBuilder,
        logger: TypeId,
        secrets: TypeId,
        both: TypeId,
    }

    fn fixture() -> Fixture {
        let mut b = ProgramBuilder::new("example.com/app", "app");
        b.file("thing.go");
        let app = b.current_package();
        let ctx_pkg = b.package("context", "context");
        let unit = b.signature(&[], &[], false);
        let base = b.named_interface(ctx_pkg, "Context", &[("Done", unit)], &[]);
        let logger = b.named_interface(app, "LoggerContext", &[("Logger", unit)], &[base]);
        let secrets = b.named_interface(app, "SecretsContext", &[("Secrets", unit)], &[base]);
        let both = b.interface(&[], &[base, logger, secrets]);
        Fixture {
            b,
            logger,
            secrets,
            both,
        }
    }

    fn run(program: &Program) -> CtxlintResult<Tracker> {
        let settings = AnalyzerSettings::default();
        let mut tracker = Tracker::new();
        collect_tracked(program, &settings, &mut tracker);
        mark_uses(program, &settings, &mut tracker)?;
        Ok(tracker)
    }

    fn expr_stmt(expr: Expr) -> Stmt {
        Stmt::Expr { expr }
    }

    #[test]
    fn test_call_argument_marks_parameter_type() {
        let Fixture {
            mut b,
            logger,
            both,
            ..
        } = fixture();
        let app = b.current_package();
        let log_sig = b.signature(&[logger], &[], false);
        let log_fn = b.func_object(app, "logIt", log_sig);
        let ctx = b.var("ctx", both);
        let call = b.call(b.use_ident(log_fn), vec![b.use_ident(ctx)]);
        b.func_decl("F", &[ctx], &[], vec![expr_stmt(call)]);
        let program = b.finish();

        let tracker = run(&program).unwrap();
        let handle = tracker.lookup(ctx).unwrap();
        assert!(tracker.record(handle).interface_uses.contains(&logger));
    }

    #[test]
    fn test_method_call_marks_method_name() {
        let Fixture { mut b, both, .. } = fixture();
        let unit = b.signature(&[], &[], false);
        let ctx = b.var("ctx", both);
        let call = b.method_call(b.use_ident(ctx), "Secrets", unit, vec![]);
        b.func_decl("F", &[ctx], &[], vec![expr_stmt(call)]);
        let program = b.finish();

        let tracker = run(&program).unwrap();
        let record = tracker.record(tracker.lookup(ctx).unwrap());
        assert!(record.method_uses.contains("Secrets"));
        assert!(record.interface_uses.is_empty());
    }

    #[test]
    fn test_type_assertion_marks_target() {
        let Fixture {
            mut b,
            secrets,
            both,
            ..
        } = fixture();
        let ctx = b.var("ctx", both);
        let cast = b.type_assert(b.use_ident(ctx), secrets);
        b.func_decl("F", &[ctx], &[], vec![expr_stmt(cast)]);
        let program = b.finish();

        let tracker = run(&program).unwrap();
        let record = tracker.record(tracker.lookup(ctx).unwrap());
        assert_eq!(record.interface_uses.iter().copied().collect::<Vec<_>>(), vec![secrets]);
    }

    #[test]
    fn test_variadic_arguments_bind_element_type() {
        let Fixture {
            mut b,
            logger,
            both,
            ..
        } = fixture();
        let app = b.current_package();
        let string = b.basic("string");
        let loggers = b.slice(logger);
        let sig = b.signature(&[string, loggers], &[], true);
        let log_all = b.func_object(app, "logAll", sig);
        let ctx = b.var("ctx", both);
        let other = b.var("other", both);
        let call = b.call(
            b.use_ident(log_all),
            vec![b.lit("\"x\"", string), b.use_ident(ctx), b.use_ident(other)],
        );
        b.func_decl("F", &[ctx, other], &[], vec![expr_stmt(call)]);
        let program = b.finish();

        let tracker = run(&program).unwrap();
        for var in [ctx, other] {
            let record = tracker.record(tracker.lookup(var).unwrap());
            assert!(record.interface_uses.contains(&logger));
        }
    }

    #[test]
    fn test_spread_argument_binds_slice_type() {
        let Fixture {
            mut b,
            logger,
            both,
            ..
        } = fixture();
        let app = b.current_package();
        let loggers = b.slice(logger);
        let sig = b.signature(&[loggers], &[], true);
        let log_all = b.func_object(app, "logAll", sig);
        let ctx = b.var("ctx", both);
        let call = b.call_spread(b.use_ident(log_all), vec![b.use_ident(ctx)]);
        b.func_decl("F", &[ctx], &[], vec![expr_stmt(call)]);
        let program = b.finish();

        let tracker = run(&program).unwrap();
        let record = tracker.record(tracker.lookup(ctx).unwrap());
        assert!(record.interface_uses.contains(&loggers));
        assert!(!record.interface_uses.contains(&logger));
    }

    #[test]
    fn test_struct_literal_fields() {
        let Fixture {
            mut b,
            logger,
            secrets,
            both,
        } = fixture();
        let app = b.current_package();
        let fields = b.struct_type(&[("log", logger), ("sec", secrets)]);
        let holder = b.named(app, "holder", fields);
        let keyed = b.var("keyed", both);
        let positional = b.var("positional", both);
        let lit_keyed = b.composite_lit(holder, vec![b.key_value("sec", secrets, b.use_ident(keyed))]);
        let lit_positional = b.composite_lit(
            holder,
            vec![b.use_ident(positional), b.lit("nil", secrets)],
        );
        b.func_decl(
            "F",
            &[keyed, positional],
            &[],
            vec![expr_stmt(lit_keyed), expr_stmt(lit_positional)],
        );
        let program = b.finish();

        let tracker = run(&program).unwrap();
        let keyed_uses = &tracker.record(tracker.lookup(keyed).unwrap()).interface_uses;
        assert_eq!(keyed_uses.iter().copied().collect::<Vec<_>>(), vec![secrets]);
        let positional_uses = &tracker.record(tracker.lookup(positional).unwrap()).interface_uses;
        assert_eq!(positional_uses.iter().copied().collect::<Vec<_>>(), vec![logger]);
    }

    #[test]
    fn test_builtin_and_conversion_are_not_bindings() {
        let Fixture { mut b, both, .. } = fixture();
        let len = b.builtin("len");
        let ctx = b.var("ctx", both);
        let builtin_call = b.call(b.use_ident(len), vec![b.use_ident(ctx)]);
        let conversion = b.conversion(both, b.use_ident(ctx));
        b.func_decl(
            "F",
            &[ctx],
            &[],
            vec![expr_stmt(builtin_call), expr_stmt(conversion)],
        );
        let program = b.finish();

        let tracker = run(&program).unwrap();
        assert!(tracker.record(tracker.lookup(ctx).unwrap()).is_empty());
    }

    #[test]
    fn test_untyped_callee_is_invariant_error() {
        let Fixture { mut b, both, .. } = fixture();
        let ctx = b.var("ctx", both);
        let mystery = Expr::new(
            ExprKind::Ident {
                ident: crate::program::Ident {
                    name: "mystery".to_string(),
                    pos: Default::default(),
                    binding: None,
                },
            },
            None,
        );
        let call = b.call(mystery, vec![b.use_ident(ctx)]);
        b.func_decl("F", &[ctx], &[], vec![expr_stmt(call)]);
        let program = b.finish();

        let err = run(&program).unwrap_err();
        assert!(matches!(err, CtxlintError::Invariant { .. }));
    }
}
