//! Pools usage across implementations of the same interface method.
//!
//! Implementing an interface means matching its method signatures, so an
//! implementation may have to accept a context with more capabilities than
//! it uses itself. If `T`, `U` and `V` all implement `I { M(ctx K) }`, the
//! `ctx` parameters of `T.M`, `U.M` and `V.M` share one usage record: a use
//! in any of them counts for all, and together they may cover `K` even if
//! none of them does alone.
//!
//! Only interfaces declared in the analyzed package are considered.

use std::collections::HashMap;

use crate::program::{Decl, FuncDecl, MethodKey, ObjectKind, Program, TypeId};

use super::tracker::{Tracker, VarHandle};

/// Method declarations grouped by receiver base type, in declaration order.
pub fn receivers_by_type(program: &Program) -> Vec<(TypeId, Vec<&FuncDecl>)> {
    let mut groups: Vec<(TypeId, Vec<&FuncDecl>)> = Vec::new();
    for file in &program.files {
        for decl in &file.decls {
            let Decl::Func(func) = decl else {
                continue;
            };
            let Some(recv_ty) = func
                .recv
                .as_ref()
                .and_then(|r| r.first())
                .and_then(|field| field.ty.ty)
            else {
                continue;
            };
            let base = program.unwrap_pointers(recv_ty);
            match groups.iter_mut().find(|(ty, _)| *ty == base) {
                Some((_, decls)) => decls.push(func),
                None => groups.push((base, vec![func])),
            }
        }
    }
    groups
}

/// The tracked first parameter of a method declaration, if any.
fn tracked_first_param(tracker: &Tracker, func: &FuncDecl) -> Option<VarHandle> {
    let first = func.ty.params.first()?.names.first()?;
    tracker.lookup(first.def()?)
}

/// Shares usage records between sibling implementations. Returns the
/// number of parameters that joined an existing group.
pub fn unify_interface_methods(program: &Program, tracker: &mut Tracker) -> usize {
    let receivers = receivers_by_type(program);
    let mut joined = 0;

    let interfaces = program.objects.iter().filter(|obj| {
        matches!(obj.kind, ObjectKind::TypeName) && obj.package == Some(program.package)
    });

    for type_name in interfaces {
        let Some(ty) = type_name.ty else {
            continue;
        };
        if program.interface_of(ty).is_none() {
            continue;
        }
        let method_set = program.interface_method_set(ty);
        if method_set.is_empty() {
            continue;
        }

        let mut canonical: HashMap<MethodKey, Option<VarHandle>> =
            method_set.into_iter().map(|(key, _)| (key, None)).collect();

        for (recv_ty, decls) in &receivers {
            if !program.pointer_implements(*recv_ty, ty) {
                continue;
            }

            for func in decls {
                let Some(method) = func.name.def() else {
                    continue;
                };
                let method = program.object(method);
                let key = MethodKey::new(&method.name, method.package);
                let Some(slot) = canonical.get_mut(&key) else {
                    continue;
                };
                let Some(param) = tracked_first_param(tracker, func) else {
                    continue;
                };

                match slot {
                    None => *slot = Some(param),
                    Some(first) => {
                        tracker.share(*first, param);
                        joined += 1;
                    }
                }
            }
        }

        tracing::trace!(interface = %type_name.name, "unified implementations");
    }

    joined
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capability::collector::collect_tracked;
    use crate::config::AnalyzerSettings;
    use crate::program::ProgramBuilder;

    #[test]
    fn test_sibling_implementations_share_records() {
        let mut b = ProgramBuilder::new("example.com/app", "app");
        b.file("impls.go");
        let app = b.current_package();
        let ctx_pkg = b.package("context", "context");
        let unit = b.signature(&[], &[], false);
        let base = b.named_interface(ctx_pkg, "Context", &[("Done", unit)], &[]);
        let logger = b.named_interface(app, "LoggerContext", &[("Logger", unit)], &[base]);
        let secrets = b.named_interface(app, "SecretsContext", &[("Secrets", unit)], &[base]);
        let k = b.named_interface(app, "K", &[], &[logger, secrets]);

        let run_sig = b.signature(&[k], &[], false);
        let _runner = b.named_interface(app, "Runner", &[("Run", run_sig)], &[]);

        let empty = b.struct_type(&[]);
        let t = b.named(app, "T", empty);
        let u = b.named(app, "U", empty);
        let unrelated = b.named(app, "Unrelated", empty);

        let t_ctx = b.var("ctx", k);
        b.method_decl(t, true, "Run", &[t_ctx], &[], vec![]);
        let u_ctx = b.var("ctx", k);
        b.method_decl(u, false, "Run", &[u_ctx], &[], vec![]);
        let other_ctx = b.var("ctx", k);
        b.method_decl(unrelated, true, "Walk", &[other_ctx], &[], vec![]);

        let program = b.finish();
        let mut tracker = Tracker::new();
        collect_tracked(&program, &AnalyzerSettings::default(), &mut tracker);
        assert_eq!(tracker.len(), 3);

        let joined = unify_interface_methods(&program, &mut tracker);
        assert_eq!(joined, 1);

        let t_handle = tracker.lookup(t_ctx).unwrap();
        let u_handle = tracker.lookup(u_ctx).unwrap();
        let other_handle = tracker.lookup(other_ctx).unwrap();
        assert_eq!(tracker.record_id(t_handle), tracker.record_id(u_handle));
        assert_ne!(tracker.record_id(t_handle), tracker.record_id(other_handle));
    }

    #[test]
    fn test_receivers_grouped_by_base_type() {
        let mut b = ProgramBuilder::new("example.com/app", "app");
        let app = b.current_package();
        let empty = b.struct_type(&[]);
        let t = b.named(app, "T", empty);
        b.method_decl(t, true, "A", &[], &[], vec![]);
        b.method_decl(t, false, "B", &[], &[], vec![]);
        b.func_decl("free", &[], &[], vec![]);
        let program = b.finish();

        let groups = receivers_by_type(&program);
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].0, t);
        assert_eq!(groups[0].1.len(), 2);
    }
}
