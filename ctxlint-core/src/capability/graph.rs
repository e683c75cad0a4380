//! Graph functions over the interface-composition lattice.
//!
//! All functions are pure queries on the program. Results keep first-seen
//! order and contain no duplicates (diamond embeddings are common: most
//! capability interfaces embed the base context).
//!
//! For example, given (in package `app`)
//!
//! ```text
//! type A interface { other.B; c; M() }
//! type c interface { other.D }
//! func F(ctx interface { A; other.E })
//! ```
//!
//! - `explicit_composition(typeof ctx, app)` is `A, other.B, other.D, other.E`
//!   (not `c`: unexported; not the literal: unnamed)
//! - `leaf_groups(typeof ctx)` is `A, other.E` when `other.E` has methods
//! - `explicitly_containing(typeof ctx, "M")` is `A`

use crate::config::QualifiedName;
use crate::program::types::is_exported;
use crate::program::{PackageId, Program, TypeId};

fn push_unique(out: &mut Vec<TypeId>, ty: TypeId) {
    if !out.contains(&ty) {
        out.push(ty);
    }
}

/// Whether `ty` is the base context or an interface that (transitively)
/// embeds it.
pub fn is_context_type(program: &Program, ty: TypeId, base: &QualifiedName) -> bool {
    if program.type_is(ty, &base.package_path, &base.name) {
        return true;
    }
    match program.interface_of(ty) {
        Some(iface) => iface
            .embeds
            .iter()
            .any(|&e| is_context_type(program, e, base)),
        None => false,
    }
}

/// The interfaces a variable of type `ty`, declared in `from`, is treated as
/// having requested by name.
///
/// - a named interface from another package is opaque: just itself
/// - a named exported interface of `from`: itself plus its embeds, recursively
/// - an unnamed or unexported interface: only its embeds, recursively
pub fn explicit_composition(program: &Program, ty: TypeId, from: Option<PackageId>) -> Vec<TypeId> {
    let mut out = Vec::new();
    collect_explicit(program, ty, from, &mut out);
    out
}

fn collect_explicit(program: &Program, ty: TypeId, from: Option<PackageId>, out: &mut Vec<TypeId>) {
    let Some(iface) = program.interface_of(ty) else {
        return;
    };

    if let Some(named) = program.named(ty) {
        if named.package != from {
            push_unique(out, ty);
            return;
        }
        if named.is_exported() {
            push_unique(out, ty);
        }
    }

    for &embed in iface.embeds {
        collect_explicit(program, embed, from, out);
    }
}

/// The capability groups of `ty`: recursion through method-less embeddings,
/// stopping at the first interface that declares a method of its own.
///
/// ```text
/// type A interface { B; C }
/// type B interface { M() }
/// type C interface { D; N() }
/// type D interface { O() }
/// ```
///
/// gives `leaf_groups(A) = B, C`, `leaf_groups(C) = C`.
pub fn leaf_groups(program: &Program, ty: TypeId) -> Vec<TypeId> {
    let mut out = Vec::new();
    collect_leaves(program, ty, &mut out);
    out
}

fn collect_leaves(program: &Program, ty: TypeId, out: &mut Vec<TypeId>) {
    let Some(iface) = program.interface_of(ty) else {
        return;
    };
    if !iface.methods.is_empty() {
        push_unique(out, ty);
        return;
    }
    for &embed in iface.embeds {
        collect_leaves(program, embed, out);
    }
}

/// Every interface reachable from `ty` (itself included) that declares a
/// method called `method` explicitly.
///
/// Usually one; several when two embeds both declare it.
pub fn explicitly_containing(program: &Program, ty: TypeId, method: &str) -> Vec<TypeId> {
    let mut out = Vec::new();
    collect_containing(program, ty, method, &mut out);
    out
}

fn collect_containing(program: &Program, ty: TypeId, method: &str, out: &mut Vec<TypeId>) {
    let Some(iface) = program.interface_of(ty) else {
        return;
    };
    if iface.has_explicit_method(method) {
        push_unique(out, ty);
    }
    for &embed in iface.embeds {
        collect_containing(program, embed, method, out);
    }
}

/// One display entry for a type name list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Nameable {
    Type(TypeId),
    /// The explicit methods of an interface `pkg` cannot name, as an inline
    /// `interface{...}`.
    InlineMethods(TypeId),
}

/// Replaces interfaces invisible from `pkg` (unexported, in another package)
/// by their embeds until everything left can be referenced from `pkg`.
///
/// With `type i interface { j; k }`, `type j interface { L }` and
/// `type k interface { M(); N }` in package `mypkg`, expanding `i` for
/// another package yields `L`, `N`, `interface{M()}`.
pub fn expand_unexported(program: &Program, ty: TypeId, pkg: Option<PackageId>) -> Vec<Nameable> {
    let Some(iface) = program.interface_of(ty) else {
        return vec![Nameable::Type(ty)];
    };

    if let Some(named) = program.named(ty) {
        if is_exported(named.name) || named.package == pkg {
            return vec![Nameable::Type(ty)];
        }
    }

    let mut out: Vec<Nameable> = iface
        .embeds
        .iter()
        .flat_map(|&e| expand_unexported(program, e, pkg))
        .collect();
    if !iface.methods.is_empty() {
        out.push(Nameable::InlineMethods(ty));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::program::ProgramBuilder;

    struct Lattice {
        program: Program,
        app: PackageId,
        a: TypeId,
        c: TypeId,
        other_b: TypeId,
        other_d: TypeId,
        other_e: TypeId,
        ctx_type: TypeId,
    }

    /// type A interface { other.B; c; M() }
    /// type c interface { other.D }
    /// ctx: interface { A; other.E }
    fn lattice() -> Lattice {
        let mut b = ProgramBuilder::new("example.com/app", "app");
        let app = b.current_package();
        let other = b.package("example.com/other", "other");
        let unit = b.signature(&[], &[], false);
        let other_b = b.named_interface(other, "B", &[("BMethod", unit)], &[]);
        let other_d = b.named_interface(other, "D", &[("DMethod", unit)], &[]);
        let other_e = b.named_interface(other, "E", &[("EMethod", unit)], &[]);
        let c = b.named_interface(app, "c", &[], &[other_d]);
        let a = b.named_interface(app, "A", &[("M", unit)], &[other_b, c]);
        let ctx_type = b.interface(&[], &[a, other_e]);
        Lattice {
            program: b.finish(),
            app,
            a,
            c,
            other_b,
            other_d,
            other_e,
            ctx_type,
        }
    }

    #[test]
    fn test_explicit_composition_respects_visibility() {
        let l = lattice();
        let explicit = explicit_composition(&l.program, l.ctx_type, Some(l.app));
        assert_eq!(explicit, vec![l.a, l.other_b, l.other_d, l.other_e]);
        assert!(!explicit.contains(&l.c));
        assert!(!explicit.contains(&l.ctx_type));
    }

    #[test]
    fn test_foreign_named_interface_is_opaque() {
        let l = lattice();
        let other = l.program.named(l.other_b).unwrap().package;
        // From outside `app`, A is a single opaque capability.
        assert_eq!(explicit_composition(&l.program, l.a, other), vec![l.a]);
    }

    #[test]
    fn test_leaf_groups_stop_at_methods() {
        let l = lattice();
        assert_eq!(leaf_groups(&l.program, l.ctx_type), vec![l.a, l.other_e]);
        assert_eq!(leaf_groups(&l.program, l.c), vec![l.other_d]);
        assert_eq!(leaf_groups(&l.program, l.a), vec![l.a]);
    }

    #[test]
    fn test_explicitly_containing() {
        let l = lattice();
        assert_eq!(explicitly_containing(&l.program, l.ctx_type, "M"), vec![l.a]);
        assert_eq!(
            explicitly_containing(&l.program, l.ctx_type, "DMethod"),
            vec![l.other_d]
        );
        assert!(explicitly_containing(&l.program, l.ctx_type, "Missing").is_empty());
    }

    #[test]
    fn test_context_type_through_embeddings() {
        let mut b = ProgramBuilder::new("example.com/app", "app");
        let app = b.current_package();
        let ctx = b.package("context", "context");
        let unit = b.signature(&[], &[], false);
        let base = b.named_interface(ctx, "Context", &[("Done", unit)], &[]);
        let logger = b.named_interface(app, "LoggerContext", &[("Logger", unit)], &[base]);
        let lit = b.interface(&[], &[logger]);
        let unrelated = b.named_interface(app, "Stringer", &[("String", unit)], &[]);
        let program = b.finish();
        let base_name = QualifiedName::parse("context.Context").unwrap();

        assert!(is_context_type(&program, base, &base_name));
        assert!(is_context_type(&program, lit, &base_name));
        assert!(!is_context_type(&program, unrelated, &base_name));
    }

    #[test]
    fn test_expand_unexported_foreign_interface() {
        let mut b = ProgramBuilder::new("example.com/app", "app");
        let app = b.current_package();
        let mypkg = b.package("example.com/mypkg", "mypkg");
        let unit = b.signature(&[], &[], false);
        let l = b.named_interface(mypkg, "L", &[("LMethod", unit)], &[]);
        let n = b.named_interface(mypkg, "N", &[("NMethod", unit)], &[]);
        let j = b.named_interface(mypkg, "j", &[], &[l]);
        let k = b.named_interface(mypkg, "k", &[("M", unit)], &[n]);
        let i = b.named_interface(mypkg, "i", &[], &[j, k]);
        let program = b.finish();

        assert_eq!(
            expand_unexported(&program, i, Some(app)),
            vec![
                Nameable::Type(l),
                Nameable::Type(n),
                Nameable::InlineMethods(k)
            ]
        );
        assert_eq!(expand_unexported(&program, i, Some(mypkg)), vec![Nameable::Type(i)]);
        assert_eq!(expand_unexported(&program, l, Some(app)), vec![Nameable::Type(l)]);
    }
}
