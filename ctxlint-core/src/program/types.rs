//! Type-system queries over the arena.
//!
//! Interface satisfaction is structural: a type satisfies an interface when
//! its method set contains every method of the interface with an identical
//! signature. Named types are identical only to themselves; unnamed types
//! are compared structurally.

use std::collections::HashSet;

use super::{InterfaceMethod, ObjectKind, PackageId, Program, Type, TypeId};

/// Go-style method identity: exported names match across packages, unexported
/// names only within their declaring package.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MethodKey {
    pub name: String,
    pub package: Option<PackageId>,
}

impl MethodKey {
    pub fn new(name: &str, package: Option<PackageId>) -> Self {
        Self {
            name: name.to_string(),
            package: if is_exported(name) { None } else { package },
        }
    }
}

/// Whether an identifier is visible outside its package.
pub fn is_exported(name: &str) -> bool {
    name.chars().next().is_some_and(char::is_uppercase)
}

/// A view of an interface node.
#[derive(Debug, Clone, Copy)]
pub struct InterfaceView<'p> {
    pub methods: &'p [InterfaceMethod],
    pub embeds: &'p [TypeId],
}

impl InterfaceView<'_> {
    pub fn has_explicit_method(&self, name: &str) -> bool {
        self.methods.iter().any(|m| m.name == name)
    }

    pub fn is_empty_literal(&self) -> bool {
        self.methods.is_empty() && self.embeds.is_empty()
    }
}

/// A view of a named type's declaration.
#[derive(Debug, Clone, Copy)]
pub struct NamedView<'p> {
    pub name: &'p str,
    pub package: Option<PackageId>,
}

impl NamedView<'_> {
    pub fn is_exported(&self) -> bool {
        is_exported(self.name)
    }
}

impl Program {
    /// Follows named types down to their structural definition.
    pub fn underlying(&self, mut id: TypeId) -> TypeId {
        // Bounded so that a malformed self-referential chain cannot hang.
        for _ in 0..=self.types.len() {
            match self.ty(id) {
                Type::Named { underlying, .. } if *underlying != id => id = *underlying,
                _ => return id,
            }
        }
        id
    }

    pub fn interface_of(&self, id: TypeId) -> Option<InterfaceView<'_>> {
        match self.ty(self.underlying(id)) {
            Type::Interface { methods, embeds } => Some(InterfaceView { methods, embeds }),
            _ => None,
        }
    }

    pub fn named(&self, id: TypeId) -> Option<NamedView<'_>> {
        match self.ty(id) {
            Type::Named { name, package, .. } => Some(NamedView {
                name,
                package: *package,
            }),
            _ => None,
        }
    }

    /// The element type, if `id` is a pointer; otherwise `id` itself.
    pub fn unwrap_pointers(&self, mut id: TypeId) -> TypeId {
        while let Type::Pointer { elem } = self.ty(id) {
            id = *elem;
        }
        id
    }

    /// True if `id` is the named type `pkg_path.name`.
    pub fn type_is(&self, id: TypeId, pkg_path: &str, name: &str) -> bool {
        match self.named(id) {
            Some(named) if named.name == name => match named.package {
                Some(pkg) => self.package_info(pkg).path == pkg_path,
                None => pkg_path.is_empty(),
            },
            _ => false,
        }
    }

    /// Fully qualified name of an object: `path.Name` for package-level
    /// objects, `(path.T).M` for methods, `builtin.name` for builtins.
    pub fn qualified_name(&self, id: super::ObjectId) -> Option<String> {
        let obj = self.object(id);
        let qualify = |name: &str| match obj.package {
            Some(pkg) => format!("{}.{}", self.package_info(pkg).path, name),
            None => name.to_string(),
        };
        match &obj.kind {
            ObjectKind::Builtin => Some(format!("builtin.{}", obj.name)),
            ObjectKind::Func | ObjectKind::TypeName | ObjectKind::Const | ObjectKind::Var => {
                Some(qualify(&obj.name))
            }
            ObjectKind::Method { receiver } => {
                let recv = self.type_string(*receiver, None, true);
                Some(format!("({}).{}", recv, obj.name))
            }
            ObjectKind::Field | ObjectKind::PkgName => None,
        }
    }

    /// All methods of an interface, including those reached through
    /// embedding, deduplicated by method identity.
    pub fn interface_method_set(&self, id: TypeId) -> Vec<(MethodKey, TypeId)> {
        let mut out = Vec::new();
        let mut seen_keys = HashSet::new();
        let mut visited = HashSet::new();
        self.collect_interface_methods(id, &mut out, &mut seen_keys, &mut visited);
        out
    }

    fn collect_interface_methods(
        &self,
        id: TypeId,
        out: &mut Vec<(MethodKey, TypeId)>,
        seen_keys: &mut HashSet<MethodKey>,
        visited: &mut HashSet<TypeId>,
    ) {
        if !visited.insert(id) {
            return;
        }
        let Some(iface) = self.interface_of(id) else {
            return;
        };
        for m in iface.methods {
            let key = MethodKey::new(&m.name, m.package);
            if seen_keys.insert(key.clone()) {
                out.push((key, m.signature));
            }
        }
        for &embed in iface.embeds {
            self.collect_interface_methods(embed, out, seen_keys, visited);
        }
    }

    /// Method set of a value of type `id`.
    ///
    /// Interfaces contribute their full method set. A named type contributes
    /// its value-receiver methods; a pointer to a named type contributes all
    /// of its methods. Methods of embedded struct fields are promoted.
    pub fn method_set(&self, id: TypeId) -> Vec<(MethodKey, TypeId)> {
        if self.interface_of(id).is_some() {
            return self.interface_method_set(id);
        }
        match self.ty(id) {
            Type::Pointer { elem } => self.promoted_method_set(*elem, true),
            Type::Named { .. } | Type::Struct { .. } => self.promoted_method_set(id, false),
            _ => Vec::new(),
        }
    }

    fn declared_methods(&self, id: TypeId, with_pointer_receivers: bool) -> Vec<(MethodKey, TypeId)> {
        let Type::Named { methods, .. } = self.ty(id) else {
            return Vec::new();
        };
        methods
            .iter()
            .filter(|m| with_pointer_receivers || !m.pointer_receiver)
            .filter_map(|m| {
                let obj = self.object(m.func);
                obj.ty.map(|sig| (MethodKey::new(&obj.name, obj.package), sig))
            })
            .collect()
    }

    /// Declared methods of `id` plus those promoted through embedded fields,
    /// searched breadth-first.
    ///
    /// A shallower method hides deeper ones of the same name. Two methods of
    /// the same name at the same depth are ambiguous, so neither is in the
    /// set. Pointer-receiver methods are included when `addressable` is set
    /// or the field that leads to them is an embedded pointer.
    fn promoted_method_set(&self, id: TypeId, addressable: bool) -> Vec<(MethodKey, TypeId)> {
        let mut out = Vec::new();
        let mut hidden: HashSet<MethodKey> = HashSet::new();
        let mut seen: HashSet<TypeId> = HashSet::new();
        let mut level = vec![(id, addressable)];

        while !level.is_empty() {
            let mut found: Vec<(MethodKey, TypeId, usize)> = Vec::new();
            let mut next = Vec::new();

            for (ty, addressable) in level {
                if !seen.insert(ty) {
                    continue;
                }
                let methods = if self.interface_of(ty).is_some() {
                    self.interface_method_set(ty)
                } else {
                    self.declared_methods(ty, addressable)
                };
                for (key, sig) in methods {
                    match found.iter_mut().find(|(k, _, _)| *k == key) {
                        Some(entry) => entry.2 += 1,
                        None => found.push((key, sig, 1)),
                    }
                }

                if let Type::Struct { fields } = self.ty(self.underlying(ty)) {
                    for field in fields.iter().filter(|f| f.embedded) {
                        match self.ty(field.ty) {
                            Type::Pointer { elem } => next.push((*elem, true)),
                            _ => next.push((field.ty, addressable)),
                        }
                    }
                }
            }

            for (key, sig, count) in found {
                if hidden.insert(key.clone()) && count == 1 {
                    out.push((key, sig));
                }
            }
            level = next;
        }
        out
    }

    /// Whether `*named` satisfies the interface `iface` (which covers the
    /// case where `named` itself does).
    pub fn pointer_implements(&self, named: TypeId, iface: TypeId) -> bool {
        self.satisfies(self.promoted_method_set(named, true), iface)
    }

    /// Whether a value of type `ty` satisfies the interface `iface`.
    ///
    /// Returns false if `iface` is not an interface.
    pub fn implements(&self, ty: TypeId, iface: TypeId) -> bool {
        if ty == iface {
            return self.interface_of(iface).is_some();
        }
        self.satisfies(self.method_set(ty), iface)
    }

    fn satisfies(&self, have: Vec<(MethodKey, TypeId)>, iface: TypeId) -> bool {
        if self.interface_of(iface).is_none() {
            return false;
        }
        self.interface_method_set(iface).iter().all(|(key, sig)| {
            have.iter()
                .any(|(k, s)| k == key && self.identical(*s, *sig))
        })
    }

    /// Type identity.
    pub fn identical(&self, a: TypeId, b: TypeId) -> bool {
        if a == b {
            return true;
        }
        match (self.ty(a), self.ty(b)) {
            (Type::Named { .. }, _) | (_, Type::Named { .. }) => false,
            (Type::Basic { name: x }, Type::Basic { name: y }) => x == y,
            (Type::Pointer { elem: x }, Type::Pointer { elem: y })
            | (Type::Slice { elem: x }, Type::Slice { elem: y }) => self.identical(*x, *y),
            (Type::Array { len: lx, elem: x }, Type::Array { len: ly, elem: y }) => {
                lx == ly && self.identical(*x, *y)
            }
            (Type::Map { key: kx, value: vx }, Type::Map { key: ky, value: vy }) => {
                self.identical(*kx, *ky) && self.identical(*vx, *vy)
            }
            (
                Type::Signature {
                    params: px,
                    results: rx,
                    variadic: vx,
                },
                Type::Signature {
                    params: py,
                    results: ry,
                    variadic: vy,
                },
            ) => {
                vx == vy
                    && px.len() == py.len()
                    && rx.len() == ry.len()
                    && px.iter().zip(py).all(|(x, y)| self.identical(x.ty, y.ty))
                    && rx.iter().zip(ry).all(|(x, y)| self.identical(*x, *y))
            }
            (Type::Struct { fields: fx }, Type::Struct { fields: fy }) => {
                fx.len() == fy.len()
                    && fx.iter().zip(fy).all(|(x, y)| {
                        x.name == y.name && x.embedded == y.embedded && self.identical(x.ty, y.ty)
                    })
            }
            (Type::Interface { .. }, Type::Interface { .. }) => {
                let mx = self.interface_method_set(a);
                let my = self.interface_method_set(b);
                mx.len() == my.len()
                    && mx.iter().all(|(key, sig)| {
                        my.iter().any(|(k, s)| k == key && self.identical(*sig, *s))
                    })
            }
            _ => false,
        }
    }

    /// Renders a type.
    ///
    /// Named types from `qualifier` print bare; other named types print as
    /// `pkgname.Name`, or `path.Name` when `full_path` is set.
    pub fn type_string(&self, id: TypeId, qualifier: Option<PackageId>, full_path: bool) -> String {
        let mut out = String::new();
        self.write_type(&mut out, id, qualifier, full_path);
        out
    }

    fn write_type(&self, out: &mut String, id: TypeId, q: Option<PackageId>, full: bool) {
        match self.ty(id) {
            Type::Basic { name } => out.push_str(name),
            Type::Named { name, package, .. } => {
                if let Some(pkg) = package.filter(|p| Some(*p) != q) {
                    let info = self.package_info(pkg);
                    out.push_str(if full { &info.path } else { &info.name });
                    out.push('.');
                }
                out.push_str(name);
            }
            Type::Pointer { elem } => {
                out.push('*');
                self.write_type(out, *elem, q, full);
            }
            Type::Slice { elem } => {
                out.push_str("[]");
                self.write_type(out, *elem, q, full);
            }
            Type::Array { len, elem } => {
                out.push_str(&format!("[{}]", len));
                self.write_type(out, *elem, q, full);
            }
            Type::Map { key, value } => {
                out.push_str("map[");
                self.write_type(out, *key, q, full);
                out.push(']');
                self.write_type(out, *value, q, full);
            }
            Type::Signature { .. } => {
                out.push_str("func");
                self.write_signature(out, id, q, full);
            }
            Type::Struct { fields } => {
                out.push_str("struct{");
                for (i, f) in fields.iter().enumerate() {
                    if i > 0 {
                        out.push_str("; ");
                    }
                    if !f.embedded {
                        out.push_str(&f.name);
                        out.push(' ');
                    }
                    self.write_type(out, f.ty, q, full);
                }
                out.push('}');
            }
            Type::Interface { methods, embeds } => {
                self.write_interface_body(out, methods, embeds, q, full)
            }
        }
    }

    /// `interface{M(); pkg.Embedded}`, methods first.
    pub fn interface_literal_string(
        &self,
        methods: &[InterfaceMethod],
        embeds: &[TypeId],
        qualifier: Option<PackageId>,
    ) -> String {
        let mut out = String::new();
        self.write_interface_body(&mut out, methods, embeds, qualifier, false);
        out
    }

    fn write_interface_body(
        &self,
        out: &mut String,
        methods: &[InterfaceMethod],
        embeds: &[TypeId],
        q: Option<PackageId>,
        full: bool,
    ) {
        out.push_str("interface{");
        let mut first = true;
        for m in methods {
            if !first {
                out.push_str("; ");
            }
            first = false;
            out.push_str(&m.name);
            self.write_signature(out, m.signature, q, full);
        }
        for &e in embeds {
            if !first {
                out.push_str("; ");
            }
            first = false;
            self.write_type(out, e, q, full);
        }
        out.push('}');
    }

    /// `(params) results`, without the `func` keyword.
    fn write_signature(&self, out: &mut String, id: TypeId, q: Option<PackageId>, full: bool) {
        let Type::Signature {
            params,
            results,
            variadic,
        } = self.ty(id)
        else {
            out.push_str("()");
            return;
        };

        out.push('(');
        for (i, p) in params.iter().enumerate() {
            if i > 0 {
                out.push_str(", ");
            }
            match self.ty(p.ty) {
                Type::Slice { elem } if *variadic && i + 1 == params.len() => {
                    out.push_str("...");
                    self.write_type(out, *elem, q, full);
                }
                _ => self.write_type(out, p.ty, q, full),
            }
        }
        out.push(')');

        match results.as_slice() {
            [] => {}
            [single] => {
                out.push(' ');
                self.write_type(out, *single, q, full);
            }
            many => {
                out.push_str(" (");
                for (i, r) in many.iter().enumerate() {
                    if i > 0 {
                        out.push_str(", ");
                    }
                    self.write_type(out, *r, q, full);
                }
                out.push(')');
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::program::ProgramBuilder;

    #[test]
    fn test_exported_names() {
        assert!(is_exported("Database"));
        assert!(!is_exported("database"));
        assert!(!is_exported("_"));
        assert!(!is_exported(""));
    }

    #[test]
    fn test_unexported_method_keys_are_package_scoped() {
        let a = MethodKey::new("read", Some(PackageId(1)));
        let b = MethodKey::new("read", Some(PackageId(2)));
        assert_ne!(a, b);
        assert_eq!(
            MethodKey::new("Read", Some(PackageId(1))),
            MethodKey::new("Read", Some(PackageId(2)))
        );
    }

    #[test]
    fn test_pointer_receivers_only_in_pointer_method_set() {
        let mut b = ProgramBuilder::new("example.com/app", "app");
        let pkg = b.current_package();
        let string = b.basic("string");
        let sig = b.signature(&[], &[string], false);
        let iface = b.named_interface(pkg, "Namer", &[("Name", sig)], &[]);
        let empty = b.struct_type(&[]);
        let user = b.named(pkg, "User", empty);
        b.add_method(user, "Name", sig, true);

        let program = b.finish();
        assert!(!program.implements(user, iface));
        assert!(program.pointer_implements(user, iface));
    }

    #[test]
    fn test_embedded_interfaces_are_flattened() {
        let mut b = ProgramBuilder::new("example.com/app", "app");
        let pkg = b.current_package();
        let unit = b.signature(&[], &[], false);
        let reader = b.named_interface(pkg, "Reader", &[("Read", unit)], &[]);
        let writer = b.named_interface(pkg, "Writer", &[("Write", unit)], &[]);
        let both = b.interface(&[], &[reader, writer]);
        let program = b.finish();

        assert_eq!(program.interface_method_set(both).len(), 2);
        assert!(program.implements(both, reader));
        assert!(program.implements(both, writer));
        assert!(!program.implements(reader, both));
    }

    #[test]
    fn test_structurally_identical_literals() {
        let mut b = ProgramBuilder::new("example.com/app", "app");
        let pkg = b.current_package();
        let unit = b.signature(&[], &[], false);
        let reader = b.named_interface(pkg, "Reader", &[("Read", unit)], &[]);
        let first = b.interface(&[], &[reader]);
        let second = b.interface(&[], &[reader]);
        let program = b.finish();

        assert_ne!(first, second);
        assert!(program.identical(first, second));
        assert!(!program.identical(first, reader));
    }

    #[test]
    fn test_type_string_qualifies_foreign_names() {
        let mut b = ProgramBuilder::new("example.com/app", "app");
        let pkg = b.current_package();
        let ctx = b.package("context", "context");
        let unit = b.signature(&[], &[], false);
        let base = b.named_interface(ctx, "Context", &[("Done", unit)], &[]);
        let logger = b.named_interface(pkg, "Logger", &[("Log", unit)], &[]);
        let lit = b.interface(&[], &[base, logger]);
        let program = b.finish();

        assert_eq!(program.type_string(lit, Some(pkg), false), "interface{context.Context; Logger}");
        assert_eq!(
            program.type_string(logger, None, true),
            "example.com/app.Logger"
        );
        assert!(program.type_is(base, "context", "Context"));
        assert!(!program.type_is(logger, "context", "Context"));
    }

    #[test]
    fn test_embedded_struct_methods_are_promoted() {
        let mut b = ProgramBuilder::new("example.com/app", "app");
        let pkg = b.current_package();
        let unit = b.signature(&[], &[], false);
        let iface = b.named_interface(pkg, "Runner", &[("Name", unit), ("Run", unit)], &[]);

        let empty = b.struct_type(&[]);
        let base = b.named(pkg, "Base", empty);
        b.add_method(base, "Name", unit, false);
        let by_value = b.struct_embedding(&[], &[base]);
        let t = b.named(pkg, "T", by_value);
        b.add_method(t, "Run", unit, true);

        let program = b.finish();
        assert!(program.pointer_implements(t, iface));
        assert!(!program.implements(t, iface));
    }

    #[test]
    fn test_pointer_receivers_promote_through_value_embedding_only_when_addressable() {
        let mut b = ProgramBuilder::new("example.com/app", "app");
        let pkg = b.current_package();
        let unit = b.signature(&[], &[], false);
        let iface = b.named_interface(pkg, "Namer", &[("Name", unit)], &[]);

        let empty = b.struct_type(&[]);
        let base = b.named(pkg, "Base", empty);
        b.add_method(base, "Name", unit, true);

        let by_value = b.struct_embedding(&[], &[base]);
        let value_holder = b.named(pkg, "ValueHolder", by_value);
        let base_ptr = b.pointer(base);
        let by_pointer = b.struct_embedding(&[], &[base_ptr]);
        let pointer_holder = b.named(pkg, "PointerHolder", by_pointer);

        let program = b.finish();
        assert!(!program.implements(value_holder, iface));
        assert!(program.pointer_implements(value_holder, iface));
        assert!(program.implements(pointer_holder, iface));
    }

    #[test]
    fn test_shallower_method_wins_and_same_depth_is_ambiguous() {
        let mut b = ProgramBuilder::new("example.com/app", "app");
        let pkg = b.current_package();
        let unit = b.signature(&[], &[], false);
        let string = b.basic("string");
        let named_sig = b.signature(&[], &[string], false);
        let iface = b.named_interface(pkg, "Namer", &[("Name", unit)], &[]);

        let empty = b.struct_type(&[]);
        let left = b.named(pkg, "Left", empty);
        b.add_method(left, "Name", unit, false);
        let right = b.named(pkg, "Right", empty);
        b.add_method(right, "Name", unit, false);
        let both = b.struct_embedding(&[], &[left, right]);
        let ambiguous = b.named(pkg, "Ambiguous", both);

        // The outer Name has the wrong signature and hides Left.Name.
        let one = b.struct_embedding(&[], &[left]);
        let shadowed = b.named(pkg, "Shadowed", one);
        b.add_method(shadowed, "Name", named_sig, false);

        let program = b.finish();
        assert!(!program.pointer_implements(ambiguous, iface));
        assert!(!program.pointer_implements(shadowed, iface));
    }

    #[test]
    fn test_self_embedding_through_pointer_terminates() {
        let mut b = ProgramBuilder::new("example.com/app", "app");
        let pkg = b.current_package();
        let unit = b.signature(&[], &[], false);
        let iface = b.named_interface(pkg, "Namer", &[("Name", unit)], &[]);
        let placeholder = b.struct_type(&[]);
        let node = b.named(pkg, "Node", placeholder);
        let node_ptr = b.pointer(node);
        let recursive = b.struct_embedding(&[], &[node_ptr]);
        let mut program = b.finish();
        if let Type::Named { underlying, .. } = &mut program.types[node.index()] {
            *underlying = recursive;
        }

        assert!(!program.pointer_implements(node, iface));
        assert!(program.method_set(node_ptr).is_empty());
    }
}
