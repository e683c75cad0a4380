//! Turns usage records into problems and diagnostics.

use crate::config::AnalyzerSettings;
use crate::program::{ObjectId, PackageId, Program, Type, TypeId};
use crate::report::{Diagnostic, ProblemKind};

use super::graph::{explicit_composition, explicitly_containing, expand_unexported, leaf_groups, Nameable};
use super::tracker::{Tracker, UsageRecord};

/// What is wrong with one tracked variable.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Problems {
    /// No leaf group of the declared type was used.
    pub all_unused: bool,
    /// Leaf groups of the declared type without a recorded use.
    pub unused: Vec<TypeId>,
    /// Interfaces the variable was used as without asking for them by name.
    pub unrequested: Vec<TypeId>,
    /// The variable is the context of a memoized function.
    pub cached: bool,
}

impl Problems {
    /// The diagnostic to emit, if any: all-unused first, then unrequested,
    /// then unused.
    ///
    /// A cached variable that looks entirely idle is left alone; the cache
    /// may need its capabilities for key derivation.
    pub fn primary(&self) -> Option<(ProblemKind, &[TypeId])> {
        if self.all_unused {
            if self.cached {
                return (!self.unrequested.is_empty())
                    .then(|| (ProblemKind::Unrequested, self.unrequested.as_slice()));
            }
            return Some((ProblemKind::AllUnused, [].as_slice()));
        }
        if !self.unrequested.is_empty() {
            return Some((ProblemKind::Unrequested, self.unrequested.as_slice()));
        }
        if !self.unused.is_empty() {
            return Some((ProblemKind::Unused, self.unused.as_slice()));
        }
        None
    }
}

/// Evaluates one variable against its usage record.
pub struct Evaluator<'a> {
    program: &'a Program,
    record: &'a UsageRecord,
    declared: TypeId,
    package: Option<PackageId>,
    requested: Vec<TypeId>,
}

impl<'a> Evaluator<'a> {
    /// `None` if the object has no type.
    pub fn new(program: &'a Program, object: ObjectId, record: &'a UsageRecord) -> Option<Self> {
        let obj = program.object(object);
        let declared = obj.ty?;
        Some(Self {
            program,
            record,
            declared,
            package: obj.package,
            requested: explicit_composition(program, declared, obj.package),
        })
    }

    /// Whether the leaf group `leaf` was used: the variable was used as an
    /// interface that implements it, or one of its own methods was called.
    pub fn interface_was_used(&self, leaf: TypeId) -> bool {
        let Some(iface) = self.program.interface_of(leaf) else {
            return true;
        };
        self.record
            .interface_uses
            .iter()
            .any(|&used| self.program.implements(used, leaf))
            || self
                .record
                .method_uses
                .iter()
                .any(|m| iface.has_explicit_method(m))
    }

    /// Whether `ty` counts as asked for by the variable's declared type.
    pub fn interface_was_requested(&self, ty: TypeId) -> bool {
        // Reached through a cast the declared type doesn't satisfy.
        if self.program.interface_of(ty).is_some() && !self.program.implements(self.declared, ty) {
            return true;
        }

        // Inline interfaces with their own methods are not checked.
        if let Type::Interface { methods, .. } = self.program.ty(ty) {
            if !methods.is_empty() {
                return true;
            }
        }

        if self.requested.contains(&ty) {
            return true;
        }

        // Asking for every part of a named interface is as good as asking
        // for the interface. Parts are computed from its home package.
        if let Some(named) = self.program.named(ty) {
            let parts = explicit_composition(self.program, ty, named.package);
            let has_parts = parts.len() > 1 || parts.first().is_some_and(|&p| p != ty);
            if has_parts {
                return parts
                    .iter()
                    .filter(|&&p| p != ty)
                    .all(|&p| self.interface_was_requested(p));
            }
        }

        false
    }

    pub fn method_was_requested(&self, method: &str) -> bool {
        explicitly_containing(self.program, self.declared, method)
            .into_iter()
            .any(|ty| self.interface_was_requested(ty))
    }

    pub fn problems(&self) -> Problems {
        let leaves = leaf_groups(self.program, self.declared);
        let unused: Vec<TypeId> = leaves
            .iter()
            .copied()
            .filter(|&leaf| !self.interface_was_used(leaf))
            .collect();

        let mut unrequested = Vec::new();
        for &used in &self.record.interface_uses {
            for part in explicit_composition(self.program, used, self.package) {
                if !self.interface_was_requested(part) {
                    unrequested.push(part);
                }
            }
        }
        for method in &self.record.method_uses {
            if !self.method_was_requested(method) {
                unrequested.extend(explicitly_containing(self.program, self.declared, method));
            }
        }

        Problems {
            all_unused: !leaves.is_empty() && unused.len() == leaves.len(),
            unused,
            unrequested,
            cached: self.record.cached,
        }
    }
}

/// `Name` for types of `pkg`, `pkgname.Name` for other named types, the
/// rendered type otherwise.
pub fn short_type_name(program: &Program, entry: &Nameable, pkg: Option<PackageId>) -> String {
    match entry {
        Nameable::Type(ty) => match program.named(*ty) {
            Some(named) => match named.package {
                Some(p) if Some(p) == pkg => named.name.to_string(),
                Some(p) => format!("{}.{}", program.package_info(p).name, named.name),
                None => named.name.to_string(),
            },
            None => program.type_string(*ty, pkg, false),
        },
        Nameable::InlineMethods(ty) => match program.interface_of(*ty) {
            Some(iface) => program.interface_literal_string(iface.methods, &[], pkg),
            None => program.type_string(*ty, pkg, false),
        },
    }
}

/// Display names for a list of interfaces: expanded where `pkg` cannot
/// name them, sorted, deduplicated.
pub fn format_type_list(program: &Program, types: &[TypeId], pkg: Option<PackageId>) -> Vec<String> {
    let mut names: Vec<String> = types
        .iter()
        .flat_map(|&ty| expand_unexported(program, ty, pkg))
        .map(|entry| short_type_name(program, &entry, pkg))
        .collect();
    names.sort();
    names.dedup();
    names
}

/// Diagnostics for every active tracked variable, in source order.
///
/// Variables declared in test files are skipped unless `include_tests`.
pub fn report(
    program: &Program,
    settings: &AnalyzerSettings,
    tracker: &Tracker,
    include_tests: bool,
) -> Vec<Diagnostic> {
    let pkg = Some(program.package);
    let mut diagnostics = Vec::new();

    for (handle, var) in tracker.active() {
        let obj = program.object(var.object);
        // Without a position there is no file to blame or exempt.
        let (file, line, column) = match &obj.pos {
            Some(pos) => (program.file_name(pos), pos.line, pos.column),
            None => ("", 0, 0),
        };
        if !include_tests && settings.is_test_file(file) {
            continue;
        }

        let Some(evaluator) = Evaluator::new(program, var.object, tracker.record(handle)) else {
            continue;
        };
        let problems = evaluator.problems();
        let Some((kind, types)) = problems.primary() else {
            continue;
        };

        let interfaces = format_type_list(program, types, pkg);
        tracing::trace!(variable = %obj.name, kind = %kind, "problem");
        diagnostics.push(Diagnostic::new(
            kind,
            file,
            line,
            column,
            &obj.name,
            interfaces,
        ));
    }

    diagnostics.sort_by(|a, b| {
        (a.file.as_str(), a.line, a.column).cmp(&(b.file.as_str(), b.line, b.column))
    });
    diagnostics
}
