//! Resolved-program model consumed by the analysis pass.
//!
//! A front end (the host's type checker) hands the analyzer one package at a
//! time: its parsed files, plus a symbol table and a type arena that answer
//! "what is the static type of this expression" and "what does this
//! identifier refer to". Everything is addressed by small integer handles, so
//! the whole program can be dumped to JSON and loaded back unchanged.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐
//! │     mod.rs      │   │     ast.rs      │   │    types.rs     │
//! │  ─────────────  │   │  ─────────────  │   │  ─────────────  │
//! │  arenas, ids,   │   │  declarations,  │   │  identity,      │
//! │  objects, types │   │  stmts, exprs   │   │  method sets,   │
//! │                 │   │                 │   │  implements     │
//! └────────┬────────┘   └────────┬────────┘   └────────┬────────┘
//!          └──────────────┬──────┴─────────────────────┘
//!                         ▼
//!          ┌──────────────────────────────┐
//!          │ visit.rs / load.rs / builder │
//!          └──────────────────────────────┘
//! ```

pub mod ast;
pub mod builder;
pub mod load;
pub mod types;
pub mod visit;

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{CtxlintError, CtxlintResult};

pub use ast::{
    Binding, Block, CaseClause, Decl, DeclKind, Expr, ExprKind, Field, FuncDecl, FuncType,
    GenDecl, Ident, SourceFile, Spec, Stmt,
};
pub use builder::ProgramBuilder;
pub use load::{gather_program_files, load_program, parse_program};
pub use types::MethodKey;
pub use visit::Visit;

macro_rules! handle {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub u32);

        impl $name {
            pub fn index(self) -> usize {
                self.0 as usize
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({})", stringify!($name), self.0)
            }
        }
    };
}

handle!(
    /// Index into [`Program::types`].
    TypeId
);
handle!(
    /// Index into [`Program::objects`].
    ObjectId
);
handle!(
    /// Index into [`Program::packages`].
    PackageId
);
handle!(
    /// Index into [`Program::files`].
    FileId
);

/// A package known to the program (the analyzed one, or a dependency).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Package {
    /// Import path, e.g. `github.com/acme/app/database`
    pub path: String,
    /// Package name as used in qualified identifiers, e.g. `database`
    pub name: String,
}

/// Source position (1-indexed line and column).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub struct Position {
    pub file: FileId,
    pub line: u32,
    pub column: u32,
}

/// A function parameter inside a signature.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Param {
    pub ty: TypeId,
    /// The declaring variable, when the signature belongs to a declaration
    /// or function literal in this package.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub object: Option<ObjectId>,
}

/// A method declared explicitly in an interface body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InterfaceMethod {
    pub name: String,
    /// Declaring package; only relevant for unexported method names.
    #[serde(default)]
    pub package: Option<PackageId>,
    /// Always a [`Type::Signature`].
    pub signature: TypeId,
}

/// A method attached to a named (non-interface) type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MethodDecl {
    /// The [`ObjectKind::Method`] object; its type is the signature.
    pub func: ObjectId,
    /// `func (t *T) M()` rather than `func (t T) M()`
    pub pointer_receiver: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StructField {
    pub name: String,
    pub ty: TypeId,
    #[serde(default)]
    pub embedded: bool,
}

/// A node of the type arena.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Type {
    Basic {
        name: String,
    },
    Named {
        name: String,
        package: Option<PackageId>,
        underlying: TypeId,
        #[serde(default)]
        methods: Vec<MethodDecl>,
    },
    Pointer {
        elem: TypeId,
    },
    Slice {
        elem: TypeId,
    },
    Array {
        len: u64,
        elem: TypeId,
    },
    Map {
        key: TypeId,
        value: TypeId,
    },
    Signature {
        params: Vec<Param>,
        #[serde(default)]
        results: Vec<TypeId>,
        #[serde(default)]
        variadic: bool,
    },
    Struct {
        fields: Vec<StructField>,
    },
    Interface {
        #[serde(default)]
        methods: Vec<InterfaceMethod>,
        #[serde(default)]
        embeds: Vec<TypeId>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ObjectKind {
    /// Local variable, parameter, result, or package-level var
    Var,
    /// Struct field
    Field,
    TypeName,
    Func,
    Method {
        receiver: TypeId,
    },
    Const,
    PkgName,
    Builtin,
}

/// An entry of the symbol table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Object {
    pub name: String,
    #[serde(flatten)]
    pub kind: ObjectKind,
    #[serde(default)]
    pub package: Option<PackageId>,
    /// Absent for package names and builtins.
    #[serde(default)]
    pub ty: Option<TypeId>,
    #[serde(default)]
    pub pos: Option<Position>,
}

impl Object {
    pub fn is_var(&self) -> bool {
        matches!(self.kind, ObjectKind::Var | ObjectKind::Field)
    }
}

/// One type-checked compilation unit.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Program {
    /// The package under analysis.
    pub package: PackageId,
    pub packages: Vec<Package>,
    pub types: Vec<Type>,
    pub objects: Vec<Object>,
    pub files: Vec<SourceFile>,
}

impl Program {
    /// Look up a type node.
    ///
    /// Handles are checked once by [`Program::validate`]; after that, indexing
    /// cannot fail.
    pub fn ty(&self, id: TypeId) -> &Type {
        &self.types[id.index()]
    }

    pub fn object(&self, id: ObjectId) -> &Object {
        &self.objects[id.index()]
    }

    pub fn package_info(&self, id: PackageId) -> &Package {
        &self.packages[id.index()]
    }

    pub fn file(&self, id: FileId) -> Option<&SourceFile> {
        self.files.iter().find(|f| f.id == id)
    }

    /// File name of a position, or `""` if the file is not part of this unit.
    pub fn file_name(&self, pos: &Position) -> &str {
        self.file(pos.file).map(|f| f.name.as_str()).unwrap_or("")
    }

    /// Checks that every handle in the arenas and the syntax trees points at
    /// an existing entry, and that no type is defined in terms of itself.
    ///
    /// A violation means the front end produced a broken program; the pass
    /// refuses to run on it.
    pub fn validate(&self) -> CtxlintResult<()> {
        if self.package.index() >= self.packages.len() {
            return Err(CtxlintError::invalid_program(format!(
                "analyzed package {} is not in the package table",
                self.package
            )));
        }

        let mut checker = HandleChecker {
            program: self,
            error: None,
        };

        for (i, ty) in self.types.iter().enumerate() {
            checker.check_type_node(TypeId(i as u32), ty);
        }
        for obj in &self.objects {
            checker.check_object(obj);
        }
        for file in &self.files {
            checker.visit_file(file);
        }

        if let Some(message) = checker.error {
            return Err(CtxlintError::invalid_program(message));
        }
        self.check_type_cycles()
    }

    /// Rejects type graphs the queries cannot walk: a named type whose
    /// underlying chain never reaches a structural type, a type that contains
    /// itself without going through a named type, and an interface that
    /// embeds itself.
    fn check_type_cycles(&self) -> CtxlintResult<()> {
        for (i, ty) in self.types.iter().enumerate() {
            let id = TypeId(i as u32);
            if matches!(ty, Type::Named { .. })
                && matches!(self.ty(self.underlying(id)), Type::Named { .. })
            {
                return Err(CtxlintError::invalid_program(format!(
                    "named type {} has no underlying type",
                    id
                )));
            }
        }

        if let Some(id) = self.find_cycle(|id| self.structural_children(id)) {
            return Err(CtxlintError::invalid_program(format!(
                "type {} contains itself without a type name",
                id
            )));
        }

        let embeds = |id| {
            self.interface_of(id)
                .map(|iface| iface.embeds.to_vec())
                .unwrap_or_default()
        };
        if let Some(id) = self.find_cycle(embeds) {
            return Err(CtxlintError::invalid_program(format!(
                "interface {} embeds itself",
                id
            )));
        }
        Ok(())
    }

    /// Component types of an unnamed type; named types are opaque.
    fn structural_children(&self, id: TypeId) -> Vec<TypeId> {
        match self.ty(id) {
            Type::Basic { .. } | Type::Named { .. } => Vec::new(),
            Type::Pointer { elem } | Type::Slice { elem } | Type::Array { elem, .. } => {
                vec![*elem]
            }
            Type::Map { key, value } => vec![*key, *value],
            Type::Signature {
                params, results, ..
            } => params.iter().map(|p| p.ty).chain(results.iter().copied()).collect(),
            Type::Struct { fields } => fields.iter().map(|f| f.ty).collect(),
            Type::Interface { methods, embeds } => methods
                .iter()
                .map(|m| m.signature)
                .chain(embeds.iter().copied())
                .collect(),
        }
    }

    /// Iterative depth-first search; returns a node on a cycle, if any.
    fn find_cycle(&self, edges: impl Fn(TypeId) -> Vec<TypeId>) -> Option<TypeId> {
        #[derive(Clone, Copy, PartialEq)]
        enum Mark {
            Unvisited,
            OnPath,
            Done,
        }

        let mut marks = vec![Mark::Unvisited; self.types.len()];
        for root in 0..self.types.len() {
            if marks[root] != Mark::Unvisited {
                continue;
            }
            marks[root] = Mark::OnPath;
            let root = TypeId(root as u32);
            let mut stack = vec![(root, edges(root), 0usize)];

            while let Some((node, children, next)) = stack.last_mut() {
                let Some(&child) = children.get(*next) else {
                    marks[node.index()] = Mark::Done;
                    stack.pop();
                    continue;
                };
                *next += 1;
                match marks[child.index()] {
                    Mark::OnPath => return Some(child),
                    Mark::Unvisited => {
                        marks[child.index()] = Mark::OnPath;
                        stack.push((child, edges(child), 0));
                    }
                    Mark::Done => {}
                }
            }
        }
        None
    }
}

/// Records the first dangling handle found.
struct HandleChecker<'p> {
    program: &'p Program,
    error: Option<String>,
}

impl HandleChecker<'_> {
    fn fail(&mut self, message: String) {
        if self.error.is_none() {
            self.error = Some(message);
        }
    }

    fn ty(&mut self, id: TypeId, context: &str) {
        if id.index() >= self.program.types.len() {
            self.fail(format!("{} references missing type {}", context, id));
        }
    }

    fn obj(&mut self, id: ObjectId, context: &str) {
        if id.index() >= self.program.objects.len() {
            self.fail(format!("{} references missing object {}", context, id));
        }
    }

    fn pkg(&mut self, id: Option<PackageId>, context: &str) {
        if let Some(id) = id {
            if id.index() >= self.program.packages.len() {
                self.fail(format!("{} references missing package {}", context, id));
            }
        }
    }

    fn check_type_node(&mut self, id: TypeId, ty: &Type) {
        let context = id.to_string();
        match ty {
            Type::Basic { .. } => {}
            Type::Named {
                package,
                underlying,
                methods,
                ..
            } => {
                self.pkg(*package, &context);
                self.ty(*underlying, &context);
                for m in methods {
                    self.obj(m.func, &context);
                }
            }
            Type::Pointer { elem } | Type::Slice { elem } | Type::Array { elem, .. } => {
                self.ty(*elem, &context)
            }
            Type::Map { key, value } => {
                self.ty(*key, &context);
                self.ty(*value, &context);
            }
            Type::Signature {
                params, results, ..
            } => {
                for p in params {
                    self.ty(p.ty, &context);
                    if let Some(obj) = p.object {
                        self.obj(obj, &context);
                    }
                }
                for r in results {
                    self.ty(*r, &context);
                }
            }
            Type::Struct { fields } => {
                for f in fields {
                    self.ty(f.ty, &context);
                }
            }
            Type::Interface { methods, embeds } => {
                for m in methods {
                    self.pkg(m.package, &context);
                    self.ty(m.signature, &context);
                }
                for e in embeds {
                    self.ty(*e, &context);
                }
            }
        }
    }

    fn check_object(&mut self, obj: &Object) {
        let context = format!("object `{}`", obj.name);
        self.pkg(obj.package, &context);
        if let Some(ty) = obj.ty {
            self.ty(ty, &context);
        }
        if let ObjectKind::Method { receiver } = obj.kind {
            self.ty(receiver, &context);
        }
    }
}

impl<'ast> Visit<'ast> for HandleChecker<'_> {
    fn visit_ident(&mut self, ident: &'ast Ident) {
        if let Some(binding) = &ident.binding {
            self.obj(binding.object(), &format!("identifier `{}`", ident.name));
        }
    }

    fn visit_expr(&mut self, expr: &'ast Expr) {
        if let Some(ty) = expr.ty {
            self.ty(ty, "expression");
        }
        visit::walk_expr(self, expr);
    }
}
