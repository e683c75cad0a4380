//! Programmatic construction of resolved programs.
//!
//! Front ends that run in-process can build the IR directly instead of going
//! through JSON; the test suites use it to describe small packages.
//!
//! ```rust,ignore
//! let mut b = ProgramBuilder::new("example.com/app", "app");
//! b.file("thing.go");
//! let pkg = b.current_package();
//! let unit = b.signature(&[], &[], false);
//! let logger = b.named_interface(pkg, "LoggerContext", &[("Logger", unit)], &[base]);
//! let ctx = b.var("ctx", logger);
//! let call = b.method_call(b.use_ident(ctx), "Logger", unit);
//! b.func_decl("DoTheThing", &[ctx], &[], vec![Stmt::Expr { expr: call }]);
//! let program = b.finish();
//! ```

use std::collections::HashMap;

use super::ast::*;
use super::{
    FileId, InterfaceMethod, MethodDecl, Object, ObjectId, ObjectKind, Package, PackageId, Param,
    Position, Program, StructField, Type, TypeId,
};

pub struct ProgramBuilder {
    program: Program,
    current_file: Option<FileId>,
    next_line: u32,
    type_names: HashMap<TypeId, ObjectId>,
}

impl ProgramBuilder {
    /// Start a program whose analyzed package is `path` (named `name`).
    pub fn new(path: &str, name: &str) -> Self {
        let mut builder = Self {
            program: Program::default(),
            current_file: None,
            next_line: 1,
            type_names: HashMap::new(),
        };
        builder.program.package = builder.package(path, name);
        builder
    }

    pub fn current_package(&self) -> PackageId {
        self.program.package
    }

    /// Register a package (returns the existing handle for a known path).
    pub fn package(&mut self, path: &str, name: &str) -> PackageId {
        if let Some(i) = self.program.packages.iter().position(|p| p.path == path) {
            return PackageId(i as u32);
        }
        self.program.packages.push(Package {
            path: path.to_string(),
            name: name.to_string(),
        });
        PackageId(self.program.packages.len() as u32 - 1)
    }

    /// Start a new source file; subsequent objects and declarations go there.
    pub fn file(&mut self, name: &str) -> FileId {
        let id = FileId(self.program.files.len() as u32);
        self.program.files.push(SourceFile {
            id,
            name: name.to_string(),
            decls: Vec::new(),
        });
        self.current_file = Some(id);
        self.next_line = 1;
        id
    }

    fn ensure_file(&mut self) -> FileId {
        match self.current_file {
            Some(id) => id,
            None => self.file("main.go"),
        }
    }

    fn next_pos(&mut self) -> Position {
        let file = self.ensure_file();
        let pos = Position {
            file,
            line: self.next_line,
            column: 1,
        };
        self.next_line += 1;
        pos
    }

    // ------------------------------------------------------------------
    // Types
    // ------------------------------------------------------------------

    pub fn add_type(&mut self, ty: Type) -> TypeId {
        self.program.types.push(ty);
        TypeId(self.program.types.len() as u32 - 1)
    }

    /// A predeclared type such as `string`; reused if already present.
    pub fn basic(&mut self, name: &str) -> TypeId {
        let existing = self
            .program
            .types
            .iter()
            .position(|t| matches!(t, Type::Basic { name: n } if n == name));
        match existing {
            Some(i) => TypeId(i as u32),
            None => self.add_type(Type::Basic {
                name: name.to_string(),
            }),
        }
    }

    pub fn pointer(&mut self, elem: TypeId) -> TypeId {
        self.add_type(Type::Pointer { elem })
    }

    pub fn slice(&mut self, elem: TypeId) -> TypeId {
        self.add_type(Type::Slice { elem })
    }

    /// An unbound signature. For variadic signatures the last parameter must
    /// be a slice type.
    pub fn signature(&mut self, params: &[TypeId], results: &[TypeId], variadic: bool) -> TypeId {
        self.add_type(Type::Signature {
            params: params
                .iter()
                .map(|&ty| Param { ty, object: None })
                .collect(),
            results: results.to_vec(),
            variadic,
        })
    }

    /// An interface literal declared in the analyzed package.
    pub fn interface(&mut self, methods: &[(&str, TypeId)], embeds: &[TypeId]) -> TypeId {
        let pkg = self.current_package();
        self.interface_in(pkg, methods, embeds)
    }

    fn interface_in(
        &mut self,
        pkg: PackageId,
        methods: &[(&str, TypeId)],
        embeds: &[TypeId],
    ) -> TypeId {
        self.add_type(Type::Interface {
            methods: methods
                .iter()
                .map(|(name, sig)| InterfaceMethod {
                    name: name.to_string(),
                    package: Some(pkg),
                    signature: *sig,
                })
                .collect(),
            embeds: embeds.to_vec(),
        })
    }

    pub fn struct_type(&mut self, fields: &[(&str, TypeId)]) -> TypeId {
        self.add_type(Type::Struct {
            fields: fields
                .iter()
                .map(|(name, ty)| StructField {
                    name: name.to_string(),
                    ty: *ty,
                    embedded: false,
                })
                .collect(),
        })
    }

    /// A struct with named fields followed by embedded ones (`struct { S; *P }`).
    pub fn struct_embedding(&mut self, fields: &[(&str, TypeId)], embeds: &[TypeId]) -> TypeId {
        let mut all: Vec<StructField> = fields
            .iter()
            .map(|(name, ty)| StructField {
                name: name.to_string(),
                ty: *ty,
                embedded: false,
            })
            .collect();
        for &ty in embeds {
            let base = self.program.unwrap_pointers(ty);
            let name = match &self.program.types[base.index()] {
                Type::Named { name, .. } | Type::Basic { name } => name.clone(),
                _ => String::new(),
            };
            all.push(StructField {
                name,
                ty,
                embedded: true,
            });
        }
        self.add_type(Type::Struct { fields: all })
    }

    /// A named type plus its type-name object.
    pub fn named(&mut self, pkg: PackageId, name: &str, underlying: TypeId) -> TypeId {
        let id = self.add_type(Type::Named {
            name: name.to_string(),
            package: Some(pkg),
            underlying,
            methods: Vec::new(),
        });
        let pos = (pkg == self.current_package()).then(|| self.next_pos());
        let obj = self.add_object(Object {
            name: name.to_string(),
            kind: ObjectKind::TypeName,
            package: Some(pkg),
            ty: Some(id),
            pos,
        });
        self.type_names.insert(id, obj);
        id
    }

    pub fn named_interface(
        &mut self,
        pkg: PackageId,
        name: &str,
        methods: &[(&str, TypeId)],
        embeds: &[TypeId],
    ) -> TypeId {
        let iface = self.interface_in(pkg, methods, embeds);
        self.named(pkg, name, iface)
    }

    /// Attach a method (without a body) to a named type.
    pub fn add_method(
        &mut self,
        named: TypeId,
        name: &str,
        sig: TypeId,
        pointer_receiver: bool,
    ) -> ObjectId {
        let package = match &self.program.types[named.index()] {
            Type::Named { package, .. } => *package,
            _ => None,
        };
        let func = self.add_object(Object {
            name: name.to_string(),
            kind: ObjectKind::Method { receiver: named },
            package,
            ty: Some(sig),
            pos: None,
        });
        if let Type::Named { methods, .. } = &mut self.program.types[named.index()] {
            methods.push(MethodDecl {
                func,
                pointer_receiver,
            });
        }
        func
    }

    // ------------------------------------------------------------------
    // Objects
    // ------------------------------------------------------------------

    pub fn add_object(&mut self, obj: Object) -> ObjectId {
        self.program.objects.push(obj);
        ObjectId(self.program.objects.len() as u32 - 1)
    }

    /// A variable (parameter or local) declared on the next line of the
    /// current file.
    pub fn var(&mut self, name: &str, ty: TypeId) -> ObjectId {
        let pos = self.next_pos();
        let package = Some(self.current_package());
        self.add_object(Object {
            name: name.to_string(),
            kind: ObjectKind::Var,
            package,
            ty: Some(ty),
            pos: Some(pos),
        })
    }

    /// A function declared in some package (usually a dependency).
    pub fn func_object(&mut self, pkg: PackageId, name: &str, sig: TypeId) -> ObjectId {
        self.add_object(Object {
            name: name.to_string(),
            kind: ObjectKind::Func,
            package: Some(pkg),
            ty: Some(sig),
            pos: None,
        })
    }

    pub fn builtin(&mut self, name: &str) -> ObjectId {
        self.add_object(Object {
            name: name.to_string(),
            kind: ObjectKind::Builtin,
            package: None,
            ty: None,
            pos: None,
        })
    }

    /// The signature of a function whose parameters are the given variables.
    pub fn bound_signature(&mut self, params: &[ObjectId], results: &[TypeId]) -> TypeId {
        let params = params
            .iter()
            .map(|&p| Param {
                ty: self.object_type(p),
                object: Some(p),
            })
            .collect();
        self.add_type(Type::Signature {
            params,
            results: results.to_vec(),
            variadic: false,
        })
    }

    /// The object's type; an untyped object gets the `invalid` basic type,
    /// as a type checker reports for declarations it could not resolve.
    fn object_type(&mut self, id: ObjectId) -> TypeId {
        match self.program.objects[id.index()].ty {
            Some(ty) => ty,
            None => self.basic("invalid"),
        }
    }

    // ------------------------------------------------------------------
    // Expressions
    // ------------------------------------------------------------------

    /// The declaring occurrence of an object.
    pub fn def_ident(&self, obj: ObjectId) -> Ident {
        let o = &self.program.objects[obj.index()];
        Ident {
            name: o.name.clone(),
            pos: o.pos.unwrap_or_default(),
            binding: Some(Binding::Def(obj)),
        }
    }

    /// A referring occurrence of an object, typed as the object.
    pub fn use_ident(&self, obj: ObjectId) -> Expr {
        let o = &self.program.objects[obj.index()];
        Expr::new(
            ExprKind::Ident {
                ident: Ident {
                    name: o.name.clone(),
                    pos: Position::default(),
                    binding: Some(Binding::Use(obj)),
                },
            },
            o.ty,
        )
    }

    /// A type expression denoting `ty`.
    pub fn type_expr(&self, ty: TypeId) -> Expr {
        let kind = match &self.program.types[ty.index()] {
            Type::Named { name, .. } | Type::Basic { name } => ExprKind::Ident {
                ident: Ident {
                    name: name.clone(),
                    pos: Position::default(),
                    binding: self.type_names.get(&ty).map(|&o| Binding::Use(o)),
                },
            },
            Type::Pointer { elem } => ExprKind::Star {
                x: Box::new(self.type_expr(*elem)),
            },
            Type::Slice { elem } => ExprKind::ArrayType {
                len: None,
                elem: Box::new(self.type_expr(*elem)),
            },
            Type::Array { elem, .. } => ExprKind::ArrayType {
                len: Some(Box::new(Expr::new(
                    ExprKind::Lit {
                        value: "N".to_string(),
                    },
                    None,
                ))),
                elem: Box::new(self.type_expr(*elem)),
            },
            Type::Map { key, value } => ExprKind::MapType {
                key: Box::new(self.type_expr(*key)),
                value: Box::new(self.type_expr(*value)),
            },
            Type::Signature { .. } => ExprKind::FuncType {
                sig: self.func_type_of(ty),
            },
            Type::Struct { fields } => ExprKind::StructType {
                fields: fields
                    .iter()
                    .map(|f| Field {
                        names: if f.embedded {
                            Vec::new()
                        } else {
                            vec![Ident {
                                name: f.name.clone(),
                                pos: Position::default(),
                                binding: None,
                            }]
                        },
                        ty: self.type_expr(f.ty),
                    })
                    .collect(),
            },
            Type::Interface { methods, embeds } => {
                let mut members: Vec<Field> = methods
                    .iter()
                    .map(|m| Field {
                        names: vec![Ident {
                            name: m.name.clone(),
                            pos: Position::default(),
                            binding: None,
                        }],
                        ty: Expr::new(
                            ExprKind::FuncType {
                                sig: self.func_type_of(m.signature),
                            },
                            Some(m.signature),
                        ),
                    })
                    .collect();
                members.extend(embeds.iter().map(|&e| Field {
                    names: Vec::new(),
                    ty: self.type_expr(e),
                }));
                ExprKind::InterfaceType { members }
            }
        };
        Expr::new(kind, Some(ty))
    }

    /// Unnamed parameter fields for a signature type.
    fn func_type_of(&self, sig: TypeId) -> FuncType {
        match &self.program.types[sig.index()] {
            Type::Signature {
                params, results, ..
            } => FuncType {
                params: params
                    .iter()
                    .map(|p| Field {
                        names: Vec::new(),
                        ty: self.type_expr(p.ty),
                    })
                    .collect(),
                results: results
                    .iter()
                    .map(|&r| Field {
                        names: Vec::new(),
                        ty: self.type_expr(r),
                    })
                    .collect(),
            },
            _ => FuncType::default(),
        }
    }

    /// Parameter fields that declare the given variables.
    fn param_fields(&mut self, params: &[ObjectId]) -> Vec<Field> {
        params
            .iter()
            .map(|&p| {
                let names = vec![self.def_ident(p)];
                let ty = self.object_type(p);
                Field {
                    names,
                    ty: self.type_expr(ty),
                }
            })
            .collect()
    }

    fn result_type(&self, sig: Option<TypeId>) -> Option<TypeId> {
        match sig.map(|s| &self.program.types[self.program.underlying(s).index()]) {
            Some(Type::Signature { results, .. }) => results.first().copied(),
            _ => None,
        }
    }

    /// `fun(args...)`, typed as the callee's first result.
    pub fn call(&self, fun: Expr, args: Vec<Expr>) -> Expr {
        let ty = self.result_type(fun.ty);
        Expr::new(
            ExprKind::Call {
                fun: Box::new(fun),
                args,
                ellipsis: false,
            },
            ty,
        )
    }

    /// `fun(args..., rest...)`
    pub fn call_spread(&self, fun: Expr, args: Vec<Expr>) -> Expr {
        let mut expr = self.call(fun, args);
        if let ExprKind::Call { ellipsis, .. } = &mut expr.kind {
            *ellipsis = true;
        }
        expr
    }

    /// `x.sel` where `sel` resolves to `obj`.
    pub fn selector(&self, x: Expr, obj: ObjectId) -> Expr {
        let o = &self.program.objects[obj.index()];
        Expr::new(
            ExprKind::Selector {
                x: Box::new(x),
                sel: Ident {
                    name: o.name.clone(),
                    pos: Position::default(),
                    binding: Some(Binding::Use(obj)),
                },
            },
            o.ty,
        )
    }

    /// `recv.name(args...)` for a method with signature `sig`.
    pub fn method_call(&self, recv: Expr, name: &str, sig: TypeId, args: Vec<Expr>) -> Expr {
        let fun = Expr::new(
            ExprKind::Selector {
                x: Box::new(recv),
                sel: Ident {
                    name: name.to_string(),
                    pos: Position::default(),
                    binding: None,
                },
            },
            Some(sig),
        );
        self.call(fun, args)
    }

    /// `x.(T)`
    pub fn type_assert(&self, x: Expr, to: TypeId) -> Expr {
        Expr::new(
            ExprKind::TypeAssert {
                x: Box::new(x),
                to: Some(Box::new(self.type_expr(to))),
            },
            Some(to),
        )
    }

    /// `T(x)`
    pub fn conversion(&self, to: TypeId, x: Expr) -> Expr {
        Expr::new(
            ExprKind::Conversion {
                to: Box::new(self.type_expr(to)),
                x: Box::new(x),
            },
            Some(to),
        )
    }

    /// `T{elts...}`
    pub fn composite_lit(&self, ty: TypeId, elts: Vec<Expr>) -> Expr {
        Expr::new(
            ExprKind::CompositeLit {
                lit_type: Some(Box::new(self.type_expr(ty))),
                elts,
            },
            Some(ty),
        )
    }

    /// `field: value` inside a struct literal.
    pub fn key_value(&self, field: &str, field_ty: TypeId, value: Expr) -> Expr {
        let key = Expr::new(
            ExprKind::Ident {
                ident: Ident {
                    name: field.to_string(),
                    pos: Position::default(),
                    binding: None,
                },
            },
            Some(field_ty),
        );
        Expr::new(
            ExprKind::KeyValue {
                key: Box::new(key),
                value: Box::new(value),
            },
            None,
        )
    }

    /// `func(params...) { body }`
    pub fn func_lit(&mut self, params: &[ObjectId], body: Vec<Stmt>) -> Expr {
        let sig = self.bound_signature(params, &[]);
        Expr::new(
            ExprKind::FuncLit {
                sig: FuncType {
                    params: self.param_fields(params),
                    results: Vec::new(),
                },
                body: Block { stmts: body },
            },
            Some(sig),
        )
    }

    pub fn lit(&self, value: &str, ty: TypeId) -> Expr {
        Expr::new(
            ExprKind::Lit {
                value: value.to_string(),
            },
            Some(ty),
        )
    }

    // ------------------------------------------------------------------
    // Declarations
    // ------------------------------------------------------------------

    pub fn push_decl(&mut self, decl: Decl) {
        let file = self.ensure_file();
        if let Some(f) = self.program.files.iter_mut().find(|f| f.id == file) {
            f.decls.push(decl);
        }
    }

    /// `func name(params...) results { body }` in the current file.
    pub fn func_decl(
        &mut self,
        name: &str,
        params: &[ObjectId],
        results: &[TypeId],
        body: Vec<Stmt>,
    ) -> ObjectId {
        let sig = self.bound_signature(params, results);
        let pos = self.next_pos();
        let package = Some(self.current_package());
        let func = self.add_object(Object {
            name: name.to_string(),
            kind: ObjectKind::Func,
            package,
            ty: Some(sig),
            pos: Some(pos),
        });
        let decl = FuncDecl {
            recv: None,
            name: self.def_ident(func),
            ty: FuncType {
                params: self.param_fields(params),
                results: results
                    .iter()
                    .map(|&r| Field {
                        names: Vec::new(),
                        ty: self.type_expr(r),
                    })
                    .collect(),
            },
            body: Some(Block { stmts: body }),
        };
        self.push_decl(Decl::Func(decl));
        func
    }

    /// `func (r *T) name(params...) results { body }` in the current file,
    /// also registered in `T`'s method set.
    pub fn method_decl(
        &mut self,
        recv_type: TypeId,
        pointer_receiver: bool,
        name: &str,
        params: &[ObjectId],
        results: &[TypeId],
        body: Vec<Stmt>,
    ) -> ObjectId {
        let sig = self.bound_signature(params, results);
        let func = self.add_method(recv_type, name, sig, pointer_receiver);
        let pos = self.next_pos();
        self.program.objects[func.index()].pos = Some(pos);

        let recv_ty = if pointer_receiver {
            self.pointer(recv_type)
        } else {
            recv_type
        };
        let decl = FuncDecl {
            recv: Some(vec![Field {
                names: Vec::new(),
                ty: self.type_expr(recv_ty),
            }]),
            name: self.def_ident(func),
            ty: FuncType {
                params: self.param_fields(params),
                results: results
                    .iter()
                    .map(|&r| Field {
                        names: Vec::new(),
                        ty: self.type_expr(r),
                    })
                    .collect(),
            },
            body: Some(Block { stmts: body }),
        };
        self.push_decl(Decl::Func(decl));
        func
    }

    /// `type Name <underlying>` for a named type of the analyzed package.
    pub fn type_decl(&mut self, named: TypeId) {
        let Some(&obj) = self.type_names.get(&named) else {
            return;
        };
        let underlying = self.program.underlying(named);
        let spec = Spec::Type {
            name: self.def_ident(obj),
            ty: self.type_expr(underlying),
        };
        self.push_decl(Decl::Gen(GenDecl {
            kind: DeclKind::Type,
            specs: vec![spec],
        }));
    }

    /// `var name = value` / `name := value` as a statement.
    pub fn define(&self, obj: ObjectId, value: Expr) -> Stmt {
        Stmt::Decl {
            decl: GenDecl {
                kind: DeclKind::Var,
                specs: vec![Spec::Value {
                    names: vec![self.def_ident(obj)],
                    ty: None,
                    values: vec![value],
                }],
            },
        }
    }

    pub fn finish(self) -> Program {
        self.program
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_untyped_parameter_gets_invalid_type() {
        let mut b = ProgramBuilder::new("example.com/app", "app");
        let param = b.add_object(Object {
            name: "x".to_string(),
            kind: ObjectKind::Var,
            package: None,
            ty: None,
            pos: None,
        });
        let sig = b.bound_signature(&[param], &[]);
        let program = b.finish();

        match program.ty(sig) {
            Type::Signature { params, .. } => {
                assert_eq!(params.len(), 1);
                assert_eq!(program.ty(params[0].ty), &Type::Basic { name: "invalid".to_string() });
            }
            other => panic!("expected a signature, got {other:?}"),
        }
        assert!(program.validate().is_ok());
    }

    #[test]
    fn test_struct_embedding_names_fields_after_types() {
        let mut b = ProgramBuilder::new("example.com/app", "app");
        let pkg = b.current_package();
        let empty = b.struct_type(&[]);
        let base = b.named(pkg, "Base", empty);
        let base_ptr = b.pointer(base);
        let string = b.basic("string");
        let s = b.struct_embedding(&[("id", string)], &[base_ptr]);
        let program = b.finish();

        let Type::Struct { fields } = program.ty(s) else {
            panic!("expected a struct");
        };
        assert_eq!(fields.len(), 2);
        assert!(!fields[0].embedded);
        assert_eq!(fields[1].name, "Base");
        assert!(fields[1].embedded);
    }
}
