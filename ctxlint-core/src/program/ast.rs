//! Resolved syntax trees.
//!
//! The shapes follow the source language's grammar closely enough that every
//! use site the analyzer cares about has its own node, while identifiers and
//! expressions carry the front end's resolution results.

use serde::{Deserialize, Serialize};

use super::{FileId, ObjectId, Position, TypeId};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceFile {
    pub id: FileId,
    /// File name as reported in diagnostics, e.g. `thing.go`
    pub name: String,
    #[serde(default)]
    pub decls: Vec<Decl>,
}

/// What an identifier resolved to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Binding {
    /// This occurrence declares the object.
    Def(ObjectId),
    /// This occurrence refers to an object declared elsewhere.
    Use(ObjectId),
}

impl Binding {
    pub fn object(self) -> ObjectId {
        match self {
            Binding::Def(id) | Binding::Use(id) => id,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ident {
    pub name: String,
    #[serde(default)]
    pub pos: Position,
    #[serde(default)]
    pub binding: Option<Binding>,
}

impl Ident {
    /// The object this identifier declares, if it is a declaration.
    pub fn def(&self) -> Option<ObjectId> {
        match self.binding {
            Some(Binding::Def(id)) => Some(id),
            _ => None,
        }
    }

    /// The object this identifier denotes, declared here or elsewhere.
    pub fn object(&self) -> Option<ObjectId> {
        self.binding.map(Binding::object)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "decl", rename_all = "snake_case")]
pub enum Decl {
    Func(FuncDecl),
    Gen(GenDecl),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FuncDecl {
    /// Receiver list for methods.
    #[serde(default)]
    pub recv: Option<Vec<Field>>,
    pub name: Ident,
    pub ty: FuncType,
    #[serde(default)]
    pub body: Option<Block>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeclKind {
    Import,
    Const,
    Type,
    Var,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenDecl {
    pub kind: DeclKind,
    #[serde(default)]
    pub specs: Vec<Spec>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "spec", rename_all = "snake_case")]
pub enum Spec {
    Import {
        #[serde(default)]
        name: Option<Ident>,
        path: String,
    },
    Value {
        names: Vec<Ident>,
        #[serde(default)]
        ty: Option<Expr>,
        #[serde(default)]
        values: Vec<Expr>,
    },
    Type {
        name: Ident,
        ty: Expr,
    },
}

/// A function signature as written: parameter and result fields.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FuncType {
    #[serde(default)]
    pub params: Vec<Field>,
    #[serde(default)]
    pub results: Vec<Field>,
}

/// A parameter, result, struct field, or interface member.
///
/// `names` is empty for unnamed parameters and for embedded fields or
/// interfaces.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Field {
    #[serde(default)]
    pub names: Vec<Ident>,
    pub ty: Expr,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Block {
    #[serde(default)]
    pub stmts: Vec<Stmt>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaseClause {
    /// Case expressions (or types, in a type switch); empty for `default`.
    #[serde(default)]
    pub list: Vec<Expr>,
    #[serde(default)]
    pub body: Vec<Stmt>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "stmt", rename_all = "snake_case")]
pub enum Stmt {
    Expr {
        expr: Expr,
    },
    Decl {
        decl: GenDecl,
    },
    Assign {
        lhs: Vec<Expr>,
        rhs: Vec<Expr>,
        /// `:=` rather than `=`
        #[serde(default)]
        define: bool,
    },
    IncDec {
        expr: Expr,
    },
    Return {
        #[serde(default)]
        results: Vec<Expr>,
    },
    Block {
        block: Block,
    },
    If {
        #[serde(default)]
        init: Option<Box<Stmt>>,
        cond: Expr,
        then: Block,
        #[serde(default)]
        els: Option<Box<Stmt>>,
    },
    For {
        #[serde(default)]
        init: Option<Box<Stmt>>,
        #[serde(default)]
        cond: Option<Expr>,
        #[serde(default)]
        post: Option<Box<Stmt>>,
        body: Block,
    },
    Range {
        #[serde(default)]
        key: Option<Expr>,
        #[serde(default)]
        value: Option<Expr>,
        x: Expr,
        body: Block,
    },
    Switch {
        #[serde(default)]
        init: Option<Box<Stmt>>,
        #[serde(default)]
        tag: Option<Expr>,
        clauses: Vec<CaseClause>,
    },
    TypeSwitch {
        #[serde(default)]
        init: Option<Box<Stmt>>,
        /// `x.(type)` or `v := x.(type)`
        assign: Box<Stmt>,
        clauses: Vec<CaseClause>,
    },
    Go {
        call: Expr,
    },
    Defer {
        call: Expr,
    },
    Branch {
        keyword: String,
    },
}

/// An expression with the static type the front end computed for it.
///
/// For type expressions `ty` is the denoted type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Expr {
    #[serde(flatten)]
    pub kind: ExprKind,
    #[serde(default)]
    pub ty: Option<TypeId>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "expr", rename_all = "snake_case")]
pub enum ExprKind {
    Ident {
        ident: Ident,
    },
    Lit {
        value: String,
    },
    Paren {
        x: Box<Expr>,
    },
    Selector {
        x: Box<Expr>,
        sel: Ident,
    },
    Call {
        fun: Box<Expr>,
        #[serde(default)]
        args: Vec<Expr>,
        /// `f(xs...)`
        #[serde(default)]
        ellipsis: bool,
    },
    /// `T(x)` where `T` is a type.
    Conversion {
        to: Box<Expr>,
        x: Box<Expr>,
    },
    /// `x.(T)`; `to` is `None` for the `x.(type)` of a type switch.
    TypeAssert {
        x: Box<Expr>,
        #[serde(default)]
        to: Option<Box<Expr>>,
    },
    CompositeLit {
        #[serde(default)]
        lit_type: Option<Box<Expr>>,
        #[serde(default)]
        elts: Vec<Expr>,
    },
    KeyValue {
        key: Box<Expr>,
        value: Box<Expr>,
    },
    FuncLit {
        sig: FuncType,
        body: Block,
    },
    Unary {
        op: String,
        x: Box<Expr>,
    },
    Binary {
        op: String,
        x: Box<Expr>,
        y: Box<Expr>,
    },
    /// `*x`, as a dereference or a pointer type.
    Star {
        x: Box<Expr>,
    },
    Index {
        x: Box<Expr>,
        index: Box<Expr>,
    },
    SliceExpr {
        x: Box<Expr>,
        #[serde(default)]
        low: Option<Box<Expr>>,
        #[serde(default)]
        high: Option<Box<Expr>>,
    },
    FuncType {
        sig: FuncType,
    },
    InterfaceType {
        #[serde(default)]
        members: Vec<Field>,
    },
    StructType {
        #[serde(default)]
        fields: Vec<Field>,
    },
    ArrayType {
        #[serde(default)]
        len: Option<Box<Expr>>,
        elem: Box<Expr>,
    },
    MapType {
        key: Box<Expr>,
        value: Box<Expr>,
    },
    /// `...T` in a variadic parameter list.
    Ellipsis {
        elem: Box<Expr>,
    },
}

impl Expr {
    pub fn new(kind: ExprKind, ty: Option<TypeId>) -> Self {
        Self { kind, ty }
    }

    /// The identifier, if this expression is a bare (possibly parenthesized)
    /// identifier.
    pub fn as_ident(&self) -> Option<&Ident> {
        match &self.kind {
            ExprKind::Ident { ident } => Some(ident),
            ExprKind::Paren { x } => x.as_ident(),
            _ => None,
        }
    }
}
