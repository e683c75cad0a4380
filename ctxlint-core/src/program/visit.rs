//! Syntax tree traversal.
//!
//! Same shape as `syn::visit`: every node type has a `visit_*` method whose
//! default implementation calls the matching `walk_*` function, which in turn
//! visits the node's children. Override a method to intercept a node; call
//! the `walk_*` function from the override to keep descending.

use super::ast::*;

pub trait Visit<'ast> {
    fn visit_file(&mut self, file: &'ast SourceFile) {
        walk_file(self, file);
    }

    fn visit_decl(&mut self, decl: &'ast Decl) {
        walk_decl(self, decl);
    }

    fn visit_func_decl(&mut self, func: &'ast FuncDecl) {
        walk_func_decl(self, func);
    }

    fn visit_gen_decl(&mut self, decl: &'ast GenDecl) {
        walk_gen_decl(self, decl);
    }

    fn visit_spec(&mut self, spec: &'ast Spec) {
        walk_spec(self, spec);
    }

    fn visit_func_type(&mut self, sig: &'ast FuncType) {
        walk_func_type(self, sig);
    }

    fn visit_field(&mut self, field: &'ast Field) {
        walk_field(self, field);
    }

    fn visit_block(&mut self, block: &'ast Block) {
        walk_block(self, block);
    }

    fn visit_stmt(&mut self, stmt: &'ast Stmt) {
        walk_stmt(self, stmt);
    }

    fn visit_case_clause(&mut self, clause: &'ast CaseClause) {
        walk_case_clause(self, clause);
    }

    fn visit_expr(&mut self, expr: &'ast Expr) {
        walk_expr(self, expr);
    }

    fn visit_ident(&mut self, _ident: &'ast Ident) {}
}

pub fn walk_file<'ast, V: Visit<'ast> + ?Sized>(v: &mut V, file: &'ast SourceFile) {
    for decl in &file.decls {
        v.visit_decl(decl);
    }
}

pub fn walk_decl<'ast, V: Visit<'ast> + ?Sized>(v: &mut V, decl: &'ast Decl) {
    match decl {
        Decl::Func(func) => v.visit_func_decl(func),
        Decl::Gen(gen) => v.visit_gen_decl(gen),
    }
}

pub fn walk_func_decl<'ast, V: Visit<'ast> + ?Sized>(v: &mut V, func: &'ast FuncDecl) {
    if let Some(recv) = &func.recv {
        for field in recv {
            v.visit_field(field);
        }
    }
    v.visit_ident(&func.name);
    v.visit_func_type(&func.ty);
    if let Some(body) = &func.body {
        v.visit_block(body);
    }
}

pub fn walk_gen_decl<'ast, V: Visit<'ast> + ?Sized>(v: &mut V, decl: &'ast GenDecl) {
    for spec in &decl.specs {
        v.visit_spec(spec);
    }
}

pub fn walk_spec<'ast, V: Visit<'ast> + ?Sized>(v: &mut V, spec: &'ast Spec) {
    match spec {
        Spec::Import { name, .. } => {
            if let Some(name) = name {
                v.visit_ident(name);
            }
        }
        Spec::Value { names, ty, values } => {
            for name in names {
                v.visit_ident(name);
            }
            if let Some(ty) = ty {
                v.visit_expr(ty);
            }
            for value in values {
                v.visit_expr(value);
            }
        }
        Spec::Type { name, ty } => {
            v.visit_ident(name);
            v.visit_expr(ty);
        }
    }
}

pub fn walk_func_type<'ast, V: Visit<'ast> + ?Sized>(v: &mut V, sig: &'ast FuncType) {
    for field in sig.params.iter().chain(&sig.results) {
        v.visit_field(field);
    }
}

pub fn walk_field<'ast, V: Visit<'ast> + ?Sized>(v: &mut V, field: &'ast Field) {
    for name in &field.names {
        v.visit_ident(name);
    }
    v.visit_expr(&field.ty);
}

pub fn walk_block<'ast, V: Visit<'ast> + ?Sized>(v: &mut V, block: &'ast Block) {
    for stmt in &block.stmts {
        v.visit_stmt(stmt);
    }
}

pub fn walk_case_clause<'ast, V: Visit<'ast> + ?Sized>(v: &mut V, clause: &'ast CaseClause) {
    for expr in &clause.list {
        v.visit_expr(expr);
    }
    for stmt in &clause.body {
        v.visit_stmt(stmt);
    }
}

pub fn walk_stmt<'ast, V: Visit<'ast> + ?Sized>(v: &mut V, stmt: &'ast Stmt) {
    match stmt {
        Stmt::Expr { expr } | Stmt::IncDec { expr } => v.visit_expr(expr),
        Stmt::Go { call } | Stmt::Defer { call } => v.visit_expr(call),
        Stmt::Decl { decl } => v.visit_gen_decl(decl),
        Stmt::Assign { lhs, rhs, .. } => {
            for e in lhs.iter().chain(rhs) {
                v.visit_expr(e);
            }
        }
        Stmt::Return { results } => {
            for e in results {
                v.visit_expr(e);
            }
        }
        Stmt::Block { block } => v.visit_block(block),
        Stmt::If {
            init,
            cond,
            then,
            els,
        } => {
            if let Some(init) = init {
                v.visit_stmt(init);
            }
            v.visit_expr(cond);
            v.visit_block(then);
            if let Some(els) = els {
                v.visit_stmt(els);
            }
        }
        Stmt::For {
            init,
            cond,
            post,
            body,
        } => {
            if let Some(init) = init {
                v.visit_stmt(init);
            }
            if let Some(cond) = cond {
                v.visit_expr(cond);
            }
            if let Some(post) = post {
                v.visit_stmt(post);
            }
            v.visit_block(body);
        }
        Stmt::Range {
            key,
            value,
            x,
            body,
        } => {
            if let Some(key) = key {
                v.visit_expr(key);
            }
            if let Some(value) = value {
                v.visit_expr(value);
            }
            v.visit_expr(x);
            v.visit_block(body);
        }
        Stmt::Switch { init, tag, clauses } => {
            if let Some(init) = init {
                v.visit_stmt(init);
            }
            if let Some(tag) = tag {
                v.visit_expr(tag);
            }
            for clause in clauses {
                v.visit_case_clause(clause);
            }
        }
        Stmt::TypeSwitch {
            init,
            assign,
            clauses,
        } => {
            if let Some(init) = init {
                v.visit_stmt(init);
            }
            v.visit_stmt(assign);
            for clause in clauses {
                v.visit_case_clause(clause);
            }
        }
        Stmt::Branch { .. } => {}
    }
}

pub fn walk_expr<'ast, V: Visit<'ast> + ?Sized>(v: &mut V, expr: &'ast Expr) {
    match &expr.kind {
        ExprKind::Ident { ident } => v.visit_ident(ident),
        ExprKind::Lit { .. } => {}
        ExprKind::Paren { x } | ExprKind::Star { x } => v.visit_expr(x),
        ExprKind::Unary { x, .. } => v.visit_expr(x),
        ExprKind::Binary { x, y, .. } => {
            v.visit_expr(x);
            v.visit_expr(y);
        }
        ExprKind::Selector { x, sel } => {
            v.visit_expr(x);
            v.visit_ident(sel);
        }
        ExprKind::Call { fun, args, .. } => {
            v.visit_expr(fun);
            for arg in args {
                v.visit_expr(arg);
            }
        }
        ExprKind::Conversion { to, x } => {
            v.visit_expr(to);
            v.visit_expr(x);
        }
        ExprKind::TypeAssert { x, to } => {
            v.visit_expr(x);
            if let Some(to) = to {
                v.visit_expr(to);
            }
        }
        ExprKind::CompositeLit { lit_type, elts } => {
            if let Some(lit_type) = lit_type {
                v.visit_expr(lit_type);
            }
            for elt in elts {
                v.visit_expr(elt);
            }
        }
        ExprKind::KeyValue { key, value } => {
            v.visit_expr(key);
            v.visit_expr(value);
        }
        ExprKind::FuncLit { sig, body } => {
            v.visit_func_type(sig);
            v.visit_block(body);
        }
        ExprKind::Index { x, index } => {
            v.visit_expr(x);
            v.visit_expr(index);
        }
        ExprKind::SliceExpr { x, low, high } => {
            v.visit_expr(x);
            if let Some(low) = low {
                v.visit_expr(low);
            }
            if let Some(high) = high {
                v.visit_expr(high);
            }
        }
        ExprKind::FuncType { sig } => v.visit_func_type(sig),
        ExprKind::InterfaceType { members } => {
            for member in members {
                v.visit_field(member);
            }
        }
        ExprKind::StructType { fields } => {
            for field in fields {
                v.visit_field(field);
            }
        }
        ExprKind::ArrayType { len, elem } => {
            if let Some(len) = len {
                v.visit_expr(len);
            }
            v.visit_expr(elem);
        }
        ExprKind::MapType { key, value } => {
            v.visit_expr(key);
            v.visit_expr(value);
        }
        ExprKind::Ellipsis { elem } => v.visit_expr(elem),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::program::{Binding, ObjectId};

    struct IdentCounter {
        names: Vec<String>,
    }

    impl<'ast> Visit<'ast> for IdentCounter {
        fn visit_ident(&mut self, ident: &'ast Ident) {
            self.names.push(ident.name.clone());
        }
    }

    fn ident(name: &str) -> Expr {
        Expr::new(
            ExprKind::Ident {
                ident: Ident {
                    name: name.to_string(),
                    pos: Default::default(),
                    binding: Some(Binding::Use(ObjectId(0))),
                },
            },
            None,
        )
    }

    #[test]
    fn test_walk_reaches_nested_identifiers() {
        let call = Expr::new(
            ExprKind::Call {
                fun: Box::new(Expr::new(
                    ExprKind::Selector {
                        x: Box::new(ident("ctx")),
                        sel: Ident {
                            name: "Database".to_string(),
                            pos: Default::default(),
                            binding: None,
                        },
                    },
                    None,
                )),
                args: vec![ident("key")],
                ellipsis: false,
            },
            None,
        );
        let stmt = Stmt::If {
            init: None,
            cond: ident("ok"),
            then: Block {
                stmts: vec![Stmt::Expr { expr: call }],
            },
            els: None,
        };

        let mut counter = IdentCounter { names: Vec::new() };
        counter.visit_stmt(&stmt);
        assert_eq!(counter.names, vec!["ok", "ctx", "Database", "key"]);
    }

    #[test]
    fn test_override_can_stop_descent() {
        struct SkipFuncTypes {
            seen: usize,
        }
        impl<'ast> Visit<'ast> for SkipFuncTypes {
            fn visit_func_type(&mut self, _sig: &'ast FuncType) {}
            fn visit_ident(&mut self, _ident: &'ast Ident) {
                self.seen += 1;
            }
        }

        let expr = Expr::new(
            ExprKind::TypeAssert {
                x: Box::new(ident("f")),
                to: Some(Box::new(Expr::new(
                    ExprKind::FuncType {
                        sig: FuncType {
                            params: vec![Field {
                                names: vec![],
                                ty: ident("Ctx"),
                            }],
                            results: vec![],
                        },
                    },
                    None,
                ))),
            },
            None,
        );

        let mut v = SkipFuncTypes { seen: 0 };
        v.visit_expr(&expr);
        assert_eq!(v.seen, 1);
    }
}
