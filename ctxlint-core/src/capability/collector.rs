//! Finds the variables whose context interfaces get checked.
//!
//! Every declaring identifier is considered: parameters, named results,
//! locals, package-level vars. A variable is tracked when its type is
//! context-like and asks for more than the bare base context.
//!
//! Two places are deliberately not searched:
//! - type declarations; their contexts are checked where they are used
//! - function types other than the signature of a function declaration or
//!   function literal. Parameter names in, say, `f.(func(ctx Ctx))` are not
//!   variables anyone can use.

use crate::config::AnalyzerSettings;
use crate::program::visit::{self, Visit};
use crate::program::{DeclKind, Expr, ExprKind, FuncDecl, FuncType, GenDecl, Ident, Program};

use super::graph::{is_context_type, leaf_groups};
use super::tracker::Tracker;

/// Registers every trackable variable of the program in `tracker`.
pub fn collect_tracked(program: &Program, settings: &AnalyzerSettings, tracker: &mut Tracker) {
    let mut collector = Collector {
        program,
        settings,
        tracker,
    };
    for file in &program.files {
        collector.visit_file(file);
    }
}

struct Collector<'a> {
    program: &'a Program,
    settings: &'a AnalyzerSettings,
    tracker: &'a mut Tracker,
}

impl Collector<'_> {
    fn consider(&mut self, ident: &Ident) {
        let Some(id) = ident.def() else {
            return;
        };
        let obj = self.program.object(id);
        if obj.name == "_" || !obj.is_var() {
            return;
        }
        let Some(ty) = obj.ty else {
            return;
        };
        let base = &self.settings.base_context;
        if !is_context_type(self.program, ty, base) {
            return;
        }

        let leaves = leaf_groups(self.program, ty);
        match leaves.as_slice() {
            [] => return,
            // Asking for just the base context and not using it is a matter
            // for an unused-parameter check.
            [only] if self.program.type_is(*only, &base.package_path, &base.name) => return,
            _ => {}
        }

        tracing::trace!(variable = %obj.name, "tracking");
        self.tracker.track(id);
    }

    /// Parameters and results of a declaration's own signature.
    fn signature(&mut self, sig: &FuncType) {
        visit::walk_func_type(self, sig);
    }
}

impl<'ast> Visit<'ast> for Collector<'_> {
    fn visit_ident(&mut self, ident: &'ast Ident) {
        self.consider(ident);
    }

    fn visit_gen_decl(&mut self, decl: &'ast GenDecl) {
        if decl.kind != DeclKind::Type {
            visit::walk_gen_decl(self, decl);
        }
    }

    fn visit_func_decl(&mut self, func: &'ast FuncDecl) {
        if let Some(recv) = &func.recv {
            for field in recv {
                self.visit_field(field);
            }
        }
        self.visit_ident(&func.name);
        self.signature(&func.ty);
        if let Some(body) = &func.body {
            self.visit_block(body);
        }
    }

    fn visit_expr(&mut self, expr: &'ast Expr) {
        match &expr.kind {
            ExprKind::FuncLit { sig, body } => {
                self.signature(sig);
                self.visit_block(body);
            }
            _ => visit::walk_expr(self, expr),
        }
    }

    /// Reached only for function types that are not a declaration's own
    /// signature.
    fn visit_func_type(&mut self, _sig: &'ast FuncType) {}
}
