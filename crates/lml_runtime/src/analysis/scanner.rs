//! The static analyzer: scope construction, type inference and checking.
//!
//! The scanner walks a parsed program, building the context tree and
//! inferring a type for every expression. Its exit policy is collect-all:
//! every top-level statement is scanned inside its own error boundary, a
//! fatal error from deeper in the expression tree aborts only that
//! statement, and scanning continues with the next one. The interpreter
//! only runs when the scanner reports no errors.
//!
//! Relative imports are resolved through the injected module loader,
//! scanned recursively, and cached by normalized module key; a cyclic
//! import binds against the partially-populated export table instead of
//! recursing forever.

use std::collections::HashMap;
use std::path::PathBuf;

use indexmap::IndexMap;
use lml_language::ast::{
    BinaryOp, Expr, ExprKind, ImportSpec, LambdaBody, LambdaExpr, Program, Stmt, StmtKind,
    UnaryOp,
};
use lml_language::{parse, Diagnostic, Param, Pos, Signature, Span, Type};

use super::compat::{conversion_allowed, types_match};
use super::context::{ContextArena, ContextId, SymbolInfo};
use crate::loader::{self, ModuleLoader};
use crate::stdlib;

/// Output of a scan: ordered diagnostics plus the context tree for
/// position queries.
pub struct ScanResult {
    pub errors: Vec<Diagnostic>,
    pub contexts: ContextArena,
    pub root: ContextId,
}

impl ScanResult {
    pub fn is_clean(&self) -> bool {
        self.errors.is_empty()
    }

    /// Innermost scope containing `pos`; editor completion and hover use
    /// this to enumerate visible names.
    pub fn scope_at(&self, pos: Pos) -> Option<ContextId> {
        self.contexts.scope_at(pos)
    }

    /// Every name visible at `pos` with its type, innermost binding
    /// winning over shadowed outer ones. Sorted for stable completion
    /// lists.
    pub fn visible_symbols(&self, pos: Pos) -> Vec<(String, Type)> {
        let mut seen: Vec<(String, Type)> = Vec::new();
        let mut current = self.contexts.scope_at(pos);
        while let Some(ctx) = current {
            for (name, info) in self.contexts.symbols_in(ctx) {
                if !seen.iter().any(|(n, _)| n == name) {
                    seen.push((name.clone(), info.ty.clone()));
                }
            }
            current = self.contexts.parent(ctx);
        }
        seen.sort_by(|(a, _), (b, _)| a.cmp(b));
        seen
    }
}

#[derive(Default)]
struct ModuleEntry {
    exports: HashMap<String, SymbolInfo>,
    complete: bool,
}

pub struct Scanner<'a> {
    contexts: ContextArena,
    errors: Vec<Diagnostic>,
    loader: Option<&'a ModuleLoader>,
    base_dir: PathBuf,
    modules: HashMap<String, ModuleEntry>,
    module_stack: Vec<String>,
    root_stack: Vec<ContextId>,
    return_types: Vec<Type>,
}

impl<'a> Default for Scanner<'a> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'a> Scanner<'a> {
    pub fn new() -> Self {
        Self {
            contexts: ContextArena::new(),
            errors: Vec::new(),
            loader: None,
            base_dir: PathBuf::new(),
            modules: HashMap::new(),
            module_stack: Vec::new(),
            root_stack: Vec::new(),
            return_types: Vec::new(),
        }
    }

    /// Scanner with module resolution: imports beginning with `.` load
    /// through `loader` relative to `base_dir`.
    pub fn with_loader(loader: &'a ModuleLoader, base_dir: impl Into<PathBuf>) -> Self {
        let mut scanner = Self::new();
        scanner.loader = Some(loader);
        scanner.base_dir = base_dir.into();
        scanner
    }

    pub fn scan(mut self, program: &Program) -> ScanResult {
        let root = self.contexts.push_root(program_span(program), true);
        self.root_stack.push(root);
        self.install_builtins(root);

        for stmt in &program.statements {
            if let Err(diag) = self.scan_stmt(root, stmt) {
                self.errors.push(diag);
            }
        }

        ScanResult {
            errors: self.errors,
            contexts: self.contexts,
            root,
        }
    }

    fn install_builtins(&mut self, root: ContextId) {
        for export in stdlib::builtins() {
            self.contexts.define(
                root,
                export.name,
                SymbolInfo::function(export.signature.clone()),
            );
        }
    }

    // ------------------------------------------------------------------
    // Statements
    // ------------------------------------------------------------------

    fn scan_stmt(&mut self, ctx: ContextId, stmt: &Stmt) -> Result<(), Diagnostic> {
        match &stmt.kind {
            StmtKind::Def {
                ty,
                name,
                value,
                exported,
            } => {
                let declared = Type::from_expr(ty);
                if declared == Type::Void {
                    return Err(Diagnostic::new(
                        "Invalid Type: 'void' is only valid as a return type",
                        ty.span,
                    ));
                }
                if *exported && Some(&ctx) != self.root_stack.last() {
                    return Err(Diagnostic::new(
                        "Invalid Export: only top-level declarations can be exported",
                        stmt.span,
                    ));
                }

                if let ExprKind::Lambda(def) = &value.kind {
                    if !types_match(&declared, &Type::Func) {
                        return Err(type_mismatch(&declared, &Type::Func, value.span));
                    }
                    let signature = self.lambda_signature(def)?;
                    // Bound before the body is scanned so direct recursion
                    // resolves.
                    self.define_symbol(
                        ctx,
                        &name.name,
                        SymbolInfo {
                            ty: declared,
                            signature: Some(signature),
                        },
                        *exported,
                    );
                    self.scan_lambda(ctx, def)?;
                } else {
                    let inferred = self.infer(ctx, value)?;
                    if !types_match(&declared, &inferred) {
                        return Err(type_mismatch(&declared, &inferred, value.span));
                    }
                    self.define_symbol(ctx, &name.name, SymbolInfo::of(declared), *exported);
                }
                Ok(())
            }

            StmtKind::Assign { target, value } => self.scan_assignment(ctx, target, value),

            StmtKind::If {
                cond,
                then_branch,
                else_branch,
            } => {
                let cond_ty = self.infer(ctx, cond)?;
                if !types_match(&Type::Bool, &cond_ty) {
                    return Err(type_mismatch(&Type::Bool, &cond_ty, cond.span));
                }
                self.scan_stmt(ctx, then_branch)?;
                if let Some(branch) = else_branch {
                    self.scan_stmt(ctx, branch)?;
                }
                Ok(())
            }

            StmtKind::Block { statements } => {
                let inner = self.contexts.push_child(ctx, stmt.span);
                for statement in statements {
                    self.scan_stmt(inner, statement)?;
                }
                Ok(())
            }

            StmtKind::Return { value } => {
                let Some(expected) = self.return_types.last().cloned() else {
                    return Err(Diagnostic::new(
                        "Invalid Return: 'return' outside of a function",
                        stmt.span,
                    ));
                };
                match value {
                    None => {
                        if expected != Type::Void {
                            return Err(type_mismatch(&expected, &Type::Nil, stmt.span));
                        }
                    }
                    Some(expr) => {
                        let actual = self.infer(ctx, expr)?;
                        if expected == Type::Void {
                            return Err(Diagnostic::new(
                                "Type Mismatch: a 'void' function cannot return a value",
                                expr.span,
                            ));
                        }
                        if !types_match(&expected, &actual) {
                            return Err(type_mismatch(&expected, &actual, expr.span));
                        }
                    }
                }
                Ok(())
            }

            StmtKind::Expr { expr } => {
                self.infer(ctx, expr)?;
                Ok(())
            }

            StmtKind::Import { spec, path } => self.scan_import(ctx, spec, path, stmt.span),
        }
    }

    fn scan_assignment(
        &mut self,
        ctx: ContextId,
        target: &Expr,
        value: &Expr,
    ) -> Result<(), Diagnostic> {
        let value_ty = self.infer(ctx, value)?;
        match &target.kind {
            ExprKind::Var(name) => {
                let Some(info) = self.contexts.lookup(ctx, name) else {
                    return Err(Diagnostic::new(
                        format!("Unknown Identifier: '{}' is not defined", name),
                        target.span,
                    ));
                };
                let declared = info.ty.clone();
                if !types_match(&declared, &value_ty) {
                    return Err(type_mismatch(&declared, &value_ty, value.span));
                }
                Ok(())
            }
            ExprKind::Member { object, property } => {
                let object_ty = self.infer(ctx, object)?;
                match object_ty {
                    Type::Struct { fields, .. } => match fields.get(&property.name) {
                        Some(field_ty) => {
                            if !types_match(field_ty, &value_ty) {
                                return Err(type_mismatch(field_ty, &value_ty, value.span));
                            }
                            Ok(())
                        }
                        None => Err(Diagnostic::new(
                            format!("Unknown Member: '{}'", property.name),
                            property.span,
                        )),
                    },
                    Type::Obj | Type::Unknown => Ok(()),
                    other => Err(type_mismatch(&Type::Obj, &other, object.span)),
                }
            }
            ExprKind::Index { object, index } => {
                let object_ty = self.infer(ctx, object)?;
                let index_ty = self.infer(ctx, index)?;
                match object_ty {
                    Type::Array(element) => {
                        if !types_match(&Type::Int, &index_ty) {
                            return Err(type_mismatch(&Type::Int, &index_ty, index.span));
                        }
                        if !types_match(&element, &value_ty) {
                            return Err(type_mismatch(&element, &value_ty, value.span));
                        }
                        Ok(())
                    }
                    Type::Obj | Type::Struct { .. } => {
                        if !types_match(&Type::Str, &index_ty) {
                            return Err(type_mismatch(&Type::Str, &index_ty, index.span));
                        }
                        Ok(())
                    }
                    Type::Unknown => Ok(()),
                    other => Err(type_mismatch(&Type::Obj, &other, object.span)),
                }
            }
            _ => Err(Diagnostic::new("Invalid assignment target", target.span)),
        }
    }

    fn define_symbol(&mut self, ctx: ContextId, name: &str, info: SymbolInfo, exported: bool) {
        if exported {
            if let Some(key) = self.module_stack.last() {
                if let Some(entry) = self.modules.get_mut(key) {
                    entry.exports.insert(name.to_string(), info.clone());
                }
            }
        }
        self.contexts.define(ctx, name, info);
    }

    // ------------------------------------------------------------------
    // Expressions
    // ------------------------------------------------------------------

    fn infer(&mut self, ctx: ContextId, expr: &Expr) -> Result<Type, Diagnostic> {
        match &expr.kind {
            ExprKind::Int(_) => Ok(Type::Int),
            ExprKind::Dbl(_) => Ok(Type::Dbl),
            ExprKind::Bool(_) => Ok(Type::Bool),
            ExprKind::Str(_) => Ok(Type::Str),

            ExprKind::Array(elements) => {
                let mut element: Option<Type> = None;
                for item in elements {
                    let ty = self.infer(ctx, item)?;
                    match &element {
                        Some(expected) => {
                            if !types_match(expected, &ty) {
                                return Err(type_mismatch(expected, &ty, item.span));
                            }
                        }
                        None if !ty.is_unknown() => element = Some(ty),
                        None => {}
                    }
                }
                Ok(Type::array(element.unwrap_or(Type::Unknown)))
            }

            ExprKind::Object(entries) => {
                let mut fields = IndexMap::new();
                let mut signatures = HashMap::new();
                for (name, value) in entries {
                    if let ExprKind::Lambda(def) = &value.kind {
                        signatures.insert(name.name.clone(), self.lambda_signature(def)?);
                    }
                    let ty = self.infer(ctx, value)?;
                    fields.insert(name.name.clone(), ty);
                }
                Ok(Type::Struct { fields, signatures })
            }

            ExprKind::Var(name) => match self.contexts.lookup(ctx, name) {
                Some(info) => Ok(info.ty.clone()),
                None => Err(Diagnostic::new(
                    format!("Unknown Identifier: '{}' is not defined", name),
                    expr.span,
                )),
            },

            ExprKind::Member { object, property } => {
                let object_ty = self.infer(ctx, object)?;
                match object_ty {
                    Type::Struct { fields, signatures } => {
                        if let Some(ty) = fields.get(&property.name) {
                            Ok(ty.clone())
                        } else if signatures.contains_key(&property.name) {
                            Ok(Type::Func)
                        } else {
                            Err(Diagnostic::new(
                                format!("Unknown Member: '{}'", property.name),
                                property.span,
                            ))
                        }
                    }
                    Type::Obj | Type::Unknown => Ok(Type::Unknown),
                    other => Err(type_mismatch(&Type::Obj, &other, object.span)),
                }
            }

            ExprKind::Index { object, index } => {
                let object_ty = self.infer(ctx, object)?;
                let index_ty = self.infer(ctx, index)?;
                match object_ty {
                    Type::Array(element) => {
                        if !types_match(&Type::Int, &index_ty) {
                            return Err(type_mismatch(&Type::Int, &index_ty, index.span));
                        }
                        Ok(*element)
                    }
                    Type::Obj | Type::Struct { .. } => {
                        if !types_match(&Type::Str, &index_ty) {
                            return Err(type_mismatch(&Type::Str, &index_ty, index.span));
                        }
                        Ok(Type::Unknown)
                    }
                    Type::Unknown => Ok(Type::Unknown),
                    other => Err(type_mismatch(&Type::Obj, &other, object.span)),
                }
            }

            ExprKind::Call { callee, args } => self.infer_call(ctx, callee, args, expr.span),

            ExprKind::Lambda(def) => {
                self.scan_lambda(ctx, def)?;
                Ok(Type::Func)
            }

            ExprKind::Binary { op, left, right } => self.infer_binary(ctx, *op, left, right),

            ExprKind::Unary { op, operand } => {
                let ty = self.infer(ctx, operand)?;
                if ty.is_unknown() {
                    return Ok(Type::Unknown);
                }
                match op {
                    UnaryOp::Not => {
                        if ty == Type::Bool {
                            Ok(Type::Bool)
                        } else {
                            Err(type_mismatch(&Type::Bool, &ty, operand.span))
                        }
                    }
                    UnaryOp::Neg => {
                        if ty.is_numeric() {
                            Ok(ty)
                        } else {
                            Err(Diagnostic::new(
                                format!(
                                    "Type Mismatch: Operator '-' requires a numeric operand, got '{}'",
                                    ty
                                ),
                                operand.span,
                            ))
                        }
                    }
                }
            }

            ExprKind::Update { target, .. } => {
                let ty = self.infer(ctx, target)?;
                if ty.is_unknown() {
                    return Ok(Type::Unknown);
                }
                if ty.is_numeric() {
                    Ok(ty)
                } else {
                    Err(Diagnostic::new(
                        format!(
                            "Type Mismatch: Update operators require a numeric target, got '{}'",
                            ty
                        ),
                        target.span,
                    ))
                }
            }

            ExprKind::Convert { value, ty } => {
                let from = self.infer(ctx, value)?;
                let to = Type::from_expr(ty);
                if to == Type::Void {
                    return Err(Diagnostic::new(
                        "Invalid Conversion: Cannot convert to 'void'",
                        ty.span,
                    ));
                }
                if !conversion_allowed(&from, &to) {
                    return Err(Diagnostic::new(
                        format!("Invalid Conversion: Cannot convert '{}' to '{}'", from, to),
                        expr.span,
                    ));
                }
                Ok(to)
            }

            ExprKind::TypeOf { value } => {
                self.infer(ctx, value)?;
                Ok(Type::Str)
            }

            ExprKind::Runtime(literal) => {
                for (_, attr_value) in &literal.attrs {
                    self.infer(ctx, attr_value)?;
                }
                Ok(Type::Unknown)
            }
        }
    }

    fn infer_call(
        &mut self,
        ctx: ContextId,
        callee: &Expr,
        args: &[Expr],
        span: Span,
    ) -> Result<Type, Diagnostic> {
        let (callee_ty, signature) = match &callee.kind {
            ExprKind::Var(name) => match self.contexts.lookup(ctx, name) {
                Some(info) => (info.ty.clone(), info.signature.clone()),
                None => {
                    return Err(Diagnostic::new(
                        format!("Unknown Identifier: '{}' is not defined", name),
                        callee.span,
                    ));
                }
            },
            ExprKind::Member { object, property } => {
                let object_ty = self.infer(ctx, object)?;
                match object_ty {
                    Type::Struct { fields, signatures } => {
                        if let Some(sig) = signatures.get(&property.name) {
                            (Type::Func, Some(sig.clone()))
                        } else if let Some(field_ty) = fields.get(&property.name) {
                            (field_ty.clone(), None)
                        } else {
                            return Err(Diagnostic::new(
                                format!("Unknown Member: '{}'", property.name),
                                property.span,
                            ));
                        }
                    }
                    Type::Obj | Type::Unknown => (Type::Unknown, None),
                    other => return Err(type_mismatch(&Type::Obj, &other, object.span)),
                }
            }
            _ => (self.infer(ctx, callee)?, None),
        };

        if !matches!(callee_ty, Type::Func | Type::Unknown) {
            return Err(type_mismatch(&Type::Func, &callee_ty, callee.span));
        }

        match signature {
            Some(signature) => {
                self.check_arity(&signature, args.len(), span)?;
                for (index, arg) in args.iter().enumerate() {
                    let arg_ty = self.infer(ctx, arg)?;
                    if let Some(param_ty) = signature.param_type_at(index) {
                        if !types_match(param_ty, &arg_ty) {
                            return Err(type_mismatch(param_ty, &arg_ty, arg.span));
                        }
                    }
                }
                Ok(signature.ret.clone())
            }
            None => {
                // Unknown callees accept anything; arguments are still
                // scanned for their own errors.
                for arg in args {
                    self.infer(ctx, arg)?;
                }
                Ok(Type::Unknown)
            }
        }
    }

    fn check_arity(
        &self,
        signature: &Signature,
        supplied: usize,
        span: Span,
    ) -> Result<(), Diagnostic> {
        let min = signature.min_args();
        let max = signature.max_args();
        let ok = supplied >= min && max.map(|m| supplied <= m).unwrap_or(true);
        if ok {
            return Ok(());
        }
        let expected = match max {
            Some(m) if m == min => format!("{}", min),
            Some(m) => format!("between {} and {}", min, m),
            None => format!("at least {}", min),
        };
        Err(Diagnostic::new(
            format!(
                "Invalid Argument Count: Expected {}, got {}",
                expected, supplied
            ),
            span,
        ))
    }

    fn infer_binary(
        &mut self,
        ctx: ContextId,
        op: BinaryOp,
        left: &Expr,
        right: &Expr,
    ) -> Result<Type, Diagnostic> {
        let lt = self.infer(ctx, left)?;
        let rt = self.infer(ctx, right)?;
        if lt.is_unknown() || rt.is_unknown() {
            return Ok(Type::Unknown);
        }

        match op {
            BinaryOp::Add => match (&lt, &rt) {
                (Type::Str, Type::Str) => Ok(Type::Str),
                (Type::Int, Type::Int) => Ok(Type::Int),
                (Type::Dbl, Type::Dbl) => Ok(Type::Dbl),
                (Type::Array(a), Type::Array(b)) => {
                    if types_match(a, b) {
                        let element = if a.is_unknown() { b } else { a };
                        Ok(Type::array((**element).clone()))
                    } else {
                        Err(type_mismatch(&lt, &rt, right.span))
                    }
                }
                (
                    Type::Struct {
                        fields: fa,
                        signatures: sa,
                    },
                    Type::Struct {
                        fields: fb,
                        signatures: sb,
                    },
                ) => {
                    let mut fields = fa.clone();
                    for (name, ty) in fb {
                        fields.insert(name.clone(), ty.clone());
                    }
                    let mut signatures = sa.clone();
                    for (name, sig) in sb {
                        signatures.insert(name.clone(), sig.clone());
                    }
                    Ok(Type::Struct { fields, signatures })
                }
                (Type::Obj, Type::Obj)
                | (Type::Obj, Type::Struct { .. })
                | (Type::Struct { .. }, Type::Obj) => Ok(Type::Obj),
                _ => Err(type_mismatch(&lt, &rt, right.span)),
            },

            BinaryOp::Sub | BinaryOp::Mul | BinaryOp::Mod => {
                if !lt.is_numeric() {
                    return Err(numeric_operand(op, &lt, left.span));
                }
                if !rt.is_numeric() {
                    return Err(numeric_operand(op, &rt, right.span));
                }
                if lt != rt {
                    return Err(type_mismatch(&lt, &rt, right.span));
                }
                Ok(lt)
            }

            // Division always yields dbl and requires dbl operands; the
            // hint teaches the explicit widening cast.
            BinaryOp::Div => {
                if lt != Type::Dbl {
                    return Err(type_mismatch(&Type::Dbl, &lt, left.span));
                }
                if rt != Type::Dbl {
                    return Err(type_mismatch(&Type::Dbl, &rt, right.span));
                }
                Ok(Type::Dbl)
            }

            BinaryOp::Lt | BinaryOp::LtEq | BinaryOp::Gt | BinaryOp::GtEq => {
                let comparable = matches!(lt, Type::Int | Type::Dbl | Type::Str);
                if !comparable {
                    return Err(Diagnostic::new(
                        format!(
                            "Type Mismatch: Operator '{}' cannot compare '{}'",
                            op.symbol(),
                            lt
                        ),
                        left.span,
                    ));
                }
                if lt != rt {
                    return Err(type_mismatch(&lt, &rt, right.span));
                }
                Ok(Type::Bool)
            }

            BinaryOp::Eq | BinaryOp::NotEq => Ok(Type::Bool),

            BinaryOp::And | BinaryOp::Or => {
                if lt != Type::Bool {
                    return Err(type_mismatch(&Type::Bool, &lt, left.span));
                }
                if rt != Type::Bool {
                    return Err(type_mismatch(&Type::Bool, &rt, right.span));
                }
                Ok(Type::Bool)
            }
        }
    }

    // ------------------------------------------------------------------
    // Lambdas
    // ------------------------------------------------------------------

    fn lambda_signature(&self, def: &LambdaExpr) -> Result<Signature, Diagnostic> {
        let mut params = Vec::new();
        for param in &def.params {
            let ty = Type::from_expr(&param.ty);
            if ty == Type::Void {
                return Err(Diagnostic::new(
                    "Invalid Type: 'void' is only valid as a return type",
                    param.ty.span,
                ));
            }
            params.push(Param::required(param.name.name.clone(), ty));
        }
        Ok(Signature::new(params, Type::from_expr(&def.ret)))
    }

    fn scan_lambda(&mut self, ctx: ContextId, def: &LambdaExpr) -> Result<(), Diagnostic> {
        let body_ctx = self.contexts.push_child(ctx, def.span);
        for param in &def.params {
            let ty = Type::from_expr(&param.ty);
            if ty == Type::Void {
                return Err(Diagnostic::new(
                    "Invalid Type: 'void' is only valid as a return type",
                    param.ty.span,
                ));
            }
            self.contexts
                .define(body_ctx, param.name.name.clone(), SymbolInfo::of(ty));
        }

        let ret = Type::from_expr(&def.ret);
        self.return_types.push(ret.clone());
        let result = match &def.body {
            LambdaBody::Expr(expr) => match self.infer(body_ctx, expr) {
                Ok(actual) => {
                    if types_match(&ret, &actual) {
                        Ok(())
                    } else {
                        Err(type_mismatch(&ret, &actual, expr.span))
                    }
                }
                Err(diag) => Err(diag),
            },
            LambdaBody::Block(statements) => {
                let mut outcome = Ok(());
                for statement in statements {
                    if let Err(diag) = self.scan_stmt(body_ctx, statement) {
                        outcome = Err(diag);
                        break;
                    }
                }
                outcome
            }
        };
        self.return_types.pop();
        result
    }

    // ------------------------------------------------------------------
    // Imports
    // ------------------------------------------------------------------

    fn scan_import(
        &mut self,
        ctx: ContextId,
        spec: &ImportSpec,
        path: &str,
        span: Span,
    ) -> Result<(), Diagnostic> {
        if path.starts_with('.') {
            self.scan_relative_import(ctx, spec, path, span)
        } else {
            self.scan_stdlib_import(ctx, spec, path, span)
        }
    }

    fn scan_relative_import(
        &mut self,
        ctx: ContextId,
        spec: &ImportSpec,
        path: &str,
        span: Span,
    ) -> Result<(), Diagnostic> {
        let Some(load) = self.loader else {
            return Err(Diagnostic::new(
                "Invalid Import: No module loader is configured",
                span,
            ));
        };
        let key = loader::module_key(path, &self.base_dir);

        if !self.modules.contains_key(&key) {
            let Some(source) = load(path, &self.base_dir) else {
                return Err(Diagnostic::new(
                    format!("Invalid Import: Cannot resolve module '{}'", path),
                    span,
                ));
            };
            let program = parse(&source).map_err(|diag| {
                Diagnostic::new(
                    format!(
                        "Invalid Import: Failed to parse module '{}': {}",
                        path, diag.message
                    ),
                    span,
                )
            })?;

            // Registered before scanning so a cycle binds against the
            // partially-populated exports instead of recursing.
            self.modules.insert(key.clone(), ModuleEntry::default());

            let module_base = loader::module_base_dir(path, &self.base_dir);
            let saved_base = std::mem::replace(&mut self.base_dir, module_base);
            self.module_stack.push(key.clone());

            let module_root = self.contexts.push_root(program_span(&program), false);
            self.root_stack.push(module_root);
            self.install_builtins(module_root);

            let mut error_count = 0usize;
            let mut first_message = None;
            for stmt in &program.statements {
                if let Err(diag) = self.scan_stmt(module_root, stmt) {
                    error_count += 1;
                    if first_message.is_none() {
                        first_message = Some(diag.message);
                    }
                }
            }

            self.root_stack.pop();
            self.module_stack.pop();
            self.base_dir = saved_base;
            if let Some(entry) = self.modules.get_mut(&key) {
                entry.complete = true;
            }

            if error_count > 0 {
                return Err(Diagnostic::new(
                    format!(
                        "Invalid Import: Module '{}' has {} error(s): {}",
                        path,
                        error_count,
                        first_message.unwrap_or_default()
                    ),
                    span,
                ));
            }
        }

        let entry = &self.modules[&key];
        match spec {
            ImportSpec::Named(names) => {
                // Collected first so binding does not alias the cache.
                let mut bindings = Vec::new();
                for import in names {
                    let target = import.alias.as_ref().unwrap_or(&import.name);
                    match entry.exports.get(&import.name.name) {
                        Some(info) => bindings.push((target.name.clone(), info.clone())),
                        None if !entry.complete => {
                            // Cycle: the export may not be populated yet.
                            bindings.push((target.name.clone(), SymbolInfo::of(Type::Unknown)));
                        }
                        None => {
                            return Err(Diagnostic::new(
                                format!(
                                    "Invalid Import: '{}' is not exported by '{}'",
                                    import.name.name, path
                                ),
                                import.name.span,
                            ));
                        }
                    }
                }
                for (name, info) in bindings {
                    self.contexts.define(ctx, name, info);
                }
                Ok(())
            }
            ImportSpec::Default(name) => {
                let mut fields = IndexMap::new();
                let mut signatures = HashMap::new();
                for (export_name, info) in &entry.exports {
                    fields.insert(export_name.clone(), info.ty.clone());
                    if let Some(sig) = &info.signature {
                        signatures.insert(export_name.clone(), sig.clone());
                    }
                }
                let binding = name.name.clone();
                self.contexts
                    .define(ctx, binding, SymbolInfo::of(Type::Struct { fields, signatures }));
                Ok(())
            }
        }
    }

    fn scan_stdlib_import(
        &mut self,
        ctx: ContextId,
        spec: &ImportSpec,
        path: &str,
        span: Span,
    ) -> Result<(), Diagnostic> {
        let Some(module) = stdlib::module(path) else {
            return Err(Diagnostic::new(
                format!("Invalid Import: Unknown module '{}'", path),
                span,
            ));
        };
        match spec {
            ImportSpec::Named(names) => {
                for import in names {
                    let Some(export) = module.get(&import.name.name) else {
                        return Err(Diagnostic::new(
                            format!(
                                "Invalid Import: '{}' is not exported by '{}'",
                                import.name.name, path
                            ),
                            import.name.span,
                        ));
                    };
                    let target = import.alias.as_ref().unwrap_or(&import.name);
                    self.contexts.define(
                        ctx,
                        target.name.clone(),
                        SymbolInfo::function(export.signature.clone()),
                    );
                }
                Ok(())
            }
            ImportSpec::Default(name) => {
                let mut fields = IndexMap::new();
                let mut signatures = HashMap::new();
                for (export_name, export) in &module.exports {
                    fields.insert(export_name.to_string(), Type::Func);
                    signatures.insert(export_name.to_string(), export.signature.clone());
                }
                self.contexts.define(
                    ctx,
                    name.name.clone(),
                    SymbolInfo::of(Type::Struct { fields, signatures }),
                );
                Ok(())
            }
        }
    }
}

fn program_span(program: &Program) -> Span {
    match (program.statements.first(), program.statements.last()) {
        (Some(first), Some(last)) => first.span.to(last.span),
        _ => Span::default(),
    }
}

fn type_mismatch(expected: &Type, actual: &Type, span: Span) -> Diagnostic {
    let diag = Diagnostic::new(
        format!("Type Mismatch: Expected '{}', got '{}'", expected, actual),
        span,
    );
    if *expected == Type::Dbl && *actual == Type::Int {
        diag.with_hint("Use double() conversion.")
    } else {
        diag
    }
}

fn numeric_operand(op: BinaryOp, ty: &Type, span: Span) -> Diagnostic {
    Diagnostic::new(
        format!(
            "Type Mismatch: Operator '{}' requires numeric operands, got '{}'",
            op.symbol(),
            ty
        ),
        span,
    )
}
