//! Tree-walking evaluator for LML programs.
//!
//! Statements execute in source order; expressions evaluate leaves-first.
//! A call builds a child scope of the function's captured environment,
//! binds parameters positionally and evaluates the body; early `return`
//! travels as an internal control-flow signal that only the function
//! boundary catches. Embedded-code expressions hand their attribute
//! payloads to the orchestrator and block for the reply, so host program
//! order is preserved across container calls.
//!
//! The first runtime error aborts execution. Errors pick up the offending
//! expression's location at the innermost frame that knows one and keep it
//! through wrapping.

use std::collections::HashMap;
use std::path::PathBuf;
use std::rc::Rc;

use indexmap::IndexMap;
use lml_language::ast::{
    BinaryOp, Expr, ExprKind, ImportSpec, LambdaBody, LambdaExpr, Program, Stmt, StmtKind,
    UnaryOp, UpdateOp,
};
use lml_language::{parse, Span, Type};

use crate::convert::convert_value;
use crate::error::RuntimeError;
use crate::loader::{self, ModuleLoader};
use crate::orchestrator::Orchestrator;
use crate::scope::{ScopeArena, ScopeId};
use crate::stdlib;
use crate::value::{FuncValue, Value};

/// Control-flow signal for statement execution.
enum Flow {
    Normal,
    Return(Value),
}

/// A resolved assignment target; the container side is evaluated once.
enum LValue {
    Var(String),
    Member(Rc<std::cell::RefCell<IndexMap<String, Value>>>, String),
    Element(Rc<std::cell::RefCell<Vec<Value>>>, usize),
}

#[derive(Default)]
struct ModuleEntry {
    exports: IndexMap<String, Value>,
    complete: bool,
}

pub struct Interpreter<'a> {
    scopes: ScopeArena,
    root: ScopeId,
    /// Lines produced by `print`, in order.
    pub output: Vec<String>,
    echo: bool,
    orchestrator: Option<&'a mut Orchestrator>,
    loader: Option<&'a ModuleLoader>,
    base_dir: PathBuf,
    modules: HashMap<String, ModuleEntry>,
    module_stack: Vec<String>,
}

impl<'a> Default for Interpreter<'a> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'a> Interpreter<'a> {
    pub fn new() -> Self {
        let mut scopes = ScopeArena::new();
        let root = scopes.push_root();
        let mut interpreter = Self {
            scopes,
            root,
            output: Vec::new(),
            echo: false,
            orchestrator: None,
            loader: None,
            base_dir: PathBuf::new(),
            modules: HashMap::new(),
            module_stack: Vec::new(),
        };
        interpreter.install_builtins(root);
        interpreter
    }

    /// Echo `print` output to stdout in addition to collecting it.
    pub fn with_echo(mut self, echo: bool) -> Self {
        self.echo = echo;
        self
    }

    pub fn with_orchestrator(mut self, orchestrator: &'a mut Orchestrator) -> Self {
        self.orchestrator = Some(orchestrator);
        self
    }

    pub fn with_loader(mut self, load: &'a ModuleLoader, base_dir: impl Into<PathBuf>) -> Self {
        self.loader = Some(load);
        self.base_dir = base_dir.into();
        self
    }

    fn install_builtins(&mut self, scope: ScopeId) {
        for export in stdlib::builtins() {
            self.scopes.define(
                scope,
                export.name,
                Value::Func(Rc::new(FuncValue::Native {
                    name: export.name,
                    func: export.func,
                })),
            );
        }
    }

    /// Executes a program against the root scope.
    pub fn run(&mut self, program: &Program) -> Result<(), RuntimeError> {
        for stmt in &program.statements {
            if let Flow::Return(_) = self.exec_stmt(self.root, stmt)? {
                break;
            }
        }
        Ok(())
    }

    /// A name's value in the root scope, mainly for embedding and tests.
    pub fn root_value(&self, name: &str) -> Option<Value> {
        self.scopes.lookup(self.root, name)
    }

    // ------------------------------------------------------------------
    // Statements
    // ------------------------------------------------------------------

    fn exec_stmt(&mut self, scope: ScopeId, stmt: &Stmt) -> Result<Flow, RuntimeError> {
        match &stmt.kind {
            StmtKind::Def {
                name,
                value,
                exported,
                ..
            } => {
                let evaluated = self.eval(scope, value)?;
                if *exported {
                    if let Some(key) = self.module_stack.last() {
                        if let Some(entry) = self.modules.get_mut(key) {
                            entry.exports.insert(name.name.clone(), evaluated.clone());
                        }
                    }
                }
                self.scopes.define(scope, name.name.clone(), evaluated);
                Ok(Flow::Normal)
            }

            StmtKind::Assign { target, value } => {
                let lvalue = self.resolve_lvalue(scope, target)?;
                let evaluated = self.eval(scope, value)?;
                self.write_lvalue(scope, lvalue, evaluated, target.span)?;
                Ok(Flow::Normal)
            }

            StmtKind::If {
                cond,
                then_branch,
                else_branch,
            } => {
                let condition = self.eval(scope, cond)?;
                if condition.is_truthy() {
                    self.exec_stmt(scope, then_branch)
                } else if let Some(branch) = else_branch {
                    self.exec_stmt(scope, branch)
                } else {
                    Ok(Flow::Normal)
                }
            }

            StmtKind::Block { statements } => {
                let inner = self.scopes.push_child(scope);
                for statement in statements {
                    match self.exec_stmt(inner, statement)? {
                        Flow::Normal => {}
                        flow => return Ok(flow),
                    }
                }
                Ok(Flow::Normal)
            }

            StmtKind::Return { value } => {
                let result = match value {
                    Some(expr) => self.eval(scope, expr)?,
                    None => Value::Nil,
                };
                Ok(Flow::Return(result))
            }

            StmtKind::Expr { expr } => {
                self.eval(scope, expr)?;
                Ok(Flow::Normal)
            }

            StmtKind::Import { spec, path } => {
                self.exec_import(scope, spec, path, stmt.span)?;
                Ok(Flow::Normal)
            }
        }
    }

    // ------------------------------------------------------------------
    // Expressions
    // ------------------------------------------------------------------

    fn eval(&mut self, scope: ScopeId, expr: &Expr) -> Result<Value, RuntimeError> {
        match &expr.kind {
            ExprKind::Int(n) => Ok(Value::Int(*n)),
            ExprKind::Dbl(d) => Ok(Value::Dbl(*d)),
            ExprKind::Bool(b) => Ok(Value::Bool(*b)),
            ExprKind::Str(s) => Ok(Value::Str(s.clone())),

            ExprKind::Array(elements) => {
                let mut values = Vec::with_capacity(elements.len());
                for element in elements {
                    values.push(self.eval(scope, element)?);
                }
                Ok(Value::array(values))
            }

            ExprKind::Object(entries) => {
                let mut fields = IndexMap::new();
                for (name, value) in entries {
                    fields.insert(name.name.clone(), self.eval(scope, value)?);
                }
                Ok(Value::object(fields))
            }

            ExprKind::Var(name) => self.scopes.lookup(scope, name).ok_or_else(|| {
                RuntimeError::new(format!("Unknown Identifier: '{}' is not defined", name))
                    .at(expr.span)
            }),

            ExprKind::Member { object, property } => {
                let value = self.eval(scope, object)?.payload();
                match value {
                    Value::Object(fields) => {
                        fields.borrow().get(&property.name).cloned().ok_or_else(|| {
                            RuntimeError::new(format!("Unknown Member: '{}'", property.name))
                                .at(property.span)
                        })
                    }
                    other => Err(RuntimeError::new(format!(
                        "Type Mismatch: Expected 'obj', got '{}'",
                        other.type_name()
                    ))
                    .at(object.span)),
                }
            }

            ExprKind::Index { object, index } => {
                let container = self.eval(scope, object)?.payload();
                let key = self.eval(scope, index)?.payload();
                match (container, key) {
                    (Value::Array(items), Value::Int(i)) => {
                        let items = items.borrow();
                        if i < 0 || i as usize >= items.len() {
                            return Err(RuntimeError::new(format!(
                                "Index Out Of Bounds: {} (length {})",
                                i,
                                items.len()
                            ))
                            .at(index.span));
                        }
                        Ok(items[i as usize].clone())
                    }
                    (Value::Array(_), other) => Err(RuntimeError::new(format!(
                        "Type Mismatch: Expected 'int', got '{}'",
                        other.type_name()
                    ))
                    .at(index.span)),
                    (Value::Object(fields), Value::Str(name)) => {
                        fields.borrow().get(&name).cloned().ok_or_else(|| {
                            RuntimeError::new(format!("Unknown Member: '{}'", name))
                                .at(index.span)
                        })
                    }
                    (Value::Object(_), other) => Err(RuntimeError::new(format!(
                        "Type Mismatch: Expected 'str', got '{}'",
                        other.type_name()
                    ))
                    .at(index.span)),
                    (other, _) => Err(RuntimeError::new(format!(
                        "Type Mismatch: Cannot index '{}'",
                        other.type_name()
                    ))
                    .at(object.span)),
                }
            }

            ExprKind::Call { callee, args } => {
                let callee_value = self.eval(scope, callee)?;
                let mut evaluated = Vec::with_capacity(args.len());
                for arg in args {
                    evaluated.push(self.eval(scope, arg)?);
                }

                // print is intercepted so its lines can be collected.
                if let Value::Func(f) = &callee_value {
                    if let FuncValue::Native { name: "print", .. } = f.as_ref() {
                        for value in &evaluated {
                            let line = value.display_string();
                            if self.echo {
                                println!("{}", line);
                            }
                            self.output.push(line);
                        }
                        return Ok(Value::Nil);
                    }
                }

                self.call_value(callee_value, evaluated, expr.span)
            }

            ExprKind::Lambda(def) => Ok(Value::Func(Rc::new(FuncValue::Lambda {
                def: def.clone(),
                env: scope,
            }))),

            ExprKind::Binary { op, left, right } => match op {
                BinaryOp::And => {
                    let lhs = self.eval(scope, left)?;
                    if !lhs.is_truthy() {
                        return Ok(Value::Bool(false));
                    }
                    let rhs = self.eval(scope, right)?;
                    Ok(Value::Bool(rhs.is_truthy()))
                }
                BinaryOp::Or => {
                    let lhs = self.eval(scope, left)?;
                    if lhs.is_truthy() {
                        return Ok(Value::Bool(true));
                    }
                    let rhs = self.eval(scope, right)?;
                    Ok(Value::Bool(rhs.is_truthy()))
                }
                _ => {
                    let lhs = self.eval(scope, left)?.payload();
                    let rhs = self.eval(scope, right)?.payload();
                    apply_binary(*op, lhs, rhs).map_err(|e| e.at(expr.span))
                }
            },

            ExprKind::Unary { op, operand } => {
                let value = self.eval(scope, operand)?;
                match op {
                    UnaryOp::Not => Ok(Value::Bool(!value.is_truthy())),
                    UnaryOp::Neg => match value.payload() {
                        Value::Int(n) => Ok(Value::Int(n.wrapping_neg())),
                        Value::Dbl(d) => Ok(Value::Dbl(-d)),
                        other => Err(RuntimeError::new(format!(
                            "Type Mismatch: Operator '-' requires a numeric operand, got '{}'",
                            other.type_name()
                        ))
                        .at(operand.span)),
                    },
                }
            }

            ExprKind::Update {
                op,
                prefix,
                target,
            } => {
                let lvalue = self.resolve_lvalue(scope, target)?;
                let old = self.read_lvalue(scope, &lvalue, target.span)?;
                let delta: i64 = match op {
                    UpdateOp::Increment => 1,
                    UpdateOp::Decrement => -1,
                };
                let new = match old.payload() {
                    Value::Int(n) => Value::Int(n.wrapping_add(delta)),
                    Value::Dbl(d) => Value::Dbl(d + delta as f64),
                    other => {
                        return Err(RuntimeError::new(format!(
                            "Type Mismatch: Update operators require a numeric target, got '{}'",
                            other.type_name()
                        ))
                        .at(target.span));
                    }
                };
                self.write_lvalue(scope, lvalue, new.clone(), target.span)?;
                Ok(if *prefix { new } else { old })
            }

            ExprKind::Convert { value, ty } => {
                let evaluated = self.eval(scope, value)?;
                convert_value(&evaluated, &Type::from_expr(ty)).map_err(|e| e.at(expr.span))
            }

            ExprKind::TypeOf { value } => {
                let evaluated = self.eval(scope, value)?;
                Ok(Value::Str(evaluated.type_name().to_string()))
            }

            ExprKind::Runtime(literal) => {
                let mut context = serde_json::Map::new();
                for (name, attr) in &literal.attrs {
                    let value = self.eval(scope, attr)?;
                    context.insert(name.name.clone(), value.to_json());
                }

                let Some(orchestrator) = self.orchestrator.as_deref_mut() else {
                    return Err(RuntimeError::new(format!(
                        "Unknown Container: '{}' is not configured",
                        literal.name.name
                    ))
                    .at(expr.span));
                };
                let payload = orchestrator
                    .execute(&literal.name.name, &literal.code, context)
                    .map_err(|e| RuntimeError::new(e.to_string()).at(expr.span))?;
                Ok(Value::unknown(Value::from_json(&payload)))
            }
        }
    }

    fn call_value(
        &mut self,
        callee: Value,
        args: Vec<Value>,
        span: Span,
    ) -> Result<Value, RuntimeError> {
        match callee {
            Value::Func(f) => match f.as_ref() {
                FuncValue::Native { func, .. } => func(&args).map_err(|e| e.at(span)),
                FuncValue::Lambda { def, env } => {
                    self.call_lambda(def.clone(), *env, args, span)
                }
            },
            Value::Unknown(inner) => self.call_value(inner.as_ref().clone(), args, span),
            other => Err(RuntimeError::new(format!(
                "Type Mismatch: Expected 'func', got '{}'",
                other.type_name()
            ))
            .at(span)),
        }
    }

    fn call_lambda(
        &mut self,
        def: Rc<LambdaExpr>,
        env: ScopeId,
        args: Vec<Value>,
        span: Span,
    ) -> Result<Value, RuntimeError> {
        if args.len() != def.params.len() {
            return Err(RuntimeError::new(format!(
                "Invalid Argument Count: Expected {}, got {}",
                def.params.len(),
                args.len()
            ))
            .at(span));
        }

        let call_scope = self.scopes.push_child(env);
        for (param, arg) in def.params.iter().zip(args) {
            self.scopes.define(call_scope, param.name.name.clone(), arg);
        }

        match &def.body {
            LambdaBody::Expr(expr) => self.eval(call_scope, expr),
            LambdaBody::Block(statements) => {
                for statement in statements {
                    if let Flow::Return(value) = self.exec_stmt(call_scope, statement)? {
                        return Ok(value);
                    }
                }
                Ok(Value::Nil)
            }
        }
    }

    // ------------------------------------------------------------------
    // L-values
    // ------------------------------------------------------------------

    fn resolve_lvalue(&mut self, scope: ScopeId, target: &Expr) -> Result<LValue, RuntimeError> {
        match &target.kind {
            ExprKind::Var(name) => Ok(LValue::Var(name.clone())),
            ExprKind::Member { object, property } => {
                let value = self.eval(scope, object)?.payload();
                match value {
                    Value::Object(fields) => Ok(LValue::Member(fields, property.name.clone())),
                    other => Err(RuntimeError::new(format!(
                        "Type Mismatch: Expected 'obj', got '{}'",
                        other.type_name()
                    ))
                    .at(object.span)),
                }
            }
            ExprKind::Index { object, index } => {
                let container = self.eval(scope, object)?.payload();
                let key = self.eval(scope, index)?.payload();
                match (container, key) {
                    (Value::Array(items), Value::Int(i)) => {
                        let len = items.borrow().len();
                        if i < 0 || i as usize >= len {
                            return Err(RuntimeError::new(format!(
                                "Index Out Of Bounds: {} (length {})",
                                i, len
                            ))
                            .at(index.span));
                        }
                        Ok(LValue::Element(items, i as usize))
                    }
                    (Value::Array(_), other) => Err(RuntimeError::new(format!(
                        "Type Mismatch: Expected 'int', got '{}'",
                        other.type_name()
                    ))
                    .at(index.span)),
                    (Value::Object(fields), Value::Str(name)) => {
                        Ok(LValue::Member(fields, name))
                    }
                    (Value::Object(_), other) => Err(RuntimeError::new(format!(
                        "Type Mismatch: Expected 'str', got '{}'",
                        other.type_name()
                    ))
                    .at(index.span)),
                    (other, _) => Err(RuntimeError::new(format!(
                        "Type Mismatch: Cannot index '{}'",
                        other.type_name()
                    ))
                    .at(object.span)),
                }
            }
            _ => Err(RuntimeError::new("Invalid assignment target").at(target.span)),
        }
    }

    fn read_lvalue(
        &self,
        scope: ScopeId,
        lvalue: &LValue,
        span: Span,
    ) -> Result<Value, RuntimeError> {
        match lvalue {
            LValue::Var(name) => self.scopes.lookup(scope, name).ok_or_else(|| {
                RuntimeError::new(format!("Unknown Identifier: '{}' is not defined", name))
                    .at(span)
            }),
            LValue::Member(fields, name) => {
                fields.borrow().get(name).cloned().ok_or_else(|| {
                    RuntimeError::new(format!("Unknown Member: '{}'", name)).at(span)
                })
            }
            LValue::Element(items, index) => Ok(items.borrow()[*index].clone()),
        }
    }

    fn write_lvalue(
        &mut self,
        scope: ScopeId,
        lvalue: LValue,
        value: Value,
        span: Span,
    ) -> Result<(), RuntimeError> {
        match lvalue {
            LValue::Var(name) => {
                if self.scopes.assign(scope, &name, value) {
                    Ok(())
                } else {
                    Err(
                        RuntimeError::new(format!("Unknown Identifier: '{}' is not defined", name))
                            .at(span),
                    )
                }
            }
            LValue::Member(fields, name) => {
                fields.borrow_mut().insert(name, value);
                Ok(())
            }
            LValue::Element(items, index) => {
                items.borrow_mut()[index] = value;
                Ok(())
            }
        }
    }

    // ------------------------------------------------------------------
    // Imports
    // ------------------------------------------------------------------

    fn exec_import(
        &mut self,
        scope: ScopeId,
        spec: &ImportSpec,
        path: &str,
        span: Span,
    ) -> Result<(), RuntimeError> {
        if path.starts_with('.') {
            self.exec_relative_import(scope, spec, path, span)
        } else {
            self.exec_stdlib_import(scope, spec, path, span)
        }
    }

    fn exec_relative_import(
        &mut self,
        scope: ScopeId,
        spec: &ImportSpec,
        path: &str,
        span: Span,
    ) -> Result<(), RuntimeError> {
        let Some(load) = self.loader else {
            return Err(
                RuntimeError::new("Invalid Import: No module loader is configured").at(span),
            );
        };
        let key = loader::module_key(path, &self.base_dir);

        // Each module executes at most once per run; later imports bind
        // against the cached exports.
        if !self.modules.contains_key(&key) {
            let Some(source) = load(path, &self.base_dir) else {
                return Err(RuntimeError::new(format!(
                    "Invalid Import: Cannot resolve module '{}'",
                    path
                ))
                .at(span));
            };
            let program = parse(&source).map_err(|diag| {
                RuntimeError::new(format!(
                    "Invalid Import: Failed to parse module '{}': {}",
                    path, diag.message
                ))
                .at(span)
            })?;

            self.modules.insert(key.clone(), ModuleEntry::default());
            let module_base = loader::module_base_dir(path, &self.base_dir);
            let saved_base = std::mem::replace(&mut self.base_dir, module_base);
            self.module_stack.push(key.clone());

            let module_root = self.scopes.push_root();
            self.install_builtins(module_root);

            let mut outcome = Ok(());
            for stmt in &program.statements {
                match self.exec_stmt(module_root, stmt) {
                    Ok(Flow::Return(_)) => break,
                    Ok(Flow::Normal) => {}
                    Err(err) => {
                        outcome = Err(err);
                        break;
                    }
                }
            }

            self.module_stack.pop();
            self.base_dir = saved_base;
            if let Some(entry) = self.modules.get_mut(&key) {
                entry.complete = true;
            }
            outcome?;
        }

        let entry = &self.modules[&key];
        match spec {
            ImportSpec::Named(names) => {
                let mut bindings = Vec::new();
                for import in names {
                    let Some(value) = entry.exports.get(&import.name.name) else {
                        return Err(RuntimeError::new(format!(
                            "Invalid Import: '{}' is not exported by '{}'",
                            import.name.name, path
                        ))
                        .at(import.name.span));
                    };
                    let target = import.alias.as_ref().unwrap_or(&import.name);
                    bindings.push((target.name.clone(), value.clone()));
                }
                for (name, value) in bindings {
                    self.scopes.define(scope, name, value);
                }
                Ok(())
            }
            ImportSpec::Default(name) => {
                let exports = entry.exports.clone();
                self.scopes
                    .define(scope, name.name.clone(), Value::object(exports));
                Ok(())
            }
        }
    }

    fn exec_stdlib_import(
        &mut self,
        scope: ScopeId,
        spec: &ImportSpec,
        path: &str,
        span: Span,
    ) -> Result<(), RuntimeError> {
        let Some(module) = stdlib::module(path) else {
            return Err(
                RuntimeError::new(format!("Invalid Import: Unknown module '{}'", path)).at(span),
            );
        };
        match spec {
            ImportSpec::Named(names) => {
                for import in names {
                    let Some(export) = module.get(&import.name.name) else {
                        return Err(RuntimeError::new(format!(
                            "Invalid Import: '{}' is not exported by '{}'",
                            import.name.name, path
                        ))
                        .at(import.name.span));
                    };
                    let target = import.alias.as_ref().unwrap_or(&import.name);
                    self.scopes.define(
                        scope,
                        target.name.clone(),
                        Value::Func(Rc::new(FuncValue::Native {
                            name: export.name,
                            func: export.func,
                        })),
                    );
                }
                Ok(())
            }
            ImportSpec::Default(name) => {
                let mut fields = IndexMap::new();
                for (export_name, export) in &module.exports {
                    fields.insert(
                        export_name.to_string(),
                        Value::Func(Rc::new(FuncValue::Native {
                            name: export.name,
                            func: export.func,
                        })),
                    );
                }
                self.scopes
                    .define(scope, name.name.clone(), Value::object(fields));
                Ok(())
            }
        }
    }
}

// ----------------------------------------------------------------------
// Binary operators
// ----------------------------------------------------------------------

fn apply_binary(op: BinaryOp, left: Value, right: Value) -> Result<Value, RuntimeError> {
    match op {
        BinaryOp::Add => apply_add(left, right),
        BinaryOp::Sub => numeric_op(op, left, right, i64::wrapping_sub, |a, b| a - b),
        BinaryOp::Mul => numeric_op(op, left, right, i64::wrapping_mul, |a, b| a * b),
        BinaryOp::Div => {
            let (a, b) = both_numbers(op, &left, &right)?;
            if b == 0.0 {
                return Err(RuntimeError::new("Division by zero"));
            }
            // Division always widens to dbl.
            Ok(Value::Dbl(a / b))
        }
        BinaryOp::Mod => match (&left, &right) {
            (Value::Int(a), Value::Int(b)) => {
                if *b == 0 {
                    Err(RuntimeError::new("Modulo by zero"))
                } else {
                    Ok(Value::Int(a.wrapping_rem(*b)))
                }
            }
            _ => {
                let (a, b) = both_numbers(op, &left, &right)?;
                if b == 0.0 {
                    Err(RuntimeError::new("Modulo by zero"))
                } else {
                    Ok(Value::Dbl(a % b))
                }
            }
        },
        BinaryOp::Eq => Ok(Value::Bool(left.equals(&right))),
        BinaryOp::NotEq => Ok(Value::Bool(!left.equals(&right))),
        BinaryOp::Lt => compare(op, left, right, |o| o == std::cmp::Ordering::Less),
        BinaryOp::LtEq => compare(op, left, right, |o| o != std::cmp::Ordering::Greater),
        BinaryOp::Gt => compare(op, left, right, |o| o == std::cmp::Ordering::Greater),
        BinaryOp::GtEq => compare(op, left, right, |o| o != std::cmp::Ordering::Less),
        BinaryOp::And | BinaryOp::Or => unreachable!("logical operators short-circuit in eval"),
    }
}

fn apply_add(left: Value, right: Value) -> Result<Value, RuntimeError> {
    match (&left, &right) {
        (Value::Str(a), Value::Str(b)) => Ok(Value::Str(format!("{}{}", a, b))),
        (Value::Str(a), other) => Ok(Value::Str(format!("{}{}", a, other.display_string()))),
        (other, Value::Str(b)) => Ok(Value::Str(format!("{}{}", other.display_string(), b))),
        (Value::Int(a), Value::Int(b)) => Ok(Value::Int(a.wrapping_add(*b))),
        (Value::Array(a), Value::Array(b)) => {
            let mut items = a.borrow().clone();
            items.extend(b.borrow().iter().cloned());
            Ok(Value::array(items))
        }
        (Value::Object(a), Value::Object(b)) => {
            let mut fields = a.borrow().clone();
            for (name, value) in b.borrow().iter() {
                fields.insert(name.clone(), value.clone());
            }
            Ok(Value::object(fields))
        }
        _ => match (left.as_number(), right.as_number()) {
            (Some(a), Some(b)) => Ok(Value::Dbl(a + b)),
            _ => Err(RuntimeError::new(format!(
                "Type Mismatch: Cannot add '{}' and '{}'",
                left.type_name(),
                right.type_name()
            ))),
        },
    }
}

fn numeric_op(
    op: BinaryOp,
    left: Value,
    right: Value,
    int_op: fn(i64, i64) -> i64,
    dbl_op: fn(f64, f64) -> f64,
) -> Result<Value, RuntimeError> {
    match (&left, &right) {
        (Value::Int(a), Value::Int(b)) => Ok(Value::Int(int_op(*a, *b))),
        (Value::Dbl(a), Value::Dbl(b)) => Ok(Value::Dbl(dbl_op(*a, *b))),
        _ => {
            let (a, b) = both_numbers(op, &left, &right)?;
            Ok(Value::Dbl(dbl_op(a, b)))
        }
    }
}

fn both_numbers(op: BinaryOp, left: &Value, right: &Value) -> Result<(f64, f64), RuntimeError> {
    match (left.as_number(), right.as_number()) {
        (Some(a), Some(b)) => Ok((a, b)),
        _ => Err(RuntimeError::new(format!(
            "Type Mismatch: Operator '{}' requires numeric operands, got '{}' and '{}'",
            op.symbol(),
            left.type_name(),
            right.type_name()
        ))),
    }
}

fn compare(
    op: BinaryOp,
    left: Value,
    right: Value,
    accept: fn(std::cmp::Ordering) -> bool,
) -> Result<Value, RuntimeError> {
    let ordering = match (&left, &right) {
        (Value::Str(a), Value::Str(b)) => a.cmp(b),
        _ => {
            let (a, b) = both_numbers(op, &left, &right)?;
            a.partial_cmp(&b).unwrap_or(std::cmp::Ordering::Equal)
        }
    };
    Ok(Value::Bool(accept(ordering)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run_source(source: &str) -> Interpreter<'static> {
        let program = parse(source).expect("parses");
        let mut interpreter = Interpreter::new();
        interpreter.run(&program).expect("runs");
        interpreter
    }

    fn int_value(interpreter: &Interpreter<'_>, name: &str) -> i64 {
        match interpreter.root_value(name) {
            Some(Value::Int(n)) => n,
            other => panic!("expected int for {}, got {:?}", name, other),
        }
    }

    #[test]
    fn arithmetic_declarations() {
        let interpreter = run_source("int a = 10; int b = 20; int c = a + b;");
        assert_eq!(int_value(&interpreter, "c"), 30);
        assert!(matches!(
            interpreter.root_value("c"),
            Some(Value::Int(_))
        ));
    }

    #[test]
    fn conditional_takes_else_branch() {
        let interpreter =
            run_source("int x = 1; int r = 0; if (x > 5) { r = 1; } else { r = 2; }");
        assert_eq!(int_value(&interpreter, "r"), 2);
    }

    #[test]
    fn recursion_computes_fibonacci() {
        let interpreter = run_source(
            "func fib(int v): int { if (v <= 1) { return v; } return fib(v-1) + fib(v-2); } int r = fib(10);",
        );
        assert_eq!(int_value(&interpreter, "r"), 55);
    }

    #[test]
    fn closures_capture_their_environment() {
        let interpreter = run_source(
            "int counter = 0; func bump(): int { counter = counter + 1; return counter; } bump(); bump(); int r = bump();",
        );
        assert_eq!(int_value(&interpreter, "r"), 3);
        assert_eq!(int_value(&interpreter, "counter"), 3);
    }

    #[test]
    fn lambda_expression_bodies_and_first_class_use() {
        let interpreter = run_source(
            "func twice = (int x): int => x * 2; obj ops = { twice: twice }; int r = ops.twice(21);",
        );
        assert_eq!(int_value(&interpreter, "r"), 42);
    }

    #[test]
    fn block_scopes_restore_on_return_paths() {
        let interpreter = run_source(
            "int x = 1; func f(): int { { int x = 99; return x; } } int r = f(); x = x + 1;",
        );
        assert_eq!(int_value(&interpreter, "r"), 99);
        assert_eq!(int_value(&interpreter, "x"), 2);
    }

    #[test]
    fn division_always_yields_double() {
        let interpreter = run_source("dbl d = 10.0 / 4.0;");
        assert!(matches!(
            interpreter.root_value("d"),
            Some(Value::Dbl(v)) if v == 2.5
        ));
    }

    #[test]
    fn division_by_zero_is_an_error() {
        let program = parse("dbl d = 1.0 / 0.0;").expect("parses");
        let mut interpreter = Interpreter::new();
        let err = interpreter.run(&program).expect_err("fails");
        assert!(err.message.contains("Division by zero"));
        assert!(err.span.is_some());
    }

    #[test]
    fn update_operators_prefix_and_postfix() {
        let interpreter = run_source("int x = 5; int a = x++; int b = ++x; int c = --x;");
        assert_eq!(int_value(&interpreter, "a"), 5);
        assert_eq!(int_value(&interpreter, "b"), 7);
        assert_eq!(int_value(&interpreter, "c"), 6);
        assert_eq!(int_value(&interpreter, "x"), 6);
    }

    #[test]
    fn member_and_index_assignment() {
        let interpreter = run_source(
            "obj p = { x: 1 }; p.x = 5; array<int> xs = [1, 2, 3]; xs[1] = 9; int a = p.x; int b = xs[1];",
        );
        assert_eq!(int_value(&interpreter, "a"), 5);
        assert_eq!(int_value(&interpreter, "b"), 9);
    }

    #[test]
    fn index_out_of_bounds_is_reported_with_location() {
        let program = parse("array<int> xs = [1]; int a = xs[3];").expect("parses");
        let mut interpreter = Interpreter::new();
        let err = interpreter.run(&program).expect_err("fails");
        assert!(err.message.contains("Index Out Of Bounds: 3 (length 1)"));
        assert!(err.span.is_some());
    }

    #[test]
    fn print_collects_rendered_lines() {
        let interpreter = run_source("print(\"hello\"); print(1 + 2); print([1, 2]);");
        assert_eq!(interpreter.output, vec!["hello", "3", "[1, 2]"]);
    }

    #[test]
    fn typeof_reports_tags() {
        let interpreter = run_source(
            "str a = typeof 1; str b = typeof 1.5; str c = typeof \"x\"; str d = typeof [1]; str e = typeof { x: 1 };",
        );
        for (name, expected) in [("a", "int"), ("b", "dbl"), ("c", "str"), ("d", "array"), ("e", "obj")] {
            assert!(matches!(
                interpreter.root_value(name),
                Some(Value::Str(s)) if s == expected
            ));
        }
    }

    #[test]
    fn conversions_chain_idempotently() {
        let interpreter = run_source("int a = 3.9 ~ int; int b = 3.9 ~ int ~ int;");
        assert_eq!(int_value(&interpreter, "a"), 3);
        assert_eq!(int_value(&interpreter, "b"), 3);
    }

    #[test]
    fn string_casts_via_builtins() {
        let interpreter = run_source("str s = str(42); int i = int(\"7.9\"); dbl d = double(2);");
        assert!(matches!(
            interpreter.root_value("s"),
            Some(Value::Str(v)) if v == "42"
        ));
        assert_eq!(int_value(&interpreter, "i"), 7);
        assert!(matches!(
            interpreter.root_value("d"),
            Some(Value::Dbl(v)) if v == 2.0
        ));
    }

    #[test]
    fn stdlib_imports_are_callable() {
        let interpreter = run_source(
            "import { floor } from \"math\"; import math from \"math\"; int a = floor(2.9) ~ int; int b = math.ceil(2.1) ~ int;",
        );
        assert_eq!(int_value(&interpreter, "a"), 2);
        assert_eq!(int_value(&interpreter, "b"), 3);
    }

    #[test]
    fn runtime_literal_without_orchestrator_fails_at_the_call_site() {
        let program = parse("str s = <py>return 1</py>;").expect("parses");
        let mut interpreter = Interpreter::new();
        let err = interpreter.run(&program).expect_err("fails");
        assert!(err.message.contains("Unknown Container: 'py'"));
        assert!(err.span.is_some());
    }

    #[test]
    fn unknown_values_apply_operators_permissively() {
        // No orchestrator here, so fabricate an unknown through equality
        // with a converted value instead.
        let interpreter =
            run_source("unknown u = 4 ~ unknown; int r = (u + 1) ~ int; bool eq = u == 4;");
        assert_eq!(int_value(&interpreter, "r"), 5);
        assert!(matches!(
            interpreter.root_value("eq"),
            Some(Value::Bool(true))
        ));
    }

    #[test]
    fn first_runtime_error_aborts_execution() {
        let program = parse("int a = 1; int b = missing; int c = 2;").expect("parses");
        let mut interpreter = Interpreter::new();
        let err = interpreter.run(&program).expect_err("fails");
        assert!(err.message.contains("Unknown Identifier: 'missing'"));
        assert!(interpreter.root_value("c").is_none());
    }
}
