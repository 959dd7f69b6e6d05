//! Scope and type checking.
//!
//! One walk over the tree in source order. Expressions yield a [`Type`];
//! statements yield nothing. The first violated rule ends the walk.

use std::collections::HashMap;

use crate::ast::{
    BinaryOp, Bound, ExprKind, ExprNode, Node, Procedure, Program, StandardType, StmtKind,
    StmtNode, TypeSpec, UnaryOp, Variable,
};
use crate::{CompileError, CompileResult};

const INTEGER: Type = Type::Standard(StandardType::Integer);
const CHAR: Type = Type::Standard(StandardType::Char);
const BOOLEAN: Type = Type::Standard(StandardType::Boolean);

const MAX_LITERAL: i64 = 32767;
// Only reachable as the operand of unary minus, for -32768.
const MAX_NEGATED_LITERAL: i64 = 32768;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Type {
    Standard(StandardType),
    // Bounds are checked at the declaration and not carried further.
    Array(StandardType),
}

impl Type {
    pub fn is_array(self) -> bool {
        matches!(self, Type::Array(_))
    }

    /// Whether `readln`/`writeln` accept a value of this type.
    pub fn is_printable(self) -> bool {
        matches!(self, INTEGER | CHAR | Type::Array(StandardType::Char))
    }
}

impl From<&TypeSpec> for Type {
    fn from(spec: &TypeSpec) -> Self {
        match spec {
            TypeSpec::Standard(ty) => Type::Standard(*ty),
            TypeSpec::Array { elem, .. } => Type::Array(*elem),
        }
    }
}

#[derive(Debug, Default)]
pub struct Checker {
    globals: HashMap<String, Type>,
    locals: HashMap<String, Type>,
    // Procedure name to its formal parameter types, in order.
    procs: HashMap<String, Vec<StandardType>>,
}

impl Checker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn check(&mut self, program: &Program) -> CompileResult<()> {
        self.globals.clear();
        self.locals.clear();
        self.procs.clear();

        for var in &program.vars {
            let r#type = self.type_spec(&var.r#type)?;
            if self.globals.contains_key(&var.name) {
                return Err(error(var.line));
            }
            self.globals.insert(var.name.clone(), r#type);
        }

        for proc in &program.procs {
            self.procedure(proc)?;
        }

        self.stmt(&program.body)
    }

    fn procedure(&mut self, proc: &Procedure) -> CompileResult<()> {
        if self.globals.contains_key(&proc.name) || self.procs.contains_key(&proc.name) {
            return Err(error(proc.line));
        }
        // Registered before the body so the procedure can call itself.
        let params = proc.params.iter().map(|p| p.r#type).collect();
        self.procs.insert(proc.name.clone(), params);

        self.locals.clear();
        for param in &proc.params {
            self.declare_local(proc, &param.name, Type::Standard(param.r#type), param.line)?;
        }
        for var in &proc.vars {
            let r#type = self.type_spec(&var.r#type)?;
            self.declare_local(proc, &var.name, r#type, var.line)?;
        }

        self.stmt(&proc.body)?;
        self.locals.clear();
        Ok(())
    }

    fn declare_local(
        &mut self,
        proc: &Procedure,
        name: &str,
        r#type: Type,
        line: usize,
    ) -> CompileResult<()> {
        if name == proc.name || self.locals.contains_key(name) {
            return Err(error(line));
        }
        self.locals.insert(name.to_string(), r#type);
        Ok(())
    }

    fn lookup(&self, name: &str) -> Option<Type> {
        self.locals.get(name).or_else(|| self.globals.get(name)).copied()
    }

    fn type_spec(&self, spec: &Node<TypeSpec>) -> CompileResult<Type> {
        if let TypeSpec::Array { min, max, .. } = &spec.kind {
            if !bound_in_range(*min) || !bound_in_range(*max) || min.value() > max.value() {
                return Err(error(spec.line));
            }
        }
        Ok(Type::from(&spec.kind))
    }

    fn stmt(&mut self, stmt: &StmtNode) -> CompileResult<()> {
        match &stmt.kind {
            StmtKind::Assign(target, value) => {
                let target_type = self.variable(&target.kind, target.line)?;
                let value_type = self.expr(value)?;
                if target_type != value_type || target_type.is_array() {
                    return Err(error(stmt.line));
                }
            }
            StmtKind::Call(name, args) => {
                let mut actual = Vec::with_capacity(args.len());
                for arg in args {
                    actual.push(self.expr(arg)?);
                }
                let formal = self.procs.get(name).ok_or(error(stmt.line))?;
                let matches = formal.len() == actual.len()
                    && formal
                        .iter()
                        .zip(&actual)
                        .all(|(f, a)| Type::Standard(*f) == *a);
                if !matches {
                    return Err(error(stmt.line));
                }
            }
            StmtKind::If(cond, then, r#else) => {
                if self.expr(cond)? != BOOLEAN {
                    return Err(error(stmt.line));
                }
                self.stmt(then)?;
                if let Some(r#else) = r#else {
                    self.stmt(r#else)?;
                }
            }
            StmtKind::While(cond, body) => {
                if self.expr(cond)? != BOOLEAN {
                    return Err(error(stmt.line));
                }
                self.stmt(body)?;
            }
            StmtKind::Read(targets) => {
                for target in targets {
                    if !self.variable(&target.kind, target.line)?.is_printable() {
                        return Err(error(target.line));
                    }
                }
            }
            StmtKind::Write(values) => {
                for value in values {
                    if !self.expr(value)?.is_printable() {
                        return Err(error(value.line));
                    }
                }
            }
            StmtKind::Block(stmts) => {
                for stmt in stmts {
                    self.stmt(stmt)?;
                }
            }
        }
        Ok(())
    }

    fn variable(&mut self, var: &Variable, line: usize) -> CompileResult<Type> {
        let declared = self
            .lookup(&var.name)
            .ok_or(error(line))?;

        let Some(index) = &var.index else {
            return Ok(declared);
        };
        let index_type = self.expr(index)?;
        match declared {
            Type::Array(elem) if index_type == INTEGER => Ok(Type::Standard(elem)),
            _ => Err(error(line)),
        }
    }

    fn expr(&mut self, expr: &ExprNode) -> CompileResult<Type> {
        match &expr.kind {
            ExprKind::Number(value) => {
                check_literal(*value, MAX_LITERAL, expr.line)?;
                Ok(INTEGER)
            }
            ExprKind::Str(value) => match value.chars().count() {
                0 => Err(error(expr.line)),
                1 => Ok(CHAR),
                _ => Ok(Type::Array(StandardType::Char)),
            },
            ExprKind::Bool(_) => Ok(BOOLEAN),
            ExprKind::Var(var) => self.variable(var, expr.line),
            ExprKind::Unary(op, operand) => {
                let operand_type = match (op, &operand.kind) {
                    (UnaryOp::Neg, ExprKind::Number(value)) => {
                        check_literal(*value, MAX_NEGATED_LITERAL, operand.line)?;
                        INTEGER
                    }
                    _ => self.expr(operand)?,
                };
                let expected = match op {
                    UnaryOp::Plus | UnaryOp::Neg => INTEGER,
                    UnaryOp::Not => BOOLEAN,
                };
                if operand_type != expected {
                    return Err(error(expr.line));
                }
                Ok(operand_type)
            }
            ExprKind::Binary(op, lhs, rhs) => {
                let lhs = self.expr(lhs)?;
                let rhs = self.expr(rhs)?;
                binary_type(*op, lhs, rhs).ok_or(error(expr.line))
            }
        }
    }
}

fn binary_type(op: BinaryOp, lhs: Type, rhs: Type) -> Option<Type> {
    if op.is_arithmetic() {
        (lhs == INTEGER && rhs == INTEGER).then_some(INTEGER)
    } else if op.is_logical() {
        (lhs == BOOLEAN && rhs == BOOLEAN).then_some(BOOLEAN)
    } else {
        (lhs == rhs).then_some(BOOLEAN)
    }
}

fn bound_in_range(bound: Bound) -> bool {
    let limit = if bound.negative {
        MAX_NEGATED_LITERAL
    } else {
        MAX_LITERAL
    };
    bound.magnitude <= limit
}

fn check_literal(value: i64, limit: i64, line: usize) -> CompileResult<()> {
    if value > limit {
        return Err(error(line));
    }
    Ok(())
}

fn error(line: usize) -> CompileError {
    CompileError::Semantic { line }
}
