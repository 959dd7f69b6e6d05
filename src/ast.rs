//! Syntax tree shared by the checker and the code generator.
//!
//! Every node kind is a closed enum variant whose fields fix the arity and
//! meaning of its children. The tree is built bottom-up by the parser and
//! never mutated afterwards.

use std::fmt::Write;

use crate::P;

#[derive(Debug, Clone, PartialEq)]
pub struct Node<Kind> {
    pub kind: Kind,
    pub line: usize,
}

impl<Kind> Node<Kind> {
    pub fn new(kind: Kind, line: usize) -> Self {
        Self { kind, line }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StandardType {
    Integer,
    Char,
    Boolean,
}

impl StandardType {
    pub fn name(self) -> &'static str {
        match self {
            StandardType::Integer => "integer",
            StandardType::Char => "char",
            StandardType::Boolean => "boolean",
        }
    }
}

/// A signed array bound as written in the source, e.g. `-5`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Bound {
    pub negative: bool,
    pub magnitude: i64,
}

impl Bound {
    pub fn value(self) -> i64 {
        if self.negative {
            -self.magnitude
        } else {
            self.magnitude
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum TypeSpec {
    Standard(StandardType),
    Array {
        min: Bound,
        max: Bound,
        elem: StandardType,
    },
}

/// One declared name. `var a, b: integer;` yields two of these sharing a type.
#[derive(Debug, Clone, PartialEq)]
pub struct VarDecl {
    pub name: String,
    pub r#type: Node<TypeSpec>,
    pub line: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Param {
    pub name: String,
    pub r#type: StandardType,
    pub line: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Procedure {
    pub name: String,
    pub params: Vec<Param>,
    pub vars: Vec<VarDecl>,
    pub body: StmtNode,
    pub line: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Program {
    pub name: String,
    pub vars: Vec<VarDecl>,
    pub procs: Vec<Procedure>,
    pub body: StmtNode,
    pub line: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Plus,
    Neg,
    Not,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Or,
    Mul,
    // `/` and `div` are the same operator spelled two ways.
    Div,
    Mod,
    And,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl BinaryOp {
    pub fn is_arithmetic(self) -> bool {
        matches!(
            self,
            BinaryOp::Add | BinaryOp::Sub | BinaryOp::Mul | BinaryOp::Div | BinaryOp::Mod
        )
    }

    pub fn is_logical(self) -> bool {
        matches!(self, BinaryOp::And | BinaryOp::Or)
    }

    pub fn is_relational(self) -> bool {
        matches!(
            self,
            BinaryOp::Eq | BinaryOp::Ne | BinaryOp::Lt | BinaryOp::Le | BinaryOp::Gt | BinaryOp::Ge
        )
    }

    pub fn symbol(self) -> &'static str {
        match self {
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Or => "or",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "div",
            BinaryOp::Mod => "mod",
            BinaryOp::And => "and",
            BinaryOp::Eq => "=",
            BinaryOp::Ne => "<>",
            BinaryOp::Lt => "<",
            BinaryOp::Le => "<=",
            BinaryOp::Gt => ">",
            BinaryOp::Ge => ">=",
        }
    }
}

impl UnaryOp {
    pub fn symbol(self) -> &'static str {
        match self {
            UnaryOp::Plus => "+",
            UnaryOp::Neg => "-",
            UnaryOp::Not => "not",
        }
    }
}

/// A variable reference: `x` or `x[i]`.
#[derive(Debug, Clone, PartialEq)]
pub struct Variable {
    pub name: String,
    pub index: Option<P<ExprNode>>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ExprKind {
    Number(i64),
    // Contents between the quotes, with `''` already folded to `'`.
    Str(String),
    Bool(bool),
    Var(Variable),
    Unary(UnaryOp, P<ExprNode>),
    Binary(BinaryOp, P<ExprNode>, P<ExprNode>),
}

#[derive(Debug, Clone, PartialEq)]
pub enum StmtKind {
    Assign(VarNode, ExprNode),
    Call(String, Vec<ExprNode>),
    // The branches are always `Block`s.
    If(P<ExprNode>, P<StmtNode>, Option<P<StmtNode>>),
    While(P<ExprNode>, P<StmtNode>),
    Read(Vec<VarNode>),
    Write(Vec<ExprNode>),
    Block(Vec<StmtNode>),
}

pub type ExprNode = Node<ExprKind>;
pub type StmtNode = Node<StmtKind>;
pub type VarNode = Node<Variable>;

impl ExprKind {
    pub fn label(&self) -> &'static str {
        match self {
            ExprKind::Number(_) => "NumberLiteral",
            ExprKind::Str(_) => "StringLiteral",
            ExprKind::Bool(_) => "BooleanLiteral",
            ExprKind::Var(var) => var.label(),
            ExprKind::Unary(..) => "UnaryOperator",
            ExprKind::Binary(..) => "BinaryOperator",
        }
    }
}

impl Variable {
    pub fn label(&self) -> &'static str {
        if self.index.is_some() {
            "IndexedVariable"
        } else {
            "SimpleVariable"
        }
    }
}

impl StmtKind {
    pub fn label(&self) -> &'static str {
        match self {
            StmtKind::Assign(..) => "Assignment",
            StmtKind::Call(..) => "ProcedureCall",
            StmtKind::If(..) => "IfStatement",
            StmtKind::While(..) => "WhileStatement",
            StmtKind::Read(_) => "InputStatement",
            StmtKind::Write(_) => "OutputStatement",
            StmtKind::Block(_) => "Statements",
        }
    }
}

impl TypeSpec {
    pub fn label(&self) -> &'static str {
        match self {
            TypeSpec::Standard(_) => "StandardType",
            TypeSpec::Array { .. } => "ArrayType",
        }
    }
}

/// Render the tree one node per line, children indented under their parent,
/// as `Label` or `Label (text)`.
pub fn dump(program: &Program) -> String {
    let mut printer = Printer::default();
    printer.program(program);
    printer.out
}

#[derive(Default)]
struct Printer {
    out: String,
    depth: usize,
}

impl Printer {
    fn line(&mut self, label: &str, text: Option<&str>) {
        let indent = "  ".repeat(self.depth);
        // Writing into a String cannot fail.
        let _ = match text {
            Some(text) => writeln!(self.out, "{indent}{label} ({text})"),
            None => writeln!(self.out, "{indent}{label}"),
        };
    }

    fn nested(&mut self, label: &str, text: Option<&str>, children: impl FnOnce(&mut Self)) {
        self.line(label, text);
        self.depth += 1;
        children(self);
        self.depth -= 1;
    }

    fn program(&mut self, program: &Program) {
        self.nested("Program", None, |p| {
            p.line("ProgramName", Some(program.name.as_str()));
            for var in &program.vars {
                p.var_decl(var);
            }
            for proc in &program.procs {
                p.procedure(proc);
            }
            p.stmt(&program.body);
        });
    }

    fn var_decl(&mut self, var: &VarDecl) {
        self.nested("VariableDeclarator", Some(var.name.as_str()), |p| {
            p.type_spec(&var.r#type.kind)
        });
    }

    fn type_spec(&mut self, spec: &TypeSpec) {
        match spec {
            TypeSpec::Standard(ty) => self.line(spec.label(), Some(ty.name())),
            TypeSpec::Array { min, max, elem } => {
                self.nested(spec.label(), None, |p| {
                    p.line("NumberLiteral", Some(min.value().to_string().as_str()));
                    p.line("NumberLiteral", Some(max.value().to_string().as_str()));
                    p.line("StandardType", Some(elem.name()));
                });
            }
        }
    }

    fn procedure(&mut self, proc: &Procedure) {
        self.nested("Subprogram", None, |p| {
            p.nested("ProcedureDeclarator", Some(proc.name.as_str()), |p| {
                for param in &proc.params {
                    p.nested("FormalParameterDeclarator", Some(param.name.as_str()), |p| {
                        p.line("StandardType", Some(param.r#type.name()))
                    });
                }
            });
            for var in &proc.vars {
                p.var_decl(var);
            }
            p.stmt(&proc.body);
        });
    }

    fn stmt(&mut self, stmt: &StmtNode) {
        let label = stmt.kind.label();
        match &stmt.kind {
            StmtKind::Assign(target, value) => self.nested(label, Some(":="), |p| {
                p.nested("LeftValue", None, |p| p.variable(target));
                p.expr(value);
            }),
            StmtKind::Call(name, args) => self.nested(label, Some(name.as_str()), |p| {
                for arg in args {
                    p.expr(arg);
                }
            }),
            StmtKind::If(cond, then, r#else) => self.nested(label, None, |p| {
                p.nested("IfExp", None, |p| p.expr(cond));
                p.nested("ThenStatement", None, |p| p.stmt(then));
                p.nested("ElseStatement", None, |p| {
                    if let Some(r#else) = r#else {
                        p.stmt(r#else);
                    }
                });
            }),
            StmtKind::While(cond, body) => self.nested(label, None, |p| {
                p.nested("WhileExp", None, |p| p.expr(cond));
                p.stmt(body);
            }),
            StmtKind::Read(targets) => self.nested(label, Some("readln"), |p| {
                for target in targets {
                    p.nested("InputStatementComponent", None, |p| p.variable(target));
                }
            }),
            StmtKind::Write(values) => self.nested(label, Some("writeln"), |p| {
                for value in values {
                    p.nested("OutputStatementComponent", None, |p| p.expr(value));
                }
            }),
            StmtKind::Block(stmts) => self.nested(label, None, |p| {
                for stmt in stmts {
                    p.stmt(stmt);
                }
            }),
        }
    }

    fn variable(&mut self, var: &VarNode) {
        self.nested(var.kind.label(), Some(var.kind.name.as_str()), |p| {
            if let Some(index) = &var.kind.index {
                p.expr(index);
            }
        });
    }

    fn expr(&mut self, expr: &ExprNode) {
        let label = expr.kind.label();
        match &expr.kind {
            ExprKind::Number(value) => self.line(label, Some(value.to_string().as_str())),
            ExprKind::Str(value) => self.line(label, Some(format!("'{value}'").as_str())),
            ExprKind::Bool(value) => self.line(label, Some(value.to_string().as_str())),
            ExprKind::Var(var) => self.nested(label, Some(var.name.as_str()), |p| {
                if let Some(index) = &var.index {
                    p.expr(index);
                }
            }),
            ExprKind::Unary(op, operand) => {
                self.nested(label, Some(op.symbol()), |p| p.expr(operand))
            }
            ExprKind::Binary(op, lhs, rhs) => self.nested(label, Some(op.symbol()), |p| {
                p.expr(lhs);
                p.expr(rhs);
            }),
        }
    }
}
