//! CASL II emission.
//!
//! Every expression leaves exactly one word on the machine stack: a value
//! for scalars, or an absolute address for strings and whole arrays.
//! Variables live in one flat `VAR` region addressed as `VAR, GR2`.

use std::collections::HashMap;
use std::fmt;

use crate::ast::{
    BinaryOp, ExprKind, ExprNode, Procedure, Program, StandardType, StmtKind, StmtNode, TypeSpec,
    UnaryOp, VarDecl, Variable,
};
use crate::{CompileError, CompileResult};

const TRUE: &str = "=#FFFF";
const FALSE: &str = "=#0000";

/// One line of output: `label \t op \t operands`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Instr {
    pub label: String,
    pub op: &'static str,
    pub operands: String,
}

impl fmt::Display for Instr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}\t{}", self.label, self.op)?;
        if !self.operands.is_empty() {
            write!(f, "\t{}", self.operands)?;
        }
        Ok(())
    }
}

// What an expression left on the stack.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Value {
    Scalar(StandardType),
    Address { len: usize },
}

#[derive(Debug, Clone, Copy)]
struct Slot {
    base: usize,
    elem: StandardType,
    // (min, cell count) for arrays.
    array: Option<(i64, usize)>,
}

#[derive(Debug)]
struct ProcRecord {
    name: String,
    ordinal: usize,
    params: usize,
    base: usize,
    size: usize,
    code: Vec<Instr>,
}

/// Hands out label numbers and checks that they close in LIFO order.
#[derive(Debug, Default)]
struct LabelStack {
    next: usize,
    open: Vec<usize>,
}

impl LabelStack {
    fn open(&mut self) -> usize {
        let n = self.next;
        self.next += 1;
        self.open.push(n);
        n
    }

    fn close(&mut self, n: usize) {
        let top = self.open.pop();
        debug_assert_eq!(top, Some(n), "label closed out of order");
    }
}

#[derive(Debug, Default)]
pub struct Codegen {
    main: Vec<Instr>,
    procs: Vec<ProcRecord>,
    current: Option<usize>,
    globals: HashMap<String, Slot>,
    locals: HashMap<String, Slot>,
    next_addr: usize,
    strings: Vec<String>,
    elses: LabelStack,
    endifs: LabelStack,
    loops: LabelStack,
    compares: usize,
}

/// Generate the program text, up to and including `END`. The runtime
/// library is appended separately.
pub fn generate(program: &Program) -> CompileResult<String> {
    let mut codegen = Codegen::default();
    codegen.program(program)?;
    Ok(codegen.finish())
}

impl Codegen {
    fn program(&mut self, program: &Program) -> CompileResult<()> {
        self.emit_at("CASL", "START", "BEGIN");
        self.emit_at("BEGIN", "LAD", "GR6, 0");
        self.emit("LAD", "GR7, LIBBUF");

        for var in &program.vars {
            let slot = self.allocate(var);
            self.globals.insert(var.name.clone(), slot);
        }
        for proc in &program.procs {
            self.procedure(proc)?;
        }

        self.stmt(&program.body)?;
        self.emit("RET", "");
        Ok(())
    }

    fn finish(self) -> String {
        let mut lines = self.main;
        for proc in self.procs {
            lines.extend(proc.code);
        }
        lines.push(instr("VAR", "DS", self.next_addr.to_string()));
        for (n, text) in self.strings.iter().enumerate() {
            lines.push(instr(format!("CHAR{n}"), "DC", text.clone()));
        }
        lines.push(instr("LIBBUF", "DS", "256"));
        lines.push(instr("", "END", ""));

        let mut out = String::new();
        for line in &lines {
            out.push_str(&line.to_string());
            out.push('\n');
        }
        out
    }

    fn allocate(&mut self, var: &VarDecl) -> Slot {
        let (elem, array) = match var.r#type.kind {
            TypeSpec::Standard(ty) => (ty, None),
            TypeSpec::Array { min, max, elem } => {
                let len = (max.value() - min.value() + 1) as usize;
                (elem, Some((min.value(), len)))
            }
        };
        let slot = Slot {
            base: self.next_addr,
            elem,
            array,
        };
        self.next_addr += array.map_or(1, |(_, len)| len);
        slot
    }

    fn procedure(&mut self, proc: &Procedure) -> CompileResult<()> {
        let ordinal = self.procs.len();
        let base = self.next_addr;

        self.locals.clear();
        for param in &proc.params {
            let slot = Slot {
                base: self.next_addr,
                elem: param.r#type,
                array: None,
            };
            self.next_addr += 1;
            self.locals.insert(param.name.clone(), slot);
        }
        for var in &proc.vars {
            let slot = self.allocate(var);
            self.locals.insert(var.name.clone(), slot);
        }

        self.procs.push(ProcRecord {
            name: proc.name.clone(),
            ordinal,
            params: proc.params.len(),
            base,
            size: self.next_addr - base,
            code: vec![],
        });
        self.current = Some(ordinal);

        self.emit_at(format!("PROC{ordinal}"), "NOP", "");
        // Arguments sit above the return address, first argument nearest.
        let count = self.procs[ordinal].params;
        for i in 0..count {
            self.emit("LD", format!("GR1, {}, GR8", i + 1));
            self.emit("LD", format!("GR2, ={}", base + i));
            self.emit("ST", "GR1, VAR, GR2");
        }
        if count > 0 {
            self.emit("LD", "GR1, 0, GR8");
            self.emit("ADDA", format!("GR8, ={count}"));
            self.emit("ST", "GR1, 0, GR8");
        }

        self.stmt(&proc.body)?;
        self.emit("RET", "");

        self.current = None;
        self.locals.clear();
        Ok(())
    }

    fn stmt(&mut self, stmt: &StmtNode) -> CompileResult<()> {
        match &stmt.kind {
            StmtKind::Assign(target, value) => {
                self.target(&target.kind, target.line)?;
                self.expr(value)?;
                self.emit("POP", "GR1");
                self.emit("POP", "GR2");
                self.emit("ST", "GR1, VAR, GR2");
            }
            StmtKind::Call(name, args) => self.call(name, args, stmt.line)?,
            StmtKind::If(cond, then, r#else) => {
                let else_label = self.elses.open();
                self.expr(cond)?;
                self.emit("POP", "GR1");
                self.emit("CPA", format!("GR1, {FALSE}"));
                self.emit("JZE", format!("ELSE{else_label}"));
                self.stmt(then)?;

                match r#else {
                    Some(r#else) => {
                        let endif_label = self.endifs.open();
                        self.emit("JUMP", format!("ENDIF{endif_label}"));
                        self.elses.close(else_label);
                        self.emit_at(format!("ELSE{else_label}"), "NOP", "");
                        self.stmt(r#else)?;
                        self.endifs.close(endif_label);
                        self.emit_at(format!("ENDIF{endif_label}"), "NOP", "");
                    }
                    None => {
                        self.elses.close(else_label);
                        self.emit_at(format!("ELSE{else_label}"), "NOP", "");
                    }
                }
            }
            StmtKind::While(cond, body) => {
                let n = self.loops.open();
                self.emit_at(format!("LOOP{n}"), "NOP", "");
                self.expr(cond)?;
                self.emit("POP", "GR1");
                self.emit("CPA", format!("GR1, {FALSE}"));
                self.emit("JZE", format!("ENDLP{n}"));
                self.stmt(body)?;
                self.loops.close(n);
                self.emit("JUMP", format!("LOOP{n}"));
                self.emit_at(format!("ENDLP{n}"), "NOP", "");
            }
            StmtKind::Read(targets) => {
                for target in targets {
                    match self.target(&target.kind, target.line)? {
                        Value::Scalar(ty) => {
                            self.emit("POP", "GR2");
                            self.emit("LAD", "GR1, VAR");
                            self.emit("ADDA", "GR2, GR1");
                            let routine = match ty {
                                StandardType::Char => "RDCH",
                                _ => "RDINT",
                            };
                            self.emit("CALL", routine);
                        }
                        Value::Address { len } => {
                            self.emit("POP", "GR2");
                            self.emit("LAD", format!("GR1, {len}"));
                            self.emit("CALL", "RDSTR");
                        }
                    }
                }
                self.emit("CALL", "RDLN");
            }
            StmtKind::Write(values) => {
                for value in values {
                    match self.expr(value)? {
                        Value::Scalar(StandardType::Char) => {
                            self.emit("POP", "GR2");
                            self.emit("CALL", "WRTCH");
                        }
                        Value::Scalar(_) => {
                            self.emit("POP", "GR2");
                            self.emit("CALL", "WRTINT");
                        }
                        Value::Address { len } => {
                            self.emit("POP", "GR2");
                            self.emit("LAD", format!("GR1, {len}"));
                            self.emit("CALL", "WRTSTR");
                        }
                    }
                }
                self.emit("CALL", "WRTLN");
            }
            StmtKind::Block(stmts) => {
                for stmt in stmts {
                    self.stmt(stmt)?;
                }
            }
        }
        Ok(())
    }

    fn call(&mut self, name: &str, args: &[ExprNode], line: usize) -> CompileResult<()> {
        let (ordinal, frame) = self
            .procs
            .iter()
            .find(|proc| proc.name == name)
            .map(|proc| (proc.ordinal, proc.base..proc.base + proc.size))
            .ok_or(CompileError::Semantic { line })?;

        // Frames are static, so a self-call would clobber the caller's cells.
        let recursive = self.current == Some(ordinal);
        if recursive {
            for addr in frame.clone() {
                self.emit("LD", format!("GR2, ={addr}"));
                self.emit("LD", "GR1, VAR, GR2");
                self.emit("PUSH", "0, GR1");
            }
        }

        for arg in args.iter().rev() {
            self.expr(arg)?;
        }
        self.emit("CALL", format!("PROC{ordinal}"));

        if recursive {
            for addr in frame.rev() {
                self.emit("POP", "GR1");
                self.emit("LD", format!("GR2, ={addr}"));
                self.emit("ST", "GR1, VAR, GR2");
            }
        }
        Ok(())
    }

    fn slot(&self, name: &str, line: usize) -> CompileResult<Slot> {
        self.locals
            .get(name)
            .or_else(|| self.globals.get(name))
            .copied()
            .ok_or(CompileError::Semantic { line })
    }

    // Pushes the VAR-relative offset of a scalar or element, or the
    // absolute address of a whole array.
    fn target(&mut self, var: &Variable, line: usize) -> CompileResult<Value> {
        let slot = self.slot(&var.name, line)?;
        match (&var.index, slot.array) {
            (None, None) => {
                self.emit("PUSH", slot.base.to_string());
                Ok(Value::Scalar(slot.elem))
            }
            (Some(index), Some((min, _))) => {
                self.element_offset(index, slot.base, min)?;
                self.emit("PUSH", "0, GR2");
                Ok(Value::Scalar(slot.elem))
            }
            (None, Some((_, len))) => {
                self.array_address(slot.base);
                Ok(Value::Address { len })
            }
            (Some(_), None) => Err(CompileError::Semantic { line }),
        }
    }

    fn load(&mut self, var: &Variable, line: usize) -> CompileResult<Value> {
        let slot = self.slot(&var.name, line)?;
        match (&var.index, slot.array) {
            (None, None) => {
                self.emit("LD", format!("GR2, ={}", slot.base));
            }
            (Some(index), Some((min, _))) => {
                self.element_offset(index, slot.base, min)?;
            }
            (None, Some((_, len))) => {
                self.array_address(slot.base);
                return Ok(Value::Address { len });
            }
            (Some(_), None) => return Err(CompileError::Semantic { line }),
        }
        self.emit("LD", "GR1, VAR, GR2");
        self.emit("PUSH", "0, GR1");
        Ok(Value::Scalar(slot.elem))
    }

    // Leaves `base + (index - min)` in GR2.
    fn element_offset(&mut self, index: &ExprNode, base: usize, min: i64) -> CompileResult<()> {
        self.expr(index)?;
        self.emit("POP", "GR2");
        self.emit("ADDA", format!("GR2, ={}", base as i64 - min));
        Ok(())
    }

    fn array_address(&mut self, base: usize) {
        self.emit("LAD", "GR1, VAR");
        self.emit("ADDA", format!("GR1, ={base}"));
        self.emit("PUSH", "0, GR1");
    }

    fn expr(&mut self, expr: &ExprNode) -> CompileResult<Value> {
        match &expr.kind {
            ExprKind::Number(value) => {
                self.emit("PUSH", value.to_string());
                Ok(Value::Scalar(StandardType::Integer))
            }
            ExprKind::Str(value) => {
                let len = value.chars().count();
                if len == 1 {
                    self.emit("LD", format!("GR1, ={}", quote(value)));
                    self.emit("PUSH", "0, GR1");
                    return Ok(Value::Scalar(StandardType::Char));
                }
                let n = self.strings.len();
                self.strings.push(quote(value));
                self.emit("LAD", format!("GR2, CHAR{n}"));
                self.emit("PUSH", "0, GR2");
                Ok(Value::Address { len })
            }
            ExprKind::Bool(value) => {
                let word = if *value { TRUE } else { FALSE };
                self.emit("LD", format!("GR1, {word}"));
                self.emit("PUSH", "0, GR1");
                Ok(Value::Scalar(StandardType::Boolean))
            }
            ExprKind::Var(var) => self.load(var, expr.line),
            ExprKind::Unary(op, operand) => {
                let value = self.expr(operand)?;
                match op {
                    UnaryOp::Plus => {}
                    UnaryOp::Neg => {
                        self.emit("POP", "GR2");
                        self.emit("LAD", "GR1, 0");
                        self.emit("SUBA", "GR1, GR2");
                        self.emit("PUSH", "0, GR1");
                    }
                    UnaryOp::Not => {
                        self.emit("POP", "GR1");
                        self.emit("XOR", format!("GR1, {TRUE}"));
                        self.emit("PUSH", "0, GR1");
                    }
                }
                Ok(value)
            }
            ExprKind::Binary(op, lhs, rhs) => {
                let operands = self.expr(lhs)?;
                self.expr(rhs)?;
                self.emit("POP", "GR2");
                self.emit("POP", "GR1");
                Ok(self.binary(*op, operands))
            }
        }
    }

    // Operands are in GR1 (left) and GR2 (right).
    fn binary(&mut self, op: BinaryOp, operands: Value) -> Value {
        let (mnemonic, result) = match op {
            BinaryOp::Add => ("ADDA", "GR1"),
            BinaryOp::Sub => ("SUBA", "GR1"),
            BinaryOp::And => ("AND", "GR1"),
            BinaryOp::Or => ("OR", "GR1"),
            BinaryOp::Mul => ("MULT", "GR2"),
            BinaryOp::Div => ("DIV", "GR2"),
            BinaryOp::Mod => ("DIV", "GR1"),
            _ => {
                self.compare(op, operands);
                return Value::Scalar(StandardType::Boolean);
            }
        };

        match op {
            BinaryOp::Mul | BinaryOp::Div | BinaryOp::Mod => self.emit("CALL", mnemonic),
            _ => self.emit(mnemonic, "GR1, GR2"),
        }
        self.emit("PUSH", format!("0, {result}"));

        if op.is_logical() {
            Value::Scalar(StandardType::Boolean)
        } else {
            Value::Scalar(StandardType::Integer)
        }
    }

    fn compare(&mut self, op: BinaryOp, operands: Value) {
        let n = self.compares;
        self.compares += 1;

        // true is #FFFF, so booleans order correctly only as unsigned words.
        // Addresses are unsigned too.
        let cmp = match operands {
            Value::Scalar(StandardType::Integer | StandardType::Char) => "CPA",
            _ => "CPL",
        };

        // `<=` and `>=` branch on the negated condition.
        let (jump, taken, taken_value, fallthrough_value) = match op {
            BinaryOp::Eq => ("JZE", "TRUE", TRUE, FALSE),
            BinaryOp::Ne => ("JNZ", "TRUE", TRUE, FALSE),
            BinaryOp::Lt => ("JMI", "TRUE", TRUE, FALSE),
            BinaryOp::Gt => ("JPL", "TRUE", TRUE, FALSE),
            BinaryOp::Le => ("JPL", "FALSE", FALSE, TRUE),
            _ => ("JMI", "FALSE", FALSE, TRUE),
        };

        self.emit(cmp, "GR1, GR2");
        self.emit(jump, format!("{taken}{n}"));
        self.emit("LD", format!("GR1, {fallthrough_value}"));
        self.emit("JUMP", format!("BOTH{n}"));
        self.emit_at(format!("{taken}{n}"), "LD", format!("GR1, {taken_value}"));
        self.emit_at(format!("BOTH{n}"), "PUSH", "0, GR1");
    }

    fn emit(&mut self, op: &'static str, operands: impl Into<String>) {
        self.emit_at("", op, operands);
    }

    fn emit_at(&mut self, label: impl Into<String>, op: &'static str, operands: impl Into<String>) {
        let line = instr(label, op, operands);
        match self.current {
            Some(ordinal) => self.procs[ordinal].code.push(line),
            None => self.main.push(line),
        }
    }
}

fn instr(label: impl Into<String>, op: &'static str, operands: impl Into<String>) -> Instr {
    Instr {
        label: label.into(),
        op,
        operands: operands.into(),
    }
}

fn quote(text: &str) -> String {
    format!("'{}'", text.replace('\'', "''"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{tokenize, Parser};

    fn compile(src: &str) -> Vec<String> {
        let program = Parser::new(tokenize(src).unwrap()).parse().unwrap();
        generate(&program)
            .unwrap()
            .lines()
            .map(str::to_string)
            .collect()
    }

    fn contains_run(lines: &[String], run: &[&str]) -> bool {
        lines
            .windows(run.len())
            .any(|window| window.iter().zip(run).all(|(a, b)| a == b))
    }

    #[test]
    fn empty_program() {
        assert_eq!(
            compile("program p; begin end."),
            [
                "CASL\tSTART\tBEGIN",
                "BEGIN\tLAD\tGR6, 0",
                "\tLAD\tGR7, LIBBUF",
                "\tRET",
                "VAR\tDS\t0",
                "LIBBUF\tDS\t256",
                "\tEND",
            ]
        );
    }

    #[test]
    fn array_element_offset() {
        let lines = compile(
            "program p; var x: integer; a: array[2..5] of integer; begin a[3] := 7; x := a[3]; end.",
        );
        // `a` starts at cell 1, so a[3] lives at 1 + (3 - 2) = 2.
        assert!(contains_run(
            &lines,
            &[
                "\tPUSH\t3",
                "\tPOP\tGR2",
                "\tADDA\tGR2, =-1",
                "\tPUSH\t0, GR2",
                "\tPUSH\t7",
                "\tPOP\tGR1",
                "\tPOP\tGR2",
                "\tST\tGR1, VAR, GR2",
            ]
        ));
        assert!(contains_run(
            &lines,
            &[
                "\tPUSH\t0",
                "\tPUSH\t3",
                "\tPOP\tGR2",
                "\tADDA\tGR2, =-1",
                "\tLD\tGR1, VAR, GR2",
                "\tPUSH\t0, GR1",
            ]
        ));
        assert!(lines.contains(&"VAR\tDS\t5".to_string()));
    }

    #[test]
    fn nested_if_labels_pair_up() {
        let lines = compile(
            "program p;
begin
  if true then begin
    if false then begin end else begin end;
  end else begin end;
end.",
        );
        let labels: Vec<_> = lines
            .iter()
            .filter(|line| line.contains("ELSE") || line.contains("ENDIF"))
            .map(String::as_str)
            .collect();
        assert_eq!(
            labels,
            [
                "\tJZE\tELSE0",
                "\tJZE\tELSE1",
                "\tJUMP\tENDIF0",
                "ELSE1\tNOP",
                "ENDIF0\tNOP",
                "\tJUMP\tENDIF1",
                "ELSE0\tNOP",
                "ENDIF1\tNOP",
            ]
        );
    }

    #[test]
    fn if_without_else_joins_at_else_label() {
        let lines = compile("program p; begin if true then begin end; end.");
        assert!(contains_run(
            &lines,
            &[
                "\tLD\tGR1, =#FFFF",
                "\tPUSH\t0, GR1",
                "\tPOP\tGR1",
                "\tCPA\tGR1, =#0000",
                "\tJZE\tELSE0",
                "ELSE0\tNOP",
            ]
        ));
        assert!(!lines.iter().any(|line| line.contains("ENDIF")));
    }

    #[test]
    fn while_loop_shape() {
        let lines = compile("program p; begin while false do begin end; end.");
        assert!(contains_run(
            &lines,
            &[
                "LOOP0\tNOP",
                "\tLD\tGR1, =#0000",
                "\tPUSH\t0, GR1",
                "\tPOP\tGR1",
                "\tCPA\tGR1, =#0000",
                "\tJZE\tENDLP0",
                "\tJUMP\tLOOP0",
                "ENDLP0\tNOP",
            ]
        ));
    }

    #[test]
    fn comparisons_materialize_booleans() {
        let lines = compile("program p; var b: boolean; begin b := 1 < 2; b := 1 <= 2; end.");
        assert!(contains_run(
            &lines,
            &[
                "\tCPA\tGR1, GR2",
                "\tJMI\tTRUE0",
                "\tLD\tGR1, =#0000",
                "\tJUMP\tBOTH0",
                "TRUE0\tLD\tGR1, =#FFFF",
                "BOTH0\tPUSH\t0, GR1",
            ]
        ));
        assert!(contains_run(
            &lines,
            &[
                "\tCPA\tGR1, GR2",
                "\tJPL\tFALSE1",
                "\tLD\tGR1, =#FFFF",
                "\tJUMP\tBOTH1",
                "FALSE1\tLD\tGR1, =#0000",
                "BOTH1\tPUSH\t0, GR1",
            ]
        ));
    }

    #[test]
    fn booleans_compare_unsigned() {
        let lines = compile(
            "program p; var b: boolean; begin b := false < true; b := 1 < 2; b := 'a' < 'b'; end.",
        );
        let compares: Vec<_> = lines
            .iter()
            .filter(|l| l.starts_with("\tCP"))
            .map(String::as_str)
            .collect();
        assert_eq!(
            compares,
            ["\tCPL\tGR1, GR2", "\tCPA\tGR1, GR2", "\tCPA\tGR1, GR2"]
        );
    }

    #[test]
    fn strings_and_chars() {
        let lines = compile("program p; begin writeln('it''s', ''''); end.");
        assert!(contains_run(
            &lines,
            &[
                "\tLAD\tGR2, CHAR0",
                "\tPUSH\t0, GR2",
                "\tPOP\tGR2",
                "\tLAD\tGR1, 4",
                "\tCALL\tWRTSTR",
                "\tLD\tGR1, =''''",
                "\tPUSH\t0, GR1",
                "\tPOP\tGR2",
                "\tCALL\tWRTCH",
                "\tCALL\tWRTLN",
            ]
        ));
        assert!(contains_run(
            &lines,
            &["VAR\tDS\t0", "CHAR0\tDC\t'it''s'", "LIBBUF\tDS\t256"]
        ));
    }

    #[test]
    fn readln_passes_absolute_addresses() {
        let lines =
            compile("program p; var i: integer; s: array[0..9] of char; begin readln(i, s); end.");
        assert!(contains_run(
            &lines,
            &[
                "\tPUSH\t0",
                "\tPOP\tGR2",
                "\tLAD\tGR1, VAR",
                "\tADDA\tGR2, GR1",
                "\tCALL\tRDINT",
                "\tLAD\tGR1, VAR",
                "\tADDA\tGR1, =1",
                "\tPUSH\t0, GR1",
                "\tPOP\tGR2",
                "\tLAD\tGR1, 10",
                "\tCALL\tRDSTR",
                "\tCALL\tRDLN",
            ]
        ));
    }

    #[test]
    fn procedures_follow_main() {
        let lines = compile(
            "program p;
var g: integer;
procedure q(a, b: integer);
var t: integer;
begin
  q(b, a);
end;
begin
  q(1, 2);
end.",
        );
        let main_ret = lines.iter().position(|l| l == "\tRET").unwrap();
        let proc_start = lines.iter().position(|l| l == "PROC0\tNOP").unwrap();
        assert!(main_ret < proc_start);

        // Arguments are pushed last-to-first.
        assert!(contains_run(
            &lines,
            &["\tPUSH\t2", "\tPUSH\t1", "\tCALL\tPROC0", "\tRET"]
        ));

        // Prologue copies both arguments, then drops them under the return address.
        assert!(contains_run(
            &lines,
            &[
                "PROC0\tNOP",
                "\tLD\tGR1, 1, GR8",
                "\tLD\tGR2, =1",
                "\tST\tGR1, VAR, GR2",
                "\tLD\tGR1, 2, GR8",
                "\tLD\tGR2, =2",
                "\tST\tGR1, VAR, GR2",
                "\tLD\tGR1, 0, GR8",
                "\tADDA\tGR8, =2",
                "\tST\tGR1, 0, GR8",
            ]
        ));

        // The self-call saves and restores a, b and t.
        let save: Vec<_> = lines
            .iter()
            .filter(|l| l.starts_with("\tLD\tGR2, ="))
            .map(String::as_str)
            .collect();
        assert_eq!(
            save,
            [
                "\tLD\tGR2, =1",
                "\tLD\tGR2, =2",
                "\tLD\tGR2, =1",
                "\tLD\tGR2, =2",
                "\tLD\tGR2, =3",
                "\tLD\tGR2, =1",
                "\tLD\tGR2, =2",
                "\tLD\tGR2, =3",
                "\tLD\tGR2, =2",
                "\tLD\tGR2, =1",
            ]
        );
        assert!(lines.contains(&"VAR\tDS\t4".to_string()));
    }

    #[test]
    fn arithmetic_uses_library_for_mul_and_div() {
        let lines = compile("program p; var i: integer; begin i := 7 mod 3 * 2; end.");
        assert!(contains_run(
            &lines,
            &[
                "\tPUSH\t7",
                "\tPUSH\t3",
                "\tPOP\tGR2",
                "\tPOP\tGR1",
                "\tCALL\tDIV",
                "\tPUSH\t0, GR1",
                "\tPUSH\t2",
                "\tPOP\tGR2",
                "\tPOP\tGR1",
                "\tCALL\tMULT",
                "\tPUSH\t0, GR2",
            ]
        ));
    }
}
