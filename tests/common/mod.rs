//! A small CASL II machine for running generated programs in tests.
//!
//! The whole output is loaded, runtime library included, so library calls run
//! the real routines. Each `START`/`END` unit has its own labels; only unit
//! names are visible from other units. Code and data live apart: a code label
//! is an instruction index and a data label is a word address.

#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};

const DATA_BASE: u16 = 0x1000;
const STEP_LIMIT: usize = 5_000_000;
const SP: usize = 8;

#[derive(Debug, Clone, Copy)]
enum Arg {
    Reg(usize),
    Addr(u16),
}

#[derive(Debug)]
struct Inst {
    op: String,
    args: Vec<Arg>,
}

#[derive(Debug, Default)]
struct Unit {
    name: String,
    entry: Option<String>,
    labels: HashMap<String, u16>,
    first: Option<u16>,
}

pub struct Machine {
    code: Vec<Inst>,
    mem: Vec<u16>,
    gr: [u16; 9],
    zf: bool,
    sf: bool,
    of: bool,
    pc: usize,
    input: VecDeque<String>,
    output: Vec<String>,
}

/// Compile `src` and run it with `input` as standard input.
pub fn run_source(src: &str, input: &str) -> Vec<String> {
    let asm = pcc::compile_source(src).unwrap();
    Machine::load(&asm).run(input)
}

impl Machine {
    pub fn load(asm: &str) -> Self {
        let mut mem = vec![0u16; 0x10000];
        let mut units: Vec<Unit> = vec![];
        // (unit, op, operands) for every instruction, in order.
        let mut pending = vec![];
        let mut data_next = DATA_BASE;

        for line in asm.lines() {
            if line.trim().is_empty() || line.starts_with(';') {
                continue;
            }
            let mut cols = line.splitn(3, '\t');
            let label = cols.next().unwrap_or("");
            let op = cols.next().unwrap_or("");
            let operands = cols.next().unwrap_or("").trim();

            if op == "START" {
                units.push(Unit {
                    name: label.to_string(),
                    entry: (!operands.is_empty()).then(|| operands.to_string()),
                    ..Unit::default()
                });
                continue;
            }
            if op == "END" {
                continue;
            }

            let current = units.len().checked_sub(1).expect("statement outside START/END");
            let addr = match op {
                "DS" => {
                    let addr = data_next;
                    data_next += operands.parse::<u16>().unwrap();
                    addr
                }
                "DC" => {
                    let addr = data_next;
                    for part in split_operands(operands) {
                        for word in dc_words(&part) {
                            mem[data_next as usize] = word;
                            data_next += 1;
                        }
                    }
                    addr
                }
                _ => {
                    pending.push((current, op.to_string(), operands.to_string()));
                    (pending.len() - 1) as u16
                }
            };
            let unit = &mut units[current];
            unit.first.get_or_insert(addr);
            if !label.is_empty() {
                unit.labels.insert(label.to_string(), addr);
            }
        }

        let globals: HashMap<String, u16> = units
            .iter()
            .filter_map(|unit| Some((unit.name.clone(), unit.first?)))
            .collect();

        let mut literals = HashMap::new();
        let mut code = Vec::with_capacity(pending.len());
        for (unit, op, operands) in pending {
            let args = split_operands(&operands)
                .iter()
                .map(|operand| {
                    let labels = &units[unit].labels;
                    let label = labels.get(operand).or_else(|| globals.get(operand));
                    match label {
                        Some(&addr) => Arg::Addr(addr),
                        None => resolve(operand, &mut literals, &mut mem, &mut data_next),
                    }
                })
                .collect();
            code.push(Inst { op, args });
        }

        let main = &units[0];
        let pc = match &main.entry {
            Some(entry) => main.labels[entry.as_str()],
            None => main.first.unwrap(),
        };

        Machine {
            code,
            mem,
            gr: [0; 9],
            zf: false,
            sf: false,
            of: false,
            pc: pc as usize,
            input: VecDeque::new(),
            output: vec![],
        }
    }

    /// Run to the final `RET` and return the lines written.
    pub fn run(mut self, input: &str) -> Vec<String> {
        self.input = input.lines().map(str::to_string).collect();

        for _ in 0..STEP_LIMIT {
            let inst = &self.code[self.pc];
            let op = inst.op.clone();
            let args = inst.args.clone();
            self.pc += 1;

            match op.as_str() {
                "NOP" => {}
                "LD" => {
                    let value = self.operand(&args);
                    self.gr[reg(&args, 0)] = value;
                    self.set_flags(value, false);
                }
                "ST" => {
                    let addr = self.ea(&args, 1);
                    self.mem[addr as usize] = self.gr[reg(&args, 0)];
                }
                "LAD" => self.gr[reg(&args, 0)] = self.ea(&args, 1),
                "ADDA" => self.alu(&args, |a, b| {
                    let (v, of) = (a as i16).overflowing_add(b as i16);
                    (v as u16, of)
                }),
                "SUBA" => self.alu(&args, |a, b| {
                    let (v, of) = (a as i16).overflowing_sub(b as i16);
                    (v as u16, of)
                }),
                "ADDL" => self.alu(&args, |a, b| a.overflowing_add(b)),
                "SUBL" => self.alu(&args, |a, b| a.overflowing_sub(b)),
                "AND" => self.alu(&args, |a, b| (a & b, false)),
                "OR" => self.alu(&args, |a, b| (a | b, false)),
                "XOR" => self.alu(&args, |a, b| (a ^ b, false)),
                "CPA" => {
                    let a = self.gr[reg(&args, 0)] as i16;
                    let b = self.operand(&args) as i16;
                    self.compare(a.cmp(&b));
                }
                "CPL" => {
                    let a = self.gr[reg(&args, 0)];
                    let b = self.operand(&args);
                    self.compare(a.cmp(&b));
                }
                "SLL" => {
                    let r = reg(&args, 0);
                    let n = u32::from(self.ea(&args, 1));
                    let value = self.gr[r];
                    let out = n > 0 && n <= 16 && value & (1 << (16 - n)) != 0;
                    let shifted = value.checked_shl(n).unwrap_or(0);
                    self.gr[r] = shifted;
                    self.set_flags(shifted, out);
                }
                "SRL" => {
                    let r = reg(&args, 0);
                    let n = u32::from(self.ea(&args, 1));
                    let value = self.gr[r];
                    let out = n > 0 && n <= 16 && value & (1 << (n - 1)) != 0;
                    let shifted = value.checked_shr(n).unwrap_or(0);
                    self.gr[r] = shifted;
                    self.set_flags(shifted, out);
                }
                "JUMP" => self.jump(&args, true),
                "JZE" => self.jump(&args, self.zf),
                "JNZ" => self.jump(&args, !self.zf),
                "JMI" => self.jump(&args, self.sf),
                "JPL" => self.jump(&args, !self.sf && !self.zf),
                "JOV" => self.jump(&args, self.of),
                "PUSH" => {
                    let value = self.ea(&args, 0);
                    self.push(value);
                }
                "POP" => {
                    let value = self.pop();
                    self.gr[reg(&args, 0)] = value;
                }
                "CALL" => {
                    let ret = self.pc as u16;
                    self.push(ret);
                    self.pc = self.ea(&args, 0) as usize;
                }
                "RET" => {
                    if self.gr[SP] == 0 {
                        return self.output;
                    }
                    self.pc = self.pop() as usize;
                }
                "IN" => {
                    let (buf, len) = (self.ea(&args, 0), self.ea(&args, 1));
                    match self.input.pop_front() {
                        Some(line) => {
                            let chars: Vec<char> = line.chars().collect();
                            for (i, c) in chars.iter().enumerate() {
                                self.mem[buf as usize + i] = *c as u16;
                            }
                            self.mem[len as usize] = chars.len() as u16;
                        }
                        None => self.mem[len as usize] = u16::MAX,
                    }
                }
                "OUT" => {
                    let (buf, len) = (self.ea(&args, 0), self.ea(&args, 1));
                    let count = self.mem[len as usize];
                    let line = (0..count)
                        .map(|i| char::from(self.mem[(buf + i) as usize] as u8))
                        .collect();
                    self.output.push(line);
                }
                other => panic!("unsupported instruction {other}"),
            }
        }
        panic!("program did not halt within {STEP_LIMIT} steps");
    }

    fn ea(&self, args: &[Arg], index: usize) -> u16 {
        let Arg::Addr(base) = args[index] else {
            panic!("expected an address in {args:?}");
        };
        match args.get(index + 1) {
            Some(Arg::Reg(x)) => base.wrapping_add(self.gr[*x]),
            _ => base,
        }
    }

    // The second operand of `op r, adr[, x]` or `op r1, r2`.
    fn operand(&self, args: &[Arg]) -> u16 {
        match args[1] {
            Arg::Reg(r) if args.len() == 2 => self.gr[r],
            _ => self.mem[self.ea(args, 1) as usize],
        }
    }

    fn alu(&mut self, args: &[Arg], f: impl Fn(u16, u16) -> (u16, bool)) {
        let r = reg(args, 0);
        let (value, of) = f(self.gr[r], self.operand(args));
        self.gr[r] = value;
        self.set_flags(value, of);
    }

    fn set_flags(&mut self, value: u16, of: bool) {
        self.zf = value == 0;
        self.sf = value & 0x8000 != 0;
        self.of = of;
    }

    fn compare(&mut self, ordering: std::cmp::Ordering) {
        self.zf = ordering.is_eq();
        self.sf = ordering.is_lt();
        self.of = false;
    }

    fn jump(&mut self, args: &[Arg], taken: bool) {
        if taken {
            self.pc = self.ea(args, 0) as usize;
        }
    }

    fn push(&mut self, value: u16) {
        self.gr[SP] = self.gr[SP].wrapping_sub(1);
        self.mem[self.gr[SP] as usize] = value;
    }

    fn pop(&mut self) -> u16 {
        let value = self.mem[self.gr[SP] as usize];
        self.gr[SP] = self.gr[SP].wrapping_add(1);
        value
    }
}

fn reg(args: &[Arg], index: usize) -> usize {
    match args[index] {
        Arg::Reg(r) => r,
        other => panic!("expected a register, got {other:?}"),
    }
}

fn split_operands(operands: &str) -> Vec<String> {
    let mut parts = vec![];
    let mut current = String::new();
    let mut quoted = false;
    for c in operands.chars() {
        match c {
            '\'' => {
                quoted = !quoted;
                current.push(c);
            }
            ',' if !quoted => parts.push(std::mem::take(&mut current).trim().to_string()),
            _ => current.push(c),
        }
    }
    if !current.trim().is_empty() {
        parts.push(current.trim().to_string());
    }
    parts
}

// Registers and literals; labels are looked up by the caller.
fn resolve(
    operand: &str,
    literals: &mut HashMap<u16, u16>,
    mem: &mut [u16],
    data_next: &mut u16,
) -> Arg {
    if let Some(n) = operand.strip_prefix("GR") {
        return Arg::Reg(n.parse().unwrap());
    }
    if let Some(literal) = operand.strip_prefix('=') {
        let value = constant(literal);
        let addr = *literals.entry(value).or_insert_with(|| {
            let addr = *data_next;
            mem[addr as usize] = value;
            *data_next += 1;
            addr
        });
        return Arg::Addr(addr);
    }
    Arg::Addr(constant(operand))
}

fn constant(text: &str) -> u16 {
    let words = dc_words(text);
    assert_eq!(words.len(), 1, "constant {text} is not one word");
    words[0]
}

// One DC operand: a decimal, a `#hex` word or a quoted string.
fn dc_words(text: &str) -> Vec<u16> {
    if let Some(hex) = text.strip_prefix('#') {
        return vec![u16::from_str_radix(hex, 16).unwrap()];
    }
    if text.starts_with('\'') {
        let inner = &text[1..text.len() - 1];
        return inner.replace("''", "'").chars().map(|c| c as u16).collect();
    }
    let value = text
        .parse::<i32>()
        .unwrap_or_else(|_| panic!("bad constant {text}"));
    vec![value as i16 as u16]
}
