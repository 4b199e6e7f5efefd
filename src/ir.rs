//! Three-address intermediate representation.
//!
//! Unlike the abstract machine code, the IR works on named variables and
//! numbered temporaries, passes call arguments with `param`, and marks
//! basic-block leaders when printed.

use std::{collections::HashMap, fmt};

use crate::types::Name;

#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    /// A named source variable.
    Var(Name),
    /// Temporary `t{n}`.
    Tmp(u32),
    Int(i64),
    Float(f64),
    /// The receiver pointer.
    This,
    /// The static area pointer.
    Sap,
    /// The call-result pseudo register.
    Res,
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Var(name) => write!(f, "{name}"),
            Value::Tmp(n) => write!(f, "t{n}"),
            Value::Int(v) => write!(f, "{v}"),
            Value::Float(v) => write!(f, "{v}"),
            Value::This => write!(f, "a0"),
            Value::Sap => write!(f, "sap"),
            Value::Res => write!(f, "RES"),
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Op {
    Add,
    Sub,
    Mul,
    Div,
    Less,
    LessEq,
    Greater,
    GreaterEq,
    Eq,
    NotEq,
}

impl fmt::Display for Op {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let op = match self {
            Op::Add => "+",
            Op::Sub => "-",
            Op::Mul => "*",
            Op::Div => "/",
            Op::Less => "<",
            Op::LessEq => "<=",
            Op::Greater => ">",
            Op::GreaterEq => ">=",
            Op::Eq => "==",
            Op::NotEq => "!=",
        };
        write!(f, "{op}")
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum UnOp {
    Not,
    UMinus,
}

impl fmt::Display for UnOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UnOp::Not => write!(f, "not"),
            UnOp::UMinus => write!(f, "uminus"),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum Inst {
    Arith {
        res: Value,
        op: Op,
        lhs: Value,
        rhs: Value,
    },
    Unary {
        res: Value,
        op: UnOp,
        operand: Value,
    },
    Assign {
        target: Value,
        value: Value,
    },
    Load {
        res: Value,
        base: Value,
        offset: u32,
    },
    Store {
        value: Value,
        base: Value,
        offset: u32,
    },
    Alloc {
        res: Value,
        count: u32,
    },
    Param(Value),
    Call(String),
    Ret(Option<Value>),
    IntToFloat {
        res: Value,
        value: Value,
    },
    FloatToInt {
        res: Value,
        value: Value,
    },
    Goto(String),
    /// Branch taken when the condition is zero.
    IfZ {
        cond: Value,
        target: String,
    },
    Write(Value),
}

impl fmt::Display for Inst {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Inst::Arith { res, op, lhs, rhs } => write!(f, "{res} := {lhs} {op} {rhs}"),
            Inst::Unary { res, op, operand } => write!(f, "{res} := {op} {operand}"),
            Inst::Assign { target, value } => write!(f, "{target} := {value}"),
            Inst::Load { res, base, offset } => write!(f, "{res} := LOAD {base} {offset}"),
            Inst::Store {
                value,
                base,
                offset,
            } => write!(f, "{value} -> STORE {base} {offset}"),
            Inst::Alloc { res, count } => write!(f, "{res} := ALLOC {count}"),
            Inst::Param(value) => write!(f, "param {value}"),
            Inst::Call(label) => write!(f, "call {label}"),
            Inst::Ret(None) => write!(f, "return"),
            Inst::Ret(Some(value)) => write!(f, "return {value}"),
            Inst::IntToFloat { res, value } => write!(f, "{res} := FLOAT({value})"),
            Inst::FloatToInt { res, value } => write!(f, "{res} := INT({value})"),
            Inst::Goto(label) => write!(f, "GOTO {label}"),
            Inst::IfZ { cond, target } => write!(f, "ifz {cond} GOTO {target}"),
            Inst::Write(value) => write!(f, "write {value}"),
        }
    }
}

enum Line {
    Comment(String),
    Inst(Inst, Option<String>),
}

/// A flat instruction listing with labels resolved by position. Labels may
/// share a position; they are printed in insertion order.
#[derive(Default)]
pub struct IrProgram {
    lines: Vec<Line>,
    labels: Vec<(String, usize)>,
}

impl IrProgram {
    pub fn add_comment(&mut self, comment: impl Into<String>) {
        self.lines.push(Line::Comment(comment.into()));
    }

    pub fn add_label(&mut self, label: impl Into<String>) {
        self.labels.push((label.into(), self.lines.len()));
    }

    pub fn add_inst(&mut self, inst: Inst) {
        self.lines.push(Line::Inst(inst, None));
    }

    pub fn add_inst_with_comment(&mut self, inst: Inst, comment: impl Into<String>) {
        self.lines.push(Line::Inst(inst, Some(comment.into())));
    }

    fn label_position(&self, label: &str) -> Option<usize> {
        self.labels
            .iter()
            .find(|(name, _)| name == label)
            .map(|&(_, position)| position)
    }

    /// Marks basic-block leaders: the first instruction, every branch or
    /// call target, and every instruction following a branch, call, or
    /// return.
    fn leaders(&self) -> Vec<bool> {
        let mut leaders = vec![false; self.lines.len()];
        if !leaders.is_empty() {
            leaders[0] = true;
        }

        let mark = |leaders: &mut Vec<bool>, index: usize| {
            if index < leaders.len() {
                leaders[index] = true;
            }
        };

        for (index, line) in self.lines.iter().enumerate() {
            let Line::Inst(inst, _) = line else { continue };
            match inst {
                Inst::Goto(target) | Inst::IfZ { target, .. } => {
                    if let Some(position) = self.label_position(target) {
                        mark(&mut leaders, position);
                    }
                    mark(&mut leaders, index + 1);
                }
                Inst::Call(target) => {
                    if let Some(position) = self.label_position(target) {
                        mark(&mut leaders, position);
                    }
                    mark(&mut leaders, index + 1);
                }
                Inst::Ret(_) => mark(&mut leaders, index + 1),
                _ => {}
            }
        }
        leaders
    }
}

impl fmt::Display for IrProgram {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let leaders = self.leaders();

        let mut position_to_labels: HashMap<usize, Vec<&str>> = HashMap::new();
        for (label, position) in &self.labels {
            position_to_labels.entry(*position).or_default().push(label);
        }

        for (index, line) in self.lines.iter().enumerate() {
            if leaders[index] {
                writeln!(f, "------------------------")?;
            }
            if let Some(labels) = position_to_labels.get(&index) {
                for label in labels {
                    writeln!(f, "{label}:")?;
                }
            }
            match line {
                Line::Comment(comment) => writeln!(f, "#{comment}")?,
                Line::Inst(inst, None) => writeln!(f, "{inst}")?,
                Line::Inst(inst, Some(comment)) => writeln!(f, "{inst} #{comment}")?,
            }
        }
        Ok(())
    }
}
