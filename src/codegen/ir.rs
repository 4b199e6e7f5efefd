//! Lowers a checked program to the three-address IR.
//!
//! Unlike the machine-code lowering, local variables keep their source
//! names; only intermediate results use numbered temporaries, reset per
//! procedure. Calls pass operands with `param` and read results back from
//! the `RES` pseudo register.

use crate::{
    ast::{AutoOp, BinaryOp, Block, Constant, ExprId, ExprKind, Fix, Program, Stmt, UnaryOp},
    ir::{Inst, IrProgram, Op, UnOp, Value},
    types::Type,
};

use super::{constructor_label, is_entry_point, method_label, Error, FieldLayout, Labels};

pub fn generate(program: &Program) -> Result<IrProgram, Error> {
    let mut generator = Generator {
        program,
        layout: FieldLayout::compute(&program.classes),
        labels: Labels::new(),
        tmps: 0,
        out: IrProgram::default(),
        loops: Vec::new(),
    };

    for class in &program.classes {
        for constructor in &class.constructors {
            generator.tmps = 0;
            generator.out.add_label(constructor_label(constructor.id));
            generator.gen_block(&constructor.body)?;
            generator.out.add_inst(Inst::Ret(None));
        }
        for method in &class.methods {
            generator.tmps = 0;
            if is_entry_point(method) {
                generator.out.add_label("_start");
            }
            generator
                .out
                .add_label(method_label(&method.name, method.id));
            generator.gen_block(&method.body)?;
            generator
                .out
                .add_inst_with_comment(Inst::Ret(None), "return from method");
        }
    }

    Ok(generator.out)
}

struct LoopLabels {
    continue_label: String,
    end_label: String,
}

struct Generator<'a> {
    program: &'a Program,
    layout: FieldLayout,
    labels: Labels,
    tmps: u32,
    out: IrProgram,
    loops: Vec<LoopLabels>,
}

impl Generator<'_> {
    fn gen_block(&mut self, block: &Block) -> Result<(), Error> {
        for stmt in &block.stmts {
            self.gen_stmt(stmt)?;
        }
        Ok(())
    }

    fn gen_stmt(&mut self, stmt: &Stmt) -> Result<(), Error> {
        match stmt {
            Stmt::Block(block) => self.gen_block(block)?,
            Stmt::Skip => (),
            Stmt::Expr(expr) => {
                self.gen_expr(*expr)?;
            }
            Stmt::Write(expr) => {
                let value = self.gen_expr(*expr)?;
                self.out
                    .add_inst_with_comment(Inst::Write(value), "Print to console");
            }
            Stmt::If {
                cond,
                then_branch,
                else_branch,
            } => {
                let (then_label, else_label, end_label) = self.labels.next_if();
                let cond_value = self.gen_expr(*cond)?;
                self.out.add_inst(Inst::IfZ {
                    cond: cond_value,
                    target: else_label.clone(),
                });
                self.out.add_label(then_label);
                self.gen_stmt(then_branch)?;
                self.out.add_inst(Inst::Goto(end_label.clone()));
                self.out.add_label(else_label);
                if !matches!(**else_branch, Stmt::Skip) {
                    self.gen_stmt(else_branch)?;
                }
                self.out.add_label(end_label);
            }
            Stmt::While { cond, body } => {
                let (cond_label, body_label, end_label) = self.labels.next_while();
                self.out.add_label(cond_label.clone());
                let cond_value = self.gen_expr(*cond)?;
                self.out.add_inst(Inst::IfZ {
                    cond: cond_value,
                    target: end_label.clone(),
                });
                self.out.add_label(body_label);
                self.loops.push(LoopLabels {
                    continue_label: cond_label.clone(),
                    end_label: end_label.clone(),
                });
                self.gen_stmt(body)?;
                self.loops.pop();
                self.out.add_inst(Inst::Goto(cond_label));
                self.out.add_label(end_label);
            }
            Stmt::For {
                init,
                cond,
                update,
                body,
            } => {
                let (cond_label, body_label, update_label, end_label) = self.labels.next_for();
                if let Some(init) = init {
                    self.gen_expr(*init)?;
                }
                self.out.add_label(cond_label.clone());
                if let Some(cond) = cond {
                    let cond_value = self.gen_expr(*cond)?;
                    self.out.add_inst(Inst::IfZ {
                        cond: cond_value,
                        target: end_label.clone(),
                    });
                }
                self.out.add_label(body_label);
                self.loops.push(LoopLabels {
                    continue_label: update_label.clone(),
                    end_label: end_label.clone(),
                });
                self.gen_stmt(body)?;
                self.loops.pop();
                self.out.add_label(update_label);
                if let Some(update) = update {
                    self.gen_expr(*update)?;
                }
                self.out.add_inst(Inst::Goto(cond_label));
                self.out.add_label(end_label);
            }
            Stmt::Return(value) => {
                let value = match value {
                    Some(value) => Some(self.gen_expr(*value)?),
                    None => None,
                };
                self.out.add_inst(Inst::Ret(value));
            }
            Stmt::Break(_) => {
                let target = self
                    .loops
                    .last()
                    .ok_or(Error::JumpOutsideLoop)?
                    .end_label
                    .clone();
                self.out.add_inst(Inst::Goto(target));
            }
            Stmt::Continue(_) => {
                let target = self
                    .loops
                    .last()
                    .ok_or(Error::JumpOutsideLoop)?
                    .continue_label
                    .clone();
                self.out.add_inst(Inst::Goto(target));
            }
        }
        Ok(())
    }

    fn gen_expr(&mut self, id: ExprId) -> Result<Value, Error> {
        match self.program.arena.get(id).kind.clone() {
            ExprKind::Constant(constant) => match constant {
                Constant::Int(value) => Ok(Value::Int(value)),
                Constant::Float(value) => Ok(Value::Float(value)),
                Constant::Boolean(value) => Ok(Value::Int(value as i64)),
                Constant::Null => Ok(Value::Int(0)),
                Constant::Str(_) => Err(Error::StringConstant),
            },
            ExprKind::Var { name, binding } => {
                binding.ok_or_else(|| Error::UnresolvedVariable(name.clone()))?;
                Ok(Value::Var(name))
            }
            ExprKind::This => Ok(Value::This),
            ExprKind::Super | ExprKind::ClassRef(_) => Err(Error::UnsupportedReceiver),
            ExprKind::FieldAccess {
                base,
                field,
                field_id,
            } => self.gen_field_load(base, &field, field_id),
            ExprKind::Assign { lhs, rhs } => self.gen_assign(lhs, rhs),
            ExprKind::Auto { target, op, fix } => self.gen_auto(target, op, fix),
            ExprKind::Unary { op, operand } => {
                let res = self.next_tmp();
                let operand = self.gen_expr(operand)?;
                let op = match op {
                    UnaryOp::Not => UnOp::Not,
                    UnaryOp::Neg => UnOp::UMinus,
                };
                self.out.add_inst(Inst::Unary {
                    res: res.clone(),
                    op,
                    operand,
                });
                Ok(res)
            }
            ExprKind::Binary { op, lhs, rhs } => self.gen_binary(id, op, lhs, rhs),
            ExprKind::New { class, args } => self.gen_new(&class, &args),
            ExprKind::Call {
                base,
                method,
                args,
                method_id,
            } => self.gen_call(base, &method, &args, method_id),
        }
    }

    fn gen_field_load(
        &mut self,
        base: ExprId,
        field: &str,
        field_id: Option<u32>,
    ) -> Result<Value, Error> {
        let res = self.next_tmp();
        let (base_value, offset) = match self.program.arena.get(base).kind.clone() {
            ExprKind::ClassRef(class) => {
                let offset = self
                    .layout
                    .static_offset(&class, field)
                    .ok_or(Error::UnresolvedField)?;
                (Value::Sap, offset)
            }
            ExprKind::This => (Value::This, self.instance_offset(field_id)?),
            ExprKind::Var { name, binding } => {
                binding.ok_or_else(|| Error::UnresolvedVariable(name.clone()))?;
                (Value::Var(name), self.instance_offset(field_id)?)
            }
            _ => return Err(Error::UnsupportedReceiver),
        };
        self.out.add_inst(Inst::Load {
            res: res.clone(),
            base: base_value,
            offset,
        });
        Ok(res)
    }

    fn gen_assign(&mut self, lhs: ExprId, rhs: ExprId) -> Result<Value, Error> {
        match self.program.arena.get(lhs).kind.clone() {
            ExprKind::FieldAccess {
                base,
                field,
                field_id,
            } => {
                let value = self.gen_expr(rhs)?;
                let (base_value, offset) =
                    if let ExprKind::ClassRef(class) = &self.program.arena.get(base).kind {
                        let offset = self
                            .layout
                            .static_offset(class, &field)
                            .ok_or(Error::UnresolvedField)?;
                        (Value::Sap, offset)
                    } else {
                        (self.gen_expr(base)?, self.instance_offset(field_id)?)
                    };
                self.out.add_inst(Inst::Store {
                    value: value.clone(),
                    base: base_value,
                    offset,
                });
                Ok(value)
            }
            ExprKind::Var { name, binding } => {
                binding.ok_or_else(|| Error::UnresolvedVariable(name.clone()))?;
                let value = self.gen_expr(rhs)?;
                self.out.add_inst(Inst::Assign {
                    target: Value::Var(name.clone()),
                    value,
                });
                Ok(Value::Var(name))
            }
            _ => Err(Error::UnsupportedAssignTarget),
        }
    }

    fn gen_auto(&mut self, target: ExprId, op: AutoOp, fix: Fix) -> Result<Value, Error> {
        let ExprKind::Var { name, binding } = self.program.arena.get(target).kind.clone() else {
            return Err(Error::UnsupportedAutoTarget);
        };
        binding.ok_or_else(|| Error::UnresolvedVariable(name.clone()))?;
        let var = Value::Var(name);

        let op = match op {
            AutoOp::Inc => Op::Add,
            AutoOp::Dec => Op::Sub,
        };
        match fix {
            Fix::Pre => {
                self.out.add_inst(Inst::Arith {
                    res: var.clone(),
                    op,
                    lhs: var.clone(),
                    rhs: Value::Int(1),
                });
                Ok(var)
            }
            Fix::Post => {
                let old = self.next_tmp();
                self.out.add_inst_with_comment(
                    Inst::Assign {
                        target: old.clone(),
                        value: var.clone(),
                    },
                    "copy for postfix operator",
                );
                self.out.add_inst(Inst::Arith {
                    res: var.clone(),
                    op,
                    lhs: var,
                    rhs: Value::Int(1),
                });
                Ok(old)
            }
        }
    }

    fn gen_binary(
        &mut self,
        id: ExprId,
        op: BinaryOp,
        lhs: ExprId,
        rhs: ExprId,
    ) -> Result<Value, Error> {
        let res = self.next_tmp();
        if op.is_arith() {
            let mut left = self.gen_expr(lhs)?;
            let mut right = self.gen_expr(rhs)?;
            if matches!(self.program.arena.get(id).ty, Some(Type::Float)) {
                if self.is_int(lhs) {
                    left = self.convert_to_float(left);
                }
                if self.is_int(rhs) {
                    right = self.convert_to_float(right);
                }
            }
            let op = match op {
                BinaryOp::Add => Op::Add,
                BinaryOp::Sub => Op::Sub,
                BinaryOp::Mul => Op::Mul,
                BinaryOp::Div => Op::Div,
                _ => unreachable!("not an arithmetic operator"),
            };
            self.out.add_inst(Inst::Arith {
                res: res.clone(),
                op,
                lhs: left,
                rhs: right,
            });
            return Ok(res);
        }
        match op {
            // Both operands are 0 or 1, so conjunction is a product.
            BinaryOp::And => {
                let left = self.gen_expr(lhs)?;
                let right = self.gen_expr(rhs)?;
                self.out.add_inst(Inst::Arith {
                    res: res.clone(),
                    op: Op::Mul,
                    lhs: left,
                    rhs: right,
                });
            }
            // Disjunction holds when the operand sum reaches 1.
            BinaryOp::Or => {
                let sum = self.next_tmp();
                let left = self.gen_expr(lhs)?;
                let right = self.gen_expr(rhs)?;
                self.out.add_inst(Inst::Arith {
                    res: sum.clone(),
                    op: Op::Add,
                    lhs: left,
                    rhs: right,
                });
                self.out.add_inst(Inst::Arith {
                    res: res.clone(),
                    op: Op::GreaterEq,
                    lhs: sum,
                    rhs: Value::Int(1),
                });
            }
            BinaryOp::Less
            | BinaryOp::LessEq
            | BinaryOp::Greater
            | BinaryOp::GreaterEq
            | BinaryOp::Eq
            | BinaryOp::NotEq => {
                let left = self.gen_expr(lhs)?;
                let right = self.gen_expr(rhs)?;
                let op = match op {
                    BinaryOp::Less => Op::Less,
                    BinaryOp::LessEq => Op::LessEq,
                    BinaryOp::Greater => Op::Greater,
                    BinaryOp::GreaterEq => Op::GreaterEq,
                    BinaryOp::Eq => Op::Eq,
                    BinaryOp::NotEq => Op::NotEq,
                    _ => unreachable!(),
                };
                self.out.add_inst(Inst::Arith {
                    res: res.clone(),
                    op,
                    lhs: left,
                    rhs: right,
                });
            }
            _ => unreachable!("handled above"),
        }
        Ok(res)
    }

    fn gen_new(&mut self, class: &str, args: &[ExprId]) -> Result<Value, Error> {
        let record = self
            .program
            .class(class)
            .ok_or_else(|| Error::UnknownClass(class.into()))?;
        let heap = self.next_tmp();
        self.out.add_inst(Inst::Alloc {
            res: heap.clone(),
            count: record.instance_field_count(),
        });
        if let Some(constructor) = record.constructor() {
            self.out.add_inst(Inst::Param(heap.clone()));
            for &arg in args {
                let value = self.gen_expr(arg)?;
                self.out.add_inst(Inst::Param(value));
            }
            self.out
                .add_inst(Inst::Call(constructor_label(constructor.id)));
        }
        Ok(heap)
    }

    fn gen_call(
        &mut self,
        base: ExprId,
        method: &str,
        args: &[ExprId],
        method_id: Option<u32>,
    ) -> Result<Value, Error> {
        let method_id = method_id.ok_or(Error::UnresolvedMethod)?;
        let label = method_label(method, method_id);
        let res = self.next_tmp();

        if !matches!(self.program.arena.get(base).kind, ExprKind::ClassRef(_)) {
            let receiver = self.gen_expr(base)?;
            self.out.add_inst(Inst::Param(receiver));
        }
        for &arg in args {
            let value = self.gen_expr(arg)?;
            self.out.add_inst(Inst::Param(value));
        }
        self.out.add_inst(Inst::Call(label));
        self.out.add_inst(Inst::Assign {
            target: res.clone(),
            value: Value::Res,
        });
        Ok(res)
    }

    fn convert_to_float(&mut self, value: Value) -> Value {
        let res = self.next_tmp();
        self.out.add_inst(Inst::IntToFloat {
            res: res.clone(),
            value,
        });
        res
    }

    fn instance_offset(&self, field_id: Option<u32>) -> Result<u32, Error> {
        let field_id = field_id.ok_or(Error::UnresolvedField)?;
        self.layout
            .instance_offset(field_id)
            .ok_or(Error::UnresolvedField)
    }

    fn is_int(&self, id: ExprId) -> bool {
        matches!(self.program.arena.get(id).ty, Some(Type::Int))
    }

    fn next_tmp(&mut self) -> Value {
        let value = Value::Tmp(self.tmps);
        self.tmps += 1;
        value
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{parser, type_checker};
    use indoc::indoc;
    use pretty_assertions::assert_eq;

    fn compile(src: &str) -> String {
        let tokens = &mut Vec::new();
        let mut program = parser::parse_program(src, tokens).unwrap();
        type_checker::check(&mut program).unwrap();
        generate(&program).unwrap().to_string()
    }

    #[test]
    fn while_loops_keep_variable_names_and_branch_with_ifz() {
        let actual = compile(
            "class A {
                public static void main() {
                    int x;
                    x = 0;
                    while (x < 3) x = x + 1;
                }
            }",
        );
        let expected = indoc! {"
            ------------------------
            M_print_1:
            write i #Print to console
            return #return from method
            ------------------------
            _start:
            M_main_2:
            x := 0
            ------------------------
            while_1_cond:
            t0 := x < 3
            ifz t0 GOTO while_1_end
            ------------------------
            while_1_body:
            t1 := x + 1
            x := t1
            GOTO while_1_cond
            ------------------------
            while_1_end:
            return #return from method
        "};
        assert_eq!(actual, expected);
    }

    #[test]
    fn calls_pass_params_and_read_results_from_res() {
        let actual = compile(
            "class P {
                int x;
                public P(int v) { this.x = v; }
                int get() { return this.x; }
                public static void main() {
                    P p;
                    p = new P(7);
                    Out.print(p.get());
                }
            }",
        );
        let expected = indoc! {"
            ------------------------
            M_print_1:
            write i #Print to console
            return #return from method
            ------------------------
            C_1:
            v -> STORE a0 0
            return
            ------------------------
            M_get_2:
            t0 := LOAD a0 0
            return t0
            ------------------------
            return #return from method
            ------------------------
            _start:
            M_main_3:
            t0 := ALLOC 1
            param t0
            param 7
            call C_1
            ------------------------
            p := t0
            param p
            call M_get_2
            ------------------------
            t2 := RES
            param t2
            call M_print_1
            ------------------------
            t1 := RES
            return #return from method
        "};
        assert_eq!(actual, expected);
    }
}
