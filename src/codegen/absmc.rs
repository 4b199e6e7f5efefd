//! Lowers a checked program to abstract machine code.
//!
//! Each procedure gets a fresh register file: the receiver pointer (when
//! there is one) and formal parameters occupy argument registers, locals and
//! expression results occupy temporaries. Values live in registers for the
//! whole procedure; only fields go through the heap.

use std::{collections::HashMap, mem};

use crate::{
    absmc::{AbstractProgram, Group, Instruction, Item, Reg, Section},
    ast::{
        Applicability, AutoOp, BinaryOp, Block, Class, Constant, ExprId, ExprKind, Fix, Program,
        Stmt, UnaryOp, VarEntry, VarKind,
    },
    types::{Name, Type},
};

use super::{constructor_label, is_entry_point, method_label, Error, FieldLayout, Labels};

pub fn generate(program: &Program) -> Result<AbstractProgram, Error> {
    let layout = FieldLayout::compute(&program.classes);
    let static_data = layout.static_count;

    let mut generator = Generator {
        program,
        layout,
        labels: Labels::new(),
        args: 0,
        tmps: 0,
        vars: HashMap::new(),
        items: Vec::new(),
        loops: Vec::new(),
    };

    let mut groups = Vec::with_capacity(program.classes.len());
    for class in &program.classes {
        groups.push(generator.gen_class(class)?);
    }

    Ok(AbstractProgram {
        static_data,
        groups,
    })
}

struct LoopLabels {
    /// Jump target for `continue`: the condition label of a while loop, the
    /// update label of a for loop.
    continue_label: String,
    end_label: String,
}

struct Generator<'a> {
    program: &'a Program,
    layout: FieldLayout,
    labels: Labels,
    args: u32,
    tmps: u32,
    /// Variable id to its assigned register, for the current procedure.
    vars: HashMap<u32, Reg>,
    items: Vec<Item>,
    loops: Vec<LoopLabels>,
}

impl<'a> Generator<'a> {
    fn gen_class(&mut self, class: &Class) -> Result<Group, Error> {
        let mut sections = Vec::new();

        for constructor in &class.constructors {
            // a0 carries the freshly allocated object.
            self.reset(1);
            self.bind_vars(constructor.vars.entries());
            let items = self.gen_proc(&constructor.body, "return")?;
            sections.push(Section {
                label: constructor_label(constructor.id),
                items,
            });
        }

        for method in &class.methods {
            let first_arg = match method.applicability {
                Applicability::Static => 0,
                Applicability::Instance => 1,
            };
            self.reset(first_arg);
            self.bind_vars(method.vars.entries());
            if is_entry_point(method) {
                sections.push(Section {
                    label: "_start".into(),
                    items: Vec::new(),
                });
            }
            let items = self.gen_proc(&method.body, "return from method")?;
            sections.push(Section {
                label: method_label(&method.name, method.id),
                items,
            });
        }

        Ok(Group {
            header: format!("#====== Code for class {}", class.name),
            sections,
        })
    }

    fn reset(&mut self, first_arg: u32) {
        self.args = first_arg;
        self.tmps = 0;
        self.vars.clear();
    }

    fn bind_vars(&mut self, entries: &[VarEntry]) {
        for entry in entries {
            let reg = match entry.kind {
                VarKind::Formal => self.next_arg(),
                VarKind::Local => self.next_tmp(),
            };
            self.vars.insert(entry.id, reg);
        }
    }

    fn gen_proc(&mut self, body: &Block, ret_comment: &str) -> Result<Vec<Item>, Error> {
        self.gen_block(body)?;
        self.push(Instruction::Ret, ret_comment);
        Ok(mem::take(&mut self.items))
    }

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
                let reg = self.gen_expr(*expr)?;
                self.push(Instruction::IWrite(reg), "print to console");
            }
            Stmt::If {
                cond,
                then_branch,
                else_branch,
            } => {
                let (then_label, else_label, end_label) = self.labels.next_if();
                let cond_reg = self.gen_expr(*cond)?;
                self.push(
                    Instruction::Bz(cond_reg, else_label.clone()),
                    "if statement not satisfied",
                );
                self.label(then_label, "then part of if statement");
                self.gen_stmt(then_branch)?;
                self.push(
                    Instruction::Jmp(end_label.clone()),
                    "just to end of if statement",
                );
                self.label(else_label, "else");
                if !matches!(**else_branch, Stmt::Skip) {
                    self.gen_stmt(else_branch)?;
                }
                self.label(end_label, "else");
            }
            Stmt::While { cond, body } => {
                let (cond_label, body_label, end_label) = self.labels.next_while();
                self.label(cond_label.clone(), "");
                let cond_reg = self.gen_expr(*cond)?;
                self.push(Instruction::Bz(cond_reg, end_label.clone()), "");
                self.label(body_label, "body of while loop");
                self.loops.push(LoopLabels {
                    continue_label: cond_label.clone(),
                    end_label: end_label.clone(),
                });
                self.gen_stmt(body)?;
                self.loops.pop();
                self.push(Instruction::Jmp(cond_label), "");
                self.label(end_label, "");
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
                self.label(cond_label.clone(), "for loop");
                if let Some(cond) = cond {
                    let cond_reg = self.gen_expr(*cond)?;
                    self.push(Instruction::Bz(cond_reg, end_label.clone()), "");
                }
                self.label(body_label, "");
                self.loops.push(LoopLabels {
                    continue_label: update_label.clone(),
                    end_label: end_label.clone(),
                });
                self.gen_stmt(body)?;
                self.loops.pop();
                self.label(update_label, "");
                if let Some(update) = update {
                    self.gen_expr(*update)?;
                }
                self.push(Instruction::Jmp(cond_label), "");
                self.label(end_label, "exit loop");
            }
            Stmt::Return(value) => {
                if let Some(value) = value {
                    let reg = self.gen_expr(*value)?;
                    self.push(Instruction::Move(Reg::Arg(0), reg), "move for return");
                }
                self.push(Instruction::Ret, "return from method");
            }
            Stmt::Break(_) => {
                let target = self
                    .loops
                    .last()
                    .ok_or(Error::JumpOutsideLoop)?
                    .end_label
                    .clone();
                self.push(Instruction::Jmp(target), "");
            }
            Stmt::Continue(_) => {
                let target = self
                    .loops
                    .last()
                    .ok_or(Error::JumpOutsideLoop)?
                    .continue_label
                    .clone();
                self.push(Instruction::Jmp(target), "");
            }
        }
        Ok(())
    }

    fn gen_expr(&mut self, id: ExprId) -> Result<Reg, Error> {
        match self.program.arena.get(id).kind.clone() {
            ExprKind::Constant(constant) => self.gen_constant(&constant),
            ExprKind::Var { name, binding } => {
                let binding = binding.ok_or_else(|| Error::UnresolvedVariable(name.clone()))?;
                self.var_reg(binding.id, &name)
            }
            ExprKind::This => Ok(Reg::Arg(0)),
            ExprKind::Super | ExprKind::ClassRef(_) => Err(Error::UnsupportedReceiver),
            ExprKind::FieldAccess {
                base,
                field,
                field_id,
            } => self.gen_field_load(base, &field, field_id),
            ExprKind::Assign { lhs, rhs } => self.gen_assign(lhs, rhs),
            ExprKind::Auto { target, op, fix } => self.gen_auto(target, op, fix),
            ExprKind::Unary { op, operand } => self.gen_unary(op, operand),
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

    fn gen_constant(&mut self, constant: &Constant) -> Result<Reg, Error> {
        let reg = self.next_tmp();
        let comment = constant.to_string();
        let inst = match *constant {
            Constant::Int(value) => Instruction::MoveImmedI(reg, value),
            Constant::Boolean(value) => Instruction::MoveImmedI(reg, value as i64),
            Constant::Null => Instruction::MoveImmedI(reg, 0),
            Constant::Float(value) => Instruction::MoveImmedF(reg, value),
            Constant::Str(_) => return Err(Error::StringConstant),
        };
        self.push(inst, comment);
        Ok(reg)
    }

    fn gen_field_load(
        &mut self,
        base: ExprId,
        field: &str,
        field_id: Option<u32>,
    ) -> Result<Reg, Error> {
        match self.program.arena.get(base).kind.clone() {
            ExprKind::ClassRef(class) => {
                let reg = self.next_tmp();
                let offset = self
                    .layout
                    .static_offset(&class, field)
                    .ok_or(Error::UnresolvedField)?;
                let offset_reg = self.next_tmp();
                self.push(Instruction::MoveImmedI(offset_reg, offset as i64), " ");
                self.push(Instruction::HLoad(reg, Reg::Sap, offset_reg), "");
                Ok(reg)
            }
            ExprKind::This => {
                let reg = self.next_tmp();
                let offset = self.instance_offset(field_id)?;
                let offset_reg = self.next_tmp();
                self.push(Instruction::MoveImmedI(offset_reg, offset as i64), " ");
                self.push(Instruction::HLoad(reg, Reg::Arg(0), offset_reg), "");
                Ok(reg)
            }
            ExprKind::Var { name, binding } => {
                let binding = binding.ok_or_else(|| Error::UnresolvedVariable(name.clone()))?;
                let base_reg = self.var_reg(binding.id, &name)?;
                let reg = self.next_tmp();
                let offset = self.instance_offset(field_id)?;
                let offset_reg = self.next_tmp();
                self.push(Instruction::MoveImmedI(offset_reg, offset as i64), " ");
                self.push(Instruction::HLoad(reg, base_reg, offset_reg), "");
                Ok(reg)
            }
            _ => Err(Error::UnsupportedReceiver),
        }
    }

    fn gen_assign(&mut self, lhs: ExprId, rhs: ExprId) -> Result<Reg, Error> {
        match self.program.arena.get(lhs).kind.clone() {
            ExprKind::FieldAccess {
                base,
                field,
                field_id,
            } => {
                let value = self.gen_expr(rhs)?;
                if let ExprKind::ClassRef(class) = &self.program.arena.get(base).kind {
                    let offset = self
                        .layout
                        .static_offset(class, &field)
                        .ok_or(Error::UnresolvedField)?;
                    let offset_reg = self.next_tmp();
                    self.push(
                        Instruction::MoveImmedI(offset_reg, offset as i64),
                        "store offset to static field",
                    );
                    self.push(Instruction::HStore(Reg::Sap, offset_reg, value), "");
                    return Ok(value);
                }
                let base_reg = self.gen_expr(base)?;
                let offset = self.instance_offset(field_id)?;
                let offset_reg = self.next_tmp();
                self.push(
                    Instruction::MoveImmedI(offset_reg, offset as i64),
                    "store offset for field access",
                );
                self.push(Instruction::HStore(base_reg, offset_reg, value), "");
                Ok(value)
            }
            ExprKind::Var { name, binding } => {
                let binding = binding.ok_or_else(|| Error::UnresolvedVariable(name.clone()))?;
                let target = self.var_reg(binding.id, &name)?;
                let value = self.gen_expr(rhs)?;
                self.push(
                    Instruction::Move(target, value),
                    format!("Set Variable({}, {name}) to RHS", binding.id),
                );
                Ok(target)
            }
            _ => Err(Error::UnsupportedAssignTarget),
        }
    }

    fn gen_auto(&mut self, target: ExprId, op: AutoOp, fix: Fix) -> Result<Reg, Error> {
        let ExprKind::Var { name, binding } = self.program.arena.get(target).kind.clone() else {
            return Err(Error::UnsupportedAutoTarget);
        };
        let binding = binding.ok_or_else(|| Error::UnresolvedVariable(name.clone()))?;
        let var = self.var_reg(binding.id, &name)?;

        let step = |delta| match op {
            AutoOp::Inc => Instruction::IAdd(var, var, delta),
            AutoOp::Dec => Instruction::ISub(var, var, delta),
        };
        match fix {
            Fix::Pre => {
                let delta = self.next_tmp();
                self.push(Instruction::MoveImmedI(delta, 1), "auto");
                self.push(step(delta), "prefix operator");
                Ok(var)
            }
            Fix::Post => {
                let old = self.next_tmp();
                self.push(Instruction::Move(old, var), "copy for postfix operator");
                let delta = self.next_tmp();
                self.push(Instruction::MoveImmedI(delta, 1), "auto");
                self.push(step(delta), "postfix operator");
                Ok(old)
            }
        }
    }

    fn gen_unary(&mut self, op: UnaryOp, operand: ExprId) -> Result<Reg, Error> {
        let reg = self.next_tmp();
        match op {
            UnaryOp::Not => {
                self.push(Instruction::MoveImmedI(reg, 1), "#set to 1 for compare");
                let operand = self.gen_expr(operand)?;
                self.push(Instruction::ISub(reg, reg, operand), "");
            }
            UnaryOp::Neg => {
                self.push(
                    Instruction::MoveImmedI(reg, -1),
                    "Store -1 constant for negation",
                );
                let operand = self.gen_expr(operand)?;
                self.push(Instruction::IMul(reg, reg, operand), "Multiply by -1 to negatve");
            }
        }
        Ok(reg)
    }

    fn gen_binary(
        &mut self,
        id: ExprId,
        op: BinaryOp,
        lhs: ExprId,
        rhs: ExprId,
    ) -> Result<Reg, Error> {
        let reg = self.next_tmp();
        if op.is_arith() {
            let mut left = self.gen_expr(lhs)?;
            let mut right = self.gen_expr(rhs)?;
            let float = matches!(self.program.arena.get(id).ty, Some(Type::Float));
            if float {
                if self.is_int(lhs) {
                    let conv = self.next_tmp();
                    self.push(Instruction::IToF(conv, left), "");
                    left = conv;
                }
                if self.is_int(rhs) {
                    let conv = self.next_tmp();
                    self.push(Instruction::IToF(conv, right), "");
                    right = conv;
                }
            }
            let inst = match (op, float) {
                (BinaryOp::Add, false) => Instruction::IAdd(reg, left, right),
                (BinaryOp::Sub, false) => Instruction::ISub(reg, left, right),
                (BinaryOp::Mul, false) => Instruction::IMul(reg, left, right),
                (BinaryOp::Div, false) => Instruction::IDiv(reg, left, right),
                (BinaryOp::Add, true) => Instruction::FAdd(reg, left, right),
                (BinaryOp::Sub, true) => Instruction::FSub(reg, left, right),
                (BinaryOp::Mul, true) => Instruction::FMul(reg, left, right),
                (BinaryOp::Div, true) => Instruction::FDiv(reg, left, right),
                _ => unreachable!("not an arithmetic operator"),
            };
            self.push(inst, "Add op");
            return Ok(reg);
        }
        match op {
            BinaryOp::And => {
                let left = self.gen_expr(lhs)?;
                let right = self.gen_expr(rhs)?;
                self.push(Instruction::IMul(reg, left, right), "logical and");
            }
            BinaryOp::Or => {
                let one = self.next_tmp();
                self.push(Instruction::MoveImmedI(one, 1), "#set to 1 for comparison");
                let left = self.gen_expr(lhs)?;
                let right = self.gen_expr(rhs)?;
                self.push(Instruction::IAdd(reg, left, right), "");
                self.push(Instruction::IGeq(reg, reg, one), "");
            }
            BinaryOp::Less | BinaryOp::LessEq | BinaryOp::Greater | BinaryOp::GreaterEq => {
                let left = self.gen_expr(lhs)?;
                let right = self.gen_expr(rhs)?;
                let inst = match op {
                    BinaryOp::Less => Instruction::ILt(reg, left, right),
                    BinaryOp::LessEq => Instruction::ILeq(reg, left, right),
                    BinaryOp::Greater => Instruction::IGt(reg, left, right),
                    BinaryOp::GreaterEq => Instruction::IGeq(reg, left, right),
                    _ => unreachable!(),
                };
                self.push(inst, "");
            }
            // a == b computed as (a >= b) * (a <= b).
            BinaryOp::Eq => {
                let left = self.gen_expr(lhs)?;
                let right = self.gen_expr(rhs)?;
                let comp = self.next_tmp();
                self.push(Instruction::IGeq(reg, left, right), "");
                self.push(Instruction::ILeq(comp, left, right), "");
                self.push(Instruction::IMul(reg, reg, comp), "");
            }
            // a != b computed as (a > b) + (a < b).
            BinaryOp::NotEq => {
                let left = self.gen_expr(lhs)?;
                let right = self.gen_expr(rhs)?;
                let comp = self.next_tmp();
                self.push(Instruction::IGt(reg, left, right), "");
                self.push(Instruction::ILt(comp, left, right), "");
                self.push(Instruction::IAdd(reg, reg, comp), "");
            }
            _ => unreachable!("handled above"),
        }
        Ok(reg)
    }

    fn gen_new(&mut self, class: &str, args: &[ExprId]) -> Result<Reg, Error> {
        let record = self
            .program
            .class(class)
            .ok_or_else(|| Error::UnknownClass(class.into()))?;
        let count_reg = self.next_tmp();
        let heap_reg = self.next_tmp();
        self.push(
            Instruction::MoveImmedI(count_reg, record.instance_field_count() as i64),
            "t1 := number of fields",
        );
        self.push(
            Instruction::HAlloc(heap_reg, count_reg),
            "allocate heap memory for fields",
        );
        if let Some(constructor) = record.constructor() {
            let label = constructor_label(constructor.id);
            let saved = self.save_all();
            self.push(
                Instruction::Move(Reg::Arg(0), heap_reg),
                "pointer to object must be in first arg register",
            );
            for (index, &arg) in args.iter().enumerate() {
                let value = self.gen_expr(arg)?;
                self.push(
                    Instruction::Move(Reg::Arg(index as u32 + 1), value),
                    "pass arg into funciton",
                );
            }
            self.push(Instruction::Call(label), "call constructor");
            self.restore(saved);
        }
        Ok(heap_reg)
    }

    fn gen_call(
        &mut self,
        base: ExprId,
        method: &str,
        args: &[ExprId],
        method_id: Option<u32>,
    ) -> Result<Reg, Error> {
        let method_id = method_id.ok_or(Error::UnresolvedMethod)?;
        let label = method_label(method, method_id);

        if matches!(self.program.arena.get(base).kind, ExprKind::ClassRef(_)) {
            let saved = self.save_all();
            let ret = self.next_tmp();
            for (index, &arg) in args.iter().enumerate() {
                let value = self.gen_expr(arg)?;
                self.push(
                    Instruction::Move(Reg::Arg(index as u32), value),
                    "pass arg into funciton",
                );
            }
            self.push(Instruction::Call(label), "call function");
            self.push(Instruction::Move(ret, Reg::Arg(0)), "save func result");
            self.restore(saved);
            return Ok(ret);
        }

        // The receiver is evaluated before the register file is saved, so
        // its own calls pair their saves and restores independently.
        let receiver = self.gen_expr(base)?;
        let saved = self.save_all();
        let ret = self.next_tmp();
        self.push(
            Instruction::Move(Reg::Arg(0), receiver),
            "move pointer to object to a0",
        );
        for (index, &arg) in args.iter().enumerate() {
            let value = self.gen_expr(arg)?;
            self.push(
                Instruction::Move(Reg::Arg(index as u32 + 1), value),
                "pass arg into funciton",
            );
        }
        self.push(Instruction::Call(label), "call function");
        self.push(Instruction::Move(ret, Reg::Arg(0)), "save func result");
        self.restore(saved);
        Ok(ret)
    }

    fn save_all(&mut self) -> Vec<Reg> {
        let mut saved = Vec::with_capacity((self.args + self.tmps) as usize);
        for n in 0..self.args {
            saved.push(Reg::Arg(n));
        }
        for n in 0..self.tmps {
            saved.push(Reg::Tmp(n));
        }
        for &reg in &saved {
            self.push(Instruction::Save(reg), "");
        }
        saved
    }

    fn restore(&mut self, mut saved: Vec<Reg>) {
        while let Some(reg) = saved.pop() {
            self.push(Instruction::Restore(reg), "");
        }
    }

    fn var_reg(&self, id: u32, name: &Name) -> Result<Reg, Error> {
        self.vars
            .get(&id)
            .copied()
            .ok_or_else(|| Error::UnresolvedVariable(name.clone()))
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

    fn next_arg(&mut self) -> Reg {
        let reg = Reg::Arg(self.args);
        self.args += 1;
        reg
    }

    fn next_tmp(&mut self) -> Reg {
        let reg = Reg::Tmp(self.tmps);
        self.tmps += 1;
        reg
    }

    fn push(&mut self, inst: Instruction, comment: impl Into<String>) {
        self.items.push(Item::Inst(inst, comment.into()));
    }

    fn label(&mut self, label: String, comment: &str) {
        self.items.push(Item::Label(label, comment.into()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{parser, type_checker};
    use pretty_assertions::assert_eq;
    use Instruction::*;
    use Reg::{Arg, Sap, Tmp};

    fn compile(src: &str) -> AbstractProgram {
        let tokens = &mut Vec::new();
        let mut program = parser::parse_program(src, tokens).unwrap();
        type_checker::check(&mut program).unwrap();
        generate(&program).unwrap()
    }

    fn inst(inst: Instruction, comment: &str) -> Item {
        Item::Inst(inst, comment.into())
    }

    fn label(label: &str, comment: &str) -> Item {
        Item::Label(label.into(), comment.into())
    }

    #[test]
    fn entry_point_gets_a_start_alias_and_locals_live_in_temporaries() {
        let program = compile(
            "class A {
                public static void main() {
                    int x;
                    x = 1 + 2;
                    Out.print(x);
                }
            }",
        );
        assert_eq!(program.static_data, 0);

        // The built-in Out class is emitted first.
        let out = &program.groups[0];
        assert_eq!(out.header, "#====== Code for class Out");
        assert_eq!(out.sections[0].label, "M_print_1");
        assert_eq!(
            out.sections[0].items,
            vec![
                inst(IWrite(Arg(0)), "print to console"),
                inst(Ret, "return from method"),
            ]
        );

        let a = &program.groups[1];
        assert_eq!(a.header, "#====== Code for class A");
        assert_eq!(a.sections[0].label, "_start");
        assert!(a.sections[0].items.is_empty());
        assert_eq!(a.sections[1].label, "M_main_2");
        assert_eq!(
            a.sections[1].items,
            vec![
                inst(MoveImmedI(Tmp(2), 1), "Constant(Integer-constant(1))"),
                inst(MoveImmedI(Tmp(3), 2), "Constant(Integer-constant(2))"),
                inst(IAdd(Tmp(1), Tmp(2), Tmp(3)), "Add op"),
                inst(Move(Tmp(0), Tmp(1)), "Set Variable(2, x) to RHS"),
                inst(Save(Tmp(0)), ""),
                inst(Save(Tmp(1)), ""),
                inst(Save(Tmp(2)), ""),
                inst(Save(Tmp(3)), ""),
                inst(Move(Arg(0), Tmp(0)), "pass arg into funciton"),
                inst(Call("M_print_1".into()), "call function"),
                inst(Move(Tmp(4), Arg(0)), "save func result"),
                inst(Restore(Tmp(3)), ""),
                inst(Restore(Tmp(2)), ""),
                inst(Restore(Tmp(1)), ""),
                inst(Restore(Tmp(0)), ""),
                inst(Ret, "return from method"),
            ]
        );
    }

    #[test]
    fn if_statements_branch_to_numbered_labels() {
        let program = compile(
            "class A {
                int m() {
                    if (1 < 2) return 1;
                    else return 0;
                }
            }",
        );
        let m = &program.groups[1].sections[0];
        assert_eq!(m.label, "M_m_2");
        assert_eq!(
            m.items,
            vec![
                inst(MoveImmedI(Tmp(1), 1), "Constant(Integer-constant(1))"),
                inst(MoveImmedI(Tmp(2), 2), "Constant(Integer-constant(2))"),
                inst(ILt(Tmp(0), Tmp(1), Tmp(2)), ""),
                inst(Bz(Tmp(0), "if_1_else".into()), "if statement not satisfied"),
                label("if_1_then", "then part of if statement"),
                inst(MoveImmedI(Tmp(3), 1), "Constant(Integer-constant(1))"),
                inst(Move(Arg(0), Tmp(3)), "move for return"),
                inst(Ret, "return from method"),
                inst(Jmp("if_1_end".into()), "just to end of if statement"),
                label("if_1_else", "else"),
                inst(MoveImmedI(Tmp(4), 0), "Constant(Integer-constant(0))"),
                inst(Move(Arg(0), Tmp(4)), "move for return"),
                inst(Ret, "return from method"),
                label("if_1_end", "else"),
                inst(Ret, "return from method"),
            ]
        );
    }

    #[test]
    fn static_fields_are_addressed_through_the_static_area_pointer() {
        let program = compile(
            "class A {
                static int x;
                public static void main() {
                    A.x = 5;
                    Out.print(A.x);
                }
            }",
        );
        assert_eq!(program.static_data, 1);

        let main = &program.groups[1].sections[1];
        assert_eq!(main.label, "M_main_2");
        assert_eq!(
            main.items,
            vec![
                inst(MoveImmedI(Tmp(0), 5), "Constant(Integer-constant(5))"),
                inst(MoveImmedI(Tmp(1), 0), "store offset to static field"),
                inst(HStore(Sap, Tmp(1), Tmp(0)), ""),
                inst(Save(Tmp(0)), ""),
                inst(Save(Tmp(1)), ""),
                inst(MoveImmedI(Tmp(4), 0), " "),
                inst(HLoad(Tmp(3), Sap, Tmp(4)), ""),
                inst(Move(Arg(0), Tmp(3)), "pass arg into funciton"),
                inst(Call("M_print_1".into()), "call function"),
                inst(Move(Tmp(2), Arg(0)), "save func result"),
                inst(Restore(Tmp(1)), ""),
                inst(Restore(Tmp(0)), ""),
                inst(Ret, "return from method"),
            ]
        );
    }

    #[test]
    fn instantiation_allocates_and_calls_the_constructor() {
        let program = compile(
            "class P {
                int x;
                int y;
                public P(int x) { this.x = x; }
                public static void main() {
                    P p;
                    p = new P(7);
                }
            }",
        );
        let main = &program.groups[1].sections[2];
        assert_eq!(main.label, "M_main_2");
        assert_eq!(
            main.items,
            vec![
                // Local p is t0; the allocation count and pointer follow.
                inst(MoveImmedI(Tmp(1), 2), "t1 := number of fields"),
                inst(HAlloc(Tmp(2), Tmp(1)), "allocate heap memory for fields"),
                inst(Save(Tmp(0)), ""),
                inst(Save(Tmp(1)), ""),
                inst(Save(Tmp(2)), ""),
                inst(
                    Move(Arg(0), Tmp(2)),
                    "pointer to object must be in first arg register"
                ),
                inst(MoveImmedI(Tmp(3), 7), "Constant(Integer-constant(7))"),
                inst(Move(Arg(1), Tmp(3)), "pass arg into funciton"),
                inst(Call("C_1".into()), "call constructor"),
                inst(Restore(Tmp(2)), ""),
                inst(Restore(Tmp(1)), ""),
                inst(Restore(Tmp(0)), ""),
                inst(Move(Tmp(0), Tmp(2)), "Set Variable(3, p) to RHS"),
                inst(Ret, "return from method"),
            ]
        );
    }
}
