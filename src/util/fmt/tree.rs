use std::io::Write;

use crate::ast::*;

const INDENT_WIDTH: usize = 2;

pub fn print_program_string(program: &Program) -> String {
    let mut buf = Vec::with_capacity(1024);
    print_program(&mut buf, program).unwrap();
    String::from_utf8(buf).unwrap()
}

/// Like [`print_program_string`], but skips the built-in `Out` class.
/// Keeps test snapshots focused on the user program.
pub fn print_user_classes_string(program: &Program) -> String {
    let mut buf = Vec::with_capacity(1024);
    for class in &program.classes[1..] {
        print_class(&mut buf, &program.arena, 0, class).unwrap();
    }
    String::from_utf8(buf).unwrap()
}

pub fn print_expr_string(arena: &ExprArena, expr: ExprId) -> String {
    let mut buf = Vec::with_capacity(512);
    print_expr(&mut buf, arena, 0, expr).unwrap();
    String::from_utf8(buf).unwrap()
}

pub fn print_program(w: &mut impl Write, program: &Program) -> std::io::Result<()> {
    for class in &program.classes {
        print_class(w, &program.arena, 0, class)?;
    }
    Ok(())
}

fn print_class(
    w: &mut impl Write,
    arena: &ExprArena,
    i: usize,
    class: &Class,
) -> std::io::Result<()> {
    sp(w, i)?;
    write!(w, "class {}", class.name)?;
    if let Some(ref superclass) = class.superclass {
        write!(w, " extends {superclass}")?;
    }
    writeln!(w)?;
    for field in &class.fields {
        sp(w, i + 1)?;
        writeln!(
            w,
            "field {} {} {} {} {}",
            field.id, field.visibility, field.applicability, field.ty, field.name
        )?;
    }
    for constructor in &class.constructors {
        sp(w, i + 1)?;
        writeln!(
            w,
            "constructor {} {} {}",
            constructor.id, constructor.visibility, constructor.name
        )?;
        print_proc_body(w, arena, i + 2, &constructor.vars, &constructor.body)?;
    }
    for method in &class.methods {
        sp(w, i + 1)?;
        writeln!(
            w,
            "method {} {} {} {} {}",
            method.id, method.visibility, method.applicability, method.return_ty, method.name
        )?;
        print_proc_body(w, arena, i + 2, &method.vars, &method.body)?;
    }
    Ok(())
}

fn print_proc_body(
    w: &mut impl Write,
    arena: &ExprArena,
    i: usize,
    vars: &VariableTable,
    body: &Block,
) -> std::io::Result<()> {
    for entry in vars.entries() {
        sp(w, i)?;
        writeln!(w, "{} {} {} {}", entry.kind, entry.id, entry.ty, entry.name)?;
    }
    sp(w, i)?;
    writeln!(w, "body")?;
    for stmt in &body.stmts {
        print_stmt(w, arena, i + 1, stmt)?;
    }
    Ok(())
}

fn print_stmt(
    w: &mut impl Write,
    arena: &ExprArena,
    i: usize,
    stmt: &Stmt,
) -> std::io::Result<()> {
    match stmt {
        Stmt::Block(block) => {
            sp(w, i)?;
            writeln!(w, "block")?;
            for stmt in &block.stmts {
                print_stmt(w, arena, i + 1, stmt)?;
            }
        }
        Stmt::If {
            cond,
            then_branch,
            else_branch,
        } => {
            sp(w, i)?;
            writeln!(w, "if")?;
            print_expr(w, arena, i + 1, *cond)?;
            sp(w, i + 1)?;
            writeln!(w, "then")?;
            print_stmt(w, arena, i + 2, then_branch)?;
            sp(w, i + 1)?;
            writeln!(w, "else")?;
            print_stmt(w, arena, i + 2, else_branch)?;
        }
        Stmt::While { cond, body } => {
            sp(w, i)?;
            writeln!(w, "while")?;
            print_expr(w, arena, i + 1, *cond)?;
            sp(w, i + 1)?;
            writeln!(w, "body")?;
            print_stmt(w, arena, i + 2, body)?;
        }
        Stmt::For {
            init,
            cond,
            update,
            body,
        } => {
            sp(w, i)?;
            writeln!(w, "for")?;
            for (label, expr) in [("init", init), ("cond", cond), ("update", update)] {
                if let Some(expr) = expr {
                    sp(w, i + 1)?;
                    writeln!(w, "{label}")?;
                    print_expr(w, arena, i + 2, *expr)?;
                }
            }
            sp(w, i + 1)?;
            writeln!(w, "body")?;
            print_stmt(w, arena, i + 2, body)?;
        }
        Stmt::Return(value) => {
            sp(w, i)?;
            writeln!(w, "return")?;
            if let Some(value) = value {
                print_expr(w, arena, i + 1, *value)?;
            }
        }
        Stmt::Break(_) => {
            sp(w, i)?;
            writeln!(w, "break")?;
        }
        Stmt::Continue(_) => {
            sp(w, i)?;
            writeln!(w, "continue")?;
        }
        Stmt::Skip => {
            sp(w, i)?;
            writeln!(w, "skip")?;
        }
        Stmt::Expr(expr) => {
            print_expr(w, arena, i, *expr)?;
        }
        Stmt::Write(expr) => {
            sp(w, i)?;
            writeln!(w, "write")?;
            print_expr(w, arena, i + 1, *expr)?;
        }
    }
    Ok(())
}

pub fn print_expr(
    w: &mut impl Write,
    arena: &ExprArena,
    i: usize,
    id: ExprId,
) -> std::io::Result<()> {
    sp(w, i)?;
    let expr = arena.get(id);
    let span = expr.span;
    // The computed type, for checked trees.
    let info = Info(&expr.ty);

    match &expr.kind {
        ExprKind::Constant(constant) => match constant {
            Constant::Int(v) => writeln!(w, "int {v} ({span}{info})")?,
            Constant::Float(v) => writeln!(w, "float {v} ({span}{info})")?,
            Constant::Boolean(v) => writeln!(w, "bool {v} ({span}{info})")?,
            Constant::Str(v) => writeln!(w, "string {v:?} ({span}{info})")?,
            Constant::Null => writeln!(w, "null ({span}{info})")?,
        },
        ExprKind::Var { name, binding } => {
            match binding {
                Some(binding) => writeln!(w, "var {name} #{} ({span}{info})", binding.id)?,
                None => writeln!(w, "var {name} ({span}{info})")?,
            };
        }
        ExprKind::This => writeln!(w, "this ({span}{info})")?,
        ExprKind::Super => writeln!(w, "super ({span}{info})")?,
        ExprKind::ClassRef(name) => writeln!(w, "class-ref {name} ({span}{info})")?,
        ExprKind::FieldAccess {
            base,
            field,
            field_id,
        } => {
            match field_id {
                Some(field_id) => writeln!(w, "field-access {field} #{field_id} ({span}{info})")?,
                None => writeln!(w, "field-access {field} ({span}{info})")?,
            };
            print_expr(w, arena, i + 1, *base)?;
        }
        ExprKind::Call {
            base,
            method,
            args,
            method_id,
        } => {
            match method_id {
                Some(method_id) => writeln!(w, "call {method} #{method_id} ({span}{info})")?,
                None => writeln!(w, "call {method} ({span}{info})")?,
            };
            print_expr(w, arena, i + 1, *base)?;
            if !args.is_empty() {
                sp(w, i + 1)?;
                writeln!(w, "arguments")?;
                for arg in args {
                    print_expr(w, arena, i + 2, *arg)?;
                }
            }
        }
        ExprKind::New { class, args } => {
            writeln!(w, "new {class} ({span}{info})")?;
            if !args.is_empty() {
                sp(w, i + 1)?;
                writeln!(w, "arguments")?;
                for arg in args {
                    print_expr(w, arena, i + 2, *arg)?;
                }
            }
        }
        ExprKind::Binary { op, lhs, rhs } => {
            writeln!(w, "binary {op} ({span}{info})")?;
            print_expr(w, arena, i + 1, *lhs)?;
            print_expr(w, arena, i + 1, *rhs)?;
        }
        ExprKind::Unary { op, operand } => {
            let op = match op {
                UnaryOp::Not => "!",
                UnaryOp::Neg => "-",
            };
            writeln!(w, "unary {op} ({span}{info})")?;
            print_expr(w, arena, i + 1, *operand)?;
        }
        ExprKind::Assign { lhs, rhs } => {
            writeln!(w, "assign ({span}{info})")?;
            print_expr(w, arena, i + 1, *lhs)?;
            print_expr(w, arena, i + 1, *rhs)?;
        }
        ExprKind::Auto { target, op, fix } => {
            let fix = match fix {
                Fix::Pre => "pre",
                Fix::Post => "post",
            };
            let op = match op {
                AutoOp::Inc => "++",
                AutoOp::Dec => "--",
            };
            writeln!(w, "auto {fix} {op} ({span}{info})")?;
            print_expr(w, arena, i + 1, *target)?;
        }
    }
    Ok(())
}

struct Info<'a>(&'a Option<crate::types::Type>);

impl std::fmt::Display for Info<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if let Some(ty) = self.0 {
            write!(f, " : {ty}")?;
        }
        Ok(())
    }
}

fn sp(w: &mut impl Write, i: usize) -> std::io::Result<()> {
    write!(w, "{:width$}", "", width = i * INDENT_WIDTH)
}
