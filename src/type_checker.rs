use crate::{
    ast::{
        BinaryOp, Block, Class, Constant, ExprArena, ExprId, ExprKind, Method, Program, Stmt,
        UnaryOp, Visibility,
    },
    token::{Span, Spanned},
    types::{Name, Type, TypeRegistry},
};

/// Type-checks the whole program.
///
/// Checking is destructive in two ways: every expression node gets its
/// computed type memoized, and bare names in receiver position that turn
/// out to name a class are rewritten into class references. Diagnostics
/// accumulate; all classes are visited even after an error is found.
pub fn check(program: &mut Program) -> Result<TypeRegistry, Vec<Spanned<Error>>> {
    let Program { classes, arena } = program;
    let classes: &[Class] = classes;

    let mut checker = Checker {
        classes,
        arena,
        registry: TypeRegistry::with_capacity(classes.len()),
        errors: Vec::new(),
        loop_depth: 0,
    };

    checker.build_registry();
    for class in classes {
        checker.check_class(class);
    }

    let Checker {
        registry, errors, ..
    } = checker;
    if errors.is_empty() {
        Ok(registry)
    } else {
        Err(errors)
    }
}

/// Type-checks a single expression outside of any class context.
pub fn check_expr(arena: &mut ExprArena, root: ExprId) -> Result<(), Vec<Spanned<Error>>> {
    let mut checker = Checker {
        classes: &[],
        arena,
        registry: TypeRegistry::with_capacity(0),
        errors: Vec::new(),
        loop_depth: 0,
    };
    checker.expr(root, None);
    if checker.errors.is_empty() {
        Ok(())
    } else {
        Err(checker.errors)
    }
}

struct Checker<'a> {
    classes: &'a [Class],
    arena: &'a mut ExprArena,
    registry: TypeRegistry,
    errors: Vec<Spanned<Error>>,
    loop_depth: u32,
}

impl<'a> Checker<'a> {
    /// Registers every class and its superclass edge. The first definition
    /// of a repeated name wins; later ones are diagnosed and ignored.
    fn build_registry(&mut self) {
        for class in self.classes {
            if !self
                .registry
                .define(class.name.clone(), class.superclass.clone())
            {
                self.errors
                    .push(class.span.wrap(Error::RepeatedClass(class.name.clone())));
            }
        }
        for class in self.classes {
            if let Some(superclass) = &class.superclass {
                if !self.registry.has(superclass) {
                    self.errors.push(class.span.wrap(Error::UndefinedSuperclass {
                        class: class.name.clone(),
                        superclass: superclass.clone(),
                    }));
                }
            }
        }
    }

    fn check_class(&mut self, class: &Class) {
        for constructor in &class.constructors {
            self.check_block(&constructor.body, &class.name);
        }
        for method in &class.methods {
            self.check_block(&method.body, &class.name);
        }
    }

    fn check_block(&mut self, block: &Block, cur: &str) {
        for stmt in &block.stmts {
            self.check_stmt(stmt, cur);
        }
    }

    fn check_stmt(&mut self, stmt: &Stmt, cur: &str) {
        match stmt {
            Stmt::Block(block) => self.check_block(block, cur),
            Stmt::If {
                cond,
                then_branch,
                else_branch,
            } => {
                let span = self.arena.get(*cond).span;
                let ty = self.expr(*cond, Some(cur));
                // An already-failed condition doesn't cascade here.
                if !ty.is_error() && ty != Type::Boolean {
                    self.error(span, Error::IfCondNotBoolean(ty));
                }
                self.check_stmt(then_branch, cur);
                self.check_stmt(else_branch, cur);
            }
            Stmt::While { cond, body } => {
                let span = self.arena.get(*cond).span;
                if self.expr(*cond, Some(cur)) != Type::Boolean {
                    self.error(span, Error::WhileCondNotBoolean);
                }
                self.loop_depth += 1;
                self.check_stmt(body, cur);
                self.loop_depth -= 1;
            }
            Stmt::For {
                init,
                cond,
                update,
                body,
            } => {
                if let Some(init) = init {
                    self.expr(*init, Some(cur));
                }
                if let Some(cond) = cond {
                    let span = self.arena.get(*cond).span;
                    if self.expr(*cond, Some(cur)) != Type::Boolean {
                        self.error(span, Error::ForCondNotBoolean);
                    }
                }
                if let Some(update) = update {
                    self.expr(*update, Some(cur));
                }
                self.loop_depth += 1;
                self.check_stmt(body, cur);
                self.loop_depth -= 1;
            }
            Stmt::Return(value) => {
                // The returned value is typed, but no conformance against
                // the declared return type is enforced.
                if let Some(value) = value {
                    self.expr(*value, Some(cur));
                }
            }
            Stmt::Break(span) => {
                if self.loop_depth == 0 {
                    self.error(*span, Error::BreakOutsideLoop);
                }
            }
            Stmt::Continue(span) => {
                if self.loop_depth == 0 {
                    self.error(*span, Error::ContinueOutsideLoop);
                }
            }
            Stmt::Skip => {}
            Stmt::Expr(expr) | Stmt::Write(expr) => {
                self.expr(*expr, Some(cur));
            }
        }
    }

    /// Returns the type of the given expression, computing and memoizing it
    /// on first visit. `this` nodes come in pre-stamped.
    fn expr(&mut self, id: ExprId, cur: Option<&str>) -> Type {
        if let Some(ty) = &self.arena.get(id).ty {
            return ty.clone();
        }
        let ty = self.compute_type(id, cur);
        self.arena.get_mut(id).ty = Some(ty.clone());
        ty
    }

    fn compute_type(&mut self, id: ExprId, cur: Option<&str>) -> Type {
        let expr = self.arena.get(id);
        let span = expr.span;

        match expr.kind.clone() {
            ExprKind::Constant(constant) => match constant {
                Constant::Int(_) => Type::Int,
                Constant::Float(_) => Type::Float,
                Constant::Boolean(_) => Type::Boolean,
                Constant::Str(_) => Type::Str,
                Constant::Null => Type::Null,
            },
            ExprKind::Var { name, binding } => match binding {
                Some(binding) => binding.ty,
                None => {
                    self.error(span, Error::UnresolvedName(name));
                    Type::Error
                }
            },
            // Stamped when the class record is assembled; an unstamped
            // occurrence has no enclosing class.
            ExprKind::This => Type::Error,
            ExprKind::Super => {
                self.error(span, Error::MisplacedSuper);
                Type::Error
            }
            ExprKind::ClassRef(name) => Type::Literal(name),
            ExprKind::FieldAccess { base, field, .. } => self.field_access(id, base, field, cur),
            ExprKind::Call {
                base, method, args, ..
            } => self.call(id, base, method, &args, cur),
            ExprKind::New { class, args } => self.new_object(span, class, &args, cur),
            ExprKind::Binary { op, lhs, rhs } => self.binary(span, op, lhs, rhs, cur),
            ExprKind::Unary { op, operand } => {
                let ty = self.expr(operand, cur);
                match op {
                    UnaryOp::Neg if ty.is_numeric() => ty,
                    UnaryOp::Not if ty == Type::Boolean => Type::Boolean,
                    UnaryOp::Neg => {
                        if !ty.is_error() {
                            self.error(span, Error::NegateNonNumber);
                        }
                        Type::Error
                    }
                    UnaryOp::Not => {
                        if !ty.is_error() {
                            self.error(span, Error::NotNonBoolean);
                        }
                        Type::Error
                    }
                }
            }
            ExprKind::Assign { lhs, rhs } => {
                let lhs_ty = self.expr(lhs, cur);
                let rhs_ty = self.expr(rhs, cur);
                if lhs_ty.is_error() || rhs_ty.is_error() {
                    Type::Error
                } else if !self.registry.is_subtype(&rhs_ty, &lhs_ty) {
                    self.error(span, Error::AssignMismatch);
                    Type::Error
                } else {
                    // An assignment has the type of its right-hand side,
                    // which may be narrower than the target's.
                    rhs_ty
                }
            }
            ExprKind::Auto { target, .. } => {
                let ty = self.expr(target, cur);
                if ty.is_numeric() {
                    ty
                } else {
                    if !ty.is_error() {
                        self.error(span, Error::AutoNonNumber);
                    }
                    Type::Error
                }
            }
        }
    }

    fn field_access(&mut self, id: ExprId, base: ExprId, field: Name, cur: Option<&str>) -> Type {
        self.resolve_bare_receiver(base);
        let base_span = self.arena.get(base).span;
        let class_name = match self.expr(base, cur) {
            Type::Error => return Type::Error,
            Type::Object(name) | Type::Literal(name) => name,
            _ => {
                self.error(base_span, Error::NonClassReceiver);
                return Type::Error;
            }
        };

        match self.lookup_field(&class_name, &field) {
            Some((field_id, ty)) => {
                if let ExprKind::FieldAccess { field_id: slot, .. } =
                    &mut self.arena.get_mut(id).kind
                {
                    *slot = Some(field_id);
                }
                ty
            }
            None => {
                let span = self.arena.get(id).span;
                self.error(
                    span,
                    Error::FieldNotFound {
                        field,
                        class: class_name,
                    },
                );
                Type::Error
            }
        }
    }

    fn call(
        &mut self,
        id: ExprId,
        base: ExprId,
        method: Name,
        args: &[ExprId],
        cur: Option<&str>,
    ) -> Type {
        self.resolve_bare_receiver(base);
        let base_span = self.arena.get(base).span;
        let class_name = match self.expr(base, cur) {
            Type::Error => return Type::Error,
            Type::Object(name) | Type::Literal(name) => name,
            _ => {
                self.error(base_span, Error::NonClassReceiver);
                return Type::Error;
            }
        };

        let Some(record) = self.lookup_method(&class_name, &method) else {
            let span = self.arena.get(id).span;
            self.error(span, Error::MethodNotFound(method));
            return Type::Error;
        };

        if let ExprKind::Call { method_id, .. } = &mut self.arena.get_mut(id).kind {
            *method_id = Some(record.id);
        }

        if args.len() != record.vars.formal_count() {
            let span = self.arena.get(id).span;
            self.error(span, Error::WrongArgCount);
        }
        // The declared return type stands even when the argument count is
        // off. Arguments are typed, but not matched against the formals.
        let ty = record.return_ty.clone();
        for &arg in args {
            self.expr(arg, cur);
        }
        ty
    }

    fn new_object(&mut self, span: Span, class: Name, args: &[ExprId], cur: Option<&str>) -> Type {
        for &arg in args {
            self.expr(arg, cur);
        }

        let Some(record) = self.class(&class) else {
            self.error(span, Error::NotAClassName(class));
            return Type::Error;
        };
        if let Some(constructor) = record.constructor() {
            if constructor.visibility == Visibility::Private && cur != Some(&*record.name) {
                self.error(span, Error::PrivateConstructor(class));
                return Type::Error;
            }
        }
        Type::Object(class)
    }

    fn binary(&mut self, span: Span, op: BinaryOp, lhs: ExprId, rhs: ExprId, cur: Option<&str>) -> Type {
        let lhs_ty = self.expr(lhs, cur);
        let rhs_ty = self.expr(rhs, cur);

        use BinaryOp::*;
        match op {
            // Equality applies to any pair of operands.
            Eq | NotEq => Type::Boolean,
            Add | Sub | Mul | Div => {
                if lhs_ty == Type::Int && rhs_ty == Type::Int {
                    Type::Int
                } else if lhs_ty.is_numeric() && rhs_ty.is_numeric() {
                    Type::Float
                } else {
                    self.error(span, Error::ArithNotNumber);
                    Type::Error
                }
            }
            Less | LessEq | Greater | GreaterEq => {
                if lhs_ty.is_numeric() && rhs_ty.is_numeric() {
                    Type::Boolean
                } else {
                    self.error(span, Error::CompareNotNumber);
                    Type::Error
                }
            }
            And | Or => {
                if lhs_ty == Type::Boolean && rhs_ty == Type::Boolean {
                    Type::Boolean
                } else {
                    self.error(span, Error::LogicalNotBoolean);
                    Type::Error
                }
            }
        }
    }

    /// Rewrites an unresolved bare name in receiver position into a class
    /// reference when a class by that name is registered. Any other
    /// unresolved receiver is poisoned so the caller bails silently.
    fn resolve_bare_receiver(&mut self, base: ExprId) {
        let expr = self.arena.get(base);
        let span = expr.span;
        if let ExprKind::Var {
            name,
            binding: None,
        } = &expr.kind
        {
            let name = name.clone();
            if self.registry.has(&name) {
                self.arena.get_mut(base).kind = ExprKind::ClassRef(name);
            } else {
                self.error(span, Error::NotAClassName(name));
                self.arena.get_mut(base).ty = Some(Type::Error);
            }
        }
    }

    /// Resolves a field by name in the given class or, failing that, in its
    /// immediate superclass. Lookup does not walk the full chain.
    fn lookup_field(&self, class_name: &str, field: &str) -> Option<(u32, Type)> {
        let class = self.class(class_name)?;
        if let Some(f) = class.field(field) {
            return Some((f.id, f.ty.clone()));
        }
        let superclass = class.superclass.as_deref()?;
        let f = self.class(superclass)?.field(field)?;
        Some((f.id, f.ty.clone()))
    }

    /// Same one-level lookup as [`Checker::lookup_field`], for methods.
    fn lookup_method(&self, class_name: &str, method: &str) -> Option<&'a Method> {
        let class = self.class(class_name)?;
        if let Some(m) = class.method(method) {
            return Some(m);
        }
        let superclass = class.superclass.as_deref()?;
        self.class(superclass)?.method(method)
    }

    fn class(&self, name: &str) -> Option<&'a Class> {
        self.classes.iter().find(|c| &*c.name == name)
    }

    fn error(&mut self, span: Span, error: Error) {
        self.errors.push(span.wrap(error));
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum Error {
    RepeatedClass(Name),
    UndefinedSuperclass { class: Name, superclass: Name },
    UnresolvedName(Name),
    NotAClassName(Name),
    NonClassReceiver,
    FieldNotFound { field: Name, class: Name },
    MethodNotFound(Name),
    WrongArgCount,
    AssignMismatch,
    ArithNotNumber,
    CompareNotNumber,
    LogicalNotBoolean,
    NegateNonNumber,
    NotNonBoolean,
    AutoNonNumber,
    PrivateConstructor(Name),
    IfCondNotBoolean(Type),
    WhileCondNotBoolean,
    ForCondNotBoolean,
    MisplacedSuper,
    BreakOutsideLoop,
    ContinueOutsideLoop,
}

#[cfg(test)]
mod tests {
    use crate::util::test_utils::tree_tests;

    tree_tests!(
        use checker;

        fn test_integer_arithmetic_stays_integral() {
            let expr = "1 + 2 * 3";
            let tree_ok = "
                binary + (0..9 : int)
                  int 1 (0..1 : int)
                  binary * (4..9 : int)
                    int 2 (4..5 : int)
                    int 3 (8..9 : int)
            ";
        }

        fn test_mixed_arithmetic_promotes_to_float() {
            let expr = "1 + 2.5";
            let tree_ok = "
                binary + (0..7 : float)
                  int 1 (0..1 : int)
                  float 2.5 (4..7 : float)
            ";
        }

        fn test_arithmetic_on_boolean_is_an_error() {
            let expr = "true + 1";
            let tree_error = "
                binary + (0..8 : error)
                  bool true (0..4 : boolean)
                  int 1 (7..8 : int)
            ";
            let expected_errors = &["0..8: Arithmetic operations must happen on number"];
        }

        fn test_equality_types_as_boolean_for_any_operands() {
            let expr = "1 == true";
            let tree_ok = "
                binary == (0..9 : boolean)
                  int 1 (0..1 : int)
                  bool true (5..9 : boolean)
            ";
        }

        fn test_relational_comparison_requires_numbers() {
            let expr = "true < 1";
            let expected_errors = &["0..8: Arithmetic comparisons must happen on number"];
        }

        fn test_logical_operators_require_booleans() {
            let expr = "1 && true";
            let expected_errors = &["0..9: Logical comparisons must happen on boolean"];
        }

        fn test_negation_of_an_integer() {
            let expr = "-3";
            let tree_ok = "
                unary - (0..2 : int)
                  int 3 (1..2 : int)
            ";
        }

        fn test_logical_not_requires_boolean() {
            let expr = "!1";
            let expected_errors = &["0..2: unary ! operand must be boolean"];
        }

        fn test_unresolved_name_poisons_the_operation() {
            let expr = "x + 1";
            let expected_errors = &[
                "0..1: unresolved name x",
                "0..5: Arithmetic operations must happen on number",
            ];
        }

        fn test_assignment_takes_the_rhs_type() {
            let program = "class A { void m() { float f; f = 1; } }";
            let tree_ok = "
                class A
                  method 2 private instance void m
                    local 2 float f
                    body
                      assign (30..35 : int)
                        var f #2 (30..31 : float)
                        int 1 (34..35 : int)
            ";
        }

        fn test_assignment_requires_rhs_subtype_of_lhs() {
            let program = "class A { void m() { int x; x = true; } }";
            let expected_errors = &["28..36: RHS of = operator must be a subtye of LHS"];
        }

        fn test_field_access_resolves_through_the_superclass() {
            let program =
                "class A { int f; } class B extends A { int g; void m() { this.f = this.g; } }";
            let tree_ok = "
                class A
                  field 1 private instance int f
                class B extends A
                  field 2 private instance int g
                  method 2 private instance void m
                    body
                      assign (57..72 : int)
                        field-access f #1 (57..63 : int)
                          this (57..61 : user(B))
                        field-access g #2 (66..72 : int)
                          this (66..70 : user(B))
            ";
        }

        fn test_bare_class_name_receiver_becomes_a_class_reference() {
            let program = "class A { void m(int x) { Out.print(x); } }";
            let tree_ok = "
                class A
                  method 2 private instance void m
                    formal 2 int x
                    body
                      call print #1 (26..38 : void)
                        class-ref Out (26..29 : class-literal(Out))
                        arguments
                          var x #2 (36..37 : int)
            ";
        }

        fn test_bare_name_receiver_that_is_not_a_class() {
            let program = "class A { void m() { x.f(); } }";
            let expected_errors = &["21..22: x is not a class name"];
        }

        fn test_call_to_an_undefined_method() {
            let program = "class A { void m() { this.n(); } }";
            let expected_errors = &["21..29: method n does not exist"];
        }

        fn test_wrong_argument_count_keeps_the_return_type() {
            let program = "class A { int get() { return 1; } void m() { int x; x = this.get(1); } }";
            let tree_error = "
                class A
                  method 2 private instance int get
                    body
                      return
                        int 1 (29..30 : int)
                  method 3 private instance void m
                    local 2 int x
                    body
                      assign (52..67 : int)
                        var x #2 (52..53 : int)
                        call get #2 (56..67 : int)
                          this (56..60 : user(A))
                          arguments
                            int 1 (65..66 : int)
            ";
            let expected_errors = &["56..67: not correct number of args"];
        }

        fn test_private_constructor_is_invisible_outside_its_class() {
            let program = "class A { private A() { } } class B { void m() { A a; a = new A(); } }";
            let expected_errors = &["58..65: constructor of class A is private"];
        }

        fn test_private_constructor_is_visible_inside_its_class() {
            let program = "class A { private A() { } void m() { A a; a = new A(); } }";
            let expected_errors = &[];
        }

        fn test_repeated_class_names_are_diagnosed() {
            let program = "class A { } class A { }";
            let expected_errors = &[r#"12..23: Repeated class name "A""#];
        }

        fn test_if_condition_must_be_boolean() {
            let program = "class A { void m() { if (1) ; } }";
            let expected_errors = &["25..26: If statement condition must be boolean. Got type int instead"];
        }

        fn test_while_condition_must_be_boolean() {
            let program = "class A { void m() { while (1) ; } }";
            let expected_errors = &["28..29: while loop condition is not boolean"];
        }

        fn test_break_outside_of_a_loop() {
            let program = "class A { void m() { break; } }";
            let expected_errors = &["21..26: break outside of a loop"];
        }
    );
}
