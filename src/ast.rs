use std::{collections::HashMap, fmt};

use crate::{
    token::{Span, Spanned},
    types::{Name, Type},
};

/// A fully constructed compilation unit.
///
/// Class records are kept in declaration order, the built-in `Out` class
/// first. Duplicate class names are preserved here and diagnosed by the
/// type checker; lookups return the first match.
pub struct Program {
    pub classes: Vec<Class>,
    pub arena: ExprArena,
}

impl Program {
    pub fn class(&self, name: &str) -> Option<&Class> {
        self.classes.iter().find(|c| &*c.name == name)
    }
}

pub struct Class {
    pub name: Name,
    pub superclass: Option<Name>,
    pub fields: Vec<Field>,
    pub constructors: Vec<Constructor>,
    pub methods: Vec<Method>,
    pub span: Span,
}

impl Class {
    pub fn field(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|f| &*f.name == name)
    }

    pub fn method(&self, name: &str) -> Option<&Method> {
        self.methods.iter().find(|m| &*m.name == name)
    }

    /// The constructor used for instantiation. Several may be declared, but
    /// only the first ever acts as *the* constructor.
    pub fn constructor(&self) -> Option<&Constructor> {
        self.constructors.first()
    }

    pub fn instance_field_count(&self) -> u32 {
        let count = self
            .fields
            .iter()
            .filter(|f| f.applicability == Applicability::Instance)
            .count();
        u32::try_from(count).unwrap()
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Visibility {
    Public,
    Private,
}

impl fmt::Display for Visibility {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Visibility::Public => write!(f, "public"),
            Visibility::Private => write!(f, "private"),
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Applicability {
    Static,
    Instance,
}

impl fmt::Display for Applicability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Applicability::Static => write!(f, "static"),
            Applicability::Instance => write!(f, "instance"),
        }
    }
}

pub struct Field {
    pub id: u32,
    pub name: Name,
    pub class: Name,
    pub visibility: Visibility,
    pub applicability: Applicability,
    pub ty: Type,
    pub span: Span,
}

pub struct Constructor {
    pub id: u32,
    /// The declared name; not validated against the class name.
    pub name: Name,
    pub class: Name,
    pub visibility: Visibility,
    pub vars: VariableTable,
    pub body: Block,
    pub span: Span,
}

pub struct Method {
    pub id: u32,
    pub name: Name,
    pub class: Name,
    pub visibility: Visibility,
    pub applicability: Applicability,
    pub return_ty: Type,
    pub vars: VariableTable,
    pub body: Block,
    pub span: Span,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum VarKind {
    Formal,
    Local,
}

impl fmt::Display for VarKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VarKind::Formal => write!(f, "formal"),
            VarKind::Local => write!(f, "local"),
        }
    }
}

#[derive(Clone)]
pub struct VarEntry {
    pub id: u32,
    pub name: Name,
    pub kind: VarKind,
    pub ty: Type,
}

/// Per-procedure variable table: formal parameters first, in declaration
/// order, then every local declared anywhere in the body, in the order
/// their declaring blocks completed construction.
#[derive(Default)]
pub struct VariableTable {
    entries: Vec<VarEntry>,
}

impl VariableTable {
    pub fn entries(&self) -> &[VarEntry] {
        &self.entries
    }

    pub fn formals(&self) -> impl Iterator<Item = &VarEntry> {
        self.entries.iter().filter(|e| e.kind == VarKind::Formal)
    }

    pub fn formal_count(&self) -> usize {
        self.formals().count()
    }

    pub fn get(&self, id: u32) -> Option<&VarEntry> {
        self.entries.iter().find(|e| e.id == id)
    }
}

/// Statements. Local variable declarations do not appear here: blocks
/// intercept them during construction and record them in the enclosing
/// procedure's variable table.
pub enum Stmt {
    Block(Block),
    If {
        cond: ExprId,
        then_branch: Box<Stmt>,
        /// `Skip` when the `else` branch is absent.
        else_branch: Box<Stmt>,
    },
    While {
        cond: ExprId,
        body: Box<Stmt>,
    },
    For {
        init: Option<ExprId>,
        cond: Option<ExprId>,
        update: Option<ExprId>,
        body: Box<Stmt>,
    },
    Return(Option<ExprId>),
    Break(Span),
    Continue(Span),
    Skip,
    Expr(ExprId),
    /// Built-in console print; only occurs in the `Out.print` body.
    Write(ExprId),
}

pub struct Block {
    pub stmts: Vec<Stmt>,
}

/// An item of a block's statement list as parsed, before the block
/// intercepts the declarations.
pub enum BlockItem {
    Decl(VarDecl),
    Stmt(Stmt),
}

/// A single declaration statement; may introduce several same-typed names.
pub struct VarDecl {
    pub ty: Type,
    pub names: Vec<(Name, Span)>,
}

#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub struct ExprId(u32);

pub struct Expr {
    pub kind: ExprKind,
    /// Memoized by the type checker; computed exactly once per node. `this`
    /// nodes are stamped earlier, when their class record is assembled.
    pub ty: Option<Type>,
    pub span: Span,
}

#[derive(Clone, Debug, PartialEq)]
pub struct VarBinding {
    pub id: u32,
    pub ty: Type,
}

#[derive(Clone)]
pub enum ExprKind {
    Constant(Constant),
    /// A reference to a local or parameter. The binding slot is written
    /// exactly once, by the innermost scope that declares the name.
    Var {
        name: Name,
        binding: Option<VarBinding>,
    },
    This,
    Super,
    /// A class name used as a static-access receiver. Also produced by the
    /// checker when an unresolved bare name turns out to name a class.
    ClassRef(Name),
    FieldAccess {
        base: ExprId,
        field: Name,
        /// Resolved by the type checker.
        field_id: Option<u32>,
    },
    Call {
        base: ExprId,
        method: Name,
        args: Vec<ExprId>,
        /// Resolved by the type checker.
        method_id: Option<u32>,
    },
    New {
        class: Name,
        args: Vec<ExprId>,
    },
    Binary {
        op: BinaryOp,
        lhs: ExprId,
        rhs: ExprId,
    },
    Unary {
        op: UnaryOp,
        operand: ExprId,
    },
    Assign {
        lhs: ExprId,
        rhs: ExprId,
    },
    Auto {
        target: ExprId,
        op: AutoOp,
        fix: Fix,
    },
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    And,
    Or,
    Eq,
    NotEq,
    Less,
    LessEq,
    Greater,
    GreaterEq,
}

impl BinaryOp {
    pub fn is_arith(self) -> bool {
        use BinaryOp::*;
        matches!(self, Add | Sub | Mul | Div)
    }

    pub fn is_relational(self) -> bool {
        use BinaryOp::*;
        matches!(self, Less | LessEq | Greater | GreaterEq)
    }
}

impl fmt::Display for BinaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let op = match self {
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::And => "&&",
            BinaryOp::Or => "||",
            BinaryOp::Eq => "==",
            BinaryOp::NotEq => "!=",
            BinaryOp::Less => "<",
            BinaryOp::LessEq => "<=",
            BinaryOp::Greater => ">",
            BinaryOp::GreaterEq => ">=",
        };
        write!(f, "{op}")
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum UnaryOp {
    Not,
    Neg,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum AutoOp {
    Inc,
    Dec,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Fix {
    Pre,
    Post,
}

#[derive(Clone, Debug, PartialEq)]
pub enum Constant {
    Int(i64),
    Float(f64),
    Boolean(bool),
    Str(Name),
    Null,
}

impl fmt::Display for Constant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Constant::Int(v) => write!(f, "Constant(Integer-constant({v}))"),
            Constant::Boolean(v) => write!(f, "Constant(Boolean-constant({v}))"),
            Constant::Float(v) => write!(f, "Constant({v})"),
            Constant::Str(v) => write!(f, "Constant({v})"),
            Constant::Null => write!(f, "Constant(null)"),
        }
    }
}

/// Flat storage for expression nodes. Handles, not references, flow through
/// the tree, so late resolution writes need no back-pointers.
#[derive(Default)]
pub struct ExprArena {
    exprs: Vec<Expr>,
}

impl ExprArena {
    pub fn alloc(&mut self, kind: ExprKind, span: Span) -> ExprId {
        let id = ExprId(u32::try_from(self.exprs.len()).unwrap());
        self.exprs.push(Expr {
            kind,
            ty: None,
            span,
        });
        id
    }

    pub fn get(&self, id: ExprId) -> &Expr {
        &self.exprs[id.0 as usize]
    }

    pub fn get_mut(&mut self, id: ExprId) -> &mut Expr {
        &mut self.exprs[id.0 as usize]
    }
}

/// Diagnostics produced while the tree is being assembled. These do not
/// halt construction.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum NameError {
    ReusedVariable(Name),
    RepeatedField(Name),
}

impl fmt::Display for NameError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NameError::ReusedVariable(name) => write!(f, "reuse of name {name}"),
            NameError::RepeatedField(name) => write!(f, "repeating field name {name}"),
        }
    }
}

/// Per-compilation id allocators. Every counter starts at 1 and never
/// repeats a value within one `Builder`'s lifetime.
struct IdGen {
    constructors: u32,
    fields: u32,
    methods: u32,
    variables: u32,
}

impl IdGen {
    fn new() -> IdGen {
        IdGen {
            constructors: 1,
            fields: 1,
            methods: 1,
            variables: 1,
        }
    }

    fn next_constructor(&mut self) -> u32 {
        let id = self.constructors;
        self.constructors += 1;
        id
    }

    fn next_field(&mut self) -> u32 {
        let id = self.fields;
        self.fields += 1;
        id
    }

    fn next_method(&mut self) -> u32 {
        let id = self.methods;
        self.methods += 1;
        id
    }

    fn next_variable(&mut self) -> u32 {
        let id = self.variables;
        self.variables += 1;
        id
    }
}

type Scope = HashMap<Name, (u32, Type)>;

pub struct Param {
    pub ty: Type,
    pub name: Name,
    pub span: Span,
}

/// Assembles AST records as the parser reduces them, implementing the
/// deferred resolution protocol:
///
/// - When a block finishes, its declarations (in statement order) receive
///   fresh variable ids; references in each already-built child statement
///   are patched in place against the declarations seen so far, so a use
///   that textually precedes its declaration escapes the block unresolved.
/// - Unresolved references keep an empty binding slot and are re-examined
///   by each enclosing block, and finally by the procedure's parameter
///   scope. Local ids are therefore allocated innermost-block-first, and
///   formal parameters receive ids only after the whole body is built.
/// - `this` expressions are stamped with the enclosing class's object type
///   when the class record is assembled, since the class name is unknown
///   while the body is under construction.
pub struct Builder {
    pub arena: ExprArena,
    pub errors: Vec<Spanned<NameError>>,
    ids: IdGen,
    local_cache: Vec<VarEntry>,
    builtin: Option<Class>,
}

impl Builder {
    pub fn new() -> Builder {
        let mut builder = Builder {
            arena: ExprArena::default(),
            errors: Vec::new(),
            ids: IdGen::new(),
            local_cache: Vec::new(),
            builtin: None,
        };
        let out = builder.build_out_class();
        builder.builtin = Some(out);
        builder
    }

    /// The built-in `Out` class: `public static void print(int i)`, whose
    /// body is the sole Write statement in any program. Built through the
    /// ordinary record path, so it consumes method id 1 and variable id 1.
    fn build_out_class(&mut self) -> Class {
        let span = Span::new_of_length(0, 0);
        let i: Name = "i".into();
        let arg = self.arena.alloc(
            ExprKind::Var {
                name: i.clone(),
                binding: None,
            },
            span,
        );
        let body = self.finish_block(vec![BlockItem::Stmt(Stmt::Write(arg))]);
        let print = self.finish_method(
            "print".into(),
            "Out".into(),
            Visibility::Public,
            Applicability::Static,
            Type::Void,
            vec![Param {
                ty: Type::Int,
                name: i,
                span,
            }],
            body,
            span,
        );
        self.finish_class("Out".into(), None, vec![], vec![], vec![print], span)
    }

    pub fn new_field(
        &mut self,
        name: Name,
        class: Name,
        visibility: Visibility,
        applicability: Applicability,
        ty: Type,
        span: Span,
    ) -> Field {
        Field {
            id: self.ids.next_field(),
            name,
            class,
            visibility,
            applicability,
            ty,
            span,
        }
    }

    /// Closes a block: harvests its declarations, patches matching child
    /// references, and returns the statement-only block.
    pub fn finish_block(&mut self, items: Vec<BlockItem>) -> Block {
        let mut scope = Scope::new();
        let mut stmts = Vec::with_capacity(items.len());
        for item in items {
            match item {
                BlockItem::Decl(decl) => {
                    for (name, span) in decl.names {
                        if scope.contains_key(&name) {
                            self.errors
                                .push(Spanned::new(span, NameError::ReusedVariable(name.clone())));
                        }
                        let id = self.ids.next_variable();
                        scope.insert(name.clone(), (id, decl.ty.clone()));
                        self.local_cache.push(VarEntry {
                            id,
                            name,
                            kind: VarKind::Local,
                            ty: decl.ty.clone(),
                        });
                    }
                }
                BlockItem::Stmt(stmt) => {
                    self.patch_stmt(&stmt, &scope);
                    stmts.push(stmt);
                }
            }
        }
        Block { stmts }
    }

    pub fn finish_constructor(
        &mut self,
        name: Name,
        class: Name,
        visibility: Visibility,
        params: Vec<Param>,
        body: Block,
        span: Span,
    ) -> Constructor {
        let id = self.ids.next_constructor();
        let vars = self.compute_variable_table(params, &body);
        Constructor {
            id,
            name,
            class,
            visibility,
            vars,
            body,
            span,
        }
    }

    #[allow(clippy::too_many_arguments)]
    pub fn finish_method(
        &mut self,
        name: Name,
        class: Name,
        visibility: Visibility,
        applicability: Applicability,
        return_ty: Type,
        params: Vec<Param>,
        body: Block,
        span: Span,
    ) -> Method {
        let id = self.ids.next_method();
        let vars = self.compute_variable_table(params, &body);
        Method {
            id,
            name,
            class,
            visibility,
            applicability,
            return_ty,
            vars,
            body,
            span,
        }
    }

    /// Binds formal parameters (patching body references left unresolved by
    /// every block scope) and assembles the variable table: formals first,
    /// then the cached locals. Drains the local cache.
    fn compute_variable_table(&mut self, params: Vec<Param>, body: &Block) -> VariableTable {
        let mut scope = Scope::new();
        let mut entries = Vec::with_capacity(params.len() + self.local_cache.len());
        for param in params {
            let id = self.ids.next_variable();
            scope.insert(param.name.clone(), (id, param.ty.clone()));
            entries.push(VarEntry {
                id,
                name: param.name,
                kind: VarKind::Formal,
                ty: param.ty,
            });
        }
        for stmt in &body.stmts {
            self.patch_stmt(stmt, &scope);
        }
        entries.append(&mut self.local_cache);
        VariableTable { entries }
    }

    /// Assembles a class record: diagnoses repeated field names (repeats
    /// are kept) and stamps every `this` in the bodies with the class's
    /// object type.
    pub fn finish_class(
        &mut self,
        name: Name,
        superclass: Option<Name>,
        fields: Vec<Field>,
        constructors: Vec<Constructor>,
        methods: Vec<Method>,
        span: Span,
    ) -> Class {
        for (index, field) in fields.iter().enumerate() {
            for earlier in &fields[..index] {
                if earlier.name == field.name {
                    self.errors.push(Spanned::new(
                        field.span,
                        NameError::RepeatedField(field.name.clone()),
                    ));
                }
            }
        }
        let this_ty = Type::Object(name.clone());
        for constructor in &constructors {
            Self::stamp_this_block(&mut self.arena, &constructor.body, &this_ty);
        }
        for method in &methods {
            Self::stamp_this_block(&mut self.arena, &method.body, &this_ty);
        }
        Class {
            name,
            superclass,
            fields,
            constructors,
            methods,
            span,
        }
    }

    pub fn finish_program(mut self, classes: Vec<Class>) -> (Program, Vec<Spanned<NameError>>) {
        let classes = self.builtin.take().into_iter().chain(classes).collect();
        (
            Program {
                classes,
                arena: self.arena,
            },
            self.errors,
        )
    }

    fn patch_stmt(&mut self, stmt: &Stmt, scope: &Scope) {
        match stmt {
            Stmt::Block(block) => {
                for stmt in &block.stmts {
                    self.patch_stmt(stmt, scope);
                }
            }
            Stmt::If {
                cond,
                then_branch,
                else_branch,
            } => {
                self.patch_expr(*cond, scope);
                self.patch_stmt(then_branch, scope);
                self.patch_stmt(else_branch, scope);
            }
            Stmt::While { cond, body } => {
                self.patch_expr(*cond, scope);
                self.patch_stmt(body, scope);
            }
            Stmt::For {
                init,
                cond,
                update,
                body,
            } => {
                for expr in [init, cond, update].into_iter().flatten() {
                    self.patch_expr(*expr, scope);
                }
                self.patch_stmt(body, scope);
            }
            Stmt::Return(Some(expr)) | Stmt::Expr(expr) | Stmt::Write(expr) => {
                self.patch_expr(*expr, scope);
            }
            Stmt::Return(None) | Stmt::Break(_) | Stmt::Continue(_) | Stmt::Skip => (),
        }
    }

    fn patch_expr(&mut self, id: ExprId, scope: &Scope) {
        match &mut self.arena.get_mut(id).kind {
            ExprKind::Var { name, binding } => {
                if binding.is_none() {
                    if let Some((var_id, ty)) = scope.get(&**name) {
                        *binding = Some(VarBinding {
                            id: *var_id,
                            ty: ty.clone(),
                        });
                    }
                }
            }
            ExprKind::Constant(_) | ExprKind::This | ExprKind::Super | ExprKind::ClassRef(_) => (),
            ExprKind::FieldAccess { base, .. } => {
                let base = *base;
                self.patch_expr(base, scope);
            }
            ExprKind::Call { base, args, .. } => {
                let (base, args) = (*base, args.clone());
                self.patch_expr(base, scope);
                for arg in args {
                    self.patch_expr(arg, scope);
                }
            }
            ExprKind::New { args, .. } => {
                let args = args.clone();
                for arg in args {
                    self.patch_expr(arg, scope);
                }
            }
            ExprKind::Binary { lhs, rhs, .. } | ExprKind::Assign { lhs, rhs } => {
                let (lhs, rhs) = (*lhs, *rhs);
                self.patch_expr(lhs, scope);
                self.patch_expr(rhs, scope);
            }
            ExprKind::Unary { operand, .. } => {
                let operand = *operand;
                self.patch_expr(operand, scope);
            }
            ExprKind::Auto { target, .. } => {
                let target = *target;
                self.patch_expr(target, scope);
            }
        }
    }

    fn stamp_this_block(arena: &mut ExprArena, block: &Block, ty: &Type) {
        for stmt in &block.stmts {
            Self::stamp_this_stmt(arena, stmt, ty);
        }
    }

    fn stamp_this_stmt(arena: &mut ExprArena, stmt: &Stmt, ty: &Type) {
        match stmt {
            Stmt::Block(block) => Self::stamp_this_block(arena, block, ty),
            Stmt::If {
                cond,
                then_branch,
                else_branch,
            } => {
                Self::stamp_this_expr(arena, *cond, ty);
                Self::stamp_this_stmt(arena, then_branch, ty);
                Self::stamp_this_stmt(arena, else_branch, ty);
            }
            Stmt::While { cond, body } => {
                Self::stamp_this_expr(arena, *cond, ty);
                Self::stamp_this_stmt(arena, body, ty);
            }
            Stmt::For {
                init,
                cond,
                update,
                body,
            } => {
                for expr in [init, cond, update].into_iter().flatten() {
                    Self::stamp_this_expr(arena, *expr, ty);
                }
                Self::stamp_this_stmt(arena, body, ty);
            }
            Stmt::Return(Some(expr)) | Stmt::Expr(expr) | Stmt::Write(expr) => {
                Self::stamp_this_expr(arena, *expr, ty);
            }
            Stmt::Return(None) | Stmt::Break(_) | Stmt::Continue(_) | Stmt::Skip => (),
        }
    }

    fn stamp_this_expr(arena: &mut ExprArena, id: ExprId, ty: &Type) {
        let children: Vec<ExprId> = match &arena.get(id).kind {
            ExprKind::This => {
                arena.get_mut(id).ty = Some(ty.clone());
                return;
            }
            ExprKind::Constant(_)
            | ExprKind::Var { .. }
            | ExprKind::Super
            | ExprKind::ClassRef(_) => return,
            ExprKind::FieldAccess { base, .. } => vec![*base],
            ExprKind::Call { base, args, .. } => {
                let mut children = vec![*base];
                children.extend(args);
                children
            }
            ExprKind::New { args, .. } => args.clone(),
            ExprKind::Binary { lhs, rhs, .. } | ExprKind::Assign { lhs, rhs } => {
                vec![*lhs, *rhs]
            }
            ExprKind::Unary { operand, .. } => vec![*operand],
            ExprKind::Auto { target, .. } => vec![*target],
        };
        for child in children {
            Self::stamp_this_expr(arena, child, ty);
        }
    }
}

impl Default for Builder {
    fn default() -> Self {
        Builder::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn sp() -> Span {
        Span::new_of_length(0, 0)
    }

    fn var(b: &mut Builder, name: &str) -> ExprId {
        b.arena.alloc(
            ExprKind::Var {
                name: name.into(),
                binding: None,
            },
            sp(),
        )
    }

    fn decl(ty: Type, name: &str) -> BlockItem {
        BlockItem::Decl(VarDecl {
            ty,
            names: vec![(name.into(), sp())],
        })
    }

    #[track_caller]
    fn binding_of(b: &Builder, id: ExprId) -> VarBinding {
        match &b.arena.get(id).kind {
            ExprKind::Var {
                binding: Some(binding),
                ..
            } => binding.clone(),
            ExprKind::Var { binding: None, .. } => panic!("variable is unresolved"),
            _ => panic!("not a variable reference"),
        }
    }

    #[test]
    fn block_declaration_patches_references() {
        // The built-in Out class consumes variable id 1.
        let b = &mut Builder::new();
        let use_x = var(b, "x");
        b.finish_block(vec![decl(Type::Int, "x"), BlockItem::Stmt(Stmt::Expr(use_x))]);

        let binding = binding_of(b, use_x);
        assert_eq!(binding.id, 2);
        assert_eq!(binding.ty, Type::Int);
        assert!(b.errors.is_empty());
    }

    #[test]
    fn use_before_declaration_escapes_to_enclosing_block() {
        let b = &mut Builder::new();
        let use_y = var(b, "y");
        // Inner block: the use precedes the declaration, so it is not
        // patched here even though the inner "y" gets an id (2).
        let inner = b.finish_block(vec![
            BlockItem::Stmt(Stmt::Expr(use_y)),
            decl(Type::Int, "y"),
        ]);
        assert!(matches!(
            &b.arena.get(use_y).kind,
            ExprKind::Var { binding: None, .. }
        ));

        // The enclosing block's earlier declaration captures it.
        b.finish_block(vec![
            decl(Type::Float, "y"),
            BlockItem::Stmt(Stmt::Block(inner)),
        ]);
        let binding = binding_of(b, use_y);
        assert_eq!(binding.id, 3);
        assert_eq!(binding.ty, Type::Float);
    }

    #[test]
    fn shadowing_binds_to_the_innermost_declaration() {
        let b = &mut Builder::new();
        let use_x = var(b, "x");
        let inner =
            b.finish_block(vec![decl(Type::Int, "x"), BlockItem::Stmt(Stmt::Expr(use_x))]);
        let inner_binding = binding_of(b, use_x);

        b.finish_block(vec![
            decl(Type::Float, "x"),
            BlockItem::Stmt(Stmt::Block(inner)),
        ]);
        // Already bound; the outer declaration must not overwrite it.
        assert_eq!(binding_of(b, use_x), inner_binding);
        assert_eq!(inner_binding.ty, Type::Int);
    }

    #[test]
    fn parameters_bind_leftovers_and_get_ids_after_locals() {
        let b = &mut Builder::new();
        let use_l = var(b, "l");
        let use_p = var(b, "p");
        let body = b.finish_block(vec![
            decl(Type::Int, "l"),
            BlockItem::Stmt(Stmt::Expr(use_l)),
            BlockItem::Stmt(Stmt::Expr(use_p)),
        ]);
        let method = b.finish_method(
            "m".into(),
            "A".into(),
            Visibility::Public,
            Applicability::Instance,
            Type::Void,
            vec![Param {
                ty: Type::Boolean,
                name: "p".into(),
                span: sp(),
            }],
            body,
            sp(),
        );

        let local = binding_of(b, use_l);
        let formal = binding_of(b, use_p);
        assert_eq!(local.id, 2);
        assert_eq!(formal.id, 3);
        assert_eq!(formal.ty, Type::Boolean);

        // Formals first, then locals, regardless of id order.
        let kinds: Vec<_> = method.vars.entries().iter().map(|e| e.kind).collect();
        assert_eq!(kinds, vec![VarKind::Formal, VarKind::Local]);
        assert_eq!(method.vars.entries()[0].id, 3);
        assert_eq!(method.vars.entries()[1].id, 2);
        // User methods start after the built-in Out.print.
        assert_eq!(method.id, 2);
    }

    #[test]
    fn duplicate_local_names_are_diagnosed_and_kept() {
        let b = &mut Builder::new();
        let body = b.finish_block(vec![decl(Type::Int, "x"), decl(Type::Float, "x")]);
        assert!(body.stmts.is_empty());
        assert_eq!(
            b.errors.iter().map(|e| e.inner.clone()).collect::<Vec<_>>(),
            vec![NameError::ReusedVariable("x".into())]
        );

        // Both declarations end up in the variable table.
        let method = b.finish_method(
            "m".into(),
            "A".into(),
            Visibility::Private,
            Applicability::Static,
            Type::Void,
            vec![],
            body,
            sp(),
        );
        let ids: Vec<_> = method.vars.entries().iter().map(|e| e.id).collect();
        assert_eq!(ids, vec![2, 3]);
    }

    #[test]
    fn repeated_field_names_are_diagnosed_and_kept() {
        let b = &mut Builder::new();
        let f1 = b.new_field(
            "x".into(),
            "A".into(),
            Visibility::Private,
            Applicability::Instance,
            Type::Int,
            sp(),
        );
        let f2 = b.new_field(
            "x".into(),
            "A".into(),
            Visibility::Private,
            Applicability::Instance,
            Type::Float,
            sp(),
        );
        let class = b.finish_class("A".into(), None, vec![f1, f2], vec![], vec![], sp());
        assert_eq!(class.fields.len(), 2);
        assert_eq!(
            b.errors.iter().map(|e| e.inner.clone()).collect::<Vec<_>>(),
            vec![NameError::RepeatedField("x".into())]
        );
    }

    #[test]
    fn this_expressions_are_stamped_at_class_assembly() {
        let b = &mut Builder::new();
        let this = b.arena.alloc(ExprKind::This, sp());
        let body = b.finish_block(vec![BlockItem::Stmt(Stmt::Expr(this))]);
        let method = b.finish_method(
            "m".into(),
            "A".into(),
            Visibility::Public,
            Applicability::Instance,
            Type::Void,
            vec![],
            body,
            sp(),
        );
        assert_eq!(b.arena.get(this).ty, None);

        b.finish_class("A".into(), None, vec![], vec![], vec![method], sp());
        assert_eq!(b.arena.get(this).ty, Some(Type::Object("A".into())));
    }

    #[test]
    fn builtin_out_is_first_and_consumes_initial_ids() {
        let builder = Builder::new();
        let (program, errors) = builder.finish_program(vec![]);
        assert!(errors.is_empty());
        assert_eq!(program.classes.len(), 1);

        let out = program.class("Out").unwrap();
        let print = out.method("print").unwrap();
        assert_eq!(print.id, 1);
        assert_eq!(print.visibility, Visibility::Public);
        assert_eq!(print.applicability, Applicability::Static);
        let formals: Vec<_> = print.vars.formals().collect();
        assert_eq!(formals.len(), 1);
        assert_eq!(formals[0].id, 1);
        assert_eq!(&*formals[0].name, "i");
        assert_eq!(formals[0].ty, Type::Int);
        assert!(matches!(print.body.stmts.as_slice(), [Stmt::Write(_)]));
    }

    #[test]
    fn ids_are_strictly_increasing_per_kind() {
        let b = &mut Builder::new();
        let ids: Vec<_> = (0..4)
            .map(|n| {
                b.new_field(
                    format!("f{n}").into(),
                    "A".into(),
                    Visibility::Private,
                    Applicability::Instance,
                    Type::Int,
                    sp(),
                )
                .id
            })
            .collect();
        assert_eq!(ids, vec![1, 2, 3, 4]);

        // A fresh builder starts over; counters are per-compilation.
        let b2 = &mut Builder::new();
        let field = b2.new_field(
            "f".into(),
            "A".into(),
            Visibility::Private,
            Applicability::Instance,
            Type::Int,
            sp(),
        );
        assert_eq!(field.id, 1);
    }
}
