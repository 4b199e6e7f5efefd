use std::{collections::HashMap, fmt, rc::Rc};

/// Identifiers are shared by refcount; the AST is built once and names are
/// referenced from many records.
pub type Name = Rc<str>;

/// The type of an expression or declaration.
///
/// `Object` is the type of an instance of a class ("user" type); `Literal`
/// is the type of a class name used as a static-access receiver.
#[derive(Clone, Debug, PartialEq)]
pub enum Type {
    Int,
    Float,
    Boolean,
    Void,
    Null,
    Str,
    Error,
    Object(Name),
    Literal(Name),
}

impl Type {
    pub fn is_numeric(&self) -> bool {
        matches!(self, Type::Int | Type::Float)
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Type::Error)
    }

    /// The class name, for object and literal types.
    pub fn class_name(&self) -> Option<&Name> {
        match self {
            Type::Object(name) | Type::Literal(name) => Some(name),
            _ => None,
        }
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Type::Int => write!(f, "int"),
            Type::Float => write!(f, "float"),
            Type::Boolean => write!(f, "boolean"),
            Type::Void => write!(f, "void"),
            Type::Null => write!(f, "null"),
            Type::Str => write!(f, "string"),
            Type::Error => write!(f, "error"),
            Type::Object(name) => write!(f, "user({name})"),
            Type::Literal(name) => write!(f, "class-literal({name})"),
        }
    }
}

/// Records each registered class and its superclass edge, backing the
/// subclass and subtype relations.
pub struct TypeRegistry {
    parents: HashMap<Name, Option<Name>>,
}

impl TypeRegistry {
    pub fn with_capacity(capacity: usize) -> TypeRegistry {
        TypeRegistry {
            parents: HashMap::with_capacity(capacity),
        }
    }

    pub fn has(&self, name: &str) -> bool {
        self.parents.contains_key(name)
    }

    /// Registers the provided class. Returns false if a class with the same
    /// name was already registered (the first registration wins).
    pub fn define(&mut self, name: Name, parent: Option<Name>) -> bool {
        if self.has(&name) {
            return false;
        }
        self.parents.insert(name, parent);
        true
    }

    /// Whether `sub` names the same class as `sup` or a class anywhere
    /// below it in the inheritance chain.
    pub fn is_subclass(&self, sub: &str, sup: &str) -> bool {
        if sub == sup {
            return true;
        }
        let mut curr = self.parents.get(sub);
        while let Some(Some(parent)) = curr {
            if &**parent == sup {
                return true;
            }
            curr = self.parents.get(&**parent);
        }
        false
    }

    pub fn is_subtype(&self, sub: &Type, sup: &Type) -> bool {
        if sub == sup {
            return true;
        }
        match (sub, sup) {
            (Type::Int, Type::Float) => true,
            (Type::Null, Type::Object(_)) => true,
            (Type::Object(a), Type::Object(b)) | (Type::Literal(a), Type::Literal(b)) => {
                self.is_subclass(a, b)
            }
            _ => false,
        }
    }
}
