//! Lowering of the checked AST into abstract machine code and, optionally,
//! the three-address intermediate representation.

pub mod absmc;
pub mod ir;

use std::{collections::HashMap, fmt};

use crate::{
    ast::{Applicability, Class, Method},
    types::Name,
};

/// Storage assignment for fields. Static fields occupy one shared area with
/// globally contiguous cells; instance fields get per-object slots numbered
/// from zero within each class.
pub struct FieldLayout {
    instance: HashMap<u32, u32>,
    statics: HashMap<(Name, Name), u32>,
    pub static_count: u32,
}

impl FieldLayout {
    pub fn compute(classes: &[Class]) -> FieldLayout {
        let mut instance = HashMap::new();
        let mut statics = HashMap::new();
        let mut static_count = 0;

        for class in classes {
            let mut offset = 0;
            for field in &class.fields {
                if field.applicability == Applicability::Static {
                    statics.insert((class.name.clone(), field.name.clone()), static_count);
                    static_count += 1;
                } else {
                    instance.insert(field.id, offset);
                    offset += 1;
                }
            }
        }

        FieldLayout {
            instance,
            statics,
            static_count,
        }
    }

    pub fn instance_offset(&self, field_id: u32) -> Option<u32> {
        self.instance.get(&field_id).copied()
    }

    pub fn static_offset(&self, class: &str, field: &str) -> Option<u32> {
        self.statics
            .iter()
            .find(|((c, f), _)| &**c == class && &**f == field)
            .map(|(_, &offset)| offset)
    }
}

/// Control-flow label numbering. Each statement kind counts independently,
/// starting at 1, across the whole program.
pub struct Labels {
    ifs: u32,
    whiles: u32,
    fors: u32,
}

impl Labels {
    pub fn new() -> Labels {
        Labels {
            ifs: 1,
            whiles: 1,
            fors: 1,
        }
    }

    /// Returns `(then, else, end)` labels.
    pub fn next_if(&mut self) -> (String, String, String) {
        let n = self.ifs;
        self.ifs += 1;
        (
            format!("if_{n}_then"),
            format!("if_{n}_else"),
            format!("if_{n}_end"),
        )
    }

    /// Returns `(cond, body, end)` labels.
    pub fn next_while(&mut self) -> (String, String, String) {
        let n = self.whiles;
        self.whiles += 1;
        (
            format!("while_{n}_cond"),
            format!("while_{n}_body"),
            format!("while_{n}_end"),
        )
    }

    /// Returns `(cond, body, update, end)` labels.
    pub fn next_for(&mut self) -> (String, String, String, String) {
        let n = self.fors;
        self.fors += 1;
        (
            format!("for_{n}_cond"),
            format!("for_{n}_body"),
            format!("for_{n}_update"),
            format!("for_{n}_end"),
        )
    }
}

impl Default for Labels {
    fn default() -> Labels {
        Labels::new()
    }
}

pub fn constructor_label(id: u32) -> String {
    format!("C_{id}")
}

pub fn method_label(name: &str, id: u32) -> String {
    format!("M_{name}_{id}")
}

/// The program entry point is the static method named `main`; its section
/// gets an extra `_start` alias.
pub fn is_entry_point(method: &Method) -> bool {
    &*method.name == "main" && method.applicability == Applicability::Static
}

/// Lowering failures. These indicate constructs the back end cannot express
/// or resolution data missing from the checked tree.
#[derive(Clone, Debug, PartialEq)]
pub enum Error {
    UnsupportedAssignTarget,
    UnsupportedAutoTarget,
    UnsupportedReceiver,
    StringConstant,
    UnresolvedField,
    UnresolvedMethod,
    UnresolvedVariable(Name),
    UnknownClass(Name),
    JumpOutsideLoop,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::UnsupportedAssignTarget => write!(f, "cannot assign to this expression"),
            Error::UnsupportedAutoTarget => {
                write!(f, "auto operation target must be a variable")
            }
            Error::UnsupportedReceiver => write!(f, "unsupported receiver expression"),
            Error::StringConstant => write!(f, "string constants cannot be lowered"),
            Error::UnresolvedField => write!(f, "field access was not resolved"),
            Error::UnresolvedMethod => write!(f, "method call was not resolved"),
            Error::UnresolvedVariable(name) => write!(f, "variable {name} has no storage"),
            Error::UnknownClass(name) => write!(f, "unknown class {name}"),
            Error::JumpOutsideLoop => write!(f, "break or continue outside of a loop"),
        }
    }
}

impl std::error::Error for Error {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser;

    fn layout_for(src: &str) -> FieldLayout {
        let tokens = &mut Vec::new();
        let program = parser::parse_program(src, tokens).unwrap();
        FieldLayout::compute(&program.classes)
    }

    #[test]
    fn static_cells_are_globally_contiguous() {
        let layout = layout_for(
            "class A { static int x; int a; static int y; }
             class B { static int z; }",
        );
        assert_eq!(layout.static_count, 3);
        assert_eq!(layout.static_offset("A", "x"), Some(0));
        assert_eq!(layout.static_offset("A", "y"), Some(1));
        assert_eq!(layout.static_offset("B", "z"), Some(2));
        assert_eq!(layout.static_offset("A", "a"), None);
    }

    #[test]
    fn instance_slots_restart_per_class() {
        let layout = layout_for(
            "class A { int a; static int s; int b; }
             class B { int c; }",
        );
        // Field ids are assigned in declaration order across the program:
        // a = 1, s = 2, b = 3, c = 4.
        assert_eq!(layout.instance_offset(1), Some(0));
        assert_eq!(layout.instance_offset(3), Some(1));
        assert_eq!(layout.instance_offset(4), Some(0));
        assert_eq!(layout.instance_offset(2), None);
    }
}
