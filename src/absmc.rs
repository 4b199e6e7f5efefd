//! The abstract stack machine program model and its textual serialization.
//!
//! Output is grouped by class, one labeled section per procedure, with every
//! instruction line padded so end-of-line comments start at a fixed column.

use std::fmt;

/// Column at which instruction comments begin.
pub const COMMENT_COLUMN: usize = 50;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Reg {
    /// Argument register `a{n}`. `a0` doubles as the receiver pointer and
    /// the return-value register.
    Arg(u32),
    /// Temporary register `t{n}`.
    Tmp(u32),
    /// Static area pointer.
    Sap,
}

impl fmt::Display for Reg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Reg::Arg(n) => write!(f, "a{n}"),
            Reg::Tmp(n) => write!(f, "t{n}"),
            Reg::Sap => write!(f, "sap"),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum Instruction {
    MoveImmedI(Reg, i64),
    MoveImmedF(Reg, f64),
    Move(Reg, Reg),
    IAdd(Reg, Reg, Reg),
    ISub(Reg, Reg, Reg),
    IMul(Reg, Reg, Reg),
    IDiv(Reg, Reg, Reg),
    IMod(Reg, Reg, Reg),
    IGt(Reg, Reg, Reg),
    IGeq(Reg, Reg, Reg),
    ILt(Reg, Reg, Reg),
    ILeq(Reg, Reg, Reg),
    FAdd(Reg, Reg, Reg),
    FSub(Reg, Reg, Reg),
    FMul(Reg, Reg, Reg),
    FDiv(Reg, Reg, Reg),
    FGt(Reg, Reg, Reg),
    FGeq(Reg, Reg, Reg),
    FLt(Reg, Reg, Reg),
    FLeq(Reg, Reg, Reg),
    FToI(Reg, Reg),
    IToF(Reg, Reg),
    Bz(Reg, String),
    Bnz(Reg, String),
    Jmp(String),
    HLoad(Reg, Reg, Reg),
    HStore(Reg, Reg, Reg),
    HAlloc(Reg, Reg),
    Call(String),
    Ret,
    Save(Reg),
    Restore(Reg),
    IWrite(Reg),
}

impl Instruction {
    pub fn mnemonic(&self) -> &'static str {
        use Instruction::*;
        match self {
            MoveImmedI(..) => "move_immed_i",
            MoveImmedF(..) => "move_immed_f",
            Move(..) => "move",
            IAdd(..) => "iadd",
            ISub(..) => "isub",
            IMul(..) => "imul",
            IDiv(..) => "idiv",
            IMod(..) => "imod",
            IGt(..) => "igt",
            IGeq(..) => "igeq",
            ILt(..) => "ilt",
            ILeq(..) => "ileq",
            FAdd(..) => "fadd",
            FSub(..) => "fsub",
            FMul(..) => "fmul",
            FDiv(..) => "fdiv",
            FGt(..) => "fgt",
            FGeq(..) => "fgeq",
            FLt(..) => "flt",
            FLeq(..) => "fleq",
            FToI(..) => "ftoi",
            IToF(..) => "itof",
            Bz(..) => "bz",
            Bnz(..) => "bnz",
            Jmp(..) => "jmp",
            HLoad(..) => "hload",
            HStore(..) => "hstore",
            HAlloc(..) => "halloc",
            Call(..) => "call",
            Ret => "ret",
            Save(..) => "save",
            Restore(..) => "restore",
            IWrite(..) => "iwrite",
        }
    }

    fn args(&self) -> Vec<String> {
        use Instruction::*;
        match self {
            MoveImmedI(r, v) => vec![r.to_string(), v.to_string()],
            MoveImmedF(r, v) => vec![r.to_string(), v.to_string()],
            Move(a, b) | FToI(a, b) | IToF(a, b) | HAlloc(a, b) => {
                vec![a.to_string(), b.to_string()]
            }
            IAdd(a, b, c) | ISub(a, b, c) | IMul(a, b, c) | IDiv(a, b, c) | IMod(a, b, c)
            | IGt(a, b, c) | IGeq(a, b, c) | ILt(a, b, c) | ILeq(a, b, c) | FAdd(a, b, c)
            | FSub(a, b, c) | FMul(a, b, c) | FDiv(a, b, c) | FGt(a, b, c) | FGeq(a, b, c)
            | FLt(a, b, c) | FLeq(a, b, c) | HLoad(a, b, c) | HStore(a, b, c) => {
                vec![a.to_string(), b.to_string(), c.to_string()]
            }
            Bz(r, l) | Bnz(r, l) => vec![r.to_string(), l.clone()],
            Jmp(l) | Call(l) => vec![l.clone()],
            Ret => vec![],
            Save(r) | Restore(r) | IWrite(r) => vec![r.to_string()],
        }
    }
}

impl fmt::Display for Instruction {
    // A mnemonic with no arguments keeps its trailing space, matching the
    // fixed output format.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.mnemonic(), self.args().join(", "))
    }
}

/// One line of a section body: an instruction or an interleaved control-flow
/// label. Both carry an end-of-line comment, possibly empty.
#[derive(Clone, Debug, PartialEq)]
pub enum Item {
    Inst(Instruction, String),
    Label(String, String),
}

impl Item {
    fn text(&self) -> String {
        match self {
            Item::Inst(inst, _) => inst.to_string(),
            Item::Label(label, _) => format!("{label}: "),
        }
    }

    fn comment(&self) -> &str {
        match self {
            Item::Inst(_, comment) | Item::Label(_, comment) => comment,
        }
    }
}

/// The code emitted for one procedure, addressable by its entry label.
pub struct Section {
    pub label: String,
    pub items: Vec<Item>,
}

/// All sections of one class, under a banner comment.
pub struct Group {
    pub header: String,
    pub sections: Vec<Section>,
}

pub struct AbstractProgram {
    /// Number of cells in the static data area.
    pub static_data: u32,
    pub groups: Vec<Group>,
}

impl fmt::Display for AbstractProgram {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, ".static_data {}", self.static_data)?;
        writeln!(f)?;
        for group in &self.groups {
            writeln!(f, "{}", group.header)?;
            for section in &group.sections {
                writeln!(f, "{}:", section.label)?;
                for item in &section.items {
                    let text = item.text();
                    let pad = COMMENT_COLUMN.saturating_sub(text.chars().count());
                    writeln!(f, "{text}{:pad$}#{}", "", item.comment(), pad = pad)?;
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use indoc::indoc;

    #[test]
    fn instructions_format_with_comma_separated_args() {
        let inst = Instruction::IAdd(Reg::Tmp(0), Reg::Arg(1), Reg::Tmp(2));
        assert_eq!(inst.to_string(), "iadd t0, a1, t2");
        assert_eq!(Instruction::Ret.to_string(), "ret ");
        assert_eq!(
            Instruction::HStore(Reg::Sap, Reg::Tmp(0), Reg::Tmp(1)).to_string(),
            "hstore sap, t0, t1"
        );
    }

    #[test]
    fn program_serialization_pads_comments_to_a_fixed_column() {
        let program = AbstractProgram {
            static_data: 2,
            groups: vec![Group {
                header: "#====== Code for class A".into(),
                sections: vec![Section {
                    label: "M_main_2".into(),
                    items: vec![
                        Item::Inst(
                            Instruction::MoveImmedI(Reg::Tmp(0), 1),
                            "Constant(Integer-constant(1))".into(),
                        ),
                        Item::Label("if_1_then".into(), "then part of if statement".into()),
                        Item::Inst(Instruction::Ret, "return from method".into()),
                    ],
                }],
            }],
        };

        let expected = indoc! {"
            .static_data 2

            #====== Code for class A
            M_main_2:
            move_immed_i t0, 1                                #Constant(Integer-constant(1))
            if_1_then:                                        #then part of if statement
            ret                                               #return from method
        "};
        assert_eq!(program.to_string(), expected);
    }
}
