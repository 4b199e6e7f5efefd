use std::fmt;

use crate::{parser, token::Span, token::TokenKind, type_checker};

impl fmt::Display for parser::Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use parser::Error::*;
        match self {
            InvalidAssignmentTarget => write!(f, "invalid assignment target"),
            InvalidAutoTarget => write!(f, "invalid auto increment/decrement target"),
            InvalidCallTarget => write!(f, "call target must name a method through a receiver"),
            InvalidStatementExpr => write!(f, "expected an assignment, auto operation, or call"),
            UnexpectedTokenInExpr { token } => {
                write!(f, "unexpected token {token:?} in expression")
            }
            Unexpected { actual, expected } => {
                write!(f, "expected token {expected:?}, but got {actual:?}")
            }
            UnexpectedAny { actual, expected } => {
                write!(f, "expected one of {expected:?}, but got {actual:?}")
            }
            ParseInt => write!(f, "parse int error, out of bounds"),
            ParseFloat => write!(f, "parse float error"),
            Lexer(TokenKind::ErrorUnexpectedChar) => write!(f, "unexpected character"),
            Lexer(TokenKind::ErrorUnclosedComment) => write!(f, "unclosed comment"),
            Lexer(TokenKind::ErrorUnclosedString) => write!(f, "unclosed string"),
            Lexer(_) => unreachable!("not error token"),
            Name(error) => write!(f, "{error}"),
        }
    }
}

impl fmt::Display for type_checker::Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use type_checker::Error::*;
        match self {
            RepeatedClass(name) => write!(f, "Repeated class name {name:?}"),
            UndefinedSuperclass { class, superclass } => {
                write!(f, "class {class} extends undefined class {superclass}")
            }
            UnresolvedName(name) => write!(f, "unresolved name {name}"),
            NotAClassName(name) => write!(f, "{name} is not a class name"),
            NonClassReceiver => write!(f, "receiver is not a class instance"),
            FieldNotFound { field, class } => {
                write!(f, "field {field} not found in class {class}")
            }
            MethodNotFound(method) => write!(f, "method {method} does not exist"),
            WrongArgCount => write!(f, "not correct number of args"),
            AssignMismatch => write!(f, "RHS of = operator must be a subtye of LHS"),
            ArithNotNumber => write!(f, "Arithmetic operations must happen on number"),
            CompareNotNumber => write!(f, "Arithmetic comparisons must happen on number"),
            LogicalNotBoolean => write!(f, "Logical comparisons must happen on boolean"),
            NegateNonNumber => write!(f, "unary - operand must be a number"),
            NotNonBoolean => write!(f, "unary ! operand must be boolean"),
            AutoNonNumber => write!(f, "auto increment/decrement operand must be a number"),
            PrivateConstructor(class) => {
                write!(f, "constructor of class {class} is private")
            }
            IfCondNotBoolean(ty) => {
                write!(
                    f,
                    "If statement condition must be boolean. Got type {ty} instead"
                )
            }
            WhileCondNotBoolean => write!(f, "while loop condition is not boolean"),
            ForCondNotBoolean => write!(f, "for loop condition not boolean"),
            MisplacedSuper => write!(f, "super cannot be used here"),
            BreakOutsideLoop => write!(f, "break outside of a loop"),
            ContinueOutsideLoop => write!(f, "continue outside of a loop"),
        }
    }
}

/// Renders the source line a span starts on, with a caret marking the
/// offending column. Lines and columns are one-based.
pub fn excerpt(src: &str, span: Span) -> String {
    let lo = span.lo.min(src.len());
    let line_start = src[..lo].rfind('\n').map_or(0, |i| i + 1);
    let line_end = src[lo..].find('\n').map_or(src.len(), |i| lo + i);
    let line_number = src[..line_start].matches('\n').count() + 1;
    let col = lo - line_start;

    let prefix = format!("{line_number} | ");
    let mut out = format!("{prefix}{}\n", &src[line_start..line_end]);
    out.extend(std::iter::repeat(' ').take(prefix.len() + col));
    out.push('^');
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::token::Span;

    #[test]
    fn excerpt_points_at_the_column() {
        let src = "class A {\n  int 5;\n}";
        // The `5` token.
        let span = Span::new_of_bounds(16..17);
        let expected = "2 |   int 5;\n          ^";
        assert_eq!(excerpt(src, span), expected);
    }

    #[test]
    fn excerpt_on_the_first_line() {
        let src = "class 5 { }";
        let span = Span::new_of_bounds(6..7);
        assert_eq!(excerpt(src, span), "1 | class 5 { }\n          ^");
    }
}
