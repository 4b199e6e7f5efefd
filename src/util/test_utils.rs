use crate::{parser, token::Spanned, type_checker, util::fmt::tree};

pub fn format_errors<E: std::fmt::Display>(e: &[Spanned<E>]) -> Vec<String> {
    e.iter().map(|e| format!("{e:#}")).collect()
}

/// Each variant contains the input.
pub enum Test {
    ParserProgram(&'static str),
    ParserExpr(&'static str),
    CheckerProgram(&'static str),
    CheckerExpr(&'static str),
}

pub enum Assertion {
    TreeOk(&'static str),
    TreeError(&'static str),
    ExpectedErrors(&'static [&'static str]),
}

/// Runs the given input through the front end, up to the stage the test
/// names, and returns the printed tree alongside the formatted errors. A
/// failed parse yields an empty tree, since parsing halts at the first
/// syntax error.
#[track_caller]
pub fn run_pipeline(test: Test) -> (String, Vec<String>) {
    let tokens_buf = &mut Vec::with_capacity(1024);

    match test {
        Test::ParserProgram(input) => match parser::parse_program(input, tokens_buf) {
            Ok(prog) => (tree::print_user_classes_string(&prog), vec![]),
            Err(errors) => (String::new(), format_errors(&errors)),
        },
        Test::ParserExpr(input) => match parser::parse_expr(input, tokens_buf) {
            Ok((arena, expr)) => (tree::print_expr_string(&arena, expr), vec![]),
            Err(errors) => (String::new(), format_errors(&errors)),
        },
        Test::CheckerProgram(input) => {
            let mut prog = match parser::parse_program(input, tokens_buf) {
                Ok(prog) => prog,
                Err(errors) => return (String::new(), format_errors(&errors)),
            };
            let errors = match type_checker::check(&mut prog) {
                Ok(_registry) => vec![],
                Err(errors) => format_errors(&errors),
            };
            (tree::print_user_classes_string(&prog), errors)
        }
        Test::CheckerExpr(input) => {
            let (mut arena, expr) = match parser::parse_expr(input, tokens_buf) {
                Ok(parsed) => parsed,
                Err(errors) => return (String::new(), format_errors(&errors)),
            };
            let errors = match type_checker::check_expr(&mut arena, expr) {
                Ok(()) => vec![],
                Err(errors) => format_errors(&errors),
            };
            (tree::print_expr_string(&arena, expr), errors)
        }
    }
}

#[track_caller]
pub fn run_assertion(
    assertion: Assertion,
    formatted_actual_tree: &str,
    formatted_actual_errors: &[String],
) {
    match assertion {
        Assertion::TreeOk(expected_tree) => {
            let expected_errors: &[&str] = &[];
            ::pretty_assertions::assert_eq!(formatted_actual_errors, expected_errors);
            ::pretty_assertions::assert_eq!(formatted_actual_tree.trim(), expected_tree.trim());
        }
        Assertion::TreeError(expected_tree) => {
            ::pretty_assertions::assert_eq!(formatted_actual_tree.trim(), expected_tree.trim())
        }
        Assertion::ExpectedErrors(expected_errors) => {
            ::pretty_assertions::assert_eq!(formatted_actual_errors, expected_errors)
        }
    }
}

macro_rules! tree_tests {
    (
        use $test_kind:ident;

        $(
            fn $test_name:ident() {
                let $source_kind:ident = $source:expr;
                $($assertions_tt:tt)*
            }
        )*
    ) => {
        $(
            #[test]
            fn $test_name() {
                let test: crate::util::test_utils::Test =
                    tree_tests!(@@get_test($test_kind, $source_kind), $source);
                let (formatted_actual_tree, formatted_actual_errors) =
                    crate::util::test_utils::run_pipeline(test);
                let ctx = (&formatted_actual_tree, &formatted_actual_errors);
                tree_tests!(@@expand_assertions, ctx, [$($assertions_tt)*]);
            }
        )*
    };

    (@@expand_assertions, $ctx:expr, []) => {};
    (@@expand_assertions, $ctx:expr, [
        let $assertion:ident = $assertion_expected:expr;
        $($rest_assertions_tt:tt)*
    ]) => {
        crate::util::test_utils::run_assertion(
            tree_tests!(@@assertion, $assertion, $assertion_expected),
            $ctx.0,
            $ctx.1,
        );
        tree_tests!(@@expand_assertions, $ctx, [$($rest_assertions_tt)*]);
    };

    (@@assertion, tree_ok, $expected:expr) => {
        crate::util::test_utils::Assertion::TreeOk(::indoc::indoc! { $expected })
    };
    (@@assertion, tree_error, $expected:expr) => {
        crate::util::test_utils::Assertion::TreeError(::indoc::indoc! { $expected })
    };
    (@@assertion, expected_errors, $expected:expr) => {
        crate::util::test_utils::Assertion::ExpectedErrors($expected)
    };

    (@@get_test(parser, program), $source:expr) => {
        crate::util::test_utils::Test::ParserProgram($source)
    };
    (@@get_test(parser, expr), $source:expr) => {
        crate::util::test_utils::Test::ParserExpr($source)
    };
    (@@get_test(checker, program), $source:expr) => {
        crate::util::test_utils::Test::CheckerProgram($source)
    };
    (@@get_test(checker, expr), $source:expr) => {
        crate::util::test_utils::Test::CheckerExpr($source)
    };
}
pub(crate) use tree_tests;
