use std::{
    iter::Peekable,
    num::{ParseFloatError, ParseIntError},
};

use crate::token::{Span, Token, TokenKind, KEYWORDS};

pub const SUGGESTED_TOKENS_CAPACITY: usize = 8_192;

/// Lexes the provided string, producing the tokens into the provided buffer.
pub fn lex(src: &str, tokens: &mut Vec<Token>) {
    Lexer::new(src, tokens).lex();
}

/// A convenience function that allocates a new buffer per lexed input and
/// returns it.
pub fn lex_in_new(src: &str) -> Vec<Token> {
    let mut tokens = Vec::with_capacity(SUGGESTED_TOKENS_CAPACITY);
    lex(src, &mut tokens);
    tokens
}

/// The Decaf lexer
struct Lexer<'src, 'tok> {
    src: &'src str,
    iter: Peekable<std::str::Chars<'src>>,
    cursor: usize,
    current_lo: usize,
    tokens: &'tok mut Vec<Token>,
}

impl Lexer<'_, '_> {
    /// Scans the source string until the input is exhausted.
    ///
    /// Tokens are written into the provided tokens buffer.
    fn lex(mut self) {
        assert_eq!(self.tokens.len(), 0, "must pass clean tokens buffer");
        loop {
            let next = self.scan_token_kind();
            let is_eof = matches!(next, TokenKind::Eof);
            self.produce(next);
            if is_eof {
                break;
            }
        }
    }

    /// Tries to scan the current character.
    fn scan_token_kind(&mut self) -> TokenKind {
        use TokenKind::*;
        match self.mark_advance() {
            '\0' => Eof,
            '{' => LBrace,
            '}' => RBrace,
            '(' => LParen,
            ')' => RParen,
            ',' => Comma,
            ';' => Semicolon,
            '.' => Dot,
            '*' => Star,
            '+' => match self.peek() {
                '+' => self.advance_with(PlusPlus),
                _ => Plus,
            },
            '-' => match self.peek() {
                '-' => self.advance_with(MinusMinus),
                _ => Minus,
            },
            '=' => match self.peek() {
                '=' => self.advance_with(Eq),
                _ => Assign,
            },
            '!' => match self.peek() {
                '=' => self.advance_with(NotEq),
                _ => Not,
            },
            '<' => match self.peek() {
                '=' => self.advance_with(LessEq),
                _ => Less,
            },
            '>' => match self.peek() {
                '=' => self.advance_with(GreaterEq),
                _ => Greater,
            },
            // Single `&` and `|` are not operators in this language.
            '&' => match self.peek() {
                '&' => self.advance_with(AndAnd),
                _ => ErrorUnexpectedChar,
            },
            '|' => match self.peek() {
                '|' => self.advance_with(OrOr),
                _ => ErrorUnexpectedChar,
            },
            '/' => match self.peek() {
                '/' => self.inline_comment(),
                '*' => self.multiline_comment(),
                _ => Slash,
            },
            '"' => self.string(),
            c if c.is_ascii_alphabetic() => self.identifier_or_keyword(),
            c if c.is_ascii_digit() => self.number(),
            c if c.is_ascii_whitespace() => self.whitespace(),
            _ => ErrorUnexpectedChar,
        }
    }

    /// Scans a string literal. There is no escape processing; a string runs
    /// to the next quotation mark and may span line breaks.
    fn string(&mut self) -> TokenKind {
        loop {
            match self.advance() {
                '"' => return TokenKind::String,
                // The input has exhausted without a closing quote.
                '\0' => return TokenKind::ErrorUnclosedString,
                _ => continue,
            }
        }
    }

    fn identifier_or_keyword(&mut self) -> TokenKind {
        let valid_identifier_suffix = |c: char| c.is_ascii_alphanumeric() || c == '_';

        while valid_identifier_suffix(self.peek()) {
            self.advance();
        }
        match KEYWORDS.get(self.substr()).copied() {
            Some(keyword) => keyword,
            None => TokenKind::Identifier,
        }
    }

    /// Scans an integer literal, or a float literal when the digits are
    /// followed by a dot and a digit. A float's fraction is exactly one
    /// digit long; `1.23` lexes as the float `1.2` followed by the int `3`.
    fn number(&mut self) -> TokenKind {
        while self.peek().is_ascii_digit() {
            self.advance();
        }
        if self.peek() == '.' && self.peek_second().is_ascii_digit() {
            self.advance(); // the dot
            self.advance(); // the single fractional digit
            return TokenKind::FloatNumber;
        }
        TokenKind::Number
    }

    fn whitespace(&mut self) -> TokenKind {
        while self.peek().is_ascii_whitespace() {
            self.advance();
        }
        TokenKind::Whitespace
    }

    fn inline_comment(&mut self) -> TokenKind {
        assert_eq!(self.advance(), '/');
        while !matches!(self.peek(), '\n' | '\0') {
            self.advance();
        }
        TokenKind::InlineComment
    }

    fn multiline_comment(&mut self) -> TokenKind {
        assert_eq!(self.advance(), '*');
        loop {
            match self.advance() {
                '*' => (), // start closing comment
                '\0' => return TokenKind::ErrorUnclosedComment,
                _ => continue, // keep scanning comment...
            }
            match self.advance() {
                '/' => break, // finished closing comment
                '\0' => return TokenKind::ErrorUnclosedComment,
                _ => continue, // sadly couldn't close it! keep scanning...
            }
        }
        TokenKind::MultilineComment
    }
}

impl Lexer<'_, '_> {
    /// Constructs a new lexer with the default state.
    fn new<'src, 'tok>(src: &'src str, tokens: &'tok mut Vec<Token>) -> Lexer<'src, 'tok> {
        Lexer {
            src,
            iter: src.chars().peekable(),
            cursor: 0,
            current_lo: 0,
            tokens,
        }
    }

    /// Starts a new token "mark" and advances the iterator.
    fn mark_advance(&mut self) -> char {
        self.current_lo = self.cursor;
        self.advance()
    }

    /// Returns the next character and advances the iterator.
    fn advance(&mut self) -> char {
        self.iter
            .next()
            .inspect(|c| self.cursor += c.len_utf8())
            .unwrap_or('\0')
    }

    /// Advances and returns the provided value.
    fn advance_with<T>(&mut self, value: T) -> T {
        self.advance();
        value
    }

    /// Returns the next character without advancing the iterator.
    fn peek(&mut self) -> char {
        self.iter.peek().copied().unwrap_or('\0')
    }

    /// Returns the character after the next one without advancing.
    fn peek_second(&self) -> char {
        let mut iter = self.src[self.cursor..].chars();
        iter.next();
        iter.next().unwrap_or('\0')
    }

    /// Returns the current span.
    fn span(&self) -> Span {
        Span::new_of_bounds(self.current_lo..self.cursor)
    }

    /// Returns the substring of the current marked bounds.
    fn substr(&self) -> &str {
        self.span().substr(self.src)
    }

    /// Produces a token using the marked bounds.
    fn produce(&mut self, kind: TokenKind) {
        self.tokens.push(Token::new(kind, self.span()));
    }
}

pub mod extract {
    use super::*;

    pub fn int(token: Token, src: &str) -> Result<i64, ParseIntError> {
        debug_assert_eq!(token.kind, TokenKind::Number);
        token.span().substr(src).parse()
    }

    pub fn float(token: Token, src: &str) -> Result<f64, ParseFloatError> {
        debug_assert_eq!(token.kind, TokenKind::FloatNumber);
        token.span().substr(src).parse()
    }

    pub fn ident(token: Token, src: &str) -> &str {
        debug_assert_eq!(token.kind, TokenKind::Identifier);
        token.span().substr(src)
    }

    /// Returns the string literal's contents, without the quotes.
    pub fn string(token: Token, src: &str) -> &str {
        debug_assert_eq!(token.kind, TokenKind::String);
        token.span().offset(1, -1).substr(src)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn tests_with_span() {
        use TokenKind::*;
        let cases = cases!(match .. {
            "{}(),;=." => [
                (LBrace, 0..1),
                (RBrace, 1..2),
                (LParen, 2..3),
                (RParen, 3..4),
                (Comma, 4..5),
                (Semicolon, 5..6),
                (Assign, 6..7),
                (Dot, 7..8),
                (Eof, 8..8),
            ],
            "+ ++ - -- = == ! != < <= > >= && ||" => [
                (Plus, 0..1),
                (Whitespace, 1..2),
                (PlusPlus, 2..4),
                (Whitespace, 4..5),
                (Minus, 5..6),
                (Whitespace, 6..7),
                (MinusMinus, 7..9),
                (Whitespace, 9..10),
                (Assign, 10..11),
                (Whitespace, 11..12),
                (Eq, 12..14),
                (Whitespace, 14..15),
                (Not, 15..16),
                (Whitespace, 16..17),
                (NotEq, 17..19),
                (Whitespace, 19..20),
                (Less, 20..21),
                (Whitespace, 21..22),
                (LessEq, 22..24),
                (Whitespace, 24..25),
                (Greater, 25..26),
                (Whitespace, 26..27),
                (GreaterEq, 27..29),
                (Whitespace, 29..30),
                (AndAnd, 30..32),
                (Whitespace, 32..33),
                (OrOr, 33..35),
                (Eof, 35..35),
            ],
            "class Classy if iffy while whiles" => [
                (Class, 0..5),
                (Whitespace, 5..6),
                (Identifier, 6..12),
                (Whitespace, 12..13),
                (If, 13..15),
                (Whitespace, 15..16),
                (Identifier, 16..20),
                (Whitespace, 20..21),
                (While, 21..26),
                (Whitespace, 26..27),
                (Identifier, 27..33),
                (Eof, 33..33),
            ],
            "f fo foo B BA a123z x_1" => [
                (Identifier, 0..1),
                (Whitespace, 1..2),
                (Identifier, 2..4),
                (Whitespace, 4..5),
                (Identifier, 5..8),
                (Whitespace, 8..9),
                (Identifier, 9..10),
                (Whitespace, 10..11),
                (Identifier, 11..13),
                (Whitespace, 13..14),
                (Identifier, 14..19),
                (Whitespace, 19..20),
                (Identifier, 20..23),
                (Eof, 23..23),
            ],
            "1 11 001 123456789" => [
                (Number, 0..1),
                (Whitespace, 1..2),
                (Number, 2..4),
                (Whitespace, 4..5),
                (Number, 5..8),
                (Whitespace, 8..9),
                (Number, 9..18),
                (Eof, 18..18),
            ],
            // A float's fraction is exactly one digit long.
            "1.2 1.23 3.14159 1. .5" => [
                (FloatNumber, 0..3),
                (Whitespace, 3..4),
                (FloatNumber, 4..7),
                (Number, 7..8),
                (Whitespace, 8..9),
                (FloatNumber, 9..12),
                (Number, 12..16),
                (Whitespace, 16..17),
                (Number, 17..18),
                (Dot, 18..19),
                (Whitespace, 19..20),
                (Dot, 20..21),
                (Number, 21..22),
                (Eof, 22..22),
            ],
            "\"\" \"oi como vai\" \"multi\nline\" \"oi" => [
                (String, 0..2),
                (Whitespace, 2..3),
                (String, 3..16),
                (Whitespace, 16..17),
                (String, 17..29),
                (Whitespace, 29..30),
                (ErrorUnclosedString, 30..33),
                (Eof, 33..33),
            ],
            "hello /* world!\n this */ 1 /**/ 2 // is a\n\"comment!\"" => [
                (Identifier, 0..5),
                (Whitespace, 5..6),
                (MultilineComment, 6..24),
                (Whitespace, 24..25),
                (Number, 25..26),
                (Whitespace, 26..27),
                (MultilineComment, 27..31),
                (Whitespace, 31..32),
                (Number, 32..33),
                (Whitespace, 33..34),
                (InlineComment, 34..41),
                (Whitespace, 41..42),
                (String, 42..52),
                (Eof, 52..52),
            ],
            "// line comment without line break" => [(InlineComment, 0..34), (Eof, 34..34),],
            "/* unclosed" => [
                //
                (ErrorUnclosedComment, 0..11),
                (Eof, 11..11),
            ],
            "a & b | c" => [
                (Identifier, 0..1),
                (Whitespace, 1..2),
                (ErrorUnexpectedChar, 2..3),
                (Whitespace, 3..4),
                (Identifier, 4..5),
                (Whitespace, 5..6),
                (ErrorUnexpectedChar, 6..7),
                (Whitespace, 7..8),
                (Identifier, 8..9),
                (Eof, 9..9),
            ],
            "x=y++;" => [
                (Identifier, 0..1),
                (Assign, 1..2),
                (Identifier, 2..3),
                (PlusPlus, 3..5),
                (Semicolon, 5..6),
                (Eof, 6..6),
            ],
        });

        for (input, tokens) in cases {
            let lexed = lex_in_new(input);
            assert_eq!(lexed, tokens.as_slice());
        }
    }

    #[test]
    fn extracts_literals() {
        let src = "12 3.4 name \"text\"";
        let tokens = lex_in_new(src);
        assert_eq!(extract::int(tokens[0], src), Ok(12));
        assert_eq!(extract::float(tokens[2], src), Ok(3.4));
        assert_eq!(extract::ident(tokens[4], src), "name");
        assert_eq!(extract::string(tokens[6], src), "text");
    }

    macro_rules! cases {
        (match .. {
            $($str:expr => [$(($kind:expr, $range:expr)),* $(,)?]),* $(,)?
        }) => {{
            &[$((
                $str,
                vec![
                    $(Token::new($kind, Span::new_of_bounds($range.start..$range.end))),*
                ],
            )),*]
        }};
    }
    use cases;
}
