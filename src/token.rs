use std::{fmt, ops::Range};

#[derive(Copy, Clone)]
#[cfg_attr(test, derive(PartialEq, Eq))]
pub struct Token {
    pub kind: TokenKind,
    lo: usize,
    len: u32,
}

impl Token {
    pub fn new(kind: TokenKind, span: Span) -> Token {
        Token {
            kind,
            len: span.len,
            lo: span.lo,
        }
    }

    /// Returns an EOF token positioned at the end of the provided source.
    pub fn eof_for(src: &str) -> Token {
        Token::new(TokenKind::Eof, Span::new_of_length(src.len(), 0))
    }

    pub fn span(&self) -> Span {
        Span {
            len: self.len,
            lo: self.lo,
        }
    }

    pub fn is_eof(&self) -> bool {
        self.kind == TokenKind::Eof
    }
}

impl fmt::Debug for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Token({:?}, {})", self.kind, self.span())
    }
}

#[derive(Copy, Clone, PartialEq, Eq)]
pub struct Span {
    pub len: u32,
    pub lo: usize,
}

impl Span {
    pub fn new_of_bounds(Range { start: lo, end: hi }: Range<usize>) -> Span {
        debug_assert!(hi >= lo);
        Self::new_of_length(lo, u32::try_from(hi - lo).unwrap())
    }

    pub fn new_of_length(lo: usize, len: u32) -> Span {
        Span { len, lo }
    }

    pub fn hi(self) -> usize {
        self.lo + self.len as usize
    }

    /// Returns the smallest span covering both `self` and `other`.
    pub fn to(self, other: Span) -> Span {
        let lo = self.lo.min(other.lo);
        let hi = self.hi().max(other.hi());
        Span::new_of_bounds(lo..hi)
    }

    /// Shrinks or grows the span bounds by the given deltas.
    pub fn offset(self, lo_delta: i64, hi_delta: i64) -> Span {
        let lo = usize::try_from(self.lo as i64 + lo_delta).unwrap();
        let hi = usize::try_from(self.hi() as i64 + hi_delta).unwrap();
        Span::new_of_bounds(lo..hi)
    }

    pub fn substr(self, src: &str) -> &str {
        &src[self.lo..self.hi()]
    }

    pub fn wrap<T>(self, inner: T) -> Spanned<T> {
        Spanned::new(self, inner)
    }
}

impl fmt::Debug for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Span({self}, len: {})", self.len)
    }
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let lo = self.lo;
        let hi = self.hi();
        write!(f, "{lo}..{hi}")
    }
}

/// A value paired with the source span it originated from. Used to carry
/// diagnostics through the pipeline.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Spanned<T> {
    pub span: Span,
    pub inner: T,
}

impl<T> Spanned<T> {
    pub fn new(span: Span, inner: T) -> Spanned<T> {
        Spanned { span, inner }
    }
}

impl<T: fmt::Display> fmt::Display for Spanned<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if f.alternate() {
            write!(f, "{}: ", self.span)?;
        }
        write!(f, "{}", self.inner)
    }
}

// This is not the most efficient way of representing a token kind, but it
// suffices for this simple compiler implementation.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum TokenKind {
    Boolean,
    Break,
    Continue,
    Class,
    Else,
    Extends,
    False,
    Float,
    For,
    If,
    Int,
    New,
    Null,
    Private,
    Public,
    Return,
    Static,
    Super,
    This,
    True,
    Void,
    While,

    LBrace,
    RBrace,
    LParen,
    RParen,
    Comma,
    Semicolon,
    /// `=`
    Assign,
    /// `==`
    Eq,
    /// `!=`
    NotEq,
    Dot,
    Less,
    LessEq,
    Greater,
    GreaterEq,
    Plus,
    PlusPlus,
    Minus,
    MinusMinus,
    Star,
    Slash,
    /// `!`
    Not,
    AndAnd,
    OrOr,

    Identifier,
    Number,
    FloatNumber,
    String,

    Whitespace,
    InlineComment,
    MultilineComment,

    Eof,

    ErrorUnexpectedChar,
    ErrorUnclosedComment,
    ErrorUnclosedString,
}

impl TokenKind {
    /// Trivia tokens are emitted by the lexer but carry no syntactic meaning.
    pub fn is_trivia(self) -> bool {
        use TokenKind::*;
        matches!(self, Whitespace | InlineComment | MultilineComment)
    }

    pub fn is_error(self) -> bool {
        use TokenKind::*;
        matches!(
            self,
            ErrorUnexpectedChar | ErrorUnclosedComment | ErrorUnclosedString
        )
    }
}

pub static KEYWORDS: phf::Map<&'static str, TokenKind> = phf::phf_map! {
    "boolean" => TokenKind::Boolean,
    "break" => TokenKind::Break,
    "continue" => TokenKind::Continue,
    "class" => TokenKind::Class,
    "else" => TokenKind::Else,
    "extends" => TokenKind::Extends,
    "false" => TokenKind::False,
    "float" => TokenKind::Float,
    "for" => TokenKind::For,
    "if" => TokenKind::If,
    "int" => TokenKind::Int,
    "new" => TokenKind::New,
    "null" => TokenKind::Null,
    "private" => TokenKind::Private,
    "public" => TokenKind::Public,
    "return" => TokenKind::Return,
    "static" => TokenKind::Static,
    "super" => TokenKind::Super,
    "this" => TokenKind::This,
    "true" => TokenKind::True,
    "void" => TokenKind::Void,
    "while" => TokenKind::While,
};
