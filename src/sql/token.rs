//! Token types for the SQL lexer

use std::fmt;

use phf::phf_map;

static KEYWORDS: phf::Map<&'static str, TokenKind> = phf_map! {
    "select" => TokenKind::Select,
    "from" => TokenKind::From,
    "where" => TokenKind::Where,
    "insert" => TokenKind::Insert,
    "into" => TokenKind::Into,
    "values" => TokenKind::Values,
    "update" => TokenKind::Update,
    "set" => TokenKind::Set,
    "delete" => TokenKind::Delete,
    "and" => TokenKind::And,
    "or" => TokenKind::Or,
    "true" => TokenKind::True,
    "false" => TokenKind::False,
    "join" => TokenKind::Join,
    "inner" => TokenKind::Inner,
    "left" => TokenKind::Left,
    "right" => TokenKind::Right,
    "full" => TokenKind::Full,
    "outer" => TokenKind::Outer,
    "on" => TokenKind::On,
    "date" => TokenKind::Date,
    "time" => TokenKind::Time,
    "email" => TokenKind::Email,
    "create" => TokenKind::Create,
    "drop" => TokenKind::Drop,
    "alter" => TokenKind::Alter,
    "use" => TokenKind::Use,
    "database" => TokenKind::Database,
    "rename" => TokenKind::Rename,
    "to" => TokenKind::To,
};

#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    // Keywords
    Select,
    From,
    Where,
    Insert,
    Into,
    Values,
    Update,
    Set,
    Delete,
    And,
    Or,
    True,
    False,
    Join,
    Inner,
    Left,
    Right,
    Full,
    Outer,
    On,
    Date,
    Time,
    Email,
    Create,
    Drop,
    Alter,
    Use,
    Database,
    Rename,
    To,

    // Literals
    Ident(String),
    Integer(i64),
    Decimal(f64),
    Str(String),

    // Operators and punctuation
    Star,      // *
    Comma,     // ,
    LParen,    // (
    RParen,    // )
    Eq,        // =
    Ne,        // != or <>
    Lt,        // <
    Gt,        // >
    Le,        // <=
    Ge,        // >=
    Dot,       // .
    Semicolon, // ;
    Minus,     // - (sign of a numeric literal)

    // End of input
    End,
}

impl TokenKind {
    /// Case-insensitive keyword lookup through the perfect hash map.
    pub fn from_keyword(s: &str) -> Option<Self> {
        KEYWORDS.get(s.to_lowercase().as_str()).cloned()
    }

    /// True for keywords that may also serve as column identifiers.
    pub fn is_soft_keyword(&self) -> bool {
        matches!(self, TokenKind::Date | TokenKind::Time | TokenKind::Email)
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenKind::Ident(s) => f.write_str(s),
            TokenKind::Integer(i) => write!(f, "{}", i),
            TokenKind::Decimal(d) => write!(f, "{}", d),
            TokenKind::Str(s) => write!(f, "'{}'", s),
            TokenKind::Star => f.write_str("*"),
            TokenKind::Comma => f.write_str(","),
            TokenKind::LParen => f.write_str("("),
            TokenKind::RParen => f.write_str(")"),
            TokenKind::Eq => f.write_str("="),
            TokenKind::Ne => f.write_str("!="),
            TokenKind::Lt => f.write_str("<"),
            TokenKind::Gt => f.write_str(">"),
            TokenKind::Le => f.write_str("<="),
            TokenKind::Ge => f.write_str(">="),
            TokenKind::Dot => f.write_str("."),
            TokenKind::Semicolon => f.write_str(";"),
            TokenKind::Minus => f.write_str("-"),
            TokenKind::End => f.write_str("<end>"),
            keyword => write!(f, "{}", format!("{:?}", keyword).to_uppercase()),
        }
    }
}

/// A token with the 1-based position of its first character.
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub line: usize,
    pub column: usize,
}

impl Token {
    pub fn new(kind: TokenKind, line: usize, column: usize) -> Self {
        Self { kind, line, column }
    }
}
