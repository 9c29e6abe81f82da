#[derive(Debug, PartialEq, Clone)]
pub enum Token {
    // Single-character tokens.
    LeftParen,
    RightParen,
    LeftBrace,
    RightBrace,
    LeftBracket,
    RightBracket,
    Comma,
    Semicolon,
    Colon,
    Question,
    Plus,
    Minus,
    Asterisk,
    Slash,
    Bang,

    // One or two character tokens.
    Assign,
    DoubleEq,
    BangEq,
    LeftAngle,
    LeftAngleEq,
    RightAngle,
    RightAngleEq,
    PlusEq,
    MinusEq,
    AsteriskEq,
    SlashEq,
    PlusPlus,
    MinusMinus,
    AndAnd,
    OrOr,
    Arrow,
    DoubleColon,

    // Literals. Numbers stay as source text until the parser classifies them.
    Identifier(String),
    Integer(String),
    Float(String),
    Str(String),

    // Keywords.
    Fn,
    Let,
    True,
    False,
    If,
    Else,
    Return,
    Import,
    While,
    For,
    Break,
    Package,
    Class,
    New,
    Extends,
    Implement,
    Interface,
    Defer,

    LexerError(String),
    EndOfFile,
}

impl Token {
    /// Maps a scanned word to its keyword token, if it is one.
    pub fn keyword(word: &str) -> Option<Token> {
        let token = match word {
            "fn" => Token::Fn,
            "let" => Token::Let,
            "true" => Token::True,
            "false" => Token::False,
            "if" => Token::If,
            "else" => Token::Else,
            "return" => Token::Return,
            "import" => Token::Import,
            "while" => Token::While,
            "for" => Token::For,
            "break" => Token::Break,
            "package" => Token::Package,
            "class" => Token::Class,
            "new" => Token::New,
            "extends" => Token::Extends,
            "implement" => Token::Implement,
            "interface" => Token::Interface,
            "defer" => Token::Defer,
            _ => return None,
        };
        Some(token)
    }
}

/// Line/column of a token's first character, 1-indexed.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Default)]
pub struct Span {
    pub line: usize,
    pub column: usize,
}

#[derive(Debug, PartialEq, Clone)]
pub struct SpannedToken {
    pub token: Token,
    pub span: Span,
}
