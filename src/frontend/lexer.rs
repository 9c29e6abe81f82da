use super::token::{Span, SpannedToken, Token};

/// Byte-cursor scanner with one character of lookahead.
///
/// Newlines are significant: a `\n` becomes a `Semicolon` token unless the
/// previously emitted token already terminates a statement (or opens a brace
/// or list), so most statements need no written semicolons.
pub struct Lexer<'src> {
    source: &'src [u8],
    position: usize,
    read_position: usize,
    ch: u8,
    line: usize,
    column: usize,
    previous: Option<Token>,
}

impl<'src> Lexer<'src> {
    pub fn new(source: &'src str) -> Self {
        let mut lexer = Lexer {
            source: source.as_bytes(),
            position: 0,
            read_position: 0,
            ch: 0,
            line: 1,
            column: 0,
            previous: None,
        };
        lexer.read_char();
        lexer
    }

    /// Returns the next token.
    pub fn next_token(&mut self) -> SpannedToken {
        loop {
            self.skip_blank();

            let span = Span {
                line: self.line,
                column: self.column,
            };

            if let Some(token) = self.scan() {
                self.previous = Some(token.clone());
                return SpannedToken { token, span };
            }
        }
    }

    fn scan(&mut self) -> Option<Token> {
        let token = match self.ch {
            0 => Token::EndOfFile,

            b'\n' => {
                self.read_char();
                if self.needs_terminator() {
                    Token::Semicolon
                } else {
                    return None;
                }
            }

            // Single-character tokens.
            b'(' => self.single(Token::LeftParen),
            b')' => self.single(Token::RightParen),
            b'{' => self.single(Token::LeftBrace),
            b'}' => self.single(Token::RightBrace),
            b'[' => self.single(Token::LeftBracket),
            b']' => self.single(Token::RightBracket),
            b',' => self.single(Token::Comma),
            b';' => self.single(Token::Semicolon),
            b'?' => self.single(Token::Question),

            // One or two character tokens.
            b'=' => self.one_or_two(b'=', Token::DoubleEq, Token::Assign),
            b'!' => self.one_or_two(b'=', Token::BangEq, Token::Bang),
            b'<' => self.one_or_two(b'=', Token::LeftAngleEq, Token::LeftAngle),
            b'>' => self.one_or_two(b'=', Token::RightAngleEq, Token::RightAngle),
            b'*' => self.one_or_two(b'=', Token::AsteriskEq, Token::Asterisk),
            b':' => self.one_or_two(b':', Token::DoubleColon, Token::Colon),

            b'+' => match self.peek_char() {
                b'=' => self.double(Token::PlusEq),
                b'+' => self.double(Token::PlusPlus),
                _ => self.single(Token::Plus),
            },
            b'-' => match self.peek_char() {
                b'=' => self.double(Token::MinusEq),
                b'-' => self.double(Token::MinusMinus),
                b'>' => self.double(Token::Arrow),
                _ => self.single(Token::Minus),
            },

            // Slash starts comments, compound assignment or division.
            b'/' => match self.peek_char() {
                b'/' => {
                    self.consume_line_comment();
                    return None;
                }
                b'*' => {
                    self.consume_block_comment();
                    return None;
                }
                b'=' => self.double(Token::SlashEq),
                _ => self.single(Token::Slash),
            },

            b'&' => match self.peek_char() {
                b'&' => self.double(Token::AndAnd),
                _ => self.single(Token::LexerError("Unexpected character `&`".to_owned())),
            },
            b'|' => match self.peek_char() {
                b'|' => self.double(Token::OrOr),
                _ => self.single(Token::LexerError("Unexpected character `|`".to_owned())),
            },

            b'"' => self.lex_string(),

            _ if self.ch.is_ascii_digit() => self.lex_number(),
            _ if is_name_char(self.ch) => self.lex_identifier_or_kw(),

            ch => self.single(Token::LexerError(format!(
                "Unrecognized character `{}`",
                ch as char
            ))),
        };

        Some(token)
    }

    /// Whether an encountered newline should produce a statement terminator.
    fn needs_terminator(&self) -> bool {
        !matches!(
            self.previous,
            None | Some(Token::Semicolon) | Some(Token::LeftBrace) | Some(Token::Comma)
        )
    }

    fn read_char(&mut self) {
        if self.ch == b'\n' {
            self.line += 1;
            self.column = 0;
        }
        self.ch = match self.source.get(self.read_position) {
            Some(ch) => *ch,
            None => 0,
        };
        self.position = self.read_position;
        self.read_position += 1;
        self.column += 1;
    }

    fn peek_char(&self) -> u8 {
        match self.source.get(self.read_position) {
            Some(ch) => *ch,
            None => 0,
        }
    }

    fn single(&mut self, token: Token) -> Token {
        self.read_char();
        token
    }

    fn double(&mut self, token: Token) -> Token {
        self.read_char();
        self.read_char();
        token
    }

    /// Consumes the second char and returns t2 if the next char matches,
    /// otherwise returns t1.
    fn one_or_two(&mut self, next: u8, t2: Token, t1: Token) -> Token {
        if self.peek_char() == next {
            self.double(t2)
        } else {
            self.single(t1)
        }
    }

    /// Skips horizontal whitespace. Newlines stay, they may terminate.
    fn skip_blank(&mut self) {
        while matches!(self.ch, b' ' | b'\t' | b'\r') {
            self.read_char();
        }
    }

    /// Consumes `//` up to the newline. The newline itself is left in place
    /// so it can still terminate the preceding statement.
    fn consume_line_comment(&mut self) {
        while self.ch != b'\n' && self.ch != 0 {
            self.read_char();
        }
    }

    fn consume_block_comment(&mut self) {
        // Move past `/*`.
        self.read_char();
        self.read_char();
        while self.ch != 0 {
            if self.ch == b'*' && self.peek_char() == b'/' {
                self.read_char();
                self.read_char();
                return;
            }
            self.read_char();
        }
    }

    /// Scans up to the closing `"`. No escape sequences.
    fn lex_string(&mut self) -> Token {
        // Move past opening quote.
        self.read_char();
        let start = self.position;

        while self.ch != b'"' && self.ch != 0 {
            self.read_char();
        }

        if self.ch == 0 {
            return Token::LexerError("No terminal \" in string.".to_owned());
        }

        let text = self.take_text(start);
        // Move past closing quote.
        self.read_char();
        Token::Str(text)
    }

    /// Scans a run of digits and dots. A dot makes it a float candidate;
    /// the parser rejects malformed runs like `1.2.3`.
    fn lex_number(&mut self) -> Token {
        let start = self.position;
        while self.ch.is_ascii_digit() || self.ch == b'.' {
            self.read_char();
        }

        let text = self.take_text(start);
        if text.contains('.') {
            Token::Float(text)
        } else {
            Token::Integer(text)
        }
    }

    /// Scans a name. Dots are name characters, so a package-qualified
    /// reference like `math.area` arrives as one identifier.
    fn lex_identifier_or_kw(&mut self) -> Token {
        let start = self.position;
        while is_name_char(self.ch) {
            self.read_char();
        }

        let word = self.take_text(start);
        match Token::keyword(&word) {
            Some(kw) => kw,
            None => Token::Identifier(word),
        }
    }

    fn take_text(&self, start: usize) -> String {
        String::from_utf8_lossy(&self.source[start..self.position]).into_owned()
    }
}

fn is_name_char(ch: u8) -> bool {
    ch.is_ascii_alphabetic() || ch.is_ascii_digit() || ch == b'_' || ch == b'.'
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lex_all(source: &str) -> Vec<Token> {
        let mut lexer = Lexer::new(source);
        let mut tokens = vec![];
        loop {
            let spanned = lexer.next_token();
            if spanned.token == Token::EndOfFile {
                return tokens;
            }
            tokens.push(spanned.token);
        }
    }

    #[test]
    fn test_operators() {
        assert_eq!(
            lex_all("a += 1; b ->c :: d ++"),
            vec![
                Token::Identifier("a".to_owned()),
                Token::PlusEq,
                Token::Integer("1".to_owned()),
                Token::Semicolon,
                Token::Identifier("b".to_owned()),
                Token::Arrow,
                Token::Identifier("c".to_owned()),
                Token::DoubleColon,
                Token::Identifier("d".to_owned()),
                Token::PlusPlus,
            ]
        );
        assert_eq!(
            lex_all("x <= y && z != w || !q"),
            vec![
                Token::Identifier("x".to_owned()),
                Token::LeftAngleEq,
                Token::Identifier("y".to_owned()),
                Token::AndAnd,
                Token::Identifier("z".to_owned()),
                Token::BangEq,
                Token::Identifier("w".to_owned()),
                Token::OrOr,
                Token::Bang,
                Token::Identifier("q".to_owned()),
            ]
        );
    }

    #[test]
    fn test_terminator_insertion() {
        assert_eq!(
            lex_all("let a = 1\nlet b = 2\n"),
            vec![
                Token::Let,
                Token::Identifier("a".to_owned()),
                Token::Assign,
                Token::Integer("1".to_owned()),
                Token::Semicolon,
                Token::Let,
                Token::Identifier("b".to_owned()),
                Token::Assign,
                Token::Integer("2".to_owned()),
                Token::Semicolon,
            ]
        );
    }

    #[test]
    fn test_terminator_suppressed() {
        // No terminator after `{`, `,`, an explicit `;` or at file start.
        assert_eq!(
            lex_all("\n\nfn f() {\nputs(a,\nb)\n"),
            vec![
                Token::Fn,
                Token::Identifier("f".to_owned()),
                Token::LeftParen,
                Token::RightParen,
                Token::LeftBrace,
                Token::Identifier("puts".to_owned()),
                Token::LeftParen,
                Token::Identifier("a".to_owned()),
                Token::Comma,
                Token::Identifier("b".to_owned()),
                Token::RightParen,
                Token::Semicolon,
            ]
        );
        // A blank line after a statement inserts only one terminator.
        assert_eq!(
            lex_all("a\n\n\nb"),
            vec![
                Token::Identifier("a".to_owned()),
                Token::Semicolon,
                Token::Identifier("b".to_owned()),
            ]
        );
    }

    #[test]
    fn test_dotted_identifier() {
        assert_eq!(
            lex_all("math.area(r)"),
            vec![
                Token::Identifier("math.area".to_owned()),
                Token::LeftParen,
                Token::Identifier("r".to_owned()),
                Token::RightParen,
            ]
        );
    }

    #[test]
    fn test_numbers() {
        assert_eq!(
            lex_all("5 3.14 1..2"),
            vec![
                Token::Integer("5".to_owned()),
                Token::Float("3.14".to_owned()),
                Token::Float("1..2".to_owned()),
            ]
        );
    }

    #[test]
    fn test_comments() {
        assert_eq!(
            lex_all("let a = 1 // trailing\nb /* all \n of this */ c"),
            vec![
                Token::Let,
                Token::Identifier("a".to_owned()),
                Token::Assign,
                Token::Integer("1".to_owned()),
                Token::Semicolon,
                Token::Identifier("b".to_owned()),
                Token::Identifier("c".to_owned()),
            ]
        );
    }

    #[test]
    fn test_strings() {
        assert_eq!(
            lex_all("\"hello world\""),
            vec![Token::Str("hello world".to_owned())]
        );
        assert_eq!(
            lex_all("\"open"),
            vec![Token::LexerError("No terminal \" in string.".to_owned())]
        );
    }

    #[test]
    fn test_spans() {
        let mut lexer = Lexer::new("let a\n  b");
        assert_eq!(lexer.next_token().span, Span { line: 1, column: 1 });
        assert_eq!(lexer.next_token().span, Span { line: 1, column: 5 });
        // Terminator inserted for the newline.
        assert_eq!(lexer.next_token().token, Token::Semicolon);
        assert_eq!(lexer.next_token().span, Span { line: 2, column: 3 });
    }
}
