use super::ast::{
    Block, ClassLit, Expr, FunctionLit, Identifier, InterfaceLit, MethodSig, Param, Program, Stmt,
};
use super::errors::{ParseError, ParseResult};
use super::lexer::Lexer;
use super::operator::{token_precedence, InfixOperator, Precedence, PrefixOperator};
use super::token::{SpannedToken, Token};

use std::path::{Path, PathBuf};
use std::rc::Rc;

/// Where imported source files come from. The default reads the file
/// system; tests substitute an in-memory map.
pub trait SourceReader {
    fn read_source(&self, path: &Path) -> Result<String, String>;
}

pub struct FsReader;

impl SourceReader for FsReader {
    fn read_source(&self, path: &Path) -> Result<String, String> {
        std::fs::read_to_string(path).map_err(|e| e.to_string())
    }
}

/// Precedence-climbing parser over a two-token window.
///
/// Parsing is best effort: statement-level failures are recorded and the
/// parser resynchronizes at the next terminator, so one bad statement does
/// not hide the rest of the file.
pub struct Parser<'src> {
    lexer: Lexer<'src>,
    current: SpannedToken,
    peek: SpannedToken,
    errors: Vec<ParseError>,
    package: Option<String>,
    file: String,
    source_root: Option<PathBuf>,
    reader: Rc<dyn SourceReader>,
}

impl<'src> Parser<'src> {
    pub fn new(source: &'src str, file: &str) -> Self {
        let mut lexer = Lexer::new(source);
        let current = lexer.next_token();
        let peek = lexer.next_token();

        Parser {
            lexer,
            current,
            peek,
            errors: vec![],
            package: None,
            file: file.to_owned(),
            source_root: None,
            reader: Rc::new(FsReader),
        }
    }

    /// Sets the directory relative import paths resolve against.
    pub fn with_source_root(mut self, root: PathBuf) -> Self {
        self.source_root = Some(root);
        self
    }

    pub fn with_reader(mut self, reader: Rc<dyn SourceReader>) -> Self {
        self.reader = reader;
        self
    }

    /// Parses the whole file, splicing imports flat into the program.
    pub fn parse(mut self) -> Result<Program, Vec<ParseError>> {
        let mut stmts = vec![];

        while !self.current_is(&Token::EndOfFile) {
            match &self.current.token {
                Token::Semicolon => {}
                Token::Package => {
                    if let Err(e) = self.parse_package(stmts.is_empty()) {
                        self.emit_error(e);
                        self.synchronize();
                    }
                }
                Token::Import => match self.parse_import() {
                    Ok(mut imported) => stmts.append(&mut imported),
                    Err(e) => {
                        self.emit_error(e);
                        self.synchronize();
                    }
                },
                _ => match self.parse_statement() {
                    Ok(stmt) => stmts.push(stmt),
                    Err(e) => {
                        self.emit_error(e);
                        self.synchronize();
                    }
                },
            }
            self.bump();
        }

        if self.errors.is_empty() {
            Ok(Program { stmts })
        } else {
            Err(self.errors)
        }
    }

    fn bump(&mut self) {
        std::mem::swap(&mut self.current, &mut self.peek);
        self.peek = self.lexer.next_token();
    }

    fn current_is(&self, t: &Token) -> bool {
        self.current.token == *t
    }

    fn peek_is(&self, t: &Token) -> bool {
        self.peek.token == *t
    }

    fn expect_peek(&mut self, t: Token) -> ParseResult<()> {
        if self.peek.token == t {
            self.bump();
            Ok(())
        } else {
            Err(ParseError::ExpectedToken(
                t,
                self.peek.span,
                self.peek.token.clone(),
            ))
        }
    }

    fn emit_error(&mut self, error: ParseError) {
        self.errors.push(error);
    }

    /// Skips ahead to the next statement terminator.
    fn synchronize(&mut self) {
        while !matches!(
            self.current.token,
            Token::Semicolon | Token::RightBrace | Token::EndOfFile
        ) {
            self.bump();
        }
    }

    /// Stamps a name with the current file's package and path.
    fn make_identifier(&self, name: String) -> Identifier {
        Identifier {
            name,
            package: self.package.clone(),
            file: self.file.clone(),
        }
    }

    /// Consumes the next token, which must be an identifier, and returns
    /// its text.
    fn parse_name(&mut self) -> ParseResult<String> {
        self.bump();
        match &self.current.token {
            Token::Identifier(name) => Ok(name.clone()),
            _ => Err(ParseError::ExpectedIdentifier(self.current.span)),
        }
    }

    fn parse_package(&mut self, first_stmt: bool) -> ParseResult<()> {
        let span = self.current.span;
        if !first_stmt || self.package.is_some() {
            return Err(ParseError::PackageNotFirst(span));
        }
        let name = self.parse_name()?;
        self.package = Some(name);
        if self.peek_is(&Token::Semicolon) {
            self.bump();
        }
        Ok(())
    }

    /// Reads and parses an imported file, returning its statements. Errors
    /// inside the imported file are carried over; a file that cannot be
    /// read is a recoverable error on the import line.
    fn parse_import(&mut self) -> ParseResult<Vec<Stmt>> {
        let span = self.current.span;
        self.bump();
        let path_text = match &self.current.token {
            Token::Str(path) => path.clone(),
            t => {
                return Err(ParseError::ExpectedToken(
                    Token::Str(String::new()),
                    self.current.span,
                    t.clone(),
                ))
            }
        };
        if self.peek_is(&Token::Semicolon) {
            self.bump();
        }

        let mut path = PathBuf::from(&path_text);
        if path.extension().is_none() {
            path.set_extension("qu");
        }
        if path.is_relative() {
            if let Some(root) = &self.source_root {
                path = root.join(path);
            }
        }

        let source = match self.reader.read_source(&path) {
            Ok(source) => source,
            Err(_) => {
                return Err(ParseError::ImportNotFound(
                    span,
                    path.display().to_string(),
                ))
            }
        };

        let file_name = path.display().to_string();
        let mut sub_parser = Parser::new(&source, &file_name).with_reader(Rc::clone(&self.reader));
        sub_parser.source_root = self.source_root.clone();

        match sub_parser.parse() {
            Ok(program) => Ok(program.stmts),
            Err(errors) => {
                self.errors.extend(errors);
                Ok(vec![])
            }
        }
    }

    fn parse_statement(&mut self) -> ParseResult<Stmt> {
        match &self.current.token {
            Token::Let => {
                let (name, value) = self.parse_let()?;
                Ok(Stmt::Let(name, value))
            }
            Token::Return => self.parse_return(),
            Token::Defer => self.parse_defer(),
            Token::Package => Err(ParseError::PackageNotFirst(self.current.span)),
            Token::Import => Err(ParseError::ImportNotTopLevel(self.current.span)),
            Token::LexerError(text) => {
                Err(ParseError::IllegalToken(self.current.span, text.clone()))
            }
            _ => {
                let expr = self.parse_expression(Precedence::Lowest)?;
                if self.peek_is(&Token::Semicolon) {
                    self.bump();
                }
                Ok(Stmt::Expression(expr))
            }
        }
    }

    fn parse_let(&mut self) -> ParseResult<(Identifier, Expr)> {
        let name = self.parse_name()?;
        let ident = self.make_identifier(name);
        self.expect_peek(Token::Assign)?;
        self.bump();
        let value = self.parse_expression(Precedence::Lowest)?;
        if self.peek_is(&Token::Semicolon) {
            self.bump();
        }
        Ok((ident, value))
    }

    fn parse_return(&mut self) -> ParseResult<Stmt> {
        if matches!(
            self.peek.token,
            Token::Semicolon | Token::RightBrace | Token::EndOfFile
        ) {
            if self.peek_is(&Token::Semicolon) {
                self.bump();
            }
            return Ok(Stmt::Return(None));
        }

        self.bump();
        let value = self.parse_expression(Precedence::Lowest)?;
        if self.peek_is(&Token::Semicolon) {
            self.bump();
        }
        Ok(Stmt::Return(Some(value)))
    }

    fn parse_defer(&mut self) -> ParseResult<Stmt> {
        self.expect_peek(Token::LeftBrace)?;
        let block = self.parse_block()?;
        Ok(Stmt::Defer(block))
    }

    /// Parses a brace-delimited statement list. Expects `current` on the
    /// opening brace; leaves it on the closing one.
    fn parse_block(&mut self) -> ParseResult<Block> {
        let open_span = self.current.span;
        self.bump();
        let mut stmts = vec![];

        loop {
            match &self.current.token {
                Token::RightBrace => return Ok(Block { stmts }),
                Token::EndOfFile => return Err(ParseError::UnclosedBlock(open_span)),
                Token::Semicolon => {}
                _ => match self.parse_statement() {
                    Ok(stmt) => stmts.push(stmt),
                    Err(e) => {
                        self.emit_error(e);
                        self.synchronize();
                        continue;
                    }
                },
            }
            self.bump();
        }
    }

    fn parse_expression(&mut self, min_precedence: Precedence) -> ParseResult<Expr> {
        let mut left = self.parse_prefix()?;

        // Terminators and the ternary's `:` always end an expression.
        while !self.peek_is(&Token::Semicolon)
            && !self.peek_is(&Token::Colon)
            && min_precedence < token_precedence(&self.peek.token)
        {
            left = self.parse_infix(left)?;
        }

        Ok(left)
    }

    fn parse_prefix(&mut self) -> ParseResult<Expr> {
        let span = self.current.span;

        match &self.current.token {
            Token::Identifier(name) => {
                let name = name.clone();
                self.parse_identifier_expr(name)
            }
            Token::Integer(text) => text
                .parse()
                .map(Expr::IntegerLiteral)
                .map_err(|_| ParseError::UnparsableNumber(span, text.clone())),
            Token::Float(text) => text
                .parse()
                .map(Expr::FloatLiteral)
                .map_err(|_| ParseError::UnparsableNumber(span, text.clone())),
            Token::Str(text) => Ok(Expr::StringLiteral(text.clone())),
            Token::True => Ok(Expr::BooleanLiteral(true)),
            Token::False => Ok(Expr::BooleanLiteral(false)),
            Token::Bang => self.parse_prefix_op(PrefixOperator::LogicalNot),
            Token::Minus => self.parse_prefix_op(PrefixOperator::Negate),
            Token::LeftParen => {
                self.bump();
                let inner = self.parse_expression(Precedence::Lowest)?;
                self.expect_peek(Token::RightParen)?;
                Ok(inner)
            }
            Token::If => self.parse_if(),
            Token::While => self.parse_while(),
            Token::For => self.parse_for(),
            Token::Fn => Ok(Expr::Function(self.parse_function()?)),
            Token::LeftBracket => {
                let elements = self.parse_expression_list(Token::RightBracket)?;
                Ok(Expr::Array(elements))
            }
            Token::LeftBrace => self.parse_hash(),
            Token::Class => self.parse_class(),
            Token::Interface => self.parse_interface(),
            Token::New => self.parse_new(),
            Token::Break => Ok(Expr::Break),
            Token::LexerError(text) => Err(ParseError::IllegalToken(span, text.clone())),
            t => Err(ParseError::ExpectedExpr(span, t.clone())),
        }
    }

    fn parse_prefix_op(&mut self, op: PrefixOperator) -> ParseResult<Expr> {
        self.bump();
        let operand = self.parse_expression(Precedence::Prefix)?;
        Ok(Expr::Prefix(op, Box::new(operand)))
    }

    /// An identifier, or the `name[index]` and `name[index] = value` forms
    /// that hang off one.
    fn parse_identifier_expr(&mut self, name: String) -> ParseResult<Expr> {
        let ident = self.make_identifier(name);

        if !self.peek_is(&Token::LeftBracket) {
            return Ok(Expr::Identifier(ident));
        }

        self.bump();
        self.bump();
        let index = self.parse_expression(Precedence::Lowest)?;
        self.expect_peek(Token::RightBracket)?;

        if self.peek_is(&Token::Assign) {
            self.bump();
            self.bump();
            let value = self.parse_expression(Precedence::Lowest)?;
            return Ok(Expr::HashAssign {
                target: ident,
                index: Box::new(index),
                value: Box::new(value),
            });
        }

        Ok(Expr::Index(
            Box::new(Expr::Identifier(ident)),
            Box::new(index),
        ))
    }

    fn parse_infix(&mut self, left: Expr) -> ParseResult<Expr> {
        self.bump();
        let span = self.current.span;

        match &self.current.token {
            Token::LeftParen => {
                let args = self.parse_expression_list(Token::RightParen)?;
                Ok(Expr::Call {
                    func: Box::new(left),
                    args,
                })
            }
            Token::LeftBracket => {
                self.bump();
                let index = self.parse_expression(Precedence::Lowest)?;
                self.expect_peek(Token::RightBracket)?;
                Ok(Expr::Index(Box::new(left), Box::new(index)))
            }
            Token::Arrow => {
                let name = self.parse_name()?;
                Ok(Expr::Member(Box::new(left), name))
            }
            Token::DoubleColon => {
                let name = self.parse_name()?;
                Ok(Expr::Static(Box::new(left), name))
            }
            Token::Question => self.parse_ternary(left),
            token => {
                let op = match InfixOperator::from_token(token) {
                    Some(op) => op,
                    None => return Err(ParseError::ExpectedExpr(span, token.clone())),
                };
                let precedence = token_precedence(token);

                // `i++` with nothing before the terminator steps by one.
                if matches!(op, InfixOperator::Increment | InfixOperator::Decrement)
                    && matches!(
                        self.peek.token,
                        Token::Semicolon | Token::RightParen | Token::EndOfFile
                    )
                {
                    return Ok(Expr::Infix(
                        op,
                        Box::new(left),
                        Box::new(Expr::IntegerLiteral(1)),
                    ));
                }

                self.bump();
                let right = self.parse_expression(precedence)?;
                Ok(Expr::Infix(op, Box::new(left), Box::new(right)))
            }
        }
    }

    /// `cond ? a : b` is sugar for a two-armed if.
    fn parse_ternary(&mut self, condition: Expr) -> ParseResult<Expr> {
        self.bump();
        let consequence = self.parse_expression(Precedence::Lowest)?;
        self.expect_peek(Token::Colon)?;
        self.bump();
        let alternative = self.parse_expression(Precedence::Lowest)?;

        Ok(Expr::If {
            condition: Box::new(condition),
            consequence: Block {
                stmts: vec![Stmt::Expression(consequence)],
            },
            alternative: Some(Block {
                stmts: vec![Stmt::Expression(alternative)],
            }),
        })
    }

    fn parse_if(&mut self) -> ParseResult<Expr> {
        self.expect_peek(Token::LeftParen)?;
        self.bump();
        let condition = self.parse_expression(Precedence::Lowest)?;
        self.expect_peek(Token::RightParen)?;
        self.expect_peek(Token::LeftBrace)?;
        let consequence = self.parse_block()?;

        let alternative = if self.peek_is(&Token::Else) {
            self.bump();
            if self.peek_is(&Token::If) {
                self.bump();
                let nested = self.parse_if()?;
                Some(Block {
                    stmts: vec![Stmt::Expression(nested)],
                })
            } else {
                self.expect_peek(Token::LeftBrace)?;
                Some(self.parse_block()?)
            }
        } else {
            None
        };

        Ok(Expr::If {
            condition: Box::new(condition),
            consequence,
            alternative,
        })
    }

    fn parse_while(&mut self) -> ParseResult<Expr> {
        self.expect_peek(Token::LeftParen)?;
        self.bump();
        let condition = self.parse_expression(Precedence::Lowest)?;
        self.expect_peek(Token::RightParen)?;
        self.expect_peek(Token::LeftBrace)?;
        let body = self.parse_block()?;

        Ok(Expr::While {
            condition: Box::new(condition),
            body,
        })
    }

    fn parse_for(&mut self) -> ParseResult<Expr> {
        self.expect_peek(Token::LeftParen)?;
        self.bump();
        let init = self.parse_statement()?;
        self.bump();
        let condition = self.parse_expression(Precedence::Lowest)?;
        self.expect_peek(Token::Semicolon)?;
        self.bump();
        let after = self.parse_expression(Precedence::Lowest)?;
        self.expect_peek(Token::RightParen)?;
        self.expect_peek(Token::LeftBrace)?;
        let body = self.parse_block()?;

        Ok(Expr::For {
            init: Box::new(init),
            condition: Box::new(condition),
            after: Box::new(after),
            body,
        })
    }

    fn parse_function(&mut self) -> ParseResult<FunctionLit> {
        let name = if let Token::Identifier(name) = &self.peek.token {
            let name = name.clone();
            self.bump();
            Some(self.make_identifier(name))
        } else {
            None
        };

        self.expect_peek(Token::LeftParen)?;
        let params = self.parse_params()?;
        self.expect_peek(Token::LeftBrace)?;
        let body = self.parse_block()?;

        Ok(FunctionLit { name, params, body })
    }

    fn parse_params(&mut self) -> ParseResult<Vec<Param>> {
        let mut params = vec![];

        if self.peek_is(&Token::RightParen) {
            self.bump();
            return Ok(params);
        }

        loop {
            let name = self.parse_name()?;
            let default = if self.peek_is(&Token::Assign) {
                self.bump();
                self.bump();
                Some(self.parse_expression(Precedence::Lowest)?)
            } else {
                None
            };
            params.push(Param { name, default });

            if self.peek_is(&Token::Comma) {
                self.bump();
                continue;
            }
            self.expect_peek(Token::RightParen)?;
            return Ok(params);
        }
    }

    /// Parses a delimited expression list. Expects `current` on the opening
    /// delimiter; leaves it on `end`.
    fn parse_expression_list(&mut self, end: Token) -> ParseResult<Vec<Expr>> {
        let mut items = vec![];

        if self.peek_is(&end) {
            self.bump();
            return Ok(items);
        }

        self.bump();
        items.push(self.parse_expression(Precedence::Lowest)?);

        while self.peek_is(&Token::Comma) {
            self.bump();
            self.bump();
            items.push(self.parse_expression(Precedence::Lowest)?);
        }

        self.expect_peek(end)?;
        Ok(items)
    }

    /// Hash entries separate on `,` or `;`, since a newline inside a
    /// multi-line literal arrives as an inserted semicolon.
    fn parse_hash(&mut self) -> ParseResult<Expr> {
        let mut pairs = vec![];

        while !self.peek_is(&Token::RightBrace) {
            self.bump();
            let key = self.parse_expression(Precedence::Lowest)?;
            self.expect_peek(Token::Colon)?;
            self.bump();
            let value = self.parse_expression(Precedence::Lowest)?;
            pairs.push((key, value));

            while self.peek_is(&Token::Comma) || self.peek_is(&Token::Semicolon) {
                self.bump();
            }
        }

        self.expect_peek(Token::RightBrace)?;
        Ok(Expr::HashLiteral(pairs))
    }

    fn parse_class(&mut self) -> ParseResult<Expr> {
        let name = self.parse_name()?;
        let name = self.make_identifier(name);

        let mut parents = vec![];
        if self.peek_is(&Token::Extends) {
            self.bump();
            loop {
                let parent = self.parse_name()?;
                parents.push(self.make_identifier(parent));
                if self.peek_is(&Token::Comma) {
                    self.bump();
                    continue;
                }
                break;
            }
        }

        let interface = if self.peek_is(&Token::Implement) {
            self.bump();
            let interface = self.parse_name()?;
            Some(self.make_identifier(interface))
        } else {
            None
        };

        self.expect_peek(Token::LeftBrace)?;
        let open_span = self.current.span;
        self.bump();

        let mut lets = vec![];
        let mut methods = vec![];
        loop {
            match &self.current.token {
                Token::RightBrace => break,
                Token::EndOfFile => return Err(ParseError::UnclosedBlock(open_span)),
                Token::Semicolon => {}
                Token::Let => {
                    lets.push(self.parse_let()?);
                }
                Token::Fn => {
                    let span = self.current.span;
                    let method = self.parse_function()?;
                    if method.name.is_none() {
                        return Err(ParseError::ExpectedIdentifier(span));
                    }
                    methods.push(method);
                }
                t => {
                    return Err(ParseError::ExpectedClassMember(
                        self.current.span,
                        t.clone(),
                    ))
                }
            }
            self.bump();
        }

        Ok(Expr::Class(ClassLit {
            name,
            parents,
            interface,
            lets,
            methods,
        }))
    }

    fn parse_interface(&mut self) -> ParseResult<Expr> {
        let name = self.parse_name()?;
        let name = self.make_identifier(name);

        let mut parents = vec![];
        if self.peek_is(&Token::Extends) {
            self.bump();
            loop {
                let parent = self.parse_name()?;
                parents.push(self.make_identifier(parent));
                if self.peek_is(&Token::Comma) {
                    self.bump();
                    continue;
                }
                break;
            }
        }

        self.expect_peek(Token::LeftBrace)?;
        let open_span = self.current.span;
        self.bump();

        let mut methods = vec![];
        loop {
            match &self.current.token {
                Token::RightBrace => break,
                Token::EndOfFile => return Err(ParseError::UnclosedBlock(open_span)),
                Token::Semicolon => {}
                Token::Fn => {
                    let name = self.parse_name()?;
                    self.expect_peek(Token::LeftParen)?;
                    let mut params = vec![];
                    if !self.peek_is(&Token::RightParen) {
                        loop {
                            params.push(self.parse_name()?);
                            if self.peek_is(&Token::Comma) {
                                self.bump();
                                continue;
                            }
                            break;
                        }
                    }
                    self.expect_peek(Token::RightParen)?;
                    methods.push(MethodSig { name, params });
                }
                t => {
                    return Err(ParseError::ExpectedClassMember(
                        self.current.span,
                        t.clone(),
                    ))
                }
            }
            self.bump();
        }

        Ok(Expr::Interface(InterfaceLit {
            name,
            parents,
            methods,
        }))
    }

    fn parse_new(&mut self) -> ParseResult<Expr> {
        let class = self.parse_name()?;
        let class = self.make_identifier(class);
        self.expect_peek(Token::LeftParen)?;
        let args = self.parse_expression_list(Token::RightParen)?;
        Ok(Expr::New { class, args })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn parse_source(source: &str) -> Program {
        match Parser::new(source, "test.qu").parse() {
            Ok(program) => program,
            Err(errors) => panic!("parse failed: {:?}", errors),
        }
    }

    fn parse_failures(source: &str) -> Vec<ParseError> {
        match Parser::new(source, "test.qu").parse() {
            Ok(program) => panic!("expected errors, parsed: {}", program),
            Err(errors) => errors,
        }
    }

    fn first_expr(source: &str) -> Expr {
        let program = parse_source(source);
        match program.stmts.into_iter().next() {
            Some(Stmt::Expression(expr)) => expr,
            other => panic!("expected expression statement, got {:?}", other),
        }
    }

    fn expr_string(source: &str) -> String {
        first_expr(source).to_string()
    }

    #[test]
    fn test_operator_precedence() {
        assert_eq!(expr_string("a + b * c"), "(a + (b * c))");
        assert_eq!(expr_string("-a * b"), "((-a) * b)");
        assert_eq!(expr_string("a + b == c"), "((a + b) == c)");
        assert_eq!(expr_string("a && b == c"), "(a && (b == c))");
        assert_eq!(expr_string("a || b && c"), "((a || b) && c)");
        assert_eq!(expr_string("x = y + 1"), "(x = (y + 1))");
        assert_eq!(expr_string("(a + b) * c"), "((a + b) * c)");
        assert_eq!(expr_string("!f(x)"), "(!f(x))");
    }

    #[test]
    fn test_step_operators() {
        assert_eq!(expr_string("i++;"), "(i ++ 1)");
        assert_eq!(expr_string("i--;"), "(i -- 1)");
        assert_eq!(expr_string("i += 2"), "(i += 2)");
        assert_eq!(expr_string("i++ 3"), "(i ++ 3)");
    }

    #[test]
    fn test_member_and_static_access() {
        assert_eq!(expr_string("p -> name"), "(p -> name)");
        assert_eq!(expr_string("p -> say()"), "(p -> say)()");
        assert_eq!(expr_string("Circle :: area(2)"), "(Circle :: area)(2)");
    }

    #[test]
    fn test_index_and_index_assign() {
        assert_eq!(expr_string("a[0]"), "(a[0])");
        assert_eq!(expr_string("a[0] + 1"), "((a[0]) + 1)");
        assert_eq!(
            first_expr("scores[\"max\"] = 10"),
            Expr::HashAssign {
                target: Identifier {
                    name: "scores".to_owned(),
                    package: None,
                    file: "test.qu".to_owned(),
                },
                index: Box::new(Expr::StringLiteral("max".to_owned())),
                value: Box::new(Expr::IntegerLiteral(10)),
            }
        );
    }

    #[test]
    fn test_ternary_folds_to_if() {
        let expr = first_expr("x > 0 ? x : -x");
        match expr {
            Expr::If {
                condition,
                consequence,
                alternative,
            } => {
                assert_eq!(condition.to_string(), "(x > 0)");
                assert_eq!(consequence.stmts.len(), 1);
                let alternative = alternative.unwrap();
                assert_eq!(alternative.stmts.len(), 1);
            }
            other => panic!("expected if, got {:?}", other),
        }
    }

    #[test]
    fn test_let_and_return() {
        let program = parse_source("let a = 5\nreturn a * 2\nreturn;");
        assert_eq!(program.stmts.len(), 3);
        assert_eq!(program.stmts[0].to_string(), "let a = 5;");
        assert_eq!(program.stmts[1].to_string(), "return (a * 2);");
        assert_eq!(program.stmts[2], Stmt::Return(None));
    }

    #[test]
    fn test_function_defaults() {
        let expr = first_expr("fn greet(name, greeting = \"hi\") { greeting }");
        match expr {
            Expr::Function(func) => {
                assert_eq!(func.name.as_ref().map(|n| n.name.as_str()), Some("greet"));
                assert_eq!(func.params.len(), 2);
                assert_eq!(func.params[0].default, None);
                assert_eq!(
                    func.params[1].default,
                    Some(Expr::StringLiteral("hi".to_owned()))
                );
            }
            other => panic!("expected function, got {:?}", other),
        }
    }

    #[test]
    fn test_hash_literal_newline_separators() {
        let expr = first_expr("{\"a\": 1,\n\"b\": 2\n\"c\": 3}");
        match expr {
            Expr::HashLiteral(pairs) => {
                let keys: Vec<String> = pairs.iter().map(|(k, _)| k.to_string()).collect();
                assert_eq!(keys, vec!["\"a\"", "\"b\"", "\"c\""]);
            }
            other => panic!("expected hash, got {:?}", other),
        }
    }

    #[test]
    fn test_class_shape() {
        let expr = first_expr(
            "class Dog extends Animal, Pet implement Speaker {\n\
             let _tricks = []\n\
             fn __init(name) { this }\n\
             fn speak() { \"woof\" }\n\
             }",
        );
        match expr {
            Expr::Class(class) => {
                assert_eq!(class.name.name, "Dog");
                assert_eq!(class.parents.len(), 2);
                assert_eq!(class.parents[1].name, "Pet");
                assert_eq!(class.interface.as_ref().map(|i| i.name.as_str()), Some("Speaker"));
                assert_eq!(class.lets.len(), 1);
                assert_eq!(class.lets[0].0.name, "_tricks");
                assert_eq!(class.methods.len(), 2);
                assert_eq!(
                    class.methods[0].name.as_ref().map(|n| n.name.as_str()),
                    Some("__init")
                );
            }
            other => panic!("expected class, got {:?}", other),
        }
    }

    #[test]
    fn test_interface_shape() {
        let expr = first_expr("interface Speaker { fn speak(); fn greet(name) }");
        match expr {
            Expr::Interface(interface) => {
                assert_eq!(interface.name.name, "Speaker");
                assert_eq!(interface.methods.len(), 2);
                assert_eq!(interface.methods[1].params, vec!["name".to_owned()]);
            }
            other => panic!("expected interface, got {:?}", other),
        }
    }

    #[test]
    fn test_new_and_defer() {
        let program = parse_source("defer { close() }\nlet p = new Person(\"Ada\")");
        assert_eq!(program.stmts.len(), 2);
        assert!(matches!(program.stmts[0], Stmt::Defer(_)));
        match &program.stmts[1] {
            Stmt::Let(_, Expr::New { class, args }) => {
                assert_eq!(class.name, "Person");
                assert_eq!(args.len(), 1);
            }
            other => panic!("expected let of new, got {:?}", other),
        }
    }

    #[test]
    fn test_package_stamps_identifiers() {
        let program = parse_source("package math\nlet pi = 3.14\narea(pi)");
        match &program.stmts[0] {
            Stmt::Let(ident, _) => {
                assert_eq!(ident.package.as_deref(), Some("math"));
                assert_eq!(ident.file, "test.qu");
            }
            other => panic!("expected let, got {:?}", other),
        }
    }

    #[test]
    fn test_package_must_come_first() {
        let errors = parse_failures("let a = 1\npackage math");
        assert_eq!(errors.len(), 1);
        assert!(matches!(errors[0], ParseError::PackageNotFirst(_)));
    }

    #[test]
    fn test_error_recovery_collects_multiple() {
        let errors = parse_failures("let = 5\nlet b 7\nlet c = 9");
        assert_eq!(errors.len(), 2);
    }

    struct MapReader(HashMap<String, String>);

    impl SourceReader for MapReader {
        fn read_source(&self, path: &Path) -> Result<String, String> {
            let key = path.display().to_string();
            self.0.get(&key).cloned().ok_or_else(|| "not found".to_owned())
        }
    }

    #[test]
    fn test_import_splices_statements() {
        let mut files = HashMap::new();
        files.insert(
            "geometry.qu".to_owned(),
            "package geometry\nlet pi = 3.14".to_owned(),
        );

        let program = Parser::new("import \"geometry\"\nlet tau = geometry.pi * 2", "main.qu")
            .with_reader(Rc::new(MapReader(files)))
            .parse()
            .unwrap();

        assert_eq!(program.stmts.len(), 2);
        match &program.stmts[0] {
            Stmt::Let(ident, _) => {
                assert_eq!(ident.name, "pi");
                assert_eq!(ident.package.as_deref(), Some("geometry"));
                assert_eq!(ident.file, "geometry.qu");
            }
            other => panic!("expected spliced let, got {:?}", other),
        }
    }

    #[test]
    fn test_import_not_found_is_recoverable() {
        let errors = Parser::new("import \"missing\"\nlet a = 1", "main.qu")
            .with_reader(Rc::new(MapReader(HashMap::new())))
            .parse()
            .unwrap_err();
        assert_eq!(errors.len(), 1);
        assert!(matches!(errors[0], ParseError::ImportNotFound(_, _)));
    }

    #[test]
    fn test_rendering_round_trips() {
        let sources = [
            "let total = a + b * c;",
            "fn adder(x) { fn(y) { x + y } };",
            "while (i < 10) { i++; };",
            "for (let i = 0; i < 5; i++) { push(out, i); };",
            "if (a > b) { a; } else { b; };",
            "let h = {\"one\": 1, \"two\": 2};",
            "p -> greet(\"hi\");",
            "class Point { let x = 0; fn norm() { this -> x; } };",
            "new Point();",
        ];

        for source in sources {
            let first = parse_source(source);
            let rendered = first.to_string();
            let second = parse_source(&rendered);
            assert_eq!(first, second, "round trip failed for `{}`", source);
        }
    }
}
