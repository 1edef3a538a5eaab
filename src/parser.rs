use log::debug;
use std::rc::Rc;

use crate::{
    error::{parser_error, Error, Result},
    position::{Position, Source, Span},
    tokenizer::{Keyword, Token, TokenType},
    value::Number,
};

#[derive(Debug, Clone)]
pub struct Node {
    pub kind: NodeKind,
    pub span: Span,
}

impl Node {
    pub fn new(kind: NodeKind, span: Span) -> Node {
        Node { kind, span }
    }
}

#[derive(Debug, Clone)]
pub enum NodeKind {
    Number(Number),
    String(String),
    List(Vec<Node>),
    /// A newline separated statement list. Evaluates to the list of its
    /// statement values.
    Block(Vec<Node>),
    VarAccess(String),
    VarAssign {
        name: String,
        value: Box<Node>,
        is_const: bool,
        var_type: Option<TypeTag>,
    },
    BinOp {
        left: Box<Node>,
        operator: BinaryOp,
        right: Box<Node>,
    },
    UnaryOp {
        operator: UnaryOp,
        operand: Box<Node>,
    },
    If {
        cases: Vec<IfCase>,
        else_case: Option<Box<ElseCase>>,
    },
    For {
        var_name: String,
        start: Box<Node>,
        end: Box<Node>,
        step: Option<Box<Node>>,
        body: Box<Node>,
        returns_null: bool,
    },
    While {
        condition: Box<Node>,
        body: Box<Node>,
        returns_null: bool,
    },
    FuncDef {
        name: Option<String>,
        params: Vec<String>,
        body: Rc<Node>,
    },
    Call {
        callee: Box<Node>,
        arguments: Vec<Node>,
    },
}

#[derive(Debug, Clone)]
pub struct IfCase {
    pub condition: Node,
    pub body: Node,
    pub is_block: bool,
}

#[derive(Debug, Clone)]
pub struct ElseCase {
    pub body: Node,
    pub is_block: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeTag {
    Int,
    Str,
    Bool,
    Arr,
}

impl TypeTag {
    fn from_keyword(keyword: Keyword) -> Option<TypeTag> {
        match keyword {
            Keyword::Int => Some(TypeTag::Int),
            Keyword::Str => Some(TypeTag::Str),
            Keyword::Bool => Some(TypeTag::Bool),
            Keyword::Arr => Some(TypeTag::Arr),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            TypeTag::Int => "int",
            TypeTag::Str => "str",
            TypeTag::Bool => "bool",
            TypeTag::Arr => "arr",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Negate,
    Identity,
    Not,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Subtract,
    Multiply,
    Divide,
    Power,
    Equal,
    NotEqual,
    Less,
    Greater,
    LessEqual,
    GreaterEqual,
    And,
    Or,
}

impl BinaryOp {
    pub fn symbol(self) -> &'static str {
        match self {
            BinaryOp::Add => "+",
            BinaryOp::Subtract => "-",
            BinaryOp::Multiply => "*",
            BinaryOp::Divide => "/",
            BinaryOp::Power => "^",
            BinaryOp::Equal => "==",
            BinaryOp::NotEqual => "!=",
            BinaryOp::Less => "<",
            BinaryOp::Greater => ">",
            BinaryOp::LessEqual => "<=",
            BinaryOp::GreaterEqual => ">=",
            BinaryOp::And => "and",
            BinaryOp::Or => "or",
        }
    }
}

const EXPECTED_OPERAND: &str = "Expected int, float, string, identifier, 'let', 'const', 'if', \
     'for', 'while', 'func', '+', '-', '(', '[' or 'not'";

pub fn parse(tokens: &[Token]) -> Result<Node> {
    match tokens.last() {
        Some(last) if last.token_type == TokenType::EOF => {}
        Some(last) => return parser_error("Expected end of input", last),
        None => {
            let start = Position::start_of(Source::new("<input>", ""));
            return Err(Error::InvalidSyntax {
                span: Span::new(start.clone(), start.next_column()),
                details: "Expected end of input".to_string(),
            });
        }
    }

    let mut parser = Parser::new(tokens);
    parser.skip_newlines();

    if parser.check(&TokenType::EOF) {
        return Ok(Node::new(
            NodeKind::Block(Vec::new()),
            parser.current().span.clone(),
        ));
    }

    let program = parser.statements()?;

    if !parser.check(&TokenType::EOF) {
        let stray = parser.current();
        // A statement that could not even start: surface its own error
        if parser.previous_is_newline() {
            parser.expr()?;
        }
        return parser_error("Expected '+', '-', '*', '/', '^' or newline", stray);
    }

    if let NodeKind::Block(statements) = &program.kind {
        debug!("parsed {} top level statements", statements.len());
    }
    Ok(program)
}

struct Parser<'a> {
    tokens: &'a [Token],
    cursor: usize,
}

impl<'a> Parser<'a> {
    fn new(tokens: &'a [Token]) -> Parser<'a> {
        Parser { tokens, cursor: 0 }
    }

    fn current(&self) -> &'a Token {
        &self.tokens[self.cursor.min(self.tokens.len() - 1)]
    }

    fn peek(&self) -> &'a Token {
        &self.tokens[(self.cursor + 1).min(self.tokens.len() - 1)]
    }

    fn previous_is_newline(&self) -> bool {
        self.cursor > 0 && self.tokens[self.cursor - 1].token_type == TokenType::NewLine
    }

    /// Consumes the current token and returns it. Never moves past EOF.
    fn advance(&mut self) -> &'a Token {
        let token = self.current();
        if token.token_type != TokenType::EOF {
            self.cursor += 1;
        }
        token
    }

    fn check(&self, token_type: &TokenType) -> bool {
        &self.current().token_type == token_type
    }

    fn check_keyword(&self, keyword: Keyword) -> bool {
        self.current().is_keyword(keyword)
    }

    fn expect(&mut self, token_type: TokenType, message: &str) -> Result<&'a Token> {
        if self.check(&token_type) {
            Ok(self.advance())
        } else {
            parser_error(message, self.current())
        }
    }

    fn expect_keyword(&mut self, keyword: Keyword) -> Result<&'a Token> {
        if self.check_keyword(keyword) {
            Ok(self.advance())
        } else {
            parser_error(format!("Expected '{}'", keyword.as_str()), self.current())
        }
    }

    fn expect_identifier(&mut self, message: &str) -> Result<(String, &'a Token)> {
        match &self.current().token_type {
            TokenType::Identifier(name) => Ok((name.clone(), self.advance())),
            _ => parser_error(message, self.current()),
        }
    }

    fn checkpoint(&self) -> usize {
        self.cursor
    }

    fn restore(&mut self, checkpoint: usize) {
        self.cursor = checkpoint;
    }

    fn skip_newlines(&mut self) -> usize {
        let mut skipped = 0;
        while self.check(&TokenType::NewLine) {
            self.advance();
            skipped += 1;
        }
        skipped
    }

    // statements -> NEWLINE* expr (NEWLINE+ expr)* NEWLINE*
    fn statements(&mut self) -> Result<Node> {
        self.skip_newlines();
        let first = self.expr()?;
        let mut span = first.span.clone();
        let mut statements = vec![first];

        loop {
            if self.skip_newlines() == 0 {
                break;
            }

            let checkpoint = self.checkpoint();
            match self.expr() {
                Ok(statement) => {
                    span = span.to(&statement.span);
                    statements.push(statement);
                }
                // Nothing consumed: the list ends here, e.g. at a closing '}'
                Err(_) if self.cursor == checkpoint => {
                    self.restore(checkpoint);
                    break;
                }
                Err(err) => return Err(err),
            }
        }

        Ok(Node::new(NodeKind::Block(statements), span))
    }

    fn expr(&mut self) -> Result<Node> {
        if self.check_keyword(Keyword::Let) || self.check_keyword(Keyword::Const) {
            return self.declaration();
        }

        if let TokenType::Identifier(name) = &self.current().token_type {
            if self.peek().token_type == TokenType::Equal {
                let start = self.advance();
                self.advance();
                let value = self.expr()?;
                let span = start.span.to(&value.span);
                return Ok(Node::new(
                    NodeKind::VarAssign {
                        name: name.clone(),
                        value: Box::new(value),
                        is_const: false,
                        var_type: None,
                    },
                    span,
                ));
            }
        }

        self.bin_op(Parser::comp_expr, logical_operator)
    }

    // ('let' | 'const') [type] IDENTIFIER '=' expr
    fn declaration(&mut self) -> Result<Node> {
        let start = self.advance();
        let is_const = start.is_keyword(Keyword::Const);

        let var_type = match &self.current().token_type {
            TokenType::Keyword(keyword) => TypeTag::from_keyword(*keyword),
            _ => None,
        };
        if var_type.is_some() {
            self.advance();
        }

        let (name, _) = self.expect_identifier("Expected identifier")?;
        self.expect(TokenType::Equal, "Expected '='")?;
        let value = self.expr()?;
        let span = start.span.to(&value.span);

        Ok(Node::new(
            NodeKind::VarAssign {
                name,
                value: Box::new(value),
                is_const,
                var_type,
            },
            span,
        ))
    }

    fn comp_expr(&mut self) -> Result<Node> {
        if self.check_keyword(Keyword::Not) {
            let start = self.advance();
            let operand = self.comp_expr()?;
            let span = start.span.to(&operand.span);
            return Ok(Node::new(
                NodeKind::UnaryOp {
                    operator: UnaryOp::Not,
                    operand: Box::new(operand),
                },
                span,
            ));
        }

        self.bin_op(Parser::arith_expr, comparison_operator)
    }

    fn arith_expr(&mut self) -> Result<Node> {
        self.bin_op(Parser::term, |token_type| match token_type {
            TokenType::Plus => Some(BinaryOp::Add),
            TokenType::Minus => Some(BinaryOp::Subtract),
            _ => None,
        })
    }

    fn term(&mut self) -> Result<Node> {
        self.bin_op(Parser::factor, |token_type| match token_type {
            TokenType::Star => Some(BinaryOp::Multiply),
            TokenType::Slash => Some(BinaryOp::Divide),
            _ => None,
        })
    }

    fn factor(&mut self) -> Result<Node> {
        let operator = match self.current().token_type {
            TokenType::Plus => UnaryOp::Identity,
            TokenType::Minus => UnaryOp::Negate,
            _ => return self.power(),
        };

        let start = self.advance();
        let operand = self.factor()?;
        let span = start.span.to(&operand.span);
        Ok(Node::new(
            NodeKind::UnaryOp {
                operator,
                operand: Box::new(operand),
            },
            span,
        ))
    }

    // The right operand goes back through factor so `^` binds right to left.
    fn power(&mut self) -> Result<Node> {
        let base = self.call()?;
        if !self.check(&TokenType::Caret) {
            return Ok(base);
        }

        self.advance();
        let exponent = self.factor()?;
        let span = base.span.to(&exponent.span);
        Ok(Node::new(
            NodeKind::BinOp {
                left: Box::new(base),
                operator: BinaryOp::Power,
                right: Box::new(exponent),
            },
            span,
        ))
    }

    fn call(&mut self) -> Result<Node> {
        let mut node = self.atom()?;

        while self.check(&TokenType::LeftParen) {
            self.advance();
            let mut arguments = Vec::new();

            if !self.check(&TokenType::RightParen) {
                arguments.push(self.expr()?);
                while self.check(&TokenType::Comma) {
                    self.advance();
                    arguments.push(self.expr()?);
                }
            }

            let close = self.expect(TokenType::RightParen, "Expected ',' or ')'")?;
            let span = node.span.to(&close.span);
            node = Node::new(
                NodeKind::Call {
                    callee: Box::new(node),
                    arguments,
                },
                span,
            );
        }

        Ok(node)
    }

    fn atom(&mut self) -> Result<Node> {
        let token = self.current();
        let kind = match &token.token_type {
            TokenType::Int(n) => NodeKind::Number(Number::Int(*n)),
            TokenType::Float(n) => NodeKind::Number(Number::Float(*n)),
            TokenType::String(s) => NodeKind::String(s.clone()),
            TokenType::Identifier(name) => NodeKind::VarAccess(name.clone()),
            TokenType::LeftParen => return self.grouping(),
            TokenType::LeftSquare => return self.list(),
            TokenType::Keyword(Keyword::If) => return self.if_expr(),
            TokenType::Keyword(Keyword::For) => return self.for_expr(),
            TokenType::Keyword(Keyword::While) => return self.while_expr(),
            TokenType::Keyword(Keyword::Func) => return self.func_def(),
            _ => return parser_error(EXPECTED_OPERAND, token),
        };

        self.advance();
        Ok(Node::new(kind, token.span.clone()))
    }

    fn grouping(&mut self) -> Result<Node> {
        let open = self.advance();
        let inner = self.expr()?;
        let close = self.expect(TokenType::RightParen, "Expected ')'")?;
        Ok(Node::new(inner.kind, open.span.to(&close.span)))
    }

    fn list(&mut self) -> Result<Node> {
        let open = self.advance();
        let mut elements = Vec::new();

        if !self.check(&TokenType::RightSquare) {
            elements.push(self.expr()?);
            while self.check(&TokenType::Comma) {
                self.advance();
                elements.push(self.expr()?);
            }
        }

        let close = self.expect(TokenType::RightSquare, "Expected ',' or ']'")?;
        Ok(Node::new(NodeKind::List(elements), open.span.to(&close.span)))
    }

    /// Parses what follows an opening `{`: either NEWLINE statements or a
    /// single expression. Returns the body and whether it is a block. The
    /// closing `}` is left to the caller.
    fn branch_body(&mut self) -> Result<(Node, bool)> {
        if self.check(&TokenType::NewLine) {
            Ok((self.statements()?, true))
        } else {
            Ok((self.expr()?, false))
        }
    }

    /// `{ body }` as used by loops.
    fn braced_body(&mut self) -> Result<(Node, bool, &'a Token)> {
        self.expect(TokenType::LeftBrace, "Expected '{'")?;
        let (body, is_block) = self.branch_body()?;
        let close = self.expect(TokenType::RightBrace, "Expected '}'")?;
        Ok((body, is_block, close))
    }

    fn if_expr(&mut self) -> Result<Node> {
        let start = self.current().span.clone();
        let (cases, else_case) = self.if_cases(Keyword::If)?;
        let end = self.previous_span();
        Ok(Node::new(
            NodeKind::If {
                cases,
                else_case: else_case.map(Box::new),
            },
            start.to(&end),
        ))
    }

    fn previous_span(&self) -> Span {
        self.tokens[self.cursor.saturating_sub(1)].span.clone()
    }

    // ('if' | 'elif') expr '{' body '}' [elif ... | else ...]
    fn if_cases(&mut self, keyword: Keyword) -> Result<(Vec<IfCase>, Option<ElseCase>)> {
        self.expect_keyword(keyword)?;
        let condition = self.expr()?;
        self.expect(TokenType::LeftBrace, "Expected '{'")?;
        let (body, is_block) = self.branch_body()?;

        let mut cases = vec![IfCase {
            condition,
            body,
            is_block,
        }];

        let (more, else_case) = if self.check(&TokenType::RightBrace) {
            self.advance();
            self.if_tail()?
        } else if is_block
            && (self.check_keyword(Keyword::Elif) || self.check_keyword(Keyword::Else))
        {
            self.elif_or_else()?
        } else {
            return parser_error("Expected '}'", self.current());
        };

        cases.extend(more);
        Ok((cases, else_case))
    }

    /// Looks past newlines for a following `elif` or `else`; rolls back when
    /// neither is there.
    fn if_tail(&mut self) -> Result<(Vec<IfCase>, Option<ElseCase>)> {
        let checkpoint = self.checkpoint();
        self.skip_newlines();

        if self.check_keyword(Keyword::Elif) || self.check_keyword(Keyword::Else) {
            return self.elif_or_else();
        }

        self.restore(checkpoint);
        Ok((Vec::new(), None))
    }

    fn elif_or_else(&mut self) -> Result<(Vec<IfCase>, Option<ElseCase>)> {
        if self.check_keyword(Keyword::Elif) {
            self.if_cases(Keyword::Elif)
        } else {
            Ok((Vec::new(), Some(self.else_case()?)))
        }
    }

    // 'else' ('{' body '}' | expr)
    fn else_case(&mut self) -> Result<ElseCase> {
        self.expect_keyword(Keyword::Else)?;

        if !self.check(&TokenType::LeftBrace) {
            return Ok(ElseCase {
                body: self.expr()?,
                is_block: false,
            });
        }

        self.advance();
        let (body, is_block) = self.branch_body()?;
        self.expect(TokenType::RightBrace, "Expected '}'")?;
        Ok(ElseCase { body, is_block })
    }

    // 'for' IDENTIFIER '=' expr 'to' expr ['step' expr] '{' body '}'
    fn for_expr(&mut self) -> Result<Node> {
        let start = self.expect_keyword(Keyword::For)?;
        let (var_name, _) = self.expect_identifier("Expected identifier")?;
        self.expect(TokenType::Equal, "Expected '='")?;
        let from = self.expr()?;
        self.expect_keyword(Keyword::To)?;
        let to = self.expr()?;

        let step = if self.check_keyword(Keyword::Step) {
            self.advance();
            Some(Box::new(self.expr()?))
        } else {
            None
        };

        let (body, is_block, close) = self.braced_body()?;
        Ok(Node::new(
            NodeKind::For {
                var_name,
                start: Box::new(from),
                end: Box::new(to),
                step,
                body: Box::new(body),
                returns_null: is_block,
            },
            start.span.to(&close.span),
        ))
    }

    // 'while' expr '{' body '}'
    fn while_expr(&mut self) -> Result<Node> {
        let start = self.expect_keyword(Keyword::While)?;
        let condition = self.expr()?;
        let (body, is_block, close) = self.braced_body()?;

        Ok(Node::new(
            NodeKind::While {
                condition: Box::new(condition),
                body: Box::new(body),
                returns_null: is_block,
            },
            start.span.to(&close.span),
        ))
    }

    // 'func' [IDENTIFIER] '(' params ')' ('=>' expr | ':' body '}')
    fn func_def(&mut self) -> Result<Node> {
        let start = self.expect_keyword(Keyword::Func)?;

        let name = match &self.current().token_type {
            TokenType::Identifier(name) => {
                self.advance();
                self.expect(TokenType::LeftParen, "Expected '('")?;
                Some(name.clone())
            }
            _ => {
                self.expect(TokenType::LeftParen, "Expected identifier or '('")?;
                None
            }
        };

        let mut params = Vec::new();
        if let TokenType::Identifier(first) = &self.current().token_type {
            params.push(first.clone());
            self.advance();
            while self.check(&TokenType::Comma) {
                self.advance();
                let (param, _) = self.expect_identifier("Expected identifier")?;
                params.push(param);
            }
            self.expect(TokenType::RightParen, "Expected ',' or ')'")?;
        } else {
            self.expect(TokenType::RightParen, "Expected identifier or ')'")?;
        }

        let (body, end) = if self.check(&TokenType::Arrow) {
            self.advance();
            let body = self.expr()?;
            let end = body.span.clone();
            (body, end)
        } else {
            self.expect(TokenType::Colon, "Expected '=>' or ':'")?;
            let (body, _) = self.branch_body()?;
            let close = self.expect(TokenType::RightBrace, "Expected '}'")?;
            (body, close.span.clone())
        };

        Ok(Node::new(
            NodeKind::FuncDef {
                name,
                params,
                body: Rc::new(body),
            },
            start.span.to(&end),
        ))
    }

    fn bin_op(
        &mut self,
        operand: fn(&mut Parser<'a>) -> Result<Node>,
        operator: fn(&TokenType) -> Option<BinaryOp>,
    ) -> Result<Node> {
        let mut left = operand(self)?;

        while let Some(op) = operator(&self.current().token_type) {
            self.advance();
            let right = operand(self)?;
            let span = left.span.to(&right.span);
            left = Node::new(
                NodeKind::BinOp {
                    left: Box::new(left),
                    operator: op,
                    right: Box::new(right),
                },
                span,
            );
        }

        Ok(left)
    }
}

fn logical_operator(token_type: &TokenType) -> Option<BinaryOp> {
    match token_type {
        TokenType::Keyword(Keyword::And) => Some(BinaryOp::And),
        TokenType::Keyword(Keyword::Or) => Some(BinaryOp::Or),
        _ => None,
    }
}

fn comparison_operator(token_type: &TokenType) -> Option<BinaryOp> {
    match token_type {
        TokenType::EqualEqual => Some(BinaryOp::Equal),
        TokenType::BangEqual => Some(BinaryOp::NotEqual),
        TokenType::Less => Some(BinaryOp::Less),
        TokenType::Greater => Some(BinaryOp::Greater),
        TokenType::LessEqual => Some(BinaryOp::LessEqual),
        TokenType::GreaterEqual => Some(BinaryOp::GreaterEqual),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tokenizer::tokenize;

    fn parse_str(input: &str) -> Result<Vec<Node>> {
        let tokens = tokenize("<test>", input)?;
        match parse(&tokens)?.kind {
            NodeKind::Block(statements) => Ok(statements),
            other => panic!("program should be a block, got {:?}", other),
        }
    }

    fn syntax_error(input: &str) -> String {
        match parse_str(input) {
            Err(Error::InvalidSyntax { details, .. }) => details,
            other => panic!("expected a syntax error, got {:?}", other),
        }
    }

    #[test]
    fn test_empty_program() -> Result<()> {
        assert!(parse_str("")?.is_empty());
        assert!(parse_str("\n\n;")?.is_empty());
        Ok(())
    }

    #[test]
    fn test_precedence() -> Result<()> {
        let statements = parse_str("2 + 3 * 4")?;
        match &statements[0].kind {
            NodeKind::BinOp {
                operator: BinaryOp::Add,
                right,
                ..
            } => assert!(matches!(
                right.kind,
                NodeKind::BinOp {
                    operator: BinaryOp::Multiply,
                    ..
                }
            )),
            other => panic!("unexpected node {:?}", other),
        }
        Ok(())
    }

    #[test]
    fn test_power_is_right_associative() -> Result<()> {
        let statements = parse_str("2 ^ 3 ^ 2")?;
        match &statements[0].kind {
            NodeKind::BinOp {
                operator: BinaryOp::Power,
                left,
                right,
            } => {
                assert!(matches!(left.kind, NodeKind::Number(Number::Int(2))));
                assert!(matches!(
                    right.kind,
                    NodeKind::BinOp {
                        operator: BinaryOp::Power,
                        ..
                    }
                ));
            }
            other => panic!("unexpected node {:?}", other),
        }
        Ok(())
    }

    #[test]
    fn test_declarations() -> Result<()> {
        let statements = parse_str("let int x = 1\nconst y = 2\nz = 3")?;
        assert_eq!(statements.len(), 3);

        assert!(matches!(
            &statements[0].kind,
            NodeKind::VarAssign { name, is_const: false, var_type: Some(TypeTag::Int), .. } if name == "x"
        ));
        assert!(matches!(
            &statements[1].kind,
            NodeKind::VarAssign { name, is_const: true, var_type: None, .. } if name == "y"
        ));
        assert!(matches!(
            &statements[2].kind,
            NodeKind::VarAssign { name, is_const: false, .. } if name == "z"
        ));
        Ok(())
    }

    #[test]
    fn test_if_elif_else_chain() -> Result<()> {
        let input = "if x == 1 { \"one\" } elif x == 2 { \"two\" }\nelse { \"many\" }";
        let statements = parse_str(input)?;
        assert_eq!(statements.len(), 1);

        match &statements[0].kind {
            NodeKind::If { cases, else_case } => {
                assert_eq!(cases.len(), 2);
                assert!(cases.iter().all(|case| !case.is_block));
                assert!(else_case.is_some());
            }
            other => panic!("unexpected node {:?}", other),
        }
        Ok(())
    }

    #[test]
    fn test_if_without_else_is_followed_by_statements() -> Result<()> {
        let statements = parse_str("if x { 1 }\nwrite(2)")?;
        assert_eq!(statements.len(), 2);
        assert!(matches!(
            &statements[0].kind,
            NodeKind::If { else_case: None, .. }
        ));
        Ok(())
    }

    #[test]
    fn test_block_if_closed_by_else() -> Result<()> {
        let statements = parse_str("if x {\n  write(1)\nelse 2")?;
        match &statements[0].kind {
            NodeKind::If { cases, else_case } => {
                assert!(cases[0].is_block);
                assert!(matches!(
                    else_case.as_deref(),
                    Some(ElseCase {
                        is_block: false,
                        ..
                    })
                ));
            }
            other => panic!("unexpected node {:?}", other),
        }
        Ok(())
    }

    #[test]
    fn test_for_loops() -> Result<()> {
        let statements = parse_str("for i = 10 to 1 step -1 { i }\nfor j = 1 to 3 {\n  write(j)\n}")?;
        assert!(matches!(
            &statements[0].kind,
            NodeKind::For { var_name, step: Some(_), returns_null: false, .. } if var_name == "i"
        ));
        assert!(matches!(
            &statements[1].kind,
            NodeKind::For {
                step: None,
                returns_null: true,
                ..
            }
        ));
        Ok(())
    }

    #[test]
    fn test_while_loop() -> Result<()> {
        let statements = parse_str("while i < 3 { i = i + 1 }")?;
        assert!(matches!(
            &statements[0].kind,
            NodeKind::While {
                returns_null: false,
                ..
            }
        ));
        Ok(())
    }

    #[test]
    fn test_function_definitions() -> Result<()> {
        let input = "func plus(a, b) => a + b\nfunc (x): x * 2 }\nfunc body():\n  let y = 1\n  y\n}";
        let statements = parse_str(input)?;
        assert_eq!(statements.len(), 3);

        match &statements[0].kind {
            NodeKind::FuncDef { name, params, .. } => {
                assert_eq!(name.as_deref(), Some("plus"));
                assert_eq!(params, &["a", "b"]);
            }
            other => panic!("unexpected node {:?}", other),
        }
        assert!(matches!(
            &statements[1].kind,
            NodeKind::FuncDef { name: None, .. }
        ));
        match &statements[2].kind {
            NodeKind::FuncDef { body, .. } => {
                assert!(matches!(&body.kind, NodeKind::Block(stmts) if stmts.len() == 2))
            }
            other => panic!("unexpected node {:?}", other),
        }
        Ok(())
    }

    #[test]
    fn test_calls_and_lists() -> Result<()> {
        let statements = parse_str("f(1, [2, 3])(4)\n[]")?;
        match &statements[0].kind {
            NodeKind::Call { callee, arguments } => {
                assert_eq!(arguments.len(), 1);
                assert!(matches!(&callee.kind, NodeKind::Call { arguments, .. } if arguments.len() == 2));
            }
            other => panic!("unexpected node {:?}", other),
        }
        assert!(matches!(&statements[1].kind, NodeKind::List(items) if items.is_empty()));
        Ok(())
    }

    #[test]
    fn test_unary_operators() -> Result<()> {
        let statements = parse_str("-1\n+2\nnot 1 == 2")?;
        assert!(matches!(
            &statements[0].kind,
            NodeKind::UnaryOp {
                operator: UnaryOp::Negate,
                ..
            }
        ));
        assert!(matches!(
            &statements[1].kind,
            NodeKind::UnaryOp {
                operator: UnaryOp::Identity,
                ..
            }
        ));
        match &statements[2].kind {
            NodeKind::UnaryOp {
                operator: UnaryOp::Not,
                operand,
            } => assert!(matches!(
                operand.kind,
                NodeKind::BinOp {
                    operator: BinaryOp::Equal,
                    ..
                }
            )),
            other => panic!("unexpected node {:?}", other),
        }
        Ok(())
    }

    #[test]
    fn test_spans_cover_operands() -> Result<()> {
        let statements = parse_str("ab + cd")?;
        assert_eq!(statements[0].span.start.column, 0);
        assert_eq!(statements[0].span.end.column, 7);
        Ok(())
    }

    #[test]
    fn test_syntax_errors() {
        assert_eq!(syntax_error("let = 1"), "Expected identifier");
        assert_eq!(syntax_error("let x 1"), "Expected '='");
        assert_eq!(syntax_error("f(1, 2"), "Expected ',' or ')'");
        assert_eq!(syntax_error("[1, 2"), "Expected ',' or ']'");
        assert_eq!(syntax_error("for i = 1 3 { i }"), "Expected 'to'");
        assert_eq!(syntax_error("if x { 1"), "Expected '}'");
        assert_eq!(syntax_error("1 2"), "Expected '+', '-', '*', '/', '^' or newline");
        assert_eq!(syntax_error("1\n)"), EXPECTED_OPERAND);
    }

    #[test]
    fn test_keywords_cannot_name_functions() {
        assert_eq!(syntax_error("func add() => 1"), "Expected identifier or '('");
        assert_eq!(syntax_error("func f(get) => 1"), "Expected identifier or ')'");
    }

    #[test]
    fn test_unterminated_token_slice_is_a_syntax_error() -> Result<()> {
        assert!(matches!(parse(&[]), Err(Error::InvalidSyntax { .. })));

        let mut tokens = tokenize("<test>", "1 + 2")?;
        tokens.pop();
        match parse(&tokens) {
            Err(Error::InvalidSyntax { details, .. }) => assert_eq!(details, "Expected end of input"),
            other => panic!("expected a syntax error, got {:?}", other),
        }
        Ok(())
    }

    #[test]
    fn test_error_after_consuming_tokens_is_reported() {
        assert_eq!(syntax_error("let x = 1\nlet y ="), EXPECTED_OPERAND);
    }

    #[test]
    fn test_parsing_is_deterministic() -> Result<()> {
        let input = "func f(n): if n < 2 { n } else { f(n - 1) + f(n - 2) } }\nf(10)";
        let first = format!("{:?}", parse_str(input)?);
        let second = format!("{:?}", parse_str(input)?);
        assert_eq!(first, second);
        Ok(())
    }
}
