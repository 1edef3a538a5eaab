use log::debug;
use std::rc::Rc;

use crate::{
    error::{Error, Result},
    position::{Position, Source, Span},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Keyword {
    Let,
    And,
    Or,
    Not,
    If,
    Elif,
    Else,
    For,
    To,
    Step,
    While,
    Func,
    Add,
    Remove,
    With,
    Get,
    Endf,
    Const,
    Int,
    Str,
    Bool,
    Arr,
}

impl Keyword {
    pub const ALL: [Keyword; 22] = [
        Keyword::Let,
        Keyword::And,
        Keyword::Or,
        Keyword::Not,
        Keyword::If,
        Keyword::Elif,
        Keyword::Else,
        Keyword::For,
        Keyword::To,
        Keyword::Step,
        Keyword::While,
        Keyword::Func,
        Keyword::Add,
        Keyword::Remove,
        Keyword::With,
        Keyword::Get,
        Keyword::Endf,
        Keyword::Const,
        Keyword::Int,
        Keyword::Str,
        Keyword::Bool,
        Keyword::Arr,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Keyword::Let => "let",
            Keyword::And => "and",
            Keyword::Or => "or",
            Keyword::Not => "not",
            Keyword::If => "if",
            Keyword::Elif => "elif",
            Keyword::Else => "else",
            Keyword::For => "for",
            Keyword::To => "to",
            Keyword::Step => "step",
            Keyword::While => "while",
            Keyword::Func => "func",
            Keyword::Add => "add",
            Keyword::Remove => "remove",
            Keyword::With => "with",
            Keyword::Get => "get",
            Keyword::Endf => "endf",
            Keyword::Const => "const",
            Keyword::Int => "int",
            Keyword::Str => "str",
            Keyword::Bool => "bool",
            Keyword::Arr => "arr",
        }
    }

    /// Looks up an already lowercased word.
    pub fn from_word(word: &str) -> Option<Keyword> {
        Keyword::ALL.into_iter().find(|k| k.as_str() == word)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum TokenType {
    Int(i64),
    Float(f64),
    String(String),
    Identifier(String),
    Keyword(Keyword),

    Plus,
    Minus,
    Star,
    Slash,
    Caret,

    Equal,
    EqualEqual,
    BangEqual,
    Less,
    Greater,
    LessEqual,
    GreaterEqual,

    LeftParen,
    RightParen,
    LeftBrace,
    RightBrace,
    LeftSquare,
    RightSquare,

    Comma,
    Colon,
    Arrow,

    NewLine,
    EOF,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub token_type: TokenType,
    pub span: Span,
}

impl Token {
    pub fn is_keyword(&self, keyword: Keyword) -> bool {
        self.token_type == TokenType::Keyword(keyword)
    }
}

/// Converts `text` into tokens, always terminated by [`TokenType::EOF`].
/// Stops at the first lexical error.
pub fn tokenize(source_name: &str, text: &str) -> Result<Vec<Token>> {
    let mut lexer = Lexer::new(Source::new(source_name, text));
    let mut tokens = Vec::new();

    while let Some(c) = lexer.current {
        let token = match c {
            ' ' | '\t' | '\r' => {
                lexer.advance();
                continue;
            }
            ';' | '\n' => lexer.single(TokenType::NewLine),
            '+' => lexer.single(TokenType::Plus),
            '-' => lexer.single(TokenType::Minus),
            '*' => lexer.single(TokenType::Star),
            '/' => lexer.single(TokenType::Slash),
            '^' => lexer.single(TokenType::Caret),
            '(' => lexer.single(TokenType::LeftParen),
            ')' => lexer.single(TokenType::RightParen),
            '{' => lexer.single(TokenType::LeftBrace),
            '}' => lexer.single(TokenType::RightBrace),
            '[' => lexer.single(TokenType::LeftSquare),
            ']' => lexer.single(TokenType::RightSquare),
            ',' => lexer.single(TokenType::Comma),
            ':' => lexer.single(TokenType::Colon),
            '"' => lexer.make_string(),
            '!' => lexer.make_not_equals(),
            '=' => Ok(lexer.make_equals_or_arrow()),
            '<' => Ok(lexer.make_comparison(TokenType::Less, TokenType::LessEqual)),
            '>' => Ok(lexer.make_comparison(TokenType::Greater, TokenType::GreaterEqual)),
            c if c.is_ascii_digit() => lexer.make_number(),
            c if c.is_ascii_alphabetic() => Ok(lexer.make_identifier()),
            c => lexer.illegal_character(c),
        };

        match token {
            Ok(token) => tokens.push(token),
            Err(err) => {
                debug!("{} at offset {}", err, lexer.pos.offset);
                return Err(err);
            }
        }
    }

    let end = lexer.pos.clone();
    tokens.push(Token {
        token_type: TokenType::EOF,
        span: Span::new(end.clone(), end.next_column()),
    });

    debug!("tokenized {} into {} tokens", source_name, tokens.len());
    Ok(tokens)
}

struct Lexer {
    source: Rc<Source>,
    pos: Position,
    current: Option<char>,
}

impl Lexer {
    fn new(source: Rc<Source>) -> Lexer {
        let current = source.text.chars().next();
        Lexer {
            pos: Position::start_of(Rc::clone(&source)),
            source,
            current,
        }
    }

    fn advance(&mut self) {
        if let Some(c) = self.current {
            self.pos.advance(c);
        }
        self.current = self.source.text[self.pos.offset..].chars().next();
    }

    fn token_from(&self, token_type: TokenType, start: Position) -> Token {
        Token {
            token_type,
            span: Span::new(start, self.pos.clone()),
        }
    }

    fn single(&mut self, token_type: TokenType) -> Result<Token> {
        let start = self.pos.clone();
        self.advance();
        Ok(self.token_from(token_type, start))
    }

    fn illegal_character(&mut self, c: char) -> Result<Token> {
        let start = self.pos.clone();
        self.advance();
        Err(Error::IllegalCharacter {
            span: Span::new(start, self.pos.clone()),
            details: format!("'{}'", c),
        })
    }

    /// Digits with at most one `.`; a second `.` ends the literal.
    fn make_number(&mut self) -> Result<Token> {
        let start = self.pos.clone();
        let mut literal = String::new();
        let mut seen_dot = false;

        while let Some(c) = self.current {
            if c == '.' {
                if seen_dot {
                    break;
                }
                seen_dot = true;
            } else if !c.is_ascii_digit() {
                break;
            }
            literal.push(c);
            self.advance();
        }

        let token_type = if seen_dot {
            TokenType::Float(literal.parse()?)
        } else {
            match literal.parse() {
                Ok(n) => TokenType::Int(n),
                Err(_) => TokenType::Float(literal.parse()?),
            }
        };

        Ok(self.token_from(token_type, start))
    }

    fn make_string(&mut self) -> Result<Token> {
        let start = self.pos.clone();
        let mut value = String::new();
        let mut escaped = false;
        self.advance();

        loop {
            match self.current {
                None => {
                    return Err(Error::ExpectedCharacter {
                        span: Span::new(start, self.pos.next_column()),
                        details: "'\"' (to close string)".to_string(),
                    });
                }
                Some(c) if escaped => {
                    value.push(match c {
                        'n' => '\n',
                        't' => '\t',
                        other => other,
                    });
                    escaped = false;
                }
                Some('\\') => escaped = true,
                Some('"') => {
                    self.advance();
                    break;
                }
                Some(c) => value.push(c),
            }
            self.advance();
        }

        Ok(self.token_from(TokenType::String(value), start))
    }

    /// Letters, digits, `_` and `.`; folded to lowercase.
    fn make_identifier(&mut self) -> Token {
        let start = self.pos.clone();
        let mut word = String::new();

        while let Some(c) = self.current {
            if !(c.is_ascii_alphanumeric() || c == '_' || c == '.') {
                break;
            }
            word.push(c.to_ascii_lowercase());
            self.advance();
        }

        let token_type = match Keyword::from_word(&word) {
            Some(keyword) => TokenType::Keyword(keyword),
            None => TokenType::Identifier(word),
        };
        self.token_from(token_type, start)
    }

    fn make_not_equals(&mut self) -> Result<Token> {
        let start = self.pos.clone();
        self.advance();

        if self.current == Some('=') {
            self.advance();
            return Ok(self.token_from(TokenType::BangEqual, start));
        }

        self.advance();
        Err(Error::ExpectedCharacter {
            span: Span::new(start, self.pos.clone()),
            details: "'=' (after '!')".to_string(),
        })
    }

    fn make_equals_or_arrow(&mut self) -> Token {
        let start = self.pos.clone();
        self.advance();

        let token_type = match self.current {
            Some('=') => TokenType::EqualEqual,
            Some('>') => TokenType::Arrow,
            _ => return self.token_from(TokenType::Equal, start),
        };
        self.advance();
        self.token_from(token_type, start)
    }

    fn make_comparison(&mut self, plain: TokenType, with_equals: TokenType) -> Token {
        let start = self.pos.clone();
        self.advance();

        if self.current == Some('=') {
            self.advance();
            return self.token_from(with_equals, start);
        }
        self.token_from(plain, start)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn types(text: &str) -> Result<Vec<TokenType>> {
        Ok(tokenize("<test>", text)?
            .into_iter()
            .map(|t| t.token_type)
            .collect())
    }

    #[test]
    fn test_numbers() -> Result<()> {
        assert_eq!(
            types("42 3.25")?,
            vec![TokenType::Int(42), TokenType::Float(3.25), TokenType::EOF]
        );
        Ok(())
    }

    #[test]
    fn test_second_dot_is_illegal() {
        let err = tokenize("<test>", "1.2.3").unwrap_err();
        match err {
            Error::IllegalCharacter { span, details } => {
                assert_eq!(details, "'.'");
                assert_eq!(span.start.column, 3);
            }
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[test]
    fn test_identifiers_fold_case_and_allow_dots() -> Result<()> {
        assert_eq!(
            types("Random.Num FOO_1")?,
            vec![
                TokenType::Identifier("random.num".to_string()),
                TokenType::Identifier("foo_1".to_string()),
                TokenType::EOF
            ]
        );
        Ok(())
    }

    #[test]
    fn test_keywords() -> Result<()> {
        assert_eq!(
            types("LET const elif")?,
            vec![
                TokenType::Keyword(Keyword::Let),
                TokenType::Keyword(Keyword::Const),
                TokenType::Keyword(Keyword::Elif),
                TokenType::EOF
            ]
        );
        Ok(())
    }

    #[test]
    fn test_string_escapes() -> Result<()> {
        assert_eq!(
            types(r#""a\nb\t\"c\q""#)?,
            vec![
                TokenType::String("a\nb\t\"cq".to_string()),
                TokenType::EOF
            ]
        );
        Ok(())
    }

    #[test]
    fn test_unterminated_string() {
        let err = tokenize("<test>", "\"abc").unwrap_err();
        assert!(matches!(err, Error::ExpectedCharacter { .. }));
    }

    #[test]
    fn test_operators() -> Result<()> {
        assert_eq!(
            types("== != <= >= => < > = ^ :")?,
            vec![
                TokenType::EqualEqual,
                TokenType::BangEqual,
                TokenType::LessEqual,
                TokenType::GreaterEqual,
                TokenType::Arrow,
                TokenType::Less,
                TokenType::Greater,
                TokenType::Equal,
                TokenType::Caret,
                TokenType::Colon,
                TokenType::EOF
            ]
        );
        Ok(())
    }

    #[test]
    fn test_semicolon_and_newline_separate_statements() -> Result<()> {
        assert_eq!(
            types("a;b\nc")?,
            vec![
                TokenType::Identifier("a".to_string()),
                TokenType::NewLine,
                TokenType::Identifier("b".to_string()),
                TokenType::NewLine,
                TokenType::Identifier("c".to_string()),
                TokenType::EOF
            ]
        );
        Ok(())
    }

    #[test]
    fn test_bang_without_equals() {
        let err = tokenize("<test>", "!x").unwrap_err();
        assert!(matches!(err, Error::ExpectedCharacter { .. }));
    }

    #[test]
    fn test_illegal_character_position() {
        let err = tokenize("<test>", "let x = 1\nx @ 2").unwrap_err();
        match err {
            Error::IllegalCharacter { span, details } => {
                assert_eq!(details, "'@'");
                assert_eq!(span.start.offset, 12);
                assert_eq!(span.start.line, 1);
                assert_eq!(span.start.column, 2);
                assert_eq!(span.end.offset, 13);
            }
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[test]
    fn test_token_spans() -> Result<()> {
        let tokens = tokenize("<test>", "ab <= 7")?;
        assert_eq!(tokens[1].span.start.column, 3);
        assert_eq!(tokens[1].span.end.column, 5);
        assert_eq!(tokens[2].span.start.offset, 6);
        Ok(())
    }

    #[test]
    fn test_tokenizing_is_deterministic() -> Result<()> {
        let text = "func f(a, b): a ^ b }\nfor i = 1 to 3 { write(f(i, 2)) }";
        assert_eq!(tokenize("<test>", text)?, tokenize("<test>", text)?);
        Ok(())
    }
}
