use std::rc::Rc;

/// A named piece of source text. Shared by every position that points into it.
#[derive(Debug, PartialEq, Eq)]
pub struct Source {
    pub name: String,
    pub text: String,
}

impl Source {
    pub fn new(name: &str, text: &str) -> Rc<Source> {
        Rc::new(Source {
            name: name.to_string(),
            text: text.to_string(),
        })
    }
}

/// A location in a [`Source`]. `offset` is a byte offset, `line` and `column`
/// are zero-based and count newlines and characters consumed so far.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Position {
    pub offset: usize,
    pub line: usize,
    pub column: usize,
    pub source: Rc<Source>,
}

impl Position {
    pub fn start_of(source: Rc<Source>) -> Position {
        Position {
            offset: 0,
            line: 0,
            column: 0,
            source,
        }
    }

    /// Steps past `current`, the character under this position.
    pub fn advance(&mut self, current: char) {
        self.offset += current.len_utf8();
        self.column += 1;

        if current == '\n' {
            self.line += 1;
            self.column = 0;
        }
    }

    /// The position one column to the right, used to give zero-width tokens
    /// (end of input) a visible extent.
    pub fn next_column(&self) -> Position {
        Position {
            column: self.column + 1,
            ..self.clone()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Span {
    pub start: Position,
    pub end: Position,
}

impl Span {
    pub fn new(start: Position, end: Position) -> Span {
        Span { start, end }
    }

    /// Covers from the start of `self` to the end of `other`.
    pub fn to(&self, other: &Span) -> Span {
        Span {
            start: self.start.clone(),
            end: other.end.clone(),
        }
    }

    pub fn source_name(&self) -> &str {
        &self.start.source.name
    }
}
