use std::{fmt, rc::Rc};
use thiserror::Error;

use crate::{environment::Context, position::Span, snippet, tokenizer::Token};

#[derive(Error, Debug)]
pub enum Error {
    #[error("io error: {0}")]
    IO(#[from] std::io::Error),
    #[error("parse float error: {0}")]
    ParseFloat(#[from] std::num::ParseFloatError),
    #[error("Illegal Character: {details}")]
    IllegalCharacter { span: Span, details: String },
    #[error("Expected character: {details}")]
    ExpectedCharacter { span: Span, details: String },
    #[error("Invalid Syntax: {details}")]
    InvalidSyntax { span: Span, details: String },
    #[error("{0}")]
    Runtime(Box<RuntimeError>),
    #[error("exit requested with code {code}")]
    Exit { code: i32 },
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// The full user-facing rendering: error line, locator and source arrows.
    /// Runtime errors are prefixed with their call traceback.
    pub fn report(&self) -> String {
        match self {
            Error::IllegalCharacter { span, .. }
            | Error::ExpectedCharacter { span, .. }
            | Error::InvalidSyntax { span, .. } => format!(
                "{}\nFile {}, line {}\n\n{}",
                self,
                span.source_name(),
                span.start.line + 1,
                snippet::render(span)
            ),
            Error::Runtime(err) => err.report(),
            _ => self.to_string(),
        }
    }

    pub fn span(&self) -> Option<&Span> {
        match self {
            Error::IllegalCharacter { span, .. }
            | Error::ExpectedCharacter { span, .. }
            | Error::InvalidSyntax { span, .. } => Some(span),
            Error::Runtime(err) => Some(&err.span),
            _ => None,
        }
    }

    pub fn runtime_kind(&self) -> Option<RuntimeErrorKind> {
        match self {
            Error::Runtime(err) => Some(err.kind),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuntimeErrorKind {
    IllegalOperation,
    DivisionByZero,
    IndexOutOfRange,
    UndefinedVariable,
    ArgumentCount,
    ConstantReassignment,
    TypeMismatch,
    InvalidArgument,
    InvalidMethod,
}

impl RuntimeErrorKind {
    pub fn name(self) -> &'static str {
        match self {
            RuntimeErrorKind::IllegalOperation => "Illegal operation",
            RuntimeErrorKind::DivisionByZero => "Division by zero",
            RuntimeErrorKind::IndexOutOfRange => "Index out of range",
            RuntimeErrorKind::UndefinedVariable => "Undefined variable",
            RuntimeErrorKind::ArgumentCount => "Argument count mismatch",
            RuntimeErrorKind::ConstantReassignment => "Constant reassignment",
            RuntimeErrorKind::TypeMismatch => "Type mismatch",
            RuntimeErrorKind::InvalidArgument => "Invalid argument",
            RuntimeErrorKind::InvalidMethod => "Invalid method",
        }
    }
}

impl fmt::Display for RuntimeErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// An evaluation failure. Keeps the context that was active when it happened
/// so the call chain can be walked back for the traceback.
#[derive(Debug)]
pub struct RuntimeError {
    pub kind: RuntimeErrorKind,
    pub details: String,
    pub span: Span,
    pub context: Rc<Context>,
}

impl fmt::Display for RuntimeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.details)
    }
}

impl RuntimeError {
    pub fn traceback(&self) -> String {
        let mut frames = Vec::new();
        let mut pos = Some(&self.span.start);
        let mut ctx = Some(&self.context);

        while let Some(context) = ctx {
            if let Some(pos) = pos {
                frames.push(format!(
                    "  File {}, line {}, in {}",
                    pos.source.name,
                    pos.line + 1,
                    context.display_name
                ));
            }
            pos = context.parent_entry_pos.as_ref();
            ctx = context.parent.as_ref();
        }

        frames.reverse();
        format!("Traceback (most recent call last):\n{}\n", frames.join("\n"))
    }

    pub fn report(&self) -> String {
        format!(
            "{}{}\n\n{}",
            self.traceback(),
            self,
            snippet::render(&self.span)
        )
    }
}

pub fn runtime_error<T>(
    kind: RuntimeErrorKind,
    details: impl Into<String>,
    span: &Span,
    context: &Rc<Context>,
) -> Result<T> {
    Err(Error::Runtime(Box::new(RuntimeError {
        kind,
        details: details.into(),
        span: span.clone(),
        context: Rc::clone(context),
    })))
}

pub fn parser_error<T>(details: impl Into<String>, token: &Token) -> Result<T> {
    Err(Error::InvalidSyntax {
        span: token.span.clone(),
        details: details.into(),
    })
}
