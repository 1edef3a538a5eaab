use nu_ansi_term::{Color, Style};
use reedline::{
    Highlighter, Prompt, PromptEditMode, PromptHistorySearch, PromptHistorySearchStatus,
    StyledText, ValidationResult, Validator,
};
use std::borrow::Cow;

use crate::{
    error::Error,
    stdlib::Registry,
    tokenizer::{tokenize, Token, TokenType},
    value::Value,
};

/// Source name given to every line typed into the shell.
pub const STDIN_SOURCE: &str = "<stdin>";

#[derive(Clone)]
pub struct REPLPrompt;

impl Prompt for REPLPrompt {
    fn render_prompt_left(&self) -> Cow<str> {
        Cow::Borrowed("fpp")
    }

    fn render_prompt_right(&self) -> Cow<str> {
        Cow::Borrowed("")
    }

    fn render_prompt_indicator(&self, _edit_mode: PromptEditMode) -> Cow<str> {
        Cow::Borrowed(" > ")
    }

    fn render_prompt_multiline_indicator(&self) -> Cow<str> {
        Cow::Borrowed("  ... ")
    }

    fn render_prompt_history_search_indicator(
        &self,
        history_search: PromptHistorySearch,
    ) -> Cow<str> {
        let prefix = match history_search.status {
            PromptHistorySearchStatus::Passing => "",
            PromptHistorySearchStatus::Failing => "failing ",
        };
        Cow::Owned(format!(
            "({}reverse-search: {}) ",
            prefix, history_search.term
        ))
    }
}

/// Keeps reading lines while a string or a `{ ( [` group is still open.
pub struct REPLValidator;

impl Validator for REPLValidator {
    fn validate(&self, line: &str) -> ValidationResult {
        if line.trim().is_empty() {
            return ValidationResult::Complete;
        }

        let tokens = match tokenize(STDIN_SOURCE, line) {
            Ok(tokens) => tokens,
            Err(Error::ExpectedCharacter { details, .. }) if details.contains("close string") => {
                return ValidationResult::Incomplete
            }
            // Let the evaluator report it
            Err(_) => return ValidationResult::Complete,
        };

        match open_groups(&tokens) {
            Some(0) | None => ValidationResult::Complete,
            Some(_) => ValidationResult::Incomplete,
        }
    }
}

/// Number of unclosed groups, or `None` when a closer does not match. A `:`
/// opens a function body that `}` closes.
fn open_groups(tokens: &[Token]) -> Option<usize> {
    let mut open = Vec::new();

    for token in tokens {
        let closer = match token.token_type {
            TokenType::LeftBrace | TokenType::Colon => {
                open.push('}');
                continue;
            }
            TokenType::LeftParen => {
                open.push(')');
                continue;
            }
            TokenType::LeftSquare => {
                open.push(']');
                continue;
            }
            TokenType::RightBrace => '}',
            TokenType::RightParen => ')',
            TokenType::RightSquare => ']',
            _ => continue,
        };

        if open.pop() != Some(closer) {
            return None;
        }
    }

    Some(open.len())
}

pub static KEYWORD_COLOR: Color = Color::LightBlue;
pub static LITERAL_COLOR: Color = Color::Yellow;
pub static DEFAULT_COLOR: Color = Color::White;
pub static OPERATOR_COLOR: Color = Color::DarkGray;

fn token_color(token_type: &TokenType) -> Color {
    match token_type {
        TokenType::Keyword(_) => KEYWORD_COLOR,
        TokenType::Int(_) | TokenType::Float(_) | TokenType::String(_) => LITERAL_COLOR,
        TokenType::Identifier(_) | TokenType::NewLine | TokenType::EOF => DEFAULT_COLOR,
        _ => OPERATOR_COLOR,
    }
}

pub struct SyntaxHighlighter;

impl Highlighter for SyntaxHighlighter {
    fn highlight(&self, line: &str, _cursor: usize) -> StyledText {
        let mut styled_text = StyledText::new();

        let tokens = match tokenize(STDIN_SOURCE, line) {
            Ok(t) => t,
            Err(_) => {
                styled_text.push((Style::new().fg(DEFAULT_COLOR), line.to_string()));
                return styled_text;
            }
        };

        // Token spans are byte offsets into `line`
        let mut printed = 0;
        for token in tokens {
            if token.token_type == TokenType::EOF {
                break;
            }

            let (start, end) = (token.span.start.offset, token.span.end.offset);
            if start > printed {
                styled_text.push((
                    Style::new().fg(DEFAULT_COLOR),
                    line[printed..start].to_string(),
                ));
            }
            styled_text.push((
                Style::new().fg(token_color(&token.token_type)),
                line[start..end].to_string(),
            ));
            printed = end;
        }

        if printed < line.len() {
            styled_text.push((Style::new().fg(DEFAULT_COLOR), line[printed..].to_string()));
        }

        styled_text
    }
}

/// Lines the shell handles itself instead of evaluating.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetaCommand {
    Exit,
    Help,
    ReleaseNotes,
}

impl MetaCommand {
    pub fn parse(line: &str) -> Option<MetaCommand> {
        match line.trim() {
            "exit" => Some(MetaCommand::Exit),
            "help" => Some(MetaCommand::Help),
            "release notes" => Some(MetaCommand::ReleaseNotes),
            _ => None,
        }
    }
}

pub fn is_confirmation(answer: &str) -> bool {
    matches!(
        answer.trim().to_lowercase().as_str(),
        "yes" | "y" | "yeah"
    )
}

pub fn banner() -> String {
    format!(
        "Welcome to F++ {}\nType 'exit' to exit and 'help' to see commands",
        env!("CARGO_PKG_VERSION")
    )
}

pub fn help_text(registry: &Registry) -> String {
    let builtins: Vec<_> = registry.names().collect();
    format!(
        "Type 'exit' to exit\n\
         Type 'release notes' to see release notes\n\
         Type 'help' to see help\n\
         Built-in functions: {}",
        builtins.join(", ")
    )
}

pub fn release_notes() -> String {
    format!(
        "Current version is {}\n\
         - Lexical closures for functions\n\
         - List methods add, remove, get and with\n\
         - Tracebacks for errors inside calls",
        env!("CARGO_PKG_VERSION")
    )
}

/// What the shell echoes for a program value: a lone statement in its quoted
/// form, several statements comma separated, nothing for an empty line.
pub fn describe_result(value: &Value) -> Option<String> {
    match value {
        Value::List(items) => match items.borrow().as_slice() {
            [] => None,
            [single] => Some(format!("{:?}", single)),
            many => Some(
                many.iter()
                    .map(|v| format!("{:?}", v))
                    .collect::<Vec<_>>()
                    .join(", "),
            ),
        },
        other => Some(format!("{:?}", other)),
    }
}
