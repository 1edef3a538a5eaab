pub mod cli;
pub mod environment;
pub mod error;
pub mod parser;
pub mod position;
pub mod repl;
pub mod runtime;
pub mod snippet;
pub mod stdlib;
pub mod tokenizer;
pub mod value;
