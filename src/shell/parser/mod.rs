mod command;
mod lexer;

pub use command::{split_units, CommandUnit, ParsedCommand, Redirect};
pub use lexer::{LexError, Lexer, Token, DEFAULT_MAX_TOKEN_LEN};
#[cfg(test)]
pub use lexer::tokenize;
