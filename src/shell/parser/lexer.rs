use std::fmt;
use std::iter::Peekable;
use std::str::Chars;

use thiserror::Error;

/// 单个 word 默认允许的最大字符数
pub const DEFAULT_MAX_TOKEN_LEN: usize = 254;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Word,
    InputRedirect,  // <
    OutputRedirect, // >
    Pipe,           // |
    Background,     // &
    Semicolon,      // ;
    LeftParen,      // (
    RightParen,     // )
}

impl TokenKind {
    fn from_operator(c: char) -> Option<Self> {
        match c {
            '<' => Some(TokenKind::InputRedirect),
            '>' => Some(TokenKind::OutputRedirect),
            '|' => Some(TokenKind::Pipe),
            '&' => Some(TokenKind::Background),
            ';' => Some(TokenKind::Semicolon),
            '(' => Some(TokenKind::LeftParen),
            ')' => Some(TokenKind::RightParen),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub text: String,
}

impl Token {
    pub fn word(text: impl Into<String>) -> Self {
        Self {
            kind: TokenKind::Word,
            text: text.into(),
        }
    }

    pub fn is_word(&self) -> bool {
        self.kind == TokenKind::Word
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum LexError {
    #[error("Token too long: word at position {position} exceeds {limit} characters.")]
    TokenTooLong { position: usize, limit: usize },
}

fn is_whitespace(c: char) -> bool {
    c == ' ' || c == '\t'
}

fn is_operator(c: char) -> bool {
    TokenKind::from_operator(c).is_some()
}

pub struct Lexer<'a> {
    input: Peekable<Chars<'a>>,
    position: usize,
    max_token_len: Option<usize>,
}

impl<'a> Lexer<'a> {
    pub fn new(input: &'a str) -> Self {
        Self {
            input: input.chars().peekable(),
            position: 0,
            max_token_len: Some(DEFAULT_MAX_TOKEN_LEN),
        }
    }

    /// `None` 表示不限制 word 长度
    pub fn with_max_token_len(mut self, limit: Option<usize>) -> Self {
        self.max_token_len = limit;
        self
    }

    pub fn tokenize(mut self) -> Result<Vec<Token>, LexError> {
        let mut tokens = Vec::new();
        while let Some(token) = self.next_token()? {
            tokens.push(token);
        }
        Ok(tokens)
    }

    pub fn next_token(&mut self) -> Result<Option<Token>, LexError> {
        self.skip_whitespace();

        let Some(c) = self.peek_char() else {
            return Ok(None);
        };

        if let Some(kind) = TokenKind::from_operator(c) {
            self.read_char();
            return Ok(Some(Token {
                kind,
                text: c.to_string(),
            }));
        }

        let word = if c == '"' {
            self.read_quoted_word()?
        } else {
            self.read_word()?
        };
        Ok(Some(Token::word(word)))
    }

    fn read_char(&mut self) -> Option<char> {
        let c = self.input.next();
        if c.is_some() {
            self.position += 1;
        }
        c
    }

    fn peek_char(&mut self) -> Option<char> {
        self.input.peek().copied()
    }

    fn skip_whitespace(&mut self) {
        while let Some(c) = self.peek_char() {
            if !is_whitespace(c) {
                break;
            }
            self.read_char();
        }
    }

    fn read_word(&mut self) -> Result<String, LexError> {
        let start = self.position;
        let mut word = String::new();
        let mut len = 0;

        while let Some(c) = self.peek_char() {
            if is_whitespace(c) || is_operator(c) {
                break;
            }
            self.read_char();
            self.push_checked(&mut word, &mut len, c, start)?;
        }

        Ok(word)
    }

    // 引号内原样读取直到闭合引号或行尾，引号本身不计入 word
    fn read_quoted_word(&mut self) -> Result<String, LexError> {
        let start = self.position;
        self.read_char();
        let mut word = String::new();
        let mut len = 0;

        while let Some(c) = self.read_char() {
            if c == '"' {
                break;
            }
            self.push_checked(&mut word, &mut len, c, start)?;
        }

        Ok(word)
    }

    // len 是 word 当前的字符数（不是字节数）
    fn push_checked(
        &self,
        word: &mut String,
        len: &mut usize,
        c: char,
        start: usize,
    ) -> Result<(), LexError> {
        word.push(c);
        *len += 1;
        match self.max_token_len {
            Some(limit) if *len > limit => Err(LexError::TokenTooLong {
                position: start,
                limit,
            }),
            _ => Ok(()),
        }
    }
}

/// 使用默认长度限制切分一行输入
#[cfg(test)]
pub fn tokenize(line: &str) -> Result<Vec<Token>, LexError> {
    Lexer::new(line).tokenize()
}
