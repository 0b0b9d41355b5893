use std::fmt;

use super::lexer::{Token, TokenKind};
use crate::shell::error::ShellError;

/// 命令单元的结束方式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Terminator {
    /// `;` 或行尾：等待子进程结束后再继续
    Sequential,
    /// `&`：不等待，交给后台任务管理
    Background,
}

/// 两个分隔符之间的一段 token
#[derive(Debug, Clone, Copy)]
pub struct CommandUnit<'t> {
    pub tokens: &'t [Token],
    pub terminator: Terminator,
}

/// 按 `;` 与 `&` 切分出命令单元，空单元直接跳过
pub fn split_units(tokens: &[Token]) -> Vec<CommandUnit<'_>> {
    let mut units = Vec::new();
    let mut start = 0;

    for (i, token) in tokens.iter().enumerate() {
        let terminator = match token.kind {
            TokenKind::Semicolon => Terminator::Sequential,
            TokenKind::Background => Terminator::Background,
            _ => continue,
        };
        if i > start {
            units.push(CommandUnit {
                tokens: &tokens[start..i],
                terminator,
            });
        }
        start = i + 1;
    }

    if start < tokens.len() {
        units.push(CommandUnit {
            tokens: &tokens[start..],
            terminator: Terminator::Sequential,
        });
    }
    units
}

/// 重定向在命令单元中出现的先后
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Redirect {
    Input,
    Output,
}

/// 单个命令单元解析后的配置，每个单元都重新生成
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedCommand {
    /// 去掉重定向与管道符后的参数向量
    pub argv: Vec<String>,
    pub input_path: Option<String>,
    pub output_path: Option<String>,
    /// 打开重定向文件的顺序，与 token 顺序一致
    pub redirects: Vec<Redirect>,
    /// 每个 `|` 之后的命令在 argv 中的起始位置
    pub pipe_splits: Vec<usize>,
    pub background: bool,
}

impl ParsedCommand {
    pub fn parse(unit: &CommandUnit<'_>) -> Result<Self, ShellError> {
        let mut command = ParsedCommand {
            background: unit.terminator == Terminator::Background,
            ..Default::default()
        };

        let mut tokens = unit.tokens.iter();
        while let Some(token) = tokens.next() {
            match token.kind {
                TokenKind::Word => command.argv.push(token.text.clone()),
                TokenKind::InputRedirect => {
                    let path = redirect_target(tokens.next()).ok_or(ShellError::MissingInputFile)?;
                    if command.input_path.replace(path).is_some() {
                        return Err(ShellError::DuplicateInputFile);
                    }
                    command.redirects.push(Redirect::Input);
                }
                TokenKind::OutputRedirect => {
                    let path =
                        redirect_target(tokens.next()).ok_or(ShellError::MissingOutputFile)?;
                    if command.output_path.replace(path).is_some() {
                        return Err(ShellError::DuplicateOutputFile);
                    }
                    command.redirects.push(Redirect::Output);
                }
                TokenKind::Pipe => command.pipe_splits.push(command.argv.len()),
                TokenKind::LeftParen | TokenKind::RightParen => {
                    return Err(ShellError::UnsupportedToken(token.text.clone()));
                }
                // split_units 已经消费了分隔符
                TokenKind::Semicolon | TokenKind::Background => {}
            }
        }

        if command.has_pipe() && command.stages().iter().any(|stage| stage.is_empty()) {
            return Err(ShellError::EmptyPipelineStage);
        }
        Ok(command)
    }

    pub fn has_pipe(&self) -> bool {
        !self.pipe_splits.is_empty()
    }

    /// 按管道切分后的各段参数；没有管道时只有一段
    pub fn stages(&self) -> Vec<&[String]> {
        let mut stages = Vec::with_capacity(self.pipe_splits.len() + 1);
        let mut start = 0;
        for &split in &self.pipe_splits {
            stages.push(&self.argv[start..split]);
            start = split;
        }
        stages.push(&self.argv[start..]);
        stages
    }
}

impl fmt::Display for ParsedCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let stages: Vec<String> = self.stages().iter().map(|s| s.join(" ")).collect();
        write!(f, "{}", stages.join(" | "))?;
        if let Some(path) = &self.input_path {
            write!(f, " < {}", path)?;
        }
        if let Some(path) = &self.output_path {
            write!(f, " > {}", path)?;
        }
        if self.background {
            write!(f, " &")?;
        }
        Ok(())
    }
}

fn redirect_target(token: Option<&Token>) -> Option<String> {
    token.filter(|t| t.is_word()).map(|t| t.text.clone())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::shell::parser::tokenize;

    fn parse_line(line: &str) -> Vec<Result<ParsedCommand, ShellError>> {
        let tokens = tokenize(line).unwrap();
        split_units(&tokens).iter().map(ParsedCommand::parse).collect()
    }

    fn parse_one(line: &str) -> ParsedCommand {
        let mut parsed = parse_line(line);
        assert_eq!(parsed.len(), 1);
        parsed.remove(0).unwrap()
    }

    #[test]
    fn test_split_on_semicolons() {
        let tokens = tokenize("false ; echo ok;ls").unwrap();
        let units = split_units(&tokens);
        assert_eq!(units.len(), 3);
        assert_eq!(units[0].tokens.len(), 1);
        assert_eq!(units[1].tokens.len(), 2);
        assert!(units.iter().all(|u| u.terminator == Terminator::Sequential));
    }

    #[test]
    fn test_empty_units_are_skipped() {
        let tokens = tokenize(";; echo a ;  ; ").unwrap();
        let units = split_units(&tokens);
        assert_eq!(units.len(), 1);
        assert_eq!(units[0].tokens[0].text, "echo");
        assert!(split_units(&[]).is_empty());
    }

    #[test]
    fn test_background_terminator() {
        let tokens = tokenize("sleep 1 & echo now").unwrap();
        let units = split_units(&tokens);
        assert_eq!(units.len(), 2);
        assert_eq!(units[0].terminator, Terminator::Background);
        assert_eq!(units[1].terminator, Terminator::Sequential);
        assert!(ParsedCommand::parse(&units[0]).unwrap().background);
    }

    #[test]
    fn test_plain_command() {
        let command = parse_one("ls -l /tmp");
        assert_eq!(command.argv, vec!["ls", "-l", "/tmp"]);
        assert!(command.input_path.is_none());
        assert!(command.output_path.is_none());
        assert!(!command.has_pipe());
        assert_eq!(command.stages().len(), 1);
    }

    #[test]
    fn test_redirections_are_removed_from_argv() {
        let command = parse_one("sort < in.txt -r > out.txt");
        assert_eq!(command.argv, vec!["sort", "-r"]);
        assert_eq!(command.input_path.as_deref(), Some("in.txt"));
        assert_eq!(command.output_path.as_deref(), Some("out.txt"));
        assert_eq!(command.redirects, vec![Redirect::Input, Redirect::Output]);
    }

    #[test]
    fn test_redirect_order_follows_tokens() {
        let command = parse_one("echo hi > out.txt < in.txt");
        assert_eq!(command.redirects, vec![Redirect::Output, Redirect::Input]);
        assert!(parse_one("ls").redirects.is_empty());
    }

    #[test]
    fn test_pipe_split() {
        let command = parse_one("cat < in.txt | grep -v x > out.txt");
        assert_eq!(command.argv, vec!["cat", "grep", "-v", "x"]);
        assert_eq!(command.pipe_splits, vec![1]);
        let stages = command.stages();
        assert_eq!(stages[0], ["cat"]);
        assert_eq!(stages[1], ["grep", "-v", "x"]);
    }

    #[test]
    fn test_three_stage_pipeline() {
        let command = parse_one("printf abc | tr a-z A-Z | cat");
        assert_eq!(command.stages().len(), 3);
        assert_eq!(command.to_string(), "printf abc | tr a-z A-Z | cat");
    }

    #[test]
    fn test_missing_redirect_target() {
        let parsed = parse_line("cat <");
        assert!(matches!(parsed[0], Err(ShellError::MissingInputFile)));

        let parsed = parse_line("echo hi > ; echo next");
        assert!(matches!(parsed[0], Err(ShellError::MissingOutputFile)));
        assert!(parsed[1].is_ok());

        let parsed = parse_line("echo hi > | cat");
        assert!(matches!(parsed[0], Err(ShellError::MissingOutputFile)));
    }

    #[test]
    fn test_duplicate_redirect() {
        let parsed = parse_line("echo hi > a > b");
        assert!(matches!(parsed[0], Err(ShellError::DuplicateOutputFile)));
        let parsed = parse_line("cat < a < b");
        assert!(matches!(parsed[0], Err(ShellError::DuplicateInputFile)));
    }

    #[test]
    fn test_empty_pipeline_stage() {
        for line in ["| cat", "ls |", "ls | | cat"] {
            let parsed = parse_line(line);
            assert!(
                matches!(parsed[0], Err(ShellError::EmptyPipelineStage)),
                "{}",
                line
            );
        }
    }

    #[test]
    fn test_parens_are_rejected() {
        let parsed = parse_line("(ls)");
        assert!(matches!(&parsed[0], Err(ShellError::UnsupportedToken(t)) if t == "("));
    }

    #[test]
    fn test_redirect_only_unit() {
        let command = parse_one("> out.txt");
        assert!(command.argv.is_empty());
        assert_eq!(command.output_path.as_deref(), Some("out.txt"));
    }
}
