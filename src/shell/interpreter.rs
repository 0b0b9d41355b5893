use log::{debug, warn};
use std::path::Path;

use crate::shell::builtins::{self, Builtin, BuiltinError};
use crate::shell::executor::{Executor, UnitStatus};
use crate::shell::parser::{Lexer, Token};
use crate::utils::theme::Theme;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Exit,
}

/// 一行输入的分发：内建命令，或者 Lexer → Executor。
///
/// 不依赖终端，交互循环和脚本模式共用。
pub struct Interpreter {
    pub theme: Theme,
    executor: Executor,
    max_token_len: Option<usize>,
    prev_line: Option<String>,
    last_status: i32,
}

impl Interpreter {
    pub fn new(theme: Theme, max_token_len: Option<usize>) -> Self {
        Self {
            theme,
            executor: Executor::new(),
            max_token_len,
            prev_line: None,
            last_status: 0,
        }
    }

    /// 最后一个命令单元的退出码；后台单元记为 0，失败的单元记为 1
    pub fn last_status(&self) -> i32 {
        self.last_status
    }

    pub fn handle_input(&mut self, line: &str) -> Flow {
        let line = line.trim();
        if line.is_empty() {
            return Flow::Continue;
        }

        let Some(tokens) = self.tokenize(line) else {
            return Flow::Continue;
        };

        // 内建命令占用整行，不参与 `;` / `|`
        if let Some(builtin) = tokens.first().and_then(Builtin::from_token) {
            debug!("执行内建命令: {:?}", builtin);
            return self.run_builtin(builtin, &tokens[1..]);
        }

        self.execute_tokens(&tokens);
        self.prev_line = Some(line.to_string());
        Flow::Continue
    }

    fn tokenize(&self, line: &str) -> Option<Vec<Token>> {
        match Lexer::new(line)
            .with_max_token_len(self.max_token_len)
            .tokenize()
        {
            Ok(tokens) => Some(tokens),
            Err(e) => {
                warn!("词法分析失败: {}", e);
                eprintln!("{}", (self.theme.error_style)(&e.to_string()));
                None
            }
        }
    }

    fn execute_tokens(&mut self, tokens: &[Token]) {
        debug!("执行命令行: {} 个 token", tokens.len());
        if let Some(last) = self.executor.execute(tokens).last() {
            self.last_status = match last {
                Ok(UnitStatus::Exited(code)) => *code,
                Ok(UnitStatus::Background(_)) => 0,
                Err(_) => 1,
            };
        }
    }

    // prev / source 的入口：分词后直接交给执行器，不再匹配内建命令
    fn execute_line(&mut self, line: &str) {
        if let Some(tokens) = self.tokenize(line) {
            self.execute_tokens(&tokens);
        }
    }

    fn run_builtin(&mut self, builtin: Builtin, args: &[Token]) -> Flow {
        let result = match builtin {
            Builtin::Exit => {
                println!("{}", self.theme.exit_message);
                return Flow::Exit;
            }
            Builtin::Help => {
                println!("{}", builtins::HELP_TEXT);
                Ok(())
            }
            Builtin::Cd => builtins::builtin_cd(args),
            Builtin::Prev => self.builtin_prev(),
            Builtin::Source => self.builtin_source(args),
            Builtin::Jobs => {
                for job in self.executor.jobs() {
                    println!("{}", job);
                }
                Ok(())
            }
        };

        if let Err(e) = result {
            warn!("内建命令失败: {}", e);
            println!("{}", (self.theme.error_style)(&e.to_string()));
        }
        Flow::Continue
    }

    fn builtin_prev(&mut self) -> Result<(), BuiltinError> {
        let line = self
            .prev_line
            .clone()
            .ok_or(BuiltinError::NoPreviousCommand)?;
        println!("{}", line);
        self.execute_line(&line);
        Ok(())
    }

    fn builtin_source(&mut self, args: &[Token]) -> Result<(), BuiltinError> {
        let path = builtins::source_path(args)?;
        for line in builtins::read_source(Path::new(path))? {
            let line = line.trim();
            if !line.is_empty() {
                self.execute_line(line);
            }
        }
        Ok(())
    }

    /// 回收并打印已结束的后台任务，提示符出现前调用
    pub fn report_finished_jobs(&mut self) {
        for job in self.executor.reap_background() {
            println!("{}", (self.theme.notice_style)(&job.to_string()));
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::fs;
    use std::path::PathBuf;

    use super::*;
    use crate::shell::parser::DEFAULT_MAX_TOKEN_LEN;

    fn scratch_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("minish-{}-line-{}", std::process::id(), name));
        let _ = fs::remove_dir_all(&dir);
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    fn interpreter() -> Interpreter {
        Interpreter::new(Theme::load_theme("plain"), Some(DEFAULT_MAX_TOKEN_LEN))
    }

    fn quoted(path: &Path) -> String {
        format!("\"{}\"", path.display())
    }

    #[test]
    fn test_prev_reruns_last_executed_line() {
        let dir = scratch_dir("prev");
        let out = dir.join("out.txt");
        let mut interpreter = interpreter();

        let line = format!("echo again > {}", quoted(&out));
        assert_eq!(interpreter.handle_input(&line), Flow::Continue);
        assert_eq!(fs::read_to_string(&out).unwrap(), "again\n");

        // 内建命令不会成为 prev 的目标
        interpreter.handle_input("help");
        fs::remove_file(&out).unwrap();

        interpreter.handle_input("prev");
        assert_eq!(fs::read_to_string(&out).unwrap(), "again\n");
        assert_eq!(interpreter.prev_line.as_deref(), Some(line.as_str()));
    }

    #[test]
    fn test_prev_without_history() {
        let mut interpreter = interpreter();
        interpreter.handle_input("help");
        assert!(matches!(
            interpreter.builtin_prev(),
            Err(BuiltinError::NoPreviousCommand)
        ));
        assert_eq!(interpreter.handle_input("prev"), Flow::Continue);
    }

    #[test]
    fn test_source_runs_each_line() {
        let dir = scratch_dir("source");
        let first = dir.join("first.txt");
        let second = dir.join("second.txt");
        let script = dir.join("script.sh");
        fs::write(
            &script,
            format!(
                "echo one > {}\n\n   \nprintf two | cat > {}\n",
                quoted(&first),
                quoted(&second)
            ),
        )
        .unwrap();

        let mut interpreter = interpreter();
        interpreter.handle_input(&format!("source {}", quoted(&script)));
        assert_eq!(fs::read_to_string(&first).unwrap(), "one\n");
        assert_eq!(fs::read_to_string(&second).unwrap(), "two");
        assert_eq!(interpreter.last_status(), 0);
        // source 本身是内建命令，不记入 prev
        assert!(interpreter.prev_line.is_none());
    }

    #[test]
    fn test_source_missing_file() {
        let dir = scratch_dir("source-missing");
        let mut interpreter = interpreter();
        let args = vec![Token::word(dir.join("missing.sh").display().to_string())];
        assert!(matches!(
            interpreter.builtin_source(&args),
            Err(BuiltinError::SourceNotFound { .. })
        ));
        assert!(matches!(
            interpreter.builtin_source(&[]),
            Err(BuiltinError::SourceMissingOperand)
        ));
    }

    #[test]
    fn test_token_too_long_skips_whole_line() {
        let dir = scratch_dir("too-long");
        let out = dir.join("out.txt");
        let mut interpreter = Interpreter::new(Theme::load_theme("plain"), Some(200));

        let line = format!("echo {} ; echo ran > {}", "x".repeat(300), quoted(&out));
        interpreter.handle_input(&line);
        assert!(!out.exists());
        assert!(interpreter.prev_line.is_none());

        // 同一个解释器之后仍然可用
        interpreter.handle_input(&format!("echo ran > {}", quoted(&out)));
        assert_eq!(fs::read_to_string(&out).unwrap(), "ran\n");
    }

    #[test]
    fn test_builtin_consumes_whole_line() {
        let dir = scratch_dir("builtin-line");
        let out = dir.join("out.txt");
        let mut interpreter = interpreter();

        interpreter.handle_input(&format!("help ; echo no > {}", quoted(&out)));
        assert!(!out.exists());
        assert!(interpreter.prev_line.is_none());
    }

    #[test]
    fn test_exit_and_status() {
        let mut interpreter = interpreter();
        assert_eq!(interpreter.handle_input("   "), Flow::Continue);
        interpreter.handle_input("true ; false");
        assert_eq!(interpreter.last_status(), 1);
        interpreter.handle_input("false ; true");
        assert_eq!(interpreter.last_status(), 0);
        assert_eq!(interpreter.handle_input("exit"), Flow::Exit);
    }
}
