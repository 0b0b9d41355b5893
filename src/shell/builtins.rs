use std::env;
use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::Path;

use log::debug;
use thiserror::Error;

use super::parser::Token;

/// 在进入执行器之前拦截的内建命令，匹配行首的第一个 word
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Builtin {
    Cd,
    Help,
    Exit,
    Prev,
    Source,
    Jobs,
}

impl Builtin {
    pub fn from_token(token: &Token) -> Option<Self> {
        if !token.is_word() {
            return None;
        }
        match token.text.as_str() {
            "cd" => Some(Builtin::Cd),
            "help" => Some(Builtin::Help),
            "exit" => Some(Builtin::Exit),
            "prev" => Some(Builtin::Prev),
            "source" => Some(Builtin::Source),
            "jobs" => Some(Builtin::Jobs),
            _ => None,
        }
    }
}

#[derive(Debug, Error)]
pub enum BuiltinError {
    #[error("cd: missing operand")]
    CdMissingOperand,
    #[error("cd: {0}: No such file or directory")]
    CdNoSuchDirectory(String),
    #[error("source: missing file operand")]
    SourceMissingOperand,
    #[error("source: {path}: No such file or directory")]
    SourceNotFound {
        path: String,
        #[source]
        source: io::Error,
    },
    #[error("prev: no previous command")]
    NoPreviousCommand,
}

pub const HELP_TEXT: &str = "\
cd [directory]: change the current working directory of the shell to the path specified as the argument.
help: explains the built-in commands available
exit: terminates the shell program
prev: runs the previous command line again
source [file]: runs each line of the file as a command line
jobs: lists the commands running in the background";

pub fn builtin_cd(args: &[Token]) -> Result<(), BuiltinError> {
    let target = args.first().ok_or(BuiltinError::CdMissingOperand)?;
    let path = shellexpand::tilde(&target.text);
    debug!("切换目录: {}", path);
    env::set_current_dir(&*path)
        .map_err(|_| BuiltinError::CdNoSuchDirectory(target.text.clone()))
}

pub fn source_path(args: &[Token]) -> Result<&str, BuiltinError> {
    args.first()
        .map(|t| t.text.as_str())
        .ok_or(BuiltinError::SourceMissingOperand)
}

/// 读取脚本文件的所有行，去掉行尾的 `\r\n`
pub fn read_source(path: &Path) -> Result<Vec<String>, BuiltinError> {
    let not_found = |source| BuiltinError::SourceNotFound {
        path: path.display().to_string(),
        source,
    };
    let file = File::open(path).map_err(not_found)?;
    BufReader::new(file)
        .lines()
        .map(|line| line.map(|l| l.trim_end_matches('\r').to_string()))
        .collect::<Result<Vec<_>, _>>()
        .map_err(not_found)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::fs;

    use super::*;
    use crate::shell::parser::tokenize;

    #[test]
    fn test_builtin_names() {
        let tokens = tokenize("cd help exit prev source jobs ls").unwrap();
        let builtins: Vec<Option<Builtin>> = tokens.iter().map(Builtin::from_token).collect();
        assert_eq!(
            builtins,
            vec![
                Some(Builtin::Cd),
                Some(Builtin::Help),
                Some(Builtin::Exit),
                Some(Builtin::Prev),
                Some(Builtin::Source),
                Some(Builtin::Jobs),
                None,
            ]
        );
    }

    #[test]
    fn test_operator_is_never_builtin() {
        let tokens = tokenize(";").unwrap();
        assert_eq!(Builtin::from_token(&tokens[0]), None);
    }

    #[test]
    fn test_cd_errors() {
        let err = builtin_cd(&[]).unwrap_err();
        assert_eq!(err.to_string(), "cd: missing operand");

        let tokens = tokenize("/minish/definitely/not/here").unwrap();
        let err = builtin_cd(&tokens).unwrap_err();
        assert_eq!(
            err.to_string(),
            "cd: /minish/definitely/not/here: No such file or directory"
        );
    }

    #[test]
    fn test_source_operand() {
        assert_eq!(
            source_path(&[]).unwrap_err().to_string(),
            "source: missing file operand"
        );
        let tokens = tokenize("script.sh").unwrap();
        assert_eq!(source_path(&tokens).unwrap(), "script.sh");
    }

    #[test]
    fn test_read_source() {
        let dir = env::temp_dir().join(format!("minish-{}-source", std::process::id()));
        fs::create_dir_all(&dir).unwrap();
        let script = dir.join("script.sh");
        fs::write(&script, "echo one\r\necho two\n\necho three").unwrap();

        let lines = read_source(&script).unwrap();
        assert_eq!(lines, vec!["echo one", "echo two", "", "echo three"]);

        let err = read_source(&dir.join("missing.sh")).unwrap_err();
        assert!(matches!(err, BuiltinError::SourceNotFound { .. }));
        assert!(err.to_string().ends_with("missing.sh: No such file or directory"));
    }
}
