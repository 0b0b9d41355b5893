use dotenv::dotenv;
use rustyline::EditMode;
use std::env;
use std::fs;
use std::io;
use std::path::PathBuf;

use crate::shell::parser::DEFAULT_MAX_TOKEN_LEN;

pub struct Config {
    pub name: String,
    pub config_dir: PathBuf,
    pub theme: String,
    pub history_file: PathBuf,
    pub editor_mode: String,
    pub logger_level: String,
    pub logger_dir: PathBuf,
    pub max_token_len: Option<usize>,
}

impl Config {
    fn get_config_dir() -> PathBuf {
        if let Ok(home) = env::var("HOME") {
            PathBuf::from(home).join(".config/minish")
        } else {
            env::temp_dir().join("minish")
        }
    }

    fn default() -> Self {
        let config_dir = Self::get_config_dir();
        Config {
            name: env!("CARGO_PKG_NAME").to_string(),
            theme: String::from("default"),
            history_file: config_dir.join(".minish_history"),
            editor_mode: String::from("emacs"),
            logger_level: String::from("info"),
            logger_dir: config_dir.join("logs"),
            max_token_len: Some(DEFAULT_MAX_TOKEN_LEN),
            config_dir,
        }
    }

    pub fn new() -> Self {
        // 优先加载 .env 文件中的变量
        if cfg!(debug_assertions) {
            dotenv::from_filename(".env.development").ok();
        } else {
            dotenv().ok();
        }

        // 默认配置
        let mut config = Config::default();

        // 从环境变量加载配置
        if let Ok(theme) = env::var("MINISH_THEME") {
            config.theme = theme;
        }

        if let Ok(editor) = env::var("MINISH_EDITOR") {
            config.editor_mode = editor;
        }

        if let Ok(history) = env::var("MINISH_HISTORY") {
            config.history_file = PathBuf::from(history);
        }

        if let Ok(level) = env::var("MINISH_LOG_LEVEL") {
            config.logger_level = level;
        }

        if let Ok(dir) = env::var("MINISH_LOG_DIR") {
            config.logger_dir = PathBuf::from(dir);
        }

        if let Ok(limit) = env::var("MINISH_MAX_TOKEN_LEN") {
            config.max_token_len = parse_token_limit(&limit);
        }

        config
    }

    /// 确保历史文件与日志目录存在
    pub fn ensure_dirs(&self) -> io::Result<()> {
        if let Some(parent) = self.history_file.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::create_dir_all(&self.logger_dir)
    }

    pub fn get_edit_mode(&self) -> EditMode {
        match self.editor_mode.to_lowercase().as_str() {
            "vi" => EditMode::Vi,
            _ => EditMode::Emacs,
        }
    }
}

// "0" / "none" 表示不限制；无法解析时回退到默认值
fn parse_token_limit(value: &str) -> Option<usize> {
    let value = value.trim();
    if value.eq_ignore_ascii_case("none") {
        return None;
    }
    match value.parse::<usize>() {
        Ok(0) => None,
        Ok(limit) => Some(limit),
        Err(_) => Some(DEFAULT_MAX_TOKEN_LEN),
    }
}
