use crate::utils::config::Config;
use chrono::Local;
use env_logger::{Builder, Target};
use log::{LevelFilter, SetLoggerError};
use std::fs::OpenOptions;
use std::io;
use std::process;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum LoggerError {
    #[error("无法打开日志文件: {0}")]
    File(#[from] io::Error),
    #[error("日志系统已初始化: {0}")]
    Init(#[from] SetLoggerError),
}

fn parse_level(level: &str) -> LevelFilter {
    match level {
        level if level.eq_ignore_ascii_case("off") => LevelFilter::Off,
        level if level.eq_ignore_ascii_case("error") => LevelFilter::Error,
        level if level.eq_ignore_ascii_case("warn") => LevelFilter::Warn,
        level if level.eq_ignore_ascii_case("info") => LevelFilter::Info,
        level if level.eq_ignore_ascii_case("debug") => LevelFilter::Debug,
        level if level.eq_ignore_ascii_case("trace") => LevelFilter::Trace,
        _ => LevelFilter::Info,
    }
}

/// 日志只写入文件，标准输出留给命令本身与诊断信息
pub fn init_logger(config: &Config) -> Result<(), LoggerError> {
    let level = parse_level(&config.logger_level);

    let date = Local::now().format("%Y-%m-%d");
    let log_file = config
        .logger_dir
        .join(format!("{}_{}.log", config.name, date));
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_file)?;

    Builder::new()
        .format(|buf, record| {
            use std::io::Write;
            writeln!(
                buf,
                "[PID:{}][{}] {} - {}",
                process::id(),
                record.level(),
                Local::now().format("%Y-%m-%d %H:%M:%S"),
                record.args()
            )
        })
        .target(Target::Pipe(Box::new(file)))
        .filter(Some(config.name.as_str()), level)
        .filter(None, LevelFilter::Warn)
        .try_init()?;

    log::debug!("日志级别设置为: {}", level);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_level() {
        assert_eq!(parse_level("DEBUG"), LevelFilter::Debug);
        assert_eq!(parse_level("warn"), LevelFilter::Warn);
        assert_eq!(parse_level("off"), LevelFilter::Off);
        assert_eq!(parse_level("verbose"), LevelFilter::Info);
    }
}
