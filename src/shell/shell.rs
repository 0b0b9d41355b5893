use log::{debug, error, warn};
use std::error::Error;
use std::io::Write;
use std::path::Path;

use crate::shell::builtins;
use crate::shell::interpreter::{Flow, Interpreter};
use crate::shell::readline::{ReadlineError, ReadlineManager};
use crate::shell::signals;
use crate::utils::config::Config;
use crate::utils::theme::Theme;

pub struct Shell<'a> {
    readline: ReadlineManager<'a>,
    interpreter: Interpreter,
}

impl<'a> Shell<'a> {
    pub fn new(config: &'a Config, theme: Theme) -> Result<Self, ReadlineError> {
        Ok(Self {
            readline: ReadlineManager::new(config)?,
            interpreter: Interpreter::new(theme, config.max_token_len),
        })
    }

    pub fn run(&mut self) -> Result<(), Box<dyn Error>> {
        debug!("初始化 minish...");

        // 前台子进程负责响应 Ctrl-C，shell 自身忽略
        signals::ignore_interactive_signals();
        self.readline.load_history();

        println!("{}", self.interpreter.theme.welcome_message);
        debug!("minish 准备就绪...");

        self.run_loop()?;
        self.readline.save_history();

        debug!("退出 minish...");
        Ok(())
    }

    /// 非交互地逐行执行脚本文件，返回最后一个命令单元的退出码
    pub fn run_script(&mut self, path: &Path) -> Result<i32, Box<dyn Error>> {
        debug!("执行脚本: {}", path.display());
        for line in builtins::read_source(path)? {
            if self.interpreter.handle_input(&line) == Flow::Exit {
                break;
            }
        }
        Ok(self.interpreter.last_status())
    }

    fn run_loop(&mut self) -> Result<(), Box<dyn Error>> {
        loop {
            self.interpreter.report_finished_jobs();
            std::io::stdout().flush()?;

            match self.readline.readline(&self.interpreter.theme.prompt) {
                Ok(line) => {
                    if !line.trim().is_empty() {
                        if let Err(err) = self.readline.add_history(line.trim()) {
                            warn!("写入历史记录失败: {}", err);
                        }
                    }
                    if self.interpreter.handle_input(&line) == Flow::Exit {
                        break;
                    }
                }
                Err(ReadlineError::Eof) => {
                    warn!("接收到 EOF 信号，退出 minish...");
                    println!("{}", self.interpreter.theme.exit_message);
                    break;
                }
                Err(ReadlineError::Interrupted) => {
                    debug!("接收到中断信号，丢弃当前输入");
                }
                Err(err) => {
                    error!("读取输入失败: {}", err);
                    eprintln!("{}", (self.interpreter.theme.error_style)(&err.to_string()));
                    break;
                }
            }
        }
        Ok(())
    }
}
