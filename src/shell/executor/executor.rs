use std::fs::{File, OpenOptions};
use std::os::fd::OwnedFd;
use std::os::unix::fs::OpenOptionsExt;

use log::{debug, error, warn};

use super::job_manager::{Job, JobManager};
use super::process::{spawn_pipeline, wait_all};
use crate::shell::error::{ErrorKind, ShellError};
use crate::shell::parser::{split_units, CommandUnit, ParsedCommand, Redirect, Token};

/// 一个命令单元执行完之后的可观察结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnitStatus {
    /// 前台执行完毕，值为（管道最后一段的）退出码
    Exited(i32),
    /// 已放入后台，值为任务编号
    Background(usize),
}

pub type UnitResult = Result<UnitStatus, ShellError>;

pub struct Executor {
    jobs: JobManager,
}

impl Executor {
    pub fn new() -> Self {
        Self {
            jobs: JobManager::new(),
        }
    }

    /// 依次执行一行中的所有命令单元。
    ///
    /// 某个单元失败时只打印诊断信息，后面的单元照常执行；
    /// 每个实际执行的单元对应返回值中的一项。
    pub fn execute(&mut self, tokens: &[Token]) -> Vec<UnitResult> {
        let units = split_units(tokens);
        debug!("命令单元数量: {}", units.len());

        units
            .iter()
            .map(|unit| {
                let result = self.execute_unit(unit);
                match &result {
                    Ok(status) => debug!("命令单元结束: {:?}", status),
                    Err(e) => {
                        match e.kind() {
                            ErrorKind::Resource => error!("命令单元失败: {}", e),
                            _ => warn!("命令单元失败: {}", e),
                        }
                        println!("{}", e);
                    }
                }
                result
            })
            .collect()
    }

    fn execute_unit(&mut self, unit: &CommandUnit<'_>) -> UnitResult {
        let command = ParsedCommand::parse(unit)?;
        debug!("执行命令: {}", command);

        // 按 token 出现的顺序打开，前面的文件即使后面失败也已创建/截断
        let mut input = None;
        let mut output = None;
        for redirect in &command.redirects {
            match redirect {
                Redirect::Input => input = open_input(command.input_path.as_deref())?,
                Redirect::Output => output = open_output(command.output_path.as_deref())?,
            }
        }

        // 只有重定向没有命令：文件已经创建/截断，直接算成功
        if command.argv.is_empty() {
            return Ok(UnitStatus::Exited(0));
        }

        let handles = spawn_pipeline(&command.stages(), input, output)?;

        if command.background {
            let index = self.jobs.add_job(command.to_string(), handles);
            return Ok(UnitStatus::Background(index));
        }
        wait_all(handles).map(UnitStatus::Exited)
    }

    /// 回收已结束的后台任务，供提示循环在每次读取输入前调用
    pub fn reap_background(&mut self) -> Vec<Job> {
        self.jobs.reap()
    }

    pub fn jobs(&self) -> &[Job] {
        self.jobs.get_jobs()
    }
}

impl Default for Executor {
    fn default() -> Self {
        Self::new()
    }
}

fn open_input(path: Option<&str>) -> Result<Option<OwnedFd>, ShellError> {
    let Some(path) = path else {
        return Ok(None);
    };
    File::open(path)
        .map(|file| Some(OwnedFd::from(file)))
        .map_err(|source| ShellError::OpenInput {
            path: path.to_string(),
            source,
        })
}

fn open_output(path: Option<&str>) -> Result<Option<OwnedFd>, ShellError> {
    let Some(path) = path else {
        return Ok(None);
    };
    OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .mode(0o666)
        .open(path)
        .map(|file| Some(OwnedFd::from(file)))
        .map_err(|source| ShellError::OpenOutput {
            path: path.to_string(),
            source,
        })
}
