use std::fmt;

use log::{debug, error};

use super::process::ProcessHandle;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobStatus {
    Running,
    Done(i32),
}

#[derive(Debug)]
pub struct Job {
    pub index: usize,
    pub command: String,
    pub status: JobStatus,
    pub is_current: bool,
    pub is_previous: bool,
    processes: Vec<ProcessHandle>,
    exit_codes: Vec<Option<i32>>,
}

impl Job {
    fn new(index: usize, command: String, processes: Vec<ProcessHandle>) -> Self {
        let exit_codes = vec![None; processes.len()];
        Self {
            index,
            command,
            status: JobStatus::Running,
            is_current: false,
            is_previous: false,
            processes,
            exit_codes,
        }
    }

    pub fn pid(&self) -> Option<i32> {
        self.processes.last().map(|p| p.pid.as_raw())
    }

    // 逐个非阻塞检查；全部结束后以最后一段的退出码作为任务状态
    fn poll(&mut self) {
        for (process, code) in self.processes.iter().zip(self.exit_codes.iter_mut()) {
            if code.is_some() {
                continue;
            }
            match process.try_wait() {
                Ok(status) => *code = status,
                Err(e) => {
                    error!("检查后台任务 [{}] 失败: {}", self.index, e);
                    *code = Some(1);
                }
            }
        }
        if self.exit_codes.iter().all(Option::is_some) {
            let last = self.exit_codes.last().copied().flatten().unwrap_or(0);
            self.status = JobStatus::Done(last);
        }
    }
}

impl fmt::Display for Job {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let status = match self.status {
            JobStatus::Running => "running".to_string(),
            JobStatus::Done(code) => format!("done({})", code),
        };
        let mark = if self.is_current {
            "+"
        } else if self.is_previous {
            "-"
        } else {
            " "
        };
        write!(
            f,
            "[{}] {} {} {} {}",
            self.index,
            mark,
            self.pid().unwrap_or_default(),
            status,
            self.command
        )
    }
}

/// 后台任务列表，`&` 结尾的命令单元在这里登记，之后由提示循环回收
#[derive(Debug, Default)]
pub struct JobManager {
    jobs: Vec<Job>,
}

impl JobManager {
    pub fn new() -> Self {
        Self { jobs: Vec::new() }
    }

    pub fn get_jobs(&self) -> &[Job] {
        &self.jobs
    }

    fn find_available_index(&self) -> usize {
        let mut index = 1;
        while self.jobs.iter().any(|job| job.index == index) {
            index += 1;
        }
        index
    }

    pub fn add_job(&mut self, command: String, processes: Vec<ProcessHandle>) -> usize {
        // 将当前任务变为上一个任务
        for job in &mut self.jobs {
            if job.is_current {
                job.is_current = false;
                job.is_previous = true;
            } else {
                job.is_previous = false;
            }
        }

        let index = self.find_available_index();
        let mut job = Job::new(index, command, processes);
        job.is_current = true;
        debug!("登记后台任务: {}", job);
        self.jobs.push(job);
        index
    }

    /// 非阻塞地回收已结束的后台任务，并从列表中移除
    pub fn reap(&mut self) -> Vec<Job> {
        for job in &mut self.jobs {
            job.poll();
        }

        let (finished, running): (Vec<Job>, Vec<Job>) = self
            .jobs
            .drain(..)
            .partition(|job| matches!(job.status, JobStatus::Done(_)));
        self.jobs = running;

        if finished.iter().any(|job| job.is_current) {
            self.promote_current();
        }
        for job in &finished {
            debug!("后台任务结束: {}", job);
        }
        finished
    }

    // 当前任务结束后，把上一个任务（没有则最后一个）提升为当前任务
    fn promote_current(&mut self) {
        if self.jobs.iter().any(|job| job.is_current) {
            return;
        }
        if let Some(prev) = self.jobs.iter_mut().find(|job| job.is_previous) {
            prev.is_previous = false;
            prev.is_current = true;
        } else if let Some(last) = self.jobs.last_mut() {
            last.is_current = true;
        }
    }
}
