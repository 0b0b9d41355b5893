use std::ffi::CString;
use std::ptr;
use std::fmt;
use std::os::fd::{AsRawFd, BorrowedFd, OwnedFd, RawFd};

use log::{debug, error};
use nix::errno::Errno;
use nix::fcntl::OFlag;
use nix::sys::wait::{waitpid, WaitPidFlag, WaitStatus};
use nix::unistd::{dup2, fork, pipe2, write, ForkResult, Pid};

use crate::shell::error::ShellError;
use crate::shell::signals;

/// exec 失败时子进程的退出码
pub const EXEC_FAILURE_STATUS: i32 = 127;

/// 进程在管道中的位置
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Standalone,
    LeftOfPipe,
    BetweenPipes,
    RightOfPipe,
}

impl Role {
    fn for_stage(index: usize, count: usize) -> Self {
        match (index, count) {
            (_, 1) => Role::Standalone,
            (0, _) => Role::LeftOfPipe,
            (i, n) if i + 1 == n => Role::RightOfPipe,
            _ => Role::BetweenPipes,
        }
    }
}

/// 已 fork 的子进程，收集到退出状态后即被消费
#[derive(Debug)]
pub struct ProcessHandle {
    pub pid: Pid,
    pub role: Role,
    pub program: String,
}

impl ProcessHandle {
    /// 阻塞等待子进程结束，返回退出码（被信号杀死时为 128 + 信号值）
    pub fn wait(self) -> Result<i32, ShellError> {
        loop {
            if let Some(status) = self.poll(None)? {
                return Ok(status);
            }
        }
    }

    /// 非阻塞检查，进程仍在运行时返回 `None`
    pub fn try_wait(&self) -> Result<Option<i32>, ShellError> {
        self.poll(Some(WaitPidFlag::WNOHANG))
    }

    fn poll(&self, flags: Option<WaitPidFlag>) -> Result<Option<i32>, ShellError> {
        match waitpid(self.pid, flags) {
            Ok(WaitStatus::Exited(pid, code)) => {
                debug!("子进程 {} ({}) 退出: {}", pid, self.program, code);
                Ok(Some(code))
            }
            Ok(WaitStatus::Signaled(pid, sig, _core_dumped)) => {
                debug!("子进程 {} ({}) 被信号终止: {}", pid, self.program, sig);
                Ok(Some(128 + sig as i32))
            }
            Ok(_) | Err(Errno::EINTR) => Ok(None),
            Err(e) => {
                error!("waitpid {} 失败: {}", self.pid, e);
                Err(ShellError::Wait {
                    pid: self.pid.as_raw(),
                    source: e,
                })
            }
        }
    }
}

impl fmt::Display for ProcessHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} ({:?})", self.pid, self.program, self.role)
    }
}

/// 准备好在子进程里 exec 的一段命令。
///
/// 参数字符串、以空指针结尾的 argv 指针数组和失败提示都在 fork 之前构造，
/// 子进程从 fork 到 exec 之间不做任何堆分配。
struct Program {
    name: String,
    // argv_ptrs 指向这里的缓冲区，两者必须一起存活
    argv: Vec<CString>,
    argv_ptrs: Vec<*const libc::c_char>,
    failure_message: Vec<u8>,
}

impl Program {
    fn new(args: &[String]) -> Result<Self, ShellError> {
        let argv = args
            .iter()
            .map(|arg| CString::new(arg.as_str()))
            .collect::<Result<Vec<_>, _>>()
            .map_err(|_| ShellError::InvalidArgument(args.join(" ")))?;
        let name = args.first().cloned().unwrap_or_default();
        let failure_message = format!("Failed to execute command: {}\n", name).into_bytes();
        let argv_ptrs = argv
            .iter()
            .map(|arg| arg.as_ptr())
            .chain(std::iter::once(ptr::null()))
            .collect();
        Ok(Self {
            name,
            argv,
            argv_ptrs,
            failure_message,
        })
    }
}

/// 为每一段命令 fork 一个子进程，相邻两段之间用新建的管道连接。
///
/// `input` 只接到第一段的标准输入，`output` 只接到最后一段的标准输出。
/// 父进程在 fork 完使用某个管道端的子进程后立即关闭自己的副本，
/// 因此读端总能在写端全部关闭后读到 EOF。
pub fn spawn_pipeline(
    stages: &[&[String]],
    input: Option<OwnedFd>,
    output: Option<OwnedFd>,
) -> Result<Vec<ProcessHandle>, ShellError> {
    let programs = stages
        .iter()
        .map(|args| Program::new(args))
        .collect::<Result<Vec<_>, _>>()?;

    let count = programs.len();
    let mut handles: Vec<ProcessHandle> = Vec::with_capacity(count);
    let mut stdin = input;
    let mut output = output;

    for (index, program) in programs.iter().enumerate() {
        let (stdout, next_stdin) = if index + 1 == count {
            (output.take(), None)
        } else {
            match pipe2(OFlag::O_CLOEXEC) {
                Ok((read_end, write_end)) => (Some(write_end), Some(read_end)),
                Err(e) => {
                    error!("创建管道失败: {}", e);
                    drop(stdin.take());
                    abandon(handles);
                    return Err(ShellError::Pipe(e));
                }
            }
        };

        let role = Role::for_stage(index, count);
        let spawned = spawn(program, role, stdin.as_ref(), stdout.as_ref());

        // 父进程不读写管道，fork 之后立刻关闭
        drop(stdin.take());
        drop(stdout);

        match spawned {
            Ok(handle) => handles.push(handle),
            Err(e) => {
                drop(next_stdin);
                abandon(handles);
                return Err(e);
            }
        }
        stdin = next_stdin;
    }

    Ok(handles)
}

/// 等待所有子进程，返回最后一段的退出码
pub fn wait_all(handles: Vec<ProcessHandle>) -> Result<i32, ShellError> {
    let mut status = 0;
    let mut first_error = None;
    for handle in handles {
        match handle.wait() {
            Ok(code) => status = code,
            Err(e) => {
                first_error.get_or_insert(e);
            }
        }
    }
    match first_error {
        Some(e) => Err(e),
        None => Ok(status),
    }
}

// 管道建立到一半失败时，回收已经启动的子进程，避免留下僵尸进程
fn abandon(handles: Vec<ProcessHandle>) {
    for handle in handles {
        debug!("回收未完成管道中的子进程 {}", handle);
        let _ = handle.wait();
    }
}

fn spawn(
    program: &Program,
    role: Role,
    stdin: Option<&OwnedFd>,
    stdout: Option<&OwnedFd>,
) -> Result<ProcessHandle, ShellError> {
    let stdin = stdin.map(AsRawFd::as_raw_fd);
    let stdout = stdout.map(AsRawFd::as_raw_fd);

    // SAFETY: 子进程在 exec 之前只调用 dup2 / signal / write / _exit
    match unsafe { fork() } {
        Ok(ForkResult::Parent { child }) => {
            debug!("fork 子进程 {} ({:?}): {}", child, role, program.name);
            Ok(ProcessHandle {
                pid: child,
                role,
                program: program.name.clone(),
            })
        }
        Ok(ForkResult::Child) => exec_child(program, stdin, stdout),
        Err(e) => {
            error!("fork 失败: {}", e);
            Err(ShellError::Fork(e))
        }
    }
}

fn exec_child(program: &Program, stdin: Option<RawFd>, stdout: Option<RawFd>) -> ! {
    signals::restore_default_signals();

    if let Some(fd) = stdin {
        if dup2(fd, libc::STDIN_FILENO).is_err() {
            child_exit(b"Failed to redirect input.\n", 1);
        }
    }
    if let Some(fd) = stdout {
        if dup2(fd, libc::STDOUT_FILENO).is_err() {
            child_exit(b"Failed to redirect output.\n", 1);
        }
    }

    // 其余描述符都带 O_CLOEXEC，exec 成功后自动关闭
    // SAFETY: argv_ptrs 以空指针结尾，指向的 CString 由 program 持有
    unsafe { libc::execvp(program.argv_ptrs[0], program.argv_ptrs.as_ptr()) };
    child_exit(&program.failure_message, EXEC_FAILURE_STATUS)
}

fn child_exit(message: &[u8], status: i32) -> ! {
    // SAFETY: 标准输出描述符在子进程退出前一直有效
    let stdout = unsafe { BorrowedFd::borrow_raw(libc::STDOUT_FILENO) };
    let _ = write(stdout, message);
    // SAFETY: fork 出的子进程不能运行父进程的 atexit 与缓冲区刷新
    unsafe { libc::_exit(status) }
}
