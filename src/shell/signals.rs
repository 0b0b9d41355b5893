use log::{debug, error};
use nix::sys::signal::{signal, SigHandler, Signal};

const INTERACTIVE_SIGNALS: [Signal; 2] = [Signal::SIGINT, Signal::SIGQUIT];

/// 交互模式下 shell 自身忽略 Ctrl-C / Ctrl-\，只让前台子进程收到
pub fn ignore_interactive_signals() {
    for sig in INTERACTIVE_SIGNALS {
        // SAFETY: 只是把处理方式设为 SIG_IGN，不安装任何 Rust 回调
        if let Err(e) = unsafe { signal(sig, SigHandler::SigIgn) } {
            error!("忽略信号 {} 失败: {}", sig, e);
        } else {
            debug!("已忽略信号 {}", sig);
        }
    }
}

/// 在 fork 出的子进程中 exec 之前调用，被忽略的信号会跨 exec 继承
pub fn restore_default_signals() {
    for sig in INTERACTIVE_SIGNALS {
        // SAFETY: 子进程单线程执行，且 SIG_DFL 不涉及回调；这里不能打日志
        let _ = unsafe { signal(sig, SigHandler::SigDfl) };
    }
}
