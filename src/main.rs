use std::env;
use std::path::Path;
use std::process;

use log::debug;
use shell::Shell;
use utils::theme::Theme;

use crate::utils::config::Config;
use crate::utils::log::init_logger;

mod shell;
mod utils;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::new();
    config.ensure_dirs()?;
    init_logger(&config)?;
    debug!("配置加载成功 {}", config.config_dir.display());
    let theme = Theme::load_theme(&config.theme);

    let mut shell = Shell::new(&config, theme)?;
    match env::args_os().nth(1) {
        Some(script) => {
            let status = shell.run_script(Path::new(&script))?;
            process::exit(status);
        }
        None => shell.run(),
    }
}
