use colored::Colorize;

pub struct Theme {
    pub prompt: String,
    pub welcome_message: String,
    pub exit_message: String,
    pub error_style: Box<dyn Fn(&str) -> String>,
    pub notice_style: Box<dyn Fn(&str) -> String>,
}

impl Default for Theme {
    fn default() -> Self {
        Theme {
            prompt: "shell $ ".bright_cyan().to_string(),
            welcome_message: "Welcome to mini-shell.".bright_green().to_string(),
            exit_message: "Bye bye.".bright_green().to_string(),
            error_style: Box::new(|s: &str| s.bright_red().to_string()),
            notice_style: Box::new(|s: &str| s.bright_yellow().to_string()),
        }
    }
}

impl Theme {
    pub fn load_theme(theme_name: &str) -> Theme {
        match theme_name {
            "plain" => Theme {
                prompt: "shell $ ".to_string(),
                welcome_message: "Welcome to mini-shell.".to_string(),
                exit_message: "Bye bye.".to_string(),
                error_style: Box::new(|s: &str| s.to_string()),
                notice_style: Box::new(|s: &str| s.to_string()),
            },
            "dark" => Theme {
                prompt: "shell $ ".bright_purple().to_string(),
                welcome_message: "Welcome to mini-shell.".bright_magenta().to_string(),
                exit_message: "Bye bye.".bright_blue().to_string(),
                error_style: Box::new(|s: &str| s.red().to_string()),
                notice_style: Box::new(|s: &str| s.magenta().to_string()),
            },
            _ => Theme::default(),
        }
    }
}
