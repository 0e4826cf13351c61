use std::io::{self, Write};
use std::time::Duration;

use cdp_deploy::{PromptError, Prompter};
use dialoguer::theme::ColorfulTheme;
use dialoguer::{Confirm, Input, Password, Select};
use indicatif::{ProgressBar, ProgressStyle};
use secrecy::SecretString;

/// Terminal prompts via dialoguer. Esc cancels.
#[derive(Default)]
pub struct TerminalPrompter {
    theme: ColorfulTheme,
}

impl Prompter for TerminalPrompter {
    fn select(&self, prompt: &str, items: &[String], default: usize) -> Result<usize, PromptError> {
        Select::with_theme(&self.theme)
            .with_prompt(prompt)
            .items(items)
            .default(default)
            .interact_opt()
            .map_err(prompt_error)?
            .ok_or(PromptError::Cancelled)
    }

    fn input(&self, prompt: &str, default: &str) -> Result<String, PromptError> {
        let mut input = Input::<String>::with_theme(&self.theme)
            .with_prompt(prompt)
            .allow_empty(true);
        if !default.is_empty() {
            input = input.default(default.to_owned());
        }
        input.interact_text().map_err(prompt_error)
    }

    fn confirm(&self, prompt: &str, default: bool) -> Result<bool, PromptError> {
        Confirm::with_theme(&self.theme)
            .with_prompt(prompt)
            .default(default)
            .interact_opt()
            .map_err(prompt_error)?
            .ok_or(PromptError::Cancelled)
    }

    fn password(&self, prompt: &str) -> Result<SecretString, PromptError> {
        Password::with_theme(&self.theme)
            .with_prompt(prompt)
            .interact()
            .map(SecretString::from)
            .map_err(prompt_error)
    }
}

fn prompt_error(e: dialoguer::Error) -> PromptError {
    match e {
        dialoguer::Error::IO(source) if source.kind() == io::ErrorKind::Interrupted => {
            PromptError::Cancelled
        }
        dialoguer::Error::IO(source) => PromptError::Terminal { source },
    }
}

pub fn create_spinner(message: &str) -> ProgressBar {
    let spinner = ProgressBar::new_spinner();
    match ProgressStyle::with_template("{spinner:.cyan} {msg}") {
        Ok(style) => spinner.set_style(style),
        Err(e) => tracing::debug!(error = %e, "spinner template rejected, using default"),
    }
    spinner.set_message(message.to_owned());
    spinner.enable_steady_tick(Duration::from_millis(100));
    spinner
}

/// Stdout that hides the spinner while text is written, so build logs
/// never interleave with the spinner line.
pub struct SpinnerOut {
    spinner: ProgressBar,
    stdout: io::Stdout,
}

impl SpinnerOut {
    pub fn new(spinner: ProgressBar) -> Self {
        Self {
            spinner,
            stdout: io::stdout(),
        }
    }
}

impl Write for SpinnerOut {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let stdout = &mut self.stdout;
        self.spinner.suspend(|| stdout.write(buf))
    }

    fn flush(&mut self) -> io::Result<()> {
        self.stdout.flush()
    }
}
