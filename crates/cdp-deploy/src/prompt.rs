use secrecy::SecretString;

/// Interactive terminal questions.
///
/// The CLI implements this with dialoguer; tests script the answers.
pub trait Prompter: Send + Sync {
    /// Index of the chosen item.
    fn select(&self, prompt: &str, items: &[String], default: usize) -> Result<usize, PromptError>;

    fn input(&self, prompt: &str, default: &str) -> Result<String, PromptError>;

    fn confirm(&self, prompt: &str, default: bool) -> Result<bool, PromptError>;

    fn password(&self, prompt: &str) -> Result<SecretString, PromptError>;
}

#[derive(Debug, thiserror::Error)]
pub enum PromptError {
    #[error("prompt cancelled")]
    Cancelled,

    #[error("terminal interaction failed")]
    Terminal { source: std::io::Error },
}
