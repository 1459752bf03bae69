// src/utils/mail.rs

use std::path::PathBuf;

use async_trait::async_trait;
use chrono::Utc;

/// An outgoing plain-text email.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Email {
    pub from: String,
    pub to: String,
    pub subject: String,
    pub body: String,
}

impl Email {
    /// The message carrying a user's confirmation code.
    pub fn confirmation(from: &str, to: &str, code: &str) -> Self {
        Self {
            from: from.to_string(),
            to: to.to_string(),
            subject: "YaMDb confirmation code".to_string(),
            body: format!("Here is your confirmation code: {}", code),
        }
    }

    fn render(&self) -> String {
        format!(
            "From: {}\r\nTo: {}\r\nSubject: {}\r\nDate: {}\r\n\r\n{}\r\n",
            self.from,
            self.to,
            self.subject,
            Utc::now().to_rfc2822(),
            self.body
        )
    }
}

/// Out-of-band delivery channel for confirmation codes.
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, email: &Email) -> std::io::Result<()>;
}

/// Writes each message to the log. Used when no mail directory is configured.
#[derive(Debug, Default)]
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, email: &Email) -> std::io::Result<()> {
        tracing::info!(to = %email.to, subject = %email.subject, "Outgoing mail:\n{}", email.body);
        Ok(())
    }
}

/// Writes each message as an `.eml` file into a directory.
#[derive(Debug, Clone)]
pub struct FileMailer {
    dir: PathBuf,
}

impl FileMailer {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

#[async_trait]
impl Mailer for FileMailer {
    async fn send(&self, email: &Email) -> std::io::Result<()> {
        tokio::fs::create_dir_all(&self.dir).await?;

        let recipient: String = email
            .to
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
            .collect();
        let name = format!(
            "{}-{}.eml",
            Utc::now().format("%Y%m%d-%H%M%S%.6f"),
            recipient
        );
        let path = self.dir.join(name);

        tokio::fs::write(&path, email.render()).await?;
        tracing::debug!("Mail written to {}", path.display());
        Ok(())
    }
}
