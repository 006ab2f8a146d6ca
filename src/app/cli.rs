use super::config::Config;
use crate::domain::{Attachment, Level};
use clap::Parser;
use std::path::PathBuf;

/// Sends one message event to the configured project.
#[derive(Parser, Debug)]
#[command(name = "sentry-delivery", version, about)]
pub struct Cli {
    #[command(flatten)]
    pub config: Config,

    /// Message text of the event
    #[arg(long, short = 'm', default_value = "sentry-delivery test event")]
    pub message: String,

    /// Event severity
    #[arg(long, default_value = "info")]
    pub level: Level,

    /// Tag attached to the event, as key=value (repeatable)
    #[arg(long = "tag", value_parser = parse_tag)]
    pub tags: Vec<(String, String)>,

    /// File sent as an attachment (repeatable)
    #[arg(long = "attach")]
    pub attachments: Vec<PathBuf>,
}

fn parse_tag(input: &str) -> Result<(String, String), String> {
    let (key, value) = input
        .split_once('=')
        .ok_or_else(|| format!("expected key=value, got '{input}'"))?;
    if key.is_empty() {
        return Err(format!("empty tag key in '{input}'"));
    }
    Ok((key.to_string(), value.to_string()))
}

impl Cli {
    pub fn load_attachments(&self) -> std::io::Result<Vec<Attachment>> {
        self.attachments
            .iter()
            .map(|path| {
                let bytes = std::fs::read(path)?;
                let filename = path
                    .file_name()
                    .map_or_else(|| path.display().to_string(), |name| name.to_string_lossy().into_owned());
                Ok(Attachment::new(filename, bytes))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults_run_inline() {
        let cli = Cli::parse_from(["sentry-delivery", "--dsn", "http://12345@sentry.localdomain/42"]);
        assert_eq!(cli.config.background_worker_threads, 0);
        assert_eq!(cli.level, Level::Info);
        assert!(cli.config.ssl_verification);
        assert!(cli.tags.is_empty());
    }

    #[test]
    fn test_tags_and_flags() {
        let cli = Cli::parse_from([
            "sentry-delivery",
            "--message",
            "hello",
            "--level",
            "warning",
            "--tag",
            "region=eu",
            "--ssl-verification",
            "false",
            "--encoding",
            "json",
        ]);
        assert_eq!(cli.message, "hello");
        assert_eq!(cli.level, Level::Warning);
        assert_eq!(cli.tags, vec![("region".to_string(), "eu".to_string())]);
        assert!(!cli.config.ssl_verification);
        assert_eq!(cli.config.encoding, crate::transport::Encoding::Json);
    }

    #[test]
    fn test_parse_tag_rejects_missing_separator() {
        assert!(parse_tag("novalue").is_err());
        assert!(parse_tag("=x").is_err());
        assert_eq!(parse_tag("k=a=b").unwrap(), ("k".to_string(), "a=b".to_string()));
    }

    #[test]
    fn test_load_attachments_uses_file_name() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"crash log").unwrap();

        let cli = Cli::parse_from([
            "sentry-delivery".to_string(),
            "--attach".to_string(),
            file.path().display().to_string(),
        ]);
        let attachments = cli.load_attachments().unwrap();
        assert_eq!(attachments.len(), 1);
        assert_eq!(attachments[0].bytes.as_ref(), b"crash log");
        assert_eq!(
            attachments[0].filename,
            file.path().file_name().unwrap().to_string_lossy()
        );
    }
}
