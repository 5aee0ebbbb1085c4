use std::path::PathBuf;

use clap::Parser;

/// Sleep race room server
#[derive(Parser, Debug, Clone)]
#[command(name = "sleeprace-server", version, about = "Sleep race room server")]
pub struct Config {
    /// Address to bind to
    #[arg(short = 'H', long, env = "SLEEPRACE_HOST", default_value = "0.0.0.0")]
    pub host: String,

    /// Port to listen on
    #[arg(short, long, env = "SLEEPRACE_PORT", default_value = "3005")]
    pub port: u16,

    /// JSON file the highscores are kept in
    #[arg(long, env = "SLEEPRACE_HIGHSCORES", default_value = "highscores.json")]
    pub highscores: PathBuf,
}

impl Config {
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::try_parse_from(["sleeprace-server"]).unwrap();

        assert_eq!(config.port, 3005);
        assert_eq!(config.highscores, PathBuf::from("highscores.json"));
    }

    #[test]
    fn test_flags() {
        let config = Config::try_parse_from([
            "sleeprace-server",
            "-H",
            "127.0.0.1",
            "--port",
            "4000",
            "--highscores",
            "/tmp/scores.json",
        ])
        .unwrap();

        assert_eq!(config.address(), "127.0.0.1:4000");
        assert_eq!(config.highscores, PathBuf::from("/tmp/scores.json"));
    }
}
