//! Local IRC identity

use rand::Rng;
use tracing::debug;

/// Longest nick we generate; many networks cut at 16
const MAX_NICK_LENGTH: usize = 16;

/// The nick this client registers with
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    nick: String,
    username: String,
}

impl User {
    /// Use a fixed nick
    pub fn new(nick: impl Into<String>) -> Self {
        let nick = nick.into();
        Self {
            username: nick.clone(),
            nick,
        }
    }

    /// Generate a random nick such as `xdcc48213`
    pub fn random() -> Self {
        let suffix: u32 = rand::thread_rng().gen_range(10_000..100_000);
        Self::new(format!("xdcc{}", suffix))
    }

    /// Random nick unless one is configured
    pub fn from_config(username: Option<&str>) -> Self {
        username.map(Self::new).unwrap_or_else(Self::random)
    }

    pub fn nick(&self) -> &str {
        &self.nick
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    /// Pick a new nick after the server rejected the current one
    ///
    /// Appends a random number to the original username, shortening it to
    /// stay within the nick length limit.
    pub fn collide(&mut self) -> &str {
        let suffix: u16 = rand::thread_rng().gen_range(100..1000);
        let base: String = self
            .username
            .chars()
            .filter(|c| c.is_ascii_alphanumeric() || "-_[]{}\\`|".contains(*c))
            .take(MAX_NICK_LENGTH - 3)
            .collect();
        let base = if base.is_empty() || base.starts_with(|c: char| c.is_ascii_digit()) {
            format!("x{}", base.chars().take(MAX_NICK_LENGTH - 4).collect::<String>())
        } else {
            base
        };

        self.nick = format!("{}{}", base, suffix);
        debug!("Switching nick to {}", self.nick);
        &self.nick
    }

    /// Case-insensitive nick comparison
    pub fn is(&self, nick: &str) -> bool {
        self.nick.eq_ignore_ascii_case(nick)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_random_nick() {
        let user = User::random();
        assert!(user.nick().starts_with("xdcc"));
        assert_eq!(user.nick().len(), 9);
        assert_eq!(user.nick(), user.username());
    }

    #[test]
    fn test_configured_nick() {
        let user = User::from_config(Some("leecher"));
        assert_eq!(user.nick(), "leecher");
        assert!(user.is("LEECHER"));
    }

    #[test]
    fn test_collide_appends_suffix() {
        let mut user = User::new("averyveryverylongnick");
        let nick = user.collide().to_string();
        assert!(nick.len() <= MAX_NICK_LENGTH);
        assert!(nick.starts_with("averyveryver"));
        assert_ne!(nick, "averyveryverylongnick");
        assert_eq!(user.username(), "averyveryverylongnick");
    }
}
