//! Message source prefixes.

use std::fmt;

/// Where a message came from: a server, or a user's `nick!user@host`.
#[derive(Clone, Eq, PartialEq, Debug, Hash)]
pub enum Prefix {
    /// Server name, e.g. `irc.example.net`.
    ServerName(String),
    /// User source: (nickname, username, hostname). User and host may be empty.
    Nickname(String, String, String),
}

impl Prefix {
    /// Parse a prefix without validation.
    ///
    /// A dot before any `!`/`@` marks a server name; everything else is a
    /// user source.
    pub fn parse(s: &str) -> Self {
        let (name, rest) = match s.find(['!', '@']) {
            Some(i) => (&s[..i], Some(&s[i..])),
            None => (s, None),
        };

        let Some(rest) = rest else {
            if name.contains('.') {
                return Prefix::ServerName(name.to_owned());
            }
            return Prefix::Nickname(name.to_owned(), String::new(), String::new());
        };

        let (user, host) = match rest.strip_prefix('!') {
            Some(after) => match after.split_once('@') {
                Some((u, h)) => (u, h),
                None => (after, ""),
            },
            None => ("", rest.trim_start_matches('@')),
        };

        Prefix::Nickname(name.to_owned(), user.to_owned(), host.to_owned())
    }

    /// Build a full user source.
    pub fn new(nick: impl Into<String>, user: impl Into<String>, host: impl Into<String>) -> Self {
        Prefix::Nickname(nick.into(), user.into(), host.into())
    }

    /// The nickname, if this is a user source.
    pub fn nick(&self) -> Option<&str> {
        match self {
            Prefix::Nickname(nick, _, _) if !nick.is_empty() => Some(nick),
            _ => None,
        }
    }

    /// The username, if present.
    pub fn user(&self) -> Option<&str> {
        match self {
            Prefix::Nickname(_, user, _) if !user.is_empty() => Some(user),
            _ => None,
        }
    }

    /// The hostname (or the server name for server sources).
    pub fn host(&self) -> Option<&str> {
        match self {
            Prefix::Nickname(_, _, host) if !host.is_empty() => Some(host),
            Prefix::ServerName(name) => Some(name),
            _ => None,
        }
    }
}

impl fmt::Display for Prefix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Prefix::ServerName(name) => f.write_str(name),
            Prefix::Nickname(nick, user, host) => {
                f.write_str(nick)?;
                if !user.is_empty() {
                    write!(f, "!{user}")?;
                }
                if !host.is_empty() {
                    write!(f, "@{host}")?;
                }
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_full_hostmask() {
        let p = Prefix::parse("alice!~a@user/alice");
        assert_eq!(p, Prefix::new("alice", "~a", "user/alice"));
        assert_eq!(p.to_string(), "alice!~a@user/alice");
    }

    #[test]
    fn parses_server_name() {
        assert_eq!(
            Prefix::parse("irc.example.net"),
            Prefix::ServerName("irc.example.net".into())
        );
    }

    #[test]
    fn parses_bare_nick_and_nick_at_host() {
        assert_eq!(Prefix::parse("NickServ").nick(), Some("NickServ"));
        let p = Prefix::parse("bob@host.example");
        assert_eq!(p.nick(), Some("bob"));
        assert_eq!(p.user(), None);
        assert_eq!(p.host(), Some("host.example"));
    }
}
