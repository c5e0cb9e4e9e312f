//! The owned IRC message type.

mod parse;
mod tags;

use std::fmt;
use std::str::FromStr;

use crate::error::MessageParseError;
use crate::prefix::Prefix;

pub use tags::{escape_tag_value, unescape_tag_value};

/// A single IRCv3 message tag: key and optional (unescaped) value.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct Tag(pub String, pub Option<String>);

/// An owned IRC message: `[@tags] [:prefix] <command> [params...]`.
///
/// The command token is stored upper-cased (numerics unchanged), which is
/// what the dispatcher keys handlers on.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct Message {
    /// IRCv3 tags, in wire order.
    pub tags: Vec<Tag>,
    /// Source of the message, if the line carried one.
    pub prefix: Option<Prefix>,
    /// Command token (`PRIVMSG`, `001`, ...).
    pub command: String,
    /// Parameters, trailing included.
    pub params: Vec<String>,
}

impl Message {
    /// Build an untagged, unprefixed message.
    pub fn new<C, I, P>(command: C, params: I) -> Self
    where
        C: Into<String>,
        I: IntoIterator<Item = P>,
        P: Into<String>,
    {
        Message {
            tags: Vec::new(),
            prefix: None,
            command: command.into().to_ascii_uppercase(),
            params: params.into_iter().map(Into::into).collect(),
        }
    }

    /// `PRIVMSG <target> :<text>`.
    pub fn privmsg(target: impl Into<String>, text: impl Into<String>) -> Self {
        Message::new("PRIVMSG", [target.into(), text.into()])
    }

    /// `NOTICE <target> :<text>`.
    pub fn notice(target: impl Into<String>, text: impl Into<String>) -> Self {
        Message::new("NOTICE", [target.into(), text.into()])
    }

    /// Attach a tag, builder style.
    pub fn with_tag(mut self, key: impl Into<String>, value: Option<&str>) -> Self {
        self.tags.push(Tag(key.into(), value.map(str::to_owned)));
        self
    }

    /// Attach a source prefix, builder style.
    pub fn with_prefix(mut self, prefix: Prefix) -> Self {
        self.prefix = Some(prefix);
        self
    }

    /// Value of the tag named `key`, if present with a value.
    pub fn tag_value(&self, key: &str) -> Option<&str> {
        self.tags
            .iter()
            .find(|Tag(k, _)| k == key)
            .and_then(|Tag(_, v)| v.as_deref())
    }

    /// Nickname of the sender, for user sources.
    pub fn source_nickname(&self) -> Option<&str> {
        self.prefix.as_ref().and_then(Prefix::nick)
    }

    /// Parameter `n`, if present.
    pub fn param(&self, n: usize) -> Option<&str> {
        self.params.get(n).map(String::as_str)
    }

    /// The last parameter (usually the trailing text).
    pub fn trailing(&self) -> Option<&str> {
        self.params.last().map(String::as_str)
    }
}

impl FromStr for Message {
    type Err = MessageParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse::parse_line(s)
    }
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.tags.is_empty() {
            f.write_str("@")?;
            for (i, Tag(key, value)) in self.tags.iter().enumerate() {
                if i > 0 {
                    f.write_str(";")?;
                }
                f.write_str(key)?;
                if let Some(value) = value {
                    write!(f, "={}", escape_tag_value(value))?;
                }
            }
            f.write_str(" ")?;
        }

        if let Some(prefix) = &self.prefix {
            write!(f, ":{prefix} ")?;
        }

        f.write_str(&self.command)?;

        let last = self.params.len().saturating_sub(1);
        for (i, param) in self.params.iter().enumerate() {
            // CR/LF would terminate the line early on the wire.
            let param = param.replace(['\r', '\n'], " ");
            if i == last && (param.is_empty() || param.contains(' ') || param.starts_with(':')) {
                write!(f, " :{param}")?;
            } else {
                write!(f, " {param}")?;
            }
        }

        Ok(())
    }
}
