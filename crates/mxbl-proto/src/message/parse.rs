//! Nom-based line parser.

use nom::{
    bytes::complete::{take_till1, take_while1},
    character::complete::{char, space0},
    combinator::opt,
    sequence::preceded,
    IResult,
};
use smallvec::SmallVec;

use super::tags::unescape_tag_value;
use super::{Message, Tag};
use crate::error::MessageParseError;
use crate::prefix::Prefix;

/// IRCv3 tags: `@` up to the first space.
fn tags(input: &str) -> IResult<&str, &str> {
    preceded(char('@'), take_till1(|c| c == ' '))(input)
}

/// Source prefix: `:` up to the first space.
fn prefix(input: &str) -> IResult<&str, &str> {
    preceded(char(':'), take_till1(|c| c == ' '))(input)
}

/// Command: letters or a numeric.
fn command(input: &str) -> IResult<&str, &str> {
    take_while1(|c: char| c.is_ascii_alphanumeric())(input)
}

/// Space-separated params; a `:`-prefixed param swallows the rest of the line.
fn params(mut rest: &str) -> SmallVec<[&str; 15]> {
    let mut out: SmallVec<[&str; 15]> = SmallVec::new();
    loop {
        rest = rest.trim_start_matches(' ');
        if rest.is_empty() {
            break;
        }
        if let Some(trailing) = rest.strip_prefix(':') {
            out.push(trailing);
            break;
        }
        let end = rest.find(' ').unwrap_or(rest.len());
        out.push(&rest[..end]);
        rest = &rest[end..];
    }
    out
}

type Head<'a> = (Option<&'a str>, Option<&'a str>, &'a str);

/// Everything before the params: tags, prefix, command.
fn head(input: &str) -> IResult<&str, Head<'_>> {
    let (input, raw_tags) = opt(tags)(input)?;
    let (input, _) = space0(input)?;
    let (input, raw_prefix) = opt(prefix)(input)?;
    let (input, _) = space0(input)?;
    let (input, cmd) = command(input)?;
    Ok((input, (raw_tags, raw_prefix, cmd)))
}

fn split_tags(raw: &str) -> Vec<Tag> {
    raw.split(';')
        .filter(|t| !t.is_empty())
        .map(|t| match t.split_once('=') {
            Some((k, v)) => Tag(k.to_owned(), Some(unescape_tag_value(v))),
            None => Tag(t.to_owned(), None),
        })
        .collect()
}

/// Parse one line (terminators optional) into a [`Message`].
pub(super) fn parse_line(line: &str) -> Result<Message, MessageParseError> {
    let line = line.trim_end_matches(['\r', '\n']);
    if line.trim().is_empty() {
        return Err(MessageParseError::EmptyMessage);
    }

    let (rest, (raw_tags, raw_prefix, cmd)) = head(line).map_err(|e| {
        let position = match &e {
            nom::Err::Error(err) | nom::Err::Failure(err) => line.len() - err.input.len(),
            nom::Err::Incomplete(_) => line.len(),
        };
        MessageParseError::InvalidCommand {
            line: line.to_owned(),
            position,
        }
    })?;

    // A command token must end at a space or end of line.
    if !rest.is_empty() && !rest.starts_with(' ') {
        return Err(MessageParseError::InvalidCommand {
            line: line.to_owned(),
            position: line.len() - rest.len(),
        });
    }

    Ok(Message {
        tags: raw_tags.map(split_tags).unwrap_or_default(),
        prefix: raw_prefix.map(Prefix::parse),
        command: cmd.to_ascii_uppercase(),
        params: params(rest).into_iter().map(str::to_owned).collect(),
    })
}
