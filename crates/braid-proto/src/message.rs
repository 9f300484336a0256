//! IRC message type, parser and wire encoder.
//!
//! ```text
//! [@tags] [:prefix] <command> [params...] [:trailing]
//! ```
//!
//! IRCv3 tags are accepted on input and discarded.

use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

use nom::{
    bytes::complete::{take_until, take_while1},
    character::complete::{char, space0},
    combinator::opt,
    error::ErrorKind,
    sequence::preceded,
    IResult,
};

use crate::error::{MessageParseError, ProtocolError};
use crate::response::Response;

/// Maximum encoded line length in bytes, including CR LF (RFC 2812).
pub const MAX_LINE_LEN: usize = 512;

/// Maximum number of parameters, trailing included (RFC 2812).
pub const MAX_PARAMS: usize = 15;

/// An owned IRC message.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Message {
    /// Source of the message (`server` or `nick!user@host`).
    pub prefix: Option<String>,
    /// Command name or three digit numeric.
    pub command: String,
    /// Middle parameters.
    pub params: Vec<String>,
    /// Trailing parameter, the only one that may contain spaces.
    pub trailing: Option<String>,
}

impl Message {
    /// Create a message with no parameters.
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            ..Self::default()
        }
    }

    /// Set the prefix.
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = Some(prefix.into());
        self
    }

    /// Append a middle parameter.
    pub fn with_param(mut self, param: impl Into<String>) -> Self {
        self.params.push(param.into());
        self
    }

    /// Set the trailing parameter.
    pub fn with_trailing(mut self, trailing: impl Into<String>) -> Self {
        self.trailing = Some(trailing.into());
        self
    }

    /// `QUIT :reason`
    pub fn quit(reason: impl Into<String>) -> Self {
        Self::new("QUIT").with_trailing(reason)
    }

    /// `PONG server :token`
    pub fn pong(server: &str, token: Option<&str>) -> Self {
        let msg = Self::new("PONG").with_prefix(server).with_param(server);
        match token {
            Some(token) => msg.with_trailing(token),
            None => msg,
        }
    }

    /// `ERROR :text`
    pub fn error(text: impl Into<String>) -> Self {
        Self::new("ERROR").with_trailing(text)
    }

    /// Build a numeric reply from the server.
    ///
    /// The last argument becomes the trailing parameter.
    pub fn numeric(server: &str, response: Response, mut args: Vec<String>) -> Self {
        let trailing = args.pop();
        Self {
            prefix: Some(server.to_string()),
            command: response.to_string(),
            params: args,
            trailing,
        }
    }

    /// Case-insensitive command comparison.
    pub fn is_command(&self, name: &str) -> bool {
        self.command.eq_ignore_ascii_case(name)
    }

    /// Get argument `index`, counting the trailing parameter as the last argument.
    pub fn arg(&self, index: usize) -> Option<&str> {
        match index.cmp(&self.params.len()) {
            std::cmp::Ordering::Less => Some(self.params[index].as_str()),
            std::cmp::Ordering::Equal => self.trailing.as_deref(),
            std::cmp::Ordering::Greater => None,
        }
    }

    /// Number of arguments, trailing included.
    pub fn arg_count(&self) -> usize {
        self.params.len() + usize::from(self.trailing.is_some())
    }

    /// Shorten the trailing parameter so the encoded line fits in
    /// [`MAX_LINE_LEN`]. The cut lands on a character boundary.
    ///
    /// Messages without a trailing parameter, or whose other parts are
    /// already too long, are returned unchanged.
    pub fn truncate_to_fit(mut self) -> Self {
        let len = self.to_string().len() + 2;
        if len <= MAX_LINE_LEN {
            return self;
        }
        let excess = len - MAX_LINE_LEN;
        if let Some(trailing) = &mut self.trailing {
            if trailing.len() >= excess {
                let mut end = trailing.len() - excess;
                while !trailing.is_char_boundary(end) {
                    end -= 1;
                }
                trailing.truncate(end);
            }
        }
        self
    }

    /// Encode to a CR LF terminated wire line.
    ///
    /// Returns `None` when the message cannot be represented on the wire.
    pub fn to_line(&self) -> Option<String> {
        if !is_valid_command(&self.command) || self.arg_count() > MAX_PARAMS {
            return None;
        }
        if let Some(prefix) = &self.prefix {
            if prefix.is_empty() || prefix.contains(' ') || has_line_break(prefix) {
                return None;
            }
        }
        for param in &self.params {
            if param.is_empty()
                || param.starts_with(':')
                || param.contains(' ')
                || has_line_break(param)
            {
                return None;
            }
        }
        if self.trailing.as_deref().is_some_and(has_line_break) {
            return None;
        }

        let mut line = self.to_string();
        line.push_str("\r\n");
        (line.len() <= MAX_LINE_LEN).then_some(line)
    }
}

fn is_valid_command(cmd: &str) -> bool {
    let all_letters = !cmd.is_empty() && cmd.chars().all(|c| c.is_ascii_alphabetic());
    let three_digits = cmd.len() == 3 && cmd.chars().all(|c| c.is_ascii_digit());
    all_letters || three_digits
}

fn has_line_break(s: &str) -> bool {
    s.contains(['\r', '\n', '\0'])
}

impl Display for Message {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        if let Some(ref prefix) = self.prefix {
            write!(f, ":{} ", prefix)?;
        }
        write!(f, "{}", self.command)?;
        for param in &self.params {
            write!(f, " {}", param)?;
        }
        if let Some(ref trailing) = self.trailing {
            write!(f, " :{}", trailing)?;
        }
        Ok(())
    }
}

fn parse_tags(input: &str) -> IResult<&str, &str> {
    preceded(char('@'), take_until(" "))(input)
}

fn parse_prefix(input: &str) -> IResult<&str, &str> {
    preceded(char(':'), take_while1(|c: char| c != ' '))(input)
}

/// Command name: 1*letter or 3digit.
fn parse_command(input: &str) -> IResult<&str, &str> {
    let (rest, cmd) = take_while1(|c: char| c.is_ascii_alphanumeric())(input)?;
    if is_valid_command(cmd) {
        Ok((rest, cmd))
    } else {
        Err(nom::Err::Error(nom::error::Error::new(
            input,
            ErrorKind::AlphaNumeric,
        )))
    }
}

/// Split the parameter section into middle parameters and the trailing one.
///
/// Runs of spaces count as one separator.
fn parse_params(input: &str) -> (Vec<&str>, Option<&str>) {
    let mut params = Vec::new();
    let mut rest = input;

    loop {
        rest = rest.trim_start_matches(' ');
        if rest.is_empty() {
            return (params, None);
        }
        if let Some(trailing) = rest.strip_prefix(':') {
            return (params, Some(trailing));
        }
        if params.len() + 1 >= MAX_PARAMS {
            // The fifteenth parameter may omit the colon.
            return (params, Some(rest));
        }
        let end = rest.find(' ').unwrap_or(rest.len());
        params.push(&rest[..end]);
        rest = &rest[end..];
    }
}

fn parse_message(input: &str) -> IResult<&str, (Option<&str>, &str)> {
    let (input, _tags) = opt(parse_tags)(input)?;
    let (input, _) = space0(input)?;
    let (input, prefix) = opt(parse_prefix)(input)?;
    let (input, _) = space0(input)?;
    let (rest, command) = parse_command(input)?;
    Ok((rest, (prefix, command)))
}

impl FromStr for Message {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Message, Self::Err> {
        let line = s.trim_end_matches(['\r', '\n']);
        let invalid = |cause| ProtocolError::InvalidMessage {
            string: line.to_owned(),
            cause,
        };

        if line.trim().is_empty() {
            return Err(invalid(MessageParseError::EmptyMessage));
        }

        let (rest, (prefix, command)) = parse_message(line).map_err(|e| {
            let position = match e {
                nom::Err::Error(e) | nom::Err::Failure(e) => line.len() - e.input.len(),
                nom::Err::Incomplete(_) => line.len(),
            };
            invalid(MessageParseError::ParseContext { position })
        })?;

        // Command must be followed by a separator or the end of the line.
        if !rest.is_empty() && !rest.starts_with(' ') {
            return Err(invalid(MessageParseError::ParseContext {
                position: line.len() - rest.len(),
            }));
        }

        let (params, trailing) = parse_params(rest);
        Ok(Message {
            prefix: prefix.map(str::to_owned),
            command: command.to_ascii_uppercase(),
            params: params.into_iter().map(str::to_owned).collect(),
            trailing: trailing.map(str::to_owned),
        })
    }
}
