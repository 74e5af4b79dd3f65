//! Input-schedule files for the run driver.
//!
//! One token per line, `tick value`, where the value is either an
//! integer or a single-quoted character. `\n`, `\t`, `\\` and `\'`
//! escapes are recognized inside quotes. Tokens are delivered to the
//! machine in file order.

use emulator_core::{InputToken, ScheduledToken};

/// Error in an input-schedule file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScheduleError {
    /// Kind of error.
    pub kind: ScheduleErrorKind,
    /// 1-indexed line number.
    pub line: usize,
}

/// Classification of schedule errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScheduleErrorKind {
    /// Line with fewer than two fields.
    MissingField,
    /// First field not a tick count.
    BadTick(String),
    /// Second field neither an integer nor a character literal.
    BadToken(String),
}

impl std::fmt::Display for ScheduleError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.kind)
    }
}

impl std::fmt::Display for ScheduleErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingField => write!(f, "expected 'tick value'"),
            Self::BadTick(text) => write!(f, "not a tick count: {text}"),
            Self::BadToken(text) => write!(f, "not an integer or character: {text}"),
        }
    }
}

/// Parses an input-schedule file.
///
/// # Errors
///
/// Returns a [`ScheduleError`] naming the first malformed line.
pub fn parse_schedule(text: &str) -> Result<Vec<ScheduledToken>, ScheduleError> {
    let mut schedule = Vec::new();
    for (index, raw) in text.lines().enumerate() {
        let line = index + 1;
        if raw.trim().is_empty() {
            continue;
        }
        let Some((tick_field, token_field)) = raw.trim().split_once(' ') else {
            return Err(ScheduleError {
                kind: ScheduleErrorKind::MissingField,
                line,
            });
        };
        let tick = tick_field.parse().map_err(|_| ScheduleError {
            kind: ScheduleErrorKind::BadTick(tick_field.to_owned()),
            line,
        })?;
        let token = parse_token(token_field.trim()).ok_or_else(|| ScheduleError {
            kind: ScheduleErrorKind::BadToken(token_field.to_owned()),
            line,
        })?;
        schedule.push(ScheduledToken { tick, token });
    }
    Ok(schedule)
}

fn parse_token(field: &str) -> Option<InputToken> {
    if let Ok(value) = field.parse() {
        return Some(InputToken::Int(value));
    }
    let inner = field.strip_prefix('\'')?.strip_suffix('\'')?;
    let ch = match inner {
        "\\n" => '\n',
        "\\t" => '\t',
        "\\\\" => '\\',
        "\\'" => '\'',
        single => {
            let mut chars = single.chars();
            let ch = chars.next()?;
            if chars.next().is_some() {
                return None;
            }
            ch
        }
    };
    Some(InputToken::Char(ch))
}

#[cfg(test)]
mod tests {
    use emulator_core::{InputToken, ScheduledToken};

    use super::{parse_schedule, ScheduleErrorKind};

    #[test]
    fn parses_integers_and_characters() {
        let schedule = parse_schedule("5 'H'\n\n10 -3\n20 '\\n'\n").unwrap();
        assert_eq!(
            schedule,
            vec![
                ScheduledToken {
                    tick: 5,
                    token: InputToken::Char('H')
                },
                ScheduledToken {
                    tick: 10,
                    token: InputToken::Int(-3)
                },
                ScheduledToken {
                    tick: 20,
                    token: InputToken::Char('\n')
                },
            ]
        );
    }

    #[test]
    fn empty_file_is_an_empty_schedule() {
        assert_eq!(parse_schedule(""), Ok(Vec::new()));
    }

    #[test]
    fn malformed_lines_are_reported() {
        let error = parse_schedule("5\n").unwrap_err();
        assert_eq!(error.kind, ScheduleErrorKind::MissingField);
        assert_eq!(error.line, 1);

        let error = parse_schedule("1 'H'\nx 'i'\n").unwrap_err();
        assert_eq!(error.kind, ScheduleErrorKind::BadTick("x".to_owned()));
        assert_eq!(error.line, 2);

        let error = parse_schedule("1 'too long'\n").unwrap_err();
        assert_eq!(
            error.kind,
            ScheduleErrorKind::BadToken("'too long'".to_owned())
        );
    }
}
