/*
 * args.rs
 *
 * Command line for the puny binary. Six subcommands, a couple of flags,
 * no external parser. Anything we don't understand becomes
 * PunyError::Usage and main turns that into "Usage: puny ...", exit 2.
 *
 * run takes a single shell command line: `puny run -r out.o 'cc -c x.c'`.
 */

use std::path::PathBuf;

use crate::error::{PunyError, Result};
use crate::report::Style;
use crate::signal::{Signal, parse_signal};

/// One-line synopsis printed after "Usage: puny ".
pub const SYNOPSIS: &str = "open [-r FILE] PATH | run [-r FILE] COMMAND | \
                            raise [-r FILE] SIGNAL | alloc [-r FILE] [-z] SIZE | \
                            dup STRING | report [-r FILE] KIND MESSAGE";

/// What the binary was asked to do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Copy PATH to stdout; remove FILE if that goes wrong.
    Open {
        remove_on_failure: Option<PathBuf>,
        path: String,
    },
    /// Run COMMAND through the shell; remove FILE if that goes wrong.
    Run {
        remove_on_failure: Option<PathBuf>,
        command: String,
    },
    /// Deliver SIGNAL to ourselves with cleanup armed.
    Raise {
        remove_on_failure: Option<PathBuf>,
        signal: Signal,
    },
    /// Allocate SIZE bytes; remove FILE if that fails.
    Alloc {
        remove_on_failure: Option<PathBuf>,
        size: usize,
        zeroed: bool,
    },
    /// Duplicate STRING and print it.
    Dup { text: String },
    /// Emit MESSAGE in the given shape, with FILE's removal armed.
    Report {
        remove_on_failure: Option<PathBuf>,
        style: Style,
        message: String,
    },
}

/// Parse everything after argv[0].
pub fn parse_args<I>(args: I) -> Result<Command>
where
    I: IntoIterator<Item = String>,
{
    let mut args = args.into_iter();
    let Some(sub) = args.next() else {
        return Err(usage(""));
    };
    let rest: Vec<String> = args.collect();

    match sub.as_str() {
        "open" => {
            let (remove_on_failure, rest) = take_remove_flag(&rest)?;
            match rest {
                [path] => Ok(Command::Open {
                    remove_on_failure,
                    path: path.clone(),
                }),
                _ => Err(usage("open takes exactly one PATH")),
            }
        }
        "run" => {
            let (remove_on_failure, rest) = take_remove_flag(&rest)?;
            match rest {
                [command] => Ok(Command::Run {
                    remove_on_failure,
                    command: command.clone(),
                }),
                _ => Err(usage("run takes exactly one COMMAND (quote it)")),
            }
        }
        "raise" => {
            let (remove_on_failure, rest) = take_remove_flag(&rest)?;
            match rest {
                [name] => Ok(Command::Raise {
                    remove_on_failure,
                    signal: parse_signal(name)?,
                }),
                _ => Err(usage("raise takes exactly one SIGNAL")),
            }
        }
        "alloc" => {
            let (remove_on_failure, rest) = take_remove_flag(&rest)?;
            let (zeroed, rest) = match rest.split_first() {
                Some((flag, tail)) if flag == "-z" => (true, tail),
                _ => (false, rest),
            };
            match rest {
                [size] => Ok(Command::Alloc {
                    remove_on_failure,
                    size: size
                        .trim()
                        .parse()
                        .map_err(|_| usage(&format!("invalid size: {size}")))?,
                    zeroed,
                }),
                _ => Err(usage("alloc takes exactly one SIZE")),
            }
        }
        "dup" => match rest.as_slice() {
            [text] => Ok(Command::Dup { text: text.clone() }),
            _ => Err(usage("dup takes exactly one STRING")),
        },
        "report" => {
            let (remove_on_failure, rest) = take_remove_flag(&rest)?;
            match rest {
                [kind, message] => Ok(Command::Report {
                    remove_on_failure,
                    style: parse_style(kind)?,
                    message: message.clone(),
                }),
                _ => Err(usage("report takes KIND and MESSAGE")),
            }
        }
        other => Err(usage(&format!("unknown command: {other}"))),
    }
}

/* "-r FILE" is optional and must come first */
fn take_remove_flag(rest: &[String]) -> Result<(Option<PathBuf>, &[String])> {
    match rest {
        [flag, file, tail @ ..] if flag == "-r" => Ok((Some(PathBuf::from(file)), tail)),
        [flag] if flag == "-r" => Err(usage("-r needs a FILE")),
        _ => Ok((None, rest)),
    }
}

fn parse_style(kind: &str) -> Result<Style> {
    match kind {
        "display" => Ok(Style::Display),
        "warn" => Ok(Style::Warn),
        "fatal" => Ok(Style::Fatal),
        "usage" => Ok(Style::Usage),
        "eprintf" => Ok(Style::Error),
        "weprintf" => Ok(Style::Warning),
        _ => Err(usage(&format!("unknown report kind: {kind}"))),
    }
}

fn usage(reason: &str) -> PunyError {
    PunyError::Usage(reason.to_string())
}
