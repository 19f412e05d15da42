/*
 * main.rs
 *
 * The puny binary. Mostly a way to drive every library path from a shell
 * (and from tests/integration.rs): each subcommand ends in one of the
 * reporting shapes or a clean exit 0.
 */

use std::io::Write;
use std::path::PathBuf;

use puny::args::{Command, SYNOPSIS, parse_args};
use puny::os::OsError;
use puny::report::Style;
use puny::signal::{Signal, signal_name};
use puny::{
    Diag, PunyError, allocate, allocate_zeroed, duplicate_string, eprintf, fatal, here,
    run_shell_command, usage, weprintf,
};

fn main() {
    let diag = Diag::from_env();

    let command = match parse_args(std::env::args().skip(1)) {
        Ok(command) => command,
        Err(PunyError::Usage(reason)) => {
            if !reason.is_empty() {
                weprintf!(diag, "{}", reason);
            }
            usage!(diag, "{}", SYNOPSIS)
        }
        Err(e) => {
            weprintf!(diag, "{}", e);
            usage!(diag, "{}", SYNOPSIS)
        }
    };

    match command {
        Command::Open {
            remove_on_failure,
            path,
        } => {
            arm_removal(&diag, remove_on_failure);
            open(&diag, &path);
            diag.clear_cleanup();
        }
        Command::Run {
            remove_on_failure,
            command,
        } => {
            arm_removal(&diag, remove_on_failure);
            run_shell_command(&diag, &command);
            /* it worked - keep the output */
            diag.clear_cleanup();
        }
        Command::Raise {
            remove_on_failure,
            signal,
        } => raise(&diag, remove_on_failure, signal),
        Command::Alloc {
            remove_on_failure,
            size,
            zeroed,
        } => {
            arm_removal(&diag, remove_on_failure);
            if zeroed {
                let block = allocate_zeroed(&diag, size);
                if block.iter().any(|&b| b != 0) {
                    fatal!(diag, "allocate_zeroed({}) returned dirty memory", size);
                }
                println!("{} zeroed bytes", block.len());
            } else {
                let block = allocate(&diag, size).fill(0x5A);
                println!("{} bytes", block.len());
            }
            diag.clear_cleanup();
        }
        Command::Dup { text } => {
            let copy = duplicate_string(&diag, &text);
            println!("{copy}");
        }
        Command::Report {
            remove_on_failure,
            style,
            message,
        } => {
            arm_removal(&diag, remove_on_failure);
            report(&diag, style, &message);
            diag.clear_cleanup();
        }
    }
}

fn open(diag: &Diag, path: &str) {
    let mut file = match std::fs::File::open(path) {
        Ok(f) => f,
        Err(e) => diag.eprintf(
            format_args!("open {path}:"),
            Some(OsError::from_raw(e.raw_os_error().unwrap_or(0))),
        ),
    };
    let mut stdout = std::io::stdout().lock();
    if std::io::copy(&mut file, &mut stdout).is_err() {
        eprintf!(diag, "read {}:", path);
    }
    let _ = stdout.flush();
}

/* cleanup callback: delete the file we were asked to guard */
fn arm_removal(diag: &Diag, file: Option<PathBuf>) {
    let Some(file) = file else {
        return;
    };
    if let Err(e) = diag.set_cleanup(move || {
        let _ = std::fs::remove_file(&file);
    }) {
        weprintf!(diag, "{}", e);
    }
}

fn raise(diag: &Diag, file: Option<PathBuf>, signal: Signal) {
    arm_removal(diag, file);
    // SAFETY: raise() with a valid signal number has no other preconditions.
    let rc = unsafe { libc::raise(signal.as_raw()) };
    if rc != 0 {
        eprintf!(diag, "raise {}:", signal_name(signal));
    }
    /* only reachable when the signal was ignored or blocked */
    weprintf!(diag, "{} delivered, still running", signal_name(signal));
}

fn report(diag: &Diag, style: Style, message: &str) {
    let os = OsError::capture_if(message);
    match style {
        Style::Display => diag.display(&here!(), format_args!("{message}"), os),
        Style::Warn => diag.warn(&here!(), format_args!("{message}"), os),
        Style::Fatal => diag.fatal(&here!(), format_args!("{message}"), os),
        Style::Usage => diag.usage(format_args!("{message}")),
        Style::Error => diag.eprintf(format_args!("{message}"), os),
        Style::Warning => diag.weprintf(format_args!("{message}"), os),
    }
}
