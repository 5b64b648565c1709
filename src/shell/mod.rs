pub mod command;
pub mod parse;

use colored::*;
use crossterm::{
    cursor, execute,
    style::{Color, Print, ResetColor, SetForegroundColor},
    terminal::{Clear, ClearType},
};
use reedline::{
    DefaultCompleter, DefaultPrompt, DefaultPromptSegment, FileBackedHistory, Reedline, Signal,
};
use std::{io::stdout, path::PathBuf};

use crate::{
    error::Result,
    manager::DiskManager,
    shell::{
        command::{execute_command, Command, Mode, COMMAND_NAMES},
        parse::{parse_args, parse_command},
    },
};

/// Runs one command given as program arguments.
pub fn run_once<S: AsRef<str>>(manager: &DiskManager, args: &[S]) -> anyhow::Result<()> {
    let cmd = parse_args(args)?;
    execute_command(&cmd, manager, Mode::OneShot)?;
    Ok(())
}

/// Interactive prompt over `manager`'s workspace.
pub fn start_shell(manager: &DiskManager) -> Result<()> {
    welcome(manager);

    let username = whoami::username();
    let hostname = whoami::fallible::hostname().unwrap_or_else(|_| "localhost".to_string());

    let history_path = dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".vdisk_history");

    let mut line_editor = Reedline::create();
    match FileBackedHistory::with_file(100, history_path.clone()) {
        Ok(history) => line_editor = line_editor.with_history(Box::new(history)),
        Err(e) => tracing::warn!(path = %history_path.display(), error = %e, "history disabled"),
    }

    let words = COMMAND_NAMES.iter().map(|s| s.to_string()).collect();
    let completer = DefaultCompleter::new_with_wordlen(words, 2);
    line_editor = line_editor.with_completer(Box::new(completer));

    let prompt = DefaultPrompt::new(
        DefaultPromptSegment::Basic(format!("{}@{}", username, hostname)),
        DefaultPromptSegment::Basic("vdisk".to_string()),
    );

    loop {
        match line_editor.read_line(&prompt) {
            Ok(Signal::Success(buffer)) => {
                let trimmed = buffer.trim();
                if trimmed.is_empty() {
                    continue;
                }

                match parse_command(trimmed) {
                    Ok(cmd) => {
                        if let Err(e) = execute_command(&cmd, manager, Mode::Interactive) {
                            println!("{} {}", "❌ Error:".red().bold(), e);
                        }
                        if cmd == Command::Exit {
                            break;
                        }
                    }
                    Err(e) => println!(
                        "{} {}",
                        "⚠️ ".yellow(),
                        format!("{e}. Type 'help' for command list.").yellow()
                    ),
                }
            }
            Ok(Signal::CtrlC) => {
                println!();
                continue;
            }
            Ok(Signal::CtrlD) => break,
            Err(e) => {
                println!("Error reading line: {}", e);
                break;
            }
        }
    }

    println!("{}", "👋 GoodBye!".bright_yellow());
    Ok(())
}

fn welcome(manager: &DiskManager) {
    let mut stdout = stdout();
    let banner = format!("Welcome to vdisk v{}\n", env!("CARGO_PKG_VERSION"));
    if let Err(e) = execute!(
        stdout,
        Clear(ClearType::All),
        cursor::MoveTo(0, 0),
        SetForegroundColor(Color::Cyan),
        Print(banner),
        ResetColor
    ) {
        tracing::debug!(error = %e, "terminal setup failed");
    }
    let registered = match manager.catalog().record_count() {
        Ok(count) => format!("({count} disks registered)"),
        Err(e) => {
            tracing::warn!(error = %e, "catalog unreadable at startup");
            "(catalog unreadable)".to_string()
        }
    };
    println!(
        "{} {} {}",
        "Workspace:".bright_black(),
        manager.workspace().root().display().to_string().blue(),
        registered.bright_black()
    );
    println!(
        "{}",
        "Type 'help' for available commands. Use ↑↓ for history, Tab for auto-completion.\n"
            .bright_black()
    );
}
