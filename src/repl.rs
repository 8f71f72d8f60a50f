//! Interactive chat session.
//!
//! Reads user turns from stdin, dispatches the handful of built-in
//! commands, and hands every AI reply to the save pipeline. All styling
//! goes through crossterm so the session degrades cleanly on dumb
//! terminals.

use crate::client::ChatClient;
use crate::config::Config;
use crate::history::History;
use crate::scanner;
use crate::store::FileStore;
use anyhow::Result;
use crossterm::style::Stylize;
use crossterm::{
    cursor, execute,
    terminal::{Clear, ClearType},
};
use std::io::{self, BufRead, Write};
use std::path::Path;
use std::process::Command as ProcessCommand;
use tracing::debug;

/// System prompt sent with every chat turn.
pub const SYSTEM_PROMPT: &str = "You are codescribe, a helpful AI assistant. \
You are knowledgeable, friendly, and excellent at programming and technical tasks. \
When users ask you to create files, provide the code in markdown code blocks with \
the language specified. Always be helpful and respond in the same language as the \
user's input.";

/// One interactive session: the chat client, its bounded history, the
/// file store, and the code blocks of the most recent reply (kept for
/// the `copy` command).
pub struct Session {
    client: ChatClient,
    history: History,
    store: FileStore,
    last_code_blocks: Vec<String>,
    running: bool,
}

impl Session {
    /// Build a session from configuration.
    pub fn new(config: &Config) -> Result<Self> {
        let client = ChatClient::new(
            &config.backend.url,
            &config.backend.model,
            config.backend.temperature,
        );
        let store = FileStore::new(&config.output.dir)?;

        Ok(Self {
            client,
            history: History::new(config.chat.history_limit),
            store,
            last_code_blocks: Vec::new(),
            running: true,
        })
    }

    /// Run the chat loop until the user exits or stdin closes.
    pub async fn run(&mut self) -> Result<()> {
        show_banner();

        let stdin = io::stdin();
        while self.running {
            print!("\n{} ", "You ❯".cyan().bold());
            io::stdout().flush()?;

            let mut line = String::new();
            if stdin.lock().read_line(&mut line)? == 0 {
                // EOF
                println!();
                break;
            }
            let input = line.trim();
            if input.is_empty() {
                continue;
            }

            if self.handle_command(input) {
                continue;
            }

            self.chat_turn(input).await;
        }

        Ok(())
    }

    /// Dispatch built-in commands. Returns false when the input should be
    /// forwarded to the AI as a chat turn.
    fn handle_command(&mut self, input: &str) -> bool {
        let command = input.to_lowercase();

        match command.as_str() {
            "exit" | "quit" | "q" => {
                println!("\n{}", "Goodbye!".cyan().bold());
                self.running = false;
                return true;
            }
            "help" => {
                show_help();
                return true;
            }
            "clear" => {
                self.history.clear();
                println!("{} Conversation history cleared", "✓".green());
                return true;
            }
            "files" => {
                self.list_files();
                return true;
            }
            "open" => {
                self.open_folder();
                return true;
            }
            "clean" => {
                match self.store.clear() {
                    Ok(count) => println!("{} Deleted {} file(s)", "✓".green(), count),
                    Err(err) => println!("{} {err:#}", "✗".red()),
                }
                return true;
            }
            _ => {}
        }

        if command == "copy" || command.starts_with("copy ") {
            self.copy_block(command.strip_prefix("copy").unwrap_or("").trim());
            return true;
        }
        if let Some(value) = command.strip_prefix("temp ") {
            match value.trim().parse::<f32>() {
                Ok(temp) => {
                    self.client.set_temperature(temp);
                    println!(
                        "{} Temperature set to {}",
                        "✓".green(),
                        self.client.temperature()
                    );
                }
                Err(_) => println!("{} Invalid temperature. Use: temp <0.0-3.0>", "✗".red()),
            }
            return true;
        }
        if let Some(name) = command.strip_prefix("model ") {
            let name = name.trim();
            if name.is_empty() {
                println!("{} Invalid model name. Use: model <name>", "✗".red());
            } else {
                self.client.set_model(name);
                println!("{} Model changed to {}", "✓".green(), self.client.model());
            }
            return true;
        }

        false
    }

    /// One chat turn: send, render, persist extracted code.
    async fn chat_turn(&mut self, input: &str) {
        print!("{}", "codescribe is thinking…".dim());
        let _ = io::stdout().flush();

        let reply = self
            .client
            .chat(&mut self.history, SYSTEM_PROMPT, input)
            .await;

        let _ = execute!(
            io::stdout(),
            cursor::MoveToColumn(0),
            Clear(ClearType::CurrentLine)
        );

        let reply = match reply {
            Ok(reply) => reply,
            Err(err) => {
                println!("{} {err:#}", "✗".red().bold());
                return;
            }
        };

        // Remember the reply's code blocks for the `copy` command.
        self.last_code_blocks = scanner::extract(&reply)
            .into_iter()
            .map(|segment| segment.content)
            .collect();

        println!("{}", "codescribe".magenta().bold());
        println!("{reply}");

        if !self.last_code_blocks.is_empty() {
            println!(
                "\n{}",
                format!(
                    "{} code block(s) ready: `copy` for the last, `copy <n>` for a specific one",
                    self.last_code_blocks.len()
                )
                .dim()
            );
        }

        match self.store.process_response(&reply, input) {
            Ok(saved) if !saved.is_empty() => print_saved(&saved),
            Ok(_) => {}
            Err(err) => println!("{} {err:#}", "✗".red().bold()),
        }
    }

    /// Copy a code block from the last reply to the clipboard.
    fn copy_block(&self, arg: &str) {
        if self.last_code_blocks.is_empty() {
            println!("{} No code blocks available to copy", "⚠".yellow());
            return;
        }

        let index = if arg.is_empty() {
            self.last_code_blocks.len() - 1
        } else {
            match arg.parse::<usize>() {
                Ok(n) if (1..=self.last_code_blocks.len()).contains(&n) => n - 1,
                _ => {
                    println!(
                        "{} Invalid code block number. Available: 1-{}",
                        "✗".red(),
                        self.last_code_blocks.len()
                    );
                    return;
                }
            }
        };

        let code = &self.last_code_blocks[index];
        match arboard::Clipboard::new().and_then(|mut clipboard| clipboard.set_text(code.clone())) {
            Ok(()) => println!(
                "{} Code block copied to clipboard ({} characters)",
                "✓".green(),
                code.len()
            ),
            Err(err) => println!("{} Failed to copy: {err}", "✗".red()),
        }
    }

    /// Print the files currently under the output root.
    fn list_files(&self) {
        let files = self.store.list();
        if files.is_empty() {
            println!("{}", "No files generated yet".dim());
            return;
        }

        println!("{}", format!("Generated files ({}):", files.len()).cyan().bold());
        for (i, path) in files.iter().enumerate() {
            println!("  {}. {}", i + 1, absolute(path).display());
        }
    }

    /// Open the output folder in the platform file manager.
    fn open_folder(&self) {
        let folder = absolute(self.store.output_dir());

        let opener = if cfg!(target_os = "macos") {
            "open"
        } else if cfg!(target_os = "windows") {
            "explorer"
        } else {
            "xdg-open"
        };

        match ProcessCommand::new(opener).arg(&folder).spawn() {
            Ok(_) => println!("{} Opened folder: {}", "✓".green(), folder.display()),
            Err(err) => {
                debug!(error = %err, "folder open failed");
                println!("{} Could not open the folder automatically", "⚠".yellow());
                println!("Location: {}", folder.display());
            }
        }
    }
}

/// Best-effort absolute form of a path for display.
fn absolute(path: &Path) -> std::path::PathBuf {
    std::fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf())
}

/// Report where a batch of files landed.
fn print_saved(saved: &[std::path::PathBuf]) {
    println!();
    for (i, path) in saved.iter().enumerate() {
        println!(
            "{} File #{} saved: {}",
            "✓".green().bold(),
            i + 1,
            absolute(path).display().to_string().yellow()
        );
    }
}

fn show_banner() {
    let title = "codescribe - chat that writes files";
    println!();
    println!("{}", format!("  ┌{}┐", "─".repeat(title.len() + 4)).cyan());
    println!("{}{}{}", "  │  ".cyan(), title.bold(), "  │".cyan());
    println!("{}", format!("  └{}┘", "─".repeat(title.len() + 4)).cyan());
    println!("{}", "  Type 'help' for commands, 'exit' to quit".dim());
}

fn show_help() {
    let commands = [
        ("help", "Show this help message"),
        ("clear", "Clear conversation history"),
        ("copy", "Copy the last code block to the clipboard"),
        ("copy <n>", "Copy a specific code block"),
        ("files", "List all generated files"),
        ("open", "Open the generated files folder"),
        ("clean", "Delete all generated files"),
        ("temp <value>", "Set AI temperature (0.0-3.0)"),
        ("model <name>", "Change the AI model"),
        ("exit / quit", "Exit the application"),
    ];

    println!("{}", "Available commands".cyan().bold());
    for (cmd, description) in commands {
        // Pad before styling so the ANSI codes don't skew the column.
        println!("  {} {}", format!("{cmd:<14}").green(), description);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session() -> (tempfile::TempDir, Session) {
        let dir = tempfile::tempdir().unwrap();
        let mut config = Config::default();
        config.output.dir = dir.path().join("generated").display().to_string();
        let session = Session::new(&config).unwrap();
        (dir, session)
    }

    #[test]
    fn test_exit_stops_the_session() {
        let (_dir, mut s) = session();
        assert!(s.handle_command("exit"));
        assert!(!s.running);
    }

    #[test]
    fn test_commands_are_recognized() {
        let (_dir, mut s) = session();
        assert!(s.handle_command("help"));
        assert!(s.handle_command("clear"));
        assert!(s.handle_command("files"));
        assert!(s.handle_command("clean"));
        assert!(s.handle_command("temp 0.5"));
        assert!(s.handle_command("model mistral"));
        assert_eq!(s.client.model(), "mistral");
        assert_eq!(s.client.temperature(), 0.5);
    }

    #[test]
    fn test_chat_text_is_not_a_command() {
        let (_dir, mut s) = session();
        assert!(!s.handle_command("write me a python script"));
        assert!(!s.handle_command("temperature is a word, not a command"));
    }

    #[test]
    fn test_clear_command_resets_history() {
        let (_dir, mut s) = session();
        s.history.push(crate::history::Message::user("hello"));
        s.handle_command("clear");
        assert!(s.history.is_empty());
    }
}
