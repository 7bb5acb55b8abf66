//! 端末向けのフロントエンド

use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;
use tracing::warn;
use tsumugi_core::{Frontend, ProtocolEvent};

/// イベントを人が読める形で表示し、停止中は `(paused)` プロンプトで再開を待つ
pub struct ConsoleFrontend;

impl Frontend for ConsoleFrontend {
    fn emit(&self, event: &ProtocolEvent) {
        match event {
            ProtocolEvent::Exception {
                thread_id,
                filter,
                message,
            } => {
                println!();
                println!("Exception in thread {} ({}): {}", thread_id, filter, message);
            }
            ProtocolEvent::Stopped { reason, thread_id } => {
                println!();
                println!("Thread {} stopped ({:?})", thread_id, reason);
            }
            ProtocolEvent::Output { output, .. } => println!("{}", output),
            ProtocolEvent::Threads { threads } => {
                for t in threads {
                    let marker = if t.is_local { "*" } else { " " };
                    println!("{} {:>3} {}", marker, t.id.0, t.name);
                }
            }
            ProtocolEvent::Terminate => println!("Debug session terminated"),
        }
    }

    fn wait_for_resume(&self) {
        println!("Paused. Type 'continue' to resume.");
        let mut rl = match DefaultEditor::new() {
            Ok(rl) => rl,
            Err(e) => {
                warn!("failed to open the console while paused: {}, resuming", e);
                return;
            }
        };

        loop {
            match rl.readline("(paused) ") {
                Ok(line) => match line.trim() {
                    "continue" | "c" | "resume" => return,
                    "" => {}
                    other => println!("Paused: '{}' is not available, use 'continue'", other),
                },
                Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => return,
                Err(e) => {
                    warn!("console error while paused: {:?}, resuming", e);
                    return;
                }
            }
        }
    }
}
