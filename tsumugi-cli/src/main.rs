//! Tsumugi CLI - コマンドラインインターフェース
//!
//! マルチコンテキストのスクリプトホスト向けデバッガ tsumugi のREPLインターフェース

mod console;
mod scenario;

use anyhow::{bail, Result};
use clap::{Parser, Subcommand};
use console::ConsoleFrontend;
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;
use scenario::Scenario;
use std::io::{BufRead, Write};
use std::rc::Rc;
use tracing::debug;
use tracing_subscriber::EnvFilter;
use tsumugi_core::errors::{ERR_FUNCTION_NOT_FOUND, ERR_UNKNOWN_CONTEXT};
use tsumugi_core::{
    Command, Debuggee, Frontend, StdioFrontend, ThreadId, ThreadRegistry, Value,
};
use tsumugi_host::{EventSlot, Host};

/// Tsumugi - Multi-context Script Debugger
#[derive(Parser)]
#[command(name = "tsumugi")]
#[command(version = "0.1.0")]
#[command(about = "Debugger dispatch core for multi-context script hosts", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: DebugCommand,

    /// Log filter (overrides RUST_LOG)
    #[arg(long, global = true)]
    log: Option<String>,

    /// Emit framed protocol events on stdout instead of console text
    #[arg(long, global = true)]
    protocol: bool,

    /// Context whose router serves REPL commands (default: the first context)
    #[arg(long, global = true)]
    from: Option<String>,
}

#[derive(Subcommand)]
enum DebugCommand {
    /// Load a scenario file and debug it
    Run {
        /// Path to the scenario JSON file
        scenario: String,
    },

    /// Debug the built-in demo scenario
    Demo,
}

/// デバッグセッション
struct Session {
    host: Host,
    debuggees: Vec<Debuggee>,
    /// REPL コマンドを処理するコンテキスト
    current: usize,
}

impl Session {
    fn current(&self) -> &Debuggee {
        &self.debuggees[self.current]
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.log.as_deref());

    println!("Tsumugi - Multi-context Script Debugger");
    println!("Version 0.1.0");
    println!();

    if cli.protocol {
        let stdio = Rc::new(StdioFrontend::stdio());
        let frontend: Rc<dyn Frontend> = stdio.clone();
        let session = init_session(cli.command, cli.from.as_deref(), frontend)?;
        run_protocol(&session, &stdio)?;
    } else {
        let session = init_session(cli.command, cli.from.as_deref(), Rc::new(ConsoleFrontend))?;
        run_repl(&session)?;
    }

    Ok(())
}

/// ログをstderrに出す（stdoutはプロトコル用）
fn init_logging(filter: Option<&str>) {
    let filter = match filter {
        Some(filter) => EnvFilter::new(filter),
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// シナリオを読み込んでホストを組み立てる
fn init_session(
    command: DebugCommand,
    from: Option<&str>,
    frontend: Rc<dyn Frontend>,
) -> Result<Session> {
    let scenario = match command {
        DebugCommand::Run { scenario } => {
            println!("Loading scenario: {}", scenario);
            Scenario::load(&scenario)?
        }
        DebugCommand::Demo => {
            println!("Loading built-in demo scenario");
            Scenario::from_json(scenario::DEMO)?
        }
    };

    if scenario.contexts.is_empty() {
        bail!("Scenario has no contexts");
    }

    let host = Host::new();
    let registry = ThreadRegistry::shared();
    let debuggees = scenario.build(&host, &registry, &frontend)?;

    let current = match from {
        Some(name) => debuggees
            .iter()
            .position(|d| d.name() == name)
            .ok_or_else(|| anyhow::anyhow!("{}: {}", ERR_UNKNOWN_CONTEXT, name))?,
        None => 0,
    };

    println!(
        "Attached to {} contexts, commands run from '{}'",
        debuggees.len(),
        debuggees[current].name()
    );
    println!();

    Ok(Session {
        host,
        debuggees,
        current,
    })
}

/// REPLループを実行する
fn run_repl(session: &Session) -> Result<()> {
    println!("Type 'help' for available commands, 'quit' to exit.");
    println!();

    let mut rl = DefaultEditor::new()?;

    loop {
        let readline = rl.readline("(tsumugi) ");
        match readline {
            Ok(line) => {
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }

                rl.add_history_entry(line)?;

                if !dispatch_line(session, line) {
                    break;
                }
            }
            Err(ReadlineError::Interrupted) => {
                println!("CTRL-C");
                break;
            }
            Err(ReadlineError::Eof) => {
                println!("CTRL-D");
                break;
            }
            Err(err) => {
                eprintln!("Error: {:?}", err);
                break;
            }
        }
    }

    Ok(())
}

/// プロトコルモードのコマンドループ
///
/// 端末を開かず、停止中の待機ループと同じリーダーから1行ずつ読みます。
/// 入力が閉じたらセッションを終了します。
fn run_protocol<R: BufRead, W: Write>(session: &Session, frontend: &StdioFrontend<R, W>) -> Result<()> {
    while let Some(line) = frontend.read_command()? {
        if line.is_empty() {
            continue;
        }
        if !dispatch_line(session, &line) {
            return Ok(());
        }
    }

    debug!("protocol input closed");
    session.current().terminate();
    Ok(())
}

/// 1行分のコマンドを実行する。quit なら false を返す
fn dispatch_line(session: &Session, line: &str) -> bool {
    match Command::parse(line) {
        Some(Command::Quit) => {
            handle_quit(session);
            false
        }
        Some(command) => {
            if let Err(e) = handle_command(session, command) {
                eprintln!("Error: {}", e);
            }
            true
        }
        None => {
            println!("Unknown command: {}", line);
            println!("Type 'help' for available commands.");
            true
        }
    }
}

/// REPL のコマンドはホストのコンソールコマンドとして実行する
fn handle_command(session: &Session, command: Command) -> Result<()> {
    let host = &session.host;
    let debuggee = session.current();
    let router = debuggee.router();

    match command {
        Command::Help => print_help(),
        Command::Threads => handle_threads(debuggee),
        Command::Call {
            context,
            function,
            args,
        } => {
            let result = host.with_callback(|| router.call_named(&context, &function, &args))?;
            print_result(&function, result);
        }
        Command::Thread {
            thread,
            function,
            args,
        } => {
            let result = host
                .with_callback(|| router.call_by_thread_id(ThreadId(thread), &function, &args))?;
            print_result(&function, result);
        }
        Command::Frame {
            frame_id,
            function,
            args,
        } => {
            let result =
                host.with_callback(|| router.call_by_frame_id(frame_id, &function, &args))?;
            print_result(&function, result);
        }
        Command::Broadcast { function, args } => {
            host.with_callback(|| router.broadcast(&function, &args))?;
            println!("Broadcast '{}'", function);
        }
        Command::First { function, args } => {
            let answered = host.with_callback(|| router.first_success(&function, &args))?;
            println!("'{}' answered: {}", function, answered);
        }
        Command::Event(name) => {
            let delivered = host.dispatch_event(&EventSlot::Event(name.clone()), &[])?;
            println!("Event '{}' delivered to {} contexts", name, delivered);
        }
        Command::Step { depth, instruction } => {
            host.with_callback(|| debuggee.stepping().set(Some(depth), instruction))?;
            println!("Stepping set: depth {}, instruction {}", depth, instruction);
        }
        Command::Stepping => {
            let state = host.with_callback(|| debuggee.stepping().peek())?;
            match state {
                Some(s) => println!("Stepping: depth {}, instruction {}", s.depth, s.instruction),
                None => println!("Stepping: none"),
            }
        }
        Command::Quit => handle_quit(session),
    }

    Ok(())
}

/// Threadsコマンドを処理する
fn handle_threads(debuggee: &Debuggee) {
    println!("Threads seen from '{}':", debuggee.name());
    debuggee.send_threads();
}

/// Quitコマンドを処理する
fn handle_quit(session: &Session) {
    session.current().terminate();
    println!("Goodbye!");
}

/// 呼び出し結果を表示するヘルパー関数
fn print_result(function: &str, result: Option<Vec<Value>>) {
    match result {
        Some(values) if values.is_empty() => println!("{}() returned nothing", function),
        Some(values) => {
            let rendered: Vec<String> = values.iter().map(Value::to_string).collect();
            println!("{}() = {}", function, rendered.join(", "));
        }
        None => println!("{}: {}", ERR_FUNCTION_NOT_FOUND, function),
    }
}

fn print_help() {
    println!("Available commands:");
    println!();
    println!("  help                        - Show this help message");
    println!("  quit/exit/q                 - Exit the debugger");
    println!();
    println!("Dispatch commands:");
    println!("  threads (t)                 - List contexts");
    println!("  call <context> <fn> [args]  - Call a function in a named context");
    println!("  thread <id> <fn> [args]     - Call a function in a context by thread id");
    println!("  frame <frame-id> <fn> [args]- Call a function for a frame");
    println!("  broadcast <fn> [args]       - Call a function in every context");
    println!("  first <fn> [args]           - Call until a context answers true");
    println!();
    println!("Host commands:");
    println!("  event <name> (e)            - Raise an event in every context");
    println!("  step [depth] [instr] (s)    - Set the stepping state");
    println!("  stepping                    - Show the stepping state");
    println!();
    println!("Arguments: integers (0x for hex), true/false/nil, floats, or strings.");
    println!();
    println!("Examples:");
    println!("  call alpha ping");
    println!("  first ping");
    println!("  event on_tick");
}
