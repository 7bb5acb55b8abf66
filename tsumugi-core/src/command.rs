//! デバッガコマンド

use crate::parse::{parse_frame_id, parse_integer, parse_values};
use tsumugi_host::Value;

/// デバッガコマンド
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// スレッド（コンテキスト）一覧表示
    Threads,
    /// コンテキスト名を指定して関数を呼び出す
    Call {
        context: String,
        function: String,
        args: Vec<Value>,
    },
    /// スレッドIDを指定して関数を呼び出す
    Thread {
        thread: u32,
        function: String,
        args: Vec<Value>,
    },
    /// フレームIDを指定して関数を呼び出す
    Frame {
        frame_id: i64,
        function: String,
        args: Vec<Value>,
    },
    /// 全コンテキストで呼び出す
    Broadcast { function: String, args: Vec<Value> },
    /// 最初に真を返すまで呼び出す
    First { function: String, args: Vec<Value> },
    /// イベントを発生させる
    Event(String),
    /// ステップ状態を設定
    Step { depth: i64, instruction: bool },
    /// ステップ状態表示
    Stepping,
    /// ヘルプ表示
    Help,
    /// 終了
    Quit,
}

impl Command {
    /// コマンド文字列をパースする
    pub fn parse(input: &str) -> Option<Self> {
        let parts: Vec<&str> = input.split_whitespace().collect();
        if parts.is_empty() {
            return None;
        }

        match parts[0] {
            "threads" | "t" => Some(Command::Threads),
            "call" if parts.len() > 2 => Some(Command::Call {
                context: parts[1].to_string(),
                function: parts[2].to_string(),
                args: parse_values(&parts[3..]),
            }),
            "thread" if parts.len() > 2 => {
                let thread = u32::try_from(parse_integer(parts[1]).ok()?).ok()?;
                Some(Command::Thread {
                    thread,
                    function: parts[2].to_string(),
                    args: parse_values(&parts[3..]),
                })
            }
            "frame" if parts.len() > 2 => Some(Command::Frame {
                frame_id: parse_frame_id(parts[1]).ok()?,
                function: parts[2].to_string(),
                args: parse_values(&parts[3..]),
            }),
            "broadcast" if parts.len() > 1 => Some(Command::Broadcast {
                function: parts[1].to_string(),
                args: parse_values(&parts[2..]),
            }),
            "first" if parts.len() > 1 => Some(Command::First {
                function: parts[1].to_string(),
                args: parse_values(&parts[2..]),
            }),
            "event" | "e" if parts.len() > 1 => Some(Command::Event(parts[1].to_string())),
            "step" | "s" => {
                let depth = match parts.get(1) {
                    Some(d) => parse_integer(d).ok()?,
                    None => 1,
                };
                let instruction = matches!(parts.get(2), Some(&"instr") | Some(&"i"));
                Some(Command::Step { depth, instruction })
            }
            "stepping" => Some(Command::Stepping),
            "help" | "h" | "?" => Some(Command::Help),
            "quit" | "q" | "exit" => Some(Command::Quit),
            _ => None,
        }
    }
}
