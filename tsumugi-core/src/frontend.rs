//! フロントエンドとの接続
//!
//! イベントの送信と、再開指示が来るまでの入れ子の待機ループを提供します。
//! 待機中はホスト全体が停止します。

use crate::protocol::{self, ProtocolEvent};
use std::cell::{Cell, RefCell};
use std::io::{self, BufRead, Write};
use tracing::{debug, warn};

/// フロントエンド
pub trait Frontend {
    /// イベントを送信する
    fn emit(&self, event: &ProtocolEvent);

    /// 再開の指示が来るまでブロックする
    fn wait_for_resume(&self);
}

/// 標準入出力（またはその代わりのストリーム）を使うフロントエンド
pub struct StdioFrontend<R: BufRead, W: Write> {
    reader: RefCell<R>,
    writer: RefCell<W>,
}

impl<R: BufRead, W: Write> StdioFrontend<R, W> {
    pub fn new(reader: R, writer: W) -> Self {
        Self {
            reader: RefCell::new(reader),
            writer: RefCell::new(writer),
        }
    }

    /// 内部のライターを取り出す
    pub fn into_writer(self) -> W {
        self.writer.into_inner()
    }

    /// 停止していない間のコマンドを1行読む
    ///
    /// 待機ループと同じリーダーから読むので、入力を取り合いません。
    /// 入力が閉じていれば `None` を返します。
    pub fn read_command(&self) -> io::Result<Option<String>> {
        let mut line = String::new();
        match self.reader.borrow_mut().read_line(&mut line)? {
            0 => Ok(None),
            _ => Ok(Some(line.trim().to_string())),
        }
    }
}

impl StdioFrontend<io::BufReader<io::Stdin>, io::Stdout> {
    /// プロセスの標準入出力を使う
    ///
    /// 標準入力のロックは読み込みのたびに取り、保持し続けません。
    pub fn stdio() -> Self {
        Self::new(io::BufReader::new(io::stdin()), io::stdout())
    }
}

impl<R: BufRead, W: Write> Frontend for StdioFrontend<R, W> {
    fn emit(&self, event: &ProtocolEvent) {
        let line = match protocol::encode(event) {
            Ok(line) => line,
            Err(e) => {
                warn!("failed to encode protocol event: {}", e);
                return;
            }
        };

        let mut writer = self.writer.borrow_mut();
        if let Err(e) = writeln!(writer, "{}", line).and_then(|_| writer.flush()) {
            warn!("failed to write protocol event: {}", e);
        }
    }

    fn wait_for_resume(&self) {
        let mut reader = self.reader.borrow_mut();
        let mut line = String::new();
        loop {
            line.clear();
            match reader.read_line(&mut line) {
                Ok(0) => {
                    warn!("front end closed its input while paused, resuming");
                    return;
                }
                Ok(_) => match line.trim() {
                    "continue" | "resume" | "c" => return,
                    "" => {}
                    other => debug!("ignored '{}' while paused", other),
                },
                Err(e) => {
                    warn!("failed to read from front end: {}, resuming", e);
                    return;
                }
            }
        }
    }
}

/// イベントを記録するだけのフロントエンド
///
/// 待機は即座に返ります。ホストへの組み込みやテストで使います。
#[derive(Default)]
pub struct RecordingFrontend {
    events: RefCell<Vec<ProtocolEvent>>,
    /// 待機に入った時点で記録済みだったイベント数
    waits: RefCell<Vec<usize>>,
    resumed: Cell<usize>,
}

impl RecordingFrontend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<ProtocolEvent> {
        self.events.borrow().clone()
    }

    pub fn take_events(&self) -> Vec<ProtocolEvent> {
        std::mem::take(&mut *self.events.borrow_mut())
    }

    /// 各待機の開始時点でのイベント数
    pub fn waits(&self) -> Vec<usize> {
        self.waits.borrow().clone()
    }

    pub fn resume_count(&self) -> usize {
        self.resumed.get()
    }
}

impl Frontend for RecordingFrontend {
    fn emit(&self, event: &ProtocolEvent) {
        self.events.borrow_mut().push(event.clone());
    }

    fn wait_for_resume(&self) {
        self.waits.borrow_mut().push(self.events.borrow().len());
        self.resumed.set(self.resumed.get() + 1);
    }
}
