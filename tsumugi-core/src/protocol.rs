//! フロントエンド向けのプロトコルイベント
//!
//! 各メッセージは固定のマーカー（U+FDD0）に続くJSONとして、
//! プロセスの通常の標準出力に1行で書き出されます。
//! 受信側はマーカーで始まる行だけをプロトコルメッセージとして扱います。

use crate::{ContextView, Result, ThreadId};
use serde::{Deserialize, Serialize};
use tsumugi_host::ErrorPayload;

/// 帯域外マーカー
pub const MARKER: char = '\u{FDD0}';

/// 停止理由
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StopReason {
    Breakpoint,
    Step,
    Pause,
}

/// プロトコルイベント
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum ProtocolEvent {
    /// 保護呼び出しで捕捉した失敗
    Exception {
        #[serde(rename = "threadId")]
        thread_id: ThreadId,
        /// 捕捉した呼び出し箇所（`pcall` / `xpcall`）
        filter: String,
        message: ErrorPayload,
    },
    Stopped {
        reason: StopReason,
        #[serde(rename = "threadId")]
        thread_id: ThreadId,
    },
    Output {
        category: String,
        output: String,
    },
    Threads {
        threads: Vec<ContextView>,
    },
    Terminate,
}

impl ProtocolEvent {
    /// デバッグコンソール向けの出力イベント
    pub fn console(output: impl Into<String>) -> Self {
        ProtocolEvent::Output {
            category: "console".to_string(),
            output: output.into(),
        }
    }
}

/// マーカー付きの1行にエンコードする（改行は含まない）
pub fn encode(event: &ProtocolEvent) -> Result<String> {
    let json = serde_json::to_string(event)?;
    Ok(format!("{}{}", MARKER, json))
}

/// 出力の1行を解釈する
///
/// マーカーで始まらない行は通常のプログラム出力なので `None` を返します。
pub fn decode_line(line: &str) -> Result<Option<ProtocolEvent>> {
    let Some(body) = line.trim_end_matches(['\r', '\n']).strip_prefix(MARKER) else {
        return Ok(None);
    };
    Ok(Some(serde_json::from_str(body)?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tsumugi_host::LocalisedString;

    #[test]
    fn test_exception_shape() {
        let event = ProtocolEvent::Exception {
            thread_id: ThreadId(2),
            filter: "pcall".into(),
            message: ErrorPayload::Message("boom".into()),
        };
        let line = encode(&event).unwrap();
        assert!(line.starts_with(MARKER));

        let json: serde_json::Value = serde_json::from_str(&line[MARKER.len_utf8()..]).unwrap();
        assert_eq!(json["kind"], "exception");
        assert_eq!(json["threadId"], 2);
        assert_eq!(json["filter"], "pcall");
        assert_eq!(json["message"], "boom");
    }

    #[test]
    fn test_localised_message_stays_structured() {
        let event = ProtocolEvent::Exception {
            thread_id: ThreadId(1),
            filter: "xpcall".into(),
            message: ErrorPayload::Localised(LocalisedString::new("err.key", vec!["a".into()])),
        };
        let line = encode(&event).unwrap();
        assert_eq!(decode_line(&line).unwrap(), Some(event));
    }

    #[test]
    fn test_stopped_and_terminate() {
        let stopped = encode(&ProtocolEvent::Stopped {
            reason: StopReason::Breakpoint,
            thread_id: ThreadId(1),
        })
        .unwrap();
        assert!(stopped.contains(r#""reason":"breakpoint""#));
        assert!(stopped.contains(r#""kind":"stopped""#));

        let terminate = encode(&ProtocolEvent::Terminate).unwrap();
        assert_eq!(terminate, format!("{}{}", MARKER, r#"{"kind":"terminate"}"#));
    }

    #[test]
    fn test_plain_output_is_ignored() {
        assert_eq!(decode_line("hello world").unwrap(), None);
        assert!(decode_line(&format!("{}not json", MARKER)).is_err());
    }
}
