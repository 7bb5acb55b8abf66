//! ホストのエラー型

use crate::{LocalisedString, Value};
use serde::{Deserialize, Serialize};
use std::fmt;

/// スクリプトエラーのペイロード
///
/// 文字列メッセージ、またはローカライズ可能な構造化メッセージ。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ErrorPayload {
    Message(String),
    Localised(LocalisedString),
}

impl ErrorPayload {
    /// スクリプト値からペイロードを作る
    pub fn from_value(value: &Value) -> Self {
        match value {
            Value::Localised(l) => ErrorPayload::Localised(l.clone()),
            Value::Str(s) => ErrorPayload::Message(s.clone()),
            other => ErrorPayload::Message(other.to_string()),
        }
    }

    /// スクリプト値に変換する
    pub fn into_value(self) -> Value {
        match self {
            ErrorPayload::Message(s) => Value::Str(s),
            ErrorPayload::Localised(l) => Value::Localised(l),
        }
    }
}

impl fmt::Display for ErrorPayload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorPayload::Message(s) => write!(f, "{}", s),
            ErrorPayload::Localised(l) => write!(f, "{}", l),
        }
    }
}

/// ホスト操作のエラー
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum HostError {
    /// ユーザーコードが発生させたエラー
    #[error("{0}")]
    Script(ErrorPayload),
    /// ロードフェーズ中、またはホストコールバック外でのリモート呼び出し
    #[error("remote calls are not allowed outside host-dispatched callbacks")]
    IllegalRemoteCall,
    #[error("Unknown interface: {0}")]
    UnknownInterface(String),
    #[error("Unknown function '{function}' in interface '{interface}'")]
    UnknownFunction { interface: String, function: String },
    #[error("Interface already exists: {0}")]
    DuplicateInterface(String),
    #[error("Command already exists: {0}")]
    DuplicateCommand(String),
}

impl HostError {
    /// メッセージ付きのスクリプトエラーを作る
    pub fn script(message: impl Into<String>) -> Self {
        HostError::Script(ErrorPayload::Message(message.into()))
    }

    /// エラーをスクリプトから見えるペイロードに変換する
    pub fn payload(&self) -> ErrorPayload {
        match self {
            HostError::Script(payload) => payload.clone(),
            other => ErrorPayload::Message(other.to_string()),
        }
    }
}
