//! Tsumugi デバッガのコア機能
//!
//! このクレートは、マルチコンテキストのスクリプトホストに接続するデバッガの中核を提供します。
//! デバッガ操作を適切なコンテキストへ振り分けるディスパッチルーター、
//! コールバック登録面の計装とラベル付け、保護呼び出しの失敗の捕捉、
//! コンテキスト間でのステップ状態の受け渡しを統合します。

pub mod command;
pub mod debuggee;
pub mod errors;
pub mod frame;
pub mod frontend;
pub mod instrument;
pub mod intercept;
pub mod labels;
pub mod late;
pub mod parse;
pub mod pause;
pub mod protocol;
pub mod registry;
pub mod router;
pub mod stepping;

pub use command::Command;
pub use debuggee::Debuggee;
pub use frame::{FrameId, FrameIdError};
pub use frontend::{Frontend, RecordingFrontend, StdioFrontend};
pub use instrument::{InstrumentedCommands, InstrumentedEvents, InstrumentedRemote};
pub use intercept::InterceptedCalls;
pub use labels::{LabelMap, Labeler, SHARED_LABEL};
pub use late::LateBindings;
pub use pause::PauseControl;
pub use protocol::{ProtocolEvent, StopReason};
pub use registry::{
    ContextView, RegistryError, SharedRegistry, ThreadId, ThreadInfo, ThreadRegistry,
};
pub use router::{Router, FRAME_CALL};
pub use stepping::{StepState, SteppingRelay};

// 他のクレートから使用するために再エクスポート
pub use tsumugi_host::{Function, Host, ScriptContext, Value};

/// デバッガの結果型
pub type Result<T> = anyhow::Result<T>;
