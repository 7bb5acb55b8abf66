//! Tsumugi スクリプトホストモデル
//!
//! このクレートは、デバッグ対象となるマルチコンテキストのスクリプトホストを表現します。
//! 拡張ごとに隔離されたコンテキスト、ホストのフェーズ管理、コンテキスト間の
//! 名前付きインターフェース呼び出し、コールバック登録面（イベント・コマンド・
//! インターフェース公開）、保護呼び出しのプリミティブなどを提供します。

pub mod commands;
pub mod context;
pub mod error;
pub mod events;
pub mod host;
pub mod protected;
pub mod remote;
pub mod state;
pub mod value;

pub use commands::{CommandSurface, CommandTable};
pub use context::{HookEvent, ScriptContext, Surfaces, TraceHook};
pub use error::{ErrorPayload, HostError};
pub use events::{EventBus, EventSlot, EventSurface, Lifecycle};
pub use host::Host;
pub use protected::{recover, HostProtectedCall, ProtectedCall, ProtectedResult};
pub use remote::{interface_table, InterfaceTable, RemoteInterfaces, RemoteSurface};
pub use state::{CallbackGuard, HostPhase, HostState};
pub use value::{Function, FunctionId, LocalisedString, Value, WeakFunction};

/// ホスト操作の結果型
pub type Result<T> = std::result::Result<T, HostError>;
