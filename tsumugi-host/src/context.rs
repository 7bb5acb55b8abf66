//! 拡張ごとのスクリプトコンテキスト

use crate::{
    CommandSurface, EventBus, EventSurface, HostProtectedCall, ProtectedCall, RemoteSurface,
};
use std::cell::RefCell;
use std::rc::Rc;

/// トレースフックに渡されるイベント
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HookEvent {
    Call,
    Return,
    Line(u32),
    Count,
}

/// 命令レベルのトレースフック
pub type TraceHook = Rc<dyn Fn(HookEvent)>;

/// コンテキストから見えるコールバック登録面の一式
///
/// デバッガはこれを計装済みのラッパーに差し替えます。
#[derive(Clone)]
pub struct Surfaces {
    pub events: Rc<dyn EventSurface>,
    pub commands: Rc<dyn CommandSurface>,
    pub remote: Rc<dyn RemoteSurface>,
    pub protected: Rc<dyn ProtectedCall>,
}

/// 隔離されたスクリプトコンテキスト
pub struct ScriptContext {
    name: String,
    /// ホストがイベントを配送するための元のハンドラ表
    event_bus: Rc<EventBus>,
    surfaces: RefCell<Surfaces>,
    hook: RefCell<Option<TraceHook>>,
}

impl ScriptContext {
    /// 新しいコンテキストを作成する
    pub fn new(
        name: impl Into<String>,
        commands: Rc<dyn CommandSurface>,
        remote: Rc<dyn RemoteSurface>,
    ) -> Self {
        let event_bus = Rc::new(EventBus::new());
        let surfaces = Surfaces {
            events: event_bus.clone(),
            commands,
            remote,
            protected: Rc::new(HostProtectedCall),
        };
        Self {
            name: name.into(),
            event_bus,
            surfaces: RefCell::new(surfaces),
            hook: RefCell::new(None),
        }
    }

    /// コンテキスト名（拡張名）
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn event_bus(&self) -> &Rc<EventBus> {
        &self.event_bus
    }

    pub fn events(&self) -> Rc<dyn EventSurface> {
        self.surfaces.borrow().events.clone()
    }

    pub fn commands(&self) -> Rc<dyn CommandSurface> {
        self.surfaces.borrow().commands.clone()
    }

    pub fn remote(&self) -> Rc<dyn RemoteSurface> {
        self.surfaces.borrow().remote.clone()
    }

    pub fn protected(&self) -> Rc<dyn ProtectedCall> {
        self.surfaces.borrow().protected.clone()
    }

    /// 現在の登録面一式を取得する
    pub fn surfaces(&self) -> Surfaces {
        self.surfaces.borrow().clone()
    }

    /// 登録面一式を差し替える
    pub fn replace_surfaces(&self, surfaces: Surfaces) {
        *self.surfaces.borrow_mut() = surfaces;
    }

    pub fn set_hook(&self, hook: Option<TraceHook>) {
        *self.hook.borrow_mut() = hook;
    }

    /// フックを取り外して返す
    pub fn take_hook(&self) -> Option<TraceHook> {
        self.hook.borrow_mut().take()
    }

    pub fn has_hook(&self) -> bool {
        self.hook.borrow().is_some()
    }

    /// フックが設定されていれば呼び出す
    pub fn trace(&self, event: HookEvent) {
        let hook = self.hook.borrow().clone();
        if let Some(hook) = hook {
            hook(event);
        }
    }
}
