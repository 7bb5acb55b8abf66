//! イベント購読面

use crate::{Function, Result};
use std::cell::RefCell;
use std::collections::BTreeMap;
use std::fmt;

/// ライフサイクルイベント
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Lifecycle {
    Init,
    Load,
    ConfigurationChanged,
}

impl Lifecycle {
    pub fn as_str(&self) -> &'static str {
        match self {
            Lifecycle::Init => "on_init",
            Lifecycle::Load => "on_load",
            Lifecycle::ConfigurationChanged => "on_configuration_changed",
        }
    }
}

/// イベントハンドラの登録スロット
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EventSlot {
    /// シンボル名で識別されるイベント（`on_tick` など）
    Event(String),
    /// N tick ごとのハンドラ
    NthTick(u32),
    Lifecycle(Lifecycle),
}

impl fmt::Display for EventSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EventSlot::Event(name) => write!(f, "{}", name),
            EventSlot::NthTick(tick) => write!(f, "on_nth_tick {}", tick),
            EventSlot::Lifecycle(stage) => write!(f, "{}", stage.as_str()),
        }
    }
}

/// イベント購読面
///
/// 実装が必要なのは `register`・`handler`・`slots` だけで、
/// 残りの便利メソッドはすべて `register` を経由します。
pub trait EventSurface {
    /// スロットにハンドラを登録する（`None` で登録解除）
    fn register(&self, slot: EventSlot, handler: Option<Function>) -> Result<()>;

    /// スロットに登録されているハンドラ
    fn handler(&self, slot: &EventSlot) -> Option<Function>;

    /// 登録済みのスロット一覧
    fn slots(&self) -> Vec<EventSlot>;

    fn on_event(&self, event: &str, handler: Option<Function>) -> Result<()> {
        self.register(EventSlot::Event(event.to_string()), handler)
    }

    fn on_nth_tick(&self, tick: u32, handler: Option<Function>) -> Result<()> {
        self.register(EventSlot::NthTick(tick), handler)
    }

    fn on_init(&self, handler: Option<Function>) -> Result<()> {
        self.register(EventSlot::Lifecycle(Lifecycle::Init), handler)
    }

    fn on_load(&self, handler: Option<Function>) -> Result<()> {
        self.register(EventSlot::Lifecycle(Lifecycle::Load), handler)
    }

    fn on_configuration_changed(&self, handler: Option<Function>) -> Result<()> {
        self.register(EventSlot::Lifecycle(Lifecycle::ConfigurationChanged), handler)
    }

    fn get_event_handler(&self, event: &str) -> Option<Function> {
        self.handler(&EventSlot::Event(event.to_string()))
    }
}

/// コンテキストごとのイベントハンドラ表
#[derive(Default)]
pub struct EventBus {
    handlers: RefCell<BTreeMap<EventSlot, Function>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }
}

impl EventSurface for EventBus {
    fn register(&self, slot: EventSlot, handler: Option<Function>) -> Result<()> {
        let mut handlers = self.handlers.borrow_mut();
        match handler {
            Some(f) => {
                handlers.insert(slot, f);
            }
            None => {
                handlers.remove(&slot);
            }
        }
        Ok(())
    }

    fn handler(&self, slot: &EventSlot) -> Option<Function> {
        self.handlers.borrow().get(slot).cloned()
    }

    fn slots(&self) -> Vec<EventSlot> {
        self.handlers.borrow().keys().cloned().collect()
    }
}
