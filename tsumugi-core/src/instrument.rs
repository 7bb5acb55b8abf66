//! コールバック登録面の計装
//!
//! 元の登録面を包み、登録系のメソッドだけを横取りしてラベルを付けます。
//! それ以外の操作はすべて元のオブジェクトにそのまま転送するので、
//! 通常の利用者からはラッパーの存在は見えません。

use crate::Labeler;
use std::collections::BTreeMap;
use std::rc::Rc;
use tsumugi_host::{
    CommandSurface, EventSlot, EventSurface, Function, InterfaceTable, RemoteSurface, Result,
    Value,
};

/// 計装済みのイベント購読面
pub struct InstrumentedEvents {
    inner: Rc<dyn EventSurface>,
    labeler: Rc<Labeler>,
}

impl InstrumentedEvents {
    pub fn new(inner: Rc<dyn EventSurface>, labeler: Rc<Labeler>) -> Self {
        Self { inner, labeler }
    }
}

impl EventSurface for InstrumentedEvents {
    fn register(&self, slot: EventSlot, handler: Option<Function>) -> Result<()> {
        let site = slot.to_string();
        let old = self.inner.handler(&slot);
        self.inner.register(slot, handler.clone())?;
        self.labeler.relabel(&site, old, handler.as_ref());
        Ok(())
    }

    fn handler(&self, slot: &EventSlot) -> Option<Function> {
        self.inner.handler(slot)
    }

    fn slots(&self) -> Vec<EventSlot> {
        self.inner.slots()
    }
}

/// 計装済みのコマンド登録面
pub struct InstrumentedCommands {
    inner: Rc<dyn CommandSurface>,
    labeler: Rc<Labeler>,
}

impl InstrumentedCommands {
    pub fn new(inner: Rc<dyn CommandSurface>, labeler: Rc<Labeler>) -> Self {
        Self { inner, labeler }
    }
}

impl CommandSurface for InstrumentedCommands {
    fn add_command(&self, name: &str, help: &str, handler: Function) -> Result<()> {
        self.inner.add_command(name, help, handler.clone())?;
        self.labeler.relabel(name, None, Some(&handler));
        Ok(())
    }

    fn remove_command(&self, name: &str) -> bool {
        let old = self.inner.command_handler(name);
        let removed = self.inner.remove_command(name);
        if removed {
            self.labeler.relabel(name, old, None);
        }
        removed
    }

    fn commands(&self) -> BTreeMap<String, String> {
        self.inner.commands()
    }

    fn command_handler(&self, name: &str) -> Option<Function> {
        self.inner.command_handler(name)
    }
}

/// 計装済みのインターフェース公開面
pub struct InstrumentedRemote {
    inner: Rc<dyn RemoteSurface>,
    labeler: Rc<Labeler>,
}

impl InstrumentedRemote {
    pub fn new(inner: Rc<dyn RemoteSurface>, labeler: Rc<Labeler>) -> Self {
        Self { inner, labeler }
    }
}

impl RemoteSurface for InstrumentedRemote {
    fn add_interface(&self, name: &str, functions: InterfaceTable) -> Result<()> {
        self.inner.add_interface(name, Rc::clone(&functions))?;
        self.labeler.publish(name, &functions);
        Ok(())
    }

    fn remove_interface(&self, name: &str) -> bool {
        let removed = self.inner.remove_interface(name);
        if removed {
            self.labeler.unpublish(name);
        }
        removed
    }

    fn interfaces(&self) -> Vec<String> {
        self.inner.interfaces()
    }

    fn functions(&self, interface: &str) -> Vec<String> {
        self.inner.functions(interface)
    }

    fn has_function(&self, interface: &str, function: &str) -> bool {
        self.inner.has_function(interface, function)
    }

    fn has_interface(&self, name: &str) -> bool {
        self.inner.has_interface(name)
    }

    fn call(&self, interface: &str, function: &str, args: &[Value]) -> Result<Vec<Value>> {
        self.inner.call(interface, function, args)
    }
}
