//! コンテキスト間の名前付きインターフェース呼び出し

use crate::{Function, HostError, HostState, Result, Value};
use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;
use std::rc::Rc;
use tracing::{debug, warn};

/// 公開されたインターフェースの関数テーブル
///
/// 公開元とホストが同じテーブルを共有するため、公開後も変更できます。
pub type InterfaceTable = Rc<RefCell<BTreeMap<String, Function>>>;

/// (関数名, 関数) の並びからインターフェーステーブルを作る
pub fn interface_table<I, S>(entries: I) -> InterfaceTable
where
    I: IntoIterator<Item = (S, Function)>,
    S: Into<String>,
{
    Rc::new(RefCell::new(
        entries.into_iter().map(|(name, f)| (name.into(), f)).collect(),
    ))
}

/// インターフェース公開面
pub trait RemoteSurface {
    /// インターフェースを公開する（同名のものがあればエラー）
    fn add_interface(&self, name: &str, functions: InterfaceTable) -> Result<()>;

    /// インターフェースを削除する
    fn remove_interface(&self, name: &str) -> bool;

    /// 公開されているインターフェース名の一覧
    fn interfaces(&self) -> Vec<String>;

    /// インターフェースの関数名の一覧
    fn functions(&self, interface: &str) -> Vec<String>;

    /// インターフェースが関数を公開しているか
    fn has_function(&self, interface: &str, function: &str) -> bool;

    /// `interface.function(args...)` を呼び出す
    fn call(&self, interface: &str, function: &str, args: &[Value]) -> Result<Vec<Value>>;

    fn has_interface(&self, name: &str) -> bool {
        self.interfaces().iter().any(|i| i == name)
    }
}

/// ホストのリモート呼び出し機構
///
/// すべてのコンテキストから共有されます。呼び出しはコールバック内でのみ合法で、
/// それ以外のタイミングではホストが中断します（`HostError::IllegalRemoteCall`）。
pub struct RemoteInterfaces {
    state: Rc<HostState>,
    interfaces: RefCell<BTreeMap<String, InterfaceTable>>,
    /// `call` が呼ばれた回数（不正な呼び出しも含む）
    calls: Cell<usize>,
}

impl RemoteInterfaces {
    pub fn new(state: Rc<HostState>) -> Self {
        Self {
            state,
            interfaces: RefCell::new(BTreeMap::new()),
            calls: Cell::new(0),
        }
    }

    /// これまでに `call` が呼ばれた回数
    pub fn call_count(&self) -> usize {
        self.calls.get()
    }

    fn lookup(&self, interface: &str, function: &str) -> Result<Function> {
        let table = self
            .interfaces
            .borrow()
            .get(interface)
            .cloned()
            .ok_or_else(|| HostError::UnknownInterface(interface.to_string()))?;
        let f = table.borrow().get(function).cloned();
        f.ok_or_else(|| HostError::UnknownFunction {
            interface: interface.to_string(),
            function: function.to_string(),
        })
    }
}

impl RemoteSurface for RemoteInterfaces {
    fn add_interface(&self, name: &str, functions: InterfaceTable) -> Result<()> {
        let mut interfaces = self.interfaces.borrow_mut();
        if interfaces.contains_key(name) {
            return Err(HostError::DuplicateInterface(name.to_string()));
        }
        debug!("add_interface '{}'", name);
        interfaces.insert(name.to_string(), functions);
        Ok(())
    }

    fn remove_interface(&self, name: &str) -> bool {
        self.interfaces.borrow_mut().remove(name).is_some()
    }

    fn interfaces(&self) -> Vec<String> {
        self.interfaces.borrow().keys().cloned().collect()
    }

    fn functions(&self, interface: &str) -> Vec<String> {
        self.interfaces
            .borrow()
            .get(interface)
            .map(|t| t.borrow().keys().cloned().collect())
            .unwrap_or_default()
    }

    fn has_function(&self, interface: &str, function: &str) -> bool {
        self.interfaces
            .borrow()
            .get(interface)
            .map(|t| t.borrow().contains_key(function))
            .unwrap_or(false)
    }

    fn has_interface(&self, name: &str) -> bool {
        self.interfaces.borrow().contains_key(name)
    }

    fn call(&self, interface: &str, function: &str, args: &[Value]) -> Result<Vec<Value>> {
        self.calls.set(self.calls.get() + 1);
        if !self.state.remote_allowed() {
            warn!("remote call {}.{} outside of a host callback", interface, function);
            return Err(HostError::IllegalRemoteCall);
        }

        // 借用を解放してから呼び出す（呼び出し先が再入しうる）
        let f = self.lookup(interface, function)?;
        f.call(args)
    }
}
