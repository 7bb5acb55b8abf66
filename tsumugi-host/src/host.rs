//! マルチコンテキストのスクリプトホスト

use crate::{
    CommandSurface, CommandTable, EventSlot, EventSurface, HostPhase, HostState, RemoteInterfaces,
    Result, ScriptContext, Value,
};
use std::cell::RefCell;
use std::rc::Rc;
use tracing::debug;

/// スクリプトホスト
///
/// シングルスレッドで、1つのコールバックを最後まで実行してから次に進みます。
pub struct Host {
    state: Rc<HostState>,
    remote: Rc<RemoteInterfaces>,
    commands: Rc<CommandTable>,
    contexts: RefCell<Vec<Rc<ScriptContext>>>,
}

impl Host {
    /// ロードフェーズのホストを作成する
    pub fn new() -> Self {
        let state = Rc::new(HostState::new());
        let remote = Rc::new(RemoteInterfaces::new(Rc::clone(&state)));
        Self {
            state,
            remote,
            commands: Rc::new(CommandTable::new()),
            contexts: RefCell::new(Vec::new()),
        }
    }

    pub fn state(&self) -> &Rc<HostState> {
        &self.state
    }

    pub fn remote(&self) -> &Rc<RemoteInterfaces> {
        &self.remote
    }

    pub fn commands(&self) -> &Rc<CommandTable> {
        &self.commands
    }

    /// 拡張のコンテキストを作成する
    pub fn create_context(&self, name: &str) -> Rc<ScriptContext> {
        let context = Rc::new(ScriptContext::new(
            name,
            self.commands.clone(),
            self.remote.clone(),
        ));
        self.contexts.borrow_mut().push(Rc::clone(&context));
        debug!("created context '{}'", name);
        context
    }

    /// 全コンテキスト（作成順）
    pub fn contexts(&self) -> Vec<Rc<ScriptContext>> {
        self.contexts.borrow().clone()
    }

    pub fn context(&self, name: &str) -> Option<Rc<ScriptContext>> {
        self.contexts
            .borrow()
            .iter()
            .find(|c| c.name() == name)
            .cloned()
    }

    /// ロードフェーズを終えて実行フェーズに入る
    pub fn finish_loading(&self) {
        self.state.set_phase(HostPhase::Running);
    }

    /// ホストがディスパッチしたコールバックとして `f` を実行する
    pub fn with_callback<R>(&self, f: impl FnOnce() -> R) -> R {
        let _guard = self.state.enter_callback();
        f()
    }

    /// 全コンテキストにイベントを配送する
    ///
    /// ハンドラのエラーはそのまま呼び出し元に返ります。
    pub fn dispatch_event(&self, slot: &EventSlot, args: &[Value]) -> Result<usize> {
        let mut delivered = 0;
        for context in self.contexts() {
            let Some(handler) = context.event_bus().handler(slot) else {
                continue;
            };
            debug!("dispatch {} to '{}'", slot, context.name());
            self.with_callback(|| handler.call(args))?;
            delivered += 1;
        }
        Ok(delivered)
    }

    /// コマンドを実行する（見つからなければ None）
    pub fn run_command(&self, name: &str, args: &[Value]) -> Result<Option<Vec<Value>>> {
        let Some(handler) = self.commands.command_handler(name) else {
            return Ok(None);
        };
        self.with_callback(|| handler.call(args)).map(Some)
    }

    /// 終了処理中としてマークする
    pub fn terminate(&self) {
        self.state.set_terminating();
    }
}

impl Default for Host {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Function, HostError, RemoteSurface};
    use std::cell::Cell;

    #[test]
    fn test_dispatch_event_enters_callback() {
        let host = Host::new();
        let alpha = host.create_context("alpha");
        let state = Rc::clone(host.state());
        let seen = Rc::new(Cell::new(false));
        let seen_in_handler = Rc::clone(&seen);
        alpha
            .events()
            .on_event(
                "on_tick",
                Some(Function::new(move |_| {
                    seen_in_handler.set(state.remote_allowed());
                    Ok(vec![])
                })),
            )
            .unwrap();

        host.finish_loading();
        let delivered = host
            .dispatch_event(&EventSlot::Event("on_tick".into()), &[])
            .unwrap();
        assert_eq!(delivered, 1);
        assert!(seen.get());
        assert!(!host.state().in_callback());
    }

    #[test]
    fn test_remote_call_during_load_is_illegal() {
        let host = Host::new();
        let alpha = host.create_context("alpha");
        let result = host.with_callback(|| alpha.remote().call("x", "y", &[]));
        assert_eq!(result, Err(HostError::IllegalRemoteCall));
    }

    #[test]
    fn test_run_command() {
        let host = Host::new();
        let alpha = host.create_context("alpha");
        alpha
            .commands()
            .add_command("echo", "", Function::new(|args| Ok(args.to_vec())))
            .unwrap();
        assert_eq!(
            host.run_command("echo", &[Value::from("hi")]).unwrap(),
            Some(vec![Value::from("hi")])
        );
        assert_eq!(host.run_command("missing", &[]).unwrap(), None);
    }
}
