//! 停止処理
//!
//! ブレークポイントでの停止と、捕捉した失敗での停止は同じ仕組みを使います。
//! イベントを送り、フロントエンドが再開を指示するまでホスト全体を止めます。

use crate::frontend::Frontend;
use crate::protocol::ProtocolEvent;
use crate::{SharedRegistry, ThreadId};
use std::rc::Rc;
use tracing::debug;
use tsumugi_host::HostState;

/// 停止処理
pub struct PauseControl {
    thread: ThreadId,
    frontend: Rc<dyn Frontend>,
    state: Rc<HostState>,
    registry: SharedRegistry,
}

impl PauseControl {
    pub fn new(
        thread: ThreadId,
        frontend: Rc<dyn Frontend>,
        state: Rc<HostState>,
        registry: SharedRegistry,
    ) -> Self {
        Self {
            thread,
            frontend,
            state,
            registry,
        }
    }

    pub fn thread(&self) -> ThreadId {
        self.thread
    }

    pub fn frontend(&self) -> &Rc<dyn Frontend> {
        &self.frontend
    }

    /// イベントを送って再開まで待つ
    ///
    /// ホストが終了処理中ならイベントだけ送って待ちません。
    /// 再開後はこのコンテキストの停止スナップショットを進めるので、
    /// 停止中に発行したフレームIDは古くなります。
    /// 実際に停止した場合は true を返します。
    pub fn stop(&self, event: ProtocolEvent) -> bool {
        self.frontend.emit(&event);
        if self.state.is_terminating() {
            debug!("thread {} not pausing: host is terminating", self.thread);
            return false;
        }

        debug!("thread {} paused", self.thread);
        self.frontend.wait_for_resume();
        let tag = self.registry.borrow_mut().bump_snapshot(self.thread);
        debug!("thread {} resumed (snapshot {:?})", self.thread, tag);
        true
    }
}
