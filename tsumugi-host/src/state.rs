//! ホストのフェーズとコールバックスコープ

use std::cell::Cell;
use std::rc::Rc;

/// ホストのフェーズ
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostPhase {
    /// 拡張のメインチャンクを読み込んでいる最中
    Loading,
    /// ロード完了後
    Running,
}

/// ホスト全体で共有される実行状態
///
/// リモート呼び出しの合法性はスタックを覗くのではなく、
/// このフェーズとコールバック深さから判定します。
#[derive(Debug)]
pub struct HostState {
    phase: Cell<HostPhase>,
    callback_depth: Cell<u32>,
    terminating: Cell<bool>,
}

impl HostState {
    pub fn new() -> Self {
        Self {
            phase: Cell::new(HostPhase::Loading),
            callback_depth: Cell::new(0),
            terminating: Cell::new(false),
        }
    }

    pub fn phase(&self) -> HostPhase {
        self.phase.get()
    }

    pub fn set_phase(&self, phase: HostPhase) {
        self.phase.set(phase);
    }

    /// ホストがディスパッチしたコールバックに入る
    ///
    /// 返されたガードが破棄されるとコールバックから抜けます。
    pub fn enter_callback(self: &Rc<Self>) -> CallbackGuard {
        self.callback_depth.set(self.callback_depth.get() + 1);
        CallbackGuard {
            state: Rc::clone(self),
        }
    }

    /// コールバック実行中かどうか
    pub fn in_callback(&self) -> bool {
        self.callback_depth.get() > 0
    }

    /// 現在リモート呼び出しが合法かどうか
    pub fn remote_allowed(&self) -> bool {
        self.phase.get() == HostPhase::Running && self.in_callback()
    }

    pub fn is_terminating(&self) -> bool {
        self.terminating.get()
    }

    pub fn set_terminating(&self) {
        self.terminating.set(true);
    }
}

impl Default for HostState {
    fn default() -> Self {
        Self::new()
    }
}

/// コールバックスコープのガード
pub struct CallbackGuard {
    state: Rc<HostState>,
}

impl Drop for CallbackGuard {
    fn drop(&mut self) {
        let depth = self.state.callback_depth.get();
        self.state.callback_depth.set(depth.saturating_sub(1));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_remote_allowed_requires_running_and_callback() {
        let state = Rc::new(HostState::new());
        assert!(!state.remote_allowed());

        {
            let _guard = state.enter_callback();
            // ロード中はコールバック内でも不可
            assert!(!state.remote_allowed());
        }

        state.set_phase(HostPhase::Running);
        assert!(!state.remote_allowed());

        let outer = state.enter_callback();
        {
            let _inner = state.enter_callback();
            assert!(state.remote_allowed());
        }
        assert!(state.remote_allowed());
        drop(outer);
        assert!(!state.remote_allowed());
    }
}
