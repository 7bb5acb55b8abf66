//! ステップ状態のリレー
//!
//! ステップ状態は常に1か所にだけ存在します。ローカルがコーディネーターでなく、
//! リモート呼び出しが合法で、コーディネーターに到達できるときは、
//! 読み書きをコーディネーターに委譲します。

use crate::registry::COORDINATOR_INTERFACE;
use crate::Result;
use serde::{Deserialize, Serialize};
use std::cell::RefCell;
use std::rc::{Rc, Weak};
use tracing::debug;
use tsumugi_host::{Function, HostState, RemoteSurface, Value};

/// コーディネーターが公開する取得関数の名前
pub const GET_STEPPING: &str = "getStepping";

/// コーディネーターが公開する設定関数の名前
pub const SET_STEPPING: &str = "setStepping";

/// ステップ状態
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepState {
    /// 粒度（フレーム深さの差分）
    pub depth: i64,
    /// 命令単位ステップかどうか
    pub instruction: bool,
}

impl StepState {
    pub fn new(depth: i64, instruction: bool) -> Self {
        Self { depth, instruction }
    }
}

fn encode(state: Option<StepState>) -> Vec<Value> {
    match state {
        Some(s) => vec![Value::Integer(s.depth), Value::Bool(s.instruction)],
        None => vec![Value::Nil, Value::Bool(false)],
    }
}

fn decode(values: &[Value]) -> Option<StepState> {
    let depth = values.first().and_then(Value::as_integer)?;
    let instruction = values.get(1).and_then(Value::as_bool).unwrap_or(false);
    Some(StepState { depth, instruction })
}

/// ステップ状態のリレー
pub struct SteppingRelay {
    is_coordinator: bool,
    state: Rc<HostState>,
    remote: Rc<dyn RemoteSurface>,
    local: RefCell<Option<StepState>>,
}

impl SteppingRelay {
    pub fn new(is_coordinator: bool, state: Rc<HostState>, remote: Rc<dyn RemoteSurface>) -> Self {
        Self {
            is_coordinator,
            state,
            remote,
            local: RefCell::new(None),
        }
    }

    pub fn is_coordinator(&self) -> bool {
        self.is_coordinator
    }

    fn delegates(&self, function: &str) -> bool {
        !self.is_coordinator
            && self.state.remote_allowed()
            && self.remote.has_function(COORDINATOR_INTERFACE, function)
    }

    /// ステップ状態を取得する（`clear` なら取得後に消去）
    pub fn get(&self, clear: bool) -> Result<Option<StepState>> {
        if self.delegates(GET_STEPPING) {
            let values = self
                .remote
                .call(COORDINATOR_INTERFACE, GET_STEPPING, &[Value::Bool(clear)])?;
            return Ok(decode(&values));
        }
        Ok(self.get_local(clear))
    }

    /// 取得して消去する
    pub fn take(&self) -> Result<Option<StepState>> {
        self.get(true)
    }

    /// 消去せずに取得する
    pub fn peek(&self) -> Result<Option<StepState>> {
        self.get(false)
    }

    /// ステップ状態を設定する（`depth` が `None` なら消去）
    pub fn set(&self, depth: Option<i64>, instruction: bool) -> Result<()> {
        let state = depth.map(|d| StepState::new(d, instruction));
        if self.delegates(SET_STEPPING) {
            self.remote
                .call(COORDINATOR_INTERFACE, SET_STEPPING, &encode(state))?;
            return Ok(());
        }
        self.set_local(state);
        Ok(())
    }

    /// ローカルの記憶域から読む
    pub fn get_local(&self, clear: bool) -> Option<StepState> {
        if clear {
            self.local.borrow_mut().take()
        } else {
            *self.local.borrow()
        }
    }

    pub fn set_local(&self, state: Option<StepState>) {
        debug!("stepping set to {:?}", state);
        *self.local.borrow_mut() = state;
    }

    /// コーディネーターが公開するアクセサ関数
    ///
    /// 公開された関数はリレーを弱参照で持ちます。
    pub fn accessors(self: &Rc<Self>) -> Vec<(&'static str, Function)> {
        let relay: Weak<Self> = Rc::downgrade(self);
        let get = Function::new(move |args| {
            let clear = args.first().map_or(true, |v| v.is_nil() || v.is_truthy());
            let state = relay.upgrade().and_then(|r| r.get_local(clear));
            Ok(encode(state))
        });

        let relay: Weak<Self> = Rc::downgrade(self);
        let set = Function::new(move |args| {
            if let Some(r) = relay.upgrade() {
                r.set_local(decode(args));
            }
            Ok(vec![])
        });

        vec![(GET_STEPPING, get), (SET_STEPPING, set)]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tsumugi_host::{HostPhase, RemoteInterfaces};

    fn relay(is_coordinator: bool) -> SteppingRelay {
        let state = Rc::new(HostState::new());
        state.set_phase(HostPhase::Running);
        let remote = Rc::new(RemoteInterfaces::new(Rc::clone(&state)));
        SteppingRelay::new(is_coordinator, state, remote)
    }

    #[test]
    fn test_set_then_get() {
        let relay = relay(true);
        relay.set(Some(1), true).unwrap();
        assert_eq!(relay.get(true).unwrap(), Some(StepState::new(1, true)));
        assert_eq!(relay.get(true).unwrap(), None);
    }

    #[test]
    fn test_peek_does_not_clear() {
        let relay = relay(true);
        relay.set(Some(0), false).unwrap();
        assert_eq!(relay.peek().unwrap(), Some(StepState::new(0, false)));
        assert_eq!(relay.peek().unwrap(), Some(StepState::new(0, false)));
        assert_eq!(relay.take().unwrap(), Some(StepState::new(0, false)));
        assert_eq!(relay.take().unwrap(), None);
    }

    #[test]
    fn test_non_coordinator_without_coordinator_stores_locally() {
        let relay = relay(false);
        relay.set(Some(-1), false).unwrap();
        assert_eq!(relay.get_local(false), Some(StepState::new(-1, false)));
    }

    #[test]
    fn test_encode_decode_empty() {
        assert_eq!(decode(&encode(None)), None);
        assert_eq!(decode(&encode(Some(StepState::new(2, true)))), Some(StepState::new(2, true)));
    }
}
