//! 保護呼び出しの失敗の捕捉
//!
//! pcall / xpcall を置き換え、失敗したときに例外イベントを送って停止し、
//! 再開後は元のプリミティブと同じ状態フラグと値を返します。

use crate::pause::PauseControl;
use crate::protocol::ProtocolEvent;
use std::rc::{Rc, Weak};
use tracing::debug;
use tsumugi_host::{recover, Function, HostError, ProtectedCall, ProtectedResult, ScriptContext, Value};

/// 失敗を捕捉する保護呼び出し
pub struct InterceptedCalls {
    context: Weak<ScriptContext>,
    pause: Rc<PauseControl>,
}

impl InterceptedCalls {
    pub fn new(context: Weak<ScriptContext>, pause: Rc<PauseControl>) -> Self {
        Self { context, pause }
    }

    fn intercept(&self, filter: &str, err: &HostError) {
        debug!("{} intercepted failure: {}", filter, err);

        // 停止中にトレースフックが再入しないよう外しておく
        let context = self.context.upgrade();
        let hook = context.as_ref().and_then(|c| c.take_hook());

        self.pause.stop(ProtocolEvent::Exception {
            thread_id: self.pause.thread(),
            filter: filter.to_string(),
            message: err.payload(),
        });

        if let (Some(context), Some(hook)) = (context, hook) {
            context.set_hook(Some(hook));
        }
    }
}

impl ProtectedCall for InterceptedCalls {
    fn pcall(&self, f: &Function, args: &[Value]) -> ProtectedResult {
        match f.call(args) {
            Ok(values) => ProtectedResult::success(values),
            Err(err) => {
                self.intercept("pcall", &err);
                recover(None, &err)
            }
        }
    }

    fn xpcall(&self, f: &Function, handler: &Function, args: &[Value]) -> ProtectedResult {
        match f.call(args) {
            Ok(values) => ProtectedResult::success(values),
            Err(err) => {
                self.intercept("xpcall", &err);
                recover(Some(handler), &err)
            }
        }
    }
}
