//! ディスパッチルーター
//!
//! デバッガ操作を、ローカルの遅延束縛関数またはリモートのコンテキストへ振り分けます。
//! リモート呼び出しはホストのコールバック中でのみ合法なので、
//! 呼び出す前に必ず合法性を確認し、不可ならローカルだけで完結させます。

use crate::{FrameId, LateBindings, Result, SharedRegistry, ThreadId, ThreadInfo};
use std::rc::Rc;
use tracing::{debug, warn};
use tsumugi_host::{Function, HostError, HostState, RemoteSurface, Value};

/// フレーム呼び出しを受け付ける、各コアのインターフェース関数名
///
/// 引数は `[関数名, フレーム番号, タグ, 引数...]` で、
/// 応答は `[true, 結果...]` か、呼び出さなかった場合の `[false]` です。
pub const FRAME_CALL: &str = "__frame";

/// ディスパッチルーター
pub struct Router {
    local: ThreadId,
    registry: SharedRegistry,
    remote: Rc<dyn RemoteSurface>,
    state: Rc<HostState>,
    late: Rc<LateBindings>,
}

/// 結果の先頭の値が真かどうか
fn first_truthy(values: &[Value]) -> bool {
    values.first().map_or(false, Value::is_truthy)
}

/// タグが `thread` の現在の停止スナップショットのものか
///
/// タグを更新するのは所有コンテキストだけなので、`thread` 自身が呼ぶ前提です。
fn is_current_frame(registry: &SharedRegistry, thread: ThreadId, tag: i64) -> bool {
    let current = registry.borrow().snapshot_tag(thread);
    current.map_or(false, |t| t as i64 == tag)
}

/// `thread` 宛てのフレーム呼び出しを受けて処理する
fn serve_frame_call(
    thread: ThreadId,
    registry: &SharedRegistry,
    late: &LateBindings,
    request: &[Value],
) -> tsumugi_host::Result<Vec<Value>> {
    let [Value::Str(name), index @ Value::Integer(_), Value::Integer(tag), args @ ..] = request
    else {
        return Err(HostError::script("malformed frame call"));
    };

    if !is_current_frame(registry, thread, *tag) {
        debug!("thread {} rejected stale frame call '{}' (tag {})", thread, name, tag);
        return Ok(vec![Value::Bool(false)]);
    }

    let mut frame_args = Vec::with_capacity(args.len() + 2);
    frame_args.push(index.clone());
    frame_args.push(Value::Integer(*tag));
    frame_args.extend_from_slice(args);
    match late.call(name, &frame_args) {
        Some(result) => {
            let mut reply = vec![Value::Bool(true)];
            reply.extend(result?);
            Ok(reply)
        }
        None => Ok(vec![Value::Bool(false)]),
    }
}

impl Router {
    pub fn new(
        local: ThreadId,
        registry: SharedRegistry,
        remote: Rc<dyn RemoteSurface>,
        state: Rc<HostState>,
        late: Rc<LateBindings>,
    ) -> Self {
        Self {
            local,
            registry,
            remote,
            state,
            late,
        }
    }

    pub fn local(&self) -> ThreadId {
        self.local
    }

    /// 今リモート呼び出しをしてよいか
    pub fn remote_allowed(&self) -> bool {
        self.state.remote_allowed()
    }

    /// `name` を公開している他のコンテキストのインターフェース名（登録順）
    ///
    /// 呼び出し中にレジストリを借用しないよう、先にスナップショットを取ります。
    fn remote_targets(&self, name: &str) -> Vec<String> {
        let snapshot: Vec<ThreadInfo> = self
            .registry
            .borrow()
            .iter()
            .filter(|t| t.id != self.local)
            .cloned()
            .collect();

        snapshot
            .iter()
            .map(ThreadInfo::interface_name)
            .filter(|iface| self.remote.has_function(iface, name))
            .collect()
    }

    /// 全コンテキストで `name` を呼び出す（結果は捨てる）
    ///
    /// 失敗したコンテキストがあっても残りの呼び出しは続け、
    /// 最初のエラーを最後に返します。
    pub fn broadcast(&self, name: &str, args: &[Value]) -> Result<()> {
        let mut first_error = None;

        if let Some(Err(e)) = self.late.call(name, args) {
            warn!("broadcast '{}' failed locally: {}", name, e);
            first_error = Some(e);
        }

        if !self.remote_allowed() {
            debug!("broadcast '{}' kept local: remote calls not allowed", name);
        } else {
            for iface in self.remote_targets(name) {
                debug!("broadcast '{}' to {}", name, iface);
                if let Err(e) = self.remote.call(&iface, name, args) {
                    warn!("broadcast '{}' failed in {}: {}", name, iface, e);
                    first_error.get_or_insert(e);
                }
            }
        }

        match first_error {
            Some(e) => Err(e.into()),
            None => Ok(()),
        }
    }

    /// 最初に真を返したところで止める
    ///
    /// ローカルが真を返せばリモート呼び出しは一切行いません。
    pub fn first_success(&self, name: &str, args: &[Value]) -> Result<bool> {
        if let Some(result) = self.late.call(name, args) {
            if first_truthy(&result?) {
                return Ok(true);
            }
        }

        if !self.remote_allowed() {
            debug!("first_success '{}' kept local: remote calls not allowed", name);
            return Ok(false);
        }

        for iface in self.remote_targets(name) {
            if first_truthy(&self.remote.call(&iface, name, args)?) {
                debug!("first_success '{}' answered by {}", name, iface);
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// 名前で指定したコンテキストで呼び出す
    ///
    /// 見つからなければ `None`（found=false）を返します。
    pub fn call_named(&self, context: &str, name: &str, args: &[Value]) -> Result<Option<Vec<Value>>> {
        let target = self.registry.borrow().by_name(context).cloned();
        match target {
            Some(info) => self.call_on(&info, name, args),
            None => Ok(None),
        }
    }

    /// スレッドIDで指定したコンテキストで呼び出す
    pub fn call_by_thread_id(
        &self,
        thread: ThreadId,
        name: &str,
        args: &[Value],
    ) -> Result<Option<Vec<Value>>> {
        let target = self.registry.borrow().get(thread).cloned();
        match target {
            Some(info) => self.call_on(&info, name, args),
            None => Ok(None),
        }
    }

    /// このコンテキストのフレーム呼び出し窓口（`FRAME_CALL` として公開する）
    pub fn frame_entry(&self) -> Function {
        let thread = self.local;
        let registry = Rc::clone(&self.registry);
        let late = Rc::clone(&self.late);
        Function::new(move |request| serve_frame_call(thread, &registry, &late, request))
    }

    /// タグがこのコンテキストの現在の停止スナップショットのものか
    pub fn is_current_frame(&self, tag: i64) -> bool {
        is_current_frame(&self.registry, self.local, tag)
    }

    /// フレームIDで指定したコンテキストで呼び出す
    ///
    /// 呼び出し先にはフレーム番号とスナップショットタグを先頭2引数として渡します。
    /// タグの鮮度は呼び出し先が自分のスナップショットで確かめ、
    /// 古ければ呼び出さずに `None` が返ります。
    /// 不正な形式のフレームIDはエラーになります。
    pub fn call_by_frame_id(&self, frame_id: i64, name: &str, args: &[Value]) -> Result<Option<Vec<Value>>> {
        let frame = FrameId::decode(frame_id)?;
        let target = self.registry.borrow().get(frame.thread).cloned();
        let Some(info) = target else {
            return Ok(None);
        };

        let mut request = Vec::with_capacity(args.len() + 3);
        request.push(Value::from(name));
        request.push(Value::Integer(frame.index as i64));
        request.push(Value::Integer(frame.tag as i64));
        request.extend_from_slice(args);

        let reply = if info.id == self.local {
            serve_frame_call(self.local, &self.registry, &self.late, &request)?
        } else {
            if !self.remote_allowed() {
                debug!("frame call '{}' on '{}' skipped: remote calls not allowed", name, info.name);
                return Ok(None);
            }
            let iface = info.interface_name();
            if !self.remote.has_function(&iface, FRAME_CALL) {
                return Ok(None);
            }
            self.remote.call(&iface, FRAME_CALL, &request)?
        };

        let mut values = reply.into_iter();
        match values.next() {
            Some(Value::Bool(true)) => Ok(Some(values.collect())),
            _ => {
                debug!("frame id {} not served by thread {}", frame_id, info.id);
                Ok(None)
            }
        }
    }

    fn call_on(&self, info: &ThreadInfo, name: &str, args: &[Value]) -> Result<Option<Vec<Value>>> {
        if info.id == self.local {
            return match self.late.call(name, args) {
                Some(result) => Ok(Some(result?)),
                None => Ok(None),
            };
        }

        if !self.remote_allowed() {
            debug!("call '{}' on '{}' skipped: remote calls not allowed", name, info.name);
            return Ok(None);
        }

        let iface = info.interface_name();
        if !self.remote.has_function(&iface, name) {
            return Ok(None);
        }
        Ok(Some(self.remote.call(&iface, name, args)?))
    }
}
