//! コンテキストごとのデバッガ本体

use crate::frontend::Frontend;
use crate::pause::PauseControl;
use crate::protocol::{ProtocolEvent, StopReason};
use crate::registry::interface_name;
use crate::router::FRAME_CALL;
use crate::{
    ContextView, FrameId, InstrumentedCommands, InstrumentedEvents, InstrumentedRemote,
    InterceptedCalls, Labeler, LateBindings, Result, Router, SharedRegistry, SteppingRelay,
    ThreadId,
};
use std::rc::Rc;
use tracing::{debug, info};
use tsumugi_host::{
    interface_table, Function, Host, HostState, InterfaceTable, RemoteSurface, ScriptContext,
    Surfaces,
};

/// 1つのコンテキストにアタッチしたデバッガ
///
/// アタッチ時にコンテキストの登録面を計装済みのものに差し替え、
/// 自分自身をインターフェースとして公開します。
pub struct Debuggee {
    thread: ThreadId,
    name: String,
    context: Rc<ScriptContext>,
    state: Rc<HostState>,
    registry: SharedRegistry,
    late: Rc<LateBindings>,
    router: Router,
    stepping: Rc<SteppingRelay>,
    labeler: Rc<Labeler>,
    pause: Rc<PauseControl>,
    frontend: Rc<dyn Frontend>,
    /// このコアが公開しているインターフェース
    interface: InterfaceTable,
}

impl Debuggee {
    /// コンテキストにアタッチする
    ///
    /// 拡張の環境が初期化されるとき（ロードフェーズ）に呼ばれる想定です。
    pub fn attach(
        host: &Host,
        context: Rc<ScriptContext>,
        registry: SharedRegistry,
        frontend: Rc<dyn Frontend>,
        coordinator: bool,
    ) -> Result<Self> {
        let name = context.name().to_string();
        let thread = registry.borrow_mut().register(&name, coordinator)?;
        let is_coordinator = registry
            .borrow()
            .get(thread)
            .map_or(false, |t| t.is_coordinator);

        let state = Rc::clone(host.state());
        let original = context.surfaces();
        let remote: Rc<dyn RemoteSurface> = original.remote.clone();

        let labeler = Rc::new(Labeler::new(Rc::clone(&frontend)));
        let pause = Rc::new(PauseControl::new(
            thread,
            Rc::clone(&frontend),
            Rc::clone(&state),
            Rc::clone(&registry),
        ));

        context.replace_surfaces(Surfaces {
            events: Rc::new(InstrumentedEvents::new(original.events, Rc::clone(&labeler))),
            commands: Rc::new(InstrumentedCommands::new(original.commands, Rc::clone(&labeler))),
            remote: Rc::new(InstrumentedRemote::new(original.remote, Rc::clone(&labeler))),
            protected: Rc::new(InterceptedCalls::new(Rc::downgrade(&context), Rc::clone(&pause))),
        });

        let late = Rc::new(LateBindings::new());
        let router = Router::new(
            thread,
            Rc::clone(&registry),
            Rc::clone(&remote),
            Rc::clone(&state),
            Rc::clone(&late),
        );
        let stepping = Rc::new(SteppingRelay::new(
            is_coordinator,
            Rc::clone(&state),
            Rc::clone(&remote),
        ));

        // コア自身のインターフェースは計装を通さずに公開する
        let interface = interface_table([(FRAME_CALL.to_string(), router.frame_entry())]);
        if is_coordinator {
            interface.borrow_mut().extend(
                stepping
                    .accessors()
                    .into_iter()
                    .map(|(name, f)| (name.to_string(), f)),
            );
        }
        let iface_name = interface_name(&name, is_coordinator);
        remote.add_interface(&iface_name, Rc::clone(&interface))?;
        info!("attached to '{}' as thread {} ({})", name, thread, iface_name);

        Ok(Self {
            thread,
            name,
            context,
            state,
            registry,
            late,
            router,
            stepping,
            labeler,
            pause,
            frontend,
            interface,
        })
    }

    pub fn thread_id(&self) -> ThreadId {
        self.thread
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn context(&self) -> &Rc<ScriptContext> {
        &self.context
    }

    pub fn router(&self) -> &Router {
        &self.router
    }

    pub fn stepping(&self) -> &Rc<SteppingRelay> {
        &self.stepping
    }

    pub fn labeler(&self) -> &Rc<Labeler> {
        &self.labeler
    }

    pub fn late_bindings(&self) -> &Rc<LateBindings> {
        &self.late
    }

    pub fn is_coordinator(&self) -> bool {
        self.stepping.is_coordinator()
    }

    /// ローカルにだけ関数を束縛する
    pub fn bind(&self, name: &str, f: Function) {
        self.late.set(name, f);
    }

    /// 関数を束縛し、他のコンテキストからも呼べるよう公開する
    pub fn expose(&self, name: &str, f: Function) {
        debug!("'{}' exposes '{}'", self.name, name);
        self.late.set(name, f.clone());
        self.interface.borrow_mut().insert(name.to_string(), f);
    }

    /// このコンテキストから見たスレッド一覧
    pub fn threads(&self) -> Vec<ContextView> {
        self.registry.borrow().view(self.thread)
    }

    /// スレッド一覧をフロントエンドに送る
    pub fn send_threads(&self) {
        self.frontend.emit(&ProtocolEvent::Threads {
            threads: self.threads(),
        });
    }

    /// コールバックのラベルを解決する
    pub fn describe(&self, f: &Function) -> Option<String> {
        self.labeler.describe(f)
    }

    /// 停止してフロントエンドの再開を待つ
    pub fn halt(&self, reason: StopReason) -> bool {
        self.pause.stop(ProtocolEvent::Stopped {
            reason,
            thread_id: self.thread,
        })
    }

    /// 現在の停止スナップショットでフレームIDを発行する
    pub fn frame_id(&self, index: u16) -> FrameId {
        let tag = self.registry.borrow().snapshot_tag(self.thread).unwrap_or(0);
        FrameId::new(self.thread, index, tag)
    }

    /// フレーム呼び出しで渡されたタグが現在のスナップショットのものか
    pub fn validate_frame(&self, tag: i64) -> bool {
        self.router.is_current_frame(tag)
    }

    /// デバッグコンソールに出力する
    pub fn print(&self, output: impl Into<String>) {
        self.frontend.emit(&ProtocolEvent::console(output));
    }

    /// ホストを終了処理中にし、フロントエンドに終了を通知する
    pub fn terminate(&self) {
        self.state.set_terminating();
        self.frontend.emit(&ProtocolEvent::Terminate);
    }
}
