//! コンテキストへのアタッチ全体の統合テスト

use std::rc::Rc;
use tsumugi_core::registry::COORDINATOR_INTERFACE;
use tsumugi_core::stepping::{GET_STEPPING, SET_STEPPING};
use tsumugi_core::{
    Debuggee, Function, Host, ProtocolEvent, RecordingFrontend, StepState, StopReason,
    SharedRegistry, ThreadRegistry, Value, FRAME_CALL, SHARED_LABEL,
};
use tsumugi_host::{
    interface_table, CommandSurface, ErrorPayload, EventSurface, HostError, RemoteSurface,
};

struct World {
    host: Host,
    registry: SharedRegistry,
    frontend: Rc<RecordingFrontend>,
    coordinator: Debuggee,
    beta: Debuggee,
}

fn world() -> World {
    let host = Host::new();
    let registry = ThreadRegistry::shared();
    let frontend = Rc::new(RecordingFrontend::new());

    let coordinator = Debuggee::attach(
        &host,
        host.create_context("level"),
        Rc::clone(&registry),
        frontend.clone(),
        true,
    )
    .expect("Failed to attach coordinator");
    let beta = Debuggee::attach(
        &host,
        host.create_context("beta"),
        Rc::clone(&registry),
        frontend.clone(),
        false,
    )
    .expect("Failed to attach beta");

    World {
        host,
        registry,
        frontend,
        coordinator,
        beta,
    }
}

fn noop() -> Function {
    Function::new(|_| Ok(vec![]))
}

#[test]
fn test_attach_publishes_interfaces() {
    let w = world();
    let remote = w.host.remote();
    assert!(w.coordinator.is_coordinator());
    assert!(!w.beta.is_coordinator());
    assert!(remote.has_function(COORDINATOR_INTERFACE, GET_STEPPING));
    assert!(remote.has_function(COORDINATOR_INTERFACE, SET_STEPPING));
    assert!(remote.has_interface("__debugadapter_beta"));
    assert!(!remote.has_function("__debugadapter_beta", GET_STEPPING));
    // フレーム呼び出しの窓口はどのコアにもある
    assert!(remote.has_function(COORDINATOR_INTERFACE, FRAME_CALL));
    assert!(remote.has_function("__debugadapter_beta", FRAME_CALL));
}

#[test]
fn test_second_coordinator_is_ordinary() {
    let w = world();
    let gamma = Debuggee::attach(
        &w.host,
        w.host.create_context("gamma"),
        Rc::clone(&w.registry),
        w.frontend.clone(),
        true,
    )
    .expect("Failed to attach gamma");

    assert!(!gamma.is_coordinator());
    assert!(w.host.remote().has_interface("__debugadapter_gamma"));
    assert_eq!(
        w.registry.borrow().coordinator().map(|t| t.id),
        Some(w.coordinator.thread_id())
    );
}

#[test]
fn test_stepping_on_coordinator() {
    let w = world();
    w.host.finish_loading();
    let stepping = w.coordinator.stepping();
    stepping.set(Some(2), true).unwrap();
    assert_eq!(stepping.get(true).unwrap(), Some(StepState::new(2, true)));
    assert_eq!(stepping.get(true).unwrap(), None);
}

#[test]
fn test_stepping_delegates_to_coordinator() {
    let w = world();
    w.host.finish_loading();

    w.host.with_callback(|| {
        w.beta.stepping().set(Some(-1), true).unwrap();
    });
    // 状態はコーディネーター側にだけある
    assert_eq!(w.beta.stepping().get_local(false), None);
    assert_eq!(
        w.coordinator.stepping().get(true).unwrap(),
        Some(StepState::new(-1, true))
    );
    assert_eq!(w.host.remote().call_count(), 1);
}

#[test]
fn test_stepping_peek_twice_then_take() {
    let w = world();
    w.host.finish_loading();
    w.coordinator.stepping().set(Some(1), false).unwrap();

    w.host.with_callback(|| {
        let stepping = w.beta.stepping();
        let expected = Some(StepState::new(1, false));
        assert_eq!(stepping.get(false).unwrap(), expected);
        assert_eq!(stepping.get(false).unwrap(), expected);
        assert_eq!(stepping.get(true).unwrap(), expected);
        assert_eq!(stepping.get(true).unwrap(), None);
    });
}

#[test]
fn test_stepping_stays_local_outside_callbacks() {
    let w = world();
    w.host.finish_loading();
    w.beta.stepping().set(Some(3), false).unwrap();

    assert_eq!(w.host.remote().call_count(), 0);
    assert_eq!(w.coordinator.stepping().peek().unwrap(), None);
    assert_eq!(w.beta.stepping().get_local(false), Some(StepState::new(3, false)));
}

#[test]
fn test_registrations_are_labeled() {
    let w = world();
    let context = w.beta.context();

    let tick = noop();
    context.events().on_event("on_tick", Some(tick.clone())).unwrap();
    let init = noop();
    context.events().on_init(Some(init.clone())).unwrap();
    let hello = noop();
    context
        .commands()
        .add_command("hello", "says hello", hello.clone())
        .unwrap();
    let ping = noop();
    context
        .remote()
        .add_interface("beta", interface_table([("ping", ping.clone())]))
        .unwrap();

    assert_eq!(w.beta.describe(&tick).as_deref(), Some("on_tick"));
    assert_eq!(w.beta.describe(&init).as_deref(), Some("on_init"));
    assert_eq!(w.beta.describe(&hello).as_deref(), Some("hello"));
    assert_eq!(w.beta.describe(&ping).as_deref(), Some("ping::beta"));

    // ホストからは計装前と同じように見える
    assert!(context.event_bus().get_event_handler("on_tick").is_some());
    assert!(w.host.commands().command_handler("hello").is_some());
    assert!(w.host.remote().has_function("beta", "ping"));
}

#[test]
fn test_overwrite_keeps_one_label() {
    let w = world();
    let events = w.beta.context().events();

    events.on_event("on_tick", Some(noop())).unwrap();
    let second = noop();
    events.on_event("on_tick", Some(second.clone())).unwrap();

    assert_eq!(w.beta.describe(&second).as_deref(), Some("on_tick"));
    assert_eq!(w.beta.labeler().live_labels(), 1);
    assert!(w.frontend.events().is_empty());
}

#[test]
fn test_overwrite_with_shared_callback_warns() {
    let w = world();
    let events = w.beta.context().events();

    let first = noop();
    events.on_event("on_tick", Some(first.clone())).unwrap();
    let second = noop();
    events.on_event("on_tick", Some(second.clone())).unwrap();

    assert_eq!(w.beta.describe(&first).as_deref(), Some(SHARED_LABEL));
    assert_eq!(w.beta.describe(&second).as_deref(), Some(SHARED_LABEL));
    assert!(matches!(
        &w.frontend.events()[..],
        [ProtocolEvent::Output { category, .. }] if category == "console"
    ));
}

#[test]
fn test_labels_do_not_keep_callbacks_alive() {
    let w = world();
    let f = noop();
    let weak = f.downgrade();
    w.beta.context().events().on_event("on_tick", Some(f)).unwrap();
    assert_eq!(w.beta.labeler().live_labels(), 1);

    // 計装を通さずにホスト側から外す
    w.beta
        .context()
        .event_bus()
        .on_event("on_tick", None)
        .unwrap();
    assert!(!weak.is_alive());
    assert_eq!(w.beta.labeler().live_labels(), 0);
    assert_eq!(w.beta.labeler().prune(), 1);
}

#[test]
fn test_exposed_function_labeled_as_remote() {
    let w = world();
    let ping = noop();
    w.beta.expose("ping", ping.clone());
    assert_eq!(
        w.beta.describe(&ping),
        None,
        "the core's own interface is not instrumented"
    );

    let table = interface_table(Vec::<(String, Function)>::new());
    w.beta
        .context()
        .remote()
        .add_interface("beta", table.clone())
        .unwrap();
    let late = noop();
    table.borrow_mut().insert("late".into(), late.clone());
    assert_eq!(w.beta.describe(&late).as_deref(), Some("remote late::beta"));
}

#[test]
fn test_protected_call_failure_pauses_once() {
    let w = world();
    let protected = w.beta.context().protected();
    let failing = Function::new(|_| Err(HostError::script("boom")));

    let result = protected.pcall(&failing, &[]);
    assert!(!result.ok);
    assert_eq!(result.values, vec![Value::from("boom")]);
    assert_eq!(
        w.frontend.events(),
        vec![ProtocolEvent::Exception {
            thread_id: w.beta.thread_id(),
            filter: "pcall".into(),
            message: ErrorPayload::Message("boom".into()),
        }]
    );
    assert_eq!(w.frontend.waits(), vec![1]);
    assert_eq!(w.frontend.resume_count(), 1);
}

#[test]
fn test_threads_view() {
    let w = world();
    let threads = w.beta.threads();
    assert_eq!(threads.len(), 2);
    assert_eq!(threads[0].name, "level");
    assert!(!threads[0].is_local);
    assert!(threads[1].is_local);

    w.beta.send_threads();
    assert!(matches!(
        &w.frontend.events()[..],
        [ProtocolEvent::Threads { threads }] if threads.len() == 2
    ));
}

#[test]
fn test_terminate_skips_waits() {
    let w = world();
    w.beta.terminate();
    assert!(!w.beta.halt(StopReason::Pause));
    assert_eq!(
        w.frontend.events(),
        vec![
            ProtocolEvent::Terminate,
            ProtocolEvent::Stopped {
                reason: StopReason::Pause,
                thread_id: w.beta.thread_id(),
            },
        ]
    );
    assert!(w.frontend.waits().is_empty());
}
