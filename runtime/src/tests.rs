#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)] // Test code can use unwrap/expect/panic

use super::*;
use serde_json::{Value, json};
use simple_state_core::FnReducer;
use simple_state_testing::{CallLog, Recorder, test_clock};
use std::cell::{Cell, RefCell};
use std::rc::Rc;

// Test state
#[derive(Debug, Clone, PartialEq, Default, serde::Serialize)]
struct Chat {
    content: String,
}

impl Chat {
    fn new(content: &str) -> Self {
        Self {
            content: content.to_string(),
        }
    }
}

// Test reducer
struct ChatReducer;

impl Reducer<Chat> for ChatReducer {
    fn reduce(&self, state: &Chat, action: &Action) -> Result<Chat, BoxError> {
        match action.action_type() {
            "addMessage" => {
                let message = action.get_str("content").ok_or("addMessage without content")?;
                Ok(Chat {
                    content: format!("{}\n{message}", state.content),
                })
            },
            "clear" => Ok(Chat::default()),
            "fail" => Err("rejected".into()),
            _ => Ok(state.clone()),
        }
    }
}

fn chat_store(initial: &str) -> Store<Chat> {
    let store = Store::with_clock(Chat::new(initial), StoreConfig::default(), test_clock());
    store
        .register_action_with("addMessage", |_, args| json!({ "content": args.first() }))
        .unwrap()
        .register_action("clear")
        .unwrap()
        .register_action("fail")
        .unwrap();
    store.set_reducer(ChatReducer);
    store
}

fn contents(recorder: &Recorder<Chat>) -> Vec<String> {
    recorder.calls().into_iter().map(|chat| chat.content).collect()
}

mod registration {
    use super::*;

    #[test]
    fn test_register_exposes_invoker_and_registrar() {
        let store = chat_store("");

        let invoker = store.member("addMessage").unwrap();
        assert!(invoker.is_invoker());
        assert_eq!(invoker.handle().name(), "addMessage");

        let registrar = store.member("onAddMessage").unwrap();
        assert!(registrar.is_registrar());
        assert_eq!(registrar.handle().name(), "addMessage");
        assert_eq!(registrar.handle().subscription_name(), "onAddMessage");

        assert!(store.member("onMissing").is_none());
        assert!(store.member("missing").is_none());
    }

    #[test]
    fn test_registered_actions_are_sorted() {
        let store = chat_store("");
        assert_eq!(store.registered_actions(), vec!["addMessage", "clear", "fail"]);
        assert!(store.has_action("clear"));
        assert!(!store.has_action("onClear"));
    }

    #[test]
    fn test_invalid_names_are_rejected() {
        let store: Store<Chat> = Store::new(Chat::default());

        for name in ["", "*", "add message", "tab\tbed"] {
            let result = store.register_action(name);
            assert!(
                matches!(result, Err(StoreError::InvalidActionName { .. })),
                "{name:?} should be rejected"
            );
        }
        assert!(store.registered_actions().is_empty());
    }

    #[test]
    fn test_reregistration_resets_listeners_and_transform() {
        let store = chat_store("");
        let seen = Recorder::<Chat>::new();
        store.on("addMessage", seen.listener()).unwrap();
        assert_eq!(store.listener_count("addMessage"), Some(1));

        store
            .register_action_with("addMessage", |_, _| json!({ "content": "fixed" }))
            .unwrap();
        assert_eq!(store.listener_count("addMessage"), Some(0));

        store.dispatch("addMessage", &[json!("ignored")]).unwrap();
        assert!(seen.is_empty());
        assert_eq!(store.current_state().content, "\nfixed");
    }

    #[test]
    fn test_invoker_wins_member_collision() {
        let store: Store<Chat> = Store::new(Chat::default());
        store.register_action("x").unwrap().register_action("onX").unwrap();

        let member = store.member("onX").unwrap();
        assert!(member.is_invoker());
        assert_eq!(member.handle().name(), "onX");
    }

    #[test]
    fn test_colliding_subscription_member_follows_latest_registration() {
        let store: Store<Chat> = Store::new(Chat::default());
        store
            .register_action("addMessage")
            .unwrap()
            .register_action("AddMessage")
            .unwrap();

        let registrar = store.member("onAddMessage").unwrap();
        assert!(registrar.is_registrar());
        assert_eq!(registrar.handle().name(), "AddMessage");

        // The first action stays reachable by name
        assert_eq!(store.action("addMessage").unwrap().name(), "addMessage");
        assert_eq!(store.registered_actions(), vec!["AddMessage", "addMessage"]);
    }

    #[test]
    fn test_subscribing_to_unknown_action_fails() {
        let store = chat_store("");
        let result = store.on("missing", |_| {});
        assert!(matches!(result, Err(StoreError::UnknownAction(name)) if name == "missing"));
    }
}

mod dispatch {
    use super::*;

    #[test]
    fn test_hello_world() {
        let store = chat_store("hello");
        let sink = Recorder::<Snapshot<Chat>>::new();
        store.connect(sink.fallible());

        store.dispatch("addMessage", &[json!("world")]).unwrap();

        assert_eq!(store.current_state().content, "hello\nworld");
        assert_eq!(sink.len(), 1);
        let snapshot = sink.last().unwrap();
        assert_eq!(snapshot.state().content, "hello\nworld");
        assert_eq!(snapshot.action(), "addMessage");
        assert_eq!(snapshot.version(), 1);
    }

    #[test]
    fn test_unknown_action_runs_nothing() {
        let store = chat_store("hello");
        let sink = Recorder::<Snapshot<Chat>>::new();
        let all = Recorder::<Chat>::new();
        store.connect(sink.fallible());
        store.subscribe_all(all.listener());

        let result = store.dispatch("missing", &[]);

        assert!(matches!(result, Err(StoreError::UnknownAction(_))));
        assert_eq!(store.current_state().content, "hello");
        assert_eq!(store.version(), 0);
        assert!(sink.is_empty());
        assert!(all.is_empty());
    }

    #[test]
    fn test_reducer_failure_commits_nothing() {
        let store = chat_store("hello");
        let sink = Recorder::<Snapshot<Chat>>::new();
        let named = Recorder::<Chat>::new();
        let all = Recorder::<Chat>::new();
        store.connect(sink.fallible());
        store.on("fail", named.listener()).unwrap();
        store.subscribe_all(all.listener());

        let result = store.dispatch("fail", &[]);

        match result {
            Err(StoreError::Reducer { action, source }) => {
                assert_eq!(action, "fail");
                assert_eq!(source.to_string(), "rejected");
            },
            other => panic!("expected reducer error, got {other:?}"),
        }
        assert_eq!(store.current_state().content, "hello");
        assert_eq!(store.version(), 0);
        assert!(named.is_empty());
        assert!(all.is_empty());
        assert!(sink.is_empty());
        assert!(store.dead_letters().is_empty());
    }

    #[test]
    fn test_missing_transform_sends_bare_action() {
        let store: Store<Chat> = Store::new(Chat::default());
        let seen = Rc::new(RefCell::new(Vec::new()));
        let log = Rc::clone(&seen);
        store.register_action("ping").unwrap();
        store.set_reducer_fn(move |state: &Chat, action| {
            log.borrow_mut().push(serde_json::to_value(action).unwrap());
            Ok(state.clone())
        });

        store.dispatch("ping", &[json!(1), json!(2)]).unwrap();

        assert_eq!(*seen.borrow(), vec![json!({ "type": "ping" })]);
    }

    #[test]
    fn test_transform_sees_previous_state_and_args() {
        let store = Store::new(10_i64);
        store
            .register_action_with("add", |count: &i64, args: &[Value]| {
                let by = args.first().and_then(Value::as_i64).unwrap_or(0);
                json!({ "from": count, "by": by })
            })
            .unwrap();
        store.set_reducer_fn(|count: &i64, action| {
            assert_eq!(action.get("from"), Some(&json!(count)));
            Ok(count + action.get("by").and_then(Value::as_i64).unwrap_or(0))
        });

        store.dispatch("add", &[json!(5)]).unwrap().dispatch("add", &[json!(-2)]).unwrap();

        assert_eq!(store.current_state(), 13);
    }

    #[test]
    fn test_transform_type_field_is_overridden() {
        let store = Store::new(String::new());
        store
            .register_action_with("rename", |_, _| json!({ "type": "spoofed", "to": "x" }))
            .unwrap();
        store.set_reducer_fn(|_: &String, action| Ok(action.action_type().to_string()));

        store.dispatch("rename", &[]).unwrap();

        assert_eq!(store.current_state(), "rename");
    }

    #[test]
    fn test_placeholder_reducer_is_noop() {
        let store = Store::new(Chat::new("hello"));
        let transformed = Rc::new(Cell::new(0));
        let counter = Rc::clone(&transformed);
        store
            .register_action_with("addMessage", move |_, _| {
                counter.set(counter.get() + 1);
                Value::Null
            })
            .unwrap();
        let sink = Recorder::<Snapshot<Chat>>::new();
        let all = Recorder::<Chat>::new();
        store.connect(sink.fallible());
        store.subscribe_all(all.listener());

        assert!(!store.has_reducer());
        store.dispatch("addMessage", &[json!("world")]).unwrap();

        assert_eq!(transformed.get(), 1);
        assert_eq!(store.current_state().content, "hello");
        assert_eq!(store.version(), 0);
        assert!(sink.is_empty());
        assert!(all.is_empty());
    }

    #[test]
    fn test_replacing_reducer_takes_effect() {
        let store = chat_store("a");
        store.set_reducer(FnReducer::new(|_: &Chat, _: &Action| Ok(Chat::new("replaced"))));

        store.dispatch("clear", &[]).unwrap();

        assert_eq!(store.current_state().content, "replaced");
    }

    #[test]
    fn test_version_counts_committed_dispatches() {
        let store = chat_store("");

        store.dispatch("addMessage", &[json!("a")]).unwrap();
        let _ = store.dispatch("fail", &[]);
        let _ = store.dispatch("missing", &[]);
        store.dispatch("clear", &[]).unwrap();

        assert_eq!(store.version(), 2);
    }

    #[test]
    fn test_action_handle_invokes_and_subscribes() {
        let store = chat_store("hello");
        let seen = Recorder::<Chat>::new();
        let handle = store.action("addMessage").unwrap();

        handle.subscribe(seen.listener()).unwrap();
        handle.invoke(&[json!("world")]).unwrap();

        assert_eq!(contents(&seen), vec!["hello\nworld"]);
        assert!(store.action("missing").is_none());
    }
}

mod notification {
    use super::*;

    #[test]
    fn test_named_then_wildcard_then_sink() {
        let store = chat_store("");
        let log = CallLog::<Chat>::new();

        store.subscribe_all(log.marker("all-1"));
        store.on("addMessage", log.marker("named-1")).unwrap();
        store.subscribe_all(log.marker("all-2"));
        store.on("addMessage", log.marker("named-2")).unwrap();
        let sink_entries = log.clone();
        store.connect(move |_| {
            sink_entries.push("sink");
            Ok(())
        });

        store.dispatch("addMessage", &[json!("x")]).unwrap();

        assert_eq!(log.entries(), vec!["named-1", "named-2", "all-1", "all-2", "sink"]);
    }

    #[test]
    fn test_listeners_receive_committed_state() {
        let store = chat_store("hello");
        let named = Recorder::<Chat>::new();
        let all = Recorder::<Chat>::new();
        store.on("addMessage", named.listener()).unwrap();
        store.subscribe_all(all.listener());

        store.dispatch("addMessage", &[json!("world")]).unwrap();

        assert_eq!(contents(&named), vec!["hello\nworld"]);
        assert_eq!(contents(&all), vec!["hello\nworld"]);
    }

    #[test]
    fn test_only_the_dispatched_action_notifies_its_listeners() {
        let store = chat_store("");
        let add = Recorder::<Chat>::new();
        let clear = Recorder::<Chat>::new();
        store.on("addMessage", add.listener()).unwrap();
        store.on("clear", clear.listener()).unwrap();

        store.dispatch("clear", &[]).unwrap();

        assert!(add.is_empty());
        assert_eq!(clear.len(), 1);
    }

    #[test]
    fn test_wildcard_sees_every_action() {
        let store = chat_store("");
        let all = Recorder::<Chat>::new();
        store.subscribe_all(all.listener());

        store
            .dispatch("addMessage", &[json!("a")])
            .unwrap()
            .dispatch("clear", &[])
            .unwrap()
            .dispatch("addMessage", &[json!("b")])
            .unwrap();

        assert_eq!(contents(&all), vec!["\na", "", "\nb"]);
        assert_eq!(store.listener_count("*"), Some(1));
    }

    #[test]
    fn test_snapshot_serializes_state_and_metadata() {
        let store = chat_store("hello");
        let sink = Recorder::<Snapshot<Chat>>::new();
        store.connect(sink.fallible());

        store.dispatch("addMessage", &[json!("world")]).unwrap();

        let value = serde_json::to_value(sink.last().unwrap()).unwrap();
        assert_eq!(
            value,
            json!({
                "state": { "content": "hello\nworld" },
                "version": 1,
                "action": "addMessage",
                "actions": ["addMessage", "clear", "fail"],
                "taken_at": "2025-01-01T00:00:00Z",
            })
        );
    }

    #[test]
    fn test_snapshot_subscriptions_register_listeners() {
        let store = chat_store("");
        let late = Recorder::<Chat>::new();
        let registered = Rc::new(Cell::new(false));
        let late_listener = late.clone();
        let flag = Rc::clone(&registered);
        store.connect(move |snapshot: &Snapshot<Chat>| {
            if !flag.get() {
                flag.set(true);
                snapshot.subscriptions().on("clear", late_listener.listener())?;
            }
            Ok(())
        });

        store.dispatch("addMessage", &[json!("a")]).unwrap();
        assert_eq!(store.listener_count("clear"), Some(1));

        store.dispatch("clear", &[]).unwrap();
        assert_eq!(late.len(), 1);
    }

    #[test]
    fn test_subscriptions_detach_when_store_dropped() {
        let store = chat_store("");
        let kept = Rc::new(RefCell::new(None));
        let slot = Rc::clone(&kept);
        store.connect(move |snapshot: &Snapshot<Chat>| {
            *slot.borrow_mut() = Some(snapshot.subscriptions().clone());
            Ok(())
        });
        store.dispatch("clear", &[]).unwrap();
        drop(store);

        let subscriptions = kept.borrow_mut().take().unwrap();
        assert!(!subscriptions.is_attached());
        assert!(matches!(subscriptions.subscribe_all(|_| {}), Err(StoreError::Detached)));
    }
}

mod failures {
    use super::*;

    #[test]
    fn test_failing_listener_does_not_stop_others() {
        let store = chat_store("");
        let first = Recorder::<Chat>::new();
        let after = Recorder::<Chat>::new();
        let all = Recorder::<Chat>::new();
        let sink = Recorder::<Snapshot<Chat>>::new();
        store.try_on("addMessage", first.failing("listener down")).unwrap();
        store.on("addMessage", after.listener()).unwrap();
        store.subscribe_all(all.listener());
        store.connect(sink.fallible());

        store.dispatch("addMessage", &[json!("a")]).unwrap();

        assert_eq!(first.len(), 1);
        assert_eq!(after.len(), 1);
        assert_eq!(all.len(), 1);
        assert_eq!(sink.len(), 1);
        assert_eq!(store.current_state().content, "\na");

        let letters = store.dead_letters().drain();
        assert_eq!(letters.len(), 1);
        assert_eq!(letters[0].action, "addMessage");
        assert_eq!(letters[0].target, FailureTarget::Listener { index: 0 });
        assert_eq!(letters[0].error_message, "listener down");
        assert_eq!(letters[0].version, 1);
        assert_eq!(letters[0].recorded_at, test_clock_now());
    }

    #[test]
    fn test_failing_wildcard_listener_is_recorded() {
        let store = chat_store("");
        let all = Recorder::<Chat>::new();
        store.subscribe_all(|_| {});
        store.try_subscribe_all(all.failing("wildcard down"));

        store.dispatch("clear", &[]).unwrap();

        let letter = store.dead_letters().peek().unwrap();
        assert_eq!(letter.target, FailureTarget::Wildcard { index: 1 });
    }

    #[test]
    fn test_sink_failure_logged_by_default() {
        let store = chat_store("");
        let sink = Recorder::<Snapshot<Chat>>::new();
        store.connect(sink.failing("sink down"));

        let result = store.dispatch("addMessage", &[json!("a")]);

        assert!(result.is_ok());
        assert_eq!(store.current_state().content, "\na");
        let letter = store.dead_letters().peek().unwrap();
        assert_eq!(letter.target, FailureTarget::Sink);
        assert_eq!(letter.error_message, "sink down");
    }

    #[test]
    fn test_sink_failure_propagates_when_configured() {
        let config = StoreConfig::default().with_sink_policy(SinkPolicy::Propagate);
        let store = Store::with_config(Chat::default(), config);
        store.register_action("clear").unwrap();
        store.set_reducer(ChatReducer);
        let sink = Recorder::<Snapshot<Chat>>::new();
        store.connect(sink.failing("sink down"));

        let result = store.dispatch("clear", &[]);

        match result {
            Err(error) => {
                assert!(error.is_post_commit());
                assert!(matches!(error, StoreError::Sink { .. }));
            },
            Ok(_) => panic!("expected sink error"),
        }
        assert_eq!(store.version(), 1);
        assert_eq!(store.dead_letters().len(), 1);
    }

    #[test]
    fn test_dead_letters_bounded_by_config() {
        let config = StoreConfig::default().with_dlq_max_size(2);
        let store = Store::with_config(0_u32, config);
        store.register_action("tick").unwrap();
        store.set_reducer_fn(|n: &u32, _| Ok(n + 1));
        store.try_subscribe_all(|_| Err("down".into()));

        for _ in 0..5 {
            store.dispatch("tick", &[]).unwrap();
        }

        let letters = store.dead_letters().drain();
        assert_eq!(letters.iter().map(|l| l.version).collect::<Vec<_>>(), vec![4, 5]);
    }

    fn test_clock_now() -> chrono::DateTime<chrono::Utc> {
        use simple_state_core::Clock;
        test_clock().now()
    }
}

mod reentrancy {
    use super::*;

    #[test]
    fn test_transform_may_dispatch_before_reducer_runs() {
        let store = Store::new(0_i64);
        let inner = store.clone();
        store.register_action("bump").unwrap();
        store
            .register_action_with("outer", move |_, _| {
                inner.dispatch("bump", &[]).unwrap();
                Value::Null
            })
            .unwrap();
        store.set_reducer_fn(|n: &i64, action| match action.action_type() {
            "bump" => Ok(n + 1),
            "outer" => Ok(n + 10),
            _ => Ok(*n),
        });
        let all = Recorder::<i64>::new();
        store.subscribe_all(all.listener());

        store.dispatch("outer", &[]).unwrap();

        assert_eq!(store.current_state(), 11);
        assert_eq!(store.version(), 2);
        assert_eq!(all.calls(), vec![1, 11]);
    }

    #[test]
    fn test_listener_may_dispatch() {
        let store = chat_store("");
        let inner = store.clone();
        let all = Recorder::<Chat>::new();
        store
            .on("clear", move |_| {
                inner.dispatch("addMessage", &[json!("after clear")]).unwrap();
            })
            .unwrap();
        store.subscribe_all(all.listener());

        store.dispatch("clear", &[]).unwrap();

        assert_eq!(store.current_state().content, "\nafter clear");
        assert_eq!(store.version(), 2);
        // The nested dispatch notifies first; the outer wildcard pass then
        // observes the latest state.
        assert_eq!(contents(&all), vec!["\nafter clear", "\nafter clear"]);
    }

    #[test]
    fn test_listener_may_subscribe() {
        let store = chat_store("");
        let inner = store.clone();
        let late = Recorder::<Chat>::new();
        let late_listener = late.clone();
        store
            .on("clear", move |_| {
                inner.on("addMessage", late_listener.listener()).unwrap();
            })
            .unwrap();

        store.dispatch("clear", &[]).unwrap();
        assert!(late.is_empty());

        store.dispatch("addMessage", &[json!("x")]).unwrap();
        assert_eq!(late.len(), 1);
    }

    #[test]
    fn test_transform_and_reducer_may_read_store() {
        let store = Store::new(1_i64);
        let reader = store.clone();
        store
            .register_action_with("double", move |_, _| json!({ "seen": reader.current_state() }))
            .unwrap();
        store.set_reducer_fn(|n: &i64, action| {
            Ok(n + action.get("seen").and_then(Value::as_i64).unwrap_or(0))
        });

        store.dispatch("double", &[]).unwrap();

        assert_eq!(store.current_state(), 2);
    }
}

mod accessors {
    use super::*;

    #[test]
    fn test_state_closure_reads_without_cloning() {
        let store = chat_store("hello");
        let len = store.state(|chat| chat.content.len());
        assert_eq!(len, 5);
    }

    #[test]
    fn test_config_and_debug() {
        let store: Store<Chat> =
            Store::with_config(Chat::default(), StoreConfig::default().with_name("chat"));
        assert_eq!(store.config().name, "chat");

        let debug = format!("{store:?}");
        assert!(debug.contains("chat"));
        assert!(debug.contains("has_reducer: false"));
    }

    #[test]
    fn test_clones_share_the_container() {
        let store = chat_store("");
        let other = store.clone();

        other.dispatch("addMessage", &[json!("x")]).unwrap();

        assert_eq!(store.version(), 1);
        assert_eq!(store.listener_count("missing"), None);
    }
}
