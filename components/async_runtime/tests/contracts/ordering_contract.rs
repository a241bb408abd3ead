//! Ordering contracts: sync before microtasks before macrotasks

use async_runtime::{CollectingSink, EventLoop, Handle, LoopConfig};
use core_types::Value;
use std::cell::RefCell;
use std::rc::Rc;

type Log = Rc<RefCell<Vec<String>>>;

fn run_logged<F>(program: F) -> Vec<String>
where
    F: FnOnce(&Handle, &Log),
{
    let log: Log = Rc::default();
    let sink = CollectingSink::new();
    let mut event_loop = EventLoop::with_sink(LoopConfig::virtual_time(), Rc::new(sink.clone()));
    let l = log.clone();
    event_loop
        .run(move |handle| {
            program(handle, &l);
            Ok(())
        })
        .unwrap();
    assert!(sink.is_empty(), "unexpected diagnostics: {:?}", sink.diagnostics());
    let entries = log.borrow().clone();
    entries
}

fn push(log: &Log, entry: &str) -> impl FnOnce() -> Result<(), core_types::JsError> {
    let (log, entry) = (log.clone(), entry.to_string());
    move || {
        log.borrow_mut().push(entry);
        Ok(())
    }
}

#[test]
fn sync_then_microtask_then_timer() {
    let order = run_logged(|handle, log| {
        handle.set_timeout(push(log, "timerA"), 0);
        handle.queue_microtask(push(log, "m1"));
        log.borrow_mut().push("sync".into());
    });
    assert_eq!(order, vec!["sync", "m1", "timerA"]);
}

#[test]
fn already_resolved_then_runs_after_sync_block() {
    let order = run_logged(|handle, log| {
        let l = log.clone();
        handle.resolved(Value::from("x")).then(move |x| {
            l.borrow_mut().push(format!("f({})", x));
            Ok(())
        });
        log.borrow_mut().push("end of sync block".into());
    });
    assert_eq!(order, vec!["end of sync block", "f(x)"]);
}

#[test]
fn microtask_sources_share_one_fifo_queue() {
    let order = run_logged(|handle, log| {
        handle.queue_microtask(push(log, "queued 1"));
        let l = log.clone();
        handle.resolved(()).then(move |_| {
            l.borrow_mut().push("then".into());
            Ok(())
        });
        let l = log.clone();
        handle.spawn_async(move |scope| async move {
            scope.suspend(()).await?;
            l.borrow_mut().push("resume".into());
            Ok(())
        });
        handle.queue_microtask(push(log, "queued 2"));
    });
    assert_eq!(order, vec!["queued 1", "then", "resume", "queued 2"]);
}

#[test]
fn drain_reaches_fixed_point_before_next_macrotask() {
    let order = run_logged(|handle, log| {
        handle.set_timeout(push(log, "timer"), 0);
        let (h, l) = (handle.clone(), log.clone());
        handle.queue_microtask(move || {
            l.borrow_mut().push("m1".into());
            let (h2, l2) = (h.clone(), l.clone());
            h.queue_microtask(move || {
                l2.borrow_mut().push("m2".into());
                h2.queue_microtask(push(&l2, "m3"));
                Ok(())
            });
            Ok(())
        });
    });
    assert_eq!(order, vec!["m1", "m2", "m3", "timer"]);
}

#[test]
fn microtasks_from_a_timer_run_before_the_next_timer() {
    let order = run_logged(|handle, log| {
        let (h, l) = (handle.clone(), log.clone());
        handle.set_timeout(
            move || {
                l.borrow_mut().push("t1".into());
                h.queue_microtask(push(&l, "t1 microtask"));
                Ok(())
            },
            10,
        );
        handle.set_timeout(push(log, "t2"), 10);
    });
    assert_eq!(order, vec!["t1", "t1 microtask", "t2"]);
}

#[test]
fn timers_fire_in_time_order_with_insertion_tie_break() {
    let order = run_logged(|handle, log| {
        handle.set_timeout(push(log, "30a"), 30);
        handle.set_timeout(push(log, "10"), 10);
        handle.set_timeout(push(log, "30b"), 30);
        handle.set_timeout(push(log, "0"), 0);
    });
    assert_eq!(order, vec!["0", "10", "30a", "30b"]);
}

#[test]
fn chained_thens_each_take_a_microtask() {
    let order = run_logged(|handle, log| {
        let (l1, l2) = (log.clone(), log.clone());
        handle
            .resolved(Value::Smi(1))
            .then(move |v| {
                l1.borrow_mut().push(format!("a{}", v));
                Ok(Value::Smi(2))
            })
            .then(move |v| {
                l2.borrow_mut().push(format!("a{}", v));
                Ok(())
            });
        let l3 = log.clone();
        handle.resolved(()).then(move |_| {
            l3.borrow_mut().push("b".into());
            Ok(())
        });
    });
    assert_eq!(order, vec!["a1", "b", "a2"]);
}
