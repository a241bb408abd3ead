//! Unit tests for EventLoop

use super::{virtual_loop, Log};
use async_runtime::{
    Diagnostic, EventLoop, LoopConfig, LoopError, LoopPhase, TaskSource, TimeSource,
};
use core_types::{JsError, Value};
use std::rc::Rc;
use std::time::Duration;

#[test]
fn new_event_loop_is_idle() {
    let (event_loop, _) = virtual_loop();
    assert_eq!(event_loop.phase(), LoopPhase::Idle);
    assert_eq!(event_loop.handle().pending_timers(), 0);
}

#[test]
fn default_loop_uses_system_time() {
    let event_loop = EventLoop::default();
    assert_eq!(event_loop.config().time_source, TimeSource::System);
}

#[test]
fn empty_program_stops_immediately() {
    let (mut event_loop, _) = virtual_loop();
    let report = event_loop.run(|_| Ok(())).unwrap();
    assert_eq!(report.macrotasks_run, 0);
    assert_eq!(report.microtasks_run, 0);
    assert_eq!(event_loop.phase(), LoopPhase::Stopped);
}

#[test]
fn phase_is_observable_from_tasks() {
    let (mut event_loop, _) = virtual_loop();
    let log = Log::default();
    let l = log.clone();
    event_loop
        .run(move |handle| {
            l.push(format!("{:?}", handle.phase()));
            let (h, l2) = (handle.clone(), l.clone());
            handle.queue_microtask(move || Ok(l2.push(format!("{:?}", h.phase()))));
            let (h, l3) = (handle.clone(), l.clone());
            handle.set_timeout(move || Ok(l3.push(format!("{:?}", h.phase()))), 0);
            Ok(())
        })
        .unwrap();
    assert_eq!(
        log.entries(),
        vec!["RunningSync", "DrainingMicrotasks", "RunningMacrotask"]
    );
}

#[test]
fn failing_microtask_does_not_stop_the_loop() {
    let (mut event_loop, sink) = virtual_loop();
    let log = Log::default();
    let l = log.clone();
    let report = event_loop
        .run(move |handle| {
            handle.queue_microtask(|| Err(JsError::type_error("first fails")));
            let l2 = l.clone();
            handle.queue_microtask(move || Ok(l2.push("second")));
            handle.set_timeout(move || Ok(l.push("timer")), 5);
            Ok(())
        })
        .unwrap();
    assert_eq!(log.entries(), vec!["second", "timer"]);
    assert_eq!(report.uncaught_errors, 1);
    assert!(matches!(
        &sink.diagnostics()[0],
        Diagnostic::UncaughtError { source: TaskSource::Microtask, .. }
    ));
}

#[test]
fn request_stop_leaves_later_timers_unfired() {
    let (mut event_loop, _) = virtual_loop();
    let log = Log::default();
    let l = log.clone();
    let report = event_loop
        .run(move |handle| {
            let (h, l1) = (handle.clone(), l.clone());
            handle.set_timeout(
                move || {
                    l1.push("stopper");
                    h.request_stop();
                    Ok(())
                },
                10,
            );
            let l2 = l.clone();
            handle.set_timeout(move || Ok(l2.push("same batch")), 10);
            handle.set_timeout(move || Ok(l.push("later")), 20);
            Ok(())
        })
        .unwrap();
    assert_eq!(log.entries(), vec!["stopper"]);
    assert_eq!(report.unfired_timers, 2);
}

#[test]
fn request_stop_still_drains_current_microtasks() {
    let (mut event_loop, _) = virtual_loop();
    let log = Log::default();
    let l = log.clone();
    event_loop
        .run(move |handle| {
            let h = handle.clone();
            handle.set_timeout(
                move || {
                    h.request_stop();
                    let l2 = l.clone();
                    h.queue_microtask(move || Ok(l2.push("drained")));
                    Ok(())
                },
                0,
            );
            Ok(())
        })
        .unwrap();
    assert_eq!(log.entries(), vec!["drained"]);
}

#[test]
fn second_run_fails() {
    let (mut event_loop, _) = virtual_loop();
    event_loop.run(|_| Ok(())).unwrap();
    let err = event_loop.run(|_| Ok(())).unwrap_err();
    assert!(matches!(err, LoopError::AlreadyStarted));
    assert_eq!(err.to_string(), "event loop has already run");
}

#[test]
fn startup_error_carries_program_error() {
    let (mut event_loop, _) = virtual_loop();
    let err = event_loop
        .run(|_| Err(JsError::type_error("bad start")))
        .unwrap_err();
    match err {
        LoopError::Startup(e) => assert_eq!(e.message, "bad start"),
        other => panic!("unexpected error {:?}", other),
    }
}

#[test]
fn host_operation_keeps_loop_alive() {
    let (mut event_loop, _) = virtual_loop();
    let handle = event_loop.handle();
    let (result, completer) = handle.host_operation();
    let worker = std::thread::spawn(move || {
        std::thread::sleep(Duration::from_millis(20));
        completer.fulfill(Value::Smi(5));
    });
    let log = Log::default();
    let l = log.clone();
    result.then(move |v| Ok(l.push(format!("got {}", v))));
    let report = event_loop.run(|_| Ok(())).unwrap();
    worker.join().unwrap();
    assert_eq!(log.entries(), vec!["got 5"]);
    assert_eq!(report.macrotasks_run, 1);
    assert_eq!(handle.outstanding_host_operations(), 0);
}

#[test]
fn abandoned_host_operation_rejects() {
    let (mut event_loop, _) = virtual_loop();
    let handle = event_loop.handle();
    let (result, completer) = handle.host_operation();
    std::thread::spawn(move || drop(completer)).join().unwrap();
    let caught = result.catch(|e| Ok(Value::from(e.message)));
    event_loop.run(|_| Ok(())).unwrap();
    assert_eq!(caught.value(), Some(Value::from("host operation abandoned")));
}

#[test]
fn request_stop_skips_remaining_host_completions() {
    let (mut event_loop, _) = virtual_loop();
    let log = Log::default();
    let l = log.clone();
    let report = event_loop
        .run(move |handle| {
            let (first, first_done) = handle.host_operation();
            let (second, second_done) = handle.host_operation();
            first_done.fulfill(Value::Smi(1));
            second_done.fulfill(Value::Smi(2));
            let (h, l1) = (handle.clone(), l.clone());
            first.then(move |_| {
                l1.push("first");
                h.request_stop();
                Ok(())
            });
            second.then(move |_| Ok(l.push("second")));
            Ok(())
        })
        .unwrap();
    assert_eq!(log.entries(), vec!["first"]);
    assert_eq!(report.macrotasks_run, 1);
}

#[test]
fn shutdown_discards_pending_work() {
    let (mut event_loop, _) = virtual_loop();
    let handle = event_loop.handle();
    handle.queue_microtask(|| Ok(()));
    handle.set_interval(|| Ok(()), 10);
    let waiting = handle.pending();
    let _result = handle.spawn_async(move |scope| async move { scope.suspend(waiting).await });
    assert_eq!(handle.suspended_frames(), 1);

    event_loop.shutdown();
    assert_eq!(handle.queued_microtasks(), 0);
    assert_eq!(handle.pending_timers(), 0);
    assert_eq!(handle.suspended_frames(), 0);
    assert_eq!(event_loop.phase(), LoopPhase::Stopped);
}

#[test]
fn system_clock_loop_fires_short_timer() {
    let sink = async_runtime::CollectingSink::new();
    let mut event_loop = EventLoop::with_sink(LoopConfig::default(), Rc::new(sink));
    let report = event_loop
        .run(|handle| {
            handle.set_timeout(|| Ok(()), 5);
            Ok(())
        })
        .unwrap();
    assert_eq!(report.timers_fired, 1);
    assert!(report.elapsed_ms >= 5);
}

#[test]
fn run_report_serializes_to_json() {
    let (mut event_loop, _) = virtual_loop();
    let report = event_loop
        .run(|handle| {
            handle.set_timeout(|| Ok(()), 30);
            Ok(())
        })
        .unwrap();
    let json = serde_json::to_value(&report).unwrap();
    assert_eq!(json["elapsed_ms"], 30);
    assert_eq!(json["timers_fired"], 1);
    assert_eq!(json["macrotasks_run"], 1);
    assert_eq!(json["unfired_timers"], 0);
}
