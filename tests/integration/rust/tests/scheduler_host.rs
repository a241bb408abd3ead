//! Scheduler and host module integration tests
//!
//! Drives the event loop with host work: file system calls completed on
//! other threads, console output from every kind of task, and diagnostics
//! for work that fails after startup.

use async_runtime::{CollectingSink, Diagnostic, EventLoop, LoopConfig, TaskSource};
use core_types::{ErrorKind, JsError, Value};
use host_modules::{Console, FileSystem};
use std::cell::RefCell;
use std::rc::Rc;
use std::thread;
use std::time::Duration;

fn virtual_loop() -> (EventLoop, CollectingSink) {
    let sink = CollectingSink::new();
    let event_loop = EventLoop::with_sink(LoopConfig::virtual_time(), Rc::new(sink.clone()));
    (event_loop, sink)
}

fn capture_console() -> (Rc<Console>, Rc<RefCell<Vec<String>>>) {
    let output = Rc::new(RefCell::new(Vec::new()));
    (Rc::new(Console::new_with_output(output.clone())), output)
}

/// A file read completed on a worker thread resumes the awaiting computation
#[test]
fn test_async_file_read_on_worker_thread() {
    let dir = tempfile::tempdir().unwrap();
    let fs = FileSystem::new(dir.path());
    fs.write_file_sync("greeting.txt", "hello from disk").unwrap();

    let (console, output) = capture_console();
    let mut event_loop = EventLoop::new(LoopConfig::default());

    let c = console.clone();
    let report = event_loop
        .run(move |handle| {
            let (contents, completer) = handle.host_operation();
            let worker_fs = fs.clone();
            thread::spawn(move || match worker_fs.read_file_sync("greeting.txt", None) {
                Ok(data) => completer.fulfill(data.into_value()),
                Err(e) => completer.reject(e.into()),
            });

            let c2 = c.clone();
            handle.spawn_async(move |scope| async move {
                let text = scope.suspend(contents).await?;
                c2.log(&["read:".into(), text]);
                Ok(())
            });
            c.log(&["sync done".into()]);
            Ok(())
        })
        .unwrap();

    assert_eq!(*output.borrow(), vec!["sync done", "read: hello from disk"]);
    assert_eq!(report.macrotasks_run, 1);
    assert_eq!(report.suspended_frames, 0);
}

/// A failed host call rejects the awaiting computation, which can recover
#[test]
fn test_host_error_propagates_into_computation() {
    let dir = tempfile::tempdir().unwrap();
    let fs = FileSystem::new(dir.path());
    let (mut event_loop, sink) = virtual_loop();
    let output = Rc::new(RefCell::new(Vec::new()));

    let out = output.clone();
    event_loop
        .run(move |handle| {
            let (contents, completer) = handle.host_operation();
            thread::spawn(move || match fs.read_file_sync("missing.txt", None) {
                Ok(data) => completer.fulfill(data.into_value()),
                Err(e) => completer.reject(e.into()),
            });
            let result = handle.spawn_async(move |scope| async move {
                scope.suspend(contents).await?;
                Ok(Value::from("unreachable"))
            });
            result.catch(move |error| {
                out.borrow_mut().push(error.to_string());
                Ok(())
            });
            Ok(())
        })
        .unwrap();

    assert_eq!(
        *output.borrow(),
        vec!["Error: ENOENT: no such file or directory, 'missing.txt'"]
    );
    assert!(sink.is_empty());
}

/// Console output from timers, microtasks and resumes lands in scheduler order
#[test]
fn test_console_order_across_task_kinds() {
    let (mut event_loop, _) = virtual_loop();
    let (console, output) = capture_console();

    let c = console.clone();
    event_loop
        .run(move |handle| {
            let c1 = c.clone();
            handle.set_timeout(
                move || {
                    c1.log(&["timeout 10".into()]);
                    Ok(())
                },
                10,
            );
            let c2 = c.clone();
            handle.set_immediate(move || {
                c2.log(&["immediate".into()]);
                Ok(())
            });
            let c3 = c.clone();
            handle.spawn_async(move |scope| async move {
                c3.log(&["async start".into()]);
                scope.suspend(()).await?;
                c3.log(&["async resumed".into()]);
                Ok(())
            });
            let c4 = c.clone();
            handle.queue_microtask(move || {
                c4.log(&["microtask".into()]);
                Ok(())
            });
            c.log(&["sync end".into()]);
            Ok(())
        })
        .unwrap();

    assert_eq!(
        *output.borrow(),
        vec![
            "async start",
            "sync end",
            "async resumed",
            "microtask",
            "immediate",
            "timeout 10",
        ]
    );
}

/// An interval prints until it clears itself
#[test]
fn test_interval_with_console() {
    let (mut event_loop, _) = virtual_loop();
    let (console, output) = capture_console();

    let report = event_loop
        .run(move |handle| {
            let count = Rc::new(RefCell::new(0));
            let id = Rc::new(RefCell::new(None));
            let (h, id_inner) = (handle.clone(), id.clone());
            let timer = handle.set_interval(
                move || {
                    *count.borrow_mut() += 1;
                    let n = *count.borrow();
                    console.log(&["tick".into(), n.into()]);
                    if n == 3 {
                        if let Some(id) = *id_inner.borrow() {
                            h.clear_interval(id);
                        }
                    }
                    Ok(())
                },
                25,
            );
            *id.borrow_mut() = Some(timer);
            Ok(())
        })
        .unwrap();

    assert_eq!(*output.borrow(), vec!["tick 1", "tick 2", "tick 3"]);
    assert_eq!(report.timers_fired, 3);
    assert_eq!(report.elapsed_ms, 75);
}

/// Failures after startup are diagnostics, not run errors
#[test]
fn test_diagnostics_for_late_failures() {
    let (mut event_loop, sink) = virtual_loop();

    let report = event_loop
        .run(|handle| {
            handle.set_timeout(|| Err(JsError::type_error("timer blew up")), 5);
            handle.queue_microtask(|| Err(JsError::new(ErrorKind::RangeError, "too far")));
            drop(handle.rejected(JsError::thrown(Value::from("nobody listens"))));
            Ok(())
        })
        .unwrap();

    assert_eq!(report.uncaught_errors, 2);
    assert_eq!(
        sink.unhandled_rejections(),
        vec![JsError::thrown(Value::from("nobody listens"))]
    );
    let sources: Vec<TaskSource> = sink
        .diagnostics()
        .into_iter()
        .filter_map(|d| match d {
            Diagnostic::UncaughtError { source, .. } => Some(source),
            Diagnostic::UnhandledRejection { .. } => None,
        })
        .collect();
    assert_eq!(sources.len(), 2);
    assert_eq!(sources[0], TaskSource::Microtask);
    assert!(matches!(sources[1], TaskSource::Timer(_)));
}

/// The shutdown deadline leaves later timers unfired
#[test]
fn test_shutdown_deadline() {
    let sink = CollectingSink::new();
    let config = LoopConfig::virtual_time().with_shutdown_after(Duration::from_millis(50));
    let mut event_loop = EventLoop::with_sink(config, Rc::new(sink));
    let (console, output) = capture_console();

    let report = event_loop
        .run(move |handle| {
            for delay in [10, 40, 60, 1000] {
                let c = console.clone();
                handle.set_timeout(
                    move || {
                        c.log(&[Value::Smi(delay)]);
                        Ok(())
                    },
                    delay as i64,
                );
            }
            Ok(())
        })
        .unwrap();

    assert_eq!(*output.borrow(), vec!["10", "40"]);
    assert_eq!(report.timers_fired, 2);
    assert_eq!(report.unfired_timers, 2);
}
