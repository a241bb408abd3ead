//! Unit tests for async computations and suspend points

use super::{virtual_loop, Log};
use async_runtime::DeferredState;
use core_types::{JsError, Value};

#[test]
fn caller_sees_pending_value_at_first_suspend() {
    let (mut event_loop, _) = virtual_loop();
    let log = Log::default();
    let l = log.clone();
    event_loop
        .run(move |handle| {
            let inner = l.clone();
            let result = handle.spawn_async(move |scope| async move {
                inner.push("before");
                scope.suspend(()).await?;
                inner.push("after");
                Ok(())
            });
            l.push(format!("caller {:?}", result.state()));
            Ok(())
        })
        .unwrap();
    assert_eq!(log.entries(), vec!["before", "caller Pending", "after"]);
}

#[test]
fn sequential_suspends_resume_in_program_order() {
    let (mut event_loop, _) = virtual_loop();
    let handle = event_loop.handle();
    let log = Log::default();
    let slow = handle.pending();
    let s = slow.clone();
    handle.set_timeout(move || Ok(s.resolve(Value::from("slow"))), 50);

    let l = log.clone();
    let result = handle.spawn_async(move |scope| async move {
        let first = scope.suspend(slow).await?;
        l.push(first.to_js_string());
        let second = scope.suspend(Value::from("fast")).await?;
        l.push(second.to_js_string());
        Ok(Value::from("done"))
    });
    event_loop.run(|_| Ok(())).unwrap();
    assert_eq!(log.entries(), vec!["slow", "fast"]);
    assert_eq!(result.value(), Some(Value::from("done")));
}

#[test]
fn rejection_is_raised_at_suspend_point() {
    let (mut event_loop, _) = virtual_loop();
    let handle = event_loop.handle();
    let failing = handle.rejected(JsError::type_error("inner failure"));
    let caught = handle.spawn_async(move |scope| async move {
        match scope.suspend(failing).await {
            Ok(_) => Ok(Value::from("unexpected")),
            Err(e) => Ok(Value::from(format!("caught {}", e.message))),
        }
    });
    event_loop.run(|_| Ok(())).unwrap();
    assert_eq!(caught.value(), Some(Value::from("caught inner failure")));
}

#[test]
fn uncaught_rejection_fails_the_computation() {
    let (mut event_loop, _) = virtual_loop();
    let handle = event_loop.handle();
    let failing = handle.rejected(JsError::type_error("propagated"));
    let result = handle.spawn_async(move |scope| async move {
        scope.suspend(failing).await?;
        Ok(Value::from("unreachable"))
    });
    result.catch(|_| Ok(()));
    event_loop.run(|_| Ok(())).unwrap();
    assert_eq!(result.state(), DeferredState::Rejected);
    assert_eq!(result.error().map(|e| e.message), Some("propagated".into()));
}

#[test]
fn returned_deferred_is_adopted_by_computation() {
    let (mut event_loop, _) = virtual_loop();
    let handle = event_loop.handle();
    let inner = handle.pending();
    let i = inner.clone();
    let result = handle.spawn_async(move |scope| async move {
        scope.suspend(()).await?;
        Ok(i)
    });
    handle.set_timeout(move || Ok(inner.resolve(Value::Smi(11))), 5);
    event_loop.run(|_| Ok(())).unwrap();
    assert_eq!(result.value(), Some(Value::Smi(11)));
}

#[test]
fn nested_computations_interleave_through_the_queue() {
    let (mut event_loop, _) = virtual_loop();
    let handle = event_loop.handle();
    let log = Log::default();
    for name in ["a", "b"] {
        let l = log.clone();
        handle.spawn_async(move |scope| async move {
            l.push(format!("{}1", name));
            scope.suspend(()).await?;
            l.push(format!("{}2", name));
            scope.suspend(()).await?;
            l.push(format!("{}3", name));
            Ok(())
        });
    }
    event_loop.run(|_| Ok(())).unwrap();
    assert_eq!(log.entries(), vec!["a1", "b1", "a2", "b2", "a3", "b3"]);
}

#[test]
fn never_settled_operand_leaves_frame_suspended() {
    let (mut event_loop, _) = virtual_loop();
    let handle = event_loop.handle();
    let never = handle.pending();
    let result = handle.spawn_async(move |scope| async move { scope.suspend(never).await });
    let report = event_loop.run(|_| Ok(())).unwrap();
    assert_eq!(report.suspended_frames, 1);
    assert!(result.is_pending());
}
