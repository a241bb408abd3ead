//! Combinators over several deferred values.

use crate::deferred::{DeferredValue, Outcome, Resolution};
use crate::event_loop::Handle;
use core_types::{JsError, Value};
use std::cell::RefCell;
use std::rc::Rc;

struct Collected {
    values: Vec<Value>,
    remaining: usize,
}

impl Collected {
    fn new(len: usize) -> Rc<RefCell<Self>> {
        Rc::new(RefCell::new(Self {
            values: vec![Value::Undefined; len],
            remaining: len,
        }))
    }

    /// Stores one result and returns all of them once the last one arrives.
    fn store(&mut self, index: usize, value: Value) -> Option<Vec<Value>> {
        self.values[index] = value;
        self.remaining -= 1;
        if self.remaining == 0 {
            Some(std::mem::take(&mut self.values))
        } else {
            None
        }
    }
}

fn settled_record(outcome: Outcome) -> Value {
    match outcome {
        Outcome::Fulfilled(value) => {
            Value::object([("status", Value::from("fulfilled")), ("value", value)])
        }
        Outcome::Rejected(error) => Value::object([
            ("status", Value::from("rejected")),
            ("reason", error_record(&error)),
        ]),
    }
}

fn error_record(error: &JsError) -> Value {
    Value::object([
        ("name", Value::from(error.kind.name())),
        ("message", Value::from(error.message.as_str())),
    ])
}

impl Handle {
    fn inputs<I>(&self, items: I) -> Vec<DeferredValue>
    where
        I: IntoIterator,
        I::Item: Into<Resolution>,
    {
        items.into_iter().map(|item| self.resolved(item)).collect()
    }

    /// Fulfills with every input's value, in input order, once all fulfill.
    /// Rejects with the first rejection.
    ///
    /// ```
    /// use async_runtime::{EventLoop, LoopConfig};
    /// use core_types::Value;
    ///
    /// let mut event_loop = EventLoop::new(LoopConfig::virtual_time());
    /// let handle = event_loop.handle();
    /// let later = handle.pending();
    /// let all = handle.all(vec![handle.resolved(1), later.clone()]);
    /// later.resolve(2);
    ///
    /// event_loop.run(|_| Ok(())).unwrap();
    /// assert_eq!(all.value(), Some(Value::Array(vec![Value::Smi(1), Value::Smi(2)])));
    /// ```
    pub fn all<I>(&self, items: I) -> DeferredValue
    where
        I: IntoIterator,
        I::Item: Into<Resolution>,
    {
        let inputs = self.inputs(items);
        let result = self.pending();
        if inputs.is_empty() {
            result.resolve(Value::Array(Vec::new()));
            return result;
        }
        let collected = Collected::new(inputs.len());
        for (index, input) in inputs.iter().enumerate() {
            let (collected, result) = (collected.clone(), result.clone());
            input.observe(move |outcome| {
                match outcome {
                    Outcome::Fulfilled(value) => {
                        let done = collected.borrow_mut().store(index, value);
                        if let Some(values) = done {
                            result.resolve(Value::Array(values));
                        }
                    }
                    Outcome::Rejected(error) => result.reject(error),
                }
                Ok(())
            });
        }
        result
    }

    /// Settles like the first input to settle. Stays pending forever for an
    /// empty input.
    pub fn race<I>(&self, items: I) -> DeferredValue
    where
        I: IntoIterator,
        I::Item: Into<Resolution>,
    {
        let result = self.pending();
        for input in self.inputs(items) {
            let result = result.clone();
            input.observe(move |outcome| {
                result.settle(outcome);
                Ok(())
            });
        }
        result
    }

    /// Fulfills, once every input has settled, with one record per input:
    /// `{status: "fulfilled", value}` or `{status: "rejected", reason}`.
    pub fn all_settled<I>(&self, items: I) -> DeferredValue
    where
        I: IntoIterator,
        I::Item: Into<Resolution>,
    {
        let inputs = self.inputs(items);
        let result = self.pending();
        if inputs.is_empty() {
            result.resolve(Value::Array(Vec::new()));
            return result;
        }
        let collected = Collected::new(inputs.len());
        for (index, input) in inputs.iter().enumerate() {
            let (collected, result) = (collected.clone(), result.clone());
            input.observe(move |outcome| {
                let done = collected.borrow_mut().store(index, settled_record(outcome));
                if let Some(records) = done {
                    result.resolve(Value::Array(records));
                }
                Ok(())
            });
        }
        result
    }
}
