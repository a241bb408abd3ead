//! The `console` host module.

use core_types::Value;
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;
use std::time::Instant;

/// Console output writer trait
pub trait ConsoleWriter {
    /// Write one line of console output
    fn write(&self, message: &str);

    /// Clear the output, if the writer supports it
    fn clear(&self) {}
}

/// Default console writer that prints to stdout
#[derive(Debug, Default, Clone, Copy)]
pub struct StdoutWriter;

impl ConsoleWriter for StdoutWriter {
    fn write(&self, message: &str) {
        println!("{}", message);
    }

    fn clear(&self) {
        print!("\x1b[H\x1b[2J");
    }
}

/// Writer that captures output lines into a shared vector
#[derive(Debug, Default, Clone)]
pub struct CaptureWriter {
    output: Rc<RefCell<Vec<String>>>,
}

impl CaptureWriter {
    /// Captures into `output`.
    pub fn new(output: Rc<RefCell<Vec<String>>>) -> Self {
        Self { output }
    }

    /// Lines written so far.
    pub fn lines(&self) -> Vec<String> {
        self.output.borrow().clone()
    }
}

impl ConsoleWriter for CaptureWriter {
    fn write(&self, message: &str) {
        self.output.borrow_mut().push(message.to_string());
    }

    fn clear(&self) {
        self.output.borrow_mut().clear();
    }
}

/// Console object
pub struct Console {
    timers: RefCell<HashMap<String, Instant>>,
    writer: Box<dyn ConsoleWriter>,
}

impl Console {
    /// Create a new console with default stdout output
    pub fn new() -> Self {
        Self::with_writer(Box::new(StdoutWriter))
    }

    /// Create a console writing to `writer`
    pub fn with_writer(writer: Box<dyn ConsoleWriter>) -> Self {
        Console {
            timers: RefCell::new(HashMap::new()),
            writer,
        }
    }

    /// Create a console with custom output capture
    pub fn new_with_output(output: Rc<RefCell<Vec<String>>>) -> Self {
        Self::with_writer(Box::new(CaptureWriter::new(output)))
    }

    /// Format values for output
    fn format_values(values: &[Value]) -> String {
        values
            .iter()
            .map(|v| v.to_js_string())
            .collect::<Vec<_>>()
            .join(" ")
    }

    fn emit(&self, prefix: Option<&str>, values: &[Value]) {
        let body = Self::format_values(values);
        match prefix {
            Some(prefix) => self.writer.write(&format!("{} {}", prefix, body)),
            None => self.writer.write(&body),
        }
    }

    /// console.log(...values)
    pub fn log(&self, values: &[Value]) {
        self.emit(None, values);
    }

    /// console.info(...values)
    pub fn info(&self, values: &[Value]) {
        self.emit(None, values);
    }

    /// console.warn(...values)
    pub fn warn(&self, values: &[Value]) {
        self.emit(Some("[WARN]"), values);
    }

    /// console.error(...values)
    pub fn error(&self, values: &[Value]) {
        self.emit(Some("[ERROR]"), values);
    }

    /// console.debug(...values)
    pub fn debug(&self, values: &[Value]) {
        self.emit(Some("[DEBUG]"), values);
    }

    /// console.trace(...values)
    pub fn trace(&self, values: &[Value]) {
        self.emit(Some("[TRACE]"), values);
    }

    /// console.dir(value); only the first value is printed
    pub fn dir(&self, values: &[Value]) {
        if let Some(first) = values.first() {
            self.writer.write(&first.to_js_string());
        }
    }

    /// console.assert(condition, ...values)
    pub fn assert(&self, condition: bool, values: &[Value]) {
        if condition {
            return;
        }
        let mut message = String::from("Assertion failed");
        if !values.is_empty() {
            message.push_str(": ");
            message.push_str(&Self::format_values(values));
        }
        self.writer.write(&format!("[ASSERT] {}", message));
    }

    /// console.time(label)
    pub fn time(&self, label: &str) {
        self.timers.borrow_mut().insert(label.to_string(), Instant::now());
    }

    /// console.timeEnd(label); unknown labels print nothing
    pub fn time_end(&self, label: &str) {
        let started = self.timers.borrow_mut().remove(label);
        if let Some(start) = started {
            let elapsed = start.elapsed();
            self.writer
                .write(&format!("{}: {}ms", label, elapsed.as_millis()));
        }
    }

    /// console.clear()
    pub fn clear(&self) {
        self.writer.clear();
    }
}

impl Default for Console {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Console {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Console")
            .field("timers", &self.timers.borrow().len())
            .finish_non_exhaustive()
    }
}
