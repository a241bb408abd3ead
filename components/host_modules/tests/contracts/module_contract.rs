//! Contracts for the fs and path modules as handed out by require

use core_types::{ErrorKind, JsError, Value};
use host_modules::{Console, FileContents, ModuleRegistry};
use std::cell::RefCell;
use std::rc::Rc;
use tempfile::tempdir;

#[test]
fn write_read_exists_unlink_sequence() {
    let dir = tempdir().unwrap();
    let modules = ModuleRegistry::new(dir.path());
    let fs = modules.fs().unwrap();

    fs.write_file_sync("test.txt", "Hello from fs!").unwrap();
    assert_eq!(
        fs.read_file_sync("test.txt", Some("utf8")).unwrap(),
        FileContents::Text("Hello from fs!".to_string())
    );
    assert!(fs.exists_sync("test.txt"));
    fs.unlink_sync("test.txt").unwrap();
    assert!(!fs.exists_sync("test.txt"));

    let err = fs.read_file_sync("test.txt", Some("utf8")).unwrap_err();
    assert!(err.is_not_found());
    let js: JsError = err.into();
    assert_eq!(js.kind, ErrorKind::Error);
    assert!(js.message.starts_with("ENOENT"));
}

#[test]
fn path_operations() {
    let modules = ModuleRegistry::new("/");
    let path = modules.path().unwrap();
    assert_eq!(path.join(&["foo", "bar", "baz.js"]), "foo/bar/baz.js");
    assert_eq!(path.basename("/foo/bar/baz.js", None), "baz.js");
    assert_eq!(path.dirname("/foo/bar/baz.js"), "/foo/bar");
    assert_eq!(path.extname("test.js"), ".js");
    assert_eq!(path.extname("Makefile"), "");
}

#[test]
fn unknown_module_fails() {
    let modules = ModuleRegistry::new("/");
    let err: JsError = modules.require("http").unwrap_err().into();
    assert_eq!(err.to_string(), "Error: Cannot find module 'http'");
}

#[test]
fn console_formats_values_like_string_conversion() {
    let output = Rc::new(RefCell::new(Vec::new()));
    let console = Console::new_with_output(output.clone());
    console.log(&[
        Value::from("Array:"),
        Value::Array(vec![Value::Smi(1), Value::Smi(2), Value::Smi(3)]),
    ]);
    console.log(&[Value::from("Object:"), Value::object([("a", Value::Smi(1))])]);
    console.log(&[Value::Undefined, Value::Null]);
    assert_eq!(
        *output.borrow(),
        vec!["Array: 1,2,3", "Object: [object Object]", "undefined null"]
    );
}
