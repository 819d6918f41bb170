//! Native extension loading for the IMPORT instruction. A library exports a
//! `driver` entry point that reports which of its symbols are callable
//! extension functions; each one is resolved and registered under its own
//! name so CALLE can look it up later.

use std::ffi::CStr;
use std::os::raw::c_char;

use libloading::{Library, Symbol};

use crate::error::ExtensionError;
use crate::thread::Thread;
use crate::value::Value;

/// Signature every function a native extension library exports must
/// implement: the currently executing thread, and the argument list CALLE
/// extracted off the operand stack.
pub type NativeFn = unsafe extern "C" fn(*mut Thread, *const Value, usize) -> Value;

/// What a library's `driver` entry point hands back: the names it wants
/// registered, as a flat array of C strings.
#[repr(C)]
pub struct NameList {
    pub names: *const *const c_char,
    pub len: usize,
}

type DriverFn = unsafe extern "C" fn() -> NameList;

#[cfg(any(unix, windows))]
pub fn import(thread: &mut Thread, path: &str) -> Result<(), ExtensionError> {
    let library =
        unsafe { Library::new(path) }.map_err(|err| ExtensionError::Open(path.to_owned(), err.to_string()))?;

    let driver: Symbol<DriverFn> =
        unsafe { library.get(b"driver\0") }.map_err(|_| ExtensionError::MissingDriver(path.to_owned()))?;

    let list = unsafe { driver() };
    let names: Vec<String> = unsafe {
        std::slice::from_raw_parts(list.names, list.len)
            .iter()
            .map(|&ptr| CStr::from_ptr(ptr).to_string_lossy().into_owned())
            .collect()
    };
    drop(driver);

    let mut resolved = Vec::with_capacity(names.len());
    for name in &names {
        if thread.extensions.contains_key(name) {
            return Err(ExtensionError::Duplicate(name.clone()));
        }
        let symbol: Symbol<NativeFn> = unsafe { library.get(name.as_bytes()) }
            .map_err(|_| ExtensionError::MissingSymbol(path.to_owned(), name.clone()))?;
        resolved.push((name.clone(), *symbol));
    }

    for (name, func) in resolved {
        thread.extensions.insert(name, func);
    }

    thread.keep_library_alive(library);
    Ok(())
}

#[cfg(not(any(unix, windows)))]
pub fn import(_thread: &mut Thread, _path: &str) -> Result<(), ExtensionError> {
    Err(ExtensionError::Unsupported)
}
