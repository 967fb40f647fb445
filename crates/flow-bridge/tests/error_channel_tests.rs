//! Thread-local error channel: isolation, scoped guards and boundary adapters

use flow_bridge::error_channel::{
    clear_error, guarded, last_error, last_error_code, set_error, UNHANDLED_PANIC_MESSAGE,
};
use flow_bridge::{BridgeError, ErrorScope, FlowError};
use pretty_assertions::assert_eq;
use std::panic;
use std::sync::mpsc;
use std::thread;

// ============================================================================
// Per-Thread Isolation
// ============================================================================

#[test]
fn test_error_is_invisible_to_other_threads() {
    clear_error();
    set_error(FlowError::NodeNotFound, "missing node");

    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        tx.send((last_error(), last_error_code())).unwrap();
    })
    .join()
    .unwrap();

    assert_eq!(rx.recv().unwrap(), (None, FlowError::Success));
    assert_eq!(last_error().as_deref(), Some("missing node"));
    clear_error();
}

#[test]
fn test_each_thread_keeps_its_own_record() {
    let workers: Vec<_> = (0..4)
        .map(|i| {
            thread::spawn(move || {
                set_error(FlowError::InvalidArgument, format!("thread {}", i));
                thread::yield_now();
                last_error()
            })
        })
        .collect();

    for (i, worker) in workers.into_iter().enumerate() {
        assert_eq!(worker.join().unwrap(), Some(format!("thread {}", i)));
    }
}

#[test]
fn test_clear_resets_to_success() {
    set_error(FlowError::OutOfMemory, "allocation failed");
    clear_error();

    assert_eq!(last_error(), None);
    assert_eq!(last_error_code(), FlowError::Success);
}

// ============================================================================
// Error Scope
// ============================================================================

#[test]
fn test_scope_installs_generic_error_on_unwind() {
    clear_error();
    let result = panic::catch_unwind(|| {
        let _scope = ErrorScope::new();
        panic!("boom");
    });

    assert!(result.is_err());
    assert_eq!(last_error_code(), FlowError::Unknown);
    assert_eq!(last_error().as_deref(), Some(UNHANDLED_PANIC_MESSAGE));
    clear_error();
}

#[test]
fn test_scope_keeps_explicit_error_on_unwind() {
    clear_error();
    let result = panic::catch_unwind(|| {
        let mut scope = ErrorScope::new();
        scope.set_error(FlowError::PortNotFound, "no such port");
        panic!("boom");
    });

    assert!(result.is_err());
    assert_eq!(last_error_code(), FlowError::PortNotFound);
    assert_eq!(last_error().as_deref(), Some("no such port"));
    clear_error();
}

#[test]
fn test_scope_is_silent_without_unwind() {
    clear_error();
    {
        let _scope = ErrorScope::new();
    }
    assert_eq!(last_error_code(), FlowError::Success);
}

// ============================================================================
// Boundary Adapter
// ============================================================================

#[test]
fn test_panicking_operation_returns_sentinel() {
    clear_error();
    let value = guarded("test_operation", -1, || -> Result<i32, BridgeError> {
        panic!("native invariant broken")
    });

    assert_eq!(value, -1);
    assert_ne!(last_error_code(), FlowError::Success);
    assert_eq!(last_error().as_deref(), Some("native invariant broken"));
    clear_error();
}

#[test]
fn test_failing_operation_records_kind_and_message() {
    clear_error();
    let value = guarded("test_operation", std::ptr::null_mut::<u8>(), || {
        Err(BridgeError::TypeMismatch {
            expected: "int",
            found: "string",
        })
    });

    assert!(value.is_null());
    assert_eq!(last_error_code(), FlowError::TypeMismatch);
    assert_eq!(
        last_error().as_deref(),
        Some("Type mismatch: expected int, found string")
    );
    clear_error();
}

#[test]
fn test_successful_operation_returns_value() {
    let value = guarded("test_operation", 0, || Ok(42));
    assert_eq!(value, 42);
}
