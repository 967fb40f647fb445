//! Process initialization. Kept in its own binary because the configuration
//! is installed once per process.

use flow_bridge::error_channel::{clear_error, last_error, last_error_code};
use flow_bridge::ffi::env::{flow_env_create, flow_env_destroy};
use flow_bridge::ffi::flow_initialize;
use flow_bridge::native::Env;
use flow_bridge::{FlowError, Handle, HandleRegistry};
use std::ffi::CString;
use std::fs;
use tempfile::TempDir;

#[test]
fn test_initialize_installs_configuration_once() {
    let temp_dir = TempDir::new().unwrap();

    let missing = CString::new(temp_dir.path().join("absent.toml").to_str().unwrap()).unwrap();
    assert_eq!(
        unsafe { flow_initialize(missing.as_ptr()) },
        FlowError::InvalidArgument
    );
    assert_eq!(last_error_code(), FlowError::InvalidArgument);
    assert!(last_error().unwrap().contains("not found"));
    clear_error();

    let config_path = temp_dir.path().join("flow-bridge.toml");
    fs::write(
        &config_path,
        r#"
[runtime]
max_threads = 3

[logging]
filter = "flow_bridge=debug"
"#,
    )
    .unwrap();
    let path = CString::new(config_path.to_str().unwrap()).unwrap();
    assert_eq!(unsafe { flow_initialize(path.as_ptr()) }, FlowError::Success);
    assert_eq!(flow_bridge::config().max_threads(), 3);
    assert_eq!(flow_bridge::config().log_filter(), "flow_bridge=debug");

    let env = flow_env_create(0);
    let handle = Handle::from_raw(env).unwrap();
    let resolved = HandleRegistry::global().resolve::<Env>(handle).unwrap();
    assert_eq!(resolved.max_threads(), 3);
    drop(resolved);
    flow_env_destroy(env);

    fs::write(&config_path, "[runtime]\nmax_threads = 9\n").unwrap();
    assert_eq!(unsafe { flow_initialize(path.as_ptr()) }, FlowError::Success);
    assert_eq!(flow_bridge::config().max_threads(), 3);
}
