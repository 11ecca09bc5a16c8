//! Integration tests for reconcile runs loaded from request files.

use netrecon_core::testing::{DeviceCall, ScriptedDevice, StaticDiffer};
use netrecon_core::{ConfigError, ReconcileController, ReconcileRequest, SaveWhen};
use std::fs;
use tempfile::TempDir;

const RUNNING: &str = "\
hostname edge1
!
interface GigabitEthernet0/1
 description uplink
 ip address 192.0.2.1 255.255.255.0
!
ntp clock-period 17179
";

fn request_file(dir: &TempDir, yaml: &str) -> std::path::PathBuf {
    let path = dir.path().join("request.yml");
    fs::write(&path, yaml).unwrap();
    path
}

#[tokio::test]
async fn test_hostname_change_applied_and_saved_when_modified() {
    let dir = TempDir::new().unwrap();
    let path = request_file(
        &dir,
        r"
lines:
  - hostname foo
save_when: modified
diff_ignore_lines:
  - ^ntp clock-period
",
    );
    let request = ReconcileRequest::from_file(&path).unwrap();

    let mut device = ScriptedDevice::new()
        .with_running_config(RUNNING)
        .with_running_config_after_apply(RUNNING.replace("hostname edge1", "hostname foo"))
        .with_startup_config(RUNNING);
    let differ = StaticDiffer::lines(["hostname foo"]);

    let outcome = ReconcileController::new(&mut device, &differ)
        .run(&request)
        .await
        .unwrap();

    assert!(outcome.changed);
    assert_eq!(outcome.commands, vec!["hostname foo"]);
    assert_eq!(device.persist_count(), 1);
    assert!(matches!(device.calls()[1], DeviceCall::ApplyConfig(_)));
}

#[tokio::test]
async fn test_unchanged_device_with_matching_startup_is_left_alone() {
    let request = ReconcileRequest {
        save_when: SaveWhen::Modified,
        lines: vec!["hostname edge1".to_string()],
        diff_ignore_lines: vec!["^ntp clock-period".to_string()],
        ..ReconcileRequest::default()
    };
    let mut device = ScriptedDevice::new()
        .with_running_config(RUNNING)
        .with_startup_config(RUNNING.replace("ntp clock-period 17179", "ntp clock-period 42"));
    let differ = StaticDiffer::empty();

    let outcome = ReconcileController::new(&mut device, &differ)
        .run(&request)
        .await
        .unwrap();

    assert!(!outcome.changed);
    assert_eq!(device.persist_count(), 0);
    assert!(!device.applied_anything());
}

#[tokio::test]
async fn test_check_mode_run_reports_full_outcome_without_touching_device() {
    let dir = TempDir::new().unwrap();
    let path = request_file(
        &dir,
        r"
parents:
  - interface GigabitEthernet0/1
lines:
  - description core uplink
before:
  - default interface GigabitEthernet0/1
backup: true
save_when: always
diff: true
diff_against: intended
intended_config: |
  hostname edge1
  interface GigabitEthernet0/1
   description core uplink
check_mode: true
",
    );
    let request = ReconcileRequest::from_file(&path).unwrap();

    let mut device = ScriptedDevice::new().with_running_config(RUNNING);
    let differ = StaticDiffer::lines(["interface GigabitEthernet0/1", " description core uplink"]);

    let outcome = ReconcileController::new(&mut device, &differ)
        .run(&request)
        .await
        .unwrap();

    assert!(outcome.changed);
    assert_eq!(outcome.commands[0], "default interface GigabitEthernet0/1");
    assert_eq!(outcome.backup_contents.as_deref(), Some(RUNNING));
    assert!(outcome.diff.is_some());
    assert!(!device.applied_anything());
    assert_eq!(device.persist_count(), 0);
    assert_eq!(
        differ.requests()[0].candidate,
        "interface GigabitEthernet0/1\n description core uplink"
    );
}

#[test]
fn test_conflicting_request_file_fails_validation() {
    let dir = TempDir::new().unwrap();
    let path = request_file(
        &dir,
        r"
src: |
  hostname foo
lines:
  - hostname foo
",
    );
    let request = ReconcileRequest::from_file(&path).unwrap();
    let err = request.validate().unwrap_err();
    assert_eq!(
        err.to_string(),
        "Mutually exclusive fields: 'lines' and 'src' cannot both be specified"
    );
}

#[test]
fn test_missing_request_file_is_io_error() {
    let dir = TempDir::new().unwrap();
    let err = ReconcileRequest::from_file(dir.path().join("absent.yml")).unwrap_err();
    assert!(matches!(err, ConfigError::Io(_)));
}

#[test]
fn test_unknown_save_when_is_yaml_error() {
    let err = ReconcileRequest::parse_yaml("save_when: sometimes\n").unwrap_err();
    assert!(matches!(err, ConfigError::Yaml(_)));
}
