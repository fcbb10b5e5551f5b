//! Whole-pipeline properties that must hold for any mocked environment

mod common;

use common::*;
use std::sync::{Arc, Mutex};
use tokio_test::assert_ok;
use vmdoctor_core::application::env::mocks::MockEnv;
use vmdoctor_core::application::{default_plan, Doctor, PhaseObserver, PhaseSummary};
use vmdoctor_core::domain::{Category, CheckStatus, Report};
use vmdoctor_core::port::command_runner::mocks::ScriptedRunner;
use vmdoctor_core::port::config_loader::mocks::StaticConfigLoader;
use vmdoctor_core::port::host_probe::mocks::{MockHostProbe, GIB};
use vmdoctor_core::port::ProbeError;

/// A spread of environments, from healthy to thoroughly broken
fn environments() -> Vec<(&'static str, MockEnv)> {
    let degraded_host = MockHostProbe::healthy();
    degraded_host.set_disk_available(Some(GIB / 2));
    degraded_host.set_memory(16 * GIB, 3 * GIB / 2);

    vec![
        (
            "healthy",
            MockEnv::new(healthy_runner())
                .with_config(StaticConfigLoader::new(healthy_config()))
                .with_host(MockHostProbe::healthy().with_open_port(15432)),
        ),
        ("no tool", MockEnv::new(ScriptedRunner::new())),
        (
            "stopped vm",
            MockEnv::new(healthy_runner().on("vagrant", &["status"], 0, STATUS_POWEROFF)),
        ),
        (
            "closed port",
            MockEnv::new(healthy_runner()).with_config(StaticConfigLoader::new(healthy_config())),
        ),
        (
            "degraded host",
            MockEnv::new(healthy_runner()).with_host(degraded_host),
        ),
        (
            "status timeout",
            MockEnv::new(healthy_runner().on_error("vagrant", &["status"], ProbeError::Timeout(15_000)))
                .with_config(StaticConfigLoader::invalid("bad yaml")),
        ),
    ]
}

async fn run(mock: &MockEnv) -> Report {
    let dir = project_dir();
    let doctor = Doctor::new(mock.build()).unwrap();
    assert_ok!(doctor.run(dir.path()).await)
}

#[tokio::test]
async fn test_exit_code_law() {
    for (label, mock) in environments() {
        let report = run(&mock).await;

        assert_eq!(
            report.summary.failed > 0,
            report.exit_code() != 0,
            "{}: failed={} exit={}",
            label,
            report.summary.failed,
            report.exit_code()
        );
        assert_eq!(report.summary.total(), report.results.len(), "{}", label);
    }
}

#[tokio::test]
async fn test_repeated_runs_are_identical() {
    for (label, mock) in environments() {
        let first = run(&mock).await;
        let second = run(&mock).await;

        assert_eq!(first.summary, second.summary, "{}: summaries differ", label);
        let statuses = |r: &Report| -> Vec<(String, CheckStatus)> {
            r.results.iter().map(|c| (c.name.clone(), c.status)).collect()
        };
        assert_eq!(statuses(&first), statuses(&second), "{}: results differ", label);
    }
}

#[tokio::test]
async fn test_results_follow_phase_and_registration_order() {
    for (label, mock) in environments() {
        let report = run(&mock).await;

        let plan = default_plan().unwrap();
        let phase_index = |category: Category| {
            plan.phases()
                .iter()
                .position(|p| p.category() == category)
                .unwrap()
        };
        let indices: Vec<usize> = report.results.iter().map(|r| phase_index(r.category)).collect();
        let mut sorted = indices.clone();
        sorted.sort();
        assert_eq!(indices, sorted, "{}: results out of phase order", label);

        // Every phase contributes at least one result
        for phase in plan.phases() {
            assert!(
                report.results.iter().any(|r| r.category == phase.category()),
                "{}: no result for {}",
                label,
                phase.category()
            );
        }
    }

    let report = run(&environments().remove(0).1).await;
    let prerequisites: Vec<&str> = report
        .results
        .iter()
        .filter(|r| r.category == Category::Prerequisites)
        .map(|r| r.name.as_str())
        .collect();
    assert_eq!(
        prerequisites,
        vec!["Vagrant installed", "Virtualization providers", "Host disk space", "Host memory"]
    );
}

#[tokio::test]
async fn test_degraded_host_is_reported_not_fatal() {
    let (_, mock) = environments().remove(4);
    let report = run(&mock).await;

    assert_eq!(find(&report, "Host disk space").status, CheckStatus::Fail);
    assert_eq!(find(&report, "Host memory").status, CheckStatus::Warn);
    // The VM is still diagnosed
    assert_eq!(find(&report, "VM status").status, CheckStatus::Pass);
    assert_eq!(mock.runner.calls_to("vagrant", "ssh"), 1);
}

#[tokio::test]
async fn test_status_timeout_is_a_failure_and_vm_phases_skip() {
    let (_, mock) = environments().remove(5);
    let report = run(&mock).await;

    let status = find(&report, "VM status");
    assert_eq!(status.status, CheckStatus::Fail);
    assert!(status.message.contains("timed out"), "message: {}", status.message);
    assert_eq!(find(&report, "VM Health checks").status, CheckStatus::Skip);
    assert_eq!(find(&report, "Network checks").status, CheckStatus::Skip);
    assert_eq!(mock.runner.calls_to("vagrant", "ssh"), 0);
}

#[tokio::test]
async fn test_report_document_shape() {
    let (_, mock) = environments().remove(3);
    let report = run(&mock).await;

    let json = serde_json::to_value(&report).unwrap();
    let results = json["results"].as_array().unwrap();
    assert_eq!(results.len(), report.results.len());
    for result in results {
        for field in ["name", "category", "status", "message"] {
            assert!(result.get(field).is_some(), "missing {} in {}", field, result);
        }
    }

    let ports = results.iter().find(|r| r["name"] == "Forwarded ports").unwrap();
    assert_eq!(ports["status"], "warn");
    assert_eq!(ports["category"], "network");
    assert!(ports["details"].as_str().unwrap().contains("15432 -> 5432"));
    assert_eq!(json["summary"]["warnings"], report.summary.warnings);
}

#[derive(Default)]
struct Recorder {
    phases: Mutex<Vec<(Category, bool)>>,
}

impl PhaseObserver for Recorder {
    fn phase_completed(&self, summary: &PhaseSummary) {
        self.phases.lock().unwrap().push((summary.category, summary.skipped));
    }
}

#[tokio::test]
async fn test_observer_sees_every_phase_once_in_order() {
    let recorder = Arc::new(Recorder::default());
    let mock = MockEnv::new(healthy_runner().on("vagrant", &["status"], 0, STATUS_POWEROFF));
    let doctor = Doctor::new(mock.build()).unwrap().with_observer(recorder.clone());
    let dir = project_dir();

    assert_ok!(doctor.run(dir.path()).await);

    let phases = recorder.phases.lock().unwrap().clone();
    assert_eq!(
        phases,
        vec![
            (Category::Prerequisites, false),
            (Category::Updates, false),
            (Category::Installation, false),
            (Category::Configuration, false),
            (Category::VmState, false),
            (Category::VmHealth, true),
            (Category::Network, true),
        ]
    );
}
