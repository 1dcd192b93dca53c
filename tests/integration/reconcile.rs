#[path = "common/mod.rs"]
mod common;

use std::fs;

use common::{API_CONFIG, THREE_SERVICES, config, reconciler};
use funnelg::{
    error::ServiceError,
    system::{BuildStep, InstallStep},
    test_utils::{Action, RecordingSystem},
};
use tempfile::tempdir;

#[test]
fn fresh_service_is_built_and_installed() {
    let temp = tempdir().expect("failed to create tempdir");
    let root = temp.path();
    let cfg = config(API_CONFIG);
    let mut rec = reconciler(root, RecordingSystem::default());

    let summary = rec.reconcile_all(&cfg.services);
    assert!(summary.all_converged(), "{summary}");
    assert_eq!(summary.builds(), 1);
    assert_eq!(summary.installs(), 1);

    assert!(root.join("api/state").is_dir());

    let source = fs::read_to_string(root.join("api/main.go")).expect("program source");
    assert!(source.contains("localhost:8080"));
    assert!(source.contains(r#"Hostname: "api-host""#));
    assert!(!source.contains("abc123"), "auth key must not be embedded");

    let unit_path = root.join("systemd/api-funnel.service");
    let unit = fs::read_to_string(&unit_path).expect("installed unit");
    assert!(unit.contains("Description=Tailscale Funnel Proxy for api-host"));
    assert!(unit.contains(&format!("EnvironmentFile={}", root.join(".env").display())));
    assert!(unit.contains(&format!("ExecStart={}", root.join("api/app").display())));
    assert!(unit.contains("Restart=always"));
    assert!(!unit.contains("abc123"), "auth key must not be embedded");
    assert!(!root.join("api/api-funnel.service").exists(), "staged unit moved");

    let ops = rec.into_ops();
    assert_eq!(
        ops.build_steps_for("api"),
        [
            BuildStep::ModInit,
            BuildStep::ModTidy,
            BuildStep::FetchDeps,
            BuildStep::Compile
        ]
    );

    let tail: Vec<_> = ops.actions.iter().skip(1 + 4).cloned().collect();
    assert_eq!(
        tail,
        [
            Action::Move {
                from: root.join("api/api-funnel.service"),
                to: unit_path,
            },
            Action::Reload,
            Action::Enable {
                unit: "api-funnel.service".into()
            },
            Action::Start {
                unit: "api-funnel.service".into()
            },
        ]
    );
    assert_eq!(
        ops.actions[0],
        Action::Chown {
            path: root.join("api"),
            owner: "alice:alice".into(),
        }
    );
}

#[test]
fn second_run_performs_no_build_or_install() {
    let temp = tempdir().expect("failed to create tempdir");
    let root = temp.path();
    let cfg = config(THREE_SERVICES);

    let mut first = reconciler(root, RecordingSystem::default());
    assert!(first.reconcile_all(&cfg.services).all_converged());

    let mut second = reconciler(root, RecordingSystem::default());
    let summary = second.reconcile_all(&cfg.services);
    assert!(summary.all_converged());
    assert_eq!(summary.builds(), 0);
    assert_eq!(summary.installs(), 0);
    assert!(
        summary
            .reports
            .iter()
            .all(|r| r.initial.is_some_and(|state| state.is_converged()))
    );

    let ops = second.into_ops();
    assert_eq!(ops.build_actions(), 0);
    assert_eq!(ops.install_actions(), 0);
}

#[test]
fn existing_binary_skips_build_but_installs_unit() {
    let temp = tempdir().expect("failed to create tempdir");
    let root = temp.path();
    fs::create_dir_all(root.join("api")).unwrap();
    fs::write(root.join("api/app"), b"prebuilt").unwrap();

    let cfg = config(API_CONFIG);
    let mut rec = reconciler(root, RecordingSystem::default());
    let summary = rec.reconcile_all(&cfg.services);

    assert!(summary.all_converged());
    assert_eq!(summary.builds(), 0);
    assert_eq!(summary.installs(), 1);
    assert!(!root.join("api/main.go").exists());
    assert_eq!(fs::read(root.join("api/app")).unwrap(), b"prebuilt");

    let ops = rec.into_ops();
    assert_eq!(ops.build_actions(), 0);
    assert_eq!(ops.install_actions(), 4);
}

#[test]
fn existing_unit_skips_install() {
    let temp = tempdir().expect("failed to create tempdir");
    let root = temp.path();
    let cfg = config(API_CONFIG);
    let mut rec = reconciler(root, RecordingSystem::default());
    fs::write(root.join("systemd/api-funnel.service"), "[Unit]\n").unwrap();

    let summary = rec.reconcile_all(&cfg.services);
    assert!(summary.all_converged());
    assert_eq!(summary.builds(), 1);
    assert_eq!(summary.installs(), 0);
    assert_eq!(rec.ops().install_actions(), 0);
    assert_eq!(
        fs::read_to_string(root.join("systemd/api-funnel.service")).unwrap(),
        "[Unit]\n"
    );
}

#[test]
fn build_failure_is_isolated_to_one_service() {
    let temp = tempdir().expect("failed to create tempdir");
    let root = temp.path();
    let cfg = config(THREE_SERVICES);
    let ops = RecordingSystem::default().with_build_failure("b", BuildStep::FetchDeps);
    let mut rec = reconciler(root, ops);

    let summary = rec.reconcile_all(&cfg.services);
    assert_eq!(summary.failed(), ["b"]);
    assert_eq!(summary.to_string(), "3 service(s) checked: 2 converged, 1 failed (b)");

    let b = &summary.reports[1];
    assert!(matches!(
        b.error,
        Some(ServiceError::BuildFailed {
            step: BuildStep::FetchDeps,
            ..
        })
    ));
    assert!(!b.installed);

    assert!(summary.reports[0].built && summary.reports[0].installed);
    assert!(summary.reports[2].built && summary.reports[2].installed);
    assert!(root.join("systemd/a-funnel.service").exists());
    assert!(!root.join("systemd/b-funnel.service").exists());
    assert!(root.join("systemd/c-funnel.service").exists());

    let ops = rec.into_ops();
    assert_eq!(
        ops.build_steps_for("b"),
        [BuildStep::ModInit, BuildStep::ModTidy, BuildStep::FetchDeps]
    );
    assert_eq!(ops.build_steps_for("c").len(), 4);
    assert!(!ops.actions.iter().any(|action| matches!(
        action,
        Action::Enable { unit } if unit == "b-funnel.service"
    )));
}

#[test]
fn failed_build_is_retried_on_next_run() {
    let temp = tempdir().expect("failed to create tempdir");
    let root = temp.path();
    let cfg = config(API_CONFIG);

    let failing = RecordingSystem::default().with_build_failure("api", BuildStep::Compile);
    let mut first = reconciler(root, failing);
    assert!(!first.reconcile_all(&cfg.services).all_converged());
    assert!(!root.join("api/app").exists());

    let mut second = reconciler(root, RecordingSystem::default());
    let summary = second.reconcile_all(&cfg.services);
    assert!(summary.all_converged());
    assert_eq!(summary.builds(), 1);
    assert_eq!(summary.installs(), 1);
}

#[test]
fn install_failure_leaves_other_services_untouched() {
    let temp = tempdir().expect("failed to create tempdir");
    let root = temp.path();
    let cfg = config(THREE_SERVICES);
    let ops = RecordingSystem::default().with_install_failure("a", InstallStep::Start);
    let mut rec = reconciler(root, ops);

    let summary = rec.reconcile_all(&cfg.services);
    assert_eq!(summary.failed(), ["a"]);
    assert!(matches!(
        summary.reports[0].error,
        Some(ServiceError::UnitInstallFailed {
            step: InstallStep::Start,
            ..
        })
    ));
    assert!(summary.reports[1].installed);
    assert!(summary.reports[2].installed);

    let starts: Vec<_> = rec
        .ops()
        .actions
        .iter()
        .filter_map(|action| match action {
            Action::Start { unit } => Some(unit.as_str()),
            _ => None,
        })
        .collect();
    assert_eq!(
        starts,
        ["a-funnel.service", "b-funnel.service", "c-funnel.service"]
    );
}

#[test]
fn services_are_reconciled_in_declaration_order() {
    let temp = tempdir().expect("failed to create tempdir");
    let root = temp.path();
    let cfg = config(THREE_SERVICES);
    let mut rec = reconciler(root, RecordingSystem::default());
    rec.reconcile_all(&cfg.services);

    let chowned: Vec<_> = rec
        .ops()
        .actions
        .iter()
        .filter_map(|action| match action {
            Action::Chown { path, .. } => path.file_name().map(|n| n.to_owned()),
            _ => None,
        })
        .collect();
    assert_eq!(chowned, ["a", "b", "c"]);
}
