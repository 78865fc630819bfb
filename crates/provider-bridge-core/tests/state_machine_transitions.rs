use provider_bridge_core::{filter_transition, FilterAction, FilterStatus};

#[test]
fn filter_happy_path_transitions() {
    let (s1, t1) =
        filter_transition(FilterStatus::Installed, FilterAction::Poll).expect("installed -> poll");
    assert_eq!(s1, FilterStatus::Polled);
    assert_eq!(t1.from, FilterStatus::Installed);
    let (s2, _) = filter_transition(s1, FilterAction::Poll).expect("polled -> poll");
    assert_eq!(s2, FilterStatus::Polled);
    let (s3, t3) = filter_transition(s2, FilterAction::Uninstall).expect("polled -> uninstall");
    assert_eq!(s3, FilterStatus::Uninstalled);
    assert_eq!(t3.reason, "uninstall");
}

#[test]
fn never_polled_filter_can_be_uninstalled() {
    let (status, _) = filter_transition(FilterStatus::Installed, FilterAction::Uninstall)
        .expect("installed -> uninstall");
    assert_eq!(status, FilterStatus::Uninstalled);
}

#[test]
fn uninstalled_filter_accepts_no_further_actions() {
    let err = filter_transition(FilterStatus::Uninstalled, FilterAction::Uninstall)
        .expect_err("double uninstall must fail");
    assert!(err.to_string().contains("illegal filter transition"));
    let err = filter_transition(FilterStatus::Uninstalled, FilterAction::Poll)
        .expect_err("poll after uninstall must fail");
    assert!(err.to_string().contains("illegal filter transition"));
}
