use approx::assert_abs_diff_eq;
use rstest::rstest;

use cloud_gym::core::cost::CostLedger;

#[test]
// Hourly cost 0.2 with 60 seconds per iteration gives 0.2 * 0.00028 * 60 = 0.00336 per small VM iteration.
// One small and ten medium VMs cost 21 small VMs.
fn test_cost_of_small_and_medium_vms() {
    let mut ledger = CostLedger::new(0.2, 60., false);
    assert_abs_diff_eq!(ledger.per_iteration_cost(), 0.00336, epsilon = 1e-12);
    assert_abs_diff_eq!(ledger.iterations_in_hour(), 60.);
    ledger.add_vm(0, 1, 0.);
    for id in 1..=10 {
        ledger.add_vm(id, 2, 0.);
    }
    assert_abs_diff_eq!(ledger.running_cost(1.), 0.07056, epsilon = 1e-12);
}

#[test]
fn test_stopped_vm_is_pruned() {
    let mut ledger = CostLedger::new(0.2, 1., false);
    ledger.add_vm(0, 1, 0.);
    ledger.add_vm(1, 4, 0.);
    ledger.stop_vm(1, 10.);
    assert_abs_diff_eq!(ledger.running_cost(10.), 0.000056 * 5., epsilon = 1e-12);
    assert_eq!(ledger.len(), 2);
    assert_abs_diff_eq!(ledger.running_cost(10.5), 0.000056, epsilon = 1e-12);
    assert_eq!(ledger.len(), 1);
    assert!(!ledger.contains(1));
    // pruned entries do not come back
    assert_abs_diff_eq!(ledger.running_cost(5.), 0.000056, epsilon = 1e-12);
}

#[rstest]
#[case(10., true)]
#[case(3600., true)]
#[case(3610., true)]
#[case(3610.5, false)]
// With full-hour billing a VM stopped at 10 is billed until 10 + 3600 iterations, the boundary included.
fn test_full_hour_billing_boundary(#[case] time: f64, #[case] billed: bool) {
    let mut ledger = CostLedger::new(0.2, 1., true);
    ledger.add_vm(0, 2, 0.);
    ledger.stop_vm(0, 10.);
    let expected = if billed { 0.000056 * 2. } else { 0. };
    assert_abs_diff_eq!(ledger.running_cost(time), expected, epsilon = 1e-12);
    assert_eq!(ledger.contains(0), billed);
}

#[test]
fn test_full_hour_depends_on_speedup() {
    let mut ledger = CostLedger::new(0.2, 60., true);
    ledger.add_vm(0, 1, 0.);
    ledger.stop_vm(0, 100.);
    assert!(ledger.running_cost(160.) > 0.);
    assert_eq!(ledger.running_cost(160.5), 0.);
    assert!(ledger.is_empty());
}
