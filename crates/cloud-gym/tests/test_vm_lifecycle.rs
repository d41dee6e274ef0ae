mod common;
use common::{init_logger, job, settings};

use approx::assert_abs_diff_eq;
use sugars::boxed;

use cloud_gym::core::admission::CapacityAdmission;
use cloud_gym::core::common::AllocationVerdict;
use cloud_gym::core::job::JobStatus;
use cloud_gym::core::placement::StickyNextFit;
use cloud_gym::core::vm::VmSize;
use cloud_gym::CloudSimulation;

#[test]
fn test_destroyed_vm_returns_jobs_to_pending() {
    init_logger();
    let settings = settings(&[("initial_s_vm_count", "0"), ("initial_m_vm_count", "0")]);
    let jobs = vec![
        job(0, 0., 1_000_000_000, 1),
        job(1, 0., 1_000_000_000, 1),
        job(2, 0., 1_000_000_000, 1),
    ];
    let mut simulation = CloudSimulation::new(settings, &jobs);
    simulation.advance(1.).unwrap();
    for id in 0..3 {
        let job = simulation.ledger().job(id).unwrap();
        assert_eq!(job.status, JobStatus::Running);
        assert_eq!(job.vm_id, Some(0));
    }

    assert_eq!(simulation.destroy_vm(0), Some(3));
    for id in 0..3 {
        let job = simulation.ledger().job(id).unwrap();
        assert_eq!(job.status, JobStatus::Pending);
        assert_eq!(job.effective_delay, 0.);
        assert_eq!(job.vm_id, None);
    }
    assert_eq!(simulation.datacenter().running_vms().count(), 0);
    assert_eq!(simulation.datacenter().host(0).unwrap().cores_allocated(), 0);
    assert_eq!(simulation.lifecycle().counter().started_vms(VmSize::Large), 0);
    assert_eq!(simulation.destroy_vm(0), None);

    // identifiers are not reused
    assert_eq!(simulation.create_vm(VmSize::Medium, 3), Ok(1));
    simulation.advance(1.).unwrap();
    simulation.advance(1.).unwrap();
    for id in 0..3 {
        let job = simulation.ledger().job(id).unwrap();
        assert_eq!(job.status, JobStatus::Running);
        assert_eq!(job.vm_id, Some(1));
    }
}

#[test]
fn test_destroyed_vm_returns_job_in_transit_once() {
    init_logger();
    // the job is placed at 1.05 and reaches its VM at 1.15, after the first timestep ends
    let mut simulation = CloudSimulation::new(settings(&[]), &[job(0, 1.05, 1000, 1)]);
    simulation.advance(1.).unwrap();
    let job = simulation.ledger().job(0).unwrap();
    assert_eq!(job.status, JobStatus::Queued);
    assert_eq!(job.vm_id, Some(0));
    assert_eq!(simulation.ledger().pending_count(), 0);
    assert_eq!(simulation.datacenter().scheduler(0).unwrap().expected_free_cores(), 1);

    assert_eq!(simulation.destroy_vm(0), Some(1));
    let job = simulation.ledger().job(0).unwrap();
    assert_eq!(job.status, JobStatus::Pending);
    assert_eq!(job.vm_id, None);
    assert_eq!(simulation.ledger().pending_count(), 1);
    assert_eq!(simulation.broker().waiting_count(), 0);

    simulation.advance(1.).unwrap();
    assert_eq!(simulation.broker().waiting_count(), 0);
    assert_eq!(simulation.ledger().pending_count(), 0);
    assert_eq!(simulation.ledger().finished_count(), 1);
    assert_eq!(simulation.ledger().arrived_count(), 1);
    let job = simulation.ledger().job(0).unwrap();
    assert_eq!(job.status, JobStatus::Finished);
    assert_eq!(job.vm_id, Some(1));
    assert_eq!(simulation.take_wait_times().len(), 1);
}

#[test]
fn test_bound_job_runs_on_its_vm() {
    init_logger();
    let jobs = vec![job(0, 0., 1_000_000_000, 1), job(1, 0., 1_000_000_000, 1)];
    let mut simulation = CloudSimulation::new(settings(&[]), &jobs);
    simulation.bind_job(1, 2);
    simulation.advance(1.).unwrap();

    let job = simulation.ledger().job(0).unwrap();
    assert_eq!(job.status, JobStatus::Running);
    assert_eq!(job.vm_id, Some(0));
    let job = simulation.ledger().job(1).unwrap();
    assert_eq!(job.status, JobStatus::Running);
    assert_eq!(job.vm_id, Some(2));
    assert_eq!(simulation.datacenter().scheduler(2).unwrap().busy_cores(), 1);

    // destroying the VM drops the binding
    assert_eq!(simulation.destroy_vm(2), Some(1));
    assert_eq!(simulation.ledger().job(1).unwrap().bound_vm, None);
}

#[test]
fn test_create_vm_verdicts() {
    init_logger();
    let mut simulation = CloudSimulation::new(settings(&[]), &[job(0, 0., 1000, 1)]);
    // the initial fleet fills all 14 cores of host 0
    assert_eq!(simulation.datacenter().host(0).unwrap().free_cores(), 0);
    assert_eq!(
        simulation.create_vm(VmSize::Small, 0),
        Err(AllocationVerdict::NotEnoughCores)
    );
    assert_eq!(
        simulation.create_vm(VmSize::Small, 10),
        Err(AllocationVerdict::HostNotFound)
    );
    assert_eq!(simulation.create_vm(VmSize::Large, 9), Ok(3));
    assert_eq!(simulation.lifecycle().cost().started_at(0), Some(0.));
    assert_abs_diff_eq!(simulation.lifecycle().cost().started_at(3).unwrap(), 0.1, epsilon = 1e-9);
    assert_eq!(simulation.lifecycle().cost().started_at(4), None);

    let settings = settings(&[
        ("initial_m_vm_count", "0"),
        ("initial_l_vm_count", "0"),
        ("host_ram", "10000"),
    ]);
    let mut simulation = CloudSimulation::new(settings, &[job(0, 0., 1000, 1)]);
    assert_eq!(
        simulation.create_vm(VmSize::Small, 0),
        Err(AllocationVerdict::NotEnoughRam)
    );
    assert_eq!(
        simulation.create_vm(VmSize::Medium, 1),
        Err(AllocationVerdict::NotEnoughRam)
    );
    assert_eq!(simulation.datacenter().vms().count(), 1);
}

#[test]
fn test_vm_startup_delay() {
    init_logger();
    let settings = settings(&[("vm_startup_delay", "5")]);
    let mut simulation = CloudSimulation::with_strategies(
        settings,
        &[job(0, 0., 10000, 1)],
        boxed!(StickyNextFit::new()),
        boxed!(CapacityAdmission::new()),
    );
    assert_eq!(simulation.datacenter().vms().count(), 3);
    assert_eq!(simulation.datacenter().running_vms().count(), 0);

    for _ in 0..4 {
        simulation.advance(1.).unwrap();
    }
    assert_eq!(simulation.datacenter().running_vms().count(), 0);
    assert_eq!(simulation.ledger().job(0).unwrap().status, JobStatus::Pending);

    simulation.advance(1.).unwrap();
    assert_eq!(simulation.datacenter().running_vms().count(), 3);
    while simulation.is_running() {
        simulation.advance(1.).unwrap();
    }
    assert_eq!(simulation.ledger().job(0).unwrap().status, JobStatus::Finished);
}

#[test]
// Per-iteration cost of a small VM is 0.2 * 0.00028 = 0.000056, the default fleet costs 1 + 2 + 4 small VMs.
fn test_running_cost_follows_fleet() {
    init_logger();
    let settings = settings(&[("vm_shutdown_delay", "10")]);
    let mut simulation = CloudSimulation::new(settings, &[job(0, 1000., 1000, 1)]);
    assert_abs_diff_eq!(simulation.running_cost(), 0.000056 * 7., epsilon = 1e-12);

    simulation.advance(1.).unwrap();
    assert_eq!(simulation.destroy_vm(2), Some(0));
    for _ in 0..9 {
        simulation.advance(1.).unwrap();
        assert_abs_diff_eq!(simulation.running_cost(), 0.000056 * 7., epsilon = 1e-12);
    }
    simulation.advance(1.).unwrap();
    simulation.advance(1.).unwrap();
    assert_abs_diff_eq!(simulation.running_cost(), 0.000056 * 3., epsilon = 1e-12);
    assert_eq!(simulation.lifecycle().cost().len(), 2);
}
