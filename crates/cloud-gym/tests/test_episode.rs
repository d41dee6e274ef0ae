mod common;
use common::{init_logger, job, settings, NOOP};

use approx::assert_abs_diff_eq;

use cloud_gym::core::job::JobStatus;
use cloud_gym::{Episode, EpisodeState, Error};

#[test]
// A 6-core job is split into 6 single-core parts of 100000 instructions each, which take 10 time units at 10000
// MIPS. The job arrives at 10, is placed at 10 + 0.1 and returns to the broker 0.1 after it completes, so the
// episode terminates at step 21 and not at step 20.
fn test_episode_terminates_after_delayed_job() {
    init_logger();
    let mut episode = Episode::new("Sim0", settings(&[]), &[job(1, 10., 600000, 6)]);
    assert_eq!(episode.jobs().len(), 6);
    episode.reset(0);
    assert_eq!(episode.state(), EpisodeState::Ready);

    let mut steps = 0;
    loop {
        let result = episode.step(&NOOP).unwrap();
        steps += 1;
        assert!(!result.truncated);
        if result.terminated {
            break;
        }
        assert!(steps < 100);
    }
    assert_eq!(steps, 21);
    assert_eq!(episode.state(), EpisodeState::Terminated);
    assert!(matches!(episode.step(&NOOP), Err(Error::EpisodeOver(_))));
}

#[test]
// Initial fleet of 10 small, 1 medium and 1 large VM, small VM has 2 cores.
// After destroying one small VM (9 * 2 + 4 + 8) of 3000 * 14 cores stay allocated.
fn test_destroy_vm_changes_allocated_cores_ratio() {
    init_logger();
    let settings = settings(&[
        ("initial_s_vm_count", "10"),
        ("initial_m_vm_count", "1"),
        ("initial_l_vm_count", "1"),
        ("hosts_count", "3000"),
        ("host_pes", "14"),
        ("small_vm_pes", "2"),
    ]);
    let mut episode = Episode::new("Sim0", settings, &[job(0, 100., 1000, 1)]);
    let reset = episode.reset(0);
    assert_eq!(reset.observation[0][0], (10. * 2. + 4. + 8.) / 42000.);

    let result = episode.step(&[2, 0, 0, 0]).unwrap();
    assert!(result.info.is_valid);
    assert_eq!(result.observation[0][0], ((10. - 1.) * 2. + 4. + 8.) / 42000.);
    assert_eq!(result.observation.len(), 1 + 3000 + 21000 + 42000);
}

#[test]
fn test_clamped_job_completes() {
    init_logger();
    let settings = settings(&[("hosts_count", "5")]);
    let mut episode = Episode::new("Sim0", settings, &[job(0, 60., -778, 1)]);
    assert_eq!(episode.jobs()[0].work_length, 1);
    episode.reset(0);

    let mut steps = 0;
    let mut terminated = false;
    while steps < 1000 && !terminated {
        let result = episode.step(&NOOP).unwrap();
        terminated = result.terminated;
        steps += 1;
    }
    assert!(terminated);
    assert!(steps < 100);
}

#[test]
fn test_job_without_capacity_waits_until_truncation() {
    init_logger();
    let settings = settings(&[
        ("initial_s_vm_count", "0"),
        ("initial_m_vm_count", "0"),
        ("initial_l_vm_count", "0"),
        ("split_large_jobs", "false"),
    ]);
    let mut episode = Episode::new("Sim0", settings, &[job(0, 0., 1000, 100)]);
    episode.reset(0);

    for step in 1..=1000 {
        let result = episode.step(&NOOP).unwrap();
        assert!(!result.terminated);
        assert_eq!(result.truncated, step == 1000);
    }
    let simulation = episode.simulation().unwrap();
    assert_eq!(simulation.ledger().job(0).unwrap().status, JobStatus::Pending);
    assert_abs_diff_eq!(simulation.clock(), 1000.1, epsilon = 1e-6);
    assert!(matches!(episode.step(&NOOP), Err(Error::EpisodeOver(_))));
}

#[test]
// Job needs 50000 / 10000 = 5 time units and arrives at 5, so it completes at 10 plus the submission offset.
fn test_single_job_finish_time() {
    init_logger();
    let mut episode = Episode::new("Sim0", settings(&[]), &[job(0, 5., 50000, 1)]);
    episode.reset(0);
    while !episode.step(&NOOP).unwrap().terminated {}

    let simulation = episode.simulation().unwrap();
    let job = simulation.ledger().job(0).unwrap();
    assert_eq!(job.status, JobStatus::Finished);
    let finished_at = job.finished_at.unwrap();
    assert!(finished_at >= 10.);
    assert!(finished_at - 10. <= simulation.settings().timestep_interval);
}

#[test]
fn test_render_and_clock_are_idempotent() {
    init_logger();
    let mut episode = Episode::new("Sim0", settings(&[]), &[job(0, 1., 100000, 2)]);
    assert_eq!(episode.clock(), 0.);
    assert!(matches!(episode.render(), Err(Error::NotReset(_))));

    episode.reset(0);
    episode.step(&NOOP).unwrap();
    episode.step(&NOOP).unwrap();
    let render = episode.render().unwrap();
    let clock = episode.clock();
    assert_eq!(episode.render().unwrap(), render);
    assert_eq!(episode.clock(), clock);
    assert_eq!(episode.render().unwrap(), render);

    let document: serde_json::Value = serde_json::from_str(&render).unwrap();
    assert_abs_diff_eq!(document["clock"].as_f64().unwrap(), clock, epsilon = 1e-9);
    assert_eq!(document["tree"][1].as_i64().unwrap(), 10);
}

#[test]
fn test_step_before_reset_fails() {
    let mut episode = Episode::new("Sim7", settings(&[]), &[job(0, 1., 100, 1)]);
    assert!(matches!(episode.step(&NOOP), Err(Error::NotReset(id)) if id == "Sim7"));
}

#[test]
fn test_invalid_actions_are_penalized_separately() {
    init_logger();
    let mut episode = Episode::new("Sim0", settings(&[]), &[job(0, 0., 10000000, 1)]);
    episode.reset(0);

    for action in [[1, 999, 0, 0], [1, 0, 0, 3], [1, -1, 0, 0], [2, 0, 5, 0], [2, 0, -1, 0], [7, 0, 0, 0]] {
        let result = episode.step(&action).unwrap();
        assert!(!result.info.is_valid, "{:?}", action);
        assert_abs_diff_eq!(result.info.invalid_reward, -0.1);
        assert_abs_diff_eq!(
            result.reward,
            result.info.job_wait_reward + result.info.running_vm_cores_reward + result.info.unutilized_vm_cores_reward,
            epsilon = 1e-12
        );
    }

    // host 0 is filled by the initial fleet, host 1 is empty
    let result = episode.step(&[1, 0, 0, 0]).unwrap();
    assert!(!result.info.is_valid);
    let result = episode.step(&[1, 1, 0, 0]).unwrap();
    assert!(result.info.is_valid);
    assert_eq!(result.info.invalid_reward, 0.);
    assert_eq!(result.info.peak_running_vms, 4);
    let simulation = episode.simulation().unwrap();
    assert_eq!(simulation.datacenter().running_vms().count(), 4);
    assert_eq!(simulation.datacenter().host(1).unwrap().vm_count(), 1);
}

#[test]
fn test_step_info_contents() {
    init_logger();
    let mut episode = Episode::new("Sim0", settings(&[]), &[job(0, 0., 20000, 1), job(1, 0., 20000, 1)]);
    let reset = episode.reset(0);
    assert_eq!(reset.observation.len(), 1 + 10 + 70 + 140);
    assert!(reset.observation.iter().all(|row| row.len() == 4));
    assert_eq!(reset.info.vm_metrics.len(), 3);

    let result = episode.step(&NOOP).unwrap();
    assert_eq!(result.info.job_wait_time.len(), 2);
    assert_eq!(result.info.job_metrics.len(), 2);
    assert!(result.info.dot_string.starts_with("graph {"));
    assert!(result.info.dot_string.contains("h0v0j0"));
    // both jobs run on the small VM
    assert_abs_diff_eq!(result.info.unutilized_vm_core_ratio, 12. / 14.);
    assert_eq!(episode.history().get("action").unwrap(), &[0.]);

    while !episode.step(&NOOP).unwrap().terminated {}
    assert!(episode.history().is_empty());
}

#[test]
fn test_reset_restores_initial_state() {
    init_logger();
    let mut episode = Episode::new("Sim0", settings(&[]), &[job(0, 0., 30000, 1)]);
    let first = episode.reset(0);
    episode.step(&[1, 1, 0, 2]).unwrap();
    episode.step(&[2, 0, 0, 0]).unwrap();
    let second = episode.reset(1);
    assert_eq!(first, second);
    assert_eq!(episode.steps(), 0);
    assert_abs_diff_eq!(episode.clock(), 0.1);
}
