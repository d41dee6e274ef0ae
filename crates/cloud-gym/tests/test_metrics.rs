mod common;
use common::{init_logger, job, settings};

use cloud_gym::core::metrics::{to_dot, tree_array, ObservationEncoder};
use cloud_gym::CloudSimulation;

#[test]
fn test_tree_of_initial_fleet() {
    init_logger();
    let settings = settings(&[("hosts_count", "2")]);
    let mut simulation = CloudSimulation::new(settings, &[job(0, 0., 50000, 1), job(1, 0., 50000, 1)]);
    assert_eq!(
        tree_array(simulation.datacenter()),
        vec![28, 2, 14, 3, 2, 0, 4, 0, 8, 0, 14, 0]
    );

    simulation.advance(1.).unwrap();
    // both jobs are placed on the small VM
    let tree = tree_array(simulation.datacenter());
    assert_eq!(tree, vec![28, 2, 14, 3, 2, 2, 1, 0, 1, 0, 4, 0, 8, 0, 14, 0]);

    let dot = to_dot(&tree);
    for line in [
        "d0 [label=28]",
        "h0v0 [label=2]",
        "h0v0j1 [label=1]",
        "h0v0 -- h0v0j1",
        "h0v2 [label=8]",
        "d0 -- h1",
    ] {
        assert!(dot.contains(line), "{} not in {}", line, dot);
    }
    assert!(!dot.contains("h1v0"));
}

#[test]
fn test_observation_rows() {
    init_logger();
    let settings = settings(&[("hosts_count", "2")]);
    let mut simulation = CloudSimulation::new(settings.clone(), &[job(0, 0., 50000, 1), job(1, 0., 50000, 1)]);
    let mut encoder = ObservationEncoder::new(&settings);
    assert_eq!(encoder.shape(), (1 + 2 + 14 + 28, 4));

    encoder.sample(simulation.datacenter(), simulation.ledger(), simulation.clock());
    let observation = encoder.observation();
    assert_eq!(observation.len(), 45);
    assert_eq!(observation[0], vec![0.5, 3. / 14., 0., 1.]);
    assert_eq!(observation[1], vec![1., 57344. / 65536., 7000. / 50000., 3. / 7.]);
    assert_eq!(observation[2], vec![0.; 4]);
    assert_eq!(observation[5], vec![1., 0., 0., 0.5]);
    assert!(observation[17..].iter().all(|row| row == &vec![0.; 4]));

    simulation.advance(1.).unwrap();
    encoder.sample(simulation.datacenter(), simulation.ledger(), simulation.clock());
    let observation = encoder.observation();
    // small VM is fully used by the two jobs
    assert_eq!(observation[0][2], 0.);
    assert_eq!(observation[0][3], 12. / 14.);
    assert_eq!(observation[3], vec![0.25, 1., 0., 0.5]);
    assert_eq!(observation[17][0], 0.5);
    // started at 0.2, needs 5 time units
    assert!((observation[17][1] - 0.9 / 5.).abs() < 1e-9);
    assert_eq!(observation[17][2], 1. / 14.);
    assert_eq!(observation[17][3], 1.);
    assert_eq!(observation[19], vec![0.; 4]);

    encoder.clear();
    assert_eq!(encoder.storage().datacenter, vec![0.; 4]);
    assert!(encoder.storage().vms.is_empty());
}
