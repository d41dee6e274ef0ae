use cloud_gym::core::job::{Job, JobDescriptor};
use cloud_gym::core::placement::{PlacementPolicy, StickyNextFit, VmCandidate};

fn job(cores: i64) -> Job {
    Job::from_descriptor(&JobDescriptor::new(0, 0., 100, cores))
}

fn candidates(free_cores: &[u32]) -> Vec<VmCandidate> {
    free_cores
        .iter()
        .enumerate()
        .map(|(i, free_cores)| VmCandidate {
            vm_id: i as u32 * 10,
            free_cores: *free_cores,
        })
        .collect()
}

#[test]
fn test_search_resumes_from_last_selected_vm() {
    let mut policy = StickyNextFit::new();
    assert_eq!(policy.select_vm(&job(2), &candidates(&[1, 2, 4])), Some(10));
    assert_eq!(policy.cursor(), 1);
    // VM 0 would fit too, but the search starts at the cursor
    assert_eq!(policy.select_vm(&job(1), &candidates(&[1, 2, 4])), Some(10));
    assert_eq!(policy.select_vm(&job(3), &candidates(&[4, 2, 4])), Some(20));
    assert_eq!(policy.cursor(), 2);
    // the search wraps around
    assert_eq!(policy.select_vm(&job(4), &candidates(&[4, 2, 1])), Some(0));
    assert_eq!(policy.cursor(), 0);
}

#[test]
fn test_no_fit_keeps_cursor() {
    let mut policy = StickyNextFit::new();
    assert_eq!(policy.select_vm(&job(2), &candidates(&[0, 0, 2])), Some(20));
    assert_eq!(policy.select_vm(&job(8), &candidates(&[4, 4, 4])), None);
    assert_eq!(policy.cursor(), 2);
    assert_eq!(policy.select_vm(&job(1), &[]), None);
    assert_eq!(policy.cursor(), 2);
}

#[test]
fn test_cursor_wraps_when_vms_are_removed() {
    let mut policy = StickyNextFit::new();
    assert_eq!(policy.select_vm(&job(1), &candidates(&[0, 0, 0, 0, 1])), Some(40));
    assert_eq!(policy.cursor(), 4);
    // 4 mod 3 = 1
    assert_eq!(policy.select_vm(&job(1), &candidates(&[1, 1, 1])), Some(10));
    assert_eq!(policy.cursor(), 1);
}

#[test]
fn test_bound_job_uses_its_vm() {
    let mut policy = StickyNextFit::new();
    let mut bound = job(4);
    bound.bound_vm = Some(20);
    assert_eq!(policy.select_vm(&bound, &candidates(&[8, 8, 0])), Some(20));
    assert_eq!(policy.cursor(), 0);
    bound.bound_vm = Some(30);
    assert_eq!(policy.select_vm(&bound, &candidates(&[8, 8, 0])), None);
}
