use fixpoint::builtin;
use fixpoint::fact::Fact;
use fixpoint::solver::{Phase, Solver};
use fixpoint::FixpointError;

fn solver() -> Solver {
    Solver::new(builtin::successor(&[1, 2], 10))
}

fn is_invalid_state<T: std::fmt::Debug>(result: fixpoint::Result<T>) -> bool {
    matches!(result, Err(FixpointError::InvalidState { .. }))
}

#[test]
fn compute_before_init_is_rejected() {
    let mut solver = solver();
    assert!(is_invalid_state(solver.compute()));
    assert!(is_invalid_state(solver.end()));
    assert!(is_invalid_state(solver.contains(Fact::new(1))));
    assert_eq!(solver.phase(), Phase::Uninitialized);
}

#[test]
fn zero_threads_is_rejected() {
    let mut solver = solver();
    let err = solver.init(0).unwrap_err();
    assert!(matches!(err, FixpointError::InvalidThreadCount(0)));
    assert_eq!(solver.phase(), Phase::Uninitialized);
    assert_eq!(solver.threads(), 0);
    solver.init(3).unwrap();
    assert_eq!(solver.phase(), Phase::Initialized);
    assert_eq!(solver.threads(), 3);
}

#[test]
fn init_twice_is_rejected() {
    let mut solver = solver();
    solver.init(2).unwrap();
    assert!(is_invalid_state(solver.init(2)));
}

#[test]
fn every_method_fails_after_end() {
    let mut solver = solver();
    solver.init(2).unwrap();
    solver.compute().unwrap();
    assert_eq!(solver.phase(), Phase::Quiescent);
    let fixed_point = solver.end().unwrap();
    assert!(fixed_point.is_complete());
    assert_eq!(solver.phase(), Phase::Ended);

    assert!(is_invalid_state(solver.init(2)));
    assert!(is_invalid_state(solver.compute()));
    assert!(is_invalid_state(solver.end()));
    assert!(is_invalid_state(solver.insert(Fact::new(3))));
    assert!(is_invalid_state(solver.contains(Fact::new(3))));
    assert!(is_invalid_state(solver.known()));
}

#[test]
fn invalid_state_names_the_operation_and_phase() {
    let mut solver = solver();
    let message = solver.compute().unwrap_err().to_string();
    assert!(message.contains("compute"), "{message}");
    assert!(message.contains("uninitialized"), "{message}");
}

#[test]
fn seeds_are_known_right_after_init() {
    let mut solver = solver();
    solver.init(3).unwrap();
    assert!(solver.contains(Fact::new(1)).unwrap());
    assert!(solver.contains(Fact::new(2)).unwrap());
    assert!(!solver.contains(Fact::new(3)).unwrap());
    assert_eq!(solver.known().unwrap(), 2);
}

#[test]
fn end_without_compute_is_incomplete() {
    let mut solver = solver();
    solver.init(1).unwrap();
    let fixed_point = solver.end().unwrap();
    assert!(!fixed_point.is_complete());
    assert_eq!(fixed_point.to_vec(), vec![Fact::new(1), Fact::new(2)]);
}

#[test]
fn insert_after_quiescence_extends_the_fixed_point() {
    let mut solver = Solver::new(builtin::successor(&[5], 10));
    solver.init(2).unwrap();
    solver.compute().unwrap();
    assert_eq!(solver.known().unwrap(), 5);

    assert!(!solver.insert(Fact::new(7)).unwrap());
    assert_eq!(solver.phase(), Phase::Quiescent);
    assert!(solver.insert(Fact::new(0)).unwrap());
    assert_eq!(solver.phase(), Phase::Initialized);

    solver.compute().unwrap();
    let fixed_point = solver.end().unwrap();
    assert_eq!(fixed_point.to_vec(), (0..10).map(Fact::new).collect::<Vec<_>>());
}

#[test]
fn compute_on_a_quiescent_solver_changes_nothing() {
    let mut solver = solver();
    solver.init(2).unwrap();
    solver.compute().unwrap();
    let stats = solver.compute().unwrap();
    assert_eq!(stats.derived, 0);
    assert_eq!(solver.known().unwrap(), 9);
}
