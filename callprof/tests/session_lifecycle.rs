use std::path::Path;
use std::thread;
use std::time::{Duration, Instant};

use callprof::export::{load_stats, load_timeseries};
use callprof::session::{FailedRun, SessionError, TargetFault};
use callprof::{
    location, FunctionIdentity, MembershipMode, ResourceProbe, ResourceReading, Session,
    SessionConfig, SessionPhase, Tracer,
};

const THIS_FILE: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/tests/session_lifecycle.rs");

/// Reports a rising CPU reading and constant memory.
struct RampProbe {
    cpu: f64,
}

impl ResourceProbe for RampProbe {
    fn read(&mut self) -> ResourceReading {
        self.cpu += 1.0;
        ResourceReading { cpu_percent: self.cpu, memory_mb: 64.0 }
    }
}

fn config(out: &Path) -> SessionConfig {
    SessionConfig::new(THIS_FILE)
        .with_interval(Duration::from_millis(5))
        .with_flush_interval(Duration::from_millis(30))
        .with_output_dir(out)
}

fn session(config: SessionConfig) -> Session {
    Session::new(config).expect("target file should resolve").with_probe(RampProbe { cpu: 0.0 })
}

fn b(tracer: &Tracer) {
    let _scope = tracer.scope(location!("b"));
    thread::sleep(Duration::from_millis(10));
}

fn a(tracer: &Tracer) {
    let _scope = tracer.scope(location!("a"));
    for _ in 0..3 {
        b(tracer);
    }
}

#[test]
fn test_nested_scenario_statistics() {
    let dir = tempfile::tempdir().unwrap();
    let (_, output) = session(config(dir.path()))
        .run(|tracer| -> Result<(), std::io::Error> {
            a(tracer);
            Ok(())
        })
        .unwrap();

    let a_stats = output.stats.by_function("a").unwrap();
    let b_stats = output.stats.by_function("b").unwrap();
    assert_eq!(a_stats.calls, 1);
    assert_eq!(b_stats.calls, 3);
    assert!(a_stats.total_time >= b_stats.total_time);
    assert!(b_stats.total_time >= 0.03);

    let persisted = load_stats(&dir.path().join("function_statistics.json")).unwrap();
    assert_eq!(persisted.len(), 2);
    assert!(persisted.keys().all(|key| key.starts_with("session_lifecycle.rs:")));
    assert!(persisted.keys().any(|key| key.contains(":a:")));
    assert!(persisted.keys().any(|key| key.contains(":b:")));
}

#[test]
fn test_durations_fit_within_run() {
    let dir = tempfile::tempdir().unwrap();
    let started = Instant::now();
    let (_, output) = session(config(dir.path()))
        .run(|tracer| -> Result<(), std::io::Error> {
            a(tracer);
            b(tracer);
            Ok(())
        })
        .unwrap();
    let wall = started.elapsed().as_secs_f64();

    for (identity, stats) in output.stats.entries() {
        assert!(stats.total_time <= wall, "{identity} exceeds run time");
    }
    assert!(output.elapsed.as_secs_f64() <= wall);
}

#[test]
fn test_sequential_call_count() {
    let dir = tempfile::tempdir().unwrap();
    let (_, output) = session(config(dir.path()))
        .run(|tracer| -> Result<(), std::io::Error> {
            for _ in 0..25 {
                tracer.call(location!("leaf"), || ());
            }
            Ok(())
        })
        .unwrap();

    assert_eq!(output.stats.by_function("leaf").unwrap().calls, 25);
}

#[test]
fn test_active_set_during_nesting() {
    let dir = tempfile::tempdir().unwrap();
    session(config(dir.path()))
        .run(|tracer| -> Result<(), std::io::Error> {
            let outer = location!("outer");
            let outer_id = FunctionIdentity::from_location(&outer);
            tracer.call(outer, || {
                let inner = location!("inner");
                let inner_id = FunctionIdentity::from_location(&inner);
                tracer.call(inner, || {
                    tracer.inspect(|state| {
                        assert!(state.is_active(&outer_id));
                        assert!(state.is_active(&inner_id));
                    });
                });
                tracer.inspect(|state| {
                    assert!(state.is_active(&outer_id));
                    assert!(!state.is_active(&inner_id));
                    assert!(state.is_consistent());
                });
            });
            Ok(())
        })
        .unwrap();
}

fn recurse(tracer: &Tracer, depth: u32, observed: &mut Vec<bool>) {
    let loc = location!("recurse");
    let id = FunctionIdentity::from_location(&loc);
    let _scope = tracer.scope(loc);
    if depth > 0 {
        recurse(tracer, depth - 1, observed);
        observed.push(tracer.inspect(|state| state.is_active(&id)));
    }
}

#[test]
fn test_recursion_with_set_membership() {
    let dir = tempfile::tempdir().unwrap();
    let mut observed = Vec::new();
    let (_, output) = session(config(dir.path()))
        .run(|tracer| -> Result<(), std::io::Error> {
            recurse(tracer, 1, &mut observed);
            Ok(())
        })
        .unwrap();

    // The inner return clears membership while the outer call is still open
    assert_eq!(observed, vec![false]);
    assert_eq!(output.stats.by_function("recurse").unwrap().calls, 2);
}

#[test]
fn test_recursion_with_refcounted_membership() {
    let dir = tempfile::tempdir().unwrap();
    let mut observed = Vec::new();
    let config = config(dir.path()).with_membership(MembershipMode::RefCounted);
    let (_, output) = session(config)
        .run(|tracer| -> Result<(), std::io::Error> {
            recurse(tracer, 1, &mut observed);
            Ok(())
        })
        .unwrap();

    assert_eq!(observed, vec![true]);
    assert_eq!(output.stats.by_function("recurse").unwrap().calls, 2);
}

#[test]
fn test_missing_target_writes_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let config = SessionConfig::new(dir.path().join("missing.rs")).with_output_dir(dir.path());

    let Err(err) = Session::new(config) else { panic!("missing target must be rejected") };
    assert!(err.to_string().contains("missing.rs"));
    assert!(!dir.path().join("function_statistics.json").exists());
    assert!(!dir.path().join("realtime_monitor.json").exists());
}

#[test]
fn test_failing_target_persists_both_artifacts() {
    let dir = tempfile::tempdir().unwrap();
    let err = session(config(dir.path()))
        .run(|tracer| -> Result<(), String> {
            b(tracer);
            let _scope = tracer.scope(location!("fails"));
            Err("bad input".to_string())
        })
        .unwrap_err();

    let SessionError::Target(run) = err else { panic!("expected a target fault") };
    let FailedRun { fault, output } = *run;
    assert!(matches!(fault, TargetFault::Error(ref msg) if msg == "bad input"));
    assert_eq!(output.phase, SessionPhase::Failed);

    let stats = load_stats(&dir.path().join("function_statistics.json")).unwrap();
    assert!(stats.keys().any(|key| key.contains(":b:")));
    assert!(stats.keys().any(|key| key.contains(":fails:")));

    let series = load_timeseries(&dir.path().join("realtime_monitor.json")).unwrap();
    assert_eq!(series, output.series);
    assert!(!series.is_empty());
}

#[test]
fn test_idle_ticks_attribute_to_main() {
    let dir = tempfile::tempdir().unwrap();
    let (_, output) = session(config(dir.path()))
        .run(|_| -> Result<(), std::io::Error> {
            thread::sleep(Duration::from_millis(40));
            Ok(())
        })
        .unwrap();

    assert!(output.stats.is_empty());
    assert!(output
        .series
        .iter()
        .all(|entry| entry.active_functions == vec!["session_lifecycle.rs:<main>:1".to_string()]));
}

#[test]
fn test_shutdown_within_one_interval() {
    let dir = tempfile::tempdir().unwrap();
    let interval = Duration::from_millis(400);
    let config = config(dir.path()).with_interval(interval);

    let started = Instant::now();
    session(config).run(|_| -> Result<(), std::io::Error> { Ok(()) }).unwrap();

    assert!(started.elapsed() < interval);
}
