use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use super::*;

/// Minimal subject with one injected dependency.
struct Doubler {
    seed: u32,
}

impl Doubler {
    fn double(&self) -> u32 {
        self.seed * 2
    }
}

fn doubler_spec() -> Spec<Doubler, u32> {
    Spec::transient(
        |scope, _| {
            scope.provide(21u32);
            Ok(())
        },
        |scope, overrides| {
            let seed = match overrides.get::<u32>("seed") {
                Some(seed) => *seed,
                None => scope.take::<u32>()?,
            };
            Ok(Doubler { seed })
        },
        |subject, _| Ok(subject.double()),
    )
}

#[test]
fn transient_spec_runs_and_captures_the_result() {
    let mut spec = doubler_spec();
    spec.run().unwrap();
    assert_eq!(spec.result().unwrap(), 42);
    assert_eq!(spec.sharing(), Sharing::Transient);
}

#[test]
fn overrides_take_precedence_over_the_scope() {
    let mut spec = doubler_spec();
    spec.override_with("seed", 5u32).unwrap();
    spec.run().unwrap();
    assert_eq!(spec.result().unwrap(), 10);
}

#[test]
fn overrides_are_frozen_once_run_was_called() {
    let mut spec = doubler_spec();
    spec.run().unwrap();
    assert!(matches!(
        spec.override_with("seed", 5u32),
        Err(FixtureError::OverridesFrozen)
    ));
}

#[test]
fn double_expectation_registration_fails_before_arrange() {
    let arranged = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&arranged);
    let mut spec: Spec<(), ()> = Spec::transient(
        move |_, _| {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(())
        },
        |_, _| Ok(()),
        |_, _| Ok(()),
    );

    spec.expect_raise().unwrap();
    assert!(matches!(
        spec.expect_raise(),
        Err(FixtureError::ExpectationAlreadySet)
    ));
    // The failed registration happened before any lifecycle step ran.
    assert_eq!(arranged.load(Ordering::SeqCst), 0);
}

#[test]
fn expected_raise_flow_exposes_the_error() {
    let mut spec: Spec<Doubler, u32> = Spec::transient(
        |_, _| Ok(()),
        |_, _| Ok(Doubler { seed: 1 }),
        |_, _| Err(anyhow::anyhow!("subject misbehaved")),
    );
    spec.expect_raise().unwrap();
    spec.run().unwrap();

    assert!(spec.has_raised().unwrap());
    assert_eq!(
        spec.raised(|err| err.to_string()).unwrap(),
        "subject misbehaved"
    );
    assert!(matches!(spec.result(), Err(FixtureError::Uninitialized)));
}

#[test]
fn shared_specs_arrange_once_and_all_observe() {
    let fixture: Arc<Fixture<Doubler, u32>> = Arc::new(Fixture::new());
    let arranges = Arc::new(AtomicUsize::new(0));

    let make_spec = |fixture: &Arc<Fixture<Doubler, u32>>, arranges: &Arc<AtomicUsize>| {
        let counter = Arc::clone(arranges);
        Spec::shared(
            Arc::clone(fixture),
            move |_, store| {
                counter.fetch_add(1, Ordering::SeqCst);
                store.put("arranged", true)?;
                Ok(())
            },
            |_, _| Ok(Doubler { seed: 3 }),
            |subject, _| Ok(subject.double()),
        )
    };

    let mut first = make_spec(&fixture, &arranges);
    let mut second = make_spec(&fixture, &arranges);
    first.run().unwrap();
    second.run().unwrap();

    assert_eq!(arranges.load(Ordering::SeqCst), 1);
    assert_eq!(first.result().unwrap(), 6);
    assert_eq!(second.result().unwrap(), 6);
    assert!(second.get::<bool>("arranged").unwrap());
}

#[test]
fn transient_drop_releases_the_fixture() {
    let cleanups = Arc::new(AtomicUsize::new(0));
    {
        let mut spec = doubler_spec();
        let counter = Arc::clone(&cleanups);
        spec.on_cleanup(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        spec.run().unwrap();
    }
    assert_eq!(cleanups.load(Ordering::SeqCst), 1);
}

#[test]
fn second_run_on_the_same_instance_is_an_idempotent_observer() {
    let fixture: Arc<Fixture<Doubler, u32>> = Arc::new(Fixture::new());
    let mut spec = Spec::shared(
        Arc::clone(&fixture),
        |_, _| Ok(()),
        |_, _| Ok(Doubler { seed: 1 }),
        |subject, _| Ok(subject.double()),
    );
    spec.run().unwrap();
    // A second run on the same instance is an idempotent observer.
    spec.run().unwrap();
    assert_eq!(spec.result().unwrap(), 2);
}

#[test]
fn simple_spec_needs_no_subject() {
    let mut spec = Spec::simple(
        |store| {
            store.put("input", 7i32)?;
            Ok(())
        },
        |store| {
            let input = store.get::<i32>("input")?;
            Ok(input + 1)
        },
    );
    spec.run().unwrap();
    assert_eq!(spec.result().unwrap(), 8);
}

#[test]
fn wiring_spec_exposes_the_resolved_subject() {
    #[derive(Clone, Debug, PartialEq)]
    struct Resolved {
        name: &'static str,
    }

    let mut spec = Spec::wiring(|scope, _| {
        scope.provide(Resolved { name: "concrete" });
        scope.take::<Resolved>().map_err(Into::into)
    });
    spec.run().unwrap();
    assert_eq!(spec.result().unwrap(), Resolved { name: "concrete" });
}

#[test]
fn mapping_spec_converts_and_keeps_the_source() {
    #[derive(Clone, Debug, PartialEq)]
    struct Source {
        id: u32,
    }
    #[derive(Clone, Debug, PartialEq)]
    struct Destination {
        id_text: String,
    }

    let mut spec = Spec::mapping(Source { id: 7 }, |source: Source| {
        Ok(Destination {
            id_text: source.id.to_string(),
        })
    });
    spec.run().unwrap();

    assert_eq!(
        spec.result().unwrap(),
        Destination {
            id_text: "7".to_string()
        }
    );
    assert_eq!(
        spec.get::<Source>(MAPPING_SOURCE_KEY).unwrap(),
        Source { id: 7 }
    );
}
