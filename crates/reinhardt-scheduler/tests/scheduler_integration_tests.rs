//! Integration tests for the update scheduler
//!
//! Covers batching, re-entrant marks and flushes, callback deduplication,
//! failure handling and the pass limit. A property test checks that marks
//! made before the deferred flush coalesce into one update per component.

use std::cell::RefCell;
use std::collections::BTreeSet;
use std::rc::Rc;

use proptest::prelude::*;
use reinhardt_scheduler::{
	BoxError, Callback, Component, ComponentId, DirtyMask, FlushState, MicrotaskQueue, Scheduler,
	SchedulerConfig, SchedulerError, UpdateContext,
};
use rstest::rstest;

type Log = Rc<RefCell<Vec<String>>>;
type PatchFn = Box<dyn FnMut(&DirtyMask, &UpdateContext<'_>) -> Result<(), BoxError>>;

/// A component whose patch step is supplied by the test.
struct Scripted {
	on_patch: PatchFn,
}

impl Component for Scripted {
	fn patch(&mut self, dirty: &DirtyMask, cx: &UpdateContext<'_>) -> Result<(), BoxError> {
		(self.on_patch)(dirty, cx)
	}
}

fn setup(config: SchedulerConfig) -> (Rc<MicrotaskQueue>, Rc<Scheduler>) {
	let queue = Rc::new(MicrotaskQueue::new());
	let scheduler = Scheduler::with_config(queue.clone(), config);
	(queue, scheduler)
}

fn scripted<F>(scheduler: &Scheduler, on_patch: F) -> ComponentId
where
	F: FnMut(&DirtyMask, &UpdateContext<'_>) -> Result<(), BoxError> + 'static,
{
	scheduler.register(Rc::new(RefCell::new(Scripted {
		on_patch: Box::new(on_patch),
	})))
}

fn logging(scheduler: &Scheduler, log: &Log, name: &'static str) -> ComponentId {
	let log = Rc::clone(log);
	scripted(scheduler, move |dirty, _| {
		log.borrow_mut()
			.push(format!("{name}{:?}", dirty.iter().collect::<Vec<_>>()));
		Ok(())
	})
}

fn entries(log: &Log) -> Vec<String> {
	log.borrow().clone()
}

#[rstest]
fn test_double_mark_flushes_and_updates_once() {
	let (queue, scheduler) = setup(SchedulerConfig::default());
	let log = Log::default();
	let a = logging(&scheduler, &log, "a");

	scheduler.make_dirty(a, 0).unwrap();
	scheduler.make_dirty(a, 0).unwrap();

	assert_eq!(queue.run_until_stalled().unwrap(), 1);
	assert_eq!(scheduler.flush_count(), 1);
	assert_eq!(entries(&log), vec!["a[0]"]);
}

#[rstest]
fn test_mark_during_update_joins_the_same_pass() {
	let (queue, scheduler) = setup(SchedulerConfig::default());
	let log = Log::default();
	let b = logging(&scheduler, &log, "b");
	let a = {
		let log = Rc::clone(&log);
		scripted(&scheduler, move |_, cx| {
			log.borrow_mut().push("a".to_string());
			cx.scheduler().make_dirty(b, 4)?;
			Ok(())
		})
	};

	scheduler.make_dirty(a, 0).unwrap();
	queue.run_until_stalled().unwrap();

	assert_eq!(entries(&log), vec!["a", "b[4]"]);
	assert_eq!(scheduler.flush_count(), 1);
	assert!(queue.is_empty());
	assert_eq!(scheduler.state(), FlushState::Idle);
}

#[rstest]
fn test_shared_after_update_callback_runs_once_per_flush() {
	let (queue, scheduler) = setup(SchedulerConfig::default());
	let log = Log::default();
	let a = logging(&scheduler, &log, "a");
	let b = logging(&scheduler, &log, "b");
	let shared = {
		let log = Rc::clone(&log);
		Callback::new(move |_| {
			log.borrow_mut().push("after".to_string());
			Ok(())
		})
	};
	let id_a = scheduler.after_update(a, shared.clone()).unwrap();
	let id_b = scheduler.after_update(b, shared).unwrap();
	assert_eq!(id_a, id_b);

	scheduler.make_dirty(a, 0).unwrap();
	scheduler.make_dirty(b, 0).unwrap();
	queue.run_until_stalled().unwrap();
	assert_eq!(entries(&log), vec!["a[0]", "b[0]", "after"]);

	scheduler.make_dirty(b, 1).unwrap();
	queue.run_until_stalled().unwrap();
	assert_eq!(entries(&log), vec!["a[0]", "b[0]", "after", "b[1]", "after"]);
}

#[rstest]
fn test_reentrant_flush_continues_the_running_pass() {
	let (queue, scheduler) = setup(SchedulerConfig::default());
	let log = Log::default();
	let b = logging(&scheduler, &log, "b");
	let a = {
		let log = Rc::clone(&log);
		scripted(&scheduler, move |_, cx| {
			log.borrow_mut().push("a:start".to_string());
			cx.scheduler().make_dirty(b, 0)?;
			cx.scheduler().flush()?;
			log.borrow_mut().push("a:end".to_string());
			Ok(())
		})
	};

	scheduler.make_dirty(a, 0).unwrap();
	queue.run_until_stalled().unwrap();

	assert_eq!(entries(&log), vec!["a:start", "b[0]", "a:end"]);
	assert_eq!(scheduler.flush_count(), 1);
}

#[rstest]
fn test_reentrant_flush_stops_at_component_mid_update() {
	let (queue, scheduler) = setup(SchedulerConfig::default());
	let log = Log::default();
	let a = {
		let log = Rc::clone(&log);
		let mut runs = 0;
		scripted(&scheduler, move |dirty, cx| {
			runs += 1;
			log.borrow_mut()
				.push(format!("a{:?}", dirty.iter().collect::<Vec<_>>()));
			if runs == 1 {
				cx.invalidate(1)?;
				cx.scheduler().flush()?;
			}
			Ok(())
		})
	};

	scheduler.make_dirty(a, 0).unwrap();
	queue.run_until_stalled().unwrap();

	assert_eq!(entries(&log), vec!["a[0]", "a[1]"]);
	assert_eq!(scheduler.flush_count(), 1);
}

#[rstest]
fn test_failed_update_keeps_remaining_work() {
	let (queue, scheduler) = setup(SchedulerConfig::default());
	let log = Log::default();
	let broken = scripted(&scheduler, |_, _| Err("render failed".into()));
	let b = logging(&scheduler, &log, "b");

	scheduler.make_dirty(broken, 0).unwrap();
	scheduler.make_dirty(b, 0).unwrap();

	let err = queue.run_until_stalled().unwrap_err();
	assert!(matches!(err, SchedulerError::Update { component, .. } if component == broken));
	assert_eq!(err.to_string(), "Update of component#0 failed: render failed");
	assert_eq!(scheduler.state(), FlushState::Idle);
	assert!(entries(&log).is_empty());
	assert_eq!(scheduler.pending(), 1);

	scheduler.flush().unwrap();
	assert_eq!(entries(&log), vec!["b[0]"]);
	assert_eq!(scheduler.pending(), 0);

	// The failed component is clean again and can be re-marked.
	scheduler.make_dirty(broken, 0).unwrap();
	assert_eq!(scheduler.state(), FlushState::Scheduled);
}

#[rstest]
fn test_pass_limit_stops_endless_reinvalidation() {
	let (queue, scheduler) = setup(SchedulerConfig {
		max_passes: Some(3),
	});
	// Every update queues a binding that marks the component again.
	let a = scripted(&scheduler, |_, cx| {
		let id = cx.component();
		cx.scheduler().add_binding_callback(Box::new(move |scheduler| {
			scheduler.make_dirty(id, 0)?;
			Ok(())
		}));
		Ok(())
	});

	scheduler.make_dirty(a, 0).unwrap();
	let err = queue.run_until_stalled().unwrap_err();

	assert!(matches!(err, SchedulerError::PassLimitExceeded { passes: 3 }));
	assert_eq!(scheduler.state(), FlushState::Idle);
}

#[rstest]
fn test_marks_from_flush_callbacks_schedule_another_flush() {
	let (queue, scheduler) = setup(SchedulerConfig::default());
	let log = Log::default();
	let a = logging(&scheduler, &log, "a");
	scheduler.add_flush_callback(Box::new(move |scheduler| {
		scheduler.make_dirty(a, 7)?;
		Ok(())
	}));

	scheduler.flush().unwrap();
	assert!(entries(&log).is_empty());
	assert_eq!(scheduler.state(), FlushState::Scheduled);

	queue.run_until_stalled().unwrap();
	assert_eq!(entries(&log), vec!["a[7]"]);
	assert_eq!(scheduler.flush_count(), 2);
}

#[rstest]
fn test_flush_from_flush_callback_runs_after_update_callbacks() {
	let (queue, scheduler) = setup(SchedulerConfig::default());
	let log = Log::default();
	let a = logging(&scheduler, &log, "a");
	{
		let log = Rc::clone(&log);
		scheduler
			.after_update(
				a,
				Callback::new(move |_| {
					log.borrow_mut().push("after".to_string());
					Ok(())
				}),
			)
			.unwrap();
	}
	scheduler.add_flush_callback(Box::new(move |scheduler| {
		scheduler.make_dirty(a, 1)?;
		scheduler.flush()?;
		Ok(())
	}));

	scheduler.flush().unwrap();
	assert_eq!(entries(&log), vec!["a[1]"]);
	assert_eq!(scheduler.state(), FlushState::Scheduled);

	queue.run_until_stalled().unwrap();
	assert_eq!(entries(&log), vec!["a[1]", "after"]);
	assert_eq!(scheduler.state(), FlushState::Idle);
	assert_eq!(scheduler.flush_count(), 2);
}

proptest! {
	#![proptest_config(ProptestConfig::with_cases(64))]

	/// Property: marks coalesce into one update per component, in first-mark
	/// order, carrying every marked slot
	#[test]
	fn test_marks_coalesce_in_first_mark_order(
		marks in prop::collection::vec((0usize..6, 0usize..130), 1..40)
	) {
		let (queue, scheduler) = setup(SchedulerConfig::default());
		let log = Log::default();
		let names = ["c0", "c1", "c2", "c3", "c4", "c5"];
		let ids: Vec<ComponentId> = names
			.iter()
			.map(|&name| logging(&scheduler, &log, name))
			.collect();

		for &(component, slot) in &marks {
			scheduler.make_dirty(ids[component], slot).unwrap();
		}
		prop_assert_eq!(queue.len(), 1);
		queue.run_until_stalled().unwrap();

		let mut order: Vec<usize> = Vec::new();
		for &(component, _) in &marks {
			if !order.contains(&component) {
				order.push(component);
			}
		}
		let expected: Vec<String> = order
			.iter()
			.map(|&component| {
				let slots: BTreeSet<usize> = marks
					.iter()
					.filter(|(c, _)| *c == component)
					.map(|&(_, slot)| slot)
					.collect();
				format!("{}{:?}", names[component], slots.into_iter().collect::<Vec<_>>())
			})
			.collect();
		prop_assert_eq!(entries(&log), expected);
		prop_assert_eq!(scheduler.flush_count(), 1);
	}
}
