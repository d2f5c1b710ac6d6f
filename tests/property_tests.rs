//! Property-Based Tests for zinstall
//!
//! These tests verify:
//! - Wizard outcome matches a straightforward index walk for any result script
//! - Progress percentages are total and bounded
//! - Start notifications never repeat without a finish in between
//! - Whole-number sizes parse to exactly that many units

use proptest::prelude::*;
use std::cell::RefCell;
use std::collections::{HashSet, VecDeque};
use std::rc::Rc;

use zinstall::progress::{fraction_percent, percent};
use zinstall::wizard::FnStep;
use zinstall::{
    str_to_size, Context, Operation, ProgressEvent, ProgressRelay, ScreenResult, Size, SizeUnit,
    Step, WizardController, WizardOutcome,
};

// =============================================================================
// Wizard Navigation Properties
// =============================================================================

#[derive(Debug, Clone, Copy)]
enum Nav {
    Forward,
    Back,
    Exit,
    Repeat,
}

fn nav_strategy() -> impl Strategy<Value = Nav> {
    prop_oneof![
        4 => Just(Nav::Forward),
        3 => Just(Nav::Back),
        1 => Just(Nav::Exit),
        2 => Just(Nav::Repeat),
    ]
}

/// Reference walk: what the wizard should end with for a shared result script.
fn expected_outcome(steps: usize, script: &[Nav]) -> WizardOutcome {
    let mut index: isize = 0;
    let mut remaining = script.iter();
    while (index as usize) < steps {
        match remaining.next() {
            Some(Nav::Forward) => index += 1,
            Some(Nav::Back) => {
                index -= 1;
                if index < 0 {
                    return WizardOutcome::Aborted;
                }
            }
            Some(Nav::Repeat) => {}
            Some(Nav::Exit) | None => return WizardOutcome::Exited,
        }
    }
    WizardOutcome::Completed
}

proptest! {
    /// Every step draws from one shared script; an exhausted script exits.
    #[test]
    fn wizard_outcome_matches_index_walk(
        steps in 1usize..6,
        script in prop::collection::vec(nav_strategy(), 0..40),
    ) {
        let queue: Rc<RefCell<VecDeque<Nav>>> = Rc::new(RefCell::new(script.iter().copied().collect()));
        let wizard_steps: Vec<Box<dyn Step>> = (0..steps)
            .map(|i| {
                let queue = queue.clone();
                Box::new(FnStep::new(format!("step{}", i), move |_ctx: &mut Context| {
                    Ok(match queue.borrow_mut().pop_front() {
                        Some(Nav::Forward) => ScreenResult::forward_with(format!("step{}", i), true),
                        Some(Nav::Back) => ScreenResult::Back,
                        Some(Nav::Repeat) => ScreenResult::Repeat,
                        Some(Nav::Exit) | None => ScreenResult::Exit,
                    })
                })) as Box<dyn Step>
            })
            .collect();

        let mut wizard = WizardController::new(wizard_steps);
        let mut ctx = Context::new();
        let outcome = wizard.run(&mut ctx).unwrap();

        prop_assert_eq!(outcome, expected_outcome(steps, &script));
        if outcome == WizardOutcome::Completed {
            prop_assert_eq!(ctx.len(), steps);
        }
    }
}

// =============================================================================
// Progress Properties
// =============================================================================

proptest! {
    /// A zero total is always 0%, never a panic.
    #[test]
    fn percent_zero_total_is_zero(read in any::<u64>()) {
        prop_assert_eq!(percent(read, 0), 0);
    }

    /// Percent never exceeds 100 and is monotone in bytes read.
    #[test]
    fn percent_is_bounded_and_monotone(a in any::<u64>(), b in any::<u64>(), total in 1u64..) {
        let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
        prop_assert!(percent(hi, total) <= 100);
        prop_assert!(percent(lo, total) <= percent(hi, total));
    }

    #[test]
    fn fraction_percent_is_bounded(fraction in any::<f64>()) {
        prop_assert!(fraction_percent(fraction) <= 100);
    }
}

#[derive(Debug, Clone)]
enum Call {
    Start(usize),
    Update(usize),
    Finish(usize),
}

fn call_strategy() -> impl Strategy<Value = Call> {
    prop_oneof![
        (0usize..3).prop_map(Call::Start),
        (0usize..3).prop_map(Call::Update),
        (0usize..3).prop_map(Call::Finish),
    ]
}

proptest! {
    /// For every name, two starts are always separated by a finish.
    #[test]
    fn no_duplicate_starts_without_finish(calls in prop::collection::vec(call_strategy(), 0..60)) {
        let events: Rc<RefCell<Vec<ProgressEvent>>> = Rc::new(RefCell::new(Vec::new()));
        let sink = events.clone();
        let mut relay = ProgressRelay::new(Box::new(move |e: &ProgressEvent| {
            sink.borrow_mut().push(e.clone());
        }));

        let names = ["a.rpm", "b.rpm", "c.rpm"];
        for call in &calls {
            match call {
                Call::Start(i) => { relay.download_start(names[*i], "http://repo"); }
                Call::Update(i) => relay.download_update(names[*i], "http://repo", 1, 2),
                Call::Finish(i) => relay.download_finish(names[*i], "http://repo"),
            }
        }

        let mut started: HashSet<String> = HashSet::new();
        for event in events.borrow().iter() {
            match event.operation {
                Operation::DownloadStart => {
                    prop_assert!(started.insert(event.package.clone()), "duplicate start for {}", event.package);
                }
                Operation::DownloadFinish => {
                    started.remove(&event.package);
                }
                _ => {}
            }
        }
    }
}

// =============================================================================
// Size Parsing Properties
// =============================================================================

proptest! {
    /// A bare whole number is that many MiB, and an explicit M suffix agrees.
    #[test]
    fn whole_mib_parse(n in 0u64..1_000_000) {
        prop_assert_eq!(str_to_size(&n.to_string(), SizeUnit::Mib), Some(Size::from_mib(n)));
        prop_assert_eq!(str_to_size(&format!("{}M", n), SizeUnit::Gib), Some(Size::from_mib(n)));
    }

    /// Input with no digits never parses.
    #[test]
    fn no_digits_never_parse(s in "[a-zA-Z .]*") {
        prop_assert_eq!(str_to_size(&s, SizeUnit::Mib), None);
    }
}
