use std::time::Duration;

use flipboard_core::{CellAddress, Command, Event, Glyph, HoverTiming, SessionToken, WordPhase};
use flipboard_system_hover::{Config, Hover};
use flipboard_world::{self as world, query, World};

struct Harness {
    world: World,
    hover: Hover,
    log: Vec<Event>,
}

impl Harness {
    fn new() -> Self {
        Self {
            world: World::new(),
            hover: Hover::new(Config::new(HoverTiming::default(), 17)),
            log: Vec::new(),
        }
    }

    fn submit(&mut self, command: Command) -> Vec<Event> {
        let mut events = Vec::new();
        world::apply(&mut self.world, command, &mut events);
        let mut emitted = events.clone();

        while !events.is_empty() {
            let mut commands = Vec::new();
            self.hover.handle(&events, &mut commands);
            events.clear();
            for command in commands {
                world::apply(&mut self.world, command, &mut events);
            }
            emitted.extend(events.iter().cloned());
        }

        self.log.extend(emitted.iter().cloned());
        emitted
    }

    fn advance_to(&mut self, until: Duration) {
        loop {
            let events = self.submit(Command::Advance { until });
            if events
                .iter()
                .any(|event| matches!(event, Event::TimeAdvanced { .. }))
            {
                break;
            }
        }
    }

    fn settled(text: &str) -> Self {
        let mut harness = Self::new();
        let _ = harness.submit(Command::Replace {
            text: text.to_owned(),
        });
        let session = SessionToken::new(1);
        for word in 0..text.split_whitespace().count() {
            let _ = harness.submit(Command::EnterWord { session, word });
            let _ = harness.submit(Command::SettleWord { session, word });
        }
        harness
    }

    fn bursts_started(&self) -> usize {
        self.log
            .iter()
            .filter(|event| matches!(event, Event::BurstStarted { .. }))
            .count()
    }

    fn display(&self, address: CellAddress) -> Option<Glyph> {
        query::grid_view(&self.world)
            .cell(address)
            .and_then(|cell| cell.display)
    }
}

#[test]
fn double_hover_runs_one_burst_until_cooldown_expires() {
    let mut harness = Harness::settled("hello world");
    let address = CellAddress::new(0, 1);

    let _ = harness.submit(Command::PointerEntered { address });
    harness.advance_to(Duration::from_millis(100));
    let _ = harness.submit(Command::PointerEntered { address });
    assert_eq!(harness.bursts_started(), 1, "second hover must be a no-op");

    harness.advance_to(Duration::from_millis(1_000));
    assert_eq!(harness.display(address), Some(Glyph::new('E')));
    assert_eq!(query::live_bursts(&harness.world), 0);

    harness.advance_to(HoverTiming::default().cooldown());
    let _ = harness.submit(Command::PointerEntered { address });
    assert_eq!(harness.bursts_started(), 2, "hover after cooldown must burst");

    harness.advance_to(HoverTiming::default().cooldown() + Duration::from_millis(500));
    assert_eq!(harness.display(address), Some(Glyph::new('E')));
    assert_eq!(
        query::grid_view(&harness.world).display_text(),
        "HELLO WORLD"
    );
}

#[test]
fn burst_perturbs_only_its_own_cell() {
    let mut harness = Harness::settled("abc");
    let address = CellAddress::new(0, 1);
    let _ = harness.submit(Command::PointerEntered { address });

    let timing = HoverTiming::default();
    let mut now = Duration::ZERO;
    while now < timing.burst_duration() {
        now += timing.frame_interval();
        harness.advance_to(now);
        assert_eq!(harness.display(CellAddress::new(0, 0)), Some(Glyph::new('A')));
        assert_eq!(harness.display(CellAddress::new(0, 2)), Some(Glyph::new('C')));
    }
    assert_eq!(harness.display(address), Some(Glyph::new('B')));
    assert!(harness.log.iter().any(|event| matches!(
        event,
        Event::BurstFinished { address: finished, .. } if *finished == address
    )));
}

#[test]
fn burst_on_pending_word_leaves_it_unset() {
    let mut harness = Harness::new();
    let _ = harness.submit(Command::Replace {
        text: "later".to_owned(),
    });
    let address = CellAddress::new(0, 0);
    let _ = harness.submit(Command::PointerEntered { address });
    harness.advance_to(HoverTiming::default().burst_duration());

    assert_eq!(harness.bursts_started(), 1, "burst still runs");
    assert_eq!(query::live_bursts(&harness.world), 0, "burst ran to completion");
    assert_eq!(query::word_phase(&harness.world, 0), Some(WordPhase::Pending));
    assert_eq!(harness.display(address), None);
}

#[test]
fn hover_outside_grid_starts_nothing() {
    let mut harness = Harness::settled("ab");
    let _ = harness.submit(Command::PointerEntered {
        address: CellAddress::new(3, 0),
    });
    assert_eq!(harness.bursts_started(), 0);
    assert_eq!(
        harness.hover.last_triggered(CellAddress::new(3, 0)),
        None,
        "missing targets must not consume a cooldown"
    );
}

#[test]
fn replacement_cancels_running_bursts() {
    let mut harness = Harness::settled("ab");
    let address = CellAddress::new(0, 0);
    let _ = harness.submit(Command::PointerEntered { address });
    harness.advance_to(Duration::from_millis(30));
    assert_eq!(query::live_bursts(&harness.world), 1);

    let _ = harness.submit(Command::Replace {
        text: "cd".to_owned(),
    });
    assert_eq!(query::live_bursts(&harness.world), 0);
    assert_eq!(query::pending_timers(&harness.world), 0);
    assert_eq!(
        harness.hover.last_triggered(address),
        Some(Duration::ZERO),
        "cooldown persists across sessions"
    );
}
