//! Integration tests for the simulation harness and trace replay.

use dram_controller::common::{MemoryOp, MemoryRequest, Message, SourceId};
use dram_controller::config::Config;
use dram_controller::sim::{parse_trace, EventQueue, Simulation};
use dram_controller::soc::memory::{EntryHandle, MemEvent};
use dram_controller::soc::{EventScheduler, RecordingInterconnect};

fn simulation() -> Simulation<RecordingInterconnect> {
    Simulation::new(&Config::default(), RecordingInterconnect::new()).unwrap()
}

/// Tests that scheduler delays are relative to the current cycle.
#[test]
fn test_event_queue_delay() {
    let handle = EntryHandle {
        channel: 0,
        slot: 1,
    };
    let mut events: EventQueue<MemEvent> = EventQueue::new();
    events.advance();
    events.advance();
    events.schedule(3, MemEvent::WaitInterconnect(handle));

    assert_eq!(events.next_time(), Some(5));
    assert_eq!(events.pop_due(), None);
    for _ in 0..3 {
        events.advance();
    }
    assert_eq!(events.pop_due(), Some(MemEvent::WaitInterconnect(handle)));
}

/// Tests that an idle simulation drains immediately.
#[test]
fn test_idle_simulation() {
    let mut sim = simulation();
    assert!(sim.is_idle());
    assert!(sim.run_until_idle(0));
    assert_eq!(sim.cycle(), 0);
}

/// Tests that the cycle limit stops a busy simulation.
#[test]
fn test_run_until_idle_limit() {
    let mut sim = simulation();
    sim.submit(&Message {
        request: MemoryRequest::new(0, 0, 0x100, MemoryOp::Read),
        has_data: false,
        origin: SourceId(1),
    });

    assert!(!sim.run_until_idle(10));
    assert_eq!(sim.cycle(), 10);
    assert!(sim.run_until_idle(10_000));
    assert_eq!(sim.upstream.responses.len(), 1);
    assert_eq!(sim.pending_events(), 0);
}

/// Tests replay of a short trace.
#[test]
fn test_trace_replay() {
    let records = parse_trace(
        "# mixed traffic\n\
         0 R 0x0\n\
         0 R 0x40\n\
         5 W 0x80\n\
         10 R 0x10000\n\
         12 R 0x2000\n",
    )
    .unwrap();

    let mut sim = simulation();
    let stats = sim.replay(&records, 1_000_000);

    assert_eq!(stats.reads, 4);
    assert_eq!(stats.writes, 1);
    assert_eq!(stats.responses, 4);
    assert_eq!(stats.rejected_submissions, 0);
    assert!(stats.average_latency() > 0.0);
    assert!(stats.max_latency as f64 >= stats.average_latency());
    assert_eq!(stats.cycles, sim.cycle());
    assert!(sim.is_idle());
}

/// Tests that replay waits out a full queue and resubmits in order.
#[test]
fn test_trace_replay_with_backpressure() {
    let mut config = Config::default();
    config.controller.request_queue_size = 2;

    let trace: String = (0..8)
        .map(|i| format!("0 R {:#x}\n", i * 0x2000))
        .collect();
    let records = parse_trace(&trace).unwrap();

    let mut sim = Simulation::new(&config, RecordingInterconnect::new()).unwrap();
    let stats = sim.replay(&records, 1_000_000);

    assert_eq!(stats.reads, 8);
    assert_eq!(stats.responses, 8);
    assert!(stats.rejected_submissions > 0);
    assert!(sim.is_idle());
    assert!(!sim.hub.is_full());
}
