use std::sync::mpsc::{self, Receiver, RecvError, Sender};
use std::thread;
use std::time::Duration;

use crossterm::event::{self, Event as CtEvent, KeyEvent};

use crate::question::Question;
use crate::source::{QuestionSource, SourceError};

/// Once per second: the session clock contract.
pub const TICK_RATE_MS: u64 = 1000;

/// Unified event type consumed by the app loop. Keyboard and resize come
/// from the terminal, ticks from the clock thread, and `Questions` is the
/// single fetch result delivered by the worker thread.
#[derive(Debug)]
pub enum ExamEvent {
    Key(KeyEvent),
    Resize,
    Tick,
    Questions(Result<Vec<Question>, SourceError>),
}

/// Source of app events (keyboard, ticks, fetch results).
pub trait ExamEventSource {
    /// Block until the next event. `Err` means every producer hung up.
    fn recv(&self) -> Result<ExamEvent, RecvError>;

    /// A handle for feeding events from worker threads.
    fn sender(&self) -> Sender<ExamEvent>;
}

/// Production event source: a keyboard reader thread and a once-per-second
/// tick thread, multiplexed onto one channel. The tick thread runs for the
/// process lifetime; tick handling is gated on session stage, so no
/// per-session timer needs starting or stopping.
pub struct TerminalEventSource {
    tx: Sender<ExamEvent>,
    rx: Receiver<ExamEvent>,
}

impl TerminalEventSource {
    pub fn new() -> Self {
        let (tx, rx) = mpsc::channel();

        let tick_tx = tx.clone();
        thread::spawn(move || loop {
            if tick_tx.send(ExamEvent::Tick).is_err() {
                break;
            }
            thread::sleep(Duration::from_millis(TICK_RATE_MS));
        });

        let key_tx = tx.clone();
        thread::spawn(move || loop {
            match event::read() {
                Ok(CtEvent::Key(key)) => {
                    if key_tx.send(ExamEvent::Key(key)).is_err() {
                        break;
                    }
                }
                Ok(CtEvent::Resize(_, _)) => {
                    if key_tx.send(ExamEvent::Resize).is_err() {
                        break;
                    }
                }
                Ok(_) => {}
                Err(_) => break,
            }
        });

        Self { tx, rx }
    }
}

impl Default for TerminalEventSource {
    fn default() -> Self {
        Self::new()
    }
}

impl ExamEventSource for TerminalEventSource {
    fn recv(&self) -> Result<ExamEvent, RecvError> {
        self.rx.recv()
    }

    fn sender(&self) -> Sender<ExamEvent> {
        self.tx.clone()
    }
}

/// Test event source fed entirely by hand.
pub struct TestEventSource {
    tx: Sender<ExamEvent>,
    rx: Receiver<ExamEvent>,
}

impl TestEventSource {
    pub fn new() -> Self {
        let (tx, rx) = mpsc::channel();
        Self { tx, rx }
    }
}

impl Default for TestEventSource {
    fn default() -> Self {
        Self::new()
    }
}

impl ExamEventSource for TestEventSource {
    fn recv(&self) -> Result<ExamEvent, RecvError> {
        self.rx.recv()
    }

    fn sender(&self) -> Sender<ExamEvent> {
        self.tx.clone()
    }
}

/// Issue the session's single outbound request on a worker thread,
/// delivering the outcome through the same channel as key and tick
/// events. Not cancellable once issued.
pub fn spawn_fetch(tx: Sender<ExamEvent>, source: QuestionSource, count: usize) {
    thread::spawn(move || {
        let result = source.fetch(count);
        let _ = tx.send(ExamEvent::Questions(result));
    });
}
