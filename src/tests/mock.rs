use crate::channel::{ByteChannel, ResetLine as ResetLineTrait};
use fugit::{TimerDurationU32, TimerInstantU32};
use fugit_timer::Timer as FugitTimer;
use mockall::mock;
use std::collections::VecDeque;
use std::string::String;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::vec::Vec;

/// Write error of [MockChannel]
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct MockChannelError;

/// Mocked command and the reply which gets queued once the command was written
pub struct MockedCommand {
    /// Expected raw bytes written by the adapter
    command: Vec<u8>,

    /// Bytes the module responds with
    reply: Vec<u8>,
}

impl MockedCommand {
    pub fn new(command: &[u8], reply: &[u8]) -> Self {
        Self {
            command: command.to_vec(),
            reply: reply.to_vec(),
        }
    }
}

/// Scripted serial link to the module
pub struct MockChannel {
    /// Bytes ready to be read
    rx: VecDeque<u8>,

    /// Cycled batch sizes reported by available(). Empty => all pending bytes are reported.
    chunk_sizes: Vec<usize>,

    /// Call count of available()
    available_calls: usize,

    /// Reports no bytes on the next N calls of available()
    available_skip_count: usize,

    /// Bytes written since the last matched command
    pending: Vec<u8>,

    /// All written bytes
    written: Vec<u8>,

    /// Expected commands in the order they need to be written
    commands: VecDeque<MockedCommand>,

    /// If true, all writes fail
    write_error: bool,
}

impl ByteChannel for MockChannel {
    type Error = MockChannelError;

    fn read(&mut self) -> nb::Result<u8, Self::Error> {
        self.rx.pop_front().ok_or(nb::Error::WouldBlock)
    }

    fn available(&mut self) -> usize {
        if self.available_skip_count > 0 {
            self.available_skip_count -= 1;
            return 0;
        }

        let call = self.available_calls;
        self.available_calls += 1;

        if self.chunk_sizes.is_empty() {
            return self.rx.len();
        }

        let chunk_size = self.chunk_sizes[call % self.chunk_sizes.len()];
        chunk_size.min(self.rx.len())
    }

    fn write_all(&mut self, data: &[u8]) -> Result<(), Self::Error> {
        if self.write_error {
            return Err(MockChannelError);
        }

        self.written.extend_from_slice(data);

        let expected = match self.commands.front() {
            Some(expected) => expected,
            None => return Ok(()),
        };

        self.pending.extend_from_slice(data);
        if self.pending == expected.command {
            let expected = self.commands.pop_front().unwrap();
            self.rx.extend(expected.reply);
            self.pending.clear();
        } else if !expected.command.starts_with(&self.pending) {
            panic!(
                "Unexpected command {:?}, expected {:?}",
                String::from_utf8_lossy(&self.pending),
                String::from_utf8_lossy(&expected.command)
            );
        }

        Ok(())
    }
}

impl MockChannel {
    pub fn new() -> Self {
        Self {
            rx: VecDeque::new(),
            chunk_sizes: vec![],
            available_calls: 0,
            available_skip_count: 0,
            pending: vec![],
            written: vec![],
            commands: VecDeque::new(),
            write_error: false,
        }
    }

    /// Adds an expected command and its reply
    pub fn add_response(&mut self, command: MockedCommand) {
        self.commands.push_back(command);
    }

    /// Adds bytes which are pending before any command is written
    pub fn add_input(&mut self, data: &[u8]) {
        self.rx.extend(data.iter().copied());
    }

    /// Limits the byte counts reported by available(). Sizes are used in a cycle.
    pub fn set_chunk_sizes(&mut self, chunk_sizes: Vec<usize>) {
        self.chunk_sizes = chunk_sizes;
    }

    /// Reports no bytes on the next N calls of available(), e.g. to let input pass a drain
    pub fn skip_available(&mut self, count: usize) {
        self.available_skip_count = count;
    }

    /// Simulates a failing transport
    pub fn fail_writes(&mut self) {
        self.write_error = true;
    }

    /// Returns the count of bytes not read yet
    pub fn pending_input(&self) -> usize {
        self.rx.len()
    }

    /// Returns all written bytes as string
    pub fn get_written_as_string(&self) -> String {
        String::from_utf8(self.written.clone()).unwrap()
    }

    /// Asserts that all expected commands have been written
    pub fn assert_all_cmds_sent(&self) {
        assert!(
            self.commands.is_empty(),
            "{} expected commands were not sent",
            self.commands.len()
        );
    }
}

mock! {
    pub Timer{}

    impl FugitTimer<1_000_000> for Timer {
        type Error = u32;

        fn now(&mut self) -> TimerInstantU32<1000000>;
        fn start(&mut self, duration: TimerDurationU32<1000000>) -> Result<(), u32>;
        fn cancel(&mut self) -> Result<(), u32>;
        fn wait(&mut self) -> nb::Result<(), u32>;
    }
}

/// Simulated time in microseconds, shared with the timer mock
#[derive(Clone, Default)]
pub struct Clock {
    ticks: Arc<AtomicU32>,
}

impl Clock {
    /// Returns the simulated time in ms
    pub fn elapsed_ms(&self) -> u32 {
        self.ticks.load(Ordering::SeqCst) / 1_000
    }
}

impl MockTimer {
    /// Timer advancing by one millisecond on each call to now()
    pub fn ticking() -> (Self, Clock) {
        Self::ticking_by(1)
    }

    /// Timer advancing by the given milliseconds on each call to now()
    pub fn ticking_by(step_ms: u32) -> (Self, Clock) {
        let clock = Clock::default();
        let ticks = clock.ticks.clone();

        let mut timer = MockTimer::new();
        timer.expect_now().returning(move || {
            let now = ticks.fetch_add(step_ms * 1_000, Ordering::SeqCst) + step_ms * 1_000;
            TimerInstantU32::from_ticks(now)
        });

        (timer, clock)
    }
}

mock! {
    pub ResetLine{}

    impl ResetLineTrait for ResetLine {
        fn set_low(&mut self);
        fn set_as_output(&mut self);
        fn set_as_input(&mut self);
    }
}
