//! In-memory stand-ins for the board, used by the unit tests.
//!
//! Every fake hands out a cheap clone-able handle so a test can keep
//! inspecting it after the device has been moved into a `Controller`.

use std::{
    cell::{Cell, RefCell},
    rc::Rc,
    string::{String, ToString},
    vec::Vec,
};

use embedded_hal::{
    delay::DelayNs,
    digital::{self, ErrorKind, ErrorType, InputPin, OutputPin},
};
use smart_leds_trait::RGB8;

use crate::{
    config::Level,
    debounce::Debounce,
    devices::{LedStrip, SessionLog, ToneSource},
    key_codes::Key,
    key_mapping::{
        Grid, LedIndex, MatrixPosition, RecorderLayout, AUXILIARY_COLS, AUXILIARY_ROWS, NUM_PIXELS,
        PRIMARY_COLS, PRIMARY_ROWS,
    },
    key_scan::{GridLines, KeyScan, RecorderScan},
    session::SessionRecord,
    time::{Duration, Instant, Monotonic, Timestamp, WallClock},
};

pub type MockScan = RecorderScan<MockRow, MockCol>;
pub type MockGrids = (
    GridLines<MockRow, MockCol, PRIMARY_ROWS, PRIMARY_COLS>,
    GridLines<MockRow, MockCol, AUXILIARY_ROWS, AUXILIARY_COLS>,
);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MockError;

impl digital::Error for MockError {
    fn kind(&self) -> ErrorKind {
        ErrorKind::Other
    }
}

struct Wiring {
    active: Level,
    /// `true` while a row is driven to the active level
    primary_rows: [bool; PRIMARY_ROWS],
    auxiliary_rows: [bool; AUXILIARY_ROWS],
    pressed: Vec<MatrixPosition>,
    failing: bool,
}

impl Wiring {
    fn rows(&mut self, grid: Grid) -> &mut [bool] {
        match grid {
            Grid::Primary => &mut self.primary_rows,
            Grid::Auxiliary => &mut self.auxiliary_rows,
        }
    }

    fn is_active(&self, grid: Grid, row: usize) -> bool {
        match grid {
            Grid::Primary => self.primary_rows[row],
            Grid::Auxiliary => self.auxiliary_rows[row],
        }
    }
}

/// A simulated button matrix: closing a switch connects its row to its
/// column, so the column follows the row while that row is active.
#[derive(Clone)]
pub struct Matrix {
    wiring: Rc<RefCell<Wiring>>,
}

impl Matrix {
    pub fn new() -> Self {
        Self::with_level(Level::Low)
    }

    pub fn with_level(active: Level) -> Self {
        let wiring = Wiring {
            active,
            primary_rows: [false; PRIMARY_ROWS],
            auxiliary_rows: [false; AUXILIARY_ROWS],
            pressed: Vec::new(),
            failing: false,
        };
        Self { wiring: Rc::new(RefCell::new(wiring)) }
    }

    fn row(&self, grid: Grid, row: usize) -> MockRow {
        MockRow { wiring: self.wiring.clone(), grid, row }
    }

    fn col(&self, grid: Grid, col: usize) -> MockCol {
        MockCol { wiring: self.wiring.clone(), grid, col }
    }

    /// Row and column lines of both grids, wired to this matrix.
    pub fn grids(&self) -> MockGrids {
        let primary = GridLines::new(
            core::array::from_fn(|row| self.row(Grid::Primary, row)),
            core::array::from_fn(|col| self.col(Grid::Primary, col)),
        );
        let auxiliary = GridLines::new(
            core::array::from_fn(|row| self.row(Grid::Auxiliary, row)),
            core::array::from_fn(|col| self.col(Grid::Auxiliary, col)),
        );
        (primary, auxiliary)
    }

    pub fn scanner(&self, debounce: Debounce, settle: Duration, active: Level) -> MockScan {
        let (primary, auxiliary) = self.grids();
        KeyScan::new(primary, auxiliary, debounce, settle, active)
    }

    pub fn press(&self, layout: &RecorderLayout, key: Key) {
        let position = layout.position_of(key).expect("key is wired");
        let mut wiring = self.wiring.borrow_mut();
        if !wiring.pressed.contains(&position) {
            wiring.pressed.push(position);
        }
    }

    pub fn release(&self, layout: &RecorderLayout, key: Key) {
        let position = layout.position_of(key).expect("key is wired");
        self.wiring.borrow_mut().pressed.retain(|p| *p != position);
    }

    pub fn release_all(&self) {
        self.wiring.borrow_mut().pressed.clear();
    }

    pub fn all_rows_inactive(&self) -> bool {
        let wiring = self.wiring.borrow();
        !wiring.primary_rows.iter().chain(wiring.auxiliary_rows.iter()).any(|active| *active)
    }

    pub fn fail_pins(&self) {
        self.wiring.borrow_mut().failing = true;
    }
}

pub struct MockRow {
    wiring: Rc<RefCell<Wiring>>,
    grid: Grid,
    row: usize,
}

impl MockRow {
    fn set(&mut self, low: bool) -> Result<(), MockError> {
        let mut wiring = self.wiring.borrow_mut();
        if wiring.failing {
            return Err(MockError);
        }
        let active = (wiring.active == Level::Low) == low;
        wiring.rows(self.grid)[self.row] = active;
        Ok(())
    }
}

impl ErrorType for MockRow {
    type Error = MockError;
}

impl OutputPin for MockRow {
    fn set_low(&mut self) -> Result<(), Self::Error> {
        self.set(true)
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        self.set(false)
    }
}

pub struct MockCol {
    wiring: Rc<RefCell<Wiring>>,
    grid: Grid,
    col: usize,
}

impl MockCol {
    fn level_is_low(&self) -> Result<bool, MockError> {
        let wiring = self.wiring.borrow();
        if wiring.failing {
            return Err(MockError);
        }
        // A closed switch pulls the column to the level of its row; an open
        // column idles at the inactive level.
        let connected = wiring
            .pressed
            .iter()
            .any(|p| p.grid == self.grid && p.col == self.col && wiring.is_active(p.grid, p.row));
        Ok((wiring.active == Level::Low) == connected)
    }
}

impl ErrorType for MockCol {
    type Error = MockError;
}

impl InputPin for MockCol {
    fn is_high(&mut self) -> Result<bool, Self::Error> {
        self.level_is_low().map(|low| !low)
    }

    fn is_low(&mut self) -> Result<bool, Self::Error> {
        self.level_is_low()
    }
}

#[derive(Default)]
pub struct MockDelay {
    total_ns: u64,
}

impl MockDelay {
    pub fn total_us(&self) -> u64 {
        self.total_ns / 1_000
    }

    pub fn total_ms(&self) -> u64 {
        self.total_ns / 1_000_000
    }
}

impl DelayNs for MockDelay {
    fn delay_ns(&mut self, ns: u32) {
        self.total_ns += ns as u64;
    }
}

#[derive(Default)]
struct StripState {
    staged: Vec<RGB8>,
    frames: Vec<Vec<RGB8>>,
    failing: bool,
}

/// LED strip that records every shown frame.
#[derive(Clone)]
pub struct MockStrip {
    state: Rc<RefCell<StripState>>,
}

impl MockStrip {
    pub fn new() -> Self {
        let staged = std::vec![RGB8::default(); NUM_PIXELS];
        let state = StripState { staged, ..Default::default() };
        Self { state: Rc::new(RefCell::new(state)) }
    }

    pub fn shows(&self) -> usize {
        self.state.borrow().frames.len()
    }

    /// The last frame flushed to the LEDs.
    pub fn shown(&self) -> Vec<RGB8> {
        self.state.borrow().frames.last().cloned().unwrap_or_default()
    }

    pub fn pixel(&self, index: LedIndex) -> RGB8 {
        self.shown()[index.get()]
    }

    pub fn fail(&self, failing: bool) {
        self.state.borrow_mut().failing = failing;
    }
}

impl LedStrip for MockStrip {
    type Error = MockError;

    fn set_pixel(&mut self, index: LedIndex, color: RGB8) {
        self.state.borrow_mut().staged[index.get()] = color;
    }

    fn show(&mut self) -> Result<(), Self::Error> {
        let mut state = self.state.borrow_mut();
        if state.failing {
            return Err(MockError);
        }
        let frame = state.staged.clone();
        state.frames.push(frame);
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ToneEvent {
    Frequency(f32),
    Duty(u8),
    Stop,
}

#[derive(Default)]
struct ToneState {
    events: Vec<ToneEvent>,
    fail_frequency: bool,
    fail_stop: bool,
}

/// Tone source that records every command.
#[derive(Clone, Default)]
pub struct MockTone {
    state: Rc<RefCell<ToneState>>,
}

impl MockTone {
    pub fn events(&self) -> Vec<ToneEvent> {
        self.state.borrow().events.clone()
    }

    /// Frequencies commanded so far, in order.
    pub fn frequencies(&self) -> Vec<f32> {
        self.events()
            .into_iter()
            .filter_map(|event| match event {
                ToneEvent::Frequency(hz) => Some(hz),
                _ => None,
            })
            .collect()
    }

    pub fn clear(&self) {
        self.state.borrow_mut().events.clear();
    }

    pub fn fail_frequency(&self, failing: bool) {
        self.state.borrow_mut().fail_frequency = failing;
    }

    pub fn fail_stop(&self, failing: bool) {
        self.state.borrow_mut().fail_stop = failing;
    }
}

impl ToneSource for MockTone {
    type Error = MockError;

    fn set_frequency(&mut self, hz: f32) -> Result<(), Self::Error> {
        let mut state = self.state.borrow_mut();
        state.events.push(ToneEvent::Frequency(hz));
        if state.fail_frequency {
            return Err(MockError);
        }
        Ok(())
    }

    fn set_duty(&mut self, percent: u8) -> Result<(), Self::Error> {
        self.state.borrow_mut().events.push(ToneEvent::Duty(percent));
        Ok(())
    }

    fn stop(&mut self) -> Result<(), Self::Error> {
        let mut state = self.state.borrow_mut();
        state.events.push(ToneEvent::Stop);
        if state.fail_stop {
            return Err(MockError);
        }
        Ok(())
    }
}

#[derive(Default)]
struct LogState {
    lines: Vec<String>,
    flushes: usize,
    failing: bool,
}

/// Session log kept in memory, one entry per appended line.
#[derive(Clone, Default)]
pub struct MockLog {
    state: Rc<RefCell<LogState>>,
}

impl MockLog {
    pub fn lines(&self) -> Vec<String> {
        self.state.borrow().lines.clone()
    }

    pub fn flushes(&self) -> usize {
        self.state.borrow().flushes
    }

    pub fn fail(&self, failing: bool) {
        self.state.borrow_mut().failing = failing;
    }
}

impl SessionLog for MockLog {
    type Error = MockError;

    fn append(&mut self, record: &SessionRecord) -> Result<(), Self::Error> {
        let mut state = self.state.borrow_mut();
        if state.failing {
            return Err(MockError);
        }
        state.lines.push(record.to_string());
        Ok(())
    }

    fn flush(&mut self) -> Result<(), Self::Error> {
        self.state.borrow_mut().flushes += 1;
        Ok(())
    }
}

/// Wall clock frozen at one instant, or broken when `None`.
#[derive(Clone)]
pub struct FixedClock {
    timestamp: Rc<Cell<Option<Timestamp>>>,
}

impl FixedClock {
    pub fn at(timestamp: Timestamp) -> Self {
        Self { timestamp: Rc::new(Cell::new(Some(timestamp))) }
    }

    pub fn broken() -> Self {
        Self { timestamp: Rc::new(Cell::new(None)) }
    }

    pub fn set(&self, timestamp: Timestamp) {
        self.timestamp.set(Some(timestamp));
    }
}

impl WallClock for FixedClock {
    type Error = MockError;

    fn timestamp(&mut self) -> Result<Timestamp, Self::Error> {
        self.timestamp.get().ok_or(MockError)
    }
}

/// Monotonic clock that moves forward a fixed step every time it is read.
pub struct SteppingClock {
    now_us: Cell<u64>,
    step_us: u64,
}

impl SteppingClock {
    pub fn new(step: Duration) -> Self {
        Self { now_us: Cell::new(0), step_us: step.ticks() }
    }
}

impl Monotonic for SteppingClock {
    fn now(&self) -> Instant {
        let now = self.now_us.get();
        self.now_us.set(now + self.step_us);
        Instant::from_ticks(now)
    }
}
