use embedded_hal::{
    delay::DelayNs,
    digital::{Error as _, InputPin, OutputPin},
};

use crate::{
    config::Level,
    debounce::Debounce,
    error::ScanError,
    key_codes::Key,
    key_mapping::{
        Grid, KeyLayout, MatrixPosition, AUXILIARY_COLS, AUXILIARY_ROWS, PRIMARY_COLS,
        PRIMARY_ROWS,
    },
    time::{Duration, Instant},
};

/// Row and column lines of one button grid, plus the last sampled state of
/// every cell.
pub struct GridLines<O, I, const ROWS: usize, const COLS: usize> {
    rows: [O; ROWS],
    cols: [I; COLS],
    pressed: [[bool; COLS]; ROWS],
}

impl<O, I, const ROWS: usize, const COLS: usize> GridLines<O, I, ROWS, COLS>
where
    O: OutputPin,
    I: InputPin,
{
    /// Rows must already be outputs and columns inputs with the pull that
    /// matches the active level.
    pub fn new(rows: [O; ROWS], cols: [I; COLS]) -> Self {
        Self { rows, cols, pressed: [[false; COLS]; ROWS] }
    }

    pub fn release(self) -> ([O; ROWS], [I; COLS]) {
        (self.rows, self.cols)
    }

    fn park(&mut self, active: Level) -> Result<(), ScanError> {
        self.rows.iter_mut().try_for_each(|row| drive(row, active, false))
    }

    /// Walk the rows and return the first rising edge the debouncer accepts.
    ///
    /// Only called while the debounce window is open. Sampling stops at the
    /// accepted edge; the remaining cells keep their previous state until
    /// the next cycle.
    fn scan<D: DelayNs>(
        &mut self,
        grid: Grid,
        active: Level,
        settle_us: u32,
        debounce: &mut Debounce,
        now: Instant,
        delay: &mut D,
    ) -> Result<Option<MatrixPosition>, ScanError> {
        let lines = self.rows.iter_mut().zip(self.pressed.iter_mut());
        for (row, (gpio_row, matrix_row)) in lines.enumerate() {
            drive(gpio_row, active, true)?;
            delay.delay_us(settle_us);

            let mut accepted = None;
            let cells = self.cols.iter_mut().zip(matrix_row.iter_mut());
            for (col, (gpio_col, was_pressed)) in cells.enumerate() {
                let is_pressed = sample(gpio_col, active)?;
                let rising = is_pressed && !*was_pressed;
                *was_pressed = is_pressed;

                if rising && debounce.permit(now) {
                    accepted = Some(MatrixPosition::new(grid, row, col));
                    break;
                }
            }

            drive(gpio_row, active, false)?;

            if accepted.is_some() {
                return Ok(accepted);
            }
        }

        Ok(None)
    }
}

fn drive<O: OutputPin>(pin: &mut O, active: Level, on: bool) -> Result<(), ScanError> {
    let low = (active == Level::Low) == on;
    let result = if low { pin.set_low() } else { pin.set_high() };
    result.map_err(|err| ScanError::Pin(err.kind()))
}

fn sample<I: InputPin>(pin: &mut I, active: Level) -> Result<bool, ScanError> {
    let result = match active {
        Level::Low => pin.is_low(),
        Level::High => pin.is_high(),
    };
    result.map_err(|err| ScanError::Pin(err.kind()))
}

/// Scanner for the primary grid and the auxiliary (commit/erase) grid.
///
/// One call to [`KeyScan::scan`] accepts at most one new keypress. While the
/// debounce window is closed nothing is sampled, so a key that goes down
/// inside the window and stays down fires once the window reopens. The
/// auxiliary grid is only walked when the primary grid produced nothing.
pub struct KeyScan<O, I, const PR: usize, const PC: usize, const AR: usize, const AC: usize> {
    primary: GridLines<O, I, PR, PC>,
    auxiliary: GridLines<O, I, AR, AC>,
    debounce: Debounce,
    settle: Duration,
    active: Level,
}

/// Scanner sized for the recorder board.
pub type RecorderScan<O, I> =
    KeyScan<O, I, PRIMARY_ROWS, PRIMARY_COLS, AUXILIARY_ROWS, AUXILIARY_COLS>;

impl<O, I, const PR: usize, const PC: usize, const AR: usize, const AC: usize>
    KeyScan<O, I, PR, PC, AR, AC>
where
    O: OutputPin,
    I: InputPin,
{
    pub fn new(
        primary: GridLines<O, I, PR, PC>,
        auxiliary: GridLines<O, I, AR, AC>,
        debounce: Debounce,
        settle: Duration,
        active: Level,
    ) -> Self {
        Self { primary, auxiliary, debounce, settle, active }
    }

    /// Drive every row to its inactive level.
    pub fn park(&mut self) -> Result<(), ScanError> {
        self.primary.park(self.active)?;
        self.auxiliary.park(self.active)
    }

    /// Run one scan cycle and decode the accepted keypress, if any.
    pub fn scan<D: DelayNs>(
        &mut self,
        layout: &KeyLayout<PR, PC, AR, AC>,
        now: Instant,
        delay: &mut D,
    ) -> Result<Option<Key>, ScanError> {
        if !self.debounce.is_open(now) {
            return Ok(None);
        }

        let settle_us = self.settle.to_micros().min(u32::MAX as u64) as u32;
        let active = self.active;
        let debounce = &mut self.debounce;

        let mut position =
            self.primary.scan(Grid::Primary, active, settle_us, debounce, now, delay)?;
        if position.is_none() {
            position =
                self.auxiliary.scan(Grid::Auxiliary, active, settle_us, debounce, now, delay)?;
        }

        Ok(position.and_then(|position| layout.key_at(position)))
    }

    /// Whether the cell was pressed at its last sample.
    pub fn is_pressed(&self, position: MatrixPosition) -> bool {
        let MatrixPosition { grid, row, col } = position;
        let cell = match grid {
            Grid::Primary => self.primary.pressed.get(row).and_then(|r| r.get(col)),
            Grid::Auxiliary => self.auxiliary.pressed.get(row).and_then(|r| r.get(col)),
        };
        cell.copied().unwrap_or(false)
    }

    pub fn release(self) -> (GridLines<O, I, PR, PC>, GridLines<O, I, AR, AC>) {
        (self.primary, self.auxiliary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        key_codes::Letter,
        key_mapping::{recorder_layout, RecorderLayout},
        mock::{Matrix, MockDelay, MockScan},
    };

    fn at_ms(ms: u64) -> Instant {
        Instant::from_ticks(ms * 1_000)
    }

    fn setup() -> (RecorderLayout, Matrix, MockScan, MockDelay) {
        let layout = recorder_layout().unwrap();
        let matrix = Matrix::new();
        let scan = matrix.scanner(Debounce::default(), Duration::millis(1), Level::Low);
        (layout, matrix, scan, MockDelay::default())
    }

    #[test]
    fn idle_matrix_yields_nothing_and_restores_rows() {
        let (layout, matrix, mut scan, mut delay) = setup();
        assert_eq!(scan.scan(&layout, at_ms(0), &mut delay).unwrap(), None);
        assert!(matrix.all_rows_inactive());
        // One settle per row: 3 primary + 2 auxiliary.
        assert_eq!(delay.total_us(), 5_000);
    }

    #[test]
    fn decodes_a_primary_key() {
        let (layout, matrix, mut scan, mut delay) = setup();
        matrix.press(&layout, Letter::K.into());
        assert_eq!(scan.scan(&layout, at_ms(0), &mut delay).unwrap(), Some(Letter::K.into()));
        assert!(matrix.all_rows_inactive());
    }

    #[test]
    fn decodes_auxiliary_keys() {
        let (layout, matrix, mut scan, mut delay) = setup();
        matrix.press(&layout, Key::Erase);
        assert_eq!(scan.scan(&layout, at_ms(0), &mut delay).unwrap(), Some(Key::Erase));
    }

    #[test]
    fn held_key_does_not_retrigger() {
        let (layout, matrix, mut scan, mut delay) = setup();
        matrix.press(&layout, Letter::A.into());
        assert_eq!(scan.scan(&layout, at_ms(0), &mut delay).unwrap(), Some(Letter::A.into()));
        assert_eq!(scan.scan(&layout, at_ms(500), &mut delay).unwrap(), None);
        assert!(scan.is_pressed(layout.position_of(Letter::A.into()).unwrap()));

        matrix.release(&layout, Letter::A.into());
        assert_eq!(scan.scan(&layout, at_ms(600), &mut delay).unwrap(), None);
        matrix.press(&layout, Letter::A.into());
        assert_eq!(scan.scan(&layout, at_ms(700), &mut delay).unwrap(), Some(Letter::A.into()));
    }

    #[test]
    fn bounce_inside_the_window_is_swallowed() {
        let (layout, matrix, mut scan, mut delay) = setup();
        matrix.press(&layout, Letter::B.into());
        assert!(scan.scan(&layout, at_ms(0), &mut delay).unwrap().is_some());
        matrix.release(&layout, Letter::B.into());
        assert_eq!(scan.scan(&layout, at_ms(10), &mut delay).unwrap(), None);
        matrix.press(&layout, Letter::B.into());
        assert_eq!(scan.scan(&layout, at_ms(20), &mut delay).unwrap(), None);
        // Still held once the window reopens: no second event.
        assert_eq!(scan.scan(&layout, at_ms(400), &mut delay).unwrap(), None);
    }

    #[test]
    fn closed_window_samples_nothing() {
        let (layout, matrix, mut scan, mut delay) = setup();
        matrix.press(&layout, Letter::E.into());
        assert!(scan.scan(&layout, at_ms(0), &mut delay).unwrap().is_some());
        let settled = delay.total_us();

        assert_eq!(scan.scan(&layout, at_ms(100), &mut delay).unwrap(), None);
        assert_eq!(delay.total_us(), settled);
        assert!(matrix.all_rows_inactive());
    }

    #[test]
    fn second_key_held_through_the_window_fires_when_it_reopens() {
        let (layout, matrix, mut scan, mut delay) = setup();
        matrix.press(&layout, Letter::C.into());
        matrix.press(&layout, Letter::Q.into());
        assert_eq!(scan.scan(&layout, at_ms(0), &mut delay).unwrap(), Some(Letter::C.into()));

        let mut fired = Vec::new();
        for ms in (10..=400).step_by(10) {
            if let Some(key) = scan.scan(&layout, at_ms(ms), &mut delay).unwrap() {
                fired.push((ms, key));
            }
        }
        assert_eq!(fired, [(200, Key::Letter(Letter::Q))]);
    }

    #[test]
    fn key_released_inside_the_window_is_never_seen() {
        let (layout, matrix, mut scan, mut delay) = setup();
        matrix.press(&layout, Letter::A.into());
        assert!(scan.scan(&layout, at_ms(0), &mut delay).unwrap().is_some());
        matrix.press(&layout, Letter::J.into());
        assert_eq!(scan.scan(&layout, at_ms(50), &mut delay).unwrap(), None);
        matrix.release(&layout, Letter::J.into());
        assert_eq!(scan.scan(&layout, at_ms(250), &mut delay).unwrap(), None);
    }

    #[test]
    fn auxiliary_grid_waits_for_a_quiet_primary_grid() {
        let (layout, matrix, mut scan, mut delay) = setup();
        matrix.press(&layout, Letter::V.into());
        matrix.press(&layout, Key::Commit);
        assert_eq!(scan.scan(&layout, at_ms(0), &mut delay).unwrap(), Some(Letter::V.into()));
        assert!(!scan.is_pressed(layout.position_of(Key::Commit).unwrap()));
    }

    #[test]
    fn active_high_wiring_is_supported() {
        let layout = recorder_layout().unwrap();
        let matrix = Matrix::with_level(Level::High);
        let mut scan = matrix.scanner(Debounce::default(), Duration::micros(10), Level::High);
        let mut delay = MockDelay::default();

        scan.park().unwrap();
        assert!(matrix.all_rows_inactive());
        matrix.press(&layout, Letter::H.into());
        assert_eq!(scan.scan(&layout, at_ms(0), &mut delay).unwrap(), Some(Letter::H.into()));
        assert!(matrix.all_rows_inactive());
    }

    #[test]
    fn pin_failure_is_reported() {
        let (layout, matrix, mut scan, mut delay) = setup();
        matrix.fail_pins();
        assert!(matches!(scan.scan(&layout, at_ms(0), &mut delay), Err(ScanError::Pin(_))));
    }
}
