use std::io::{self, Read};

/// Default reporting interval: 8 MiB
pub const DEFAULT_INTERVAL: u64 = 8 * 1024 * 1024;

/// A reader wrapper that reports how many bytes have been read each time
/// the running total crosses another multiple of `interval`.
///
/// If a single read crosses several multiples, the callback fires once per
/// crossed multiple.
pub struct ProgressReader<R, F>
where
    R: Read,
    F: FnMut(u64),
{
    inner: R,
    on_progress: F,
    interval: u64,
    total_read: u64,
    next_report: u64,
}

impl<R, F> ProgressReader<R, F>
where
    R: Read,
    F: FnMut(u64),
{
    /// Report every `interval` bytes; 0 selects [`DEFAULT_INTERVAL`].
    pub fn new(inner: R, interval: u64, on_progress: F) -> Self {
        let interval = if interval == 0 { DEFAULT_INTERVAL } else { interval };
        Self {
            inner,
            on_progress,
            interval,
            total_read: 0,
            next_report: interval,
        }
    }

    pub fn total_read(&self) -> u64 {
        self.total_read
    }

    fn report(&mut self) {
        while self.total_read >= self.next_report {
            (self.on_progress)(self.total_read);
            match self.next_report.checked_add(self.interval) {
                Some(next) => self.next_report = next,
                None => break,
            }
        }
    }
}

impl<R, F> Read for ProgressReader<R, F>
where
    R: Read,
    F: FnMut(u64),
{
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = self.inner.read(buf)?;
        if n > 0 {
            self.total_read = self.total_read.saturating_add(n as u64);
            self.report();
        }
        Ok(n)
    }
}
