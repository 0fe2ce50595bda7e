use std::time::Instant;

use crate::error::DeviceResult;
use crate::runtime::Stream;

/// Wraps every stage launch with an error peek and, when
/// `debug_synchronous` is set, a blocking wait plus a timing line on stdout.
pub(crate) struct StageTimer<'a, S> {
    stream: &'a S,
    debug_synchronous: bool,
}

impl<'a, S: Stream> StageTimer<'a, S> {
    pub(crate) fn new(stream: &'a S, debug_synchronous: bool) -> Self {
        Self {
            stream,
            debug_synchronous,
        }
    }

    pub(crate) fn grid(&self, block_size: usize, grid_size: usize) {
        if self.debug_synchronous {
            println!("block_size {block_size}");
            println!("number of blocks {grid_size}");
        }
    }

    pub(crate) fn stage<F>(&self, name: &str, size: usize, launch: F) -> DeviceResult
    where
        F: FnOnce(&S) -> DeviceResult,
    {
        let start = self.debug_synchronous.then(Instant::now);
        launch(self.stream)?;
        self.stream.peek_at_last_error()?;

        if let Some(start) = start {
            self.stream.synchronize()?;
            let elapsed_ms = start.elapsed().as_secs_f64() * 1000.0;
            println!("{name}({size}) {elapsed_ms:.3} ms");
        }
        Ok(())
    }
}
