//! Route `tracing` output to the browser console

use std::io;

use tracing::{Level, Metadata};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::MakeWriter;

/// Buffers one formatted event and logs it on drop
pub struct ConsoleWriter {
    level: Level,
    buffer: Vec<u8>,
}

impl io::Write for ConsoleWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.buffer.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Drop for ConsoleWriter {
    fn drop(&mut self) {
        let text = String::from_utf8_lossy(&self.buffer);
        let line = text.trim_end();
        if line.is_empty() {
            return;
        }
        let value = line.into();
        match self.level {
            Level::ERROR => web_sys::console::error_1(&value),
            Level::WARN => web_sys::console::warn_1(&value),
            Level::INFO => web_sys::console::info_1(&value),
            _ => web_sys::console::debug_1(&value),
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ConsoleMakeWriter;

impl<'a> MakeWriter<'a> for ConsoleMakeWriter {
    type Writer = ConsoleWriter;

    fn make_writer(&'a self) -> Self::Writer {
        ConsoleWriter {
            level: Level::INFO,
            buffer: Vec::new(),
        }
    }

    fn make_writer_for(&'a self, meta: &Metadata<'_>) -> Self::Writer {
        ConsoleWriter {
            level: *meta.level(),
            buffer: Vec::new(),
        }
    }
}

/// Install the console subscriber. `directives` uses `EnvFilter` syntax,
/// e.g. `"info,holoavatar_hologram=debug"`.
pub fn init_logging(directives: &str) {
    let filter = EnvFilter::try_new(directives).unwrap_or_else(|_| EnvFilter::new("info"));
    let installed = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(ConsoleMakeWriter)
        .with_ansi(false)
        .without_time()
        .with_target(true)
        .try_init();
    if installed.is_err() {
        web_sys::console::warn_1(&"tracing subscriber already installed".into());
    }
}
