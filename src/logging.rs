use std::fs::{File, OpenOptions};
use std::path::Path;
use std::sync::{Arc, Mutex};

use anyhow::Result;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;
use tracing_subscriber::fmt::MakeWriter;

/// Writes every formatted event to stdout and, when a log file is
/// configured, appends the same bytes to it.
#[derive(Clone)]
pub(crate) struct TeeMakeWriter {
    pub file: Option<Arc<Mutex<File>>>,
}

impl<'a> MakeWriter<'a> for TeeMakeWriter {
    type Writer = TeeWriter;

    fn make_writer(&'a self) -> Self::Writer {
        TeeWriter {
            file: self.file.clone(),
        }
    }
}

pub(crate) struct TeeWriter {
    file: Option<Arc<Mutex<File>>>,
}

impl std::io::Write for TeeWriter {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        if let Some(file) = &self.file
            && let Ok(mut file) = file.lock()
        {
            let _ = file.write_all(buf);
        }
        std::io::stdout().write_all(buf)?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        if let Some(file) = &self.file
            && let Ok(mut file) = file.lock()
        {
            let _ = file.flush();
        }
        std::io::stdout().flush()
    }
}

/// Install the global structured logger. Safe to call more than once; only
/// the first call wins.
pub fn init(level: Level, log_file: Option<&Path>) -> Result<()> {
    let file = match log_file {
        Some(path) => {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            let file = OpenOptions::new().create(true).append(true).open(path)?;
            Some(Arc::new(Mutex::new(file)))
        }
        None => None,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_ansi(file.is_none())
        .with_writer(TeeMakeWriter { file })
        .finish();
    tracing::subscriber::set_global_default(subscriber).ok();
    Ok(())
}
