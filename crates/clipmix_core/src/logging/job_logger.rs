//! Log of a single mix job.
//!
//! Lines go to `<logs>/<job>.log` and, when one is set, to the caller's
//! callback. ffmpeg stderr is held in a bounded tail and only written out
//! when a stage fails (or always, with `compact = false`).

use std::collections::VecDeque;
use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use chrono::Local;
use parking_lot::Mutex;

use super::types::{LogCallback, LogConfig, LogLevel, Marker};
use crate::models::OutputPlan;

struct Sink {
    file: Option<BufWriter<File>>,
    tail: VecDeque<String>,
}

pub struct JobLogger {
    job_name: String,
    log_path: PathBuf,
    config: LogConfig,
    callback: Option<LogCallback>,
    sink: Mutex<Sink>,
}

impl JobLogger {
    /// Open `<log_dir>/<job_name>.log`, creating the folder when missing.
    pub fn new(
        job_name: impl Into<String>,
        log_dir: impl AsRef<Path>,
        config: LogConfig,
        callback: Option<LogCallback>,
    ) -> io::Result<Self> {
        let job_name = job_name.into();
        fs::create_dir_all(log_dir.as_ref())?;
        let log_path = log_dir
            .as_ref()
            .join(format!("{}.log", file_safe(&job_name)));
        let file = BufWriter::new(File::create(&log_path)?);

        Ok(Self {
            job_name,
            log_path,
            callback,
            sink: Mutex::new(Sink {
                file: Some(file),
                tail: VecDeque::with_capacity(config.error_tail),
            }),
            config,
        })
    }

    pub fn job_name(&self) -> &str {
        &self.job_name
    }

    pub fn log_path(&self) -> &Path {
        &self.log_path
    }

    pub fn info(&self, message: &str) {
        self.emit(LogLevel::Info, message);
    }

    pub fn debug(&self, message: &str) {
        self.emit(LogLevel::Debug, message);
    }

    pub fn warn(&self, message: &str) {
        self.emit(LogLevel::Warn, &Marker::Warning.apply(message));
    }

    pub fn error(&self, message: &str) {
        self.emit(LogLevel::Error, &Marker::Error.apply(message));
    }

    pub fn success(&self, message: &str) {
        self.emit(LogLevel::Info, &Marker::Success.apply(message));
    }

    /// An external command about to run.
    pub fn command(&self, command_line: &str) {
        self.emit(LogLevel::Info, &Marker::Command.apply(command_line));
    }

    /// Start of an output iteration.
    pub fn phase(&self, title: &str) {
        self.emit(LogLevel::Info, &Marker::Output.apply(title));
    }

    /// Start of a stage within an output.
    pub fn stage(&self, title: &str) {
        self.emit(LogLevel::Info, &Marker::Stage.apply(title));
    }

    /// One line of tool stderr.
    pub fn output_line(&self, line: &str) {
        let mut sink = self.sink.lock();
        let cap = self.config.error_tail;
        if cap > 0 {
            while sink.tail.len() >= cap {
                sink.tail.pop_front();
            }
            sink.tail.push_back(line.to_string());
        }
        if !self.config.compact {
            self.write_line(&mut sink, line);
        }
    }

    /// Write the held tool output under a `[<tool>/tail]` header.
    pub fn show_tail(&self, tool: &str) {
        let mut sink = self.sink.lock();
        if sink.tail.is_empty() {
            return;
        }
        let lines: Vec<String> = sink.tail.iter().cloned().collect();
        self.write_line(&mut sink, &format!("[{}/tail]", tool));
        for line in &lines {
            self.write_line(&mut sink, line);
        }
    }

    pub fn clear_tail(&self) {
        self.sink.lock().tail.clear();
    }

    pub fn tail_lines(&self) -> Vec<String> {
        self.sink.lock().tail.iter().cloned().collect()
    }

    /// Dump an output's stage list as JSON at debug level.
    pub fn log_plan_json(&self, plan: &OutputPlan) {
        if !self.enabled(LogLevel::Debug) {
            return;
        }
        match serde_json::to_string_pretty(plan) {
            Ok(json) => {
                self.debug(&format!("plan for output {}:", plan.iteration));
                self.debug(&json);
            }
            Err(e) => tracing::debug!("Plan for output {} not serializable: {}", plan.iteration, e),
        }
    }

    pub fn flush(&self) {
        if let Some(file) = self.sink.lock().file.as_mut() {
            let _ = file.flush();
        }
    }

    /// Flush and release the file. Later lines reach the callback only.
    pub fn close(&self) {
        let mut sink = self.sink.lock();
        if let Some(mut file) = sink.file.take() {
            let _ = file.flush();
        }
    }

    fn enabled(&self, level: LogLevel) -> bool {
        level >= self.config.level
    }

    fn emit(&self, level: LogLevel, message: &str) {
        if self.enabled(level) {
            let mut sink = self.sink.lock();
            self.write_line(&mut sink, message);
        }
    }

    fn write_line(&self, sink: &mut Sink, message: &str) {
        let line = if self.config.show_timestamps {
            format!("[{}] {}", Local::now().format("%H:%M:%S"), message)
        } else {
            message.to_string()
        };
        if let Some(file) = sink.file.as_mut() {
            let _ = writeln!(file, "{}", line);
        }
        if let Some(callback) = &self.callback {
            callback(&line);
        }
    }
}

impl Drop for JobLogger {
    fn drop(&mut self) {
        self.close();
    }
}

fn file_safe(name: &str) -> String {
    name.chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c => c,
        })
        .collect()
}
