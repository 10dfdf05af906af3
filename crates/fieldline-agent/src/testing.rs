//! Helpers shared by the agent's unit tests.

use std::{
  io::{self, Write},
  sync::{Arc, Mutex},
  time::Duration,
};

use crate::platform::Console;

/// An in-memory console sink.
#[derive(Clone, Default)]
pub struct Transcript(Arc<Mutex<Vec<u8>>>);

impl Transcript {
  pub fn console(&self) -> Console { Console::new(self.clone()) }

  pub fn lines(&self) -> Vec<String> {
    String::from_utf8_lossy(&self.0.lock().unwrap())
      .lines()
      .map(str::to_owned)
      .collect()
  }

  pub fn contains(&self, needle: &str) -> bool {
    self.lines().iter().any(|line| line.contains(needle))
  }
}

impl Write for Transcript {
  fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
    self.0.lock().unwrap().extend_from_slice(buf);
    Ok(buf.len())
  }

  fn flush(&mut self) -> io::Result<()> { Ok(()) }
}

/// Poll `condition` for up to two seconds.
pub async fn eventually(condition: impl Fn() -> bool) -> bool {
  for _ in 0..200 {
    if condition() {
      return true;
    }
    tokio::time::sleep(Duration::from_millis(10)).await;
  }
  condition()
}
