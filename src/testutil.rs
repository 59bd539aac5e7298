//! Helpers for driving a whole shell session from tests.

use std::io::{self, Write};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Mutex};

use crate::console::Notifier;

/// An in-memory writer whose contents stay readable after it has been
/// handed to the shell.
#[derive(Clone, Default)]
pub struct SharedBuf(Arc<Mutex<Vec<u8>>>);

impl SharedBuf {
    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
    }
}

impl Write for SharedBuf {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Forwards job monitor reports to a channel.
pub struct TestNotifier(Sender<String>);

impl TestNotifier {
    pub fn new() -> (Self, Receiver<String>) {
        let (tx, rx) = mpsc::channel();
        (TestNotifier(tx), rx)
    }
}

impl Notifier for TestNotifier {
    fn notify(&mut self, message: &str) {
        let _ = self.0.send(message.to_string());
    }
}
