//! Scripted in-memory serial link standing in for a RYLR998 module.
//!
//! Replies are keyed on command prefixes: when a written command line starts with a
//! registered prefix, the reply lines are queued as inbound bytes. Lines can also be
//! injected directly to simulate unsolicited `+RCV` frames. Commands with no matching
//! prefix get no reply, which the driver sees as a timeout.
use super::SerialLink;
use std::collections::VecDeque;
use std::io;

#[derive(Debug, Default)]
pub struct MockLink {
    inbound: VecDeque<u8>,
    replies: Vec<(String, Vec<String>)>,
    written: Vec<String>,
    raw_written: Vec<u8>,
    pending_write: String,
    fail_writes: bool,
}

impl MockLink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer any command starting with `prefix` with one line.
    pub fn reply_to(&mut self, prefix: &str, line: &str) -> &mut Self {
        self.reply_lines(prefix, &[line])
    }

    /// Answer any command starting with `prefix` with several lines, in order.
    /// The most recently registered matching prefix wins.
    pub fn reply_lines(&mut self, prefix: &str, lines: &[&str]) -> &mut Self {
        self.replies.push((
            prefix.to_string(),
            lines.iter().map(|l| l.to_string()).collect(),
        ));
        self
    }

    /// Queue a `\r\n` terminated line as if the module had sent it.
    pub fn inject_line(&mut self, line: &str) -> &mut Self {
        self.inject_bytes(line.as_bytes());
        self.inject_bytes(b"\r\n")
    }

    pub fn inject_bytes(&mut self, data: &[u8]) -> &mut Self {
        self.inbound.extend(data.iter().copied());
        self
    }

    /// Make every subsequent write fail with a broken pipe.
    pub fn fail_writes(&mut self, fail: bool) -> &mut Self {
        self.fail_writes = fail;
        self
    }

    /// Complete command lines written so far, without terminators.
    pub fn written(&self) -> &[String] {
        &self.written
    }

    pub fn raw_written(&self) -> &[u8] {
        &self.raw_written
    }

    /// Written commands starting with `prefix`.
    pub fn written_matching(&self, prefix: &str) -> Vec<&str> {
        self.written
            .iter()
            .filter(|w| w.starts_with(prefix))
            .map(String::as_str)
            .collect()
    }

    fn answer(&mut self, command: &str) {
        let reply = self
            .replies
            .iter()
            .rev()
            .find(|(prefix, _)| command.starts_with(prefix.as_str()))
            .map(|(_, lines)| lines.clone());
        if let Some(lines) = reply {
            for line in lines {
                self.inject_line(&line);
            }
        }
    }
}

impl SerialLink for MockLink {
    fn send_bytes(&mut self, data: &[u8]) -> io::Result<()> {
        if self.fail_writes {
            return Err(io::Error::new(io::ErrorKind::BrokenPipe, "mock link closed"));
        }
        self.raw_written.extend_from_slice(data);
        self.pending_write.push_str(&String::from_utf8_lossy(data));
        while let Some(pos) = self.pending_write.find('\n') {
            let line: String = self.pending_write.drain(..=pos).collect();
            let command = line.trim_end_matches(['\r', '\n']).to_string();
            self.answer(&command);
            self.written.push(command);
        }
        Ok(())
    }

    fn read_available(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = buf.len().min(self.inbound.len());
        for (slot, byte) in buf.iter_mut().zip(self.inbound.drain(..n)) {
            *slot = byte;
        }
        Ok(n)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn replies_follow_matching_prefix() {
        let mut link = MockLink::new();
        link.reply_to("AT+", "+ERR=4").reply_to("AT+ADDRESS?", "+ADDRESS=9");
        link.send_bytes(b"AT+ADDRESS?\r\n").unwrap();
        let mut buf = [0u8; 64];
        let n = link.read_available(&mut buf).unwrap();
        assert_eq!(&buf[..n], b"+ADDRESS=9\r\n");
        link.send_bytes(b"AT+BAND?\r\n").unwrap();
        let n = link.read_available(&mut buf).unwrap();
        assert_eq!(&buf[..n], b"+ERR=4\r\n");
    }

    #[test]
    fn unmatched_command_gets_silence() {
        let mut link = MockLink::new();
        link.send_bytes(b"AT+VER?\r\n").unwrap();
        let mut buf = [0u8; 8];
        assert_eq!(link.read_available(&mut buf).unwrap(), 0);
        assert_eq!(link.written(), &["AT+VER?".to_string()]);
    }

    #[test]
    fn failing_writes_surface_io_errors() {
        let mut link = MockLink::new();
        link.fail_writes(true);
        assert!(link.send_bytes(b"AT\r\n").is_err());
    }
}
