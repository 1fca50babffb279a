use std::io::{self, Read};
use std::time::Duration;

use serialport::SerialPort;
use tracing::{debug, info, warn};

use crate::error::{AppError, ReaderError};

/// Line the controller sends once it is ready to stream data.
pub const HANDSHAKE_TOKEN: &[u8] = b"RDY\r\n";
pub const LINE_SEPARATOR: &str = "\r\n";

/// Poll interval for blocking reads. Timeouts are retried, so the port
/// behaves as if it had no timeout at all.
const READ_POLL: Duration = Duration::from_millis(500);

/// Byte source the reader drains: something readable that can report how
/// many bytes are waiting without blocking.
pub trait SerialLink: Read {
    fn bytes_available(&mut self) -> io::Result<usize>;
}

impl SerialLink for Box<dyn SerialPort> {
    fn bytes_available(&mut self) -> io::Result<usize> {
        Ok(self.bytes_to_read()? as usize)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    NotReady,
    Ready,
    Closed,
}

/// Owns the serial connection and the partial-line buffer.
pub struct SerialReader<L: SerialLink> {
    link: Option<L>,
    state: ConnectionState,
    // decoded text not yet terminated by a separator
    pending: String,
    // tail of an incomplete UTF-8 sequence, carried into the next drain
    undecoded: Vec<u8>,
}

impl<L: SerialLink> SerialReader<L> {
    pub fn new(link: L) -> Self {
        Self {
            link: Some(link),
            state: ConnectionState::NotReady,
            pending: String::new(),
            undecoded: Vec::new(),
        }
    }

    /// Wrap `link` and block until the controller reports ready.
    pub fn connect(link: L) -> Result<Self, ReaderError> {
        let mut reader = Self::new(link);
        reader.handshake()?;
        Ok(reader)
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// Unterminated text left over from the last drain.
    pub fn pending(&self) -> &str {
        &self.pending
    }

    /// Read line by line until one equals `RDY\r\n` exactly. Anything sent
    /// before it is discarded. There is no deadline: a silent device keeps
    /// this loop waiting forever.
    pub fn handshake(&mut self) -> Result<(), ReaderError> {
        let Some(link) = self.link.as_mut() else {
            return Ok(());
        };

        info!("Waiting for RDY signal from controller");
        let mut line = Vec::new();
        let mut byte = [0u8; 1];

        while self.state == ConnectionState::NotReady {
            match link.read(&mut byte) {
                Ok(0) => return Err(io::Error::from(io::ErrorKind::UnexpectedEof).into()),
                Ok(_) => {
                    line.push(byte[0]);
                    if byte[0] != b'\n' {
                        continue;
                    }
                    if line == HANDSHAKE_TOKEN {
                        self.state = ConnectionState::Ready;
                        info!("Received RDY");
                    } else {
                        {
                            let noise = String::from_utf8_lossy(&line);
                            debug!(line = noise.trim_end(), "Discarding pre-handshake line");
                        }
                        line.clear();
                    }
                }
                Err(e)
                    if matches!(
                        e.kind(),
                        io::ErrorKind::TimedOut | io::ErrorKind::Interrupted | io::ErrorKind::WouldBlock
                    ) => {}
                Err(e) => return Err(e.into()),
            }
        }

        Ok(())
    }

    /// Drain whatever the device has buffered and return every complete
    /// line, in order, without separators. The unterminated remainder stays
    /// in the line buffer. Returns nothing unless the connection is ready.
    pub fn read(&mut self) -> Result<Vec<String>, ReaderError> {
        if self.state != ConnectionState::Ready {
            return Ok(Vec::new());
        }
        let Some(link) = self.link.as_mut() else {
            return Ok(Vec::new());
        };

        let available = link.bytes_available()?;
        if available > 0 {
            let mut chunk = vec![0u8; available];
            link.read_exact(&mut chunk)?;
            self.push_bytes(&chunk)?;
        }

        Ok(self.take_lines())
    }

    /// Release the device. Later reads return nothing; closing again is a no-op.
    pub fn close(&mut self) {
        self.state = ConnectionState::Closed;
        if self.link.take().is_some() {
            info!("Disconnected");
        }
    }

    fn push_bytes(&mut self, chunk: &[u8]) -> Result<(), ReaderError> {
        self.undecoded.extend_from_slice(chunk);

        let valid = match std::str::from_utf8(&self.undecoded) {
            Ok(_) => self.undecoded.len(),
            // truncated multi-byte sequence at the end: keep it for later
            Err(e) if e.error_len().is_none() => e.valid_up_to(),
            Err(_) => return Err(ReaderError::InvalidUtf8),
        };

        let decoded: Vec<u8> = self.undecoded.drain(..valid).collect();
        let text = String::from_utf8(decoded).map_err(|_| ReaderError::InvalidUtf8)?;
        self.pending.push_str(&text);
        Ok(())
    }

    fn take_lines(&mut self) -> Vec<String> {
        if !self.pending.contains(LINE_SEPARATOR) {
            return Vec::new();
        }

        let mut lines: Vec<String> = self
            .pending
            .split(LINE_SEPARATOR)
            .map(str::to_owned)
            .collect();
        self.pending = lines.pop().unwrap_or_default();
        lines
    }
}

/// Open `port_name` and complete the ready handshake. On an open failure the
/// ports the OS does know about are logged.
pub fn open(port_name: &str, baud_rate: u32) -> Result<SerialReader<Box<dyn SerialPort>>, AppError> {
    info!(port = port_name, baud_rate, "Connecting");

    let port = match serialport::new(port_name, baud_rate).timeout(READ_POLL).open() {
        Ok(p) => p,
        Err(source) => {
            let ports = describe_ports();
            if ports.is_empty() {
                warn!("No serial ports detected");
            }
            for p in ports {
                warn!(port = %p, "Available port");
            }
            return Err(AppError::Open {
                port: port_name.to_string(),
                source,
            });
        }
    };
    info!("Connected");

    SerialReader::connect(port).map_err(AppError::Handshake)
}

/// Human readable list of the serial ports present, e.g.
/// "/dev/ttyACM0: Arduino LLC Arduino Uno".
pub fn describe_ports() -> Vec<String> {
    let mut out: Vec<String> = serialport::available_ports()
        .unwrap_or_default()
        .into_iter()
        .map(|p| match p.port_type {
            serialport::SerialPortType::UsbPort(info) => {
                let parts: Vec<String> = [info.manufacturer, info.product]
                    .into_iter()
                    .flatten()
                    .collect();
                if parts.is_empty() {
                    format!("{}: USB Serial", p.port_name)
                } else {
                    format!("{}: {}", p.port_name, parts.join(" "))
                }
            }
            serialport::SerialPortType::BluetoothPort => format!("{}: Bluetooth", p.port_name),
            serialport::SerialPortType::PciPort => format!("{}: PCI", p.port_name),
            serialport::SerialPortType::Unknown => p.port_name,
        })
        .collect();

    out.sort();
    out
}

#[cfg(test)]
pub(crate) mod testing {
    use std::collections::VecDeque;
    use std::io::{self, Read};

    use super::SerialLink;

    /// In-memory device. Each scheduled chunk becomes visible on the next
    /// poll once everything before it has been consumed; an empty chunk
    /// stands for "nothing arrived" (a read timeout).
    #[derive(Default)]
    pub struct FakeLink {
        inbox: VecDeque<u8>,
        scheduled: VecDeque<Vec<u8>>,
    }

    impl FakeLink {
        pub fn new<I, C>(chunks: I) -> Self
        where
            I: IntoIterator<Item = C>,
            C: AsRef<[u8]>,
        {
            Self {
                inbox: VecDeque::new(),
                scheduled: chunks.into_iter().map(|c| c.as_ref().to_vec()).collect(),
            }
        }

        // true when an empty chunk was consumed
        fn refill(&mut self) -> bool {
            if !self.inbox.is_empty() {
                return false;
            }
            match self.scheduled.pop_front() {
                Some(chunk) if chunk.is_empty() => true,
                Some(chunk) => {
                    self.inbox.extend(chunk);
                    false
                }
                None => false,
            }
        }
    }

    impl Read for FakeLink {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            if self.refill() {
                return Err(io::ErrorKind::TimedOut.into());
            }
            let n = buf.len().min(self.inbox.len());
            for (slot, byte) in buf.iter_mut().zip(self.inbox.drain(..n)) {
                *slot = byte;
            }
            Ok(n)
        }
    }

    impl SerialLink for FakeLink {
        fn bytes_available(&mut self) -> io::Result<usize> {
            self.refill();
            Ok(self.inbox.len())
        }
    }
}
