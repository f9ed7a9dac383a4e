//! Message transports.
//!
//! A transport moves whole [`Message`]s. Both implementations carry one
//! JSON object per message: [`ChannelTransport`] between threads of one
//! process, [`LineTransport`] as newline-delimited text over any
//! reader/writer pair (stdin/stdout for `ember-run debug`).

use std::io::{BufRead, Write};
use std::sync::mpsc::{self, Receiver, Sender, TryRecvError};
use std::thread;

use thiserror::Error;

use crate::protocol::{CodecError, Message};

/// Transport errors.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The other end went away.
    #[error("transport disconnected")]
    Disconnected,

    /// A message arrived but could not be decoded. The transport stays
    /// usable.
    #[error("bad message: {0}")]
    Codec(#[from] CodecError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// A bidirectional message channel.
pub trait Transport {
    fn send(&mut self, message: &Message) -> Result<(), TransportError>;

    /// Next message if one is waiting.
    fn try_receive(&mut self) -> Result<Option<Message>, TransportError>;

    /// Block until a message arrives.
    fn receive(&mut self) -> Result<Message, TransportError>;
}

// ── In-process ───────────────────────────────────────────────────────

/// One end of an in-process connection.
pub struct ChannelTransport {
    outgoing: Sender<String>,
    incoming: Receiver<String>,
}

impl ChannelTransport {
    /// Two connected ends. What one sends, the other receives.
    pub fn pair() -> (ChannelTransport, ChannelTransport) {
        let (a_tx, a_rx) = mpsc::channel();
        let (b_tx, b_rx) = mpsc::channel();
        (
            ChannelTransport {
                outgoing: a_tx,
                incoming: b_rx,
            },
            ChannelTransport {
                outgoing: b_tx,
                incoming: a_rx,
            },
        )
    }

    /// Send raw text, bypassing the encoder.
    pub fn send_raw(&mut self, text: impl Into<String>) -> Result<(), TransportError> {
        self.outgoing
            .send(text.into())
            .map_err(|_| TransportError::Disconnected)
    }
}

impl Transport for ChannelTransport {
    fn send(&mut self, message: &Message) -> Result<(), TransportError> {
        let text = message.encode()?;
        self.send_raw(text)
    }

    fn try_receive(&mut self) -> Result<Option<Message>, TransportError> {
        match self.incoming.try_recv() {
            Ok(text) => Ok(Some(Message::decode(&text)?)),
            Err(TryRecvError::Empty) => Ok(None),
            Err(TryRecvError::Disconnected) => Err(TransportError::Disconnected),
        }
    }

    fn receive(&mut self) -> Result<Message, TransportError> {
        let text = self
            .incoming
            .recv()
            .map_err(|_| TransportError::Disconnected)?;
        Ok(Message::decode(&text)?)
    }
}

// ── Newline-delimited JSON ───────────────────────────────────────────

/// Newline-delimited JSON over a reader and a writer.
///
/// Lines are read on a background thread so `try_receive` never blocks.
/// Blank lines are ignored.
pub struct LineTransport<W: Write> {
    writer: W,
    incoming: Receiver<std::io::Result<String>>,
}

impl<W: Write> LineTransport<W> {
    pub fn new<R>(reader: R, writer: W) -> Self
    where
        R: BufRead + Send + 'static,
    {
        let (tx, rx) = mpsc::channel();
        thread::spawn(move || {
            for line in reader.lines() {
                if matches!(&line, Ok(text) if text.trim().is_empty()) {
                    continue;
                }
                let failed = line.is_err();
                if tx.send(line).is_err() || failed {
                    break;
                }
            }
            log::debug!("[devtools] input closed");
        });
        LineTransport {
            writer,
            incoming: rx,
        }
    }

    pub fn into_writer(self) -> W {
        self.writer
    }

    fn decode(line: std::io::Result<String>) -> Result<Message, TransportError> {
        Ok(Message::decode(line?.trim())?)
    }
}

impl<W: Write> Transport for LineTransport<W> {
    fn send(&mut self, message: &Message) -> Result<(), TransportError> {
        let text = message.encode()?;
        writeln!(self.writer, "{}", text)?;
        self.writer.flush()?;
        Ok(())
    }

    fn try_receive(&mut self) -> Result<Option<Message>, TransportError> {
        match self.incoming.try_recv() {
            Ok(line) => Self::decode(line).map(Some),
            Err(TryRecvError::Empty) => Ok(None),
            Err(TryRecvError::Disconnected) => Err(TransportError::Disconnected),
        }
    }

    fn receive(&mut self) -> Result<Message, TransportError> {
        let line = self
            .incoming
            .recv()
            .map_err(|_| TransportError::Disconnected)?;
        Self::decode(line)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;
    use std::time::Duration;

    use crate::protocol::SetBreakpoint;

    #[test]
    fn test_channel_pair_round_trip() {
        let (mut client, mut server) = ChannelTransport::pair();
        assert!(server.try_receive().unwrap().is_none());

        client.send(&Message::StepOver).unwrap();
        assert_eq!(server.receive().unwrap(), Message::StepOver);

        server.send(&Message::Resumed).unwrap();
        assert_eq!(client.try_receive().unwrap(), Some(Message::Resumed));
    }

    #[test]
    fn test_channel_reports_bad_messages_and_disconnects() {
        let (mut client, mut server) = ChannelTransport::pair();
        client.send_raw(r#"{"type":"bogus"}"#).unwrap();
        assert!(matches!(
            server.receive(),
            Err(TransportError::Codec(CodecError::UnknownSubtype(_)))
        ));

        drop(client);
        assert!(matches!(server.receive(), Err(TransportError::Disconnected)));
    }

    #[test]
    fn test_line_transport_reads_and_writes_lines() {
        let input = "{\"type\":\"setBreakpoint\",\"line\":3}\n\n{\"type\":\"resume\"}\n";
        let mut transport = LineTransport::new(Cursor::new(input.as_bytes().to_vec()), Vec::new());

        assert_eq!(
            transport.receive().unwrap(),
            Message::SetBreakpoint(SetBreakpoint {
                line: 3,
                column: None
            })
        );
        assert_eq!(transport.receive().unwrap(), Message::Resume);
        assert!(matches!(transport.receive(), Err(TransportError::Disconnected)));

        transport.send(&Message::Resumed).unwrap();
        transport.send(&Message::protocol_error("oops")).unwrap();
        let written = String::from_utf8(transport.into_writer()).unwrap();
        assert_eq!(
            written,
            "{\"type\":\"resumed\"}\n{\"type\":\"protocolError\",\"message\":\"oops\"}\n"
        );
    }

    #[test]
    fn test_line_transport_try_receive_does_not_block() {
        let (reader, _keep_open) = blocking_reader();
        let mut transport = LineTransport::new(reader, Vec::new());
        thread::sleep(Duration::from_millis(10));
        assert!(transport.try_receive().unwrap().is_none());
    }

    /// A reader that blocks until its sender is dropped.
    fn blocking_reader() -> (std::io::BufReader<PipeReader>, Sender<Vec<u8>>) {
        let (tx, rx) = mpsc::channel();
        (std::io::BufReader::new(PipeReader { rx }), tx)
    }

    struct PipeReader {
        rx: Receiver<Vec<u8>>,
    }

    impl std::io::Read for PipeReader {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            match self.rx.recv() {
                Ok(bytes) => {
                    let n = bytes.len().min(buf.len());
                    buf[..n].copy_from_slice(&bytes[..n]);
                    Ok(n)
                }
                Err(_) => Ok(0),
            }
        }
    }
}
