//! TCP command channel.
//!
//! One operator connection at a time: accept, read opcode bytes until
//! the client sends ASCII `'0'` or hangs up, then accept again.  Each
//! byte is dispatched as it arrives; there is no framing and no reply.

use std::io::{self, ErrorKind, Read};
use std::net::{SocketAddr, TcpListener, TcpStream};

use log::{debug, info, warn};

use crate::app::commands::SESSION_END;
use crate::app::dispatcher::CommandDispatcher;
use crate::app::ports::DigitalOutput;
use crate::error::CommsError;

/// Why a command session ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEnd {
    /// The client sent the session terminator.
    ClientClosed,
    /// The stream hit EOF.
    Disconnected,
    /// A read failed; the connection is abandoned.
    ReadFailed(ErrorKind),
}

/// Dispatch bytes from `reader` until the session ends.  Returns how the
/// session ended and how many bytes were dispatched.
pub fn serve_session<R: Read, O: DigitalOutput>(
    mut reader: R,
    dispatcher: &CommandDispatcher<O>,
) -> (SessionEnd, usize) {
    let mut byte = [0u8; 1];
    let mut dispatched = 0;
    loop {
        match reader.read(&mut byte) {
            Ok(0) => return (SessionEnd::Disconnected, dispatched),
            Ok(_) if byte[0] == SESSION_END => return (SessionEnd::ClientClosed, dispatched),
            Ok(_) => {
                // Unknown opcodes are logged by the dispatcher; the session stays open.
                let _ = dispatcher.handle_byte(byte[0]);
                dispatched += 1;
            }
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => {
                warn!("Command read failed: {e}");
                return (SessionEnd::ReadFailed(e.kind()), dispatched);
            }
        }
    }
}

pub struct CommandServer {
    listener: TcpListener,
}

impl CommandServer {
    pub fn bind(address: &str, port: u16) -> Result<Self, CommsError> {
        let listener = TcpListener::bind((address, port))
            .map_err(|e| CommsError::BindFailed(format!("{address}:{port}: {e}")))?;
        Ok(Self { listener })
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Accept one connection and serve it to completion.
    pub fn serve_one<O: DigitalOutput>(
        &self,
        dispatcher: &CommandDispatcher<O>,
    ) -> io::Result<SessionEnd> {
        let (stream, peer) = self.listener.accept()?;
        info!("Operator connected from {peer}");
        let end = serve_stream(stream, dispatcher);
        info!("Operator {peer} session ended: {end:?}");
        Ok(end)
    }

    /// Serve connections one after another, forever.  Accept failures are
    /// logged and the loop keeps accepting.
    pub fn serve_forever<O: DigitalOutput>(&self, dispatcher: &CommandDispatcher<O>) -> ! {
        if let Ok(addr) = self.local_addr() {
            info!("Command server listening on tcp://{addr}");
        }
        loop {
            if let Err(e) = self.serve_one(dispatcher) {
                warn!("Accept failed: {e}");
            }
        }
    }
}

fn serve_stream<O: DigitalOutput>(stream: TcpStream, dispatcher: &CommandDispatcher<O>) -> SessionEnd {
    if let Err(e) = stream.set_nodelay(true) {
        debug!("set_nodelay: {e}");
    }
    let (end, dispatched) = serve_session(&stream, dispatcher);
    debug!("{dispatched} commands dispatched");
    end
}
