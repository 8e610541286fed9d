use std::path::Path;

use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use tracing::debug;

use crate::http::framing::FramedReader;
use crate::http::parser::parse_request;
use crate::install::Installer;

const HEADER_TERMINATOR: &[u8] = b"\r\n\r\n";

/// The only response the receiver ever sends. Every failure path closes
/// the socket without a response.
const INSTALL_OK: &[u8] = b"HTTP/1.1 200 OK\r\nConnection: close\r\n";

pub enum Outcome {
    /// A payload was verified and renamed into place; the acknowledgement
    /// has been written and the device should now reset.
    Installed,
    /// Nothing was installed: the peer closed without sending a request,
    /// or the request declared no payload.
    NoUpdate,
}

/// Handles a single accepted connection from first byte to close.
pub struct Connection {
    reader: FramedReader<TcpStream>,
    installer: Installer,
}

impl Connection {
    pub fn new(stream: TcpStream, installer: Installer) -> Self {
        Self {
            reader: FramedReader::new(stream),
            installer,
        }
    }

    pub async fn run(&mut self) -> anyhow::Result<Outcome> {
        let header = self
            .reader
            .read_until(HEADER_TERMINATOR)
            .await
            .map_err(|e| anyhow::anyhow!("reading header block: {:?}", e))?;

        if header.is_empty() {
            return Ok(Outcome::NoUpdate);
        }

        let request =
            parse_request(&header).map_err(|e| anyhow::anyhow!("parsing request: {:?}", e))?;
        debug!("{:?}", request);

        let Some(length) = request.content_length() else {
            return Ok(Outcome::NoUpdate);
        };

        let payload = self
            .reader
            .read_exact(length)
            .await
            .map_err(|e| anyhow::anyhow!("reading payload: {:?}", e))?;

        if payload.len() < length {
            anyhow::bail!("peer closed before sending the declared payload");
        }

        self.installer
            .install(Path::new(&request.path), &payload, request.filehash())
            .map_err(|e| anyhow::anyhow!("install rejected: {:?}", e))?;

        self.reader.get_mut().write_all(INSTALL_OK).await?;

        Ok(Outcome::Installed)
    }
}
