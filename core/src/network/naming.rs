//! Naming service client
//!
//! Asks the naming service for the next free sensor name with a single
//! HTTP/1.0 `GET`. The server closes the connection after the response, so
//! the body runs to end of stream.

use sensor_node_hal::StreamTransport;

use crate::config::NamingConfig;
use crate::identity::{parse_sensor_name, SensorName};

use super::error::NamingError;

/// Receive buffer for the whole response, headers included
const RESPONSE_BUF_LEN: usize = 512;

/// HTTP client for the naming service
pub struct NamingClient<'a> {
    config: &'a NamingConfig,
}

impl<'a> NamingClient<'a> {
    pub fn new(config: &'a NamingConfig) -> Self {
        Self { config }
    }

    /// Fetch the next sensor name; the stream is closed on every path
    pub async fn fetch_name<S: StreamTransport>(
        &self,
        stream: &mut S,
    ) -> Result<SensorName, NamingError> {
        info!(
            "Requesting sensor name from {}:{}{}",
            self.config.host, self.config.port, self.config.path
        );
        stream.open(self.config.host, self.config.port).await?;

        let mut buf = [0u8; RESPONSE_BUF_LEN];
        let result = match self.exchange(stream, &mut buf).await {
            Ok(len) => parse_response(&buf[..len]),
            Err(e) => Err(e),
        };
        stream.close();

        match &result {
            Ok(name) => info!("Naming service assigned '{}'", name.as_str()),
            Err(e) => warn!("Naming request failed: {:?}", e),
        }
        result
    }

    async fn exchange<S: StreamTransport>(
        &self,
        stream: &mut S,
        buf: &mut [u8],
    ) -> Result<usize, NamingError> {
        for part in [
            "GET ",
            self.config.path,
            " HTTP/1.0\r\nHost: ",
            self.config.host,
            "\r\nConnection: close\r\n\r\n",
        ] {
            stream
                .write_all(part.as_bytes())
                .await
                .map_err(|_| NamingError::Io)?;
        }
        stream.flush().await.map_err(|_| NamingError::Io)?;

        let mut len = 0;
        loop {
            if len == buf.len() {
                return Err(NamingError::ResponseTooLong);
            }
            let n = stream.read(&mut buf[len..]).await.map_err(|_| NamingError::Io)?;
            if n == 0 {
                return Ok(len);
            }
            len += n;
        }
    }
}

/// Split an HTTP response, require status 200 and parse the body as a name
pub fn parse_response(response: &[u8]) -> Result<SensorName, NamingError> {
    let (head, body) = split_head(response).ok_or(NamingError::InvalidResponse)?;
    let status_line = head.split(|&b| b == b'\n').next().unwrap_or(head);
    let status = parse_status(status_line)?;
    if status != 200 {
        return Err(NamingError::Status(status));
    }
    let body = core::str::from_utf8(body).map_err(|_| NamingError::InvalidName)?;
    parse_sensor_name(body).ok_or(NamingError::InvalidName)
}

fn split_head(response: &[u8]) -> Option<(&[u8], &[u8])> {
    for (sep, skip) in [(&b"\r\n\r\n"[..], 4), (&b"\n\n"[..], 2)] {
        if let Some(pos) = response.windows(sep.len()).position(|w| w == sep) {
            return Some((&response[..pos], &response[pos + skip..]));
        }
    }
    None
}

fn parse_status(line: &[u8]) -> Result<u16, NamingError> {
    let line = core::str::from_utf8(line).map_err(|_| NamingError::InvalidResponse)?;
    let mut parts = line.split_ascii_whitespace();
    match (parts.next(), parts.next()) {
        (Some(version), Some(code)) if version.starts_with("HTTP/") => {
            code.parse().map_err(|_| NamingError::InvalidResponse)
        }
        _ => Err(NamingError::InvalidResponse),
    }
}
