//! Client for a running binli server.
//!
//! Implements [`BinSource`] over `GET /bins` and [`ChangeFeed`] over the
//! server-sent event stream at `GET /bins/events`.

use async_stream::stream;
use async_trait::async_trait;
use futures::StreamExt;
use reqwest::{Client, RequestBuilder, header::ACCEPT};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use binli_core::{
    model::{BinChange, BinRecord, BinType},
    ports::{BinSource, ChangeFeed, ChangeStream, PortError},
};

/// Server address used when nothing else is configured.
pub const DEFAULT_BASE_URL: &str = "http://127.0.0.1:8080";

/// Response envelope `{ "success": true, "data": ... }`.
#[derive(Debug, Deserialize)]
struct Envelope<T> {
    data: T,
}

/// Body of `POST /bins`.
#[derive(Debug, Serialize)]
struct ReadingBody {
    bin_type: BinType,
    distance_cm: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    bin_height_cm: Option<f64>,
}

/// HTTP handle on a binli server.
#[derive(Clone)]
pub struct BinliClient {
    client: Client,
    base_url: String,
}

impl BinliClient {
    /// Create a client bound to the given HTTP client and server address.
    #[must_use]
    pub fn new(client: Client, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_owned();
        Self { client, base_url }
    }

    /// Server address without a trailing slash.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Send a distance reading and return the record the server stored.
    ///
    /// # Errors
    ///
    /// Returns [`PortError::Network`] when the request fails or the server
    /// rejects the reading.
    pub async fn submit_reading(
        &self,
        bin_type: BinType,
        distance_cm: f64,
        bin_height_cm: Option<f64>,
    ) -> Result<BinRecord, PortError> {
        let body = ReadingBody {
            bin_type,
            distance_cm,
            bin_height_cm,
        };
        let req = self.client.post(format!("{}/bins", self.base_url)).json(&body);

        fetch_json::<Envelope<BinRecord>>(req)
            .await
            .map(|envelope| envelope.data)
    }
}

#[async_trait]
impl BinSource for BinliClient {
    async fn fetch_all(&self) -> Result<Vec<BinRecord>, PortError> {
        let req = self.client.get(format!("{}/bins", self.base_url));

        fetch_json::<Envelope<Vec<BinRecord>>>(req)
            .await
            .map(|envelope| envelope.data)
    }
}

#[async_trait]
impl ChangeFeed for BinliClient {
    async fn subscribe(&self) -> Result<ChangeStream, PortError> {
        let response = self
            .client
            .get(format!("{}/bins/events", self.base_url))
            .header(ACCEPT, "text/event-stream")
            .send()
            .await?
            .error_for_status()?;

        let mut chunks = response.bytes_stream();

        Ok(Box::pin(stream! {
            let mut parser = EventParser::default();
            while let Some(chunk) = chunks.next().await {
                match chunk {
                    Ok(bytes) => {
                        for change in parser.push(&bytes) {
                            yield change;
                        }
                    }
                    Err(err) => {
                        yield Err(PortError::from(err));
                        return;
                    }
                }
            }
            yield Err(PortError::FeedClosed);
        }))
    }
}

/// Largest event frame kept while waiting for its terminating blank line.
const MAX_FRAME_BYTES: usize = 64 * 1024;

/// Incremental decoder for the `text/event-stream` body.
///
/// Lines end in `\n`, `\r\n` or a lone `\r`, and frames are separated by a
/// blank line. Only `data:` lines matter; comments (keep-alives) and `event:`
/// names are skipped.
#[derive(Debug, Default)]
struct EventParser {
    buffer: Vec<u8>,
    // The previous chunk ended in `\r`; a leading `\n` belongs to that break.
    after_cr: bool,
}

impl EventParser {
    fn push(&mut self, chunk: &[u8]) -> Vec<Result<BinChange, PortError>> {
        for &byte in chunk {
            match byte {
                b'\r' => {
                    self.buffer.push(b'\n');
                    self.after_cr = true;
                }
                b'\n' if self.after_cr => self.after_cr = false,
                _ => {
                    self.buffer.push(byte);
                    self.after_cr = false;
                }
            }
        }

        let mut changes = Vec::new();
        while let Some(end) = self
            .buffer
            .windows(2)
            .position(|window| window == b"\n\n")
        {
            let frame: Vec<u8> = self.buffer.drain(..end + 2).collect();
            if let Some(change) = decode_frame(&frame) {
                changes.push(change);
            }
        }

        if self.buffer.len() > MAX_FRAME_BYTES {
            self.buffer.clear();
            changes.push(Err(PortError::Decode(format!(
                "event frame exceeds {MAX_FRAME_BYTES} bytes"
            ))));
        }
        changes
    }
}

fn decode_frame(frame: &[u8]) -> Option<Result<BinChange, PortError>> {
    let text = String::from_utf8_lossy(frame);
    let data: Vec<&str> = text
        .lines()
        .filter_map(|line| line.strip_prefix("data:"))
        .map(|value| value.strip_prefix(' ').unwrap_or(value))
        .collect();

    if data.is_empty() {
        return None;
    }

    Some(serde_json::from_str(&data.join("\n")).map_err(|err| PortError::Decode(err.to_string())))
}

// Small helper to fetch and decode JSON with status handling.
async fn fetch_json<T: DeserializeOwned>(req: RequestBuilder) -> Result<T, PortError> {
    req.send()
        .await
        .map_err(PortError::from)?
        .error_for_status()
        .map_err(PortError::from)?
        .json()
        .await
        .map_err(PortError::from)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_url_drops_trailing_slash() {
        let client = BinliClient::new(Client::new(), "http://bins.local:8080/");
        assert_eq!(client.base_url(), "http://bins.local:8080");
    }

    #[test]
    fn parser_decodes_complete_frames() {
        let mut parser = EventParser::default();
        let changes = parser.push(
            b"event: bin_change\ndata: {\"kind\":\"upserted\",\"bin_type\":\"dry\"}\n\n\
              event: bin_change\ndata: {\"kind\":\"resync\"}\n\n",
        );

        let decoded: Vec<BinChange> = changes.into_iter().map(|change| change.expect("ok")).collect();
        assert_eq!(
            decoded,
            vec![
                BinChange::Upserted {
                    bin_type: BinType::Dry
                },
                BinChange::Resync
            ]
        );
    }

    #[test]
    fn parser_waits_for_frames_split_across_chunks() {
        let mut parser = EventParser::default();

        assert!(parser.push(b"data: {\"kind\":\"ups").is_empty());
        assert!(parser.push(b"erted\",\"bin_type\":\"metal\"}\r\n").is_empty());
        let changes = parser.push(b"\r\n");

        assert_eq!(changes.len(), 1);
        assert!(matches!(
            changes.first(),
            Some(Ok(BinChange::Upserted {
                bin_type: BinType::Metal
            }))
        ));
    }

    #[test]
    fn parser_accepts_every_line_ending() {
        let mut parser = EventParser::default();
        let changes = parser.push(
            b"data: {\"kind\":\"resync\"}\r\r\
              data: {\"kind\":\"upserted\",\"bin_type\":\"wet\"}\r",
        );
        assert_eq!(changes.len(), 1);

        // `\r\n` split across chunks still counts as one line break.
        assert!(parser.push(b"\n").is_empty());
        let changes = parser.push(b"\r\n");
        assert!(matches!(
            changes.as_slice(),
            [Ok(BinChange::Upserted {
                bin_type: BinType::Wet
            })]
        ));
    }

    #[test]
    fn parser_drops_oversized_frames() {
        let mut parser = EventParser::default();
        let junk = vec![b'x'; MAX_FRAME_BYTES + 1];

        let changes = parser.push(&junk);
        assert!(matches!(changes.as_slice(), [Err(PortError::Decode(_))]));

        let changes = parser.push(b"data: {\"kind\":\"resync\"}\n\n");
        assert!(matches!(changes.as_slice(), [Ok(BinChange::Resync)]));
    }

    #[test]
    fn parser_skips_keep_alive_comments() {
        let mut parser = EventParser::default();
        assert!(parser.push(b": keep-alive\n\n").is_empty());
    }

    #[test]
    fn parser_reports_undecodable_payloads() {
        let mut parser = EventParser::default();
        let changes = parser.push(b"data: {\"kind\":\"exploded\"}\n\n");
        assert!(matches!(changes.first(), Some(Err(PortError::Decode(_)))));
    }

    #[test]
    fn reading_body_omits_missing_height() {
        let body = ReadingBody {
            bin_type: BinType::Wet,
            distance_cm: 12.5,
            bin_height_cm: None,
        };
        let json = serde_json::to_value(&body).expect("serialize");
        assert_eq!(json["bin_type"], "wet");
        assert_eq!(json["distance_cm"], 12.5);
        assert!(json.get("bin_height_cm").is_none());
    }
}
