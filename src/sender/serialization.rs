use crate::domain::{Labels, StreamEntry};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SerializationError {
    #[error("Failed to encode line {line} of stream {stream}: {source}")]
    Line {
        stream: usize,
        line: usize,
        #[source]
        source: serde_json::Error,
    },
    #[error("JSON serialization failed: {0}")]
    JsonError(#[from] serde_json::Error),
}

/// Body of a Loki push request, exactly as it goes over the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PushRequest {
    pub streams: Vec<PushStream>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PushStream {
    pub stream: Labels,
    /// `[nanosecond timestamp, line]` pairs.
    pub values: Vec<[String; 2]>,
}

/// A batch of formatted stream entries awaiting encoding.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Payload {
    streams: Vec<StreamEntry>,
}

impl Payload {
    pub fn new(streams: Vec<StreamEntry>) -> Self {
        Self { streams }
    }

    pub fn streams(&self) -> &[StreamEntry] {
        &self.streams
    }

    pub fn len(&self) -> usize {
        self.streams.len()
    }

    pub fn is_empty(&self) -> bool {
        self.streams.is_empty()
    }

    /// Renders every line. The first field JSON cannot represent aborts the whole payload.
    pub fn to_push_request(&self) -> Result<PushRequest, SerializationError> {
        let streams = self
            .streams
            .iter()
            .enumerate()
            .map(|(stream_idx, entry)| {
                let values = entry
                    .lines
                    .iter()
                    .enumerate()
                    .map(|(line_idx, line)| {
                        line.render()
                            .map(|rendered| [line.timestamp.clone(), rendered])
                            .map_err(|source| SerializationError::Line {
                                stream: stream_idx,
                                line: line_idx,
                                source,
                            })
                    })
                    .collect::<Result<Vec<_>, _>>()?;

                Ok(PushStream {
                    stream: entry.labels.clone(),
                    values,
                })
            })
            .collect::<Result<Vec<_>, SerializationError>>()?;

        Ok(PushRequest { streams })
    }

    /// Encodes the payload to the JSON request body.
    ///
    /// serde_json leaves `/` and non-ASCII characters unescaped, which is
    /// what the push API and existing log tooling expect.
    pub fn encode(&self) -> Result<Vec<u8>, SerializationError> {
        let request = self.to_push_request()?;
        Ok(serde_json::to_vec(&request)?)
    }
}
