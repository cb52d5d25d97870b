use std::io::Read;

use libflate::{deflate, gzip, zlib};

use crate::error::ProtocolError;

/// Decoder represents the content coding applied to a response body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Decoder {
    /// Identity does not apply any transformation to the body.
    Identity,
    /// Gzip decompresses a gzip (RFC 1952) stream.
    Gzip,
    /// Deflate decompresses a zlib-wrapped (RFC 1950) or raw (RFC 1951) deflate stream.
    Deflate,
}

// TryFrom returns a decoder given the value of a Content-Encoding header.
// Only a single coding is supported.
impl TryFrom<&str> for Decoder {
    type Error = ProtocolError;
    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value.trim().to_ascii_lowercase().as_str() {
            "" | "identity" => Ok(Decoder::Identity),
            "gzip" | "x-gzip" => Ok(Decoder::Gzip),
            "deflate" => Ok(Decoder::Deflate),
            other => Err(ProtocolError::UnsupportedContentEncoding(other.to_string())),
        }
    }
}

impl Decoder {
    /// decode returns the decoded body
    pub(crate) fn decode(&self, body: Vec<u8>) -> Result<Vec<u8>, ProtocolError> {
        if body.is_empty() {
            return Ok(body);
        }
        match self {
            Decoder::Identity => Ok(body),
            Decoder::Gzip => {
                let mut decoder = gzip::Decoder::new(body.as_slice()).map_err(ProtocolError::Decode)?;
                read_all(&mut decoder)
            }
            // servers disagree on whether "deflate" carries the zlib wrapper
            Decoder::Deflate => {
                let wrapped = zlib::Decoder::new(body.as_slice())
                    .map_err(ProtocolError::Decode)
                    .and_then(|mut decoder| read_all(&mut decoder));
                match wrapped {
                    Ok(decoded) => Ok(decoded),
                    Err(_) => read_all(&mut deflate::Decoder::new(body.as_slice())),
                }
            }
        }
    }
}

fn read_all<R: Read>(reader: &mut R) -> Result<Vec<u8>, ProtocolError> {
    let mut buf = Vec::new();
    reader
        .read_to_end(&mut buf)
        .map_err(ProtocolError::Decode)?;
    Ok(buf)
}
