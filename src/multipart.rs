// multipart.rs

use std::fmt::Write as _;

use crc::{Crc, CRC_32_ISO_HDLC};
use thiserror::Error;

/// RFC 2046 caps boundaries at 70 characters.
pub const BOUNDARY_MAX: usize = 70;
pub const BOUNDARY_PREFIX: &str = "----GrowHubBoundary";

const FRAME_CRC: Crc<u32> = Crc::<u32>::new(&CRC_32_ISO_HDLC);

pub type Boundary = heapless::String<BOUNDARY_MAX>;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum MultipartError {
    #[error("boundary must be 1..={BOUNDARY_MAX} characters, got {0}")]
    BoundaryLength(usize),

    #[error("boundary contains {0:?}")]
    BoundaryChar(char),
}

/// Hands out a fresh boundary per frame: prefix, frame sequence number and
/// the crc32 of the frame itself.
#[derive(Debug, Default)]
pub struct BoundaryGen {
    seq: u32,
}

impl BoundaryGen {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next(&mut self, image: &[u8]) -> Boundary {
        let seq = self.seq;
        self.seq = self.seq.wrapping_add(1);

        let mut b = Boundary::new();
        // 19 + 8 + 8 chars, always fits
        let _ = write!(
            b,
            "{BOUNDARY_PREFIX}{seq:08x}{:08x}",
            FRAME_CRC.checksum(image)
        );
        b
    }
}

fn check_boundary(boundary: &str) -> Result<(), MultipartError> {
    if boundary.is_empty() || boundary.len() > BOUNDARY_MAX {
        return Err(MultipartError::BoundaryLength(boundary.len()));
    }
    if let Some(c) = boundary
        .chars()
        .find(|c| !(c.is_ascii_alphanumeric() || "'()+_,-./:=?".contains(*c)))
    {
        return Err(MultipartError::BoundaryChar(c));
    }
    Ok(())
}

/// A JPEG frame wrapped as a single `image` form field.
///
/// The boundary is only guaranteed not to clash with our own framing text,
/// image bytes are not scanned for it.
#[derive(Debug)]
pub struct MultipartPayload<'a> {
    preamble: String,
    epilogue: String,
    image: &'a [u8],
    content_type: String,
}

impl<'a> MultipartPayload<'a> {
    pub fn new(boundary: &str, name: &str, image: &'a [u8]) -> Result<Self, MultipartError> {
        check_boundary(boundary)?;
        Ok(Self {
            preamble: format!(
                "--{boundary}\r\n\
                 Content-Disposition: form-data; name=\"image\"; filename=\"{name}.jpg\"\r\n\
                 Content-Type: image/jpeg\r\n\
                 \r\n"
            ),
            epilogue: format!("\r\n--{boundary}--\r\n"),
            image,
            content_type: format!("multipart/form-data; boundary={boundary}"),
        })
    }

    pub fn preamble(&self) -> &str {
        &self.preamble
    }

    pub fn epilogue(&self) -> &str {
        &self.epilogue
    }

    pub fn content_type(&self) -> &str {
        &self.content_type
    }

    /// Exact body size, known before a single byte is assembled.
    pub fn content_length(&self) -> usize {
        self.preamble.len() + self.image.len() + self.epilogue.len()
    }

    pub fn into_body(self) -> Vec<u8> {
        let mut body = Vec::with_capacity(self.content_length());
        body.extend_from_slice(self.preamble.as_bytes());
        body.extend_from_slice(self.image);
        body.extend_from_slice(self.epilogue.as_bytes());
        body
    }
}


// EOF
