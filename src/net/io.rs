//! Socket I/O helpers.
//!
//! # Responsibilities
//! - Write a whole buffer, however many short writes it takes
//! - Read a request head into a growable, capped buffer until the end-of-headers marker
//! - Relay a byte stream from one socket to another in fixed-size chunks
//!
//! All helpers are generic over `Read`/`Write` so they run against sockets in
//! production and against in-memory streams in tests. Receive timeouts are a
//! property of the socket and are set by the caller.

use std::io::{self, ErrorKind, Read, Write};

/// Marker that terminates an HTTP request head.
pub const END_OF_HEADERS: &[u8] = b"\r\n\r\n";

/// Initial capacity of the request buffer, and the relay chunk size.
pub const CHUNK_SIZE: usize = 4096;

/// Largest request head accepted before giving up on the marker.
pub const MAX_HEAD_SIZE: usize = 64 * 1024;

/// Write all of `data` to `sink`, advancing by the bytes each write accepted.
///
/// Any write error aborts; a write that accepts zero bytes is reported as
/// [`ErrorKind::WriteZero`].
pub fn write_fully<W: Write + ?Sized>(sink: &mut W, data: &[u8]) -> io::Result<usize> {
    let mut offset = 0;

    while offset < data.len() {
        match sink.write(&data[offset..]) {
            Ok(0) => {
                return Err(io::Error::new(
                    ErrorKind::WriteZero,
                    "peer stopped accepting data",
                ))
            }
            Ok(n) => offset += n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }

    Ok(offset)
}

/// Read from `source` until `END_OF_HEADERS` appears in the accumulated bytes.
///
/// The buffer starts at [`CHUNK_SIZE`] and doubles whenever it fills up, up to
/// [`MAX_HEAD_SIZE`]. Any error, including a timeout, EOF before the marker or
/// a full buffer at the cap, aborts the read.
pub fn read_until_headers_end<R: Read + ?Sized>(source: &mut R) -> io::Result<Vec<u8>> {
    let mut buffer = vec![0u8; CHUNK_SIZE];
    let mut filled = 0;

    loop {
        if filled == buffer.len() {
            if buffer.len() >= MAX_HEAD_SIZE {
                return Err(io::Error::new(
                    ErrorKind::InvalidData,
                    "request head exceeds size limit",
                ));
            }
            let doubled = buffer.len() * 2;
            buffer.resize(doubled, 0);
        }

        let read = match source.read(&mut buffer[filled..]) {
            Ok(0) => {
                return Err(io::Error::new(
                    ErrorKind::UnexpectedEof,
                    "connection closed before end of headers",
                ))
            }
            Ok(n) => n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        };

        // The marker may straddle the previous read, so look back a few bytes.
        let search_from = filled.saturating_sub(END_OF_HEADERS.len() - 1);
        filled += read;

        if find(&buffer[search_from..filled], END_OF_HEADERS).is_some() {
            buffer.truncate(filled);
            return Ok(buffer);
        }
    }
}

/// Copy `source` into `sink` chunk by chunk until `source` reports end of stream.
///
/// Returns the number of bytes relayed. Any read or write failure aborts immediately.
pub fn relay<R, W>(source: &mut R, sink: &mut W) -> io::Result<u64>
where
    R: Read + ?Sized,
    W: Write + ?Sized,
{
    let mut chunk = [0u8; CHUNK_SIZE];
    let mut total = 0u64;

    loop {
        let read = match source.read(&mut chunk) {
            Ok(0) => return Ok(total),
            Ok(n) => n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        };

        write_fully(sink, &chunk[..read])?;
        total += read as u64;
    }
}

/// Position of the first occurrence of `needle` in `haystack`.
pub fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    if needle.is_empty() || haystack.len() < needle.len() {
        return None;
    }
    haystack.windows(needle.len()).position(|window| window == needle)
}
