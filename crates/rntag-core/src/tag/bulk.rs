//! Chunked bulk transfers
//!
//! Range reads and multi-page writes rarely fit in one radio exchange. The
//! functions here split them into pieces the transport can carry and hand
//! each piece to a caller-supplied exchange closure, so the same chunking
//! serves both the plain NTAG commands and the N2 bank commands.

use alloc::vec::Vec;

use crate::error::{Error, Result};
use crate::nfc::PAGE_SIZE;

/// Bytes carried by one fast-write exchange (4 pages)
pub const FAST_WRITE_SNIPPET_SIZE: usize = 16;

/// Pages one range-read exchange may return for a given transceive budget
///
/// Returns 0 when the budget cannot carry a single page.
pub fn pages_per_exchange(max_transceive_length: usize) -> usize {
    (max_transceive_length / PAGE_SIZE).saturating_sub(1)
}

/// Progress callback for bulk transfers
pub trait TransferProgress {
    /// Called when starting a read
    fn reading(&mut self, total_bytes: usize);

    /// Called after each chunk is read
    fn read_progress(&mut self, bytes_read: usize);

    /// Called when starting a write
    fn writing(&mut self, total_bytes: usize);

    /// Called after each exchange of a write
    fn write_progress(&mut self, bytes_written: usize);

    /// Called when the transfer has finished successfully
    fn complete(&mut self);
}

/// A no-op progress reporter
pub struct NoProgress;

impl TransferProgress for NoProgress {
    fn reading(&mut self, _total_bytes: usize) {}
    fn read_progress(&mut self, _bytes_read: usize) {}
    fn writing(&mut self, _total_bytes: usize) {}
    fn write_progress(&mut self, _bytes_written: usize) {}
    fn complete(&mut self) {}
}

/// Read pages `start..=end` in as many exchanges as the budget requires
///
/// `read_range(chunk_start, chunk_end)` performs one exchange and returns
/// the raw answer. See [`fast_read_with_progress`].
pub fn fast_read<F>(max_transceive_length: usize, start: u32, end: u32, read_range: F) -> Result<Vec<u8>>
where
    F: FnMut(u32, u32) -> Result<Vec<u8>>,
{
    fast_read_with_progress(max_transceive_length, start, end, read_range, &mut NoProgress)
}

/// Read pages `start..=end` in chunks, reporting progress
///
/// Fails with no exchange if `end < start` or if the budget cannot carry a
/// page. Any failed or mis-sized chunk aborts the whole read. A chunk that
/// is exactly as long as the full range is returned as-is.
pub fn fast_read_with_progress<F, P>(
    max_transceive_length: usize,
    start: u32,
    end: u32,
    mut read_range: F,
    progress: &mut P,
) -> Result<Vec<u8>>
where
    F: FnMut(u32, u32) -> Result<Vec<u8>>,
    P: TransferProgress + ?Sized,
{
    if end < start {
        return Err(Error::InvalidRange { start, end });
    }

    let per_exchange = pages_per_exchange(max_transceive_length);
    if per_exchange < 1 {
        return Err(Error::TransceiveBudgetTooSmall {
            max_transceive_length,
        });
    }

    let total_len = usize::try_from(end - start)
        .ok()
        .and_then(|pages| pages.checked_add(1))
        .and_then(|pages| pages.checked_mul(PAGE_SIZE))
        .ok_or(Error::InvalidRange { start, end })?;
    let chunk_bytes = per_exchange * PAGE_SIZE;
    log::debug!(
        "fast read pages {}..={} ({} bytes) in chunks of {} pages",
        start,
        end,
        total_len,
        per_exchange
    );

    progress.reading(total_len);
    // Allocated once the first chunk checks out
    let mut buf: Vec<u8> = Vec::new();
    let mut chunk_start = start as u64;
    let mut index = 0usize;
    let mut bytes_read = 0usize;

    while chunk_start <= end as u64 {
        let chunk_end = (chunk_start + per_exchange as u64 - 1).min(end as u64);
        let expected = (chunk_end - chunk_start + 1) as usize * PAGE_SIZE;

        let chunk = read_range(chunk_start as u32, chunk_end as u32)?;
        if chunk.len() != expected {
            log::debug!(
                "chunk {}..={} returned {} bytes, expected {}",
                chunk_start,
                chunk_end,
                chunk.len(),
                expected
            );
            return Err(Error::ResponseLength {
                expected,
                actual: chunk.len(),
            });
        }
        if chunk.len() == total_len {
            progress.read_progress(total_len);
            progress.complete();
            return Ok(chunk);
        }

        if index == 0 {
            buf.try_reserve_exact(total_len)
                .map_err(|_| Error::InvalidRange { start, end })?;
        }
        // Every chunk before the last is full, so chunk `index` lands at its offset
        debug_assert_eq!(buf.len(), index * chunk_bytes);
        buf.extend_from_slice(&chunk);
        bytes_read += chunk.len();
        progress.read_progress(bytes_read);

        chunk_start += per_exchange as u64;
        index += 1;
    }

    progress.complete();
    Ok(buf)
}

/// Write `data` one page per exchange, starting at page `start`
///
/// `data` must be a whole number of pages. Stops at the first failure;
/// pages already written stay written.
pub fn write_pages<F>(start: u32, data: &[u8], write_page: F) -> Result<()>
where
    F: FnMut(u32, &[u8]) -> Result<()>,
{
    write_pages_with_progress(start, data, write_page, &mut NoProgress)
}

/// Page-by-page write with progress reporting
pub fn write_pages_with_progress<F, P>(
    start: u32,
    data: &[u8],
    mut write_page: F,
    progress: &mut P,
) -> Result<()>
where
    F: FnMut(u32, &[u8]) -> Result<()>,
    P: TransferProgress + ?Sized,
{
    if data.len() % PAGE_SIZE != 0 {
        return Err(Error::InvalidDataLength { len: data.len() });
    }

    progress.writing(data.len());
    for (i, page) in data.chunks_exact(PAGE_SIZE).enumerate() {
        write_page(start.wrapping_add(i as u32), page)?;
        progress.write_progress((i + 1) * PAGE_SIZE);
    }
    progress.complete();
    Ok(())
}

/// Write `data` in 16-byte snippets addressed at `start + 4 * i`
///
/// The last snippet carries whatever remains. Stops at the first failure.
pub fn fast_write<F>(start: u32, data: &[u8], write_snippet: F) -> Result<()>
where
    F: FnMut(u32, &[u8]) -> Result<()>,
{
    fast_write_with_progress(start, data, write_snippet, &mut NoProgress)
}

/// Snippet write with progress reporting
pub fn fast_write_with_progress<F, P>(
    start: u32,
    data: &[u8],
    mut write_snippet: F,
    progress: &mut P,
) -> Result<()>
where
    F: FnMut(u32, &[u8]) -> Result<()>,
    P: TransferProgress + ?Sized,
{
    let pages_per_snippet = (FAST_WRITE_SNIPPET_SIZE / PAGE_SIZE) as u32;
    log::debug!(
        "fast write {} bytes from page {} in {} snippets",
        data.len(),
        start,
        data.len().div_ceil(FAST_WRITE_SNIPPET_SIZE)
    );

    progress.writing(data.len());
    let mut written = 0usize;
    for (i, snippet) in data.chunks(FAST_WRITE_SNIPPET_SIZE).enumerate() {
        let page = start.wrapping_add(pages_per_snippet.wrapping_mul(i as u32));
        write_snippet(page, snippet)?;
        written += snippet.len();
        progress.write_progress(written);
    }
    progress.complete();
    Ok(())
}
