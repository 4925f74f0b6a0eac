use std::iter::Peekable;
use std::str::SplitInclusive;

/// Lazily splits text into gateway-sized messages.
///
/// Lines are kept whole: a chunk is flushed before the line that would push
/// it past `limit` bytes. A single line longer than the limit is emitted as
/// its own oversized chunk. Cloning the iterator restarts from the same
/// position.
#[derive(Debug, Clone)]
pub struct Chunks<'a> {
    lines: Peekable<SplitInclusive<'a, char>>,
    limit: usize,
}

/// Split `text` (right-trimmed) into chunks of at most `limit` bytes.
pub fn chunk_text(text: &str, limit: usize) -> Chunks<'_> {
    Chunks {
        lines: text.trim_end().split_inclusive('\n').peekable(),
        limit,
    }
}

impl Iterator for Chunks<'_> {
    type Item = String;

    fn next(&mut self) -> Option<Self::Item> {
        let first = self.lines.next()?;
        let mut chunk = String::from(first);

        while let Some(line) = self.lines.peek() {
            if chunk.len() + line.len() > self.limit {
                break;
            }
            chunk.push_str(line);
            self.lines.next();
        }

        Some(chunk)
    }
}
