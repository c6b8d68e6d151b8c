//! Byte-offset to line/column resolution for failure display.

use std::collections::HashMap;

/// Registry of every source text seen during a build, keyed by file name.
///
/// Imported files register themselves here as they are parsed so that
/// failures raised from inside an imported declaration still resolve to a
/// position in the right file.
#[derive(Debug, Default)]
pub struct SourceMap {
    files: HashMap<String, LineIndex>,
}

#[derive(Debug)]
struct LineIndex {
    /// Byte offset of the start of each line.
    line_starts: Vec<usize>,
}

impl LineIndex {
    fn new(source: &str) -> Self {
        let mut line_starts = vec![0];
        for (i, c) in source.char_indices() {
            if c == '\n' {
                line_starts.push(i + 1);
            }
        }
        Self { line_starts }
    }

    fn line_col(&self, pos: usize) -> (usize, usize) {
        let line = match self.line_starts.binary_search(&pos) {
            Ok(n) => n,
            Err(n) => n - 1,
        };
        (line + 1, pos - self.line_starts[line] + 1)
    }
}

impl SourceMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a parsed source. Re-registering a file replaces its index.
    pub fn register(&mut self, file: &str, source: &str) {
        self.files.insert(file.to_string(), LineIndex::new(source));
    }

    /// Resolve a byte offset to a 1-based (line, column) pair.
    pub fn line_col(&self, file: &str, pos: usize) -> Option<(usize, usize)> {
        self.files.get(file).map(|idx| idx.line_col(pos))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_lines_and_columns() {
        let mut map = SourceMap::new();
        map.register("t.eh", "int a\nint b\n");
        assert_eq!(map.line_col("t.eh", 0), Some((1, 1)));
        assert_eq!(map.line_col("t.eh", 4), Some((1, 5)));
        assert_eq!(map.line_col("t.eh", 6), Some((2, 1)));
        assert_eq!(map.line_col("t.eh", 10), Some((2, 5)));
    }

    #[test]
    fn unknown_file_yields_none() {
        let map = SourceMap::new();
        assert_eq!(map.line_col("nope.eh", 0), None);
    }
}
