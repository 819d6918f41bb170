//! Optional diagnostic aid: associates each assembled instruction with the
//! source line(s) it came from, mirroring the teacher's own assembler
//! source map. Purely additive — nothing in the interpreter consumes it.

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SourceMapItem {
    pub start_line: u32,
    pub line_count: u32,
}

pub type SourceMap = Vec<SourceMapItem>;
