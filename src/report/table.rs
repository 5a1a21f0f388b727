//! Bordered console tables, rendered whole or streamed row by row.

use std::io::{self, Write};

/// Horizontal alignment of a column's cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Align {
    Left,
    Right,
}

/// Minimum column widths and alignments. Presentation only.
#[derive(Debug, Clone)]
pub struct TableLayout {
    columns: Vec<(usize, Align)>,
}

impl TableLayout {
    pub fn new(columns: Vec<(usize, Align)>) -> Self {
        Self { columns }
    }

    pub fn columns(&self) -> usize {
        self.columns.len()
    }

    fn align(&self, index: usize) -> Align {
        self.columns
            .get(index)
            .map(|(_, align)| *align)
            .unwrap_or(Align::Left)
    }

    fn min_width(&self, index: usize) -> usize {
        self.columns.get(index).map(|(width, _)| *width).unwrap_or(0)
    }

    /// Column widths wide enough for every cell in `rows`.
    fn fit<S: AsRef<str>>(&self, rows: &[&[S]]) -> Vec<usize> {
        let count = rows
            .iter()
            .map(|row| row.len())
            .chain(std::iter::once(self.columns()))
            .max()
            .unwrap_or(0);
        (0..count)
            .map(|i| {
                rows.iter()
                    .filter_map(|row| row.get(i))
                    .map(|cell| cell.as_ref().chars().count())
                    .chain(std::iter::once(self.min_width(i)))
                    .max()
                    .unwrap_or(0)
            })
            .collect()
    }

    fn fixed_widths(&self) -> Vec<usize> {
        self.columns.iter().map(|(width, _)| *width).collect()
    }
}

fn border(widths: &[usize]) -> String {
    let mut line = String::from("+");
    for width in widths {
        line.push_str(&"-".repeat(width + 2));
        line.push('+');
    }
    line
}

fn line<S: AsRef<str>>(layout: &TableLayout, widths: &[usize], cells: &[S]) -> String {
    let mut line = String::from("|");
    for (i, width) in widths.iter().enumerate() {
        let cell = cells.get(i).map(|c| c.as_ref()).unwrap_or("");
        let padded = match layout.align(i) {
            Align::Left => format!(" {:<width$} ", cell, width = width),
            Align::Right => format!(" {:>width$} ", cell, width = width),
        };
        line.push_str(&padded);
        line.push('|');
    }
    line
}

/// Render a complete table, sizing every column to its widest cell.
pub fn render_table<H, S>(layout: &TableLayout, headers: &[H], rows: &[Vec<S>]) -> String
where
    H: AsRef<str>,
    S: AsRef<str>,
{
    let header_cells: Vec<&str> = headers.iter().map(|h| h.as_ref()).collect();
    let mut all: Vec<Vec<&str>> = vec![header_cells];
    all.extend(
        rows.iter()
            .map(|row| row.iter().map(|c| c.as_ref()).collect::<Vec<_>>()),
    );
    let slices: Vec<&[&str]> = all.iter().map(|row| row.as_slice()).collect();
    let widths = layout.fit(&slices);

    let rule = border(&widths);
    let mut out = Vec::with_capacity(rows.len() + 4);
    out.push(rule.clone());
    out.push(line(layout, &widths, &all[0]));
    out.push(rule.clone());
    for row in &all[1..] {
        out.push(line(layout, &widths, row));
    }
    out.push(rule);

    let mut text = out.join("\n");
    text.push('\n');
    text
}

// ---------------------------------------------------------------------------
// StreamingTable
// ---------------------------------------------------------------------------

/// Table that emits each row as soon as it is pushed.
///
/// Column widths come from the layout alone since later rows are unknown;
/// oversized cells widen their own line only.
pub struct StreamingTable<W: Write> {
    layout: TableLayout,
    widths: Vec<usize>,
    out: W,
}

impl<W: Write> StreamingTable<W> {
    pub fn new(layout: TableLayout, out: W) -> Self {
        let widths = layout.fixed_widths();
        Self {
            layout,
            widths,
            out,
        }
    }

    /// Write the top border, header line, and separator.
    pub fn write_header<H: AsRef<str>>(&mut self, headers: &[H]) -> io::Result<()> {
        let rule = border(&self.widths);
        writeln!(self.out, "{}", rule)?;
        writeln!(self.out, "{}", line(&self.layout, &self.widths, headers))?;
        writeln!(self.out, "{}", rule)?;
        self.out.flush()
    }

    /// Write one row and flush it through.
    pub fn push_row<S: AsRef<str>>(&mut self, row: &[S]) -> io::Result<()> {
        writeln!(self.out, "{}", line(&self.layout, &self.widths, row))?;
        self.out.flush()
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
