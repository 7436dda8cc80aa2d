//! Deterministic JSON output
//!
//! Produces the same bytes Python's `json.dump` writes with the default
//! `ensure_ascii=True`: `", "`/`": "` separators on a single line, or one
//! item per line when an indent is given.

use std::io;

use serde::Serialize;
use serde_json::ser::Formatter;

/// `serde_json` formatter matching Python's `json` module layout
#[derive(Debug, Clone)]
pub struct PyFormatter {
    indent: Option<Vec<u8>>,
    level: usize,
    has_value: bool,
}

impl PyFormatter {
    /// `None` for a single line, `Some(n)` for `n`-space indentation
    pub fn new(indent: Option<usize>) -> Self {
        Self {
            indent: indent.map(|n| vec![b' '; n]),
            level: 0,
            has_value: false,
        }
    }

    fn newline<W: ?Sized + io::Write>(&self, writer: &mut W) -> io::Result<()> {
        if let Some(indent) = &self.indent {
            writer.write_all(b"\n")?;
            for _ in 0..self.level {
                writer.write_all(indent)?;
            }
        }
        Ok(())
    }

    fn begin_item<W: ?Sized + io::Write>(&self, writer: &mut W, first: bool) -> io::Result<()> {
        if self.indent.is_some() {
            if !first {
                writer.write_all(b",")?;
            }
            self.newline(writer)
        } else if first {
            Ok(())
        } else {
            writer.write_all(b", ")
        }
    }

    fn end_container<W: ?Sized + io::Write>(
        &mut self,
        writer: &mut W,
        close: &[u8],
    ) -> io::Result<()> {
        self.level -= 1;
        if self.has_value {
            self.newline(writer)?;
        }
        writer.write_all(close)
    }
}

impl Formatter for PyFormatter {
    fn begin_array<W: ?Sized + io::Write>(&mut self, writer: &mut W) -> io::Result<()> {
        self.level += 1;
        self.has_value = false;
        writer.write_all(b"[")
    }

    fn end_array<W: ?Sized + io::Write>(&mut self, writer: &mut W) -> io::Result<()> {
        self.end_container(writer, b"]")
    }

    fn begin_array_value<W: ?Sized + io::Write>(
        &mut self,
        writer: &mut W,
        first: bool,
    ) -> io::Result<()> {
        self.begin_item(writer, first)
    }

    fn end_array_value<W: ?Sized + io::Write>(&mut self, _writer: &mut W) -> io::Result<()> {
        self.has_value = true;
        Ok(())
    }

    fn begin_object<W: ?Sized + io::Write>(&mut self, writer: &mut W) -> io::Result<()> {
        self.level += 1;
        self.has_value = false;
        writer.write_all(b"{")
    }

    fn end_object<W: ?Sized + io::Write>(&mut self, writer: &mut W) -> io::Result<()> {
        self.end_container(writer, b"}")
    }

    fn begin_object_key<W: ?Sized + io::Write>(
        &mut self,
        writer: &mut W,
        first: bool,
    ) -> io::Result<()> {
        self.begin_item(writer, first)
    }

    fn begin_object_value<W: ?Sized + io::Write>(&mut self, writer: &mut W) -> io::Result<()> {
        writer.write_all(b": ")
    }

    fn end_object_value<W: ?Sized + io::Write>(&mut self, _writer: &mut W) -> io::Result<()> {
        self.has_value = true;
        Ok(())
    }

    // Everything outside printable ASCII is written as \uXXXX
    fn write_string_fragment<W: ?Sized + io::Write>(
        &mut self,
        writer: &mut W,
        fragment: &str,
    ) -> io::Result<()> {
        let mut start = 0;
        for (i, c) in fragment.char_indices() {
            if (' '..='~').contains(&c) {
                continue;
            }
            writer.write_all(&fragment.as_bytes()[start..i])?;
            let mut units = [0u16; 2];
            for unit in c.encode_utf16(&mut units) {
                write!(writer, "\\u{unit:04x}")?;
            }
            start = i + c.len_utf8();
        }
        writer.write_all(&fragment.as_bytes()[start..])
    }
}

/// Serialize `value` the way Python's `json.dumps(value, indent=indent)` does
pub fn to_string<T: Serialize + ?Sized>(
    value: &T,
    indent: Option<usize>,
) -> Result<String, serde_json::Error> {
    let mut out = Vec::new();
    let mut serializer = serde_json::Serializer::with_formatter(&mut out, PyFormatter::new(indent));
    value.serialize(&mut serializer)?;
    // The formatter only ever writes ASCII
    Ok(String::from_utf8_lossy(&out).into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_single_line_separators() {
        let value = json!({"a": [1, 2], "b": {}, "c": [], "d": "x"});
        assert_eq!(
            to_string(&value, None).unwrap(),
            r#"{"a": [1, 2], "b": {}, "c": [], "d": "x"}"#
        );
    }

    #[test]
    fn test_indented_layout() {
        let value = json!({"a": [1, {"b": true}], "c": []});
        assert_eq!(
            to_string(&value, Some(2)).unwrap(),
            "{\n  \"a\": [\n    1,\n    {\n      \"b\": true\n    }\n  ],\n  \"c\": []\n}"
        );
    }

    #[test]
    fn test_zero_indent_still_breaks_lines() {
        let value = json!({"a": 1, "b": 2});
        assert_eq!(to_string(&value, Some(0)).unwrap(), "{\n\"a\": 1,\n\"b\": 2\n}");
    }

    #[test]
    fn test_ascii_escaping() {
        let value = json!(["caf\u{e9}", "\u{1f600}", "tab\there", "quote\"", "del\u{7f}"]);
        assert_eq!(
            to_string(&value, None).unwrap(),
            r#"["caf\u00e9", "\ud83d\ude00", "tab\there", "quote\"", "del\u007f"]"#
        );
    }
}
