//! Source positions for diagnostics.
//!
//! Instructions may carry a `src_pos` field: an object with `src_name`,
//! `line_no` and `col_no`. It is only ever read when formatting an error or
//! an abort message.

use crate::value::Value;
use std::fmt;

/// A source position, formatted as `name@line:col`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SrcPos {
    pub src_name: String,
    pub line_no: i64,
    pub col_no: i64,
}

impl SrcPos {
    /// Extract a position from a `src_pos` object value.
    ///
    /// Returns `None` when the value is not an object or any field is
    /// missing or mistyped; a malformed position never masks the error it
    /// was meant to locate.
    #[must_use]
    pub fn from_value(val: &Value) -> Option<SrcPos> {
        let obj = val.as_object()?;
        let src_name = obj.get_field("src_name")?.as_str()?.to_string_lossy().into_owned();
        let line_no = obj.get_field("line_no")?.as_int64()?;
        let col_no = obj.get_field("col_no")?.as_int64()?;
        Some(SrcPos {
            src_name,
            line_no,
            col_no,
        })
    }
}

impl fmt::Display for SrcPos {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}:{}", self.src_name, self.line_no, self.col_no)
    }
}
