use crate::Result;
use anyhow::Context;
use std::{borrow::Cow, ffi::CString};

/// Calls `f` for every value, writing `separator` between the ones that produced output.
pub fn separated_by<T, F>(
    out: &mut String,
    values: impl IntoIterator<Item = T>,
    mut f: F,
    separator: &str,
) where
    F: FnMut(&mut String, T),
{
    let mut len = out.len();
    for v in values {
        if out.len() > len {
            out.push_str(separator);
        }
        len = out.len();
        f(out, v);
    }
}

pub fn as_c_string<S: Into<Vec<u8>>>(value: S) -> Result<CString> {
    CString::new(value.into()).context("the text contains an interior nul byte")
}

#[macro_export]
macro_rules! possibly_parenthesized {
    ($buff:expr, $cond:expr, $v:expr) => {
        if $cond {
            $buff.write_char('(');
            $v;
            $buff.write_char(')');
        } else {
            $v;
        }
    };
}

/// Statement text shortened for log lines.
pub fn truncate_long(query: &str) -> Cow<'_, str> {
    const MAX: usize = 497;
    if query.len() <= MAX {
        return Cow::Borrowed(query);
    }
    let mut end = MAX;
    while !query.is_char_boundary(end) {
        end -= 1;
    }
    Cow::Owned(format!("{}...", query[..end].trim_end()))
}
