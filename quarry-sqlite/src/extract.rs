use libsqlite3_sys::*;
use quarry_core::{Error, Result, Value, format_timestamp};
use std::{
    ffi::{CStr, c_int},
    os::raw::{c_char, c_void},
};

pub(crate) fn extract_value(statement: *mut sqlite3_stmt, index: c_int) -> Result<Value> {
    unsafe {
        let column_type = sqlite3_column_type(statement, index);
        Ok(match column_type {
            SQLITE_NULL => Value::Null,
            SQLITE_INTEGER => Value::Int64(sqlite3_column_int64(statement, index)),
            SQLITE_FLOAT => Value::Float64(sqlite3_column_double(statement, index)),
            SQLITE_BLOB => {
                let ptr = sqlite3_column_blob(statement, index) as *const u8;
                let len = sqlite3_column_bytes(statement, index) as usize;
                if ptr.is_null() {
                    Value::Blob(Vec::new())
                } else {
                    Value::Blob(std::slice::from_raw_parts(ptr, len).to_vec())
                }
            }
            SQLITE_TEXT => {
                let ptr = sqlite3_column_text(statement, index);
                let len = sqlite3_column_bytes(statement, index) as usize;
                if ptr.is_null() {
                    Value::Varchar(String::new())
                } else {
                    let bytes = std::slice::from_raw_parts(ptr, len);
                    Value::Varchar(String::from_utf8_lossy(bytes).into_owned())
                }
            }
            _ => {
                return Err(Error::msg(format!(
                    "Unexpected column type {}",
                    column_type
                )));
            }
        })
    }
}

pub(crate) fn extract_name(statement: *mut sqlite3_stmt, index: c_int) -> Result<String> {
    unsafe {
        let name = sqlite3_column_name(statement, index);
        if name.is_null() {
            return Err(Error::msg(format!(
                "Could not read the name of column {}",
                index
            )));
        }
        Ok(CStr::from_ptr(name).to_str()?.into())
    }
}

/// Binds `value` to the 1-based parameter `index`.
pub(crate) fn bind_value(statement: *mut sqlite3_stmt, index: c_int, value: &Value) -> Result<()> {
    unsafe {
        let rc = match value {
            Value::Null => sqlite3_bind_null(statement, index),
            Value::Boolean(v) => sqlite3_bind_int(statement, index, *v as c_int),
            Value::Int64(v) => sqlite3_bind_int64(statement, index, *v),
            Value::UInt64(v) => {
                if *v as sqlite3_int64 as u64 != *v {
                    return Err(Error::msg(format!(
                        "Cannot bind u64 value `{}` into sqlite integer because it's out of bounds",
                        v
                    )));
                }
                sqlite3_bind_int64(statement, index, *v as sqlite3_int64)
            }
            Value::Float64(v) => sqlite3_bind_double(statement, index, *v),
            Value::Varchar(v) => bind_text(statement, index, v),
            Value::Blob(v) => sqlite3_bind_blob(
                statement,
                index,
                v.as_ptr() as *const c_void,
                v.len() as c_int,
                SQLITE_TRANSIENT(),
            ),
            Value::Timestamp(v) => {
                let v = format_timestamp(v)?;
                bind_text(statement, index, &v)
            }
        };
        if rc != SQLITE_OK {
            let error = Error::msg(format!(
                "Could not bind the {} value `{}` to parameter {}: {}",
                value.kind_name(),
                value,
                index,
                crate::error_message_from_ptr(&sqlite3_errmsg(sqlite3_db_handle(statement))),
            ));
            log::error!("{:#}", error);
            return Err(error);
        }
        Ok(())
    }
}

unsafe fn bind_text(statement: *mut sqlite3_stmt, index: c_int, value: &str) -> c_int {
    unsafe {
        sqlite3_bind_text(
            statement,
            index,
            value.as_ptr() as *const c_char,
            value.len() as c_int,
            SQLITE_TRANSIENT(),
        )
    }
}
