//! C surface over a process-wide handle registry.
//!
//! Every function returns a `Status`; results come back through out-pointers.
//! Absent keys are reported through flags (`found`, `existed`, `is_valid`),
//! never as a failing status.
//!
//! The registry lock only protects the registry itself. One map and its
//! cursors must still be used from one thread at a time, and `KvRecord::key`
//! is only valid until the map is mutated or the cursor is advanced or
//! destroyed.

use libc::{c_char, c_int, size_t};
use parking_lot::{const_mutex, Mutex};
use tracing::warn;

use crate::config::Config;
use crate::cursor::{Direction, Entry};
use crate::error::{Error, Result};
use crate::registry::{CursorHandle, MapHandle, Registry};

static REGISTRY: Mutex<Registry> = const_mutex(Registry::new());

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Ok = 0,
    InvalidHandle = 1,
    StaleHandle = 2,
    CursorMapMismatch = 3,
    KeyTooLong = 4,
    OutOfMemory = 5,
    NullPointer = 6,
    InvalidConfig = 7,
}

impl From<&Error> for Status {
    fn from(err: &Error) -> Self {
        match err {
            Error::InvalidHandle(_) => Status::InvalidHandle,
            Error::StaleHandle(_) => Status::StaleHandle,
            Error::CursorMapMismatch { .. } => Status::CursorMapMismatch,
            Error::KeyTooLong { .. } => Status::KeyTooLong,
            Error::OutOfMemory { .. } => Status::OutOfMemory,
            Error::NullPointer(_) => Status::NullPointer,
            Error::InvalidConfig(_) => Status::InvalidConfig,
        }
    }
}

/// One iteration result. `key` borrows map storage.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct KvRecord {
    pub key: *const u8,
    pub key_len: size_t,
    pub value: u64,
    pub is_valid: c_int,
}

impl KvRecord {
    pub const INVALID: KvRecord = KvRecord {
        key: std::ptr::null(),
        key_len: 0,
        value: 0,
        is_valid: 0,
    };
}

impl From<Option<Entry<'_>>> for KvRecord {
    fn from(entry: Option<Entry<'_>>) -> Self {
        match entry {
            Some(entry) => KvRecord {
                key: entry.key.as_ptr(),
                key_len: entry.key.len(),
                value: entry.value,
                is_valid: 1,
            },
            None => KvRecord::INVALID,
        }
    }
}

fn report(op: &'static str, result: Result<()>) -> Status {
    match result {
        Ok(()) => Status::Ok,
        Err(err) => {
            warn!(op, error = %err, "tagmap call rejected");
            Status::from(&err)
        }
    }
}

/// # Safety
/// When `key_len > 0`, `key` must point to `key_len` readable bytes.
unsafe fn key_slice<'a>(key: *const u8, key_len: size_t) -> Result<&'a [u8]> {
    if key_len == 0 {
        return Ok(&[]);
    }
    if key.is_null() {
        return Err(Error::NullPointer("key"));
    }
    // SAFETY: non-null, caller guarantees `key_len` readable bytes.
    Ok(unsafe { std::slice::from_raw_parts(key, key_len) })
}

/// # Safety
/// `ptr` must be null or valid for writes of `T`.
unsafe fn out_ref<'a, T>(ptr: *mut T, name: &'static str) -> Result<&'a mut T> {
    // SAFETY: caller guarantees validity when non-null.
    unsafe { ptr.as_mut() }.ok_or(Error::NullPointer(name))
}

/// Creates an empty map without a key length limit. Returns `0` on failure.
#[no_mangle]
pub extern "C" fn tagmap_create() -> u64 {
    match REGISTRY.lock().create_map() {
        Ok(map) => map.0,
        Err(err) => {
            warn!(op = "create", error = %err, "tagmap call rejected");
            0
        }
    }
}

/// Creates an empty map rejecting keys longer than `max_key_len`.
///
/// # Safety
/// `out_map` must be valid for writes.
#[no_mangle]
pub unsafe extern "C" fn tagmap_create_with_max_key_len(
    max_key_len: size_t,
    out_map: *mut u64,
) -> Status {
    let result = (|| -> Result<()> {
        let out_map = unsafe { out_ref(out_map, "out_map")? };
        let config = Config::default().with_max_key_len(max_key_len);
        *out_map = REGISTRY.lock().create_map_with_config(config)?.0;
        Ok(())
    })();
    report("create_with_max_key_len", result)
}

/// Destroys a map and all keys it holds. Cursors created from it must still be
/// destroyed separately.
#[no_mangle]
pub extern "C" fn tagmap_destroy(map: u64) -> Status {
    report("destroy", REGISTRY.lock().destroy_map(MapHandle(map)))
}

/// Stores `value` under `key`. Writes the previous value (or 0) to
/// `old_value` and whether the key existed to `existed`.
///
/// # Safety
/// `key` must point to `key_len` readable bytes; `old_value` and `existed`
/// must be valid for writes.
#[no_mangle]
pub unsafe extern "C" fn tagmap_put_new_and_get_old(
    map: u64,
    key: *const u8,
    key_len: size_t,
    value: u64,
    old_value: *mut u64,
    existed: *mut c_int,
) -> Status {
    let result = (|| -> Result<()> {
        let key = unsafe { key_slice(key, key_len)? };
        let old_value = unsafe { out_ref(old_value, "old_value")? };
        let existed = unsafe { out_ref(existed, "existed")? };
        let (old, was_present) = REGISTRY
            .lock()
            .put_new_and_get_old(MapHandle(map), key, value)?;
        *old_value = old;
        *existed = was_present as c_int;
        Ok(())
    })();
    report("put_new_and_get_old", result)
}

/// Inserts or overwrites.
///
/// # Safety
/// `key` must point to `key_len` readable bytes.
#[no_mangle]
pub unsafe extern "C" fn tagmap_set(
    map: u64,
    key: *const u8,
    key_len: size_t,
    value: u64,
) -> Status {
    let result = (|| -> Result<()> {
        let key = unsafe { key_slice(key, key_len)? };
        REGISTRY.lock().set(MapHandle(map), key, value)
    })();
    report("set", result)
}

/// Removes `key` if present.
///
/// # Safety
/// `key` must point to `key_len` readable bytes.
#[no_mangle]
pub unsafe extern "C" fn tagmap_erase(map: u64, key: *const u8, key_len: size_t) -> Status {
    let result = (|| -> Result<()> {
        let key = unsafe { key_slice(key, key_len)? };
        REGISTRY.lock().erase(MapHandle(map), key)
    })();
    report("erase", result)
}

/// Looks up `key`. Writes the value (or 0) to `value` and whether it was
/// found to `found`.
///
/// # Safety
/// `key` must point to `key_len` readable bytes; `value` and `found` must be
/// valid for writes.
#[no_mangle]
pub unsafe extern "C" fn tagmap_get(
    map: u64,
    key: *const u8,
    key_len: size_t,
    value: *mut u64,
    found: *mut c_int,
) -> Status {
    let result = (|| -> Result<()> {
        let key = unsafe { key_slice(key, key_len)? };
        let value = unsafe { out_ref(value, "value")? };
        let found = unsafe { out_ref(found, "found")? };
        let got = REGISTRY.lock().get(MapHandle(map), key)?;
        *value = got.unwrap_or(0);
        *found = got.is_some() as c_int;
        Ok(())
    })();
    report("get", result)
}

/// Creates a cursor at exactly `key`, or an exhausted cursor if absent.
///
/// # Safety
/// `key` must point to `key_len` readable bytes; `out_cursor` must be valid
/// for writes.
#[no_mangle]
pub unsafe extern "C" fn tagmap_seek(
    map: u64,
    key: *const u8,
    key_len: size_t,
    out_cursor: *mut u64,
) -> Status {
    let result = (|| -> Result<()> {
        let key = unsafe { key_slice(key, key_len)? };
        let out_cursor = unsafe { out_ref(out_cursor, "out_cursor")? };
        *out_cursor = REGISTRY.lock().seek(MapHandle(map), key)?.0;
        Ok(())
    })();
    report("seek", result)
}

/// Creates a cursor at the smallest key, or an exhausted cursor if the map
/// is empty.
///
/// # Safety
/// `out_cursor` must be valid for writes.
#[no_mangle]
pub unsafe extern "C" fn tagmap_seek_first(map: u64, out_cursor: *mut u64) -> Status {
    let result = (|| -> Result<()> {
        let out_cursor = unsafe { out_ref(out_cursor, "out_cursor")? };
        *out_cursor = REGISTRY.lock().seek_first(MapHandle(map))?.0;
        Ok(())
    })();
    report("seek_first", result)
}

unsafe fn cursor_step(
    op: &'static str,
    map: u64,
    cursor: u64,
    direction: Direction,
    out_record: *mut KvRecord,
) -> Status {
    let result = (|| -> Result<()> {
        let out_record = unsafe { out_ref(out_record, "out_record")? };
        *out_record = KvRecord::INVALID;
        let mut registry = REGISTRY.lock();
        let entry = registry.advance(MapHandle(map), CursorHandle(cursor), direction)?;
        *out_record = KvRecord::from(entry);
        Ok(())
    })();
    report(op, result)
}

/// Writes the entry under the cursor to `out_record`, then steps towards
/// larger keys.
///
/// # Safety
/// `out_record` must be valid for writes.
#[no_mangle]
pub unsafe extern "C" fn tagmap_cursor_next(
    map: u64,
    cursor: u64,
    out_record: *mut KvRecord,
) -> Status {
    unsafe { cursor_step("cursor_next", map, cursor, Direction::Forward, out_record) }
}

/// Writes the entry under the cursor to `out_record`, then steps towards
/// smaller keys.
///
/// # Safety
/// `out_record` must be valid for writes.
#[no_mangle]
pub unsafe extern "C" fn tagmap_cursor_prev(
    map: u64,
    cursor: u64,
    out_record: *mut KvRecord,
) -> Status {
    unsafe { cursor_step("cursor_prev", map, cursor, Direction::Backward, out_record) }
}

#[no_mangle]
pub extern "C" fn tagmap_cursor_destroy(cursor: u64) -> Status {
    report(
        "cursor_destroy",
        REGISTRY.lock().destroy_cursor(CursorHandle(cursor)),
    )
}

/// Static, NUL-terminated description of a status code.
#[no_mangle]
pub extern "C" fn tagmap_status_message(status: c_int) -> *const c_char {
    let msg: &'static [u8] = match status {
        0 => b"ok\0",
        1 => b"invalid handle\0",
        2 => b"stale handle\0",
        3 => b"cursor belongs to a different map\0",
        4 => b"key too long\0",
        5 => b"out of memory\0",
        6 => b"null pointer\0",
        7 => b"invalid configuration\0",
        _ => b"unknown status\0",
    };
    msg.as_ptr().cast()
}
