//! SQLite glue: scalar function adapters and raw collation callbacks.
//!
//! Scalar functions go through rusqlite's safe API. Collations are
//! registered with `sqlite3_create_collation_v2` directly so the callback
//! receives the raw `(len, ptr)` spans in the requested encoding, which the
//! safe `create_collation` wrapper would first force through `&str`.

use std::ffi::{CString, c_int, c_void};
use std::panic::{self, AssertUnwindSafe};
use std::ptr::NonNull;
use std::sync::Arc;

use rusqlite::functions::{Context, FunctionFlags};
use rusqlite::types::{Value, ValueRef};
use rusqlite::{Connection, ffi};
use sqlicu_error::{IcuError, Result};
use sqlicu_func::{BinaryCollation, CollationFunction, CollationSlot, ScalarFunction};
use sqlicu_types::SqliteValue;
use tracing::{debug, error, warn};

// ── Connection handle ────────────────────────────────────────────────────

/// Raw database handle held by the per-connection extension state.
///
/// It is passed to SQLite only in two places: from inside a SQL function
/// callback, which SQLite runs on the thread currently using the
/// connection, and from `IcuExtension::load_collation`, whose caller holds
/// a `&Connection` that compares equal to this handle. Anywhere else it is
/// an identity key and is never dereferenced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct DbHandle(NonNull<ffi::sqlite3>);

// SAFETY: moving the pointer between threads does not access the
// connection. Every dereference happens on a thread that is using the
// connection at that moment (see the type docs), and never after the
// extension has been marked closed.
unsafe impl Send for DbHandle {}
// SAFETY: shared references only copy the pointer value; see above.
unsafe impl Sync for DbHandle {}

impl DbHandle {
    pub(crate) fn of(conn: &Connection) -> Result<Self> {
        // SAFETY: reading the handle does not touch the connection.
        let raw = unsafe { conn.handle() };
        NonNull::new(raw)
            .map(Self)
            .ok_or_else(|| IcuError::internal("connection has no database handle"))
    }

    /// Stable identity of the connection while it is open.
    pub(crate) fn key(self) -> usize {
        self.0.as_ptr() as usize
    }
}

// ── Scalar functions ─────────────────────────────────────────────────────

/// A scalar function plus whatever must live exactly as long as SQLite's
/// registration of it.
struct ScalarAdapter<G> {
    function: Arc<dyn ScalarFunction>,
    _guard: Arc<G>,
}

impl<G> Clone for ScalarAdapter<G> {
    fn clone(&self) -> Self {
        Self {
            function: Arc::clone(&self.function),
            _guard: Arc::clone(&self._guard),
        }
    }
}

impl<G> ScalarAdapter<G> {
    fn call(&self, ctx: &Context<'_>) -> rusqlite::Result<Value> {
        let args: Vec<SqliteValue> = (0..ctx.len())
            .map(|i| from_value_ref(ctx.get_raw(i)))
            .collect();
        self.function
            .invoke(&args)
            .map(into_value)
            .map_err(|error| {
                debug!(function = self.function.name(), %error, "scalar function failed");
                rusqlite::Error::UserFunctionError(Box::new(error))
            })
    }
}

/// Register `function` under its name for every arity it accepts.
///
/// `guard` is dropped once SQLite has released every registered overload.
pub(crate) fn register_scalar<G>(
    conn: &Connection,
    function: Arc<dyn ScalarFunction>,
    guard: &Arc<G>,
) -> Result<()>
where
    G: Send + Sync + 'static,
{
    let mut flags = FunctionFlags::SQLITE_UTF8;
    if function.is_deterministic() {
        flags |= FunctionFlags::SQLITE_DETERMINISTIC;
    }
    let name = function.name();
    let adapter = ScalarAdapter {
        function,
        _guard: Arc::clone(guard),
    };

    for n_arg in adapter.function.min_args()..=adapter.function.num_args() {
        let adapter = AssertUnwindSafe(adapter.clone());
        conn.create_scalar_function(name, n_arg, flags, move |ctx| adapter.call(ctx))
            .map_err(|error| IcuError::Engine(error.to_string()))?;
        debug!(function = name, n_arg, "scalar function registered");
    }
    Ok(())
}

fn from_value_ref(value: ValueRef<'_>) -> SqliteValue {
    match value {
        ValueRef::Null => SqliteValue::Null,
        ValueRef::Integer(i) => SqliteValue::Integer(i),
        ValueRef::Real(f) => SqliteValue::Float(f),
        ValueRef::Text(bytes) => SqliteValue::Text(String::from_utf8_lossy(bytes).into_owned()),
        ValueRef::Blob(bytes) => SqliteValue::Blob(bytes.to_vec()),
    }
}

fn into_value(value: SqliteValue) -> Value {
    match value {
        SqliteValue::Null => Value::Null,
        SqliteValue::Integer(i) => Value::Integer(i),
        SqliteValue::Float(f) => Value::Real(f),
        SqliteValue::Text(s) => Value::Text(s),
        SqliteValue::Blob(b) => Value::Blob(b),
    }
}

// ── Collations ───────────────────────────────────────────────────────────

/// Register `slot` as a SQLite collation on `db`.
///
/// SQLite keeps a strong reference to the slot until it drops the
/// collation (connection close).
pub(crate) fn register_collation(db: DbHandle, slot: &Arc<CollationSlot>) -> Result<()> {
    let name = CString::new(slot.name()).map_err(|_| {
        IcuError::invalid_argument("icu_load_collation", "collation name contains a NUL byte")
    })?;
    let user_data = Box::into_raw(Box::new(Arc::clone(slot)));

    // SAFETY: callers pass the handle of an open connection they are using
    // on this thread (see `DbHandle`). `user_data` stays valid until
    // SQLite calls `destroy_slot`, or is reclaimed below on failure.
    let rc = unsafe {
        ffi::sqlite3_create_collation_v2(
            db.0.as_ptr(),
            name.as_ptr(),
            slot.encoding().sqlite_text_rep(),
            user_data.cast::<c_void>(),
            Some(compare_slot),
            Some(destroy_slot),
        )
    };

    if rc == ffi::SQLITE_OK {
        debug!(collation = slot.name(), encoding = %slot.encoding(), "sqlite collation registered");
        Ok(())
    } else {
        // xDestroy is not invoked when registration fails.
        // SAFETY: SQLite did not retain `user_data`.
        drop(unsafe { Box::from_raw(user_data) });
        warn!(collation = slot.name(), rc, "sqlite refused collation");
        Err(IcuError::CollationRegistration {
            name: slot.name().to_owned(),
            code: rc,
        })
    }
}

/// Borrow an engine span. Null or non-positive lengths are the empty span.
///
/// # Safety
///
/// `ptr` must point to at least `len` readable bytes that outlive `'a`.
unsafe fn span<'a>(ptr: *const c_void, len: c_int) -> &'a [u8] {
    match usize::try_from(len) {
        Ok(len) if len > 0 && !ptr.is_null() => {
            // SAFETY: guaranteed by the caller.
            unsafe { std::slice::from_raw_parts(ptr.cast::<u8>(), len) }
        }
        _ => &[],
    }
}

unsafe extern "C" fn compare_slot(
    arg: *mut c_void,
    left_len: c_int,
    left: *const c_void,
    right_len: c_int,
    right: *const c_void,
) -> c_int {
    // SAFETY: SQLite passes back the spans it owns for this call.
    let (left, right) = unsafe { (span(left, left_len), span(right, right_len)) };
    if arg.is_null() {
        return BinaryCollation.compare(left, right) as c_int;
    }
    // SAFETY: `arg` is the `Box<Arc<CollationSlot>>` leaked by
    // `register_collation`; SQLite keeps it alive until `destroy_slot`.
    let slot = unsafe { &*arg.cast::<Arc<CollationSlot>>() };

    // Unwinding into SQLite is undefined behavior.
    let ordering = panic::catch_unwind(AssertUnwindSafe(|| slot.compare(left, right)))
        .unwrap_or_else(|_| {
            error!(collation = slot.name(), "collation comparator panicked; using byte order");
            BinaryCollation.compare(left, right)
        });
    ordering as c_int
}

unsafe extern "C" fn destroy_slot(arg: *mut c_void) {
    if arg.is_null() {
        return;
    }
    // SAFETY: `arg` came from `Box::into_raw` in `register_collation` and
    // SQLite calls this exactly once.
    let slot = unsafe { Box::from_raw(arg.cast::<Arc<CollationSlot>>()) };
    debug!(collation = slot.name(), "sqlite collation released");
}
