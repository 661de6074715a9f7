//! Installing the extension into a connection.
//!
//! [`install`] registers `icu_version`, `icu_load_collation` and (unless
//! disabled) `icu_lower`/`icu_upper` on a connection. Each connection gets
//! its own [`IcuExtension`]: a comparator cache and a collation registry.
//!
//! Installation is idempotent per connection. Teardown is driven by SQLite:
//! every registered function holds the connection's [`Teardown`] guard, and
//! SQLite drops those closures when the connection closes.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, LazyLock, Weak};

use parking_lot::Mutex;
use rusqlite::Connection;
use sqlicu_error::{IcuError, Result};
use sqlicu_ext_icu::{
    CollatorCache, CollatorKey, IcuLowerFunc, IcuRules, IcuUpperFunc, IcuVersionFunc, LocaleRules,
};
use sqlicu_func::scalar::{check_arity, required_text};
use sqlicu_func::{BindOutcome, Binding, CollationRegistry, ScalarFunction};
use sqlicu_types::{CollationStrength, SqliteValue};
use tracing::{debug, info, warn};

use crate::config::ExtensionConfig;
use crate::engine::{self, DbHandle};

/// Installed extensions by connection handle.
static INSTALLED: LazyLock<Mutex<HashMap<usize, Weak<IcuExtension>>>> =
    LazyLock::new(|| Mutex::new(HashMap::new()));

/// Per-connection extension state.
pub struct IcuExtension {
    config: ExtensionConfig,
    cache: CollatorCache,
    registry: CollationRegistry,
    db: DbHandle,
    closed: AtomicBool,
}

impl std::fmt::Debug for IcuExtension {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IcuExtension")
            .field("config", &self.config)
            .field("cache", &self.cache)
            .field("collations", &self.registry.names())
            .finish_non_exhaustive()
    }
}

impl IcuExtension {
    fn new(config: ExtensionConfig, rules: Arc<dyn LocaleRules>, db: DbHandle) -> Self {
        let registry = CollationRegistry::new(config.text_encoding);
        Self {
            config,
            cache: CollatorCache::new(rules),
            registry,
            db,
            closed: AtomicBool::new(false),
        }
    }

    #[must_use]
    pub const fn config(&self) -> &ExtensionConfig {
        &self.config
    }

    #[must_use]
    pub const fn cache(&self) -> &CollatorCache {
        &self.cache
    }

    #[must_use]
    pub const fn registry(&self) -> &CollationRegistry {
        &self.registry
    }

    /// Current binding of collation `name`, if any.
    #[must_use]
    pub fn binding(&self, name: &str) -> Option<Arc<Binding>> {
        self.registry.binding(name)
    }

    /// Whether the owning connection has been closed.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Bind collation `name` on `conn` to the comparator for `locale`.
    ///
    /// `conn` must be the connection this state was installed on.
    /// `strength` defaults to the configured one. A new name is registered
    /// with SQLite; an existing one is rebound in place and keeps working
    /// for statements already running.
    ///
    /// # Errors
    ///
    /// - [`IcuError::Misuse`] if the extension's connection has closed or
    ///   `conn` is a different connection.
    /// - [`IcuError::LocaleUnavailable`] for an unknown locale. Any previous
    ///   binding of `name` is untouched.
    /// - [`IcuError::CollationRegistration`] if SQLite refuses the name.
    pub fn load_collation(
        &self,
        conn: &Connection,
        locale: &str,
        name: &str,
        strength: Option<CollationStrength>,
    ) -> Result<BindOutcome> {
        // Checked first: a closed handle's address may be reused by `conn`.
        self.ensure_open()?;
        if DbHandle::of(conn)? != self.db {
            return Err(IcuError::misuse(
                "collation loaded through a connection the extension is not installed on",
            ));
        }
        self.load(locale, name, strength)
    }

    /// Callers are on a thread currently using the connection: either they
    /// hold its `&Connection`, or they run inside one of its SQL functions.
    fn load(
        &self,
        locale: &str,
        name: &str,
        strength: Option<CollationStrength>,
    ) -> Result<BindOutcome> {
        self.ensure_open()?;
        let key = CollatorKey::new(locale, strength.unwrap_or(self.config.default_strength));
        let comparator = self.cache.get_or_create(&key).inspect_err(|error| {
            warn!(collation = name, key = %key, %error, "collation load rejected");
        })?;
        self.registry
            .bind(name, &comparator, |slot| engine::register_collation(self.db, slot))
    }

    fn ensure_open(&self) -> Result<()> {
        if self.is_closed() {
            return Err(IcuError::misuse("connection closed"));
        }
        Ok(())
    }

    fn teardown(&self) {
        self.closed.store(true, Ordering::Release);
        let unbound = self.registry.unbind_all();
        let released = self.cache.release_all();
        info!(collations = unbound, comparators = released, "icu extension torn down");
    }
}

/// Runs connection teardown when SQLite drops the last function closure.
struct Teardown {
    extension: Arc<IcuExtension>,
}

impl Drop for Teardown {
    fn drop(&mut self) {
        self.extension.teardown();
        let key = self.extension.db.key();
        let mut installed = INSTALLED.lock();
        let ours = installed
            .get(&key)
            .is_some_and(|weak| std::ptr::eq(weak.as_ptr(), Arc::as_ptr(&self.extension)));
        if ours {
            installed.remove(&key);
        }
    }
}

/// `icu_load_collation(locale, name [, strength])`.
struct LoadCollationFunc {
    extension: Arc<IcuExtension>,
}

impl ScalarFunction for LoadCollationFunc {
    fn invoke(&self, args: &[SqliteValue]) -> Result<SqliteValue> {
        check_arity(self, args)?;
        let locale = required_text(self.name(), args, 0, "locale")?;
        let name = required_text(self.name(), args, 1, "collation name")?;
        let strength = if args.len() > 2 {
            Some(required_text(self.name(), args, 2, "strength")?.parse()?)
        } else {
            None
        };
        self.extension.load(&locale, &name, strength)?;
        Ok(SqliteValue::Integer(1))
    }

    fn num_args(&self) -> i32 {
        3
    }

    fn min_args(&self) -> i32 {
        2
    }

    fn name(&self) -> &'static str {
        "icu_load_collation"
    }

    fn is_deterministic(&self) -> bool {
        false
    }
}

/// Install the extension with [`ExtensionConfig::default`].
///
/// # Errors
///
/// See [`install_with_rules`].
pub fn install(conn: &Connection) -> Result<Arc<IcuExtension>> {
    install_with(conn, ExtensionConfig::default())
}

/// Install the extension with `config` and ICU4X locale rules.
///
/// # Errors
///
/// See [`install_with_rules`].
pub fn install_with(conn: &Connection, config: ExtensionConfig) -> Result<Arc<IcuExtension>> {
    install_with_rules(conn, config, Arc::new(IcuRules))
}

/// Install the extension with `config`, building comparators via `rules`.
///
/// If the connection already has the extension, the existing state is
/// returned and `config` is ignored.
///
/// # Errors
///
/// Returns an error if a preloaded collation cannot be loaded or SQLite
/// rejects a function registration.
pub fn install_with_rules(
    conn: &Connection,
    config: ExtensionConfig,
    rules: Arc<dyn LocaleRules>,
) -> Result<Arc<IcuExtension>> {
    let db = DbHandle::of(conn)?;
    if let Some(existing) = INSTALLED.lock().get(&db.key()).and_then(Weak::upgrade) {
        debug!(connection = db.key(), "icu extension already installed");
        return Ok(existing);
    }

    let extension = Arc::new(IcuExtension::new(config, rules, db));
    for spec in &extension.config.preload {
        extension.load_collation(conn, &spec.locale, &spec.name, spec.strength)?;
    }

    let teardown = Arc::new(Teardown {
        extension: Arc::clone(&extension),
    });
    let mut functions: Vec<Arc<dyn ScalarFunction>> = vec![
        Arc::new(IcuVersionFunc),
        Arc::new(LoadCollationFunc {
            extension: Arc::clone(&extension),
        }),
    ];
    if extension.config.case_mapping {
        functions.push(Arc::new(IcuLowerFunc));
        functions.push(Arc::new(IcuUpperFunc));
    }
    for function in functions {
        engine::register_scalar(conn, function, &teardown)?;
    }

    INSTALLED
        .lock()
        .insert(db.key(), Arc::downgrade(&extension));
    info!(
        connection = db.key(),
        strength = %extension.config.default_strength,
        encoding = %extension.config.text_encoding,
        preloaded = extension.config.preload.len(),
        "icu extension installed"
    );
    Ok(extension)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_install_is_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        let first = install(&conn).unwrap();
        let second = install(&conn).unwrap();
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[test]
    fn test_separate_connections_get_separate_state() {
        let a = Connection::open_in_memory().unwrap();
        let b = Connection::open_in_memory().unwrap();
        let ext_a = install(&a).unwrap();
        let ext_b = install(&b).unwrap();
        assert!(!Arc::ptr_eq(&ext_a, &ext_b));
        ext_a.load_collation(&a, "en_US", "english", None).unwrap();
        assert!(ext_a.registry().contains("english"));
        assert!(!ext_b.registry().contains("english"));
    }

    #[test]
    fn test_load_through_other_connection_is_rejected() {
        let conn = Connection::open_in_memory().unwrap();
        let other = Connection::open_in_memory().unwrap();
        let ext = install(&conn).unwrap();
        assert!(matches!(
            ext.load_collation(&other, "en_US", "english", None),
            Err(IcuError::Misuse(_))
        ));
        assert!(ext.registry().is_empty());
        assert_eq!(ext.cache().constructed(), 0);
        assert!(other.prepare("SELECT 'a' COLLATE english").is_err());
    }

    #[test]
    fn test_close_tears_down() {
        let conn = Connection::open_in_memory().unwrap();
        let ext = install(&conn).unwrap();
        ext.load_collation(&conn, "en_US", "english", None).unwrap();
        let key = ext.db.key();
        assert_eq!(ext.cache().len(), 1);
        assert!(!ext.is_closed());

        drop(conn);

        assert!(ext.is_closed());
        assert!(ext.registry().is_empty());
        assert!(ext.cache().is_empty());
        assert!(!INSTALLED.lock().contains_key(&key));
    }

    #[test]
    fn test_load_after_close_fails_without_side_effects() {
        let conn = Connection::open_in_memory().unwrap();
        let ext = install(&conn).unwrap();
        ext.load_collation(&conn, "en_US", "english", None).unwrap();
        let key = ext.db.key();
        let constructed = ext.cache().constructed();
        drop(conn);

        // A fresh connection may be allocated at the closed one's address.
        let other = Connection::open_in_memory().unwrap();
        assert!(matches!(
            ext.load_collation(&other, "de_DE", "after_close", None),
            Err(IcuError::Misuse(_))
        ));
        assert!(matches!(
            ext.load("de_DE", "after_close", None),
            Err(IcuError::Misuse(_))
        ));

        assert!(ext.registry().is_empty());
        assert!(ext.cache().is_empty());
        assert_eq!(ext.cache().constructed(), constructed);
        assert!(!INSTALLED.lock().contains_key(&key));
        assert!(other.prepare("SELECT 'a' COLLATE after_close").is_err());
    }

    #[test]
    fn test_load_collation_outcomes() {
        let conn = Connection::open_in_memory().unwrap();
        let ext = install(&conn).unwrap();
        assert_eq!(
            ext.load_collation(&conn, "en_US", "english", None).unwrap(),
            BindOutcome::Created
        );
        assert_eq!(
            ext.load_collation(&conn, "de_DE", "english", Some(CollationStrength::Primary))
                .unwrap(),
            BindOutcome::Rebound
        );
        assert_eq!(ext.binding("ENGLISH").unwrap().locale(), "de_DE");
        assert!(matches!(
            ext.load_collation(&conn, "not_a_real_locale", "english", None),
            Err(IcuError::LocaleUnavailable { .. })
        ));
        assert_eq!(ext.binding("english").unwrap().locale(), "de_DE");
    }

    #[test]
    fn test_failed_preload_fails_install() {
        let conn = Connection::open_in_memory().unwrap();
        let config = ExtensionConfig {
            preload: vec![crate::config::CollationSpec::new("not_a_real_locale", "x")],
            ..ExtensionConfig::default()
        };
        assert!(install_with(&conn, config).is_err());
        // Nothing was recorded, so a clean install still works.
        let ext = install(&conn).unwrap();
        assert!(ext.registry().is_empty());
    }
}
