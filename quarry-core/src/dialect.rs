use crate::{AsValue, Naming, OrmError, Result, SqlContext, Value};
use std::{
    collections::HashMap,
    fmt::Write,
    sync::{Arc, LazyLock, PoisonError, RwLock},
};

/// Row count MySQL accepts as "no limit" when only an offset is requested.
pub const MYSQL_UNLIMITED: u64 = 18446744073709551615;

/// Identifier quoting rule: every dot separated segment is wrapped independently.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Quoter {
    pub prefix: &'static str,
    pub suffix: &'static str,
}

impl Quoter {
    pub const NO_QUOTES: Quoter = Quoter::new("", "");
    pub const DOUBLE_QUOTES: Quoter = Quoter::new("\"", "\"");
    pub const SINGLE_QUOTES: Quoter = Quoter::new("'", "'");
    pub const BRACKETS: Quoter = Quoter::new("[", "]");
    pub const BACKTICKS: Quoter = Quoter::new("`", "`");

    pub const fn new(prefix: &'static str, suffix: &'static str) -> Self {
        Self { prefix, suffix }
    }

    pub fn quote(&self, identifier: &str) -> String {
        let mut out = String::with_capacity(identifier.len() + 8);
        self.write(&mut out, identifier);
        out
    }

    /// Segments that are already quoted are copied unchanged.
    pub fn write(&self, out: &mut String, identifier: &str) {
        for (i, segment) in identifier.split('.').enumerate() {
            if i > 0 {
                out.push('.');
            }
            if self.is_quoted(segment) {
                out.push_str(segment);
            } else {
                out.push_str(self.prefix);
                out.push_str(segment);
                out.push_str(self.suffix);
            }
        }
    }

    fn is_quoted(&self, segment: &str) -> bool {
        !self.prefix.is_empty()
            && segment.len() >= self.prefix.len() + self.suffix.len()
            && segment.starts_with(self.prefix)
            && segment.ends_with(self.suffix)
    }
}

/// Placeholder syntax, rendered from the 1-based argument index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placeholder {
    /// `?`
    QuestionMark,
    /// `$1`
    Dollar,
    /// `:1`
    Colon,
    /// `@p1`
    AtP,
}

impl Placeholder {
    pub fn render(&self, index: u64) -> String {
        let mut out = String::new();
        self.write(&mut out, index);
        out
    }

    pub fn write(&self, out: &mut String, index: u64) {
        let _ = match self {
            Placeholder::QuestionMark => {
                out.push('?');
                Ok(())
            }
            Placeholder::Dollar => write!(out, "${index}"),
            Placeholder::Colon => write!(out, ":{index}"),
            Placeholder::AtP => write!(out, "@p{index}"),
        };
    }
}

/// How the key generated by an insert is read back.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GeneratedKey {
    /// The insert carries a `returning` clause and is run as a query.
    Returning,
    /// A scalar select is appended to the insert and the batch is run as a query. Only
    /// integer keys can be recovered this way, string keys are never read back.
    TrailingSelect,
    /// The executor reports the last inserted id.
    LastInsertId,
}

/// Everything that changes between database families.
///
/// Only the three first methods are required, the rest have defaults for engines
/// accepting `limit ? offset ?` pagination and reporting the last inserted id.
pub trait Dialect: Send + Sync {
    fn quoter(&self) -> Quoter;
    fn placeholder(&self) -> Placeholder;
    fn naming(&self) -> Naming;

    fn name(&self) -> &'static str {
        "custom"
    }

    fn quote(&self, identifier: &str) -> String {
        self.quoter().quote(identifier)
    }

    fn render_placeholder(&self, index: u64) -> String {
        self.placeholder().render(index)
    }

    fn write_pagination(
        &self,
        context: &mut SqlContext,
        order_by: &[String],
        limit: u64,
        offset: u64,
    ) {
        context.write_order_by(order_by);
        context.write_limit_offset(limit, offset);
    }

    fn generated_key(&self) -> GeneratedKey {
        GeneratedKey::LastInsertId
    }

    /// Text appended to an insert to read back the generated key, used by
    /// [`GeneratedKey::Returning`] and [`GeneratedKey::TrailingSelect`].
    fn write_generated_key(&self, _context: &mut SqlContext, _column: &str) {}

    /// Completes `insert into <table>` when there is no column to write.
    fn write_default_values(&self, context: &mut SqlContext) {
        context.write_str(" default values");
    }

    fn write_transaction_begin(&self, out: &mut String) {
        out.push_str("BEGIN");
    }

    fn write_transaction_commit(&self, out: &mut String) {
        out.push_str("COMMIT");
    }

    fn write_transaction_rollback(&self, out: &mut String) {
        out.push_str("ROLLBACK");
    }
}

/// Dialect assembled from its three basic rules.
#[derive(Debug, Clone, Copy)]
pub struct CustomDialect {
    pub naming: Naming,
    pub placeholder: Placeholder,
    pub quoter: Quoter,
}

impl Dialect for CustomDialect {
    fn quoter(&self) -> Quoter {
        self.quoter
    }
    fn placeholder(&self) -> Placeholder {
        self.placeholder
    }
    fn naming(&self) -> Naming {
        self.naming
    }
}

/// Fallback for drivers without a registered dialect: no quoting, `?` placeholders.
#[derive(Debug, Default, Clone, Copy)]
pub struct GenericDialect;

impl Dialect for GenericDialect {
    fn quoter(&self) -> Quoter {
        Quoter::NO_QUOTES
    }
    fn placeholder(&self) -> Placeholder {
        Placeholder::QuestionMark
    }
    fn naming(&self) -> Naming {
        Naming::Snake
    }
    fn name(&self) -> &'static str {
        "generic"
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct MySqlDialect;

impl Dialect for MySqlDialect {
    fn quoter(&self) -> Quoter {
        Quoter::BACKTICKS
    }
    fn placeholder(&self) -> Placeholder {
        Placeholder::QuestionMark
    }
    fn naming(&self) -> Naming {
        Naming::Snake
    }
    fn name(&self) -> &'static str {
        "mysql"
    }

    fn write_pagination(
        &self,
        context: &mut SqlContext,
        order_by: &[String],
        limit: u64,
        offset: u64,
    ) {
        let limit = if limit == 0 && offset > 0 {
            MYSQL_UNLIMITED
        } else {
            limit
        };
        context.write_order_by(order_by);
        context.write_limit_offset(limit, offset);
    }

    fn write_default_values(&self, context: &mut SqlContext) {
        context.write_str(" () values ()");
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SqliteDialect;

impl Dialect for SqliteDialect {
    fn quoter(&self) -> Quoter {
        Quoter::BACKTICKS
    }
    fn placeholder(&self) -> Placeholder {
        Placeholder::QuestionMark
    }
    fn naming(&self) -> Naming {
        Naming::Snake
    }
    fn name(&self) -> &'static str {
        "sqlite"
    }

    fn write_pagination(
        &self,
        context: &mut SqlContext,
        order_by: &[String],
        limit: u64,
        offset: u64,
    ) {
        context.write_order_by(order_by);
        if limit == 0 && offset > 0 {
            // Sqlite rejects an offset without a limit, -1 means no limit
            context
                .write_str(" limit ")
                .next_placeholder(Value::Int64(-1));
        }
        context.write_limit_offset(limit, offset);
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct PostgresDialect;

impl Dialect for PostgresDialect {
    fn quoter(&self) -> Quoter {
        Quoter::DOUBLE_QUOTES
    }
    fn placeholder(&self) -> Placeholder {
        Placeholder::Dollar
    }
    fn naming(&self) -> Naming {
        Naming::Snake
    }
    fn name(&self) -> &'static str {
        "postgres"
    }

    fn generated_key(&self) -> GeneratedKey {
        GeneratedKey::Returning
    }

    fn write_generated_key(&self, context: &mut SqlContext, column: &str) {
        context.write_str(" returning ").write_quoted(column);
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SqlServerDialect;

impl Dialect for SqlServerDialect {
    fn quoter(&self) -> Quoter {
        Quoter::BRACKETS
    }
    fn placeholder(&self) -> Placeholder {
        Placeholder::AtP
    }
    fn naming(&self) -> Naming {
        Naming::Snake
    }
    fn name(&self) -> &'static str {
        "sqlserver"
    }

    fn write_pagination(
        &self,
        context: &mut SqlContext,
        order_by: &[String],
        limit: u64,
        offset: u64,
    ) {
        if limit == 0 && offset == 0 {
            context.write_order_by(order_by);
            return;
        }
        if order_by.is_empty() {
            context.write_str(" order by 1");
        } else {
            context.write_order_by(order_by);
        }
        // `fetch next` is only valid after an `offset` clause
        context
            .write_str(" offset ")
            .next_placeholder(offset.as_value())
            .write_str(" rows");
        if limit > 0 {
            context
                .write_str(" fetch next ")
                .next_placeholder(limit.as_value())
                .write_str(" rows only");
        }
    }

    fn generated_key(&self) -> GeneratedKey {
        GeneratedKey::TrailingSelect
    }

    fn write_generated_key(&self, context: &mut SqlContext, _column: &str) {
        context.write_str("; select last_id = convert(bigint, SCOPE_IDENTITY())");
    }

    fn write_transaction_begin(&self, out: &mut String) {
        out.push_str("BEGIN TRANSACTION");
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct OracleDialect;

impl Dialect for OracleDialect {
    fn quoter(&self) -> Quoter {
        Quoter::DOUBLE_QUOTES
    }
    fn placeholder(&self) -> Placeholder {
        Placeholder::Colon
    }
    fn naming(&self) -> Naming {
        Naming::UpperSnake
    }
    fn name(&self) -> &'static str {
        "oracle"
    }

    fn write_pagination(
        &self,
        context: &mut SqlContext,
        order_by: &[String],
        limit: u64,
        offset: u64,
    ) {
        context.write_order_by(order_by);
        context.write_offset_fetch(limit, offset);
    }
}

static DIALECTS: LazyLock<RwLock<HashMap<String, Arc<dyn Dialect>>>> = LazyLock::new(|| {
    let mysql: Arc<dyn Dialect> = Arc::new(MySqlDialect);
    let sqlite: Arc<dyn Dialect> = Arc::new(SqliteDialect);
    let postgres: Arc<dyn Dialect> = Arc::new(PostgresDialect);
    let sqlserver: Arc<dyn Dialect> = Arc::new(SqlServerDialect);
    let oracle: Arc<dyn Dialect> = Arc::new(OracleDialect);
    RwLock::new(HashMap::from([
        ("sqlite".to_string(), sqlite.clone()),
        ("sqlite3".to_string(), sqlite),
        ("mysql".to_string(), mysql),
        ("oracle".to_string(), oracle.clone()),
        ("oci8".to_string(), oracle),
        ("pgx".to_string(), postgres.clone()),
        ("postgres".to_string(), postgres),
        ("mssql".to_string(), sqlserver.clone()),
        ("sqlserver".to_string(), sqlserver),
    ]))
});

/// Dialect registered for `driver`, or [`GenericDialect`] when there is none.
pub fn dialect_for(driver: &str) -> Arc<dyn Dialect> {
    DIALECTS
        .read()
        .unwrap_or_else(PoisonError::into_inner)
        .get(driver)
        .cloned()
        .unwrap_or_else(|| Arc::new(GenericDialect))
}

/// Binds a dialect to a driver name. Names already bound, built-in ones included, are
/// rejected with [`OrmError::AlreadyRegistered`].
pub fn register_dialect(driver: impl Into<String>, dialect: Arc<dyn Dialect>) -> Result<()> {
    let driver = driver.into();
    let mut dialects = DIALECTS.write().unwrap_or_else(PoisonError::into_inner);
    if dialects.contains_key(&driver) {
        let error = OrmError::AlreadyRegistered(driver);
        log::error!("{}", error);
        return Err(error.into());
    }
    log::debug!("Registered dialect `{}` for driver `{}`", dialect.name(), driver);
    dialects.insert(driver, dialect);
    Ok(())
}
