use crate::{Argument, Dialect, JoinCondition, OrmError, Result, TableSpec, Value, separated_by};
use std::{
    fmt::{self, Display},
    mem,
    ops::{Deref, DerefMut},
    sync::{Arc, Mutex, PoisonError},
};

/// Fragments that render themselves into a [`SqlContext`] instead of being bound as a
/// single placeholder: value groups, sub-queries, table references.
pub trait AppendSql: Send + Sync {
    fn append_to(&self, context: &mut SqlContext) -> Result<()>;
}

/// Accumulator of the SQL text and positional arguments of one statement.
///
/// Every placeholder written goes through [`SqlContext::next_placeholder`], so the number
/// of placeholders in the text always matches the number of arguments.
pub struct SqlContext {
    counter: u64,
    buffer: String,
    arguments: Vec<Value>,
    dialect: Arc<dyn Dialect>,
    driver: Arc<str>,
}

impl SqlContext {
    pub fn new(driver: impl Into<Arc<str>>, dialect: Arc<dyn Dialect>) -> Self {
        Self {
            counter: 0,
            buffer: String::with_capacity(64),
            arguments: Vec::with_capacity(16),
            dialect,
            driver: driver.into(),
        }
    }

    pub fn dialect(&self) -> &Arc<dyn Dialect> {
        &self.dialect
    }

    pub fn driver(&self) -> &str {
        &self.driver
    }

    pub fn sql(&self) -> &str {
        &self.buffer
    }

    pub fn arguments(&self) -> &[Value] {
        &self.arguments
    }

    /// Number of placeholders emitted so far.
    pub fn placeholders(&self) -> u64 {
        self.counter
    }

    pub fn reset(&mut self) {
        self.counter = 0;
        self.buffer.clear();
        self.arguments.clear();
    }

    pub fn write_str(&mut self, value: &str) -> &mut Self {
        self.buffer.push_str(value);
        self
    }

    pub fn write_char(&mut self, value: char) -> &mut Self {
        self.buffer.push(value);
        self
    }

    pub fn write_quoted(&mut self, identifier: &str) -> &mut Self {
        self.dialect.quoter().write(&mut self.buffer, identifier);
        self
    }

    pub fn next_placeholder(&mut self, value: Value) -> &mut Self {
        self.counter += 1;
        self.dialect
            .placeholder()
            .write(&mut self.buffer, self.counter);
        self.arguments.push(value);
        self
    }

    pub fn append(&mut self, fragment: &dyn AppendSql) -> Result<&mut Self> {
        fragment.append_to(self)?;
        Ok(self)
    }

    /// Replaces every `?` of `clause` with the matching argument: a placeholder for plain
    /// values, the fragment's own rendering otherwise.
    pub fn write_clause(&mut self, clause: &str, arguments: &[Argument]) -> Result<()> {
        let mut arguments = arguments.iter();
        let mut rest = clause;
        while let Some(position) = rest.find('?') {
            self.write_str(&rest[..position]);
            match arguments.next() {
                Some(Argument::Value(value)) => {
                    self.next_placeholder(value.clone());
                }
                Some(Argument::Fragment(fragment)) => {
                    fragment.append_to(self)?;
                }
                None => return Err(OrmError::NotEnoughArguments(clause.to_string()).into()),
            }
            rest = &rest[position + 1..];
        }
        if arguments.next().is_some() {
            return Err(OrmError::TooManyArguments(clause.to_string()).into());
        }
        self.write_str(rest);
        Ok(())
    }

    /// `select <columns> from <table>[ as <alias>]` followed by the joins. The columns are
    /// written as given, they may be expressions.
    pub fn write_select_from(&mut self, columns: &[String], table: &TableSpec) -> Result<()> {
        self.write_str("select ");
        if columns.is_empty() {
            self.write_char('*');
        } else {
            separated_by(
                &mut self.buffer,
                columns,
                |out, column| out.push_str(column),
                ", ",
            );
        }
        self.write_str(" from ");
        table.source.append_to(self)?;
        if let Some(alias) = table.alias.as_deref().filter(|v| !v.is_empty()) {
            self.write_str(" as ").write_quoted(alias);
        }
        for join in &table.joins {
            self.write_char(' ').write_str(join.kind.keyword()).write_char(' ');
            join.source.append_to(self)?;
            if let Some(alias) = join.alias.as_deref().filter(|v| !v.is_empty()) {
                self.write_str(" as ").write_quoted(alias);
            }
            match &join.condition {
                Some(JoinCondition::On(conditions)) if !conditions.is_empty() => {
                    self.write_str(" on ");
                    separated_by(
                        &mut self.buffer,
                        conditions,
                        |out, v| out.push_str(v),
                        " and ",
                    );
                }
                Some(JoinCondition::Using(columns)) if !columns.is_empty() => {
                    self.write_str(" using (");
                    separated_by(&mut self.buffer, columns, |out, v| out.push_str(v), ", ");
                    self.write_char(')');
                }
                _ => {}
            }
        }
        Ok(())
    }

    pub fn write_where(&mut self, clause: &str, arguments: &[Argument]) -> Result<()> {
        if clause.is_empty() {
            return Ok(());
        }
        self.write_str(" where ");
        self.write_clause(clause, arguments)
    }

    pub fn write_group_by(&mut self, columns: &[String]) {
        if columns.is_empty() {
            return;
        }
        self.write_str(" group by ");
        let quoter = self.dialect.quoter();
        separated_by(
            &mut self.buffer,
            columns,
            |out, column| quoter.write(out, column),
            ", ",
        );
    }

    pub fn write_having(&mut self, clause: &str, arguments: &[Argument]) -> Result<()> {
        if clause.is_empty() {
            return Ok(());
        }
        self.write_str(" having ");
        self.write_clause(clause, arguments)
    }

    /// The column is quoted up to the first space, the rest (`desc`, `nulls last`) is
    /// copied as is.
    pub fn write_order_by(&mut self, columns: &[String]) {
        if columns.is_empty() {
            return;
        }
        self.write_str(" order by ");
        let quoter = self.dialect.quoter();
        separated_by(
            &mut self.buffer,
            columns,
            |out, column| match column.split_once(' ') {
                Some((name, rest)) => {
                    quoter.write(out, name);
                    out.push(' ');
                    out.push_str(rest);
                }
                None => quoter.write(out, column),
            },
            ", ",
        );
    }

    /// `limit ?` and `offset ?`, each only when not zero.
    pub fn write_limit_offset(&mut self, limit: u64, offset: u64) {
        if limit > 0 {
            self.write_str(" limit ")
                .next_placeholder(crate::AsValue::as_value(&limit));
        }
        if offset > 0 {
            self.write_str(" offset ")
                .next_placeholder(crate::AsValue::as_value(&offset));
        }
    }

    /// `offset ? rows` and `fetch next ? rows only`, each only when not zero.
    pub fn write_offset_fetch(&mut self, limit: u64, offset: u64) {
        if offset > 0 {
            self.write_str(" offset ")
                .next_placeholder(crate::AsValue::as_value(&offset))
                .write_str(" rows");
        }
        if limit > 0 {
            self.write_str(" fetch next ")
                .next_placeholder(crate::AsValue::as_value(&limit))
                .write_str(" rows only");
        }
    }

    /// Order by and pagination, rendered by the dialect.
    pub fn write_pagination(&mut self, order_by: &[String], limit: u64, offset: u64) {
        let dialect = Arc::clone(&self.dialect);
        dialect.write_pagination(self, order_by, limit, offset);
    }
}

impl Display for SqlContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.buffer)
    }
}

/// Reusable contexts of one database.
pub struct ContextPool {
    driver: Arc<str>,
    dialect: Arc<dyn Dialect>,
    free: Mutex<Vec<SqlContext>>,
}

impl ContextPool {
    pub fn new(driver: impl Into<Arc<str>>, dialect: Arc<dyn Dialect>) -> Self {
        Self {
            driver: driver.into(),
            dialect,
            free: Mutex::new(Vec::new()),
        }
    }

    pub fn dialect(&self) -> &Arc<dyn Dialect> {
        &self.dialect
    }

    pub fn driver(&self) -> &str {
        &self.driver
    }

    /// Takes an empty context, it goes back to the pool (reset) when the guard is dropped.
    pub fn acquire(&self) -> PooledContext<'_> {
        let context = self
            .free
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop()
            .unwrap_or_else(|| self.fresh());
        PooledContext {
            pool: self,
            context,
        }
    }

    fn fresh(&self) -> SqlContext {
        SqlContext::new(self.driver.clone(), self.dialect.clone())
    }

    /// Contexts currently waiting to be reused.
    pub fn idle(&self) -> usize {
        self.free.lock().unwrap_or_else(PoisonError::into_inner).len()
    }
}

pub struct PooledContext<'p> {
    pool: &'p ContextPool,
    context: SqlContext,
}

impl Deref for PooledContext<'_> {
    type Target = SqlContext;
    fn deref(&self) -> &SqlContext {
        &self.context
    }
}

impl DerefMut for PooledContext<'_> {
    fn deref_mut(&mut self) -> &mut SqlContext {
        &mut self.context
    }
}

impl Drop for PooledContext<'_> {
    fn drop(&mut self) {
        // Buffers move back into the pool with their capacity
        let mut context = SqlContext {
            counter: 0,
            buffer: mem::take(&mut self.context.buffer),
            arguments: mem::take(&mut self.context.arguments),
            dialect: self.context.dialect.clone(),
            driver: self.context.driver.clone(),
        };
        context.reset();
        self.pool
            .free
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(context);
    }
}
