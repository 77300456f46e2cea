use crate::{
    Argument, Clause, DeleteSpec, ExecSpec, JoinCondition, JoinKind, JoinSpec, QuerySpec,
    SingleQuery, TableSource, TableSpec, Value,
};
use std::collections::HashMap;

/// Option of a single record query (`query`).
pub trait SingleQueryOption<'u> {
    fn apply_single(self, query: &mut SingleQuery<'u>);
}

/// Option of a multiple records query (`query_multiple`) or of a sub-query.
pub trait MultiQueryOption {
    fn apply_multi(self, query: &mut QuerySpec);
}

/// Option of a `from` position.
pub trait TableOption {
    fn apply_table(self, table: &mut TableSpec);
}

/// Option of a `join`.
pub trait JoinOption {
    fn apply_join(self, join: &mut JoinSpec);
}

/// Option of `insert`, `update` and `save`.
pub trait ExecOption {
    fn apply_exec(self, exec: &mut ExecSpec);
}

/// Option of `delete`.
pub trait DeleteOption {
    fn apply_delete(self, delete: &mut DeleteSpec);
}

/// Implements both query option traits for options that only touch the select.
macro_rules! query_option {
    ($ty:ty, |$this:ident, $query:ident| $body:block) => {
        impl MultiQueryOption for $ty {
            fn apply_multi(self, $query: &mut QuerySpec) {
                let $this = self;
                $body
            }
        }
        impl<'u> SingleQueryOption<'u> for $ty {
            fn apply_single(self, query: &mut SingleQuery<'u>) {
                self.apply_multi(&mut query.query);
            }
        }
    };
}

fn strings<S: Into<String>>(values: impl IntoIterator<Item = S>) -> Vec<String> {
    values.into_iter().map(Into::into).collect()
}

/// Selected columns or expressions, written as given.
#[derive(Debug, Clone)]
pub struct Select(pub Vec<String>);

impl Select {
    pub fn new<S: Into<String>>(columns: impl IntoIterator<Item = S>) -> Self {
        Self(strings(columns))
    }
}

query_option!(Select, |this, query| {
    query.select = this.0;
});

/// Replaces the table of the query: `FromTable::new((Table::new("users"), Alias::new("u")))`.
pub struct FromTable(pub TableSpec);

impl FromTable {
    pub fn new(options: impl TableOption) -> Self {
        let mut table = TableSpec::default();
        options.apply_table(&mut table);
        Self(table)
    }
}

query_option!(FromTable, |this, query| {
    query.table = this.0;
});

/// Table referenced by name, quoted when rendered.
#[derive(Debug, Clone)]
pub struct Table(pub String);

impl Table {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }
}

impl TableOption for Table {
    fn apply_table(self, table: &mut TableSpec) {
        table.source = TableSource::Name(self.0);
    }
}

impl JoinOption for Table {
    fn apply_join(self, join: &mut JoinSpec) {
        join.source = TableSource::Name(self.0);
    }
}

/// Query rendered between parentheses, usable as a table source or as a clause argument.
pub struct SubQuery(pub QuerySpec);

impl SubQuery {
    pub fn new(options: impl MultiQueryOption) -> Self {
        let mut query = QuerySpec::default();
        options.apply_multi(&mut query);
        query.sub_query = true;
        Self(query)
    }
}

impl TableOption for SubQuery {
    fn apply_table(self, table: &mut TableSpec) {
        table.source = TableSource::Query(Box::new(self.0));
    }
}

impl JoinOption for SubQuery {
    fn apply_join(self, join: &mut JoinSpec) {
        join.source = TableSource::Query(Box::new(self.0));
    }
}

impl From<SubQuery> for Argument {
    fn from(value: SubQuery) -> Self {
        Argument::fragment(value.0)
    }
}

#[derive(Debug, Clone)]
pub struct Alias(pub String);

impl Alias {
    pub fn new(alias: impl Into<String>) -> Self {
        Self(alias.into())
    }
}

impl TableOption for Alias {
    fn apply_table(self, table: &mut TableSpec) {
        table.alias = Some(self.0);
    }
}

impl JoinOption for Alias {
    fn apply_join(self, join: &mut JoinSpec) {
        join.alias = Some(self.0);
    }
}

/// Join appended to a table: `Join::left((Table::new("orders"), On::new(["o.user_id = u.id"])))`.
pub struct Join(pub JoinSpec);

impl Join {
    pub fn new(kind: JoinKind, options: impl JoinOption) -> Self {
        let mut join = JoinSpec {
            kind,
            ..Default::default()
        };
        options.apply_join(&mut join);
        Self(join)
    }

    pub fn inner(options: impl JoinOption) -> Self {
        Self::new(JoinKind::Inner, options)
    }

    pub fn left(options: impl JoinOption) -> Self {
        Self::new(JoinKind::Left, options)
    }

    pub fn right(options: impl JoinOption) -> Self {
        Self::new(JoinKind::Right, options)
    }

    pub fn full(options: impl JoinOption) -> Self {
        Self::new(JoinKind::Full, options)
    }
}

impl TableOption for Join {
    fn apply_table(self, table: &mut TableSpec) {
        table.joins.push(self.0);
    }
}

/// Join condition made of boolean expressions joined by `and`.
#[derive(Debug, Clone)]
pub struct On(pub Vec<String>);

impl On {
    pub fn new<S: Into<String>>(conditions: impl IntoIterator<Item = S>) -> Self {
        Self(strings(conditions))
    }
}

impl JoinOption for On {
    fn apply_join(self, join: &mut JoinSpec) {
        join.condition = Some(JoinCondition::On(self.0));
    }
}

/// Join condition on columns sharing the same name on both sides.
#[derive(Debug, Clone)]
pub struct Using(pub Vec<String>);

impl Using {
    pub fn new<S: Into<String>>(columns: impl IntoIterator<Item = S>) -> Self {
        Self(strings(columns))
    }
}

impl JoinOption for Using {
    fn apply_join(self, join: &mut JoinSpec) {
        join.condition = Some(JoinCondition::Using(self.0));
    }
}

impl JoinOption for JoinCondition {
    fn apply_join(self, join: &mut JoinSpec) {
        join.condition = Some(self);
    }
}

/// Filter with `?` markers: `Where::new("age > ? and id in ?", args![18, value_group![1, 2]])`.
pub struct Where(pub Clause);

impl Where {
    pub fn new(clause: impl Into<String>, arguments: Vec<Argument>) -> Self {
        Self(Clause::new(clause, arguments))
    }
}

query_option!(Where, |this, query| {
    query.filter = this.0;
});

impl DeleteOption for Where {
    fn apply_delete(self, delete: &mut DeleteSpec) {
        delete.filter = self.0;
    }
}

/// Grouping columns, each one quoted.
#[derive(Debug, Clone)]
pub struct GroupBy(pub Vec<String>);

impl GroupBy {
    pub fn new<S: Into<String>>(columns: impl IntoIterator<Item = S>) -> Self {
        Self(strings(columns))
    }
}

query_option!(GroupBy, |this, query| {
    query.group_by = this.0;
});

pub struct Having(pub Clause);

impl Having {
    pub fn new(clause: impl Into<String>, arguments: Vec<Argument>) -> Self {
        Self(Clause::new(clause, arguments))
    }
}

query_option!(Having, |this, query| {
    query.having = this.0;
});

/// Ordering terms, the column is quoted up to the first space: `OrderBy::new(["age desc"])`.
#[derive(Debug, Clone)]
pub struct OrderBy(pub Vec<String>);

impl OrderBy {
    pub fn new<S: Into<String>>(columns: impl IntoIterator<Item = S>) -> Self {
        Self(strings(columns))
    }
}

query_option!(OrderBy, |this, query| {
    query.order_by = this.0;
});

/// Maximum number of rows, single record queries are always limited to one.
#[derive(Debug, Clone, Copy)]
pub struct Limit(pub u64);

impl MultiQueryOption for Limit {
    fn apply_multi(self, query: &mut QuerySpec) {
        query.limit = self.0;
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Offset(pub u64);

query_option!(Offset, |this, query| {
    query.offset = this.0;
});

/// Collects the columns of the row that no field maps to.
pub struct RetrieveUnused<'u>(pub &'u mut HashMap<String, Value>);

impl<'u> SingleQueryOption<'u> for RetrieveUnused<'u> {
    fn apply_single(self, query: &mut SingleQuery<'u>) {
        query.unused = Some(self.0);
    }
}

/// Columns written by an insert or update, unknown names are rejected.
#[derive(Debug, Clone)]
pub struct WithColumns(pub Vec<String>);

impl WithColumns {
    pub fn new<S: Into<String>>(columns: impl IntoIterator<Item = S>) -> Self {
        Self(strings(columns))
    }
}

impl ExecOption for WithColumns {
    fn apply_exec(self, exec: &mut ExecSpec) {
        exec.columns = self.0;
    }
}

/// Writes zero valued fields, skipped otherwise.
#[derive(Debug, Clone, Copy)]
pub struct IncludingZeros;

impl ExecOption for IncludingZeros {
    fn apply_exec(self, exec: &mut ExecSpec) {
        exec.including_zeros = true;
    }
}

impl MultiQueryOption for () {
    fn apply_multi(self, _query: &mut QuerySpec) {}
}
impl<'u> SingleQueryOption<'u> for () {
    fn apply_single(self, _query: &mut SingleQuery<'u>) {}
}
impl TableOption for () {
    fn apply_table(self, _table: &mut TableSpec) {}
}
impl JoinOption for () {
    fn apply_join(self, _join: &mut JoinSpec) {}
}
impl ExecOption for () {
    fn apply_exec(self, _exec: &mut ExecSpec) {}
}
impl DeleteOption for () {
    fn apply_delete(self, _delete: &mut DeleteSpec) {}
}

macro_rules! tuple_options {
    ($($name:ident),+) => {
        #[allow(non_snake_case)]
        impl<$($name: MultiQueryOption),+> MultiQueryOption for ($($name,)+) {
            fn apply_multi(self, query: &mut QuerySpec) {
                let ($($name,)+) = self;
                $($name.apply_multi(query);)+
            }
        }
        #[allow(non_snake_case)]
        impl<'u, $($name: SingleQueryOption<'u>),+> SingleQueryOption<'u> for ($($name,)+) {
            fn apply_single(self, query: &mut SingleQuery<'u>) {
                let ($($name,)+) = self;
                $($name.apply_single(query);)+
            }
        }
        #[allow(non_snake_case)]
        impl<$($name: TableOption),+> TableOption for ($($name,)+) {
            fn apply_table(self, table: &mut TableSpec) {
                let ($($name,)+) = self;
                $($name.apply_table(table);)+
            }
        }
        #[allow(non_snake_case)]
        impl<$($name: JoinOption),+> JoinOption for ($($name,)+) {
            fn apply_join(self, join: &mut JoinSpec) {
                let ($($name,)+) = self;
                $($name.apply_join(join);)+
            }
        }
        #[allow(non_snake_case)]
        impl<$($name: ExecOption),+> ExecOption for ($($name,)+) {
            fn apply_exec(self, exec: &mut ExecSpec) {
                let ($($name,)+) = self;
                $($name.apply_exec(exec);)+
            }
        }
        #[allow(non_snake_case)]
        impl<$($name: DeleteOption),+> DeleteOption for ($($name,)+) {
            fn apply_delete(self, delete: &mut DeleteSpec) {
                let ($($name,)+) = self;
                $($name.apply_delete(delete);)+
            }
        }
    };
}

tuple_options!(A);
tuple_options!(A, B);
tuple_options!(A, B, C);
tuple_options!(A, B, C, D);
tuple_options!(A, B, C, D, E);
tuple_options!(A, B, C, D, E, F);
tuple_options!(A, B, C, D, E, F, G);
tuple_options!(A, B, C, D, E, F, G, H);
