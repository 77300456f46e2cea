use crate::{AppendSql, Argument, OrmError, Result, SqlContext, Value, possibly_parenthesized};
use std::{collections::HashMap, fmt::Display};

/// Predicate template with `?` markers and the arguments that fill them.
#[derive(Default)]
pub struct Clause {
    pub text: String,
    pub arguments: Vec<Argument>,
}

impl Clause {
    pub fn new(text: impl Into<String>, arguments: Vec<Argument>) -> Self {
        Self {
            text: text.into(),
            arguments,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }
}

/// Description of a select statement, built by folding options over it.
#[derive(Default)]
pub struct QuerySpec {
    pub select: Vec<String>,
    pub table: TableSpec,
    pub filter: Clause,
    pub group_by: Vec<String>,
    pub having: Clause,
    pub order_by: Vec<String>,
    pub limit: u64,
    pub offset: u64,
    /// Rendered between parentheses, as a table source or an argument.
    pub sub_query: bool,
}

impl AppendSql for QuerySpec {
    fn append_to(&self, context: &mut SqlContext) -> Result<()> {
        possibly_parenthesized!(context, self.sub_query, {
            context.write_select_from(&self.select, &self.table)?;
            context.write_where(&self.filter.text, &self.filter.arguments)?;
            context.write_group_by(&self.group_by);
            context.write_having(&self.having.text, &self.having.arguments)?;
            context.write_pagination(&self.order_by, self.limit, self.offset);
        });
        Ok(())
    }
}

/// Source of rows of a `from` or `join` position.
pub enum TableSource {
    Name(String),
    Query(Box<QuerySpec>),
}

impl Default for TableSource {
    fn default() -> Self {
        TableSource::Name(String::new())
    }
}

impl AppendSql for TableSource {
    fn append_to(&self, context: &mut SqlContext) -> Result<()> {
        match self {
            TableSource::Name(name) => {
                context.write_quoted(name);
                Ok(())
            }
            TableSource::Query(query) => query.append_to(context),
        }
    }
}

#[derive(Default)]
pub struct TableSpec {
    pub source: TableSource,
    pub alias: Option<String>,
    pub joins: Vec<JoinSpec>,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum JoinKind {
    #[default]
    Inner,
    Left,
    Right,
    Full,
}

impl JoinKind {
    pub fn keyword(&self) -> &'static str {
        match self {
            JoinKind::Inner => "inner join",
            JoinKind::Left => "left join",
            JoinKind::Right => "right join",
            JoinKind::Full => "full join",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JoinCondition {
    /// Boolean expressions joined by `and`.
    On(Vec<String>),
    /// Column names shared by both sides.
    Using(Vec<String>),
}

impl JoinCondition {
    /// Condition from its keyword, `on` or `using`.
    pub fn parse<S: Into<String>>(
        keyword: &str,
        items: impl IntoIterator<Item = S>,
    ) -> Result<Self> {
        let items = items.into_iter().map(Into::into).collect();
        match keyword {
            "on" => Ok(JoinCondition::On(items)),
            "using" => Ok(JoinCondition::Using(items)),
            _ => {
                let error = OrmError::InvalidJoinConditionType(keyword.to_string());
                log::error!("{}", error);
                Err(error.into())
            }
        }
    }
}

#[derive(Default)]
pub struct JoinSpec {
    pub kind: JoinKind,
    pub source: TableSource,
    pub alias: Option<String>,
    pub condition: Option<JoinCondition>,
}

/// Description of an insert or update.
#[derive(Debug, Default, Clone)]
pub struct ExecSpec {
    /// Restricts the written columns, empty means every column.
    pub columns: Vec<String>,
    /// Writes zero valued fields too.
    pub including_zeros: bool,
}

#[derive(Default)]
pub struct DeleteSpec {
    pub filter: Clause,
}

/// Select of a single record, it can divert the columns no field maps to.
pub struct SingleQuery<'u> {
    pub query: QuerySpec,
    pub unused: Option<&'u mut HashMap<String, Value>>,
}

impl<'u> SingleQuery<'u> {
    pub fn new(query: QuerySpec) -> Self {
        Self {
            query,
            unused: None,
        }
    }
}

impl Display for JoinKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.keyword())
    }
}
