use crate::{AppendSql, AsValue, Result, SqlContext, Value};

/// One argument of a `?` marker in a `where`/`having` clause.
///
/// Plain values become a single placeholder. Fragments (value groups, sub-queries)
/// render themselves in place of the marker.
pub enum Argument {
    Value(Value),
    Fragment(Box<dyn AppendSql>),
}

impl Argument {
    pub fn fragment(fragment: impl AppendSql + 'static) -> Self {
        Argument::Fragment(Box::new(fragment))
    }
}

impl<T: AsValue> From<T> for Argument {
    fn from(value: T) -> Self {
        Argument::Value(value.as_value())
    }
}

impl From<ValueGroup> for Argument {
    fn from(value: ValueGroup) -> Self {
        Argument::fragment(value)
    }
}

/// Parenthesized list of values, for `in (?, ?)` and tuple comparisons.
///
/// ```
/// # use quarry_core::*;
/// let group = value_group![value_group![1, "a"], value_group![2, "b"]];
/// ```
#[derive(Default)]
pub struct ValueGroup {
    items: Vec<Argument>,
}

impl ValueGroup {
    pub fn new(items: Vec<Argument>) -> Self {
        Self { items }
    }

    pub fn push(&mut self, item: impl Into<Argument>) -> &mut Self {
        self.items.push(item.into());
        self
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl<T: Into<Argument>> FromIterator<T> for ValueGroup {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        Self::new(iter.into_iter().map(Into::into).collect())
    }
}

impl AppendSql for ValueGroup {
    fn append_to(&self, context: &mut SqlContext) -> Result<()> {
        if self.items.is_empty() {
            return Ok(());
        }
        context.write_char('(');
        for (i, item) in self.items.iter().enumerate() {
            if i > 0 {
                context.write_str(", ");
            }
            match item {
                Argument::Value(value) => {
                    context.next_placeholder(value.clone());
                }
                Argument::Fragment(fragment) => fragment.append_to(context)?,
            }
        }
        context.write_char(')');
        Ok(())
    }
}

/// Builds the argument list of a clause: `args![18, value_group![1, 2]]`.
#[macro_export]
macro_rules! args {
    ($($value:expr),* $(,)?) => {
        ::std::vec![$($crate::Argument::from($value)),*]
    };
}

#[macro_export]
macro_rules! value_group {
    ($($value:expr),* $(,)?) => {
        $crate::ValueGroup::new($crate::args![$($value),*])
    };
}
