/// Convention used to derive a column name from a field name when the field carries no
/// explicit column override.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Naming {
    /// Field name used verbatim.
    AsIs,
    Lower,
    Upper,
    /// `APIResponse` -> `api_response`.
    #[default]
    Snake,
    /// `APIResponse` -> `API_RESPONSE`.
    UpperSnake,
    /// Consecutive capitals keep only the first one: `JSONObject` -> `jsonObject`.
    Camel,
}

impl Naming {
    pub fn convert(&self, name: &str) -> String {
        match self {
            Naming::AsIs => name.to_owned(),
            Naming::Lower => name.to_lowercase(),
            Naming::Upper => name.to_uppercase(),
            Naming::Snake => split_words(name, |c| c.to_ascii_lowercase(), WordBoundary::Underscore),
            Naming::UpperSnake => {
                split_words(name, |c| c.to_ascii_uppercase(), WordBoundary::Underscore)
            }
            Naming::Camel => split_words(name, |c| c.to_ascii_lowercase(), WordBoundary::Capital),
        }
    }
}

#[derive(Clone, Copy, PartialEq)]
enum WordBoundary {
    Underscore,
    Capital,
}

/// A new word starts at an uppercase letter preceded by a lowercase one, or at the last
/// capital of an acronym that is followed by a lowercase letter (`APIResponse`).
fn split_words(name: &str, case: impl Fn(char) -> char, boundary: WordBoundary) -> String {
    let chars: Vec<char> = name.chars().collect();
    let n = chars.len();
    let mut out = String::with_capacity(n + n / 2);
    let mut capital = false;
    for i in 0..n {
        let c = chars[i];
        if boundary == WordBoundary::Capital && capital {
            out.push(c.to_ascii_uppercase());
        } else {
            out.push(case(c));
        }
        let Some(&next) = chars.get(i + 1) else {
            break;
        };
        capital = next.is_ascii_uppercase()
            && (c.is_ascii_lowercase()
                || c.is_ascii_uppercase()
                    && chars.get(i + 2).is_some_and(|c| c.is_ascii_lowercase()));
        if capital && boundary == WordBoundary::Underscore {
            out.push('_');
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::Naming;

    #[test]
    fn camel() {
        assert_eq!(Naming::Camel.convert("JSONObject"), "jsonObject");
        assert_eq!(Naming::Camel.convert("UserName"), "userName");
        assert_eq!(Naming::Camel.convert("ID"), "id");
        assert_eq!(Naming::Camel.convert(""), "");
    }

    #[test]
    fn simple_cases() {
        assert_eq!(Naming::AsIs.convert("UserName"), "UserName");
        assert_eq!(Naming::Lower.convert("UserName"), "username");
        assert_eq!(Naming::Upper.convert("UserName"), "USERNAME");
    }
}
