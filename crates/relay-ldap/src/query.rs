//! Native directory queries.
//!
//! [`LdapFilter`] is the compiled form of a query predicate. It renders to
//! RFC 4515 filter text via `Display`. [`QueryBuilder`] accumulates clauses
//! that are implicitly ANDed and opens scoped sub-builders for combinators.

use std::fmt;

use crate::error::{LdapError, LdapResult};

/// Compiled directory filter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LdapFilter {
    /// All clauses must match.
    And(Vec<LdapFilter>),
    /// Any clause must match.
    Or(Vec<LdapFilter>),
    /// Negation.
    Not(Box<LdapFilter>),
    /// `(attr=value)`.
    Equality {
        /// Attribute name.
        attr: String,
        /// Assertion value, unescaped.
        value: String,
    },
    /// `(attr=initial*any*final)`.
    Substring {
        /// Attribute name.
        attr: String,
        /// Leading fragment.
        initial: Option<String>,
        /// Inner fragments.
        any: Vec<String>,
        /// Trailing fragment.
        last: Option<String>,
    },
    /// `(attr>=value)`.
    GreaterOrEqual {
        /// Attribute name.
        attr: String,
        /// Assertion value, unescaped.
        value: String,
    },
    /// `(attr<=value)`.
    LessOrEqual {
        /// Attribute name.
        attr: String,
        /// Assertion value, unescaped.
        value: String,
    },
    /// `(attr=*)`.
    Present {
        /// Attribute name.
        attr: String,
    },
}

impl LdapFilter {
    /// `(attr=value)`.
    #[must_use]
    pub fn eq(attr: impl Into<String>, value: impl Into<String>) -> Self {
        Self::Equality {
            attr: attr.into(),
            value: value.into(),
        }
    }

    /// `(attr=*)`.
    #[must_use]
    pub fn present(attr: impl Into<String>) -> Self {
        Self::Present { attr: attr.into() }
    }

    /// `(attr=*value*)`.
    #[must_use]
    pub fn contains(attr: impl Into<String>, value: impl Into<String>) -> Self {
        Self::Substring {
            attr: attr.into(),
            initial: None,
            any: vec![value.into()],
            last: None,
        }
    }

    /// `(attr=value*)`.
    #[must_use]
    pub fn starts_with(attr: impl Into<String>, value: impl Into<String>) -> Self {
        Self::Substring {
            attr: attr.into(),
            initial: Some(value.into()),
            any: Vec::new(),
            last: None,
        }
    }

    /// `(attr=*value)`.
    #[must_use]
    pub fn ends_with(attr: impl Into<String>, value: impl Into<String>) -> Self {
        Self::Substring {
            attr: attr.into(),
            initial: None,
            any: Vec::new(),
            last: Some(value.into()),
        }
    }

    /// `(objectClass=class)`.
    #[must_use]
    pub fn object_class(class: impl Into<String>) -> Self {
        Self::eq("objectClass", class)
    }
}

impl fmt::Display for LdapFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::And(clauses) => {
                f.write_str("(&")?;
                clauses.iter().try_for_each(|c| write!(f, "{c}"))?;
                f.write_str(")")
            }
            Self::Or(clauses) => {
                f.write_str("(|")?;
                clauses.iter().try_for_each(|c| write!(f, "{c}"))?;
                f.write_str(")")
            }
            Self::Not(inner) => write!(f, "(!{inner})"),
            Self::Equality { attr, value } => write!(f, "({attr}={})", escape(value)),
            Self::Substring {
                attr,
                initial,
                any,
                last,
            } => {
                write!(f, "({attr}=")?;
                if let Some(initial) = initial {
                    f.write_str(&escape(initial))?;
                }
                f.write_str("*")?;
                for fragment in any {
                    write!(f, "{}*", escape(fragment))?;
                }
                if let Some(last) = last {
                    f.write_str(&escape(last))?;
                }
                f.write_str(")")
            }
            Self::GreaterOrEqual { attr, value } => write!(f, "({attr}>={})", escape(value)),
            Self::LessOrEqual { attr, value } => write!(f, "({attr}<={})", escape(value)),
            Self::Present { attr } => write!(f, "({attr}=*)"),
        }
    }
}

/// Checks that `name` is an RFC 4512 attribute description: a descriptor
/// (`cn`, `x-custom`) or numeric OID (`2.5.4.3`), optionally followed by
/// `;option`s (`userCertificate;binary`).
#[must_use]
pub fn is_attribute_description(name: &str) -> bool {
    let mut parts = name.split(';');
    let Some(kind) = parts.next() else {
        return false;
    };
    let keystring = |s: &str| {
        s.chars().next().is_some_and(|c| c.is_ascii_alphabetic())
            && s.chars().all(|c| c.is_ascii_alphanumeric() || c == '-')
    };
    let number = |s: &str| {
        !s.is_empty()
            && s.chars().all(|c| c.is_ascii_digit())
            && (s.len() == 1 || !s.starts_with('0'))
    };
    let oid = |s: &str| s.contains('.') && s.split('.').all(number);
    let option = |s: &str| {
        !s.is_empty() && s.chars().all(|c| c.is_ascii_alphanumeric() || c == '-')
    };

    (keystring(kind) || oid(kind)) && parts.all(option)
}

/// Trims and validates an attribute name taken from caller input.
///
/// ## Errors
///
/// Returns [`LdapError::FilterInvalid`] if `name` is not an attribute
/// description.
pub fn attribute_name(name: &str) -> LdapResult<&str> {
    let name = name.trim();
    if is_attribute_description(name) {
        Ok(name)
    } else {
        Err(LdapError::filter(format!("invalid attribute name '{name}'")))
    }
}

/// Escapes an assertion value per RFC 4515.
#[must_use]
pub fn escape(value: &str) -> String {
    let mut result = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '\\' => result.push_str("\\5c"),
            '*' => result.push_str("\\2a"),
            '(' => result.push_str("\\28"),
            ')' => result.push_str("\\29"),
            '\0' => result.push_str("\\00"),
            _ => result.push(c),
        }
    }
    result
}

/// Accumulates filter clauses. Top-level clauses are ANDed.
#[derive(Debug, Default)]
pub struct QueryBuilder {
    clauses: Vec<LdapFilter>,
}

impl QueryBuilder {
    /// Creates an empty builder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a clause.
    pub fn push(&mut self, clause: LdapFilter) {
        self.clauses.push(clause);
    }

    /// Returns true if no clause was added.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.clauses.is_empty()
    }

    /// Runs `scope` on a sub-builder and adds its clauses as one AND group.
    ///
    /// ## Errors
    ///
    /// Propagates errors from `scope`.
    pub fn and_scope<F>(&mut self, scope: F) -> LdapResult<()>
    where
        F: FnOnce(&mut Self) -> LdapResult<()>,
    {
        let clauses = Self::collect(scope)?;
        self.push_group(clauses, LdapFilter::And);
        Ok(())
    }

    /// Runs `scope` on a sub-builder and adds its clauses as one OR group.
    ///
    /// ## Errors
    ///
    /// Propagates errors from `scope`.
    pub fn or_scope<F>(&mut self, scope: F) -> LdapResult<()>
    where
        F: FnOnce(&mut Self) -> LdapResult<()>,
    {
        let clauses = Self::collect(scope)?;
        self.push_group(clauses, LdapFilter::Or);
        Ok(())
    }

    /// Runs `scope` on a sub-builder and adds the negation of its single
    /// clause.
    ///
    /// ## Errors
    ///
    /// Returns [`LdapError::FilterInvalid`] unless the scope produced exactly
    /// one clause.
    pub fn not_scope<F>(&mut self, scope: F) -> LdapResult<()>
    where
        F: FnOnce(&mut Self) -> LdapResult<()>,
    {
        let mut clauses = Self::collect(scope)?;
        match (clauses.pop(), clauses.is_empty()) {
            (Some(inner), true) => {
                self.push(LdapFilter::Not(Box::new(inner)));
                Ok(())
            }
            _ => Err(LdapError::filter("'not' requires exactly one condition")),
        }
    }

    /// Finishes the query. A single clause is returned as is.
    #[must_use]
    pub fn build(mut self) -> LdapFilter {
        match self.clauses.len() {
            0 => LdapFilter::present("objectClass"),
            1 => self.clauses.remove(0),
            _ => LdapFilter::And(self.clauses),
        }
    }

    fn collect<F>(scope: F) -> LdapResult<Vec<LdapFilter>>
    where
        F: FnOnce(&mut Self) -> LdapResult<()>,
    {
        let mut sub = Self::new();
        scope(&mut sub)?;
        Ok(sub.clauses)
    }

    fn push_group(&mut self, mut clauses: Vec<LdapFilter>, group: fn(Vec<LdapFilter>) -> LdapFilter) {
        match clauses.len() {
            0 => {}
            1 => self.clauses.append(&mut clauses),
            _ => self.push(group(clauses)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_rfc4515() {
        let filter = LdapFilter::And(vec![
            LdapFilter::object_class("person"),
            LdapFilter::Or(vec![
                LdapFilter::contains("cn", "oe"),
                LdapFilter::starts_with("sn", "Do"),
                LdapFilter::ends_with("mail", "@example.com"),
            ]),
            LdapFilter::Not(Box::new(LdapFilter::present("manager"))),
            LdapFilter::GreaterOrEqual {
                attr: "uidNumber".into(),
                value: "1000".into(),
            },
        ]);
        assert_eq!(
            filter.to_string(),
            "(&(objectClass=person)(|(cn=*oe*)(sn=Do*)(mail=*@example.com))(!(manager=*))(uidNumber>=1000))"
        );
    }

    #[test]
    fn attribute_descriptions() {
        for name in [
            "cn",
            "givenName",
            "x-custom-1",
            "2.5.4.3",
            "userCertificate;binary",
            "cn;lang-en",
        ] {
            assert!(is_attribute_description(name), "{name}");
        }
        for name in [
            "",
            "1cn",
            "cn)(objectClass=*",
            "cn=x",
            "a b",
            "2.05.4",
            "2.",
            "cn;",
            "*",
        ] {
            assert!(!is_attribute_description(name), "{name}");
        }
        assert_eq!(attribute_name(" sn ").unwrap(), "sn");
        assert!(matches!(attribute_name("sn*"), Err(LdapError::FilterInvalid(_))));
    }

    #[test]
    fn escapes_special_characters() {
        assert_eq!(escape("a*b(c)d\\e\0"), "a\\2ab\\28c\\29d\\5ce\\00");
        assert_eq!(LdapFilter::eq("cn", "x*").to_string(), "(cn=x\\2a)");
        assert_eq!(LdapFilter::contains("cn", "(y)").to_string(), "(cn=*\\28y\\29*)");
    }

    #[test]
    fn scopes_inline_single_clause() {
        let mut builder = QueryBuilder::new();
        builder
            .or_scope(|b| {
                b.push(LdapFilter::eq("cn", "a"));
                Ok(())
            })
            .unwrap();
        builder.and_scope(|_| Ok(())).unwrap();
        assert_eq!(builder.build(), LdapFilter::eq("cn", "a"));
    }

    #[test]
    fn not_scope_requires_one_clause() {
        let mut builder = QueryBuilder::new();
        assert!(builder.not_scope(|_| Ok(())).is_err());
        assert!(builder
            .not_scope(|b| {
                b.push(LdapFilter::present("a"));
                b.push(LdapFilter::present("b"));
                Ok(())
            })
            .is_err());
        assert!(builder.is_empty());
    }
}
