//! Portable filter trees and their compilation into directory queries.
//!
//! Callers describe a predicate as a [`FilterNode`] tree (usually decoded
//! from JSON) instead of writing directory syntax. [`add_filter`] walks the
//! tree and adds the equivalent clauses to a [`QueryBuilder`]. All value
//! checks happen here, before any network round trip.
//!
//! ```json
//! {"type": "or", "children": [
//!     {"type": "condition", "field": "cn", "operator": "i_starts_with", "value": "jo"},
//!     {"type": "condition", "field": "mail", "operator": "is_null"}
//! ]}
//! ```

use serde::{Deserialize, Serialize};

use crate::error::{LdapError, LdapResult};
use crate::query::{attribute_name, LdapFilter, QueryBuilder};

/// Node of a filter tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FilterNode {
    /// All children must match.
    And {
        /// Child nodes.
        #[serde(default)]
        children: Vec<FilterNode>,
    },
    /// Any child must match.
    Or {
        /// Child nodes.
        #[serde(default)]
        children: Vec<FilterNode>,
    },
    /// The single child must not match.
    Not {
        /// Child nodes; exactly one is accepted.
        #[serde(default)]
        children: Vec<FilterNode>,
    },
    /// Attribute condition.
    Condition(Condition),
}

/// Leaf condition on one attribute.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Condition {
    /// Attribute name.
    pub field: String,
    /// Comparison operator.
    pub operator: Operator,
    /// Operand, absent for [`Operator::IsNull`].
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<FilterValue>,
}

/// Condition operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operator {
    /// Case-insensitive substring match.
    IContains,
    /// Exact match.
    Eq,
    /// Case-insensitive prefix match.
    IStartsWith,
    /// Case-insensitive suffix match.
    IEndsWith,
    /// Greater than or equal.
    Gte,
    /// Less than or equal.
    Lte,
    /// Matches any value of a list.
    In,
    /// Attribute has no value.
    IsNull,
}

/// Condition operand.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FilterValue {
    /// Boolean, rendered as `TRUE`/`FALSE`.
    Bool(bool),
    /// Number.
    Number(serde_json::Number),
    /// String.
    Text(String),
    /// List of strings.
    List(Vec<String>),
}

impl FilterValue {
    /// String form of a scalar, `None` for lists.
    #[must_use]
    pub fn scalar(&self) -> Option<String> {
        match self {
            Self::Bool(true) => Some("TRUE".to_string()),
            Self::Bool(false) => Some("FALSE".to_string()),
            Self::Number(n) => Some(n.to_string()),
            Self::Text(s) => Some(s.clone()),
            Self::List(_) => None,
        }
    }
}

impl From<&str> for FilterValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<Vec<String>> for FilterValue {
    fn from(values: Vec<String>) -> Self {
        Self::List(values)
    }
}

impl FilterNode {
    /// AND of `children`.
    #[must_use]
    pub const fn and(children: Vec<Self>) -> Self {
        Self::And { children }
    }

    /// OR of `children`.
    #[must_use]
    pub const fn or(children: Vec<Self>) -> Self {
        Self::Or { children }
    }

    /// Negation of `child`.
    #[must_use]
    pub fn not(child: Self) -> Self {
        Self::Not {
            children: vec![child],
        }
    }

    /// Condition node.
    #[must_use]
    pub fn condition(
        field: impl Into<String>,
        operator: Operator,
        value: Option<FilterValue>,
    ) -> Self {
        Self::Condition(Condition {
            field: field.into(),
            operator,
            value,
        })
    }

    /// Decodes a filter tree from JSON.
    ///
    /// ## Errors
    ///
    /// Unknown node types, unknown operators and malformed JSON all yield
    /// [`LdapError::FilterInvalid`].
    pub fn from_json(json: &str) -> LdapResult<Self> {
        serde_json::from_str(json).map_err(|e| LdapError::filter(e.to_string()))
    }
}

/// Compiles a filter tree into `builder`.
///
/// `AND`/`OR` without children add nothing and a single child is inlined.
///
/// ## Errors
///
/// Returns [`LdapError::FilterInvalid`] for a `NOT` without exactly one
/// child or a condition whose operand does not fit its operator.
pub fn add_filter(builder: &mut QueryBuilder, node: &FilterNode) -> LdapResult<()> {
    match node {
        FilterNode::And { children } => match children.as_slice() {
            [] => Ok(()),
            [only] => add_filter(builder, only),
            _ => builder.and_scope(|scope| add_children(scope, children)),
        },
        FilterNode::Or { children } => match children.as_slice() {
            [] => Ok(()),
            [only] => add_filter(builder, only),
            _ => builder.or_scope(|scope| add_children(scope, children)),
        },
        FilterNode::Not { children } => match children.as_slice() {
            [only] => builder.not_scope(|scope| add_filter(scope, only)),
            _ => Err(LdapError::filter(format!(
                "'not' requires exactly one child, got {}",
                children.len()
            ))),
        },
        FilterNode::Condition(condition) => {
            builder.push(compile_condition(condition)?);
            Ok(())
        }
    }
}

/// Compiles a filter tree on its own.
///
/// ## Errors
///
/// See [`add_filter`].
pub fn compile(node: &FilterNode) -> LdapResult<LdapFilter> {
    let mut builder = QueryBuilder::new();
    add_filter(&mut builder, node)?;
    Ok(builder.build())
}

fn add_children(builder: &mut QueryBuilder, children: &[FilterNode]) -> LdapResult<()> {
    children.iter().try_for_each(|child| add_filter(builder, child))
}

fn compile_condition(condition: &Condition) -> LdapResult<LdapFilter> {
    if condition.field.trim().is_empty() {
        return Err(LdapError::filter("condition field must not be empty"));
    }
    let field = attribute_name(&condition.field)?;
    let value = condition.value.as_ref();

    let filter = match condition.operator {
        Operator::IContains => LdapFilter::contains(field, text(field, value)?),
        Operator::IStartsWith => LdapFilter::starts_with(field, text(field, value)?),
        Operator::IEndsWith => LdapFilter::ends_with(field, text(field, value)?),
        Operator::Eq => LdapFilter::eq(field, scalar(field, value)?),
        Operator::Gte => LdapFilter::GreaterOrEqual {
            attr: field.to_string(),
            value: scalar(field, value)?,
        },
        Operator::Lte => LdapFilter::LessOrEqual {
            attr: field.to_string(),
            value: scalar(field, value)?,
        },
        Operator::In => {
            let mut values = match value {
                Some(FilterValue::List(values)) if !values.is_empty() => values.clone(),
                _ => {
                    return Err(LdapError::filter(format!(
                        "'in' on '{field}' requires a non-empty array"
                    )))
                }
            };
            if values.len() == 1 {
                LdapFilter::eq(field, values.remove(0))
            } else {
                LdapFilter::Or(values.into_iter().map(|v| LdapFilter::eq(field, v)).collect())
            }
        }
        Operator::IsNull => LdapFilter::Not(Box::new(LdapFilter::present(field))),
    };
    Ok(filter)
}

fn text(field: &str, value: Option<&FilterValue>) -> LdapResult<String> {
    match value {
        Some(FilterValue::Text(s)) if !s.is_empty() => Ok(s.clone()),
        _ => Err(LdapError::filter(format!(
            "operator on '{field}' requires a non-empty string"
        ))),
    }
}

fn scalar(field: &str, value: Option<&FilterValue>) -> LdapResult<String> {
    value
        .and_then(FilterValue::scalar)
        .ok_or_else(|| LdapError::filter(format!("operator on '{field}' requires a scalar value")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn cond(field: &str, operator: Operator, value: &str) -> FilterNode {
        FilterNode::condition(field, operator, Some(value.into()))
    }

    fn render(node: &FilterNode) -> String {
        compile(node).unwrap().to_string()
    }

    #[test]
    fn operators_compile() {
        assert_eq!(render(&cond("cn", Operator::IContains, "oh")), "(cn=*oh*)");
        assert_eq!(render(&cond("cn", Operator::IStartsWith, "jo")), "(cn=jo*)");
        assert_eq!(render(&cond("cn", Operator::IEndsWith, "hn")), "(cn=*hn)");
        assert_eq!(render(&cond("cn", Operator::Eq, "john")), "(cn=john)");
        assert_eq!(render(&cond("uid", Operator::Gte, "5")), "(uid>=5)");
        assert_eq!(render(&cond("uid", Operator::Lte, "9")), "(uid<=9)");
        assert_eq!(
            render(&FilterNode::condition("mail", Operator::IsNull, None)),
            "(!(mail=*))"
        );
        assert_eq!(
            render(&FilterNode::condition(
                "cn",
                Operator::In,
                Some(vec!["a".to_string(), "b".to_string()].into())
            )),
            "(|(cn=a)(cn=b))"
        );
    }

    #[test]
    fn scalars_are_coerced() {
        let number = FilterNode::from_json(
            r#"{"type":"condition","field":"uidNumber","operator":"eq","value":42}"#,
        )
        .unwrap();
        assert_eq!(render(&number), "(uidNumber=42)");

        let flag = FilterNode::from_json(
            r#"{"type":"condition","field":"active","operator":"eq","value":true}"#,
        )
        .unwrap();
        assert_eq!(render(&flag), "(active=TRUE)");
    }

    #[test]
    fn single_child_is_inlined() {
        let child = cond("cn", Operator::Eq, "x");
        let direct = compile(&child).unwrap();
        assert_eq!(compile(&FilterNode::and(vec![child.clone()])).unwrap(), direct);
        assert_eq!(compile(&FilterNode::or(vec![child])).unwrap(), direct);
    }

    #[test]
    fn empty_combinators_are_noops() {
        let mut builder = QueryBuilder::new();
        add_filter(&mut builder, &FilterNode::and(vec![])).unwrap();
        add_filter(&mut builder, &FilterNode::or(vec![])).unwrap();
        assert!(builder.is_empty());
    }

    #[test]
    fn nested_tree() {
        let tree = FilterNode::and(vec![
            cond("sn", Operator::Eq, "Doe"),
            FilterNode::or(vec![
                cond("cn", Operator::IStartsWith, "j"),
                FilterNode::not(cond("cn", Operator::Eq, "jane")),
            ]),
        ]);
        assert_eq!(render(&tree), "(&(sn=Doe)(|(cn=j*)(!(cn=jane))))");
    }

    #[test]
    fn not_with_wrong_arity_is_invalid() {
        let none = FilterNode::Not { children: vec![] };
        let two = FilterNode::Not {
            children: vec![cond("a", Operator::Eq, "1"), cond("b", Operator::Eq, "2")],
        };
        assert_eq!(compile(&none).unwrap_err().code(), 5);
        assert_eq!(compile(&two).unwrap_err().code(), 5);
    }

    #[test]
    fn malformed_fields_are_invalid() {
        for field in ["cn)(objectClass=*", "cn=x", "mail*", "given name"] {
            let err = compile(&cond(field, Operator::Eq, "x")).unwrap_err();
            assert_eq!(err.code(), 5, "{field}");
        }
        let nested = FilterNode::or(vec![
            cond("cn", Operator::Eq, "x"),
            FilterNode::condition("(uid", Operator::IsNull, None),
        ]);
        assert!(matches!(compile(&nested), Err(LdapError::FilterInvalid(_))));
    }

    #[test]
    fn field_options_and_oids_are_accepted() {
        assert_eq!(render(&cond(" cn;lang-de ", Operator::Eq, "x")), "(cn;lang-de=x)");
        assert_eq!(render(&cond("2.5.4.3", Operator::Eq, "x")), "(2.5.4.3=x)");
    }

    #[test]
    fn empty_strings_are_invalid() {
        for op in [Operator::IContains, Operator::IStartsWith, Operator::IEndsWith] {
            let err = compile(&cond("cn", op, "")).unwrap_err();
            assert!(matches!(err, LdapError::FilterInvalid(_)));
        }
    }

    #[test]
    fn in_requires_non_empty_array() {
        let empty = FilterNode::condition("cn", Operator::In, Some(Vec::<String>::new().into()));
        let scalar = cond("cn", Operator::In, "a");
        let absent = FilterNode::condition("cn", Operator::In, None);
        for node in [empty, scalar, absent] {
            assert!(matches!(compile(&node), Err(LdapError::FilterInvalid(_))));
        }
    }

    #[test]
    fn unknown_tags_are_invalid() {
        let node = FilterNode::from_json(r#"{"type":"xor","children":[]}"#);
        assert!(matches!(node, Err(LdapError::FilterInvalid(_))));

        let op = FilterNode::from_json(
            r#"{"type":"condition","field":"cn","operator":"like","value":"x"}"#,
        );
        assert!(matches!(op, Err(LdapError::FilterInvalid(_))));
    }

    #[test]
    fn values_are_escaped() {
        assert_eq!(render(&cond("cn", Operator::IContains, "a*b")), "(cn=*a\\2ab*)");
    }
}
