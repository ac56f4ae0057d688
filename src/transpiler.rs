//! Where-clause transpiler.
//!
//! Renders lookups into the server's query dialect. Negation has its own
//! table: a negated `gt` is `<=` on the same operand, not `NOT (x > y)`.

use crate::ast::*;
use crate::error::{EwizError, EwizResult};

/// Trait for rendering query nodes into the `where=` dialect.
pub trait ToWhere {
    fn to_where(&self) -> String;
}

/// How a lookup's value is written after the operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Literal {
    /// `'v'`
    Quoted,
    /// `'%v%'`, `'v%'`, `'%v'`
    Like { lead: bool, trail: bool },
    /// `('a', 'b')`
    List,
    /// `'a' AND 'b'`
    Between,
    /// No literal.
    Bare,
}

/// Rendering rule for one (lookup, negated) pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Rule {
    operator: &'static str,
    literal: Literal,
}

const fn rule(operator: &'static str, literal: Literal) -> Rule {
    Rule { operator, literal }
}

const QUOTED: Literal = Literal::Quoted;
const CONTAINS: Literal = Literal::Like { lead: true, trail: true };
const STARTS: Literal = Literal::Like { lead: false, trail: true };
const ENDS: Literal = Literal::Like { lead: true, trail: false };

fn positive_rule(lookup: Lookup) -> Rule {
    match lookup {
        Lookup::Exact | Lookup::IExact => rule("=", QUOTED),
        Lookup::Contains | Lookup::IContains => rule("LIKE", CONTAINS),
        Lookup::Gt => rule(">", QUOTED),
        Lookup::Gte => rule(">=", QUOTED),
        Lookup::Lt => rule("<", QUOTED),
        Lookup::Lte => rule("<=", QUOTED),
        Lookup::StartsWith | Lookup::IStartsWith => rule("LIKE", STARTS),
        Lookup::EndsWith | Lookup::IEndsWith => rule("LIKE", ENDS),
        Lookup::In => rule("IN", Literal::List),
        Lookup::Range | Lookup::Year => rule("BETWEEN", Literal::Between),
        Lookup::IsNull => rule("IS NULL", Literal::Bare),
    }
}

fn negated_rule(lookup: Lookup) -> Rule {
    match lookup {
        Lookup::Exact | Lookup::IExact => rule("!=", QUOTED),
        Lookup::Contains | Lookup::IContains => rule("NOT LIKE", CONTAINS),
        Lookup::Gt => rule("<=", QUOTED),
        Lookup::Gte => rule("<", QUOTED),
        Lookup::Lt => rule(">=", QUOTED),
        Lookup::Lte => rule(">", QUOTED),
        Lookup::StartsWith | Lookup::IStartsWith => rule("NOT LIKE", STARTS),
        Lookup::EndsWith | Lookup::IEndsWith => rule("NOT LIKE", ENDS),
        Lookup::In => rule("NOT IN", Literal::List),
        Lookup::Range | Lookup::Year => rule("NOT BETWEEN", Literal::Between),
        Lookup::IsNull => rule("IS NOT NULL", Literal::Bare),
    }
}

fn quote(v: &str) -> String {
    format!("'{}'", v)
}

fn single<'a>(lookup: Lookup, value: &'a FilterValue) -> EwizResult<&'a str> {
    match value {
        FilterValue::Single(v) => Ok(v),
        other => Err(EwizError::InvalidValue(format!(
            "lookup '{}' takes a single value, got {:?}",
            lookup, other
        ))),
    }
}

fn list<'a>(lookup: Lookup, value: &'a FilterValue) -> EwizResult<&'a [String]> {
    match value {
        FilterValue::List(values) if !values.is_empty() => Ok(values),
        other => Err(EwizError::InvalidValue(format!(
            "lookup '{}' takes a list of values, got {:?}",
            lookup, other
        ))),
    }
}

/// Compile one filter against a storage column.
pub fn compile_filter(
    column: &str,
    lookup: Lookup,
    negated: bool,
    value: &FilterValue,
) -> EwizResult<Filter> {
    let rule = if negated { negated_rule(lookup) } else { positive_rule(lookup) };

    let literal = match rule.literal {
        Literal::Quoted => Some(quote(single(lookup, value)?)),
        Literal::Like { lead, trail } => {
            let v = single(lookup, value)?;
            let lead = if lead { "%" } else { "" };
            let trail = if trail { "%" } else { "" };
            Some(format!("'{}{}{}'", lead, v, trail))
        }
        Literal::List => {
            let values: Vec<String> = list(lookup, value)?.iter().map(|v| quote(v)).collect();
            Some(format!("({})", values.join(", ")))
        }
        Literal::Between => {
            let values = list(lookup, value)?;
            if values.len() != 2 {
                return Err(EwizError::InvalidValue(format!(
                    "lookup '{}' takes exactly two bounds, got {}",
                    lookup,
                    values.len()
                )));
            }
            let bounds: Vec<String> = values.iter().map(|v| quote(v)).collect();
            Some(bounds.join(" AND "))
        }
        Literal::Bare => None,
    };

    Ok(Filter {
        column: column.to_string(),
        operator: rule.operator,
        literal,
    })
}

impl ToWhere for Filter {
    fn to_where(&self) -> String {
        match &self.literal {
            Some(literal) => format!("{} {} {}", self.column, self.operator, literal),
            None => format!("{} {}", self.column, self.operator),
        }
    }
}

impl ToWhere for OrderTerm {
    fn to_where(&self) -> String {
        format!("{} {}", self.column, self.order.as_str())
    }
}

impl ToWhere for QuerySpec {
    /// `filters [ORDER BY ordering] LIMIT n OFFSET m`
    fn to_where(&self) -> String {
        let filters: Vec<String> = self.effective_filters().iter().map(|f| f.to_where()).collect();
        let mut clause = filters.join(" AND ");

        if !self.ordering.is_empty() {
            let ordering: Vec<String> = self.ordering.iter().map(|o| o.to_where()).collect();
            clause.push_str(" ORDER BY ");
            clause.push_str(&ordering.join(", "));
        }

        clause.push_str(&format!(
            " LIMIT {} OFFSET {}",
            self.limits.limit, self.limits.offset
        ));
        clause
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn render(lookup: Lookup, negated: bool, value: FilterValue) -> String {
        compile_filter("status", lookup, negated, &value).unwrap().to_where()
    }

    #[test]
    fn test_comparisons() {
        assert_eq!(render(Lookup::Exact, false, "Open".into()), "status = 'Open'");
        assert_eq!(render(Lookup::Exact, true, "Open".into()), "status != 'Open'");
        assert_eq!(render(Lookup::Gt, false, "3".into()), "status > '3'");
        assert_eq!(render(Lookup::Gt, true, "3".into()), "status <= '3'");
        assert_eq!(render(Lookup::Gte, true, "3".into()), "status < '3'");
        assert_eq!(render(Lookup::Lt, true, "3".into()), "status >= '3'");
        assert_eq!(render(Lookup::Lte, true, "3".into()), "status > '3'");
    }

    #[test]
    fn test_like_shapes() {
        assert_eq!(render(Lookup::IContains, false, "net".into()), "status LIKE '%net%'");
        assert_eq!(render(Lookup::StartsWith, true, "net".into()), "status NOT LIKE 'net%'");
        assert_eq!(render(Lookup::IEndsWith, false, "net".into()), "status LIKE '%net'");
    }

    #[test]
    fn test_multi_value() {
        assert_eq!(
            render(Lookup::In, false, ["Open", "Closed"].into()),
            "status IN ('Open', 'Closed')"
        );
        assert_eq!(
            render(Lookup::In, true, ["Open"].into()),
            "status NOT IN ('Open')"
        );
        assert_eq!(
            render(Lookup::Range, false, ["1", "9"].into()),
            "status BETWEEN '1' AND '9'"
        );
        assert_eq!(
            render(Lookup::Year, true, ["2013-01-01", "2013-12-31"].into()),
            "status NOT BETWEEN '2013-01-01' AND '2013-12-31'"
        );
    }

    #[test]
    fn test_isnull_has_no_literal() {
        assert_eq!(render(Lookup::IsNull, false, FilterValue::Empty), "status IS NULL");
        assert_eq!(render(Lookup::IsNull, true, true.into()), "status IS NOT NULL");
    }

    #[test]
    fn test_every_pair_renders_operator() {
        for lookup in Lookup::ALL {
            for negated in [false, true] {
                let value = if lookup.is_multi() {
                    FilterValue::from(["a", "b"])
                } else {
                    FilterValue::from("a")
                };
                let filter = compile_filter("col", lookup, negated, &value).unwrap();
                let rendered = filter.to_where();
                assert!(rendered.starts_with(&format!("col {}", filter.operator)));
                if lookup != Lookup::IsNull {
                    let literal = filter.literal.unwrap();
                    assert!(literal.contains('a') && literal.contains('\''), "{}", rendered);
                }
            }
        }
    }

    #[test]
    fn test_value_shape_errors() {
        let err = compile_filter("c", Lookup::In, false, &"x".into()).unwrap_err();
        assert!(matches!(err, EwizError::InvalidValue(_)));
        let err = compile_filter("c", Lookup::Range, false, &["x"].into()).unwrap_err();
        assert!(matches!(err, EwizError::InvalidValue(_)));
        let err = compile_filter("c", Lookup::Exact, false, &["x"].into()).unwrap_err();
        assert!(matches!(err, EwizError::InvalidValue(_)));
    }

    #[test]
    fn test_where_clause() {
        let mut spec = QuerySpec::new("tickets", "id");
        assert_eq!(
            spec.to_where(),
            format!("id LIKE '%' LIMIT {} OFFSET 0", UNBOUNDED_LIMIT)
        );

        spec.filters.push(compile_filter("status", Lookup::Exact, false, &"Open".into()).unwrap());
        spec.filters.push(compile_filter("priority", Lookup::Gt, true, &"2".into()).unwrap());
        spec.ordering.push(OrderTerm { column: "id".into(), order: SortOrder::Asc });
        spec.limits = Limits::window(10, Some(30));
        assert_eq!(
            spec.to_where(),
            "status = 'Open' AND priority <= '2' ORDER BY id ASC LIMIT 20 OFFSET 10"
        );
    }
}
