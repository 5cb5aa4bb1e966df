//! Reader for the HCL declaration syntax.
//!
//! ```text
//! provider "aws" {
//!   region = "us-east-1"
//! }
//!
//! resource "function" "CreateProductHandler" {
//!   role    = role.ProductLambdaRole.arn
//!   handler = "bootstrap"
//!   timeout = 10
//! }
//! ```
//!
//! Parsing is done by `hcl-edit`; this module maps the parsed body onto a
//! [`Declaration`]. Traversals become bare expressions, heredocs become text
//! and string templates keep their `${...}` interpolations verbatim.

use crate::decl::{Declaration, ProviderConfig, ResourceDecl};
use hcl_edit::Span;
use hcl_edit::expr::{Expression, TraversalOperator};
use hcl_edit::structure::{Attribute, Block, BlockLabel, Body};
use hcl_edit::template::Element;
use indexmap::IndexMap;
use keystone_core::{CoreError, CoreResult, ResourceKind, Value};
use std::ops::Range;

/// Deepest bracket nesting accepted before parsing
pub const MAX_NESTING: usize = 64;

/// Parse a declaration in the HCL syntax
///
/// # Errors
///
/// Returns `ParseError` with the 1-based line of the first problem
pub fn parse(input: &str) -> CoreResult<Declaration> {
    check_nesting(input)?;
    let body = hcl_edit::parser::parse_body(input).map_err(|e| {
        error(e.location().line(), e.message().to_string())
    })?;
    Reader { source: input }.declaration(&body)
}

fn error(line: usize, message: impl Into<String>) -> CoreError {
    CoreError::ParseError {
        line,
        message: message.into(),
    }
}

/// Reject inputs nested deeper than [`MAX_NESTING`] before the recursive
/// parser sees them. Quoted strings are skipped; comments and heredocs are
/// counted, which only over-approximates.
fn check_nesting(input: &str) -> CoreResult<()> {
    let mut depth = 0usize;
    let mut line = 1;
    let mut in_string = false;
    let mut escaped = false;
    for c in input.chars() {
        if c == '\n' {
            line += 1;
            in_string = false;
            escaped = false;
            continue;
        }
        if in_string {
            match c {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match c {
            '"' => in_string = true,
            '[' | '(' | '{' => {
                depth += 1;
                if depth > MAX_NESTING {
                    return Err(error(
                        line,
                        format!("nesting deeper than {} levels", MAX_NESTING),
                    ));
                }
            }
            ']' | ')' | '}' => depth = depth.saturating_sub(1),
            _ => {}
        }
    }
    Ok(())
}

struct Reader<'s> {
    source: &'s str,
}

impl Reader<'_> {
    fn line(&self, span: Option<Range<usize>>) -> usize {
        span.and_then(|r| self.source.get(..r.start))
            .map_or(1, |before| before.matches('\n').count() + 1)
    }

    fn text(&self, span: Option<Range<usize>>) -> Option<&str> {
        span.and_then(|r| self.source.get(r))
    }

    fn declaration(&self, body: &Body) -> CoreResult<Declaration> {
        if let Some(attr) = body.attributes().next() {
            return Err(error(
                self.line(attr.span()),
                format!("unexpected top-level attribute `{}`", attr.key.as_str()),
            ));
        }

        let mut decl = Declaration::new();
        for block in body.blocks() {
            let line = self.line(block.span());
            match block.ident.as_str() {
                "resource" => {
                    let [kind, name] = self.labels::<2>(block, "`resource` needs a kind and a name")?;
                    let kind: ResourceKind = kind.parse().map_err(|e: CoreError| error(line, e.to_string()))?;
                    decl.resources.push(ResourceDecl {
                        kind,
                        name,
                        attributes: self.attributes(block)?,
                    });
                }
                "provider" => {
                    if decl.provider.is_some() {
                        return Err(error(line, "duplicate provider block"));
                    }
                    let [name] = self.labels::<1>(block, "`provider` needs a name")?;
                    decl.provider = Some(provider(name, self.attributes(block)?, line)?);
                }
                other => {
                    return Err(error(
                        line,
                        format!("expected `resource` or `provider` block, found `{}`", other),
                    ));
                }
            }
        }
        Ok(decl)
    }

    fn labels<const N: usize>(&self, block: &Block, usage: &str) -> CoreResult<[String; N]> {
        let line = self.line(block.span());
        let labels: Vec<String> = block
            .labels
            .iter()
            .map(|label| match label {
                BlockLabel::String(s) => s.value().clone(),
                BlockLabel::Ident(i) => i.as_str().to_string(),
            })
            .collect();
        labels.try_into().map_err(|_| error(line, usage))
    }

    fn attributes(&self, block: &Block) -> CoreResult<IndexMap<String, Value>> {
        if let Some(nested) = block.body.blocks().next() {
            return Err(error(
                self.line(nested.span()),
                format!("nested block `{}` is not supported", nested.ident.as_str()),
            ));
        }

        let mut attributes = IndexMap::new();
        for attr in block.body.attributes() {
            let name = attr.key.as_str().to_string();
            if attributes.contains_key(&name) {
                return Err(error(
                    self.line(attr.span()),
                    format!("attribute `{}` is set twice", name),
                ));
            }
            let value = self.value(attr, &attr.value)?;
            attributes.insert(name, value);
        }
        Ok(attributes)
    }

    fn value(&self, attr: &Attribute, expr: &Expression) -> CoreResult<Value> {
        let unsupported = |what: &str| {
            error(
                self.line(expr.span()),
                format!("attribute `{}`: {} is not supported", attr.key.as_str(), what),
            )
        };

        match expr {
            Expression::String(s) => Ok(Value::String(s.value().clone())),
            Expression::Bool(b) => Ok(Value::Bool(*b.value())),
            Expression::Number(n) => Value::number(&n.value().to_string())
                .map_err(|e| error(self.line(expr.span()), e.to_string())),
            Expression::UnaryOp(_) => {
                let text = self.text(expr.span()).unwrap_or_default();
                Value::number(text.trim()).map_err(|_| unsupported("unary operator"))
            }
            Expression::Array(items) => items
                .iter()
                .map(|item| self.value(attr, item))
                .collect::<CoreResult<Vec<_>>>()
                .map(Value::List),
            Expression::Parenthesis(inner) => self.value(attr, inner.inner()),
            Expression::Variable(v) => Ok(Value::Expression(v.as_str().to_string())),
            Expression::Traversal(traversal) => {
                let Some(root) = traversal.expr.as_variable() else {
                    return Err(unsupported("traversal of a non-variable"));
                };
                let mut path = root.as_str().to_string();
                for op in traversal.operators.iter() {
                    match op.value() {
                        TraversalOperator::GetAttr(name) => {
                            path.push('.');
                            path.push_str(name.as_str());
                        }
                        _ => return Err(unsupported("index or splat traversal")),
                    }
                }
                Ok(Value::Expression(path))
            }
            Expression::StringTemplate(template) => {
                Ok(Value::String(self.template(template.iter(), attr)?))
            }
            Expression::HeredocTemplate(heredoc) => {
                let text = self.template(heredoc.template.iter(), attr)?;
                let indented = self
                    .text(expr.span())
                    .is_some_and(|src| src.starts_with("<<-"));
                Ok(Value::Text(if indented { dedent(&text) } else { text }))
            }
            Expression::Null(_) => Err(unsupported("null")),
            Expression::Object(_) => Err(unsupported("an object")),
            _ => Err(unsupported("a computed expression")),
        }
    }

    /// Flatten template elements back to text, interpolations as `${...}`
    fn template<'e>(
        &self,
        elements: impl Iterator<Item = &'e Element>,
        attr: &Attribute,
    ) -> CoreResult<String> {
        let mut out = String::new();
        for element in elements {
            match element {
                Element::Literal(literal) => out.push_str(literal.value()),
                Element::Interpolation(interpolation) => {
                    let inner = self.text(interpolation.expr.span()).ok_or_else(|| {
                        error(self.line(attr.span()), "interpolation has no source position")
                    })?;
                    out.push_str("${");
                    out.push_str(inner.trim());
                    out.push('}');
                }
                Element::Directive(_) => {
                    return Err(error(
                        self.line(attr.span()),
                        format!("attribute `{}`: template directives are not supported", attr.key.as_str()),
                    ));
                }
            }
        }
        Ok(out)
    }
}

/// Strip the whitespace prefix shared by every non-blank line
fn dedent(text: &str) -> String {
    let strip = text
        .lines()
        .filter(|l| !l.trim().is_empty())
        .map(|l| l.len() - l.trim_start().len())
        .min()
        .unwrap_or(0);
    let mut out = String::with_capacity(text.len());
    for l in text.split_inclusive('\n') {
        out.push_str(l.get(strip..).unwrap_or_else(|| l.trim_start_matches([' ', '\t'])));
    }
    out
}

fn provider(
    name: String,
    mut attributes: IndexMap<String, Value>,
    line: usize,
) -> CoreResult<ProviderConfig> {
    let mut take_string = |key: &str| match attributes.shift_remove(key) {
        None => Ok(None),
        Some(Value::String(s)) => Ok(Some(s)),
        Some(other) => Err(error(
            line,
            format!("provider `{}` must be a string, found {}", key, other),
        )),
    };
    let region = take_string("region")?;
    let profile = take_string("profile")?;
    Ok(ProviderConfig {
        name,
        region,
        profile,
        settings: attributes,
    })
}
