//! # Static In-Memory Runtime
//!
//! A [`PolicyRuntime`] over a fixed JSON data document. Each package is a
//! dotted path into that document holding the package's rule results, so a
//! package `app.GET.users` with value `{"allowed": true}` answers
//! `x = data.app.GET.users` with `{"x": {"allowed": true}}`.
//!
//! Supported query forms:
//!
//! | Form | Example |
//! |------|---------|
//! | `<var> = <term>` | `x = data.app.GET` |
//! | `<term>` | `input.user.id` |
//!
//! where `<term>` is `data[.ref]`, `input[.ref]`, or a JSON literal.
//! Partial evaluation returns `{"queries": [[]]}` when the query is
//! unconditionally true, `{}` when it can never hold, and the query itself as
//! a residual when it references an unknown. Rules are never inlined, so
//! `disable_inlining` has no effect.

use std::time::Instant;

use async_trait::async_trait;
use serde_json::{json, Map, Value};
use verdict_core::ExplainMode;

use crate::error::RuntimeError;
use crate::{CompileResult, EvalOptions, EvalResult, PolicyRuntime};

#[derive(Debug, Clone, PartialEq)]
enum Term {
    Data(Vec<String>),
    Input(Vec<String>),
    Literal(Value),
}

impl Term {
    fn resolve(&self, data: &Value, input: &Value) -> Option<Value> {
        match self {
            Self::Data(path) => lookup(data, path).cloned(),
            Self::Input(path) => lookup(input, path).cloned(),
            Self::Literal(v) => Some(v.clone()),
        }
    }

    /// Whether this term overlaps any of the unknown references.
    fn touches(&self, unknowns: &[String]) -> bool {
        let (root, path) = match self {
            Self::Data(p) => ("data", p),
            Self::Input(p) => ("input", p),
            Self::Literal(_) => return false,
        };
        let mut reference = root.to_string();
        for seg in path {
            reference.push('.');
            reference.push_str(seg);
        }
        unknowns.iter().any(|u| {
            let u = u.as_str();
            reference == u
                || reference.starts_with(&format!("{u}."))
                || u.starts_with(&format!("{reference}."))
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
struct Expr {
    var: Option<String>,
    term: Term,
}

fn parse(query: &str) -> Result<Expr, RuntimeError> {
    let bad = |reason: &str| RuntimeError::Query {
        query: query.to_string(),
        reason: reason.to_string(),
    };

    let text = query.trim();
    if text.is_empty() {
        return Err(bad("empty query"));
    }

    let (var, term_text) = match text.split_once('=') {
        Some((lhs, rhs)) if is_var(lhs.trim()) => {
            if rhs.starts_with('=') {
                return Err(bad("comparison is not supported"));
            }
            (Some(lhs.trim().to_string()), rhs.trim())
        }
        _ => (None, text),
    };

    let term = parse_term(term_text).ok_or_else(|| bad("unsupported term"))?;
    Ok(Expr { var, term })
}

fn is_var(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

fn parse_term(text: &str) -> Option<Term> {
    for (root, make) in [
        ("data", Term::Data as fn(Vec<String>) -> Term),
        ("input", Term::Input as fn(Vec<String>) -> Term),
    ] {
        if text == root {
            return Some(make(Vec::new()));
        }
        if let Some(rest) = text.strip_prefix(root).and_then(|r| r.strip_prefix('.')) {
            let segments: Vec<String> = rest.split('.').map(str::to_string).collect();
            if segments.iter().any(|s| s.is_empty() || s.contains(char::is_whitespace)) {
                return None;
            }
            return Some(make(segments));
        }
    }
    serde_json::from_str(text).ok().map(Term::Literal)
}

fn lookup<'a>(root: &'a Value, path: &[String]) -> Option<&'a Value> {
    path.iter().try_fold(root, |v, seg| v.as_object()?.get(seg))
}

fn insert_at(root: &mut Value, path: &str, value: Value) {
    let segments: Vec<&str> = path.split('.').collect();
    let Some((last, parents)) = segments.split_last() else {
        return;
    };
    let mut current = root;
    for seg in parents {
        if !current.is_object() {
            *current = Value::Object(Map::new());
        }
        current = match current {
            Value::Object(map) => map
                .entry(seg.to_string())
                .or_insert_with(|| Value::Object(Map::new())),
            _ => return,
        };
    }
    if !current.is_object() {
        *current = Value::Object(Map::new());
    }
    if let Value::Object(map) = current {
        map.insert(last.to_string(), value);
    }
}

fn truthy(v: &Option<Value>) -> bool {
    !matches!(v, None | Some(Value::Bool(false)))
}

/// In-memory policy runtime.
#[derive(Debug, Clone)]
pub struct StaticRuntime {
    packages: Vec<String>,
    data: Value,
}

impl Default for StaticRuntime {
    fn default() -> Self {
        Self::new()
    }
}

impl StaticRuntime {
    /// A runtime with no packages and an empty data document.
    pub fn new() -> Self {
        Self {
            packages: Vec::new(),
            data: Value::Object(Map::new()),
        }
    }

    /// Add a package whose rule results are `results`.
    pub fn with_package(mut self, name: &str, results: Value) -> Self {
        insert_at(&mut self.data, name, results);
        if !self.packages.iter().any(|p| p == name) {
            self.packages.push(name.to_string());
        }
        self
    }

    /// Place plain data at `path` without declaring a package.
    pub fn with_data(mut self, path: &str, value: Value) -> Self {
        insert_at(&mut self.data, path, value);
        self
    }

    fn explanation(&self, query: &str, defined: bool, options: &EvalOptions) -> Option<Vec<Value>> {
        let steps: Vec<(&str, String)> = match options.explain {
            ExplainMode::Off => return None,
            ExplainMode::Notes => Vec::new(),
            ExplainMode::Fails if defined => Vec::new(),
            ExplainMode::Fails => vec![("fail", query.to_string())],
            ExplainMode::Full => {
                let last = if defined { "exit" } else { "fail" };
                vec![
                    ("enter", query.to_string()),
                    ("eval", query.to_string()),
                    (last, query.to_string()),
                ]
            }
        };
        Some(
            steps
                .into_iter()
                .map(|(op, node)| {
                    if options.pretty {
                        Value::String(format!("{op} {node}"))
                    } else {
                        json!({"op": op, "node": node})
                    }
                })
                .collect(),
        )
    }

    fn metrics(started: Instant, options: &EvalOptions) -> Option<Map<String, Value>> {
        if !(options.metrics || options.instrument) {
            return None;
        }
        let mut m = Map::new();
        m.insert(
            "timer_rego_query_eval_ns".into(),
            json!(started.elapsed().as_nanos() as u64),
        );
        Some(m)
    }
}

#[async_trait]
impl PolicyRuntime for StaticRuntime {
    async fn list_packages(&self, internal_prefix: &str) -> Result<Vec<String>, RuntimeError> {
        Ok(self
            .packages
            .iter()
            .filter(|p| p.starts_with(internal_prefix))
            .cloned()
            .collect())
    }

    async fn evaluate(
        &self,
        query: &str,
        input: &Value,
        options: &EvalOptions,
    ) -> Result<EvalResult, RuntimeError> {
        let started = Instant::now();
        let expr = parse(query)?;
        let value = expr.term.resolve(&self.data, input);

        let bindings = match (&expr.var, value) {
            (Some(var), Some(v)) => {
                let mut row = Map::new();
                row.insert(var.clone(), v);
                vec![row]
            }
            (None, v) if truthy(&v) => vec![Map::new()],
            _ => Vec::new(),
        };

        Ok(EvalResult {
            explanation: self.explanation(query, !bindings.is_empty(), options),
            metrics: Self::metrics(started, options),
            bindings,
        })
    }

    async fn compile(
        &self,
        query: &str,
        input: &Value,
        unknowns: &[String],
        _disable_inlining: bool,
        options: &EvalOptions,
    ) -> Result<CompileResult, RuntimeError> {
        let started = Instant::now();
        let expr = parse(query)?;

        let result = if expr.term.touches(unknowns) {
            json!({"queries": [[query.trim()]]})
        } else {
            let value = expr.term.resolve(&self.data, input);
            let holds = match expr.var {
                Some(_) => value.is_some(),
                None => truthy(&value),
            };
            if holds {
                json!({"queries": [[]]})
            } else {
                json!({})
            }
        };

        let defined = result.as_object().is_some_and(|m| !m.is_empty());
        Ok(CompileResult {
            result: result.as_object().cloned().unwrap_or_default(),
            metrics: Self::metrics(started, options),
            explanation: self.explanation(query, defined, options),
        })
    }
}
