use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;

use regex::Regex;
use tracing::{debug, warn};

use crate::error::{MergeError, Result};
use crate::parser::{parse, ConditionalStatement, OptionStatement, Statement, Value};

/// Transaction fields that rules files may set as defaults or rule actions.
pub const ALLOWED_FIELDS: &[&str] = &[
    "date",
    "date2",
    "status",
    "code",
    "description",
    "comment",
    "account1",
    "account2",
    "currency",
    "amount",
    "amount-in",
    "amount-out",
];

pub fn is_allowed_field(name: &str) -> bool {
    ALLOWED_FIELDS.contains(&name)
}

/// Field name to value, as produced by defaults, rule actions and matches.
pub type Fields = BTreeMap<String, String>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OptionValue {
    Integer(usize),
    Text(String),
    List(Vec<String>),
}

impl fmt::Display for OptionValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OptionValue::Integer(n) => write!(f, "{n}"),
            OptionValue::Text(s) => f.write_str(s),
            OptionValue::List(items) => f.write_str(&items.join(", ")),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Rule {
    pub pattern: Regex,
    pub actions: Fields,
}

impl PartialEq for Rule {
    fn eq(&self, other: &Self) -> bool {
        self.pattern.as_str() == other.pattern.as_str() && self.actions == other.actions
    }
}

#[derive(Debug, Clone, Default)]
pub struct Ruleset {
    options: BTreeMap<String, OptionValue>,
    defaults: Fields,
    rules: Vec<Rule>,
}

fn scalar<'a>(stmt: &'a OptionStatement, what: &str) -> Result<&'a str> {
    match &stmt.value {
        Value::Scalar(s) => Ok(s.as_str()),
        Value::List(_) => Err(MergeError::Validation(format!(
            "{what} '{}' on line {} must be a single value, not a comma-separated list",
            stmt.keyword, stmt.line
        ))),
    }
}

fn option_value(stmt: &OptionStatement) -> Result<OptionValue> {
    match (stmt.keyword.as_str(), &stmt.value) {
        ("skip", Value::Scalar(s)) => s.parse().map(OptionValue::Integer).map_err(|_| {
            MergeError::Validation(format!(
                "skip on line {} must be a whole number, got '{s}'",
                stmt.line
            ))
        }),
        ("skip", Value::List(_)) => Err(MergeError::Validation(format!(
            "skip on line {} must be a whole number",
            stmt.line
        ))),
        ("fields", Value::Scalar(s)) => Ok(OptionValue::List(
            s.split(',').map(|name| name.trim().to_string()).collect(),
        )),
        ("fields", Value::List(names)) => Ok(OptionValue::List(
            names.iter().map(|name| name.trim().to_string()).collect(),
        )),
        (_, Value::Scalar(s)) => Ok(OptionValue::Text(s.clone())),
        (_, Value::List(items)) => Ok(OptionValue::List(items.clone())),
    }
}

fn action_map(block: &ConditionalStatement) -> Result<Fields> {
    let mut actions = Fields::new();
    for stmt in &block.body {
        if !is_allowed_field(&stmt.keyword) {
            return Err(MergeError::Validation(format!(
                "unknown field '{}' on line {} (expected one of: {})",
                stmt.keyword,
                stmt.line,
                ALLOWED_FIELDS.join(", ")
            )));
        }
        actions.insert(stmt.keyword.clone(), stmt.raw.clone());
    }
    Ok(actions)
}

impl Ruleset {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses rules text and folds it into a ruleset. Any syntax or
    /// validation problem aborts the whole load.
    pub fn parse(text: &str) -> Result<Self> {
        let mut ruleset = Self::new();
        for statement in parse(text)? {
            match statement {
                Statement::Keyword(stmt) => ruleset.apply_keyword(&stmt)?,
                Statement::If(block) => ruleset.apply_block(&block)?,
            }
        }
        debug!(
            options = ruleset.options.len(),
            defaults = ruleset.defaults.len(),
            rules = ruleset.rules.len(),
            "loaded ruleset"
        );
        Ok(ruleset)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::parse(&text)
    }

    fn apply_keyword(&mut self, stmt: &OptionStatement) -> Result<()> {
        if is_allowed_field(&stmt.keyword) {
            let value = scalar(stmt, "default")?;
            self.set_defaults([(stmt.keyword.as_str(), value)]);
        } else {
            self.options.insert(stmt.keyword.clone(), option_value(stmt)?);
        }
        Ok(())
    }

    fn apply_block(&mut self, block: &ConditionalStatement) -> Result<()> {
        let actions = action_map(block)?;
        if block.conditions.is_empty() {
            warn!(line = block.line, "if block has no conditions and will never match");
        }
        for condition in &block.conditions {
            let pattern = Regex::new(&condition.pattern).map_err(|source| MergeError::Pattern {
                line: condition.line,
                pattern: condition.pattern.clone(),
                source,
            })?;
            self.add(pattern, actions.clone())?;
        }
        Ok(())
    }

    /// Merges values into the defaults. Keys are not checked against
    /// [`ALLOWED_FIELDS`].
    pub fn set_defaults<I, K, V>(&mut self, values: I)
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        for (key, value) in values {
            self.defaults.insert(key.into(), value.into());
        }
    }

    /// Appends a rule after all existing ones.
    pub fn add<I, K, V>(&mut self, pattern: Regex, actions: I) -> Result<()>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let actions: Fields = actions
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        let unknown: Vec<&str> = actions
            .keys()
            .map(String::as_str)
            .filter(|k| !is_allowed_field(k))
            .collect();
        if !unknown.is_empty() {
            return Err(MergeError::Validation(format!(
                "unknown field(s) for /{}/: {}",
                pattern.as_str(),
                unknown.join(", ")
            )));
        }
        self.rules.push(Rule { pattern, actions });
        Ok(())
    }

    /// First rule, in definition order, whose pattern occurs in `description`.
    pub fn find_rule(&self, description: &str) -> Option<&Rule> {
        self.rules.iter().find(|rule| rule.pattern.is_match(description))
    }

    /// Defaults overlaid with the actions of the first matching rule.
    pub fn match_description(&self, description: &str) -> Fields {
        let mut result = self.defaults.clone();
        if let Some(rule) = self.find_rule(description) {
            debug!(pattern = rule.pattern.as_str(), description, "rule matched");
            result.extend(rule.actions.iter().map(|(k, v)| (k.clone(), v.clone())));
        }
        result
    }

    pub fn options(&self) -> &BTreeMap<String, OptionValue> {
        &self.options
    }

    pub fn defaults(&self) -> &Fields {
        &self.defaults
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    /// Number of header lines to skip before reading CSV records.
    pub fn skip(&self) -> usize {
        match self.options.get("skip") {
            Some(OptionValue::Integer(n)) => *n,
            _ => 0,
        }
    }

    /// Column names of the CSV, in order.
    pub fn fields(&self) -> Option<&[String]> {
        match self.options.get("fields") {
            Some(OptionValue::List(names)) => Some(names),
            _ => None,
        }
    }
}
