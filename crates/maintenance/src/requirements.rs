//! The schema-change requirement DSL.
//!
//! A requirement file is a `;`-separated list of statements:
//!
//! ```text
//! INSERT(balance,uint256,0,public);
//! DELETE(fee,-,-,-);
//! UPDATE(old_owner,uint256,0,private) to(owner,address,-,public);
//! ```
//!
//! A `-` field means "unchanged" (update) or "absent" (insert). Statements
//! that fail to parse are reported and skipped; an unknown action word fails
//! the whole batch, since it suggests the file is not a requirement file at
//! all.

use parser::ast::Visibility;
use smol_str::SmolStr;
use tracing::warn;

use crate::RequirementError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Requirement {
    Insert(VarSpec),
    Delete { name: SmolStr },
    Update { old: VarSpec, new: VarSpec },
}

impl Requirement {
    /// The state variable the requirement is about, as named in the
    /// currently deployed contract.
    pub fn subject(&self) -> &SmolStr {
        match self {
            Requirement::Insert(spec) => &spec.name,
            Requirement::Delete { name } => name,
            Requirement::Update { old, .. } => &old.name,
        }
    }
}

/// One `(name,type,value,visibility)` field group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VarSpec {
    pub name: SmolStr,
    pub typ: Option<SmolStr>,
    pub value: Option<SmolStr>,
    pub visibility: Option<Visibility>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedStatement {
    pub statement: String,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ParsedRequirements {
    pub requirements: Vec<Requirement>,
    pub skipped: Vec<SkippedStatement>,
}

/// Parse a requirement file.
pub fn parse_requirements(text: &str) -> Result<ParsedRequirements, RequirementError> {
    let mut parsed = ParsedRequirements::default();
    for statement in text.split(';') {
        let statement = statement.trim();
        if statement.is_empty() {
            continue;
        }
        match parse_statement(statement) {
            Ok(requirement) => parsed.requirements.push(requirement),
            Err(RequirementError::UnknownAction(action)) => {
                return Err(RequirementError::UnknownAction(action));
            }
            Err(err) => {
                warn!(statement, %err, "skipping unparseable requirement");
                parsed.skipped.push(SkippedStatement {
                    statement: statement.to_string(),
                    reason: err.to_string(),
                });
            }
        }
    }
    Ok(parsed)
}

fn parse_statement(statement: &str) -> Result<Requirement, RequirementError> {
    let unparseable = |reason: &str| RequirementError::Unparseable {
        statement: statement.to_string(),
        reason: reason.to_string(),
    };

    let paren = statement
        .find('(')
        .ok_or_else(|| unparseable("missing `(`"))?;
    let action = statement[..paren].trim();
    let (fields, rest) = field_group(&statement[paren..])
        .ok_or_else(|| unparseable("unbalanced parentheses"))?;

    match action {
        "INSERT" => {
            if !rest.trim().is_empty() {
                return Err(unparseable("trailing input after field group"));
            }
            let spec = var_spec(&fields).map_err(|reason| unparseable(reason))?;
            if spec.typ.is_none() {
                return Err(unparseable("an insert needs a concrete type"));
            }
            Ok(Requirement::Insert(spec))
        }
        "DELETE" => {
            if !rest.trim().is_empty() {
                return Err(unparseable("trailing input after field group"));
            }
            let spec = var_spec(&fields).map_err(|reason| unparseable(reason))?;
            Ok(Requirement::Delete { name: spec.name })
        }
        "UPDATE" => {
            let rest = rest
                .trim_start()
                .strip_prefix("to")
                .ok_or_else(|| unparseable("an update needs a `to(...)` group"))?;
            let rest = rest.trim_start();
            if !rest.starts_with('(') {
                return Err(unparseable("an update needs a `to(...)` group"));
            }
            let (new_fields, tail) =
                field_group(rest).ok_or_else(|| unparseable("unbalanced parentheses"))?;
            if !tail.trim().is_empty() {
                return Err(unparseable("trailing input after `to(...)` group"));
            }
            let old = var_spec(&fields).map_err(|reason| unparseable(reason))?;
            let new = var_spec(&new_fields).map_err(|reason| unparseable(reason))?;
            Ok(Requirement::Update { old, new })
        }
        other => Err(RequirementError::UnknownAction(other.to_string())),
    }
}

/// Split a parenthesized group into top-level comma-separated fields,
/// returning the fields and the text after the closing paren. Nested
/// parentheses (mapping types) stay inside one field.
fn field_group(text: &str) -> Option<(Vec<String>, &str)> {
    let mut depth = 0usize;
    let mut fields = vec![];
    let mut field = String::new();
    for (i, c) in text.char_indices() {
        match c {
            '(' => {
                depth += 1;
                if depth > 1 {
                    field.push(c);
                }
            }
            ')' => {
                depth = depth.checked_sub(1)?;
                if depth == 0 {
                    fields.push(field.trim().to_string());
                    return Some((fields, &text[i + 1..]));
                }
                field.push(c);
            }
            ',' if depth == 1 => {
                fields.push(field.trim().to_string());
                field.clear();
            }
            _ => {
                if depth >= 1 {
                    field.push(c);
                }
            }
        }
    }
    None
}

fn var_spec(fields: &[String]) -> Result<VarSpec, &'static str> {
    let [name, typ, value, visibility] = fields else {
        return Err("expected exactly four fields");
    };
    if name == "-" || name.is_empty() {
        return Err("the name field is required");
    }
    let visibility = match visibility.as_str() {
        "-" => None,
        word => Some(Visibility::parse(word).ok_or("not a visibility keyword")?),
    };
    Ok(VarSpec {
        name: name.as_str().into(),
        typ: blank_or(typ),
        value: blank_or(value),
        visibility,
    })
}

fn blank_or(field: &str) -> Option<SmolStr> {
    (field != "-").then(|| field.into())
}
