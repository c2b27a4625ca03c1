//! Document analysis: operations, variables and fragments, checked against a
//! [`Schema`].

use std::collections::BTreeSet;

use serde::Serialize;

use crate::schema::Schema;
use crate::syntax::{tokenize, Cursor, Token, TypeRef};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OperationKind {
    Query,
    Mutation,
    Subscription,
}

impl OperationKind {
    fn from_keyword(word: &str) -> Option<Self> {
        match word {
            "query" => Some(OperationKind::Query),
            "mutation" => Some(OperationKind::Mutation),
            "subscription" => Some(OperationKind::Subscription),
            _ => None,
        }
    }

    /// `Query`, `Mutation` or `Subscription`.
    pub fn type_suffix(&self) -> &'static str {
        match self {
            OperationKind::Query => "Query",
            OperationKind::Mutation => "Mutation",
            OperationKind::Subscription => "Subscription",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Variable {
    pub name: String,
    pub ty: TypeRef,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Operation {
    pub kind: OperationKind,
    /// `None` for the `{ ... }` shorthand and unnamed operations.
    pub name: Option<String>,
    pub variables: Vec<Variable>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fragment {
    pub name: String,
    pub type_condition: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DocumentInfo {
    pub operations: Vec<Operation>,
    pub fragments: Vec<Fragment>,
}

/// Parse `content` and check every type it names against `schema`.
///
/// Errors are human-readable messages, passed through to the caller as-is.
pub fn analyze(content: &str, schema: &Schema) -> Result<DocumentInfo, String> {
    let tokens = tokenize(content);
    let mut cur = Cursor::new(&tokens);
    let mut info = DocumentInfo::default();
    let mut type_names: Vec<String> = Vec::new();

    while let Some(token) = cur.peek() {
        match token {
            Token::Punct('{') => {
                selection_set(&mut cur, &mut type_names)?;
                info.operations.push(Operation {
                    kind: OperationKind::Query,
                    name: None,
                    variables: Vec::new(),
                });
            }
            Token::Name("fragment") => {
                cur.bump();
                let name = cur.expect_name()?.to_string();
                if !cur.is_name("on") {
                    return Err(cur.unexpected("Expected \"on\""));
                }
                cur.bump();
                let type_condition = cur.expect_name()?.to_string();
                type_names.push(type_condition.clone());
                cur.skip_directives()?;
                selection_set(&mut cur, &mut type_names)?;
                info.fragments.push(Fragment { name, type_condition });
            }
            Token::Name(word) => {
                let Some(kind) = OperationKind::from_keyword(word) else {
                    return Err(cur.unexpected("Unexpected Name"));
                };
                cur.bump();
                let name = match cur.peek() {
                    Some(Token::Name(n)) => {
                        cur.bump();
                        Some(n.to_string())
                    }
                    _ => None,
                };
                let variables = if cur.is_punct('(') {
                    variable_definitions(&mut cur)?
                } else {
                    Vec::new()
                };
                for var in &variables {
                    type_names.push(var.ty.base().to_string());
                }
                cur.skip_directives()?;
                selection_set(&mut cur, &mut type_names)?;
                info.operations.push(Operation { kind, name, variables });
            }
            _ => return Err(cur.unexpected("Unexpected token")),
        }
    }

    for name in &type_names {
        if !schema.has_type(name) {
            return Err(format!("Unknown type \"{name}\"."));
        }
    }
    check_operations(&info)?;
    Ok(info)
}

fn check_operations(info: &DocumentInfo) -> Result<(), String> {
    if info.operations.is_empty() && info.fragments.is_empty() {
        return Err("Document contains no operations or fragments.".to_string());
    }
    if info.operations.len() > 1 && info.operations.iter().any(|op| op.name.is_none()) {
        return Err("This anonymous operation must be the only defined operation.".to_string());
    }
    let mut seen = BTreeSet::new();
    for name in info.operations.iter().filter_map(|op| op.name.as_deref()) {
        if !seen.insert(name) {
            return Err(format!("There can be only one operation named \"{name}\"."));
        }
    }
    let mut seen = BTreeSet::new();
    for fragment in &info.fragments {
        if !seen.insert(fragment.name.as_str()) {
            return Err(format!(
                "There can be only one fragment named \"{}\".",
                fragment.name
            ));
        }
    }
    Ok(())
}

/// `($id: ID!, $first: Int = 10 @dir)`
fn variable_definitions(cur: &mut Cursor<'_, '_>) -> Result<Vec<Variable>, String> {
    let mut out = Vec::new();
    cur.expect('(')?;
    while !cur.eat(')') {
        cur.expect('$')?;
        let name = cur.expect_name()?.to_string();
        cur.expect(':')?;
        let ty = cur.type_ref()?;
        if cur.eat('=') {
            cur.skip_value()?;
        }
        cur.skip_directives()?;
        out.push(Variable { name, ty });
    }
    Ok(out)
}

/// Skip a selection set, recording inline fragment type conditions.
fn selection_set(cur: &mut Cursor<'_, '_>, type_names: &mut Vec<String>) -> Result<(), String> {
    cur.expect('{')?;
    let mut depth = 1usize;
    while depth > 0 {
        match cur.bump() {
            Some(Token::Punct('{')) => depth += 1,
            Some(Token::Punct('}')) => depth -= 1,
            Some(Token::Spread) if cur.is_name("on") => {
                cur.bump();
                type_names.push(cur.expect_name()?.to_string());
            }
            Some(_) => {}
            None => return Err(cur.unexpected("Expected \"}\"")),
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::SchemaSource;
    use gqlet_core::{DocumentPath, SchemaName};

    fn schema() -> Schema {
        let sdl = "type Query { viewer: User user(id: ID!): User }\n\
                   type Mutation { rename(input: RenameInput!): User }\n\
                   type User { id: ID! name: String }\n\
                   input RenameInput { id: ID! name: String! }";
        Schema::parse(
            SchemaName::default_schema(),
            vec![SchemaSource {
                path: DocumentPath::from("schema.graphqls"),
                content: sdl.to_string(),
            }],
        )
        .unwrap()
    }

    #[test]
    fn collects_operations_variables_and_fragments() {
        let doc = "query Viewer { viewer { ...UserParts } }\n\
                   mutation Rename($input: RenameInput!, $dry: Boolean = false) {\n\
                     rename(input: $input) { id }\n\
                   }\n\
                   fragment UserParts on User { id name }";
        let info = analyze(doc, &schema()).unwrap();
        assert_eq!(info.operations.len(), 2);
        assert_eq!(info.operations[0].name.as_deref(), Some("Viewer"));
        let rename = &info.operations[1];
        assert_eq!(rename.kind, OperationKind::Mutation);
        assert_eq!(rename.variables.len(), 2);
        assert_eq!(rename.variables[0].ty.to_string(), "RenameInput!");
        assert_eq!(info.fragments[0].type_condition, "User");
    }

    #[test]
    fn shorthand_query_is_anonymous() {
        let info = analyze("{ viewer { id } }", &schema()).unwrap();
        assert_eq!(info.operations[0].name, None);
        assert_eq!(info.operations[0].kind, OperationKind::Query);
    }

    #[test]
    fn unknown_variable_type_is_rejected() {
        let err = analyze("query Q($f: Filter) { viewer { id } }", &schema()).unwrap_err();
        assert_eq!(err, "Unknown type \"Filter\".");
    }

    #[test]
    fn unknown_inline_fragment_type_is_rejected() {
        let err = analyze("query Q { viewer { ... on Admin { id } } }", &schema()).unwrap_err();
        assert_eq!(err, "Unknown type \"Admin\".");
    }

    #[test]
    fn anonymous_operation_must_be_alone() {
        let err = analyze("{ viewer { id } }\nquery Q { viewer { id } }", &schema()).unwrap_err();
        assert!(err.contains("anonymous operation"), "got: {err}");
    }

    #[test]
    fn empty_document_is_rejected() {
        let err = analyze("# only a comment\n", &schema()).unwrap_err();
        assert!(err.contains("no operations"), "got: {err}");
    }

    #[test]
    fn duplicate_operation_names_are_rejected() {
        let err = analyze("query Q { viewer { id } }\nquery Q { viewer { id } }", &schema())
            .unwrap_err();
        assert!(err.contains("only one operation named \"Q\""), "got: {err}");
    }
}
