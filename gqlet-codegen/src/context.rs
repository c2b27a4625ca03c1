//! Template context: the serializable payload handed to Tera.

use std::collections::BTreeSet;

use serde::Serialize;

use crate::document::{DocumentInfo, OperationKind};
use crate::engine::{GenerateRequest, SchemaRequest};
use crate::error::GenerateError;
use crate::schema::{Schema, TypeKind};
use crate::syntax::TypeRef;

#[derive(Debug, Clone, Serialize)]
pub struct TemplateContext {
    /// Project-relative document path.
    pub document: String,
    pub schema: String,
    pub fingerprint: String,
    /// Short fingerprint, used as an identifier suffix.
    pub hash: String,
    /// Document text as a JSON/TypeScript string literal.
    pub source_literal: String,
    pub use_index_signature: bool,
    pub operations: Vec<OperationCtx>,
    pub fragments: Vec<FragmentCtx>,
    pub input_types: Vec<InputTypeCtx>,
}

#[derive(Debug, Clone, Serialize)]
pub struct OperationCtx {
    pub kind: OperationKind,
    /// Operation name, or `Anonymous` for unnamed operations.
    pub name: String,
    /// `<name><Kind>`, e.g. `ViewerQuery`.
    pub type_name: String,
    pub variables: Vec<FieldCtx>,
}

#[derive(Debug, Clone, Serialize)]
pub struct FragmentCtx {
    pub name: String,
    pub type_condition: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct InputTypeCtx {
    pub name: String,
    pub fields: Vec<FieldCtx>,
}

/// A TypeScript property.
#[derive(Debug, Clone, Serialize)]
pub struct FieldCtx {
    pub name: String,
    pub ts_type: String,
    pub optional: bool,
}

impl TemplateContext {
    pub fn build(req: &GenerateRequest<'_>, info: &DocumentInfo) -> Result<Self, GenerateError> {
        let schema = req.schema;
        let operations = info
            .operations
            .iter()
            .map(|op| {
                let name = op.name.clone().unwrap_or_else(|| "Anonymous".to_string());
                OperationCtx {
                    kind: op.kind,
                    type_name: format!("{name}{}", op.kind.type_suffix()),
                    name,
                    variables: op
                        .variables
                        .iter()
                        .map(|v| field(&v.name, &v.ty, schema))
                        .collect(),
                }
            })
            .collect();
        let fragments = info
            .fragments
            .iter()
            .map(|f| FragmentCtx {
                name: f.name.clone(),
                type_condition: f.type_condition.clone(),
            })
            .collect();

        let roots = info
            .operations
            .iter()
            .flat_map(|op| op.variables.iter().map(|v| v.ty.base()));
        let input_types = reachable_inputs(schema, roots)
            .into_iter()
            .map(|name| InputTypeCtx {
                fields: schema
                    .type_def(&name)
                    .map(|def| {
                        def.fields
                            .iter()
                            .map(|(n, ty)| field(n, ty, schema))
                            .collect()
                    })
                    .unwrap_or_default(),
                name,
            })
            .collect();

        Ok(TemplateContext {
            document: req.document.to_string(),
            schema: schema.name().to_string(),
            fingerprint: req.fingerprint.to_string(),
            hash: req.fingerprint.short().to_string(),
            source_literal: serde_json::to_string(req.content)?,
            use_index_signature: req.options.use_index_signature,
            operations,
            fragments,
            input_types,
        })
    }

    pub fn to_tera_context(&self) -> Result<tera::Context, GenerateError> {
        Ok(tera::Context::from_serialize(self)?)
    }
}

fn field(name: &str, ty: &TypeRef, schema: &Schema) -> FieldCtx {
    FieldCtx {
        name: name.to_string(),
        ts_type: ts_type(ty, schema),
        optional: !ty.is_non_null(),
    }
}

/// TypeScript spelling of a GraphQL input type in a document declaration,
/// where only input objects are declared by name.
pub fn ts_type(ty: &TypeRef, schema: &Schema) -> String {
    render(ty, &|name: &str| {
        builtin(name).map_or_else(
            || match schema.type_def(name).map(|d| d.kind) {
                Some(TypeKind::Input) => name.to_string(),
                Some(TypeKind::Enum) => "string".to_string(),
                _ => "any".to_string(),
            },
            str::to_string,
        )
    })
}

/// TypeScript spelling of a GraphQL type in the schema declaration, where
/// every schema type is declared by name.
pub fn schema_ts_type(ty: &TypeRef) -> String {
    render(ty, &|name: &str| builtin(name).unwrap_or(name).to_string())
}

fn render(ty: &TypeRef, named: &dyn Fn(&str) -> String) -> String {
    fn inner(ty: &TypeRef, named: &dyn Fn(&str) -> String) -> String {
        match ty {
            TypeRef::NonNull(t) => inner(t, named),
            TypeRef::List(t) => format!("Array<{}>", nullable(t, named)),
            TypeRef::Named(name) => named(name),
        }
    }
    fn nullable(ty: &TypeRef, named: &dyn Fn(&str) -> String) -> String {
        if ty.is_non_null() {
            inner(ty, named)
        } else {
            format!("Maybe<{}>", inner(ty, named))
        }
    }
    nullable(ty, named)
}

fn builtin(name: &str) -> Option<&'static str> {
    match name {
        "Int" | "Float" => Some("number"),
        "String" | "ID" => Some("string"),
        "Boolean" => Some("boolean"),
        _ => None,
    }
}

/// Input object types reachable from `roots`, sorted by name.
fn reachable_inputs<'r>(schema: &Schema, roots: impl Iterator<Item = &'r str>) -> BTreeSet<String> {
    let mut seen = BTreeSet::new();
    let mut stack: Vec<String> = roots.map(str::to_string).collect();
    while let Some(name) = stack.pop() {
        let Some(def) = schema.type_def(&name) else {
            continue;
        };
        if def.kind != TypeKind::Input || !seen.insert(name) {
            continue;
        }
        for (_, ty) in &def.fields {
            stack.push(ty.base().to_string());
        }
    }
    seen
}

// ---------------------------------------------------------------------------
// Schema declaration
// ---------------------------------------------------------------------------

/// Payload for the schema declaration template.
#[derive(Debug, Clone, Serialize)]
pub struct SchemaTemplateContext {
    pub schema: String,
    /// Project-relative schema files, in path order.
    pub sources: Vec<String>,
    pub fingerprint: String,
    pub use_index_signature: bool,
    /// Custom scalars, declared as `any`.
    pub scalars: Vec<String>,
    pub enums: Vec<EnumCtx>,
    /// Object, interface and input types.
    pub objects: Vec<ObjectTypeCtx>,
    pub unions: Vec<UnionCtx>,
}

#[derive(Debug, Clone, Serialize)]
pub struct EnumCtx {
    pub name: String,
    pub values: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ObjectTypeCtx {
    pub name: String,
    /// Set for object types, which carry an optional `__typename`.
    pub typename: bool,
    pub fields: Vec<FieldCtx>,
}

#[derive(Debug, Clone, Serialize)]
pub struct UnionCtx {
    pub name: String,
    pub members: Vec<String>,
}

impl SchemaTemplateContext {
    pub fn build(req: &SchemaRequest<'_>) -> Self {
        let schema = req.schema;
        let mut ctx = SchemaTemplateContext {
            schema: schema.name().to_string(),
            sources: schema.sources().iter().map(|s| s.path.to_string()).collect(),
            fingerprint: req.fingerprint.to_string(),
            use_index_signature: req.options.use_index_signature,
            scalars: Vec::new(),
            enums: Vec::new(),
            objects: Vec::new(),
            unions: Vec::new(),
        };
        for (name, def) in schema.types() {
            match def.kind {
                TypeKind::Scalar => ctx.scalars.push(name.to_string()),
                TypeKind::Enum => ctx.enums.push(EnumCtx {
                    name: name.to_string(),
                    values: def.values.clone(),
                }),
                TypeKind::Union => ctx.unions.push(UnionCtx {
                    name: name.to_string(),
                    members: def.members.clone(),
                }),
                TypeKind::Object | TypeKind::Interface | TypeKind::Input => {
                    ctx.objects.push(ObjectTypeCtx {
                        name: name.to_string(),
                        typename: def.kind == TypeKind::Object,
                        fields: def
                            .fields
                            .iter()
                            .map(|(n, ty)| FieldCtx {
                                name: n.clone(),
                                ts_type: schema_ts_type(ty),
                                optional: !ty.is_non_null(),
                            })
                            .collect(),
                    })
                }
            }
        }
        ctx
    }

    pub fn to_tera_context(&self) -> Result<tera::Context, GenerateError> {
        Ok(tera::Context::from_serialize(self)?)
    }
}
