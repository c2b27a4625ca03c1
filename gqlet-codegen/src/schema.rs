//! Schema loading and a lightweight SDL consistency check.
//!
//! The check collects every defined type and every referenced type and fails
//! on the first reference with no definition. It is not a full validator.

use std::collections::BTreeMap;
use std::path::Path;

use gqlet_core::discover::Discovery;
use gqlet_core::{DocumentPath, Globs, SchemaName};

use crate::error::SchemaError;
use crate::syntax::{tokenize, Cursor, Token, TypeRef};

/// Scalars every schema has without declaring them.
pub const BUILTIN_SCALARS: &[&str] = &["Int", "Float", "String", "Boolean", "ID"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeKind {
    Object,
    Interface,
    Input,
    Enum,
    Scalar,
    Union,
}

/// A named type and what it declares. `fields` holds object, interface and
/// input fields; `values` enum values; `members` union members. Extensions
/// append to the original definition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeDef {
    pub kind: TypeKind,
    pub fields: Vec<(String, TypeRef)>,
    pub values: Vec<String>,
    pub members: Vec<String>,
}

/// One schema file as read from disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaSource {
    pub path: DocumentPath,
    pub content: String,
}

/// A checked schema: its sources, sorted by path, and its type table.
#[derive(Debug, Clone)]
pub struct Schema {
    name: SchemaName,
    sources: Vec<SchemaSource>,
    types: BTreeMap<String, TypeDef>,
}

impl Schema {
    /// Resolve `globs` against a project scan, read every match and check it.
    pub fn load(
        root: &Path,
        name: SchemaName,
        globs: &Globs,
        discovery: &Discovery,
    ) -> Result<Schema, SchemaError> {
        let files = discovery.schema_files(globs)?;
        if files.is_empty() {
            return Err(SchemaError::NoFiles {
                globs: globs.to_string(),
            });
        }
        let mut sources = Vec::with_capacity(files.len());
        for path in files {
            let full = path.resolve(root);
            let content = std::fs::read_to_string(&full)
                .map_err(|source| SchemaError::Io { path: full, source })?;
            sources.push(SchemaSource { path, content });
        }
        Schema::parse(name, sources)
    }

    /// Check already-read sources.
    pub fn parse(name: SchemaName, mut sources: Vec<SchemaSource>) -> Result<Schema, SchemaError> {
        sources.sort_by(|a, b| a.path.cmp(&b.path));
        let mut collector = Collector::default();
        for source in &sources {
            collector
                .file(&source.content)
                .map_err(|message| SchemaError::Invalid {
                    message: format!("{}: {message}", source.path),
                })?;
        }
        let types = collector.finish()?;
        Ok(Schema { name, sources, types })
    }

    pub fn name(&self) -> &SchemaName {
        &self.name
    }

    pub fn sources(&self) -> &[SchemaSource] {
        &self.sources
    }

    /// Definition of `name`, or `None` for built-in scalars and unknown names.
    pub fn type_def(&self, name: &str) -> Option<&TypeDef> {
        self.types.get(name)
    }

    pub fn has_type(&self, name: &str) -> bool {
        BUILTIN_SCALARS.contains(&name) || self.types.contains_key(name)
    }

    /// Every defined type, sorted by name.
    pub fn types(&self) -> impl Iterator<Item = (&str, &TypeDef)> {
        self.types.iter().map(|(name, def)| (name.as_str(), def))
    }
}

// ---------------------------------------------------------------------------
// SDL walk
// ---------------------------------------------------------------------------

#[derive(Default)]
struct Collector {
    types: BTreeMap<String, TypeDef>,
    references: Vec<String>,
}

impl Collector {
    fn finish(self) -> Result<BTreeMap<String, TypeDef>, SchemaError> {
        for name in &self.references {
            if !BUILTIN_SCALARS.contains(&name.as_str()) && !self.types.contains_key(name) {
                return Err(SchemaError::Invalid {
                    message: format!("Type \"{name}\" not found in document."),
                });
            }
        }
        Ok(self.types)
    }

    fn file(&mut self, content: &str) -> Result<(), String> {
        let tokens = tokenize(content);
        let mut cur = Cursor::new(&tokens);
        while let Some(token) = cur.peek() {
            match token {
                Token::Value => {
                    cur.bump();
                }
                Token::Name("extend") => {
                    cur.bump();
                }
                Token::Name("schema") => {
                    cur.bump();
                    cur.skip_directives()?;
                    self.root_operations(&mut cur)?;
                }
                Token::Name("directive") => {
                    cur.bump();
                    self.directive_definition(&mut cur)?;
                }
                Token::Name(keyword @ ("type" | "interface" | "input")) => {
                    cur.bump();
                    let kind = match keyword {
                        "type" => TypeKind::Object,
                        "interface" => TypeKind::Interface,
                        _ => TypeKind::Input,
                    };
                    let name = cur.expect_name()?;
                    self.define(name, kind);
                    if cur.is_name("implements") {
                        cur.bump();
                        cur.eat('&');
                        while let Some(Token::Name(iface)) = cur.peek() {
                            cur.bump();
                            self.references.push(iface.to_string());
                            if !cur.eat('&') {
                                break;
                            }
                        }
                    }
                    cur.skip_directives()?;
                    if cur.is_punct('{') {
                        let fields = self.fields(&mut cur)?;
                        if let Some(def) = self.types.get_mut(name) {
                            def.fields.extend(fields);
                        }
                    }
                }
                Token::Name("enum") => {
                    cur.bump();
                    let name = cur.expect_name()?;
                    self.define(name, TypeKind::Enum);
                    cur.skip_directives()?;
                    if cur.is_punct('{') {
                        let values = enum_values(&mut cur)?;
                        if let Some(def) = self.types.get_mut(name) {
                            def.values.extend(values);
                        }
                    }
                }
                Token::Name("scalar") => {
                    cur.bump();
                    let name = cur.expect_name()?;
                    self.define(name, TypeKind::Scalar);
                    cur.skip_directives()?;
                }
                Token::Name("union") => {
                    cur.bump();
                    let name = cur.expect_name()?;
                    self.define(name, TypeKind::Union);
                    cur.skip_directives()?;
                    if cur.eat('=') {
                        cur.eat('|');
                        let mut members = Vec::new();
                        loop {
                            let member = cur.expect_name()?;
                            self.references.push(member.to_string());
                            members.push(member.to_string());
                            if !cur.eat('|') {
                                break;
                            }
                        }
                        if let Some(def) = self.types.get_mut(name) {
                            def.members.extend(members);
                        }
                    }
                }
                _ => return Err(cur.unexpected("Unexpected definition")),
            }
        }
        Ok(())
    }

    fn define(&mut self, name: &str, kind: TypeKind) {
        self.types.entry(name.to_string()).or_insert(TypeDef {
            kind,
            fields: Vec::new(),
            values: Vec::new(),
            members: Vec::new(),
        });
    }

    fn root_operations(&mut self, cur: &mut Cursor<'_, '_>) -> Result<(), String> {
        cur.expect('{')?;
        while !cur.eat('}') {
            cur.expect_name()?;
            cur.expect(':')?;
            let target = cur.expect_name()?;
            self.references.push(target.to_string());
        }
        Ok(())
    }

    fn directive_definition(&mut self, cur: &mut Cursor<'_, '_>) -> Result<(), String> {
        cur.expect('@')?;
        cur.expect_name()?;
        if cur.is_punct('(') {
            self.arguments(cur)?;
        }
        if cur.is_name("repeatable") {
            cur.bump();
        }
        if !cur.is_name("on") {
            return Err(cur.unexpected("Expected \"on\""));
        }
        cur.bump();
        cur.eat('|');
        loop {
            cur.expect_name()?;
            if !cur.eat('|') {
                break;
            }
        }
        Ok(())
    }

    /// `{ field(args): Type = default @dir ... }`
    fn fields(&mut self, cur: &mut Cursor<'_, '_>) -> Result<Vec<(String, TypeRef)>, String> {
        let mut out = Vec::new();
        cur.expect('{')?;
        while !cur.eat('}') {
            if cur.peek() == Some(Token::Value) {
                cur.bump();
                continue;
            }
            let name = cur.expect_name()?;
            if cur.is_punct('(') {
                self.arguments(cur)?;
            }
            cur.expect(':')?;
            let ty = cur.type_ref()?;
            self.references.push(ty.base().to_string());
            if cur.eat('=') {
                cur.skip_value()?;
            }
            cur.skip_directives()?;
            out.push((name.to_string(), ty));
        }
        Ok(out)
    }

    fn arguments(&mut self, cur: &mut Cursor<'_, '_>) -> Result<(), String> {
        cur.expect('(')?;
        while !cur.eat(')') {
            if cur.peek() == Some(Token::Value) {
                cur.bump();
                continue;
            }
            cur.expect_name()?;
            cur.expect(':')?;
            let ty = cur.type_ref()?;
            self.references.push(ty.base().to_string());
            if cur.eat('=') {
                cur.skip_value()?;
            }
            cur.skip_directives()?;
        }
        Ok(())
    }
}

fn enum_values(cur: &mut Cursor<'_, '_>) -> Result<Vec<String>, String> {
    let mut values = Vec::new();
    cur.expect('{')?;
    while !cur.eat('}') {
        if cur.peek() == Some(Token::Value) {
            cur.bump();
            continue;
        }
        values.push(cur.expect_name()?.to_string());
        cur.skip_directives()?;
    }
    Ok(values)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
