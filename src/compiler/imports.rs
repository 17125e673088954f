//! Host module imports.
//!
//! An article may import modules the blog host provides at runtime by
//! prefixing the specifier with `#`:
//!
//! ```tsx
//! import React from '#react';
//! ```
//!
//! Such imports are rewritten into a runtime lookup, and the module name is
//! recorded in the manifest the host reads before loading the bundle:
//!
//! ```tsx
//! const React = giveme('react');
//! ```
//!
//! Every other import must be relative (`./`, `../`) or absolute (`/`), so
//! the bundler can resolve it inside the input directory.

use oxc::allocator::Allocator;
use oxc::ast::ast::{ImportDeclarationSpecifier, Statement};
use oxc::parser::Parser;
use oxc::span::SourceType;
use serde::{Deserialize, Serialize};

use super::CompileError;

/// Prefix marking a host-provided module.
pub const HOST_PREFIX: char = '#';

/// One `#module` import to rewrite.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportRecord {
    /// Default binding name
    pub name: String,
    /// Specifier as written, e.g. `#react`
    pub specifier: String,
    /// Specifier without the prefix, e.g. `react`
    pub module: String,
    /// Byte span of the whole import statement
    pub start: usize,
    pub end: usize,
}

/// Modules the host must provide, written as `info.json`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModuleManifest {
    pub need_module: Vec<String>,
}

/// Rewritten source plus the modules it needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transpiled {
    pub code: String,
    pub manifest: ModuleManifest,
}

fn is_allowed_specifier(specifier: &str) -> bool {
    specifier.starts_with("./")
        || specifier.starts_with("../")
        || specifier.starts_with('/')
        || specifier.starts_with(HOST_PREFIX)
}

/// Find every top-level `#module` import, validating all imports on the way.
pub fn find_host_imports(source: &str) -> Result<Vec<ImportRecord>, CompileError> {
    let allocator = Allocator::default();
    let ret = Parser::new(&allocator, source, SourceType::tsx()).parse();
    if ret.panicked || !ret.errors.is_empty() {
        let message = ret
            .errors
            .iter()
            .map(|e| e.to_string())
            .collect::<Vec<_>>()
            .join("; ");
        return Err(CompileError::Parse {
            file: "blog.tsx",
            message,
        });
    }

    let mut records = Vec::new();
    for stmt in &ret.program.body {
        let Statement::ImportDeclaration(decl) = stmt else {
            continue;
        };
        let specifier = decl.source.value.as_str();
        if !is_allowed_specifier(specifier) {
            return Err(CompileError::NonRelativeImport(specifier.to_string()));
        }
        let Some(module) = specifier.strip_prefix(HOST_PREFIX) else {
            continue;
        };

        if decl.import_kind.is_type() {
            return Err(CompileError::TypeOnlyImport(specifier.to_string()));
        }
        let specifiers: &[ImportDeclarationSpecifier<'_>] = match &decl.specifiers {
            Some(list) => list,
            None => &[],
        };
        let has_named = specifiers.iter().any(|s| {
            matches!(
                s,
                ImportDeclarationSpecifier::ImportSpecifier(_)
                    | ImportDeclarationSpecifier::ImportNamespaceSpecifier(_)
            )
        });
        if has_named {
            return Err(CompileError::NamedBindings(specifier.to_string()));
        }
        let name = specifiers.iter().find_map(|s| match s {
            ImportDeclarationSpecifier::ImportDefaultSpecifier(d) => Some(d.local.name.as_str()),
            _ => None,
        });
        let Some(name) = name else {
            return Err(CompileError::MissingDefaultBinding(specifier.to_string()));
        };

        records.push(ImportRecord {
            name: name.to_string(),
            specifier: specifier.to_string(),
            module: module.to_string(),
            start: decl.span.start as usize,
            end: decl.span.end as usize,
        });
    }

    Ok(records)
}

/// Replace every `#module` import with a `giveme` lookup.
pub fn rewrite_imports(source: &str) -> Result<Transpiled, CompileError> {
    let records = find_host_imports(source)?;

    let mut code = String::with_capacity(source.len());
    let mut pos = 0;
    for record in &records {
        code.push_str(&source[pos..record.start]);
        code.push_str(&format!(
            "const {} = giveme('{}');",
            record.name, record.module
        ));
        pos = record.end;
    }
    code.push_str(&source[pos..]);

    let manifest = ModuleManifest {
        need_module: records.into_iter().map(|r| r.module).collect(),
    };
    Ok(Transpiled { code, manifest })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rewrites_host_import_only() {
        let src = "import Foo from '#bar';\nimport { x } from './baz';\n\nexport default Foo(x);\n";
        let out = rewrite_imports(src).unwrap();
        assert_eq!(
            out.code,
            "const Foo = giveme('bar');\nimport { x } from './baz';\n\nexport default Foo(x);\n"
        );
        assert_eq!(out.manifest.need_module, vec!["bar".to_string()]);
    }

    #[test]
    fn test_manifest_json_shape() {
        let manifest = ModuleManifest {
            need_module: vec!["react".into()],
        };
        assert_eq!(
            serde_json::to_string(&manifest).unwrap(),
            r#"{"needModule":["react"]}"#
        );
    }

    #[test]
    fn test_leading_comment_kept() {
        let src = "// header\nimport React from '#react';\nconst a = <div />;\n";
        let out = rewrite_imports(src).unwrap();
        assert!(out.code.starts_with("// header\nconst React = giveme('react');"));
    }

    #[test]
    fn test_no_imports() {
        let out = rewrite_imports("export const a = 1;\n").unwrap();
        assert_eq!(out.code, "export const a = 1;\n");
        assert!(out.manifest.need_module.is_empty());
    }

    #[test]
    fn test_rejects_bare_specifier() {
        let err = rewrite_imports("import React from 'react';").unwrap_err();
        assert!(matches!(err, CompileError::NonRelativeImport(s) if s == "react"));
    }

    #[test]
    fn test_rejects_type_only() {
        let err = rewrite_imports("import type Foo from '#foo';").unwrap_err();
        assert!(matches!(err, CompileError::TypeOnlyImport(_)));
    }

    #[test]
    fn test_rejects_named_and_namespace() {
        let err = rewrite_imports("import { a } from '#foo';").unwrap_err();
        assert!(matches!(err, CompileError::NamedBindings(_)));
        let err = rewrite_imports("import Foo, * as all from '#foo';").unwrap_err();
        assert!(matches!(err, CompileError::NamedBindings(_)));
    }

    #[test]
    fn test_rejects_missing_default() {
        let err = rewrite_imports("import '#polyfill';").unwrap_err();
        assert!(matches!(err, CompileError::MissingDefaultBinding(_)));
    }

    #[test]
    fn test_parse_error() {
        let err = rewrite_imports("import from from from;").unwrap_err();
        assert!(matches!(err, CompileError::Parse { .. }));
    }
}
