//! Pretty-print TSX for the `blog.tsx` target.

use oxc::allocator::Allocator;
use oxc::codegen::{Codegen, CodegenOptions};
use oxc::parser::Parser;
use oxc::span::SourceType;

/// Re-print TSX source with consistent layout.
///
/// Returns `None` when the source does not parse; callers keep the input.
pub fn format_tsx(source: &str) -> Option<String> {
    let allocator = Allocator::default();
    let ret = Parser::new(&allocator, source, SourceType::tsx()).parse();
    if ret.panicked || !ret.errors.is_empty() {
        return None;
    }
    let code = Codegen::new()
        .with_options(CodegenOptions {
            single_quote: true,
            ..CodegenOptions::default()
        })
        .build(&ret.program)
        .code;
    Some(code)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_normalizes_layout() {
        let out = format_tsx("const   a={b:1};function f( ){return <div   className=\"x\"/>}").unwrap();
        assert!(out.contains("const a = { b: 1 };"));
        assert!(out.contains("function f()"));
    }

    #[test]
    fn test_format_invalid_returns_none() {
        assert!(format_tsx("const = ;").is_none());
    }
}
