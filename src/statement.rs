//! Module statement scanning.
//!
//! Extracts import and re-export statements from converted source text
//! as tagged variants, each carrying the specifier literal and its byte
//! span so replacements can be spliced back in place. Statements without
//! a source specifier (a plain `export { x }`) carry `None` and are
//! skipped by the rewrite pass.

use regex::Regex;
use std::ops::Range;

/// Kind of statement a specifier was found in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatementKind {
    /// `import ... from 'm'` or `import 'm'`
    Import,
    /// `export { ... } from 'm'`, or `export { ... }` with no source
    NamedReExport,
    /// `export * from 'm'` or `export * as ns from 'm'`
    WildcardReExport,
}

/// A specifier literal and the span of its contents in the source text.
#[derive(Debug, Clone)]
pub struct SpecifierLiteral {
    pub value: String,
    pub span: Range<usize>,
}

/// One scanned module statement.
#[derive(Debug, Clone)]
pub struct ModuleStatement {
    pub kind: StatementKind,
    pub specifier: Option<SpecifierLiteral>,
}

/// Regex-based statement scanner.
///
/// Matches are anchored at line starts: the codemod engine's printer
/// emits one statement per line, and anchoring keeps specifier-like
/// text inside string literals from being picked up. A second statement
/// on the same line is not scanned.
pub struct StatementScanner {
    import_re: Regex,
    named_re: Regex,
    wildcard_re: Regex,
}

impl StatementScanner {
    pub fn new() -> Self {
        Self {
            import_re: Regex::new(
                r#"(?m)^\s*import\s+(?:[^'";]*?\bfrom\s+)?['"]([^'"]+)['"]"#,
            )
            .expect("import pattern"),
            named_re: Regex::new(
                r#"(?m)^\s*export\s+\{[^}]*\}(?:\s*from\s+['"]([^'"]+)['"])?"#,
            )
            .expect("named re-export pattern"),
            wildcard_re: Regex::new(
                r#"(?m)^\s*export\s+\*(?:\s+as\s+[\w$]+)?\s+from\s+['"]([^'"]+)['"]"#,
            )
            .expect("wildcard re-export pattern"),
        }
    }

    /// Scan source text for module statements, ordered by position.
    pub fn scan(&self, source: &str) -> Vec<ModuleStatement> {
        let mut statements = Vec::new();

        for (kind, re) in [
            (StatementKind::Import, &self.import_re),
            (StatementKind::NamedReExport, &self.named_re),
            (StatementKind::WildcardReExport, &self.wildcard_re),
        ] {
            for caps in re.captures_iter(source) {
                let specifier = caps.get(1).map(|m| SpecifierLiteral {
                    value: m.as_str().to_string(),
                    span: m.range(),
                });
                statements.push(ModuleStatement { kind, specifier });
            }
        }

        statements.sort_by_key(|s| s.specifier.as_ref().map(|l| l.span.start));
        statements
    }
}

impl Default for StatementScanner {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn specifiers(source: &str) -> Vec<(StatementKind, Option<String>)> {
        StatementScanner::new()
            .scan(source)
            .into_iter()
            .map(|s| (s.kind, s.specifier.map(|l| l.value)))
            .collect()
    }

    #[test]
    fn test_scans_import_forms() {
        let source = "\
import def from './a';
import { one, two as three } from './b';
import * as ns from './c';
import './side-effect';
";
        assert_eq!(
            specifiers(source),
            vec![
                (StatementKind::Import, Some("./a".to_string())),
                (StatementKind::Import, Some("./b".to_string())),
                (StatementKind::Import, Some("./c".to_string())),
                (StatementKind::Import, Some("./side-effect".to_string())),
            ]
        );
    }

    #[test]
    fn test_scans_re_export_forms() {
        let source = "\
export { a, b } from './named';
export * from './wild';
export * as ns from './wild-as';
";
        assert_eq!(
            specifiers(source),
            vec![
                (StatementKind::NamedReExport, Some("./named".to_string())),
                (StatementKind::WildcardReExport, Some("./wild".to_string())),
                (StatementKind::WildcardReExport, Some("./wild-as".to_string())),
            ]
        );
    }

    #[test]
    fn test_plain_named_export_has_no_specifier() {
        let scanned = StatementScanner::new().scan("export { local };\n");
        assert_eq!(scanned.len(), 1);
        assert_eq!(scanned[0].kind, StatementKind::NamedReExport);
        assert!(scanned[0].specifier.is_none());
    }

    #[test]
    fn test_spans_cover_specifier_contents() {
        let source = "import x from './b';\n";
        let scanned = StatementScanner::new().scan(source);
        let literal = scanned[0].specifier.as_ref().unwrap();
        assert_eq!(&source[literal.span.clone()], "./b");
    }

    #[test]
    fn test_only_the_first_statement_on_a_line_is_scanned() {
        let scanned =
            StatementScanner::new().scan("import a from './a'; import b from './b';\n");
        assert_eq!(scanned.len(), 1);
        assert_eq!(
            scanned[0].specifier.as_ref().unwrap().value,
            "./a"
        );
    }

    #[test]
    fn test_dynamic_import_calls_are_not_scanned() {
        let scanned = StatementScanner::new().scan("const m = import('./lazy');\n");
        assert!(scanned.is_empty());
    }
}
