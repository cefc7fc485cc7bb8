use ibtool_core::{SourceTransform, TransformError};
use regex::Regex;
use std::sync::LazyLock;

/// One rewrite rule: an obsolete syntax pattern and its modern form.
trait Fixer: Send + Sync {
    fn name(&self) -> &'static str;
    fn apply(&self, source: &str) -> Result<String, TransformError>;
}

/// Built-in source-transformation engine: a malformed-input gate followed
/// by an ordered chain of fixers.
///
/// The fixers are line-level heuristics, not a full parser; they cover the
/// mechanical rewrites a legacy tree needs in bulk and leave anything they
/// cannot recognize alone.
pub struct FixerEngine {
    fixers: Vec<Box<dyn Fixer>>,
}

impl FixerEngine {
    /// Engine with the full built-in fixer chain, applied in order.
    pub fn with_default_fixers() -> Self {
        Self {
            fixers: vec![
                Box::new(NeFixer),
                Box::new(ExceptFixer),
                Box::new(RawInputFixer),
                Box::new(PrintFixer),
            ],
        }
    }

    /// Names of the fixers in application order.
    pub fn fixer_names(&self) -> Vec<&'static str> {
        self.fixers.iter().map(|f| f.name()).collect()
    }
}

impl SourceTransform for FixerEngine {
    fn transform(&self, source: &str, label: &str) -> Result<String, TransformError> {
        check_balanced(source, label)?;
        let mut text = source.to_string();
        for fixer in &self.fixers {
            text = fixer.apply(&text)?;
        }
        Ok(text)
    }
}

// ---------------------------------------------------------------------------
// Built-in fixers
// ---------------------------------------------------------------------------

/// `a <> b` -> `a != b`.
struct NeFixer;

impl Fixer for NeFixer {
    fn name(&self) -> &'static str {
        "ne"
    }

    fn apply(&self, source: &str) -> Result<String, TransformError> {
        Ok(source.replace("<>", "!="))
    }
}

/// `except E, e:` -> `except E as e:`.
struct ExceptFixer;

static EXCEPT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?m)^([ \t]*)except[ \t]+(\([^)\n]*\)|[^,\n]+?)[ \t]*,[ \t]*(\w+)[ \t]*:")
        .unwrap()
});

impl Fixer for ExceptFixer {
    fn name(&self) -> &'static str {
        "except"
    }

    fn apply(&self, source: &str) -> Result<String, TransformError> {
        Ok(EXCEPT_RE
            .replace_all(source, "${1}except ${2} as ${3}:")
            .into_owned())
    }
}

/// `raw_input(...)` -> `input(...)`.
struct RawInputFixer;

static RAW_INPUT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\braw_input\s*\(").unwrap());

impl Fixer for RawInputFixer {
    fn name(&self) -> &'static str {
        "raw_input"
    }

    fn apply(&self, source: &str) -> Result<String, TransformError> {
        Ok(RAW_INPUT_RE.replace_all(source, "input(").into_owned())
    }
}

/// Statement-form `print x` lines -> `print(x)`.
///
/// Lines already calling `print(...)` and stream-redirect forms
/// (`print >>f, x`) are left alone.
struct PrintFixer;

static PRINT_STMT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?m)^([ \t]*)print[ \t]+([^\s(>][^#\n]*?)([ \t]*#.*)?[ \t]*$").unwrap()
});
static PRINT_BARE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^([ \t]*)print[ \t]*$").unwrap());

impl Fixer for PrintFixer {
    fn name(&self) -> &'static str {
        "print"
    }

    fn apply(&self, source: &str) -> Result<String, TransformError> {
        let text = PRINT_STMT_RE.replace_all(source, "${1}print(${2})${3}");
        Ok(PRINT_BARE_RE.replace_all(&text, "${1}print()").into_owned())
    }
}

// ---------------------------------------------------------------------------
// Malformed-input gate
// ---------------------------------------------------------------------------

/// Reject source whose bracket nesting never balances, the way a real
/// parser would reject it before any fixer runs. String literals (single,
/// double, and triple-quoted) and `#` comments are skipped.
fn check_balanced(source: &str, label: &str) -> Result<(), TransformError> {
    let parse_err = |detail: String| TransformError::Parse {
        label: label.to_string(),
        detail,
    };

    let chars: Vec<char> = source.chars().collect();
    let mut open: Vec<char> = Vec::new();
    let mut line = 1usize;
    let mut i = 0usize;
    while i < chars.len() {
        match chars[i] {
            '\n' => line += 1,
            '#' => {
                while i < chars.len() && chars[i] != '\n' {
                    i += 1;
                }
                continue;
            }
            quote @ ('"' | '\'') => {
                let triple =
                    i + 2 < chars.len() && chars[i + 1] == quote && chars[i + 2] == quote;
                if triple {
                    i += 3;
                    let mut closed = false;
                    while i < chars.len() {
                        if chars[i] == quote
                            && chars.get(i + 1) == Some(&quote)
                            && chars.get(i + 2) == Some(&quote)
                        {
                            i += 2;
                            closed = true;
                            break;
                        }
                        if chars[i] == '\n' {
                            line += 1;
                        }
                        i += 1;
                    }
                    if !closed {
                        return Err(parse_err(format!(
                            "unterminated triple-quoted string (line {})",
                            line
                        )));
                    }
                } else {
                    i += 1;
                    while i < chars.len() && chars[i] != quote && chars[i] != '\n' {
                        if chars[i] == '\\' {
                            i += 1;
                        }
                        i += 1;
                    }
                    if i >= chars.len() || chars[i] != quote {
                        return Err(parse_err(format!(
                            "unterminated string literal (line {})",
                            line
                        )));
                    }
                }
            }
            c @ ('(' | '[' | '{') => open.push(c),
            c @ (')' | ']' | '}') => {
                let expected = match c {
                    ')' => '(',
                    ']' => '[',
                    _ => '{',
                };
                if open.pop() != Some(expected) {
                    return Err(parse_err(format!("unbalanced '{}' (line {})", c, line)));
                }
            }
            _ => {}
        }
        i += 1;
    }
    if let Some(c) = open.pop() {
        return Err(parse_err(format!("unclosed '{}'", c)));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn engine() -> FixerEngine {
        FixerEngine::with_default_fixers()
    }

    fn rewrite(source: &str) -> String {
        engine().transform(source, "test.py").unwrap()
    }

    #[test]
    fn test_default_chain_order() {
        assert_eq!(
            engine().fixer_names(),
            vec!["ne", "except", "raw_input", "print"]
        );
    }

    #[test]
    fn test_print_statement_becomes_call() {
        assert_eq!(rewrite("print 'hello'\n"), "print('hello')\n");
        assert_eq!(rewrite("    print x, y\n"), "    print(x, y)\n");
        assert_eq!(rewrite("print\n"), "print()\n");
    }

    #[test]
    fn test_print_call_and_redirect_left_alone() {
        assert_eq!(rewrite("print('already fine')\n"), "print('already fine')\n");
        assert_eq!(
            rewrite("print >>sys.stderr, 'oops'\n"),
            "print >>sys.stderr, 'oops'\n"
        );
    }

    #[test]
    fn test_except_comma_becomes_as() {
        assert_eq!(
            rewrite("try:\n    pass\nexcept ValueError, e:\n    raise\n"),
            "try:\n    pass\nexcept ValueError as e:\n    raise\n"
        );
        // Multi-target tuples keep their parentheses.
        assert_eq!(
            rewrite("except (IOError, OSError), err:\n"),
            "except (IOError, OSError) as err:\n"
        );
    }

    #[test]
    fn test_ne_and_raw_input() {
        assert_eq!(rewrite("if a <> b:\n    pass\n"), "if a != b:\n    pass\n");
        assert_eq!(rewrite("name = raw_input('? ')\n"), "name = input('? ')\n");
    }

    #[test]
    fn test_unbalanced_source_is_rejected() {
        let err = engine()
            .transform("def f(:\n    return (1, 2\n", "broken.py")
            .unwrap_err();
        match err {
            TransformError::Parse { label, detail } => {
                assert_eq!(label, "broken.py");
                assert!(detail.contains("unclosed"));
            }
            other => panic!("Expected parse error, got {:?}", other),
        }
    }

    #[test]
    fn test_brackets_inside_strings_and_comments_ignored() {
        let src = "s = '('\nd = \"[[\"\n# ) stray in comment\ndoc = \"\"\")\nstill )\n\"\"\"\n";
        assert!(engine().transform(src, "strings.py").is_ok());
    }

    #[test]
    fn test_unterminated_string_is_rejected() {
        assert!(matches!(
            engine().transform("s = 'oops\n", "bad.py"),
            Err(TransformError::Parse { .. })
        ));
    }
}
