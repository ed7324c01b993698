//! Language detection by file name, shebang, and content

use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::BTreeSet;
use std::io::{BufRead, BufReader};
use std::path::Path;

/// Number of leading lines inspected when the name is not conclusive.
pub const SNIFF_LINES: usize = 10;

const EXTENSIONS: &[(&str, &str)] = &[
    ("py", "Python"),
    ("pyw", "Python"),
    ("pyx", "Python"),
    ("pxd", "Python"),
    ("js", "JavaScript"),
    ("jsx", "JavaScript"),
    ("mjs", "JavaScript"),
    ("ts", "TypeScript"),
    ("tsx", "TypeScript"),
    ("java", "Java"),
    ("cs", "C#"),
    ("cpp", "C++"),
    ("cc", "C++"),
    ("cxx", "C++"),
    ("hpp", "C++"),
    ("hxx", "C++"),
    ("c", "C"),
    ("h", "C"),
    ("go", "Go"),
    ("rb", "Ruby"),
    ("rake", "Ruby"),
    ("php", "PHP"),
    ("swift", "Swift"),
    ("rs", "Rust"),
    ("kt", "Kotlin"),
    ("kts", "Kotlin"),
    ("scala", "Scala"),
    ("html", "HTML"),
    ("htm", "HTML"),
    ("css", "CSS"),
    ("scss", "SCSS"),
    ("sass", "SASS"),
    ("json", "JSON"),
    ("xml", "XML"),
    ("yaml", "YAML"),
    ("yml", "YAML"),
    ("md", "Markdown"),
    ("markdown", "Markdown"),
    ("sh", "Shell"),
    ("bash", "Shell"),
    ("ps1", "PowerShell"),
    ("sql", "SQL"),
    ("r", "R"),
    ("R", "R"),
    ("pl", "Perl"),
    ("pm", "Perl"),
    ("hs", "Haskell"),
    ("lua", "Lua"),
    ("groovy", "Groovy"),
    ("dockerfile", "Dockerfile"),
    ("tf", "Terraform"),
    ("tfvars", "Terraform"),
    ("ipynb", "Jupyter Notebook"),
];

static SHEBANG_PATTERNS: Lazy<Vec<(Regex, &'static str)>> = Lazy::new(|| {
    compile(&[
        (r"(?m)^#!.*\bpython", "Python"),
        (r"(?m)^#!.*\bnode", "JavaScript"),
        (r"(?m)^#!.*\bruby", "Ruby"),
        (r"(?m)^#!.*\bperl", "Perl"),
        (r"(?m)^#!.*\bbash", "Shell"),
        (r"(?m)^#!.*\bsh\b", "Shell"),
        (r"(?m)^#!.*\bzsh\b", "Shell"),
        (r"(?m)^#!.*\bphp", "PHP"),
        (r"(?m)^#!.*\br\b", "R"),
    ])
});

static CONTENT_PATTERNS: Lazy<Vec<(Regex, &'static str)>> = Lazy::new(|| {
    compile(&[
        (r"(?m)^\s*<\?php", "PHP"),
        (r"(?m)^\s*package\s+[a-z0-9_.]+;", "Java"),
        (r"(?m)^\s*using\s+[a-zA-Z0-9_.]+;", "C#"),
        (r"(?m)^\s*import\s+React", "JavaScript"),
        (r#"(?m)^\s*import\s+\{.*\}\s+from\s+['"]react['"]"#, "JavaScript"),
        (r"(?m)^\s*#include\s+<[a-zA-Z0-9_.]+>", "C++"),
        (r"(?m)^\s*from\s+__future__\s+import", "Python"),
        (r"(?m)^\s*defmodule\s+[A-Z][a-zA-Z0-9_.]*\s+do", "Elixir"),
        (r"(?m)^\s*use\s+strict;", "Perl"),
        (r"(?m)^\s*\(\s*ns\s+[a-z0-9_.\-]+", "Clojure"),
    ])
});

fn compile(patterns: &[(&str, &'static str)]) -> Vec<(Regex, &'static str)> {
    patterns
        .iter()
        .filter_map(|(pattern, language)| Regex::new(pattern).ok().map(|re| (re, *language)))
        .collect()
}

/// Language implied by a file name alone.
///
/// Extensions match case-sensitively; a bare `Dockerfile` matches in any case.
pub fn detect_language_from_name(file_name: &str) -> Option<&'static str> {
    let path = Path::new(file_name);
    if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
        if let Some((_, language)) = EXTENSIONS.iter().find(|(e, _)| *e == ext) {
            return Some(language);
        }
    }

    let base = path.file_name().and_then(|n| n.to_str()).unwrap_or(file_name);
    if base.eq_ignore_ascii_case("dockerfile") {
        return Some("Dockerfile");
    }
    None
}

/// Language implied by the leading lines of a file.
pub fn detect_language_from_content(head: &str) -> Option<&'static str> {
    SHEBANG_PATTERNS
        .iter()
        .chain(CONTENT_PATTERNS.iter())
        .find(|(re, _)| re.is_match(head))
        .map(|(_, language)| *language)
}

/// Detect the language of a file on disk.
///
/// Returns `None` for missing files, unreadable files, and files nothing matches.
pub fn detect_language(path: &Path) -> Option<&'static str> {
    if !path.is_file() {
        return None;
    }

    let name = path.file_name().and_then(|n| n.to_str()).unwrap_or_default();
    if let Some(language) = detect_language_from_name(name) {
        return Some(language);
    }

    let file = std::fs::File::open(path).ok()?;
    let mut reader = BufReader::new(file);
    let mut head = String::new();
    let mut buf = Vec::new();
    for _ in 0..SNIFF_LINES {
        buf.clear();
        match reader.read_until(b'\n', &mut buf) {
            Ok(0) | Err(_) => break,
            Ok(_) => head.push_str(&String::from_utf8_lossy(&buf)),
        }
    }

    detect_language_from_content(&head)
}

/// Every language name the detector can report.
pub fn all_languages() -> BTreeSet<&'static str> {
    EXTENSIONS
        .iter()
        .map(|(_, language)| *language)
        .chain(SHEBANG_PATTERNS.iter().map(|(_, language)| *language))
        .chain(CONTENT_PATTERNS.iter().map(|(_, language)| *language))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use tempfile::tempdir;

    #[rstest]
    #[case("main.py", Some("Python"))]
    #[case("lib/mod.pxd", Some("Python"))]
    #[case("app.tsx", Some("TypeScript"))]
    #[case("engine.hxx", Some("C++"))]
    #[case("stats.R", Some("R"))]
    #[case("infra/main.tfvars", Some("Terraform"))]
    #[case("notebook.ipynb", Some("Jupyter Notebook"))]
    #[case("Dockerfile", Some("Dockerfile"))]
    #[case("build/DOCKERFILE", Some("Dockerfile"))]
    #[case("README.PY", None)]
    #[case("LICENSE", None)]
    fn name_detection(#[case] name: &str, #[case] expected: Option<&str>) {
        assert_eq!(detect_language_from_name(name), expected);
    }

    #[rstest]
    #[case("#!/usr/bin/env python3\nprint('x')\n", Some("Python"))]
    #[case("#!/bin/sh\necho hi\n", Some("Shell"))]
    #[case("#!/usr/bin/env node\n", Some("JavaScript"))]
    #[case("<?php\necho 1;\n", Some("PHP"))]
    #[case("package com.example.app;\n", Some("Java"))]
    #[case("using System.Text;\n", Some("C#"))]
    #[case("#include <stdio.h>\n", Some("C++"))]
    #[case("defmodule Shop.Cart do\n", Some("Elixir"))]
    #[case("(ns app.core)\n", Some("Clojure"))]
    #[case("plain text\n", None)]
    fn content_detection(#[case] head: &str, #[case] expected: Option<&str>) {
        assert_eq!(detect_language_from_content(head), expected);
    }

    #[test]
    fn shebang_only_checked_in_leading_lines() {
        let dir = tempdir().expect("tempdir");
        let script = dir.path().join("tool");
        std::fs::write(&script, "#!/usr/bin/env ruby\nputs 1\n").expect("write");
        assert_eq!(detect_language(&script), Some("Ruby"));

        let late = dir.path().join("late");
        let mut body = "x\n".repeat(SNIFF_LINES);
        body.push_str("#!/usr/bin/env ruby\n");
        std::fs::write(&late, body).expect("write");
        assert_eq!(detect_language(&late), None);
    }

    #[test]
    fn missing_file_has_no_language() {
        let dir = tempdir().expect("tempdir");
        assert_eq!(detect_language(&dir.path().join("nope.rs")), None);
        assert_eq!(detect_language(dir.path()), None);
    }

    #[test]
    fn all_languages_covers_every_source() {
        let languages = all_languages();
        assert!(languages.contains("Rust"));
        assert!(languages.contains("Jupyter Notebook"));
        assert!(languages.contains("Elixir"));
        assert!(languages.contains("Clojure"));
    }
}
