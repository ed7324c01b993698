//! Prompt builders for the analysis stages
//!
//! Each builder returns the full prompt text. File samples are passed as
//! `(path, content)` pairs in the order they were read.

/// Paths listed in a language summary prompt.
pub const LANGUAGE_SAMPLE_PATHS: usize = 20;
/// Characters of a file included in a file summary prompt.
pub const FILE_CONTENT_CHARS: usize = 7000;
/// Lines of each file included in multi-file prompts.
pub const SAMPLE_LINES: usize = 100;

fn path_list<'a>(paths: impl Iterator<Item = &'a str>) -> String {
    paths
        .map(|p| format!("- {p}"))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Render the first lines of every sample as fenced blocks.
pub fn file_samples(files: &[(String, String)]) -> String {
    files
        .iter()
        .map(|(path, content)| {
            let head: Vec<&str> = content.split('\n').take(SAMPLE_LINES).collect();
            format!("File: {}\n```\n{}\n```\n", path, head.join("\n"))
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Summary of a language's files inferred from their paths.
pub fn language_summary(language: &str, paths: &[&str]) -> String {
    let listed = path_list(paths.iter().take(LANGUAGE_SAMPLE_PATHS).copied());
    format!(
        r#"
You are an expert code analyst who works with {language} every day.

A codebase contains {count} {language} files. These are some of their paths:

{listed}

From the directory layout and file names alone, describe:

1. What kind of software this probably is (web service, library, CLI tool, ...)
2. Architectural patterns the layout suggests
3. Frameworks or major dependencies hinted at by the structure
4. Anything else notable about how the code is organized

Answer with a short professional summary and avoid guessing beyond what the paths support.
"#,
        count = paths.len(),
    )
}

/// Summary of one file.
pub fn file_summary(path: &str, language: &str, content: &str) -> String {
    let body: String = content.chars().take(FILE_CONTENT_CHARS).collect();
    format!(
        r#"
You are an expert code analyst who works with {language} every day.

Review this file:

File: {path}
Language: {language}

```{language}
{body}
```

Summarize it briefly, covering:

1. Its main purpose
2. The key functions, types, or components it defines
3. What it imports or depends on
4. Notable patterns or techniques
5. Quality concerns or likely bugs

Keep the answer short and focus on what matters most.
"#
    )
}

/// Dependency analysis over sampled files.
pub fn dependency_analysis(files: &[(String, String)]) -> String {
    format!(
        r#"
You are an expert at analyzing dependencies in software projects.

The codebase contains these files:

{listed}

Samples of each file follow. Identify:

1. Which files depend on which (imports, references)
2. The hierarchy between components
3. The key modules and what each is responsible for
4. Dependency problems such as cycles or tight coupling

File samples:

{samples}

Give a thorough analysis of the dependencies in this codebase based on what is shown.
"#,
        listed = path_list(files.iter().map(|(p, _)| p.as_str())),
        samples = file_samples(files),
    )
}

/// Mermaid dependency graph derived from a dependency analysis.
pub fn dependency_graph(analysis: &str) -> String {
    format!(
        r#"
You are an expert at visualizing code dependencies.

Turn the dependency analysis below into a Mermaid graph of the dependencies between components.

Dependency analysis:
{analysis}

Use this Mermaid syntax:
```mermaid
graph TD
  A[Component A] --> B[Component B]
  B --> C[Component C]
```

Keep to the most important components and edges, with clear labels and a readable layout.
"#
    )
}

/// Business functionality analysis over sampled files.
pub fn business_analysis(files: &[(String, String)]) -> String {
    format!(
        r#"
You are an expert business analyst who can read source code.

The codebase contains these files:

{listed}

Samples of each file follow. Identify:

1. The business domain and the functionality the code implements
2. Business processes and workflows it encodes
3. Business rules and constraints embedded in it
4. Business entities and how they relate
5. Domain terminology used in the code

File samples:

{samples}

Describe the business functionality of this codebase in business language rather than technical jargon where you can.
"#,
        listed = path_list(files.iter().map(|(p, _)| p.as_str())),
        samples = file_samples(files),
    )
}

/// Entity extraction from a business analysis, asking for a JSON model.
pub fn business_entities(analysis: &str) -> String {
    format!(
        r#"
You are an expert at deriving domain models from code.

From the business analysis below, identify the key business entities and how they relate.

Business analysis:
{analysis}

For every entity give its name, its meaning in the domain, its key attributes, and its relationships to other entities.

Then emit a JSON document describing the entities, suitable for drawing an entity relationship diagram, in exactly this shape:
```json
{{
  "entities": [
    {{
      "name": "EntityName",
      "description": "Entity description",
      "attributes": ["attribute1", "attribute2"],
      "relationships": [
        {{
          "entity": "RelatedEntityName",
          "type": "one-to-many",
          "description": "Relationship description"
        }}
      ]
    }}
  ]
}}
```
"#
    )
}

/// Architecture analysis over sampled files.
pub fn architecture_analysis(
    project_name: &str,
    languages: &[String],
    files: &[(String, String)],
) -> String {
    format!(
        r#"
You are an expert software architect experienced with {languages}.

The codebase "{project_name}" contains these files:

{listed}

Samples of each file follow. Identify:

1. The overall architectural patterns in use
2. The major components and their responsibilities
3. How components interact and how data flows between them
4. Technologies, frameworks, and libraries in use
5. Architectural strengths and possible improvements

File samples:

{samples}

Give a thorough architectural analysis of this codebase using standard architecture terminology.
"#,
        languages = languages.join(", "),
        listed = path_list(files.iter().map(|(p, _)| p.as_str())),
        samples = file_samples(files),
    )
}

/// Mermaid architecture diagram derived from an architecture analysis.
pub fn architecture_diagram(analysis: &str) -> String {
    format!(
        r#"
You are an expert at drawing software architecture diagrams.

Turn the architecture analysis below into a Mermaid diagram of the codebase architecture.

Architecture analysis:
{analysis}

Use this Mermaid syntax:
```mermaid
graph TD
  subgraph Component1
    A[Module A]
    B[Module B]
  end
  subgraph Component2
    C[Module C]
    D[Module D]
  end
  A --> C
  B --> D
```

Show the high-level architecture, the major components, and their interactions, with clear labels and a readable layout.
"#
    )
}

/// Review of a single snippet, answered in labelled lines.
pub fn code_snippet(code: &str, language: &str, filename: Option<&str>) -> String {
    let file_line = filename
        .map(|name| format!("File: {name}\n"))
        .unwrap_or_default();
    format!(
        r#"
Analyze the following {language} code snippet.
{file_line}
```{language}
{code}
```

Answer with exactly these three lines:
- Summary: what the code does
- Complexity: how complex it is and why
- Suggestions: the most useful improvements
"#
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(path: &str, lines: usize) -> (String, String) {
        let content = (0..lines)
            .map(|i| format!("line {i}"))
            .collect::<Vec<_>>()
            .join("\n");
        (path.to_string(), content)
    }

    #[test]
    fn samples_keep_first_hundred_lines() {
        let rendered = file_samples(&[sample("a.py", 150)]);
        assert!(rendered.starts_with("File: a.py\n```\nline 0\n"));
        assert!(rendered.contains("line 99\n```"));
        assert!(!rendered.contains("line 100"));
    }

    #[test]
    fn language_summary_lists_at_most_twenty_paths() {
        let names: Vec<String> = (0..30).map(|i| format!("src/m{i}.go")).collect();
        let paths: Vec<&str> = names.iter().map(String::as_str).collect();
        let prompt = language_summary("Go", &paths);
        assert!(prompt.contains("30 Go files"));
        assert!(prompt.contains("- src/m19.go"));
        assert!(!prompt.contains("- src/m20.go"));
    }

    #[test]
    fn file_summary_caps_content() {
        let content = "x".repeat(FILE_CONTENT_CHARS + 500);
        let prompt = file_summary("big.rs", "Rust", &content);
        assert!(prompt.contains(&"x".repeat(FILE_CONTENT_CHARS)));
        assert!(!prompt.contains(&"x".repeat(FILE_CONTENT_CHARS + 1)));
    }

    #[test]
    fn architecture_prompt_names_project_and_languages() {
        let prompt = architecture_analysis(
            "acme/shop",
            &["Python".to_string(), "Go".to_string()],
            &[sample("main.py", 3)],
        );
        assert!(prompt.contains("\"acme/shop\""));
        assert!(prompt.contains("experienced with Python, Go"));
        assert!(prompt.contains("- main.py"));
    }

    #[test]
    fn entity_prompt_shows_json_shape() {
        let prompt = business_entities("orders and customers");
        assert!(prompt.contains("\"entities\": ["));
        assert!(prompt.contains("orders and customers"));
    }

    #[test]
    fn snippet_prompt_requests_labelled_lines() {
        let prompt = code_snippet("print(1)", "python", Some("a.py"));
        assert!(prompt.contains("File: a.py"));
        assert!(prompt.contains("- Summary:"));
        assert!(prompt.contains("- Suggestions:"));
    }
}
