//! Prompt construction for the four model-backed stages.
//!
//! Prompts are fully interpolated strings — the cache keys on their exact
//! text, so builders must be deterministic for identical inputs.

use crate::types::{Abstraction, RelationshipMap, SourceFile};

/// Per-file character cap inside the Stage 1 context block.
const MAX_CHARS_PER_FILE: usize = 10_000;

/// Overall character cap for the Stage 1 context block.
const MAX_CONTEXT_CHARS: usize = 400_000;

/// Create a numbered list from items (1-indexed).
pub fn numbered_list(items: &[String]) -> String {
    items
        .iter()
        .enumerate()
        .map(|(i, item)| format!("{}. {}", i + 1, item))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Wrap text in a labeled section for structured prompts.
pub fn section(label: &str, content: &str) -> String {
    format!("## {}\n{}", label, content)
}

/// Truncate to a character budget at a char boundary, marking the cut.
fn truncated(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        text.to_string()
    } else {
        let cut: String = text.chars().take(max_chars).collect();
        format!("{cut}\n... (truncated)")
    }
}

/// Serialize the file set into one prompt context block.
///
/// Each file is introduced with its index and path so the model can answer
/// in terms of file indices. Oversized files are truncated per-file and the
/// whole block is capped; anything past the cap is listed by path only.
pub fn file_context_block(files: &[SourceFile]) -> String {
    let mut block = String::new();
    let mut omitted: Vec<&str> = Vec::new();

    for (index, file) in files.iter().enumerate() {
        let entry = format!(
            "--- File {index}: {path} ---\n{content}\n\n",
            path = file.path,
            content = truncated(&file.content, MAX_CHARS_PER_FILE),
        );
        if block.chars().count() + entry.chars().count() > MAX_CONTEXT_CHARS {
            omitted.push(&file.path);
        } else {
            block.push_str(&entry);
        }
    }

    if !omitted.is_empty() {
        block.push_str(&format!(
            "--- Omitted for size: {} ---\n",
            omitted.join(", ")
        ));
    }

    block
}

/// Stage 1: ask for the project's core abstractions.
pub fn identify_abstractions(project_name: &str, files: &[SourceFile]) -> String {
    format!(
        r#"You are analyzing the codebase of the project `{project_name}` to write a tutorial for newcomers.

{context}

Identify the 5-10 core abstractions (key concepts, components or patterns) a newcomer must understand. For each abstraction give a beginner-friendly name, a 1-2 sentence description, and the indices of the files above that best exemplify it.

Respond with only a JSON array in this exact shape:
```json
[
  {{"name": "Abstraction Name", "description": "What it is and why it matters.", "file_indices": [0, 3]}}
]
```
File indices must be between 0 and {max_index}."#,
        context = section("Codebase", &file_context_block(files)),
        max_index = files.len().saturating_sub(1),
    )
}

/// Stage 2: ask for a project summary and relationships between abstractions.
pub fn analyze_relationships(project_name: &str, abstractions: &[Abstraction]) -> String {
    let listing = abstractions
        .iter()
        .enumerate()
        .map(|(i, a)| format!("{i}. {} — {}", a.name, a.description))
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        r#"Below are the core abstractions identified in the project `{project_name}`.

{listing}

Write a short beginner-friendly summary of the whole project (2-3 sentences), then list the directed relationships between abstractions as edges with a short verb-phrase label (for example "feeds data into" or "configures"). Relate distinct abstractions only; do not relate an abstraction to itself. Every abstraction should appear in at least one relationship.

Respond with only a JSON object in this exact shape:
```json
{{
  "summary": "...",
  "relations": [
    {{"from_index": 0, "to_index": 1, "label": "feeds data into"}}
  ]
}}
```
Indices must be between 0 and {max_index}."#,
        max_index = abstractions.len().saturating_sub(1),
    )
}

/// Stage 3: ask for a teaching order over all abstractions.
pub fn order_chapters(
    project_name: &str,
    abstractions: &[Abstraction],
    relationships: &RelationshipMap,
) -> String {
    let listing = abstractions
        .iter()
        .enumerate()
        .map(|(i, a)| format!("{i}. {}", a.name))
        .collect::<Vec<_>>()
        .join("\n");

    let edges = relationships
        .relations
        .iter()
        .map(|r| format!("{} -> {} ({})", r.from_index, r.to_index, r.label))
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        r#"The project `{project_name}` has these abstractions:

{listing}

And these relationships between them:

{edges}

Order the abstractions into a tutorial chapter sequence that teaches foundational concepts before the concepts that depend on them.

Respond with only a JSON array of ALL the indices above, each exactly once, for example:
```json
[2, 0, 1]
```"#,
    )
}

/// Input for drafting one chapter, assembled by the batch stage's `prepare`.
#[derive(Debug, Clone)]
pub struct ChapterPromptInput<'a> {
    pub project_name: &'a str,
    pub chapter_number: usize,
    pub abstraction: &'a Abstraction,
    /// (neighbor name, edge label, true when this abstraction is the source).
    pub related: Vec<(&'a str, &'a str, bool)>,
    /// Full planned chapter listing, in reading order.
    pub outline: &'a [String],
}

/// Stage 4: ask for the prose of a single chapter.
pub fn write_chapter(input: &ChapterPromptInput<'_>) -> String {
    let related = if input.related.is_empty() {
        "(none)".to_string()
    } else {
        input
            .related
            .iter()
            .map(|(name, label, outgoing)| {
                if *outgoing {
                    format!("- this abstraction {label} `{name}`")
                } else {
                    format!("- `{name}` {label} this abstraction")
                }
            })
            .collect::<Vec<_>>()
            .join("\n")
    };

    format!(
        r#"You are writing chapter {number} of a beginner tutorial for the project `{project}`.

{outline}

This chapter covers: **{name}**
{description}

Relationships to other chapters:
{related}

Write the chapter in Markdown. Start with `# Chapter {number}: {name}`, explain the concept from first principles with small examples, reference the related chapters by name where the relationships above apply, and end with a one-paragraph recap. Aim for 800-1500 words. Respond with the Markdown only."#,
        number = input.chapter_number,
        project = input.project_name,
        outline = section("Full tutorial outline", &numbered_list(input.outline)),
        name = input.abstraction.name,
        description = input.abstraction.description,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn files() -> Vec<SourceFile> {
        vec![
            SourceFile::new("src/main.rs", "fn main() {}"),
            SourceFile::new("src/lib.rs", "pub mod x;"),
        ]
    }

    #[test]
    fn numbered_list_format() {
        let items = vec!["First".to_string(), "Second".to_string()];
        assert_eq!(numbered_list(&items), "1. First\n2. Second");
        assert_eq!(numbered_list(&[]), "");
    }

    #[test]
    fn context_block_indexes_files() {
        let block = file_context_block(&files());
        assert!(block.contains("--- File 0: src/main.rs ---"));
        assert!(block.contains("--- File 1: src/lib.rs ---"));
        assert!(block.contains("fn main() {}"));
    }

    #[test]
    fn context_block_truncates_large_files() {
        let big = SourceFile::new("big.rs", "x".repeat(20_000));
        let block = file_context_block(&[big]);
        assert!(block.contains("... (truncated)"));
        assert!(block.chars().count() < 20_000);
    }

    #[test]
    fn identify_prompt_is_deterministic() {
        let a = identify_abstractions("demo", &files());
        let b = identify_abstractions("demo", &files());
        assert_eq!(a, b);
        assert!(a.contains("between 0 and 1"));
    }

    #[test]
    fn order_prompt_lists_edges() {
        let abstractions = vec![
            Abstraction {
                name: "A".into(),
                description: "a".into(),
                file_indices: vec![0],
            },
            Abstraction {
                name: "B".into(),
                description: "b".into(),
                file_indices: vec![1],
            },
        ];
        let map = RelationshipMap {
            summary: "s".into(),
            relations: vec![crate::types::Relationship {
                from_index: 0,
                to_index: 1,
                label: "uses".into(),
            }],
        };
        let prompt = order_chapters("demo", &abstractions, &map);
        assert!(prompt.contains("0 -> 1 (uses)"));
    }

    #[test]
    fn chapter_prompt_mentions_relations_both_ways() {
        let abstraction = Abstraction {
            name: "Cache".into(),
            description: "Stores responses.".into(),
            file_indices: vec![0],
        };
        let outline = vec!["Cache".to_string(), "Gateway".to_string()];
        let input = ChapterPromptInput {
            project_name: "demo",
            chapter_number: 1,
            abstraction: &abstraction,
            related: vec![("Gateway", "is consulted by", false)],
            outline: &outline,
        };
        let prompt = write_chapter(&input);
        assert!(prompt.contains("# Chapter 1: Cache"));
        assert!(prompt.contains("`Gateway` is consulted by this abstraction"));
    }
}
