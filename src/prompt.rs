//! Generation prompts for worksheets and assessments.
//!
//! The grounding excerpt is the first few chunks of the whole collection,
//! independent of difficulty, so repeated calls over the same knowledge base
//! see the same content. Every prompt embeds the difficulty label verbatim
//! and forbids material not present in the excerpt.

use crate::models::{Chunk, Mode};

const WORKSHEET_TASK: &str = "\
TASK: Create a STUDENT WORKSHEET.

Generate:

1) 5 Multiple Choice Questions
2) 3 Short Answer Questions
3) 2 Long Answer Questions

Finally provide:

ANSWER KEY with clear explanations.

Do not invent facts.
Only use the provided content.
";

const ASSESSMENT_TASK: &str = "\
TASK: Create a FORMAL ASSESSMENT.

Generate:

SECTION A – MCQs
- 10 Multiple Choice Questions

SECTION B – Short Answer
- 5 Short Answer Questions

SECTION C – Long Answer
- 3 Long Answer Questions

Provide:

- Clear marking scheme
- Rubrics
- Answer key

STRICT RULE:
Use ONLY information from the given content.
";

/// Join the text of the first `count` chunks, one per line.
pub fn select_excerpt(chunks: &[Chunk], count: usize) -> String {
    chunks
        .iter()
        .take(count)
        .map(|c| c.text.as_str())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Full instruction for the generator.
pub fn build_prompt(excerpt: &str, difficulty: &str, mode: Mode) -> String {
    let task = match mode {
        Mode::Worksheet => WORKSHEET_TASK,
        Mode::Assessment => ASSESSMENT_TASK,
    };
    format!(
        "You are an educational content generator.\n\n\
         Use ONLY the information provided below.\n\
         Do NOT add outside knowledge.\n\n\
         CONTENT:\n{excerpt}\n\n\
         DIFFICULTY LEVEL: {difficulty}\n\n\n\
         {task}"
    )
}
