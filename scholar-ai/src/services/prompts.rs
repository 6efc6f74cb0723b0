//! Prompt construction
//!
//! Pure functions from inputs to prompt text. Nothing here reads state.

use crate::models::{ReferenceExemplar, Subject};
use std::fmt::Write;

/// Characters of each exemplar quoted in the calibration block
pub const EXEMPLAR_PREVIEW_CHARS: usize = 150;

const SCIENCE_PERSONA: &str = "You are a senior middle-school teacher with many years of \
experience setting and marking provincial entrance examinations in mathematics and the \
natural sciences.";

const HUMANITIES_PERSONA: &str = "You are a senior middle-school teacher of language, \
literature and social studies, experienced in marking entrance examinations.";

const SCIENCE_ITEM_SCHEMA: &str = r#"[
  {
    "content": "Question text in Markdown. Every formula, equation and variable MUST be wrapped in $...$ (inline) or $$...$$ (display).",
    "is_mistake": true,
    "knowledge_points": ["Topic-Subtopic"],
    "error_type": "Category of the error",
    "error_analysis": "Why the student went wrong. Wrap all math in $...$.",
    "solution": "Reference answer and remediation steps. Wrap all math in $...$.",
    "difficulty": 3,
    "marking_details": "Grading marks you observed (red crosses, deductions)"
  }
]"#;

const HUMANITIES_ITEM_SCHEMA: &str = r#"[
  {
    "content": "Question text in Markdown",
    "is_mistake": true,
    "knowledge_points": ["Topic"],
    "error_type": "insufficient knowledge | misreading | imprecise wording | missed requirement",
    "error_analysis": "Detailed analysis of the error",
    "solution": "Reference answer followed by an explanation, Markdown",
    "difficulty": 3,
    "marking_details": "Grading marks you observed (red crosses, deductions)"
  }
]"#;

const LATEX_RULES: &str = "LaTeX rules:
1. Never emit bare LaTeX commands such as \\Rightarrow, \\triangle or \\angle.
2. Every symbol, variable, expression and equation is wrapped in $...$ or $$...$$, even a single $x$.
3. Non-math words inside a formula use \\text{...} and the formula is still wrapped.";

/// Difficulty calibration block; empty when there are no exemplars
pub fn calibration_block(exemplars: &[ReferenceExemplar]) -> String {
    if exemplars.is_empty() {
        return String::new();
    }
    let mut block = format!(
        "Difficulty calibration: the following {} reference questions carry their official \
         difficulty (1-5). Score difficulty relative to them.\n",
        exemplars.len()
    );
    for (i, exemplar) in exemplars.iter().enumerate() {
        let preview: String = exemplar.content.chars().take(EXEMPLAR_PREVIEW_CHARS).collect();
        let _ = write!(
            block,
            "[Reference {}]\nQuestion: {}...\nOfficial difficulty: {}\n",
            i + 1,
            preview,
            exemplar.difficulty
        );
    }
    block
}

/// Vision prompt for analysing one cropped exam photo
pub fn analysis_prompt(subject: Subject, exemplars: &[ReferenceExemplar]) -> String {
    let (persona, schema) = if subject.is_science() {
        (SCIENCE_PERSONA, SCIENCE_ITEM_SCHEMA)
    } else {
        (HUMANITIES_PERSONA, HUMANITIES_ITEM_SCHEMA)
    };

    let mut prompt = String::new();
    prompt.push_str(persona);
    prompt.push_str("\n\n");
    prompt.push_str(&calibration_block(exemplars));
    if !exemplars.is_empty() {
        prompt.push('\n');
    }
    let _ = write!(
        prompt,
        "Subject: {}.\nAnalyse the uploaded image(s): the question paper, answer sheet and any \
         handwritten work. Identify every question the student got wrong.\n\n\
         Reply with a strict JSON array (not wrapped in an object), one element per question:\n{}\n\n",
        subject, schema
    );
    if subject.is_science() {
        prompt.push_str(LATEX_RULES);
        prompt.push_str("\n\n");
    }
    prompt.push_str(
        "Requirements:\n\
         1. One array element per question.\n\
         2. Pay close attention to red grading marks; a red cross means is_mistake is true.\n\
         3. difficulty is an integer from 1 (easiest) to 5.\n\
         4. Return only the JSON array with no explanatory text.",
    );
    prompt
}

/// Text prompt for a structurally similar practice question
pub fn variant_prompt(content: &str, knowledge_points: &[String]) -> String {
    format!(
        "You are an experienced middle-school examination setter. Write one variant of the \
         question below.\n\n\
         Original question:\n{}\n\n\
         Knowledge points: {}\n\n\
         Rules:\n\
         1. Keep the solution method and the tested knowledge unchanged.\n\
         2. Change the numbers, coefficients or scenario so the question is new.\n\
         3. Keep the difficulty the same.\n\
         4. Include a full worked solution and the final answer.\n\n\
         Reply with a strict JSON object only:\n\
         {{\n  \"variant_content\": \"New question, Markdown + LaTeX\",\n  \
         \"analysis\": \"Approach\",\n  \"solution\": \"Steps and answer\",\n  \
         \"similarity_explanation\": \"What changed and what stayed the same\"\n}}",
        content,
        knowledge_points.join(", ")
    )
}

/// Text prompt for a knowledge point explanation card
pub fn knowledge_card_prompt(name: &str) -> String {
    format!(
        "You are an expert middle-school teacher. Write a concise knowledge card for the \
         topic below.\n\n\
         Topic: {}\n\n\
         1. Core definition: state the key formula or theorem in LaTeX and explain it plainly.\n\
         2. Exam focus: list 2-3 common ways this topic is examined.\n\n\
         Reply with a strict JSON object only:\n\
         {{\n  \"definition\": \"...\",\n  \"tips\": [\"...\", \"...\"]\n}}",
        name
    )
}

/// Prompt for extracting every question from an official paper
pub fn reference_extraction_prompt(subject: Subject) -> String {
    format!(
        "Analyse these {} examination files (images or PDFs).\n\
         1. Identify every question in the paper.\n\
         2. Ignore answer-sheet boxes, binding margins and other non-question content.\n\
         3. Convert each question into its own JSON object.\n\n\
         Reply with a JSON array, each element containing:\n\
         - content: full question text (Markdown, formulas in LaTeX)\n\
         - difficulty: estimated difficulty 1-5\n\
         - knowledge_points: list of knowledge points\n\n\
         [\n  {{ \"content\": \"...\", \"difficulty\": 3, \"knowledge_points\": [\"...\"] }}\n]\n\n\
         Return only the JSON with no other text.",
        subject
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn exemplar(content: &str, difficulty: u8) -> ReferenceExemplar {
        ReferenceExemplar {
            content: content.to_string(),
            difficulty,
        }
    }

    #[test]
    fn test_science_prompt_includes_calibration_and_latex_rules() {
        let prompt = analysis_prompt(
            Subject::Math,
            &[exemplar("Find the vertex of y = x^2 - 4x", 2), exemplar("Prove the triangle is isosceles", 4)],
        );
        assert!(prompt.contains("following 2 reference questions"));
        assert!(prompt.contains("[Reference 2]"));
        assert!(prompt.contains("Official difficulty: 4"));
        assert!(prompt.contains("LaTeX rules"));
        assert!(prompt.contains("\"marking_details\""));
    }

    #[test]
    fn test_prompt_without_exemplars_has_no_calibration_block() {
        let prompt = analysis_prompt(Subject::Physics, &[]);
        assert!(!prompt.contains("Difficulty calibration"));
        assert!(prompt.contains("Subject: physics"));
    }

    #[test]
    fn test_humanities_prompt() {
        let prompt = analysis_prompt(Subject::History, &[exemplar("Explain the causes", 3)]);
        assert!(prompt.contains("language, literature and social studies"));
        assert!(prompt.contains("Difficulty calibration"));
        assert!(!prompt.contains("LaTeX rules"));
    }

    #[test]
    fn test_exemplar_preview_truncated() {
        let long = "x".repeat(400);
        let block = calibration_block(&[exemplar(&long, 3)]);
        assert!(block.contains(&format!("{}...", "x".repeat(EXEMPLAR_PREVIEW_CHARS))));
        assert!(!block.contains(&"x".repeat(EXEMPLAR_PREVIEW_CHARS + 1)));
    }

    #[test]
    fn test_prompt_is_deterministic() {
        let exemplars = [exemplar("a", 1)];
        assert_eq!(
            analysis_prompt(Subject::Chemistry, &exemplars),
            analysis_prompt(Subject::Chemistry, &exemplars)
        );
    }

    #[test]
    fn test_variant_prompt_lists_points() {
        let prompt = variant_prompt("Solve 2x = 4", &["Linear equations".into(), "Algebra".into()]);
        assert!(prompt.contains("Solve 2x = 4"));
        assert!(prompt.contains("Linear equations, Algebra"));
        assert!(prompt.contains("\"similarity_explanation\""));
    }
}
