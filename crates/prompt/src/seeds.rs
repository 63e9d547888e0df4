//! Built-in system templates.

use crate::types::{TemplateDraft, TemplateVariable, VariableKind};

fn variable(name: &str, label: &str, kind: VariableKind, required: bool) -> TemplateVariable {
    TemplateVariable::new(name, label, kind, required)
}

/// Templates seeded as system-owned on every start.
///
/// Seeding matches on name, so re-running refreshes rather than duplicates.
pub fn system_templates() -> Vec<TemplateDraft> {
    vec![
        TemplateDraft {
            name: "Blog Writer".to_string(),
            category: "Content Creation".to_string(),
            description: Some("Generate engaging blog posts on any topic".to_string()),
            content: "Write a comprehensive blog post about ${topic}. The post should be ${tone} in tone and approximately ${length} words long. Include an engaging introduction, well-structured body paragraphs, and a strong conclusion.".to_string(),
            variables: vec![
                variable("topic", "Topic", VariableKind::Text, true),
                variable("tone", "Tone", VariableKind::Text, true),
                variable("length", "Word Count", VariableKind::Number, true),
            ],
            intent: Some("Generate high-quality blog content".to_string()),
            expected_output_format: Some(
                "Formatted blog post with title, introduction, body paragraphs, and conclusion"
                    .to_string(),
            ),
            is_favorite: false,
        },
        TemplateDraft {
            name: "Code Review".to_string(),
            category: "Development".to_string(),
            description: Some("Review code for quality, security, and best practices".to_string()),
            content: "Review the following ${language} code and provide feedback on:\n\
1. Code quality and readability\n\
2. Potential bugs or security issues\n\
3. Performance optimizations\n\
4. Best practices and design patterns\n\n\
Code:\n${code}"
                .to_string(),
            variables: vec![
                variable("language", "Programming Language", VariableKind::Text, true),
                variable("code", "Code to Review", VariableKind::Textarea, true),
            ],
            intent: Some("Provide constructive code review feedback".to_string()),
            expected_output_format: Some(
                "Structured review with specific recommendations".to_string(),
            ),
            is_favorite: false,
        },
        TemplateDraft {
            name: "Data Analysis".to_string(),
            category: "Analysis".to_string(),
            description: Some("Analyze data and provide insights".to_string()),
            content: "Analyze the following data about ${subject} and provide:\n\
1. Key insights and patterns\n\
2. Statistical summary\n\
3. Actionable recommendations\n\n\
Data:\n${data}\n\n\
Context: ${context}"
                .to_string(),
            variables: vec![
                variable("subject", "Subject", VariableKind::Text, true),
                variable("data", "Data", VariableKind::Textarea, true),
                variable("context", "Context", VariableKind::Textarea, false),
            ],
            intent: Some("Extract meaningful insights from data".to_string()),
            expected_output_format: Some(
                "Analysis report with insights, statistics, and recommendations".to_string(),
            ),
            is_favorite: false,
        },
        TemplateDraft {
            name: "Blank Template".to_string(),
            category: "General".to_string(),
            description: Some("Start from scratch with a blank template".to_string()),
            content: String::new(),
            variables: Vec::new(),
            intent: Some("Create a custom prompt from scratch".to_string()),
            expected_output_format: Some("User-defined".to_string()),
            is_favorite: false,
        },
    ]
}
