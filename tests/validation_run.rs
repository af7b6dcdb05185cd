//! End-to-end: a small synthetic document driven through `ValidationEngine`
//! from the outside, exercising the public API the way an embedder would.

use validation_engine::{
    AttributeValue, EngineOptions, JobEndStatus, ProfileBuilder, Rule, ValidationEngine,
    ValidationObject, Variable,
};
use validator_errors::ValidationResult;

/// A minimal in-memory document: a root with a title attribute and a list
/// of paragraph children, one of which is deliberately too long.
struct Paragraph {
    body: String,
}

impl ValidationObject for Paragraph {
    fn object_type(&self) -> &str {
        "Paragraph"
    }

    fn super_types(&self) -> &[String] {
        &[]
    }

    fn id(&self) -> Option<&str> {
        None
    }

    fn context(&self) -> &str {
        "paragraph"
    }

    fn extra_context(&self) -> Option<&str> {
        None
    }

    fn links(&self) -> Vec<String> {
        Vec::new()
    }

    fn linked_objects(&self, _link: &str) -> ValidationResult<Vec<Box<dyn ValidationObject>>> {
        Ok(Vec::new())
    }

    fn attribute(&self, name: &str) -> Option<AttributeValue> {
        match name {
            "length" => Some(AttributeValue::Int(self.body.len() as i64)),
            _ => None,
        }
    }
}

struct Document {
    title: String,
    paragraphs: Vec<Paragraph>,
}

impl ValidationObject for Document {
    fn object_type(&self) -> &str {
        "Document"
    }

    fn super_types(&self) -> &[String] {
        &[]
    }

    fn id(&self) -> Option<&str> {
        None
    }

    fn context(&self) -> &str {
        "document"
    }

    fn extra_context(&self) -> Option<&str> {
        None
    }

    fn links(&self) -> Vec<String> {
        vec!["paragraphs".to_string()]
    }

    fn linked_objects(&self, link: &str) -> ValidationResult<Vec<Box<dyn ValidationObject>>> {
        match link {
            "paragraphs" => Ok(self
                .paragraphs
                .iter()
                .map(|p| {
                    Box::new(Paragraph {
                        body: p.body.clone(),
                    }) as Box<dyn ValidationObject>
                })
                .collect()),
            _ => Ok(Vec::new()),
        }
    }

    fn attribute(&self, name: &str) -> Option<AttributeValue> {
        match name {
            "title" => Some(AttributeValue::Str(self.title.clone())),
            _ => None,
        }
    }
}

fn document() -> Document {
    Document {
        title: "Quarterly Report".to_string(),
        paragraphs: vec![
            Paragraph {
                body: "short".to_string(),
            },
            Paragraph {
                body: "x".repeat(200),
            },
            Paragraph {
                body: "also short".to_string(),
            },
        ],
    }
}

#[test]
fn reports_every_paragraph_over_length_and_stays_compliant_otherwise() {
    let mut builder = ProfileBuilder::new();
    builder
        .add_rule(
            Rule::new(
                "title-present",
                "Document",
                "obj.attribute(\"title\") == \"Quarterly Report\"",
            )
            .with_description("document must have a title"),
        )
        .unwrap();
    builder
        .add_rule(
            Rule::new(
                "paragraph-length",
                "Paragraph",
                "obj.attribute(\"length\") <= 100",
            )
            .with_description("paragraph must not exceed 100 characters")
            .with_error_template("paragraph at %1 is %2 characters")
            .with_error_argument("ctx", "obj.context()")
            .with_error_argument("len", "obj.attribute(\"length\")"),
        )
        .unwrap();
    let profile = builder.build();

    let mut engine = ValidationEngine::new(
        std::sync::Arc::new(profile),
        EngineOptions {
            log_passed_checks: true,
            show_error_messages: true,
            ..EngineOptions::default()
        },
    );

    let report = engine.validate(Box::new(document())).unwrap();

    assert!(!report.is_compliant);
    assert_eq!(report.total_tests, 4);
    assert_eq!(report.failed_counts["paragraph-length"], 1);
    assert_eq!(report.job_end_status, JobEndStatus::Normal);

    let failure = report
        .assertions
        .iter()
        .find(|a| a.rule_id == "paragraph-length" && a.status == validation_engine::AssertionStatus::Failed)
        .expect("one paragraph should fail the length rule");
    assert_eq!(
        failure.error_message.as_deref(),
        Some("paragraph at paragraph is 200 characters")
    );
}

#[test]
fn cancelling_mid_run_stops_the_traversal_and_reports_cancelled() {
    let mut builder = ProfileBuilder::new();
    builder
        .add_rule(Rule::new("always-passes", "Paragraph", "true"))
        .unwrap();
    let profile = builder.build();

    let mut engine = ValidationEngine::new(std::sync::Arc::new(profile), EngineOptions::default());
    let handle = engine.cancel_handle();
    handle.cancel(JobEndStatus::Cancelled("deadline exceeded".to_string()));

    let report = engine.validate(Box::new(document())).unwrap();

    assert_eq!(report.total_tests, 0);
    assert!(report.is_compliant);
    assert_eq!(
        report.job_end_status,
        JobEndStatus::Cancelled("deadline exceeded".to_string())
    );
}

#[test]
fn accumulator_variable_gates_a_deferred_whole_document_rule() {
    let mut builder = ProfileBuilder::new();
    builder.add_variable(Variable::new(
        "paragraph_count",
        "Paragraph",
        "0",
        "paragraph_count + 1",
    ));
    builder
        .add_rule(
            Rule::new("has-at-least-two-paragraphs", "Document", "paragraph_count >= 2")
                .deferred()
                .with_description("document must contain at least two paragraphs"),
        )
        .unwrap();
    let profile = builder.build();

    let mut engine = ValidationEngine::new(std::sync::Arc::new(profile), EngineOptions::default());
    let report = engine.validate(Box::new(document())).unwrap();

    assert!(report.is_compliant);
    assert_eq!(report.total_tests, 1);
}
