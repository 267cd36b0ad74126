//! One request end to end: classify, gate on confidence, ask the planner,
//! compile, execute.
//!
//! The two collaborators are traits so the transport stays outside this crate.

use serde::Serialize;
use serde_json::Value;
use sheetplan_skills::{Intent, SkillRegistry, SkillSection};
use sheetplan_workbook::TabularStore;

use crate::compiler::PlanCompiler;
use crate::config::{CompilerConfig, ExecutorConfig};
use crate::error::CollaboratorError;
use crate::executor::{ExecutionResult, Executor};
use crate::plan::Plan;
use crate::raw::{ClassificationResult, extract_json};
use crate::schema::SheetSchema;

/// Turns a prompt into classification JSON.
pub trait IntentClassifier {
    fn classify(&self, prompt: &str) -> Result<String, CollaboratorError>;
}

/// Turns a classified request into a raw plan (JSON text).
pub trait PlanAuthor {
    fn author_plan(&self, request: &PlanRequest<'_>) -> Result<String, CollaboratorError>;
}

/// What the planner is given: the request, the sheet, and only the skills
/// it may plan against.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanRequest<'a> {
    pub prompt: &'a str,
    pub intent: Intent,
    pub schema: &'a SheetSchema,
    pub skills: SkillSection,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AssistantResponse {
    pub success: bool,
    pub answer: String,
    pub plan: Plan,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<ExecutionResult>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}

impl AssistantResponse {
    fn failure(message: impl Into<String>) -> Self {
        let answer = message.into();
        #[cfg(feature = "tracing")]
        tracing::warn!(%answer, "request failed");
        Self {
            success: false,
            answer,
            ..Default::default()
        }
    }
}

pub struct Assistant<'r, C, P> {
    registry: &'r SkillRegistry,
    compiler: PlanCompiler<'r>,
    executor: Executor<'r>,
    classifier: C,
    author: P,
}

impl<'r, C: IntentClassifier, P: PlanAuthor> Assistant<'r, C, P> {
    pub fn new(registry: &'r SkillRegistry, classifier: C, author: P) -> Self {
        Self::with_config(
            registry,
            CompilerConfig::from_registry(registry),
            ExecutorConfig::from_registry(registry),
            classifier,
            author,
        )
    }

    pub fn with_config(
        registry: &'r SkillRegistry,
        compiler: CompilerConfig,
        executor: ExecutorConfig,
        classifier: C,
        author: P,
    ) -> Self {
        Self {
            registry,
            compiler: PlanCompiler::with_config(registry, compiler),
            executor: Executor::with_config(registry, executor),
            classifier,
            author,
        }
    }

    /// Handle one prompt against `store`. When `schema` is `None` a minimal
    /// one is read from the store.
    pub fn handle(
        &self,
        prompt: &str,
        store: &mut dyn TabularStore,
        schema: Option<SheetSchema>,
    ) -> AssistantResponse {
        let classification = match self
            .classifier
            .classify(prompt)
            .and_then(|text| ClassificationResult::parse(&text))
        {
            Ok(c) => c,
            Err(e) => return AssistantResponse::failure(format!("Could not classify the request: {e}")),
        };
        #[cfg(feature = "tracing")]
        tracing::info!(
            intent = %classification.intent,
            confidence = classification.confidence,
            "request classified"
        );

        if self.compiler.needs_clarification(&classification) {
            let compiled = self.compiler.clarification();
            return AssistantResponse {
                success: true,
                answer: compiled.answer.unwrap_or_default(),
                plan: compiled.plan,
                details: None,
                warnings: compiled.warnings,
            };
        }

        let schema = match schema {
            Some(schema) => schema,
            None => match SheetSchema::from_store(&*store) {
                Ok(schema) => schema,
                Err(e) => return AssistantResponse::failure(format!("Could not read the sheet: {e}")),
            },
        };
        let request = PlanRequest {
            prompt,
            intent: classification.intent,
            schema: &schema,
            skills: self.registry.section(classification.intent),
        };
        let raw = match self
            .author
            .author_plan(&request)
            .and_then(|text| parse_plan_text(&text))
        {
            Ok(raw) => raw,
            Err(e) => return AssistantResponse::failure(format!("Could not plan the request: {e}")),
        };

        let compiled = match self.compiler.compile(&classification, &raw, &schema) {
            Ok(compiled) => compiled,
            Err(e) => return AssistantResponse::failure(format!("Could not build a plan: {e}")),
        };
        let details = self.executor.execute(store, &compiled.plan);

        let mut answer = compiled
            .answer
            .clone()
            .unwrap_or_else(|| compiled.plan.summary.clone());
        let queries = details.query_answers();
        if !queries.is_empty() {
            if !answer.is_empty() {
                answer.push_str("\n\n");
            }
            answer.push_str(&queries.join("\n"));
        }
        AssistantResponse {
            success: details.all_succeeded(),
            answer,
            plan: compiled.plan,
            details: Some(details),
            warnings: compiled.warnings,
        }
    }
}

fn parse_plan_text(text: &str) -> Result<Value, CollaboratorError> {
    let json = extract_json(text).ok_or(CollaboratorError::NoJson)?;
    Ok(serde_json::from_str(json)?)
}
