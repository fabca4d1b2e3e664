//! The turn pipeline.
//!
//! Received -> Personalized -> Retrieved -> ModelFirstPass ->
//! (ToolExecuting -> ModelFollowup) -> Answered -> Persisted, with a
//! degraded path reachable from any state on a recoverable failure.
//!
//! Every requested tool call executes in request order and its result is
//! appended to the transcript before the next model invocation, so the
//! follow-up pass sees a deterministic transcript. Exactly one follow-up
//! round is performed; whatever text it returns is accepted.

use super::prompt::{context_block, personalize_query, system_prompt};
use super::types::{Capability, TurnOutcome, TurnRequest};
use super::Orchestrator;
use crate::error::{Error, Result};
use minerva_llm::{CompletionRequest, Message, ToolCompletionRequest};
use minerva_retrieval::RetrievalContext;
use minerva_store::NewTurn;
use minerva_tools::{Role, ToolExecution};
use tracing::{debug, info, instrument, warn};

impl Orchestrator {
    /// Drive one chat turn to a reply.
    ///
    /// Only caller input errors (an empty message list) are surfaced as
    /// `Err`; provider and retrieval failures degrade to a best-effort
    /// reply that is still persisted for authenticated callers.
    #[instrument(skip(self, request), fields(caller = request.caller.as_ref().map(|c| c.student_id.as_str()).unwrap_or("-")))]
    pub async fn handle_turn(&self, request: TurnRequest) -> Result<TurnOutcome> {
        let Some(last) = request.messages.last() else {
            return Err(Error::EmptyConversation);
        };
        let original_query = last.content.clone();
        let caller = request.caller.as_ref();

        // Personalized: rewrite self-referential queries with the caller
        // id; the original text is what gets persisted.
        let mut query = original_query.clone();
        let mut student_context = None;
        if let Some(caller) = caller {
            match self.store.get_student_profile(&caller.student_id).await {
                Ok(Some(profile)) => {
                    student_context = Some(format!(
                        "Logged in as: {} ({}), {}, Year {}. Enrolled in {} courses.",
                        profile.student.name,
                        caller.student_id,
                        profile.student.department,
                        profile.student.year,
                        profile.enrolled_courses.len()
                    ));
                }
                Ok(None) => debug!("Authenticated caller has no profile row"),
                Err(e) => warn!(error = %e, "Profile lookup failed, continuing without context"),
            }
            if let Some(personalized) = personalize_query(&query, &caller.student_id) {
                debug!("Query personalized with caller id");
                query = personalized;
            }
        }

        // Retrieved: failure or absence yields the explicit
        // "no documents found" marker, never an error.
        let context = match &self.retriever {
            Capability::Ready(retriever) => retriever.build_context(&query, self.config.top_k).await,
            Capability::Unavailable(reason) => {
                debug!(%reason, "Retriever unavailable, proceeding ungrounded");
                RetrievalContext::default()
            }
        };

        let mut messages = vec![
            Message::system(system_prompt(
                &self.config.college_name,
                student_context.as_deref(),
            )),
            Message::system(context_block(context.block.as_deref())),
        ];
        let last_idx = request.messages.len() - 1;
        for (i, message) in request.messages.iter().enumerate() {
            let content = if i == last_idx {
                query.clone()
            } else {
                message.content.clone()
            };
            messages.push(message.to_model_message(content));
        }

        // DegradedAnswered: no provider, no retry within the request.
        let provider = match &self.provider {
            Capability::Ready(provider) => provider.clone(),
            Capability::Unavailable(reason) => {
                warn!(%reason, "Model provider unavailable, degrading turn");
                let outcome = TurnOutcome {
                    reply: format!("The assistant is currently unavailable ({reason})."),
                    sources: context.sources,
                    actions: Vec::new(),
                    model: self.model_name(),
                };
                self.persist(caller.map(|c| c.student_id.clone()), &original_query, &outcome)
                    .await;
                return Ok(outcome);
            }
        };

        let role = caller.map_or(Role::Student, |c| c.role);
        let tools = self.dispatcher.registry().to_llm_tools(role);

        let base_request = CompletionRequest::new(&self.config.model)
            .with_messages(messages.clone())
            .with_max_tokens(self.config.max_tokens)
            .with_temperature(self.config.temperature);

        // ModelFirstPass
        let first = match provider
            .complete_with_tools(ToolCompletionRequest::new(base_request, tools))
            .await
        {
            Ok(response) => response,
            Err(e) => {
                warn!(error = %e, "First model pass failed, degrading turn");
                let outcome = TurnOutcome {
                    reply: format!("The language model could not be reached ({e}). Please try again later."),
                    sources: context.sources,
                    actions: Vec::new(),
                    model: self.model_name(),
                };
                self.persist(caller.map(|c| c.student_id.clone()), &original_query, &outcome)
                    .await;
                return Ok(outcome);
            }
        };

        let model = first.model.clone();
        let mut actions = Vec::new();

        let reply = if first.has_tool_calls() {
            // ToolExecuting: every requested call, in order, no call
            // skipped silently.
            messages.push(Message::assistant_tool_calls(
                first.content.clone(),
                first.tool_calls.clone(),
            ));

            for call in &first.tool_calls {
                let execution = match serde_json::from_str::<serde_json::Value>(&call.arguments) {
                    Ok(args) => self.dispatcher.execute(&call.name, args, caller).await,
                    Err(e) => {
                        warn!(tool = %call.name, error = %e, "Unparsable tool arguments");
                        ToolExecution::failure(
                            &call.name,
                            format!("Arguments could not be parsed: {e}"),
                        )
                    }
                };
                info!(tool = %call.name, ok = execution.ok, "Tool executed");
                messages.push(Message::tool_response(
                    &call.id,
                    &call.name,
                    execution.result.to_string(),
                ));
                actions.push(execution.summary);
            }

            // ModelFollowup: one round, no further tool access.
            let followup_request = CompletionRequest::new(&self.config.model)
                .with_messages(messages)
                .with_max_tokens(self.config.max_tokens)
                .with_temperature(self.config.temperature);

            match provider.complete(followup_request).await {
                Ok(response) if !response.content.is_empty() => response.content,
                Ok(_) => "(empty reply)".to_string(),
                Err(e) => {
                    warn!(error = %e, "Follow-up pass failed after tool execution");
                    format!(
                        "I completed the requested actions but could not compose a final reply ({e})."
                    )
                }
            }
        } else {
            first.content.unwrap_or_else(|| "(empty reply)".to_string())
        };

        // Answered
        let outcome = TurnOutcome {
            reply,
            sources: context.sources,
            actions,
            model,
        };

        // Persisted (authenticated callers only)
        self.persist(caller.map(|c| c.student_id.clone()), &original_query, &outcome)
            .await;

        Ok(outcome)
    }

    /// Append the turn to the ledger. Failures are logged and swallowed;
    /// the computed reply is never withheld.
    async fn persist(&self, student_id: Option<String>, original_query: &str, outcome: &TurnOutcome) {
        let Some(student_id) = student_id else {
            return;
        };

        let turn = NewTurn {
            student_id: Some(student_id),
            user_query: original_query.to_string(),
            assistant_reply: outcome.reply.clone(),
            sources: outcome.sources.clone(),
            actions: outcome.actions.clone(),
            model: Some(outcome.model.clone()),
        };

        if let Err(e) = self.ledger.save(&turn).await {
            warn!(error = %e, "Failed to persist conversation turn");
        }
    }
}
